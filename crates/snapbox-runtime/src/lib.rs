//! # snapbox-runtime
//!
//! Container lifecycle orchestration: the supervisor that creates and
//! runs a container, the attach path into a running one, and the
//! commit/remove/logs/roster operations over persisted containers.

pub mod artifacts;
pub mod attach;
pub mod commit;
pub mod logs;
pub mod remove;
pub mod roster;
pub mod supervisor;
