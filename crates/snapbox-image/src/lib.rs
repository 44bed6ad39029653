//! # snapbox-image
//!
//! Image ingress for the Snapbox engine. Two paths materialize an image
//! subvolume: `init` copies a local directory tree, `pull` downloads a
//! layered archive from the registry, flattens its layers in manifest
//! order, and hands the result to `init`.

pub mod catalog;
pub mod init;
pub mod manifest;
pub mod pull;
