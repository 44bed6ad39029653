//! Global configuration model for the Snapbox engine.
//!
//! A single immutable record threaded through every operation, replacing
//! ambient globals and environment lookups scattered across call sites.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Root configuration for one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Mount point of the btrfs filesystem holding images and containers.
    pub btrfs_root: PathBuf,
    /// Host bridge that container veth pairs join.
    pub bridge: String,
    /// Upstream resolver written into each container's resolv.conf.
    pub nameserver: String,
    /// Legacy CPU share, transformed into a cgroup v2 weight.
    pub cpu_share: u64,
    /// Memory ceiling in megabytes.
    pub mem_limit_mb: u64,
    /// Cgroups v2 unified hierarchy mount point.
    pub cgroup_root: PathBuf,
    /// Name of the engine-owned cgroup subtree.
    pub engine_cgroup: String,
    /// Base URL for registry pulls.
    pub registry_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            btrfs_root: PathBuf::from(constants::DEFAULT_BTRFS_ROOT),
            bridge: constants::DEFAULT_BRIDGE.to_string(),
            nameserver: constants::DEFAULT_NAMESERVER.to_string(),
            cpu_share: constants::DEFAULT_CPU_SHARE,
            mem_limit_mb: constants::DEFAULT_MEM_LIMIT_MB,
            cgroup_root: PathBuf::from(constants::CGROUP_ROOT),
            engine_cgroup: constants::ENGINE_CGROUP.to_string(),
            registry_base: constants::DEFAULT_REGISTRY_BASE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Returns the engine's cgroup parent directory.
    #[must_use]
    pub fn cgroup_parent(&self) -> PathBuf {
        self.cgroup_root.join(&self.engine_cgroup)
    }
}
