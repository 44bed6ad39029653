//! System-wide constants and default paths.

/// Default mount point of the btrfs filesystem holding all subvolumes.
pub const DEFAULT_BTRFS_ROOT: &str = "/var/snapbox";

/// Default host bridge that container veth pairs are enslaved to.
pub const DEFAULT_BRIDGE: &str = "bridge0";

/// Default upstream resolver written into each container's resolv.conf.
pub const DEFAULT_NAMESERVER: &str = "8.8.8.8";

/// Default legacy CPU share applied to new containers.
pub const DEFAULT_CPU_SHARE: u64 = 512;

/// Default memory ceiling in megabytes.
pub const DEFAULT_MEM_LIMIT_MB: u64 = 512;

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Name of the engine-owned cgroup under the unified hierarchy.
pub const ENGINE_CGROUP: &str = "snapbox";

/// Default base URL for the image registry.
pub const DEFAULT_REGISTRY_BASE: &str = "https://images.snapbox.dev";

/// Environment variable overriding the registry base URL.
pub const REGISTRY_ENV: &str = "SNAPBOX_REGISTRY";

/// Lowest numeric suffix in the identifier pool.
pub const ID_POOL_MIN: u16 = 42;

/// Highest numeric suffix in the identifier pool.
pub const ID_POOL_MAX: u16 = 254;

/// Identifier prefix for images.
pub const IMAGE_PREFIX: &str = "img";

/// Identifier prefix for containers.
pub const CONTAINER_PREFIX: &str = "ps";

/// Directory where named network namespaces are bind-mounted.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Gateway address on the container subnet (the bridge).
pub const CONTAINER_GATEWAY: &str = "10.0.0.1";

/// Prefix of every container address.
pub const CONTAINER_SUBNET_PREFIX: &str = "10.0.0.";

/// Netmask width of the container subnet.
pub const CONTAINER_SUBNET_BITS: u8 = 24;

/// Application name used in logging and state paths.
pub const APP_NAME: &str = "snapbox";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "sbx";
