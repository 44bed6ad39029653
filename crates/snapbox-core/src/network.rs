//! Per-container network fabric.
//!
//! Each container gets a veth pair whose host end is enslaved to the
//! preexisting bridge and whose peer end lives in a named network
//! namespace, addressed deterministically from the container ID. The
//! bridge itself, IP forwarding, and masquerading are host provisioning
//! concerns and are only checked, never created.

use std::path::Path;

use snapbox_common::constants::{
    CONTAINER_GATEWAY, CONTAINER_SUBNET_BITS, CONTAINER_SUBNET_PREFIX,
};
use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ContainerId;

use crate::tool;

/// Returns the host-side veth interface name for a container.
#[must_use]
pub fn host_veth(id: &ContainerId) -> String {
    format!("veth0_{id}")
}

/// Returns the container-side veth interface name.
#[must_use]
pub fn peer_veth(id: &ContainerId) -> String {
    format!("veth1_{id}")
}

/// Returns the named network namespace for a container.
#[must_use]
pub fn netns_name(id: &ContainerId) -> String {
    format!("netns_{id}")
}

/// Derives a container's address on the container subnet.
///
/// The host octet is the ID's three-digit suffix with every `'0'`
/// character removed. The transform is lossy but must match what deployed
/// hosts pre-compute, so it is kept verbatim.
#[must_use]
pub fn container_ip(id: &ContainerId) -> String {
    let host: String = id.digits().chars().filter(|c| *c != '0').collect();
    let host = if host.is_empty() { "1".to_string() } else { host };
    format!("{CONTAINER_SUBNET_PREFIX}{host}")
}

/// Derives a container's MAC address from its numeric suffix.
///
/// The three digits `d1 d2 d3` fill the last two bytes of the fixed
/// engine OUI: `02:42:ac:11:0<d1>:<d2><d3>`.
#[must_use]
pub fn container_mac(id: &ContainerId) -> String {
    let d = id.digits().as_bytes();
    format!(
        "02:42:ac:11:0{}:{}{}",
        d[0] as char, d[1] as char, d[2] as char
    )
}

/// Verifies that the configured bridge interface exists on the host.
///
/// # Errors
///
/// Returns a precondition error if the bridge is absent.
pub fn ensure_bridge(bridge: &str) -> Result<()> {
    if Path::new("/sys/class/net").join(bridge).exists() {
        Ok(())
    } else {
        Err(SnapboxError::Precondition {
            message: format!("bridge interface '{bridge}' does not exist"),
        })
    }
}

/// Builds the container's network fabric: veth pair, bridge enslavement,
/// named netns, addressing, and default route.
///
/// # Errors
///
/// Returns an error as soon as any `ip` invocation fails; the caller is
/// responsible for tearing down whatever was already built.
pub fn setup(bridge: &str, id: &ContainerId) -> Result<()> {
    let host = host_veth(id);
    let peer = peer_veth(id);
    let netns = netns_name(id);
    let ip_addr = container_ip(id);
    let mac = container_mac(id);

    ip(&[
        "link", "add", "dev", &host, "type", "veth", "peer", "name", &peer,
    ])?;
    ip(&["link", "set", "dev", &host, "up"])?;
    ip(&["link", "set", &host, "master", bridge])?;
    ip(&["netns", "add", &netns])?;
    ip(&["link", "set", &peer, "netns", &netns])?;
    in_netns(&netns, &["link", "set", "dev", "lo", "up"])?;
    in_netns(&netns, &["link", "set", &peer, "address", &mac])?;
    in_netns(
        &netns,
        &[
            "addr",
            "add",
            &format!("{ip_addr}/{CONTAINER_SUBNET_BITS}"),
            "dev",
            &peer,
        ],
    )?;
    in_netns(&netns, &["link", "set", "dev", &peer, "up"])?;
    in_netns(
        &netns,
        &["route", "add", "default", "via", CONTAINER_GATEWAY],
    )?;
    tracing::info!(id = %id, ip = %ip_addr, mac = %mac, "network fabric up");
    Ok(())
}

/// Tears down the container's network fabric.
///
/// Deleting the host-side veth removes the peer automatically. Both
/// deletions are best-effort so teardown can run from error paths where
/// only part of the fabric exists.
pub fn teardown(id: &ContainerId) {
    let host = host_veth(id);
    let netns = netns_name(id);
    if let Err(e) = ip(&["link", "del", "dev", &host]) {
        tracing::debug!(id = %id, error = %e, "veth already gone");
    }
    if let Err(e) = ip(&["netns", "del", &netns]) {
        tracing::debug!(id = %id, error = %e, "netns already gone");
    }
}

fn ip(args: &[&str]) -> Result<()> {
    tool::run("ip", args).map(|_| ())
}

fn in_netns(netns: &str, args: &[&str]) -> Result<()> {
    let mut full: Vec<&str> = vec!["netns", "exec", netns, "ip"];
    full.extend_from_slice(args);
    tool::run("ip", &full).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_names_embed_container_id() {
        let id = ContainerId::from_suffix(42);
        assert_eq!(host_veth(&id), "veth0_ps_042");
        assert_eq!(peer_veth(&id), "veth1_ps_042");
        assert_eq!(netns_name(&id), "netns_ps_042");
    }

    #[test]
    fn ip_strips_every_zero_digit() {
        assert_eq!(container_ip(&ContainerId::from_suffix(42)), "10.0.0.42");
        assert_eq!(container_ip(&ContainerId::from_suffix(100)), "10.0.0.1");
        assert_eq!(container_ip(&ContainerId::from_suffix(205)), "10.0.0.25");
        assert_eq!(container_ip(&ContainerId::from_suffix(254)), "10.0.0.254");
    }

    #[test]
    fn mac_splits_digits_across_last_two_bytes() {
        assert_eq!(
            container_mac(&ContainerId::from_suffix(42)),
            "02:42:ac:11:00:42"
        );
        assert_eq!(
            container_mac(&ContainerId::from_suffix(123)),
            "02:42:ac:11:01:23"
        );
        assert_eq!(
            container_mac(&ContainerId::from_suffix(250)),
            "02:42:ac:11:02:50"
        );
    }

    #[test]
    fn distinct_ids_get_distinct_addresses() {
        let a = ContainerId::from_suffix(123);
        let b = ContainerId::from_suffix(124);
        assert_ne!(container_ip(&a), container_ip(&b));
        assert_ne!(container_mac(&a), container_mac(&b));
    }

    #[test]
    fn ensure_bridge_missing_is_precondition_error() {
        let result = ensure_bridge("snapbox-test-no-such-bridge");
        assert!(matches!(result, Err(SnapboxError::Precondition { .. })));
    }
}
