//! Container half of the network setup, run inside the new namespace.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use contain_common::config::NetworkConfig;
use contain_common::error::{ContainError, Result};

use super::netlink::{self, CREATE_EXCL, NetlinkSocket};
use super::{interface_index, netlink_error};

/// An IPv4 address with its prefix length, e.g. `10.0.0.2/24`.
///
/// Without an explicit prefix the address is a host address (`/32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// The address itself.
    pub ip: Ipv4Addr,
    /// Length of the network prefix, 0 to 32.
    pub prefix_len: u8,
}

impl FromStr for InterfaceAddress {
    type Err = ContainError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ContainError::Config {
            message: format!("invalid IPv4 address: {s:?}"),
        };
        let (ip, prefix_len) = match s.split_once('/') {
            Some((ip, prefix)) => (ip, prefix.parse::<u8>().map_err(|_| invalid())?),
            None => (s, 32),
        };
        if prefix_len > 32 {
            return Err(invalid());
        }
        Ok(Self {
            ip: ip.parse().map_err(|_| invalid())?,
            prefix_len,
        })
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

/// Waits for the container interface to show up in this namespace.
///
/// Polls up to `lookup_attempts` times, `lookup_interval_ms` apart.
///
/// # Errors
///
/// Returns [`ContainError::NotFound`] if the interface never appears, or
/// the first lookup failure other than a missing interface.
pub fn wait_for_interface(config: &NetworkConfig) -> Result<u32> {
    let interval = Duration::from_millis(config.lookup_interval_ms);
    let mut attempt = 1;
    loop {
        match interface_index(&config.container_veth, "container interface") {
            Err(ContainError::NotFound { .. }) if attempt < config.lookup_attempts => {
                tracing::debug!(
                    attempt,
                    name = %config.container_veth,
                    "container interface not there yet"
                );
                std::thread::sleep(interval);
                attempt += 1;
            }
            res => return res,
        }
    }
}

/// Addresses and brings up the container end of the veth pair.
///
/// Must run inside the container's network namespace, after the host side
/// has moved the interface there. The address is assigned first; the link
/// then comes up in a single flag change.
///
/// # Errors
///
/// Returns [`ContainError::NotFound`] if the interface is missing, a
/// configuration error for an unparsable address, or a netlink error
/// naming the failing step.
pub fn make_container(config: &NetworkConfig, address: &str) -> Result<()> {
    config.validate()?;

    let index = wait_for_interface(config)?;
    let address: InterfaceAddress = address.parse()?;

    let mut socket = NetlinkSocket::open().map_err(netlink_error("opening netlink socket"))?;
    socket
        .request(netlink::new_address(index, address.ip, address.prefix_len), CREATE_EXCL)
        .map_err(netlink_error("assigning address"))?;
    socket
        .request(netlink::set_link_up(index), 0)
        .map_err(netlink_error("bringing interface up"))?;

    tracing::info!(
        interface = %config.container_veth,
        %address,
        "container interface configured"
    );
    Ok(())
}
