//! Container networking over a veth pair attached to a host bridge.
//!
//! Setup is split across two namespaces and two call sites:
//!
//! 1. On the host, [`make_host`] creates the pair, moves the container end
//!    into the network namespace of the container process and enslaves the
//!    host end to the bridge. It returns a [`VethHandoff`].
//! 2. Inside the container's network namespace, [`make_container`] finds
//!    the moved interface by the name carried in the handoff, assigns the
//!    address and brings it up.
//!
//! The two sides race: the container may look for its interface before the
//! host has moved it, so the container side retries the lookup. Links are
//! never deleted here; the kernel reclaims the pair when the container's
//! network namespace goes away.

pub mod container;
pub mod host;
pub mod netlink;

use contain_common::error::{ContainError, Result};

pub use container::{InterfaceAddress, make_container};
pub use host::{VethHandoff, VethPair, make_host};

/// Resolves an interface name to its index in the current network namespace.
///
/// `kind` names the interface in a [`ContainError::NotFound`].
///
/// # Errors
///
/// Returns [`ContainError::NotFound`] if no such interface exists, or a
/// [`ContainError::Netlink`] if the lookup itself fails.
pub fn interface_index(name: &str, kind: &'static str) -> Result<u32> {
    match nix::net::if_::if_nametoindex(name) {
        Ok(index) => Ok(index),
        Err(nix::errno::Errno::ENODEV) => Err(ContainError::NotFound {
            kind,
            id: name.to_string(),
        }),
        Err(e) => Err(ContainError::Netlink {
            step: "looking up interface",
            source: e.into(),
        }),
    }
}

pub(crate) fn netlink_error(step: &'static str) -> impl FnOnce(std::io::Error) -> ContainError {
    move |source| {
        tracing::debug!(step, error = %source, "netlink request failed");
        ContainError::Netlink { step, source }
    }
}
