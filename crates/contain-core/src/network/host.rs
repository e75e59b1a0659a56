//! Host half of the network setup.

use contain_common::config::NetworkConfig;
use contain_common::error::Result;
use netlink_packet_route::RouteNetlinkMessage;
use netlink_packet_route::link::{
    InfoData, InfoKind, InfoVeth, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
};

use super::netlink::{CREATE_EXCL, NetlinkSocket};
use super::{interface_index, netlink_error};

/// What the host side hands over to the container side.
///
/// Once [`make_host`] has returned, the interface `container_veth` lives in
/// the network namespace of process `pid` and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VethHandoff {
    /// Name of the interface now inside the container.
    pub container_veth: String,
    /// Process whose network namespace received the interface.
    pub pid: u32,
}

/// A veth pair described before it is submitted to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VethPair {
    host: String,
    peer: String,
    peer_ns_pid: Option<u32>,
    master: Option<u32>,
    up: bool,
}

impl VethPair {
    /// Describes a pair named `host` (kept) and `peer` (for the container).
    #[must_use]
    pub fn new(host: &str, peer: &str) -> Self {
        Self {
            host: host.to_string(),
            peer: peer.to_string(),
            peer_ns_pid: None,
            master: None,
            up: false,
        }
    }

    /// Places the peer in the network namespace of `pid` at creation.
    pub const fn move_peer_to(&mut self, pid: u32) -> &mut Self {
        self.peer_ns_pid = Some(pid);
        self
    }

    /// Creates the host end administratively up.
    pub const fn set_up(&mut self) -> &mut Self {
        self.up = true;
        self
    }

    /// Enslaves the host end to the interface at `index`.
    pub const fn set_master(&mut self, index: u32) -> &mut Self {
        self.master = Some(index);
        self
    }

    /// Builds the `RTM_NEWLINK` request creating both ends at once.
    #[must_use]
    pub fn to_message(&self) -> RouteNetlinkMessage {
        let mut peer = LinkMessage::default();
        peer.attributes.push(LinkAttribute::IfName(self.peer.clone()));
        if let Some(pid) = self.peer_ns_pid {
            peer.attributes.push(LinkAttribute::NetNsPid(pid));
        }

        let mut link = LinkMessage::default();
        if self.up {
            link.header.flags = LinkFlags::Up;
            link.header.change_mask = LinkFlags::Up;
        }
        link.attributes.push(LinkAttribute::IfName(self.host.clone()));
        if let Some(master) = self.master {
            link.attributes.push(LinkAttribute::Controller(master));
        }
        link.attributes.push(LinkAttribute::LinkInfo(vec![
            LinkInfo::Kind(InfoKind::Veth),
            LinkInfo::Data(InfoData::Veth(InfoVeth::Peer(peer))),
        ]));
        RouteNetlinkMessage::NewLink(link)
    }
}

/// Looks up `bridge` and plugs the host end of `pair` into it, up.
///
/// # Errors
///
/// Returns [`contain_common::error::ContainError::NotFound`] if the bridge
/// does not exist; it is never created here.
pub fn attach_to_bridge(pair: &mut VethPair, bridge: &str) -> Result<()> {
    let index = interface_index(bridge, "host bridge")?;
    let _ = pair.set_up().set_master(index);
    tracing::debug!(bridge, index, host_veth = %pair.host, "host end attached to bridge");
    Ok(())
}

/// Creates the veth pair for the container process `pid`.
///
/// The container end is created directly inside the network namespace of
/// `pid`; the host end is created up and enslaved to the bridge. Nothing is
/// rolled back on failure.
///
/// # Errors
///
/// Returns a configuration error, [`contain_common::error::ContainError::NotFound`]
/// for a missing bridge, or a netlink error naming the failing step.
pub fn make_host(config: &NetworkConfig, pid: u32) -> Result<VethHandoff> {
    config.validate()?;

    let mut pair = VethPair::new(&config.host_veth, &config.container_veth);
    let _ = pair.move_peer_to(pid);
    attach_to_bridge(&mut pair, &config.bridge)?;

    let mut socket = NetlinkSocket::open().map_err(netlink_error("opening netlink socket"))?;
    socket
        .request(pair.to_message(), CREATE_EXCL)
        .map_err(netlink_error("creating veth pair"))?;

    tracing::info!(
        pid,
        host_veth = %config.host_veth,
        container_veth = %config.container_veth,
        bridge = %config.bridge,
        "veth pair created"
    );
    Ok(VethHandoff {
        container_veth: config.container_veth.clone(),
        pid,
    })
}
