//! Acknowledged rtnetlink requests over a blocking route socket.
//!
//! Message layout comes from `netlink-packet-route`; this module only
//! frames requests, sends them and waits for the kernel's acknowledgement.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroI32;

use netlink_packet_core::{
    NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NetlinkHeader, NetlinkMessage,
    NetlinkPayload,
};
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use netlink_packet_route::link::{LinkFlags, LinkMessage};
use netlink_packet_route::{AddressFamily, RouteNetlinkMessage};
use netlink_sys::protocols::NETLINK_ROUTE;
use netlink_sys::{Socket, SocketAddr};

/// Flags of a request creating an object that must not exist yet.
pub const CREATE_EXCL: u16 = NLM_F_CREATE | NLM_F_EXCL;

/// Builds an `RTM_NEWADDR` message assigning `address/prefix_len` to the
/// interface at `index`.
#[must_use]
pub fn new_address(index: u32, address: Ipv4Addr, prefix_len: u8) -> RouteNetlinkMessage {
    let mut msg = AddressMessage::default();
    msg.header.family = AddressFamily::Inet;
    msg.header.prefix_len = prefix_len;
    msg.header.index = index;
    msg.attributes = vec![
        AddressAttribute::Local(IpAddr::V4(address)),
        AddressAttribute::Address(IpAddr::V4(address)),
    ];
    RouteNetlinkMessage::NewAddress(msg)
}

/// Builds an `RTM_SETLINK` message changing only the up flag of the
/// interface at `index`.
#[must_use]
pub fn set_link_up(index: u32) -> RouteNetlinkMessage {
    let mut msg = LinkMessage::default();
    msg.header.index = index;
    msg.header.flags = LinkFlags::Up;
    msg.header.change_mask = LinkFlags::Up;
    RouteNetlinkMessage::SetLink(msg)
}

/// Converts the error code of a negative acknowledgement to an OS error.
///
/// The kernel sends `-errno`; a code with no positive counterpart is
/// rejected as malformed.
pub fn ack_error(code: NonZeroI32) -> io::Error {
    match code.get().checked_neg() {
        Some(errno) if errno > 0 => io::Error::from_raw_os_error(errno),
        _ => io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid netlink error code {code}"),
        ),
    }
}

fn decode_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("malformed netlink reply: {e}"))
}

/// A `NETLINK_ROUTE` socket issuing acknowledged requests.
pub struct NetlinkSocket {
    socket: Socket,
    seq: u32,
}

impl std::fmt::Debug for NetlinkSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlinkSocket").field("seq", &self.seq).finish_non_exhaustive()
    }
}

impl NetlinkSocket {
    /// Opens a route socket in the caller's network namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created, bound or connected.
    pub fn open() -> io::Result<Self> {
        let mut socket = Socket::new(NETLINK_ROUTE)?;
        let _ = socket.bind_auto()?;
        socket.connect(&SocketAddr::new(0, 0))?;
        Ok(Self { socket, seq: 0 })
    }

    /// Sends `payload` with `flags` on top of `NLM_F_REQUEST | NLM_F_ACK`
    /// and waits for its acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the kernel, or a transport error.
    pub fn request(&mut self, payload: RouteNetlinkMessage, flags: u16) -> io::Result<()> {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;

        let mut header = NetlinkHeader::default();
        header.flags = NLM_F_REQUEST | NLM_F_ACK | flags;
        header.sequence_number = seq;
        let mut msg = NetlinkMessage::new(header, NetlinkPayload::from(payload));
        msg.finalize();
        let mut buf = vec![0u8; msg.buffer_len()];
        msg.serialize(&mut buf[..]);
        let _ = self.socket.send(&buf, 0)?;

        let mut recv_buf = vec![0u8; 8192];
        loop {
            let size = self.socket.recv(&mut &mut recv_buf[..], 0)?;
            if size == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "netlink socket closed",
                ));
            }
            let mut offset = 0;
            while offset < size {
                let reply = NetlinkMessage::<RouteNetlinkMessage>::deserialize(
                    &recv_buf[offset..size],
                )
                .map_err(decode_error)?;
                let len = reply.header.length as usize;
                if reply.header.sequence_number == seq {
                    if let NetlinkPayload::Error(err) = reply.payload {
                        return match err.code {
                            None => Ok(()),
                            Some(code) => Err(ack_error(code)),
                        };
                    }
                }
                if len == 0 {
                    break;
                }
                offset += len;
            }
        }
    }
}
