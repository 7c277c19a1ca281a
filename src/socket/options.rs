use std::os::fd::AsRawFd;

use crate::error::{SocketError, errno};

// Linux delivers traffic for every group any socket on the host joined
// unless MULTICAST_ALL is switched off. Neither constant is exported by
// libc for every target, so they are pinned here (uapi in.h / in6.h).
#[cfg(target_os = "linux")]
const IP_MULTICAST_ALL: libc::c_int = 49;
#[cfg(target_os = "linux")]
const IPV6_MULTICAST_ALL: libc::c_int = 29;

/// setsockopt with errno captured on failure only.
fn setopt<S: AsRawFd, T>(
	socket: &S,
	level: libc::c_int,
	optname: libc::c_int,
	option: &'static str,
	value: &T,
) -> Result<(), SocketError> {
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			level,
			optname,
			value as *const _ as *const libc::c_void,
			std::mem::size_of::<T>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption {
			errno: errno(),
			option,
		})
	} else {
		Ok(())
	}
}

fn set_flag<S: AsRawFd>(
	socket: &S,
	level: libc::c_int,
	optname: libc::c_int,
	option: &'static str,
	enable: bool,
) -> Result<(), SocketError> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	setopt(socket, level, optname, option, &val)
}

/// Sets SO_REUSEADDR.
///
/// Required so several listeners may bind the same group+port.
pub fn set_reuse_addr<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::SOL_SOCKET, libc::SO_REUSEADDR, "SO_REUSEADDR", enable)
}

/// Sets SO_REUSEPORT.
pub fn set_reuse_port<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::SOL_SOCKET, libc::SO_REUSEPORT, "SO_REUSEPORT", enable)
}

/// Restricts an AF_INET6 socket to IPv6 traffic (IPV6_V6ONLY).
pub fn set_v6only<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_V6ONLY, "IPV6_V6ONLY", enable)
}

/// Requests per-packet TOS/DSCP as ancillary data (IPv4).
pub fn set_recv_tos<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IP, libc::IP_RECVTOS, "IP_RECVTOS", enable)
}

/// Requests per-packet TTL as ancillary data (IPv4).
pub fn set_recv_ttl<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IP, libc::IP_RECVTTL, "IP_RECVTTL", enable)
}

/// Requests per-packet interface/destination info as ancillary data (IPv4).
pub fn set_recv_pktinfo<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IP, libc::IP_PKTINFO, "IP_PKTINFO", enable)
}

/// Requests per-packet traffic class as ancillary data (IPv6).
pub fn set_recv_tclass<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_RECVTCLASS, "IPV6_RECVTCLASS", enable)
}

/// Requests per-packet hop limit as ancillary data (IPv6).
pub fn set_recv_hoplimit<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_RECVHOPLIMIT, "IPV6_RECVHOPLIMIT", enable)
}

/// Requests per-packet interface info as ancillary data (IPv6).
pub fn set_recv_pktinfo_v6<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_RECVPKTINFO, "IPV6_RECVPKTINFO", enable)
}

/// Controls whether our own multicast sends loop back locally (IPv4).
pub fn set_multicast_loop<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IP, libc::IP_MULTICAST_LOOP, "IP_MULTICAST_LOOP", enable)
}

/// Controls whether our own multicast sends loop back locally (IPv6).
pub fn set_multicast_loop_v6<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_MULTICAST_LOOP, "IPV6_MULTICAST_LOOP", enable)
}

/// Restricts delivery to groups this socket joined, rather than every group
/// joined on the interface (IPv4, Linux only).
#[cfg(target_os = "linux")]
pub fn set_multicast_all<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IP, IP_MULTICAST_ALL, "IP_MULTICAST_ALL", enable)
}

/// Restricts delivery to groups this socket joined (IPv6, Linux only).
#[cfg(target_os = "linux")]
pub fn set_multicast_all_v6<S: AsRawFd>(socket: &S, enable: bool) -> Result<(), SocketError> {
	set_flag(socket, libc::IPPROTO_IPV6, IPV6_MULTICAST_ALL, "IPV6_MULTICAST_ALL", enable)
}

/// Sets the TTL on outgoing IPv4 multicast packets.
pub fn set_multicast_ttl<S: AsRawFd>(socket: &S, hops: u8) -> Result<(), SocketError> {
	let val = hops as libc::c_int;
	setopt(socket, libc::IPPROTO_IP, libc::IP_MULTICAST_TTL, "IP_MULTICAST_TTL", &val)
}

/// Sets the hop limit on outgoing IPv6 multicast packets.
pub fn set_multicast_hops<S: AsRawFd>(socket: &S, hops: u8) -> Result<(), SocketError> {
	let val = hops as libc::c_int;
	setopt(socket, libc::IPPROTO_IPV6, libc::IPV6_MULTICAST_HOPS, "IPV6_MULTICAST_HOPS", &val)
}

/// Joins an IPv4 multicast group.
pub fn join_group<S: AsRawFd>(socket: &S, mreq: &libc::ip_mreqn) -> Result<(), SocketError> {
	setopt(socket, libc::IPPROTO_IP, libc::IP_ADD_MEMBERSHIP, "IP_ADD_MEMBERSHIP", mreq)
}

/// Leaves an IPv4 multicast group joined with the same membership structure.
pub fn leave_group<S: AsRawFd>(socket: &S, mreq: &libc::ip_mreqn) -> Result<(), SocketError> {
	setopt(socket, libc::IPPROTO_IP, libc::IP_DROP_MEMBERSHIP, "IP_DROP_MEMBERSHIP", mreq)
}

/// Joins an IPv6 multicast group.
pub fn join_group_v6<S: AsRawFd>(socket: &S, mreq: &libc::ipv6_mreq) -> Result<(), SocketError> {
	setopt(socket, libc::IPPROTO_IPV6, libc::IPV6_ADD_MEMBERSHIP, "IPV6_JOIN_GROUP", mreq)
}

/// Leaves an IPv6 multicast group joined with the same membership structure.
pub fn leave_group_v6<S: AsRawFd>(socket: &S, mreq: &libc::ipv6_mreq) -> Result<(), SocketError> {
	setopt(socket, libc::IPPROTO_IPV6, libc::IPV6_DROP_MEMBERSHIP, "IPV6_LEAVE_GROUP", mreq)
}
