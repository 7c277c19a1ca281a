//! Listener and sender option sequences.
//!
//! Each sequence is applied fail-fast: the first failing step aborts with
//! that step's error, and no later step runs. Partial configuration is not
//! rolled back; a socket whose setup failed must be discarded, not reused.

use crate::addr::{McastAddr, SocketAddrV4, SocketAddrV6};
use crate::error::SocketError;
use crate::socket::mcast::McastSocket;
use crate::socket::options::{
	join_group, join_group_v6, leave_group, leave_group_v6, set_multicast_hops,
	set_multicast_loop, set_multicast_loop_v6, set_multicast_ttl, set_recv_hoplimit,
	set_recv_pktinfo, set_recv_pktinfo_v6, set_recv_tclass, set_recv_tos, set_recv_ttl,
	set_reuse_addr, set_reuse_port,
};
#[cfg(target_os = "linux")]
use crate::socket::options::{set_multicast_all, set_multicast_all_v6};

/// Configures a socket to receive datagrams for `group`.
///
/// Enables address/port reuse and per-packet metadata, joins the group on
/// the wildcard interface, and binds the wildcard address with the group's
/// port. Multicast delivery is filtered by membership, not by destination
/// bind, so binding the group address itself would be wrong.
///
/// On success the matching group-leave is registered as a teardown action,
/// so dropping the socket reverses the membership.
pub fn configure_listener(sock: &mut McastSocket, group: &McastAddr) -> Result<(), SocketError> {
	set_reuse_addr(sock, true)?;
	set_reuse_port(sock, true)?;

	match group {
		McastAddr::V4(dest) => {
			set_recv_tos(sock, true)?;
			set_recv_ttl(sock, true)?;
			set_recv_pktinfo(sock, true)?;
			set_multicast_loop(sock, true)?;
			#[cfg(target_os = "linux")]
			set_multicast_all(sock, false)?;

			let mreq = libc::ip_mreqn {
				imr_multiaddr: dest.to_in_addr(),
				imr_address: libc::in_addr {
					s_addr: libc::INADDR_ANY,
				},
				imr_ifindex: 0,
			};
			join_group(sock, &mreq)?;
			sock.bind(&McastAddr::V4(SocketAddrV4::any(dest.port())))?;

			sock.at_close(move |fd| {
				let _ = leave_group(&fd, &mreq);
			});
			Ok(())
		}

		McastAddr::V6(dest) => {
			set_recv_tclass(sock, true)?;
			set_recv_hoplimit(sock, true)?;
			set_recv_pktinfo_v6(sock, true)?;
			set_multicast_loop_v6(sock, true)?;
			#[cfg(target_os = "linux")]
			set_multicast_all_v6(sock, false)?;

			let mreq = libc::ipv6_mreq {
				ipv6mr_multiaddr: dest.to_in6_addr(),
				ipv6mr_interface: 0,
			};
			join_group_v6(sock, &mreq)?;
			sock.bind(&McastAddr::V6(SocketAddrV6::any(dest.port())))?;

			sock.at_close(move |fd| {
				let _ = leave_group_v6(&fd, &mreq);
			});
			Ok(())
		}

		McastAddr::Unspecified => Err(SocketError::UnsupportedFamily {
			family: libc::AF_UNSPEC,
		}),
	}
}

/// Configures a socket to send datagrams to `group` with the given hop
/// count.
///
/// Sets the outgoing multicast TTL/hop limit, binds an ephemeral local
/// port, and connects to the destination so sends need not repeat the
/// address.
pub fn configure_sender(
	sock: &mut McastSocket,
	group: &McastAddr,
	hops: u8,
) -> Result<(), SocketError> {
	match group {
		McastAddr::V4(_) => {
			set_multicast_ttl(sock, hops)?;
			sock.bind(&McastAddr::V4(SocketAddrV4::any(0)))?;
			sock.connect(group)
		}

		McastAddr::V6(_) => {
			set_multicast_hops(sock, hops)?;
			sock.bind(&McastAddr::V6(SocketAddrV6::any(0)))?;
			sock.connect(group)
		}

		McastAddr::Unspecified => Err(SocketError::UnsupportedFamily {
			family: libc::AF_UNSPEC,
		}),
	}
}
