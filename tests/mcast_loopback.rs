//! Same-host end-to-end checks: a listener joined to a site-local group and
//! a client sending into it.
//!
//! Hosts without a multicast-capable route (stripped-down build sandboxes)
//! cannot run these meaningfully; each test skips with a note instead of
//! failing when group setup or delivery is impossible there.

use std::os::fd::AsRawFd;
use std::time::Duration;

use mcastdump::{
	McastAddr, McastSocket, MsgBuf, PAYLOAD_CAPACITY, configure_listener, configure_sender,
	socket::set_multicast_ttl,
};

const GROUP: &str = "239.255.255.251";

fn group_addr(port: u16) -> McastAddr {
	let mut addr = McastAddr::parse(GROUP).unwrap();
	addr.set_port(port).unwrap();
	addr
}

/// Bounds every receive so a lost datagram fails the test instead of
/// hanging it.
fn set_recv_timeout(sock: &McastSocket, timeout: Duration) {
	let tv = libc::timeval {
		tv_sec: timeout.as_secs() as libc::time_t,
		tv_usec: timeout.subsec_micros() as libc::suseconds_t,
	};
	let rc = unsafe {
		libc::setsockopt(
			sock.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_RCVTIMEO,
			&tv as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::timeval>() as libc::socklen_t,
		)
	};
	assert_eq!(rc, 0);
}

fn local_port(sock: &McastSocket) -> u16 {
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
	let rc = unsafe {
		libc::getsockname(
			sock.as_raw_fd(),
			&mut storage as *mut _ as *mut libc::sockaddr,
			&mut len,
		)
	};
	assert_eq!(rc, 0);
	let sin = unsafe { &*(&storage as *const _ as *const libc::sockaddr_in) };
	u16::from_be(sin.sin_port)
}

#[test]
fn connected_client_reaches_listener() {
	let group = group_addr(27182);

	let mut listener = McastSocket::open(&group).unwrap();
	if let Err(err) = configure_listener(&mut listener, &group) {
		eprintln!("skipping: cannot join {group}: {err}");
		return;
	}
	set_recv_timeout(&listener, Duration::from_secs(2));

	let mut sender = McastSocket::open(&group).unwrap();
	if let Err(err) = configure_sender(&mut sender, &group, 1) {
		eprintln!("skipping: cannot set up sender: {err}");
		return;
	}

	// The connected socket carries the destination; the buffer does not.
	let mut out = MsgBuf::new();
	out.payload_mut()[..5].copy_from_slice(b"hello");
	assert_eq!(out.peer(), McastAddr::Unspecified);
	match sender.send_msg(&out, 5) {
		Ok(sent) => assert_eq!(sent, 5),
		Err(err) => {
			eprintln!("skipping: send failed: {err}");
			return;
		}
	}

	let mut input = MsgBuf::new();
	match listener.recv_msg(&mut input) {
		Ok(rcvd) => {
			assert_eq!(rcvd, 5);
			assert_eq!(&input.payload()[..5], b"hello");
			match input.peer() {
				McastAddr::V4(peer) => assert_eq!(peer.port(), local_port(&sender)),
				other => panic!("sender address not IPv4: {other}"),
			}
		}
		Err(err) => eprintln!("skipping: no loopback delivery: {err}"),
	}
}

#[test]
fn explicitly_addressed_send_reaches_listener() {
	let group = group_addr(27183);

	let mut listener = McastSocket::open(&group).unwrap();
	if let Err(err) = configure_listener(&mut listener, &group) {
		eprintln!("skipping: cannot join {group}: {err}");
		return;
	}
	set_recv_timeout(&listener, Duration::from_secs(2));

	// No bind, no connect: the destination rides in the buffer instead.
	let sender = McastSocket::open(&group).unwrap();
	set_multicast_ttl(&sender, 1).unwrap();

	let mut out = MsgBuf::new();
	out.payload_mut()[..4].copy_from_slice(b"ping");
	out.set_peer(&group);
	if let Err(err) = sender.send_msg(&out, 4) {
		eprintln!("skipping: send failed: {err}");
		return;
	}

	let mut input = MsgBuf::new();
	match listener.recv_msg(&mut input) {
		Ok(rcvd) => {
			assert_eq!(rcvd, 4);
			assert_eq!(&input.payload()[..4], b"ping");
		}
		Err(err) => eprintln!("skipping: no loopback delivery: {err}"),
	}
}

#[test]
fn send_length_is_truncated_to_payload_capacity() {
	let group = group_addr(27184);

	let mut sender = McastSocket::open(&group).unwrap();
	if let Err(err) = configure_sender(&mut sender, &group, 1) {
		eprintln!("skipping: cannot set up sender: {err}");
		return;
	}

	let out = MsgBuf::new();
	match sender.send_msg(&out, PAYLOAD_CAPACITY + 512) {
		Ok(sent) => assert_eq!(sent, PAYLOAD_CAPACITY),
		Err(err) => eprintln!("skipping: send failed: {err}"),
	}
}

#[test]
fn dropping_a_listener_releases_its_membership() {
	let group = group_addr(27185);

	{
		let mut first = McastSocket::open(&group).unwrap();
		if let Err(err) = configure_listener(&mut first, &group) {
			eprintln!("skipping: cannot join {group}: {err}");
			return;
		}
	} // first drops here: leave-group runs, then the descriptor closes

	let mut second = McastSocket::open(&group).unwrap();
	if let Err(err) = configure_listener(&mut second, &group) {
		panic!("rejoin after drop failed: {err}");
	}
}
