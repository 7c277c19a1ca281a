//! Fixed-size message buffers, datagram I/O, and ancillary-data decoding.
//!
//! One `MsgBuf` is allocated up front and reused for every receive or send;
//! a single `recvmsg` fills payload, sender address, and the raw
//! control-message region together, and `decode_ancillary` turns that region
//! into a family-independent [`Ancillary`] record.

use crate::addr::McastAddr;
use crate::error::{IoError, errno};
use crate::socket::mcast::McastSocket;

/// Total size of one message record's wire regions.
pub const MSG_CAPACITY: usize = 2048;

/// Bytes reserved for the raw control-message region.
pub const CONTROL_CAPACITY: usize = 128;

/// Bytes left for datagram payload.
pub const PAYLOAD_CAPACITY: usize =
	MSG_CAPACITY - std::mem::size_of::<libc::sockaddr_storage>() - CONTROL_CAPACITY;

// The payload region must hold a full Ethernet-MTU datagram.
const _: () = assert!(PAYLOAD_CAPACITY >= 1500);

// cmsg headers are read in place, so the region must be header-aligned.
#[repr(align(8))]
struct ControlBuffer([u8; CONTROL_CAPACITY]);

/// A reusable datagram record: peer address, control-message region, and
/// payload.
///
/// `control_len` tracks how many control bytes are valid. It is set by
/// receive, zeroed by [`MsgBuf::clear`], and consulted by the send path to
/// decide whether a control region is passed to the kernel at all — the
/// region's contents are never sniffed to answer that question.
pub struct MsgBuf {
	peer: libc::sockaddr_storage,
	control: ControlBuffer,
	control_len: usize,
	payload: [u8; PAYLOAD_CAPACITY],
}

impl MsgBuf {
	pub fn new() -> Self {
		Self {
			peer: unsafe { std::mem::zeroed() },
			control: ControlBuffer([0; CONTROL_CAPACITY]),
			control_len: 0,
			payload: [0; PAYLOAD_CAPACITY],
		}
	}

	/// Resets the record so nothing from a previous message can leak into
	/// the next decode. The peer address becomes unspecified.
	pub fn clear(&mut self) {
		self.peer = unsafe { std::mem::zeroed() };
		self.control.0 = [0; CONTROL_CAPACITY];
		self.control_len = 0;
		self.payload = [0; PAYLOAD_CAPACITY];
	}

	/// Returns the payload region.
	pub fn payload(&self) -> &[u8] {
		&self.payload
	}

	/// Returns the payload region for filling before a send.
	pub fn payload_mut(&mut self) -> &mut [u8] {
		&mut self.payload
	}

	/// The peer address: the sender after a receive, the destination for an
	/// explicitly addressed send.
	pub fn peer(&self) -> McastAddr {
		McastAddr::from_sockaddr(&self.peer)
	}

	/// Sets the destination for an explicitly addressed send. An
	/// `Unspecified` address means "no destination" — the send then relies
	/// on a prior connect.
	pub fn set_peer(&mut self, addr: &McastAddr) {
		addr.write_sockaddr(&mut self.peer);
	}

	/// True when the control region holds no valid bytes.
	pub fn control_is_empty(&self) -> bool {
		self.control_len == 0
	}

	/// Walks the control-message chain and extracts the metadata this tool
	/// reports.
	///
	/// IPv4 and IPv6 variants of hop limit and traffic class land in the
	/// same two fields; pktinfo keeps its family. Unrecognized (level, type)
	/// pairs are skipped — kernels grow new ancillary types, and an unknown
	/// one is not an error. A truncated pktinfo payload is likewise skipped.
	pub fn decode_ancillary(&self) -> Ancillary {
		let mut aux = Ancillary::default();
		if self.control_len == 0 {
			return aux;
		}

		let mut mhdr: libc::msghdr = unsafe { std::mem::zeroed() };
		mhdr.msg_control = self.control.0.as_ptr() as *mut libc::c_void;
		mhdr.msg_controllen = self.control_len as _;

		let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(&mhdr) };
		while !cmsg.is_null() && unsafe { (*cmsg).cmsg_len } > 0 {
			let level = unsafe { (*cmsg).cmsg_level };
			let typ = unsafe { (*cmsg).cmsg_type };
			match (level, typ) {
				(libc::IPPROTO_IP, libc::IP_PKTINFO) => {
					if let Some(info) = unsafe { cmsg_struct::<libc::in_pktinfo>(cmsg) } {
						aux.pktinfo = Some(PktInfo::V4(info));
					}
				}
				(libc::IPPROTO_IP, libc::IP_TOS | libc::IP_RECVTOS) => {
					aux.dscp = Some((unsafe { cmsg_int(cmsg) } & 0xff) as u8);
				}
				(libc::IPPROTO_IP, libc::IP_TTL | libc::IP_RECVTTL) => {
					aux.hoplimit = Some((unsafe { cmsg_int(cmsg) } & 0xff) as u8);
				}
				(libc::IPPROTO_IPV6, libc::IPV6_PKTINFO) => {
					if let Some(info) = unsafe { cmsg_struct::<libc::in6_pktinfo>(cmsg) } {
						aux.pktinfo = Some(PktInfo::V6(info));
					}
				}
				(libc::IPPROTO_IPV6, libc::IPV6_TCLASS | libc::IPV6_RECVTCLASS) => {
					aux.dscp = Some((unsafe { cmsg_int(cmsg) } & 0xff) as u8);
				}
				(libc::IPPROTO_IPV6, libc::IPV6_HOPLIMIT | libc::IPV6_RECVHOPLIMIT) => {
					aux.hoplimit = Some((unsafe { cmsg_int(cmsg) } & 0xff) as u8);
				}
				_ => {}
			}
			cmsg = unsafe { libc::CMSG_NXTHDR(&mhdr, cmsg) };
		}
		aux
	}
}

impl Default for MsgBuf {
	fn default() -> Self {
		Self::new()
	}
}

/// Reads an integer-valued cmsg payload.
///
/// TTL and hop-limit messages carry a native int; IP_TOS carries a single
/// byte. Both decode through a bounded copy into a zeroed word.
unsafe fn cmsg_int(cmsg: *const libc::cmsghdr) -> i32 {
	let header = unsafe { libc::CMSG_LEN(0) } as usize;
	let data_len = (unsafe { (*cmsg).cmsg_len } as usize).saturating_sub(header);
	let mut word = [0u8; 4];
	let n = data_len.min(4);
	unsafe {
		std::ptr::copy_nonoverlapping(libc::CMSG_DATA(cmsg), word.as_mut_ptr(), n);
	}
	i32::from_ne_bytes(word)
}

/// Reads a struct-valued cmsg payload, or `None` if the message is shorter
/// than the struct.
unsafe fn cmsg_struct<T: Copy>(cmsg: *const libc::cmsghdr) -> Option<T> {
	let need = unsafe { libc::CMSG_LEN(std::mem::size_of::<T>() as libc::c_uint) } as usize;
	if (unsafe { (*cmsg).cmsg_len } as usize) < need {
		return None;
	}
	Some(unsafe { (libc::CMSG_DATA(cmsg) as *const T).read_unaligned() })
}

/// Decoded per-packet metadata, family-independent.
///
/// A `None` field means the kernel did not supply (or this decoder did not
/// recognize) the corresponding control message — an expected state, not an
/// error.
#[derive(Default, Clone, Copy)]
pub struct Ancillary {
	/// Hop limit / TTL the packet arrived with.
	pub hoplimit: Option<u8>,
	/// DSCP / traffic-class marking.
	pub dscp: Option<u8>,
	pktinfo: Option<PktInfo>,
}

#[derive(Clone, Copy)]
enum PktInfo {
	V4(libc::in_pktinfo),
	V6(libc::in6_pktinfo),
}

impl Ancillary {
	/// Index of the interface the packet arrived on, when the kernel
	/// supplied pktinfo.
	pub fn interface_index(&self) -> Option<u32> {
		match self.pktinfo? {
			PktInfo::V4(info) => Some(info.ipi_ifindex as u32),
			PktInfo::V6(info) => Some(info.ipi6_ifindex),
		}
	}
}

impl std::fmt::Debug for Ancillary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Ancillary")
			.field("hoplimit", &self.hoplimit)
			.field("dscp", &self.dscp)
			.field("interface", &self.interface_index())
			.finish()
	}
}

impl McastSocket {
	/// Receives one datagram into `msg`.
	///
	/// The record is cleared first, then payload, sender address, and
	/// control region are filled by a single kernel call. Returns the
	/// payload byte count, which may be 0.
	pub fn recv_msg(&self, msg: &mut MsgBuf) -> Result<usize, IoError> {
		msg.clear();

		let mut iov = libc::iovec {
			iov_base: msg.payload.as_mut_ptr() as *mut libc::c_void,
			iov_len: PAYLOAD_CAPACITY,
		};
		let mut mhdr: libc::msghdr = unsafe { std::mem::zeroed() };
		mhdr.msg_name = &mut msg.peer as *mut _ as *mut libc::c_void;
		mhdr.msg_namelen = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
		mhdr.msg_iov = &mut iov;
		mhdr.msg_iovlen = 1;
		mhdr.msg_control = msg.control.0.as_mut_ptr() as *mut libc::c_void;
		mhdr.msg_controllen = CONTROL_CAPACITY as _;

		let rcvd = unsafe { libc::recvmsg(self.as_raw_fd(), &mut mhdr, 0) };
		if rcvd < 0 {
			return Err(IoError::Recv { errno: errno() });
		}
		msg.control_len = (mhdr.msg_controllen as usize).min(CONTROL_CAPACITY);
		Ok(rcvd as usize)
	}

	/// Sends the first `len` payload bytes of `msg`, truncated to the
	/// payload capacity.
	///
	/// An unspecified peer address omits the destination from the kernel
	/// call (the socket must then be connected); an empty control region is
	/// omitted likewise. Returns the byte count actually sent.
	pub fn send_msg(&self, msg: &MsgBuf, len: usize) -> Result<usize, IoError> {
		let len = len.min(PAYLOAD_CAPACITY);

		let mut iov = libc::iovec {
			iov_base: msg.payload.as_ptr() as *mut libc::c_void,
			iov_len: len,
		};
		let mut mhdr: libc::msghdr = unsafe { std::mem::zeroed() };
		mhdr.msg_iov = &mut iov;
		mhdr.msg_iovlen = 1;
		if msg.peer.ss_family != libc::AF_UNSPEC as libc::sa_family_t {
			mhdr.msg_name = &msg.peer as *const _ as *mut libc::c_void;
			mhdr.msg_namelen = sockaddr_len(&msg.peer);
		}
		if msg.control_len > 0 {
			mhdr.msg_control = msg.control.0.as_ptr() as *mut libc::c_void;
			mhdr.msg_controllen = msg.control_len as _;
		}

		let sent = unsafe { libc::sendmsg(self.as_raw_fd(), &mhdr, 0) };
		if sent < 0 {
			return Err(IoError::Send { errno: errno() });
		}
		Ok(sent as usize)
	}
}

fn sockaddr_len(storage: &libc::sockaddr_storage) -> libc::socklen_t {
	(match storage.ss_family as libc::c_int {
		libc::AF_INET => std::mem::size_of::<libc::sockaddr_in>(),
		libc::AF_INET6 => std::mem::size_of::<libc::sockaddr_in6>(),
		_ => std::mem::size_of::<libc::sockaddr_storage>(),
	}) as libc::socklen_t
}

/// Resolves an interface index to its name.
pub fn interface_name(index: u32) -> Option<String> {
	if index == 0 {
		return None;
	}
	let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
	let name = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
	if name.is_null() {
		return None;
	}
	let name = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
	Some(name.to_string_lossy().into_owned())
}

/// Reduces an IP-layer MTU to the application-layer payload bound.
///
/// Clamps to what one `MsgBuf` can carry and to 1500, raises to the
/// family's minimum MTU, then subtracts the IP and UDP headers. Unspecified
/// families take the IPv6 branch.
pub fn adjust_mtu(mtu: usize, dest: &McastAddr) -> usize {
	let mtu = mtu.min(PAYLOAD_CAPACITY).min(1500);
	match dest {
		McastAddr::V4(_) => mtu.max(576) - 20 - 8,
		_ => mtu.max(1280) - 40 - 8,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::addr::SocketAddrV4;

	/// Appends a forged control message the way the kernel lays them out.
	fn push_cmsg(msg: &mut MsgBuf, level: libc::c_int, typ: libc::c_int, data: &[u8]) {
		let offset = msg.control_len;
		let space = unsafe { libc::CMSG_SPACE(data.len() as libc::c_uint) } as usize;
		assert!(offset + space <= CONTROL_CAPACITY, "control region overflow");

		let hdr = unsafe { msg.control.0.as_mut_ptr().add(offset) } as *mut libc::cmsghdr;
		unsafe {
			(*hdr).cmsg_len = libc::CMSG_LEN(data.len() as libc::c_uint) as _;
			(*hdr).cmsg_level = level;
			(*hdr).cmsg_type = typ;
			std::ptr::copy_nonoverlapping(data.as_ptr(), libc::CMSG_DATA(hdr), data.len());
		}
		msg.control_len = offset + space;
	}

	fn int_bytes(value: i32) -> [u8; 4] {
		value.to_ne_bytes()
	}

	#[test]
	fn empty_control_region_decodes_to_all_none() {
		let msg = MsgBuf::new();
		let aux = msg.decode_ancillary();
		assert_eq!(aux.hoplimit, None);
		assert_eq!(aux.dscp, None);
		assert_eq!(aux.interface_index(), None);
	}

	#[test]
	fn hoplimit_only_message_sets_only_hoplimit() {
		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IPV6, libc::IPV6_HOPLIMIT, &int_bytes(64));

		let aux = msg.decode_ancillary();
		assert_eq!(aux.hoplimit, Some(64));
		assert_eq!(aux.dscp, None);
		assert_eq!(aux.interface_index(), None);
	}

	#[test]
	fn v4_ttl_and_single_byte_tos_both_decode() {
		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_TTL, &int_bytes(1));
		// IP_TOS arrives as one byte, not an int.
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_TOS, &[0xb8]);

		let aux = msg.decode_ancillary();
		assert_eq!(aux.hoplimit, Some(1));
		assert_eq!(aux.dscp, Some(0xb8));
	}

	#[test]
	fn v6_tclass_maps_to_dscp_field() {
		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IPV6, libc::IPV6_TCLASS, &int_bytes(0x20));

		let aux = msg.decode_ancillary();
		assert_eq!(aux.dscp, Some(0x20));
		assert_eq!(aux.hoplimit, None);
	}

	#[test]
	fn v4_pktinfo_exposes_interface_index() {
		let info = libc::in_pktinfo {
			ipi_ifindex: 7,
			ipi_spec_dst: libc::in_addr { s_addr: 0 },
			ipi_addr: libc::in_addr { s_addr: 0 },
		};
		let bytes = unsafe {
			std::slice::from_raw_parts(
				&info as *const _ as *const u8,
				std::mem::size_of::<libc::in_pktinfo>(),
			)
		};

		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_PKTINFO, bytes);

		let aux = msg.decode_ancillary();
		assert_eq!(aux.interface_index(), Some(7));
		assert_eq!(aux.hoplimit, None);
	}

	#[test]
	fn v6_pktinfo_exposes_interface_index() {
		let info = libc::in6_pktinfo {
			ipi6_addr: libc::in6_addr { s6_addr: [0; 16] },
			ipi6_ifindex: 3,
		};
		let bytes = unsafe {
			std::slice::from_raw_parts(
				&info as *const _ as *const u8,
				std::mem::size_of::<libc::in6_pktinfo>(),
			)
		};

		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IPV6, libc::IPV6_PKTINFO, bytes);

		assert_eq!(msg.decode_ancillary().interface_index(), Some(3));
	}

	#[test]
	fn unrecognized_messages_are_skipped_not_fatal() {
		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::SOL_SOCKET, libc::SO_TIMESTAMP, &int_bytes(123));
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_RECVTTL, &int_bytes(9));

		// The unknown entry is ignored and the walk continues past it.
		let aux = msg.decode_ancillary();
		assert_eq!(aux.hoplimit, Some(9));
		assert_eq!(aux.dscp, None);
	}

	#[test]
	fn truncated_pktinfo_is_skipped() {
		let mut msg = MsgBuf::new();
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_PKTINFO, &[1, 2]);

		assert_eq!(msg.decode_ancillary().interface_index(), None);
	}

	#[test]
	fn clear_resets_peer_payload_and_control() {
		let mut msg = MsgBuf::new();
		msg.payload_mut()[0] = 0xaa;
		msg.set_peer(&McastAddr::V4(SocketAddrV4::new([127, 0, 0, 1], 4242)));
		push_cmsg(&mut msg, libc::IPPROTO_IP, libc::IP_TTL, &int_bytes(5));

		msg.clear();
		assert_eq!(msg.peer(), McastAddr::Unspecified);
		assert!(msg.control_is_empty());
		assert_eq!(msg.payload()[0], 0);
		assert_eq!(msg.decode_ancillary().hoplimit, None);
	}

	#[test]
	fn adjust_mtu_subtracts_family_headers() {
		let v4 = McastAddr::parse("239.255.255.251").unwrap();
		let v6 = McastAddr::parse("ff02::fb").unwrap();

		assert_eq!(adjust_mtu(1500, &v4), 1472);
		assert_eq!(adjust_mtu(1500, &v6), 1452);
	}

	#[test]
	fn adjust_mtu_clamps_to_family_floor() {
		let v4 = McastAddr::parse("224.0.0.251").unwrap();
		let v6 = McastAddr::parse("ff02::1").unwrap();

		assert_eq!(adjust_mtu(0, &v4), 576 - 28);
		assert_eq!(adjust_mtu(100, &v6), 1280 - 48);
		assert_eq!(adjust_mtu(usize::MAX, &v4), 1472);
	}
}
