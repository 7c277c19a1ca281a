//! Multicast destination addresses.
//!
//! `McastAddr` is the family-tagged address the rest of the crate dispatches
//! on: IPv4, IPv6, or unspecified (the state a cleared message buffer's peer
//! address is in before anything has been received).

mod ipv4;
mod ipv6;
pub use self::ipv4::SocketAddrV4;
pub use self::ipv6::SocketAddrV6;

use crate::error::{AddrError, SocketError};

/// A family-tagged socket address.
///
/// Family-specific accessors return `None` when the tag does not match;
/// operations that need a concrete family fail with
/// `SocketError::UnsupportedFamily` on the `Unspecified` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum McastAddr {
	#[default]
	Unspecified,
	V4(SocketAddrV4),
	V6(SocketAddrV6),
}

impl McastAddr {
	/// Parses a numeric IP literal (no DNS lookups) into an address with a
	/// zero port.
	pub fn parse(literal: &str) -> Result<Self, AddrError> {
		match literal.parse::<std::net::IpAddr>() {
			Ok(std::net::IpAddr::V4(ip)) => Ok(Self::V4(SocketAddrV4::new(ip.octets(), 0))),
			Ok(std::net::IpAddr::V6(ip)) => Ok(Self::V6(SocketAddrV6::new(ip.octets(), 0))),
			Err(source) => Err(AddrError {
				literal: literal.to_string(),
				source,
			}),
		}
	}

	/// Returns the libc address-family constant for this tag.
	pub fn family(&self) -> libc::c_int {
		match self {
			Self::Unspecified => libc::AF_UNSPEC,
			Self::V4(_) => libc::AF_INET,
			Self::V6(_) => libc::AF_INET6,
		}
	}

	/// Sets the port in whichever family the address carries.
	pub fn set_port(&mut self, port: u16) -> Result<(), SocketError> {
		match self {
			Self::V4(addr) => {
				addr.set_port(port);
				Ok(())
			}
			Self::V6(addr) => {
				addr.set_port(port);
				Ok(())
			}
			Self::Unspecified => Err(SocketError::UnsupportedFamily {
				family: libc::AF_UNSPEC,
			}),
		}
	}

	/// Returns the port, or `None` for an unspecified address.
	pub fn port(&self) -> Option<u16> {
		match self {
			Self::V4(addr) => Some(addr.port()),
			Self::V6(addr) => Some(addr.port()),
			Self::Unspecified => None,
		}
	}

	/// The IPv4 view, if that is the tagged family.
	pub fn as_v4(&self) -> Option<&SocketAddrV4> {
		match self {
			Self::V4(addr) => Some(addr),
			_ => None,
		}
	}

	/// The IPv6 view, if that is the tagged family.
	pub fn as_v6(&self) -> Option<&SocketAddrV6> {
		match self {
			Self::V6(addr) => Some(addr),
			_ => None,
		}
	}

	/// Calls the provided closure with a pointer to the raw sockaddr and its
	/// size. Returns None for an unspecified address, which has no sockaddr
	/// representation.
	///
	/// The raw struct lives on this stack frame, so the pointer is only valid
	/// for the duration of the closure.
	pub(crate) fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			Self::V4(addr) => {
				let raw = addr.to_raw();
				let ptr = &raw as *const _ as *const libc::sockaddr;
				let len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
				Some(f(ptr, len))
			}
			Self::V6(addr) => {
				let raw = addr.to_raw();
				let ptr = &raw as *const _ as *const libc::sockaddr;
				let len = std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
				Some(f(ptr, len))
			}
			Self::Unspecified => None,
		}
	}

	/// Decodes whatever family a kernel-filled sockaddr_storage carries.
	/// Families this crate does not speak come back as `Unspecified`.
	pub(crate) fn from_sockaddr(storage: &libc::sockaddr_storage) -> Self {
		match storage.ss_family as libc::c_int {
			libc::AF_INET => {
				let raw = unsafe { &*(storage as *const _ as *const libc::sockaddr_in) };
				Self::V4(SocketAddrV4::from_raw(raw))
			}
			libc::AF_INET6 => {
				let raw = unsafe { &*(storage as *const _ as *const libc::sockaddr_in6) };
				Self::V6(SocketAddrV6::from_raw(raw))
			}
			_ => Self::Unspecified,
		}
	}

	/// Writes the address into a sockaddr_storage, zeroing it first.
	/// `Unspecified` leaves the storage with AF_UNSPEC, which the send path
	/// reads as "no destination address".
	pub(crate) fn write_sockaddr(&self, storage: &mut libc::sockaddr_storage) {
		*storage = unsafe { std::mem::zeroed() };
		match self {
			Self::V4(addr) => {
				let raw = addr.to_raw();
				unsafe {
					std::ptr::write(storage as *mut _ as *mut libc::sockaddr_in, raw);
				}
			}
			Self::V6(addr) => {
				let raw = addr.to_raw();
				unsafe {
					std::ptr::write(storage as *mut _ as *mut libc::sockaddr_in6, raw);
				}
			}
			Self::Unspecified => {}
		}
	}
}

impl std::fmt::Display for McastAddr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Unspecified => write!(f, "(unknown address family)"),
			Self::V4(addr) => write!(f, "{addr}"),
			Self::V6(addr) => write!(f, "{addr}"),
		}
	}
}
