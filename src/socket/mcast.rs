use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::addr::McastAddr;
use crate::error::{SocketError, errno};
use crate::socket::options::set_v6only;

/// An owned multicast UDP socket.
///
/// Owns exactly one descriptor for its whole lifetime. Teardown actions
/// registered with [`McastSocket::at_close`] run in registration order when
/// the socket drops, before the descriptor is released; that is the only
/// teardown path. Not clonable: two owners of one descriptor is forbidden,
/// moving transfers ownership.
pub struct McastSocket {
	fd: OwnedFd,
	at_close: Vec<Box<dyn FnOnce(RawFd)>>,
}

impl McastSocket {
	/// Creates a UDP socket for the given destination's family.
	pub fn open(dest: &McastAddr) -> Result<Self, SocketError> {
		match dest {
			McastAddr::V4(_) => Self::open_v4(),
			McastAddr::V6(_) => Self::open_v6(),
			McastAddr::Unspecified => Err(SocketError::UnsupportedFamily {
				family: libc::AF_UNSPEC,
			}),
		}
	}

	/// Creates an IPv4 UDP socket.
	pub fn open_v4() -> Result<Self, SocketError> {
		Self::open_raw(libc::AF_INET)
	}

	/// Creates an IPv6 UDP socket, restricted to IPv6 traffic only (no
	/// implicit v4-mapped addresses).
	///
	/// If the restriction cannot be applied the socket is closed before the
	/// error returns; a descriptor never leaks out of a failed open.
	pub fn open_v6() -> Result<Self, SocketError> {
		let sock = Self::open_raw(libc::AF_INET6)?;
		set_v6only(&sock, true)?;
		Ok(sock)
	}

	fn open_raw(family: libc::c_int) -> Result<Self, SocketError> {
		let fd = unsafe {
			libc::socket(
				family,
				libc::SOCK_DGRAM | libc::SOCK_CLOEXEC,
				libc::IPPROTO_UDP,
			)
		};
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() });
		}
		Ok(Self {
			fd: unsafe { OwnedFd::from_raw_fd(fd) },
			at_close: Vec::new(),
		})
	}

	/// Returns the raw file descriptor.
	///
	/// Used internally for syscalls. Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// Registers an action to run at teardown, before the descriptor closes.
	///
	/// Actions run in registration order and receive the still-open
	/// descriptor. Used to reverse multicast group membership.
	pub fn at_close(&mut self, action: impl FnOnce(RawFd) + 'static) {
		self.at_close.push(Box::new(action));
	}

	/// Binds the socket to an address.
	pub fn bind(&self, addr: &McastAddr) -> Result<(), SocketError> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		});

		match result {
			Some(0) => Ok(()),
			Some(_) => Err(SocketError::Bind {
				errno: errno(),
				addr: addr.to_string(),
			}),
			None => Err(SocketError::UnsupportedFamily {
				family: addr.family(),
			}),
		}
	}

	/// Connects the socket to a destination, so later sends need not carry
	/// an explicit address.
	pub fn connect(&self, addr: &McastAddr) -> Result<(), SocketError> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(self.as_raw_fd(), ptr, len)
		});

		match result {
			Some(0) => Ok(()),
			Some(_) => Err(SocketError::Connect {
				errno: errno(),
				addr: addr.to_string(),
			}),
			None => Err(SocketError::UnsupportedFamily {
				family: addr.family(),
			}),
		}
	}
}

impl Drop for McastSocket {
	fn drop(&mut self) {
		let fd = self.fd.as_raw_fd();
		for action in self.at_close.drain(..) {
			action(fd);
		}
		// OwnedFd closes the descriptor after this body.
	}
}

impl std::os::fd::AsRawFd for McastSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for McastSocket {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		self.fd.as_fd()
	}
}
