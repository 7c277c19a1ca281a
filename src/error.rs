/// Socket creation/configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
	#[error("socket() failed: {}", errno_to_str(*.errno))]
	Create { errno: i32 },

	#[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
	Bind { errno: i32, addr: String },

	#[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
	Connect { errno: i32, addr: String },

	#[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
	SetOption { errno: i32, option: &'static str },

	#[error("address family {family} not supported here: {}", errno_to_str(libc::EAFNOSUPPORT))]
	UnsupportedFamily { family: i32 },
}

/// Datagram I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
	#[error("recvmsg() failed: {}", errno_to_str(*.errno))]
	Recv { errno: i32 },

	#[error("sendmsg() failed: {}", errno_to_str(*.errno))]
	Send { errno: i32 },
}

/// Address-literal resolution errors.
///
/// Distinct from the errno-backed errors above: the code comes from the
/// resolver, not the kernel, and renders through the resolver's messages.
/// The two tables assign different meanings to the same integers, so the
/// categories are never collapsed into one.
#[derive(Debug, thiserror::Error)]
#[error("cannot resolve {literal:?} as a numeric IPv4 or IPv6 address: {source}")]
pub struct AddrError {
	pub literal: String,
	#[source]
	pub source: std::net::AddrParseError,
}

/// Returns current errno value.
///
/// Only meaningful immediately after a syscall reported failure. Successful
/// calls may leave stale values behind, so this is never consulted on a
/// success path.
#[inline]
pub fn errno() -> i32 {
	unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
	match errno {
		libc::EACCES => "permission denied".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EMFILE => "too many open files".into(),
		libc::EMSGSIZE => "message too long".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENODEV => "no such device".into(),
		libc::ENOPROTOOPT => "protocol option not available".into(),
		libc::ENOTCONN => "not connected".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN | libc::EWOULDBLOCK => std::io::ErrorKind::WouldBlock,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENETUNREACH => std::io::ErrorKind::NetworkUnreachable,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		_ => std::io::ErrorKind::Other,
	}
}

impl From<SocketError> for std::io::Error {
	fn from(err: SocketError) -> Self {
		let errno = match &err {
			SocketError::Create { errno } => *errno,
			SocketError::Bind { errno, .. } => *errno,
			SocketError::Connect { errno, .. } => *errno,
			SocketError::SetOption { errno, .. } => *errno,
			SocketError::UnsupportedFamily { .. } => libc::EAFNOSUPPORT,
		};
		std::io::Error::new(errno_to_kind(errno), err)
	}
}

impl From<IoError> for std::io::Error {
	fn from(err: IoError) -> Self {
		let errno = match &err {
			IoError::Recv { errno } => *errno,
			IoError::Send { errno } => *errno,
		};
		std::io::Error::new(errno_to_kind(errno), err)
	}
}
