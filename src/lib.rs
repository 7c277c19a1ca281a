pub mod socket;
mod addr;
mod error;
pub mod report;

pub use self::addr::{McastAddr, SocketAddrV4, SocketAddrV6};
pub use self::error::{AddrError, IoError, SocketError, errno};
pub use self::socket::{
	Ancillary, McastSocket, MsgBuf, PAYLOAD_CAPACITY, adjust_mtu, configure_listener,
	configure_sender, interface_name,
};
