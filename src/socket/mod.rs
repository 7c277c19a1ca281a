mod mcast;
mod msg;
mod multicast;
mod options;

pub use self::mcast::McastSocket;
pub use self::msg::{
	Ancillary, CONTROL_CAPACITY, MSG_CAPACITY, MsgBuf, PAYLOAD_CAPACITY, adjust_mtu,
	interface_name,
};
pub use self::multicast::{configure_listener, configure_sender};
pub use self::options::{
	join_group, join_group_v6, leave_group, leave_group_v6, set_multicast_hops,
	set_multicast_loop, set_multicast_loop_v6, set_multicast_ttl, set_recv_hoplimit,
	set_recv_pktinfo, set_recv_pktinfo_v6, set_recv_tclass, set_recv_tos, set_recv_ttl,
	set_reuse_addr, set_reuse_port, set_v6only,
};
#[cfg(target_os = "linux")]
pub use self::options::{set_multicast_all, set_multicast_all_v6};
