use std::io::Read;

use anyhow::Context;
use clap::Parser;

use mcastdump::{
	McastAddr, McastSocket, MsgBuf, adjust_mtu, configure_listener, configure_sender, report,
};

/// Join an IPv4/IPv6 multicast group and dump every datagram together with
/// its ancillary metadata, or relay stdin into the group.
#[derive(Debug, Parser)]
#[command(version, about, after_help = "\
Examples:
  -g 224.0.0.251 -p 5353       IPv4 mDNS
  -g ff02::fb -p 5353          IPv6 mDNS
  -g 239.255.255.251 -p 10101  site-local debug group")]
struct Args {
	/// Multicast group to join or send to (numeric IP literal).
	#[arg(short, long, default_value = "239.255.255.251")]
	group: String,

	/// UDP port.
	#[arg(short, long, default_value_t = 10101, value_parser = clap::value_parser!(u16).range(1..))]
	port: u16,

	/// Listen for datagrams and report each one (default).
	#[arg(short, long, conflicts_with = "client")]
	listen: bool,

	/// Relay stdin to the group instead of listening.
	#[arg(short, long)]
	client: bool,

	/// Hop limit / TTL on outgoing datagrams (client mode).
	#[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..))]
	ttl: u8,

	/// IP-layer MTU bound, headers included (client mode).
	#[arg(short, long, default_value_t = 1500, value_parser = clap::value_parser!(u16).range(1..=1500))]
	mtu: u16,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
		.format_timestamp(None)
		.format_target(false)
		.init();

	let mut group = McastAddr::parse(&args.group)?;
	group.set_port(args.port).context("setting destination port")?;

	let mtu = adjust_mtu(args.mtu as usize, &group);
	log::info!("application-layer MTU: {mtu}");

	let mut sock = McastSocket::open(&group).context("creating socket")?;

	let client_mode = args.client && !args.listen;
	if client_mode {
		configure_sender(&mut sock, &group, args.ttl).context("configuring sender")?;
		log::info!("copying stdin to multicast {group}");
		run_client(&sock, mtu)
	} else {
		configure_listener(&mut sock, &group).context("configuring listener")?;
		log::info!("listening on {group}");
		run_listen(&sock)
	}
}

/// Blocks on the socket forever, one datagram at a time. A failed receive
/// is reported and the loop keeps going; one bad datagram must not kill a
/// long-running listener.
fn run_listen(sock: &McastSocket) -> anyhow::Result<()> {
	let mut msg = MsgBuf::new();
	loop {
		match sock.recv_msg(&mut msg) {
			Ok(rcvd) => println!("{}", report::describe(&msg, rcvd)),
			Err(err) => log::error!("{err}"),
		}
	}
}

/// Forwards stdin to the connected group until EOF. The buffer's peer stays
/// unspecified, so every send rides the connect() destination.
fn run_client(sock: &McastSocket, mtu: usize) -> anyhow::Result<()> {
	let mut msg = MsgBuf::new();
	let mut stdin = std::io::stdin().lock();
	loop {
		let consumed = stdin
			.read(&mut msg.payload_mut()[..mtu])
			.context("reading stdin")?;
		if consumed == 0 {
			return Ok(());
		}
		match sock.send_msg(&msg, consumed) {
			Ok(sent) => log::info!("sent {sent} bytes"),
			Err(err) => log::error!("{err}"),
		}
	}
}
