//! Human-readable rendering of received datagrams.
//!
//! Consumes what the socket layer produced — a filled [`MsgBuf`] and its
//! byte count — and owns all formatting. Nothing here feeds back into
//! socket state.

use std::fmt::Write as _;

use crate::socket::{MsgBuf, interface_name};

const INDENT: &str = "  ";
const INDENT_DATA: &str = "    ";
const BYTES_PER_LINE: usize = 16;

/// Renders one received datagram: arrival timestamp, byte count, sender,
/// whatever ancillary metadata arrived, and a hex+ASCII payload dump.
pub fn describe(msg: &MsgBuf, rcvd: usize) -> String {
	let mut out = String::new();

	let now = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default();
	let _ = write!(out, "@{}.{:06}", now.as_secs(), now.subsec_micros());

	let _ = write!(out, "\nreceived {} bytes from {}", rcvd, msg.peer());

	let aux = msg.decode_ancillary();
	if let Some(hops) = aux.hoplimit {
		let _ = write!(out, "\n{INDENT}hops: {hops}");
	}
	if let Some(dscp) = aux.dscp {
		let _ = write!(out, "\n{INDENT}dscp: {dscp}");
	}
	if let Some(index) = aux.interface_index() {
		let name = interface_name(index).unwrap_or_else(|| "?".to_string());
		let _ = write!(out, "\n{INDENT}intf: {name} ({index})");
	}

	let payload = &msg.payload()[..rcvd.min(msg.payload().len())];
	for (i, chunk) in payload.chunks(BYTES_PER_LINE).enumerate() {
		if i == 0 {
			out.push('\n');
			out.push_str(INDENT);
			out.push_str("data:");
		}
		out.push('\n');

		// Bytes as lowercase hex, grouped in pairs, a wider gap every eight.
		out.push_str(INDENT_DATA);
		for j in 0..BYTES_PER_LINE {
			if j % 2 == 0 {
				out.push(' ');
			}
			if j % 8 == 0 {
				out.push(' ');
			}
			match chunk.get(j) {
				Some(byte) => {
					let _ = write!(out, "{:02x}", byte);
				}
				None => out.push_str("  "),
			}
		}

		// The same bytes where they look printable.
		out.push_str(INDENT_DATA);
		for (j, byte) in chunk.iter().enumerate() {
			if j % 2 == 0 {
				out.push(' ');
			}
			if j % 8 == 0 {
				out.push(' ');
			}
			out.push(if byte.is_ascii_graphic() {
				*byte as char
			} else {
				'.'
			});
		}
	}

	out.push('\n');
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn report_carries_count_sender_and_dump() {
		let mut msg = MsgBuf::new();
		msg.payload_mut()[..5].copy_from_slice(b"hello");

		let text = describe(&msg, 5);
		assert!(text.starts_with('@'));
		assert!(text.contains("received 5 bytes from (unknown address family)"));
		assert!(text.contains("data:"));
		assert!(text.contains("6865 6c6c 6f"), "hex column missing: {text}");
		assert!(text.contains("he ll o"), "ascii column missing: {text}");
	}

	#[test]
	fn unprintable_bytes_become_dots() {
		let mut msg = MsgBuf::new();
		msg.payload_mut()[..3].copy_from_slice(&[0x00, b'A', 0x7f]);

		let text = describe(&msg, 3);
		assert!(text.contains(".A ."), "got: {text}");
	}

	#[test]
	fn zero_byte_datagram_has_no_data_section() {
		let msg = MsgBuf::new();
		let text = describe(&msg, 0);
		assert!(text.contains("received 0 bytes"));
		assert!(!text.contains("data:"));
	}
}
