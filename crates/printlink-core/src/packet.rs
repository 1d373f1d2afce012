//! SACP wire format — the frame layout every exchange uses.
//!
//! These offsets ARE the protocol; the printer firmware is byte-exact about
//! them. All multi-byte integers are little-endian.
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 1    | marker `0xAA`                          |
//! | 1      | 1    | marker `0x55`                          |
//! | 2      | 2    | length = payload + 8                   |
//! | 4      | 1    | protocol version `0x01`                |
//! | 5      | 1    | receiver id                            |
//! | 6      | 1    | header checksum over bytes [0, 6)      |
//! | 7      | 1    | sender id                              |
//! | 8      | 1    | attribute                              |
//! | 9      | 2    | sequence                               |
//! | 11     | 1    | command-set                            |
//! | 12     | 1    | command id                             |
//! | 13     | N    | payload                                |
//! | 13+N   | 2    | body checksum over bytes [7, 13+N)     |
//!
//! Total wire size: 15 + N.

use crate::checksum::{body_checksum, head_checksum};

// ── Constants ─────────────────────────────────────────────────────────────────

/// First frame marker byte.
pub const MARKER_A: u8 = 0xAA;

/// Second frame marker byte.
pub const MARKER_B: u8 = 0x55;

/// Wire protocol version. The firmware speaks exactly one.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// TCP port the printer's SACP service listens on.
pub const SACP_PORT: u16 = 8888;

/// Upload chunk size in bytes. Fixed by the firmware; the final chunk of a
/// transfer is the (shorter) remainder.
pub const CHUNK_SIZE: usize = 60 * 1024;

/// Maximum payload length the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - 8;

/// Smallest byte count `decode` will look at. Anything shorter cannot even
/// hold the fixed header fields.
pub const MIN_WIRE_SIZE: usize = 13;

// ── Packet ────────────────────────────────────────────────────────────────────

/// One SACP frame.
///
/// Constructed per command or response, encoded for transmission or decoded
/// from a read buffer, and discarded once the caller has reacted to it.
/// Decoding always produces an owned packet; nothing aliases the read
/// buffer afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub receiver_id: u8,
    pub sender_id: u8,
    pub attribute: u8,
    pub sequence: u16,
    pub command_set: u8,
    pub command_id: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Serialize to the wire layout above.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(self.payload.len() <= MAX_PAYLOAD);

        let mut out = vec![0u8; 15 + self.payload.len()];
        out[0] = MARKER_A;
        out[1] = MARKER_B;
        out[2..4].copy_from_slice(&((self.payload.len() + 8) as u16).to_le_bytes());
        out[4] = PROTOCOL_VERSION;
        out[5] = self.receiver_id;
        out[6] = head_checksum(&out[..6]);
        out[7] = self.sender_id;
        out[8] = self.attribute;
        out[9..11].copy_from_slice(&self.sequence.to_le_bytes());
        out[11] = self.command_set;
        out[12] = self.command_id;
        out[13..13 + self.payload.len()].copy_from_slice(&self.payload);

        let chk = body_checksum(&out[7..], self.payload.len() + 6);
        let end = out.len();
        out[end - 2..].copy_from_slice(&chk.to_le_bytes());
        out
    }

    /// Parse one complete frame.
    ///
    /// The buffer must hold exactly one frame: the declared length field has
    /// to match the buffer size. Any mismatch is surfaced to the caller; a
    /// malformed frame mid-session means the session is broken.
    pub fn decode(data: &[u8]) -> Result<Packet, PacketError> {
        if data.len() < MIN_WIRE_SIZE {
            return Err(PacketError::InvalidSize);
        }
        if data[0] != MARKER_A || data[1] != MARKER_B {
            return Err(PacketError::InvalidFraming);
        }
        let declared = u16::from_le_bytes([data[2], data[3]]) as usize;
        if declared != data.len() - 7 || declared < 8 {
            return Err(PacketError::InvalidSize);
        }
        if data[4] != PROTOCOL_VERSION {
            return Err(PacketError::VersionMismatch(data[4]));
        }
        if head_checksum(&data[..6]) != data[6] {
            return Err(PacketError::ChecksumMismatch);
        }
        let trailer = u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]);
        if trailer != body_checksum(&data[7..], declared - 2) {
            return Err(PacketError::ChecksumMismatch);
        }

        Ok(Packet {
            receiver_id: data[5],
            sender_id: data[7],
            attribute: data[8],
            sequence: u16::from_le_bytes([data[9], data[10]]),
            command_set: data[11],
            command_id: data[12],
            payload: data[13..data.len() - 2].to_vec(),
        })
    }
}

// ── Length-prefixed fields ────────────────────────────────────────────────────

/// Append a u16-LE length prefix followed by the bytes themselves.
///
/// SACP payloads carry strings and byte runs in this form (filename, hex
/// digest, chunk data).
pub fn put_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// Read a u16-LE length-prefixed run starting at `offset`.
///
/// Returns the run and the offset just past it, or `None` if the buffer is
/// too short for either the prefix or the run it declares.
pub fn get_prefixed(buf: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let end = offset.checked_add(2)?;
    if buf.len() < end {
        return None;
    }
    let len = u16::from_le_bytes([buf[offset], buf[offset + 1]]) as usize;
    let run_end = end.checked_add(len)?;
    if buf.len() < run_end {
        return None;
    }
    Some((&buf[end..run_end], run_end))
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("not an SACP frame: bad marker bytes")]
    InvalidFraming,

    #[error("unsupported SACP version: 0x{0:02x}")]
    VersionMismatch(u8),

    #[error("checksum does not match frame contents")]
    ChecksumMismatch,

    #[error("frame length does not match its contents")]
    InvalidSize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
