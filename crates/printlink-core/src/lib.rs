//! printlink-core — SACP wire format, checksums, and configuration.
//! All other printlink crates depend on this one.

pub mod checksum;
pub mod config;
pub mod packet;

pub use packet::{Packet, PacketError};
