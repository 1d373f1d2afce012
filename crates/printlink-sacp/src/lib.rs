//! printlink-sacp — the SACP session engine.
//!
//! One `Session` owns one TCP connection to a printer controller and speaks
//! the request/await-reply exchange: connect + register handshake, generic
//! commands keyed by sequence number, the printer-paced chunked upload, and
//! the parting disconnect notification. Strictly one command in flight per
//! session; every operation is bounded by a single deadline computed at its
//! start.

pub mod commands;
pub mod error;
pub mod session;
pub mod upload;

pub use error::SacpError;
pub use session::Session;
pub use upload::Transfer;
