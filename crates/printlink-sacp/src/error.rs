//! Session-level error taxonomy.

use printlink_core::PacketError;

/// Errors a session operation can surface.
///
/// A read that times out with the operation deadline already reached is
/// reported as `Timeout`, never `Io`; callers only need to tell "the
/// printer went quiet" apart from "the transport broke".
#[derive(Debug, thiserror::Error)]
pub enum SacpError {
    /// The operation deadline passed before the printer answered.
    #[error("timeout exceeded")]
    Timeout,

    /// Transport failure other than a timeout.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The peer sent bytes that do not decode as an SACP frame. The session
    /// is broken once this surfaces; tear it down.
    #[error("malformed frame: {0}")]
    Packet(#[from] PacketError),

    /// A well-formed frame whose contents violate the exchange in progress.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}
