//! Chunked upload — the printer-paced file transfer.
//!
//! After the begin packet, the printer drives everything: it requests
//! chunks by index, in whatever order and at whatever rate it likes,
//! re-requesting freely. The client is purely reactive — a chunk request is
//! answered by slicing the requested index out of the payload, with no
//! notion of "next expected chunk".

use md5::{Digest, Md5};
use tokio::time::Instant;

use printlink_core::packet::{get_prefixed, put_prefixed, Packet, CHUNK_SIZE};

use crate::error::SacpError;
use crate::session::Session;

/// Command-set for file transfer.
pub const CMDSET_TRANSFER: u8 = 0xB0;
/// Begin-transfer announcement; the firmware also echoes it as an ack.
pub const CMD_BEGIN: u8 = 0x00;
/// Chunk request from the printer / chunk response from us.
pub const CMD_CHUNK: u8 = 0x01;
/// Transfer-complete notification from the printer.
pub const CMD_DONE: u8 = 0x02;

/// State for one transfer: the payload, its digest, and chunk bookkeeping.
pub struct Transfer<'a> {
    payload: &'a [u8],
    digest_hex: String,
    chunk_count: u16,
    last_served: Option<u16>,
}

impl<'a> Transfer<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Transfer {
            payload,
            digest_hex: hex::encode(Md5::digest(payload)),
            chunk_count: payload.len().div_ceil(CHUNK_SIZE) as u16,
            last_served: None,
        }
    }

    /// Total number of chunks: ceiling division of the payload by the fixed
    /// chunk size. The final chunk covers the remainder.
    pub fn chunk_count(&self) -> u16 {
        self.chunk_count
    }

    /// Hex-encoded MD5 of the whole payload. The firmware validates the
    /// transfer against this digest.
    pub fn digest_hex(&self) -> &str {
        &self.digest_hex
    }

    /// Index of the chunk most recently served, if any.
    pub fn last_served(&self) -> Option<u16> {
        self.last_served
    }

    /// The byte range for chunk `index`.
    ///
    /// Pure index-to-slice computation, independent of call order — the
    /// printer may skip around or ask for the same index twice.
    pub fn chunk(&self, index: u16) -> Result<&'a [u8], SacpError> {
        if index >= self.chunk_count {
            return Err(SacpError::Protocol("chunk index out of range"));
        }
        let start = index as usize * CHUNK_SIZE;
        if index == self.chunk_count - 1 {
            Ok(&self.payload[start..])
        } else {
            Ok(&self.payload[start..start + CHUNK_SIZE])
        }
    }

    /// Percentage complete after serving `index`.
    pub fn progress(&self, index: u16) -> f64 {
        f64::from(index + 1) / f64::from(self.chunk_count) * 100.0
    }

    fn served(&mut self, index: u16) {
        self.last_served = Some(index);
    }
}

impl Session {
    /// Transfer a job file to the printer.
    ///
    /// Announces the transfer, then answers the printer's chunk requests
    /// until it signals completion, at which point the session says goodbye
    /// and returns. The whole transfer shares one deadline computed here —
    /// a printer that stalls long enough surfaces `Timeout`.
    pub async fn upload(
        &mut self,
        filename: &str,
        payload: &[u8],
        timeout: std::time::Duration,
    ) -> Result<(), SacpError> {
        let deadline = Instant::now() + timeout;
        let mut transfer = Transfer::new(payload);

        let mut data = Vec::with_capacity(filename.len() + transfer.digest_hex().len() + 10);
        put_prefixed(&mut data, filename.as_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&transfer.chunk_count().to_le_bytes());
        put_prefixed(&mut data, transfer.digest_hex().as_bytes());

        let begin = Packet {
            receiver_id: 2,
            sender_id: 0,
            attribute: 0,
            sequence: 1,
            command_set: CMDSET_TRANSFER,
            command_id: CMD_BEGIN,
            payload: data,
        };
        self.write_frame(&begin, deadline).await?;
        tracing::info!(
            filename,
            bytes = payload.len(),
            chunks = transfer.chunk_count(),
            "transfer started"
        );

        loop {
            let reply = self.read_reply(deadline).await?;
            match (reply.command_set, reply.command_id) {
                (CMDSET_TRANSFER, CMD_BEGIN) => {
                    // begin ack from the firmware, nothing to answer
                }
                (CMDSET_TRANSFER, CMD_CHUNK) => {
                    self.serve_chunk(&mut transfer, &reply, deadline).await?;
                }
                (CMDSET_TRANSFER, CMD_DONE) if reply.payload == [0] => {
                    tracing::info!(filename, "transfer complete");
                    self.disconnect().await?;
                    return Ok(());
                }
                (CMDSET_TRANSFER, CMD_DONE) => {
                    // Observed firmware occasionally sends a completion frame
                    // with a junk payload; treated as noise, the wait goes on
                    // until a clean completion or the deadline.
                    tracing::warn!(
                        payload_len = reply.payload.len(),
                        "completion frame without success byte, ignoring"
                    );
                }
                _ => {
                    tracing::trace!(
                        command_set = reply.command_set,
                        command_id = reply.command_id,
                        "unrelated frame discarded during transfer"
                    );
                }
            }
        }
    }

    /// Answer one chunk request.
    ///
    /// Request payload: length-prefixed digest string, then the u16 chunk
    /// index. Response payload: success byte, length-prefixed digest, the
    /// index, and the length-prefixed chunk bytes. The response echoes the
    /// request's sequence with the reply attribute set.
    async fn serve_chunk(
        &mut self,
        transfer: &mut Transfer<'_>,
        request: &Packet,
        deadline: Instant,
    ) -> Result<(), SacpError> {
        let Some((_digest, next)) = get_prefixed(&request.payload, 0) else {
            return Err(SacpError::Protocol("chunk request too short"));
        };
        if request.payload.len() < next + 2 {
            return Err(SacpError::Protocol("chunk request missing index"));
        }
        let index = u16::from_le_bytes([request.payload[next], request.payload[next + 1]]);
        let chunk = transfer.chunk(index)?;

        let mut data = Vec::with_capacity(transfer.digest_hex().len() + chunk.len() + 7);
        data.push(0);
        put_prefixed(&mut data, transfer.digest_hex().as_bytes());
        data.extend_from_slice(&index.to_le_bytes());
        put_prefixed(&mut data, chunk);

        let response = Packet {
            receiver_id: 2,
            sender_id: 0,
            attribute: 1,
            sequence: request.sequence,
            command_set: CMDSET_TRANSFER,
            command_id: CMD_CHUNK,
            payload: data,
        };
        self.write_frame(&response, deadline).await?;
        transfer.served(index);

        tracing::info!(
            chunk = index,
            total = transfer.chunk_count(),
            "sending {:.1}%",
            transfer.progress(index)
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
