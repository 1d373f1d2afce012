//! SACP transport session — connect, command exchange, disconnect.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use printlink_core::packet::{put_prefixed, Packet, SACP_PORT};

use crate::error::SacpError;

/// Command-set for connection management.
pub const CMDSET_SYSTEM: u8 = 0x01;
/// Register this client as an uploader. The handshake waits for the echo.
pub const CMD_REGISTER: u8 = 0x05;
/// One-shot goodbye; no reply is awaited.
pub const CMD_UNREGISTER: u8 = 0x06;

/// Identity string the firmware accepts in an uploader registration.
const UPLOADER_IDENT: &str = "sm2uploader";

/// One live SACP connection.
///
/// Owns the stream, the next outgoing sequence number, and the configured
/// per-operation timeout. The sequence counter is per-session state; two
/// concurrent sessions never share it.
pub struct Session {
    stream: TcpStream,
    sequence: u16,
    timeout: Duration,
}

impl Session {
    /// Connect to the printer's SACP service and register as an uploader.
    ///
    /// Sends the registration packet, then reads frames until the firmware
    /// echoes the registration opcode. Unrelated frames are discarded; a
    /// frame that fails to decode aborts the handshake.
    pub async fn connect(host: &str, timeout: Duration) -> Result<Session, SacpError> {
        Self::connect_addr((host, SACP_PORT), timeout).await
    }

    /// Like [`connect`](Session::connect), but to an explicit address
    /// instead of the fixed service port.
    pub async fn connect_addr(
        addr: impl tokio::net::ToSocketAddrs,
        timeout: Duration,
    ) -> Result<Session, SacpError> {
        let deadline = Instant::now() + timeout;

        let stream = match timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(conn) => conn?,
            Err(_) => return Err(SacpError::Timeout),
        };

        let mut session = Session {
            stream,
            sequence: 1,
            timeout,
        };

        let hello = Packet {
            receiver_id: 2,
            sender_id: 0,
            attribute: 0,
            sequence: 1,
            command_set: CMDSET_SYSTEM,
            command_id: CMD_REGISTER,
            payload: register_payload(),
        };
        session.write_frame(&hello, deadline).await?;

        loop {
            let reply = read_frame(&mut session.stream, deadline).await?;
            if reply.command_set == CMDSET_SYSTEM && reply.command_id == CMD_REGISTER {
                break;
            }
            tracing::trace!(
                command_set = reply.command_set,
                command_id = reply.command_id,
                "frame discarded while waiting for registration echo"
            );
        }

        tracing::debug!("registered with printer");
        Ok(session)
    }

    /// The configured per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one command and wait for the printer to acknowledge it.
    ///
    /// The reply must match the outgoing sequence, command-set, and command
    /// id; anything else is protocol chatter and is discarded. A matching
    /// reply with the single success byte returns; a matching reply with any
    /// other payload means "not yet" and the wait continues. The whole
    /// exchange runs under a single deadline computed at entry; no read
    /// gets a fresh one.
    pub async fn send_command(
        &mut self,
        command_set: u8,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Result<(), SacpError> {
        let deadline = Instant::now() + self.timeout;
        let sequence = self.next_sequence();

        let command = Packet {
            receiver_id: 1,
            sender_id: 0,
            attribute: 0,
            sequence,
            command_set,
            command_id,
            payload,
        };
        self.write_frame(&command, deadline).await?;
        tracing::debug!(sequence, command_set, command_id, "command sent");

        loop {
            let reply = read_frame(&mut self.stream, deadline).await?;
            if reply.sequence == sequence
                && reply.command_set == command_set
                && reply.command_id == command_id
            {
                if reply.payload == [0] {
                    tracing::debug!(sequence, "command acknowledged");
                    return Ok(());
                }
                tracing::trace!(
                    sequence,
                    payload_len = reply.payload.len(),
                    "matching reply without success byte, still waiting"
                );
                continue;
            }
            tracing::trace!(
                sequence = reply.sequence,
                command_set = reply.command_set,
                command_id = reply.command_id,
                "unrelated frame discarded"
            );
        }
    }

    /// Notify the printer we are done. Fire-and-forget; closing the socket
    /// is the caller's business.
    pub async fn disconnect(&mut self) -> Result<(), SacpError> {
        let deadline = Instant::now() + self.timeout;
        let goodbye = Packet {
            receiver_id: 2,
            sender_id: 0,
            attribute: 0,
            sequence: 1,
            command_set: CMDSET_SYSTEM,
            command_id: CMD_UNREGISTER,
            payload: Vec::new(),
        };
        self.write_frame(&goodbye, deadline).await?;
        tracing::debug!("disconnect sent");
        Ok(())
    }

    /// Next outgoing sequence number. The handshake owns sequence 1, so the
    /// counter hands out 2, 3, … within this session.
    fn next_sequence(&mut self) -> u16 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    pub(crate) async fn write_frame(
        &mut self,
        packet: &Packet,
        deadline: Instant,
    ) -> Result<(), SacpError> {
        let bytes = packet.encode();
        match timeout_at(deadline, self.stream.write_all(&bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(normalize_io(e, deadline)),
            Err(_) => Err(SacpError::Timeout),
        }
    }

    pub(crate) async fn read_reply(&mut self, deadline: Instant) -> Result<Packet, SacpError> {
        read_frame(&mut self.stream, deadline).await
    }
}

/// Registration payload: length-prefixed client identity plus four reserved
/// zero bytes the firmware expects.
fn register_payload() -> Vec<u8> {
    let mut payload = Vec::with_capacity(UPLOADER_IDENT.len() + 6);
    put_prefixed(&mut payload, UPLOADER_IDENT.as_bytes());
    payload.extend_from_slice(&[0, 0, 0, 0]);
    payload
}

/// Read one SACP frame off the stream.
///
/// The length field sits in the first four bytes; the rest of the frame is
/// `length + 3` further bytes. Both reads share the caller's deadline.
async fn read_frame(stream: &mut TcpStream, deadline: Instant) -> Result<Packet, SacpError> {
    let mut head = [0u8; 4];
    read_exact_by(stream, &mut head, deadline).await?;

    let declared = u16::from_le_bytes([head[2], head[3]]) as usize;
    let mut frame = vec![0u8; declared + 7];
    frame[..4].copy_from_slice(&head);
    read_exact_by(stream, &mut frame[4..], deadline).await?;

    Ok(Packet::decode(&frame)?)
}

async fn read_exact_by(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<(), SacpError> {
    match timeout_at(deadline, stream.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(normalize_io(e, deadline)),
        Err(_) => Err(SacpError::Timeout),
    }
}

/// An I/O failure that is really the operation deadline expiring is reported
/// as `Timeout`; everything else stays `Io`.
fn normalize_io(err: std::io::Error, deadline: Instant) -> SacpError {
    use std::io::ErrorKind;
    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
        && Instant::now() >= deadline
    {
        return SacpError::Timeout;
    }
    SacpError::Io(err)
}
