//! printlink integration test harness.
//!
//! Every test here runs a mock printer on an ephemeral local port and
//! drives a real `Session` against it over TCP. The mock speaks the same
//! frame layout as the firmware: registration echo, sequence-matched
//! command replies, and the chunk-request side of the transfer protocol.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use printlink_core::packet::Packet;
use printlink_sacp::session::{CMDSET_SYSTEM, CMD_REGISTER, CMD_UNREGISTER};

mod http;

/// Generous bound for everything that is not a deliberate timeout test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Mock printer plumbing ─────────────────────────────────────────────────────

/// Read one frame the way the firmware does: 4-byte prefix, then the
/// declared remainder.
pub async fn read_frame(stream: &mut TcpStream) -> Result<Packet> {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.context("frame prefix")?;
    let declared = u16::from_le_bytes([head[2], head[3]]) as usize;
    let mut frame = vec![0u8; declared + 7];
    frame[..4].copy_from_slice(&head);
    stream
        .read_exact(&mut frame[4..])
        .await
        .context("frame body")?;
    Ok(Packet::decode(&frame)?)
}

pub async fn write_packet(stream: &mut TcpStream, packet: &Packet) -> Result<()> {
    stream.write_all(&packet.encode()).await?;
    Ok(())
}

/// Bind a listener for one mock printer.
pub async fn mock_listener() -> Result<(TcpListener, std::net::SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    Ok((listener, addr))
}

/// Accept one connection and run the registration handshake: verify the
/// register frame, then echo the opcode back.
pub async fn accept_and_register(listener: &TcpListener) -> Result<TcpStream> {
    let (mut stream, _) = listener.accept().await?;

    let hello = read_frame(&mut stream).await?;
    if hello.command_set != CMDSET_SYSTEM || hello.command_id != CMD_REGISTER {
        bail!(
            "expected registration, got {:#04x}/{:#04x}",
            hello.command_set,
            hello.command_id
        );
    }
    if &hello.payload[2..13] != b"sm2uploader" {
        bail!("registration payload missing client identity");
    }

    write_packet(
        &mut stream,
        &Packet {
            receiver_id: 0,
            sender_id: 2,
            attribute: 1,
            sequence: hello.sequence,
            command_set: CMDSET_SYSTEM,
            command_id: CMD_REGISTER,
            payload: Vec::new(),
        },
    )
    .await?;

    Ok(stream)
}

/// A reply that acknowledges `command` with the single success byte.
pub fn ack_packet(command: &Packet) -> Packet {
    Packet {
        receiver_id: command.sender_id,
        sender_id: command.receiver_id,
        attribute: 1,
        sequence: command.sequence,
        command_set: command.command_set,
        command_id: command.command_id,
        payload: vec![0],
    }
}

/// Assert that the next frame on the wire is the disconnect notification.
pub async fn expect_disconnect(stream: &mut TcpStream) -> Result<()> {
    let goodbye = read_frame(stream).await?;
    if goodbye.command_set != CMDSET_SYSTEM || goodbye.command_id != CMD_UNREGISTER {
        bail!(
            "expected disconnect, got {:#04x}/{:#04x}",
            goodbye.command_set,
            goodbye.command_id
        );
    }
    if !goodbye.payload.is_empty() {
        bail!("disconnect payload should be empty");
    }
    Ok(())
}
