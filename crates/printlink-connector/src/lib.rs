//! printlink-connector — routes a job to the first transport the printer
//! answers on.
//!
//! SACP (the binary protocol on port 8888) is tried first; the
//! HTTP-multipart endpoint is the fallback. Preheat commands exist only on
//! SACP.

mod http;
mod payload;
mod sacp;

pub use http::{HttpConnector, HTTP_PORT};
pub use payload::{Payload, Printer, FILE_SIZE_MAX, FILE_SIZE_MIN};
pub use sacp::SacpConnector;

use std::time::Duration;

use anyhow::{bail, Result};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// How long a reachability probe may take.
const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for one whole chunked upload. The printer paces the transfer,
/// so this is deliberately generous.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// TCP dial probe — can we open `host:port` at all?
pub(crate) async fn ping(host: &str, port: u16) -> bool {
    matches!(
        timeout(PING_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Upload one job to the printer over whichever transport answers.
///
/// `timeout` bounds connect and command exchanges; the chunk transfer
/// itself runs under [`UPLOAD_TIMEOUT`].
pub async fn upload(printer: &Printer, payload: &Payload, timeout: Duration) -> Result<()> {
    payload.validate()?;

    let sacp = SacpConnector::new(printer, timeout);
    if sacp.reachable().await {
        tracing::info!(host = %printer.host, "uploading over SACP");
        return sacp.upload(payload).await;
    }

    let http = HttpConnector::new(printer, timeout)?;
    if http.reachable().await {
        tracing::info!(host = %printer.host, "uploading over HTTP");
        return http.upload(payload).await;
    }

    bail!("printer {} is not available", printer.host)
}

/// Run the preheat sequence: tool temperatures, bed temperature (both
/// zones), and homing — each only when requested. One SACP session covers
/// the whole sequence.
pub async fn preheat(
    printer: &Printer,
    tool1: u16,
    tool2: u16,
    bed: u16,
    home: bool,
    timeout: Duration,
) -> Result<()> {
    let sacp = SacpConnector::new(printer, timeout);
    if !sacp.reachable().await {
        bail!(
            "printer {} does not answer on the SACP port; preheat needs the binary protocol",
            printer.host
        );
    }
    sacp.preheat(tool1, tool2, bed, home).await
}
