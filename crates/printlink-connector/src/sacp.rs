//! The SACP transport — preferred whenever the printer answers on port 8888.

use std::time::Duration;

use anyhow::{Context, Result};

use printlink_core::packet::SACP_PORT;
use printlink_sacp::Session;

use crate::payload::{Payload, Printer};
use crate::UPLOAD_TIMEOUT;

pub struct SacpConnector<'a> {
    printer: &'a Printer,
    timeout: Duration,
}

impl<'a> SacpConnector<'a> {
    pub fn new(printer: &'a Printer, timeout: Duration) -> Self {
        SacpConnector { printer, timeout }
    }

    pub async fn reachable(&self) -> bool {
        crate::ping(&self.printer.host, SACP_PORT).await
    }

    /// Connect, transfer the job, and let the session say goodbye (the
    /// transfer loop disconnects on completion).
    pub async fn upload(&self, payload: &Payload) -> Result<()> {
        let mut session = Session::connect(&self.printer.host, self.timeout)
            .await
            .with_context(|| format!("SACP handshake with {} failed", self.printer.host))?;

        session
            .upload(&payload.name, &payload.data, UPLOAD_TIMEOUT)
            .await
            .with_context(|| format!("SACP upload of {} failed", payload.name))
    }

    /// The preheat sequence over one session: tool 1, tool 2, bed (zones 0
    /// and 1), home — each only when requested.
    pub async fn preheat(&self, tool1: u16, tool2: u16, bed: u16, home: bool) -> Result<()> {
        let mut session = Session::connect(&self.printer.host, self.timeout)
            .await
            .with_context(|| format!("SACP handshake with {} failed", self.printer.host))?;

        if tool1 > 0 {
            tracing::info!(celsius = tool1, "preheating tool 1");
            session
                .set_tool_temperature(0, tool1)
                .await
                .context("set tool 1 temperature")?;
        }
        if tool2 > 0 {
            tracing::info!(celsius = tool2, "preheating tool 2");
            session
                .set_tool_temperature(1, tool2)
                .await
                .context("set tool 2 temperature")?;
        }
        if bed > 0 {
            tracing::info!(celsius = bed, "preheating bed");
            session
                .set_bed_temperature(0, bed)
                .await
                .context("set bed zone 0 temperature")?;
            session
                .set_bed_temperature(1, bed)
                .await
                .context("set bed zone 1 temperature")?;
        }
        if home {
            tracing::info!("homing axes");
            session.home().await.context("home axes")?;
        }

        session.disconnect().await.context("disconnect")?;
        Ok(())
    }
}
