//! The HTTP fallback — a multipart upload endpoint some controllers expose
//! when the binary protocol is unavailable.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};

use crate::payload::{Payload, Printer};

/// Port of the controller's HTTP API.
pub const HTTP_PORT: u16 = 8080;

pub struct HttpConnector<'a> {
    printer: &'a Printer,
    client: reqwest::Client,
}

impl<'a> HttpConnector<'a> {
    pub fn new(printer: &'a Printer, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpConnector { printer, client })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.printer.host, HTTP_PORT, path)
    }

    /// Probe the status endpoint.
    pub async fn reachable(&self) -> bool {
        match self.client.get(self.url("/api/v1/status")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Multipart POST of the job file, with the API token as a form field.
    pub async fn upload(&self, payload: &Payload) -> Result<()> {
        let token = self.printer.token.clone().unwrap_or_default();
        let file = Part::stream(reqwest::Body::from(payload.data.clone()))
            .file_name(payload.name.clone());
        let form = Form::new().text("token", token).part("file", file);

        tracing::info!(file = %payload.name, bytes = payload.data.len(), "HTTP sending");

        let resp = self
            .client
            .post(self.url("/api/v1/upload"))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("HTTP upload to {} failed", self.printer.host))?;

        if !resp.status().is_success() {
            bail!("printer rejected the upload: HTTP {}", resp.status());
        }
        tracing::info!(file = %payload.name, "HTTP upload accepted");
        Ok(())
    }
}
