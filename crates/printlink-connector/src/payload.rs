//! Target printer and job payload types.

use anyhow::{bail, Result};
use bytes::Bytes;

/// Smallest payload worth sending.
pub const FILE_SIZE_MIN: u64 = 1;

/// Largest payload the firmware accepts: 2 GiB.
pub const FILE_SIZE_MAX: u64 = 2 << 30;

/// A target printer controller.
///
/// Discovery, registry persistence, and token acquisition all happen
/// elsewhere; this is just the address material a transport needs.
#[derive(Debug, Clone, Default)]
pub struct Printer {
    /// Host name or IP address.
    pub host: String,
    /// Model name, when known. Informational only.
    pub model: Option<String>,
    /// API token for the HTTP endpoint. Opaque.
    pub token: Option<String>,
}

impl Printer {
    pub fn new(host: impl Into<String>) -> Self {
        Printer {
            host: host.into(),
            ..Printer::default()
        }
    }
}

/// A job file to upload: a name and opaque bytes.
///
/// Any post-processing of the bytes happens before they get here.
#[derive(Debug, Clone)]
pub struct Payload {
    pub name: String,
    pub data: Bytes,
}

impl Payload {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Payload {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Enforce the firmware's size bounds before any transport is tried.
    pub fn validate(&self) -> Result<()> {
        let size = self.data.len() as u64;
        if size < FILE_SIZE_MIN {
            bail!("file {} is empty", self.name);
        }
        if size > FILE_SIZE_MAX {
            bail!("file {} is too large ({} bytes)", self.name, size);
        }
        Ok(())
    }
}
