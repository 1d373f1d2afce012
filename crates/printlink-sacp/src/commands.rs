//! Control commands the uploader can issue before a job: preheat and home.
//!
//! Each is a thin payload builder sent through the generic command exchange.

use crate::error::SacpError;
use crate::session::{Session, CMDSET_SYSTEM};

/// Command-set for tool (nozzle) control.
pub const CMDSET_TOOL: u8 = 0x10;
/// Command-set for bed control.
pub const CMDSET_BED: u8 = 0x14;
/// Set-temperature command id, shared by tool and bed command-sets.
pub const CMD_SET_TEMPERATURE: u8 = 0x02;
/// Home-all-axes command id in the system command-set.
pub const CMD_HOME: u8 = 0x35;

/// Payload for a tool set-temperature: sub-command, tool index, °C.
pub fn tool_temperature_payload(tool: u8, celsius: u16) -> Vec<u8> {
    let mut data = vec![0x08, tool];
    data.extend_from_slice(&celsius.to_le_bytes());
    data
}

/// Payload for a bed set-temperature: sub-command, zone index, °C.
pub fn bed_temperature_payload(zone: u8, celsius: u16) -> Vec<u8> {
    let mut data = vec![0x05, zone];
    data.extend_from_slice(&celsius.to_le_bytes());
    data
}

/// Payload for homing all axes.
pub fn home_payload() -> Vec<u8> {
    vec![0x00]
}

impl Session {
    /// Preheat one tool (nozzle). Tool indices start at 0.
    pub async fn set_tool_temperature(&mut self, tool: u8, celsius: u16) -> Result<(), SacpError> {
        self.send_command(
            CMDSET_TOOL,
            CMD_SET_TEMPERATURE,
            tool_temperature_payload(tool, celsius),
        )
        .await
    }

    /// Preheat one bed zone. Zone indices start at 0.
    pub async fn set_bed_temperature(&mut self, zone: u8, celsius: u16) -> Result<(), SacpError> {
        self.send_command(
            CMDSET_BED,
            CMD_SET_TEMPERATURE,
            bed_temperature_payload(zone, celsius),
        )
        .await
    }

    /// Home all axes.
    pub async fn home(&mut self) -> Result<(), SacpError> {
        self.send_command(CMDSET_SYSTEM, CMD_HOME, home_payload()).await
    }
}
