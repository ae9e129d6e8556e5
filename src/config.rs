//! Library-facing configuration, decoupled from `clap`. The binary
//! builds one of these from its parsed `Cli` struct.

use crate::channel::{Chan, OPCLASS_149, OPCLASS_44, OPCLASS_6};

#[derive(Debug, Clone)]
pub struct Config {
    pub wlan_interface: String,
    pub host_interface: String,
    pub channel: u8,
    pub dump_path: Option<String>,
    pub verbosity: u8,
    pub rssi_filter_enabled: bool,
    pub monitor_mode_enabled: bool,
    pub daemonize: bool,
    pub probe_target: Option<String>,
    pub hw_addr_override: Option<[u8; 6]>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            wlan_interface: String::new(),
            host_interface: "awdl0".to_string(),
            channel: 6,
            dump_path: None,
            verbosity: 0,
            rssi_filter_enabled: true,
            monitor_mode_enabled: true,
            daemonize: false,
            probe_target: None,
            hw_addr_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedChannel(pub u8);

impl std::fmt::Display for UnsupportedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported channel {}, expected one of 6, 44, 149", self.0)
    }
}

impl std::error::Error for UnsupportedChannel {}

impl Config {
    /// Map the configured channel number to a `Chan` with its default
    /// operating class, per the three channels the original daemon
    /// actually ships support for.
    pub fn master_channel(&self) -> Result<Chan, UnsupportedChannel> {
        match self.channel {
            6 => Ok(OPCLASS_6),
            44 => Ok(OPCLASS_44),
            149 => Ok(OPCLASS_149),
            other => Err(UnsupportedChannel(other)),
        }
    }
}
