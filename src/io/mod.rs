//! Platform collaborator traits. The library only defines the
//! interfaces; the binary wires up concrete adapters
//! ([`pcap`](pcap_io)/[`tap`]/[`netlink`]) since everything here touches
//! an OS-specific surface the core protocol logic must not depend on.

use crate::channel::Chan;

pub mod rfc4291;

#[cfg(feature = "pcap-io")]
pub mod pcap_io;

#[cfg(feature = "pcap-io")]
pub mod pcap_dump;

#[cfg(target_os = "linux")]
pub mod tap;

#[cfg(feature = "linux-netlink")]
pub mod netlink;

/// Capture/inject of raw radiotap-prefixed 802.11 frames on the wireless
/// interface.
pub trait WlanIo {
    fn wlan_open(&mut self) -> Result<(), crate::error::StartupError>;
    /// Non-blocking: `Ok(None)` means no frame is ready right now.
    fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>>;
    fn send(&mut self, frame: &[u8]) -> Result<(), crate::error::TxError>;
    fn raw_fd(&self) -> std::os::unix::io::RawFd;
}

/// The TAP/host-facing Ethernet device.
pub trait HostIo {
    fn host_open(&mut self) -> Result<(), crate::error::StartupError>;
    fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>>;
    fn send(&mut self, frame: &[u8]) -> std::io::Result<()>;
    fn raw_fd(&self) -> std::os::unix::io::RawFd;
}

/// Platform radio control: monitor mode, channel switching, link state.
pub trait WlanControl {
    fn set_monitor_mode(&mut self, enabled: bool) -> Result<(), crate::error::StartupError>;
    fn set_channel(&mut self, chan: Chan) -> Result<(), crate::error::StartupError>;
    fn is_channel_available(&self, chan: Chan) -> bool;
    fn link_up(&mut self) -> std::io::Result<()>;
    fn link_down(&mut self) -> std::io::Result<()>;
}

/// Platform neighbor-cache control on the host interface, driven by
/// [`crate::peer::Callbacks`].
pub trait HostControl {
    fn neighbor_add(&mut self, addr: [u8; 6]);
    fn neighbor_remove(&mut self, addr: [u8; 6]);
}

/// No-op [`WlanControl`]/[`HostControl`], for platforms without a wired
/// adapter (non-Linux, or the `linux-netlink` feature disabled) and for
/// tests that don't exercise platform control.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullControl;

impl WlanControl for NullControl {
    fn set_monitor_mode(&mut self, _enabled: bool) -> Result<(), crate::error::StartupError> {
        Ok(())
    }
    fn set_channel(&mut self, _chan: Chan) -> Result<(), crate::error::StartupError> {
        Ok(())
    }
    fn is_channel_available(&self, _chan: Chan) -> bool {
        true
    }
    fn link_up(&mut self) -> std::io::Result<()> {
        Ok(())
    }
    fn link_down(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl HostControl for NullControl {
    fn neighbor_add(&mut self, _addr: [u8; 6]) {}
    fn neighbor_remove(&mut self, _addr: [u8; 6]) {}
}
