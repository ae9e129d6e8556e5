//! Minimal classic-pcap (not pcap-ng) writer for failed-frame dumps
//! (`-d`). Deliberately independent of the vendored pcap-ng block
//! reader: the two are different on-disk formats, though the
//! bounds-checked-write style is borrowed from it.

use std::fs::File;
use std::io::{self, Write};

const MAGIC: u32 = 0xA1B2C3D4;
const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;
const DLT_IEEE802_11_RADIO: u32 = 127;

pub struct PcapDumpWriter {
    file: File,
}

impl PcapDumpWriter {
    pub fn create(path: &str) -> io::Result<Self> {
        let mut file = File::create(path)?;
        let mut header = Vec::with_capacity(24);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION_MAJOR.to_le_bytes());
        header.extend_from_slice(&VERSION_MINOR.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes()); // thiszone
        header.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
        header.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
        header.extend_from_slice(&DLT_IEEE802_11_RADIO.to_le_bytes());
        file.write_all(&header)?;
        Ok(PcapDumpWriter { file })
    }

    /// Append one record. `ts_sec`/`ts_usec` are the capture timestamp;
    /// `orig_len` is the on-wire length before any snaplen truncation.
    pub fn write_frame(
        &mut self,
        ts_sec: u32,
        ts_usec: u32,
        orig_len: u32,
        data: &[u8],
    ) -> io::Result<()> {
        let mut rec = Vec::with_capacity(16 + data.len());
        rec.extend_from_slice(&ts_sec.to_le_bytes());
        rec.extend_from_slice(&ts_usec.to_le_bytes());
        rec.extend_from_slice(&(data.len() as u32).to_le_bytes());
        rec.extend_from_slice(&orig_len.to_le_bytes());
        rec.extend_from_slice(data);
        self.file.write_all(&rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_global_header_and_one_record() {
        let path = std::env::temp_dir().join("awdl_pcap_dump_test.pcap");
        let path_str = path.to_str().unwrap();
        {
            let mut w = PcapDumpWriter::create(path_str).unwrap();
            w.write_frame(1, 2, 4, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        }
        let mut buf = Vec::new();
        File::open(path_str).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 24 + 16 + 4);
        assert_eq!(&buf[0..4], &MAGIC.to_le_bytes());
        std::fs::remove_file(path_str).unwrap();
    }
}
