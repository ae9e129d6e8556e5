//! Linux TAP device, opened via raw `libc` ioctls. Grounded in the shape
//! of `original_source/daemon/io.c`'s TAP setup, not copied — that file's
//! remaining platform glue (ifreq/link state via ioctl SIOCSIFFLAGS)
//! stays in the binary, out of the library's core.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};

use crate::error::StartupError;
use crate::io::HostIo;

const IFF_TAP: i16 = 0x0002;
const IFF_NO_PI: i16 = 0x1000;
const TUNSETIFF: u64 = 0x4004_54ca;

#[repr(C)]
struct IfReq {
    name: [u8; libc::IFNAMSIZ],
    flags: i16,
    _pad: [u8; 22],
}

pub struct TapDevice {
    name: String,
    file: Option<File>,
}

impl TapDevice {
    pub fn new(name: impl Into<String>) -> Self {
        TapDevice { name: name.into(), file: None }
    }
}

impl HostIo for TapDevice {
    fn host_open(&mut self) -> Result<(), StartupError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/net/tun")
            .map_err(|e| StartupError::HostOpen(e.to_string()))?;

        let cname =
            CString::new(self.name.as_str()).map_err(|e| StartupError::HostOpen(e.to_string()))?;
        let mut req = IfReq { name: [0; libc::IFNAMSIZ], flags: IFF_TAP | IFF_NO_PI, _pad: [0; 22] };
        let bytes = cname.as_bytes_with_nul();
        req.name[..bytes.len().min(libc::IFNAMSIZ)]
            .copy_from_slice(&bytes[..bytes.len().min(libc::IFNAMSIZ)]);

        let rc = unsafe { libc::ioctl(file.as_raw_fd(), TUNSETIFF as _, &mut req) };
        if rc < 0 {
            return Err(StartupError::HostOpen(io::Error::last_os_error().to_string()));
        }

        // The event loop polls this fd before reading; without O_NONBLOCK
        // a read here would block the whole reactor.
        let flags = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETFL, 0) };
        if flags < 0
            || unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0
        {
            return Err(StartupError::HostOpen(io::Error::last_os_error().to_string()));
        }

        self.file = Some(file);
        Ok(())
    }

    fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        let file = self.file.as_mut().expect("host_open must be called first");
        let mut buf = vec![0u8; 65536];
        match file.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().expect("host_open must be called first");
        file.write_all(frame)
    }

    fn raw_fd(&self) -> RawFd {
        self.file.as_ref().expect("host_open must be called first").as_raw_fd()
    }
}
