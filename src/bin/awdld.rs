//! AWDL daemon binary: CLI parsing, logging setup, daemonization, and
//! wiring the platform I/O adapters to the library's event loop.

use std::fs;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use awdl::config::Config;
use awdl::daemon::Daemon;
use awdl::io::{HostControl, HostIo, NullControl, WlanControl, WlanIo};
use awdl::state::State;

/// Dispatches to a real `nl80211` control path when available, falling
/// back to a no-op so the daemon still runs without root/netlink access.
#[cfg(feature = "linux-netlink")]
enum EitherControl {
    Netlink(awdl::io::netlink::NetlinkWlan),
    Null(NullControl),
}

#[cfg(feature = "linux-netlink")]
impl WlanControl for EitherControl {
    fn set_monitor_mode(&mut self, enabled: bool) -> Result<(), awdl::error::StartupError> {
        match self {
            EitherControl::Netlink(c) => c.set_monitor_mode(enabled),
            EitherControl::Null(c) => c.set_monitor_mode(enabled),
        }
    }
    fn set_channel(&mut self, chan: awdl::channel::Chan) -> Result<(), awdl::error::StartupError> {
        match self {
            EitherControl::Netlink(c) => c.set_channel(chan),
            EitherControl::Null(c) => c.set_channel(chan),
        }
    }
    fn is_channel_available(&self, chan: awdl::channel::Chan) -> bool {
        match self {
            EitherControl::Netlink(c) => c.is_channel_available(chan),
            EitherControl::Null(c) => c.is_channel_available(chan),
        }
    }
    fn link_up(&mut self) -> std::io::Result<()> {
        match self {
            EitherControl::Netlink(c) => c.link_up(),
            EitherControl::Null(c) => c.link_up(),
        }
    }
    fn link_down(&mut self) -> std::io::Result<()> {
        match self {
            EitherControl::Netlink(c) => c.link_down(),
            EitherControl::Null(c) => c.link_down(),
        }
    }
}

/// Mirrors `original_source/daemon/owl.c`'s getopt string
/// (`Dc:dvi:h:a:t:fN`): `-t`/`-a` are supplemental, accepted for
/// compatibility with the original CLI surface.
#[derive(Parser, Debug)]
#[command(name = "awdld", about = "Apple Wireless Direct Link daemon")]
struct Cli {
    /// Wireless interface to capture/inject on (or a savefile path for offline replay).
    #[arg(short = 'i', long = "interface")]
    interface: String,

    /// Host-facing TAP interface name.
    #[arg(short = 'h', long = "host-interface", default_value = "awdl0")]
    host_interface: String,

    /// Channel number: one of 6, 44, 149.
    #[arg(short = 'c', long = "channel", default_value_t = 6)]
    channel: u8,

    /// Dump failed/all frames to this classic-pcap file.
    #[arg(short = 'd', long = "dump")]
    dump: Option<String>,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable the RSSI admission filter.
    #[arg(short = 'f', long = "no-rssi-filter")]
    no_rssi_filter: bool,

    /// Skip configuring monitor mode on the wireless interface.
    #[arg(short = 'N', long = "no-monitor-mode")]
    no_monitor_mode: bool,

    /// Daemonize (double-fork, detach from the controlling terminal).
    #[arg(short = 'D', long = "daemonize")]
    daemonize: bool,

    /// Peer probe target, forwarded unchanged (out of scope for the core).
    #[arg(short = 't', long = "target")]
    target: Option<String>,

    /// Override the auto-detected wireless interface hardware address.
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            wlan_interface: self.interface,
            host_interface: self.host_interface,
            channel: self.channel,
            dump_path: self.dump,
            verbosity: self.verbose,
            rssi_filter_enabled: !self.no_rssi_filter,
            monitor_mode_enabled: !self.no_monitor_mode,
            daemonize: self.daemonize,
            probe_target: self.target,
            hw_addr_override: self.addr.as_deref().map(parse_hw_addr),
        }
    }
}

fn parse_hw_addr(s: &str) -> [u8; 6] {
    let mut out = [0u8; 6];
    for (i, byte) in s.splitn(6, ':').enumerate().take(6) {
        out[i] = u8::from_str_radix(byte, 16).unwrap_or(0);
    }
    out
}

fn verbosity_filter(v: u8) -> &'static str {
    match v {
        0 => "awdl=info",
        1 => "awdl=debug",
        _ => "awdl=trace",
    }
}

/// Resolves an interface name to its kernel ifindex via `if_nametoindex(3)`.
#[cfg(feature = "linux-netlink")]
fn nametoindex(interface: &str) -> Option<i32> {
    let cstr = std::ffi::CString::new(interface).ok()?;
    let idx = unsafe { libc::if_nametoindex(cstr.as_ptr()) };
    if idx == 0 {
        None
    } else {
        Some(idx as i32)
    }
}

/// Reads the wireless interface's hardware address from sysfs. Linux
/// only; matches `original_source/daemon/netutils.c`'s
/// `link_ether_addr_get` in spirit, not in mechanism.
fn read_sysfs_hwaddr(interface: &str) -> Option<[u8; 6]> {
    let path = format!("/sys/class/net/{interface}/address");
    let text = fs::read_to_string(path).ok()?;
    let text = text.trim();
    let mut out = [0u8; 6];
    for (i, byte) in text.splitn(6, ':').enumerate().take(6) {
        out[i] = u8::from_str_radix(byte, 16).ok()?;
    }
    Some(out)
}

/// Double-fork and detach, matching `original_source/daemon/owl.c`'s
/// daemonization. A handful of straight-line syscalls; not worth a
/// trait.
fn daemonize() -> std::io::Result<()> {
    unsafe {
        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _ => std::process::exit(0),
        }

        if libc::setsid() == -1 {
            return Err(std::io::Error::last_os_error());
        }

        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _ => std::process::exit(0),
        }

        libc::close(0);
        libc::close(1);
        libc::close(2);
        let devnull = std::ffi::CString::new("/dev/null").unwrap();
        let fd = libc::open(devnull.as_ptr(), libc::O_RDWR);
        if fd >= 0 {
            libc::dup2(fd, 0);
            libc::dup2(fd, 1);
            libc::dup2(fd, 2);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(cli.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config();

    if config.daemonize {
        if let Err(e) = daemonize() {
            error!(error = %e, "daemonization failed");
            std::process::exit(1);
        }
    }

    if let Err(e) = run(config) {
        error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), awdl::error::StartupError> {
    let master_channel = config
        .master_channel()
        .map_err(|e| awdl::error::StartupError::Platform(e.to_string()))?;

    let self_addr = config
        .hw_addr_override
        .or_else(|| read_sysfs_hwaddr(&config.wlan_interface))
        .ok_or_else(|| {
            awdl::error::StartupError::WlanOpen("could not determine hardware address".to_string())
        })?;

    let mut state = State::new(self_addr, master_channel, 1 /* macOS devclass */);
    state.hostname = gethostname();
    state.rssi_filter_enabled = config.rssi_filter_enabled;

    #[cfg(feature = "pcap-io")]
    let mut wlan = awdl::io::pcap_io::PcapWlan::new(config.wlan_interface.clone());

    #[cfg(target_os = "linux")]
    let mut host = awdl::io::tap::TapDevice::new(config.host_interface.clone());

    #[cfg(feature = "linux-netlink")]
    let mut wlan_control = match nametoindex(&config.wlan_interface).map(awdl::io::netlink::NetlinkWlan::open)
    {
        Some(Ok(ctrl)) => EitherControl::Netlink(ctrl),
        _ => EitherControl::Null(NullControl),
    };
    #[cfg(not(feature = "linux-netlink"))]
    let mut wlan_control = NullControl;

    if config.monitor_mode_enabled {
        wlan_control.set_monitor_mode(true)?;
    } else {
        info!("monitor mode configuration skipped (-N)");
    }

    wlan.wlan_open()?;
    host.host_open()?;

    if let Some(target) = &config.probe_target {
        warn!(target, "-t is accepted for compatibility but not implemented by the core");
    }

    #[cfg(feature = "linux-netlink")]
    if let Some(ifindex) = nametoindex(&config.host_interface) {
        let mut neighbors = awdl::io::netlink::NetlinkNeighbors::new(ifindex);
        let mut neighbors_rm = awdl::io::netlink::NetlinkNeighbors::new(ifindex);
        state.peers.callbacks.on_add = Box::new(move |p| neighbors.neighbor_add(p.addr));
        state.peers.callbacks.on_remove = Box::new(move |p| neighbors_rm.neighbor_remove(p.addr));
    }

    let mut daemon = Daemon::new(state, wlan, host, wlan_control);

    #[cfg(feature = "pcap-io")]
    if let Some(path) = &config.dump_path {
        let writer = awdl::io::pcap_dump::PcapDumpWriter::create(path)
            .map_err(|e| awdl::error::StartupError::Platform(e.to_string()))?;
        info!(path, "failed-frame dumping enabled");
        daemon = daemon.with_fail_dump(writer);
    }

    daemon.run().map_err(|e| awdl::error::StartupError::Platform(e.to_string()))?;
    Ok(())
}

fn gethostname() -> String {
    let mut buf = vec![0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return String::new();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}
