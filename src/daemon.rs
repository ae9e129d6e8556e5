//! Single-threaded cooperative event loop: a `libc::poll` reactor
//! plus a timer min-heap, matching `original_source/daemon/core.c`'s
//! `libev` shape (timer heap + backend poll call) without pulling in an
//! async runtime — see DESIGN.md.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cbuf::CircularBuffer;
use crate::channel::CHANSEQ_LENGTH;
use crate::election::Candidate;
use crate::error::RxOutcome;
use crate::frame::ActionSubtype;
use crate::io::{HostIo, WlanControl, WlanIo};
use crate::peer::{PEERS_DEFAULT_CLEAN_INTERVAL_US, PEERS_DEFAULT_TIMEOUT_US};
use crate::schedule::{can_send_in, can_send_unicast_in, is_multicast_eaw};
use crate::state::State;
use crate::sync::tu_to_usec;
use crate::tx;

const MCAST_QUEUE_CAPACITY: usize = 16;
const MCAST_GUARD_TU: u64 = 16;
const UNICAST_GUARD_TU: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerId {
    ChannelSwitch,
    Psf,
    Mif,
    UnicastTx,
    McastTx,
    PeerCleanup,
}

struct Timer {
    deadline: Instant,
    id: TimerId,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}
impl Eq for Timer {}
impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

/// Pending frame waiting for its unicast slot to drain, back-pressuring
/// further host reads while occupied.
struct UnicastSlot {
    dst: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

pub struct Daemon<W, H, C> {
    pub state: State,
    wlan: W,
    host: H,
    wlan_control: C,
    start: Instant,
    timers: BinaryHeap<Reverse<Timer>>,
    mcast_queue: CircularBuffer<Vec<u8>>,
    unicast_slot: Option<UnicastSlot>,
    tx_seq: u16,
    stats_pipe_read: Option<RawFd>,
    running: bool,
    #[cfg(feature = "pcap-io")]
    fail_dump: Option<crate::io::pcap_dump::PcapDumpWriter>,
}

impl<W: WlanIo, H: HostIo, C: WlanControl> Daemon<W, H, C> {
    pub fn new(state: State, wlan: W, host: H, wlan_control: C) -> Self {
        Daemon {
            state,
            wlan,
            host,
            wlan_control,
            start: Instant::now(),
            timers: BinaryHeap::new(),
            mcast_queue: CircularBuffer::new(MCAST_QUEUE_CAPACITY),
            unicast_slot: None,
            tx_seq: 0,
            stats_pipe_read: None,
            running: true,
            #[cfg(feature = "pcap-io")]
            fail_dump: None,
        }
    }

    /// Wire up the self-pipe a `SIGUSR1` handler writes to; `fd` is the
    /// read end. A real binary installs the handler with `libc::signal`
    /// and `write`s one byte to the paired fd — signal-safe because it's
    /// the only thing the handler does.
    pub fn with_stats_pipe(mut self, fd: RawFd) -> Self {
        self.stats_pipe_read = Some(fd);
        self
    }

    /// Dump every frame that fails to parse to `writer` (`-d`), for
    /// postmortem analysis.
    #[cfg(feature = "pcap-io")]
    pub fn with_fail_dump(mut self, writer: crate::io::pcap_dump::PcapDumpWriter) -> Self {
        self.fail_dump = Some(writer);
        self
    }

    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn arm(&mut self, id: TimerId, delay: Duration) {
        self.timers.push(Reverse(Timer { deadline: Instant::now() + delay, id }));
    }

    fn arm_secs(&mut self, id: TimerId, delay_secs: f64) {
        let micros = (delay_secs.max(0.0) * 1_000_000.0) as u64;
        self.arm(id, Duration::from_micros(micros));
    }

    pub fn start_timers(&mut self) {
        let now = self.now_us();
        self.arm_secs(TimerId::ChannelSwitch, self.state.sync.next_aw_us(now) as f64 / 1e6);
        self.arm(TimerId::Psf, Duration::from_micros(tu_to_usec(self.state.psf_interval_tu() as u64)));
        self.arm_secs(TimerId::Mif, next_mif_delay_secs(&self.state, now));
        self.arm(TimerId::PeerCleanup, Duration::from_micros(PEERS_DEFAULT_CLEAN_INTERVAL_US));
        self.arm_secs(TimerId::UnicastTx, 1.0);
        self.arm_secs(TimerId::McastTx, 1.0);
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.start_timers();
        while self.running {
            self.poll_once()?;
        }
        Ok(())
    }

    fn poll_once(&mut self) -> io::Result<()> {
        let timeout_ms = self
            .timers
            .peek()
            .map(|Reverse(t)| t.deadline.saturating_duration_since(Instant::now()).as_millis() as i32)
            .unwrap_or(1000)
            .max(0);

        let wlan_fd = self.wlan.raw_fd();
        let host_fd = self.host.raw_fd();
        let mut fds = vec![
            libc::pollfd { fd: wlan_fd, events: libc::POLLIN, revents: 0 },
            libc::pollfd { fd: host_fd, events: libc::POLLIN, revents: 0 },
        ];
        if let Some(pipe_fd) = self.stats_pipe_read {
            fds.push(libc::pollfd { fd: pipe_fd, events: libc::POLLIN, revents: 0 });
        }

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        if fds[0].revents & libc::POLLIN != 0 {
            self.on_wlan_readable()?;
        }
        if fds[1].revents & libc::POLLIN != 0 {
            self.on_host_readable()?;
        }
        if fds.len() > 2 && fds[2].revents & libc::POLLIN != 0 {
            self.drain_stats_pipe();
            self.dump_stats();
        }

        self.fire_due_timers();
        Ok(())
    }

    fn drain_stats_pipe(&mut self) {
        if let Some(fd) = self.stats_pipe_read {
            let mut buf = [0u8; 64];
            unsafe {
                libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len());
            }
        }
    }

    fn dump_stats(&self) {
        info!(
            tx_action = self.state.stats.tx_action,
            tx_data = self.state.stats.tx_data,
            tx_data_unicast = self.state.stats.tx_data_unicast,
            tx_data_multicast = self.state.stats.tx_data_multicast,
            rx_action = self.state.stats.rx_action,
            rx_data = self.state.stats.rx_data,
            rx_unknown = self.state.stats.rx_unknown,
            "stats"
        );
    }

    fn fire_due_timers(&mut self) {
        let now = Instant::now();
        while let Some(Reverse(t)) = self.timers.peek() {
            if t.deadline > now {
                break;
            }
            let Reverse(timer) = self.timers.pop().unwrap();
            self.fire_timer(timer.id);
        }
    }

    fn fire_timer(&mut self, id: TimerId) {
        match id {
            TimerId::ChannelSwitch => self.on_channel_switch(),
            TimerId::Psf => self.on_psf(),
            TimerId::Mif => self.on_mif(),
            TimerId::UnicastTx => self.on_unicast_tx(),
            TimerId::McastTx => self.on_mcast_tx(),
            TimerId::PeerCleanup => self.on_peer_cleanup(),
        }
    }

    fn on_channel_switch(&mut self) {
        let now = self.now_us();
        let slot = (self.state.sync.current_eaw(now) as usize) % CHANSEQ_LENGTH;
        let want = self.state.sequence().channel_num(slot);
        if want != 0 && want != self.state.current_channel.number {
            let chan = self.state.sequence().entries[slot];
            // `is_channel_available` is advisory only: ask the platform,
            // log if it says no, but attempt the switch regardless (the
            // sequence is what peers expect us on).
            if !self.wlan_control.is_channel_available(chan) {
                debug!(channel = chan.number, "platform reports channel unavailable, switching anyway");
            }
            if let Err(e) = self.wlan_control.set_channel(chan) {
                warn!(error = %e, "channel switch failed");
            } else {
                self.state.current_channel = chan;
            }
        }
        self.arm_secs(TimerId::ChannelSwitch, self.state.sync.next_aw_us(now) as f64 / 1e6);
    }

    fn on_psf(&mut self) {
        let now = self.now_us();
        let frame = tx::build_action_frame(&self.state, ActionSubtype::Psf, BROADCAST, now);
        self.inject(&frame);
        self.state.stats.tx_action += 1;
        self.arm(TimerId::Psf, Duration::from_micros(tu_to_usec(self.state.psf_interval_tu() as u64)));
    }

    fn on_mif(&mut self) {
        let now = self.now_us();
        if self.state.channel_num(self.state.current_channel) != 0 {
            let frame = tx::build_action_frame(&self.state, ActionSubtype::Mif, BROADCAST, now);
            self.inject(&frame);
            self.state.stats.tx_action += 1;
        }
        self.arm_secs(TimerId::Mif, next_mif_delay_secs(&self.state, now));
    }

    fn on_unicast_tx(&mut self) {
        let now = self.now_us();
        let Some(slot) = &self.unicast_slot else {
            self.arm_secs(TimerId::UnicastTx, 1.0);
            return;
        };
        let dst = slot.dst;
        let Some(peer) = self.state.peers.get(&dst) else {
            self.unicast_slot = None;
            self.arm_secs(TimerId::UnicastTx, 1.0);
            return;
        };
        let gate = can_send_unicast_in(&self.state, now, peer, UNICAST_GUARD_TU);
        if gate <= 0.0 {
            let UnicastSlot { dst, ethertype, payload } = self.unicast_slot.take().unwrap();
            let seq = self.next_seq();
            let frame =
                tx::build_data_frame(&self.state, dst, self.state.self_addr, ethertype, &payload, seq);
            self.inject(&frame);
            self.state.stats.tx_data += 1;
            self.state.stats.tx_data_unicast += 1;
            self.arm_secs(TimerId::UnicastTx, 1.0);
        } else {
            self.arm_secs(TimerId::UnicastTx, gate);
        }
    }

    fn on_mcast_tx(&mut self) {
        let now = self.now_us();
        if is_multicast_eaw(&self.state, now) && can_send_in(&self.state, now, MCAST_GUARD_TU) <= 0.0 {
            if let Some(frame) = self.mcast_queue.get() {
                self.inject(&frame);
                self.state.stats.tx_data += 1;
                self.state.stats.tx_data_multicast += 1;
            }
            self.arm_secs(TimerId::McastTx, 1.0);
        } else {
            let delay = can_send_in(&self.state, now, MCAST_GUARD_TU).abs().max(0.001);
            self.arm_secs(TimerId::McastTx, delay);
        }
    }

    fn on_peer_cleanup(&mut self) {
        let now = self.now_us();
        let before = now.saturating_sub(PEERS_DEFAULT_TIMEOUT_US);
        self.state.peers.remove_expired(before);
        let candidates: Vec<Candidate> = self
            .state
            .peers
            .valid_iter()
            .map(|p| Candidate {
                self_addr: p.addr,
                sync_addr: p.election.sync_addr,
                master_addr: p.election.master_addr,
                height: p.election.height as u8,
                master_metric: p.election.master_metric,
                master_counter: p.election.master_counter,
            })
            .collect();
        crate::election::run(&mut self.state.election, &candidates);
        self.arm(TimerId::PeerCleanup, Duration::from_micros(PEERS_DEFAULT_CLEAN_INTERVAL_US));
    }

    fn inject(&mut self, frame: &[u8]) {
        if let Err(e) = self.wlan.send(frame) {
            warn!(error = %e, "wlan injection failed");
        }
    }

    fn next_seq(&mut self) -> u16 {
        let s = self.tx_seq;
        self.tx_seq = self.tx_seq.wrapping_add(1);
        s
    }

    fn on_wlan_readable(&mut self) -> io::Result<()> {
        if let Some(raw) = self.wlan.recv()? {
            let now = self.now_us();
            let mut out = Vec::new();
            match crate::rx::receive(&mut self.state, &raw, now, &mut out) {
                RxOutcome::Action => self.state.stats.rx_action += 1,
                RxOutcome::Data => self.state.stats.rx_data += 1,
                RxOutcome::Benign(_) => {}
                RxOutcome::WireError(e) => {
                    debug!(error = %e, "rx wire error");
                    self.state.stats.rx_unknown += 1;
                    #[cfg(feature = "pcap-io")]
                    if let Some(dump) = self.fail_dump.as_mut() {
                        let ts_sec = (now / 1_000_000) as u32;
                        let ts_usec = (now % 1_000_000) as u32;
                        if let Err(e) = dump.write_frame(ts_sec, ts_usec, raw.len() as u32, &raw) {
                            warn!(error = %e, "failed-frame dump write failed");
                        }
                    }
                }
            }
            for (dst, src, ethertype, payload) in out {
                let mut eth = Vec::with_capacity(14 + payload.len());
                eth.extend_from_slice(&dst);
                eth.extend_from_slice(&src);
                eth.extend_from_slice(&ethertype.to_be_bytes());
                eth.extend_from_slice(&payload);
                if let Err(e) = self.host.send(&eth) {
                    warn!(error = %e, "host injection failed");
                }
            }
        }
        Ok(())
    }

    fn on_host_readable(&mut self) -> io::Result<()> {
        loop {
            if self.unicast_slot.is_some() && self.mcast_queue.is_full() {
                break;
            }
            let Some(frame) = self.host.recv()? else { break };
            if frame.len() < 14 {
                continue;
            }
            let dst: [u8; 6] = frame[0..6].try_into().unwrap();
            let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
            let payload = frame[14..].to_vec();

            if dst[0] & 0x01 != 0 {
                if self.mcast_queue.is_full() {
                    continue;
                }
                let seq = self.next_seq();
                let wire =
                    tx::build_data_frame(&self.state, dst, self.state.self_addr, ethertype, &payload, seq);
                let _ = self.mcast_queue.put_strict(wire);
                self.arm(TimerId::McastTx, Duration::from_micros(0));
            } else if self.unicast_slot.is_none() {
                self.unicast_slot = Some(UnicastSlot { dst, ethertype, payload });
                self.arm(TimerId::UnicastTx, Duration::from_micros(0));
            } else {
                break;
            }
        }
        Ok(())
    }
}

const BROADCAST: [u8; 6] = [0xFF; 6];

fn next_mif_delay_secs(state: &State, now_us: u64) -> f64 {
    let next_aw = state.sync.next_aw_us(now_us);
    let half_eaw = tu_to_usec(state.sync.eaw_len_tu() / 2);
    (next_aw + half_eaw) as f64 / 1e6
}
