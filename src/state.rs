//! Aggregate daemon state: the pieces C8/C9/C10 all read and mutate.

use crate::channel::{Chan, Encoding, Sequence, CHANSEQ_LENGTH};
use crate::election::ElectionState;
use crate::frame::pack_version;
use crate::peer::PeerTable;
use crate::sync::SyncState;

/// Default PSF interval while acting as master, in TU.
pub const PSF_INTERVAL_MASTER_TU: u16 = 110;
/// Default PSF interval while synced to another master, in TU.
pub const PSF_INTERVAL_SLAVE_TU: u16 = 440;

/// Advertised-in-TLV version, distinct from the wire action-frame version
/// (`AWDL_VERSION_COMPAT`).
pub const ADVERTISED_VERSION: u8 = pack_version(3, 4);

#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub tx_action: u64,
    pub tx_data: u64,
    pub tx_data_unicast: u64,
    pub tx_data_multicast: u64,
    pub rx_action: u64,
    pub rx_data: u64,
    pub rx_unknown: u64,
}

/// Everything the protocol logic needs: identity, the three coupled state
/// machines (sync/election/channel), the peer table, and statistics.
pub struct State {
    pub self_addr: [u8; 6],
    pub hostname: String,
    pub sync: SyncState,
    pub election: ElectionState,
    pub channel_encoding: Encoding,
    pub sequence: [Chan; CHANSEQ_LENGTH],
    pub current_channel: Chan,
    pub master_channel: Chan,
    pub devclass: u8,
    pub version: u8,
    pub peers: PeerTable,
    pub stats: Stats,
    pub rssi_filter_enabled: bool,
    pub append_fcs: bool,
}

impl State {
    pub fn new(self_addr: [u8; 6], master_channel: Chan, devclass: u8) -> Self {
        let sequence = Sequence::static_single(master_channel);
        State {
            self_addr,
            hostname: String::new(),
            sync: SyncState::new(),
            election: ElectionState::new(self_addr),
            channel_encoding: sequence.encoding,
            sequence: sequence.entries,
            current_channel: master_channel,
            master_channel,
            devclass,
            version: ADVERTISED_VERSION,
            peers: PeerTable::new(),
            stats: Stats::default(),
            rssi_filter_enabled: true,
            append_fcs: false,
        }
    }

    pub fn sequence(&self) -> Sequence {
        Sequence { encoding: self.channel_encoding, entries: self.sequence }
    }

    pub fn channel_num(&self, chan: Chan) -> u8 {
        chan.number
    }

    pub fn psf_interval_tu(&self) -> u16 {
        if self.election.is_sync_master(&self.self_addr) {
            PSF_INTERVAL_MASTER_TU
        } else {
            PSF_INTERVAL_SLAVE_TU
        }
    }
}
