//! Peer table keyed by hardware address.

use crate::channel::{Chan, CHANSEQ_LENGTH};
use std::collections::HashMap;

pub const HOST_NAME_LENGTH_MAX: usize = 64;
pub const PEERS_DEFAULT_TIMEOUT_US: u64 = 2_000_000;
pub const PEERS_DEFAULT_CLEAN_INTERVAL_US: u64 = 1_000_000;

/// A peer's self-reported election snapshot, copied out of its last
/// election-parameters TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerElection {
    pub master_addr: [u8; 6],
    pub sync_addr: [u8; 6],
    pub height: u32,
    pub master_metric: u32,
    pub master_counter: u32,
}

#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: [u8; 6],
    pub last_update: u64,
    pub election: PeerElection,
    pub sequence: [Chan; CHANSEQ_LENGTH],
    pub sync_offset: i64,
    pub name: String,
    pub country_code: [u8; 2],
    pub infra_addr: Option<[u8; 6]>,
    pub version: u8,
    pub devclass: u8,
    pub supports_v2: bool,
    pub sent_mif: bool,
    pub is_valid: bool,
}

impl Peer {
    fn new(addr: [u8; 6], now: u64) -> Self {
        Peer {
            addr,
            last_update: now,
            election: PeerElection::default(),
            sequence: [Chan::default(); CHANSEQ_LENGTH],
            sync_offset: 0,
            name: String::new(),
            country_code: [0; 2],
            infra_addr: None,
            version: 0,
            devclass: 0,
            supports_v2: false,
            sent_mif: false,
            is_valid: false,
        }
    }

    fn recompute_validity(&self) -> bool {
        self.sent_mif && self.devclass != 0 && self.version != 0
    }
}

/// Whether `add` created a new peer record or only bumped an existing
/// one's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    New,
    Updated,
}

/// Hooks into an external neighbor-cache collaborator: `on_add` fires on
/// a peer's false→true validity transition, `on_remove` fires when an
/// already-valid peer is removed (by timeout or explicitly).
pub struct Callbacks {
    pub on_add: Box<dyn FnMut(&Peer)>,
    pub on_remove: Box<dyn FnMut(&Peer)>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Callbacks { on_add: Box::new(|_| {}), on_remove: Box::new(|_| {}) }
    }
}

#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<[u8; 6], Peer>,
    pub callbacks: Callbacks,
}

impl PeerTable {
    pub fn new() -> Self {
        PeerTable::default()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Insert a new peer, or bump `last_update` on an existing one, then
    /// re-check the validity predicate and fire `on_add` on a false→true
    /// transition.
    pub fn add(&mut self, addr: [u8; 6], now: u64) -> AddOutcome {
        let outcome = if let Some(p) = self.peers.get_mut(&addr) {
            p.last_update = now;
            AddOutcome::Updated
        } else {
            self.peers.insert(addr, Peer::new(addr, now));
            AddOutcome::New
        };

        let became_valid = {
            let p = self.peers.get_mut(&addr).unwrap();
            let was_valid = p.is_valid;
            let now_valid = p.recompute_validity();
            p.is_valid = now_valid;
            !was_valid && now_valid
        };
        if became_valid {
            (self.callbacks.on_add)(self.peers.get(&addr).unwrap());
        }
        outcome
    }

    pub fn get(&self, addr: &[u8; 6]) -> Option<&Peer> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &[u8; 6]) -> Option<&mut Peer> {
        self.peers.get_mut(addr)
    }

    /// Re-check the validity predicate for a peer already present and
    /// mutated in place by the caller, firing `on_add` on a false→true
    /// transition. Used after TLVs that set `devclass`/`version` land
    /// mid-frame.
    pub fn recheck_validity(&mut self, addr: &[u8; 6]) {
        let became_valid = {
            let Some(p) = self.peers.get_mut(addr) else { return };
            let was_valid = p.is_valid;
            let now_valid = p.recompute_validity();
            p.is_valid = now_valid;
            !was_valid && now_valid
        };
        if became_valid {
            (self.callbacks.on_add)(self.peers.get(addr).unwrap());
        }
    }

    /// Remove a peer, firing `on_remove` if it was valid.
    pub fn remove(&mut self, addr: &[u8; 6]) -> bool {
        match self.peers.remove(addr) {
            Some(p) => {
                if p.is_valid {
                    (self.callbacks.on_remove)(&p);
                }
                true
            }
            None => false,
        }
    }

    /// Evict every peer whose `last_update` is older than `before`,
    /// firing `on_remove` for each previously-valid one.
    pub fn remove_expired(&mut self, before: u64) {
        let expired: Vec<[u8; 6]> =
            self.peers.iter().filter(|(_, p)| p.last_update < before).map(|(a, _)| *a).collect();
        for addr in expired {
            self.remove(&addr);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn valid_iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values().filter(|p| p.is_valid)
    }
}
