//! Distributed master-election over the peer set.

pub const ELECTION_TREE_MAX_HEIGHT: u8 = 10;
pub const METRIC_INIT: u32 = 60;
pub const COUNTER_INIT: u32 = 0;

/// A node's view of the election tree: who it thinks the master is, who it
/// syncs to, and the counters/metrics backing that choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionState {
    pub master_addr: [u8; 6],
    pub sync_addr: [u8; 6],
    pub self_addr: [u8; 6],
    pub height: u8,
    pub master_metric: u32,
    pub self_metric: u32,
    pub master_counter: u32,
    pub self_counter: u32,
}

impl ElectionState {
    /// A fresh node: its own master and sync parent, at height 0.
    pub fn new(self_addr: [u8; 6]) -> Self {
        ElectionState {
            master_addr: self_addr,
            sync_addr: self_addr,
            self_addr,
            height: 0,
            master_metric: METRIC_INIT,
            self_metric: METRIC_INIT,
            master_counter: COUNTER_INIT,
            self_counter: COUNTER_INIT,
        }
    }

    pub fn is_sync_master(&self, addr: &[u8; 6]) -> bool {
        &self.sync_addr == addr
    }

    fn reset(&mut self) {
        self.height = 0;
        self.master_addr = self.self_addr;
        self.sync_addr = self.self_addr;
        self.master_metric = self.self_metric;
        self.master_counter = self.self_counter;
    }
}

/// One peer's election-relevant fields, as copied out of its last
/// election-parameters TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub self_addr: [u8; 6],
    pub sync_addr: [u8; 6],
    pub master_addr: [u8; 6],
    pub height: u8,
    pub master_metric: u32,
    pub master_counter: u32,
}

/// Run one election round against `peers` (valid peers only), mutating
/// `state` in place. Deterministic and idempotent: running it twice in a
/// row with the same peer set yields the same result.
pub fn run<'a>(state: &mut ElectionState, peers: impl IntoIterator<Item = &'a Candidate>) {
    state.reset();

    let mut best_addr = state.self_addr;
    let mut best_sync_addr = state.sync_addr;
    let mut best_master_addr = state.master_addr;
    let mut best_height = state.height;
    let mut best_metric = state.master_metric;
    let mut best_counter = state.master_counter;
    let mut adopted = false;

    for p in peers {
        if p.height as u32 + 1 > ELECTION_TREE_MAX_HEIGHT as u32 {
            continue;
        }
        // Cycle prevention: never adopt a peer that syncs to us.
        if p.sync_addr == state.self_addr {
            continue;
        }

        let better = match (p.master_counter, p.master_metric).cmp(&(best_counter, best_metric)) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => {
                if p.height > best_height {
                    false
                } else if p.height == best_height {
                    // Tie-break: prefer the numerically larger address.
                    p.self_addr > best_addr
                } else {
                    true
                }
            }
        };

        if better {
            best_addr = p.self_addr;
            best_sync_addr = p.self_addr;
            best_master_addr = p.master_addr;
            best_height = p.height + 1;
            best_metric = p.master_metric;
            best_counter = p.master_counter;
            adopted = true;
        }
    }

    if adopted {
        state.master_addr = best_master_addr;
        state.sync_addr = best_sync_addr;
        state.master_metric = best_metric;
        state.master_counter = best_counter;
        state.height = best_height;
    }
    let _ = best_addr;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF: [u8; 6] = [0; 6];
    const PEER: [u8; 6] = [1; 6];

    #[test]
    fn lone_node_election() {
        let mut state = ElectionState::new(SELF);
        run(&mut state, &[]);
        assert_eq!(state.master_addr, SELF);
        assert_eq!(state.sync_addr, SELF);
        assert_eq!(state.height, 0);
        assert_eq!(state.master_metric, 60);
        assert_eq!(state.master_counter, 0);
    }

    #[test]
    fn pairwise_election_picks_larger_address() {
        let mut state = ElectionState::new(SELF);
        let peer = Candidate {
            self_addr: PEER,
            sync_addr: PEER,
            master_addr: PEER,
            height: 0,
            master_metric: METRIC_INIT,
            master_counter: COUNTER_INIT,
        };
        run(&mut state, &[peer]);
        assert_eq!(state.master_addr, PEER);
        assert_eq!(state.sync_addr, PEER);
        assert_eq!(state.height, 1);
    }

    #[test]
    fn counter_beats_metric() {
        let mut state = ElectionState::new(SELF);
        state.self_metric = 1001;
        state.master_metric = 1001;
        state.self_counter = 0;
        state.master_counter = 0;
        let peer = Candidate {
            self_addr: PEER,
            sync_addr: PEER,
            master_addr: PEER,
            height: 0,
            master_metric: 1000,
            master_counter: 1,
        };
        run(&mut state, &[peer]);
        assert_eq!(state.master_addr, PEER);
        assert_eq!(state.master_counter, 1);
        assert_eq!(state.master_metric, 1000);
    }

    #[test]
    fn cycle_rejection() {
        let mut state = ElectionState::new(SELF);
        let peer = Candidate {
            self_addr: PEER,
            sync_addr: SELF, // syncs to us -> would be a cycle
            master_addr: PEER,
            height: 0,
            master_metric: 1000,
            master_counter: 5,
        };
        run(&mut state, &[peer]);
        assert_eq!(state.master_addr, SELF);
        assert_eq!(state.sync_addr, SELF);
    }

    #[test]
    fn height_never_exceeds_bound() {
        let mut state = ElectionState::new(SELF);
        let peer = Candidate {
            self_addr: PEER,
            sync_addr: PEER,
            master_addr: PEER,
            height: ELECTION_TREE_MAX_HEIGHT, // +1 would exceed the bound
            master_metric: 255,
            master_counter: u32::MAX,
        };
        run(&mut state, &[peer]);
        assert_eq!(state.master_addr, SELF, "peer at max height must be rejected");
        assert!(state.height <= ELECTION_TREE_MAX_HEIGHT);
    }

    #[test]
    fn idempotent_on_unchanged_peer_set() {
        let mut state = ElectionState::new(SELF);
        let peer = Candidate {
            self_addr: PEER,
            sync_addr: PEER,
            master_addr: PEER,
            height: 0,
            master_metric: 100,
            master_counter: 1,
        };
        run(&mut state, &[peer]);
        let after_first = state;
        run(&mut state, &[peer]);
        assert_eq!(state, after_first);
    }
}
