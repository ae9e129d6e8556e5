//! End-to-end scenario tests against the public `awdl` crate API, one per
//! literal scenario in this project's testable-properties list.

use awdl::channel::{channel_to_frequency, frequency_to_channel, OPCLASS_6};
use awdl::election::{self, Candidate, ElectionState};
use awdl::error::{RxBenign, RxOutcome};
use awdl::frame::ActionSubtype;
use awdl::state::State;
use awdl::sync::SyncState;
use awdl::{rx, tx};

const SELF: [u8; 6] = [0; 6];
const PEER: [u8; 6] = [1; 6];

#[test]
fn lone_node_election() {
    let mut e = ElectionState::new(SELF);
    election::run(&mut e, &[]);
    assert_eq!(e.master_addr, SELF);
    assert_eq!(e.sync_addr, SELF);
    assert_eq!(e.self_addr, SELF);
    assert_eq!(e.height, 0);
    assert_eq!(e.master_metric, 60);
    assert_eq!(e.master_counter, 0);
}

#[test]
fn pairwise_election_tie_breaks_on_larger_address() {
    let mut e = ElectionState::new(SELF);
    let peer = Candidate {
        self_addr: PEER,
        sync_addr: PEER,
        master_addr: PEER,
        height: 0,
        master_metric: 60,
        master_counter: 0,
    };
    election::run(&mut e, &[peer]);
    assert_eq!(e.master_addr, PEER);
}

#[test]
fn higher_counter_wins_even_with_lower_metric() {
    let mut e = ElectionState::new(SELF);
    e.self_metric = 1001;
    e.master_metric = 1001;
    let peer = Candidate {
        self_addr: PEER,
        sync_addr: PEER,
        master_addr: PEER,
        height: 0,
        master_metric: 1000,
        master_counter: 1,
    };
    election::run(&mut e, &[peer]);
    assert_eq!(e.master_addr, PEER);
    assert_eq!(e.master_counter, 1);
}

#[test]
fn a_peer_that_syncs_back_to_us_is_never_adopted() {
    let mut e = ElectionState::new(SELF);
    let peer = Candidate {
        self_addr: PEER,
        sync_addr: SELF,
        master_addr: PEER,
        height: 0,
        master_metric: 1000,
        master_counter: 9,
    };
    election::run(&mut e, &[peer]);
    assert_eq!(e.master_addr, SELF);
    assert_eq!(e.sync_addr, SELF);
}

#[test]
fn sync_error_threshold_increments_meas_err() {
    let mut s = SyncState::new();
    assert_eq!(s.sync_error_tu(0, 64, 0), 0);

    let mut s2 = SyncState::new();
    let err = s2.sync_error_tu(0, 60, 0);
    assert_eq!(err, 4);
    s2.update_last(0, 60, 0);
    assert_eq!(s2.meas_err, 1);
}

#[test]
fn data_frame_decode_emits_one_ethernet_frame() {
    let mut state = State::new(SELF, OPCLASS_6, 1);
    state.peers.add(PEER, 0);

    let payload = b"hello from an AWDL peer".to_vec();
    let data_frame = tx::build_ipv6_data_frame(&state, SELF, PEER, &payload, 1);

    // Swap in a radiotap header with no flags field set (no FCS trailer),
    // keeping the rest of the built frame (802.11 header onward) intact.
    let mut raw = minimal_radiotap_no_flags();
    raw.extend_from_slice(&data_frame[9..]);

    let mut out = Vec::new();
    let outcome = rx::receive(&mut state, &raw, 0, &mut out);

    assert_eq!(outcome, RxOutcome::Data);
    assert_eq!(out.len(), 1);
    let (dst, src, ethertype, ref p) = out[0];
    assert_eq!(dst, SELF);
    assert_eq!(src, PEER);
    assert_eq!(ethertype, 0x86DD);
    assert_eq!(p, &payload);
}

#[test]
fn data_frame_from_peer_not_in_table_is_dropped() {
    let mut state = State::new(SELF, OPCLASS_6, 1);
    let data_frame = tx::build_ipv6_data_frame(&state, SELF, PEER, &[1, 2, 3], 1);
    let mut raw = minimal_radiotap_no_flags();
    raw.extend_from_slice(&data_frame[9..]);

    let mut out = Vec::new();
    let outcome = rx::receive(&mut state, &raw, 0, &mut out);
    assert_eq!(outcome, RxOutcome::Benign(RxBenign::IgnorePeer));
    assert!(out.is_empty());
}

#[test]
fn action_frame_roundtrips_through_tx_and_rx() {
    let mut tx_state = State::new(PEER, OPCLASS_6, 1);
    tx_state.election.master_metric = 42;
    tx_state.hostname = "peer-host".to_string();
    let frame = tx::build_action_frame(&tx_state, ActionSubtype::Mif, SELF, 500);

    let mut raw = minimal_radiotap_no_flags();
    raw.extend_from_slice(&frame[9..]);

    let mut rx_state = State::new(SELF, OPCLASS_6, 1);
    let mut out = Vec::new();
    let outcome = rx::receive(&mut rx_state, &raw, 500, &mut out);

    assert_eq!(outcome, RxOutcome::Action);
    let peer = rx_state.peers.get(&PEER).unwrap();
    assert_eq!(peer.election.master_metric, 42);
    assert_eq!(peer.name, "peer-host");
}

#[test]
fn channel_frequency_conversion_is_its_own_inverse() {
    for chan in [1, 6, 11, 36, 44, 149, 165] {
        let freq = channel_to_frequency(chan);
        assert_eq!(frequency_to_channel(freq), chan, "channel {chan} -> {freq} MHz -> back");
    }
}

/// A radiotap header with a present-bitmap word of zero: no FLAGS field,
/// so no FCS-at-end and no bad-FCS bit. Matches a capture source that
/// never set the flag at all.
fn minimal_radiotap_no_flags() -> Vec<u8> {
    let mut w = awdl::wire::OwnedBuf::new();
    w.write_u8(0); // version
    w.write_u8(0); // pad
    w.write_u16_le(8); // header + len + one present word, no body
    w.write_u32_le(0); // present bitmap, nothing set
    w.into_vec()
}
