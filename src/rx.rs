//! Radiotap → 802.11 → AWDL action/data dispatch.

use crate::channel::{Chan, Encoding};
use crate::error::{RxBenign, RxOutcome, WireFrameError};
use crate::frame::{
    pack_version, ActionSubtype, TlvType, AWDL_BSSID, AWDL_OUI, AWDL_TYPE, AWDL_VERSION_COMPAT,
    IEEE80211_VENDOR_SPECIFIC,
};
use crate::radiotap;
use crate::state::State;
use crate::wire::{Cursor, WireError};

/// Default RSSI admission threshold for previously-unseen peers, in dBm.
pub const RSSI_THRESHOLD_DBM: i8 = -65;
/// Extra leeway applied to already-known peers to avoid flapping them in
/// and out near the threshold.
pub const RSSI_GRACE_DB: i8 = 5;

const FC_TYPE_MASK: u16 = 0x000C;
const FC_SUBTYPE_MASK: u16 = 0x00F0;
const FC_TYPE_MGMT: u16 = 0x0000;
const FC_TYPE_DATA: u16 = 0x0008;
const FC_SUBTYPE_ACTION: u16 = 0x00D0;
const FC_SUBTYPE_DATA_PLAIN: u16 = 0x0000;
const FC_SUBTYPE_QOS_DATA: u16 = 0x0080;

const EXPECTED_V1: u8 = AWDL_VERSION_COMPAT;

fn from_wire(e: WireError) -> RxOutcome {
    RxOutcome::WireError(WireFrameError::from(e))
}

/// Parse one captured frame (radiotap-prefixed) and apply its effects to
/// `state`. Decoded Ethernet-equivalent data frames are appended to `out`
/// as `(dst, src, ethertype, payload)` tuples; the caller owns framing
/// them for the host TAP.
pub fn receive(
    state: &mut State,
    raw: &[u8],
    now_us: u64,
    out: &mut Vec<([u8; 6], [u8; 6], u16, Vec<u8>)>,
) -> RxOutcome {
    let mut c = Cursor::new(raw);
    let info = match radiotap::parse(&mut c) {
        Ok(i) => i,
        Err(e) => return from_wire(e),
    };

    if info.bad_fcs() {
        return RxOutcome::Benign(RxBenign::IgnoreFailedCrc);
    }
    let mut mac = c.rest();
    if info.fcs_present() {
        if mac.len() < 4 {
            return RxOutcome::WireError(WireFrameError::TooShort);
        }
        mac = &mac[..mac.len() - 4];
    }
    let mut c = Cursor::new(mac);

    let frame_control = match c.read_u16_le() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let _duration = match c.read_u16_le() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let addr1 = match c.read_addr() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let addr2 = match c.read_addr() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let _addr3 = match c.read_addr() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let _seq_ctrl = match c.read_u16_le() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };

    if addr2 == state.self_addr {
        return RxOutcome::Benign(RxBenign::IgnoreFromSelf);
    }
    let _ = addr1;

    let ty = frame_control & FC_TYPE_MASK;
    let subtype = frame_control & FC_SUBTYPE_MASK;

    match (ty, subtype) {
        (FC_TYPE_MGMT, FC_SUBTYPE_ACTION) => {
            state.stats.rx_action += 1;
            receive_action(state, addr2, c, info.rssi_dbm, now_us)
        }
        (FC_TYPE_DATA, FC_SUBTYPE_QOS_DATA) => {
            let qos = match c.read_u16_le() {
                Ok(v) => v,
                Err(e) => return from_wire(e),
            };
            const AMSDU_PRESENT_BIT: u16 = 1 << 7;
            if qos & AMSDU_PRESENT_BIT != 0 {
                receive_amsdu(state, addr2, c, out)
            } else {
                receive_data(state, addr2, c, out)
            }
        }
        (FC_TYPE_DATA, FC_SUBTYPE_DATA_PLAIN) => receive_data(state, addr2, c, out),
        _ => RxOutcome::WireError(WireFrameError::UnexpectedType),
    }
}

fn rssi_admits(state: &State, known: bool, rssi: Option<i8>) -> bool {
    if !state.rssi_filter_enabled {
        return true;
    }
    let threshold = if known { RSSI_THRESHOLD_DBM - RSSI_GRACE_DB } else { RSSI_THRESHOLD_DBM };
    match rssi {
        Some(r) => r >= threshold,
        None => true,
    }
}

fn receive_action(
    state: &mut State,
    peer_addr: [u8; 6],
    mut c: Cursor,
    rssi: Option<i8>,
    now_us: u64,
) -> RxOutcome {
    let known = state.peers.get(&peer_addr).is_some();
    if !rssi_admits(state, known, rssi) {
        return RxOutcome::Benign(RxBenign::IgnoreRssi);
    }

    let category = match c.read_u8() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let oui = match c.read_bytes(3) {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let action_type = match c.read_u8() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let version = match c.read_u8() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    let subtype_byte = match c.read_u8() {
        Ok(v) => v,
        Err(e) => return from_wire(e),
    };
    if c.strip(2).is_err() {
        return RxOutcome::WireError(WireFrameError::TooShort);
    } // reserved
    let _tx_ts = c.read_u32_le();
    let _target_tx_ts = c.read_u32_le();

    if category != IEEE80211_VENDOR_SPECIFIC
        || oui != AWDL_OUI
        || action_type != AWDL_TYPE
        || version != EXPECTED_V1
    {
        return RxOutcome::WireError(WireFrameError::UnexpectedValue);
    }
    let Some(subtype) = ActionSubtype::from_byte(subtype_byte) else {
        return RxOutcome::WireError(WireFrameError::UnexpectedValue);
    };

    state.peers.add(peer_addr, now_us);

    if let Err(outcome) = walk_tlvs(state, peer_addr, c, now_us) {
        return outcome;
    }

    if let Some(p) = state.peers.get_mut(&peer_addr) {
        p.sent_mif |= subtype == ActionSubtype::Mif;
    }
    state.peers.recheck_validity(&peer_addr);

    RxOutcome::Action
}

fn walk_tlvs(
    state: &mut State,
    peer_addr: [u8; 6],
    mut c: Cursor,
    now_us: u64,
) -> Result<(), RxOutcome> {
    while !c.is_empty() {
        let (ty, val) = c.read_tlv().map_err(from_wire)?;
        let mut v = Cursor::new(val);
        match TlvType::from_byte(ty) {
            TlvType::SyncParams => handle_sync_params(state, &peer_addr, &mut v, now_us)?,
            TlvType::ChannelSequence => handle_channel_sequence(state, &peer_addr, &mut v)?,
            TlvType::ElectionParamsV1 => handle_election_v1(state, &peer_addr, &mut v)?,
            TlvType::ElectionParamsV2 => handle_election_v2(state, &peer_addr, &mut v)?,
            TlvType::Arpa => handle_arpa(state, &peer_addr, &mut v)?,
            TlvType::DataPathState => handle_data_path_state(state, &peer_addr, &mut v)?,
            TlvType::Version => handle_version(state, &peer_addr, &mut v)?,
            // Known-buggy on wire; recognized, not consumed.
            TlvType::SyncTree => {}
            TlvType::Other(_) => {}
        }
    }
    Ok(())
}

fn handle_sync_params(
    state: &mut State,
    peer_addr: &[u8; 6],
    v: &mut Cursor,
    now_us: u64,
) -> Result<(), RxOutcome> {
    if !state.election.is_sync_master(peer_addr) {
        return Ok(());
    }
    if v.strip(1).is_err() {
        return Err(RxOutcome::WireError(WireFrameError::TooShort));
    }
    let time_to_next_aw = v.read_u16_le().map_err(from_wire)?;
    if v.strip(26).is_err() {
        return Err(RxOutcome::WireError(WireFrameError::TooShort));
    }
    let aw_counter = v.read_u16_le().map_err(from_wire)?;

    state.sync.update_last(now_us, time_to_next_aw as u64, aw_counter);
    Ok(())
}

fn handle_channel_sequence(
    state: &mut State,
    peer_addr: &[u8; 6],
    v: &mut Cursor,
) -> Result<(), RxOutcome> {
    let count = v.read_u8().map_err(from_wire)?;
    let encoding_byte = v.read_u8().map_err(from_wire)?;
    let duplicate = v.read_u8().map_err(from_wire)?;
    let step_count = v.read_u8().map_err(from_wire)?;
    let fill_channel = v.read_u16_le().map_err(from_wire)?;

    if count != 15 || duplicate != 0 || fill_channel != 0xFFFF {
        return Err(RxOutcome::WireError(WireFrameError::UnexpectedValue));
    }
    let Ok(encoding) = Encoding::from_byte(encoding_byte) else {
        return Err(RxOutcome::WireError(WireFrameError::UnexpectedValue));
    };
    let expected_step = state.sync.presence_mode.saturating_sub(1) as u8;
    if step_count != expected_step {
        return Err(RxOutcome::WireError(WireFrameError::UnexpectedValue));
    }

    let mut entries = [Chan::default(); crate::channel::CHANSEQ_LENGTH];
    let size = encoding.entry_size();
    for entry in &mut entries {
        let bytes = v.read_bytes(size).map_err(from_wire)?;
        *entry = Chan::decode(bytes, encoding);
    }

    let Some(p) = state.peers.get_mut(peer_addr) else {
        return Ok(());
    };
    if p.sequence != entries {
        tracing::debug!(?peer_addr, "peer channel sequence changed");
    }
    p.sequence = entries;
    Ok(())
}

fn handle_election_v1(
    state: &mut State,
    peer_addr: &[u8; 6],
    v: &mut Cursor,
) -> Result<(), RxOutcome> {
    let Some(p) = state.peers.get_mut(peer_addr) else { return Ok(()) };
    if p.supports_v2 {
        return Ok(());
    }
    let _flags = v.read_u8().map_err(from_wire)?;
    let _id = v.read_u16_le().map_err(from_wire)?;
    let distance_to_master = v.read_u8().map_err(from_wire)?;
    if v.strip(1).is_err() {
        return Err(RxOutcome::WireError(WireFrameError::TooShort));
    } // unknown
    let master_addr = v.read_addr().map_err(from_wire)?;
    let master_metric = v.read_u32_le().map_err(from_wire)?;
    let self_metric = v.read_u32_le().map_err(from_wire)?;

    p.election.height = distance_to_master as u32;
    p.election.master_addr = master_addr;
    p.election.master_metric = master_metric;
    let _ = self_metric;
    Ok(())
}

fn handle_election_v2(
    state: &mut State,
    peer_addr: &[u8; 6],
    v: &mut Cursor,
) -> Result<(), RxOutcome> {
    let master_addr = v.read_addr().map_err(from_wire)?;
    let sync_addr = v.read_addr().map_err(from_wire)?;
    let master_counter = v.read_u32_le().map_err(from_wire)?;
    let distance_to_master = v.read_u32_le().map_err(from_wire)?;
    let master_metric = v.read_u32_le().map_err(from_wire)?;
    let self_metric = v.read_u32_le().map_err(from_wire)?;
    let _unknown = v.read_u32_le().map_err(from_wire)?;
    let _reserved = v.read_u32_le().map_err(from_wire)?;
    let self_counter = v.read_u32_le().map_err(from_wire)?;
    let _ = self_metric;

    let Some(p) = state.peers.get_mut(peer_addr) else { return Ok(()) };
    p.supports_v2 = true;
    p.election.master_addr = master_addr;
    p.election.sync_addr = sync_addr;
    p.election.master_counter = master_counter;
    p.election.height = distance_to_master;
    p.election.master_metric = master_metric;
    let _ = self_counter;
    Ok(())
}

fn handle_arpa(state: &mut State, peer_addr: &[u8; 6], v: &mut Cursor) -> Result<(), RxOutcome> {
    let name = v.read_int_string(crate::peer::HOST_NAME_LENGTH_MAX).map_err(from_wire)?;
    if let Some(p) = state.peers.get_mut(peer_addr) {
        p.name = name;
    }
    Ok(())
}

fn handle_data_path_state(
    state: &mut State,
    peer_addr: &[u8; 6],
    v: &mut Cursor,
) -> Result<(), RxOutcome> {
    // Presence bitmap of optional sub-fields; this implementation records
    // only the infra address, which the data-path shim needs.
    let flags = v.read_u16_le().map_err(from_wire)?;
    const HAS_INFRA_ADDR: u16 = 1 << 4;
    if flags & HAS_INFRA_ADDR != 0 {
        if v.strip(8).is_err() {
            return Err(RxOutcome::WireError(WireFrameError::TooShort));
        }
        let infra = v.read_addr().map_err(from_wire)?;
        if let Some(p) = state.peers.get_mut(peer_addr) {
            p.infra_addr = Some(infra);
        }
    }
    Ok(())
}

fn handle_version(state: &mut State, peer_addr: &[u8; 6], v: &mut Cursor) -> Result<(), RxOutcome> {
    let version = v.read_u8().map_err(from_wire)?;
    let devclass = v.read_u8().map_err(from_wire)?;
    let Some(p) = state.peers.get_mut(peer_addr) else { return Ok(()) };
    p.version = version;
    p.devclass = devclass;
    let _ = pack_version; // re-exported for callers building outbound TLVs
    Ok(())
}

const LLC_SNAP_LEN: usize = 8;
const AWDL_SHIM_LEN: usize = 8;

fn receive_data(
    state: &mut State,
    peer_addr: [u8; 6],
    mut c: Cursor,
    out: &mut Vec<([u8; 6], [u8; 6], u16, Vec<u8>)>,
) -> RxOutcome {
    state.stats.rx_data += 1;
    match decode_data_shim(state, peer_addr, &mut c) {
        Ok((ethertype, payload)) => {
            out.push((state.self_addr, peer_addr, ethertype, payload.to_vec()));
            RxOutcome::Data
        }
        Err(e) => e,
    }
}

fn decode_data_shim<'a>(
    state: &State,
    peer_addr: [u8; 6],
    c: &mut Cursor<'a>,
) -> Result<(u16, &'a [u8]), RxOutcome> {
    if state.peers.get(&peer_addr).is_none() {
        return Err(RxOutcome::Benign(RxBenign::IgnorePeer));
    }

    let llc = c.read_bytes(LLC_SNAP_LEN).map_err(from_wire)?;
    let oui = &llc[3..6];
    let pid = u16::from_be_bytes([llc[6], llc[7]]);
    if oui != AWDL_OUI || pid != 0x0800 {
        return Err(RxOutcome::WireError(WireFrameError::UnexpectedValue));
    }

    let shim = c.read_bytes(AWDL_SHIM_LEN).map_err(from_wire)?;
    let ethertype = u16::from_be_bytes([shim[6], shim[7]]);
    let payload = c.rest();
    Ok((ethertype, payload))
}

/// A-MSDU subframe path: `dst(6) src(6) len(BE16) payload[len]`, each
/// subframe after the first preceded by padding to a 4-byte boundary
/// measured from the start of the A-MSDU payload area. Used when the QoS
/// control's A-MSDU-present bit is set.
pub fn receive_amsdu(
    state: &mut State,
    peer_addr: [u8; 6],
    mut c: Cursor,
    out: &mut Vec<([u8; 6], [u8; 6], u16, Vec<u8>)>,
) -> RxOutcome {
    state.stats.rx_data += 1;
    let mut first = true;
    loop {
        if c.is_empty() {
            break;
        }
        if !first {
            let pad = (4 - (c.rest().len() % 4)) % 4;
            if c.strip(pad.min(c.remaining())).is_err() {
                return RxOutcome::WireError(WireFrameError::TooShort);
            }
            if c.is_empty() {
                break;
            }
        }
        first = false;

        let _dst = match c.read_addr() {
            Ok(v) => v,
            Err(e) => return from_wire(e),
        };
        let _src = match c.read_addr() {
            Ok(v) => v,
            Err(e) => return from_wire(e),
        };
        let len = match c.read_u16_be() {
            Ok(v) => v as usize,
            Err(e) => return from_wire(e),
        };
        let mut sub = match c.take(len) {
            Ok(v) => v,
            Err(e) => return from_wire(e),
        };
        match decode_data_shim(state, peer_addr, &mut sub) {
            Ok((ethertype, payload)) => {
                out.push((state.self_addr, peer_addr, ethertype, payload.to_vec()));
            }
            Err(outcome) => return outcome,
        }
    }
    RxOutcome::Data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::OPCLASS_6;
    use crate::frame::ActionSubtype;
    use crate::tx;

    fn test_state(addr: [u8; 6]) -> State {
        State::new(addr, OPCLASS_6, 1)
    }

    fn radiotap_rx_header(payload_len: usize) -> Vec<u8> {
        let mut w = crate::wire::OwnedBuf::new();
        w.write_u8(0);
        w.write_u8(0);
        w.write_u16_le(8); // version+pad+len+one present word, no fields set
        w.write_u32_le(0);
        let _ = payload_len;
        w.into_vec()
    }

    #[test]
    fn tx_then_rx_roundtrip_preserves_subtype_and_tlv_order() {
        let mut tx_state = test_state([0xAA; 6]);
        tx_state.election.master_metric = 77;
        let action = tx::build_action_frame(&tx_state, ActionSubtype::Psf, [0xBB; 6], 1000);

        let mut radiotap = radiotap_rx_header(0);
        radiotap.extend_from_slice(&action[9..]); // drop tx_state's own radiotap, reuse its body

        let mut rx_state = test_state([0xBB; 6]);
        let mut out = Vec::new();
        let outcome = receive(&mut rx_state, &radiotap, 1000, &mut out);
        assert_eq!(outcome, RxOutcome::Action);
        let peer = rx_state.peers.get(&[0xAA; 6]).unwrap();
        assert_eq!(peer.election.master_metric, 77);
    }

    #[test]
    fn drops_frame_from_self() {
        let mut state = test_state([0xAA; 6]);
        let action = tx::build_action_frame(&state, ActionSubtype::Psf, [0xBB; 6], 0);
        let mut radiotap = radiotap_rx_header(0);
        radiotap.extend_from_slice(&action[9..]);
        // addr2 in this frame is [0xAA;6] (tx_state.self_addr), same as
        // our own receiver address -> must be ignored.
        let mut out = Vec::new();
        let outcome = receive(&mut state, &radiotap, 0, &mut out);
        assert_eq!(outcome, RxOutcome::Benign(RxBenign::IgnoreFromSelf));
    }

    #[test]
    fn data_frame_decodes_to_one_ethernet_frame() {
        let mut state = test_state([0xAA; 6]);
        state.peers.add([0xBB; 6], 0);
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let data = tx::build_ipv6_data_frame(&state, [0xAA; 6], [0xBB; 6], &payload, 1);
        let mut radiotap = radiotap_rx_header(0);
        radiotap.extend_from_slice(&data[9..]);

        let mut out = Vec::new();
        let outcome = receive(&mut state, &radiotap, 0, &mut out);
        assert_eq!(outcome, RxOutcome::Data);
        assert_eq!(out.len(), 1);
        let (dst, src, ethertype, ref p) = out[0];
        assert_eq!(dst, [0xAA; 6]);
        assert_eq!(src, [0xBB; 6]);
        assert_eq!(ethertype, 0x86DD);
        assert_eq!(p, &payload);
    }

    #[test]
    fn data_frame_from_unknown_peer_is_ignored() {
        let mut state = test_state([0xAA; 6]);
        let data = tx::build_ipv6_data_frame(&state, [0xAA; 6], [0xBB; 6], &[1, 2, 3], 1);
        let mut radiotap = radiotap_rx_header(0);
        radiotap.extend_from_slice(&data[9..]);
        let mut out = Vec::new();
        let outcome = receive(&mut state, &radiotap, 0, &mut out);
        assert_eq!(outcome, RxOutcome::Benign(RxBenign::IgnorePeer));
    }

    #[test]
    fn bad_fcs_is_dropped() {
        let mut w = crate::wire::OwnedBuf::new();
        w.write_u8(0);
        w.write_u8(0);
        w.write_u16_le(4 + 4 + 1);
        w.write_u32_le(1 << 1); // FLAGS present
        w.write_u8(radiotap::FLAG_BAD_FCS);
        w.write_bytes(&[0u8; 24]);
        let bytes = w.into_vec();
        let mut state = test_state([0; 6]);
        let mut out = Vec::new();
        assert_eq!(
            receive(&mut state, &bytes, 0, &mut out),
            RxOutcome::Benign(RxBenign::IgnoreFailedCrc)
        );
    }
}
