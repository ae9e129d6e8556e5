//! Assembles radiotap + 802.11 + AWDL action/data frames.

use crate::channel::Encoding;
use crate::frame::{
    ActionSubtype, TlvType, ACTION_HEADER_LEN, AWDL_BSSID, AWDL_OUI, AWDL_VERSION_COMPAT,
    IEEE80211_VENDOR_SPECIFIC,
};
use crate::state::State;
use crate::wire::OwnedBuf;

/// Radiotap TX rate field: 12 half-Mb/s units, i.e. 6 Mb/s.
const TX_RATE: u8 = 12;

/// 802.11 frame-control values used on TX.
const FC_MGMT_ACTION: u16 = 0x00D0;
const FC_DATA: u16 = 0x0008;

const AWDL_SHIM_HEAD: u16 = 0x0403;
const ETHERTYPE_IPV6: u16 = 0x86DD;

fn write_radiotap_tx(buf: &mut OwnedBuf) {
    // version(1)=0 pad(1)=0 len(2,LE) present(4,LE)=RATE only, rate(1)
    buf.write_u8(0);
    buf.write_u8(0);
    buf.write_u16_le(9);
    buf.write_u32_le(1 << 2); // IEEE80211_RADIOTAP_RATE
    buf.write_u8(TX_RATE);
}

fn write_80211_header(
    buf: &mut OwnedBuf,
    frame_control: u16,
    addr1: [u8; 6],
    addr2: [u8; 6],
    seq: u16,
) {
    buf.write_u16_le(frame_control);
    buf.write_u16_le(0); // duration
    buf.write_addr(&addr1);
    buf.write_addr(&addr2);
    buf.write_addr(&AWDL_BSSID);
    buf.write_u16_le(seq << 4);
}

fn write_action_header(buf: &mut OwnedBuf, subtype: ActionSubtype, now_us: u64) {
    buf.write_u8(IEEE80211_VENDOR_SPECIFIC);
    buf.write_bytes(&AWDL_OUI);
    buf.write_u8(crate::frame::AWDL_TYPE);
    buf.write_u8(AWDL_VERSION_COMPAT);
    buf.write_u8(subtype.as_byte());
    buf.write_u16_le(0); // reserved
    let ts = now_us as u32;
    buf.write_u32_le(ts);
    buf.write_u32_le(ts);
}

fn write_channel_sequence(buf: &mut OwnedBuf, state: &State) {
    let seq = state.sequence();
    buf.write_u8(15); // channel_count
    buf.write_u8(seq.encoding.as_byte());
    buf.write_u8(0); // duplicate_count
    buf.write_u8((state.sync.presence_mode.saturating_sub(1)) as u8); // step_count
    buf.write_u16_le(0xFFFF); // fill_channel
    let mut entries = Vec::new();
    for chan in &seq.entries {
        chan.encode(seq.encoding, &mut entries);
    }
    buf.write_bytes(&entries);
}

fn sync_params_tlv(state: &State, now_us: u64) -> Vec<u8> {
    let next_aw_seq = state.sync.current_aw(now_us);
    let tx_down_counter = state.sync.next_aw_tu(now_us) as u16;
    let aw_period = state.sync.aw_period_tu;
    let aw_com_length = aw_period;
    let presence_mode = state.sync.presence_mode;
    let remaining_aw_length = {
        let total = aw_period as i32 * presence_mode as i32;
        (aw_com_length as i32 - (total - tx_down_counter as i32)).max(0) as u16
    };

    let mut v = OwnedBuf::new();
    v.write_u8(0); // reserved
    v.write_u16_le(tx_down_counter);
    v.write_u16_le(tx_down_counter); // time_to_next_aw mirrors tx_down_counter at build time
    v.write_u16_le(aw_period);
    v.write_u16_le(aw_period); // aw_ext_length == aw_period
    v.write_u16_le(aw_com_length);
    v.write_u16_le(remaining_aw_length);
    let min_ext = presence_mode.saturating_sub(1);
    v.write_u16_le(min_ext);
    v.write_u16_le(min_ext); // max_ext_multi
    v.write_u16_le(min_ext); // max_ext_uni
    v.write_u16_le(min_ext); // max_ext_af
    v.write_u16_le(0x1800); // flags
    v.write_u8(0); // max_multicast_ext
    v.write_u8(0); // guard_time
    v.write_u16_le(next_aw_seq);
    v.write_u16_le(next_aw_seq); // ap_beacon_alignment
    v.write_u16_le(state.sync.aw_counter);
    v.write_u8(state.channel_num(state.master_channel));
    v.write_u16_le(next_aw_seq); // ap_alignment
    write_channel_sequence(&mut v, state);
    v.into_vec()
}

fn election_params_v1_tlv(state: &State) -> Vec<u8> {
    let mut v = OwnedBuf::new();
    v.write_u8(0); // flags
    v.write_u16_le(0); // id
    v.write_u8(state.election.height); // distancetop
    v.write_u8(0); // unknown
    v.write_addr(&state.election.master_addr);
    v.write_u32_le(state.election.master_metric);
    v.write_u32_le(state.election.self_metric);
    v.write_u16_le(0); // pad
    v.into_vec()
}

fn election_params_v2_tlv(state: &State) -> Vec<u8> {
    let mut v = OwnedBuf::new();
    v.write_addr(&state.election.master_addr);
    v.write_addr(&state.election.sync_addr);
    v.write_u32_le(state.election.master_counter);
    v.write_u32_le(state.election.height as u32); // distance_to_master
    v.write_u32_le(state.election.master_metric);
    v.write_u32_le(state.election.self_metric);
    v.write_u32_le(0); // unknown
    v.write_u32_le(0); // reserved
    v.write_u32_le(state.election.self_counter);
    v.into_vec()
}

fn version_tlv(state: &State) -> Vec<u8> {
    vec![state.version, state.devclass]
}

fn data_path_state_tlv(state: &State) -> Vec<u8> {
    // Flags bitmap with no optional sub-fields present (country code /
    // social-channel map / infra info / infra address / AWDL address are
    // all advertised as absent).
    let _ = state;
    vec![0u8; 12]
}

fn service_params_tlv() -> Vec<u8> {
    Vec::new()
}

fn arpa_tlv(hostname: &str) -> Vec<u8> {
    let mut v = OwnedBuf::new();
    let bytes = hostname.as_bytes();
    let len = bytes.len().min(255) as u8;
    v.write_u8(len);
    v.write_bytes(&bytes[..len as usize]);
    v.into_vec()
}

fn ht_capabilities_tlv() -> Vec<u8> {
    Vec::new()
}

/// Build a PSF or MIF action frame. Returns the full radiotap-prefixed
/// wire frame (FCS appended if `state.append_fcs`).
pub fn build_action_frame(
    state: &State,
    subtype: ActionSubtype,
    dst: [u8; 6],
    now_us: u64,
) -> Vec<u8> {
    let mut buf = OwnedBuf::new();
    write_radiotap_tx(&mut buf);
    let radiotap_len = buf.len();

    write_80211_header(&mut buf, FC_MGMT_ACTION, dst, state.self_addr, 0);
    write_action_header(&mut buf, subtype, now_us);

    buf.write_tlv(TlvType::SyncParams.as_byte(), &sync_params_tlv(state, now_us));
    buf.write_tlv(TlvType::ElectionParamsV1.as_byte(), &election_params_v1_tlv(state));
    // The embedded channel sequence above travels inside sync-params;
    // the standalone channel-sequence TLV carries the same payload for
    // peers that read it independently.
    {
        let mut cs = OwnedBuf::new();
        write_channel_sequence(&mut cs, state);
        buf.write_tlv(TlvType::ChannelSequence.as_byte(), &cs.into_vec());
    }
    buf.write_tlv(TlvType::ElectionParamsV2.as_byte(), &election_params_v2_tlv(state));
    buf.write_tlv(6, &service_params_tlv()); // AWDL_SERVICE_PARAMETERS_TLV

    if subtype == ActionSubtype::Mif {
        buf.write_tlv(7, &ht_capabilities_tlv());
        buf.write_tlv(TlvType::Arpa.as_byte(), &arpa_tlv(&state.hostname));
    }

    buf.write_tlv(TlvType::DataPathState.as_byte(), &data_path_state_tlv(state));
    buf.write_tlv(TlvType::Version.as_byte(), &version_tlv(state));

    let mut out = buf.into_vec();
    if state.append_fcs {
        append_fcs(&mut out, radiotap_len);
    }
    out
}

/// Build an AWDL data frame carrying `payload` (an Ethernet payload,
/// i.e. everything after the 14-byte Ethernet header) from `src` to
/// `dst`, with `ethertype` taken from the originating Ethernet frame.
pub fn build_data_frame(
    state: &State,
    dst: [u8; 6],
    src: [u8; 6],
    ethertype: u16,
    payload: &[u8],
    seq: u16,
) -> Vec<u8> {
    let mut buf = OwnedBuf::new();
    write_radiotap_tx(&mut buf);
    let radiotap_len = buf.len();

    write_80211_header(&mut buf, FC_DATA, dst, src, seq);

    // LLC/SNAP
    buf.write_u8(0xAA); // DSAP
    buf.write_u8(0xAA); // SSAP
    buf.write_u8(0x03); // control
    buf.write_bytes(&AWDL_OUI);
    buf.write_u16_be(0x0800); // PID

    // AWDL data shim
    buf.write_u16_le(AWDL_SHIM_HEAD);
    buf.write_u16_le(seq);
    buf.write_u16_le(0x0000); // pad
    buf.write_u16_be(ethertype);

    buf.write_bytes(payload);

    let mut out = buf.into_vec();
    if state.append_fcs {
        append_fcs(&mut out, radiotap_len);
    }
    out
}

/// Convenience for the common IPv6 data-path case.
pub fn build_ipv6_data_frame(
    state: &State,
    dst: [u8; 6],
    src: [u8; 6],
    payload: &[u8],
    seq: u16,
) -> Vec<u8> {
    build_data_frame(state, dst, src, ETHERTYPE_IPV6, payload, seq)
}

fn append_fcs(frame: &mut Vec<u8>, radiotap_len: usize) {
    let crc = crc32(&frame[radiotap_len..]);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// IEEE 802.3 CRC-32 (the polynomial used by 802.11 FCS and zlib/libpcap).
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::OPCLASS_6;

    fn test_state() -> State {
        State::new([0xAA; 6], OPCLASS_6, 1)
    }

    #[test]
    fn psf_frame_has_expected_tlv_order() {
        let state = test_state();
        let frame = build_action_frame(&state, ActionSubtype::Psf, [0xBB; 6], 0);
        // radiotap header is 9 bytes per write_radiotap_tx
        let header_end = 9 + 24 + ACTION_HEADER_LEN;
        assert!(frame.len() > header_end);
        let mut c = crate::wire::Cursor::new(&frame[header_end..]);
        let mut types = Vec::new();
        while !c.is_empty() {
            let (ty, _) = c.read_tlv().unwrap();
            types.push(ty);
        }
        assert_eq!(
            types,
            vec![
                TlvType::SyncParams.as_byte(),
                TlvType::ElectionParamsV1.as_byte(),
                TlvType::ChannelSequence.as_byte(),
                TlvType::ElectionParamsV2.as_byte(),
                20,
                TlvType::DataPathState.as_byte(),
                TlvType::Version.as_byte(),
            ]
        );
    }

    #[test]
    fn mif_frame_inserts_ht_and_arpa_before_data_path_state() {
        let state = test_state();
        let frame = build_action_frame(&state, ActionSubtype::Mif, [0xBB; 6], 0);
        let header_end = 9 + 24 + ACTION_HEADER_LEN;
        let mut c = crate::wire::Cursor::new(&frame[header_end..]);
        let mut types = Vec::new();
        while !c.is_empty() {
            let (ty, _) = c.read_tlv().unwrap();
            types.push(ty);
        }
        let dps_pos = types.iter().position(|&t| t == TlvType::DataPathState.as_byte()).unwrap();
        let arpa_pos = types.iter().position(|&t| t == TlvType::Arpa.as_byte()).unwrap();
        assert!(arpa_pos < dps_pos);
    }

    #[test]
    fn fcs_appended_when_enabled() {
        let mut state = test_state();
        state.append_fcs = true;
        let frame = build_action_frame(&state, ActionSubtype::Psf, [0xBB; 6], 0);
        let without_fcs = {
            state.append_fcs = false;
            build_action_frame(&state, ActionSubtype::Psf, [0xBB; 6], 0)
        };
        assert_eq!(frame.len(), without_fcs.len() + 4);
    }

    #[test]
    fn data_frame_layout() {
        let state = test_state();
        let payload = [1u8, 2, 3, 4];
        let frame = build_ipv6_data_frame(&state, [0xCC; 6], [0xDD; 6], &payload, 1);
        // radiotap(9) + 80211(24) + llc/snap(8) + shim(8) + payload
        assert_eq!(frame.len(), 9 + 24 + 8 + 8 + payload.len());
    }
}
