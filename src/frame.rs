//! Wire layouts and enumerations for AWDL action frames and TLVs.
//!
//! Byte offsets below are grounded in the reference implementation's
//! `frame.h`.

/// Vendor-specific OUI AWDL frames are tagged with.
pub const AWDL_OUI: [u8; 3] = [0x00, 0x17, 0xF2];

/// The fixed group address AWDL frames are filtered on at capture.
pub const AWDL_BSSID: [u8; 6] = [0x00, 0x25, 0x00, 0xFF, 0x94, 0x73];

/// IEEE 802.11 vendor-specific category.
pub const IEEE80211_VENDOR_SPECIFIC: u8 = 127;

/// AWDL action-frame type, inside the vendor-specific body.
pub const AWDL_TYPE: u8 = 8;

/// `packed(major=1, minor=0)`.
pub const AWDL_VERSION_COMPAT: u8 = 0x10;

/// Action header: category(1) oui(3) type(1) version(1) subtype(1)
/// reserved(2) tx_ts(4,LE) target_tx_ts(4,LE), then TLVs.
pub const ACTION_HEADER_LEN: usize = 17;

/// AWDL action-frame subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSubtype {
    Psf,
    Mif,
}

impl ActionSubtype {
    pub fn as_byte(self) -> u8 {
        match self {
            ActionSubtype::Psf => 0,
            ActionSubtype::Mif => 3,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ActionSubtype::Psf),
            3 => Some(ActionSubtype::Mif),
            _ => None,
        }
    }
}

/// AWDL TLV type codes. `Other` carries the raw code for types this
/// implementation does not interpret (logged and ignored rather than
/// treated as a parse failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvType {
    SyncParams,
    ChannelSequence,
    ElectionParamsV1,
    Arpa,
    DataPathState,
    Version,
    SyncTree,
    ElectionParamsV2,
    Other(u8),
}

impl TlvType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            4 => TlvType::SyncParams,
            18 => TlvType::ChannelSequence,
            5 => TlvType::ElectionParamsV1,
            16 => TlvType::Arpa,
            12 => TlvType::DataPathState,
            21 => TlvType::Version,
            20 => TlvType::SyncTree,
            24 => TlvType::ElectionParamsV2,
            other => TlvType::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            TlvType::SyncParams => 4,
            TlvType::ChannelSequence => 18,
            TlvType::ElectionParamsV1 => 5,
            TlvType::Arpa => 16,
            TlvType::DataPathState => 12,
            TlvType::Version => 21,
            TlvType::SyncTree => 20,
            TlvType::ElectionParamsV2 => 24,
            TlvType::Other(b) => b,
        }
    }
}

/// `packed(major, minor)` as carried in the advertised-version TLV: high
/// nibble major, low nibble minor. Distinct from [`AWDL_VERSION_COMPAT`],
/// which tags the action-frame wire format itself.
pub const fn pack_version(major: u8, minor: u8) -> u8 {
    (major << 4) | (minor & 0x0F)
}

pub fn unpack_version(v: u8) -> (u8, u8) {
    (v >> 4, v & 0x0F)
}

/// Device classes as advertised in the version TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    MacOs,
    Ios,
    TvOs,
    Unknown(u8),
}

impl DeviceClass {
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => DeviceClass::MacOs,
            2 => DeviceClass::Ios,
            8 => DeviceClass::TvOs,
            other => DeviceClass::Unknown(other),
        }
    }
}

/// Parsed sync-params TLV value (offsets relative to the TLV's value
/// region, i.e. after the 3-byte type+length header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncParams {
    pub time_to_next_aw: u16,
    pub tx_down_counter: u16,
    pub aw_period: u16,
    pub aw_ext_length: u16,
    pub aw_com_length: u16,
    pub remaining_aw_length: u16,
    pub min_ext: u16,
    pub max_ext_multi: u16,
    pub max_ext_uni: u16,
    pub max_ext_af: u16,
    pub flags: u16,
    pub max_multicast_ext: u8,
    pub guard_time: u8,
    pub aw_seq: u16,
    pub ap_beacon_alignment: u16,
    pub aw_counter: u16,
    pub master_channel: u8,
    pub ap_alignment: u16,
}

/// Parsed election-params TLV, v1 or v2 (v2 adds counters and a distinct
/// sync address; `supports_v2` on the peer tracks which was last seen).
/// `distance_to_master`/`master_metric`/`self_metric` are carried as
/// `u32` on the wire in both versions (v1's `distancetop` is the
/// exception, a single byte); this struct stores the widened form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElectionParams {
    pub distance_to_master: u32,
    pub master_addr: [u8; 6],
    pub master_metric: u32,
    pub self_metric: u32,
    pub master_counter: u32,
    pub self_counter: u32,
    pub sync_addr: [u8; 6],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_roundtrip() {
        assert_eq!(ActionSubtype::from_byte(ActionSubtype::Psf.as_byte()), Some(ActionSubtype::Psf));
        assert_eq!(ActionSubtype::from_byte(ActionSubtype::Mif.as_byte()), Some(ActionSubtype::Mif));
        assert_eq!(ActionSubtype::from_byte(1), None);
    }

    #[test]
    fn tlv_type_roundtrip() {
        for t in [
            TlvType::SyncParams,
            TlvType::ChannelSequence,
            TlvType::ElectionParamsV1,
            TlvType::Arpa,
            TlvType::DataPathState,
            TlvType::Version,
            TlvType::SyncTree,
            TlvType::ElectionParamsV2,
        ] {
            assert_eq!(TlvType::from_byte(t.as_byte()), t);
        }
        assert_eq!(TlvType::from_byte(99), TlvType::Other(99));
    }

    #[test]
    fn version_pack_roundtrip() {
        assert_eq!(unpack_version(pack_version(3, 4)), (3, 4));
        assert_eq!(pack_version(1, 0), AWDL_VERSION_COMPAT);
    }

    #[test]
    fn device_class_known_values() {
        assert_eq!(DeviceClass::from_byte(1), DeviceClass::MacOs);
        assert_eq!(DeviceClass::from_byte(2), DeviceClass::Ios);
        assert_eq!(DeviceClass::from_byte(8), DeviceClass::TvOs);
    }
}
