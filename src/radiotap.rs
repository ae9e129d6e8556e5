//! Minimal radiotap header parser: just enough of the present-bitmap walk
//! to extract TSFT, FLAGS, and DBM_ANTSIGNAL.
//!
//! Structurally grounded in the present-word bitmap walk common to
//! radiotap parsers (version/pad byte, LE16 length, a run of `u32`
//! present words each reserving bit 31 for "another word follows"),
//! re-expressed here on top of this crate's own bounds-checked [`Cursor`]
//! rather than pulling in a radiotap crate with a foreign error style.

use crate::wire::{Cursor, WireError};

const IEEE80211_RADIOTAP_TSFT: u32 = 0;
const IEEE80211_RADIOTAP_FLAGS: u32 = 1;
const IEEE80211_RADIOTAP_RATE: u32 = 2;
const IEEE80211_RADIOTAP_DBM_ANTSIGNAL: u32 = 5;

pub const FLAG_FCS_AT_END: u8 = 0x10;
pub const FLAG_BAD_FCS: u8 = 0x40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadiotapInfo {
    pub tsft: Option<u64>,
    pub flags: Option<u8>,
    pub rssi_dbm: Option<i8>,
}

impl RadiotapInfo {
    pub fn bad_fcs(&self) -> bool {
        self.flags.map(|f| f & FLAG_BAD_FCS != 0).unwrap_or(false)
    }

    pub fn fcs_present(&self) -> bool {
        self.flags.map(|f| f & FLAG_FCS_AT_END != 0).unwrap_or(false)
    }
}

/// Parse the radiotap header at the start of `cursor`, leaving the cursor
/// positioned just past it (at the start of the 802.11 MAC header).
pub fn parse(cursor: &mut Cursor) -> Result<RadiotapInfo, WireError> {
    let version = cursor.read_u8()?;
    if version != 0 {
        return Err(WireError::OutOfBounds);
    }
    cursor.read_u8()?; // pad
    let total_len = cursor.read_u16_le()? as usize;
    if total_len < 4 {
        return Err(WireError::OutOfBounds);
    }

    let mut present_words = Vec::new();
    loop {
        let word = cursor.read_u32_le()?;
        present_words.push(word);
        if word & (1 << 31) == 0 {
            break;
        }
    }

    let header_so_far = 4 + present_words.len() * 4;
    if total_len < header_so_far {
        return Err(WireError::OutOfBounds);
    }
    let body_len = total_len - header_so_far;
    let mut body = cursor.take(body_len)?;
    let mut offset = 0usize;

    let mut info = RadiotapInfo::default();
    'fields: for &present in &present_words {
        for bit in 0..31u32 {
            if present & (1 << bit) == 0 {
                continue;
            }
            match bit {
                IEEE80211_RADIOTAP_TSFT => {
                    let pad = align_pad(offset, 8);
                    if body.strip(pad).is_err() {
                        break 'fields;
                    }
                    offset += pad;
                    info.tsft = body.read_u64_le().ok();
                    offset += 8;
                }
                IEEE80211_RADIOTAP_FLAGS => {
                    info.flags = body.read_u8().ok();
                    offset += 1;
                }
                IEEE80211_RADIOTAP_RATE => {
                    let _ = body.read_u8();
                    offset += 1;
                }
                IEEE80211_RADIOTAP_DBM_ANTSIGNAL => {
                    info.rssi_dbm = body.read_i8().ok();
                    offset += 1;
                }
                _ => {
                    // Unknown/unhandled present field: we don't know its
                    // width, so we can't keep walking past it reliably.
                    // Bail out of the body walk but keep what we parsed.
                    break 'fields;
                }
            }
        }
    }
    Ok(info)
}

/// Bytes of padding needed to align `offset` up to a multiple of `n`.
fn align_pad(offset: usize, n: usize) -> usize {
    let rem = offset % n;
    if rem == 0 {
        0
    } else {
        n - rem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::OwnedBuf;

    #[test]
    fn parses_flags_and_rssi() {
        let mut w = OwnedBuf::new();
        w.write_u8(0); // version
        w.write_u8(0); // pad
        // present: FLAGS (bit1) + DBM_ANTSIGNAL (bit5), no continuation
        let present = (1 << IEEE80211_RADIOTAP_FLAGS) | (1 << IEEE80211_RADIOTAP_DBM_ANTSIGNAL);
        let body_len = 1 + 1; // flags(1) + rssi(1)
        let total_len = 4 + 4 + body_len;
        w.write_u16_le(total_len as u16);
        w.write_u32_le(present);
        w.write_u8(FLAG_BAD_FCS);
        w.write_u8((-40i8) as u8);
        w.write_bytes(b"payload-follows");
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        let info = parse(&mut c).unwrap();
        assert_eq!(info.flags, Some(FLAG_BAD_FCS));
        assert!(info.bad_fcs());
        assert_eq!(info.rssi_dbm, Some(-40));
        assert_eq!(c.rest(), b"payload-follows");
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut w = OwnedBuf::new();
        w.write_u8(1);
        w.write_u8(0);
        w.write_u16_le(4);
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        assert!(parse(&mut c).is_err());
    }
}
