//! Channel sequence, channel-number encodings, and IEEE 802.11 channel /
//! frequency conversion.

use thiserror::Error;

pub const CHANSEQ_LENGTH: usize = 16;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("unknown channel encoding {0}")]
    UnknownEncoding(u8),
}

/// How a channel entry's bytes map to a channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Simple = 0,
    Legacy = 1,
    OpClass = 3,
}

impl Encoding {
    pub fn from_byte(b: u8) -> Result<Self, ChannelError> {
        match b {
            0 => Ok(Encoding::Simple),
            1 => Ok(Encoding::Legacy),
            3 => Ok(Encoding::OpClass),
            other => Err(ChannelError::UnknownEncoding(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Bytes occupied by one channel entry under this encoding.
    pub fn entry_size(self) -> usize {
        match self {
            Encoding::Simple => 1,
            Encoding::Legacy | Encoding::OpClass => 2,
        }
    }
}

/// A single channel entry: a channel number plus (for `OpClass`) an
/// operating-class byte. Stored as the raw on-wire bytes so the entry can
/// be re-encoded without reinterpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chan {
    pub number: u8,
    pub op_class: u8,
}

pub const CHAN_NULL: Chan = Chan { number: 0, op_class: 0 };
pub const OPCLASS_6: Chan = Chan { number: 6, op_class: 0x51 };
pub const OPCLASS_44: Chan = Chan { number: 44, op_class: 0x80 };
pub const OPCLASS_149: Chan = Chan { number: 149, op_class: 0x80 };

impl Chan {
    pub fn is_null(self) -> bool {
        self.number == 0
    }

    /// Decode a channel entry of `size` bytes (1 or 2) per `encoding`.
    pub fn decode(bytes: &[u8], encoding: Encoding) -> Chan {
        match encoding {
            Encoding::Simple => Chan { number: bytes[0], op_class: 0 },
            Encoding::Legacy | Encoding::OpClass => {
                Chan { number: bytes[0], op_class: bytes[1] }
            }
        }
    }

    /// Encode this entry into `out`, writing `encoding.entry_size()` bytes.
    pub fn encode(self, encoding: Encoding, out: &mut Vec<u8>) {
        match encoding {
            Encoding::Simple => out.push(self.number),
            Encoding::Legacy | Encoding::OpClass => {
                out.push(self.number);
                out.push(self.op_class);
            }
        }
    }
}

/// A 16-slot channel sequence plus the encoding its entries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub encoding: Encoding,
    pub entries: [Chan; CHANSEQ_LENGTH],
}

impl Sequence {
    /// Every slot set to a single channel.
    pub fn static_single(chan: Chan) -> Self {
        Sequence { encoding: Encoding::OpClass, entries: [chan; CHANSEQ_LENGTH] }
    }

    /// 8 slots of channel 149 followed by 8 slots of channel 6.
    pub fn active() -> Self {
        let mut entries = [CHAN_NULL; CHANSEQ_LENGTH];
        for e in entries.iter_mut().take(8) {
            *e = OPCLASS_149;
        }
        for e in entries.iter_mut().skip(8) {
            *e = OPCLASS_6;
        }
        Sequence { encoding: Encoding::OpClass, entries }
    }

    /// 149 at slots 0/9/10, 6 at slot 8, null elsewhere.
    pub fn idle() -> Self {
        let mut entries = [CHAN_NULL; CHANSEQ_LENGTH];
        entries[0] = OPCLASS_149;
        entries[9] = OPCLASS_149;
        entries[10] = OPCLASS_149;
        entries[8] = OPCLASS_6;
        Sequence { encoding: Encoding::OpClass, entries }
    }

    pub fn channel_num(&self, slot: usize) -> u8 {
        self.entries[slot % CHANSEQ_LENGTH].number
    }
}

/// IEEE 802.11 channel number to center frequency (MHz), per §17.3.8.3.2
/// and Annex J. There are overlapping channel numbers in the 5 GHz and
/// 2.4 GHz bands. `0` means unsupported.
pub fn channel_to_frequency(channel: i32) -> u32 {
    if channel <= 0 {
        return 0;
    }
    if channel == 14 {
        return 2484;
    }
    if channel < 14 {
        return (2407 + channel * 5) as u32;
    }
    if channel < 32 {
        return 0;
    }
    if (182..=196).contains(&channel) {
        return (4000 + channel * 5) as u32;
    }
    (5000 + channel * 5) as u32
}

/// Inverse of [`channel_to_frequency`]. `0` means unsupported.
pub fn frequency_to_channel(freq: u32) -> i32 {
    let freq = freq as i32;
    if freq == 2484 {
        return 14;
    }
    if freq < 2484 {
        return (freq - 2407) / 5;
    }
    if (4910..=4980).contains(&freq) {
        return (freq - 4000) / 5;
    }
    if freq <= 45000 {
        return (freq - 5000) / 5;
    }
    if (58320..=64800).contains(&freq) {
        return (freq - 56160) / 2160;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_sizes() {
        assert_eq!(Encoding::Simple.entry_size(), 1);
        assert_eq!(Encoding::Legacy.entry_size(), 2);
        assert_eq!(Encoding::OpClass.entry_size(), 2);
    }

    #[test]
    fn unknown_encoding_rejected() {
        assert_eq!(Encoding::from_byte(2), Err(ChannelError::UnknownEncoding(2)));
    }

    #[test]
    fn active_sequence_shape() {
        let seq = Sequence::active();
        assert_eq!(seq.channel_num(0), 149);
        assert_eq!(seq.channel_num(7), 149);
        assert_eq!(seq.channel_num(8), 6);
        assert_eq!(seq.channel_num(15), 6);
    }

    #[test]
    fn idle_sequence_shape() {
        let seq = Sequence::idle();
        assert_eq!(seq.channel_num(0), 149);
        assert_eq!(seq.channel_num(8), 6);
        assert_eq!(seq.channel_num(9), 149);
        assert_eq!(seq.channel_num(10), 149);
        assert_eq!(seq.channel_num(1), 0);
    }

    #[test]
    fn channel_14_special_case() {
        assert_eq!(channel_to_frequency(14), 2484);
        assert_eq!(frequency_to_channel(2484), 14);
    }

    #[test]
    fn channel_freq_roundtrip_2ghz() {
        for ch in 1..=13 {
            let f = channel_to_frequency(ch);
            assert_eq!(frequency_to_channel(f), ch);
        }
    }

    #[test]
    fn channel_freq_roundtrip_5ghz() {
        for ch in [36, 44, 100, 149, 165] {
            let f = channel_to_frequency(ch);
            assert_eq!(frequency_to_channel(f), ch);
        }
    }

    #[test]
    fn unsupported_channel_is_zero() {
        assert_eq!(channel_to_frequency(-1), 0);
        assert_eq!(channel_to_frequency(0), 0);
        assert_eq!(frequency_to_channel(1), 0);
    }

    #[test]
    fn chan_encode_decode_roundtrip() {
        let mut out = Vec::new();
        OPCLASS_149.encode(Encoding::OpClass, &mut out);
        assert_eq!(Chan::decode(&out, Encoding::OpClass), OPCLASS_149);
    }
}
