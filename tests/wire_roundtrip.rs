//! Black-box wire-codec round-trip checks against the public `wire` API.

use awdl::wire::{Cursor, OwnedBuf, WireError};

#[test]
fn all_integer_widths_and_endiannesses_roundtrip() {
    let mut w = OwnedBuf::new();
    w.write_u8(0x7F);
    w.write_u16_le(0xBEEF);
    w.write_u16_be(0xBEEF);
    w.write_u32_le(0x0102_0304);
    w.write_addr(&[1, 2, 3, 4, 5, 6]);

    let bytes = w.into_vec();
    let mut c = Cursor::new(&bytes);
    assert_eq!(c.read_u8().unwrap(), 0x7F);
    assert_eq!(c.read_u16_le().unwrap(), 0xBEEF);
    assert_eq!(c.read_u16_be().unwrap(), 0xBEEF);
    assert_eq!(c.read_u32_le().unwrap(), 0x0102_0304);
    assert_eq!(c.read_addr().unwrap(), [1, 2, 3, 4, 5, 6]);
    assert!(c.is_empty());
}

#[test]
fn u64_le_roundtrips() {
    let mut w = OwnedBuf::new();
    w.write_u8(1); // misalign the start on purpose
    let bytes = {
        let mut v = w.into_vec();
        v.extend_from_slice(&0xDEAD_BEEF_CAFE_BABEu64.to_le_bytes());
        v
    };
    let mut c = Cursor::new(&bytes);
    c.strip(1).unwrap();
    assert_eq!(c.read_u64_le().unwrap(), 0xDEAD_BEEF_CAFE_BABE);
}

#[test]
fn tlv_roundtrip_preserves_type_length_value() {
    let mut w = OwnedBuf::new();
    w.write_tlv(9, &[1, 2, 3]);
    w.write_tlv(20, &[]);
    let bytes = w.into_vec();

    let mut c = Cursor::new(&bytes);
    let (ty1, val1) = c.read_tlv().unwrap();
    assert_eq!(ty1, 9);
    assert_eq!(val1, &[1, 2, 3]);
    let (ty2, val2) = c.read_tlv().unwrap();
    assert_eq!(ty2, 20);
    assert!(val2.is_empty());
    assert!(c.is_empty());
}

#[test]
fn out_of_range_offset_fails_without_mutating_cursor() {
    let bytes = [0xAAu8, 0xBB];
    let mut c = Cursor::new(&bytes);
    assert_eq!(c.read_u32_le(), Err(WireError::OutOfBounds));
    // Position must be unchanged: the two bytes are still readable.
    assert_eq!(c.read_u16_le().unwrap(), 0xBBAA);
    assert!(c.is_empty());
}

#[test]
fn int_string_truncates_but_still_consumes_full_length() {
    let mut w = OwnedBuf::new();
    w.write_u8(5);
    w.write_bytes(b"hello");
    w.write_u8(0xFF); // sentinel to prove the cursor advanced past "hello"
    let bytes = w.into_vec();

    let mut c = Cursor::new(&bytes);
    let s = c.read_int_string(3).unwrap();
    assert_eq!(s, "hel");
    assert_eq!(c.read_u8().unwrap(), 0xFF);
}
