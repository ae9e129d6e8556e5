//! RFC 4291 modified EUI-64 derivation from a 6-byte hardware address.
//! Pure function, no platform dependency, matching
//! `original_source/daemon/netutils.c`'s `rfc4291_addr`.

/// Flip the universal/local bit (bit 1 of the first octet) and insert
/// `FF:FE` at the midpoint, producing the 8-byte interface identifier
/// used in an AWDL-derived link-local IPv6 address.
pub fn eui64(addr: [u8; 6]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0] = addr[0] ^ 0x02;
    out[1] = addr[1];
    out[2] = addr[2];
    out[3] = 0xFF;
    out[4] = 0xFE;
    out[5] = addr[3];
    out[6] = addr[4];
    out[7] = addr[5];
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_universal_local_bit() {
        let eui = eui64([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(eui[0], 0x02);
    }

    #[test]
    fn inserts_fffe_at_midpoint() {
        let eui = eui64([0xAA, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(&eui[3..5], &[0xFF, 0xFE]);
        assert_eq!(&eui[5..8], &[0x33, 0x44, 0x55]);
    }

    #[test]
    fn double_application_restores_original_bit() {
        let addr = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        let eui = eui64(addr);
        assert_eq!(eui[0] ^ 0x02, addr[0]);
    }
}
