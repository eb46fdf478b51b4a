//! IEEE 802.3 (ISO-HDLC) CRC32: reflected algorithm, polynomial `0xEDB88320`.

use crc::{Crc, CRC_32_ISO_HDLC};

const HASHER: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Computes the IEEE CRC32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    HASHER.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iee_test_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}
