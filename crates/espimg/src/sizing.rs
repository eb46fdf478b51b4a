//! Image sizing (§3, §4.7 step 1): `max(content_bytes, 128 MiB)` rounded up
//! to a 128 MiB boundary, then up to the sector size.

use espimg_io::SECTOR_SIZE;

pub const MIN_IMAGE_BYTES: u64 = 128 * 1024 * 1024;
const ALIGN_BYTES: u64 = 128 * 1024 * 1024;

pub fn target_size_bytes(content_bytes: u64) -> u64 {
    let floor = content_bytes.max(MIN_IMAGE_BYTES);
    let aligned = floor.div_ceil(ALIGN_BYTES) * ALIGN_BYTES;
    aligned.div_ceil(SECTOR_SIZE as u64) * SECTOR_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_content_rounds_up_to_minimum() {
        assert_eq!(target_size_bytes(4096), MIN_IMAGE_BYTES);
    }

    #[test]
    fn content_above_minimum_rounds_up_to_next_128_mib() {
        let content = MIN_IMAGE_BYTES + 1;
        assert_eq!(target_size_bytes(content), MIN_IMAGE_BYTES * 2);
    }

    #[test]
    fn exact_multiple_is_unchanged() {
        assert_eq!(target_size_bytes(MIN_IMAGE_BYTES * 3), MIN_IMAGE_BYTES * 3);
    }
}
