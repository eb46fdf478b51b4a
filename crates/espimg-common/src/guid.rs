//! GUID values used by the GPT layout: well-known partition type GUIDs plus a
//! pseudo-random generator for disk and partition-instance GUIDs.
//!
//! These GUIDs are opaque 16-byte identifiers to firmware; no field-wise
//! version/variant encoding is required (see the data model notes on why).

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const ZERO: Self = Self([0; 16]);

    /// `C12A7328-F81F-11D2-BA4B-00A0C93EC93B`, little-endian on disk.
    pub const EFI_SYSTEM_PARTITION: Self = Self([
        0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9,
        0x3b,
    ]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// A uniform source of random bytes for GUIDs and volume serial numbers.
///
/// Kept as a trait (rather than calling `rand::rng()` directly everywhere) so
/// tests can substitute a deterministic source for reproducible fixtures.
pub trait GuidSource {
    fn next_guid(&mut self) -> Guid;
    fn next_u32(&mut self) -> u32;
}

#[cfg(feature = "guid")]
pub struct RandGuidSource {
    rng: rand::rngs::ThreadRng,
}

#[cfg(feature = "guid")]
impl RandGuidSource {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

#[cfg(feature = "guid")]
impl Default for RandGuidSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "guid")]
impl GuidSource for RandGuidSource {
    fn next_guid(&mut self) -> Guid {
        use rand::RngCore;
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        Guid(bytes)
    }

    fn next_u32(&mut self) -> u32 {
        use rand::RngCore;
        self.rng.next_u32()
    }
}

/// A fixed-sequence source, useful for scenario tests that assert byte-exact
/// output around a GUID field without pinning the value itself.
pub struct FixedGuidSource {
    guid: Guid,
    serial: u32,
}

impl FixedGuidSource {
    pub const fn new(guid: Guid, serial: u32) -> Self {
        Self { guid, serial }
    }
}

impl GuidSource for FixedGuidSource {
    fn next_guid(&mut self) -> Guid {
        self.guid
    }

    fn next_u32(&mut self) -> u32 {
        self.serial
    }
}
