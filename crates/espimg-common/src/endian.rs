//! Endianness marker types and the trait that lets [`crate::number::U16`],
//! [`crate::number::U32`] and [`crate::number::U64`] be generic over byte order.

/// A zero-sized marker describing how a fixed-width integer is packed into bytes.
pub trait Endianness: Copy {
    fn get_u16(bytes: [u8; 2]) -> u16;
    fn set_u16(value: u16, bytes: &mut [u8; 2]);
    fn get_u32(bytes: [u8; 4]) -> u32;
    fn set_u32(value: u32, bytes: &mut [u8; 4]);
    fn get_u64(bytes: [u8; 8]) -> u64;
    fn set_u64(value: u64, bytes: &mut [u8; 8]);
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Zeroable, bytemuck::Pod)]
pub struct LittleEndian;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Zeroable, bytemuck::Pod)]
pub struct BigEndian;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Zeroable, bytemuck::Pod)]
pub struct NativeEndian;

impl Endianness for LittleEndian {
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }
    fn set_u16(value: u16, bytes: &mut [u8; 2]) {
        *bytes = value.to_le_bytes();
    }
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }
    fn set_u32(value: u32, bytes: &mut [u8; 4]) {
        *bytes = value.to_le_bytes();
    }
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_le_bytes(bytes)
    }
    fn set_u64(value: u64, bytes: &mut [u8; 8]) {
        *bytes = value.to_le_bytes();
    }
}

impl Endianness for BigEndian {
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }
    fn set_u16(value: u16, bytes: &mut [u8; 2]) {
        *bytes = value.to_be_bytes();
    }
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_be_bytes(bytes)
    }
    fn set_u32(value: u32, bytes: &mut [u8; 4]) {
        *bytes = value.to_be_bytes();
    }
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_be_bytes(bytes)
    }
    fn set_u64(value: u64, bytes: &mut [u8; 8]) {
        *bytes = value.to_be_bytes();
    }
}

impl Endianness for NativeEndian {
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_ne_bytes(bytes)
    }
    fn set_u16(value: u16, bytes: &mut [u8; 2]) {
        *bytes = value.to_ne_bytes();
    }
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_ne_bytes(bytes)
    }
    fn set_u32(value: u32, bytes: &mut [u8; 4]) {
        *bytes = value.to_ne_bytes();
    }
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_ne_bytes(bytes)
    }
    fn set_u64(value: u64, bytes: &mut [u8; 8]) {
        *bytes = value.to_ne_bytes();
    }
}

/// Common interface for the endian-wrapped integer types.
pub trait Endian {
    type Output;

    fn new(value: Self::Output) -> Self;
    fn get(&self) -> Self::Output;
    fn set(&mut self, value: Self::Output);
}
