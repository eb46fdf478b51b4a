//! Fixed-width integers that carry their byte order in the type, so on-disk
//! structs can be declared with the correct layout instead of converting at
//! every read/write site.

use crate::endian::{Endian, Endianness};
use core::marker::PhantomData;

/// Shorthand for a little-endian `U16`/`U32`/`U64`.
pub type LE = crate::endian::LittleEndian;

#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct U16<E: Endianness> {
    bytes: [u8; 2],
    _marker: PhantomData<E>,
}

#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct U32<E: Endianness> {
    bytes: [u8; 4],
    _marker: PhantomData<E>,
}

#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct U64<E: Endianness> {
    bytes: [u8; 8],
    _marker: PhantomData<E>,
}

macro_rules! impl_endian_int {
    ($ty:ident, $prim:ty, $n:literal, $get:ident, $set:ident, $hexw:literal) => {
        impl<E: Endianness> Endian for $ty<E> {
            type Output = $prim;

            fn new(value: $prim) -> Self {
                let mut bytes = [0; $n];
                E::$set(value, &mut bytes);
                Self {
                    bytes,
                    _marker: PhantomData,
                }
            }

            fn get(&self) -> $prim {
                E::$get(self.bytes)
            }

            fn set(&mut self, value: $prim) {
                E::$set(value, &mut self.bytes);
            }
        }

        impl<E: Endianness> Default for $ty<E> {
            fn default() -> Self {
                Self::new(0)
            }
        }

        impl<E: Endianness> core::fmt::Debug for $ty<E> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_tuple(stringify!($ty)).field(&self.get()).finish()
            }
        }

        impl<E: Endianness> core::fmt::LowerHex for $ty<E> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!("0x{:0", $hexw, "x}"), self.get())
            }
        }

        impl<E: Endianness> From<$prim> for $ty<E> {
            fn from(value: $prim) -> Self {
                Self::new(value)
            }
        }
    };
}

impl_endian_int!(U16, u16, 2, get_u16, set_u16, 4);
impl_endian_int!(U32, u32, 4, get_u32, set_u32, 8);
impl_endian_int!(U64, u64, 8, get_u64, set_u64, 16);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::LittleEndian;

    #[test]
    fn roundtrip_u16() {
        let v = U16::<LittleEndian>::new(0x1234);
        assert_eq!(v.get(), 0x1234);
        assert_eq!(bytemuck::bytes_of(&v), &[0x34, 0x12]);
    }

    #[test]
    fn roundtrip_u32() {
        let v = U32::<LittleEndian>::new(0xDEAD_BEEF);
        assert_eq!(v.get(), 0xDEAD_BEEF);
        assert_eq!(bytemuck::bytes_of(&v), &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn roundtrip_u64() {
        let v = U64::<LittleEndian>::new(34);
        assert_eq!(v.get(), 34);
        assert_eq!(
            bytemuck::bytes_of(&v),
            &[34, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
