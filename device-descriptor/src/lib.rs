#![cfg_attr(not(test), no_std)]

// The register macros refer to this crate by name, including in our own tests.
#[cfg(test)]
extern crate self as device_descriptor;

use core::{convert::TryFrom, marker::PhantomData};

pub trait RegisterWidthType: Copy {
    const WIDTH: u8;

    fn from_32(data: u32) -> Self;
    fn to_32(self) -> u32;
}

impl RegisterWidthType for u8 {
    const WIDTH: u8 = 8;

    fn from_32(data: u32) -> Self {
        debug_assert!(data <= u8::MAX as u32);
        data as u8
    }

    fn to_32(self) -> u32 {
        self as u32
    }
}

impl RegisterWidthType for u16 {
    const WIDTH: u8 = 16;

    fn from_32(data: u32) -> Self {
        debug_assert!(data <= u16::MAX as u32);
        data as u16
    }

    fn to_32(self) -> u32 {
        self as u32
    }
}

pub trait Proxy {
    type RegisterWidth: RegisterWidthType;

    fn bits(&self) -> Self::RegisterWidth;
    fn from_bits(bits: Self::RegisterWidth) -> Self;
}

pub trait WriterProxy: Proxy {
    fn write_bits(self, bits: Self::RegisterWidth) -> Self;
    fn reset(self) -> Self;
}

/// A register that can be read from the device.
pub trait ReadOnlyRegister: Proxy + Copy {
    const ADDRESS: u8;
    const NAME: &'static str;
}

/// A register that can also be written. Writes start from `DEFAULT_VALUE` (see [`Register::new`])
/// or from a previously read value (see [`Register::modify`]).
pub trait Register: ReadOnlyRegister {
    type Writer: WriterProxy<RegisterWidth = Self::RegisterWidth>;

    const DEFAULT_VALUE: Self::RegisterWidth;

    fn new(f: impl Fn(Self::Writer) -> Self::Writer) -> Self;
    fn modify(self, f: impl Fn(Self::Writer) -> Self::Writer) -> Self;
}

pub struct Field<const POS: u8, const WIDTH: u8, DataType, P> {
    _marker: PhantomData<DataType>,
    reg: P,
}

impl<const POS: u8, const WIDTH: u8, DataType, P> Field<POS, WIDTH, DataType, P>
where
    P: Proxy,
    DataType: TryFrom<P::RegisterWidth> + Into<P::RegisterWidth>,
{
    const FITS: () = assert!(POS + WIDTH <= <P::RegisterWidth as RegisterWidthType>::WIDTH);

    const MASK: u32 = (1u32 << WIDTH) - 1;

    pub const fn new(reg: P) -> Self {
        Field {
            _marker: PhantomData,
            reg,
        }
    }

    #[inline(always)]
    pub fn read_field_bits(&self) -> P::RegisterWidth {
        #[allow(clippy::let_unit_value)]
        let _ = Self::FITS;

        P::RegisterWidth::from_32((self.reg.bits().to_32() >> POS as u32) & Self::MASK)
    }

    #[inline(always)]
    pub fn read(&self) -> Option<DataType> {
        DataType::try_from(self.read_field_bits()).ok()
    }
}

impl<const POS: u8, const WIDTH: u8, DataType, P> Field<POS, WIDTH, DataType, P>
where
    P: WriterProxy,
    DataType: TryFrom<P::RegisterWidth> + Into<P::RegisterWidth>,
{
    #[inline(always)]
    fn write_field(data: P::RegisterWidth, value: P::RegisterWidth) -> P::RegisterWidth {
        // make sure value fits into field
        debug_assert!(value.to_32() <= Self::MASK);

        let shifted_mask = Self::MASK << POS as u32;
        let masked_field = data.to_32() & !shifted_mask;

        P::RegisterWidth::from_32(masked_field | ((value.to_32() & Self::MASK) << POS as u32))
    }

    #[inline(always)]
    pub fn write(self, value: DataType) -> P {
        let bits = self.reg.bits();

        self.reg.write_bits(Self::write_field(bits, value.into()))
    }
}

#[macro_export]
macro_rules! impl_fields {
    () => {};

    ($($field:ident(pos = $pos:literal, width = $width:literal): $type:ty),*) => {
        $(
            #[inline(always)]
            #[allow(non_snake_case)]
            pub fn $field(self) -> Field<$pos, $width, $type, Self> {
                Field::new(self)
            }
        )*
    };
}

#[macro_export]
macro_rules! register {
    ($reg:ident ($rwt:ty, addr = $addr:literal) {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ty ),*
    } ) => {
        impl ReadOnlyRegister for $reg {
            const ADDRESS: u8 = $addr;
            const NAME: &'static str = stringify!($reg);
        }

        impl Proxy for $reg {
            type RegisterWidth = $rwt;

            #[inline(always)]
            fn from_bits(bits: $rwt) -> Self {
                Self { value: bits }
            }

            #[inline(always)]
            fn bits(&self) -> $rwt {
                self.value
            }
        }

        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[must_use]
        #[allow(non_camel_case_types)]
        pub struct $reg {
            value: $rwt
        }

        impl $reg {
            $crate::impl_fields! { $($field(pos = $pos, width = $width): $type),* }
        }
    };

    ($reg:ident ($rwt:ty, addr = $addr:literal, default = $default:literal) {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ty ),*
    } ) => {

        $crate::register!($reg($rwt, addr = $addr) { $( $field(pos = $pos, width = $width): $type ),* });

        impl Default for $reg {
            #[inline(always)]
            fn default() -> Self {
                Self::from_bits(Self::DEFAULT_VALUE)
            }
        }

        impl Register for $reg {
            type Writer = writer_proxies::$reg;

            const DEFAULT_VALUE: $rwt = $default;

            #[inline(always)]
            fn new(f: impl Fn(Self::Writer) -> Self::Writer) -> Self {
                Self::from_bits(
                    f(Self::Writer::from_bits(Self::DEFAULT_VALUE)).bits()
                )
            }

            #[inline(always)]
            fn modify(self, f: impl Fn(Self::Writer) -> Self::Writer) -> Self {
                Self::from_bits(
                    f(Self::Writer::from_bits(self.value)).bits()
                )
            }
        }

        impl writer_proxies::$reg {
            $crate::impl_fields! { $($field(pos = $pos, width = $width): $type),* }
        }
    };

    ($reg:ident $proto:tt {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ident $({
            $( $name:ident = $value:literal),+
        })? ),*
    } ) => {
        $( $(
            #[derive(Debug, PartialEq, Eq, Copy, Clone)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub enum $type {
                $($name = $value),+
            }

            impl core::convert::TryFrom<u8> for $type {
                type Error = u8;

                fn try_from(data: u8) -> Result<Self, Self::Error> {
                    match data {
                        $($value => Ok($type::$name)),+,
                        _ => Err(data)
                    }
                }
            }

            impl core::convert::TryFrom<u16> for $type {
                type Error = u16;

                fn try_from(data: u16) -> Result<Self, Self::Error> {
                    match data {
                        $($value => Ok($type::$name)),+,
                        _ => Err(data)
                    }
                }
            }

            impl From<$type> for u8 {
                fn from(data: $type) -> u8 {
                    data as u8
                }
            }

            impl From<$type> for u16 {
                fn from(data: $type) -> u16 {
                    data as u16
                }
            }
        )? )*
        $crate::register!($reg $proto { $( $field(pos = $pos, width = $width): $type ),*} );
    };
}

#[macro_export]
macro_rules! writer_proxy {
    ($reg:ident ($rwt:ty, addr = $addr:literal) {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ty ),*
    } ) => {};

    ($reg:ident ($rwt:ty, addr = $addr:literal, default = $default:literal) {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ty ),*
    } ) => {
        #[allow(non_camel_case_types)]
        pub struct $reg {
            bits: $rwt
        }

        impl Proxy for $reg {
            type RegisterWidth = $rwt;

            #[inline(always)]
            fn from_bits(bits: $rwt) -> Self {
                Self {
                    bits
                }
            }

            #[inline(always)]
            fn bits(&self) -> $rwt {
                self.bits
            }
        }

        impl WriterProxy for $reg {
            #[inline(always)]
            fn write_bits(self, bits: $rwt) -> Self {
                Self::from_bits(bits)
            }

            #[inline(always)]
            fn reset(self) -> Self {
                self.write_bits($default)
            }
        }
    };

    ($reg:ident $proto:tt {
        $( $field:ident(pos = $pos:literal, width = $width:literal): $type:ident $({
            $( $name:ident = $value:literal),+
        })? ),*
    } ) => {
        $crate::writer_proxy!($reg $proto { $( $field(pos = $pos, width = $width): $type ),*} );
    };
}

#[macro_export]
macro_rules! device {
    (
        $( $(#[$meta:meta])* $reg:ident($($proto:tt)*) {
            $($fields:tt)*
        } )+
    ) => {

        mod writer_proxies {
            #[allow(unused_imports)]
            use device_descriptor::*;

            $(
                $crate::writer_proxy!($reg($($proto)*) { $($fields)* } );
            )+
        }

        $(
            $crate::register!($reg($($proto)*) { $($fields)* } );
        )+
    }
}
