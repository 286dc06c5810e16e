//! Integer types used in cell serialization.

use std::num::NonZeroU8;

use crate::cell::{CellBuilder, CellSlice, Load, Store};
use crate::error::{Error, ParseIntError};
use crate::util::unlikely;

macro_rules! impl_serde {
    ($ident:ident, $inner:ty) => {
        #[cfg(feature = "serde")]
        impl serde::Serialize for $ident {
            #[inline]
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $ident {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let res = Self::new(ok!(<$inner>::deserialize(deserializer)));
                if res.is_valid() {
                    Ok(res)
                } else {
                    Err(serde::de::Error::custom(concat!(
                        "value is too large for ",
                        stringify!($ident)
                    )))
                }
            }
        }
    };
}

macro_rules! impl_ops {
    ($ident:ident, $inner:ty) => {
        impl From<$ident> for $inner {
            #[inline]
            fn from(value: $ident) -> Self {
                value.0
            }
        }

        impl TryFrom<$inner> for $ident {
            type Error = ParseIntError;

            #[inline]
            fn try_from(inner: $inner) -> Result<Self, Self::Error> {
                let result = Self::new(inner);
                if result.is_valid() {
                    Ok(result)
                } else {
                    Err(ParseIntError::Overflow)
                }
            }
        }

        impl std::str::FromStr for $ident {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.parse::<$inner>() {
                    Ok(inner) => Self::try_from(inner),
                    Err(e) => Err(ParseIntError::InvalidString(e)),
                }
            }
        }

        impl PartialEq<$inner> for $ident {
            #[inline]
            fn eq(&self, other: &$inner) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $ident {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::ops::Add for $ident {
            type Output = Self;

            #[inline]
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl std::ops::AddAssign for $ident {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::Sub for $ident {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl std::ops::SubAssign for $ident {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl std::iter::Sum for $ident {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |acc, item| acc + item)
            }
        }
    };
}

macro_rules! impl_var_uints {
    ($($(#[doc = $doc:expr])* $vis:vis struct $ident:ident($inner:ty[..$max_bytes:literal]);)*) => {
        $(
            impl_var_uints!{@impl $(#[doc = $doc])* $vis $ident $inner, $max_bytes}
        )*
    };

    (@impl $(#[doc = $doc:expr])* $vis:vis $ident:ident $inner:ty, $max_bytes:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[repr(transparent)]
        $vis struct $ident($inner);

        impl $ident {
            /// Zero value.
            pub const ZERO: Self = $ident(0);

            /// The largest value that fits into `max_bytes` bytes.
            pub const MAX: Self = $ident(((1 as $inner) << ($max_bytes * 8)) - 1);

            /// The number of bits in the length prefix.
            pub const LEN_BITS: u16 = 8 - ($max_bytes as u8).leading_zeros() as u16;

            /// The maximum number of bits that the serialized value occupies.
            pub const MAX_BITS: u16 = Self::LEN_BITS + $max_bytes * 8;

            /// Wraps a primitive integer.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the underlying primitive integer.
            #[inline]
            pub const fn into_inner(self) -> $inner {
                self.0
            }

            /// Returns `true` if the value is zero.
            #[inline]
            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }

            /// Returns `true` if the value can be serialized.
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 <= Self::MAX.0
            }

            /// Returns the number of bits of the serialized value,
            /// or `None` if the value is too large.
            pub const fn bit_len(&self) -> Option<u16> {
                let bytes = (std::mem::size_of::<Self>() as u32 - self.0.leading_zeros() / 8) as u16;
                if unlikely(bytes > $max_bytes) {
                    None
                } else {
                    Some(Self::LEN_BITS + bytes * 8)
                }
            }

            /// Checked addition, `None` if the result is out of range.
            #[inline]
            #[must_use]
            pub const fn checked_add(self, rhs: Self) -> Option<Self> {
                match self.0.checked_add(rhs.0) {
                    Some(value) if value <= Self::MAX.0 => Some($ident(value)),
                    _ => None,
                }
            }

            /// Checked subtraction, `None` if the result is out of range.
            #[inline]
            #[must_use]
            pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
                match self.0.checked_sub(rhs.0) {
                    Some(value) if value <= Self::MAX.0 => Some($ident(value)),
                    _ => None,
                }
            }

            /// Checked multiplication, `None` if the result is out of range.
            #[inline]
            #[must_use]
            pub const fn checked_mul(self, rhs: Self) -> Option<Self> {
                match self.0.checked_mul(rhs.0) {
                    Some(value) if value <= Self::MAX.0 => Some($ident(value)),
                    _ => None,
                }
            }

            /// Checked division, `None` if `rhs` is zero or the result is out of range.
            #[inline]
            #[must_use]
            pub const fn checked_div(self, rhs: Self) -> Option<Self> {
                match self.0.checked_div(rhs.0) {
                    Some(value) if value <= Self::MAX.0 => Some($ident(value)),
                    _ => None,
                }
            }

            /// Adds `other` in place, failing on overflow.
            pub fn try_add_assign(&mut self, other: Self) -> Result<(), Error> {
                match self.checked_add(other) {
                    Some(value) => {
                        *self = value;
                        Ok(())
                    }
                    None => Err(Error::IntOverflow),
                }
            }

            /// Subtracts `other` in place, failing on underflow.
            pub fn try_sub_assign(&mut self, other: Self) -> Result<(), Error> {
                match self.checked_sub(other) {
                    Some(value) => {
                        *self = value;
                        Ok(())
                    }
                    None => Err(Error::IntOverflow),
                }
            }
        }

        impl Store for $ident {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                if unlikely(!self.is_valid()) {
                    return Err(Error::IntOverflow);
                }
                builder.store_var_uint(self.0 as u128, Self::LEN_BITS)
            }
        }

        impl<'a> Load<'a> for $ident {
            fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
                let value = ok!(slice.load_var_uint(Self::LEN_BITS));
                match <$inner>::try_from(value) {
                    Ok(value) if value <= Self::MAX.0 => Ok(Self(value)),
                    _ => Err(Error::IntOverflow),
                }
            }
        }

        impl_ops! { $ident, $inner }
    };
}

impl_var_uints! {
    /// Variable-length 24-bit integer.
    ///
    /// Stored as 2 bits of `len` (`0..=3`), followed by `len` bytes.
    pub struct VarUint24(u32[..3]);

    /// Variable-length 56-bit integer.
    ///
    /// Stored as 3 bits of `len` (`0..=7`), followed by `len` bytes.
    pub struct VarUint56(u64[..7]);

    /// Amount of native currency (`VarUInteger 16`, also known as coins or grams).
    ///
    /// Stored as 4 bits of `len` (`0..=15`), followed by `len` bytes.
    pub struct Tokens(u128[..15]);
}

impl_serde!(VarUint24, u32);
impl_serde!(VarUint56, u64);

#[cfg(feature = "serde")]
impl serde::Serialize for Tokens {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(&self.0)
        } else {
            self.0.serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Tokens {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{Error, Visitor};

        struct TokensVisitor;

        impl Visitor<'_> for TokensVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string with a number")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        let res = Self::new(ok!(if deserializer.is_human_readable() {
            deserializer.deserialize_str(TokensVisitor)
        } else {
            u128::deserialize(deserializer)
        }));

        if res.is_valid() {
            Ok(res)
        } else {
            Err(D::Error::custom("value is too large for Tokens"))
        }
    }
}

/// Fixed-length 9-bit integer.
///
/// Used as a length of external addresses.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Uint9(u16);

impl Uint9 {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// The largest value that can be represented by this integer type.
    pub const MAX: Self = Self((1u16 << 9) - 1);

    /// The number of data bits that this struct occupies.
    pub const BITS: u16 = 9;

    /// Wraps a primitive integer.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the underlying primitive integer.
    #[inline]
    pub const fn into_inner(self) -> u16 {
        self.0
    }

    /// Returns `true` if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the value fits into 9 bits.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX.0
    }

    /// Checked addition, `None` if the result is out of range.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(value) if value <= Self::MAX.0 => Some(Self(value)),
            _ => None,
        }
    }

    /// Checked subtraction, `None` if the result is out of range.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl Store for Uint9 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_uint(self.0 as u64, Self::BITS)
    }
}

impl<'a> Load<'a> for Uint9 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match slice.load_uint(Self::BITS) {
            Ok(value) => Ok(Self(value as u16)),
            Err(e) => Err(e),
        }
    }
}

impl_ops! { Uint9, u16 }
impl_serde!(Uint9, u16);

/// Account split depth. Fixed-length 5-bit integer of range `1..=30`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct SplitDepth(NonZeroU8);

impl SplitDepth {
    /// The minimum allowed number of bits in the rewrite prefix.
    pub const MIN: Self = match NonZeroU8::new(1) {
        Some(value) => Self(value),
        None => unreachable!(),
    };

    /// The maximum allowed number of bits in the rewrite prefix.
    pub const MAX: Self = match NonZeroU8::new(30) {
        Some(value) => Self(value),
        None => unreachable!(),
    };

    /// The number of data bits that this struct occupies.
    pub const BITS: u16 = 5;

    /// Creates a split depth, failing if it is not in range `1..=30`.
    #[inline]
    pub const fn new(value: u8) -> Result<Self, Error> {
        match NonZeroU8::new(value) {
            Some(value) if value.get() <= Self::MAX.0.get() => Ok(Self(value)),
            _ => Err(Error::InvalidAnycast),
        }
    }

    /// Creates a split depth from the number of bits.
    #[inline]
    pub const fn from_bit_len(bit_len: u16) -> Result<Self, Error> {
        if bit_len <= Self::MAX.0.get() as u16 {
            Self::new(bit_len as u8)
        } else {
            Err(Error::InvalidAnycast)
        }
    }

    /// Converts split depth into the number of bits.
    #[inline]
    pub const fn into_bit_len(self) -> u16 {
        self.0.get() as u16
    }
}

impl Store for SplitDepth {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_small_uint(self.0.get(), Self::BITS)
    }
}

impl<'a> Load<'a> for SplitDepth {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match slice.load_small_uint(Self::BITS) {
            Ok(value) => Self::new(value),
            Err(e) => Err(e),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SplitDepth {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.get().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SplitDepth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer) {
            Ok(value) => Self::new(value).map_err(serde::de::Error::custom),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    macro_rules! impl_checked_ops_tests {
        ($ident:ident) => {
            assert_eq!($ident::new(10) + $ident::new(4), $ident::new(14));
            assert_eq!($ident::new(10) - $ident::new(4), $ident::new(6));

            let mut value = $ident::new(10);
            value += $ident::new(4);
            assert_eq!(value, 14);
            value -= $ident::new(14);
            assert!(value.is_zero());

            assert_eq!($ident::MAX.checked_add($ident::new(1)), None);
            assert_eq!(
                $ident::new($ident::MAX.into_inner() - 1).checked_add($ident::new(1)),
                Some($ident::MAX)
            );
            assert_eq!($ident::new(10).checked_sub($ident::new(11)), None);
            assert_eq!($ident::MAX.checked_mul($ident::new(2)), None);
            assert_eq!($ident::new(1).checked_div($ident::ZERO), None);

            let mut value = $ident::MAX;
            assert_eq!(value.try_add_assign($ident::new(1)), Err(Error::IntOverflow));
            assert_eq!(value, $ident::MAX);
        };
    }

    macro_rules! impl_serialization_tests {
        ($ident:ident, $max_bits:literal) => {
            for i in 0..$max_bits {
                let value = $ident::new(1 << i);
                let mut builder = CellBuilder::new();

                if value <= $ident::MAX {
                    value.store_into(&mut builder).unwrap();
                    let cell = builder.build().unwrap();
                    assert_eq!(value.bit_len().unwrap(), cell.bit_len());
                    assert_eq!(cell.parse::<$ident>().unwrap(), value);
                } else {
                    assert_eq!(value.store_into(&mut builder), Err(Error::IntOverflow));
                }
            }

            let cell = CellBuilder::build_from($ident::ZERO).unwrap();
            assert_eq!(cell.bit_len(), $ident::LEN_BITS);
        };
    }

    #[test]
    fn var_uint_ops() {
        impl_checked_ops_tests!(VarUint24);
        impl_checked_ops_tests!(VarUint56);
        impl_checked_ops_tests!(Tokens);
    }

    #[test]
    fn var_uint_serialization() {
        impl_serialization_tests!(VarUint24, 32);
        impl_serialization_tests!(VarUint56, 64);
        impl_serialization_tests!(Tokens, 128);
    }

    #[test]
    fn tokens_match_coins() {
        let value = Tokens::new(1_000_000_000_000_000_000);

        let mut builder = CellBuilder::new();
        builder.store_coins(value.into_inner()).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell, CellBuilder::build_from(value).unwrap());

        let mut slice = cell.as_slice().unwrap();
        assert_eq!(Tokens::load_from(&mut slice).unwrap(), value);
        assert!(slice.is_data_empty());
    }

    #[test]
    fn tokens_from_str() {
        assert_eq!("123".parse::<Tokens>().unwrap(), 123);
        assert!(matches!(
            "1329227995784915872903807060280344576".parse::<Tokens>(),
            Err(ParseIntError::Overflow)
        ));
        assert!(matches!(
            "abc".parse::<Tokens>(),
            Err(ParseIntError::InvalidString(_))
        ));
        assert_eq!(
            [Tokens::new(1), Tokens::new(2)].into_iter().sum::<Tokens>(),
            3
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn tokens_serde() {
        let value = Tokens::new(15);
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"15\"");
        assert_eq!(serde_json::from_str::<Tokens>("\"15\"").unwrap(), value);
        assert!(serde_json::from_str::<Tokens>("\"1329227995784915872903807060280344576\"").is_err());

        assert_eq!(serde_json::from_str::<VarUint24>("16777215").unwrap(), VarUint24::MAX);
        assert!(serde_json::from_str::<VarUint24>("16777216").is_err());
    }

    #[test]
    fn uint9() {
        for value in [0, 1, 255, 511] {
            let cell = CellBuilder::build_from(Uint9::new(value)).unwrap();
            assert_eq!(cell.bit_len(), 9);
            assert_eq!(cell.parse::<Uint9>().unwrap(), value);
        }

        let mut builder = CellBuilder::new();
        assert_eq!(Uint9::new(512).store_into(&mut builder), Err(Error::IntOverflow));
        assert_eq!(Uint9::MAX.checked_add(Uint9::new(1)), None);
    }

    #[test]
    fn split_depth() {
        assert!(SplitDepth::new(0).is_err());
        assert!(SplitDepth::new(31).is_err());
        assert_eq!(SplitDepth::from_bit_len(30).unwrap(), SplitDepth::MAX);

        let cell = CellBuilder::build_from(SplitDepth::MIN).unwrap();
        assert_eq!(cell.bit_len(), SplitDepth::BITS);
        assert_eq!(cell.parse::<SplitDepth>().unwrap(), SplitDepth::MIN);

        // Zero depth is not a valid value
        let cell: Cell = CellBuilder::build_from((0u8, 0u8)).unwrap();
        assert!(cell.parse::<SplitDepth>().is_err());
    }
}
