use super::DictKey;
use crate::cell::*;
use crate::error::Error;
use crate::util::unlikely;

/// Converts typed keys into their bit representation and back.
pub trait KeyCodec<K> {
    /// Encodes the key as exactly `key_bit_len` bits.
    fn encode_key(&self, key: &K, key_bit_len: u16) -> Result<BitString, Error>;

    /// Decodes the key from its full bit representation.
    fn decode_key(&self, key: &BitString) -> Result<K, Error>;
}

/// Converts typed values into leaf cell contents and back.
pub trait ValueCodec<V> {
    /// Writes the value into the leaf after its label.
    fn store_value(&self, value: &V, builder: &mut CellBuilder) -> Result<(), Error>;

    /// Reads the value from the remaining part of the leaf.
    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<V, Error>;
}

/// Key codec which uses the [`DictKey`] implementation of the key.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct NaturalKey;

impl<K: DictKey> KeyCodec<K> for NaturalKey {
    fn encode_key(&self, key: &K, key_bit_len: u16) -> Result<BitString, Error> {
        let mut builder = CellBuilder::new();
        ok!(key.store_key(key_bit_len, &mut builder));
        if unlikely(builder.size_bits() != key_bit_len) {
            return Err(Error::InvalidData);
        }
        Ok(builder.as_bit_string())
    }

    #[inline]
    fn decode_key(&self, key: &BitString) -> Result<K, Error> {
        K::load_key(key)
    }
}

/// Value codec which uses the [`Store`] and [`Load`] implementations of the value.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct NaturalValue;

impl<V> ValueCodec<V> for NaturalValue
where
    for<'a> V: Store + Load<'a>,
{
    #[inline]
    fn store_value(&self, value: &V, builder: &mut CellBuilder) -> Result<(), Error> {
        value.store_into(builder)
    }

    #[inline]
    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<V, Error> {
        V::load_from(slice)
    }
}

/// Value codec which stores the cell contents inline in the leaf.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RawValue;

impl ValueCodec<Cell> for RawValue {
    fn store_value(&self, value: &Cell, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_slice(&ok!(value.as_slice()))
    }

    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<Cell, Error> {
        let value = slice.load_remaining();
        ok!(value.to_builder()).build()
    }
}

/// Value codec which stores the cell as a reference of the leaf.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RefValue;

impl ValueCodec<Cell> for RefValue {
    #[inline]
    fn store_value(&self, value: &Cell, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(value.clone())
    }

    #[inline]
    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<Cell, Error> {
        slice.load_reference_cloned()
    }
}

/// Value codec for token amounts (`Grams`).
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct CoinsValue;

impl ValueCodec<u128> for CoinsValue {
    #[inline]
    fn store_value(&self, value: &u128, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_coins(*value)
    }

    #[inline]
    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<u128, Error> {
        slice.load_coins()
    }
}

/// Value codec for fixed-width unsigned integers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct UintValue(pub u16);

impl ValueCodec<u64> for UintValue {
    #[inline]
    fn store_value(&self, value: &u64, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_uint(*value, self.0)
    }

    #[inline]
    fn load_value(&self, slice: &mut CellSlice<'_>) -> Result<u64, Error> {
        slice.load_uint(self.0)
    }
}
