//! Dictionary implementation.

use crate::address::StdAddr;
use crate::cell::*;
use crate::error::Error;
use crate::util::unlikely;

pub use self::aug::{AugDictExtra, AugHashMap};
pub use self::codec::{
    CoinsValue, KeyCodec, NaturalKey, NaturalValue, RawValue, RefValue, UintValue, ValueCodec,
};
pub use self::hashmap::{HashMap, Iter, Keys, Values};

mod aug;
mod codec;
mod hashmap;

#[cfg(test)]
mod tests;

/// Type which can be used as a dictionary key.
pub trait DictKey: Sized {
    /// Writes the key as exactly `bits` bits.
    ///
    /// Keys with a fixed layout may ignore `bits` and write their natural
    /// representation, the width is checked by the caller.
    fn store_key(&self, bits: u16, builder: &mut CellBuilder) -> Result<(), Error>;

    /// Reads the key from its full bit representation.
    fn load_key(key: &BitString) -> Result<Self, Error>;
}

macro_rules! impl_dict_key_uint {
    ($($ty:ty),*$(,)?) => {
        $(impl DictKey for $ty {
            #[inline]
            fn store_key(&self, bits: u16, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.store_uint(*self as u64, bits)
            }

            fn load_key(key: &BitString) -> Result<Self, Error> {
                match <$ty>::try_from(ok!(key_to_u128(key))) {
                    Ok(value) => Ok(value),
                    Err(_) => Err(Error::IntOverflow),
                }
            }
        })*
    };
}

macro_rules! impl_dict_key_int {
    ($($ty:ty),*$(,)?) => {
        $(impl DictKey for $ty {
            #[inline]
            fn store_key(&self, bits: u16, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.store_int(*self as i64, bits)
            }

            fn load_key(key: &BitString) -> Result<Self, Error> {
                match <$ty>::try_from(ok!(key_to_i128(key))) {
                    Ok(value) => Ok(value),
                    Err(_) => Err(Error::IntOverflow),
                }
            }
        })*
    };
}

impl_dict_key_uint!(u8, u16, u32, u64);
impl_dict_key_int!(i8, i16, i32, i64);

impl DictKey for u128 {
    fn store_key(&self, bits: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        if bits >= 128 {
            ok!(builder.store_zeros(bits - 128));
            return builder.store_u128(*self);
        }
        if unlikely(*self >> bits != 0) {
            return Err(Error::IntOverflow);
        }
        let low_bits = std::cmp::min(bits, 64);
        ok!(builder.store_uint((*self >> 64) as u64, bits - low_bits));
        builder.store_uint(*self as u64, low_bits)
    }

    #[inline]
    fn load_key(key: &BitString) -> Result<Self, Error> {
        key_to_u128(key)
    }
}

impl DictKey for HashBytes {
    #[inline]
    fn store_key(&self, _: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u256(self)
    }

    fn load_key(key: &BitString) -> Result<Self, Error> {
        if key.len() == 256 {
            Ok(HashBytes::from_slice(key.as_raw_data()))
        } else {
            Err(Error::InvalidData)
        }
    }
}

impl DictKey for StdAddr {
    #[inline]
    fn store_key(&self, _: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        self.store_into(builder)
    }

    fn load_key(key: &BitString) -> Result<Self, Error> {
        let mut builder = CellBuilder::new();
        ok!(builder.store_bit_string(key));
        let cell = ok!(builder.build());

        let mut slice = ok!(cell.as_slice());
        let addr = ok!(StdAddr::load_from(&mut slice));
        if slice.is_data_empty() {
            Ok(addr)
        } else {
            Err(Error::InvalidData)
        }
    }
}

impl DictKey for BitString {
    #[inline]
    fn store_key(&self, _: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_bit_string(self)
    }

    #[inline]
    fn load_key(key: &BitString) -> Result<Self, Error> {
        Ok(key.clone())
    }
}

#[cfg(feature = "bigint")]
impl DictKey for num_bigint::BigUint {
    #[inline]
    fn store_key(&self, bits: u16, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_biguint(self, bits)
    }

    fn load_key(key: &BitString) -> Result<Self, Error> {
        let data = key.as_raw_data();
        let padding = data.len() * 8 - key.len() as usize;
        Ok(num_bigint::BigUint::from_bytes_be(data) >> padding)
    }
}

fn key_to_u128(key: &BitString) -> Result<u128, Error> {
    let mut result = 0u128;
    for bit in key.iter() {
        if unlikely(result >> 127 != 0) {
            return Err(Error::IntOverflow);
        }
        result = (result << 1) | bit as u128;
    }
    Ok(result)
}

fn key_to_i128(key: &BitString) -> Result<i128, Error> {
    let mut result = match key.get(0) {
        Some(true) => -1i128,
        _ => 0,
    };
    for bit in key.iter() {
        result = match result.checked_mul(2) {
            Some(value) => value | bit as i128,
            None => return Err(Error::IntOverflow),
        };
    }
    Ok(result)
}

/// Returns the value slice stored at `key` in the dictionary with
/// the specified root, without parsing the whole dictionary.
///
/// `key` must be exactly `key_bit_len` bits long.
pub fn dict_get<'a>(
    root: Option<&'a Cell>,
    key_bit_len: u16,
    key: &BitString,
) -> Result<Option<CellSlice<'a>>, Error> {
    if unlikely(key.len() != key_bit_len) {
        return Err(Error::InvalidData);
    }

    let mut data = match root {
        Some(root) => ok!(root.as_slice()),
        None => return Ok(None),
    };

    let mut offset = 0;
    loop {
        let remaining = key_bit_len - offset;
        let prefix = ok!(read_label(&mut data, remaining));

        let Some(rest) = key.range(offset, remaining) else {
            return Err(Error::CellUnderflow);
        };
        if !rest.starts_with(&prefix) {
            return Ok(None);
        }

        offset += prefix.len();
        if offset == key_bit_len {
            return Ok(Some(data));
        }

        // A fork consumes one more key bit to select the branch
        let bit = key.get(offset).unwrap_or_default();
        offset += 1;

        let child = ok!(data.get_reference(bit as u8));
        data = ok!(child.as_slice());
    }
}

/// Writes the cheapest encoding of `key` as an edge label (`HmLabel ~l m`)
/// where `key_bit_len` is the number of remaining key bits `m`.
pub fn write_label(key: &BitString, key_bit_len: u16, label: &mut CellBuilder) -> Result<(), Error> {
    if unlikely(key.len() > key_bit_len) {
        return Err(Error::InvalidLabel);
    }
    if key_bit_len == 0 || key.is_empty() {
        return write_hml_empty(label);
    }

    let bits_for_len = (16 - key_bit_len.leading_zeros()) as u16;

    let remaining_bits = key.len();

    let hml_short_len = 2 + 2 * remaining_bits;
    let hml_long_len = 2 + bits_for_len + remaining_bits;
    let hml_same_len = 3 + bits_for_len;

    if hml_same_len < hml_long_len && hml_same_len < hml_short_len {
        if let Some(bit) = key.test_uniform() {
            return write_hml_same(bit, remaining_bits, bits_for_len, label);
        }
    }

    if hml_short_len <= MAX_BIT_LEN && hml_short_len <= hml_long_len {
        ok!(write_hml_short_tag(remaining_bits, label));
    } else if hml_long_len <= MAX_BIT_LEN {
        ok!(write_hml_long_tag(remaining_bits, bits_for_len, label));
    } else {
        return Err(Error::InvalidData);
    }
    label.store_bit_string(key)
}

/// Reads an edge label (`HmLabel ~l m`) where `key_bit_len` is
/// the number of remaining key bits `m`.
pub fn read_label(label: &mut CellSlice<'_>, key_bit_len: u16) -> Result<BitString, Error> {
    let bits_for_len = (16 - key_bit_len.leading_zeros()) as u16;

    if label.is_data_empty() && bits_for_len == 0 {
        return Ok(BitString::new());
    }

    let result = if !ok!(label.load_bit()) {
        ok!(read_hml_short(label))
    } else if !ok!(label.load_bit()) {
        ok!(read_hml_long(label, bits_for_len))
    } else {
        ok!(read_hml_same(label, bits_for_len))
    };

    if unlikely(result.len() > key_bit_len) {
        return Err(Error::InvalidLabel);
    }
    Ok(result)
}

fn write_hml_empty(label: &mut CellBuilder) -> Result<(), Error> {
    label.store_zeros(2)
}

fn write_hml_short_tag(len: u16, label: &mut CellBuilder) -> Result<(), Error> {
    ok!(label.store_bit_zero());
    ok!(label.store_ones(len));
    label.store_bit_zero()
}

fn read_hml_short(label: &mut CellSlice<'_>) -> Result<BitString, Error> {
    let mut len = 0;
    while ok!(label.load_bit()) {
        len += 1;
    }
    label.load_bit_string(len)
}

fn write_hml_long_tag(len: u16, bits_for_len: u16, label: &mut CellBuilder) -> Result<(), Error> {
    ok!(label.store_bit_one());
    ok!(label.store_bit_zero());
    label.store_uint(len as u64, bits_for_len)
}

fn read_hml_long(label: &mut CellSlice<'_>, bits_for_len: u16) -> Result<BitString, Error> {
    let len = ok!(label.load_uint(bits_for_len));
    if unlikely(len > MAX_BIT_LEN as u64) {
        return Err(Error::InvalidLabel);
    }
    label.load_bit_string(len as u16)
}

fn write_hml_same(
    bit: bool,
    len: u16,
    bits_for_len: u16,
    label: &mut CellBuilder,
) -> Result<(), Error> {
    ok!(label.store_small_uint(0b110 | bit as u8, 3));
    label.store_uint(len as u64, bits_for_len)
}

fn read_hml_same(label: &mut CellSlice<'_>, bits_for_len: u16) -> Result<BitString, Error> {
    let bit = ok!(label.load_bit());
    let len = ok!(label.load_uint(bits_for_len));
    if unlikely(len > MAX_BIT_LEN as u64) {
        return Err(Error::InvalidLabel);
    }

    let mut result = BitString::new();
    for _ in 0..len {
        ok!(result.push(bit));
    }
    Ok(result)
}

impl CellBuilder {
    /// Stores a dictionary root as `HashmapE` (a maybe reference).
    #[inline]
    pub fn store_dict(&mut self, root: Option<Cell>) -> Result<(), Error> {
        self.store_maybe_reference(root)
    }
}

impl<'a> CellSlice<'a> {
    /// Loads a `HashmapE` root without parsing it.
    #[inline]
    pub fn load_dict_root(&mut self) -> Result<Option<Cell>, Error> {
        self.load_maybe_reference_cloned()
    }

    /// Loads a `HashmapE` with `key_bit_len`-bit keys.
    pub fn load_dict<K, V>(&mut self, key_bit_len: u16) -> Result<HashMap<K, V>, Error>
    where
        K: DictKey,
        for<'b> V: Store + Load<'b>,
    {
        HashMap::load_from(self, key_bit_len)
    }

    /// Loads a non-empty `Hashmap` whose root node is stored inline
    /// in the remaining part of this slice.
    pub fn load_hashmap<K, V>(&mut self, key_bit_len: u16) -> Result<HashMap<K, V>, Error>
    where
        K: DictKey,
        for<'b> V: Store + Load<'b>,
    {
        let mut result = HashMap::new(key_bit_len);
        ok!(result.parse_node(self));
        Ok(result)
    }

    /// Loads a non-empty `HashmapAug` whose root node is stored inline
    /// in the remaining part of this slice.
    pub fn load_hashmap_aug<K, A, V>(
        &mut self,
        key_bit_len: u16,
    ) -> Result<AugHashMap<K, A, V>, Error>
    where
        K: DictKey,
        for<'b> A: AugDictExtra + Store + Load<'b>,
        for<'b> V: Store + Load<'b>,
    {
        let mut result = AugHashMap::new(key_bit_len);
        ok!(result.parse_node(self));
        Ok(result)
    }

    /// Loads a `HashmapAugE` with `key_bit_len`-bit keys.
    #[inline]
    pub fn load_hashmap_aug_e<K, A, V>(
        &mut self,
        key_bit_len: u16,
    ) -> Result<AugHashMap<K, A, V>, Error>
    where
        K: DictKey,
        for<'b> A: AugDictExtra + Store + Load<'b>,
        for<'b> V: Store + Load<'b>,
    {
        AugHashMap::load_from(self, key_bit_len)
    }
}
