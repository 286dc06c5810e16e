use smallvec::SmallVec;

use super::bit_string::copy_bits;
use super::finalizer::CellParts;
use super::{BitString, Cell, CellSlice, HashBytes, Store, MAX_BIT_LEN, MAX_REF_COUNT};
use crate::error::Error;
use crate::util::unlikely;

/// Builder for constructing cells with densely packed data.
#[derive(Clone)]
pub struct CellBuilder {
    data: [u8; 128],
    bit_len: u16,
    is_exotic: bool,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
}

impl Default for CellBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl CellBuilder {
    /// Creates an empty cell builder.
    pub fn new() -> Self {
        Self {
            data: [0; 128],
            bit_len: 0,
            is_exotic: false,
            references: SmallVec::new(),
        }
    }

    /// Builds a new cell from the specified data using the default finalizer.
    pub fn build_from<T: Store>(data: T) -> Result<Cell, Error> {
        let mut builder = Self::new();
        ok!(data.store_into(&mut builder));
        builder.build()
    }

    /// Returns whether the cell will be built as exotic.
    #[inline]
    pub const fn is_exotic(&self) -> bool {
        self.is_exotic
    }

    /// Marks this cell as exotic.
    #[inline]
    pub fn set_exotic(&mut self, is_exotic: bool) {
        self.is_exotic = is_exotic;
    }

    /// Returns the stored cell data, without a completion tag.
    #[inline]
    pub fn raw_data(&self) -> &[u8] {
        &self.data[..(self.bit_len as usize + 7) / 8]
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub const fn size_bits(&self) -> u16 {
        self.bit_len
    }

    /// Returns the number of stored references.
    #[inline]
    pub fn size_refs(&self) -> u8 {
        self.references.len() as u8
    }

    /// Returns the remaining capacity in bits.
    #[inline]
    pub const fn spare_bits_capacity(&self) -> u16 {
        MAX_BIT_LEN - self.bit_len
    }

    /// Returns the remaining capacity in references.
    #[inline]
    pub fn spare_refs_capacity(&self) -> u8 {
        (MAX_REF_COUNT - self.references.len()) as u8
    }

    /// Returns `true` if there is enough space for `bits` and `refs`.
    #[inline]
    pub fn has_capacity(&self, bits: u16, refs: u8) -> bool {
        self.bit_len as usize + bits as usize <= MAX_BIT_LEN as usize
            && self.references.len() + refs as usize <= MAX_REF_COUNT
    }

    /// Returns the stored bits as an owned bit string.
    pub fn as_bit_string(&self) -> BitString {
        BitString::from_raw(&self.data, self.bit_len).unwrap_or_default()
    }

    /// Returns child cells.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.references
    }

    /// Tries to store the specified number of zero bits.
    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        if self.has_capacity(bits, 0) {
            // Bits after `bit_len` are always zero
            self.bit_len += bits;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store the specified number of set bits.
    pub fn store_ones(&mut self, bits: u16) -> Result<(), Error> {
        if self.has_capacity(bits, 0) {
            copy_bits(&mut self.data, self.bit_len, &[0xff; 128], 0, bits);
            self.bit_len += bits;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store one zero bit.
    #[inline]
    pub fn store_bit_zero(&mut self) -> Result<(), Error> {
        self.store_bit(false)
    }

    /// Tries to store one non-zero bit.
    #[inline]
    pub fn store_bit_one(&mut self) -> Result<(), Error> {
        self.store_bit(true)
    }

    /// Tries to store one bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<(), Error> {
        if self.bit_len < MAX_BIT_LEN {
            if bit {
                self.data[(self.bit_len / 8) as usize] |= 0x80 >> (self.bit_len % 8);
            }
            self.bit_len += 1;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store `bits` lowest bits of the `value`.
    pub fn store_small_uint(&mut self, value: u8, bits: u16) -> Result<(), Error> {
        self.store_uint(value as u64, bits)
    }

    /// Tries to store an unsigned integer of the specified width.
    ///
    /// Widths greater than 64 bits are padded with leading zeros.
    pub fn store_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        if unlikely(bits < 64 && value >> bits != 0) {
            return Err(Error::IntOverflow);
        }
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }

        if bits > 64 {
            self.bit_len += bits - 64;
        }
        self.store_raw_uint(value, std::cmp::min(bits, 64));
        Ok(())
    }

    /// Tries to store a signed integer of the specified width.
    ///
    /// Widths greater than 64 bits are sign-extended.
    pub fn store_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        let fits = match bits {
            0 => value == 0,
            1..=63 => {
                let half = 1i64 << (bits - 1);
                (-half..half).contains(&value)
            }
            _ => true,
        };
        if unlikely(!fits) {
            return Err(Error::IntOverflow);
        }
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }

        if bits > 64 {
            let padding = bits - 64;
            if value < 0 {
                copy_bits(&mut self.data, self.bit_len, &[0xff; 128], 0, padding);
            }
            self.bit_len += padding;
        }
        self.store_raw_uint(value as u64, std::cmp::min(bits, 64));
        Ok(())
    }

    /// Stores up to 64 lowest bits of the `value`, capacity must be checked by the caller.
    fn store_raw_uint(&mut self, value: u64, bits: u16) {
        debug_assert!(bits <= 64);
        if bits == 0 {
            return;
        }
        let bytes = (value << (64 - bits)).to_be_bytes();
        copy_bits(&mut self.data, self.bit_len, &bytes, 0, bits);
        self.bit_len += bits;
    }

    /// Tries to store `u128` in the cell.
    pub fn store_u128(&mut self, value: u128) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 128)
    }

    /// Tries to store `i128` in the cell.
    #[inline]
    pub fn store_i128(&mut self, value: i128) -> Result<(), Error> {
        self.store_u128(value as u128)
    }

    /// Tries to store 32 bytes in the cell.
    pub fn store_u256(&mut self, value: &HashBytes) -> Result<(), Error> {
        self.store_raw(value.as_slice(), 256)
    }

    /// Tries to store the first `bits` bits of the `value`.
    pub fn store_raw(&mut self, value: &[u8], bits: u16) -> Result<(), Error> {
        self.store_raw_at(value, 0, bits)
    }

    fn store_raw_at(&mut self, value: &[u8], offset: u16, bits: u16) -> Result<(), Error> {
        if unlikely(value.len() * 8 < offset as usize + bits as usize) {
            return Err(Error::CellUnderflow);
        }
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }
        copy_bits(&mut self.data, self.bit_len, value, offset, bits);
        self.bit_len += bits;
        Ok(())
    }

    /// Tries to store all bits of the bit string.
    #[inline]
    pub fn store_bit_string(&mut self, bits: &BitString) -> Result<(), Error> {
        self.store_raw(bits.as_raw_data(), bits.len())
    }

    /// Tries to store the remaining data bits of the slice.
    pub fn store_slice_data(&mut self, slice: &CellSlice<'_>) -> Result<(), Error> {
        let bits = slice.remaining_bits();
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }
        copy_bits(
            &mut self.data,
            self.bit_len,
            slice.cell().data(),
            slice.offset_bits(),
            bits,
        );
        self.bit_len += bits;
        Ok(())
    }

    /// Tries to store the remaining data bits and references of the slice.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> Result<(), Error> {
        if unlikely(!self.has_capacity(slice.remaining_bits(), slice.remaining_refs())) {
            return Err(Error::CellOverflow);
        }
        ok!(self.store_slice_data(slice));
        for child in slice.references() {
            self.references.push(child.clone());
        }
        Ok(())
    }

    /// Tries to store a child in the cell.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(cell);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store a presence bit and an optional child.
    pub fn store_maybe_reference(&mut self, cell: Option<Cell>) -> Result<(), Error> {
        match cell {
            Some(cell) => {
                if unlikely(!self.has_capacity(1, 1)) {
                    return Err(Error::CellOverflow);
                }
                ok!(self.store_bit_one());
                self.store_reference(cell)
            }
            None => self.store_bit_zero(),
        }
    }

    /// Tries to store a variable-length unsigned integer with a byte length
    /// prefix of `len_bits` bits.
    pub fn store_var_uint(&mut self, value: u128, len_bits: u16) -> Result<(), Error> {
        let bytes = (128 - value.leading_zeros() as u16 + 7) / 8;
        self.store_var_bytes(&value.to_be_bytes(), bytes, len_bits)
    }

    /// Tries to store a variable-length signed integer with a byte length
    /// prefix of `len_bits` bits.
    pub fn store_var_int(&mut self, value: i128, len_bits: u16) -> Result<(), Error> {
        let bytes = if value == 0 {
            0
        } else {
            let sign_bits = if value < 0 {
                value.leading_ones()
            } else {
                value.leading_zeros()
            };
            (128 - sign_bits as u16 + 1 + 7) / 8
        };
        self.store_var_bytes(&(value as u128).to_be_bytes(), bytes, len_bits)
    }

    fn store_var_bytes(&mut self, be_bytes: &[u8], bytes: u16, len_bits: u16) -> Result<(), Error> {
        if unlikely(len_bits < 16 && bytes >> len_bits != 0) {
            return Err(Error::IntOverflow);
        }
        if unlikely(!self.has_capacity(len_bits + bytes * 8, 0)) {
            return Err(Error::CellOverflow);
        }
        ok!(self.store_uint(bytes as u64, len_bits));
        let start = be_bytes.len() - bytes as usize;
        self.store_raw(&be_bytes[start..], bytes * 8)
    }

    /// Tries to store an amount of coins (`VarUInteger 16`).
    #[inline]
    pub fn store_coins(&mut self, value: u128) -> Result<(), Error> {
        self.store_var_uint(value, 4)
    }

    /// Tries to store bytes, putting the overflow into a chain of child cells.
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let available = (self.spare_bits_capacity() / 8) as usize;
        if bytes.len() <= available {
            return self.store_raw(bytes, bytes.len() as u16 * 8);
        }
        if unlikely(self.references.len() >= MAX_REF_COUNT) {
            return Err(Error::CellOverflow);
        }

        let (head, tail) = bytes.split_at(available);

        let mut next = None::<Cell>;
        for chunk in tail.chunks((MAX_BIT_LEN / 8) as usize).rev() {
            let mut builder = CellBuilder::new();
            ok!(builder.store_raw(chunk, chunk.len() as u16 * 8));
            if let Some(next) = next.take() {
                ok!(builder.store_reference(next));
            }
            next = Some(ok!(builder.build()));
        }

        ok!(self.store_raw(head, head.len() as u16 * 8));
        match next {
            Some(next) => self.store_reference(next),
            None => Ok(()),
        }
    }

    /// Tries to store an UTF-8 string as snake bytes.
    #[inline]
    pub fn store_snake_string(&mut self, value: &str) -> Result<(), Error> {
        self.store_snake_bytes(value.as_bytes())
    }

    /// Tries to store all bytes in the cell.
    #[inline]
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if unlikely(bytes.len() > (MAX_BIT_LEN / 8) as usize) {
            return Err(Error::CellOverflow);
        }
        self.store_raw(bytes, bytes.len() as u16 * 8)
    }

    /// Tries to store a short UTF-8 string (at most 127 bytes) in the cell.
    pub fn store_string(&mut self, value: &str) -> Result<(), Error> {
        self.store_bytes(value.as_bytes())
    }

    /// Tries to store the data and references of the cell.
    pub fn store_cell_data(&mut self, cell: &Cell) -> Result<(), Error> {
        self.store_slice(&ok!(cell.as_slice()))
    }

    /// Creates a builder with the first `bits` bits of the `data`.
    pub fn from_raw_data(data: &[u8], bits: u16) -> Result<Self, Error> {
        let mut builder = Self::new();
        ok!(builder.store_raw(data, bits));
        Ok(builder)
    }

    /// Tries to build a new cell.
    pub fn build(mut self) -> Result<Cell, Error> {
        let rem = self.bit_len % 8;
        if rem != 0 {
            // Completion tag
            self.data[(self.bit_len / 8) as usize] |= 0x80 >> rem;
        }
        let byte_len = (self.bit_len as usize + 7) / 8;

        CellParts {
            bit_len: self.bit_len,
            is_exotic: self.is_exotic,
            stored_level_mask: None,
            references: self.references,
            data: &self.data[..byte_len],
        }
        .finalize()
    }
}

macro_rules! impl_store_fixed {
    ($($(#[doc = $doc:literal])* $store:ident($ty:ty) => $bits:literal),*$(,)?) => {
        impl CellBuilder {
            $(
                $(#[doc = $doc])*
                pub fn $store(&mut self, value: $ty) -> Result<(), Error> {
                    if self.bit_len + $bits <= MAX_BIT_LEN {
                        self.store_raw_uint(value as u64, $bits);
                        Ok(())
                    } else {
                        Err(Error::CellOverflow)
                    }
                }
            )*
        }
    };
}

impl_store_fixed! {
    /// Tries to store `u8` in the cell.
    store_u8(u8) => 8,
    /// Tries to store `i8` in the cell.
    store_i8(i8) => 8,
    /// Tries to store `u16` in the cell.
    store_u16(u16) => 16,
    /// Tries to store `i16` in the cell.
    store_i16(i16) => 16,
    /// Tries to store `u32` in the cell.
    store_u32(u32) => 32,
    /// Tries to store `i32` in the cell.
    store_i32(i32) => 32,
    /// Tries to store `u64` in the cell.
    store_u64(u64) => 64,
    /// Tries to store `i64` in the cell.
    store_i64(i64) => 64,
}

#[cfg(feature = "bigint")]
impl CellBuilder {
    /// Tries to store an unsigned big integer of the specified width.
    pub fn store_biguint(&mut self, value: &num_bigint::BigUint, bits: u16) -> Result<(), Error> {
        if unlikely(value.bits() > bits as u64) {
            return Err(Error::IntOverflow);
        }
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }

        let bytes = value.to_bytes_be();
        let value_bits = bytes.len() * 8;
        if value_bits > bits as usize {
            self.store_raw_at(&bytes, (value_bits - bits as usize) as u16, bits)
        } else {
            self.bit_len += bits - value_bits as u16;
            self.store_raw(&bytes, value_bits as u16)
        }
    }

    /// Tries to store a signed big integer of the specified width.
    pub fn store_bigint(&mut self, value: &num_bigint::BigInt, bits: u16) -> Result<(), Error> {
        if unlikely(signed_bit_len(value) > bits as u64) {
            return Err(Error::IntOverflow);
        }
        if unlikely(!self.has_capacity(bits, 0)) {
            return Err(Error::CellOverflow);
        }
        if bits == 0 {
            return Ok(());
        }

        let bytes = value.to_signed_bytes_be();
        let value_bits = bytes.len() * 8;
        if value_bits > bits as usize {
            self.store_raw_at(&bytes, (value_bits - bits as usize) as u16, bits)
        } else {
            let padding = bits - value_bits as u16;
            if value.sign() == num_bigint::Sign::Minus {
                copy_bits(&mut self.data, self.bit_len, &[0xff; 128], 0, padding);
            }
            self.bit_len += padding;
            self.store_raw(&bytes, value_bits as u16)
        }
    }

    /// Tries to store a variable-length unsigned big integer.
    pub fn store_var_biguint(
        &mut self,
        value: &num_bigint::BigUint,
        len_bits: u16,
    ) -> Result<(), Error> {
        let bytes = value.bits().div_ceil(8);
        if unlikely(bytes > 128) {
            return Err(Error::IntOverflow);
        }
        let be_bytes = value.to_bytes_be();
        let start = be_bytes.len() - bytes as usize;
        self.store_var_bytes(&be_bytes[start..], bytes as u16, len_bits)
    }

    /// Tries to store a variable-length signed big integer.
    pub fn store_var_bigint(
        &mut self,
        value: &num_bigint::BigInt,
        len_bits: u16,
    ) -> Result<(), Error> {
        use num_traits::Zero;

        let bytes = if value.is_zero() {
            0
        } else {
            signed_bit_len(value).div_ceil(8)
        };
        if unlikely(bytes > 128) {
            return Err(Error::IntOverflow);
        }
        let be_bytes = value.to_signed_bytes_be();
        let start = be_bytes.len().saturating_sub(bytes as usize);
        self.store_var_bytes(&be_bytes[start..], bytes as u16, len_bits)
    }
}

/// Minimal number of bits in two's complement representation, zero needs none.
#[cfg(feature = "bigint")]
fn signed_bit_len(value: &num_bigint::BigInt) -> u64 {
    use num_traits::{One, Zero};

    if value.is_zero() {
        0
    } else if value.sign() == num_bigint::Sign::Minus {
        let magnitude = value.magnitude() - num_bigint::BigUint::one();
        magnitude.bits() + 1
    } else {
        value.bits() + 1
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBuilder")
            .field("data", &self.as_bit_string())
            .field("refs", &self.references.len())
            .field("is_exotic", &self.is_exotic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trip() {
        for (value, bits) in [(0, 1), (-1, 1), (2, 3), (-2, 2), (0xefffffff, 33), (-100, 100)] {
            let mut builder = CellBuilder::new();
            builder.store_int(value, bits).unwrap();
            let cell = builder.build().unwrap();
            let mut slice = cell.as_slice().unwrap();
            assert_eq!(slice.load_int(bits).unwrap(), value);
            assert!(slice.is_data_empty());
        }
    }

    #[test]
    fn uint_round_trip() {
        for (value, bits) in [(0, 1), (1, 1), (4, 3), (0xefffffff, 32), (u64::MAX, 64), (7, 200)] {
            let mut builder = CellBuilder::new();
            builder.store_uint(value, bits).unwrap();
            let cell = builder.build().unwrap();
            assert_eq!(cell.as_slice().unwrap().load_uint(bits).unwrap(), value);
        }
    }

    #[test]
    fn int_overflow() {
        for (value, bits) in [(-2, 1), (1, 1), (2, 2), (0xefffffff, 32)] {
            let mut builder = CellBuilder::new();
            assert_eq!(builder.store_int(value, bits), Err(Error::IntOverflow));
            assert_eq!(builder.size_bits(), 0);
        }

        for (value, bits) in [(2, 1), (0xefffffff, 31), (1, 0)] {
            let mut builder = CellBuilder::new();
            assert_eq!(builder.store_uint(value, bits), Err(Error::IntOverflow));
        }
    }

    #[cfg(feature = "bigint")]
    #[test]
    fn bigint_round_trip() {
        use num_bigint::{BigInt, BigUint};

        let max_u256 = (BigUint::from(1u8) << 256u32) - 1u8;
        let min_i257 = -(BigInt::from(1u8) << 256u32);

        let mut builder = CellBuilder::new();
        builder.store_biguint(&max_u256, 256).unwrap();
        builder.store_bigint(&BigInt::from(max_u256.clone()), 257).unwrap();
        builder.store_bigint(&min_i257, 257).unwrap();
        builder.store_biguint(&(BigUint::from(1u8) << 256u32), 257).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.as_slice().unwrap();
        assert_eq!(slice.load_biguint(256).unwrap(), max_u256);
        assert_eq!(slice.load_bigint(257).unwrap(), BigInt::from(max_u256.clone()));
        assert_eq!(slice.load_bigint(257).unwrap(), min_i257);
        assert_eq!(
            slice.load_biguint(257).unwrap(),
            BigUint::from(1u8) << 256u32
        );
        assert!(slice.is_data_empty());

        let mut builder = CellBuilder::new();
        assert_eq!(
            builder.store_biguint(&(BigUint::from(1u8) << 256u32), 256),
            Err(Error::IntOverflow)
        );
        assert_eq!(builder.store_bigint(&min_i257, 256), Err(Error::IntOverflow));
        assert_eq!(
            builder.store_bigint(&BigInt::from(max_u256), 256),
            Err(Error::IntOverflow)
        );
    }

    #[test]
    fn bits_capacity() {
        let mut builder = CellBuilder::new();
        builder.store_int(1, 1000).unwrap();
        assert_eq!(
            builder.store_raw(&[0x01, 0x00, 0x00, 0x00], 25),
            Err(Error::CellOverflow)
        );

        let mut builder = CellBuilder::new();
        assert_eq!(builder.spare_bits_capacity(), 1023);
        assert_eq!(builder.spare_refs_capacity(), 4);

        builder.store_uint(1000, 10).unwrap();
        assert_eq!(format!("{:b}", builder.as_bit_string()), "1111101000");
        assert_eq!(builder.spare_bits_capacity(), 1013);

        let child = CellBuilder::build_from(true).unwrap();
        builder.store_reference(child.clone()).unwrap();
        assert_eq!(builder.spare_refs_capacity(), 3);

        let cell = builder.build().unwrap();
        let mut slice = cell.as_slice().unwrap();
        assert_eq!(slice.load_uint(10).unwrap(), 1000);
        assert_eq!(slice.load_reference().unwrap(), &child);

        let mut builder = CellBuilder::new();
        for _ in 0..MAX_REF_COUNT {
            builder.store_reference(Cell::empty_cell()).unwrap();
        }
        assert_eq!(
            builder.store_reference(Cell::empty_cell()),
            Err(Error::CellOverflow)
        );
    }

    #[test]
    fn store_ones() {
        for bits in 0..=MAX_BIT_LEN {
            let mut builder = CellBuilder::new();
            builder.store_ones(bits).unwrap();
            let cell = builder.build().unwrap();

            let mut slice = cell.as_slice().unwrap();
            assert_eq!(slice.remaining_bits(), bits);
            let loaded = slice.load_bit_string(bits).unwrap();
            assert_eq!(loaded.len(), bits);
            assert!(loaded.iter().all(|bit| bit));
        }
    }

    #[test]
    fn var_ints() {
        let mut builder = CellBuilder::new();
        builder.store_var_int(-10, 10).unwrap();
        builder.store_var_uint(10, 10).unwrap();
        builder.store_var_int(0, 10).unwrap();
        builder.store_var_uint(0, 10).unwrap();
        builder.store_var_int(1, 1).unwrap();
        builder.store_var_int(-129, 3).unwrap();
        builder.store_coins(1_000_000_000).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.as_slice().unwrap();
        assert_eq!(slice.load_var_int(10).unwrap(), -10);
        assert_eq!(slice.load_var_uint(10).unwrap(), 10);
        assert_eq!(slice.get_uint(0, 10).unwrap(), 0);
        assert_eq!(slice.load_var_int(10).unwrap(), 0);
        assert_eq!(slice.load_var_uint(10).unwrap(), 0);
        assert_eq!(slice.get_var_int(1).unwrap(), 1);
        assert_eq!(slice.load_var_int(1).unwrap(), 1);
        assert_eq!(slice.load_var_int(3).unwrap(), -129);
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
        assert!(slice.is_data_empty());

        // One byte for -10, two bytes for -129
        assert_eq!(cell.bit_len(), 18 + 18 + 10 + 10 + 9 + 19 + 4 + 32);

        let mut builder = CellBuilder::new();
        assert_eq!(builder.store_coins(u128::MAX), Err(Error::IntOverflow));
        assert_eq!(builder.store_var_uint(256, 1), Err(Error::IntOverflow));
    }

    #[test]
    fn snake_bytes() {
        let text = "very long string, ".repeat(100);

        let mut builder = CellBuilder::new();
        builder.store_u32(15).unwrap();
        builder.store_snake_string(&text).unwrap();
        let cell = builder.build().unwrap();

        assert_eq!(cell.bit_len(), 32 + 123 * 8);
        assert_eq!(cell.reference_count(), 1);

        let mut slice = cell.as_slice().unwrap();
        assert_eq!(slice.load_u32().unwrap(), 15);
        assert_eq!(slice.load_snake_string().unwrap(), text);

        let mut builder = CellBuilder::new();
        builder.store_snake_bytes(b"").unwrap();
        builder.store_snake_bytes(b"short str").unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.as_slice().unwrap().load_snake_bytes().unwrap(), b"short str");
    }

    #[test]
    fn bytes_and_strings() {
        let mut builder = CellBuilder::from_raw_data(&[0b1010_0000], 3).unwrap();
        builder.store_bytes(&[0xde, 0xad]).unwrap();
        builder.store_string("hello").unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 3 + 16 + 40);

        let mut slice = cell.as_slice().unwrap();
        slice.skip_bits(3).unwrap();
        assert_eq!(slice.load_bytes(2).unwrap(), [0xde, 0xad]);
        assert_eq!(slice.load_string(5).unwrap(), "hello");
        assert_eq!(slice.load_bytes(1).unwrap_err(), Error::CellUnderflow);

        let long = "a".repeat(128);
        assert_eq!(
            CellBuilder::new().store_string(&long).unwrap_err(),
            Error::CellOverflow
        );
        CellBuilder::new().store_string(&long[..127]).unwrap();

        let mut builder = CellBuilder::new();
        builder.store_cell_data(&cell).unwrap();
        assert_eq!(builder.build().unwrap(), cell);
    }

    #[test]
    fn store_slices() {
        let mut builder = CellBuilder::new();
        builder.store_small_uint(0b10110, 5).unwrap();
        builder.store_u16(0xabcd).unwrap();
        builder.store_reference(Cell::empty_cell()).unwrap();
        let source = builder.build().unwrap();

        let mut slice = source.as_slice().unwrap();
        slice.skip_first(3, 0).unwrap();

        let mut builder = CellBuilder::new();
        builder.store_bit_one().unwrap();
        builder.store_slice(&slice).unwrap();
        let cell = builder.build().unwrap();

        assert_eq!(cell.bit_len(), 1 + 2 + 16);
        assert_eq!(cell.reference_count(), 1);
        let mut slice = cell.as_slice().unwrap();
        assert_eq!(slice.load_small_uint(3).unwrap(), 0b110);
        assert_eq!(slice.load_u16().unwrap(), 0xabcd);
    }
}
