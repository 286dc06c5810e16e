use super::bit_string::{copy_bits, get_bit, read_byte};
use super::{BitString, Cell, CellBuilder, CellType, HashBytes, LevelMask};
use crate::error::Error;
use crate::util::unlikely;

/// A read-only view for a subcell of a cell.
///
/// `get_*` methods read data relative to the window start without moving it,
/// `load_*` methods advance the window.
#[derive(Debug, Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bits_window_start: u16,
    bits_window_end: u16,
    refs_window_start: u8,
    refs_window_end: u8,
}

impl<'a> CellSlice<'a> {
    /// Constructs a new cell slice over the whole cell, even if it is a pruned branch.
    pub fn new_allow_pruned(cell: &'a Cell) -> Self {
        Self {
            bits_window_start: 0,
            bits_window_end: cell.bit_len(),
            refs_window_start: 0,
            refs_window_end: cell.reference_count(),
            cell,
        }
    }

    /// Returns the underlying cell.
    #[inline]
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Computes cell type from descriptor bytes.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.cell.cell_type()
    }

    /// Computes the cell level from the level mask.
    #[inline]
    pub fn level(&self) -> u8 {
        self.cell.level()
    }

    /// Computes the level mask from the descriptor bytes.
    #[inline]
    pub fn level_mask(&self) -> LevelMask {
        self.cell.level_mask()
    }

    /// Returns whether there are no bits of data left.
    #[inline]
    pub const fn is_data_empty(&self) -> bool {
        self.bits_window_start >= self.bits_window_end
    }

    /// Returns whether there are no references left.
    #[inline]
    pub const fn is_refs_empty(&self) -> bool {
        self.refs_window_start >= self.refs_window_end
    }

    /// Returns the number of remaining references in the slice.
    #[inline]
    pub const fn remaining_refs(&self) -> u8 {
        self.refs_window_end.saturating_sub(self.refs_window_start)
    }

    /// Returns the number of remaining bits of data in the slice.
    #[inline]
    pub const fn remaining_bits(&self) -> u16 {
        self.bits_window_end.saturating_sub(self.bits_window_start)
    }

    /// Returns the start of the data window.
    #[inline]
    pub const fn offset_bits(&self) -> u16 {
        self.bits_window_start
    }

    /// Returns the start of the references window.
    #[inline]
    pub const fn offset_refs(&self) -> u8 {
        self.refs_window_start
    }

    /// Returns `true` if the slice contains at least `bits` and `refs`.
    #[inline]
    pub const fn has_remaining(&self, bits: u16, refs: u8) -> bool {
        self.bits_window_start as u32 + bits as u32 <= self.bits_window_end as u32
            && self.refs_window_start as u16 + refs as u16 <= self.refs_window_end as u16
    }

    /// Tries to advance the start of data and refs windows,
    /// returns `false` if `bits` or `refs` are greater than the remainder.
    pub fn try_advance(&mut self, bits: u16, refs: u8) -> bool {
        if self.has_remaining(bits, refs) {
            self.bits_window_start += bits;
            self.refs_window_start += refs;
            true
        } else {
            false
        }
    }

    /// Skips the specified number of bits and refs.
    #[inline]
    pub fn skip_first(&mut self, bits: u16, refs: u8) -> Result<(), Error> {
        if self.try_advance(bits, refs) {
            Ok(())
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Returns a slice with only the first `bits` and `refs` of this one.
    pub fn get_prefix(&self, bits: u16, refs: u8) -> Result<Self, Error> {
        if unlikely(!self.has_remaining(bits, refs)) {
            return Err(Error::CellUnderflow);
        }
        Ok(Self {
            cell: self.cell,
            bits_window_start: self.bits_window_start,
            bits_window_end: self.bits_window_start + bits,
            refs_window_start: self.refs_window_start,
            refs_window_end: self.refs_window_start + refs,
        })
    }

    /// Returns the remainder of the slice, leaving this one empty.
    pub fn load_remaining(&mut self) -> Self {
        let result = *self;
        self.bits_window_start = self.bits_window_end;
        self.refs_window_start = self.refs_window_end;
        result
    }

    #[inline]
    fn check_bits(&self, offset: u16, bits: u16) -> Result<u16, Error> {
        if self.bits_window_start as u32 + offset as u32 + bits as u32
            <= self.bits_window_end as u32
        {
            Ok(self.bits_window_start + offset)
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Reads up to 64 bits starting from the absolute bit index.
    fn read_uint_at(&self, index: u16, bits: u16) -> u64 {
        debug_assert!(bits <= 64);
        let data = self.cell.data();
        let mut result = 0u64;
        let mut read = 0;
        while read < bits {
            let chunk = std::cmp::min(8, bits - read);
            let byte = read_byte(data, index + read) >> (8 - chunk);
            result = (result << chunk) | byte as u64;
            read += chunk;
        }
        result
    }

    /// Reads the bit at the specified offset.
    pub fn get_bit(&self, offset: u16) -> Result<bool, Error> {
        let index = ok!(self.check_bits(offset, 1));
        Ok(get_bit(self.cell.data(), index))
    }

    /// Reads the next bit.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        let bit = ok!(self.get_bit(0));
        self.bits_window_start += 1;
        Ok(bit)
    }

    /// Reads `bits` (0..=8) starting from the `offset`.
    pub fn get_small_uint(&self, offset: u16, bits: u16) -> Result<u8, Error> {
        if unlikely(bits > 8) {
            return Err(Error::IntOverflow);
        }
        let index = ok!(self.check_bits(offset, bits));
        Ok(self.read_uint_at(index, bits) as u8)
    }

    /// Reads the next `bits` (0..=8).
    pub fn load_small_uint(&mut self, bits: u16) -> Result<u8, Error> {
        let value = ok!(self.get_small_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads an unsigned integer of the specified width starting from the `offset`.
    ///
    /// Widths greater than 64 bits are allowed when the leading bits are zero.
    pub fn get_uint(&self, offset: u16, bits: u16) -> Result<u64, Error> {
        let mut index = ok!(self.check_bits(offset, bits));
        if bits > 64 {
            let padding = bits - 64;
            if unlikely(!self.is_uniform_at(index, padding, false)) {
                return Err(Error::IntOverflow);
            }
            index += padding;
        }
        Ok(self.read_uint_at(index, std::cmp::min(bits, 64)))
    }

    /// Reads the next unsigned integer of the specified width.
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        let value = ok!(self.get_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads a signed integer of the specified width starting from the `offset`.
    ///
    /// Widths greater than 64 bits are allowed when the leading bits are
    /// a sign extension.
    pub fn get_int(&self, offset: u16, bits: u16) -> Result<i64, Error> {
        let mut index = ok!(self.check_bits(offset, bits));
        if bits == 0 {
            return Ok(0);
        }
        if bits > 64 {
            let padding = bits - 64;
            let sign = get_bit(self.cell.data(), index + padding);
            if unlikely(!self.is_uniform_at(index, padding, sign)) {
                return Err(Error::IntOverflow);
            }
            index += padding;
        }

        let bits = std::cmp::min(bits, 64);
        let value = self.read_uint_at(index, bits);
        let shift = 64 - bits;
        Ok(((value << shift) as i64) >> shift)
    }

    /// Reads the next signed integer of the specified width.
    pub fn load_int(&mut self, bits: u16) -> Result<i64, Error> {
        let value = ok!(self.get_int(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    fn is_uniform_at(&self, index: u16, bits: u16, bit: bool) -> bool {
        let data = self.cell.data();
        (index..index + bits).all(|i| get_bit(data, i) == bit)
    }

    /// Reads `u128` starting from the `offset`.
    pub fn get_u128(&self, offset: u16) -> Result<u128, Error> {
        let index = ok!(self.check_bits(offset, 128));
        let hi = self.read_uint_at(index, 64) as u128;
        let lo = self.read_uint_at(index + 64, 64) as u128;
        Ok((hi << 64) | lo)
    }

    /// Reads the next `u128`.
    pub fn load_u128(&mut self) -> Result<u128, Error> {
        let value = ok!(self.get_u128(0));
        self.bits_window_start += 128;
        Ok(value)
    }

    /// Reads `i128` starting from the `offset`.
    #[inline]
    pub fn get_i128(&self, offset: u16) -> Result<i128, Error> {
        self.get_u128(offset).map(|value| value as i128)
    }

    /// Reads the next `i128`.
    #[inline]
    pub fn load_i128(&mut self) -> Result<i128, Error> {
        self.load_u128().map(|value| value as i128)
    }

    /// Reads 32 bytes starting from the `offset`.
    pub fn get_u256(&self, offset: u16) -> Result<HashBytes, Error> {
        let mut result = HashBytes::ZERO;
        ok!(self.get_raw(offset, &mut result.0, 256));
        Ok(result)
    }

    /// Reads the next 32 bytes.
    pub fn load_u256(&mut self) -> Result<HashBytes, Error> {
        let value = ok!(self.get_u256(0));
        self.bits_window_start += 256;
        Ok(value)
    }

    /// Reads `bits` starting from the `offset` into the `target` buffer,
    /// returns the filled part of it.
    pub fn get_raw<'b>(
        &self,
        offset: u16,
        target: &'b mut [u8],
        bits: u16,
    ) -> Result<&'b mut [u8], Error> {
        let byte_len = (bits as usize + 7) / 8;
        if unlikely(target.len() < byte_len) {
            return Err(Error::CellOverflow);
        }
        let index = ok!(self.check_bits(offset, bits));

        let target = &mut target[..byte_len];
        target.fill(0);
        copy_bits(target, 0, self.cell.data(), index, bits);
        Ok(target)
    }

    /// Reads the next `bits` into the `target` buffer.
    pub fn load_raw<'b>(&mut self, target: &'b mut [u8], bits: u16) -> Result<&'b mut [u8], Error> {
        let result = ok!(self.get_raw(0, target, bits));
        self.bits_window_start += bits;
        Ok(result)
    }

    /// Reads `bits` starting from the `offset` as an owned bit string.
    pub fn get_bit_string(&self, offset: u16, bits: u16) -> Result<BitString, Error> {
        let mut buffer = [0u8; 128];
        let data = ok!(self.get_raw(offset, &mut buffer, bits));
        BitString::from_raw(data, bits)
    }

    /// Reads the next `bits` as an owned bit string.
    pub fn load_bit_string(&mut self, bits: u16) -> Result<BitString, Error> {
        let value = ok!(self.get_bit_string(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Returns all remaining data bits as an owned bit string.
    #[inline]
    pub fn to_bit_string(&self) -> BitString {
        self.get_bit_string(0, self.remaining_bits())
            .unwrap_or_default()
    }

    /// Returns the length of the common prefix of the remaining data and `other`.
    pub fn longest_common_data_prefix(&self, other: &BitString) -> u16 {
        let data = self.cell.data();
        let max_len = std::cmp::min(self.remaining_bits(), other.len());

        let mut prefix_len = 0;
        while prefix_len < max_len {
            let chunk = std::cmp::min(8, max_len - prefix_len);
            let mask = 0xffu8 << (8 - chunk);
            let ours = read_byte(data, self.bits_window_start + prefix_len) & mask;
            let theirs = read_byte(other.as_raw_data(), prefix_len) & mask;
            let diff = ours ^ theirs;
            if diff != 0 {
                return prefix_len + diff.leading_zeros() as u16;
            }
            prefix_len += chunk;
        }
        max_len
    }

    /// Advances the data window if the remaining data starts with the `prefix`,
    /// returns whether it did.
    pub fn strip_data_prefix(&mut self, prefix: &BitString) -> bool {
        if self.remaining_bits() >= prefix.len()
            && self.longest_common_data_prefix(prefix) == prefix.len()
        {
            self.bits_window_start += prefix.len();
            true
        } else {
            false
        }
    }

    /// Returns `Some(bit)` if all remaining data bits are equal to it,
    /// `None` if the data is empty or mixed.
    pub fn test_uniform(&self) -> Option<bool> {
        if self.is_data_empty() {
            return None;
        }
        let data = self.cell.data();
        let first = get_bit(data, self.bits_window_start);
        let bits = self.remaining_bits();
        self.is_uniform_at(self.bits_window_start, bits, first)
            .then_some(first)
    }

    /// Reads a variable-length unsigned integer with a `len_bits` byte length prefix.
    pub fn get_var_uint(&self, len_bits: u16) -> Result<u128, Error> {
        let (bytes, payload) = ok!(self.get_var_bytes(len_bits));
        let mut buffer = [0u8; 16];
        buffer[16 - bytes..].copy_from_slice(&payload[..bytes]);
        Ok(u128::from_be_bytes(buffer))
    }

    /// Loads a variable-length unsigned integer with a `len_bits` byte length prefix.
    pub fn load_var_uint(&mut self, len_bits: u16) -> Result<u128, Error> {
        let value = ok!(self.get_var_uint(len_bits));
        self.bits_window_start += len_bits + ok!(self.var_payload_bits(len_bits));
        Ok(value)
    }

    /// Reads a variable-length signed integer with a `len_bits` byte length prefix.
    pub fn get_var_int(&self, len_bits: u16) -> Result<i128, Error> {
        let (bytes, payload) = ok!(self.get_var_bytes(len_bits));
        if bytes == 0 {
            return Ok(0);
        }
        let fill = if payload[0] & 0x80 != 0 { 0xff } else { 0x00 };
        let mut buffer = [fill; 16];
        buffer[16 - bytes..].copy_from_slice(&payload[..bytes]);
        Ok(i128::from_be_bytes(buffer))
    }

    /// Loads a variable-length signed integer with a `len_bits` byte length prefix.
    pub fn load_var_int(&mut self, len_bits: u16) -> Result<i128, Error> {
        let value = ok!(self.get_var_int(len_bits));
        self.bits_window_start += len_bits + ok!(self.var_payload_bits(len_bits));
        Ok(value)
    }

    fn var_payload_bits(&self, len_bits: u16) -> Result<u16, Error> {
        let bytes = ok!(self.get_uint(0, len_bits));
        Ok(bytes as u16 * 8)
    }

    fn get_var_bytes(&self, len_bits: u16) -> Result<(usize, [u8; 16]), Error> {
        if unlikely(len_bits > 16) {
            return Err(Error::IntOverflow);
        }
        let bytes = ok!(self.get_uint(0, len_bits)) as usize;
        if unlikely(bytes > 16) {
            return Err(Error::IntOverflow);
        }
        let mut payload = [0u8; 16];
        ok!(self.get_raw(len_bits, &mut payload, bytes as u16 * 8));
        Ok((bytes, payload))
    }

    /// Reads an amount of coins (`VarUInteger 16`).
    #[inline]
    pub fn get_coins(&self) -> Result<u128, Error> {
        self.get_var_uint(4)
    }

    /// Loads an amount of coins (`VarUInteger 16`).
    #[inline]
    pub fn load_coins(&mut self) -> Result<u128, Error> {
        self.load_var_uint(4)
    }

    /// Returns a reference to the Nth child cell (relative to this slice's refs window).
    pub fn get_reference(&self, index: u8) -> Result<&'a Cell, Error> {
        if self.refs_window_start as u16 + (index as u16) < self.refs_window_end as u16 {
            match self.cell.reference(self.refs_window_start + index) {
                Some(cell) => Ok(cell),
                None => Err(Error::CellUnderflow),
            }
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Returns the remaining child cells.
    pub fn references(&self) -> &'a [Cell] {
        let refs = self.cell.references();
        let start = std::cmp::min(self.refs_window_start as usize, refs.len());
        let end = std::cmp::min(self.refs_window_end as usize, refs.len());
        &refs[start..std::cmp::max(start, end)]
    }

    /// Returns a reference to the next child cell, incrementing the refs window start.
    pub fn load_reference(&mut self) -> Result<&'a Cell, Error> {
        let cell = ok!(self.get_reference(0));
        self.refs_window_start += 1;
        Ok(cell)
    }

    /// Returns the next child cell, incrementing the refs window start.
    #[inline]
    pub fn load_reference_cloned(&mut self) -> Result<Cell, Error> {
        self.load_reference().cloned()
    }

    /// Loads a presence bit and an optional child cell.
    pub fn load_maybe_reference(&mut self) -> Result<Option<&'a Cell>, Error> {
        if ok!(self.get_bit(0)) {
            let cell = ok!(self.get_reference(0));
            self.bits_window_start += 1;
            self.refs_window_start += 1;
            Ok(Some(cell))
        } else {
            self.bits_window_start += 1;
            Ok(None)
        }
    }

    /// Loads a presence bit and an optional owned child cell.
    #[inline]
    pub fn load_maybe_reference_cloned(&mut self) -> Result<Option<Cell>, Error> {
        self.load_maybe_reference().map(|cell| cell.cloned())
    }

    /// Loads the remaining data bytes and all continuation cells.
    pub fn load_snake_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let mut result = Vec::new();
        let mut slice = self.load_remaining();
        loop {
            let bits = slice.remaining_bits();
            if unlikely(bits % 8 != 0 || slice.remaining_refs() > 1) {
                return Err(Error::InvalidData);
            }

            let mut buffer = [0u8; 128];
            let data = ok!(slice.load_raw(&mut buffer, bits));
            result.extend_from_slice(data);

            if slice.is_refs_empty() {
                break;
            }
            slice = ok!(ok!(slice.load_reference()).as_slice());
        }

        Ok(result)
    }

    /// Loads snake bytes as an UTF-8 string.
    pub fn load_snake_string(&mut self) -> Result<String, Error> {
        let bytes = ok!(self.load_snake_bytes());
        String::from_utf8(bytes).map_err(|_| Error::InvalidData)
    }

    /// Skips the specified number of data bits.
    #[inline]
    pub fn skip_bits(&mut self, bits: u16) -> Result<(), Error> {
        self.skip_first(bits, 0)
    }

    /// Loads the specified number of whole bytes.
    pub fn load_bytes(&mut self, len: u16) -> Result<Vec<u8>, Error> {
        let Some(bits) = len.checked_mul(8) else {
            return Err(Error::CellUnderflow);
        };
        let mut result = vec![0; len as usize];
        ok!(self.load_raw(&mut result, bits));
        Ok(result)
    }

    /// Loads an UTF-8 string of `len` bytes stored in the cell itself.
    pub fn load_string(&mut self, len: u16) -> Result<String, Error> {
        let bytes = ok!(self.load_bytes(len));
        String::from_utf8(bytes).map_err(|_| Error::InvalidData)
    }

    /// Copies the remaining data and references into a new builder.
    pub fn to_builder(&self) -> Result<CellBuilder, Error> {
        if unlikely(self.cell.is_exotic()) {
            return Err(Error::UnexpectedExoticCell);
        }
        let mut builder = CellBuilder::new();
        ok!(builder.store_slice(self));
        Ok(builder)
    }
}

macro_rules! impl_load_fixed {
    ($($get:ident, $load:ident => $ty:ty: $bits:literal);*$(;)?) => {
        impl CellSlice<'_> {
            $(
                #[doc = concat!("Reads `", stringify!($ty), "` starting from the `offset`.")]
                pub fn $get(&self, offset: u16) -> Result<$ty, Error> {
                    let index = ok!(self.check_bits(offset, $bits));
                    Ok(self.read_uint_at(index, $bits) as $ty)
                }

                #[doc = concat!("Reads the next `", stringify!($ty), "`.")]
                pub fn $load(&mut self) -> Result<$ty, Error> {
                    let value = ok!(self.$get(0));
                    self.bits_window_start += $bits;
                    Ok(value)
                }
            )*
        }
    };
}

impl_load_fixed! {
    get_u8, load_u8 => u8: 8;
    get_i8, load_i8 => i8: 8;
    get_u16, load_u16 => u16: 16;
    get_i16, load_i16 => i16: 16;
    get_u32, load_u32 => u32: 32;
    get_i32, load_i32 => i32: 32;
    get_u64, load_u64 => u64: 64;
    get_i64, load_i64 => i64: 64;
}

#[cfg(feature = "bigint")]
impl CellSlice<'_> {
    /// Reads an unsigned big integer of the specified width.
    pub fn get_biguint(&self, offset: u16, bits: u16) -> Result<num_bigint::BigUint, Error> {
        let mut buffer = [0u8; 128];
        let shift = (8 - bits % 8) % 8;
        let data = ok!(self.get_raw(offset, &mut buffer, bits));
        let value = num_bigint::BigUint::from_bytes_be(data);
        Ok(value >> shift)
    }

    /// Loads an unsigned big integer of the specified width.
    pub fn load_biguint(&mut self, bits: u16) -> Result<num_bigint::BigUint, Error> {
        let value = ok!(self.get_biguint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads a signed big integer of the specified width.
    pub fn get_bigint(&self, offset: u16, bits: u16) -> Result<num_bigint::BigInt, Error> {
        if bits == 0 {
            ok!(self.check_bits(offset, 0));
            return Ok(num_bigint::BigInt::default());
        }
        let mut buffer = [0u8; 128];
        let shift = (8 - bits % 8) % 8;
        let data = ok!(self.get_raw(offset, &mut buffer, bits));
        let value = num_bigint::BigInt::from_signed_bytes_be(data);
        Ok(value >> shift)
    }

    /// Loads a signed big integer of the specified width.
    pub fn load_bigint(&mut self, bits: u16) -> Result<num_bigint::BigInt, Error> {
        let value = ok!(self.get_bigint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Loads a variable-length unsigned big integer.
    pub fn load_var_biguint(&mut self, len_bits: u16) -> Result<num_bigint::BigUint, Error> {
        let bits = ok!(self.var_big_payload_bits(len_bits));
        let value = ok!(self.get_biguint(len_bits, bits));
        self.bits_window_start += len_bits + bits;
        Ok(value)
    }

    /// Loads a variable-length signed big integer.
    pub fn load_var_bigint(&mut self, len_bits: u16) -> Result<num_bigint::BigInt, Error> {
        let bits = ok!(self.var_big_payload_bits(len_bits));
        let value = ok!(self.get_bigint(len_bits, bits));
        self.bits_window_start += len_bits + bits;
        Ok(value)
    }

    fn var_big_payload_bits(&self, len_bits: u16) -> Result<u16, Error> {
        let bytes = ok!(self.get_uint(0, len_bits));
        match u16::try_from(bytes).ok().and_then(|bytes| bytes.checked_mul(8)) {
            Some(bits) => Ok(bits),
            None => Err(Error::CellUnderflow),
        }
    }
}
