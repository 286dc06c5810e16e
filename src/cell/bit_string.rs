use std::str::FromStr;

use super::MAX_BIT_LEN;
use crate::error::Error;
use crate::util::unlikely;

/// An owned packed sequence of at most [`MAX_BIT_LEN`] bits.
///
/// Bits are stored MSB first, unused tail bits are always zero.
#[derive(Clone)]
pub struct BitString {
    data: [u8; 128],
    bit_len: u16,
}

impl Default for BitString {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BitString {
    /// Creates an empty bit string.
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: [0; 128],
            bit_len: 0,
        }
    }

    /// Creates a bit string from the first `bit_len` bits of the `data`.
    pub fn from_raw(data: &[u8], bit_len: u16) -> Result<Self, Error> {
        let mut result = Self::new();
        ok!(result.extend_raw(data, bit_len));
        Ok(result)
    }

    /// Parses a bit string from a string of `0` and `1` chars.
    pub fn from_binary_str(s: &str) -> Result<Self, Error> {
        let mut result = Self::new();
        for c in s.bytes() {
            match c {
                b'0' => ok!(result.push(false)),
                b'1' => ok!(result.push(true)),
                _ => return Err(Error::InvalidData),
            }
        }
        Ok(result)
    }

    /// Parses a bit string from a hex string.
    ///
    /// A trailing `_` means that the last set bit is a completion tag
    /// which is removed.
    pub fn from_hex_str(s: &str) -> Result<Self, Error> {
        fn hex_char(c: u8) -> Result<u8, Error> {
            match c {
                b'A'..=b'F' => Ok(c - b'A' + 10),
                b'a'..=b'f' => Ok(c - b'a' + 10),
                b'0'..=b'9' => Ok(c - b'0'),
                _ => Err(Error::InvalidData),
            }
        }

        if !s.is_ascii() || s.len() > 128 * 2 + 1 {
            return Err(Error::InvalidData);
        }

        let s = s.as_bytes();
        let (s, with_tag) = match s.strip_suffix(b"_") {
            Some(s) => (s, true),
            None => (s, false),
        };

        let mut result = Self::new();
        for (i, c) in s.iter().enumerate() {
            let half_byte = ok!(hex_char(*c));
            if i / 2 >= result.data.len() {
                return Err(Error::CellOverflow);
            }
            result.data[i / 2] |= if i % 2 == 0 { half_byte << 4 } else { half_byte };
        }

        let mut bit_len = s.len() as u16 * 4;
        if with_tag {
            while bit_len > 0 {
                bit_len -= 1;
                let (q, r) = ((bit_len / 8) as usize, bit_len % 8);
                let mask = 0x80 >> r;
                if result.data[q] & mask != 0 {
                    result.data[q] &= !mask;
                    break;
                }
            }
        }

        if unlikely(bit_len > MAX_BIT_LEN) {
            return Err(Error::CellOverflow);
        }
        result.bit_len = bit_len;
        Ok(result)
    }

    /// Returns the number of bits.
    #[inline]
    pub const fn len(&self) -> u16 {
        self.bit_len
    }

    /// Returns `true` if there are no bits.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Returns the underlying bytes (without a completion tag).
    #[inline]
    pub fn as_raw_data(&self) -> &[u8] {
        &self.data[..(self.bit_len as usize + 7) / 8]
    }

    /// Returns the bit at the specified index.
    pub fn get(&self, index: u16) -> Option<bool> {
        if index < self.bit_len {
            Some(get_bit(&self.data, index))
        } else {
            None
        }
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: bool) -> Result<(), Error> {
        if unlikely(self.bit_len >= MAX_BIT_LEN) {
            return Err(Error::CellOverflow);
        }
        if bit {
            self.data[(self.bit_len / 8) as usize] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(())
    }

    /// Appends all bits of another bit string.
    #[inline]
    pub fn append(&mut self, other: &BitString) -> Result<(), Error> {
        self.extend_raw(&other.data, other.bit_len)
    }

    /// Appends the first `bits` bits of the `data`.
    pub fn extend_raw(&mut self, data: &[u8], bits: u16) -> Result<(), Error> {
        if unlikely(bits > MAX_BIT_LEN - self.bit_len) {
            return Err(Error::CellOverflow);
        }
        if unlikely(data.len() * 8 < bits as usize) {
            return Err(Error::CellUnderflow);
        }
        copy_bits(&mut self.data, self.bit_len, data, 0, bits);
        self.bit_len += bits;
        Ok(())
    }

    /// Returns a bit string of `len` bits starting from `start`.
    pub fn range(&self, start: u16, len: u16) -> Option<Self> {
        if start.checked_add(len)? > self.bit_len {
            return None;
        }
        let mut result = Self::new();
        copy_bits(&mut result.data, 0, &self.data, start, len);
        result.bit_len = len;
        Some(result)
    }

    /// Shortens the bit string, keeping the first `len` bits.
    pub fn truncate(&mut self, len: u16) {
        if len >= self.bit_len {
            return;
        }
        let q = (len / 8) as usize;
        let r = len % 8;
        if r != 0 {
            self.data[q] &= 0xff << (8 - r);
            self.data[q + 1..].fill(0);
        } else {
            self.data[q..].fill(0);
        }
        self.bit_len = len;
    }

    /// Returns the length of the longest common prefix of two bit strings.
    pub fn longest_common_prefix(&self, other: &Self) -> u16 {
        let max_len = std::cmp::min(self.bit_len, other.bit_len);
        let byte_len = (max_len as usize + 7) / 8;

        let mut prefix_len = 0;
        for (a, b) in self.data[..byte_len].iter().zip(&other.data[..byte_len]) {
            let diff = a ^ b;
            if diff != 0 {
                prefix_len += diff.leading_zeros() as u16;
                return std::cmp::min(prefix_len, max_len);
            }
            prefix_len += 8;
        }
        max_len
    }

    /// Returns `true` if this bit string starts with the `prefix`.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.bit_len <= self.bit_len && self.longest_common_prefix(prefix) == prefix.bit_len
    }

    /// Returns `Some(bit)` if all bits are equal to `bit`,
    /// `None` if the bit string is empty or contains both zeros and ones.
    pub fn test_uniform(&self) -> Option<bool> {
        let first = self.get(0)?;
        let expected = if first { 0xff } else { 0x00 };

        let full_bytes = (self.bit_len / 8) as usize;
        if self.data[..full_bytes].iter().any(|byte| *byte != expected) {
            return None;
        }

        let r = self.bit_len % 8;
        if r != 0 {
            let mask = 0xffu8 << (8 - r);
            if self.data[full_bytes] & mask != expected & mask {
                return None;
            }
        }
        Some(first)
    }

    /// Returns an iterator over bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(|i| get_bit(&self.data, i))
    }
}

impl Eq for BitString {}

impl PartialEq for BitString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bit_len == other.bit_len && self.as_raw_data() == other.as_raw_data()
    }
}

impl std::hash::Hash for BitString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bit_len.hash(state);
        self.as_raw_data().hash(state);
    }
}

impl Ord for BitString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let prefix_len = self.longest_common_prefix(other);
        if prefix_len == std::cmp::min(self.bit_len, other.bit_len) {
            self.bit_len.cmp(&other.bit_len)
        } else {
            get_bit(&self.data, prefix_len).cmp(&get_bit(&other.data, prefix_len))
        }
    }
}

impl PartialOrd for BitString {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for BitString {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_str(s)
    }
}

impl FromIterator<bool> for BitString {
    /// Collects bits, ignoring everything after [`MAX_BIT_LEN`].
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let mut result = Self::new();
        for bit in iter.into_iter().take(MAX_BIT_LEN as usize) {
            _ = result.push(bit);
        }
        result
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        DisplayBits {
            bytes: &self.data,
            bit_len: self.bit_len,
        }
        .fmt(f)
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.bit_len, self)
    }
}

impl std::fmt::Binary for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.iter() {
            ok!(f.write_str(if bit { "1" } else { "0" }));
        }
        Ok(())
    }
}

/// Hex representation of arbitrary data with the specified bit length.
///
/// Incomplete bytes are printed with a completion tag and a `_` suffix.
pub(crate) struct DisplayBits<'a> {
    /// Underlying bytes (with or without termination bit).
    pub bytes: &'a [u8],
    /// Length of data in bits.
    pub bit_len: u16,
}

impl std::fmt::Display for DisplayBits<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit_len = std::cmp::min(self.bit_len as usize, self.bytes.len() * 8);
        let byte_len = (bit_len + 7) / 8;
        let bytes = &self.bytes[..byte_len];

        let rem = bit_len % 8;
        let (bytes, last_byte) = match bytes.split_last() {
            Some((last_byte, bytes)) if rem != 0 => {
                let tag_mask: u8 = 1 << (7 - rem);
                let data_mask = !(tag_mask - 1);
                let last_byte = (*last_byte & data_mask) | tag_mask;
                (bytes, Some(last_byte))
            }
            _ => (bytes, None),
        };

        for byte in bytes {
            ok!(write!(f, "{byte:02x}"));
        }

        if let Some(mut last_byte) = last_byte {
            let tag = if rem != 4 { "_" } else { "" };
            let rem = 1 + (rem > 4) as usize;
            if rem == 1 {
                last_byte >>= 4;
            }
            ok!(write!(f, "{last_byte:0rem$x}{tag}"));
        }

        Ok(())
    }
}

#[inline]
pub(crate) fn get_bit(data: &[u8], index: u16) -> bool {
    match data.get((index / 8) as usize) {
        Some(byte) => (byte >> (7 - index % 8)) & 1 != 0,
        None => false,
    }
}

/// Reads 8 bits starting from the bit `offset`, bits past the end are zeros.
#[inline]
pub(crate) fn read_byte(data: &[u8], offset: u16) -> u8 {
    let q = (offset / 8) as usize;
    let r = offset % 8;
    let hi = data.get(q).copied().unwrap_or_default();
    if r == 0 {
        hi
    } else {
        let lo = data.get(q + 1).copied().unwrap_or_default();
        (hi << r) | (lo >> (8 - r))
    }
}

/// Copies `bits` bits from `src` at `src_offset` into `dst` at `dst_offset`.
///
/// Target bits are expected to be zeroed.
pub(crate) fn copy_bits(dst: &mut [u8], dst_offset: u16, src: &[u8], src_offset: u16, bits: u16) {
    if dst_offset % 8 == 0 && src_offset % 8 == 0 {
        let dst_start = (dst_offset / 8) as usize;
        let src_start = (src_offset / 8) as usize;
        let full_bytes = (bits / 8) as usize;
        dst[dst_start..dst_start + full_bytes]
            .copy_from_slice(&src[src_start..src_start + full_bytes]);

        let r = bits % 8;
        if r != 0 {
            dst[dst_start + full_bytes] |= src[src_start + full_bytes] & (0xff << (8 - r));
        }
        return;
    }

    let mut copied = 0;
    while copied < bits {
        let chunk = std::cmp::min(8, bits - copied);
        let value = read_byte(src, src_offset + copied) & (0xff << (8 - chunk));

        let offset = dst_offset + copied;
        let q = (offset / 8) as usize;
        let r = offset % 8;
        dst[q] |= value >> r;
        if r + chunk > 8 {
            dst[q + 1] |= value << (8 - r);
        }
        copied += chunk;
    }
}
