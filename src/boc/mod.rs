//! BOC (Bag Of Cells) implementation.

use crate::cell::{Cell, CellBuilder, Load, Store};

/// BOC decoder implementation.
pub mod de;
/// BOC encoder implementation.
pub mod ser;

#[cfg(test)]
mod tests;

/// BOC file magic number.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Single root, cells index, no CRC32.
    Indexed,
    /// Single root, cells index, with CRC32.
    IndexedCrc32,
    /// Multiple roots, optional cells index, optional CRC32.
    #[default]
    Generic,
}

impl BocTag {
    const INDEXED: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const INDEXED_CRC32: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const GENERIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Tries to match bytes with BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::GENERIC => Some(Self::Generic),
            Self::INDEXED_CRC32 => Some(Self::IndexedCrc32),
            Self::INDEXED => Some(Self::Indexed),
            _ => None,
        }
    }

    /// Converts BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::INDEXED,
            Self::IndexedCrc32 => Self::INDEXED_CRC32,
            Self::Generic => Self::GENERIC,
        }
    }
}

bitflags::bitflags! {
    /// Flags byte of the generic BOC header.
    ///
    /// The lowest three bits hold the size of a cell index in bytes.
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct BocFlags: u8 {
        /// The header is followed by the table of cell offsets.
        const HAS_INDEX = 0b1000_0000;
        /// Serialized bytes are followed by their CRC32C.
        const HAS_CRC = 0b0100_0000;
        /// Cell offsets table contains cache bits.
        const HAS_CACHE_BITS = 0b0010_0000;
    }
}

impl BocFlags {
    /// Mask of the cell index size in the flags byte.
    pub const REF_SIZE_MASK: u8 = 0b0000_0111;
}

/// BOC encoder and decoder.
///
/// Can also be used with serde:
///
/// ```
/// # use ton_types::prelude::*;
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Message {
///     #[serde(with = "Boc")]
///     body: Cell,
/// }
/// ```
pub struct Boc;

impl Boc {
    /// Encodes the specified cell tree as BOC.
    pub fn encode(cell: &Cell) -> Vec<u8> {
        Self::encode_ext(cell, BocFlags::empty())
    }

    /// Encodes the specified cell tree as BOC with the specified flags.
    ///
    /// Only [`BocFlags::HAS_CRC`] and [`BocFlags::HAS_INDEX`] are taken into account.
    pub fn encode_ext(cell: &Cell, flags: BocFlags) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::with_root(cell)
            .with_flags(flags)
            .encode(&mut result);
        result
    }

    /// Encodes multiple cell trees as a single BOC.
    ///
    /// Shared subtrees are stored once. Returns an empty vec for an empty list of roots.
    pub fn encode_multi(roots: &[Cell], flags: BocFlags) -> Vec<u8> {
        let mut roots = roots.iter();
        let Some(first) = roots.next() else {
            return Vec::new();
        };

        let mut header = ser::BocHeader::with_root(first);
        for root in roots {
            header.add_root(root);
        }

        let mut result = Vec::new();
        header.with_flags(flags).encode(&mut result);
        result
    }

    /// Encodes the specified cell tree as BOC and
    /// returns the `hex` encoded bytes as a string.
    pub fn encode_hex(cell: &Cell) -> String {
        hex::encode(Self::encode(cell))
    }

    /// Encodes the specified cell tree as BOC and
    /// returns the `base64` encoded bytes as a string.
    #[cfg(any(feature = "base64", test))]
    pub fn encode_base64(cell: &Cell) -> String {
        crate::util::encode_base64(Self::encode(cell))
    }

    /// Decodes a cell tree from BOC bytes and returns its first root.
    #[inline]
    pub fn decode<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_impl(data: &[u8]) -> Result<Cell, de::Error> {
            Boc::decode_ext(data, &de::Options::default())
        }
        decode_impl(data.as_ref())
    }

    /// Decodes a cell tree from BOC bytes with the specified options
    /// and returns its first root.
    pub fn decode_ext(data: &[u8], options: &de::Options) -> Result<Cell, de::Error> {
        let header = ok!(decode_header(data, options));
        let cells = ok!(header.finalize());
        match header.roots().first().and_then(|index| cells.get(*index)) {
            Some(root) => Ok(root),
            None => Err(de::Error::RootCellNotFound),
        }
    }

    /// Decodes all roots of the BOC in their serialized order.
    pub fn decode_multi<T: AsRef<[u8]>>(data: T) -> Result<Vec<Cell>, de::Error> {
        fn decode_multi_impl(data: &[u8]) -> Result<Vec<Cell>, de::Error> {
            let header = ok!(decode_header(data, &de::Options::default()));
            let cells = ok!(header.finalize());

            let mut roots = Vec::with_capacity(header.roots().len());
            for index in header.roots() {
                match cells.get(*index) {
                    Some(root) => roots.push(root),
                    None => return Err(de::Error::RootOutOfBounds),
                }
            }
            Ok(roots)
        }
        decode_multi_impl(data.as_ref())
    }

    /// Decodes a `hex` encoded BOC into a cell tree.
    pub fn decode_hex<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_hex_impl(data: &[u8]) -> Result<Cell, de::Error> {
            match hex::decode(data) {
                Ok(data) => Boc::decode(data),
                Err(_) => Err(de::Error::InvalidHex),
            }
        }
        decode_hex_impl(data.as_ref())
    }

    /// Decodes a `base64` encoded BOC into a cell tree.
    #[cfg(any(feature = "base64", test))]
    pub fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_base64_impl(data: &[u8]) -> Result<Cell, de::Error> {
            match crate::util::decode_base64(data) {
                Ok(data) => Boc::decode(data),
                Err(_) => Err(de::Error::InvalidBase64),
            }
        }
        decode_base64_impl(data.as_ref())
    }

    /// Decodes a BOC from either `hex` or `base64` encoded string.
    ///
    /// Strings that consist only of hex digits are treated as `hex`.
    #[cfg(any(feature = "base64", test))]
    pub fn decode_str(data: &str) -> Result<Cell, de::Error> {
        let data = data.trim();
        if data.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self::decode_hex(data)
        } else {
            Self::decode_base64(data)
        }
    }
}

fn decode_header<'a>(data: &'a [u8], options: &de::Options) -> Result<de::BocHeader<'a>, de::Error> {
    match de::BocHeader::decode(data, options) {
        Ok(header) => Ok(header),
        Err(e) => {
            log::debug!("rejected BOC of {} bytes: {e}", data.len());
            Err(e)
        }
    }
}

/// BOC representation helper.
///
/// Serializes a [`Store`] type as a single cell BOC and
/// deserializes it back with [`Load`].
pub struct BocRepr;

impl BocRepr {
    /// Encodes the specified value into BOC bytes.
    pub fn encode<T: Store + ?Sized>(data: &T) -> Result<Vec<u8>, crate::error::Error> {
        let cell = ok!(CellBuilder::build_from(data));
        Ok(Boc::encode(&cell))
    }

    /// Decodes a value from BOC bytes.
    pub fn decode<T, D>(data: D) -> Result<T, BocReprError>
    where
        for<'a> T: Load<'a>,
        D: AsRef<[u8]>,
    {
        let cell = match Boc::decode(data) {
            Ok(cell) => cell,
            Err(e) => return Err(BocReprError::InvalidBoc(e)),
        };
        match cell.parse::<T>() {
            Ok(data) => Ok(data),
            Err(e) => Err(BocReprError::InvalidData(e)),
        }
    }
}

/// Error type for [`BocRepr`] decoding.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BocReprError {
    /// Failed to decode BOC.
    #[error("invalid BOC")]
    InvalidBoc(#[source] de::Error),
    /// Failed to parse cell contents.
    #[error("failed to decode object from cells")]
    InvalidData(#[source] crate::error::Error),
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::borrow::Cow;

    use serde::{Deserializer, Serialize, Serializer};

    use super::{Boc, BocRepr};
    use crate::cell::{Cell, CellBuilder, Load, Store};

    impl Serialize for Cell {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let boc = Boc::encode(self);
            if serializer.is_human_readable() {
                serializer.serialize_str(&crate::util::encode_base64(boc))
            } else {
                serializer.serialize_bytes(&boc)
            }
        }
    }

    impl<'de> serde::Deserialize<'de> for Cell {
        #[inline]
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Boc::deserialize(deserializer)
        }
    }

    impl Boc {
        /// Serializes cell into an encoded BOC (as base64 for human readable serializers).
        pub fn serialize<S: Serializer>(cell: &Cell, serializer: S) -> Result<S::Ok, S::Error> {
            cell.serialize(serializer)
        }

        /// Deserializes cell from an encoded BOC (from base64 for human readable deserializers).
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Cell, D::Error>
        where
            D: Deserializer<'de>,
        {
            use serde::de::Error;

            let is_human_readable = deserializer.is_human_readable();
            let mut boc = ok!(borrow_cow_bytes(deserializer));

            if is_human_readable {
                match crate::util::decode_base64(boc) {
                    Ok(bytes) => {
                        boc = Cow::Owned(bytes);
                    }
                    Err(_) => return Err(Error::custom("invalid base64 string")),
                }
            }

            match Boc::decode(boc) {
                Ok(cell) => Ok(cell),
                Err(e) => Err(Error::custom(e)),
            }
        }
    }

    impl BocRepr {
        /// Serializes the type into an encoded BOC
        /// (as base64 for human readable serializers).
        pub fn serialize<S, T>(data: &T, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            T: Store,
        {
            use serde::ser::Error;

            match CellBuilder::build_from(data) {
                Ok(cell) => cell.serialize(serializer),
                Err(_) => Err(Error::custom("failed to store into builder")),
            }
        }

        /// Deserializes the type from an encoded BOC
        /// (from base64 for human readable deserializers).
        pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
        where
            D: Deserializer<'de>,
            for<'a> T: Load<'a>,
        {
            use serde::de::Error;

            let cell = ok!(Boc::deserialize(deserializer));
            match cell.parse::<T>() {
                Ok(data) => Ok(data),
                Err(_) => Err(Error::custom("failed to decode object from cells")),
            }
        }
    }

    fn borrow_cow_bytes<'de: 'a, 'a, D>(deserializer: D) -> Result<Cow<'a, [u8]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct CowBytesVisitor;

        impl<'a> Visitor<'a> for CowBytesVisitor {
            type Value = Cow<'a, [u8]>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a byte array or a string")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Cow::Owned(v.as_bytes().to_vec()))
            }

            fn visit_borrowed_str<E: Error>(self, v: &'a str) -> Result<Self::Value, E> {
                Ok(Cow::Borrowed(v.as_bytes()))
            }

            fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(Cow::Owned(v.into_bytes()))
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(Cow::Owned(v.to_vec()))
            }

            fn visit_borrowed_bytes<E: Error>(self, v: &'a [u8]) -> Result<Self::Value, E> {
                Ok(Cow::Borrowed(v))
            }

            fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Cow::Owned(v))
            }
        }

        deserializer.deserialize_bytes(CowBytesVisitor)
    }
}
