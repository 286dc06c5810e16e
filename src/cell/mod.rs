//! Cell tree implementation.

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use crate::error::{Error, ParseHashBytesError};
use crate::util::unlikely;

pub use self::bit_string::BitString;
pub use self::builder::CellBuilder;
pub use self::descriptor::CellDescriptor;
pub use self::finalizer::CellParts;
pub use self::level_mask::LevelMask;
pub use self::slice::CellSlice;

pub(crate) use self::bit_string::DisplayBits;

mod bit_string;
mod builder;
mod descriptor;
mod finalizer;
mod level_mask;
mod slice;

/// Max cell data capacity in bits
pub const MAX_BIT_LEN: u16 = 1023;
/// Maximum number of child cells
pub const MAX_REF_COUNT: usize = 4;
/// Maximum depth of a cell tree.
pub const MAX_DEPTH: u16 = 1024;

/// A data structure that can be serialized into cells.
pub trait Store {
    /// Tries to store itself into the cell builder.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error>;
}

impl<T: Store + ?Sized> Store for &T {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self, builder)
    }
}

impl<T: Store + ?Sized> Store for Box<T> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self.as_ref(), builder)
    }
}

/// A data structure that can be deserialized from cells.
pub trait Load<'a>: Sized {
    /// Tries to load itself from a cell slice.
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error>;
}

impl<'a, T: Load<'a>> Load<'a> for Box<T> {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match <T as Load>::load_from(slice) {
            Ok(value) => Ok(Box::new(value)),
            Err(e) => Err(e),
        }
    }
}

macro_rules! impl_primitive_store_load {
    ($($ty:ty => $store:ident, $load:ident),*$(,)?) => {$(
        impl Store for $ty {
            #[inline]
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.$store(*self)
            }
        }

        impl<'a> Load<'a> for $ty {
            #[inline]
            fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
                slice.$load()
            }
        }
    )*};
}

impl_primitive_store_load! {
    bool => store_bit, load_bit,
    u8 => store_u8, load_u8,
    i8 => store_i8, load_i8,
    u16 => store_u16, load_u16,
    i16 => store_i16, load_i16,
    u32 => store_u32, load_u32,
    i32 => store_i32, load_i32,
    u64 => store_u64, load_u64,
    i64 => store_i64, load_i64,
    u128 => store_u128, load_u128,
    i128 => store_i128, load_i128,
}

impl Store for () {
    #[inline]
    fn store_into(&self, _: &mut CellBuilder) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a> Load<'a> for () {
    #[inline]
    fn load_from(_: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(())
    }
}

impl Store for HashBytes {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u256(self)
    }
}

impl<'a> Load<'a> for HashBytes {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_u256()
    }
}

/// Cells are stored as references.
impl Store for Cell {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(self.clone())
    }
}

impl<'a> Load<'a> for Cell {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_reference_cloned()
    }
}

/// `Maybe X` is stored as a presence bit followed by the value.
impl<T: Store> Store for Option<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Some(value) => {
                ok!(builder.store_bit_one());
                value.store_into(builder)
            }
            None => builder.store_bit_zero(),
        }
    }
}

impl<'a, T: Load<'a>> Load<'a> for Option<T> {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_bit()) {
            match T::load_from(slice) {
                Ok(value) => Ok(Some(value)),
                Err(e) => Err(e),
            }
        } else {
            Ok(None)
        }
    }
}

macro_rules! impl_tuple_store_load {
    ($($t:ident: $i:tt),+) => {
        impl<$($t: Store),+> Store for ($($t),+,) {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                $(ok!(self.$i.store_into(builder));)+
                Ok(())
            }
        }

        impl<'a, $($t: Load<'a>),+> Load<'a> for ($($t),+,) {
            fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
                Ok(($(ok!(<$t>::load_from(slice))),+,))
            }
        }
    };
}

impl_tuple_store_load! { T0: 0 }
impl_tuple_store_load! { T0: 0, T1: 1 }
impl_tuple_store_load! { T0: 0, T1: 1, T2: 2 }
impl_tuple_store_load! { T0: 0, T1: 1, T2: 2, T3: 3 }
impl_tuple_store_load! { T0: 0, T1: 1, T2: 2, T3: 3, T4: 4 }

/// Cell type.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellType {
    /// Cell of this type just stores data and references.
    #[default]
    Ordinary,
    /// Exotic cell which was pruned from the original tree of cells
    /// when a Merkle proof has been created.
    PrunedBranch,
    /// Exotic cell with a reference to the cell with a library.
    LibraryReference,
    /// Exotic cell with one hash and one reference.
    MerkleProof,
    /// Exotic cell with two hashes and two references.
    MerkleUpdate,
}

impl CellType {
    /// Returns whether this cell type is Merkle proof or Merkle update.
    #[inline]
    pub const fn is_merkle(self) -> bool {
        matches!(self, Self::MerkleProof | Self::MerkleUpdate)
    }

    /// Returns whether the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline]
    pub const fn is_exotic(self) -> bool {
        !matches!(self, Self::Ordinary)
    }

    /// Returns whether this cell type is a pruned branch.
    #[inline]
    pub const fn is_pruned_branch(self) -> bool {
        matches!(self, Self::PrunedBranch)
    }

    /// Encodes cell type as byte.
    pub const fn to_byte(self) -> u8 {
        match self {
            CellType::Ordinary => 0xff,
            CellType::PrunedBranch => 1,
            CellType::LibraryReference => 2,
            CellType::MerkleProof => 3,
            CellType::MerkleUpdate => 4,
        }
    }

    /// Decodes the type of an exotic cell from its first data byte.
    #[inline]
    pub const fn from_byte_exotic(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => CellType::PrunedBranch,
            2 => CellType::LibraryReference,
            3 => CellType::MerkleProof,
            4 => CellType::MerkleUpdate,
            _ => return None,
        })
    }
}

/// Numeric data of a cell tree.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct CellTreeStats {
    /// Total number of bits in the tree.
    pub bit_count: u64,
    /// Total number of cells in the tree.
    pub cell_count: u64,
}

impl std::ops::Add for CellTreeStats {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            bit_count: self.bit_count.saturating_add(rhs.bit_count),
            cell_count: self.cell_count.saturating_add(rhs.cell_count),
        }
    }
}

impl std::ops::AddAssign for CellTreeStats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.bit_count = self.bit_count.saturating_add(rhs.bit_count);
        self.cell_count = self.cell_count.saturating_add(rhs.cell_count);
    }
}

/// Type alias for a cell hash.
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct HashBytes(pub [u8; 32]);

impl HashBytes {
    /// Array of zero bytes.
    pub const ZERO: Self = Self([0; 32]);

    /// Converts slice to a hash bytes.
    ///
    /// # Panics
    ///
    /// Panics if the length of the slice is not 32 bytes.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut result = Self::ZERO;
        result.0.copy_from_slice(slice);
        result
    }

    /// Returns the underlying bytes.
    #[inline(always)]
    pub const fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the underlying bytes as slice.
    #[inline(always)]
    pub const fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::ops::Deref for HashBytes {
    type Target = [u8; 32];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for HashBytes {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<[u8; 32]> for HashBytes {
    #[inline(always)]
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<sha2::digest::Output<sha2::Sha256>> for HashBytes {
    #[inline(always)]
    fn from(value: sha2::digest::Output<sha2::Sha256>) -> Self {
        Self(value.into())
    }
}

impl PartialEq<[u8; 32]> for HashBytes {
    #[inline(always)]
    fn eq(&self, other: &[u8; 32]) -> bool {
        &self.0 == other
    }
}

impl FromStr for HashBytes {
    type Err = ParseHashBytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self::ZERO;
        match s.len() {
            64 => hex::decode_to_slice(s, &mut result.0)?,
            #[cfg(feature = "base64")]
            44 => crate::util::decode_base64_slice(s, &mut result.0)?,
            _ => return Err(ParseHashBytesError::UnexpectedStringLength),
        }
        Ok(result)
    }
}

impl std::fmt::Display for HashBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = [0u8; 64];
        // NOTE: output buffer is exactly twice the input
        _ = hex::encode_to_slice(self.0, &mut output);

        // SAFETY: output is guaranteed to contain only [0-9a-f]
        let output = unsafe { std::str::from_utf8_unchecked(&output) };
        f.write_str(output)
    }
}

impl std::fmt::Debug for HashBytes {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HashBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HashBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct HashBytesHexVisitor;

        impl<'de> Visitor<'de> for HashBytesHexVisitor {
            type Value = HashBytes;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("hex-encoded byte array of size 32")
            }

            fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
                let mut result = HashBytes::ZERO;
                match hex::decode_to_slice(value, &mut result.0) {
                    Ok(()) => Ok(result),
                    Err(_) => Err(Error::invalid_value(
                        serde::de::Unexpected::Str(value),
                        &self,
                    )),
                }
            }
        }

        struct HashBytesRawVisitor;

        impl<'de> Visitor<'de> for HashBytesRawVisitor {
            type Value = HashBytes;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_fmt(format_args!("a byte array of size 32"))
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                match <[u8; 32]>::try_from(v) {
                    Ok(bytes) => Ok(HashBytes(bytes)),
                    Err(_) => Err(E::invalid_length(v.len(), &self)),
                }
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(HashBytesHexVisitor)
        } else {
            deserializer.deserialize_bytes(HashBytesRawVisitor)
        }
    }
}

/// Hash of an empty (0 bits of data, no refs) ordinary cell.
pub static EMPTY_CELL_HASH: HashBytes = HashBytes([
    0x96, 0xa2, 0x96, 0xd2, 0x24, 0xf2, 0x85, 0xc6, 0x7b, 0xee, 0x93, 0xc3, 0x0f, 0x8a, 0x30, 0x91,
    0x57, 0xf0, 0xda, 0xa3, 0x5d, 0xc5, 0xb8, 0x7e, 0x41, 0x0b, 0x78, 0x63, 0x0a, 0x09, 0xcf, 0xc7,
]);

/// An immutable node of a tree of cells.
///
/// Cloning is cheap, all clones share the same underlying data.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    descriptor: CellDescriptor,
    bit_len: u16,
    data: Box<[u8]>,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
    hashes: SmallVec<[(HashBytes, u16); 4]>,
    stats: CellTreeStats,
}

impl Cell {
    /// Returns a static reference to the empty cell.
    pub fn empty_cell() -> Cell {
        static EMPTY_CELL: OnceLock<Cell> = OnceLock::new();
        EMPTY_CELL
            .get_or_init(|| {
                Cell(Arc::new(CellInner {
                    descriptor: CellDescriptor::new([0, 0]),
                    bit_len: 0,
                    data: Box::default(),
                    references: SmallVec::new(),
                    hashes: smallvec::smallvec![(EMPTY_CELL_HASH, 0)],
                    stats: CellTreeStats {
                        bit_count: 0,
                        cell_count: 1,
                    },
                }))
            })
            .clone()
    }

    pub(crate) fn from_parts(
        descriptor: CellDescriptor,
        bit_len: u16,
        data: Box<[u8]>,
        references: SmallVec<[Cell; MAX_REF_COUNT]>,
        hashes: SmallVec<[(HashBytes, u16); 4]>,
        stats: CellTreeStats,
    ) -> Self {
        Self(Arc::new(CellInner {
            descriptor,
            bit_len,
            data,
            references,
            hashes,
            stats,
        }))
    }

    /// Returns cell descriptor.
    #[inline]
    pub fn descriptor(&self) -> CellDescriptor {
        self.0.descriptor
    }

    /// Computes cell type from descriptor bytes and the first data byte.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.0.descriptor.cell_type(&self.0.data)
    }

    /// Returns whether the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline]
    pub fn is_exotic(&self) -> bool {
        self.0.descriptor.is_exotic()
    }

    /// Computes the level mask from the descriptor bytes.
    #[inline]
    pub fn level_mask(&self) -> LevelMask {
        self.0.descriptor.level_mask()
    }

    /// Computes the cell level from the level mask.
    #[inline]
    pub fn level(&self) -> u8 {
        self.level_mask().level()
    }

    /// Returns cell data, including the completion tag of an unaligned cell.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.0.bit_len
    }

    /// Returns cell data as an owned bit string.
    pub fn bits(&self) -> BitString {
        BitString::from_raw(&self.0.data, self.0.bit_len).unwrap_or_default()
    }

    /// Returns the number of child cells.
    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.0.references.len() as u8
    }

    /// Returns a reference to the Nth child cell.
    #[inline]
    pub fn reference(&self, index: u8) -> Option<&Cell> {
        self.0.references.get(index as usize)
    }

    /// Returns the Nth child cell.
    #[inline]
    pub fn reference_cloned(&self, index: u8) -> Option<Cell> {
        self.reference(index).cloned()
    }

    /// Returns all child cells.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.0.references
    }

    /// Returns cell hash for the specified level.
    ///
    /// Cell representation hash is `hash(LevelMask::MAX_LEVEL)`.
    pub fn hash(&self, level: u8) -> &HashBytes {
        let level_mask = self.level_mask();
        let hash_index = level_mask.hash_index(level) as usize;

        if self.cell_type().is_pruned_branch() {
            let own_index = level_mask.hash_index(LevelMask::MAX_LEVEL) as usize;
            if hash_index != own_index {
                let offset = 2 + hash_index * 32;
                if let Some(bytes) = self.0.data.get(offset..offset + 32) {
                    // SAFETY: `HashBytes` is a transparent wrapper around `[u8; 32]`
                    // and the slice is exactly 32 bytes long.
                    return unsafe { &*(bytes.as_ptr() as *const HashBytes) };
                }
            }
            return &self.0.hashes[0].0;
        }

        match self.0.hashes.get(hash_index) {
            Some((hash, _)) => hash,
            None => &self.0.hashes[self.0.hashes.len() - 1].0,
        }
    }

    /// Returns cell depth for the specified level.
    pub fn depth(&self, level: u8) -> u16 {
        let level_mask = self.level_mask();
        let hash_index = level_mask.hash_index(level) as usize;

        if self.cell_type().is_pruned_branch() {
            let own_index = level_mask.hash_index(LevelMask::MAX_LEVEL) as usize;
            if hash_index != own_index {
                let offset = 2 + own_index * 32 + hash_index * 2;
                if let Some(bytes) = self.0.data.get(offset..offset + 2) {
                    return u16::from_be_bytes([bytes[0], bytes[1]]);
                }
            }
            return self.0.hashes[0].1;
        }

        match self.0.hashes.get(hash_index) {
            Some((_, depth)) => *depth,
            None => self.0.hashes[self.0.hashes.len() - 1].1,
        }
    }

    /// Returns the representation hash of the cell.
    #[inline]
    pub fn repr_hash(&self) -> &HashBytes {
        self.hash(LevelMask::MAX_LEVEL)
    }

    /// Returns the representation depth of the cell.
    #[inline]
    pub fn repr_depth(&self) -> u16 {
        self.depth(LevelMask::MAX_LEVEL)
    }

    /// Returns the total number of bits and cells in the tree (with duplicates).
    #[inline]
    pub fn stats(&self) -> CellTreeStats {
        self.0.stats
    }

    /// Returns `true` if both values point to the same cell allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Creates a slice over the cell data and references.
    ///
    /// Returns an error for pruned branches.
    pub fn as_slice(&self) -> Result<CellSlice<'_>, Error> {
        if unlikely(self.cell_type().is_pruned_branch()) {
            return Err(Error::PrunedBranchAccess);
        }
        Ok(CellSlice::new_allow_pruned(self))
    }

    /// Creates a slice over the cell data even if it is a pruned branch.
    #[inline]
    pub fn as_slice_allow_pruned(&self) -> CellSlice<'_> {
        CellSlice::new_allow_pruned(self)
    }

    /// Tries to parse the cell contents as `T`.
    pub fn parse<'a, T: Load<'a>>(&'a self) -> Result<T, Error> {
        let mut slice = ok!(self.as_slice());
        T::load_from(&mut slice)
    }

    /// Creates a builder with the same data and references.
    ///
    /// Only ordinary cells can be converted.
    pub fn to_builder(&self) -> Result<CellBuilder, Error> {
        if unlikely(self.is_exotic()) {
            return Err(Error::UnexpectedExoticCell);
        }
        let mut builder = CellBuilder::new();
        ok!(builder.store_raw(&self.0.data, self.0.bit_len));
        for child in self.references() {
            ok!(builder.store_reference(child.clone()));
        }
        Ok(builder)
    }

    /// Returns an object that implements [`Display`] for printing only the root cell.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_root(&self) -> DisplayCellRoot<'_> {
        DisplayCellRoot(self)
    }

    /// Returns an object that implements [`Display`] for printing all cells in the cell tree.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_tree(&self) -> DisplayCellTree<'_> {
        DisplayCellTree(self)
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::empty_cell()
    }
}

impl Eq for Cell {}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl std::hash::Hash for Cell {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("ty", &self.cell_type())
            .field("hash", self.repr_hash())
            .finish()
    }
}

/// Helper struct to print only the root cell in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellRoot<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellRoot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = DisplayBits {
            bytes: self.0.data(),
            bit_len: self.0.bit_len(),
        };

        if f.alternate() {
            std::fmt::Display::fmt(&data, f)
        } else {
            f.write_fmt(format_args!(
                "{data}\nbits: {:>4}, refs: {}, hash: {}",
                self.0.bit_len(),
                self.0.reference_count(),
                self.0.repr_hash(),
            ))
        }
    }
}

/// Helper struct to print all cells in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![(0, self.0)];

        while let Some((level, cell)) = stack.pop() {
            let indent = level * 2;
            ok!(f.write_fmt(format_args!(
                "{:indent$}{}\n",
                "",
                DisplayBits {
                    bytes: cell.data(),
                    bit_len: cell.bit_len(),
                }
            )));

            for child in cell.references().iter().rev() {
                stack.push((level + 1, child));
            }
        }

        Ok(())
    }
}
