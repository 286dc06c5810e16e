use smallvec::SmallVec;

use super::{BocFlags, BocTag};
use crate::cell::{Cell, CellDescriptor, CellParts, MAX_REF_COUNT};
use crate::util::{read_be_uint, unlikely};

/// BOC deserialization options.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// The minimum allowed root count.
    pub min_roots: Option<usize>,
    /// The maximum allowed root count.
    pub max_roots: Option<usize>,
}

impl Options {
    /// Constructs decoder options to expect exactly the specified number of roots.
    pub const fn exact(number: usize) -> Self {
        Self {
            min_roots: Some(number),
            max_roots: Some(number),
        }
    }
}

/// Parsed BOC header.
pub struct BocHeader<'a> {
    ref_size: usize,
    flags: BocFlags,
    cells: Vec<&'a [u8]>,
    roots: SmallVec<[u32; ROOTS_ON_STACK]>,
}

impl<'a> BocHeader<'a> {
    /// Decodes boc info from the specified bytes.
    pub fn decode(data: &'a [u8], options: &Options) -> Result<Self, Error> {
        let mut reader = BocReader::new(data);

        // 4 bytes - tag
        // 1 byte - flags
        // 1 byte - offset size
        let Some(header) = reader.read_bytes(6) else {
            return Err(Error::UnexpectedEof);
        };
        let [t0, t1, t2, t3, flags, offset_size] = [
            header[0], header[1], header[2], header[3], header[4], header[5],
        ];

        let tag = ok!(BocTag::from_bytes([t0, t1, t2, t3]).ok_or(Error::UnknownBocTag));
        let (flags, ref_size, supports_multiple_roots) = match tag {
            BocTag::Indexed => (BocFlags::HAS_INDEX, flags as usize, false),
            BocTag::IndexedCrc32 => (BocFlags::HAS_INDEX | BocFlags::HAS_CRC, flags as usize, false),
            _ => {
                let ref_size = (flags & BocFlags::REF_SIZE_MASK) as usize;
                (BocFlags::from_bits_truncate(flags), ref_size, true)
            }
        };

        let has_index = flags.contains(BocFlags::HAS_INDEX);
        let has_crc = flags.contains(BocFlags::HAS_CRC);

        if unlikely(flags.contains(BocFlags::HAS_CACHE_BITS) && !has_index) {
            return Err(Error::InvalidHeader);
        }
        if unlikely(ref_size == 0 || ref_size > std::mem::size_of::<u32>()) {
            return Err(Error::InvalidRefSize);
        }

        let offset_size = offset_size as usize;
        if unlikely(offset_size == 0 || offset_size > std::mem::size_of::<u64>()) {
            return Err(Error::InvalidOffsetSize);
        }

        // {ref_size} bytes - cell count
        // {ref_size} bytes - root count
        // {ref_size} bytes - absent cell count
        // {offset_size} bytes - total cells size
        if unlikely(!reader.require(ref_size * 3 + offset_size)) {
            return Err(Error::InvalidHeader);
        }

        let cell_count = ok!(reader.read_be_uint(ref_size)) as usize;
        let root_count = ok!(reader.read_be_uint(ref_size)) as usize;
        let absent_count = ok!(reader.read_be_uint(ref_size)) as usize;

        // Validate root or absent cells
        if unlikely(root_count == 0) {
            return Err(Error::RootCellNotFound);
        }
        if unlikely(!supports_multiple_roots && root_count > 1) {
            return Err(Error::UnexpectedMultipleRoots);
        }
        if unlikely(root_count.saturating_add(absent_count) > cell_count) {
            return Err(Error::TooManyRootCells);
        }
        if unlikely(absent_count > 0) {
            return Err(Error::AbsentCellsNotSupported);
        }
        if let Some(min_roots) = options.min_roots {
            if unlikely(root_count < min_roots) {
                return Err(Error::TooFewRootCells);
            }
        }
        if unlikely(root_count > options.max_roots.unwrap_or(MAX_ROOTS)) {
            return Err(Error::TooManyRootCells);
        }

        let total_cells_size = ok!(reader.read_be_uint(offset_size));

        const MIN_CELL_SIZE: u64 = 2; // [d1, d2]

        // `cell_count` fits into `u32`, so none of these products overflow `u64`
        let min_total_cell_size = (cell_count as u64) * (MIN_CELL_SIZE + ref_size as u64)
            - (root_count * ref_size) as u64;
        #[cfg(not(fuzzing))]
        if unlikely(total_cells_size < min_total_cell_size) {
            return Err(Error::InvalidTotalSize);
        }

        // 2 bytes - descriptor
        // 4 * (2 + 32) - inline hashes and depths if presented
        // 128 - max data length
        // 4*{ref_size} - max references
        let max_cell_size = 2 + 4 * (2 + 32) + 128 + (MAX_REF_COUNT as u64) * ref_size as u64;
        #[cfg(not(fuzzing))]
        if unlikely(total_cells_size > (cell_count as u64) * max_cell_size) {
            return Err(Error::InvalidTotalSize);
        }

        if unlikely(!reader.require(root_count * ref_size)) {
            return Err(Error::UnexpectedEof);
        }

        let mut roots = SmallVec::with_capacity(root_count);
        if supports_multiple_roots {
            for _ in 0..root_count {
                let root_index = ok!(reader.read_be_uint(ref_size)) as usize;
                if unlikely(root_index >= cell_count) {
                    return Err(Error::RootOutOfBounds);
                }
                roots.push(root_index as u32);
            }
        } else {
            roots.push(0);
        }

        let index_size = has_index as u64 * cell_count as u64 * offset_size as u64;
        #[cfg(not(fuzzing))]
        if unlikely(!reader.require_u64(index_size + total_cells_size + has_crc as u64 * 4)) {
            return Err(Error::UnexpectedEof);
        }

        if has_index && reader.read_bytes(cell_count * offset_size).is_none() {
            return Err(Error::UnexpectedEof);
        }

        let cells_start_offset = reader.offset;

        let mut cells = Vec::new();
        if cells.try_reserve_exact(cell_count).is_err() {
            return Err(Error::InvalidTotalSize);
        }

        for _ in 0..cell_count {
            let start = reader.offset;
            let Some(&[d1, d2]) = reader.peek_bytes(2) else {
                return Err(Error::UnexpectedEof);
            };

            let descriptor = CellDescriptor::new([d1, d2]);
            if unlikely(descriptor.is_absent()) {
                return Err(Error::AbsentCellsNotSupported);
            }

            // 0b11111111 -> 0b01111111 + 1 = 0b10000000 = byte len 128, max bit len = 1023
            // 0b11111110 -> 0b01111111 = byte len 127, bit len = 1016
            let data_len = descriptor.byte_len() as usize;
            let ref_count = descriptor.reference_count() as usize;
            if unlikely(ref_count > MAX_REF_COUNT) {
                return Err(Error::InvalidRef);
            }

            let mut data_offset = 0;
            if unlikely(descriptor.store_hashes()) {
                let level = descriptor.level_mask().level();
                if descriptor.is_exotic() && ref_count == 0 && level > 0 {
                    // Pruned branch with `store_hashes` is invalid
                    return Err(Error::UnnormalizedCell);
                }
                data_offset = (32 + 2) * (level as usize + 1);
            }

            let total_len = 2 + data_offset + data_len + ref_count * ref_size;
            let Some(cell) = reader.read_bytes(total_len) else {
                return Err(Error::UnexpectedEof);
            };

            if data_len > 0 && !descriptor.is_aligned() {
                let byte_with_tag = cell[2 + data_offset + data_len - 1];
                if unlikely(byte_with_tag & 0x7f == 0) {
                    return Err(Error::UnnormalizedCell);
                }
            }

            debug_assert_eq!(reader.offset - start, total_len);
            cells.push(cell);
        }

        // Check that `total_cells_size` is correct
        #[cfg(not(fuzzing))]
        if (cells_start_offset as u64).saturating_add(total_cells_size) != reader.offset as u64 {
            return Err(Error::InvalidTotalSize);
        }

        // Verify checksum if specified
        #[cfg(not(fuzzing))]
        if has_crc {
            let crc_offset = reader.offset;
            let Some(&[c0, c1, c2, c3]) = reader.read_bytes(4) else {
                return Err(Error::UnexpectedEof);
            };

            let parsed_crc = u32::from_le_bytes([c0, c1, c2, c3]);
            let real_crc = crc32c::crc32c(&data[..crc_offset]);
            if parsed_crc != real_crc {
                return Err(Error::InvalidChecksum);
            }
        }

        log::trace!(
            "decoded BOC header: cells={cell_count}, roots={root_count}, \
            ref_size={ref_size}, offset_size={offset_size}, flags={flags:?}"
        );

        Ok(Self {
            ref_size,
            flags,
            cells,
            roots,
        })
    }

    /// Assembles cell tree from the parsed cell slices.
    ///
    /// Cells are built in reverse order, so that every child is already
    /// built when its parent is processed.
    pub fn finalize(&self) -> Result<ProcessedCells, Error> {
        let ref_size = self.ref_size;
        let cell_count = self.cells.len();

        let mut res = Vec::new();
        if res.try_reserve_exact(cell_count).is_err() {
            return Err(Error::InvalidTotalSize);
        }

        for (rev_index, raw) in self.cells.iter().rev().enumerate() {
            let index = cell_count - rev_index - 1;

            // Layout was validated in `decode`
            let descriptor = CellDescriptor::new([raw[0], raw[1]]);
            let byte_len = descriptor.byte_len() as usize;

            let mut offset = 2;
            if unlikely(descriptor.store_hashes()) {
                let level = descriptor.level_mask().level();
                offset += (32 + 2) * (level as usize + 1);
            }

            let data = &raw[offset..offset + byte_len];
            offset += byte_len;

            let bit_len = if descriptor.is_aligned() {
                (byte_len * 8) as u16
            } else if let Some(last) = data.last() {
                byte_len as u16 * 8 - last.trailing_zeros() as u16 - 1
            } else {
                0
            };

            let mut references = SmallVec::<[Cell; MAX_REF_COUNT]>::new();
            for _ in 0..descriptor.reference_count() {
                let child_index = read_be_uint(&raw[offset..offset + ref_size]) as usize;
                offset += ref_size;

                if child_index >= cell_count {
                    return Err(Error::InvalidRef);
                }
                if child_index <= index {
                    return Err(Error::InvalidRefOrder);
                }

                match res.get(cell_count - child_index - 1) {
                    Some(child) => references.push(Cell::clone(child)),
                    None => return Err(Error::InvalidRefOrder),
                }
            }

            let parts = CellParts {
                bit_len,
                is_exotic: descriptor.is_exotic(),
                stored_level_mask: Some(descriptor.level_mask()),
                references,
                data,
            };
            match parts.finalize() {
                Ok(cell) => res.push(cell),
                Err(e) => {
                    log::debug!("rejected BOC cell #{index}: {e}");
                    return Err(Error::InvalidCell);
                }
            }
        }

        Ok(ProcessedCells(res))
    }

    /// Cell index size in bytes. Guaranteed to be 4 at max.
    pub fn ref_size(&self) -> usize {
        self.ref_size
    }

    /// Header flags.
    pub fn flags(&self) -> BocFlags {
        self.flags
    }

    /// Slices of the unique cells.
    pub fn cells(&self) -> &[&'a [u8]] {
        &self.cells
    }

    /// Root indices.
    pub fn roots(&self) -> &[u32] {
        &self.roots
    }
}

/// Array of processed cells.
pub struct ProcessedCells(Vec<Cell>);

impl ProcessedCells {
    /// Returns a processed cell by index.
    pub fn get(&self, index: u32) -> Option<Cell> {
        let rev_index = self.0.len().checked_sub(index as usize + 1)?;
        self.0.get(rev_index).cloned()
    }
}

/// Bounds checked cursor over the BOC bytes.
struct BocReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BocReader<'a> {
    #[inline(always)]
    const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline(always)]
    fn require(&self, len: usize) -> bool {
        match self.offset.checked_add(len) {
            Some(end) => end <= self.data.len(),
            None => false,
        }
    }

    #[cfg(not(fuzzing))]
    #[inline(always)]
    fn require_u64(&self, len: u64) -> bool {
        match usize::try_from(len) {
            Ok(len) => self.require(len),
            Err(_) => false,
        }
    }

    #[inline(always)]
    fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        self.data.get(self.offset..end)
    }

    #[inline(always)]
    fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.offset += len;
        Some(bytes)
    }

    /// Reads a big-endian integer of `size` bytes (at most 8).
    #[inline(always)]
    fn read_be_uint(&mut self, size: usize) -> Result<u64, Error> {
        match self.read_bytes(size) {
            Some(bytes) => Ok(read_be_uint(bytes)),
            None => Err(Error::UnexpectedEof),
        }
    }
}

const ROOTS_ON_STACK: usize = 2;

const MAX_ROOTS: usize = 32;

/// Error type for BOC decoding related errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// EOF encountered during another operation.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// Invalid magic bytes.
    #[error("unknown BOC tag")]
    UnknownBocTag,
    /// Invalid BOC header.
    #[error("invalid header")]
    InvalidHeader,
    /// References size is greater than 4.
    #[error("ref index does not fit in `u32` type")]
    InvalidRefSize,
    /// Offset size is greater than 8.
    #[error("cell offset does not fit in `u64` type")]
    InvalidOffsetSize,
    /// Root cell not found.
    #[error("root cell not found")]
    RootCellNotFound,
    /// Specified BOC tag doesn't support multiple roots.
    #[error("unexpected multiple roots")]
    UnexpectedMultipleRoots,
    /// The number of roots in BOC is greater than expected.
    #[error("too many root cells")]
    TooManyRootCells,
    /// Absent cells are legacy therefore not supported.
    #[error("absent cells are not supported")]
    AbsentCellsNotSupported,
    /// The number of roots in BOC is less than expected.
    #[error("too few root cells")]
    TooFewRootCells,
    /// Total cells size mismatch.
    #[error("invalid total cells size")]
    InvalidTotalSize,
    /// Invalid root cell index.
    #[error("root index out of bounds")]
    RootOutOfBounds,
    /// Invalid child reference.
    #[error("cell ref count not in range 0..=4")]
    InvalidRef,
    /// Suboptimal cells are treated as error.
    #[error("unnormalized cell")]
    UnnormalizedCell,
    /// Possible graph loop detected.
    #[error("invalid children order")]
    InvalidRefOrder,
    /// Failed to parse cell.
    #[error("invalid cell")]
    InvalidCell,
    /// Crc mismatch.
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Textual BOC is not a valid hex string.
    #[error("invalid hex string")]
    InvalidHex,
    /// Textual BOC is not a valid base64 string.
    #[error("invalid base64 string")]
    InvalidBase64,
}
