use sha2::Digest;
use smallvec::SmallVec;

use crate::cell::{
    Cell, CellDescriptor, CellTreeStats, CellType, HashBytes, LevelMask, MAX_DEPTH, MAX_REF_COUNT,
};
use crate::error::Error;
use crate::util::unlikely;

/// Partially assembled cell.
pub struct CellParts<'a> {
    /// Length of this cell's data in bits.
    pub bit_len: u16,

    /// Whether the cell is exotic.
    pub is_exotic: bool,

    /// Level mask from the serialized descriptor.
    ///
    /// When set, it must match the mask computed from the cell contents.
    pub stored_level_mask: Option<LevelMask>,

    /// Array of child cells.
    pub references: SmallVec<[Cell; MAX_REF_COUNT]>,

    /// Cell data with a completion tag for unaligned bit lengths.
    pub data: &'a [u8],
}

impl CellParts<'_> {
    /// Bitwise OR of child level masks.
    pub fn children_mask(&self) -> LevelMask {
        let mut children_mask = LevelMask::EMPTY;
        for child in &self.references {
            children_mask |= child.level_mask();
        }
        children_mask
    }

    /// Validates the structure of the cell and computes its type and level mask.
    pub fn compute_level_mask(&self) -> Result<(CellType, LevelMask), Error> {
        const HASH_BITS: u16 = 256;
        const DEPTH_BITS: u16 = 16;

        let bit_len = self.bit_len;
        let references = self.references.as_slice();

        if !self.is_exotic {
            return Ok((CellType::Ordinary, self.children_mask()));
        }

        let Some(&first_byte) = self.data.first() else {
            return Err(Error::InvalidCell);
        };
        if unlikely(bit_len < 8) {
            return Err(Error::InvalidCell);
        }

        match CellType::from_byte_exotic(first_byte) {
            // 8 bits type, 8 bits level mask, level x (hash, depth)
            Some(CellType::PrunedBranch) => {
                let stored_mask = LevelMask::new(self.data.get(1).copied().unwrap_or_default());
                if unlikely(bit_len < 16 || stored_mask.is_empty()) {
                    return Err(Error::InvalidCell);
                }

                let expected_bit_len = 8
                    + 8
                    + (stored_mask.hash_count() as u16 - 1) * (HASH_BITS + DEPTH_BITS);
                if unlikely(bit_len != expected_bit_len || !references.is_empty()) {
                    return Err(Error::InvalidCell);
                }

                Ok((CellType::PrunedBranch, stored_mask))
            }
            // 8 bits type, hash
            Some(CellType::LibraryReference) => {
                const EXPECTED_BIT_LEN: u16 = 8 + HASH_BITS;
                if unlikely(bit_len != EXPECTED_BIT_LEN || !references.is_empty()) {
                    return Err(Error::InvalidCell);
                }

                Ok((CellType::LibraryReference, LevelMask::EMPTY))
            }
            // 8 bits type, hash, depth
            Some(CellType::MerkleProof) => {
                const EXPECTED_BIT_LEN: u16 = 8 + HASH_BITS + DEPTH_BITS;
                if unlikely(bit_len != EXPECTED_BIT_LEN || references.len() != 1) {
                    return Err(Error::InvalidCell);
                }

                Ok((CellType::MerkleProof, self.children_mask().virtualize(1)))
            }
            // 8 bits type, 2 x (hash, depth)
            Some(CellType::MerkleUpdate) => {
                const EXPECTED_BIT_LEN: u16 = 8 + 2 * (HASH_BITS + DEPTH_BITS);
                if unlikely(bit_len != EXPECTED_BIT_LEN || references.len() != 2) {
                    return Err(Error::InvalidCell);
                }

                Ok((CellType::MerkleUpdate, self.children_mask().virtualize(1)))
            }
            _ => Err(Error::InvalidCell),
        }
    }

    /// Validates the cell, computes all hashes and builds it.
    pub fn finalize(self) -> Result<Cell, Error> {
        let (cell_type, level_mask) = ok!(self.compute_level_mask());
        if let Some(stored) = self.stored_level_mask {
            if unlikely(stored != level_mask) {
                return Err(Error::InvalidCell);
            }
        }

        let descriptor = CellDescriptor::new([
            CellDescriptor::compute_d1(level_mask, self.is_exotic, self.references.len() as u8),
            CellDescriptor::compute_d2(self.bit_len),
        ]);

        let hashes = ok!(self.compute_hashes(descriptor, cell_type));

        let mut stats = CellTreeStats {
            bit_count: self.bit_len as u64,
            cell_count: 1,
        };
        for child in &self.references {
            stats += child.stats();
        }

        let byte_len = descriptor.byte_len() as usize;
        let data = match self.data.get(..byte_len) {
            Some(data) => Box::<[u8]>::from(data),
            None => return Err(Error::InvalidCell),
        };

        Ok(Cell::from_parts(
            descriptor,
            self.bit_len,
            data,
            self.references,
            hashes,
            stats,
        ))
    }

    /// Computes hashes and depths for all significant levels.
    ///
    /// Pruned branches compute only the hash of the highest level,
    /// lower ones are stored in the cell data.
    fn compute_hashes(
        &self,
        descriptor: CellDescriptor,
        cell_type: CellType,
    ) -> Result<SmallVec<[(HashBytes, u16); 4]>, Error> {
        let level_mask = descriptor.level_mask();
        let level = level_mask.level();
        let is_pruned = cell_type.is_pruned_branch();
        let level_offset = cell_type.is_merkle() as u8;

        let byte_len = descriptor.byte_len() as usize;
        let Some(data) = self.data.get(..byte_len) else {
            return Err(Error::InvalidCell);
        };

        let hash_offset = if is_pruned {
            level_mask.hash_count() as usize - 1
        } else {
            0
        };

        let mut hashes = SmallVec::<[(HashBytes, u16); 4]>::new();
        let mut hash_index = 0;
        for li in 0..=level {
            if !level_mask.is_significant(li) {
                continue;
            }
            if hash_index < hash_offset {
                hash_index += 1;
                continue;
            }

            let mut hasher = sha2::Sha256::new();

            let d1 = (descriptor.d1 & !CellDescriptor::LEVEL_MASK)
                | (level_mask.apply(li).to_byte() << 5);
            hasher.update([d1, descriptor.d2]);

            match hashes.last() {
                Some((prev_hash, _)) => hasher.update(prev_hash.as_slice()),
                None => hasher.update(data),
            }

            let child_level = li + level_offset;

            let mut depth = 0;
            for child in &self.references {
                let child_depth = child.depth(child_level);
                depth = std::cmp::max(depth, child_depth + 1);
                hasher.update(child_depth.to_be_bytes());
            }
            if unlikely(depth > MAX_DEPTH) {
                return Err(Error::DepthOverflow);
            }

            for child in &self.references {
                hasher.update(child.hash(child_level).as_slice());
            }

            hashes.push((HashBytes::from(hasher.finalize()), depth));
            hash_index += 1;
        }

        Ok(hashes)
    }
}
