use super::{CellType, LevelMask};

/// Two descriptor bytes that precede the cell data in BOC and hash representations.
///
/// - `d1 = refs + 8 * exotic + 16 * store_hashes + 32 * level_mask`
/// - `d2 = floor(bits / 8) + ceil(bits / 8)`
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct CellDescriptor {
    /// First descriptor byte with a generic info about cell.
    pub d1: u8,
    /// Second descriptor byte with a packed data size.
    pub d2: u8,
}

impl CellDescriptor {
    /// Bit mask to store the number of references in the descriptor.
    pub const REF_COUNT_MASK: u8 = 0b0000_0111;
    /// Bit mask to store the `is_exotic` flag in the descriptor.
    pub const IS_EXOTIC_MASK: u8 = 0b0000_1000;
    /// Bit mask to store the `store_hashes` flag in the descriptor.
    pub const STORE_HASHES_MASK: u8 = 0b0001_0000;
    /// _de Bruijn_ level presence mask in the descriptor.
    pub const LEVEL_MASK: u8 = 0b1110_0000;

    /// Computes the first descriptor byte.
    #[inline(always)]
    pub const fn compute_d1(level_mask: LevelMask, is_exotic: bool, ref_count: u8) -> u8 {
        (level_mask.to_byte() << 5) | ((is_exotic as u8) << 3) | (ref_count & 0b111)
    }

    /// Computes the second descriptor byte.
    #[inline(always)]
    pub const fn compute_d2(bit_len: u16) -> u8 {
        (((bit_len >> 2) as u8) & !0b1) | ((bit_len % 8 != 0) as u8)
    }

    /// Constructs cell descriptor bytes.
    #[inline(always)]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self {
            d1: bytes[0],
            d2: bytes[1],
        }
    }

    /// Computes cell type.
    pub fn cell_type(self, data: &[u8]) -> CellType {
        if !self.is_exotic() {
            CellType::Ordinary
        } else {
            match data.first() {
                Some(&byte) => CellType::from_byte_exotic(byte).unwrap_or(CellType::Ordinary),
                None => CellType::Ordinary,
            }
        }
    }

    /// Computes child cell count.
    #[inline(always)]
    pub const fn reference_count(self) -> u8 {
        self.d1 & Self::REF_COUNT_MASK
    }

    /// Returns `true` if the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline(always)]
    pub const fn is_exotic(self) -> bool {
        self.d1 & Self::IS_EXOTIC_MASK != 0
    }

    /// Returns whether this cell stores hashes in data.
    #[inline(always)]
    pub const fn store_hashes(self) -> bool {
        self.d1 & Self::STORE_HASHES_MASK != 0
    }

    /// Computes level mask.
    #[inline(always)]
    pub const fn level_mask(self) -> LevelMask {
        LevelMask::new(self.d1 >> 5)
    }

    /// Returns whether this cell's data is a multiple of 8 bits.
    #[inline(always)]
    pub const fn is_aligned(self) -> bool {
        self.d2 & 1 == 0
    }

    /// Returns the data length in bytes, including the completion tag byte.
    #[inline(always)]
    pub const fn byte_len(self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }

    /// Returns `true` if the descriptor describes an absent cell.
    #[inline(always)]
    pub const fn is_absent(self) -> bool {
        const MASK: u8 = CellDescriptor::REF_COUNT_MASK | CellDescriptor::IS_EXOTIC_MASK;
        self.d1 & MASK == MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_data_length() {
        for (bit_len, d2, byte_len, aligned) in [
            (0, 0, 0, true),
            (1, 1, 1, false),
            (8, 2, 1, true),
            (299, 0x4b, 38, false),
            (1016, 254, 127, true),
            (1023, 255, 128, false),
        ] {
            let descriptor = CellDescriptor::new([0, CellDescriptor::compute_d2(bit_len)]);
            assert_eq!(descriptor.d2, d2, "bit_len: {bit_len}");
            assert_eq!(descriptor.byte_len(), byte_len);
            assert_eq!(descriptor.is_aligned(), aligned);
        }
    }

    #[test]
    fn first_byte() {
        let d1 = CellDescriptor::compute_d1(LevelMask::new(0b101), true, 3);
        let descriptor = CellDescriptor::new([d1, 0]);
        assert_eq!(d1, 0b1010_1011);
        assert_eq!(descriptor.reference_count(), 3);
        assert!(descriptor.is_exotic());
        assert!(!descriptor.store_hashes());
        assert_eq!(descriptor.level_mask(), LevelMask::new(0b101));
    }
}
