//! Cells, dictionaries and the bag-of-cells codec for the TON blockchain.

macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub use self::address::{AnyAddr, StdAddr};
pub use self::boc::Boc;
pub use self::cell::{
    BitString, Cell, CellBuilder, CellDescriptor, CellSlice, CellType, HashBytes, LevelMask, Load,
    Store,
};
pub use self::dict::HashMap;

pub mod address;
pub mod boc;
pub mod cell;
pub mod dict;
pub mod error;
pub mod num;
pub mod prelude;

mod util;

#[cfg(all(test, feature = "base64"))]
mod tests {
    use super::*;

    #[test]
    fn cell_slices() {
        let cell = Boc::decode_base64("te6ccgEBAQEABQAABb23wA==").unwrap();
        println!("{}", cell.display_tree());

        let mut slice = cell.as_slice().unwrap();
        assert!(!slice.is_data_empty());
        assert_eq!(slice.remaining_bits(), 17);
        assert!(slice.is_refs_empty());
        assert_eq!(slice.remaining_refs(), 0);
        assert!(slice.get_reference(0).is_err());
        assert!(slice.load_reference_cloned().is_err());

        assert_eq!(slice.get_bit(0), Ok(true));
        assert_eq!(slice.load_bit(), Ok(true));
        assert_eq!(slice.get_small_uint(0, 8), Ok(123));
        assert_eq!(slice.get_small_uint(8, 8), Ok(111));
        assert!(slice.get_small_uint(16, 1).is_err());
    }
}
