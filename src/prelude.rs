//! The `ton-types` prelude.
//!
//! This brings into scope a number of traits and commonly used types.

pub use crate::address::{AnyAddr, ExtAddr, StdAddr};
pub use crate::boc::Boc;
pub use crate::cell::{
    BitString, Cell, CellBuilder, CellSlice, CellType, HashBytes, Load, Store,
};
pub use crate::dict::{AugDictExtra, AugHashMap, DictKey, HashMap};
pub use crate::num::Tokens;
