use std::collections::BTreeMap;

use super::{read_label, write_label, DictKey};
use crate::cell::*;
use crate::error::Error;
use crate::num::Tokens;
use crate::util::unlikely;

/// Extra value which is combined over every subtree of an augmented dictionary.
pub trait AugDictExtra: Clone + Default + PartialEq {
    /// Combines the extras of the left and the right subtrees.
    fn comp_add(left: &Self, right: &Self) -> Result<Self, Error>;
}

impl AugDictExtra for () {
    #[inline]
    fn comp_add(_: &Self, _: &Self) -> Result<Self, Error> {
        Ok(())
    }
}

impl AugDictExtra for Tokens {
    #[inline]
    fn comp_add(left: &Self, right: &Self) -> Result<Self, Error> {
        match left.checked_add(*right) {
            Some(sum) => Ok(sum),
            None => Err(Error::IntOverflow),
        }
    }
}

/// Typed augmented dictionary with fixed length keys.
///
/// # TLB scheme
///
/// ```text
/// ahm_edge#_ {n:#} {V:Type} {A:Type} {l:#} {m:#}
///   label:(HmLabel ~l n) {n = (~m) + l}
///   node:(HashmapAugNode m V A) = HashmapAug n V A;
///
/// ahmn_leaf#_ {V:Type} {A:Type} extra:A value:V = HashmapAugNode 0 V A;
/// ahmn_fork#_ {n:#} {V:Type} {A:Type} left:^(HashmapAug n V A)
///   right:^(HashmapAug n V A) extra:A = HashmapAugNode (n + 1) V A;
///
/// ahme_empty$0 {n:#} {V:Type} {A:Type} extra:A = HashmapAugE n V A;
/// ahme_root$1 {n:#} {V:Type} {A:Type} root:^(HashmapAug n V A) extra:A = HashmapAugE n V A;
/// ```
pub struct AugHashMap<K, A, V> {
    entries: BTreeMap<BitString, (K, A, V)>,
    key_bit_len: u16,
}

impl<K: Clone, A: Clone, V: Clone> Clone for AugHashMap<K, A, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            key_bit_len: self.key_bit_len,
        }
    }
}

impl<K: PartialEq, A: PartialEq, V: PartialEq> PartialEq for AugHashMap<K, A, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key_bit_len == other.key_bit_len && self.entries == other.entries
    }
}

impl<K: std::fmt::Debug, A: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug
    for AugHashMap<K, A, V>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.values().map(|(k, a, v)| (k, (a, v))))
            .finish()
    }
}

impl<K, A, V> AugHashMap<K, A, V> {
    /// Creates an empty dictionary.
    pub const fn new(key_bit_len: u16) -> Self {
        Self {
            entries: BTreeMap::new(),
            key_bit_len,
        }
    }

    /// Returns the length of each key in bits.
    #[inline]
    pub const fn key_bit_len(&self) -> u16 {
        self.key_bit_len
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the dictionary contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets an iterator over the entries, sorted by key bits.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &A, &V)> + '_ {
        self.entries.values().map(|(k, a, v)| (k, a, v))
    }
}

impl<K, A, V> AugHashMap<K, A, V>
where
    K: DictKey,
    for<'a> A: AugDictExtra + Store + Load<'a>,
    for<'a> V: Store + Load<'a>,
{
    /// Parses a non-empty dictionary from its root cell.
    ///
    /// Every stored fork extra must match the combined extras of its children.
    pub fn parse(root: &Cell, key_bit_len: u16) -> Result<Self, Error> {
        let mut result = Self::new(key_bit_len);
        ok!(result.parse_node(&mut ok!(root.as_slice())));
        Ok(result)
    }

    /// Loads `HashmapAugE` from the slice.
    ///
    /// The stored total extra must match the extra of the root node.
    pub fn load_from(slice: &mut CellSlice<'_>, key_bit_len: u16) -> Result<Self, Error> {
        let mut result = Self::new(key_bit_len);
        let extra = match ok!(slice.load_maybe_reference()) {
            Some(root) => ok!(result.parse_node(&mut ok!(root.as_slice()))),
            None => A::default(),
        };
        if unlikely(ok!(A::load_from(slice)) != extra) {
            return Err(Error::InvalidData);
        }
        Ok(result)
    }

    /// Sets the value and its extra for the key, returns the previous pair.
    pub fn set(&mut self, key: K, extra: A, value: V) -> Result<Option<(A, V)>, Error> {
        let bits = ok!(self.encode_key(&key));
        Ok(self
            .entries
            .insert(bits, (key, extra, value))
            .map(|(_, a, v)| (a, v)))
    }

    /// Returns the extra and the value associated with the key.
    pub fn get(&self, key: &K) -> Result<Option<(&A, &V)>, Error> {
        let bits = ok!(self.encode_key(key));
        Ok(self.entries.get(&bits).map(|(_, a, v)| (a, v)))
    }

    /// Removes the entry for the key, returns its extra and value.
    pub fn remove(&mut self, key: &K) -> Result<Option<(A, V)>, Error> {
        let bits = ok!(self.encode_key(key));
        Ok(self.entries.remove(&bits).map(|(_, a, v)| (a, v)))
    }

    /// Builds the dictionary root cell and computes the total extra.
    ///
    /// An empty dictionary has no root and a default extra.
    pub fn serialize(&self) -> Result<(Option<Cell>, A), Error> {
        if self.entries.is_empty() {
            return Ok((None, A::default()));
        }

        let entries = self
            .entries
            .iter()
            .map(|(bits, (_, extra, value))| (bits, extra, value))
            .collect::<Vec<_>>();

        let (root, extra) = ok!(self.serialize_subtree(&entries, 0));
        Ok((Some(root), extra))
    }

    fn encode_key(&self, key: &K) -> Result<BitString, Error> {
        let mut builder = CellBuilder::new();
        ok!(key.store_key(self.key_bit_len, &mut builder));
        if builder.size_bits() != self.key_bit_len {
            return Err(Error::InvalidData);
        }
        Ok(builder.as_bit_string())
    }

    fn serialize_subtree(
        &self,
        entries: &[(&BitString, &A, &V)],
        offset: u16,
    ) -> Result<(Cell, A), Error> {
        let remaining = self.key_bit_len - offset;

        let mut builder = CellBuilder::new();
        let extra = match entries {
            [] => return Err(Error::InvalidData),
            [(key, extra, value)] => {
                let Some(label) = key.range(offset, remaining) else {
                    return Err(Error::CellUnderflow);
                };
                ok!(write_label(&label, remaining, &mut builder));
                ok!(extra.store_into(&mut builder));
                ok!(value.store_into(&mut builder));
                (*extra).clone()
            }
            [(first, ..), .., (last, ..)] => {
                let prefix_len = first.longest_common_prefix(last) - offset;
                let Some(label) = first.range(offset, prefix_len) else {
                    return Err(Error::CellUnderflow);
                };
                ok!(write_label(&label, remaining, &mut builder));

                let split_bit = offset + prefix_len;
                let mid = entries.partition_point(|(key, ..)| key.get(split_bit) == Some(false));
                let (left, right) = entries.split_at(mid);

                let (left, left_extra) = ok!(self.serialize_subtree(left, split_bit + 1));
                let (right, right_extra) = ok!(self.serialize_subtree(right, split_bit + 1));
                ok!(builder.store_reference(left));
                ok!(builder.store_reference(right));

                let extra = ok!(A::comp_add(&left_extra, &right_extra));
                ok!(extra.store_into(&mut builder));
                extra
            }
        };

        Ok((ok!(builder.build()), extra))
    }

    /// Parses the node and all its children, returns the node extra.
    pub(crate) fn parse_node(&mut self, slice: &mut CellSlice<'_>) -> Result<A, Error> {
        let mut prefix = BitString::new();
        self.parse_subtree(slice, &mut prefix)
    }

    fn parse_subtree(&mut self, slice: &mut CellSlice<'_>, prefix: &mut BitString) -> Result<A, Error> {
        let start = prefix.len();
        let remaining = self.key_bit_len - start;

        let label = ok!(read_label(slice, remaining));
        ok!(prefix.append(&label));

        let extra = if label.len() == remaining {
            let key = ok!(K::load_key(prefix));
            let extra = ok!(A::load_from(slice));
            let value = ok!(V::load_from(slice));
            self.entries
                .insert(prefix.clone(), (key, extra.clone(), value));
            extra
        } else {
            let fork = prefix.len();
            let mut children = [A::default(), A::default()];
            for (bit, child_extra) in [false, true].into_iter().zip(&mut children) {
                let mut child = ok!(ok!(slice.load_reference()).as_slice());
                ok!(prefix.push(bit));
                *child_extra = ok!(self.parse_subtree(&mut child, prefix));
                prefix.truncate(fork);
            }

            let [left, right] = children;
            let extra = ok!(A::comp_add(&left, &right));
            if unlikely(ok!(A::load_from(slice)) != extra) {
                return Err(Error::InvalidData);
            }
            extra
        };

        prefix.truncate(start);
        Ok(extra)
    }
}

impl<K, A, V> Store for AugHashMap<K, A, V>
where
    K: DictKey,
    for<'a> A: AugDictExtra + Store + Load<'a>,
    for<'a> V: Store + Load<'a>,
{
    /// Stores the dictionary as `HashmapAugE`.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let (root, extra) = ok!(self.serialize());
        ok!(builder.store_dict(root));
        extra.store_into(builder)
    }
}
