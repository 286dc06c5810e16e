use std::collections::btree_map;
use std::collections::BTreeMap;

use super::codec::{KeyCodec, NaturalKey, NaturalValue, ValueCodec};
use super::{read_label, write_label, DictKey};
use crate::cell::*;
use crate::error::Error;

/// Typed dictionary with fixed length keys.
///
/// Entries are kept decoded and ordered by the bits of their keys,
/// the wire form is built on [`HashMap::serialize`].
///
/// # TLB scheme
///
/// ```text
/// hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
///           {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
///
/// hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
/// hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X)
///            right:^(Hashmap n X) = HashmapNode (n + 1) X;
///
/// hme_empty$0 {n:#} {X:Type} = HashmapE n X;
/// hme_root$1 {n:#} {X:Type} root:^(Hashmap n X) = HashmapE n X;
/// ```
pub struct HashMap<K, V, KC = NaturalKey, VC = NaturalValue> {
    entries: BTreeMap<BitString, (K, V)>,
    key_bit_len: u16,
    key_codec: KC,
    value_codec: VC,
}

impl<K: Clone, V: Clone, KC: Clone, VC: Clone> Clone for HashMap<K, V, KC, VC> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            key_bit_len: self.key_bit_len,
            key_codec: self.key_codec.clone(),
            value_codec: self.value_codec.clone(),
        }
    }
}

impl<K: PartialEq, V: PartialEq, KC, VC> PartialEq for HashMap<K, V, KC, VC> {
    fn eq(&self, other: &Self) -> bool {
        self.key_bit_len == other.key_bit_len && self.entries == other.entries
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug, KC, VC> std::fmt::Debug for HashMap<K, V, KC, VC> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.values().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K, V> HashMap<K, V> {
    /// Creates an empty dictionary with natural key and value codecs.
    pub const fn new(key_bit_len: u16) -> Self {
        Self {
            entries: BTreeMap::new(),
            key_bit_len,
            key_codec: NaturalKey,
            value_codec: NaturalValue,
        }
    }
}

impl<K, V> HashMap<K, V>
where
    K: DictKey,
    for<'a> V: Store + Load<'a>,
{
    /// Parses a non-empty dictionary from its root cell.
    pub fn parse(root: &Cell, key_bit_len: u16) -> Result<Self, Error> {
        Self::parse_with(root, key_bit_len, NaturalKey, NaturalValue)
    }

    /// Loads `HashmapE` from the slice.
    pub fn load_from(slice: &mut CellSlice<'_>, key_bit_len: u16) -> Result<Self, Error> {
        Self::load_from_with(slice, key_bit_len, NaturalKey, NaturalValue)
    }
}

impl<K, V, KC, VC> HashMap<K, V, KC, VC> {
    /// Creates an empty dictionary with the specified codecs.
    pub const fn with_codecs(key_bit_len: u16, key_codec: KC, value_codec: VC) -> Self {
        Self {
            entries: BTreeMap::new(),
            key_bit_len,
            key_codec,
            value_codec,
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
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.entries.values(),
        }
    }

    /// Gets an iterator over the keys, sorted by key bits.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.entries.values(),
        }
    }

    /// Gets an iterator over the values, sorted by key bits.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.entries.values(),
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K, V, KC, VC> HashMap<K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    /// Parses a non-empty dictionary from its root cell using the specified codecs.
    pub fn parse_with(
        root: &Cell,
        key_bit_len: u16,
        key_codec: KC,
        value_codec: VC,
    ) -> Result<Self, Error> {
        let mut result = Self::with_codecs(key_bit_len, key_codec, value_codec);
        ok!(result.parse_node(&mut ok!(root.as_slice())));
        Ok(result)
    }

    /// Loads `HashmapE` from the slice using the specified codecs.
    pub fn load_from_with(
        slice: &mut CellSlice<'_>,
        key_bit_len: u16,
        key_codec: KC,
        value_codec: VC,
    ) -> Result<Self, Error> {
        match ok!(slice.load_maybe_reference()) {
            Some(root) => Self::parse_with(root, key_bit_len, key_codec, value_codec),
            None => Ok(Self::with_codecs(key_bit_len, key_codec, value_codec)),
        }
    }

    /// Sets the value associated with the key, returns the previous value.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        let bits = ok!(self.key_codec.encode_key(&key, self.key_bit_len));
        Ok(self.entries.insert(bits, (key, value)).map(|(_, v)| v))
    }

    /// Returns the value associated with the key.
    pub fn get(&self, key: &K) -> Result<Option<&V>, Error> {
        let bits = ok!(self.key_codec.encode_key(key, self.key_bit_len));
        Ok(self.entries.get(&bits).map(|(_, v)| v))
    }

    /// Returns `true` if the dictionary contains a value for the key.
    pub fn contains_key(&self, key: &K) -> Result<bool, Error> {
        let bits = ok!(self.key_codec.encode_key(key, self.key_bit_len));
        Ok(self.entries.contains_key(&bits))
    }

    /// Removes the value associated with the key, returns it if it was present.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, Error> {
        let bits = ok!(self.key_codec.encode_key(key, self.key_bit_len));
        Ok(self.entries.remove(&bits).map(|(_, v)| v))
    }

    /// Builds the dictionary root cell, `None` for an empty dictionary.
    pub fn serialize(&self) -> Result<Option<Cell>, Error> {
        if self.entries.is_empty() {
            return Ok(None);
        }

        let entries = self
            .entries
            .iter()
            .map(|(bits, (_, value))| (bits, value))
            .collect::<Vec<_>>();

        self.serialize_subtree(&entries, 0).map(Some)
    }

    fn serialize_subtree(&self, entries: &[(&BitString, &V)], offset: u16) -> Result<Cell, Error> {
        let remaining = self.key_bit_len - offset;

        let mut builder = CellBuilder::new();
        match entries {
            [] => return Err(Error::InvalidData),
            [(key, value)] => {
                let Some(label) = key.range(offset, remaining) else {
                    return Err(Error::CellUnderflow);
                };
                ok!(write_label(&label, remaining, &mut builder));
                ok!(self.value_codec.store_value(value, &mut builder));
            }
            [(first, _), .., (last, _)] => {
                // Entries are sorted so the common prefix of the whole
                // range is the common prefix of its bounds
                let prefix_len = first.longest_common_prefix(last) - offset;
                let Some(label) = first.range(offset, prefix_len) else {
                    return Err(Error::CellUnderflow);
                };
                ok!(write_label(&label, remaining, &mut builder));

                let split_bit = offset + prefix_len;
                let mid = entries.partition_point(|(key, _)| key.get(split_bit) == Some(false));
                let (left, right) = entries.split_at(mid);

                ok!(builder.store_reference(ok!(self.serialize_subtree(left, split_bit + 1))));
                ok!(builder.store_reference(ok!(self.serialize_subtree(right, split_bit + 1))));
            }
        }
        builder.build()
    }

    /// Parses a dictionary node and all its children into this dictionary.
    pub(crate) fn parse_node(&mut self, slice: &mut CellSlice<'_>) -> Result<(), Error> {
        let mut prefix = BitString::new();
        self.parse_subtree(slice, &mut prefix)
    }

    fn parse_subtree(&mut self, slice: &mut CellSlice<'_>, prefix: &mut BitString) -> Result<(), Error> {
        let start = prefix.len();
        let remaining = self.key_bit_len - start;

        let label = ok!(read_label(slice, remaining));
        ok!(prefix.append(&label));

        if label.len() == remaining {
            let key = ok!(self.key_codec.decode_key(prefix));
            let value = ok!(self.value_codec.load_value(slice));
            self.entries.insert(prefix.clone(), (key, value));
        } else {
            let fork = prefix.len();
            for bit in [false, true] {
                let mut child = ok!(ok!(slice.load_reference()).as_slice());
                ok!(prefix.push(bit));
                ok!(self.parse_subtree(&mut child, prefix));
                prefix.truncate(fork);
            }
        }

        prefix.truncate(start);
        Ok(())
    }
}

impl<K, V, KC, VC> Store for HashMap<K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    /// Stores the dictionary as `HashmapE`.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_dict(ok!(self.serialize()))
    }
}

impl<'a, K, V, KC, VC> IntoIterator for &'a HashMap<K, V, KC, VC> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`HashMap`].
#[derive(Clone)]
pub struct Iter<'a, K, V> {
    inner: btree_map::Values<'a, BitString, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over the keys of a [`HashMap`].
#[derive(Clone)]
pub struct Keys<'a, K, V> {
    inner: btree_map::Values<'a, BitString, (K, V)>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a [`HashMap`].
#[derive(Clone)]
pub struct Values<'a, K, V> {
    inner: btree_map::Values<'a, BitString, (K, V)>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
