use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::*;
use crate::boc::Boc;
use crate::num::Tokens;

fn build_cell<F: FnOnce(&mut CellBuilder) -> Result<(), Error>>(f: F) -> Cell {
    let mut builder = CellBuilder::new();
    f(&mut builder).unwrap();
    builder.build().unwrap()
}

#[test]
fn labels() -> anyhow::Result<()> {
    let key_bit_len = 6;

    let key = BitString::from_binary_str("000001")?;
    let label = build_cell(|b| write_label(&key, key_bit_len, b));

    // 6 bits fit in 3 bits of length, so `hml_long` is the cheapest
    assert_eq!(label.bit_len(), 2 + 3 + 6);

    let parsed_key = read_label(&mut label.as_slice()?, key_bit_len)?;
    assert_eq!(parsed_key, key);

    // Uniform label
    let key = BitString::from_binary_str(&"1".repeat(100))?;
    let label = build_cell(|b| write_label(&key, 267, b));
    assert_eq!(label.bit_len(), 3 + 9);
    assert_eq!(read_label(&mut label.as_slice()?, 267)?, key);

    // Short label of a single bit
    let key = BitString::from_binary_str("1")?;
    let label = build_cell(|b| write_label(&key, 32, b));
    assert_eq!(format!("{:b}", label.bits()), "0101");
    assert_eq!(read_label(&mut label.as_slice()?, 32)?, key);

    // Equal costs prefer `hml_short`, `hml_same` must be strictly cheaper
    let label = build_cell(|b| write_label(&key, 1, b));
    assert_eq!(format!("{:b}", label.bits()), "0101");
    assert_eq!(read_label(&mut label.as_slice()?, 1)?, key);

    let key = BitString::from_binary_str("11")?;
    let label = build_cell(|b| write_label(&key, 4, b));
    assert_eq!(format!("{:b}", label.bits()), "011011");
    assert_eq!(read_label(&mut label.as_slice()?, 4)?, key);

    let label = build_cell(|b| write_label(&key, 2, b));
    assert_eq!(format!("{:b}", label.bits()), "11110");
    assert_eq!(read_label(&mut label.as_slice()?, 2)?, key);

    // Empty label
    let label = build_cell(|b| write_label(&BitString::new(), 32, b));
    assert_eq!(format!("{:b}", label.bits()), "00");
    assert!(read_label(&mut label.as_slice()?, 32)?.is_empty());

    // `hml_same` of 13 bits while only 9 key bits remain
    let label = build_cell(|b| {
        ok!(b.store_small_uint(0b111, 3));
        b.store_uint(13, 4)
    });
    let prefix = read_label(&mut label.as_slice()?, 9);
    assert_eq!(prefix.unwrap_err(), Error::InvalidLabel);

    assert_eq!(
        write_label(&key, 0, &mut CellBuilder::new()).unwrap_err(),
        Error::InvalidLabel
    );

    Ok(())
}

#[cfg(feature = "base64")]
#[test]
fn known_address_to_coins_dict() -> anyhow::Result<()> {
    let mut dict = HashMap::<StdAddr, Tokens>::new(StdAddr::BITS_WITHOUT_ANYCAST);
    dict.set(
        StdAddr::from_str("EQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG")?,
        Tokens::new(15),
    )?;
    dict.set(
        StdAddr::from_str("EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N")?,
        Tokens::new(10),
    )?;

    let root = dict.serialize()?.unwrap();
    assert_eq!(
        root.repr_hash(),
        &HashBytes::from_str("c279e85752ad418d54a023d5d391066fa6a560450f9562dcecfa6e6641393b6a")?
    );

    // Same dictionary through the coins codec
    let mut coins = HashMap::with_codecs(StdAddr::BITS_WITHOUT_ANYCAST, NaturalKey, CoinsValue);
    for (addr, value) in &dict {
        coins.set(addr.clone(), value.into_inner())?;
    }
    assert_eq!(coins.serialize()?.as_ref(), Some(&root));

    let parsed = HashMap::<StdAddr, Tokens>::parse(&root, StdAddr::BITS_WITHOUT_ANYCAST)?;
    assert_eq!(parsed, dict);

    let values = parsed.values().map(|v| v.into_inner()).collect::<Vec<_>>();
    assert_eq!(values, [15, 10]);

    Ok(())
}

#[test]
fn empty_and_single() -> anyhow::Result<()> {
    let mut dict = HashMap::<u32, u16>::new(32);
    assert!(dict.is_empty());
    assert_eq!(dict.serialize()?, None);

    let cell = CellBuilder::build_from(&dict)?;
    assert_eq!(cell.bit_len(), 1);
    assert_eq!(cell.reference_count(), 0);
    let loaded = cell.as_slice()?.load_dict::<u32, u16>(32)?;
    assert!(loaded.is_empty());

    dict.set(0xdeadbeef, 123)?;
    let root = dict.serialize()?.unwrap();
    assert_eq!(root.reference_count(), 0);

    // The whole key is stored in the label of a single leaf
    let mut slice = root.as_slice()?;
    let label = read_label(&mut slice, 32)?;
    assert_eq!(label, BitString::from_raw(&0xdeadbeefu32.to_be_bytes(), 32)?);
    assert_eq!(slice.load_u16()?, 123);
    assert!(slice.is_data_empty());

    Ok(())
}

#[test]
fn last_write_wins() -> anyhow::Result<()> {
    let mut dict = HashMap::<u8, u32>::new(8);
    assert_eq!(dict.set(1, 10)?, None);
    assert_eq!(dict.set(2, 20)?, None);
    assert_eq!(dict.set(1, 11)?, Some(10));
    assert_eq!(dict.len(), 2);
    assert_eq!(dict.get(&1)?, Some(&11));

    assert!(dict.contains_key(&2)?);
    assert_eq!(dict.remove(&2)?, Some(20));
    assert!(!dict.contains_key(&2)?);
    assert_eq!(dict.remove(&2)?, None);

    assert_eq!(dict.set(0, 0).map(|_| ()), Ok(()));
    assert_eq!(dict.keys().copied().collect::<Vec<_>>(), [0, 1]);

    let mut narrow = HashMap::<u32, u32>::new(4);
    assert_eq!(narrow.set(16, 0).unwrap_err(), Error::IntOverflow);
    assert_eq!(narrow.get(&16).unwrap_err(), Error::IntOverflow);

    Ok(())
}

#[test]
fn random_round_trips() -> anyhow::Result<()> {
    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(123123);

    for n in [0usize, 1, 2, 100] {
        let mut entries = (0..n)
            .map(|_| (rng.gen::<u32>(), rng.gen::<u64>()))
            .collect::<Vec<_>>();

        let mut dict = HashMap::with_codecs(32, NaturalKey, UintValue(64));
        for (key, value) in &entries {
            dict.set(*key, *value)?;
        }

        // Insertion order doesn't affect the output
        entries.shuffle(&mut rng);
        let mut shuffled = HashMap::with_codecs(32, NaturalKey, UintValue(64));
        for (key, value) in &entries {
            shuffled.set(*key, *value)?;
        }

        let root = dict.serialize()?;
        assert_eq!(root, shuffled.serialize()?);

        let Some(root) = root else {
            assert_eq!(n, 0);
            continue;
        };

        let root = Boc::decode(Boc::encode(&root))?;
        let parsed = HashMap::<u32, u64, _, _>::parse_with(&root, 32, NaturalKey, UintValue(64))?;
        assert_eq!(parsed, dict);
        assert_eq!(parsed.len(), n);

        for (key, value) in &entries {
            let key_bits = NaturalKey.encode_key(key, 32)?;
            let mut slice = dict_get(Some(&root), 32, &key_bits)?.unwrap();
            assert_eq!(slice.load_u64()?, *value);
        }

        let missing = entries
            .iter()
            .map(|(key, _)| key.wrapping_add(1))
            .find(|key| !dict.contains_key(key).unwrap());
        if let Some(missing) = missing {
            let key_bits = NaturalKey.encode_key(&missing, 32)?;
            assert!(dict_get(Some(&root), 32, &key_bits)?.is_none());
        }

        let keys = parsed.keys().copied().collect::<Vec<u32>>();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    Ok(())
}

#[test]
fn signed_and_wide_keys() -> anyhow::Result<()> {
    let mut dict = HashMap::<i16, ()>::new(16);
    for key in [-300, -1, 0, 1, 300] {
        dict.set(key, ())?;
    }

    // Keys are ordered by their bits
    let keys = dict.keys().copied().collect::<Vec<_>>();
    assert_eq!(keys, [0, 1, 300, -300, -1]);

    let root = dict.serialize()?.unwrap();
    assert_eq!(HashMap::<i16, ()>::parse(&root, 16)?, dict);

    let mut dict = HashMap::with_codecs(256, NaturalKey, RefValue);
    dict.set(HashBytes([0x11; 32]), Cell::empty_cell())?;
    dict.set(HashBytes([0x22; 32]), build_cell(|b| b.store_u32(123)))?;
    let root = dict.serialize()?.unwrap();
    let parsed = HashMap::parse_with(&root, 256, NaturalKey, RefValue)?;
    assert_eq!(parsed, dict);

    Ok(())
}

#[test]
fn raw_values() -> anyhow::Result<()> {
    let mut dict = HashMap::with_codecs(8, NaturalKey, RawValue);
    dict.set(1u8, build_cell(|b| b.store_u32(1)))?;
    dict.set(2u8, build_cell(|b| b.store_reference(Cell::empty_cell())))?;

    let root = dict.serialize()?.unwrap();
    let parsed = HashMap::parse_with(&root, 8, NaturalKey, RawValue)?;
    assert_eq!(parsed, dict);

    Ok(())
}

#[test]
fn dict_in_cell() -> anyhow::Result<()> {
    let mut dict = HashMap::<u32, u32>::new(32);
    dict.set(1, 100)?;
    dict.set(2, 200)?;

    let cell = build_cell(|b| {
        ok!(b.store_u8(0xaa));
        ok!(dict.store_into(b));
        b.store_u8(0xbb)
    });
    assert_eq!(cell.reference_count(), 1);

    let mut slice = cell.as_slice()?;
    assert_eq!(slice.load_u8()?, 0xaa);
    let loaded = slice.load_dict::<u32, u32>(32)?;
    assert_eq!(slice.load_u8()?, 0xbb);
    assert_eq!(loaded, dict);

    // Plain `Hashmap` with an inline root
    let root = dict.serialize()?.unwrap();
    let inline = root.as_slice()?.load_hashmap::<u32, u32>(32)?;
    assert_eq!(inline, dict);

    let mut slice = cell.as_slice()?;
    slice.skip_first(8, 0)?;
    assert_eq!(slice.load_dict_root()?, Some(root));

    Ok(())
}

#[test]
fn aug_dict() -> anyhow::Result<()> {
    let mut dict = AugHashMap::<u32, Tokens, u64>::new(32);
    assert_eq!(dict.serialize()?, (None, Tokens::ZERO));

    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(42);
    let mut total = 0u128;
    for _ in 0..50 {
        let extra = rng.gen_range(0..1_000_000_000u128);
        if dict.set(rng.gen(), Tokens::new(extra), rng.gen())?.is_none() {
            total += extra;
        }
    }

    let (root, extra) = dict.serialize()?;
    assert_eq!(extra, Tokens::new(total));

    let root = root.unwrap();
    let parsed = AugHashMap::<u32, Tokens, u64>::parse(&root, 32)?;
    assert_eq!(parsed, dict);

    let cell = CellBuilder::build_from(&dict)?;
    let mut slice = cell.as_slice()?;
    let loaded = slice.load_hashmap_aug_e::<u32, Tokens, u64>(32)?;
    assert!(slice.is_data_empty());
    assert_eq!(loaded, dict);

    let inline = root.as_slice()?.load_hashmap_aug::<u32, Tokens, u64>(32)?;
    assert_eq!(inline.len(), dict.len());

    let (key, extra, value) = dict.iter().next().map(|(k, a, v)| (*k, *a, *v)).unwrap();
    assert_eq!(dict.get(&key)?, Some((&extra, &value)));
    assert_eq!(dict.remove(&key)?, Some((extra, value)));
    assert_eq!(dict.serialize()?.1, Tokens::new(total - extra.into_inner()));

    let mut unit = AugHashMap::<u8, (), bool>::new(8);
    unit.set(1, (), true)?;
    unit.set(2, (), false)?;
    let (root, ()) = unit.serialize()?;
    assert_eq!(AugHashMap::parse(&root.unwrap(), 8)?, unit);

    let mut overflow = AugHashMap::<u8, Tokens, ()>::new(8);
    overflow.set(1, Tokens::MAX, ())?;
    overflow.set(2, Tokens::new(1), ())?;
    assert_eq!(overflow.serialize().unwrap_err(), Error::IntOverflow);

    Ok(())
}

#[test]
fn aug_dict_stored_extras() -> anyhow::Result<()> {
    let mut dict = AugHashMap::<u32, Tokens, u64>::new(32);
    dict.set(1, Tokens::new(10), 100)?;
    dict.set(2, Tokens::new(20), 200)?;

    let (root, total) = dict.serialize()?;
    let root = root.unwrap();
    assert_eq!(total, Tokens::new(30));

    // Wrong total of `HashmapAugE`
    let cell = build_cell(|b| {
        ok!(b.store_dict(Some(root.clone())));
        Tokens::new(31).store_into(b)
    });
    let loaded = cell.as_slice()?.load_hashmap_aug_e::<u32, Tokens, u64>(32);
    assert_eq!(loaded.unwrap_err(), Error::InvalidData);

    let cell = build_cell(|b| {
        ok!(b.store_dict(None));
        Tokens::new(1).store_into(b)
    });
    let loaded = cell.as_slice()?.load_hashmap_aug_e::<u32, Tokens, u64>(32);
    assert_eq!(loaded.unwrap_err(), Error::InvalidData);

    // Wrong fork extra
    let mut slice = root.as_slice()?;
    let label = read_label(&mut slice, 32)?;
    let left = slice.load_reference_cloned()?;
    let right = slice.load_reference_cloned()?;
    assert_eq!(slice.load_coins()?, 30);

    let forged = build_cell(|b| {
        ok!(write_label(&label, 32, b));
        ok!(b.store_reference(left.clone()));
        ok!(b.store_reference(right.clone()));
        Tokens::new(25).store_into(b)
    });
    assert_eq!(
        AugHashMap::<u32, Tokens, u64>::parse(&forged, 32).unwrap_err(),
        Error::InvalidData
    );

    Ok(())
}
