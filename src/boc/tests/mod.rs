use super::*;
use crate::cell::{CellBuilder, HashBytes, EMPTY_CELL_HASH};
use crate::util::decode_base64;

const KNOWN_HEX: &str = "b5ee9c7201010201002b00014b0000000f800deb78cf30dc0c8612c3b3be0086724d499b25cb2fbbb154c086c8b58417a2f050010000";
const KNOWN_BASE64: &str = "te6ccgEBAgEAKwABSwAAAA+ADet4zzDcDIYSw7O+AIZyTUmbJcsvu7FUwIbItYQXovBQAQAA";

#[test]
fn boc_with_crc() {
    let boc_without_crc = decode_base64("te6ccgECTAEADjkAAgaK2zVLAQQkiu1TIOMDIMD/4wIgwP7jAvILQgMCRwO+7UTQ10nDAfhmifhpIds80wABjhqBAgDXGCD5AQHTAAGU0/8DAZMC+ELi+RDyqJXTAAHyeuLTPwH4QyG58rQg+COBA+iogggbd0CgufK0+GPTHwH4I7zyudMfAds88jxIDwQEfO1E0NdJwwH4ZiLQ0wP6QDD4aak4APhEf29xggiYloBvcm1vc3BvdPhk4wIhxwDjAiHXDR/yvCHjAwHbPPI8Pz4+BAIoIIIQZ6C5X7vjAiCCEH1v8lS74wISBQM8IIIQaLVfP7rjAiCCEHPiIUO64wIgghB9b/JUuuMCDggGAzYw+Eby4Ez4Qm7jACGT1NHQ3vpA0ds8MNs88gBBB0YAaPhL+EnHBfLj6PhL+E34SnDIz4WAygBzz0DOcc8LblUgyM+QU/a2gssfzgHIzs3NyYBA+wADTjD4RvLgTPhCbuMAIZPU0dDe03/6QNN/1NHQ+kDSANTR2zww2zzyAEEJRgRu+Ev4SccF8uPoJcIA8uQaJfhMu/LkJCT6Qm8T1wv/wwAl+EvHBbOw8uQG2zxw+wJVA9s8iSXCAEktSAoBmo6AnCH5AMjPigBAy//J0OIx+EwnobV/+GxVIQL4S1UGVQR/yM+FgMoAc89AznHPC25VQMjPkZ6C5X7Lf85VIMjOygDMzc3JgQCA+wBbCwEKVHFU2zwMArj4S/hN+EGIyM+OK2zWzM7JVQQg+QD4KPpCbxLIz4ZAygfL/8nQBibIz4WIzgH6AovQAAAAAAAAAAAAAAAAB88WIds8zM+DVTDIz5BWgOPuzMsfzgHIzs3NyXH7AEsNADTQ0gABk9IEMd7SAAGT0gEx3vQE9AT0BNFfAwEcMPhCbuMA+Ebyc9HywGQPAhbtRNDXScIBjoDjDRBBA2Zw7UTQ9AVxIYBA9A6OgN9yIoBA9A6OgN9wIIj4bvht+Gz4a/hqgED0DvK91wv/+GJw+GMREUcBAolIBFAgghAPAliqu+MCIIIQIOvHbbvjAiCCEEap1+y74wIgghBnoLlfu+MCMCUcEwRQIIIQSWlYf7rjAiCCEFYlSK264wIgghBmXc6fuuMCIIIQZ6C5X7rjAhoYFhQDSjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA0gDU0ds8MNs88gBBFUYC5PhJJNs8+QDIz4oAQMv/ydDHBfLkTNs8cvsC+EwloLV/+GwBjjVTAfhJU1b4SvhLcMjPhYDKAHPPQM5xzwtuVVDIz5HDYn8mzst/VTDIzlUgyM5ZyM7Mzc3NzZohyM+FCM6Ab89A4smBAICmArUH+wBfBC1JA+ww+Eby4Ez4Qm7jANMf+ERYb3X4ZNHbPCGOJSPQ0wH6QDAxyM+HIM6NBAAAAAAAAAAAAAAAAA5l3On4zxbMyXCOLvhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/MyfhEbxTi+wDjAPIAQRc8ATT4RHBvcoBAb3Rwb3H4ZPhBiMjPjits1szOyUsDRjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA1NHbPDDbPPIAQRlGARb4S/hJxwXy4+jbPDUD8DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4mI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAADJaVh/jPFst/yXCOL/hEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/Lf8n4RG8U4vsA4wDyAEEbPAAg+ERwb3KAQG90cG9x+GT4TARQIIIQMgTsKbrjAiCCEEOE8pi64wIgghBEV0KEuuMCIIIQRqnX7LrjAiMhHx0DSjD4RvLgTPhCbuMAIZPU0dDe03/6QNTR0PpA0gDU0ds8MNs88gBBHkYBzPhL+EnHBfLj6CTCAPLkGiT4TLvy5CQj+kJvE9cL/8MAJPgoxwWzsPLkBts8cPsC+EwlobV/+GwC+EtVE3/Iz4WAygBzz0DOcc8LblVAyM+RnoLlfst/zlUgyM7KAMzNzcmBAID7AEkD4jD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4dI9DTAfpAMDHIz4cgznHPC2EByM+TEV0KEs7NyXCOMfhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAcc8LaQHI+ERvFc8LH87NyfhEbxTi+wDjAPIAQSA8ACD4RHBvcoBAb3Rwb3H4ZPhKA0Aw+Eby4Ez4Qm7jACGT1NHQ3tN/+kDSANTR2zww2zzyAEEiRgHw+Er4SccF8uPy2zxy+wL4TCSgtX/4bAGOMlRwEvhK+EtwyM+FgMoAc89AznHPC25VMMjPkep7eK7Oy39ZyM7Mzc3JgQCApgK1B/sAjigh+kJvE9cL/8MAIvgoxwWzsI4UIcjPhQjOgG/PQMmBAICmArUH+wDe4l8DSQP0MPhG8uBM+EJu4wDTH/hEWG91+GTTH9HbPCGOJiPQ0wH6QDAxyM+HIM6NBAAAAAAAAAAAAAAAAAsgTsKYzxbKAMlwji/4RCBvEyFvEvhJVQJvEchyz0DKAHPPQM4B+gL0AIBqz0D4RG8VzwsfygDJ+ERvFOL7AOMA8gBBJDwAmvhEcG9ygEBvdHBvcfhkIIIQMgTsKbohghBPR5+juiKCECpKxD66I4IQViVIrbokghAML/INuiWCEH7cHTe6VQWCEA8CWKq6sbGxsbGxBFAgghATMqkxuuMCIIIQFaA4+7rjAiCCEB8BMpG64wIgghAg68dtuuMCLiooJgM0MPhG8uBM+EJu4wAhk9TR0N76QNHbPOMA8gBBJzwBQvhL+EnHBfLj6Ns8cPsCyM+FCM6Ab89AyYEAgKYCtQf7AEoD4jD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4dI9DTAfpAMDHIz4cgznHPC2EByM+SfATKRs7NyXCOMfhEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAcc8LaQHI+ERvFc8LH87NyfhEbxTi+wDjAPIAQSk8ACD4RHBvcoBAb3Rwb3H4ZPhLA0ww+Eby4Ez4Qm7jACGW1NMf1NHQk9TTH+L6QNTR0PpA0ds84wDyAEErPAJ4+En4SscFII6A3/LgZNs8cPsCIPpCbxPXC//DACH4KMcFs7COFCDIz4UIzoBvz0DJgQCApgK1B/sA3l8ELEkBJjAh2zz5AMjPigBAy//J0PhJxwUtAFRwyMv/cG2AQPRD+EpxWIBA9BYBcliAQPQWyPQAyfhOyM+EgPQA9ADPgckD8DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4mI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAACTMqkxjPFssfyXCOL/hEIG8TIW8S+ElVAm8RyHLPQMoAc89AzgH6AvQAgGrPQPhEbxXPCx/LH8n4RG8U4vsA4wDyAEEvPAAg+ERwb3KAQG90cG9x+GT4TQRMIIIIhX76uuMCIIILNpGZuuMCIIIQDC/yDbrjAiCCEA8CWKq64wI7NjMxAzYw+Eby4Ez4Qm7jACGT1NHQ3vpA0ds8MNs88gBBMkYAQvhL+EnHBfLj6PhM8tQuyM+FCM6Ab89AyYEAgKYgtQf7AANGMPhG8uBM+EJu4wAhk9TR0N7Tf/pA1NHQ+kDU0ds8MNs88gBBNEYBFvhK+EnHBfLj8ts8NQGaI8IA8uQaI/hMu/LkJNs8cPsC+EwkobV/+GwC+EtVA/hKf8jPhYDKAHPPQM5xzwtuVUDIz5BkrUbGy3/OVSDIzlnIzszNzc3JgQCA+wBJA0Qw+Eby4Ez4Qm7jACGW1NMf1NHQk9TTH+L6QNHbPDDbPPIAQTdGAij4SvhJxwXy4/L4TSK6joCOgOJfAzo4AXL4SsjO+EsBzvhMAct/+E0Byx9SIMsfUhDO+E4BzCP7BCPQIIs4rbNYxwWT103Q3tdM0O0e7VPJ2zw5AATwAgEy2zxw+wIgyM+FCM6Ab89AyYEAgKYCtQf7AEkD7DD4RvLgTPhCbuMA0x/4RFhvdfhk0ds8IY4lI9DTAfpAMDHIz4cgzo0EAAAAAAAAAAAAAAAACAhX76jPFszJcI4u+EQgbxMhbxL4SVUCbxHIcs9AygBzz0DOAfoC9ACAas9A+ERvFc8LH8zJ+ERvFOL7AOMA8gBBPTwAKO1E0NP/0z8x+ENYyMv/yz/Oye1UACD4RHBvcoBAb3Rwb3H4ZPhOAAr4RvLgTAO8IdYfMfhG8uBM+EJu4wDbPHL7AiDTHzIgghBnoLlfuo49IdN/M/hMIaC1f/hs+EkB+Er4S3DIz4WAygBzz0DOcc8LblUgyM+Qn0I3ps7LfwHIzs3NyYEAgKYCtQf7AEFJQAGMjkAgghAZK1Gxuo41IdN/M/hMIaC1f/hs+Er4S3DIz4WAygBzz0DOcc8LblnIz5BwyoK2zst/zcmBAICmArUH+wDe4lvbPEYASu1E0NP/0z/TADH6QNTR0PpA03/TH9TR+G74bfhs+Gv4avhj+GICCvSkIPShREMAFHNvbCAwLjU3LjEELKAAAAAC2zxy+wKJ+GqJ+Gtw+Gxw+G1JSEhFA6aI+G6JAdAg+kD6QNN/0x/TH/pAN15A+Gr4a/hsMPhtMtQw+G4g+kJvE9cL/8MAIfgoxwWzsI4UIMjPhQjOgG/PQMmBAICmArUH+wDeMNs8+A/yAEdIRgBG+E74TfhM+Ev4SvhD+ELIy//LP8+DzlUwyM7Lf8sfzM3J7VQAAABDgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAEAEe+CdvEGim/mChtX/bPLYJSgAMghAF9eEAAAwg+GHtHtk=").unwrap();

    let cell = Boc::decode(&boc_without_crc).unwrap();

    let mut boc_with_crc = Vec::new();
    ser::BocHeader::with_root(&cell)
        .with_crc(true)
        .encode(&mut boc_with_crc);
    assert_eq!(boc_without_crc.len() + 4, boc_with_crc.len());

    let decoded = Boc::decode(&boc_with_crc).unwrap();
    assert_eq!(decoded, cell);

    let last_byte = boc_with_crc.last_mut().unwrap();
    *last_byte = !*last_byte;

    assert_eq!(Boc::decode(&boc_with_crc), Err(de::Error::InvalidChecksum));
}

#[test]
fn known_vector() {
    let from_hex = Boc::decode_hex(KNOWN_HEX).unwrap();
    let from_base64 = Boc::decode_base64(KNOWN_BASE64).unwrap();
    assert_eq!(from_hex, from_base64);
    assert_eq!(from_hex.repr_hash(), from_base64.repr_hash());

    assert_eq!(from_hex.reference_count(), 1);
    assert_eq!(from_hex.bit_len(), 299);
    assert_eq!(from_hex.parse::<u32>().unwrap(), 15);

    assert_eq!(Boc::encode_hex(&from_hex), KNOWN_HEX);
    assert_eq!(Boc::encode_base64(&from_base64), KNOWN_BASE64);

    assert_eq!(Boc::decode_str(KNOWN_HEX).unwrap(), from_hex);
    assert_eq!(Boc::decode_str(KNOWN_BASE64).unwrap(), from_hex);
}

#[test]
fn empty_cell() {
    let boc = Boc::encode(&Cell::empty_cell());
    assert_eq!(hex::encode(&boc), "b5ee9c72010101010002000000");

    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.repr_hash(), &EMPTY_CELL_HASH);
    assert_eq!(decoded.bit_len(), 0);
    assert_eq!(decoded.reference_count(), 0);
}

fn shared_tree() -> (Cell, Cell, Cell) {
    let shared = CellBuilder::build_from(0xdeadbeefu32).unwrap();

    let mut builder = CellBuilder::new();
    builder.store_u8(1).unwrap();
    builder.store_reference(shared.clone()).unwrap();
    builder.store_reference(shared.clone()).unwrap();
    let first = builder.build().unwrap();

    let mut builder = CellBuilder::new();
    builder.store_u16(2).unwrap();
    builder.store_reference(shared.clone()).unwrap();
    let second = builder.build().unwrap();

    (shared, first, second)
}

#[test]
fn shared_cells_are_stored_once() {
    let (_, first, _) = shared_tree();

    let header = ser::BocHeader::with_root(&first);
    assert_eq!(header.cell_count(), 2);

    let decoded = Boc::decode(Boc::encode(&first)).unwrap();
    assert_eq!(decoded, first);
    assert!(decoded.reference(0).unwrap().ptr_eq(decoded.reference(1).unwrap()));
}

#[test]
fn multiple_roots() {
    let (shared, first, second) = shared_tree();
    let roots = [first, second, shared];

    let mut header = ser::BocHeader::with_root(&roots[0]);
    header.add_root(&roots[1]);
    header.add_root(&roots[2]);
    assert_eq!(header.cell_count(), 3);
    assert_eq!(header.root_count(), 3);

    let boc = Boc::encode_multi(&roots, BocFlags::HAS_CRC);
    let decoded = Boc::decode_multi(&boc).unwrap();
    assert_eq!(decoded.as_slice(), roots.as_slice());

    // Single root accessor returns the first one
    assert_eq!(Boc::decode(&boc).unwrap(), roots[0]);

    assert_eq!(
        Boc::decode_ext(&boc, &de::Options::exact(2)),
        Err(de::Error::TooManyRootCells)
    );
    assert_eq!(
        Boc::decode_ext(&boc, &de::Options::exact(4)),
        Err(de::Error::TooFewRootCells)
    );

    assert!(Boc::encode_multi(&[], BocFlags::empty()).is_empty());
}

#[test]
fn boc_with_index() {
    let (_, first, _) = shared_tree();

    let boc = Boc::encode_ext(&first, BocFlags::HAS_INDEX | BocFlags::HAS_CRC);
    assert_eq!(boc[4], 0b1100_0001);

    let header = de::BocHeader::decode(&boc, &Default::default()).unwrap();
    assert_eq!(header.flags(), BocFlags::HAS_INDEX | BocFlags::HAS_CRC);
    assert_eq!(header.cells().len(), 2);

    // Offsets table holds the end of each cell
    let offset_size = boc[5] as usize;
    let index_start = 4 + 2 + 3 + offset_size + 1;
    let mut end = 0;
    for (i, cell) in header.cells().iter().enumerate() {
        end += cell.len();
        let offset = &boc[index_start + i * offset_size..index_start + (i + 1) * offset_size];
        assert_eq!(crate::util::read_be_uint(offset), end as u64);
    }

    assert_eq!(Boc::decode(&boc).unwrap(), first);
}

#[test]
fn legacy_indexed_tag() {
    let (_, first, _) = shared_tree();

    let generic = Boc::encode_ext(&first, BocFlags::HAS_INDEX);
    let ref_size = (generic[4] & BocFlags::REF_SIZE_MASK) as usize;
    let offset_size = generic[5] as usize;
    let root_list_start = 6 + ref_size * 3 + offset_size;

    // Same layout without the list of roots
    let mut indexed = BocTag::Indexed.to_bytes().to_vec();
    indexed.push(ref_size as u8);
    indexed.extend_from_slice(&generic[5..root_list_start]);
    indexed.extend_from_slice(&generic[root_list_start + ref_size..]);

    assert_eq!(Boc::decode(&indexed).unwrap(), first);
}

#[test]
fn malformed_boc() {
    assert_eq!(Boc::decode(Vec::<u8>::new()), Err(de::Error::UnexpectedEof));
    assert_eq!(
        Boc::decode(hex::decode("deadbeef0101010100020000").unwrap()),
        Err(de::Error::UnknownBocTag)
    );

    let boc = hex::decode(KNOWN_HEX).unwrap();
    assert_eq!(
        Boc::decode(&boc[..boc.len() - 1]),
        Err(de::Error::UnexpectedEof)
    );

    // Zero ref size
    assert_eq!(
        Boc::decode(hex::decode("b5ee9c72000101010002000000").unwrap()),
        Err(de::Error::InvalidRefSize)
    );

    // Truncated cell data
    assert_eq!(
        Boc::decode(hex::decode("b5ee9c72010101010003000000").unwrap()),
        Err(de::Error::UnexpectedEof)
    );
    assert_eq!(
        Boc::decode(hex::decode("b5ee9c7201010101000300000100").unwrap()),
        Err(de::Error::UnnormalizedCell)
    );

    // The second cell references the first one
    assert_eq!(
        Boc::decode(hex::decode("b5ee9c7201010201000600010001010000").unwrap()),
        Err(de::Error::InvalidRefOrder)
    );

    assert_eq!(Boc::decode_hex("zz"), Err(de::Error::InvalidHex));
    assert_eq!(Boc::decode_base64("@@@@"), Err(de::Error::InvalidBase64));
}

fn byte_cell(value: u8, refs: &[Cell]) -> Cell {
    let mut builder = CellBuilder::new();
    builder.store_u8(value).unwrap();
    for cell in refs {
        builder.store_reference(cell.clone()).unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn cells_are_numbered_in_preorder() {
    let a = byte_cell(0xaa, &[]);
    let b = byte_cell(0xbb, &[]);
    let root = byte_cell(0x01, &[a, b]);
    assert_eq!(
        Boc::encode_hex(&root),
        "b5ee9c7201010301000b0002020101020002aa0002bb"
    );

    // Shared cell goes after its last parent
    let c = byte_cell(0xcc, &[]);
    let a = byte_cell(0xaa, &[c.clone()]);
    let b = byte_cell(0xbb, &[c.clone()]);
    let root = byte_cell(0x01, &[a.clone(), b]);
    assert_eq!(
        Boc::encode_hex(&root),
        "b5ee9c720101040100100002020101020102aa030102bb030002cc"
    );

    let root = byte_cell(0x02, &[c, a]);
    assert_eq!(
        Boc::encode_hex(&root),
        "b5ee9c7201010301000c0002020202010102aa020002cc"
    );
}

#[test]
fn external_boc_is_reproduced() {
    const SHARD_ACCOUNT: &str = "b5ee9c720101030100a900026dc00f5f09760a78c84bab1153c4876ebde53f17942190f54b21c2d132a1d416259da20680ec433fbf6d600000cb7102293d0cd6ae72d34001020842028f452d7a4dfd74066b682365177259ed05734435be76b5fd4bd5d8af2b7c3d6800910505d1bf1f408006c0b20d2e4980a9656da6117470d08956a955da832f6167ccad80c1f9782e451002c44ea652d4092859c67da44e4ca3add6565b0e2897d640a2c51bfb370d8877fa";

    let cell = Boc::decode_hex(SHARD_ACCOUNT).unwrap();
    assert_eq!(cell.reference_count(), 2);
    assert_eq!(Boc::encode_hex(&cell), SHARD_ACCOUNT);
}

#[test]
fn repr_round_trip() {
    let boc = BocRepr::encode(&(123u32, true, HashBytes([0x11; 32]))).unwrap();
    let (a, b, c) = BocRepr::decode::<(u32, bool, HashBytes), _>(&boc).unwrap();
    assert_eq!(a, 123);
    assert!(b);
    assert_eq!(c, HashBytes([0x11; 32]));

    assert!(matches!(
        BocRepr::decode::<(u32, bool, HashBytes, u8), _>(&boc),
        Err(BocReprError::InvalidData(_))
    ));
}

#[cfg(feature = "serde")]
#[derive(::serde::Serialize, ::serde::Deserialize)]
struct SerdeWithCell {
    #[serde(with = "Boc")]
    some_cell: Cell,
}

#[cfg(feature = "serde")]
#[derive(::serde::Serialize, ::serde::Deserialize)]
struct SerdeWithRepr {
    #[serde(with = "BocRepr")]
    pair: (u32, u16),
}

#[cfg(feature = "serde")]
#[test]
fn struct_with_cell() {
    let boc = "te6ccgEBAQEAWwAAsUgBUkKKaORs1v/d2CpkdS1rueLjL5EbgaivG/SlIBcUZ5cAKkhRTRyNmt/7uwVMjqWtdzxcZfIjcDUV436UpALijPLQ7msoAAYUWGAAAD6o4PtmhMeK8nJA";

    let test = format!(r#"{{"some_cell":"{boc}"}}"#);
    let SerdeWithCell { some_cell } = serde_json::from_str(&test).unwrap();

    let original = Boc::decode_base64(boc).unwrap();
    assert_eq!(some_cell, original);

    let serialized = serde_json::to_string(&SerdeWithCell { some_cell }).unwrap();
    assert_eq!(serialized, test);

    // Plain cells are serialized the same way
    assert_eq!(
        serde_json::to_string(&original).unwrap(),
        format!(r#""{boc}""#)
    );
}

#[cfg(feature = "serde")]
#[test]
fn struct_with_repr() {
    let value = SerdeWithRepr { pair: (10, 20) };
    let serialized = serde_json::to_string(&value).unwrap();

    let SerdeWithRepr { pair } = serde_json::from_str(&serialized).unwrap();
    assert_eq!(pair, (10, 20));

    let err = serde_json::from_str::<SerdeWithRepr>(r#"{"pair":"not a boc"}"#);
    assert!(err.is_err());
}
