//! Common error types.

/// Error type for cell related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// There were not enough bits or refs in the cell slice.
    #[error("cell underflow")]
    CellUnderflow,
    /// There were not enough bits or refs capacity in the cell builder.
    #[error("cell overflow")]
    CellOverflow,
    /// Value does not fit into the requested number of bits.
    #[error("integer does not fit into the specified number of bits")]
    IntOverflow,
    /// Something tried to load a pruned branch cell.
    #[error("pruned branch access")]
    PrunedBranchAccess,
    /// Only ordinary cells can be converted into a builder.
    #[error("unexpected exotic cell")]
    UnexpectedExoticCell,
    /// Cell contains invalid descriptor or data.
    #[error("invalid cell")]
    InvalidCell,
    /// Data does not satisfy some constraints.
    #[error("invalid data")]
    InvalidData,
    /// Unknown TLB tag.
    #[error("invalid tag")]
    InvalidTag,
    /// Anycast depth is out of the `1..=30` range.
    #[error("invalid anycast depth")]
    InvalidAnycast,
    /// Variable-length internal addresses are not supported.
    #[error("unsupported address variant")]
    UnsupportedAddress,
    /// Dictionary label is longer than the remaining key.
    #[error("invalid dictionary label")]
    InvalidLabel,
    /// Tree of cells is too deep.
    #[error("cell depth overflow")]
    DepthOverflow,
}

/// Error type for hash bytes parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseHashBytesError {
    /// Failed to parse base64 encoded bytes.
    #[cfg(feature = "base64")]
    #[error("invalid base64 string")]
    InvalidBase64(#[from] base64::DecodeSliceError),
    /// Failed to parse hex encoded bytes.
    #[error("invalid hex string")]
    InvalidHex(#[from] hex::FromHexError),
    /// Error for an unexpected string length.
    #[error("expected string of 44 or 64 bytes")]
    UnexpectedStringLength,
}

/// Error type for address parsing related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ParseAddrError {
    /// Tried to parse an empty string.
    #[error("cannot parse address from an empty string")]
    Empty,
    /// Workchain id is too large.
    #[error("workchain id is too large to fit in target type")]
    InvalidWorkchain,
    /// Invalid account id hex.
    #[error("cannot parse account id")]
    InvalidAccountId,
    /// Too many address parts.
    #[error("unexpected address part")]
    UnexpectedPart,
    /// Unexpected or invalid address format.
    #[error("invalid address format")]
    BadFormat,
    /// CRC16 of a user-friendly address does not match.
    #[error("invalid address checksum")]
    InvalidChecksum,
}

/// Error type for integer parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseIntError {
    /// Error while parsing underlying type.
    #[error("cannot parse underlying integer")]
    InvalidString(#[source] std::num::ParseIntError),
    /// Underlying integer type does not fit into the target type.
    #[error("underlying integer is too large to fit in target type")]
    Overflow,
}
