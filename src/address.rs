//! Message addresses.

use std::str::FromStr;

use crate::cell::{CellBuilder, CellSlice, DisplayBits, HashBytes, Load, Store};
use crate::error::{Error, ParseAddrError};
use crate::num::{SplitDepth, Uint9};
use crate::util::unlikely;

/// Any address that can be stored in a message.
///
/// ```text
/// addr_none$00 = MsgAddressExt;
/// addr_extern$01 len:(## 9) external_address:(bits len) = MsgAddressExt;
/// addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256 = MsgAddressInt;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum AnyAddr {
    /// Empty address.
    #[default]
    None,
    /// External address.
    Ext(ExtAddr),
    /// Standard internal address.
    Std(StdAddr),
}

impl AnyAddr {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        match self {
            Self::None => 2,
            Self::Ext(addr) => 2 + addr.bit_len(),
            Self::Std(addr) => addr.bit_len(),
        }
    }

    /// Returns `true` if this is `addr_none`.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the standard address if this is one.
    pub const fn as_std(&self) -> Option<&StdAddr> {
        match self {
            Self::Std(addr) => Some(addr),
            _ => None,
        }
    }

    /// Returns the external address if this is one.
    pub const fn as_ext(&self) -> Option<&ExtAddr> {
        match self {
            Self::Ext(addr) => Some(addr),
            _ => None,
        }
    }
}

impl From<StdAddr> for AnyAddr {
    #[inline]
    fn from(value: StdAddr) -> Self {
        Self::Std(value)
    }
}

impl From<ExtAddr> for AnyAddr {
    #[inline]
    fn from(value: ExtAddr) -> Self {
        Self::Ext(value)
    }
}

impl From<Option<StdAddr>> for AnyAddr {
    #[inline]
    fn from(value: Option<StdAddr>) -> Self {
        match value {
            Some(addr) => Self::Std(addr),
            None => Self::None,
        }
    }
}

impl std::fmt::Display for AnyAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("addr_none"),
            Self::Ext(addr) => std::fmt::Display::fmt(addr, f),
            Self::Std(addr) => std::fmt::Display::fmt(addr, f),
        }
    }
}

impl Store for AnyAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::None => builder.store_small_uint(0b00, 2),
            Self::Ext(addr) => {
                if unlikely(!builder.has_capacity(self.bit_len(), 0)) {
                    return Err(Error::CellOverflow);
                }
                ok!(builder.store_small_uint(0b01, 2));
                addr.store_into(builder)
            }
            Self::Std(addr) => addr.store_into(builder),
        }
    }
}

impl<'a> Load<'a> for AnyAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match ok!(slice.get_small_uint(0, 2)) {
            0b00 => {
                slice.skip_first(2, 0)?;
                Ok(Self::None)
            }
            0b01 => {
                slice.skip_first(2, 0)?;
                ExtAddr::load_from(slice).map(Self::Ext)
            }
            0b10 => StdAddr::load_from(slice).map(Self::Std),
            _ => Err(Error::UnsupportedAddress),
        }
    }
}

impl CellBuilder {
    /// Tries to store an address (`MsgAddress`).
    pub fn store_address(&mut self, address: &AnyAddr) -> Result<(), Error> {
        address.store_into(self)
    }
}

impl<'a> CellSlice<'a> {
    /// Loads an address (`MsgAddress`).
    ///
    /// Variable-length internal addresses are not supported.
    pub fn load_address(&mut self) -> Result<AnyAddr, Error> {
        AnyAddr::load_from(self)
    }
}

/// Standard internal address.
#[derive(Default, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StdAddr {
    /// Optional anycast info.
    pub anycast: Option<Box<Anycast>>,
    /// Workchain id (one-byte range).
    pub workchain: i8,
    /// Account id.
    pub address: HashBytes,
}

impl std::fmt::Debug for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdAddr")
            .field("anycast", &self.anycast)
            .field("workchain", &self.workchain)
            .field("address", &self.address)
            .finish()
    }
}

impl StdAddr {
    /// The number of data bits that address without anycast occupies.
    ///
    /// - 2 bits id (`0b10`)
    /// - 1 bit Maybe None
    /// - 8 bits workchain
    /// - 256 bits address
    pub const BITS_WITHOUT_ANYCAST: u16 = 2 + 1 + 8 + 256;

    /// The maximum number of bits that address with anycast occupies.
    pub const BITS_MAX: u16 = Self::BITS_WITHOUT_ANYCAST + Anycast::BITS_MAX;

    /// Tag byte of a bounceable user-friendly address.
    pub const BOUNCEABLE_TAG: u8 = 0x11;
    /// Tag byte of a non-bounceable user-friendly address.
    pub const NON_BOUNCEABLE_TAG: u8 = 0x51;
    /// Flag of a user-friendly address that is only valid in testnet.
    pub const TESTNET_FLAG: u8 = 0x80;

    /// Constructs a new standard address without anycast info.
    #[inline]
    pub const fn new(workchain: i8, address: HashBytes) -> Self {
        Self {
            anycast: None,
            workchain,
            address,
        }
    }

    /// Returns `true` if this address is for a masterchain block.
    #[inline]
    pub const fn is_masterchain(&self) -> bool {
        self.workchain == -1
    }

    /// Returns the number of data bits that the stored address occupies.
    ///
    /// Anycast info is only read, addresses are always stored without it.
    pub const fn bit_len(&self) -> u16 {
        Self::BITS_WITHOUT_ANYCAST
    }

    /// Parses an address from either a raw or a user-friendly form.
    ///
    /// Returns the parsed address and flags of the user-friendly form
    /// (default flags for the raw form).
    pub fn from_str_ext(
        s: &str,
        format: StdAddrFormat,
    ) -> Result<(Self, Base64StdAddrFlags), ParseAddrError> {
        match s.len() {
            0 => Err(ParseAddrError::Empty),
            48 => {
                #[cfg(feature = "base64")]
                if format.allow_base64 || format.allow_base64_url {
                    return Self::from_base64(s, format);
                }
                Err(ParseAddrError::BadFormat)
            }
            _ if format.allow_raw => match Self::from_raw_str(s) {
                Ok(addr) => Ok((addr, Base64StdAddrFlags::default())),
                Err(e) => Err(e),
            },
            _ => Err(ParseAddrError::BadFormat),
        }
    }

    fn from_raw_str(s: &str) -> Result<Self, ParseAddrError> {
        let mut result = Self::default();

        let mut parts = s.split(':');
        match parts.next() {
            Some(part) => match part.parse() {
                Ok(workchain) => result.workchain = workchain,
                Err(_) => return Err(ParseAddrError::InvalidWorkchain),
            },
            None => return Err(ParseAddrError::Empty),
        }

        match parts.next() {
            Some(part) => match hex::decode_to_slice(part, &mut result.address.0) {
                Ok(()) => {}
                Err(_) => return Err(ParseAddrError::InvalidAccountId),
            },
            None => return Err(ParseAddrError::InvalidAccountId),
        }

        if parts.next().is_none() {
            Ok(result)
        } else {
            Err(ParseAddrError::UnexpectedPart)
        }
    }

    #[cfg(feature = "base64")]
    fn from_base64(
        s: &str,
        format: StdAddrFormat,
    ) -> Result<(Self, Base64StdAddrFlags), ParseAddrError> {
        let mut buffer = [0u8; 36];

        let base64_url = s.contains(['-', '_']);
        let decoded = if base64_url {
            format.allow_base64_url && crate::util::decode_base64_url_slice(s, &mut buffer).is_ok()
        } else {
            format.allow_base64 && crate::util::decode_base64_slice(s, &mut buffer).is_ok()
        };
        if !decoded {
            return Err(ParseAddrError::BadFormat);
        }

        let crc = crate::util::crc_16(&buffer[..34]);
        if crc.to_be_bytes() != buffer[34..] {
            return Err(ParseAddrError::InvalidChecksum);
        }

        let tag = buffer[0];
        let bounceable = match tag & !Self::TESTNET_FLAG {
            Self::BOUNCEABLE_TAG => true,
            Self::NON_BOUNCEABLE_TAG => false,
            _ => return Err(ParseAddrError::BadFormat),
        };

        let addr = Self::new(buffer[1] as i8, HashBytes::from_slice(&buffer[2..34]));
        let flags = Base64StdAddrFlags {
            testnet: tag & Self::TESTNET_FLAG != 0,
            base64_url,
            bounceable,
        };
        Ok((addr, flags))
    }

    /// Returns a user-friendly representation of this address.
    #[cfg(feature = "base64")]
    pub const fn display_base64(&self, flags: Base64StdAddrFlags) -> DisplayBase64StdAddr<'_> {
        DisplayBase64StdAddr { addr: self, flags }
    }

    /// Returns a bounceable url-safe representation of this address.
    #[cfg(feature = "base64")]
    pub const fn display_base64_url(&self, bounceable: bool) -> DisplayBase64StdAddr<'_> {
        self.display_base64(Base64StdAddrFlags {
            testnet: false,
            base64_url: true,
            bounceable,
        })
    }
}

impl std::fmt::Display for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(anycast) = &self.anycast {
            ok!(f.write_fmt(format_args!("{anycast}:")))
        }

        f.write_fmt(format_args!("{}:{}", self.workchain, self.address))
    }
}

impl FromStr for StdAddr {
    type Err = ParseAddrError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_str_ext(s, StdAddrFormat::any()) {
            Ok((addr, _)) => Ok(addr),
            Err(e) => Err(e),
        }
    }
}

impl Store for StdAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if unlikely(!builder.has_capacity(self.bit_len(), 0)) {
            return Err(Error::CellOverflow);
        }
        // addr_std$10 without anycast
        ok!(builder.store_small_uint(0b100, 3));
        ok!(builder.store_u8(self.workchain as u8));
        builder.store_u256(&self.address)
    }
}

impl<'a> Load<'a> for StdAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match ok!(slice.load_small_uint(2)) {
            0b10 => {}
            0b11 => return Err(Error::UnsupportedAddress),
            _ => return Err(Error::InvalidTag),
        }

        Ok(Self {
            anycast: ok!(Option::<Box<Anycast>>::load_from(slice)),
            workchain: ok!(slice.load_u8()) as i8,
            address: ok!(slice.load_u256()),
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StdAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.workchain, &self.address).serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StdAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{Error, Visitor};

        struct StdAddrVisitor;

        impl Visitor<'_> for StdAddrVisitor {
            type Value = StdAddr;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a standard address")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                StdAddr::from_str(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(StdAddrVisitor)
        } else {
            <(i8, HashBytes)>::deserialize(deserializer)
                .map(|(workchain, address)| Self::new(workchain, address))
        }
    }
}

/// Accepted forms of a textual standard address.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StdAddrFormat {
    /// Allow `workchain:hex` form.
    pub allow_raw: bool,
    /// Allow user-friendly form with the standard base64 alphabet.
    pub allow_base64: bool,
    /// Allow user-friendly form with the url-safe base64 alphabet.
    pub allow_base64_url: bool,
}

impl StdAddrFormat {
    /// Allows any form.
    pub const fn any() -> Self {
        Self {
            allow_raw: true,
            allow_base64: true,
            allow_base64_url: true,
        }
    }
}

impl Default for StdAddrFormat {
    #[inline]
    fn default() -> Self {
        Self::any()
    }
}

/// Flags of a user-friendly address.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Base64StdAddrFlags {
    /// Address is only valid in testnet.
    pub testnet: bool,
    /// Address uses the url-safe base64 alphabet.
    pub base64_url: bool,
    /// Messages to this address must bounce on error.
    pub bounceable: bool,
}

/// Helper to display a user-friendly form of an address.
#[cfg(feature = "base64")]
#[derive(Clone, Copy)]
pub struct DisplayBase64StdAddr<'a> {
    /// Address to display.
    pub addr: &'a StdAddr,
    /// Encoding flags.
    pub flags: Base64StdAddrFlags,
}

#[cfg(feature = "base64")]
impl std::fmt::Display for DisplayBase64StdAddr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buffer = [0u8; 36];
        buffer[0] = match (self.flags.bounceable, self.flags.testnet) {
            (true, false) => StdAddr::BOUNCEABLE_TAG,
            (false, false) => StdAddr::NON_BOUNCEABLE_TAG,
            (true, true) => StdAddr::BOUNCEABLE_TAG | StdAddr::TESTNET_FLAG,
            (false, true) => StdAddr::NON_BOUNCEABLE_TAG | StdAddr::TESTNET_FLAG,
        };
        buffer[1] = self.addr.workchain as u8;
        buffer[2..34].copy_from_slice(self.addr.address.as_slice());

        let crc = crate::util::crc_16(&buffer[..34]);
        buffer[34..].copy_from_slice(&crc.to_be_bytes());

        let output = if self.flags.base64_url {
            crate::util::encode_base64_url(buffer)
        } else {
            crate::util::encode_base64(buffer)
        };
        f.write_str(&output)
    }
}

/// External address.
///
/// ```text
/// addr_extern$01 len:(## 9) external_address:(bits len) = MsgAddressExt;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ExtAddr {
    /// Number of bits stored in data.
    pub data_bit_len: Uint9,
    /// External address data.
    pub data: Vec<u8>,
}

impl ExtAddr {
    /// Creates an external address, `None` if the data is longer than 511 bits.
    pub fn new<T>(data_bit_len: u16, data: T) -> Option<Self>
    where
        T: Into<Vec<u8>>,
    {
        let data_bit_len = Uint9::new(data_bit_len);
        let data = data.into();
        if data_bit_len.is_valid() && data.len() * 8 >= data_bit_len.into_inner() as usize {
            Some(Self { data_bit_len, data })
        } else {
            None
        }
    }

    /// Returns the number of data bits that this struct occupies (without the tag).
    pub const fn bit_len(&self) -> u16 {
        Uint9::BITS + self.data_bit_len.into_inner()
    }
}

impl std::fmt::Display for ExtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = DisplayBits {
            bytes: &self.data,
            bit_len: self.data_bit_len.into_inner(),
        };
        write!(f, ":{bits}")
    }
}

impl Store for ExtAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if unlikely(!builder.has_capacity(self.bit_len(), 0)) {
            return Err(Error::CellOverflow);
        }
        ok!(self.data_bit_len.store_into(builder));
        builder.store_raw(&self.data, self.data_bit_len.into_inner())
    }
}

impl<'a> Load<'a> for ExtAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let data_bit_len = ok!(Uint9::load_from(slice));
        let bits = data_bit_len.into_inner();

        let mut data = vec![0; (bits as usize + 7) / 8];
        ok!(slice.load_raw(&mut data, bits));
        Ok(Self { data_bit_len, data })
    }
}

/// Anycast prefix info.
///
/// ```text
/// anycast_info$_ depth:(#<= 30) { depth >= 1 } rewrite_pfx:(bits depth) = Anycast;
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Anycast {
    /// Prefix length in bits.
    pub depth: SplitDepth,
    /// Rewrite prefix data.
    pub rewrite_prefix: Vec<u8>,
}

impl Anycast {
    /// The maximum number of bits that an Anycast occupies.
    pub const BITS_MAX: u16 = SplitDepth::BITS + SplitDepth::MAX.into_bit_len();

    /// Constructs anycast info from rewrite prefix.
    pub fn from_slice(rewrite_prefix: &CellSlice<'_>) -> Result<Self, Error> {
        let depth = ok!(SplitDepth::from_bit_len(rewrite_prefix.remaining_bits()));
        let mut data = vec![0; (depth.into_bit_len() as usize + 7) / 8];
        ok!(rewrite_prefix.get_raw(0, &mut data, depth.into_bit_len()));

        Ok(Self {
            depth,
            rewrite_prefix: data,
        })
    }

    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        SplitDepth::BITS + self.depth.into_bit_len()
    }
}

impl std::fmt::Display for Anycast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = DisplayBits {
            bytes: &self.rewrite_prefix,
            bit_len: self.depth.into_bit_len(),
        };
        std::fmt::Display::fmt(&bits, f)
    }
}

impl Store for Anycast {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if unlikely(!builder.has_capacity(self.bit_len(), 0)) {
            return Err(Error::CellOverflow);
        }
        ok!(self.depth.store_into(builder));
        builder.store_raw(&self.rewrite_prefix, self.depth.into_bit_len())
    }
}

impl<'a> Load<'a> for Anycast {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let depth = ok!(SplitDepth::load_from(slice));

        let mut rewrite_prefix = vec![0; (depth.into_bit_len() as usize + 7) / 8];
        ok!(slice.load_raw(&mut rewrite_prefix, depth.into_bit_len()));

        Ok(Self {
            depth,
            rewrite_prefix,
        })
    }
}
