//!
//! Kaspa `Address` value type.
//!
//! The canonical checksummed text encoding is handled by the node tooling.
//! Addresses here render as `<prefix>:<hex(version || payload)>`, which is
//! lossless and sufficient for routing and script derivation.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid prefix {0}")]
    InvalidPrefix(String),

    #[error("Prefix is missing")]
    MissingPrefix,

    #[error("Invalid version {0}")]
    InvalidVersion(u8),

    #[error("Invalid payload length {0} for version {1}")]
    InvalidPayloadLength(usize, Version),

    #[error("Invalid address payload encoding: {0}")]
    DecodingError(String),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Prefix {
    #[serde(rename = "kaspa")]
    Mainnet,
    #[serde(rename = "kaspatest")]
    Testnet,
    #[serde(rename = "kaspasim")]
    Simnet,
    #[serde(rename = "kaspadev")]
    Devnet,
}

impl Prefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::Mainnet => "kaspa",
            Prefix::Testnet => "kaspatest",
            Prefix::Simnet => "kaspasim",
            Prefix::Devnet => "kaspadev",
        }
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Prefix {
    type Error = AddressError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        match prefix {
            "kaspa" => Ok(Prefix::Mainnet),
            "kaspatest" => Ok(Prefix::Testnet),
            "kaspasim" => Ok(Prefix::Simnet),
            "kaspadev" => Ok(Prefix::Devnet),
            _ => Err(AddressError::InvalidPrefix(prefix.to_string())),
        }
    }
}

///
///  Kaspa `Address` version (`PubKey`, `PubKey ECDSA`, `ScriptHash`)
///
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum Version {
    /// PubKey addresses always have the version byte set to 0
    PubKey = 0,
    /// PubKey ECDSA addresses always have the version byte set to 1
    PubKeyECDSA = 1,
    /// ScriptHash addresses always have the version byte set to 8
    ScriptHash = 8,
}

impl Version {
    pub fn public_key_len(&self) -> usize {
        match self {
            Version::PubKey => 32,
            Version::PubKeyECDSA => 33,
            Version::ScriptHash => 32,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Version::PubKey => "PubKey",
            Version::PubKeyECDSA => "PubKeyECDSA",
            Version::ScriptHash => "ScriptHash",
        };
        f.write_str(s)
    }
}

impl TryFrom<u8> for Version {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::PubKey),
            1 => Ok(Version::PubKeyECDSA),
            8 => Ok(Version::ScriptHash),
            _ => Err(AddressError::InvalidVersion(value)),
        }
    }
}

/// Size of the payload vector of an address.
///
/// Smallest SmallVec backing store that fits the largest payload (33 bytes for [`Version::PubKeyECDSA`]).
pub const PAYLOAD_VECTOR_SIZE: usize = 36;

pub type PayloadVec = SmallVec<[u8; PAYLOAD_VECTOR_SIZE]>;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug, Hash)]
pub struct Address {
    pub prefix: Prefix,
    pub version: Version,
    pub payload: PayloadVec,
}

impl Address {
    /// Creates a new address. The payload length is checked against the version
    /// by [`Address::try_new`]; this constructor trusts the caller.
    pub fn new(prefix: Prefix, version: Version, payload: &[u8]) -> Self {
        Self { prefix, version, payload: PayloadVec::from_slice(payload) }
    }

    pub fn try_new(prefix: Prefix, version: Version, payload: &[u8]) -> Result<Self, AddressError> {
        if payload.len() != version.public_key_len() {
            return Err(AddressError::InvalidPayloadLength(payload.len(), version));
        }
        Ok(Self::new(prefix, version, payload))
    }

    pub fn encode_payload(&self) -> String {
        let mut bytes = Vec::with_capacity(self.payload.len() + 1);
        bytes.push(self.version as u8);
        bytes.extend_from_slice(&self.payload);
        hex::encode(bytes)
    }

    pub fn decode_payload(prefix: Prefix, payload: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(payload).map_err(|err| AddressError::DecodingError(err.to_string()))?;
        let (version, payload) = bytes.split_first().ok_or_else(|| AddressError::DecodingError("empty payload".to_string()))?;
        Self::try_new(prefix, Version::try_from(*version)?, payload)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.prefix, self.encode_payload())
    }
}

impl From<&Address> for String {
    fn from(address: &Address) -> Self {
        address.to_string()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some((prefix, payload)) => Self::decode_payload(prefix.try_into()?, payload),
            None => Err(AddressError::MissingPrefix),
        }
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

//
// Borsh serializers need to be manually implemented for `Address` since
// smallvec does not currently support Borsh
//

impl BorshSerialize for Address {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.prefix, writer)?;
        BorshSerialize::serialize(&self.version, writer)?;
        BorshSerialize::serialize(&self.payload.as_slice(), writer)?;
        Ok(())
    }
}

impl BorshDeserialize for Address {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let prefix: Prefix = BorshDeserialize::deserialize_reader(reader)?;
        let version: Version = BorshDeserialize::deserialize_reader(reader)?;
        let payload: Vec<u8> = BorshDeserialize::deserialize_reader(reader)?;
        Ok(Self::new(prefix, version, &payload))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Address::try_from(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn test_address_text_form() {
        let address = Address::new(Prefix::Testnet, Version::PubKey, &[0xab; 32]);
        let text = address.to_string();
        assert!(text.starts_with("kaspatest:00abab"));
        assert_eq!(Address::try_from(text.as_str()).unwrap(), address);

        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);

        let bytes = borsh::to_vec(&address).unwrap();
        assert_eq!(Address::try_from_slice(&bytes).unwrap(), address);
    }

    #[test]
    fn test_errors() {
        assert_eq!(Address::try_from("kaspa00"), Err(AddressError::MissingPrefix));
        assert_eq!(Address::try_from("kaspa1:00"), Err(AddressError::InvalidPrefix("kaspa1".into())));
        assert_eq!(Address::try_from("kaspa:07aa"), Err(AddressError::InvalidVersion(7)));
        assert_eq!(Address::try_from("kaspa:00aa"), Err(AddressError::InvalidPayloadLength(1, Version::PubKey)));
        assert!(matches!(Address::try_from("kaspa:zz"), Err(AddressError::DecodingError(_))));
    }
}
