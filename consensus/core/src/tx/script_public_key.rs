use borsh::{BorshDeserialize, BorshSerialize};
use kaspa_addresses::{Address, Version};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt::Formatter;
use std::str::FromStr;

/// Size of the underlying script vector of a script.
pub const SCRIPT_VECTOR_SIZE: usize = 36;

/// Used as the underlying type for script public key data, optimized for the common p2pk script size (34).
pub type ScriptVec = SmallVec<[u8; SCRIPT_VECTOR_SIZE]>;

/// Represents the ScriptPublicKey Version
pub type ScriptPublicKeyVersion = u16;

/// Alias the `smallvec!` macro to ease maintenance
pub use smallvec::smallvec as scriptvec;

/// Represents a Kaspad ScriptPublicKey
#[derive(Default, PartialEq, Eq, Clone, Hash)]
pub struct ScriptPublicKey {
    pub version: ScriptPublicKeyVersion,
    script: ScriptVec, // Kept private to preserve read-only semantics
}

impl std::fmt::Debug for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptPublicKey").field("version", &self.version).field("script", &hex::encode(&self.script)).finish()
    }
}

impl ScriptPublicKey {
    pub fn new(version: ScriptPublicKeyVersion, script: ScriptVec) -> Self {
        Self { version, script }
    }

    pub fn from_vec(version: ScriptPublicKeyVersion, script: Vec<u8>) -> Self {
        Self { version, script: ScriptVec::from_vec(script) }
    }

    pub fn version(&self) -> ScriptPublicKeyVersion {
        self.version
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// Hex of the big-endian version followed by the script bytes.
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(self.script.len() + 2);
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.script);
        hex::encode(bytes)
    }
}

impl FromStr for ScriptPublicKey {
    type Err = hex::FromHexError;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() < 2 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        Ok(Self::from_vec(version, bytes[2..].to_vec()))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(rename = "ScriptPublicKey")]
struct ScriptPublicKeyInternal {
    version: ScriptPublicKeyVersion,
    #[serde(with = "hex::serde")]
    script: Vec<u8>,
}

impl Serialize for ScriptPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            ScriptPublicKeyInternal { version: self.version, script: self.script.to_vec() }.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ScriptPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = <String as Deserialize>::deserialize(deserializer)?;
            ScriptPublicKey::from_str(&s).map_err(serde::de::Error::custom)
        } else {
            let internal = ScriptPublicKeyInternal::deserialize(deserializer)?;
            Ok(ScriptPublicKey::from_vec(internal.version, internal.script))
        }
    }
}

impl BorshSerialize for ScriptPublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.version, writer)?;
        // Vectors and slices are all serialized internally the same way
        BorshSerialize::serialize(&self.script.as_slice(), writer)?;
        Ok(())
    }
}

impl BorshDeserialize for ScriptPublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let version: ScriptPublicKeyVersion = BorshDeserialize::deserialize_reader(reader)?;
        let script: Vec<u8> = BorshDeserialize::deserialize_reader(reader)?;
        Ok(Self::from_vec(version, script))
    }
}

mod opcodes {
    pub const OP_DATA_32: u8 = 0x20;
    pub const OP_DATA_33: u8 = 0x21;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_BLAKE2B: u8 = 0xaa;
    pub const OP_CHECK_SIG_ECDSA: u8 = 0xab;
    pub const OP_CHECK_SIG: u8 = 0xac;
}

/// Creates a new script to pay a transaction output to the specified address.
pub fn pay_to_address_script(address: &Address) -> ScriptPublicKey {
    use opcodes::*;
    let payload = address.payload.as_slice();
    let script: ScriptVec = match address.version {
        Version::PubKey => {
            let mut script = ScriptVec::with_capacity(payload.len() + 2);
            script.push(OP_DATA_32);
            script.extend_from_slice(payload);
            script.push(OP_CHECK_SIG);
            script
        }
        Version::PubKeyECDSA => {
            let mut script = ScriptVec::with_capacity(payload.len() + 2);
            script.push(OP_DATA_33);
            script.extend_from_slice(payload);
            script.push(OP_CHECK_SIG_ECDSA);
            script
        }
        Version::ScriptHash => {
            let mut script = ScriptVec::with_capacity(payload.len() + 3);
            script.push(OP_BLAKE2B);
            script.push(OP_DATA_32);
            script.extend_from_slice(payload);
            script.push(OP_EQUAL);
            script
        }
    };
    ScriptPublicKey::new(0, script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspa_addresses::Prefix;

    #[test]
    fn test_spk_serde_json() {
        let spk = ScriptPublicKey::from_vec(0xc0de, vec![0x20, 0x01, 0x02, 0xac]);
        let json = serde_json::to_string(&spk).unwrap();
        assert_eq!(json, "\"c0de200102ac\"");
        assert_eq!(serde_json::from_str::<ScriptPublicKey>(&json).unwrap(), spk);
    }

    #[test]
    fn test_pay_to_address_script() {
        let address = Address::new(Prefix::Testnet, Version::PubKey, &[7u8; 32]);
        let spk = pay_to_address_script(&address);
        assert_eq!(spk.version(), 0);
        assert_eq!(spk.script().len(), 34);
        assert_eq!(spk.script()[0], 0x20);
        assert_eq!(spk.script()[33], 0xac);

        let address = Address::new(Prefix::Testnet, Version::ScriptHash, &[7u8; 32]);
        assert_eq!(pay_to_address_script(&address).script().len(), 35);
    }
}
