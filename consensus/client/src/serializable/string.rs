//! Serializable transaction with 64-bit fields encoded as decimal strings.

use crate::imports::*;
use crate::result::Result;
use kaspa_consensus_core::subnets::SubnetworkId;
use kaspa_consensus_core::tx::TransactionInput;

/// Format version of [`SerializableTransaction`].
pub const SERIALIZABLE_TRANSACTION_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SerializableUtxoEntry {
    pub amount: String,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: String,
    pub is_coinbase: bool,
}

impl From<&cctx::UtxoEntry> for SerializableUtxoEntry {
    fn from(utxo: &cctx::UtxoEntry) -> Self {
        Self {
            amount: utxo.amount.to_string(),
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score.to_string(),
            is_coinbase: utxo.is_coinbase,
        }
    }
}

impl TryFrom<&SerializableUtxoEntry> for cctx::UtxoEntry {
    type Error = Error;
    fn try_from(utxo: &SerializableUtxoEntry) -> Result<Self> {
        Ok(Self {
            amount: utxo.amount.parse()?,
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score.parse()?,
            is_coinbase: utxo.is_coinbase,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransactionInput {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
    pub sequence: String,
    pub sig_op_count: u8,
    #[serde(with = "hex::serde")]
    pub signature_script: Vec<u8>,
    pub utxo: SerializableUtxoEntry,
}

impl SerializableTransactionInput {
    pub fn new(input: &TransactionInput, utxo: &cctx::UtxoEntry) -> Self {
        Self {
            transaction_id: input.previous_outpoint.transaction_id,
            index: input.previous_outpoint.index,
            signature_script: input.signature_script.clone(),
            sequence: input.sequence.to_string(),
            sig_op_count: input.sig_op_count,
            utxo: utxo.into(),
        }
    }
}

impl TryFrom<SerializableTransactionInput> for TransactionInput {
    type Error = Error;
    fn try_from(input: SerializableTransactionInput) -> Result<Self> {
        Ok(Self {
            previous_outpoint: cctx::TransactionOutpoint::new(input.transaction_id, input.index),
            signature_script: input.signature_script,
            sequence: input.sequence.parse()?,
            sig_op_count: input.sig_op_count,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransactionOutput {
    pub value: String,
    pub script_public_key: ScriptPublicKey,
}

impl From<&cctx::TransactionOutput> for SerializableTransactionOutput {
    fn from(output: &cctx::TransactionOutput) -> Self {
        Self { value: output.value.to_string(), script_public_key: output.script_public_key.clone() }
    }
}

impl TryFrom<SerializableTransactionOutput> for cctx::TransactionOutput {
    type Error = Error;
    fn try_from(output: SerializableTransactionOutput) -> Result<Self> {
        Ok(Self { value: output.value.parse()?, script_public_key: output.script_public_key })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransaction {
    pub version: u32,
    pub inputs: Vec<SerializableTransactionInput>,
    pub outputs: Vec<SerializableTransactionOutput>,
    pub tx_id: TransactionId,
    pub tx_version: u16,
    pub subnetwork_id: SubnetworkId,
    pub lock_time: String,
    pub gas: String,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
}

impl SerializableTransaction {
    pub fn serialize_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize_from_json(json: &str) -> Result<Self> {
        let tx: Self = serde_json::from_str(json)?;
        if tx.version != SERIALIZABLE_TRANSACTION_VERSION {
            return Err(Error::custom(format!("unsupported serializable transaction version {}", tx.version)));
        }
        Ok(tx)
    }

    pub fn from_signable_transaction(tx: &cctx::SignableTransaction) -> Result<Self> {
        let inputs = tx.populated_inputs().map(|(input, utxo)| SerializableTransactionInput::new(input, utxo)).collect();
        let transaction = tx.as_ref();

        Ok(Self {
            version: SERIALIZABLE_TRANSACTION_VERSION,
            inputs,
            outputs: transaction.outputs.iter().map(Into::into).collect(),
            tx_version: transaction.version,
            lock_time: transaction.lock_time.to_string(),
            subnetwork_id: transaction.subnetwork_id.clone(),
            gas: transaction.gas.to_string(),
            payload: transaction.payload.clone(),
            tx_id: transaction.id(),
        })
    }
}

impl TryFrom<SerializableTransaction> for cctx::SignableTransaction {
    type Error = Error;
    fn try_from(signable: SerializableTransaction) -> Result<Self> {
        let mut entries = vec![];
        let mut inputs = vec![];
        for input in signable.inputs {
            entries.push((&input.utxo).try_into()?);
            inputs.push(input.try_into()?);
        }

        let outputs = signable.outputs.into_iter().map(TryInto::try_into).collect::<Result<Vec<_>>>()?;

        let tx = cctx::Transaction::new(
            signable.tx_version,
            inputs,
            outputs,
            signable.lock_time.parse()?,
            signable.subnetwork_id,
            signable.gas.parse()?,
            signable.payload,
        );

        Ok(Self::with_entries(tx, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializable::test::signable_transaction;

    #[test]
    fn test_string_serializable_transaction() {
        let signable = signable_transaction();
        let serializable = SerializableTransaction::from_signable_transaction(&signable).unwrap();
        let json = serializable.serialize_to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 2);
        assert_eq!(value["inputs"][1]["utxo"]["blockDaaScore"], u64::MAX.to_string());
        assert_eq!(value["outputs"][0]["value"], "2500000000");
        assert_eq!(value["payload"], "dead");

        let restored: cctx::SignableTransaction = SerializableTransaction::deserialize_from_json(&json).unwrap().try_into().unwrap();
        assert_eq!(restored.id(), signable.id());
        assert_eq!(restored.entries, signable.entries);
    }

    #[test]
    fn test_string_serializable_rejects_bad_input() {
        let signable = signable_transaction();
        let mut serializable = SerializableTransaction::from_signable_transaction(&signable).unwrap();
        serializable.outputs[0].value = "not-a-number".to_string();
        let result: Result<cctx::SignableTransaction> = serializable.clone().try_into();
        assert!(matches!(result, Err(Error::ParseInt(_))));

        serializable.version = 1;
        let json = serde_json::to_string(&serializable).unwrap();
        assert!(SerializableTransaction::deserialize_from_json(&json).is_err());
    }
}
