//! Serializable transaction with numeric 64-bit fields.

use crate::imports::*;
use crate::result::Result;
use crate::{UtxoEntry, UtxoEntryReference};
use kaspa_consensus_core::subnets::SubnetworkId;
use kaspa_consensus_core::tx::TransactionInput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableUtxoEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

impl From<&cctx::UtxoEntry> for SerializableUtxoEntry {
    fn from(utxo: &cctx::UtxoEntry) -> Self {
        Self {
            address: None,
            amount: utxo.amount,
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score,
            is_coinbase: utxo.is_coinbase,
        }
    }
}

impl From<&UtxoEntryReference> for SerializableUtxoEntry {
    fn from(entry: &UtxoEntryReference) -> Self {
        let utxo = entry.as_ref();
        Self {
            address: utxo.address.clone(),
            amount: utxo.amount,
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score,
            is_coinbase: utxo.is_coinbase,
        }
    }
}

impl From<&SerializableUtxoEntry> for cctx::UtxoEntry {
    fn from(utxo: &SerializableUtxoEntry) -> Self {
        Self {
            amount: utxo.amount,
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score,
            is_coinbase: utxo.is_coinbase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransactionInput {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
    pub sequence: u64,
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
            sequence: input.sequence,
            sig_op_count: input.sig_op_count,
            utxo: utxo.into(),
        }
    }

    /// Rebuilds the client-side [`UtxoEntryReference`] this input spends.
    pub fn utxo_entry_reference(&self) -> UtxoEntryReference {
        UtxoEntry {
            address: self.utxo.address.clone(),
            outpoint: cctx::TransactionOutpoint::new(self.transaction_id, self.index),
            amount: self.utxo.amount,
            script_public_key: self.utxo.script_public_key.clone(),
            block_daa_score: self.utxo.block_daa_score,
            is_coinbase: self.utxo.is_coinbase,
        }
        .into()
    }
}

impl From<SerializableTransactionInput> for TransactionInput {
    fn from(input: SerializableTransactionInput) -> Self {
        Self {
            previous_outpoint: cctx::TransactionOutpoint::new(input.transaction_id, input.index),
            signature_script: input.signature_script,
            sequence: input.sequence,
            sig_op_count: input.sig_op_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl From<&cctx::TransactionOutput> for SerializableTransactionOutput {
    fn from(output: &cctx::TransactionOutput) -> Self {
        Self { value: output.value, script_public_key: output.script_public_key.clone() }
    }
}

impl From<SerializableTransactionOutput> for cctx::TransactionOutput {
    fn from(output: SerializableTransactionOutput) -> Self {
        Self { value: output.value, script_public_key: output.script_public_key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableTransaction {
    pub id: TransactionId,
    pub version: u16,
    pub inputs: Vec<SerializableTransactionInput>,
    pub outputs: Vec<SerializableTransactionOutput>,
    pub lock_time: u64,
    pub gas: u64,
    pub subnetwork_id: SubnetworkId,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
}

impl SerializableTransaction {
    pub fn serialize_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize_from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_signable_transaction(tx: &cctx::SignableTransaction) -> Result<Self> {
        let inputs = tx.populated_inputs().map(|(input, utxo)| SerializableTransactionInput::new(input, utxo)).collect();
        let transaction = tx.as_ref();

        Ok(Self {
            id: transaction.id(),
            version: transaction.version,
            inputs,
            outputs: transaction.outputs.iter().map(Into::into).collect(),
            lock_time: transaction.lock_time,
            gas: transaction.gas,
            subnetwork_id: transaction.subnetwork_id.clone(),
            payload: transaction.payload.clone(),
        })
    }

    /// Client-side UTXO entries spent by this transaction, in input order.
    pub fn utxo_entry_references(&self) -> Vec<UtxoEntryReference> {
        self.inputs.iter().map(|input| input.utxo_entry_reference()).collect()
    }
}

impl TryFrom<SerializableTransaction> for cctx::SignableTransaction {
    type Error = Error;
    fn try_from(signable: SerializableTransaction) -> Result<Self> {
        let mut entries = Vec::with_capacity(signable.inputs.len());
        let mut inputs = Vec::with_capacity(signable.inputs.len());
        for input in signable.inputs {
            entries.push((&input.utxo).into());
            inputs.push(input.into());
        }

        let outputs = signable.outputs.into_iter().map(Into::into).collect();

        let tx = cctx::Transaction::new(
            signable.version,
            inputs,
            outputs,
            signable.lock_time,
            signable.subnetwork_id,
            signable.gas,
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
    fn test_numeric_serializable_transaction() {
        let signable = signable_transaction();
        let serializable = SerializableTransaction::from_signable_transaction(&signable).unwrap();
        assert_eq!(serializable.id, signable.id());
        assert_eq!(serializable.inputs.len(), 2);
        assert_eq!(serializable.inputs[1].utxo.amount, 2_000_000_000);

        let json = serializable.serialize_to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["lockTime"].is_u64());
        assert!(value["inputs"][0]["utxo"]["blockDaaScore"].is_u64());
        assert!(value["inputs"][0]["utxo"].get("address").is_none());

        let restored: cctx::SignableTransaction = SerializableTransaction::deserialize_from_json(&json).unwrap().try_into().unwrap();
        assert_eq!(restored.id(), signable.id());
        assert_eq!(restored.entries, signable.entries);
    }

    #[test]
    fn test_numeric_utxo_entry_reference() {
        let signable = signable_transaction();
        let serializable = SerializableTransaction::from_signable_transaction(&signable).unwrap();
        let references = serializable.utxo_entry_references();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].id(), signable.tx.inputs[0].previous_outpoint);
        assert_eq!(references[0].amount(), signable.entries[0].amount);
    }
}
