use kaspa_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
use kaspa_consensus_core::tx::*;
use kaspa_hashes::Hash;

pub(crate) fn signable_transaction() -> SignableTransaction {
    let spk = ScriptPublicKey::from_vec(0, vec![0x20; 34]);
    let inputs = vec![
        TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(1), 0), vec![], 0, 1),
        TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(2), 3), vec![], 0, 1),
    ];
    let outputs = vec![TransactionOutput::new(2_500_000_000, spk.clone()), TransactionOutput::new(499_990_000, spk.clone())];
    let tx = Transaction::new(0, inputs, outputs, 0, SUBNETWORK_ID_NATIVE, 0, vec![0xde, 0xad]);
    let entries = vec![UtxoEntry::new(1_000_000_000, spk.clone(), 10, false), UtxoEntry::new(2_000_000_000, spk, u64::MAX, true)];
    SignableTransaction::with_entries(tx, entries)
}
