use crate::imports::*;

/// A UTXO entry is identified by the outpoint that created it.
pub type UtxoEntryId = cctx::TransactionOutpoint;

/// Client-side UTXO entry: the consensus entry plus its outpoint and,
/// when known, the address its script pays to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub address: Option<Address>,
    pub outpoint: cctx::TransactionOutpoint,
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    #[inline(always)]
    pub fn amount(&self) -> u64 {
        self.amount
    }

    #[inline(always)]
    pub fn block_daa_score(&self) -> u64 {
        self.block_daa_score
    }

    #[inline(always)]
    pub fn is_coinbase(&self) -> bool {
        self.is_coinbase
    }
}

impl From<&UtxoEntry> for cctx::UtxoEntry {
    fn from(utxo: &UtxoEntry) -> Self {
        cctx::UtxoEntry {
            amount: utxo.amount,
            script_public_key: utxo.script_public_key.clone(),
            block_daa_score: utxo.block_daa_score,
            is_coinbase: utxo.is_coinbase,
        }
    }
}

/// Shared handle to an immutable [`UtxoEntry`]. Equality, ordering and
/// hashing are by outpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UtxoEntryReference {
    pub utxo: Arc<UtxoEntry>,
}

impl UtxoEntryReference {
    #[inline(always)]
    pub fn id(&self) -> UtxoEntryId {
        self.utxo.outpoint
    }

    #[inline(always)]
    pub fn id_as_ref(&self) -> &UtxoEntryId {
        &self.utxo.outpoint
    }

    #[inline(always)]
    pub fn amount(&self) -> u64 {
        self.utxo.amount
    }

    #[inline(always)]
    pub fn amount_as_ref(&self) -> &u64 {
        &self.utxo.amount
    }

    #[inline(always)]
    pub fn is_coinbase(&self) -> bool {
        self.utxo.is_coinbase
    }

    #[inline(always)]
    pub fn block_daa_score(&self) -> u64 {
        self.utxo.block_daa_score
    }

    #[inline(always)]
    pub fn address(&self) -> Option<&Address> {
        self.utxo.address.as_ref()
    }

    #[inline(always)]
    pub fn transaction_id(&self) -> TransactionId {
        self.utxo.outpoint.transaction_id
    }

    #[inline(always)]
    pub fn script_public_key(&self) -> &ScriptPublicKey {
        &self.utxo.script_public_key
    }

    /// Returns a copy of this entry with a different block DAA score.
    pub fn with_block_daa_score(&self, block_daa_score: u64) -> Self {
        let mut utxo = self.utxo.as_ref().clone();
        utxo.block_daa_score = block_daa_score;
        Self { utxo: Arc::new(utxo) }
    }
}

impl std::hash::Hash for UtxoEntryReference {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl AsRef<UtxoEntry> for UtxoEntryReference {
    fn as_ref(&self) -> &UtxoEntry {
        &self.utxo
    }
}

impl From<UtxoEntryReference> for UtxoEntry {
    fn from(value: UtxoEntryReference) -> Self {
        (*value.utxo).clone()
    }
}

impl From<&UtxoEntryReference> for cctx::UtxoEntry {
    fn from(value: &UtxoEntryReference) -> Self {
        value.utxo.as_ref().into()
    }
}

impl From<UtxoEntry> for UtxoEntryReference {
    fn from(entry: UtxoEntry) -> Self {
        Self { utxo: Arc::new(entry) }
    }
}

impl Eq for UtxoEntryReference {}

impl PartialEq for UtxoEntryReference {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Ord for UtxoEntryReference {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(&other.id())
    }
}

impl PartialOrd for UtxoEntryReference {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A simple collection of UTXO entries.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct UtxoEntries(Arc<Vec<UtxoEntryReference>>);

impl UtxoEntries {
    pub fn contains(&self, entry: &UtxoEntryReference) -> bool {
        self.0.contains(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UtxoEntryReference> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort the contained entries by amount. Please note that
    /// this function duplicates the whole contained set while sorting.
    pub fn sort(&mut self) {
        let mut items = (*self.0).clone();
        items.sort_by_key(|e| e.amount());
        self.0 = Arc::new(items);
    }

    pub fn amount(&self) -> u64 {
        self.0.iter().map(|e| e.amount()).sum()
    }

    pub fn items(&self) -> Arc<Vec<UtxoEntryReference>> {
        self.0.clone()
    }
}

impl From<Vec<UtxoEntry>> for UtxoEntries {
    fn from(items: Vec<UtxoEntry>) -> Self {
        Self(Arc::new(items.into_iter().map(UtxoEntryReference::from).collect::<_>()))
    }
}

impl From<Vec<UtxoEntryReference>> for UtxoEntries {
    fn from(items: Vec<UtxoEntryReference>) -> Self {
        Self(Arc::new(items))
    }
}
