//!
//! Iteration over the spendable entries of a [`UtxoContext`].
//!

use crate::imports::*;

/// Yields the mature entries of a [`UtxoContext`], largest first.
///
/// The entry order is captured when the iterator is created; entries that
/// stop being spendable before they are reached (reserved by another
/// generator, spent or reorged) are skipped.
pub struct UtxoIterator {
    utxo_context: UtxoContext,
    entries: std::vec::IntoIter<UtxoEntryReference>,
}

impl UtxoIterator {
    pub fn new(utxo_context: &UtxoContext) -> Self {
        Self { utxo_context: utxo_context.clone(), entries: utxo_context.mature_entries_descending().into_iter() }
    }
}

impl Iterator for UtxoIterator {
    type Item = UtxoEntryReference;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.by_ref().find(|entry| self.utxo_context.is_spendable(entry.id_as_ref()))
    }
}
