//!
//! [`Generator`] async [`Stream`] implementation that produces pending transactions.
//!

use std::pin::Pin;
use std::task::{Context, Poll};

use crate::result::Result;
use crate::tx::{Generator, PendingTransaction};
use futures::stream::FusedStream;
use futures::Stream;

/// Generation is synchronous, every poll is immediately ready.
pub struct PendingTransactionStream {
    generator: Generator,
}

impl PendingTransactionStream {
    pub fn new(generator: &Generator) -> Self {
        Self { generator: generator.clone() }
    }
}

impl Stream for PendingTransactionStream {
    type Item = Result<PendingTransaction>;
    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.generator.generate_transaction().transpose())
    }
}

impl FusedStream for PendingTransactionStream {
    fn is_terminated(&self) -> bool {
        self.generator.is_done()
    }
}
