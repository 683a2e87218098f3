use std::collections::VecDeque;
use std::collections::vec_deque::Iter;
use std::ops::{Index, IndexMut};

use crate::protocol::Transaction;

/// The live transactions of one connection, oldest first.
///
/// Transactions keep the index they were created with. Removing one leaves
/// the indices of the others untouched, so an index stays a valid handle for
/// as long as its transaction is stored.
#[derive(Debug, Default)]
pub struct Transactions {
    transactions: VecDeque<Transaction>,
    next_index: usize,
}

impl Transactions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores a new transaction and returns its index.
    pub(crate) fn start(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.transactions.push_back(Transaction::new(index));
        index
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Transaction> {
        let position = self.position(index)?;
        self.transactions.remove(position)
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.position(index).map(|position| &self.transactions[position])
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Transaction> {
        self.position(index).map(|position| &mut self.transactions[position])
    }

    pub fn iter(&self) -> Iter<'_, Transaction> {
        self.transactions.iter()
    }

    /// Number of stored transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Number of transactions ever started, removed ones included.
    pub fn started(&self) -> usize {
        self.next_index
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.transactions.binary_search_by_key(&index, |tx| tx.index).ok()
    }
}

/// Looks a transaction up by its index.
///
/// # Panics
/// Panics when no stored transaction has `index`.
impl Index<usize> for Transactions {
    type Output = Transaction;

    fn index(&self, index: usize) -> &Transaction {
        match self.get(index) {
            Some(tx) => tx,
            None => panic!("no transaction with index {index}"),
        }
    }
}

impl IndexMut<usize> for Transactions {
    fn index_mut(&mut self, index: usize) -> &mut Transaction {
        match self.get_mut(index) {
            Some(tx) => tx,
            None => panic!("no transaction with index {index}"),
        }
    }
}

impl<'a> IntoIterator for &'a Transactions {
    type Item = &'a Transaction;
    type IntoIter = Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_survive_removal() {
        let mut transactions = Transactions::new();
        for expected in 0..4 {
            assert_eq!(transactions.start(), expected);
        }

        assert_eq!(transactions.remove(1).map(|tx| tx.index), Some(1));
        assert!(transactions.remove(1).is_none());

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions.started(), 4);
        assert!(transactions.get(1).is_none());
        assert_eq!(transactions[2].index, 2);
        assert_eq!(transactions.iter().map(|tx| tx.index).collect::<Vec<_>>(), [0, 2, 3]);

        assert_eq!(transactions.start(), 4);
        transactions[4].request_body_len = 7;
        assert_eq!(transactions.get(4).map(|tx| tx.request_body_len), Some(7));
    }

    #[test]
    fn removing_everything_keeps_counting() {
        let mut transactions = Transactions::new();
        transactions.start();
        transactions.remove(0);

        assert!(transactions.is_empty());
        assert_eq!(transactions.start(), 1);
    }

    #[test]
    #[should_panic(expected = "no transaction with index 3")]
    fn indexing_a_missing_transaction_panics() {
        let transactions = Transactions::new();
        let _ = &transactions[3];
    }
}
