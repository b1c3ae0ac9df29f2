use std::mem;

use tracing::debug;

use crate::lottery::errors::SaleError;
use crate::lottery::types::Ticket;
use crate::lottery::Lottery;

/// Tickets sold together and kept only if the batch is committed. Dropping
/// an uncommitted batch removes every ticket it sold.
pub struct SaleBatch<'a> {
    lottery: &'a mut Lottery,
    sold: Vec<i64>,
    committed: bool,
}

impl<'a> SaleBatch<'a> {
    pub(crate) fn new(lottery: &'a mut Lottery) -> Self {
        SaleBatch {
            lottery,
            sold: Vec::new(),
            committed: false,
        }
    }

    pub fn sell(&mut self, number: i64, owner: &str) -> Result<&Ticket, SaleError> {
        let ticket = self.lottery.sell(number, owner)?;
        self.sold.push(ticket.number);
        Ok(ticket)
    }

    pub fn sell_random(&mut self, owner: &str) -> Option<&Ticket> {
        let ticket = self.lottery.sell_random(owner)?;
        self.sold.push(ticket.number);
        Some(ticket)
    }

    /// Takes back a ticket sold in this batch.
    pub fn remove(&mut self, number: i64) -> Option<Ticket> {
        let index = self.sold.iter().position(|&n| n == number)?;
        self.sold.remove(index);
        self.lottery.remove(number)
    }

    pub fn set_comment(&mut self, number: i64, comment: &str) -> Option<&Ticket> {
        if !self.sold.contains(&number) {
            return None;
        }
        self.lottery.set_comment(number, comment)
    }

    /// Numbers sold in this batch, in sale order.
    pub fn numbers(&self) -> &[i64] {
        &self.sold
    }

    pub fn total(&self) -> i64 {
        self.sold
            .iter()
            .filter_map(|&n| self.lottery.ticket(n))
            .map(|t| t.price)
            .sum()
    }

    /// Keeps the batch. Every batch ticket is handed to `owner`, replacing
    /// whatever owner it was sold with; an empty `owner` clears them.
    pub fn commit(mut self, owner: &str) -> Vec<i64> {
        for &number in &self.sold {
            self.lottery.set_owner(number, owner);
        }
        self.committed = true;
        debug!(tickets = self.sold.len(), "committed sale batch");
        mem::replace(&mut self.sold, Vec::new())
    }

    pub fn discard(self) {}
}

impl<'a> Drop for SaleBatch<'a> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for number in self.sold.drain(..).rev() {
            self.lottery.remove(number);
        }
        debug!(remaining = self.lottery.remaining(), "discarded sale batch");
    }
}

#[test]
fn commit_keeps_tickets() {
    let mut lottery = Lottery::new(10, 3).unwrap();
    {
        let mut batch = lottery.batch();
        batch.sell(1, "").unwrap();
        batch.sell(2, "Eve").unwrap();
        assert_eq!(batch.total(), 6);
        assert_eq!(batch.commit("Frank"), vec![1, 2]);
    }
    assert_eq!(lottery.tickets().len(), 2);
    assert_eq!(lottery.ticket(1).unwrap().owner_name(), "Frank");
    assert_eq!(lottery.ticket(2).unwrap().owner_name(), "Frank");
    lottery.assert_consistent();
}

#[test]
fn dropped_batch_restores_lottery() {
    let mut lottery = Lottery::new(10, 3).unwrap().with_seed(3);
    lottery.sell(5, "Alice").unwrap();
    {
        let mut batch = lottery.batch();
        batch.sell(1, "Bob").unwrap();
        batch.sell_random("Bob").unwrap();
        assert_eq!(
            batch.sell(5, "Bob").unwrap_err(),
            SaleError::NumberAlreadySold(5)
        );
        assert_eq!(batch.numbers().len(), 2);
    }
    assert_eq!(lottery.tickets(), &[Ticket::new(5, 3).with_owner("Alice")][..]);
    assert_eq!(lottery.remaining(), 9);
    lottery.assert_consistent();
}

#[test]
fn batch_remove_only_touches_batch_tickets() {
    let mut lottery = Lottery::new(10, 3).unwrap();
    lottery.sell(5, "Alice").unwrap();
    let mut batch = lottery.batch();
    batch.sell(6, "Bob").unwrap();
    batch.set_comment(6, "second row").unwrap();
    assert!(batch.set_comment(5, "not mine").is_none());
    assert!(batch.remove(5).is_none());
    assert_eq!(batch.remove(6).unwrap().number, 6);
    assert_eq!(batch.total(), 0);
    batch.discard();
    assert_eq!(lottery.tickets().len(), 1);
    assert!(lottery.ticket(5).unwrap().comment.is_none());
}

#[test]
fn commit_owner_replaces_batch_owners_only() {
    let mut lottery = Lottery::new(10, 3).unwrap();
    lottery.sell(9, "Alice").unwrap();
    {
        let mut batch = lottery.batch();
        batch.sell(3, "Gail").unwrap();
        batch.sell(4, "").unwrap();
        batch.commit("");
    }
    assert_eq!(lottery.ticket(3).unwrap().owner, None);
    assert_eq!(lottery.ticket(4).unwrap().owner, None);
    assert_eq!(lottery.ticket(9).unwrap().owner_name(), "Alice");
    lottery.assert_consistent();
}

// vi: ts=8 sts=4 et
