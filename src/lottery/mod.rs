use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

pub mod batch;
pub mod document;
pub mod errors;
pub mod summary;
pub mod types;

use crate::lottery::batch::SaleBatch;
use crate::lottery::errors::{ConstructionError, SaleError};
use crate::lottery::types::{non_empty, Slot, Ticket, LOTTERY_NUMBER_MAX, LOTTERY_NUMBER_MIN};

/// One raffle: numbers `1..=ceiling` sold at a fixed price, winners drawn
/// among the sold numbers without repetition.
#[derive(Debug)]
pub struct Lottery {
    ceiling: i64,
    ticket_price: i64,
    /// slot of number `n` lives at index `n - 1`
    slots: Vec<Slot>,
    tickets: Vec<Ticket>,
    winners: Vec<i64>,
    remaining: i64,
    rng: StdRng,
}

impl Lottery {
    pub fn new(ceiling: i64, ticket_price: i64) -> Result<Lottery, ConstructionError> {
        if ceiling < LOTTERY_NUMBER_MIN || ceiling > LOTTERY_NUMBER_MAX {
            return Err(ConstructionError::InvalidCeiling);
        }
        if ticket_price < 0 {
            return Err(ConstructionError::InvalidPrice);
        }
        let len = ceiling as usize;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| ConstructionError::InvalidCeiling)?;
        slots.resize(len, Slot::Available);
        Ok(Lottery {
            ceiling,
            ticket_price,
            slots,
            tickets: Vec::new(),
            winners: Vec::new(),
            remaining: ceiling,
            rng: StdRng::from_entropy(),
        })
    }

    /// Rebuilds a session from previously sold tickets and drawn winners.
    /// Availability and the remaining count are derived from `tickets`.
    pub fn from_existing(
        ceiling: i64,
        ticket_price: i64,
        tickets: Vec<Ticket>,
        winners: Vec<i64>,
    ) -> Result<Lottery, ConstructionError> {
        let mut lottery = Lottery::new(ceiling, ticket_price)?;
        for ticket in &tickets {
            match lottery.slot(ticket.number) {
                None => return Err(ConstructionError::TicketOutOfRange(ticket.number)),
                Some(Slot::Sold) => return Err(ConstructionError::DuplicateTicket(ticket.number)),
                Some(Slot::Available) => {
                    lottery.set_slot(ticket.number, Slot::Sold);
                    lottery.remaining -= 1;
                }
            }
        }
        lottery.tickets = tickets;
        for number in winners {
            if !lottery.is_sold(number) || lottery.is_winner(number) {
                return Err(ConstructionError::InvalidWinner(number));
            }
            lottery.winners.push(number);
        }
        Ok(lottery)
    }

    /// Replaces the entropy-seeded generator, for reproducible draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    pub fn ticket_price(&self) -> i64 {
        self.ticket_price
    }

    /// Numbers still available for sale.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Sold tickets in sale order.
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Winning numbers in draw order.
    pub fn winners(&self) -> &[i64] {
        &self.winners
    }

    pub fn ticket(&self, number: i64) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.number == number)
    }

    pub fn winning_tickets(&self) -> Vec<&Ticket> {
        self.winners.iter().filter_map(|&n| self.ticket(n)).collect()
    }

    pub fn is_sold(&self, number: i64) -> bool {
        self.slot(number) == Some(Slot::Sold)
    }

    pub fn is_winner(&self, number: i64) -> bool {
        self.winners.contains(&number)
    }

    pub fn total_revenue(&self) -> i64 {
        self.tickets.iter().map(|t| t.price).sum()
    }

    /// Sells a specific number. Only numbers above the ceiling are out of
    /// range; anything else that is not available, including numbers below
    /// the minimum, counts as already sold.
    pub fn sell(&mut self, number: i64, owner: &str) -> Result<&Ticket, SaleError> {
        if number > self.ceiling {
            return Err(SaleError::NumberOutOfRange {
                number,
                ceiling: self.ceiling,
            });
        }
        if self.slot(number) != Some(Slot::Available) {
            return Err(SaleError::NumberAlreadySold(number));
        }

        self.set_slot(number, Slot::Sold);
        self.remaining -= 1;
        self.tickets
            .push(Ticket::new(number, self.ticket_price).with_owner(owner));
        debug!(number, remaining = self.remaining, "sold lottery number");

        let last = self.tickets.len() - 1;
        Ok(&self.tickets[last])
    }

    /// Sells a random available number, or returns `None` when sold out.
    pub fn sell_random(&mut self, owner: &str) -> Option<&Ticket> {
        if self.remaining < 1 {
            return None;
        }
        let number = loop {
            let candidate = self.draw_number();
            if self.slot(candidate) == Some(Slot::Available) {
                break candidate;
            }
        };
        self.sell(number, owner).ok()
    }

    /// Takes a ticket back, freeing its number and dropping it from the
    /// winners. Returns `None` if the number was never sold.
    pub fn remove(&mut self, number: i64) -> Option<Ticket> {
        let index = self.tickets.iter().position(|t| t.number == number)?;
        self.remove_winner(number);
        self.set_slot(number, Slot::Available);
        self.remaining += 1;
        let ticket = self.tickets.remove(index);
        debug!(number, remaining = self.remaining, "removed ticket");
        Some(ticket)
    }

    /// Draws a sold number that has not won yet. Samples the whole range and
    /// rejects unsold and already winning numbers, so it slows down as the
    /// eligible share of the range shrinks.
    pub fn draw_winner(&mut self) -> Option<&Ticket> {
        if self.tickets.is_empty() || self.winners.len() == self.tickets.len() {
            return None;
        }
        let number = loop {
            let candidate = self.draw_number();
            if self.is_sold(candidate) && !self.is_winner(candidate) {
                break candidate;
            }
        };
        self.winners.push(number);
        debug!(number, winners = self.winners.len(), "drew winning number");
        self.ticket(number)
    }

    /// Forgets that `number` won. The ticket itself is kept.
    pub fn remove_winner(&mut self, number: i64) -> bool {
        let before = self.winners.len();
        self.winners.retain(|&w| w != number);
        before != self.winners.len()
    }

    pub fn set_comment(&mut self, number: i64, comment: &str) -> Option<&Ticket> {
        let ticket = self.tickets.iter_mut().find(|t| t.number == number)?;
        ticket.comment = non_empty(comment);
        debug!(number, "edited ticket comment");
        Some(&*ticket)
    }

    pub fn set_owner(&mut self, number: i64, owner: &str) -> Option<&Ticket> {
        let ticket = self.tickets.iter_mut().find(|t| t.number == number)?;
        ticket.owner = non_empty(owner);
        debug!(number, "edited ticket owner");
        Some(&*ticket)
    }

    /// Starts a batch of sales that is rolled back unless committed.
    pub fn batch(&mut self) -> SaleBatch<'_> {
        SaleBatch::new(self)
    }

    fn draw_number(&mut self) -> i64 {
        self.rng.gen_range(LOTTERY_NUMBER_MIN..=self.ceiling)
    }

    fn slot(&self, number: i64) -> Option<Slot> {
        if number < LOTTERY_NUMBER_MIN || number > self.ceiling {
            None
        } else {
            Some(self.slots[(number - LOTTERY_NUMBER_MIN) as usize])
        }
    }

    fn set_slot(&mut self, number: i64, slot: Slot) {
        self.slots[(number - LOTTERY_NUMBER_MIN) as usize] = slot;
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let sold = self.slots.iter().filter(|&&s| s == Slot::Sold).count() as i64;
        assert_eq!(self.slots.len() as i64, self.ceiling);
        assert_eq!(self.remaining, self.ceiling - self.tickets.len() as i64);
        assert_eq!(self.remaining, self.ceiling - sold);
        for ticket in &self.tickets {
            assert!(self.is_sold(ticket.number));
            assert_eq!(
                self.tickets.iter().filter(|t| t.number == ticket.number).count(),
                1
            );
        }
        for (i, &winner) in self.winners.iter().enumerate() {
            assert!(self.ticket(winner).is_some());
            assert!(!self.winners[i + 1..].contains(&winner));
        }
    }
}

#[test]
fn new_lottery_is_empty() {
    let lottery = Lottery::new(10, 5).unwrap();
    assert_eq!(lottery.ceiling(), 10);
    assert_eq!(lottery.ticket_price(), 5);
    assert_eq!(lottery.remaining(), 10);
    assert!(lottery.tickets().is_empty());
    assert!(lottery.winners().is_empty());
    lottery.assert_consistent();
}

#[test]
fn new_lottery_rejects_bad_arguments() {
    assert_eq!(
        Lottery::new(0, 5).unwrap_err(),
        ConstructionError::InvalidCeiling
    );
    assert_eq!(
        Lottery::new(-3, 5).unwrap_err(),
        ConstructionError::InvalidCeiling
    );
    assert_eq!(
        Lottery::new(LOTTERY_NUMBER_MAX + 1, 5).unwrap_err(),
        ConstructionError::InvalidCeiling
    );
    assert_eq!(
        Lottery::new(i64::MAX, 5).unwrap_err(),
        ConstructionError::InvalidCeiling
    );
    assert_eq!(
        Lottery::new(10, -1).unwrap_err(),
        ConstructionError::InvalidPrice
    );
    assert!(Lottery::new(1, 0).is_ok());
}

#[test]
fn sell_marks_number_sold() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    {
        let ticket = lottery.sell(3, "Alice").unwrap();
        assert_eq!(ticket.number, 3);
        assert_eq!(ticket.price, 5);
        assert_eq!(ticket.owner_name(), "Alice");
    }
    assert!(lottery.is_sold(3));
    assert_eq!(lottery.remaining(), 9);
    lottery.assert_consistent();
}

#[test]
fn sell_out_of_range_leaves_state() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    assert_eq!(
        lottery.sell(11, "Bob").unwrap_err(),
        SaleError::NumberOutOfRange {
            number: 11,
            ceiling: 10
        }
    );
    assert_eq!(lottery.remaining(), 10);
    assert!(lottery.tickets().is_empty());
}

#[test]
fn sell_twice_is_already_sold() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(7, "Alice").unwrap();
    assert_eq!(
        lottery.sell(7, "Bob").unwrap_err(),
        SaleError::NumberAlreadySold(7)
    );
    assert_eq!(lottery.tickets().len(), 1);
    assert_eq!(lottery.ticket(7).unwrap().owner_name(), "Alice");
}

#[test]
fn sell_below_minimum_is_already_sold() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    assert_eq!(
        lottery.sell(0, "Alice").unwrap_err(),
        SaleError::NumberAlreadySold(0)
    );
    assert_eq!(
        lottery.sell(-4, "Alice").unwrap_err(),
        SaleError::NumberAlreadySold(-4)
    );
    assert_eq!(lottery.remaining(), 10);
}

#[test]
fn sell_random_until_sold_out() {
    let mut lottery = Lottery::new(25, 2).unwrap().with_seed(7);
    for _ in 0..25 {
        let number = lottery.sell_random("Carol").unwrap().number;
        assert!(number >= 1 && number <= 25);
        lottery.assert_consistent();
    }
    assert_eq!(lottery.remaining(), 0);
    assert!(lottery.sell_random("Carol").is_none());
    assert_eq!(lottery.tickets().len(), 25);
    assert_eq!(lottery.total_revenue(), 50);
}

#[test]
fn remove_frees_number_and_winner() {
    let mut lottery = Lottery::new(1, 5).unwrap();
    lottery.sell(1, "Alice").unwrap();
    assert_eq!(lottery.draw_winner().unwrap().number, 1);

    let removed = lottery.remove(1).unwrap();
    assert_eq!(removed.owner_name(), "Alice");
    assert!(lottery.winners().is_empty());
    assert_eq!(lottery.remaining(), 1);
    lottery.assert_consistent();

    lottery.sell(1, "Bob").unwrap();
    assert!(!lottery.is_winner(1));
    lottery.assert_consistent();
}

#[test]
fn remove_unsold_is_noop() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    lottery.sell(2, "Alice").unwrap();
    assert!(lottery.remove(3).is_none());
    assert!(lottery.remove(42).is_none());
    assert_eq!(lottery.remaining(), 9);
    lottery.assert_consistent();
}

#[test]
fn draw_winner_on_empty_lottery() {
    let mut lottery = Lottery::new(10, 5).unwrap();
    assert!(lottery.draw_winner().is_none());
}

#[test]
fn draw_winner_exhausts_sold_tickets() {
    let mut lottery = Lottery::new(10, 5).unwrap().with_seed(42);
    lottery.sell(3, "Alice").unwrap();
    lottery.sell(7, "Bob").unwrap();

    let mut drawn = Vec::new();
    while let Some(ticket) = lottery.draw_winner() {
        drawn.push(ticket.number);
    }
    drawn.sort();
    assert_eq!(drawn, vec![3, 7]);
    assert_eq!(lottery.winners().len(), 2);
    assert_eq!(lottery.total_revenue(), 10);
    lottery.assert_consistent();
}

#[test]
fn remove_winner_keeps_ticket() {
    let mut lottery = Lottery::new(5, 1).unwrap();
    lottery.sell(4, "Alice").unwrap();
    lottery.draw_winner().unwrap();
    assert!(lottery.remove_winner(4));
    assert!(!lottery.remove_winner(4));
    assert!(lottery.ticket(4).is_some());
    assert_eq!(lottery.draw_winner().unwrap().number, 4);
}

#[test]
fn total_revenue_sums_ticket_prices() {
    let tickets = vec![Ticket::new(1, 5), Ticket::new(2, 8), Ticket::new(9, 5)];
    let lottery = Lottery::from_existing(10, 5, tickets, vec![]).unwrap();
    assert_eq!(lottery.total_revenue(), 18);
}

#[test]
fn from_existing_derives_availability() {
    let tickets = vec![
        Ticket::new(2, 5).with_owner("Alice"),
        Ticket::new(6, 5).with_comment("paid cash"),
    ];
    let lottery = Lottery::from_existing(6, 5, tickets, vec![6]).unwrap();
    assert_eq!(lottery.remaining(), 4);
    assert!(lottery.is_sold(2));
    assert!(lottery.is_sold(6));
    assert!(!lottery.is_sold(3));
    assert_eq!(lottery.winning_tickets()[0].number, 6);
    lottery.assert_consistent();
}

#[test]
fn from_existing_rejects_inconsistent_data() {
    assert_eq!(
        Lottery::from_existing(5, 1, vec![Ticket::new(6, 1)], vec![]).unwrap_err(),
        ConstructionError::TicketOutOfRange(6)
    );
    assert_eq!(
        Lottery::from_existing(5, 1, vec![Ticket::new(2, 1), Ticket::new(2, 1)], vec![])
            .unwrap_err(),
        ConstructionError::DuplicateTicket(2)
    );
    assert_eq!(
        Lottery::from_existing(5, 1, vec![Ticket::new(2, 1)], vec![3]).unwrap_err(),
        ConstructionError::InvalidWinner(3)
    );
    assert_eq!(
        Lottery::from_existing(5, 1, vec![Ticket::new(2, 1)], vec![2, 2]).unwrap_err(),
        ConstructionError::InvalidWinner(2)
    );
}

#[test]
fn edit_ticket_fields() {
    let mut lottery = Lottery::new(5, 1).unwrap();
    lottery.sell(1, "").unwrap();
    assert_eq!(lottery.set_owner(1, "Dana").unwrap().owner_name(), "Dana");
    assert_eq!(
        lottery.set_comment(1, "blue envelope").unwrap().comment,
        Some(String::from("blue envelope"))
    );
    assert_eq!(lottery.set_comment(1, "").unwrap().comment, None);
    assert!(lottery.set_comment(2, "nobody").is_none());
    assert!(lottery.set_owner(2, "nobody").is_none());
}

// vi: ts=8 sts=4 et
