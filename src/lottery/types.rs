/// Lowest lottery number that can be sold or drawn.
pub const LOTTERY_NUMBER_MIN: i64 = 1;
/// Highest ceiling a lottery accepts; save files store it as a 32-bit int.
pub const LOTTERY_NUMBER_MAX: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sale state of a single lottery number
pub enum Slot {
    Available,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: i64,
    pub owner: Option<String>,
    /// ticket price at the time of sale
    pub price: i64,
    pub comment: Option<String>,
}

impl Ticket {
    pub fn new(number: i64, price: i64) -> Self {
        Ticket {
            number,
            owner: None,
            price,
            comment: None,
        }
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = non_empty(owner);
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = non_empty(comment);
        self
    }

    pub fn owner_name(&self) -> &str {
        self.owner.as_ref().map(String::as_str).unwrap_or("")
    }
}

/// Empty owners and comments are stored as absent.
pub fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[test]
fn ticket_empty_fields_are_absent() {
    let ticket = Ticket::new(4, 10).with_owner("").with_comment("");
    assert_eq!(ticket.owner, None);
    assert_eq!(ticket.comment, None);
    assert_eq!(ticket.owner_name(), "");
}

#[test]
fn ticket_keeps_whitespace_in_fields() {
    let ticket = Ticket::new(4, 10).with_owner(" Alice ").with_comment("row 2\nseat 7");
    assert_eq!(ticket.owner_name(), " Alice ");
    assert_eq!(ticket.comment, Some(String::from("row 2\nseat 7")));
}

// vi: ts=8 sts=4 et
