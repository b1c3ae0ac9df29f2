use std::io;

#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    #[fail(display = "Invalid lottery number")]
    InvalidCeiling,
    #[fail(display = "Invalid ticket price")]
    InvalidPrice,
    #[fail(display = "ticket number {} is outside the lottery range", _0)]
    TicketOutOfRange(i64),
    #[fail(display = "ticket number {} is sold more than once", _0)]
    DuplicateTicket(i64),
    #[fail(display = "winning number {} is repeated or has no ticket", _0)]
    InvalidWinner(i64),
}

#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum SaleError {
    #[fail(
        display = "lottery number {} is not in the allowed range: 1 - {}",
        number, ceiling
    )]
    NumberOutOfRange { number: i64, ceiling: i64 },
    #[fail(display = "lottery number {} has already been sold", _0)]
    NumberAlreadySold(i64),
}

#[derive(Debug, Fail)]
pub enum ImportError {
    #[fail(display = "not a valid lottery file")]
    InvalidFile,
    #[fail(display = "{}", _0)]
    ParseError(String),
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for ImportError {
    fn from(err: io::Error) -> Self {
        ImportError::Io(err)
    }
}

impl ImportError {
    pub fn parse(msg: String) -> Self {
        ImportError::ParseError(msg)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ImportError::ParseError(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

#[test]
fn sale_error_names_range() {
    let err = SaleError::NumberOutOfRange {
        number: 12,
        ceiling: 10,
    };
    assert_eq!(
        err.to_string(),
        "lottery number 12 is not in the allowed range: 1 - 10"
    );
}

#[test]
fn import_error_message() {
    let err = ImportError::parse(String::from("Missing tag MaxLotteryNumber"));
    assert_eq!(err.message(), Some("Missing tag MaxLotteryNumber"));
    assert_eq!(ImportError::InvalidFile.message(), None);
}

// vi: ts=8 sts=4 et
