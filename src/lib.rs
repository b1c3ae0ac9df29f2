#[macro_use]
extern crate failure;
extern crate quick_xml;
extern crate rand;
extern crate tracing;

extern crate serde;
#[macro_use]
extern crate serde_derive;
#[cfg(test)]
extern crate serde_json;

pub mod file;
pub mod lottery;

pub use crate::file::SaveFile;
pub use crate::lottery::batch::SaleBatch;
pub use crate::lottery::errors::{ConstructionError, ImportError, SaleError};
pub use crate::lottery::types::{Ticket, LOTTERY_NUMBER_MAX, LOTTERY_NUMBER_MIN};
pub use crate::lottery::Lottery;

// vi: ts=8 sts=4 et
