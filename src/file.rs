use failure::Error;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use crate::lottery::errors::ImportError;
use crate::lottery::Lottery;

/// Extension conventionally given to lottery save files.
pub const EXTENSION: &str = "vplf";

pub trait SaveFile
where
    Self: Sized,
{
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImportError>;
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error>;
}

impl SaveFile for Lottery {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let lottery = Lottery::import_from(BufReader::new(file))?;
        info!(
            path = %path.display(),
            tickets = lottery.tickets().len(),
            "loaded lottery"
        );
        Ok(lottery)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        self.export_to(BufWriter::new(file))?;
        info!(
            path = %path.display(),
            tickets = self.tickets().len(),
            "saved lottery"
        );
        Ok(())
    }
}

#[cfg(test)]
fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "lottery-{}-{}.{}",
        name,
        std::process::id(),
        EXTENSION
    ))
}

#[test]
fn save_then_load() {
    let path = temp_path("save_then_load");
    let mut lottery = Lottery::new(30, 2).unwrap();
    lottery.sell(11, "Ivy").unwrap();
    lottery.sell(29, "").unwrap();
    lottery.set_comment(29, "reserved");
    lottery.draw_winner().unwrap();
    lottery.save(&path).unwrap();

    let loaded = Lottery::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.ceiling(), 30);
    assert_eq!(loaded.ticket_price(), 2);
    assert_eq!(loaded.tickets(), lottery.tickets());
    assert_eq!(loaded.winners(), lottery.winners());
    loaded.assert_consistent();
}

#[test]
fn save_truncates_previous_contents() {
    let path = temp_path("save_truncates");
    let mut big = Lottery::new(100, 1).unwrap();
    for n in 1..=50 {
        big.sell(n, "someone with a rather long name").unwrap();
    }
    big.save(&path).unwrap();
    Lottery::new(5, 1).unwrap().save(&path).unwrap();

    let loaded = Lottery::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.ceiling(), 5);
    assert!(loaded.tickets().is_empty());
}

#[test]
fn load_missing_file_is_io_error() {
    let path = temp_path("does_not_exist");
    match Lottery::load(&path) {
        Err(ImportError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        Err(err) => panic!("unexpected error {:?}", err),
        Ok(_) => panic!("loaded a missing file"),
    }
}

// vi: ts=8 sts=4 et
