use std::{error::Error, fmt};

use backtrace::Backtrace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Underlying page read/write failed.
    Io,

    /// Schema mismatch, page not in file, eviction impossible, and
    /// the like.
    Db,

    /// The transaction has been chosen as a deadlock victim and must
    /// be rolled back by its driver. This is control flow, not a
    /// user-facing failure.
    Aborted,
}

pub struct DbError {
    kind: ErrorKind,
    details: String,
    backtrace: Backtrace,
}

impl DbError {
    pub fn new(msg: &str) -> DbError {
        Self::with_kind(ErrorKind::Db, msg)
    }

    pub fn io(msg: &str) -> DbError {
        Self::with_kind(ErrorKind::Io, msg)
    }

    pub fn aborted(msg: &str) -> DbError {
        Self::with_kind(ErrorKind::Aborted, msg)
    }

    fn with_kind(kind: ErrorKind, msg: &str) -> DbError {
        DbError {
            kind,
            details: msg.to_string(),
            backtrace: Backtrace::new(),
        }
    }

    pub fn get_kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }

    pub fn show_backtrace(&self) {
        eprintln!("{}\nbacktrace:\n{:?}", self.details, self.backtrace);
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.details)
    }
}

impl fmt::Debug for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for DbError {
    fn description(&self) -> &str {
        &self.details
    }
}
