//! Error taxonomy for the debug-info filter.
//!
//! The upstream message-graph model propagates a small set of
//! statuses between iterators: `OK`, `AGAIN`, `END`, `MEMORY_ERROR`,
//! `ERROR`. [`Status`] is the Rust analogue of that contract;
//! [`Error`] is the payload carried by its `Error` variant.

use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors ---------------------------------------
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    FromUtf8(#[from] FromUtf8Error),

    // --------------------------------- binary/dwarf parsing ---------------------------------
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),
    #[error("dwarf parsing error: {0}")]
    DwarfParsing(#[from] gimli::Error),
    #[error("no ELF section {0}")]
    SectionNotFound(&'static str),
    #[error("invalid build-id note format")]
    BuildIdFormat,

    // --------------------------------- trace-ir mapping --------------------------------------
    #[error("no mapped output counterpart for input stream")]
    StreamNotMapped,
    #[error("no mapped output counterpart for input packet")]
    PacketNotMapped,
    #[error("no mapped output counterpart for input event class")]
    EventClassNotMapped,
    #[error("no mapped output counterpart for input stream class")]
    StreamClassNotMapped,
    #[error("no mapped output counterpart for input clock class")]
    ClockClassNotMapped,
    #[error("field path resolution failed: {0}")]
    FieldPathResolution(String),
    #[error("malformed field class: {0}")]
    MalformedFieldClass(String),
    #[error("malformed event payload: missing or mistyped member `{0}`")]
    MalformedPayload(&'static str),
    #[error("field class `{0}` already belongs to another trace class")]
    FieldClassReused(&'static str),

    // --------------------------------- misc -------------------------------------------------
    #[error("{0}")]
    Other(String),
}

/// Propagation status for the message-iterator pump.
///
/// Unlike the original C status codes there is no distinct
/// `MEMORY_ERROR`: allocation failure in Rust aborts rather than
/// returning a `Result`, so the "release partial output, signal a
/// fatal status" rule collapses onto `Status::Error`.
#[derive(Debug)]
pub enum Status {
    /// `count` messages were produced.
    Ok(usize),
    /// Upstream has nothing ready right now; try again later.
    Again,
    /// Upstream is exhausted.
    End,
    /// A fatal, call-scoped failure. Any messages already built
    /// during this call have been dropped.
    Error(Error),
}

impl From<Error> for Status {
    fn from(e: Error) -> Self {
        Status::Error(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
