#![forbid(unsafe_code)]

//! Error type shared by the famgrid crates.

use thiserror::Error;

use crate::graph::PersonId;

/// Errors raised while loading family data or building a layout.
///
/// The layout engine is lenient: dangling references inside the graph are
/// logged and skipped. Only a missing focal person is fatal there. The
/// normalizer is strict because it is the place where raw tables are checked.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested focal person is not in the graph.
    #[error("focal person `{0}` is not present in the family graph")]
    FocalNotFound(PersonId),

    /// Two person records share one id.
    #[error("person `{0}` appears more than once")]
    DuplicatePerson(PersonId),

    /// A relationship record points at an id with no person record.
    #[error("{relation} link references unknown person `{id}`")]
    UnknownPerson {
        /// Which kind of record held the reference.
        relation: &'static str,
        /// The id that could not be resolved.
        id: PersonId,
    },

    /// Family JSON could not be parsed or written.
    #[error("failed to process family JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
