#![forbid(unsafe_code)]

//! Core data model for famgrid.
//!
//! The layout engine in `famgrid-layout` consumes a [`FamilyGraph`]: a map of
//! [`Person`] records keyed by [`PersonId`]. This crate owns that model, the
//! `[-]YYYYMMDD` date handling shared by ordering logic, the grid geometry
//! primitives used by layout output, and a [`normalize`](normalize::normalize)
//! step that builds a graph from flat person/relationship tables.

pub mod date;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod normalize;

pub use date::{DateParts, compare_date, has_actual_date, parse_date};
pub use error::{Error, Result};
pub use geometry::{Bounds, GridPoint};
pub use graph::{
    FamilyGraph, Gender, MAX_PARENT_SETS, ParentKind, ParentRole, ParentSet, PartnerKind,
    Partnership, Person, PersonId,
};
