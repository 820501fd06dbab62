#![forbid(unsafe_code)]

//! Family tree layout engine.
//!
//! Turns a [`FamilyGraph`](famgrid_core::FamilyGraph) snapshot and a
//! [`LayoutRequest`] into a [`Layout`]: grid positions for each person box,
//! connector lines for parentage and partnership, and partner labels.
//!
//! ```
//! use famgrid_core::{FamilyGraph, Gender, ParentKind, Person};
//! use famgrid_layout::{LayoutRequest, build_full_tree};
//!
//! let mut graph: FamilyGraph = [
//!     Person::new("mum", "Mum", Gender::Female),
//!     Person::new("kid", "Kid", Gender::Other),
//! ]
//! .into_iter()
//! .collect();
//! graph.link_parents("kid", Some("mum"), None, ParentKind::Biological);
//!
//! let layout = build_full_tree(&graph, &LayoutRequest::new("mum").depths(0, 1, 0)).unwrap();
//! assert_eq!(layout.entity("kid").map(|e| e.y), Some(1));
//! ```
//!
//! Every build is a pure function of its inputs. Cycles in the graph (for
//! example a remarriage loop) are cut by visited sets scoped to the single
//! build, so the work done is proportional to the distinct couples and child
//! groups reached, not to the number of paths through the graph.

pub mod cache;
pub mod canvas;
pub mod classify;
pub mod layout;
pub mod order;
pub mod request;
pub mod tree;

mod ancestors;
mod context;
mod descendants;
mod siblings;

pub use cache::{LayoutCache, LayoutCacheKey, LayoutCacheStats, structural_signature};
pub use canvas::{Canvas, Entity, Line, LineKind, LineStyle, PartnerLabel, RowExtent, Side};
pub use layout::Layout;
pub use request::{Depths, DisplayOptions, LayoutRequest, LayoutTuning};
pub use tree::{LayoutEngine, build_full_tree};
