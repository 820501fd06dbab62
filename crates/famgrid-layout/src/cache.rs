#![forbid(unsafe_code)]

//! Layout cache for memoizing the most recent full-tree result.
//!
//! [`LayoutCache`] holds a single slot: the key and result of the last
//! computation. Callers re-rendering an unchanged tree get the previous
//! [`Layout`] back behind the same [`Arc`], so downstream code can skip work
//! with a pointer comparison.
//!
//! # Usage
//!
//! ```
//! use famgrid_core::{FamilyGraph, Gender, Person};
//! use famgrid_layout::{LayoutCache, LayoutEngine, LayoutRequest};
//! use std::sync::Arc;
//!
//! let graph: FamilyGraph = [Person::new("p1", "Ada", Gender::Female)].into_iter().collect();
//! let engine = LayoutEngine::default();
//! let request = LayoutRequest::new("p1").depths(1, 1, 1);
//!
//! let mut cache = LayoutCache::new();
//! let first = cache.layout(&engine, &graph, &request).unwrap();
//! let second = cache.layout(&engine, &graph, &request).unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```
//!
//! # Invalidation
//!
//! The key carries a structural signature of the whole graph, so any change
//! that can move a box (a new child, a changed birth date, a retagged parent
//! slot) misses the cache without explicit invalidation.
//!
//! # Concurrency
//!
//! The cache is plain `&mut self` state. Share it across threads only
//! behind external locking.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use famgrid_core::{FamilyGraph, PersonId, Result};
use rustc_hash::FxHasher;

use crate::layout::Layout;
use crate::request::{Depths, DisplayOptions, LayoutRequest, LayoutTuning};
use crate::tree::LayoutEngine;

/// Digest of every person field that can affect placement, in id order.
#[must_use]
pub fn structural_signature(graph: &FamilyGraph) -> u64 {
    let mut hasher = FxHasher::default();
    graph.len().hash(&mut hasher);
    for person in graph.iter() {
        person.id.hash(&mut hasher);
        person.gender.hash(&mut hasher);
        person.birth.hash(&mut hasher);
        person.death.hash(&mut hasher);
        person.parents.hash(&mut hasher);
        person.children.hash(&mut hasher);
        person.partners.len().hash(&mut hasher);
        for (partner, details) in &person.partners {
            partner.hash(&mut hasher);
            details.hash(&mut hasher);
        }
        person.spouse.hash(&mut hasher);
        person.order.hash(&mut hasher);
        person.index.hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_tuning(tuning: &LayoutTuning) -> u64 {
    let mut hasher = FxHasher::default();
    for value in [
        tuning.max_parent_drift,
        tuning.annotation_gap,
        tuning.divorce_gap,
        tuning.max_extra_gap,
        tuning.sibling_spacing,
    ] {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Key for layout cache lookups: every input that affects the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutCacheKey {
    pub focal: PersonId,
    pub marked: Option<PersonId>,
    pub depths: Depths,
    pub flip: bool,
    pub display: DisplayOptions,
    /// Fingerprint of the engine tuning.
    pub tuning_hash: u64,
    /// [`structural_signature`] of the graph.
    pub signature: u64,
}

impl LayoutCacheKey {
    pub fn new(graph: &FamilyGraph, request: &LayoutRequest, tuning: &LayoutTuning) -> Self {
        Self {
            focal: request.focal.clone(),
            marked: request.marked.clone(),
            depths: request.depths,
            flip: request.flip,
            display: request.display,
            tuning_hash: hash_tuning(tuning),
            signature: structural_signature(graph),
        }
    }
}

/// How often requests were answered from the remembered layout.
#[derive(Debug, Clone, Default)]
pub struct LayoutCacheStats {
    /// Number of entries currently cached (0 or 1).
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Share of requests that reused the slot; 0.0 before the first request.
    pub hit_rate: f64,
}

/// Single-slot cache of the most recent layout.
#[derive(Debug, Default)]
pub struct LayoutCache {
    last: Option<(LayoutCacheKey, Arc<Layout>)>,
    hits: u64,
    misses: u64,
}

impl LayoutCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached layout for `key`, or run `compute` and cache its
    /// result. Errors are returned as-is and leave the slot untouched.
    pub fn get_or_compute<F>(&mut self, key: LayoutCacheKey, compute: F) -> Result<Arc<Layout>>
    where
        F: FnOnce() -> Result<Layout>,
    {
        if let Some((cached, layout)) = &self.last
            && *cached == key
        {
            self.hits += 1;
            tracing::trace!(target: "famgrid.cache", focal = %key.focal, "layout cache hit");
            return Ok(Arc::clone(layout));
        }

        self.misses += 1;
        tracing::trace!(target: "famgrid.cache", focal = %key.focal, "layout cache miss");
        let layout = Arc::new(compute()?);
        self.last = Some((key, Arc::clone(&layout)));
        Ok(layout)
    }

    /// Lay out `request` with `engine`, going through the cache.
    pub fn layout(
        &mut self,
        engine: &LayoutEngine,
        graph: &FamilyGraph,
        request: &LayoutRequest,
    ) -> Result<Arc<Layout>> {
        let key = LayoutCacheKey::new(graph, request, engine.tuning());
        self.get_or_compute(key, || engine.build(graph, request))
    }

    /// Snapshot of the slot and its hit/miss counters.
    pub fn stats(&self) -> LayoutCacheStats {
        let total = self.hits + self.misses;
        LayoutCacheStats {
            entries: self.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Zero the hit/miss counters; the remembered layout stays.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Drop the cached layout.
    #[inline]
    pub fn clear(&mut self) {
        self.last = None;
    }

    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.last.is_some())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}
