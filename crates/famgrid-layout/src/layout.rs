#![forbid(unsafe_code)]

//! The finished layout handed to renderers.

use std::collections::BTreeMap;

use famgrid_core::Bounds;
use serde::{Deserialize, Serialize};

use crate::canvas::{Entity, Line, LineKind, PartnerLabel};

/// Entity positions, connector lines, partner labels and overall bounds, all
/// in grid units.
///
/// Entities are keyed by person id; a person placed more than once gets
/// further entries under `"{id}#{n}"` keys. The key equal to a person's id
/// always holds that person, even when the id itself contains `#`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub entities: BTreeMap<String, Entity>,
    pub lines: Vec<Line>,
    pub labels: Vec<PartnerLabel>,
    pub bounds: Bounds,
}

impl Layout {
    /// Canonical placement of `id`.
    #[inline]
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Every placement of `id`, canonical first.
    pub fn placements<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entity(id).into_iter().chain(
            self.entities
                .values()
                .filter(move |e| e.duplicate_of.as_ref().is_some_and(|d| d.as_str() == id)),
        )
    }

    /// The entity whose slot contains grid point `(x, y)`.
    ///
    /// Slots are half-open so a point on a shared edge hits exactly one box.
    pub fn entity_at(&self, x: f64, y: f64) -> Option<(&str, &Entity)> {
        self.entities
            .iter()
            .find(|(_, e)| e.slot().contains(x, y))
            .map(|(key, e)| (key.as_str(), e))
    }

    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }

    /// The focal entity.
    pub fn focal(&self) -> Option<&Entity> {
        self.entities.values().find(|e| e.focal)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
