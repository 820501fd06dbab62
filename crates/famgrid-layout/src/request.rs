#![forbid(unsafe_code)]

//! Layout request parameters and engine tuning.

use famgrid_core::PersonId;
use serde::{Deserialize, Serialize};

/// How many generations to draw in each direction. `0` disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Depths {
    pub ancestors: u8,
    pub descendants: u8,
    pub siblings: u8,
}

impl Depths {
    #[must_use]
    pub const fn new(ancestors: u8, descendants: u8, siblings: u8) -> Self {
        Self {
            ancestors,
            descendants,
            siblings,
        }
    }
}

/// Which partnership annotations the renderer will draw. Each enabled
/// annotation with a real date widens the partner gap to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub marriage_dates: bool,
    pub divorce_dates: bool,
    pub relationship_dates: bool,
}

/// One layout request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayoutRequest {
    /// May be omitted in a partial request that a caller completes later.
    #[serde(default)]
    pub focal: PersonId,
    #[serde(default)]
    pub marked: Option<PersonId>,
    #[serde(default)]
    pub depths: Depths,
    /// Mirror the layout horizontally.
    #[serde(default)]
    pub flip: bool,
    #[serde(default)]
    pub display: DisplayOptions,
}

impl LayoutRequest {
    #[must_use]
    pub fn new(focal: impl Into<PersonId>) -> Self {
        Self {
            focal: focal.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depths(mut self, ancestors: u8, descendants: u8, siblings: u8) -> Self {
        self.depths = Depths::new(ancestors, descendants, siblings);
        self
    }

    #[must_use]
    pub fn marked(mut self, marked: impl Into<PersonId>) -> Self {
        self.marked = Some(marked.into());
        self
    }

    #[must_use]
    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    #[must_use]
    pub fn display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

/// Spacing constants of the engine, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    /// How far a parent pair may drift from the child's column toward the
    /// center of the sibling row.
    pub max_parent_drift: f64,
    /// Extra partner gap for a shown marriage or relationship date.
    pub annotation_gap: f64,
    /// Extra partner gap for a shown divorce date.
    pub divorce_gap: f64,
    /// Cap on the total extra partner gap.
    pub max_extra_gap: f64,
    /// Extra space between packed subtrees.
    pub sibling_spacing: f64,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            max_parent_drift: 2.0,
            annotation_gap: 0.6,
            divorce_gap: 0.5,
            max_extra_gap: 1.1,
            sibling_spacing: 0.0,
        }
    }
}
