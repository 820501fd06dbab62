#![forbid(unsafe_code)]

//! Canvas accumulator: the mutable bookkeeping every builder writes into.
//!
//! Each recursive builder produces a self-contained [`Canvas`] laid out
//! around its own focal entity at `(0, 0)`. Parents compose children with
//! [`Canvas::merge`] (translate-and-append) or one of the packing helpers
//! built on it, so no global coordinate state is threaded through the
//! recursion.
//!
//! # Invariants
//!
//! 1. Row extents always equal the envelope of entity slots on that row.
//! 2. The bounding box always covers every entity slot.
//! 3. A person placed twice keeps its canonical key (the person id); later
//!    placements get `"{id}#{n}"` keys with `n` counting up from 1 and a
//!    `duplicate_of` back-pointer. Keys are deterministic.
//! 4. The canonical key of a person always holds that person. A duplicate
//!    whose generated key equals a real id is renumbered when that person
//!    is placed.
//! 5. [`Canvas::place_beside`] and [`Canvas::place_box`] never produce
//!    overlapping slots on a shared row.

use std::collections::BTreeMap;

use famgrid_core::{Bounds, GridPoint, PersonId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::layout::Layout;

const EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Horizontal side relative to an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// `-1.0` for left, `+1.0` for right.
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// What a connector line expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Parent to biological child.
    Biological,
    /// Parent to adopted, fostered, step or guarded child.
    NonBiological,
    /// Current partnership.
    Partner,
    /// Separated or divorced partnership.
    FormerPartner,
}

/// Stroke style. Dashed marks collapsed or inferred connections: stubs for
/// content below the depth limit and links to a group drawn elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub from: GridPoint,
    pub to: GridPoint,
    pub kind: LineKind,
    pub style: LineStyle,
}

impl Line {
    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            from: self.from.translate(dx, dy),
            to: self.to.translate(dx, dy),
            ..self
        }
    }

    #[must_use]
    pub fn mirrored(self) -> Self {
        Self {
            from: self.from.mirrored(),
            to: self.to.mirrored(),
            ..self
        }
    }
}

/// Annotation slot for two partners that are not drawn side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerLabel {
    pub a: PersonId,
    pub b: PersonId,
    pub from_x: f64,
    pub to_x: f64,
    pub y: f64,
    /// The label sits above a raised connector rather than on the row.
    pub above: bool,
}

/// A placed person box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical person id, also for duplicates.
    pub person: PersonId,
    pub x: f64,
    pub y: i32,
    pub focal: bool,
    pub marked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<PersonId>,
}

impl Entity {
    /// The unit slot this entity occupies.
    #[inline]
    pub fn slot(&self) -> Bounds {
        Bounds::slot(self.x, f64::from(self.y))
    }

    #[inline]
    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }
}

/// Left/right envelope of entity slots on one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowExtent {
    pub left: f64,
    pub right: f64,
}

impl RowExtent {
    fn overlaps(&self, left: f64, right: f64) -> bool {
        left < self.right - EPS && right > self.left + EPS
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Per-invocation layout accumulator.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    bounds: Option<Bounds>,
    rows: BTreeMap<i32, RowExtent>,
    lines: Vec<Line>,
    labels: Vec<PartnerLabel>,
    entities: BTreeMap<String, Entity>,
    occurrences: FxHashMap<PersonId, u32>,
}

impl Canvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no entity has been placed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    #[inline]
    pub fn row(&self, y: i32) -> Option<RowExtent> {
        self.rows.get(&y).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, RowExtent)> + '_ {
        self.rows.iter().map(|(y, extent)| (*y, *extent))
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entities.iter().map(|(key, e)| (key.as_str(), e))
    }

    #[inline]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    pub fn labels(&self) -> &[PartnerLabel] {
        &self.labels
    }

    /// Position of the canonical placement of `id`.
    pub fn position_of(&self, id: &str) -> Option<(f64, i32)> {
        self.entities.get(id).map(|e| (e.x, e.y))
    }

    /// Place a box for `person` at `(x, y)` and return its entity key.
    ///
    /// A second placement of the same person is kept under a duplicate key
    /// instead of overwriting the first.
    pub fn add_entity(&mut self, person: &PersonId, x: f64, y: i32, focal: bool) -> String {
        self.insert(Entity {
            person: person.clone(),
            x,
            y,
            focal,
            marked: false,
            duplicate_of: None,
        })
    }

    fn insert(&mut self, mut entity: Entity) -> String {
        let slot = entity.slot();
        self.bounds = Some(self.bounds.map_or(slot, |b| b.union(slot)));
        self.rows
            .entry(entity.y)
            .and_modify(|row| {
                row.left = row.left.min(slot.left());
                row.right = row.right.max(slot.right());
            })
            .or_insert(RowExtent {
                left: slot.left(),
                right: slot.right(),
            });

        let canonical = entity.person.as_str().to_owned();
        match self.entities.get(&canonical).map(Entity::is_duplicate) {
            None => {
                entity.duplicate_of = None;
                self.entities.insert(canonical.clone(), entity);
                return canonical;
            }
            // Another person's duplicate holds this id as its key; move it aside.
            Some(true) => {
                if let Some(displaced) = self.entities.remove(&canonical) {
                    let key = self.duplicate_key(&displaced.person);
                    self.entities.insert(key, displaced);
                }
                entity.duplicate_of = None;
                self.entities.insert(canonical.clone(), entity);
                return canonical;
            }
            Some(false) => {}
        }

        let key = self.duplicate_key(&entity.person);
        entity.duplicate_of = Some(entity.person.clone());
        self.entities.insert(key.clone(), entity);
        key
    }

    /// Next free `"{id}#{n}"` key for another placement of `person`.
    fn duplicate_key(&mut self, person: &PersonId) -> String {
        let counter = self.occurrences.entry(person.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{person}#{counter}");
            if !self.entities.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn add_line(&mut self, from: GridPoint, to: GridPoint, kind: LineKind, style: LineStyle) {
        self.lines.push(Line {
            from,
            to,
            kind,
            style,
        });
    }

    pub fn add_partner_label(&mut self, label: PartnerLabel) {
        self.labels.push(label);
    }

    /// Connect a parent anchor to a row of children.
    ///
    /// Draws a drop from `top` to the bar at `bar_y`, a horizontal bar across
    /// the drop and every child, and a drop from the bar to each child at row
    /// `child_y`. Biological and non-biological children get separate bars
    /// when both are present; the non-biological bar sits 0.1 lower.
    pub fn add_family_bus(&mut self, top: GridPoint, bar_y: f64, child_y: f64, children: &[(f64, LineKind)]) {
        let mixed = children.iter().any(|(_, k)| *k == LineKind::Biological)
            && children.iter().any(|(_, k)| *k == LineKind::NonBiological);
        for kind in [LineKind::Biological, LineKind::NonBiological] {
            let xs: Vec<f64> = children
                .iter()
                .filter(|(_, k)| *k == kind)
                .map(|(x, _)| *x)
                .collect();
            if xs.is_empty() {
                continue;
            }
            let by = if mixed && kind == LineKind::NonBiological {
                bar_y + 0.1
            } else {
                bar_y
            };
            self.add_line(top, GridPoint::new(top.x, by), kind, LineStyle::Solid);
            let lo = xs.iter().copied().fold(top.x, f64::min);
            let hi = xs.iter().copied().fold(top.x, f64::max);
            if hi - lo > EPS {
                self.add_line(GridPoint::new(lo, by), GridPoint::new(hi, by), kind, LineStyle::Solid);
            }
            for x in xs {
                self.add_line(GridPoint::new(x, by), GridPoint::new(x, child_y), kind, LineStyle::Solid);
            }
        }
    }

    /// Flag the canonical placement of `id` as the layout focus.
    pub fn set_focal(&mut self, id: &str) -> bool {
        self.entities.get_mut(id).map(|e| e.focal = true).is_some()
    }

    /// Flag the canonical placement of `id` as marked.
    pub fn set_marked(&mut self, id: &str) -> bool {
        self.entities.get_mut(id).map(|e| e.marked = true).is_some()
    }

    // -----------------------------------------------------------------------
    // Composition
    // -----------------------------------------------------------------------

    /// Translate every entity, line and label of `sub` by `(dx, dy)` and
    /// append them here.
    pub fn merge(&mut self, sub: Canvas, dx: f64, dy: i32) {
        let fdy = f64::from(dy);
        for (_, mut entity) in sub.entities {
            entity.x += dx;
            entity.y += dy;
            self.insert(entity);
        }
        self.lines
            .extend(sub.lines.into_iter().map(|l| l.translate(dx, fdy)));
        self.labels.extend(sub.labels.into_iter().map(|mut label| {
            label.from_x += dx;
            label.to_x += dx;
            label.y += fdy;
            label
        }));
    }

    /// Smallest (right) or largest (left) horizontal offset at which `sub`,
    /// shifted down by `dy`, sits entirely beside this canvas on every row
    /// they share. `None` when they share no rows.
    pub fn clearance(&self, sub: &Canvas, dy: i32, side: Side, spacing: f64) -> Option<f64> {
        let mut needed: Option<f64> = None;
        for (y, extent) in &sub.rows {
            let Some(existing) = self.rows.get(&(y + dy)) else {
                continue;
            };
            let offset = match side {
                Side::Right => existing.right - extent.left + spacing,
                Side::Left => existing.left - extent.right - spacing,
            };
            needed = Some(match (needed, side) {
                (None, _) => offset,
                (Some(n), Side::Right) => n.max(offset),
                (Some(n), Side::Left) => n.min(offset),
            });
        }
        needed
    }

    /// Merge `sub` as close to `desired_dx` as possible without crossing
    /// existing content; collisions push it toward `side`. Returns the
    /// offset used.
    pub fn place_beside(
        &mut self,
        sub: Canvas,
        desired_dx: f64,
        dy: i32,
        side: Side,
        spacing: f64,
    ) -> f64 {
        let dx = match (self.clearance(&sub, dy, side, spacing), side) {
            (None, _) => desired_dx,
            (Some(c), Side::Right) => desired_dx.max(c),
            (Some(c), Side::Left) => desired_dx.min(c),
        };
        self.merge(sub, dx, dy);
        dx
    }

    /// Place a single box near `desired_x` on row `y`. If the slot would
    /// intersect the row's envelope the box goes just past it on `push`.
    pub fn place_box(
        &mut self,
        person: &PersonId,
        desired_x: f64,
        y: i32,
        push: Side,
        spacing: f64,
    ) -> (String, f64) {
        let x = match self.rows.get(&y) {
            Some(extent) if extent.overlaps(desired_x - 0.5 - spacing, desired_x + 0.5 + spacing) => {
                match push {
                    Side::Right => extent.right + 0.5 + spacing,
                    Side::Left => extent.left - 0.5 - spacing,
                }
            }
            _ => desired_x,
        };
        (self.add_entity(person, x, y, false), x)
    }

    /// Shift everything by `(dx, dy)` in place.
    pub fn translate(&mut self, dx: f64, dy: i32) {
        let fdy = f64::from(dy);
        for entity in self.entities.values_mut() {
            entity.x += dx;
            entity.y += dy;
        }
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|(y, extent)| {
                (
                    y + dy,
                    RowExtent {
                        left: extent.left + dx,
                        right: extent.right + dx,
                    },
                )
            })
            .collect();
        for line in &mut self.lines {
            *line = line.translate(dx, fdy);
        }
        for label in &mut self.labels {
            label.from_x += dx;
            label.to_x += dx;
            label.y += fdy;
        }
        self.bounds = self.bounds.map(|b| b.translate(dx, fdy));
    }

    /// Reflect the whole canvas across `x = 0`.
    pub fn mirror(&mut self) {
        for entity in self.entities.values_mut() {
            entity.x = -entity.x;
        }
        for extent in self.rows.values_mut() {
            *extent = RowExtent {
                left: -extent.right,
                right: -extent.left,
            };
        }
        for line in &mut self.lines {
            *line = line.mirrored();
        }
        for label in &mut self.labels {
            let (from, to) = (-label.to_x, -label.from_x);
            label.from_x = from;
            label.to_x = to;
        }
        self.bounds = self.bounds.map(Bounds::mirrored);
    }

    /// Freeze into the output layout.
    #[must_use]
    pub fn into_layout(self) -> Layout {
        Layout {
            entities: self.entities,
            lines: self.lines,
            labels: self.labels,
            bounds: self.bounds.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PersonId {
        PersonId::from(s)
    }

    fn single(name: &str) -> Canvas {
        let mut c = Canvas::new();
        c.add_entity(&id(name), 0.0, 0, false);
        c
    }

    #[test]
    fn single_entity_has_unit_bounds() {
        let c = single("a");
        let b = c.bounds().unwrap();
        assert_eq!((b.width(), b.height()), (1.0, 1.0));
        assert_eq!(c.row(0), Some(RowExtent { left: -0.5, right: 0.5 }));
    }

    #[test]
    fn duplicate_placement_gets_deterministic_key() {
        let mut c = Canvas::new();
        assert_eq!(c.add_entity(&id("a"), 0.0, 0, false), "a");
        assert_eq!(c.add_entity(&id("a"), 2.0, 0, false), "a#1");
        assert_eq!(c.add_entity(&id("a"), 4.0, 1, false), "a#2");
        let dups: Vec<_> = c.entities().filter(|(_, e)| e.is_duplicate()).collect();
        assert_eq!(dups.len(), 2);
        assert!(dups.iter().all(|(_, e)| e.duplicate_of == Some(id("a"))));
        assert_eq!(c.position_of("a"), Some((0.0, 0)));
    }

    #[test]
    fn merge_translates_everything() {
        let mut sub = single("b");
        sub.add_line(
            GridPoint::new(0.0, 0.0),
            GridPoint::new(0.0, 0.5),
            LineKind::Biological,
            LineStyle::Dashed,
        );
        sub.add_partner_label(PartnerLabel {
            a: id("b"),
            b: id("c"),
            from_x: 0.0,
            to_x: 2.0,
            y: 0.0,
            above: false,
        });

        let mut target = single("a");
        target.merge(sub, 3.0, 2);

        assert_eq!(target.position_of("b"), Some((3.0, 2)));
        assert_eq!(target.lines()[0].from, GridPoint::new(3.0, 2.0));
        assert_eq!(target.labels()[0].to_x, 5.0);
        assert_eq!(target.row(2), Some(RowExtent { left: 2.5, right: 3.5 }));
        assert_eq!(target.bounds().unwrap().bottom(), 2.5);
    }

    #[test]
    fn merge_renames_colliding_people() {
        let mut target = single("a");
        target.merge(single("a"), 1.0, 0);
        assert_eq!(target.position_of("a"), Some((0.0, 0)));
        let dup = target.entities().find(|(k, _)| *k == "a#1").map(|(_, e)| e.x);
        assert_eq!(dup, Some(1.0));
    }

    #[test]
    fn real_id_shaped_like_a_duplicate_key_keeps_its_key() {
        let mut c = single("a");
        assert_eq!(c.add_entity(&id("a"), 2.0, 0, false), "a#1");
        // A person whose id is literally "a#1" takes the key back.
        assert_eq!(c.add_entity(&id("a#1"), 4.0, 0, false), "a#1");

        let placed = |person: &str| -> Vec<(String, f64)> {
            c.entities()
                .filter(|(_, e)| e.person.as_str() == person)
                .map(|(k, e)| (k.to_owned(), e.x))
                .collect()
        };
        assert_eq!(placed("a"), vec![("a".to_owned(), 0.0), ("a#2".to_owned(), 2.0)]);
        assert_eq!(placed("a#1"), vec![("a#1".to_owned(), 4.0)]);
        assert!(c.entities().all(|(k, e)| e.is_duplicate() || k == e.person.as_str()));

        // Merging in the other order ends the same way.
        let mut target = single("a#1");
        let mut sub = single("a");
        sub.add_entity(&id("a"), 1.0, 0, false);
        target.merge(sub, 3.0, 0);
        assert_eq!(target.position_of("a#1"), Some((0.0, 0)));
        assert_eq!(target.position_of("a"), Some((3.0, 0)));
        let dup = target.entities().find(|(_, e)| e.is_duplicate()).map(|(k, e)| (k.to_owned(), e.x));
        assert_eq!(dup, Some(("a#2".to_owned(), 4.0)));
    }

    #[test]
    fn clearance_packs_against_every_shared_row() {
        let mut target = single("a");
        target.add_entity(&id("a2"), 3.0, 1, false);

        let mut sub = single("b");
        sub.add_entity(&id("b2"), -1.0, 1, false);

        // Row 0 needs dx >= 1, row 1 needs dx >= 5.
        assert_eq!(target.clearance(&sub, 0, Side::Right, 0.0), Some(5.0));
        // Row 0 needs dx <= -1, row 1 needs dx <= 3.
        assert_eq!(target.clearance(&sub, 0, Side::Left, 0.0), Some(-1.0));
        assert_eq!(target.clearance(&sub, 5, Side::Right, 0.0), None);
    }

    #[test]
    fn place_beside_respects_desired_when_clear() {
        let mut target = single("a");
        let dx = target.place_beside(single("b"), 4.0, 0, Side::Right, 0.0);
        assert_eq!(dx, 4.0);
        let dx = target.place_beside(single("c"), 0.0, 0, Side::Right, 0.0);
        assert_eq!(dx, 4.5 + 0.5);
    }

    #[test]
    fn place_box_pushes_out_of_envelope() {
        let mut target = single("a");
        target.add_entity(&id("b"), 1.0, 0, false);
        let (_, x) = target.place_box(&id("c"), 0.5, 0, Side::Left, 0.0);
        assert_eq!(x, -1.0);
        let (_, x) = target.place_box(&id("d"), 5.0, 0, Side::Left, 0.0);
        assert_eq!(x, 5.0);
    }

    #[test]
    fn mirror_reflects_geometry() {
        let mut c = single("a");
        c.add_entity(&id("b"), 2.0, 1, false);
        c.add_line(
            GridPoint::new(0.0, 0.0),
            GridPoint::new(2.0, 1.0),
            LineKind::Biological,
            LineStyle::Solid,
        );
        c.add_partner_label(PartnerLabel {
            a: id("a"),
            b: id("b"),
            from_x: 0.0,
            to_x: 2.0,
            y: 0.0,
            above: true,
        });
        c.mirror();
        assert_eq!(c.position_of("b"), Some((-2.0, 1)));
        assert_eq!(c.lines()[0].to, GridPoint::new(-2.0, 1.0));
        assert_eq!((c.labels()[0].from_x, c.labels()[0].to_x), (-2.0, 0.0));
        assert_eq!(c.row(1), Some(RowExtent { left: -2.5, right: -1.5 }));
        assert_eq!(c.bounds().unwrap().left(), -2.5);
    }

    #[test]
    fn translate_moves_rows_and_bounds() {
        let mut c = single("a");
        c.translate(-1.0, -2);
        assert_eq!(c.position_of("a"), Some((-1.0, -2)));
        assert_eq!(c.row(-2), Some(RowExtent { left: -1.5, right: -0.5 }));
        assert!(c.row(0).is_none());
        assert_eq!(c.bounds().unwrap().top(), -2.5);
    }

    #[test]
    fn family_bus_for_two_children() {
        let mut c = Canvas::new();
        c.add_family_bus(
            GridPoint::new(0.5, 0.0),
            0.5,
            1.0,
            &[(0.0, LineKind::Biological), (1.0, LineKind::Biological)],
        );
        // Drop, bar, two child drops.
        assert_eq!(c.lines().len(), 4);
        assert_eq!(c.lines()[1].from, GridPoint::new(0.0, 0.5));
        assert_eq!(c.lines()[1].to, GridPoint::new(1.0, 0.5));
    }

    #[test]
    fn family_bus_splits_mixed_kinds() {
        let mut c = Canvas::new();
        c.add_family_bus(
            GridPoint::new(0.0, 0.0),
            0.5,
            1.0,
            &[(0.0, LineKind::Biological), (1.0, LineKind::NonBiological)],
        );
        // Biological: drop + child drop (no bar, the child sits under the
        // anchor). Non-biological: drop + bar + child drop.
        assert_eq!(c.lines().len(), 5);
        let non_bio: Vec<_> = c
            .lines()
            .iter()
            .filter(|l| l.kind == LineKind::NonBiological)
            .collect();
        assert_eq!(non_bio.len(), 3);
        assert!(non_bio.iter().any(|l| (l.from.y - 0.6).abs() < 1e-9 && l.to.x == 1.0));
    }

    #[test]
    fn focal_and_marked_flags() {
        let mut c = single("a");
        assert!(c.set_focal("a"));
        assert!(c.set_marked("a"));
        assert!(!c.set_marked("zz"));
        let (_, e) = c.entities().next().unwrap();
        assert!(e.focal && e.marked);
    }
}
