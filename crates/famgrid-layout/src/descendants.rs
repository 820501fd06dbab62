#![forbid(unsafe_code)]

//! Descendant tree builder.
//!
//! Builds a self-contained canvas around one person at `(0, 0)`: the primary
//! partner beside them, additional partners further out on the free side,
//! and every child group hung one row below, recursing until the depth
//! budget runs out.
//!
//! # Invariants
//!
//! 1. The person is the canonical entity at `(0, 0)` of the returned canvas.
//! 2. A couple or child group already drawn in this invocation is never
//!    recursed into again. A dashed connector marks where it would hang.
//! 3. At depth 0 only the person's box is drawn, plus a dashed stub when
//!    children exist below the cut.
//!
//! # Child groups
//!
//! A child joins the first group its parent-set slots match, in priority
//! order: both partners, the person with an additional partner, the person
//! with someone else, the partner with someone else, the person alone, the
//! partner alone.

use std::collections::BTreeMap;

use famgrid_core::{GridPoint, ParentSet, PartnerKind, Partnership, Person, PersonId};

use crate::canvas::{Canvas, LineKind, LineStyle, PartnerLabel, Side};
use crate::classify::{child_line_kind, spouse_side};
use crate::context::{BuildContext, GroupKey};
use crate::order::{compare_partners, compare_people};

const EPS: f64 = 1e-9;
const ORIGIN: GridPoint = GridPoint::new(0.0, 0.0);

// Bar heights keep buses of neighbouring groups from coinciding.
const COUPLE_BAR: f64 = 0.5;
pub(crate) const SIDE_BAR: f64 = 0.4;
pub(crate) const EXTRA_BAR: f64 = 0.6;

/// A child together with the parent-set slot that attaches it to a group.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildRef<'g> {
    pub(crate) person: &'g Person,
    pub(crate) slot: usize,
}

impl ChildRef<'_> {
    #[inline]
    pub(crate) fn line_kind(&self) -> LineKind {
        child_line_kind(self.person, self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Couple,
    WithExtra(usize),
    FocalOther(PersonId),
    SpouseOther(PersonId),
    FocalAlone,
    SpouseAlone,
}

impl Bucket {
    /// Placement order: nearest-to-anchor groups first.
    fn placement_rank(&self) -> u8 {
        match self {
            Self::Couple => 0,
            Self::FocalAlone => 1,
            Self::FocalOther(_) => 2,
            Self::SpouseAlone => 3,
            Self::SpouseOther(_) => 4,
            Self::WithExtra(_) => 5,
        }
    }
}

/// Children of `parent` that exist and carry a slot naming `parent`.
pub(crate) fn drawable_children<'g>(ctx: &BuildContext<'g>, parent: &Person) -> Vec<&'g Person> {
    let mut out: Vec<&'g Person> = Vec::new();
    for id in &parent.children {
        let Some(child) = ctx.lookup(id, "child", &parent.id) else {
            continue;
        };
        if !child.has_parent(parent.id.as_str()) {
            tracing::debug!(
                target: "famgrid.layout",
                parent = %parent.id,
                child = %id,
                "child has no parent slot naming this parent"
            );
            continue;
        }
        if !out.iter().any(|c| c.id == child.id) {
            out.push(child);
        }
    }
    out
}

pub(crate) fn partner_line_kind(details: &Partnership) -> LineKind {
    if details.kind.is_some_and(PartnerKind::is_former) {
        LineKind::FormerPartner
    } else {
        LineKind::Partner
    }
}

/// Partners that exist, most important first.
fn ordered_partners<'g>(ctx: &BuildContext<'g>, person: &'g Person) -> Vec<(&'g Person, &'g Partnership)> {
    let mut partners: Vec<(&'g Person, &'g Partnership)> = person
        .partners
        .iter()
        .filter(|(id, _)| **id != person.id)
        .filter_map(|(id, details)| ctx.lookup(id, "partner", &person.id).map(|p| (p, details)))
        .collect();
    partners.sort_by(|a, b| compare_partners(*a, *b));
    partners
}

/// Index of the primary partner: the spouse pointer when it names a listed
/// partner, else the highest-priority partner.
fn primary_index(ctx: &BuildContext<'_>, person: &Person, partners: &[(&Person, &Partnership)]) -> Option<usize> {
    let pointer = person
        .spouse
        .as_ref()
        .filter(|id| ctx.lookup(id, "spouse", &person.id).is_some());
    pointer
        .and_then(|id| partners.iter().position(|(p, _)| p.id == *id))
        .or_else(|| (!partners.is_empty()).then_some(0))
}

/// The partner drawn directly beside `person`, if any.
pub(crate) fn primary_partner<'g>(ctx: &BuildContext<'g>, person: &'g Person) -> Option<&'g Person> {
    let partners = ordered_partners(ctx, person);
    primary_index(ctx, person, &partners).map(|i| partners[i].0)
}

fn classify_slot(
    set: &ParentSet,
    person: &Person,
    spouse: Option<&Person>,
    extras: &[(&Person, &Partnership)],
) -> Option<Bucket> {
    let me = person.id.as_str();
    if set.contains(me) {
        return Some(match set.other_parent(me) {
            None => Bucket::FocalAlone,
            Some(other) if spouse.is_some_and(|s| s.id == *other) => Bucket::Couple,
            Some(other) => match extras.iter().position(|(p, _)| p.id == *other) {
                Some(i) => Bucket::WithExtra(i),
                None => Bucket::FocalOther(other.clone()),
            },
        });
    }
    let spouse = spouse?;
    let them = spouse.id.as_str();
    if !set.contains(them) {
        return None;
    }
    Some(match set.other_parent(them) {
        None => Bucket::SpouseAlone,
        Some(other) => Bucket::SpouseOther(other.clone()),
    })
}

fn group_children<'g>(
    ctx: &BuildContext<'g>,
    person: &'g Person,
    spouse: Option<&'g Person>,
    extras: &[(&'g Person, &'g Partnership)],
) -> BTreeMap<Bucket, Vec<ChildRef<'g>>> {
    let mut children = drawable_children(ctx, person);
    if let Some(spouse) = spouse {
        for child in drawable_children(ctx, spouse) {
            if !children.iter().any(|c| c.id == child.id) {
                children.push(child);
            }
        }
    }

    let mut groups: BTreeMap<Bucket, Vec<ChildRef<'g>>> = BTreeMap::new();
    for child in children {
        let best = child
            .parent_sets()
            .filter_map(|(slot, set)| classify_slot(set, person, spouse, extras).map(|b| (b, slot)))
            .min();
        if let Some((bucket, slot)) = best {
            groups.entry(bucket).or_default().push(ChildRef { person: child, slot });
        }
    }
    for members in groups.values_mut() {
        members.sort_by(|a, b| compare_people(a.person, b.person));
    }
    groups
}

/// Where a child group hangs: the drop starts at `top`, the bar sits at
/// `bar_y`, and the children go on row `row`, pushed toward `push` when
/// they collide with content already there.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hang {
    pub(crate) top: GridPoint,
    pub(crate) bar_y: f64,
    pub(crate) row: i32,
    pub(crate) push: Side,
}

impl Hang {
    /// Hang on the row below a parent drawn on row 0.
    fn below(top: GridPoint, bar_y: f64, push: Side) -> Self {
        Self { top, bar_y, row: 1, push }
    }
}

/// Build one row of child subtrees packed left to right and hang it under
/// `hang.top`.
pub(crate) fn hang_group<'g>(
    ctx: &mut BuildContext<'g>,
    canvas: &mut Canvas,
    key: GroupKey,
    members: &[ChildRef<'g>],
    hang: Hang,
    depth: u8,
) {
    if members.is_empty() {
        return;
    }
    let top = hang.top;
    if !ctx.visit_children(key) {
        canvas.add_line(top, GridPoint::new(top.x, hang.bar_y), LineKind::Biological, LineStyle::Dashed);
        return;
    }

    let spacing = ctx.tuning.sibling_spacing;
    let mut row = Canvas::new();
    let mut xs: Vec<f64> = Vec::with_capacity(members.len());
    for child in members {
        let sub = build_descendants(ctx, child.person, depth);
        let desired = xs.last().map_or(0.0, |x| x + 1.0 + spacing);
        xs.push(row.place_beside(sub, desired, 0, Side::Right, spacing));
    }

    let center = match (xs.first(), xs.last()) {
        (Some(first), Some(last)) => (first + last) / 2.0,
        _ => 0.0,
    };
    let dx = canvas.place_beside(row, top.x - center, hang.row, hang.push, spacing);
    let bus: Vec<(f64, LineKind)> = xs
        .iter()
        .zip(members)
        .map(|(x, child)| (x + dx, child.line_kind()))
        .collect();
    canvas.add_family_bus(top, hang.bar_y, f64::from(hang.row), &bus);
}

/// Height of the connector to the `index`-th partner drawn on one side,
/// relative to the row. The first is level with the row; later ones rise
/// into a bracket over the partners already drawn.
#[inline]
pub(crate) fn connector_rise(index: usize) -> f64 {
    if index == 0 {
        0.0
    } else {
        -(0.3 + 0.05 * index as f64)
    }
}

/// Connect `person` at `from` to `partner` at `(to_x, from.y)` with the
/// `index`-th connector on that side, labelling it when the two are not
/// adjacent.
pub(crate) fn connect_partner(
    canvas: &mut Canvas,
    (person, partner): (&PersonId, &PersonId),
    from: GridPoint,
    to_x: f64,
    kind: LineKind,
    index: usize,
) {
    let rise = connector_rise(index);
    let bracketed = index > 0;
    let y = from.y + rise;
    if bracketed {
        let corner = GridPoint::new(from.x, y);
        let far = GridPoint::new(to_x, y);
        canvas.add_line(from, corner, kind, LineStyle::Solid);
        canvas.add_line(corner, far, kind, LineStyle::Solid);
        canvas.add_line(far, GridPoint::new(to_x, from.y), kind, LineStyle::Solid);
    } else {
        canvas.add_line(from, GridPoint::new(to_x, from.y), kind, LineStyle::Solid);
    }
    if (to_x - from.x).abs() > 1.0 + EPS {
        canvas.add_partner_label(PartnerLabel {
            a: person.clone(),
            b: partner.clone(),
            from_x: to_x.min(from.x),
            to_x: to_x.max(from.x),
            y,
            above: bracketed,
        });
    }
}

/// Build the descendant subtree of `person` with `depth` generations below.
pub(crate) fn build_descendants<'g>(ctx: &mut BuildContext<'g>, person: &'g Person, depth: u8) -> Canvas {
    let mut canvas = Canvas::new();
    canvas.add_entity(&person.id, 0.0, 0, false);

    if depth == 0 {
        if !drawable_children(ctx, person).is_empty() {
            canvas.add_line(ORIGIN, GridPoint::new(0.0, 0.5), LineKind::Biological, LineStyle::Dashed);
        }
        return canvas;
    }

    let mut partners = ordered_partners(ctx, person);
    let primary = primary_index(ctx, person, &partners).map(|i| partners.remove(i));

    let mut spouse: Option<(&'g Person, f64)> = None;
    let mut free = Side::Right;
    if let Some((partner, details)) = primary {
        let side = spouse_side(ctx.graph, person.id.as_str(), partner.id.as_str());
        free = side.opposite();
        let kind = partner_line_kind(details);
        if ctx.visit_couple(&person.id, &partner.id) {
            let gap = ctx.marriage_gap(Some(details));
            let sx = side.sign() * gap;
            canvas.add_entity(&partner.id, sx, 0, false);
            canvas.add_line(ORIGIN, GridPoint::new(sx, 0.0), kind, LineStyle::Solid);
            if gap > 1.0 + EPS {
                canvas.add_partner_label(PartnerLabel {
                    a: person.id.clone(),
                    b: partner.id.clone(),
                    from_x: sx.min(0.0),
                    to_x: sx.max(0.0),
                    y: 0.0,
                    above: false,
                });
            }
            spouse = Some((partner, sx));
        } else {
            canvas.add_line(ORIGIN, GridPoint::new(side.sign() * 0.5, 0.0), kind, LineStyle::Dashed);
        }
    }

    let extras: Vec<(&'g Person, &'g Partnership)> = partners
        .into_iter()
        .filter(|(p, _)| ctx.visit_couple(&person.id, &p.id))
        .collect();

    let groups = group_children(ctx, person, spouse.map(|(s, _)| s), &extras);
    let mut ordered: Vec<(Bucket, Vec<ChildRef<'g>>)> = groups.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| a.placement_rank().cmp(&b.placement_rank()).then_with(|| a.cmp(b)));

    let mut extra_groups: BTreeMap<usize, Vec<ChildRef<'g>>> = BTreeMap::new();
    for (bucket, members) in ordered {
        let (key, anchor, bar_y, push) = match (&bucket, spouse) {
            (Bucket::Couple, Some((s, sx))) => (GroupKey::pair(&person.id, &s.id), sx / 2.0, COUPLE_BAR, free),
            (Bucket::FocalAlone, _) => (GroupKey::single(&person.id), 0.0, SIDE_BAR, free),
            (Bucket::FocalOther(other), _) => (GroupKey::pair(&person.id, other), 0.0, SIDE_BAR, free),
            (Bucket::SpouseAlone, Some((s, sx))) => (GroupKey::single(&s.id), sx, SIDE_BAR, free.opposite()),
            (Bucket::SpouseOther(other), Some((s, sx))) => {
                (GroupKey::pair(&s.id, other), sx, SIDE_BAR, free.opposite())
            }
            (Bucket::WithExtra(i), _) => {
                extra_groups.insert(*i, members);
                continue;
            }
            // Spouse buckets only arise when a spouse is drawn.
            _ => continue,
        };
        let hang = Hang::below(GridPoint::new(anchor, 0.0), bar_y, push);
        hang_group(ctx, &mut canvas, key, &members, hang, depth - 1);
    }

    let spacing = ctx.tuning.sibling_spacing;
    for (i, (partner, details)) in extras.iter().enumerate() {
        let mut unit = Canvas::new();
        unit.add_entity(&partner.id, 0.0, 0, false);
        if let Some(members) = extra_groups.remove(&i) {
            // The drop leaves the connector just inside the partner's box.
            let top = GridPoint::new(-free.sign() * 0.5, connector_rise(i));
            let key = GroupKey::pair(&person.id, &partner.id);
            hang_group(ctx, &mut unit, key, &members, Hang::below(top, EXTRA_BAR, free), depth - 1);
        }

        let gap = ctx.marriage_gap(Some(*details));
        let dx = canvas.place_beside(unit, free.sign() * gap, 0, free, spacing);
        connect_partner(
            &mut canvas,
            (&person.id, &partner.id),
            ORIGIN,
            dx,
            partner_line_kind(details),
            i,
        );
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{DisplayOptions, LayoutTuning};
    use famgrid_core::{FamilyGraph, Gender, ParentKind};

    fn ctx(graph: &FamilyGraph) -> BuildContext<'_> {
        BuildContext::new(graph, DisplayOptions::default(), LayoutTuning::default())
    }

    fn couple_with_two_children() -> FamilyGraph {
        let mut graph: FamilyGraph = [
            Person::new("p1", "P1", Gender::Male),
            Person::new("p2", "P2", Gender::Female),
            Person::new("c1", "C1", Gender::Other).with_order(1),
            Person::new("c2", "C2", Gender::Other).with_order(2),
        ]
        .into_iter()
        .collect();
        graph.link_partners("p1", "p2", Partnership::of_kind(PartnerKind::Married));
        graph.link_parents("c1", Some("p2"), Some("p1"), ParentKind::Biological);
        graph.link_parents("c2", Some("p2"), Some("p1"), ParentKind::Biological);
        graph
    }

    fn x_of(canvas: &Canvas, id: &str) -> f64 {
        canvas.position_of(id).map(|(x, _)| x).unwrap()
    }

    #[test]
    fn couple_children_hang_under_midpoint() {
        let graph = couple_with_two_children();
        let mut ctx = ctx(&graph);
        let canvas = build_descendants(&mut ctx, graph.get("p1").unwrap(), 1);

        assert_eq!(canvas.entities().count(), 4);
        // Father-role partner sits right, so the mother is on the left.
        assert_eq!(canvas.position_of("p2"), Some((-1.0, 0)));
        assert_eq!(canvas.position_of("c1"), Some((-1.0, 1)));
        assert_eq!(canvas.position_of("c2"), Some((0.0, 1)));
        let partner_lines = canvas.lines().iter().filter(|l| l.kind == LineKind::Partner).count();
        let child_lines = canvas.lines().iter().filter(|l| l.kind == LineKind::Biological).count();
        assert_eq!((partner_lines, child_lines), (1, 4));
        assert!(canvas.labels().is_empty());
    }

    #[test]
    fn zero_depth_draws_stub_only() {
        let graph = couple_with_two_children();
        let mut ctx = ctx(&graph);
        let canvas = build_descendants(&mut ctx, graph.get("p1").unwrap(), 0);
        assert_eq!(canvas.entities().count(), 1);
        assert_eq!(canvas.lines().len(), 1);
        assert_eq!(canvas.lines()[0].style, LineStyle::Dashed);

        let leaf = build_descendants(&mut ctx, graph.get("c1").unwrap(), 0);
        assert!(leaf.lines().is_empty());
    }

    #[test]
    fn additional_partner_goes_to_free_side() {
        let mut graph: FamilyGraph = [
            Person::new("f", "F", Gender::Male),
            Person::new("s", "S", Gender::Female),
            Person::new("x", "X", Gender::Female),
            Person::new("k", "K", Gender::Other),
        ]
        .into_iter()
        .collect();
        graph.link_partners(
            "f",
            "s",
            Partnership::of_kind(PartnerKind::Married).with_marriage("19900101"),
        );
        graph.link_partners(
            "f",
            "x",
            Partnership::of_kind(PartnerKind::Divorced).with_marriage("19800101"),
        );
        graph.set_spouses("f", "s");
        graph.link_parents("k", Some("x"), Some("f"), ParentKind::Biological);

        let mut ctx = ctx(&graph);
        let canvas = build_descendants(&mut ctx, graph.get("f").unwrap(), 1);

        assert_eq!(canvas.position_of("s"), Some((-1.0, 0)));
        assert_eq!(canvas.position_of("x"), Some((1.0, 0)));
        assert_eq!(x_of(&canvas, "k"), 0.5);
        let former = canvas
            .lines()
            .iter()
            .filter(|l| l.kind == LineKind::FormerPartner)
            .count();
        assert_eq!(former, 1);
    }

    #[test]
    fn later_partner_children_drop_from_their_bracket() {
        let mut graph: FamilyGraph = [
            Person::new("f", "F", Gender::Male),
            Person::new("s", "S", Gender::Female),
            Person::new("x1", "X1", Gender::Female),
            Person::new("x2", "X2", Gender::Female),
            Person::new("x3", "X3", Gender::Female),
        ]
        .into_iter()
        .collect();
        graph.link_partners("f", "s", Partnership::of_kind(PartnerKind::Married));
        graph.set_spouses("f", "s");
        graph.link_partners(
            "f",
            "x2",
            Partnership::of_kind(PartnerKind::Divorced).with_marriage("19800101"),
        );
        graph.link_partners("f", "x3", Partnership::of_kind(PartnerKind::Engaged));
        graph.link_partners("f", "x1", Partnership::of_kind(PartnerKind::Dating));
        for (kid, mother) in [("k1", "x1"), ("k2", "x2"), ("k3", "x3")] {
            graph.insert(Person::new(kid, kid, Gender::Other));
            graph.link_parents(kid, Some(mother), Some("f"), ParentKind::Biological);
        }

        let mut ctx = ctx(&graph);
        let canvas = build_descendants(&mut ctx, graph.get("f").unwrap(), 1);

        // Former marriage, then engagement, then dating, outward.
        assert_eq!(canvas.position_of("x2"), Some((1.0, 0)));
        assert_eq!(canvas.position_of("x3"), Some((2.0, 0)));
        assert_eq!(canvas.position_of("x1"), Some((3.0, 0)));
        assert_eq!(canvas.labels().len(), 2);
        assert!(canvas.labels().iter().all(|l| l.above && l.y < 0.0));

        for (kid, rise) in [("k2", 0.0), ("k3", connector_rise(1)), ("k1", connector_rise(2))] {
            let kx = x_of(&canvas, kid);
            let drop = canvas
                .lines()
                .iter()
                .find(|l| l.kind == LineKind::Biological && l.from.x == kx && l.to.y == EXTRA_BAR)
                .unwrap_or_else(|| panic!("no drop above {kid}"));
            assert!((drop.from.y - rise).abs() < 1e-9, "{kid} drops from {:?}", drop.from);
            // The drop starts on a horizontal connector segment of its own partner.
            let on_connector = canvas.lines().iter().any(|l| {
                matches!(l.kind, LineKind::Partner | LineKind::FormerPartner)
                    && l.from.y == l.to.y
                    && (l.from.y - drop.from.y).abs() < 1e-9
                    && l.from.x.min(l.to.x) <= kx
                    && kx <= l.from.x.max(l.to.x)
            });
            assert!(on_connector, "{kid} drop at {kx} misses its connector");
        }
    }

    #[test]
    fn widened_gap_emits_label() {
        let mut graph = couple_with_two_children();
        graph.link_partners(
            "p1",
            "p2",
            Partnership::of_kind(PartnerKind::Married).with_marriage("19700101"),
        );
        let display = DisplayOptions {
            marriage_dates: true,
            ..DisplayOptions::default()
        };
        let mut ctx = BuildContext::new(&graph, display, LayoutTuning::default());
        let canvas = build_descendants(&mut ctx, graph.get("p1").unwrap(), 1);
        assert_eq!(canvas.labels().len(), 1);
        assert!(!canvas.labels()[0].above);
        assert!((x_of(&canvas, "p2") + 1.6).abs() < 1e-9);
    }

    #[test]
    fn revisited_couple_is_a_stub() {
        let graph = couple_with_two_children();
        let mut ctx = ctx(&graph);
        ctx.visit_couple(&PersonId::from("p1"), &PersonId::from("p2"));
        ctx.visit_children(GroupKey::pair(&PersonId::from("p1"), &PersonId::from("p2")));

        let canvas = build_descendants(&mut ctx, graph.get("p1").unwrap(), 3);
        assert_eq!(canvas.entities().count(), 1);
        assert!(canvas.lines().iter().all(|l| l.style == LineStyle::Dashed));
    }

    #[test]
    fn spouse_only_children_hang_under_spouse() {
        let mut graph = couple_with_two_children();
        graph.insert(Person::new("step", "Step", Gender::Other));
        graph.link_parents("step", Some("p2"), None, ParentKind::Biological);

        let mut ctx = ctx(&graph);
        let canvas = build_descendants(&mut ctx, graph.get("p1").unwrap(), 1);
        assert_eq!(canvas.entities().count(), 5);
        // Pushed out past the couple's children on the spouse's side.
        assert!(x_of(&canvas, "step") < x_of(&canvas, "c1"));
        let rows: Vec<_> = canvas.rows().collect();
        assert_eq!(rows.len(), 2);
    }
}
