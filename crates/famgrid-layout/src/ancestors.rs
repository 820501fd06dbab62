#![forbid(unsafe_code)]

//! Ancestor tree builder.
//!
//! Works directly in the shared canvas: for a person already placed at
//! `(x, y)` it packs their siblings beside them on row `y`, places the parent
//! pair on row `y - 1` centered over the sibling row, connects everyone with
//! a bus, and recurses into each parent.
//!
//! Each parent's other children (half-siblings through another partner, or
//! children recorded with that parent alone) go on that parent's outer side.
//! The other partner is drawn beside the parent as an additional partner.
//!
//! # Invariants
//!
//! 1. Each person's ancestry is expanded at most once per invocation.
//! 2. The parent pair is centered on the mean column of the sibling row, but
//!    never drifts more than `max_parent_drift` from the child's column.
//! 3. Only the first parent-set slot naming someone is followed upward.

use std::collections::BTreeMap;

use famgrid_core::{GridPoint, ParentSet, Person, PersonId};

use crate::canvas::{Canvas, LineKind, LineStyle, PartnerLabel, Side};
use crate::classify::spouse_side;
use crate::context::{BuildContext, GroupKey};
use crate::descendants::{
    ChildRef, EXTRA_BAR, Hang, SIDE_BAR, connect_partner, connector_rise, drawable_children, hang_group,
    partner_line_kind,
};
use crate::order::compare_people;
use crate::siblings::{draw_siblings_one_side, siblings_of, split_siblings};

const EPS: f64 = 1e-9;

/// Generation budgets carried up the recursion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AncestorDepth {
    pub(crate) ancestors: u8,
    pub(crate) siblings: u8,
}

/// Attach the parents (and their ancestry) of `person`, who already sits at
/// `(x, y)` on `canvas`. `forced` sends all siblings to one side.
pub(crate) fn attach_family<'g>(
    ctx: &mut BuildContext<'g>,
    canvas: &mut Canvas,
    person: &'g Person,
    at: (f64, i32),
    depth: AncestorDepth,
    forced: Option<Side>,
) {
    if depth.ancestors == 0 || !ctx.visit_ancestor(&person.id) {
        return;
    }
    let Some((slot, set)) = person.parent_sets().find(|(_, set)| !set.is_empty()) else {
        return;
    };
    let mother = set
        .mother
        .as_ref()
        .and_then(|id| ctx.lookup(id, "mother", &person.id));
    let father = set
        .father
        .as_ref()
        .and_then(|id| ctx.lookup(id, "father", &person.id));

    let (x, y) = at;
    let key = match (mother, father) {
        (Some(m), Some(f)) => GroupKey::pair(&m.id, &f.id),
        (Some(p), None) | (None, Some(p)) => GroupKey::single(&p.id),
        (None, None) => return,
    };

    let mut row: Vec<(f64, ChildRef<'g>)> = vec![(x, ChildRef { person, slot })];
    let fan_out = ctx.visit_children(key) && depth.siblings > 0;
    if fan_out {
        let siblings = siblings_of(ctx, person, set);
        let (left, right) = split_siblings(person, siblings, forced);
        let sub_depth = depth.siblings - 1;
        let lx = draw_siblings_one_side(ctx, canvas, &left, Side::Left, x, y, sub_depth);
        let rx = draw_siblings_one_side(ctx, canvas, &right, Side::Right, x, y, sub_depth);
        row.extend(lx.into_iter().zip(left));
        row.extend(rx.into_iter().zip(right));
    }

    let mass = row.iter().map(|(cx, _)| cx).sum::<f64>() / row.len() as f64;
    let drift = ctx.tuning.max_parent_drift;
    let center = mass.clamp(x - drift, x + drift);

    let py = y - 1;
    let fpy = f64::from(py);
    let spacing = ctx.tuning.sibling_spacing;
    let up = AncestorDepth {
        ancestors: depth.ancestors - 1,
        ..depth
    };

    let bar_y = f64::from(y) - 0.5;
    let bus = bus_members(&row);
    match (mother, father) {
        (Some(m), Some(f)) => {
            let (left, right) = match spouse_side(ctx.graph, m.id.as_str(), f.id.as_str()) {
                Side::Right => (m, f),
                Side::Left => (f, m),
            };
            let details = ctx.partnership(left, right);
            let gap = ctx.marriage_gap(details);
            let (_, lx) = canvas.place_box(&left.id, center - gap / 2.0, py, Side::Left, spacing);
            let (_, rx) = canvas.place_box(&right.id, lx + gap, py, Side::Right, spacing);

            ctx.visit_couple(&left.id, &right.id);
            let kind = details.map_or(LineKind::Partner, partner_line_kind);
            canvas.add_line(GridPoint::new(lx, fpy), GridPoint::new(rx, fpy), kind, LineStyle::Solid);
            if rx - lx > 1.0 + EPS {
                canvas.add_partner_label(PartnerLabel {
                    a: left.id.clone(),
                    b: right.id.clone(),
                    from_x: lx,
                    to_x: rx,
                    y: fpy,
                    above: false,
                });
            }
            canvas.add_family_bus(GridPoint::new((lx + rx) / 2.0, fpy), bar_y, f64::from(y), &bus);

            if fan_out {
                let sub_depth = depth.siblings - 1;
                for (parent, px, side) in [(left, lx, Side::Left), (right, rx, Side::Right)] {
                    let groups = other_children(ctx, parent, person, set, &row);
                    hang_other_children(ctx, canvas, parent, (px, py), side, groups, sub_depth);
                }
            }

            attach_family(ctx, canvas, left, (lx, py), up, Some(Side::Left));
            attach_family(ctx, canvas, right, (rx, py), up, Some(Side::Right));
        }
        (Some(parent), None) | (None, Some(parent)) => {
            let push = forced.unwrap_or(Side::Right);
            let (_, px) = canvas.place_box(&parent.id, center, py, push, spacing);
            canvas.add_family_bus(GridPoint::new(px, fpy), bar_y, f64::from(y), &bus);
            if fan_out {
                let groups = other_children(ctx, parent, person, set, &row);
                hang_other_children(ctx, canvas, parent, (px, py), push, groups, depth.siblings - 1);
            }
            attach_family(ctx, canvas, parent, (px, py), up, forced);
        }
        (None, None) => {}
    }
}

fn bus_members(row: &[(f64, ChildRef<'_>)]) -> Vec<(f64, LineKind)> {
    row.iter().map(|(x, child)| (*x, child.line_kind())).collect()
}

/// Children of `parent` that share only `parent` with `person`, grouped by
/// their other parent. Children recorded with `parent` alone come first
/// (`None`), then one group per other partner in id order.
fn other_children<'g>(
    ctx: &BuildContext<'g>,
    parent: &'g Person,
    person: &Person,
    set: &ParentSet,
    row: &[(f64, ChildRef<'g>)],
) -> Vec<(Option<&'g Person>, Vec<ChildRef<'g>>)> {
    let mut groups: BTreeMap<Option<PersonId>, (Option<&'g Person>, Vec<ChildRef<'g>>)> = BTreeMap::new();
    for child in drawable_children(ctx, parent) {
        if child.id == person.id || row.iter().any(|(_, c)| c.person.id == child.id) {
            continue;
        }
        let Some((slot, child_set)) = child
            .parent_sets()
            .find(|(_, s)| s.contains(parent.id.as_str()))
        else {
            continue;
        };
        let other = child_set.other_parent(parent.id.as_str());
        // Same two parents, only recorded the other way round.
        if other.is_some_and(|o| set.contains(o.as_str())) {
            continue;
        }
        let partner = other.and_then(|id| ctx.lookup(id, "parent", &child.id));
        groups
            .entry(partner.map(|p| p.id.clone()))
            .or_insert_with(|| (partner, Vec::new()))
            .1
            .push(ChildRef { person: child, slot });
    }
    groups
        .into_values()
        .map(|(partner, mut members)| {
            members.sort_by(|a, b| compare_people(a.person, b.person));
            (partner, members)
        })
        .collect()
}

/// Hang `groups` from `parent`, who sits at `(px, py)`, packing them onto
/// row `py + 1` toward `side`. Each other partner is placed on row `py`
/// beyond the parent and joined to them.
fn hang_other_children<'g>(
    ctx: &mut BuildContext<'g>,
    canvas: &mut Canvas,
    parent: &'g Person,
    (px, py): (f64, i32),
    side: Side,
    groups: Vec<(Option<&'g Person>, Vec<ChildRef<'g>>)>,
    depth: u8,
) {
    let fpy = f64::from(py);
    let spacing = ctx.tuning.sibling_spacing;
    let alone = Hang {
        top: GridPoint::new(px, fpy),
        bar_y: fpy + SIDE_BAR,
        row: py + 1,
        push: side,
    };
    let mut drawn = 0;
    for (partner, members) in groups {
        let Some(partner) = partner else {
            hang_group(ctx, canvas, GroupKey::single(&parent.id), &members, alone, depth);
            continue;
        };
        let key = GroupKey::pair(&parent.id, &partner.id);
        if !ctx.visit_couple(&parent.id, &partner.id) {
            hang_group(ctx, canvas, key, &members, alone, depth);
            continue;
        }
        let details = ctx.partnership(parent, partner);
        let gap = ctx.marriage_gap(details);
        let (_, ox) = canvas.place_box(&partner.id, px + side.sign() * gap, py, side, spacing);
        let kind = details.map_or(LineKind::Partner, partner_line_kind);
        connect_partner(canvas, (&parent.id, &partner.id), GridPoint::new(px, fpy), ox, kind, drawn);
        let hang = Hang {
            top: GridPoint::new(ox - side.sign() * 0.5, fpy + connector_rise(drawn)),
            bar_y: fpy + EXTRA_BAR,
            ..alone
        };
        drawn += 1;
        hang_group(ctx, canvas, key, &members, hang, depth);
    }
}
