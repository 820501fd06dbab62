#![forbid(unsafe_code)]

//! Sibling splitter: partitions a sibling set around a focal column and
//! packs each sibling's subtree against what is already on the canvas.

use famgrid_core::{ParentSet, Person};

use crate::canvas::{Canvas, Side};
use crate::context::BuildContext;
use crate::descendants::{ChildRef, build_descendants, drawable_children};
use crate::order::compare_people;

/// Full siblings of `person` through `set`: other children carrying a slot
/// with exactly the same mother and father. Sorted by [`compare_people`].
/// Half-siblings are hung from their shared parent by the ancestor builder.
pub(crate) fn siblings_of<'g>(ctx: &BuildContext<'g>, person: &Person, set: &ParentSet) -> Vec<ChildRef<'g>> {
    let mut out: Vec<ChildRef<'g>> = Vec::new();
    for parent_id in set.ids() {
        let Some(parent) = ctx.graph.get(parent_id.as_str()) else {
            continue;
        };
        for child in drawable_children(ctx, parent) {
            if child.id == person.id || out.iter().any(|s| s.person.id == child.id) {
                continue;
            }
            let slot = child
                .parent_sets()
                .find(|(_, s)| s.mother == set.mother && s.father == set.father)
                .map(|(i, _)| i);
            if let Some(slot) = slot {
                out.push(ChildRef { person: child, slot });
            }
        }
    }
    out.sort_by(|a, b| compare_people(a.person, b.person));
    out
}

/// Split `siblings` (sorted) into `(left, right)`, each nearest-first.
///
/// Unforced, siblings ordered before `focal` go left. A forced side takes
/// everyone.
pub(crate) fn split_siblings<'g>(
    focal: &Person,
    siblings: Vec<ChildRef<'g>>,
    forced: Option<Side>,
) -> (Vec<ChildRef<'g>>, Vec<ChildRef<'g>>) {
    let (mut left, right): (Vec<_>, Vec<_>) = match forced {
        Some(Side::Left) => (siblings, Vec::new()),
        Some(Side::Right) => (Vec::new(), siblings),
        None => siblings
            .into_iter()
            .partition(|s| compare_people(s.person, focal).is_lt()),
    };
    left.reverse();
    (left, right)
}

/// Pack each sibling's subtree on `side` of row `y`, nearest first, as close
/// to `x` as the row extents allow. Returns each sibling's column.
pub(crate) fn draw_siblings_one_side<'g>(
    ctx: &mut BuildContext<'g>,
    canvas: &mut Canvas,
    siblings: &[ChildRef<'g>],
    side: Side,
    x: f64,
    y: i32,
    depth: u8,
) -> Vec<f64> {
    let spacing = ctx.tuning.sibling_spacing;
    siblings
        .iter()
        .map(|sibling| {
            let sub = build_descendants(ctx, sibling.person, depth);
            canvas.place_beside(sub, x, y, side, spacing)
        })
        .collect()
}
