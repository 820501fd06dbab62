#![forbid(unsafe_code)]

//! Relationship classification: lineage side and biological status.

use std::cmp::Ordering;

use famgrid_core::{FamilyGraph, ParentKind, ParentRole, Person};

use crate::canvas::{LineKind, Side};
use crate::order::compare_gender;

/// Net parental role of `id` across all of their children.
///
/// Every parent-set slot (on every child) naming the person as mother
/// contributes `-1`, as father `+1`. The sign says which side of a couple
/// the person's lineage conventionally sits on.
#[must_use]
pub fn parent_multiplier(graph: &FamilyGraph, id: &str) -> i32 {
    let Some(person) = graph.get(id) else {
        return 0;
    };
    person
        .children
        .iter()
        .filter_map(|child| graph.get(child.as_str()))
        .flat_map(|child| child.parent_sets().map(|(_, set)| set.role_of(id)))
        .map(|role| match role {
            Some(ParentRole::Mother) => -1,
            Some(ParentRole::Father) => 1,
            None => 0,
        })
        .sum()
}

/// Which side of `id` the partner `spouse_id` is drawn on.
///
/// Whoever is more father-role goes right. Ties fall back to gender (male
/// right), then to id order. The result is antisymmetric: swapping the two
/// arguments always flips the side.
#[must_use]
pub fn spouse_side(graph: &FamilyGraph, id: &str, spouse_id: &str) -> Side {
    let delta = parent_multiplier(graph, spouse_id) - parent_multiplier(graph, id);
    if delta != 0 {
        return if delta > 0 { Side::Right } else { Side::Left };
    }

    let gender = match (graph.get(id), graph.get(spouse_id)) {
        (Some(person), Some(spouse)) => compare_gender(spouse, person),
        _ => Ordering::Equal,
    };
    match gender {
        Ordering::Greater => Side::Right,
        Ordering::Less => Side::Left,
        Ordering::Equal if spouse_id > id => Side::Right,
        Ordering::Equal => Side::Left,
    }
}

/// Whether the connector for parent-set slot `slot` is non-biological.
///
/// An explicit tag decides directly. An untagged slot is non-biological
/// only when another slot on the same person is explicitly biological.
#[must_use]
pub fn is_parent_set_non_bio(person: &Person, slot: usize) -> bool {
    let Some((_, set)) = person.parent_sets().nth(slot) else {
        return false;
    };
    if set.kind.is_explicit() {
        return set.kind != ParentKind::Biological;
    }
    person
        .parent_sets()
        .any(|(i, other)| i != slot && other.kind == ParentKind::Biological)
}

/// Whether `person`'s link to `parent_id` is non-biological.
///
/// False when no slot names the parent, or when any slot naming the parent
/// resolves as biological.
#[must_use]
pub fn is_non_biological(person: &Person, parent_id: &str) -> bool {
    let mut slots = person
        .parent_sets()
        .filter(|(_, set)| set.contains(parent_id))
        .map(|(i, _)| i)
        .peekable();
    slots.peek().is_some() && slots.all(|i| is_parent_set_non_bio(person, i))
}

/// Line kind for a child connector drawn from slot `slot`.
#[inline]
#[must_use]
pub fn child_line_kind(person: &Person, slot: usize) -> LineKind {
    if is_parent_set_non_bio(person, slot) {
        LineKind::NonBiological
    } else {
        LineKind::Biological
    }
}
