#![forbid(unsafe_code)]

//! Ordering utilities: birth order, gender bias, partner priority.
//!
//! Everything here yields a total, deterministic order so two layout calls on
//! the same graph always place people identically.

use std::cmp::Ordering;

use famgrid_core::{DateParts, Gender, PartnerKind, Partnership, Person, compare_date, parse_date};

/// Sortable key for a person.
///
/// Uses the birth date (`year*10000 + month*100 + day`) when known and
/// `prefer_custom_order` is false, otherwise the custom order field. `None`
/// means "unknown, sort last".
#[must_use]
pub fn person_order(person: &Person, prefer_custom_order: bool) -> Option<i64> {
    if !prefer_custom_order
        && let Some(key) = parse_date(person.birth.as_deref()).sort_key()
    {
        return Some(key);
    }
    person.order
}

fn compare_keys(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Left-to-right order for siblings and for children under a parent.
///
/// Birth-derived order, then custom order, then insertion index, then id.
#[must_use]
pub fn compare_people(a: &Person, b: &Person) -> Ordering {
    compare_keys(person_order(a, false), person_order(b, false))
        .then_with(|| compare_keys(person_order(a, true), person_order(b, true)))
        .then_with(|| a.index.cmp(&b.index))
        .then_with(|| a.id.cmp(&b.id))
}

/// `-1` female, `+1` male, `0` otherwise.
#[inline]
#[must_use]
pub const fn gender_multiplier(gender: Gender) -> i32 {
    match gender {
        Gender::Female => -1,
        Gender::Male => 1,
        Gender::Other => 0,
    }
}

/// Placement tie-break: female before male, unknown neutral.
#[must_use]
pub fn compare_gender(a: &Person, b: &Person) -> Ordering {
    gender_multiplier(a.gender).cmp(&gender_multiplier(b.gender))
}

/// Married-like partnerships first, then engaged, dating, untagged.
#[must_use]
pub fn partner_rank(details: &Partnership) -> u8 {
    match details.kind {
        Some(PartnerKind::Married | PartnerKind::Separated | PartnerKind::Divorced) => 0,
        Some(PartnerKind::Engaged) => 1,
        Some(PartnerKind::Dating) => 2,
        None => 3,
    }
}

fn specificity(date: &DateParts) -> u8 {
    u8::from(date.year.is_some()) + u8::from(date.month.is_some()) + u8::from(date.day.is_some())
}

/// The most specific known date of a partnership.
///
/// Marriage, wedding and relationship-begin dates are considered in that
/// order; a later candidate only wins if it carries more components.
#[must_use]
pub fn partnership_date(details: &Partnership) -> DateParts {
    [&details.marriage, &details.wedding, &details.began]
        .into_iter()
        .map(|raw| parse_date(raw.as_deref()))
        .fold(DateParts::NONE, |best, date| {
            if specificity(&date) > specificity(&best) {
                date
            } else {
                best
            }
        })
}

/// Priority order for a person's partners (most important first).
#[must_use]
pub fn compare_partners(
    a: (&Person, &Partnership),
    b: (&Person, &Partnership),
) -> Ordering {
    let (pa, da) = a;
    let (pb, db) = b;
    partner_rank(da)
        .cmp(&partner_rank(db))
        .then_with(|| compare_date(&partnership_date(da), &partnership_date(db)))
        .then_with(|| pa.index.cmp(&pb.index))
        .then_with(|| pa.id.cmp(&pb.id))
}
