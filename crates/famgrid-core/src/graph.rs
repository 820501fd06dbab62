#![forbid(unsafe_code)]

//! The family graph consumed by the layout engine.
//!
//! A [`FamilyGraph`] is a snapshot: the engine reads it and never mutates it.
//! Callers rebuild (or patch) the snapshot between layout requests using the
//! mutation helpers here or the [`normalize`](crate::normalize) step.
//!
//! # Invariants
//!
//! 1. Each `children` entry should be matched by a parent-set slot on the
//!    child naming this person. Readers treat unmatched entries as noise.
//! 2. Partner entries are expected to be mutual; a missing reverse entry is
//!    read as absent data, never as an error.
//! 3. Only the first [`MAX_PARENT_SETS`] parent sets are ever read.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Number of parent-set slots a person can carry.
pub const MAX_PARENT_SETS: usize = 3;

// ---------------------------------------------------------------------------
// Identifiers and tags
// ---------------------------------------------------------------------------

/// Stable string identifier of a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PersonId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PersonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gender tag. Only used for placement tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// Relationship type recorded on a parent-set slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Biological,
    Adoptive,
    Foster,
    Step,
    Guardian,
    /// No explicit tag; resolved from the person's other slots.
    #[default]
    Unspecified,
}

impl ParentKind {
    /// True for tags that were set explicitly.
    #[inline]
    pub const fn is_explicit(self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

/// Which role a parent occupies in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentRole {
    Mother,
    Father,
}

/// Kind of a partnership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    Married,
    Separated,
    Divorced,
    Engaged,
    Dating,
}

impl PartnerKind {
    /// A partnership that has ended.
    #[inline]
    pub const fn is_former(self) -> bool {
        matches!(self, Self::Separated | Self::Divorced)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One recorded (mother, father, type) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ParentSet {
    #[serde(default)]
    pub mother: Option<PersonId>,
    #[serde(default)]
    pub father: Option<PersonId>,
    #[serde(default)]
    pub kind: ParentKind,
}

impl ParentSet {
    #[must_use]
    pub fn new(mother: Option<&str>, father: Option<&str>, kind: ParentKind) -> Self {
        Self {
            mother: mother.map(PersonId::from),
            father: father.map(PersonId::from),
            kind,
        }
    }

    /// Role `id` holds in this slot, if any.
    pub fn role_of(&self, id: &str) -> Option<ParentRole> {
        if self.mother.as_ref().is_some_and(|m| m.as_str() == id) {
            Some(ParentRole::Mother)
        } else if self.father.as_ref().is_some_and(|f| f.as_str() == id) {
            Some(ParentRole::Father)
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.role_of(id).is_some()
    }

    /// The parent recorded next to `id`, when `id` is in this slot.
    pub fn other_parent(&self, id: &str) -> Option<&PersonId> {
        match self.role_of(id)? {
            ParentRole::Mother => self.father.as_ref(),
            ParentRole::Father => self.mother.as_ref(),
        }
    }

    /// Recorded parent ids, mother first.
    pub fn ids(&self) -> impl Iterator<Item = &PersonId> {
        self.mother.iter().chain(self.father.iter())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mother.is_none() && self.father.is_none()
    }
}

/// Details of a partnership between two people.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Partnership {
    #[serde(default)]
    pub kind: Option<PartnerKind>,
    #[serde(default)]
    pub marriage: Option<String>,
    #[serde(default)]
    pub wedding: Option<String>,
    #[serde(default)]
    pub divorce: Option<String>,
    #[serde(default)]
    pub began: Option<String>,
}

impl Partnership {
    #[must_use]
    pub fn of_kind(kind: PartnerKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_marriage(mut self, date: &str) -> Self {
        self.marriage = Some(date.to_owned());
        self
    }

    #[must_use]
    pub fn with_divorce(mut self, date: &str) -> Self {
        self.divorce = Some(date.to_owned());
        self
    }

    #[must_use]
    pub fn with_began(mut self, date: &str) -> Self {
        self.began = Some(date.to_owned());
        self
    }
}

/// A person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub death: Option<String>,
    #[serde(default)]
    pub parents: Vec<ParentSet>,
    #[serde(default)]
    pub children: Vec<PersonId>,
    #[serde(default)]
    pub partners: BTreeMap<PersonId, Partnership>,
    /// Current/primary partner; decides default side placement.
    #[serde(default)]
    pub spouse: Option<PersonId>,
    /// Custom sort order.
    #[serde(default)]
    pub order: Option<i64>,
    /// Insertion index, the final ordering tie-break.
    #[serde(default)]
    pub index: u32,
}

impl Person {
    #[must_use]
    pub fn new(id: &str, name: &str, gender: Gender) -> Self {
        Self {
            id: PersonId::from(id),
            name: name.to_owned(),
            gender,
            birth: None,
            death: None,
            parents: Vec::new(),
            children: Vec::new(),
            partners: BTreeMap::new(),
            spouse: None,
            order: None,
            index: 0,
        }
    }

    #[must_use]
    pub fn with_birth(mut self, date: &str) -> Self {
        self.birth = Some(date.to_owned());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// The readable parent-set slots, with their slot index.
    pub fn parent_sets(&self) -> impl Iterator<Item = (usize, &ParentSet)> {
        self.parents.iter().take(MAX_PARENT_SETS).enumerate()
    }

    /// The first readable slot that names at least one parent.
    pub fn first_parent_set(&self) -> Option<&ParentSet> {
        self.parent_sets()
            .map(|(_, set)| set)
            .find(|set| !set.is_empty())
    }

    /// Whether any readable slot names `parent`.
    pub fn has_parent(&self, parent: &str) -> bool {
        self.parent_sets().any(|(_, set)| set.contains(parent))
    }

    pub fn partnership(&self, partner: &str) -> Option<&Partnership> {
        self.partners.get(partner)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Person records keyed by id, iterated in id order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyGraph {
    people: BTreeMap<PersonId, Person>,
}

impl FamilyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from its JSON object form (`{ id: person, ... }`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Insert or replace a person, returning the previous record.
    pub fn insert(&mut self, person: Person) -> Option<Person> {
        self.people.insert(person.id.clone(), person)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Person> {
        self.people.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Person> {
        self.people.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.people.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// People in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    /// Record `child` under a new parent-set slot and add it to each named
    /// parent's children list. Parents that are not in the graph are still
    /// written into the slot.
    pub fn link_parents(
        &mut self,
        child: &str,
        mother: Option<&str>,
        father: Option<&str>,
        kind: ParentKind,
    ) {
        let Some(record) = self.people.get_mut(child) else {
            return;
        };
        record.parents.push(ParentSet::new(mother, father, kind));
        for parent in mother.into_iter().chain(father) {
            if let Some(parent) = self.people.get_mut(parent)
                && !parent.children.iter().any(|c| c.as_str() == child)
            {
                parent.children.push(PersonId::from(child));
            }
        }
    }

    /// Record a mutual partnership.
    pub fn link_partners(&mut self, a: &str, b: &str, details: Partnership) {
        if let Some(person) = self.people.get_mut(a) {
            person.partners.insert(PersonId::from(b), details.clone());
        }
        if let Some(person) = self.people.get_mut(b) {
            person.partners.insert(PersonId::from(a), details);
        }
    }

    /// Point both people's primary-spouse field at each other.
    pub fn set_spouses(&mut self, a: &str, b: &str) {
        if let Some(person) = self.people.get_mut(a) {
            person.spouse = Some(PersonId::from(b));
        }
        if let Some(person) = self.people.get_mut(b) {
            person.spouse = Some(PersonId::from(a));
        }
    }
}

impl FromIterator<Person> for FamilyGraph {
    fn from_iter<T: IntoIterator<Item = Person>>(iter: T) -> Self {
        Self {
            people: iter.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}
