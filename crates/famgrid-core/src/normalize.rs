#![forbid(unsafe_code)]

//! Build a [`FamilyGraph`] from flat person and relationship tables.
//!
//! Storage layers usually keep people, parentage, and partnerships in
//! separate tables. [`normalize`] folds them into the id-keyed graph the
//! layout engine reads: children lists are derived from parent links,
//! partnerships are written on both sides, and insertion indexes follow
//! record order so ordering tie-breaks stay stable across calls.
//!
//! # Failure Modes
//!
//! - Duplicate person ids → [`Error::DuplicatePerson`].
//! - A link naming an unknown person → [`Error::UnknownPerson`].
//! - More than [`MAX_PARENT_SETS`] parent links for one child: the extra
//!   links are dropped with a warning.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{
    FamilyGraph, Gender, MAX_PARENT_SETS, ParentKind, Partnership, Person, PersonId,
};

/// Raw tables as a storage layer would hand them over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatFamily {
    pub people: Vec<PersonRecord>,
    #[serde(default)]
    pub parent_links: Vec<ParentLink>,
    #[serde(default)]
    pub partnerships: Vec<PartnershipRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub death: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// One parent-set row for a child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLink {
    pub child: PersonId,
    #[serde(default)]
    pub mother: Option<PersonId>,
    #[serde(default)]
    pub father: Option<PersonId>,
    #[serde(default)]
    pub kind: ParentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnershipRecord {
    pub a: PersonId,
    pub b: PersonId,
    #[serde(flatten)]
    pub details: Partnership,
    /// Marks this as the current partnership for both people.
    #[serde(default)]
    pub primary: bool,
}

/// Fold flat tables into a graph.
pub fn normalize(flat: &FlatFamily) -> Result<FamilyGraph> {
    let mut graph = FamilyGraph::new();
    for (index, record) in flat.people.iter().enumerate() {
        let mut person = Person::new(record.id.as_str(), &record.name, record.gender);
        person.birth = record.birth.clone();
        person.death = record.death.clone();
        person.order = record.order;
        person.index = u32::try_from(index).unwrap_or(u32::MAX);
        if graph.insert(person).is_some() {
            return Err(Error::DuplicatePerson(record.id.clone()));
        }
    }

    for link in &flat.parent_links {
        require(&graph, "child", &link.child)?;
        for parent in link.mother.iter().chain(link.father.iter()) {
            require(&graph, "parent", parent)?;
        }
        let slots = graph.get(link.child.as_str()).map_or(0, |c| c.parents.len());
        if slots >= MAX_PARENT_SETS {
            tracing::warn!(
                target: "famgrid.normalize",
                child = %link.child,
                "dropping parent link beyond the readable slot limit"
            );
            continue;
        }
        graph.link_parents(
            link.child.as_str(),
            link.mother.as_ref().map(PersonId::as_str),
            link.father.as_ref().map(PersonId::as_str),
            link.kind,
        );
    }

    for record in &flat.partnerships {
        require(&graph, "partner", &record.a)?;
        require(&graph, "partner", &record.b)?;
        graph.link_partners(record.a.as_str(), record.b.as_str(), record.details.clone());
        if record.primary {
            graph.set_spouses(record.a.as_str(), record.b.as_str());
        }
    }

    Ok(graph)
}

fn require(graph: &FamilyGraph, relation: &'static str, id: &PersonId) -> Result<()> {
    if graph.contains(id.as_str()) {
        Ok(())
    } else {
        Err(Error::UnknownPerson {
            relation,
            id: id.clone(),
        })
    }
}
