#![forbid(unsafe_code)]

//! Per-invocation build state shared by the recursive builders.
//!
//! The visited sets live here and nowhere else: they are created fresh for
//! each top-level layout call and dropped with it. They are what makes the
//! recursion terminate on cyclic family graphs (remarriage loops, shared
//! ancestors) and what keeps a couple or child group from being drawn twice.

use std::fmt;

use famgrid_core::{FamilyGraph, Partnership, Person, PersonId, has_actual_date};
use rustc_hash::FxHashSet;

use crate::request::{DisplayOptions, LayoutTuning};

/// Identity of a group of children hanging from one or two parents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum GroupKey {
    /// Children of an unordered pair of parents.
    Pair(PersonId, PersonId),
    /// Children with a single recorded parent.
    Single(PersonId),
}

impl GroupKey {
    pub(crate) fn pair(a: &PersonId, b: &PersonId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self::Pair(lo.clone(), hi.clone())
    }

    pub(crate) fn single(a: &PersonId) -> Self {
        Self::Single(a.clone())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair(a, b) => write!(f, "children of {a}+{b}"),
            Self::Single(a) => write!(f, "children of {a}"),
        }
    }
}

pub(crate) struct BuildContext<'g> {
    pub(crate) graph: &'g FamilyGraph,
    pub(crate) display: DisplayOptions,
    pub(crate) tuning: LayoutTuning,
    couples: FxHashSet<(PersonId, PersonId)>,
    child_groups: FxHashSet<GroupKey>,
    ancestors: FxHashSet<PersonId>,
}

impl<'g> BuildContext<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, display: DisplayOptions, tuning: LayoutTuning) -> Self {
        Self {
            graph,
            display,
            tuning,
            couples: FxHashSet::default(),
            child_groups: FxHashSet::default(),
            ancestors: FxHashSet::default(),
        }
    }

    /// Resolve a reference held by `owner`. Missing people are logged and
    /// read as absent.
    pub(crate) fn lookup(&self, id: &PersonId, relation: &'static str, owner: &PersonId) -> Option<&'g Person> {
        let found = self.graph.get(id.as_str());
        if found.is_none() {
            tracing::warn!(
                target: "famgrid.layout",
                person = %owner,
                missing = %id,
                relation,
                "dangling reference treated as absent"
            );
        }
        found
    }

    /// Partnership details between two people, read from either side.
    pub(crate) fn partnership(&self, a: &Person, b: &Person) -> Option<&'g Partnership> {
        let graph = self.graph;
        graph
            .get(a.id.as_str())
            .and_then(|p| p.partnership(b.id.as_str()))
            .or_else(|| graph.get(b.id.as_str()).and_then(|p| p.partnership(a.id.as_str())))
    }

    /// Horizontal distance between two partners' box centers.
    ///
    /// One unit, widened when an enabled annotation has a real date to show.
    pub(crate) fn marriage_gap(&self, details: Option<&Partnership>) -> f64 {
        let Some(details) = details else {
            return 1.0;
        };
        let display = self.display;
        let tuning = &self.tuning;
        let mut extra = 0.0;
        if display.marriage_dates
            && (has_actual_date(details.marriage.as_deref())
                || has_actual_date(details.wedding.as_deref()))
        {
            extra += tuning.annotation_gap;
        } else if display.relationship_dates && has_actual_date(details.began.as_deref()) {
            extra += tuning.annotation_gap;
        }
        if display.divorce_dates && has_actual_date(details.divorce.as_deref()) {
            extra += tuning.divorce_gap;
        }
        1.0 + extra.min(tuning.max_extra_gap)
    }

    /// Record a couple; false if it was already drawn in this invocation.
    pub(crate) fn visit_couple(&mut self, a: &PersonId, b: &PersonId) -> bool {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        let fresh = self.couples.insert(key);
        if !fresh {
            tracing::debug!(target: "famgrid.layout", a = %a, b = %b, "couple already drawn");
        }
        fresh
    }

    /// Record a child group; false if it was already drawn.
    pub(crate) fn visit_children(&mut self, key: GroupKey) -> bool {
        if self.child_groups.contains(&key) {
            tracing::debug!(target: "famgrid.layout", group = %key, "child group already drawn");
            return false;
        }
        self.child_groups.insert(key)
    }

    /// Record an ancestor; false if their ancestry was already expanded.
    pub(crate) fn visit_ancestor(&mut self, id: &PersonId) -> bool {
        let fresh = self.ancestors.insert(id.clone());
        if !fresh {
            tracing::debug!(target: "famgrid.layout", person = %id, "ancestor already expanded");
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famgrid_core::Gender;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn pair_keys_are_unordered() {
        let a = PersonId::from("a");
        let b = PersonId::from("b");
        assert_eq!(GroupKey::pair(&a, &b), GroupKey::pair(&b, &a));
        assert_ne!(GroupKey::pair(&a, &b), GroupKey::single(&a));
    }

    #[test]
    fn visited_sets_report_repeats() {
        let graph = FamilyGraph::new();
        let mut ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        let a = PersonId::from("a");
        let b = PersonId::from("b");

        assert!(ctx.visit_couple(&a, &b));
        assert!(!ctx.visit_couple(&b, &a));
        assert!(ctx.visit_children(GroupKey::single(&a)));
        assert!(!ctx.visit_children(GroupKey::single(&a)));
        assert!(ctx.visit_children(GroupKey::pair(&a, &b)));
        assert!(ctx.visit_ancestor(&a));
        assert!(!ctx.visit_ancestor(&a));
    }

    #[test]
    fn partnership_is_read_from_either_side() {
        let mut graph: FamilyGraph = [
            Person::new("a", "A", Gender::Female),
            Person::new("b", "B", Gender::Male),
        ]
        .into_iter()
        .collect();
        // Only b records the partnership.
        if let Some(b) = graph.get_mut("b") {
            b.partners.insert(PersonId::from("a"), Partnership::default());
        }
        let ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        let a = graph.get("a").unwrap();
        let b = graph.get("b").unwrap();
        assert!(ctx.partnership(a, b).is_some());
        assert!(ctx.partnership(b, a).is_some());
    }

    #[test]
    fn marriage_gap_widens_for_shown_dates() {
        let graph = FamilyGraph::new();
        let details = Partnership::default()
            .with_marriage("19700101")
            .with_divorce("19800000");

        let hidden = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        assert_eq!(hidden.marriage_gap(Some(&details)), 1.0);
        assert_eq!(hidden.marriage_gap(None), 1.0);

        let marriage_only = DisplayOptions {
            marriage_dates: true,
            ..DisplayOptions::default()
        };
        let ctx = BuildContext::new(&graph, marriage_only, LayoutTuning::default());
        assert!((ctx.marriage_gap(Some(&details)) - 1.6).abs() < 1e-9);

        let everything = DisplayOptions {
            marriage_dates: true,
            divorce_dates: true,
            relationship_dates: true,
        };
        let ctx = BuildContext::new(&graph, everything, LayoutTuning::default());
        // 0.6 + 0.5 is capped at 1.1.
        assert!((ctx.marriage_gap(Some(&details)) - 2.1).abs() < 1e-9);

        // Malformed dates never widen.
        let bogus = Partnership::default().with_marriage("1970");
        assert_eq!(ctx.marriage_gap(Some(&bogus)), 1.0);
    }

    #[test]
    fn relationship_date_stands_in_for_marriage() {
        let graph = FamilyGraph::new();
        let display = DisplayOptions {
            relationship_dates: true,
            ..DisplayOptions::default()
        };
        let ctx = BuildContext::new(&graph, display, LayoutTuning::default());
        let dating = Partnership::default().with_began("20010000");
        assert!((ctx.marriage_gap(Some(&dating)) - 1.6).abs() < 1e-9);
    }

    // Minimal capture layer: records the `missing` field of warn events.
    struct WarnCapture(Arc<Mutex<Vec<String>>>);

    struct MissingVisitor(Option<String>);

    impl tracing::field::Visit for MissingVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            if field.name() == "missing" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut visitor = MissingVisitor(None);
            event.record(&mut visitor);
            if let Some(missing) = visitor.0 {
                self.0.lock().unwrap().push(missing);
            }
        }
    }

    #[test]
    fn dangling_lookup_emits_warning() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(WarnCapture(captured.clone()));
        let graph: FamilyGraph = [Person::new("a", "A", Gender::Other)].into_iter().collect();

        tracing::subscriber::with_default(subscriber, || {
            let ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
            assert!(ctx.lookup(&PersonId::from("ghost"), "child", &PersonId::from("a")).is_none());
            assert!(ctx.lookup(&PersonId::from("a"), "child", &PersonId::from("a")).is_some());
        });

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0], "ghost");
    }
}
