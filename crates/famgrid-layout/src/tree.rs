#![forbid(unsafe_code)]

//! Full tree orchestrator.
//!
//! Composes the descendant subtree of the focal person with their ancestry
//! and sibling rows into one [`Layout`].
//!
//! # Failure Modes
//!
//! - A focal id missing from the graph is the only error.
//! - Dangling references inside the graph are logged and drawn as absent.
//! - A marked id missing from the layout is logged and ignored.

use famgrid_core::{Error, FamilyGraph, Person, Result};

use crate::ancestors::{AncestorDepth, attach_family};
use crate::context::BuildContext;
use crate::descendants::{build_descendants, drawable_children, primary_partner};
use crate::layout::Layout;
use crate::request::{LayoutRequest, LayoutTuning};

/// Layout engine with fixed tuning; cheap to copy and reuse across requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    tuning: LayoutTuning,
}

impl LayoutEngine {
    #[must_use]
    pub fn new(tuning: LayoutTuning) -> Self {
        Self { tuning }
    }

    #[inline]
    pub fn tuning(&self) -> &LayoutTuning {
        &self.tuning
    }

    /// Lay out `request` against `graph`.
    ///
    /// # Errors
    ///
    /// [`Error::FocalNotFound`] when the focal person is not in the graph.
    pub fn build(&self, graph: &FamilyGraph, request: &LayoutRequest) -> Result<Layout> {
        let depths = request.depths;
        let _span = tracing::debug_span!(
            "layout.full_tree",
            focal = %request.focal,
            ancestors = depths.ancestors,
            descendants = depths.descendants,
            siblings = depths.siblings,
        )
        .entered();

        let focal = graph
            .get(request.focal.as_str())
            .ok_or_else(|| Error::FocalNotFound(request.focal.clone()))?;
        let mut ctx = BuildContext::new(graph, request.display, self.tuning);

        // At depth zero the partner would not draw the focal at all.
        let root = if depths.descendants > 0 {
            hidden_center(&ctx, focal).unwrap_or(focal)
        } else {
            focal
        };
        if root.id != focal.id {
            tracing::debug!(
                target: "famgrid.layout",
                focal = %focal.id,
                root = %root.id,
                "re-rooting at sole partner"
            );
        }

        let mut canvas = build_descendants(&mut ctx, root, depths.descendants);
        if depths.ancestors > 0 {
            let depth = AncestorDepth {
                ancestors: depths.ancestors,
                siblings: depths.siblings,
            };
            attach_family(&mut ctx, &mut canvas, root, (0.0, 0), depth, None);
        }

        if root.id != focal.id
            && let Some((x, _)) = canvas.position_of(focal.id.as_str())
        {
            canvas.translate(-x, 0);
        }

        canvas.set_focal(focal.id.as_str());
        if let Some(marked) = &request.marked
            && !canvas.set_marked(marked.as_str())
        {
            tracing::debug!(target: "famgrid.layout", marked = %marked, "marked person not in layout");
        }
        if request.flip {
            canvas.mirror();
        }

        let layout = canvas.into_layout();
        tracing::debug!(
            target: "famgrid.layout",
            entities = layout.entities.len(),
            lines = layout.lines.len(),
            labels = layout.labels.len(),
            "layout complete"
        );
        Ok(layout)
    }
}

/// Lay out `request` with the default tuning.
pub fn build_full_tree(graph: &FamilyGraph, request: &LayoutRequest) -> Result<Layout> {
    LayoutEngine::default().build(graph, request)
}

/// The sole partner to root the tree at instead of `focal`, if any.
///
/// Applies when `focal` has no recorded parents, exactly one partner who
/// lists them back and draws them as their primary partner, and no children
/// with anyone but that partner.
fn hidden_center<'g>(ctx: &BuildContext<'g>, focal: &'g Person) -> Option<&'g Person> {
    if focal.first_parent_set().is_some() {
        return None;
    }
    let mut partners = focal
        .partners
        .keys()
        .filter(|id| **id != focal.id)
        .filter_map(|id| ctx.graph.get(id.as_str()));
    let partner = partners.next()?;
    if partners.next().is_some() || !partner.partners.contains_key(&focal.id) {
        return None;
    }
    if primary_partner(ctx, partner).is_none_or(|p| p.id != focal.id) {
        return None;
    }
    let shared = drawable_children(ctx, focal).iter().all(|child| {
        child
            .parent_sets()
            .any(|(_, set)| set.contains(focal.id.as_str()) && set.contains(partner.id.as_str()))
    });
    shared.then_some(partner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DisplayOptions;
    use famgrid_core::{Gender, ParentKind, PartnerKind, Partnership};

    fn couple() -> FamilyGraph {
        let mut graph: FamilyGraph = [
            Person::new("a", "A", Gender::Female),
            Person::new("b", "B", Gender::Male),
        ]
        .into_iter()
        .collect();
        graph.link_partners("a", "b", Partnership::of_kind(PartnerKind::Married));
        graph
    }

    #[test]
    fn missing_focal_is_an_error() {
        let err = build_full_tree(&couple(), &LayoutRequest::new("zz")).unwrap_err();
        assert!(matches!(err, Error::FocalNotFound(id) if id.as_str() == "zz"));
    }

    #[test]
    fn hidden_center_keeps_focal_at_origin() {
        let graph = couple();
        let layout = build_full_tree(&graph, &LayoutRequest::new("a").depths(2, 2, 2)).unwrap();
        let a = layout.entity("a").unwrap();
        assert_eq!((a.x, a.y), (0.0, 0));
        assert!(a.focal);
        assert_eq!(layout.entity("b").map(|e| e.x), Some(1.0));
    }

    #[test]
    fn hidden_center_needs_shared_children() {
        let mut graph = couple();
        graph.insert(Person::new("k", "K", Gender::Other));
        graph.link_parents("k", Some("a"), None, ParentKind::Biological);
        let ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        assert!(hidden_center(&ctx, graph.get("a").unwrap()).is_none());

        graph.link_parents("k", Some("a"), Some("b"), ParentKind::Step);
        let ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        assert_eq!(
            hidden_center(&ctx, graph.get("a").unwrap()).map(|p| p.id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn hidden_center_needs_to_be_the_primary_partner() {
        let mut graph = couple();
        graph.insert(Person::new("c", "C", Gender::Female));
        graph.link_partners("b", "c", Partnership::of_kind(PartnerKind::Married));
        graph.set_spouses("b", "c");
        let ctx = BuildContext::new(&graph, DisplayOptions::default(), LayoutTuning::default());
        assert!(hidden_center(&ctx, graph.get("a").unwrap()).is_none());
    }

    #[test]
    fn marked_and_flip() {
        let graph = couple();
        let layout = build_full_tree(
            &graph,
            &LayoutRequest::new("a").depths(0, 1, 0).marked("b").flipped(true),
        )
        .unwrap();
        let b = layout.entity("b").unwrap();
        assert!(b.marked && !b.focal);
        assert_eq!(b.x, -1.0);

        let missing = build_full_tree(&graph, &LayoutRequest::new("a").marked("nobody")).unwrap();
        assert!(missing.entities.values().all(|e| !e.marked));
    }
}
