use crate::model::Forest;
use crate::tree::error::{TreeError, TreeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Section,
    Field,
}

/// What the pointer is currently over while a drag is active. `Outside` is
/// the "not over any section" sentinel used to promote sections to the top
/// level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTarget {
    Section(String),
    Field(String),
    Outside,
}

/// Captured at drag start. `origin_parent` is the containing section at
/// that moment (owning section for fields, None for top-level sections);
/// kept for display only — classification always re-reads the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSource {
    pub kind: NodeKind,
    pub id: String,
    pub origin_parent: Option<String>,
}

/// The single mutation a drop resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOp {
    PromoteSection { id: String },
    ReorderSection { moved: String, before: String },
    NestSection { moved: String, parent: String },
    ReorderField { moved: String, before: String },
    MoveFieldBefore { moved: String, section: String, index: usize },
    AppendField { moved: String, section: String },
}

/// One in-progress gesture. Hovering updates the provisional target with no
/// tree effect; only `drop` commits (at most one mutation), and `cancel`
/// always returns to Idle for free.
#[derive(Debug, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        source: DragSource,
        over: Option<HoverTarget>,
    },
}

impl DragSession {
    /// Starts a drag for a section or field. Disabled sections cannot be a
    /// gesture source; a missing id means the caller's view is stale.
    pub fn begin(&mut self, forest: &Forest, kind: NodeKind, id: &str) -> TreeResult<()> {
        let source = match kind {
            NodeKind::Section => {
                let section = forest
                    .find_section(id)
                    .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
                if section.disabled {
                    return Err(TreeError::Locked(section.id.clone()));
                }
                DragSource {
                    kind,
                    id: id.to_string(),
                    origin_parent: forest.locate_section(id).and_then(|l| l.parent_id),
                }
            }
            NodeKind::Field => {
                let (owner, _) = forest
                    .find_field_owner(id)
                    .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
                if owner.disabled {
                    return Err(TreeError::Locked(owner.id.clone()));
                }
                DragSource {
                    kind,
                    id: id.to_string(),
                    origin_parent: Some(owner.id.clone()),
                }
            }
        };
        *self = DragSession::Dragging {
            source,
            over: None,
        };
        Ok(())
    }

    /// Updates the provisional target. Ignored while idle.
    pub fn hover(&mut self, target: HoverTarget) {
        if let DragSession::Dragging { over, .. } = self {
            *over = Some(target);
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    pub fn source(&self) -> Option<&DragSource> {
        match self {
            DragSession::Dragging { source, .. } => Some(source),
            DragSession::Idle => None,
        }
    }

    pub fn hovered(&self) -> Option<&HoverTarget> {
        match self {
            DragSession::Dragging { over, .. } => over.as_ref(),
            DragSession::Idle => None,
        }
    }

    /// The operation the current hover would commit, for visual feedback.
    /// Pure: never touches the tree.
    pub fn provisional(&self, forest: &Forest) -> Option<DragOp> {
        match self {
            DragSession::Dragging {
                source,
                over: Some(target),
            } => classify(forest, source, target),
            _ => None,
        }
    }

    /// Resolves the gesture into at most one mutation and returns to Idle.
    /// Returns the committed operation, or None when the drop had no effect
    /// (invalid target, stale ids, rejected mutation).
    pub fn drop_on_target(&mut self, forest: &mut Forest) -> Option<DragOp> {
        let session = std::mem::take(self);
        let DragSession::Dragging {
            source,
            over: Some(target),
        } = session
        else {
            return None;
        };
        let op = classify(forest, &source, &target)?;
        let applied = match &op {
            DragOp::PromoteSection { id } => forest.promote_section(id),
            DragOp::ReorderSection { moved, before } => {
                forest.reorder_section(moved, Some(before))
            }
            DragOp::NestSection { moved, parent } => forest.move_section(moved, Some(parent)),
            DragOp::ReorderField { moved, before } => forest.reorder_field(moved, Some(before)),
            DragOp::MoveFieldBefore {
                moved,
                section,
                index,
            } => forest.move_field(moved, section, Some(*index)),
            DragOp::AppendField { moved, section } => forest.move_field(moved, section, None),
        };
        match applied {
            Ok(()) => Some(op),
            // A failed drop is an ordinary outcome of an invalid gesture.
            Err(_) => None,
        }
    }

    /// Abandons the gesture. Guaranteed free of tree effects.
    pub fn cancel(&mut self) {
        *self = DragSession::Idle;
    }
}

/// The one classifier for both node kinds: same parent means reorder,
/// different parent means move, outside promotes sections and ignores
/// fields, and dropping a node on itself never does anything.
fn classify(forest: &Forest, source: &DragSource, target: &HoverTarget) -> Option<DragOp> {
    match (source.kind, target) {
        (NodeKind::Section, HoverTarget::Outside) => Some(DragOp::PromoteSection {
            id: source.id.clone(),
        }),
        (NodeKind::Field, HoverTarget::Outside) => None,
        (NodeKind::Section, HoverTarget::Section(t)) => {
            if *t == source.id {
                return None;
            }
            let moved_parent = forest.locate_section(&source.id)?.parent_id;
            let target_parent = forest.locate_section(t)?.parent_id;
            if moved_parent == target_parent {
                Some(DragOp::ReorderSection {
                    moved: source.id.clone(),
                    before: t.clone(),
                })
            } else {
                Some(DragOp::NestSection {
                    moved: source.id.clone(),
                    parent: t.clone(),
                })
            }
        }
        // Sections have nowhere to land on a field row.
        (NodeKind::Section, HoverTarget::Field(_)) => None,
        (NodeKind::Field, HoverTarget::Field(t)) => {
            if *t == source.id {
                return None;
            }
            let (moved_owner, _) = forest.find_field_owner(&source.id)?;
            let (target_owner, target_idx) = forest.find_field_owner(t)?;
            if moved_owner.id == target_owner.id {
                Some(DragOp::ReorderField {
                    moved: source.id.clone(),
                    before: t.clone(),
                })
            } else {
                Some(DragOp::MoveFieldBefore {
                    moved: source.id.clone(),
                    section: target_owner.id.clone(),
                    index: target_idx,
                })
            }
        }
        (NodeKind::Field, HoverTarget::Section(t)) => {
            forest.find_section(t)?;
            Some(DragOp::AppendField {
                moved: source.id.clone(),
                section: t.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Section};

    fn field(id: &str) -> Field {
        Field {
            id: id.into(),
            name: id.to_uppercase(),
            ..Default::default()
        }
    }

    // root: [a (f1), b, c], a also used with a nested child in some tests
    fn fixture() -> Forest {
        let mut a = Section::new("a", "A");
        a.fields = vec![field("f1")];
        Forest {
            sections: vec![a, Section::new("b", "B"), Section::new("c", "C")],
        }
    }

    #[test]
    fn field_dropped_on_other_section_appends_there() {
        let mut forest = fixture();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Field, "f1").unwrap();
        drag.hover(HoverTarget::Section("b".into()));
        let op = drag.drop_on_target(&mut forest).unwrap();
        assert_eq!(
            op,
            DragOp::AppendField {
                moved: "f1".into(),
                section: "b".into()
            }
        );
        assert!(forest.find_section("a").unwrap().fields.is_empty());
        let b = forest.find_section("b").unwrap();
        assert_eq!(b.fields.len(), 1);
        assert_eq!(b.fields[0].id, "f1");
        assert!(!drag.is_dragging());
    }

    #[test]
    fn section_dropped_before_first_sibling_reorders_root() {
        let mut forest = fixture();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "c").unwrap();
        drag.hover(HoverTarget::Section("a".into()));
        let op = drag.drop_on_target(&mut forest).unwrap();
        assert!(matches!(op, DragOp::ReorderSection { .. }));
        let top: Vec<_> = forest.sections.iter().map(|s| s.id.clone()).collect();
        assert_eq!(top, vec!["c", "a", "b"]);
    }

    #[test]
    fn nested_section_dropped_outside_is_promoted() {
        let mut forest = fixture();
        forest
            .find_section_mut("a")
            .unwrap()
            .children
            .push(Section::new("x", "X"));
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "x").unwrap();
        drag.hover(HoverTarget::Outside);
        let op = drag.drop_on_target(&mut forest).unwrap();
        assert_eq!(op, DragOp::PromoteSection { id: "x".into() });
        let top: Vec<_> = forest.sections.iter().map(|s| s.id.clone()).collect();
        assert_eq!(top, vec!["a", "b", "c", "x"]);
        assert!(forest.find_section("a").unwrap().children.is_empty());
    }

    #[test]
    fn sections_with_different_parents_nest_on_drop() {
        let mut forest = fixture();
        forest
            .find_section_mut("a")
            .unwrap()
            .children
            .push(Section::new("x", "X"));
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "x").unwrap();
        drag.hover(HoverTarget::Section("b".into()));
        let op = drag.drop_on_target(&mut forest).unwrap();
        assert_eq!(
            op,
            DragOp::NestSection {
                moved: "x".into(),
                parent: "b".into()
            }
        );
        assert_eq!(forest.find_section("b").unwrap().children[0].id, "x");
    }

    #[test]
    fn cross_section_field_drop_lands_at_target_index() {
        let mut forest = fixture();
        forest
            .find_section_mut("b")
            .unwrap()
            .fields
            .extend([field("g1"), field("g2")]);
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Field, "f1").unwrap();
        drag.hover(HoverTarget::Field("g2".into()));
        drag.drop_on_target(&mut forest).unwrap();
        let ids: Vec<_> = forest
            .find_section("b")
            .unwrap()
            .fields
            .iter()
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(ids, vec!["g1", "f1", "g2"]);
    }

    #[test]
    fn same_section_field_drop_reorders_before_target() {
        let mut forest = fixture();
        forest
            .find_section_mut("a")
            .unwrap()
            .fields
            .extend([field("f2"), field("f3")]);
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Field, "f3").unwrap();
        drag.hover(HoverTarget::Field("f1".into()));
        drag.drop_on_target(&mut forest).unwrap();
        let ids: Vec<_> = forest
            .find_section("a")
            .unwrap()
            .fields
            .iter()
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(ids, vec!["f3", "f1", "f2"]);
    }

    #[test]
    fn dropping_a_node_on_itself_changes_nothing() {
        let mut forest = fixture();
        let before = forest.clone();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "a").unwrap();
        drag.hover(HoverTarget::Section("a".into()));
        assert!(drag.drop_on_target(&mut forest).is_none());
        assert_eq!(forest, before);
    }

    #[test]
    fn hovering_and_cancelling_never_mutate() {
        let mut forest = fixture();
        let before = forest.clone();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "c").unwrap();
        drag.hover(HoverTarget::Section("a".into()));
        drag.hover(HoverTarget::Section("b".into()));
        drag.hover(HoverTarget::Outside);
        assert!(drag.provisional(&forest).is_some());
        assert_eq!(forest, before);
        drag.cancel();
        assert!(!drag.is_dragging());
        assert_eq!(forest, before);
        // A drop after cancel is inert.
        assert!(drag.drop_on_target(&mut forest).is_none());
    }

    #[test]
    fn provisional_tracks_reorder_vs_nest() {
        let mut forest = fixture();
        forest
            .find_section_mut("a")
            .unwrap()
            .children
            .push(Section::new("x", "X"));
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "b").unwrap();
        drag.hover(HoverTarget::Section("c".into()));
        assert!(matches!(
            drag.provisional(&forest),
            Some(DragOp::ReorderSection { .. })
        ));
        drag.hover(HoverTarget::Section("x".into()));
        assert!(matches!(
            drag.provisional(&forest),
            Some(DragOp::NestSection { .. })
        ));
    }

    #[test]
    fn disabled_section_cannot_be_a_drag_source() {
        let mut forest = fixture();
        forest.find_section_mut("b").unwrap().disabled = true;
        let mut drag = DragSession::default();
        let err = drag.begin(&forest, NodeKind::Section, "b").unwrap_err();
        assert_eq!(err, TreeError::Locked("b".into()));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn disabled_target_makes_the_drop_a_no_op() {
        let mut forest = fixture();
        forest.find_section_mut("b").unwrap().disabled = true;
        let before = forest.clone();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Field, "f1").unwrap();
        drag.hover(HoverTarget::Section("b".into()));
        assert!(drag.drop_on_target(&mut forest).is_none());
        assert_eq!(forest, before);
    }

    #[test]
    fn target_deleted_mid_drag_is_tolerated() {
        let mut forest = fixture();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Section, "c").unwrap();
        drag.hover(HoverTarget::Section("b".into()));
        forest.remove_section("b");
        let before = forest.clone();
        assert!(drag.drop_on_target(&mut forest).is_none());
        assert_eq!(forest, before);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn field_dropped_outside_is_ignored() {
        let mut forest = fixture();
        let before = forest.clone();
        let mut drag = DragSession::default();
        drag.begin(&forest, NodeKind::Field, "f1").unwrap();
        drag.hover(HoverTarget::Outside);
        assert!(drag.drop_on_target(&mut forest).is_none());
        assert_eq!(forest, before);
    }
}
