use crate::model::{Forest, Section};
use std::collections::HashSet;

/// One visible row of the outline pane: a section header or a field line
/// under its owning section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatRow {
    Section {
        id: String,
        depth: usize,
    },
    Field {
        section_id: String,
        id: String,
        depth: usize,
    },
}

impl FlatRow {
    pub fn node_id(&self) -> &str {
        match self {
            FlatRow::Section { id, .. } => id,
            FlatRow::Field { id, .. } => id,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            FlatRow::Section { depth, .. } => *depth,
            FlatRow::Field { depth, .. } => *depth,
        }
    }
}

/// Projects the forest into the row list the outline renders: each section,
/// then its fields, then its children, depth-first. Sections in `collapsed`
/// contribute their header row only.
pub fn flatten_forest(forest: &Forest, collapsed: &HashSet<String>) -> Vec<FlatRow> {
    fn append(out: &mut Vec<FlatRow>, section: &Section, depth: usize, collapsed: &HashSet<String>) {
        out.push(FlatRow::Section {
            id: section.id.clone(),
            depth,
        });
        if collapsed.contains(&section.id) {
            return;
        }
        for f in &section.fields {
            out.push(FlatRow::Field {
                section_id: section.id.clone(),
                id: f.id.clone(),
                depth: depth + 1,
            });
        }
        for child in &section.children {
            append(out, child, depth + 1, collapsed);
        }
    }

    let mut out = Vec::new();
    for section in &forest.sections {
        append(&mut out, section, 0, collapsed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Section};

    fn fixture() -> Forest {
        let mut a = Section::new("a", "A");
        a.fields = vec![Field {
            id: "f1".into(),
            name: "F1".into(),
            ..Default::default()
        }];
        let mut sub = Section::new("sub", "Sub");
        sub.fields = vec![Field {
            id: "f2".into(),
            name: "F2".into(),
            ..Default::default()
        }];
        a.children = vec![sub];
        Forest {
            sections: vec![a, Section::new("b", "B")],
        }
    }

    #[test]
    fn rows_follow_section_fields_children_order() {
        let forest = fixture();
        let rows = flatten_forest(&forest, &HashSet::new());
        let ids: Vec<_> = rows.iter().map(|r| r.node_id().to_string()).collect();
        assert_eq!(ids, vec!["a", "f1", "sub", "f2", "b"]);
        assert_eq!(rows[0].depth(), 0);
        assert_eq!(rows[1].depth(), 1);
        assert_eq!(rows[2].depth(), 1);
        assert_eq!(rows[3].depth(), 2);
    }

    #[test]
    fn collapsed_section_keeps_only_its_header_row() {
        let forest = fixture();
        let mut collapsed = HashSet::new();
        collapsed.insert("a".to_string());
        let rows = flatten_forest(&forest, &collapsed);
        let ids: Vec<_> = rows.iter().map(|r| r.node_id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn collapsing_a_nested_section_hides_its_fields_only() {
        let forest = fixture();
        let mut collapsed = HashSet::new();
        collapsed.insert("sub".to_string());
        let rows = flatten_forest(&forest, &collapsed);
        let ids: Vec<_> = rows.iter().map(|r| r.node_id().to_string()).collect();
        assert_eq!(ids, vec!["a", "f1", "sub", "b"]);
    }
}
