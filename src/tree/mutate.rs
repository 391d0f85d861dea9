use crate::model::{
    fresh_field_id, fresh_section_id, Field, FieldDraft, FieldPatch, Forest, Section,
};
use crate::tree::error::{TreeError, TreeResult};

// Policy layer over the store primitives: legality checks (locked sections,
// cycles, shape validation) plus the reorder/move tie-break rules. Every
// operation either commits fully or leaves the forest unchanged.
impl Forest {
    /// Re-inserts `moved_id` immediately before `before_id` within their
    /// shared parent list. Appends when `before_id` is None (dropped at the
    /// end of the list). No-op when the two ids do not currently share a
    /// parent.
    pub fn reorder_section(&mut self, moved_id: &str, before_id: Option<&str>) -> TreeResult<()> {
        let moved_loc = self
            .locate_section(moved_id)
            .ok_or_else(|| TreeError::NotFound(moved_id.to_string()))?;
        self.ensure_section_enabled(moved_id)?;
        if let Some(before) = before_id {
            let before_loc = self
                .locate_section(before)
                .ok_or_else(|| TreeError::NotFound(before.to_string()))?;
            if before_loc.parent_id != moved_loc.parent_id {
                // Stale gesture across parents: leave the forest alone.
                return Ok(());
            }
        }
        if let Some(pid) = &moved_loc.parent_id {
            self.ensure_section_enabled(pid)?;
        }
        let list = match &moved_loc.parent_id {
            None => &mut self.sections,
            Some(pid) => {
                &mut self
                    .find_section_mut(pid)
                    .ok_or_else(|| TreeError::NotFound(pid.clone()))?
                    .children
            }
        };
        let from = match list.iter().position(|s| s.id == moved_id) {
            Some(i) => i,
            None => return Ok(()),
        };
        let moved = list.remove(from);
        let at = before_id
            .and_then(|b| list.iter().position(|s| s.id == b))
            .unwrap_or(list.len());
        list.insert(at, moved);
        Ok(())
    }

    /// Transfers the subtree rooted at `moved_id` to the end of
    /// `new_parent`'s children, or to the end of the forest root when
    /// `new_parent` is None.
    pub fn move_section(&mut self, moved_id: &str, new_parent: Option<&str>) -> TreeResult<()> {
        let moved_loc = self
            .locate_section(moved_id)
            .ok_or_else(|| TreeError::NotFound(moved_id.to_string()))?;
        self.ensure_section_enabled(moved_id)?;
        if let Some(pid) = &moved_loc.parent_id {
            self.ensure_section_enabled(pid)?;
        }
        if let Some(target) = new_parent {
            if self.find_section(target).is_none() {
                return Err(TreeError::NotFound(target.to_string()));
            }
            if self.contains(moved_id, target) {
                return Err(TreeError::Cycle(moved_id.to_string()));
            }
            self.ensure_section_enabled(target)?;
        }
        let moved = self
            .remove_section(moved_id)
            .ok_or_else(|| TreeError::NotFound(moved_id.to_string()))?;
        // Target was re-validated above; insertion cannot fail.
        self.insert_section_at(new_parent, moved, None);
        Ok(())
    }

    /// Moves a section to the top level of the forest. Fields have no root
    /// list to join; the drag layer never routes them here.
    pub fn promote_section(&mut self, id: &str) -> TreeResult<()> {
        self.move_section(id, None)
    }

    /// Re-inserts a field immediately before `before_id` within its owning
    /// section. Appends when `before_id` is None; no-op when the two fields
    /// live in different sections.
    pub fn reorder_field(&mut self, field_id: &str, before_id: Option<&str>) -> TreeResult<()> {
        let (owner_id, _) = self
            .find_field_owner(field_id)
            .map(|(s, i)| (s.id.clone(), i))
            .ok_or_else(|| TreeError::NotFound(field_id.to_string()))?;
        self.ensure_section_enabled(&owner_id)?;
        if let Some(before) = before_id {
            let (before_owner, _) = self
                .find_field_owner(before)
                .ok_or_else(|| TreeError::NotFound(before.to_string()))?;
            if before_owner.id != owner_id {
                return Ok(());
            }
        }
        let owner = self
            .find_section_mut(&owner_id)
            .ok_or_else(|| TreeError::NotFound(owner_id.clone()))?;
        let from = match owner.fields.iter().position(|f| f.id == field_id) {
            Some(i) => i,
            None => return Ok(()),
        };
        let moved = owner.fields.remove(from);
        let at = before_id
            .and_then(|b| owner.fields.iter().position(|f| f.id == b))
            .unwrap_or(owner.fields.len());
        owner.fields.insert(at, moved);
        Ok(())
    }

    /// Moves a single field record into `dest_section_id` at `index`
    /// (appended when None). The field's subtree-free nature makes this a
    /// plain remove+insert.
    pub fn move_field(
        &mut self,
        field_id: &str,
        dest_section_id: &str,
        index: Option<usize>,
    ) -> TreeResult<()> {
        let owner_id = self
            .find_field_owner(field_id)
            .map(|(s, _)| s.id.clone())
            .ok_or_else(|| TreeError::NotFound(field_id.to_string()))?;
        self.ensure_section_enabled(&owner_id)?;
        if self.find_section(dest_section_id).is_none() {
            return Err(TreeError::NotFound(dest_section_id.to_string()));
        }
        self.ensure_section_enabled(dest_section_id)?;
        let moved = self
            .remove_field(&owner_id, field_id)
            .ok_or_else(|| TreeError::NotFound(field_id.to_string()))?;
        self.insert_field_at(dest_section_id, moved, index);
        Ok(())
    }

    /// Removes a section and its whole subtree. Cascading: the contained
    /// fields and nested sections go with it.
    pub fn delete_section(&mut self, id: &str) -> TreeResult<Section> {
        let (section, parent) = self
            .find_section_with_parent(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        if section.disabled {
            return Err(TreeError::Locked(section.id.clone()));
        }
        if let Some(p) = parent {
            if p.disabled {
                return Err(TreeError::Locked(p.id.clone()));
            }
        }
        self.remove_section(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))
    }

    pub fn delete_field(&mut self, section_id: &str, field_id: &str) -> TreeResult<Field> {
        let owner = self
            .find_section(section_id)
            .ok_or_else(|| TreeError::NotFound(section_id.to_string()))?;
        if !owner.fields.iter().any(|f| f.id == field_id) {
            return Err(TreeError::NotFound(field_id.to_string()));
        }
        self.ensure_section_enabled(section_id)?;
        self.remove_field(section_id, field_id)
            .ok_or_else(|| TreeError::NotFound(field_id.to_string()))
    }

    /// Creates an empty section with a fresh id and appends it under
    /// `parent` (forest root when None). Returns the created section.
    pub fn add_section(
        &mut self,
        parent: Option<&str>,
        name: &str,
        description: &str,
    ) -> TreeResult<Section> {
        if name.trim().is_empty() {
            return Err(TreeError::Validation(
                "section name must not be blank".into(),
            ));
        }
        if let Some(pid) = parent {
            if self.find_section(pid).is_none() {
                return Err(TreeError::NotFound(pid.to_string()));
            }
            self.ensure_section_enabled(pid)?;
        }
        let section = Section {
            id: fresh_section_id(),
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        };
        self.insert_section_at(parent, section.clone(), None);
        Ok(section)
    }

    /// Creates a field from the form draft and appends it to a section.
    pub fn add_field(&mut self, section_id: &str, draft: &FieldDraft) -> TreeResult<Field> {
        if self.find_section(section_id).is_none() {
            return Err(TreeError::NotFound(section_id.to_string()));
        }
        self.ensure_section_enabled(section_id)?;
        let field = Field {
            id: fresh_field_id(),
            ..field_from_draft(draft)?
        };
        self.insert_field_at(section_id, field.clone(), None);
        Ok(field)
    }

    /// Edits a field in place, preserving its id. Same shape rules as
    /// `add_field`.
    pub fn update_field_from_draft(
        &mut self,
        section_id: &str,
        field_id: &str,
        draft: &FieldDraft,
    ) -> TreeResult<()> {
        let owner = self
            .find_section(section_id)
            .ok_or_else(|| TreeError::NotFound(section_id.to_string()))?;
        if !owner.fields.iter().any(|f| f.id == field_id) {
            return Err(TreeError::NotFound(field_id.to_string()));
        }
        self.ensure_section_enabled(section_id)?;
        let next = field_from_draft(draft)?;
        self.update_field(
            section_id,
            field_id,
            &FieldPatch {
                name: Some(next.name),
                description: Some(next.description),
                data_type: Some(next.data_type),
                max_length: Some(next.max_length),
                required: Some(next.required),
                repeated: Some(next.repeated),
                default_value: Some(next.default_value),
                dropdown_options: Some(next.dropdown_options),
            },
        );
        Ok(())
    }

    /// In-place rename. Blank or unchanged names are a quiet no-op.
    pub fn rename_section(&mut self, id: &str, new_name: &str) -> TreeResult<()> {
        let current = self
            .find_section(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        let trimmed = new_name.trim();
        if trimmed.is_empty() || trimmed == current.name {
            return Ok(());
        }
        self.ensure_section_enabled(id)?;
        self.update_section(
            id,
            &crate::model::SectionPatch {
                name: Some(trimmed.to_string()),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn ensure_section_enabled(&self, id: &str) -> TreeResult<()> {
        match self.find_section(id) {
            Some(s) if s.disabled => Err(TreeError::Locked(s.id.clone())),
            Some(_) => Ok(()),
            None => Err(TreeError::NotFound(id.to_string())),
        }
    }
}

fn field_from_draft(draft: &FieldDraft) -> TreeResult<Field> {
    if draft.name.trim().is_empty() {
        return Err(TreeError::Validation("field name must not be blank".into()));
    }
    let options = draft.dropdown_options();
    if draft.data_type == crate::model::DataType::Dropdown && options.is_empty() {
        return Err(TreeError::Validation(
            "dropdown field needs at least one option".into(),
        ));
    }
    Ok(Field {
        id: String::new(),
        name: draft.name.clone(),
        description: draft.description.clone(),
        data_type: draft.data_type,
        max_length: draft.max_length,
        required: draft.required,
        repeated: draft.repeated,
        default_value: draft.default_value.clone(),
        dropdown_options: options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;

    // root: [a (f1 f2), b [b1], c, locked(disabled)]
    fn fixture() -> Forest {
        let mut a = Section::new("a", "A");
        a.fields = vec![
            Field {
                id: "f1".into(),
                name: "F1".into(),
                ..Default::default()
            },
            Field {
                id: "f2".into(),
                name: "F2".into(),
                ..Default::default()
            },
        ];
        let mut b = Section::new("b", "B");
        b.children = vec![Section::new("b1", "B1")];
        let mut locked = Section::new("locked", "Locked");
        locked.disabled = true;
        Forest {
            sections: vec![a, b, Section::new("c", "C"), locked],
        }
    }

    #[test]
    fn reorder_moves_before_target_and_keeps_membership() {
        let mut forest = fixture();
        forest.reorder_section("c", Some("a")).unwrap();
        assert_eq!(forest.section_ids(), vec!["c", "a", "b", "b1", "locked"]);
        // Count and parents unchanged.
        assert_eq!(forest.sections.len(), 4);
    }

    #[test]
    fn reorder_with_none_appends() {
        let mut forest = fixture();
        forest.reorder_section("a", None).unwrap();
        let top: Vec<_> = forest.sections.iter().map(|s| s.id.clone()).collect();
        assert_eq!(top, vec!["b", "c", "locked", "a"]);
    }

    #[test]
    fn reorder_across_parents_is_a_no_op() {
        let mut forest = fixture();
        let before = forest.clone();
        forest.reorder_section("b1", Some("c")).unwrap();
        assert_eq!(forest, before);
    }

    #[test]
    fn move_section_transfers_whole_subtree() {
        let mut forest = fixture();
        forest.move_section("b", Some("c")).unwrap();
        let c = forest.find_section("c").unwrap();
        assert_eq!(c.children.len(), 1);
        assert_eq!(c.children[0].id, "b");
        assert_eq!(c.children[0].children[0].id, "b1");
    }

    #[test]
    fn move_into_own_subtree_is_rejected_unchanged() {
        let mut forest = fixture();
        let before = forest.clone();
        let err = forest.move_section("b", Some("b1")).unwrap_err();
        assert_eq!(err, TreeError::Cycle("b".into()));
        let err = forest.move_section("b", Some("b")).unwrap_err();
        assert_eq!(err, TreeError::Cycle("b".into()));
        assert_eq!(forest, before);
    }

    #[test]
    fn promote_pulls_nested_section_to_root_end() {
        let mut forest = fixture();
        forest.promote_section("b1").unwrap();
        let top: Vec<_> = forest.sections.iter().map(|s| s.id.clone()).collect();
        assert_eq!(top, vec!["a", "b", "c", "locked", "b1"]);
        assert!(forest.find_section("b").unwrap().children.is_empty());
    }

    #[test]
    fn reorder_field_inserts_before_target() {
        let mut forest = fixture();
        forest.reorder_field("f2", Some("f1")).unwrap();
        let ids: Vec<_> = forest
            .find_section("a")
            .unwrap()
            .fields
            .iter()
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(ids, vec!["f2", "f1"]);
    }

    #[test]
    fn move_field_between_sections() {
        let mut forest = fixture();
        forest.move_field("f1", "b1", None).unwrap();
        assert_eq!(forest.find_section("a").unwrap().fields.len(), 1);
        let b1 = forest.find_section("b1").unwrap();
        assert_eq!(b1.fields.len(), 1);
        assert_eq!(b1.fields[0].id, "f1");
    }

    #[test]
    fn delete_section_cascades() {
        let mut forest = fixture();
        forest.add_field("b1", &FieldDraft {
            name: "Nested".into(),
            ..Default::default()
        })
        .unwrap();
        let before_fields = forest.field_ids().len();
        let removed = forest.delete_section("b").unwrap();
        assert_eq!(removed.id, "b");
        assert!(forest.find_section("b1").is_none());
        assert_eq!(forest.field_ids().len(), before_fields - 1);
        // Everything outside the subtree survives.
        assert_eq!(forest.section_ids(), vec!["a", "c", "locked"]);
    }

    #[test]
    fn locked_section_rejects_every_mutation() {
        let mut forest = fixture();
        let before = forest.clone();
        let locked = TreeError::Locked("locked".into());
        assert_eq!(forest.delete_section("locked").unwrap_err(), locked);
        assert_eq!(
            forest
                .add_section(Some("locked"), "Child", "")
                .unwrap_err(),
            locked
        );
        assert_eq!(
            forest
                .add_field("locked", &FieldDraft {
                    name: "X".into(),
                    ..Default::default()
                })
                .unwrap_err(),
            locked
        );
        assert_eq!(forest.move_section("locked", Some("c")).unwrap_err(), locked);
        assert_eq!(forest.move_section("a", Some("locked")).unwrap_err(), locked);
        assert_eq!(forest.rename_section("locked", "New").unwrap_err(), locked);
        assert_eq!(forest, before);
    }

    #[test]
    fn add_field_validates_shape() {
        let mut forest = fixture();
        let err = forest
            .add_field("a", &FieldDraft::default())
            .unwrap_err();
        assert!(matches!(err, TreeError::Validation(_)));
        let err = forest
            .add_field(
                "a",
                &FieldDraft {
                    name: "Choice".into(),
                    data_type: DataType::Dropdown,
                    options_raw: "  \n".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TreeError::Validation(_)));
        let field = forest
            .add_field(
                "a",
                &FieldDraft {
                    name: "Choice".into(),
                    data_type: DataType::Dropdown,
                    options_raw: "yes\nno".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(field.dropdown_options, vec!["yes", "no"]);
    }

    #[test]
    fn update_field_from_draft_preserves_id() {
        let mut forest = fixture();
        forest
            .update_field_from_draft(
                "a",
                "f1",
                &FieldDraft {
                    name: "Renamed".into(),
                    required: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let f = forest.find_field("f1").unwrap();
        assert_eq!(f.id, "f1");
        assert_eq!(f.name, "Renamed");
        assert!(f.required);
    }

    #[test]
    fn rename_ignores_blank_and_unchanged() {
        let mut forest = fixture();
        forest.rename_section("a", "  ").unwrap();
        assert_eq!(forest.find_section("a").unwrap().name, "A");
        forest.rename_section("a", "A").unwrap();
        forest.rename_section("a", "Alpha").unwrap();
        assert_eq!(forest.find_section("a").unwrap().name, "Alpha");
    }

    #[test]
    fn missing_ids_surface_not_found() {
        let mut forest = fixture();
        assert!(matches!(
            forest.move_section("ghost", None).unwrap_err(),
            TreeError::NotFound(_)
        ));
        assert!(matches!(
            forest.delete_field("a", "ghost").unwrap_err(),
            TreeError::NotFound(_)
        ));
        assert!(matches!(
            forest.add_section(Some("ghost"), "X", "").unwrap_err(),
            TreeError::NotFound(_)
        ));
    }
}
