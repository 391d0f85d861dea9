use crate::model::{Field, FieldPatch, Forest, Section, SectionPatch};

/// Where a section currently sits: its immediate parent (None for
/// top-level) and its index within that parent's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub parent_id: Option<String>,
    pub index: usize,
}

// Primitive, policy-free operations on the forest. All searches are
// pre-order depth-first; all mutating primitives fail silently (None/false)
// when a referenced id is gone, so callers can tolerate stale references.
impl Forest {
    pub fn find_section(&self, id: &str) -> Option<&Section> {
        fn walk<'a>(list: &'a [Section], id: &str) -> Option<&'a Section> {
            for s in list {
                if s.id == id {
                    return Some(s);
                }
                if let Some(found) = walk(&s.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.sections, id)
    }

    pub fn find_section_mut(&mut self, id: &str) -> Option<&mut Section> {
        fn walk<'a>(list: &'a mut [Section], id: &str) -> Option<&'a mut Section> {
            for s in list.iter_mut() {
                if s.id == id {
                    return Some(s);
                }
                if let Some(found) = walk(&mut s.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.sections, id)
    }

    /// The section together with its immediate containing section (None when
    /// top-level).
    pub fn find_section_with_parent(&self, id: &str) -> Option<(&Section, Option<&Section>)> {
        fn walk<'a>(
            list: &'a [Section],
            parent: Option<&'a Section>,
            id: &str,
        ) -> Option<(&'a Section, Option<&'a Section>)> {
            for s in list {
                if s.id == id {
                    return Some((s, parent));
                }
                if let Some(found) = walk(&s.children, Some(s), id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.sections, None, id)
    }

    pub fn locate_section(&self, id: &str) -> Option<Location> {
        fn walk(list: &[Section], parent: Option<&str>, id: &str) -> Option<Location> {
            for (i, s) in list.iter().enumerate() {
                if s.id == id {
                    return Some(Location {
                        parent_id: parent.map(|p| p.to_string()),
                        index: i,
                    });
                }
                if let Some(loc) = walk(&s.children, Some(&s.id), id) {
                    return Some(loc);
                }
            }
            None
        }
        walk(&self.sections, None, id)
    }

    /// The section directly owning a field, plus the field's index in it.
    pub fn find_field_owner(&self, field_id: &str) -> Option<(&Section, usize)> {
        fn walk<'a>(list: &'a [Section], field_id: &str) -> Option<(&'a Section, usize)> {
            for s in list {
                if let Some(i) = s.fields.iter().position(|f| f.id == field_id) {
                    return Some((s, i));
                }
                if let Some(found) = walk(&s.children, field_id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.sections, field_id)
    }

    pub fn find_field(&self, field_id: &str) -> Option<&Field> {
        self.find_field_owner(field_id)
            .map(|(owner, idx)| &owner.fields[idx])
    }

    /// Detaches and returns the subtree rooted at `id`. Sibling order is
    /// preserved; the rest of the forest is untouched.
    pub fn remove_section(&mut self, id: &str) -> Option<Section> {
        fn walk(list: &mut Vec<Section>, id: &str) -> Option<Section> {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                return Some(list.remove(pos));
            }
            for s in list.iter_mut() {
                if let Some(found) = walk(&mut s.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.sections, id)
    }

    pub fn remove_field(&mut self, section_id: &str, field_id: &str) -> Option<Field> {
        let owner = self.find_section_mut(section_id)?;
        let pos = owner.fields.iter().position(|f| f.id == field_id)?;
        Some(owner.fields.remove(pos))
    }

    /// Inserts a (possibly subtree-bearing) section under `parent` (None for
    /// the forest root) at `index`; appends when the index is omitted or
    /// out of range.
    pub fn insert_section_at(
        &mut self,
        parent: Option<&str>,
        section: Section,
        index: Option<usize>,
    ) -> bool {
        let list = match parent {
            None => &mut self.sections,
            Some(pid) => match self.find_section_mut(pid) {
                Some(p) => &mut p.children,
                None => return false,
            },
        };
        let at = index.unwrap_or(list.len()).min(list.len());
        list.insert(at, section);
        true
    }

    pub fn insert_field_at(&mut self, section_id: &str, field: Field, index: Option<usize>) -> bool {
        match self.find_section_mut(section_id) {
            Some(owner) => {
                let at = index.unwrap_or(owner.fields.len()).min(owner.fields.len());
                owner.fields.insert(at, field);
                true
            }
            None => false,
        }
    }

    pub fn update_section(&mut self, id: &str, patch: &SectionPatch) -> bool {
        match self.find_section_mut(id) {
            Some(s) => {
                if let Some(name) = &patch.name {
                    s.name = name.clone();
                }
                if let Some(description) = &patch.description {
                    s.description = description.clone();
                }
                if let Some(disabled) = patch.disabled {
                    s.disabled = disabled;
                }
                true
            }
            None => false,
        }
    }

    pub fn update_field(&mut self, section_id: &str, field_id: &str, patch: &FieldPatch) -> bool {
        let Some(owner) = self.find_section_mut(section_id) else {
            return false;
        };
        let Some(f) = owner.fields.iter_mut().find(|f| f.id == field_id) else {
            return false;
        };
        if let Some(name) = &patch.name {
            f.name = name.clone();
        }
        if let Some(description) = &patch.description {
            f.description = description.clone();
        }
        if let Some(data_type) = patch.data_type {
            f.data_type = data_type;
        }
        if let Some(max_length) = patch.max_length {
            f.max_length = max_length;
        }
        if let Some(required) = patch.required {
            f.required = required;
        }
        if let Some(repeated) = patch.repeated {
            f.repeated = repeated;
        }
        if let Some(default_value) = &patch.default_value {
            f.default_value = default_value.clone();
        }
        if let Some(options) = &patch.dropdown_options {
            f.dropdown_options = options.clone();
        }
        true
    }

    /// True when `id` names `ancestor_id` itself or any section inside its
    /// subtree. False when the ancestor does not exist.
    pub fn contains(&self, ancestor_id: &str, id: &str) -> bool {
        fn in_subtree(s: &Section, id: &str) -> bool {
            s.id == id || s.children.iter().any(|c| in_subtree(c, id))
        }
        self.find_section(ancestor_id)
            .map(|s| in_subtree(s, id))
            .unwrap_or(false)
    }

    /// All section ids in pre-order. Handy for structural assertions.
    pub fn section_ids(&self) -> Vec<String> {
        fn walk(list: &[Section], out: &mut Vec<String>) {
            for s in list {
                out.push(s.id.clone());
                walk(&s.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.sections, &mut out);
        out
    }

    /// All field ids in tree order.
    pub fn field_ids(&self) -> Vec<String> {
        fn walk(list: &[Section], out: &mut Vec<String>) {
            for s in list {
                out.extend(s.fields.iter().map(|f| f.id.clone()));
                walk(&s.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.sections, &mut out);
        out
    }
}
