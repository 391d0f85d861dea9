use crate::model::{DataType, Field, Forest, Section, ViewMode, ViewSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Load failures. Loading is all-or-nothing: on error the caller's tree is
/// left untouched.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("malformed configuration JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Configuration shape (round-trippable)
//
// Mirrors the section tree plus view settings. Within each section the
// fields are split into two buckets by the `repeated` flag: `fields`
// (repeated=false) and `listFields` (repeated=true), either omitted when
// empty. Loading recombines them fields-first; the interleaving between the
// buckets is not preserved across a round trip. Known, accepted limitation.
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigDoc {
    #[serde(default, rename = "viewMode")]
    view_mode: ViewMode,
    #[serde(default, rename = "showHPIBullets")]
    show_hpi_bullets: bool,
    #[serde(default = "default_true", rename = "showHeaders")]
    show_headers: bool,
    sections: Vec<ConfigSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigSection {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<ConfigField>,
    #[serde(default, rename = "listFields", skip_serializing_if = "Vec::is_empty")]
    list_fields: Vec<ConfigField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ConfigSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigField {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "dataType")]
    data_type: DataType,
    #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<u32>,
    #[serde(default)]
    required: bool,
    #[serde(default, rename = "defaultValue")]
    default_value: String,
    #[serde(default, rename = "dropdownOptions")]
    dropdown_options: Vec<String>,
}

fn field_to_config(f: &Field) -> ConfigField {
    ConfigField {
        id: f.id.clone(),
        name: f.name.clone(),
        description: f.description.clone(),
        data_type: f.data_type,
        max_length: f.max_length,
        required: f.required,
        default_value: f.default_value.clone(),
        dropdown_options: f.dropdown_options.clone(),
    }
}

fn field_from_config(f: ConfigField, repeated: bool) -> Field {
    Field {
        id: f.id,
        name: f.name,
        description: f.description,
        data_type: f.data_type,
        max_length: f.max_length,
        required: f.required,
        repeated,
        default_value: f.default_value,
        dropdown_options: f.dropdown_options,
    }
}

fn section_to_config(s: &Section) -> ConfigSection {
    ConfigSection {
        id: s.id.clone(),
        name: s.name.clone(),
        description: s.description.clone(),
        disabled: s.disabled,
        fields: s
            .fields
            .iter()
            .filter(|f| !f.repeated)
            .map(field_to_config)
            .collect(),
        list_fields: s
            .fields
            .iter()
            .filter(|f| f.repeated)
            .map(field_to_config)
            .collect(),
        children: s.children.iter().map(section_to_config).collect(),
    }
}

fn section_from_config(s: ConfigSection) -> Section {
    let mut fields: Vec<Field> = s
        .fields
        .into_iter()
        .map(|f| field_from_config(f, false))
        .collect();
    fields.extend(s.list_fields.into_iter().map(|f| field_from_config(f, true)));
    Section {
        id: s.id,
        name: s.name,
        description: s.description,
        disabled: s.disabled,
        fields,
        children: s.children.into_iter().map(section_from_config).collect(),
    }
}

/// Projects the forest and view settings into the configuration shape.
pub fn save_tree(settings: &ViewSettings, forest: &Forest) -> Result<JsonValue, SerializeError> {
    let doc = ConfigDoc {
        view_mode: settings.view_mode,
        show_hpi_bullets: settings.show_hpi_bullets,
        show_headers: settings.show_headers,
        sections: forest.sections.iter().map(section_to_config).collect(),
    };
    Ok(serde_json::to_value(doc)?)
}

pub fn save_tree_pretty(settings: &ViewSettings, forest: &Forest) -> String {
    match save_tree(settings, forest) {
        Ok(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string()),
        Err(e) => format!("{e}"),
    }
}

/// Parses a configuration document back into view settings and a forest.
/// Unknown keys are ignored; missing optional keys take their defaults.
pub fn load_tree(json: &str) -> Result<(ViewSettings, Forest), SerializeError> {
    let doc: ConfigDoc = serde_json::from_str(json)?;
    Ok(doc_into_tree(doc))
}

pub fn load_tree_value(value: &JsonValue) -> Result<(ViewSettings, Forest), SerializeError> {
    let doc: ConfigDoc = serde_json::from_value(value.clone())?;
    Ok(doc_into_tree(doc))
}

fn doc_into_tree(doc: ConfigDoc) -> (ViewSettings, Forest) {
    let settings = ViewSettings {
        view_mode: doc.view_mode,
        show_hpi_bullets: doc.show_hpi_bullets,
        show_headers: doc.show_headers,
    };
    let forest = Forest {
        sections: doc.sections.into_iter().map(section_from_config).collect(),
    };
    (settings, forest)
}

// ---------------------------------------------------------------------------
// Standard export shape (one-directional)
//
// Top-level sections seed the mapping; `FieldType` is always the literal
// "string" no matter what the field's actual data type is. Downstream
// consumers depend on that literal, so it must not be "fixed".
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct StandardSection {
    #[serde(rename = "SectionName")]
    section_name: String,
    #[serde(rename = "Section")]
    section: Vec<StandardSection>,
    #[serde(rename = "ListFields")]
    list_fields: Vec<StandardField>,
}

#[derive(Debug, Serialize)]
struct StandardField {
    #[serde(rename = "FieldName")]
    field_name: String,
    #[serde(rename = "FieldType")]
    field_type: &'static str,
    required: bool,
    description: String,
    #[serde(rename = "defaultValue")]
    default_value: String,
    #[serde(rename = "Literals")]
    literals: Vec<String>,
}

fn section_to_standard(s: &Section) -> StandardSection {
    StandardSection {
        section_name: s.name.clone(),
        section: s.children.iter().map(section_to_standard).collect(),
        list_fields: s
            .fields
            .iter()
            .map(|f| StandardField {
                field_name: f.name.clone(),
                field_type: "string",
                required: f.required,
                description: f.description.clone(),
                default_value: f.default_value.clone(),
                literals: f.dropdown_options.clone(),
            })
            .collect(),
    }
}

/// Projects the forest into the external standard shape.
pub fn export_standard(forest: &Forest) -> Result<JsonValue, SerializeError> {
    let mapped: Vec<StandardSection> = forest.sections.iter().map(section_to_standard).collect();
    Ok(serde_json::to_value(mapped)?)
}

pub fn export_standard_pretty(forest: &Forest) -> String {
    match export_standard(forest) {
        Ok(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string()),
        Err(e) => format!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(id: &str, repeated: bool) -> Field {
        Field {
            id: id.into(),
            name: id.to_uppercase(),
            repeated,
            ..Default::default()
        }
    }

    // Bucket-order-compliant fixture: non-repeated fields before repeated
    // ones within each section, so the round trip is exact.
    fn fixture() -> (ViewSettings, Forest) {
        let mut a = Section::new("a", "A");
        a.fields = vec![
            Field {
                data_type: DataType::Dropdown,
                dropdown_options: vec!["low".into(), "high".into()],
                required: true,
                ..field("f1", false)
            },
            field("f2", true),
        ];
        let mut b = Section::new("b", "B");
        b.disabled = true;
        b.children = vec![Section::new("b1", "B1")];
        let settings = ViewSettings {
            view_mode: ViewMode::Bullets,
            show_hpi_bullets: true,
            show_headers: false,
        };
        (settings, Forest { sections: vec![a, b] })
    }

    #[test]
    fn round_trip_reconstructs_the_forest() {
        let (settings, forest) = fixture();
        let saved = save_tree(&settings, &forest).unwrap();
        let (settings2, forest2) = load_tree_value(&saved).unwrap();
        assert_eq!(settings, settings2);
        assert_eq!(forest, forest2);
    }

    #[test]
    fn buckets_split_by_repeated_and_empty_arrays_are_omitted() {
        let (settings, forest) = fixture();
        let saved = save_tree(&settings, &forest).unwrap();
        let a = &saved["sections"][0];
        assert_eq!(a["fields"][0]["id"], "f1");
        assert_eq!(a["listFields"][0]["id"], "f2");
        assert!(a.get("children").is_none());
        assert!(a.get("disabled").is_none());
        let b = &saved["sections"][1];
        assert_eq!(b["disabled"], true);
        assert!(b.get("fields").is_none());
        assert!(b.get("listFields").is_none());
        let b1 = &b["children"][0];
        assert!(b1.get("children").is_none());
    }

    #[test]
    fn interleaved_repeated_fields_regroup_on_round_trip() {
        // Repeated field first: the documented lossy case.
        let mut a = Section::new("a", "A");
        a.fields = vec![field("r1", true), field("p1", false)];
        let forest = Forest { sections: vec![a] };
        let saved = save_tree(&ViewSettings::default(), &forest).unwrap();
        let (_, forest2) = load_tree_value(&saved).unwrap();
        let ids: Vec<_> = forest2.sections[0]
            .fields
            .iter()
            .map(|f| f.id.clone())
            .collect();
        // Non-repeated bucket merges back first.
        assert_eq!(ids, vec!["p1", "r1"]);
        assert!(forest2.sections[0].fields[1].repeated);
        // A second round trip is stable.
        let saved2 = save_tree(&ViewSettings::default(), &forest2).unwrap();
        let (_, forest3) = load_tree_value(&saved2).unwrap();
        assert_eq!(forest2, forest3);
    }

    #[test]
    fn load_applies_defaults_for_missing_settings() {
        let (settings, forest) = load_tree(r#"{"sections": []}"#).unwrap();
        assert_eq!(settings.view_mode, ViewMode::Paragraph);
        assert!(!settings.show_hpi_bullets);
        assert!(settings.show_headers);
        assert!(forest.sections.is_empty());
    }

    #[test]
    fn load_tolerates_unknown_keys_and_missing_buckets() {
        let doc = json!({
            "viewMode": "bullets",
            "sections": [{"id": "s", "name": "S", "extra": 42}],
            "generatedAt": "2024-01-01T00:00:00Z",
        });
        let (settings, forest) = load_tree_value(&doc).unwrap();
        assert_eq!(settings.view_mode, ViewMode::Bullets);
        assert!(forest.sections[0].fields.is_empty());
        assert!(forest.sections[0].children.is_empty());
    }

    #[test]
    fn load_is_all_or_nothing_on_malformed_input() {
        assert!(load_tree("{").is_err());
        assert!(load_tree(r#"{"sections": 5}"#).is_err());
        // A document without the structural key is rejected outright.
        assert!(load_tree(r#"{"viewMode": "bullets"}"#).is_err());
        assert!(load_tree(r#"{"sections": [{"name": "missing id"}]}"#).is_err());
    }

    #[test]
    fn standard_export_always_emits_string_field_type() {
        let (_, forest) = fixture();
        let out = export_standard(&forest).unwrap();
        let a = &out[0];
        assert_eq!(a["SectionName"], "A");
        let f1 = &a["ListFields"][0];
        assert_eq!(f1["FieldType"], "string");
        assert_eq!(f1["Literals"], json!(["low", "high"]));
        assert_eq!(f1["required"], true);
        // Non-dropdown fields still export the literal type tag.
        assert_eq!(a["ListFields"][1]["FieldType"], "string");
        assert_eq!(a["ListFields"][1]["Literals"], json!([]));
        // Children recurse under "Section".
        assert_eq!(out[1]["Section"][0]["SectionName"], "B1");
    }

    #[test]
    fn both_projections_are_deterministic() {
        let (settings, forest) = fixture();
        assert_eq!(
            save_tree_pretty(&settings, &forest),
            save_tree_pretty(&settings, &forest)
        );
        assert_eq!(
            export_standard_pretty(&forest),
            export_standard_pretty(&forest)
        );
    }
}
