use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data types a field can carry. Serialized in lowercase in the
/// configuration document (`dataType: "textarea"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Number,
    Date,
    Textarea,
    Checkbox,
    Radio,
    Dropdown,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Text,
        DataType::Number,
        DataType::Date,
        DataType::Textarea,
        DataType::Checkbox,
        DataType::Radio,
        DataType::Dropdown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Textarea => "textarea",
            DataType::Checkbox => "checkbox",
            DataType::Radio => "radio",
            DataType::Dropdown => "dropdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Paragraph,
    Bullets,
}

/// Document-level display settings stored alongside the section tree in the
/// configuration shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSettings {
    pub view_mode: ViewMode,
    pub show_hpi_bullets: bool,
    pub show_headers: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Paragraph,
            show_hpi_bullets: false,
            show_headers: true,
        }
    }
}

/// One input of the form. Owned by exactly one section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    pub max_length: Option<u32>,
    pub required: bool,
    pub repeated: bool,
    pub default_value: String,
    // Non-empty only when data_type == Dropdown.
    pub dropdown_options: Vec<String>,
}

/// A named node of the tree: holds fields and, when used as a category,
/// nested child sections. Nesting depth is unbounded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub description: String,
    pub disabled: bool,
    pub fields: Vec<Field>,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The whole document: an ordered list of top-level sections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forest {
    pub sections: Vec<Section>,
}

/// Values captured by the field form before a field exists (or when editing
/// one in place). `options_raw` is the one-option-per-line text of the
/// dropdown editor; it only yields options when `data_type == Dropdown`.
#[derive(Debug, Clone, Default)]
pub struct FieldDraft {
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    pub max_length: Option<u32>,
    pub required: bool,
    pub repeated: bool,
    pub default_value: String,
    pub options_raw: String,
}

impl FieldDraft {
    /// Dropdown options derived from the raw editor text: trimmed, blank
    /// lines dropped, empty unless the data type is dropdown.
    pub fn dropdown_options(&self) -> Vec<String> {
        if self.data_type != DataType::Dropdown {
            return Vec::new();
        }
        self.options_raw
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect()
    }
}

/// Shallow-merge patch for section attributes. `id` is never patchable.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub disabled: Option<bool>,
}

/// Shallow-merge patch for field attributes. `id` is never patchable.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<DataType>,
    pub max_length: Option<Option<u32>>,
    pub required: Option<bool>,
    pub repeated: Option<bool>,
    pub default_value: Option<String>,
    pub dropdown_options: Option<Vec<String>>,
}

/// App-level configuration loaded from `scribe.yaml`. Everything is
/// optional; with no store wired the editor works purely in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub header: Option<String>,
    // Base command line of the store CLI, e.g. "${STORE_BIN}".
    #[serde(default)]
    pub store_cmd: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    // Fetch the stored configuration on startup. Default: true.
    #[serde(default = "default_true")]
    pub fetch_on_start: bool,
    // Push to the store after every committed mutation.
    #[serde(default)]
    pub autosave: bool,
    #[serde(default)]
    pub theme: Option<String>, // dark|light
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            header: Some("Scribe Studio".to_string()),
            store_cmd: None,
            template_id: None,
            fetch_on_start: true,
            autosave: false,
            theme: None,
        }
    }
}

fn default_true() -> bool {
    true
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    let has_store = cfg.store_cmd.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
    if cfg.template_id.is_some() && !has_store {
        return Err("template_id set but store_cmd is missing".to_string());
    }
    if cfg.autosave && (!has_store || cfg.template_id.is_none()) {
        return Err("autosave requires both store_cmd and template_id".to_string());
    }
    if let Some(t) = &cfg.theme {
        match t.as_str() {
            "dark" | "light" => {}
            other => return Err(format!("unknown theme: '{other}' (expected dark|light)")),
        }
    }
    Ok(())
}

pub fn fresh_section_id() -> String {
    format!("section-{}", Uuid::new_v4())
}

pub fn fresh_field_id() -> String {
    format!("field-{}", Uuid::new_v4())
}

impl Forest {
    /// The seed tree a new template starts from.
    pub fn template_default() -> Self {
        let seed_field = |id: &str, name: &str, data_type: DataType, required: bool| Field {
            id: id.to_string(),
            name: name.to_string(),
            data_type,
            required,
            ..Default::default()
        };
        let mut chief = Section::new("chief-complaint", "Chief Complaint");
        chief.fields = vec![
            Field {
                repeated: true,
                ..seed_field("field-location", "Location", DataType::Dropdown, true)
            },
            seed_field("field-severity", "Severity", DataType::Dropdown, false),
            seed_field("field-complaints", "Complaints", DataType::Textarea, false),
        ];
        let mut allergies = Section::new("allergies", "Allergies");
        allergies.disabled = true;
        let mut family = Section::new("family-history", "Family History");
        family.disabled = true;
        let mut social = Section::new("social-history", "Social History");
        social.children = vec![
            Section::new("sh-substance", "SH: Substance Use"),
            Section::new("sh-lifestyle", "SH: Lifestyle"),
        ];
        Self {
            sections: vec![
                chief,
                Section::new("hpi", "HPI"),
                allergies,
                Section::new("medications", "Medications"),
                Section::new("medical-history", "Medical History"),
                Section::new("surgical-history", "Surgical History"),
                Section::new("treatment-experience", "Treatment Experience"),
                family,
                social,
            ],
        }
    }
}
