//! Field-mapping models and direction resolution

use serde::{Deserialize, Serialize};

/// Raw direction values that mean "exiting". Covers the legacy `Exited`
/// and `Out` spellings kept for configuration compatibility.
const EXITING_ALIASES: [&str; 3] = ["Exited", "Exiting", "Out"];

/// Transition direction derived from a mapping's date fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Entering,
    Exiting,
    #[default]
    Unknown,
}

impl Direction {
    /// Parse a stored direction string, alias-aware. Unrecognized
    /// non-blank text maps to `Unknown` rather than failing.
    pub fn from_raw(raw: &str) -> Self {
        if EXITING_ALIASES.contains(&raw) {
            Direction::Exiting
        } else if raw == "Entering" {
            Direction::Entering
        } else {
            Direction::Unknown
        }
    }
}

/// One per-record mapping configuration as stored remotely
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    pub picklist_field: String,
    pub picklist_value: String,
    pub entry_date_field: String,
    pub exit_date_field: String,
    pub raw_direction: String,
}

/// Display-ready mapping produced by [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMapping {
    pub picklist_field: String,
    pub picklist_value: String,
    pub direction: Direction,
    pub date_field: String,
}

/// Mapping data as fetched from the remote configuration store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingBundle {
    /// Opaque tree presentation data, passed through untouched
    pub tree_nodes: Vec<serde_json::Value>,

    pub mapping_details: Vec<FieldMapping>,
}

/// Resolved mapping data ready for presentation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMappings {
    pub tree_nodes: Vec<serde_json::Value>,
    pub mappings: Vec<ResolvedMapping>,
}

impl ResolvedMappings {
    pub fn from_bundle(bundle: MappingBundle) -> Self {
        Self {
            tree_nodes: bundle.tree_nodes,
            mappings: bundle.mapping_details.iter().map(resolve).collect(),
        }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn is_exiting_alias(raw: &str) -> bool {
    EXITING_ALIASES.contains(&raw)
}

/// Derive the display direction and date field for one raw mapping.
///
/// Precedence, first match wins:
/// 1. Exit field only: always `Exiting`, whatever the stored direction says.
/// 2. Entry field only: stored direction decides, exiting aliases included;
///    everything else (blank too) means `Entering`.
/// 3. Both fields set (malformed legacy record): same inference as rule 2,
///    entry field wins for display.
/// 4. Neither field: fall back to the stored direction, `Unknown` when blank.
///
/// Total and deterministic; never fails.
pub fn resolve(mapping: &FieldMapping) -> ResolvedMapping {
    let has_entry = !is_blank(&mapping.entry_date_field);
    let has_exit = !is_blank(&mapping.exit_date_field);

    let (direction, date_field) = if has_exit && !has_entry {
        (Direction::Exiting, mapping.exit_date_field.clone())
    } else if has_entry {
        let direction = if is_exiting_alias(&mapping.raw_direction) {
            Direction::Exiting
        } else {
            Direction::Entering
        };
        (direction, mapping.entry_date_field.clone())
    } else if !is_blank(&mapping.raw_direction) {
        (Direction::from_raw(&mapping.raw_direction), String::new())
    } else {
        (Direction::Unknown, String::new())
    };

    ResolvedMapping {
        picklist_field: mapping.picklist_field.clone(),
        picklist_value: mapping.picklist_value.clone(),
        direction,
        date_field,
    }
}
