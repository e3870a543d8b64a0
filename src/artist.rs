//! Artist records as consumed from the storefront's data layer.
//!
//! Only the fields this crate reads or writes are typed. Everything else on
//! the record (bio, social links, product associations, template flags owned
//! by other surfaces) is carried in [`ArtistRecord::extra`] and written back
//! untouched on save.

use crate::config::is_css_color;
use crate::section::{Section, visible_in_order};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub custom_sections: Vec<Section>,
    /// When false the storefront shows its stock artist template and the
    /// custom sections are not published.
    #[serde(default)]
    pub use_custom_template: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtistRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: None,
            custom_sections: Vec::new(),
            use_custom_template: false,
            extra: Map::new(),
        }
    }
}

/// Read-only view of what an artist page publishes: enabled sections in
/// ascending `order`.
#[derive(Debug)]
pub struct ArtistPage<'a> {
    pub artist: &'a ArtistRecord,
    pub sections: Vec<&'a Section>,
}

impl<'a> ArtistPage<'a> {
    pub fn new(artist: &'a ArtistRecord) -> Self {
        let sections = if artist.use_custom_template {
            visible_in_order(&artist.custom_sections)
        } else {
            Vec::new()
        };
        Self { artist, sections }
    }
}

/// Data problem found in a stored record. None of these stop rendering; they
/// are reported by `check` so authors can fix them.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    UnknownType { section: String, kind: String },
    InvalidColor {
        section: String,
        field: &'static str,
        value: String,
    },
    DuplicateId(String),
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::UnknownType { section, kind } => {
                write!(f, "section {section}: unknown type {kind:?} (kept, not rendered)")
            }
            RecordIssue::InvalidColor {
                section,
                field,
                value,
            } => write!(f, "section {section}: {field} {value:?} is not a CSS color"),
            RecordIssue::DuplicateId(id) => write!(f, "section id {id} is used more than once"),
        }
    }
}

/// Inspect a record's sections for data problems.
pub fn check_record(record: &ArtistRecord) -> Vec<RecordIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    for section in &record.custom_sections {
        let id = section.id.as_str();
        if !seen.insert(id) {
            issues.push(RecordIssue::DuplicateId(id.to_string()));
        }
        if section.kind().is_none() {
            issues.push(RecordIssue::UnknownType {
                section: id.to_string(),
                kind: section.body.type_name().to_string(),
            });
        }
        for (field, value) in [("bgColor", &section.bg_color), ("textColor", &section.text_color)] {
            if let Some(value) = value
                && !is_css_color(value)
            {
                issues.push(RecordIssue::InvalidColor {
                    section: id.to_string(),
                    field,
                    value: value.clone(),
                });
            }
        }
    }
    issues
}
