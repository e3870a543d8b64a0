//! Section model for artist custom pages.
//!
//! A page is an ordered list of [`Section`]s. Each section carries a common
//! header (id, title, visibility, order, color overrides) and a [`SectionBody`]
//! whose variant fixes the shape of the content:
//!
//! | `type`        | content                          |
//! |---------------|----------------------------------|
//! | `text`        | body copy (string)               |
//! | `video`       | embed URL (string)               |
//! | `gallery`     | image references (list) + config |
//! | `bandsintown` | none (keyed by artist name)      |
//! | `custom_html` | raw markup (string)              |
//!
//! ## Wire Format
//!
//! Sections are stored as flat JSON objects inside the artist record:
//!
//! ```json
//! {
//!   "id": "section-3f0c…",
//!   "type": "gallery",
//!   "title": "On Tour",
//!   "content": ["images/a.jpg", "images/b.jpg"],
//!   "enabled": true,
//!   "order": 2,
//!   "galleryConfig": { "gridColumns": { "mobile": 1, "tablet": 2, "desktop": 4 } },
//!   "bgColor": "#111"
//! }
//! ```
//!
//! Decoding never fails on a section's fields: a known type whose `content`
//! has the wrong JSON shape decodes to that type's empty content, a `title`,
//! `enabled` or `order` of the wrong JSON type falls back to its default, and
//! an unrecognized `type` decodes to [`SectionBody::Unknown`], which is kept
//! verbatim in storage and renders nothing. A section stored without an `id`
//! gets one derived from its contents, stable across loads.

use crate::gallery::PartialGalleryConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Opaque, stable section identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Generate a fresh identifier. Identifiers are random, so a deleted
    /// section's id is never handed out again.
    pub fn generate() -> Self {
        Self(format!("section-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Identifier for a stored section that has none, derived from its type,
    /// title, order and content so that every load of the record agrees.
    fn derived(kind: &str, title: &str, order: i64, content: &Value) -> Self {
        let digest = Sha256::digest(serde_json::json!([kind, title, order, content]).to_string());
        Self(format!("section-{}", &format!("{digest:x}")[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of section types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Text,
    Gallery,
    Video,
    BandsInTown,
    CustomHtml,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Text,
        SectionKind::Gallery,
        SectionKind::Video,
        SectionKind::BandsInTown,
        SectionKind::CustomHtml,
    ];

    /// Wire name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Text => "text",
            SectionKind::Gallery => "gallery",
            SectionKind::Video => "video",
            SectionKind::BandsInTown => "bandsintown",
            SectionKind::CustomHtml => "custom_html",
        }
    }

    /// Frame class carrying the type's default colors (`section-custom-html`).
    pub fn css_class(self) -> &'static str {
        match self {
            SectionKind::Text => "section-text",
            SectionKind::Gallery => "section-gallery",
            SectionKind::Video => "section-video",
            SectionKind::BandsInTown => "section-bandsintown",
            SectionKind::CustomHtml => "section-custom-html",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = SectionKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown section type '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Type-specific payload of a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Text(String),
    Video(String),
    Gallery {
        images: Vec<String>,
        /// Layout policy as stored; `None` resolves to the documented defaults.
        config: Option<PartialGalleryConfig>,
    },
    BandsInTown,
    CustomHtml(String),
    /// A `type` this build does not recognize. Preserved so saving an edited
    /// page does not destroy data written by a newer authoring surface.
    Unknown { kind: String, content: Value },
}

impl SectionBody {
    /// Empty content appropriate to `kind`.
    pub fn empty(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Text => SectionBody::Text(String::new()),
            SectionKind::Video => SectionBody::Video(String::new()),
            SectionKind::Gallery => SectionBody::Gallery {
                images: Vec::new(),
                config: None,
            },
            SectionKind::BandsInTown => SectionBody::BandsInTown,
            SectionKind::CustomHtml => SectionBody::CustomHtml(String::new()),
        }
    }

    /// The section type, or `None` for unknown types.
    pub fn kind(&self) -> Option<SectionKind> {
        match self {
            SectionBody::Text(_) => Some(SectionKind::Text),
            SectionBody::Video(_) => Some(SectionKind::Video),
            SectionBody::Gallery { .. } => Some(SectionKind::Gallery),
            SectionBody::BandsInTown => Some(SectionKind::BandsInTown),
            SectionBody::CustomHtml(_) => Some(SectionKind::CustomHtml),
            SectionBody::Unknown { .. } => None,
        }
    }

    /// Wire name of the type, including unknown ones.
    pub fn type_name(&self) -> &str {
        match self {
            SectionBody::Unknown { kind, .. } => kind,
            other => other.kind().map(SectionKind::as_str).unwrap_or_default(),
        }
    }
}

/// One addressable content block on an artist's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SectionRecord", into = "SectionRecord")]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub enabled: bool,
    pub order: i64,
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub body: SectionBody,
}

impl Section {
    /// A new enabled section with empty content of the given kind.
    pub fn new(kind: SectionKind, title: impl Into<String>, order: i64) -> Self {
        Self {
            id: SectionId::generate(),
            title: title.into(),
            enabled: true,
            order,
            bg_color: None,
            text_color: None,
            body: SectionBody::empty(kind),
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        self.body.kind()
    }
}

/// Sort sections ascending by `order`.
///
/// The sort is stable: sections with equal `order` keep their original
/// relative position, so sorting an already sorted list changes nothing.
pub fn sort_by_order(mut sections: Vec<Section>) -> Vec<Section> {
    sections.sort_by_key(|s| s.order);
    sections
}

/// Keep only enabled sections, preserving relative order.
pub fn filter_enabled(sections: Vec<Section>) -> Vec<Section> {
    sections.into_iter().filter(|s| s.enabled).collect()
}

/// Borrowing variant of `filter_enabled` + `sort_by_order`, used by the
/// render path which only reads.
pub fn visible_in_order(sections: &[Section]) -> Vec<&Section> {
    let mut visible: Vec<&Section> = sections.iter().filter(|s| s.enabled).collect();
    visible.sort_by_key(|s| s.order);
    visible
}

// ============================================================================
// Wire representation
// ============================================================================

/// Flat JSON shape of a section as persisted in the artist record.
///
/// Every field decodes leniently: a value of the wrong JSON type falls back
/// to the field's default with a warning instead of failing the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default)]
    content: Value,
    #[serde(default = "default_enabled", deserialize_with = "lenient_enabled")]
    enabled: bool,
    #[serde(default, deserialize_with = "lenient_order")]
    order: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::gallery::lenient"
    )]
    gallery_config: Option<PartialGalleryConfig>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::gallery::lenient"
    )]
    bg_color: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::gallery::lenient"
    )]
    text_color: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => None,
        other => {
            warn!(found = json_kind(&other), "ignoring non-string section id");
            None
        }
    })
}

/// Strings as-is, numbers and booleans in their JSON spelling.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => {
            warn!(found = json_kind(&other), "expected string section field, using empty");
            String::new()
        }
    })
}

fn lenient_enabled<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let enabled = match &value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    if enabled.is_none() && !value.is_null() {
        warn!(found = json_kind(&value), "unreadable section enabled flag, treating as enabled");
    }
    Ok(enabled.unwrap_or_else(default_enabled))
}

fn lenient_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let order = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if order.is_none() && !value.is_null() {
        warn!(found = json_kind(&value), "unreadable section order, using 0");
    }
    Ok(order.unwrap_or_default())
}

impl From<SectionRecord> for Section {
    fn from(record: SectionRecord) -> Self {
        let id = match record.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => SectionId(id),
            None => SectionId::derived(&record.kind, &record.title, record.order, &record.content),
        };

        let body = match record.kind.parse::<SectionKind>() {
            Ok(SectionKind::Text) => SectionBody::Text(string_content(&id, record.content)),
            Ok(SectionKind::Video) => SectionBody::Video(string_content(&id, record.content)),
            Ok(SectionKind::CustomHtml) => {
                SectionBody::CustomHtml(string_content(&id, record.content))
            }
            Ok(SectionKind::Gallery) => SectionBody::Gallery {
                images: list_content(&id, record.content),
                config: record.gallery_config,
            },
            Ok(SectionKind::BandsInTown) => SectionBody::BandsInTown,
            Err(_) => SectionBody::Unknown {
                kind: record.kind,
                content: record.content,
            },
        };

        Section {
            id,
            title: record.title,
            enabled: record.enabled,
            order: record.order,
            bg_color: record.bg_color.filter(|c| !c.trim().is_empty()),
            text_color: record.text_color.filter(|c| !c.trim().is_empty()),
            body,
        }
    }
}

impl From<Section> for SectionRecord {
    fn from(section: Section) -> Self {
        let kind = section.body.type_name().to_string();
        let (content, gallery_config) = match section.body {
            SectionBody::Text(s) | SectionBody::Video(s) | SectionBody::CustomHtml(s) => {
                (Value::String(s), None)
            }
            SectionBody::Gallery { images, config } => (
                Value::Array(images.into_iter().map(Value::String).collect()),
                config,
            ),
            SectionBody::BandsInTown => (Value::String(String::new()), None),
            SectionBody::Unknown { content, .. } => (content, None),
        };
        SectionRecord {
            id: Some(section.id.0),
            kind,
            title: section.title,
            content,
            enabled: section.enabled,
            order: section.order,
            gallery_config,
            bg_color: section.bg_color,
            text_color: section.text_color,
        }
    }
}

fn string_content(id: &SectionId, content: Value) -> String {
    match content {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => {
            warn!(section = %id, found = json_kind(&other), "expected string content, using empty");
            String::new()
        }
    }
}

fn list_content(id: &SectionId, content: Value) -> Vec<String> {
    match content {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                Value::String(_) => None,
                other => {
                    warn!(section = %id, found = json_kind(&other), "skipping non-string image reference");
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(section = %id, found = json_kind(&other), "expected image list, using empty");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
