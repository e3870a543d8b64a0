//! Shared test utilities.
//!
//! Builders for sections and records, plus in-memory [`ArtistStore`]
//! implementations, so module tests can exercise editing and rendering
//! without touching the filesystem.

use crate::artist::ArtistRecord;
use crate::section::{Section, SectionBody, SectionId, SectionKind};
use crate::store::{ArtistStore, StoreError};
use std::collections::BTreeMap;

// =========================================================================
// Section builders
// =========================================================================

/// Enabled text section with a deterministic id derived from the title.
pub fn text_section(title: &str, order: i64) -> Section {
    let mut section = Section::new(SectionKind::Text, title, order);
    section.id = SectionId::from(format!("s-{title}").as_str());
    section.body = SectionBody::Text(format!("{title} body"));
    section
}

/// Enabled gallery section with the given image references and no stored
/// config.
pub fn gallery_section(title: &str, order: i64, images: &[&str]) -> Section {
    let mut section = Section::new(SectionKind::Gallery, title, order);
    section.id = SectionId::from(format!("g-{title}").as_str());
    section.body = SectionBody::Gallery {
        images: images.iter().map(|s| s.to_string()).collect(),
        config: None,
    };
    section
}

/// Enabled section of `kind` with string content (ignored for kinds that
/// take none).
pub fn section_with(kind: SectionKind, title: &str, order: i64, content: &str) -> Section {
    let mut section = Section::new(kind, title, order);
    section.id = SectionId::from(format!("{kind}-{title}").as_str());
    section.body = match kind {
        SectionKind::Text => SectionBody::Text(content.to_string()),
        SectionKind::Video => SectionBody::Video(content.to_string()),
        SectionKind::CustomHtml => SectionBody::CustomHtml(content.to_string()),
        SectionKind::Gallery => SectionBody::Gallery {
            images: vec![content.to_string()],
            config: None,
        },
        SectionKind::BandsInTown => SectionBody::BandsInTown,
    };
    section
}

/// Artist with the custom template switched on and the given sections.
pub fn artist_with(name: &str, sections: Vec<Section>) -> ArtistRecord {
    let mut record = ArtistRecord::new(name.to_lowercase().replace(' ', "-"), name);
    record.use_custom_template = true;
    record.custom_sections = sections;
    record
}

// =========================================================================
// Stores
// =========================================================================

/// In-memory store keyed by artist id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, ArtistRecord>,
}

impl MemoryStore {
    pub fn with(record: ArtistRecord) -> Self {
        let mut store = Self::default();
        store.records.insert(record.id.clone(), record);
        store
    }

    pub fn and(mut self, record: ArtistRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }
}

impl ArtistStore for MemoryStore {
    fn load(&self, id: &str) -> Result<ArtistRecord, StoreError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<ArtistRecord>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }

    fn save_sections(
        &mut self,
        id: &str,
        sections: &[Section],
        use_custom_template: bool,
    ) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.custom_sections = sections.to_vec();
        record.use_custom_template = use_custom_template;
        Ok(())
    }
}

/// Store whose writes always fail, for save-failure paths.
pub struct FailingStore;

impl ArtistStore for FailingStore {
    fn load(&self, id: &str) -> Result<ArtistRecord, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<ArtistRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn save_sections(&mut self, _: &str, _: &[Section], _: bool) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }
}
