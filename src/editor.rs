//! Section editor: the authoring side of artist pages.
//!
//! An editor owns an in-memory copy of one artist record. Every mutation is
//! local until [`SectionEditor::save`] hands the complete collection to an
//! [`ArtistStore`]; there is no autosave, and dropping an editor with unsaved
//! changes discards them. A failed save keeps the edits so the admin can
//! retry.
//!
//! Indices address sections in storage order (the order the admin sees them
//! listed), not render order.

use crate::artist::ArtistRecord;
use crate::gallery::{GalleryConfig, PartialGalleryConfig};
use crate::section::{Section, SectionBody, SectionId, SectionKind};
use crate::store::{ArtistStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Title given to freshly added sections.
pub const NEW_SECTION_TITLE: &str = "New Section";

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("No section at index {index} (page has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{content} content does not fit a {kind} section")]
    ContentMismatch { kind: String, content: &'static str },
    #[error("Section {0} is not a gallery")]
    NotAGallery(SectionId),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// New content for a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionContent {
    /// Body copy, embed URL or raw markup, depending on the section type.
    Text(String),
    /// Gallery image references, in display order.
    Images(Vec<String>),
}

impl SectionContent {
    fn describe(&self) -> &'static str {
        match self {
            SectionContent::Text(_) => "text",
            SectionContent::Images(_) => "image list",
        }
    }
}

/// Partial update of one section. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub kind: Option<SectionKind>,
    pub content: Option<SectionContent>,
    pub enabled: Option<bool>,
    pub order: Option<i64>,
    /// `Some(None)` clears the override.
    pub bg_color: Option<Option<String>>,
    pub text_color: Option<Option<String>>,
}

/// Direction for [`SectionEditor::move_section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// In-memory authoring session for one artist's sections.
#[derive(Debug)]
pub struct SectionEditor {
    record: ArtistRecord,
    dirty: bool,
}

impl SectionEditor {
    pub fn new(record: ArtistRecord) -> Self {
        Self {
            record,
            dirty: false,
        }
    }

    /// Open an editor on a stored artist.
    pub fn open<S: ArtistStore + ?Sized>(store: &S, id: &str) -> Result<Self, EditorError> {
        Ok(Self::new(store.load(id)?))
    }

    pub fn record(&self) -> &ArtistRecord {
        &self.record
    }

    pub fn sections(&self) -> &[Section] {
        &self.record.custom_sections
    }

    /// Whether there are changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn section_mut(&mut self, index: usize) -> Result<&mut Section, EditorError> {
        let len = self.record.custom_sections.len();
        self.record
            .custom_sections
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })
    }

    /// Append a new text section after every existing one.
    pub fn add_section(&mut self) -> &Section {
        let order = self
            .record
            .custom_sections
            .iter()
            .map(|s| s.order)
            .max()
            .map_or(1, |max| max.saturating_add(1));
        let section = Section::new(SectionKind::Text, NEW_SECTION_TITLE, order);
        debug!(id = %section.id, order, "added section");
        self.record.custom_sections.push(section);
        self.dirty = true;
        let last = self.record.custom_sections.len() - 1;
        &self.record.custom_sections[last]
    }

    /// Merge `patch` into the section at `index`.
    ///
    /// Changing the type resets content to the new type's empty value before
    /// any content in the same patch is applied, so a gallery's image list can
    /// never end up in a text field. The patch is validated as a whole; on
    /// error nothing changes.
    pub fn update_section(&mut self, index: usize, patch: SectionPatch) -> Result<(), EditorError> {
        let section = self.section_mut(index)?;

        let mut body = match patch.kind {
            Some(kind) if section.kind() != Some(kind) => {
                debug!(id = %section.id, from = section.body.type_name(), to = %kind, "section type changed");
                SectionBody::empty(kind)
            }
            _ => section.body.clone(),
        };

        if let Some(content) = patch.content {
            apply_content(&mut body, content)?;
        }

        section.body = body;
        if let Some(title) = patch.title {
            section.title = title;
        }
        if let Some(enabled) = patch.enabled {
            section.enabled = enabled;
        }
        if let Some(order) = patch.order {
            section.order = order;
        }
        if let Some(bg) = patch.bg_color {
            section.bg_color = bg.filter(|c| !c.trim().is_empty());
        }
        if let Some(text) = patch.text_color {
            section.text_color = text.filter(|c| !c.trim().is_empty());
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove the section at `index`. Remaining `order` values are kept as-is.
    pub fn delete_section(&mut self, index: usize) -> Result<Section, EditorError> {
        let len = self.record.custom_sections.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        let removed = self.record.custom_sections.remove(index);
        debug!(id = %removed.id, "deleted section");
        self.dirty = true;
        Ok(removed)
    }

    /// Move a section one step in render order by exchanging places with its
    /// neighbour. Returns the section's new index. Moving past either end is
    /// a no-op.
    pub fn move_section(&mut self, index: usize, direction: Direction) -> Result<usize, EditorError> {
        let len = self.record.custom_sections.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }

        // Render order is a stable sort on `order`, so (order, index) is the
        // effective position of every section.
        let mut positions: Vec<usize> = (0..len).collect();
        positions.sort_by_key(|&i| (self.record.custom_sections[i].order, i));
        let rank = positions
            .iter()
            .position(|&i| i == index)
            .unwrap_or_default();
        let neighbour_rank = match direction {
            Direction::Up if rank > 0 => rank - 1,
            Direction::Down if rank + 1 < len => rank + 1,
            _ => return Ok(index),
        };
        let neighbour = positions[neighbour_rank];

        let sections = &mut self.record.custom_sections;
        let (a, b) = (sections[index].order, sections[neighbour].order);
        sections[index].order = b;
        sections[neighbour].order = a;
        sections.swap(index, neighbour);
        self.dirty = true;
        Ok(neighbour)
    }

    /// Merge a partial gallery configuration into the section at `index`,
    /// starting from the defaults when the section has none yet.
    pub fn update_gallery_config(
        &mut self,
        index: usize,
        patch: PartialGalleryConfig,
    ) -> Result<(), EditorError> {
        let section = self.section_mut(index)?;
        let id = section.id.clone();
        let SectionBody::Gallery { config, .. } = &mut section.body else {
            return Err(EditorError::NotAGallery(id));
        };
        let base = config.unwrap_or_else(|| GalleryConfig::default().into());
        *config = Some(base.merge(patch));
        self.dirty = true;
        Ok(())
    }

    pub fn set_use_custom_template(&mut self, enabled: bool) {
        if self.record.use_custom_template != enabled {
            self.record.use_custom_template = enabled;
            self.dirty = true;
        }
    }

    /// Persist the whole section collection. On failure the in-memory state
    /// is untouched and still dirty.
    pub fn save<S: ArtistStore + ?Sized>(&mut self, store: &mut S) -> Result<(), EditorError> {
        let result = store.save_sections(
            &self.record.id,
            &self.record.custom_sections,
            self.record.use_custom_template,
        );
        match result {
            Ok(()) => {
                info!(artist = %self.record.id, sections = self.record.custom_sections.len(), "saved sections");
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!(artist = %self.record.id, error = %e, "save failed, keeping edits");
                Err(e.into())
            }
        }
    }
}

fn apply_content(body: &mut SectionBody, content: SectionContent) -> Result<(), EditorError> {
    match (body, content) {
        (SectionBody::Text(s) | SectionBody::Video(s) | SectionBody::CustomHtml(s), SectionContent::Text(new)) => {
            *s = new;
            Ok(())
        }
        (SectionBody::Gallery { images, .. }, SectionContent::Images(new)) => {
            *images = new
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Ok(())
        }
        // Tour dates are configured from the artist name alone.
        (SectionBody::BandsInTown, _) => Ok(()),
        (body, content) => Err(EditorError::ContentMismatch {
            kind: body.type_name().to_string(),
            content: content.describe(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{AspectRatio, Gap, HoverEffect, PartialGridColumns};
    use crate::test_helpers::*;

    fn editor_with(sections: Vec<Section>) -> SectionEditor {
        let mut record = ArtistRecord::new("kim", "Kim");
        record.custom_sections = sections;
        SectionEditor::new(record)
    }

    fn titles(editor: &SectionEditor) -> Vec<&str> {
        editor.sections().iter().map(|s| s.title.as_str()).collect()
    }

    // =========================================================================
    // add_section
    // =========================================================================

    #[test]
    fn add_to_empty_page() {
        let mut editor = editor_with(vec![]);
        let section = editor.add_section();
        assert_eq!(section.order, 1);
        assert!(section.enabled);
        assert_eq!(section.kind(), Some(SectionKind::Text));
        assert_eq!(section.title, NEW_SECTION_TITLE);
        assert!(editor.is_dirty());
    }

    #[test]
    fn add_uses_max_order_plus_one() {
        let mut editor = editor_with(vec![text_section("a", 7), text_section("b", 2)]);
        assert_eq!(editor.add_section().order, 8);
        assert_eq!(editor.sections().len(), 3);
    }

    #[test]
    fn added_ids_are_unique() {
        let mut editor = editor_with(vec![]);
        let a = editor.add_section().id.clone();
        let b = editor.add_section().id.clone();
        assert_ne!(a, b);
    }

    // =========================================================================
    // update_section
    // =========================================================================

    #[test]
    fn update_merges_fields() {
        let mut editor = editor_with(vec![text_section("old", 1)]);
        editor
            .update_section(
                0,
                SectionPatch {
                    title: Some("Bio".into()),
                    content: Some(SectionContent::Text("Fuzz forever.".into())),
                    bg_color: Some(Some("#000".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        let s = &editor.sections()[0];
        assert_eq!(s.title, "Bio");
        assert_eq!(s.body, SectionBody::Text("Fuzz forever.".into()));
        assert_eq!(s.bg_color.as_deref(), Some("#000"));
        assert_eq!(s.order, 1);
        assert!(s.enabled);
    }

    #[test]
    fn clearing_a_color_override() {
        let mut s = text_section("x", 1);
        s.text_color = Some("red".into());
        let mut editor = editor_with(vec![s]);
        editor
            .update_section(
                0,
                SectionPatch {
                    text_color: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(editor.sections()[0].text_color, None);
    }

    #[test]
    fn type_change_resets_content() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &["a.jpg", "b.jpg"])]);
        editor
            .update_section(
                0,
                SectionPatch {
                    kind: Some(SectionKind::Text),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(editor.sections()[0].body, SectionBody::Text(String::new()));

        editor
            .update_section(
                0,
                SectionPatch {
                    kind: Some(SectionKind::Gallery),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            editor.sections()[0].body,
            SectionBody::Gallery {
                images: vec![],
                config: None
            }
        );
    }

    #[test]
    fn gallery_text_gallery_leaves_no_stale_shape() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &["a.jpg"])]);
        editor
            .update_gallery_config(
                0,
                PartialGalleryConfig {
                    gap: Some(Gap::Lg),
                    ..Default::default()
                },
            )
            .unwrap();
        for kind in [SectionKind::Text, SectionKind::Gallery] {
            editor
                .update_section(
                    0,
                    SectionPatch {
                        kind: Some(kind),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        let json = serde_json::to_value(&editor.sections()[0]).unwrap();
        assert_eq!(json["content"], serde_json::json!([]));
        assert!(json.get("galleryConfig").is_none());
    }

    #[test]
    fn same_type_patch_keeps_content() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &["a.jpg"])]);
        editor
            .update_section(
                0,
                SectionPatch {
                    kind: Some(SectionKind::Gallery),
                    title: Some("Live".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            &editor.sections()[0].body,
            SectionBody::Gallery { images, .. } if images == &vec!["a.jpg".to_string()]
        ));
    }

    #[test]
    fn type_change_with_matching_content() {
        let mut editor = editor_with(vec![text_section("t", 1)]);
        editor
            .update_section(
                0,
                SectionPatch {
                    kind: Some(SectionKind::Video),
                    content: Some(SectionContent::Text("https://video.example/embed/1".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            editor.sections()[0].body,
            SectionBody::Video("https://video.example/embed/1".into())
        );
    }

    #[test]
    fn mismatched_content_is_rejected_atomically() {
        let mut editor = editor_with(vec![text_section("t", 1)]);
        let err = editor
            .update_section(
                0,
                SectionPatch {
                    title: Some("changed".into()),
                    content: Some(SectionContent::Images(vec!["a.jpg".into()])),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::ContentMismatch { .. }));
        assert_eq!(editor.sections()[0].title, "t");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn gallery_content_drops_blank_references() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &[])]);
        editor
            .update_section(
                0,
                SectionPatch {
                    content: Some(SectionContent::Images(vec![" a.jpg ".into(), "  ".into()])),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            &editor.sections()[0].body,
            SectionBody::Gallery { images, .. } if images == &vec!["a.jpg".to_string()]
        ));
    }

    #[test]
    fn bandsintown_ignores_content() {
        let mut editor = editor_with(vec![text_section("t", 1)]);
        editor
            .update_section(
                0,
                SectionPatch {
                    kind: Some(SectionKind::BandsInTown),
                    content: Some(SectionContent::Text("ignored".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(editor.sections()[0].body, SectionBody::BandsInTown);
    }

    #[test]
    fn update_out_of_range() {
        let mut editor = editor_with(vec![]);
        let err = editor.update_section(3, SectionPatch::default()).unwrap_err();
        assert!(matches!(err, EditorError::IndexOutOfRange { index: 3, len: 0 }));
    }

    // =========================================================================
    // delete_section
    // =========================================================================

    #[test]
    fn delete_middle_keeps_orders() {
        let mut editor = editor_with(vec![
            text_section("one", 1),
            text_section("two", 2),
            text_section("three", 3),
        ]);
        let removed = editor.delete_section(1).unwrap();
        assert_eq!(removed.title, "two");
        assert_eq!(titles(&editor), vec!["one", "three"]);
        let orders: Vec<i64> = editor.sections().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 3]);
    }

    #[test]
    fn delete_out_of_range() {
        let mut editor = editor_with(vec![text_section("a", 1)]);
        assert!(editor.delete_section(1).is_err());
        assert_eq!(editor.sections().len(), 1);
    }

    // =========================================================================
    // move_section
    // =========================================================================

    #[test]
    fn move_up_swaps_with_render_neighbour() {
        // Storage order differs from render order.
        let mut editor = editor_with(vec![
            text_section("c", 30),
            text_section("a", 10),
            text_section("b", 20),
        ]);
        let new_index = editor.move_section(2, Direction::Up).unwrap();
        assert_eq!(new_index, 1);

        let rendered: Vec<&str> = crate::section::visible_in_order(editor.sections())
            .into_iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(rendered, vec!["b", "a", "c"]);
    }

    #[test]
    fn move_with_equal_orders() {
        let mut editor = editor_with(vec![text_section("a", 1), text_section("b", 1)]);
        editor.move_section(1, Direction::Up).unwrap();
        let rendered: Vec<&str> = crate::section::visible_in_order(editor.sections())
            .into_iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(rendered, vec!["b", "a"]);
    }

    #[test]
    fn move_past_ends_is_noop() {
        let mut editor = editor_with(vec![text_section("a", 1), text_section("b", 2)]);
        assert_eq!(editor.move_section(0, Direction::Up).unwrap(), 0);
        assert_eq!(editor.move_section(1, Direction::Down).unwrap(), 1);
        assert!(!editor.is_dirty());
    }

    // =========================================================================
    // update_gallery_config
    // =========================================================================

    #[test]
    fn gallery_config_starts_from_defaults() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &[])]);
        editor
            .update_gallery_config(
                0,
                PartialGalleryConfig {
                    aspect_ratio: Some(AspectRatio::Portrait),
                    ..Default::default()
                },
            )
            .unwrap();
        let SectionBody::Gallery { config: Some(config), .. } = &editor.sections()[0].body else {
            panic!("expected stored config");
        };
        assert_eq!(config.aspect_ratio, Some(AspectRatio::Portrait));
        assert_eq!(config.hover_effect, Some(HoverEffect::Scale));
        assert_eq!(config.lightbox, Some(true));
    }

    #[test]
    fn gallery_config_preserves_unspecified_fields() {
        let mut editor = editor_with(vec![gallery_section("g", 1, &[])]);
        editor
            .update_gallery_config(
                0,
                PartialGalleryConfig {
                    grid_columns: Some(PartialGridColumns {
                        desktop: Some(6),
                        ..Default::default()
                    }),
                    gap: Some(Gap::Sm),
                    ..Default::default()
                },
            )
            .unwrap();
        editor
            .update_gallery_config(
                0,
                PartialGalleryConfig {
                    grid_columns: Some(PartialGridColumns {
                        mobile: Some(2),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .unwrap();
        let SectionBody::Gallery { config: Some(config), .. } = &editor.sections()[0].body else {
            panic!("expected stored config");
        };
        let cols = config.grid_columns.unwrap();
        assert_eq!((cols.mobile, cols.tablet, cols.desktop), (Some(2), Some(2), Some(6)));
        assert_eq!(config.gap, Some(Gap::Sm));
    }

    #[test]
    fn gallery_config_on_text_is_rejected() {
        let mut editor = editor_with(vec![text_section("t", 1)]);
        let err = editor
            .update_gallery_config(0, PartialGalleryConfig::default())
            .unwrap_err();
        assert!(matches!(err, EditorError::NotAGallery(_)));
    }

    // =========================================================================
    // save
    // =========================================================================

    #[test]
    fn save_persists_and_clears_dirty() {
        let mut store = MemoryStore::with(ArtistRecord::new("kim", "Kim"));
        let mut editor = SectionEditor::open(&store, "kim").unwrap();
        editor.add_section();
        editor.set_use_custom_template(true);
        editor.save(&mut store).unwrap();

        assert!(!editor.is_dirty());
        let saved = store.load("kim").unwrap();
        assert_eq!(saved.custom_sections.len(), 1);
        assert!(saved.use_custom_template);
    }

    #[test]
    fn failed_save_keeps_edits() {
        let mut store = FailingStore;
        let mut editor = editor_with(vec![]);
        editor.add_section();
        let err = editor.save(&mut store).unwrap_err();
        assert!(matches!(err, EditorError::Store(_)));
        assert!(editor.is_dirty());
        assert_eq!(editor.sections().len(), 1);
    }

    #[test]
    fn unsaved_edits_do_not_reach_store() {
        let store = MemoryStore::with(ArtistRecord::new("kim", "Kim"));
        {
            let mut editor = SectionEditor::open(&store, "kim").unwrap();
            editor.add_section();
        }
        assert!(store.load("kim").unwrap().custom_sections.is_empty());
    }
}
