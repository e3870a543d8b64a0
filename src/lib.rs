//! # Artist Pages
//!
//! Custom-section pages for artist endorsement profiles. An artist page is an
//! ordered list of **sections** (text, video, image gallery, tour dates, custom
//! HTML) that admins author and the storefront renders.
//!
//! # Architecture
//!
//! ```text
//! ArtistStore ──load──▶ SectionEditor ──save──▶ ArtistStore
//!      │
//!      └──list──▶ ArtistPage ──▶ SectionRenderer ──▶ generate (HTML documents)
//! ```
//!
//! Editing is in-memory with an explicit save that replaces the whole section
//! list. Rendering is a pure function of the record and the config, except for
//! the optional existence check of local gallery images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`section`] | Section model: sum type over section kinds, ordering and filtering, lenient decoding |
//! | [`gallery`] | Gallery configuration, defaults, layout resolver and scoped CSS |
//! | [`images`] | Image reference normalization, caption derivation, local image checks |
//! | [`render`] | Per-section HTML rendering with Maud |
//! | [`markup`] | Containment pass for custom HTML fragments |
//! | [`custom_html`] | Script splitting, script trust policy, script mount lifecycle |
//! | [`generate`] | Page documents, single-page output and parallel site build |
//! | [`editor`] | Authoring session: add, update, delete, move, gallery layout, save |
//! | [`artist`] | Artist record, published page view, record checks |
//! | [`store`] | Persistence trait and the JSON directory store |
//! | [`config`] | `config.toml` loading, validation and CSS generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Sum Type Over Type Tag
//!
//! A stored section is `{type, content, ...}` where the shape of `content`
//! depends on `type`. In memory that becomes [`section::SectionBody`], so a
//! gallery always has an image list and never a string. Changing a section's
//! type replaces the body outright, which is what keeps stale gallery images
//! from surviving a round trip through `text`.
//!
//! ## Lenient Decoding
//!
//! Records are written by several tools over time. Unknown section types are
//! kept verbatim and render nothing; malformed gallery settings and section
//! fields fall back to defaults field by field. A section without an id gets
//! one derived from its contents, so it stays the same across loads. A bad
//! section never makes the artist unloadable.
//!
//! ## Scripts Are Opt-In
//!
//! Custom HTML is closed off by [`markup::contain`] so it cannot swallow or
//! close the page around it. Scripts, event attributes and `javascript:` URLs
//! are stripped unless `custom_html.scripts = "execute"`. When enabled, scripts
//! ship as an inert JSON payload and a small loader attaches them once per
//! content hash. Stripping is not sanitizing: custom HTML is trusted markup.

pub mod artist;
pub mod config;
pub mod custom_html;
pub mod editor;
pub mod gallery;
pub mod generate;
pub mod images;
pub mod markup;
pub mod output;
pub mod render;
pub mod section;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
