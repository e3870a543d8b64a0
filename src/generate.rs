//! Static page generation.
//!
//! Wraps rendered sections into complete HTML documents and writes them to
//! an output directory.
//!
//! ## Generated Pages
//!
//! - **Index page** (`/index.html`): links to every artist page
//! - **Artist pages** (`/{id}/index.html`): header (name, portrait) followed by
//!   the artist's enabled sections in order
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── kim-deal/
//! │   └── index.html
//! └── j-mascis/
//!     └── index.html
//! ```
//!
//! Images are referenced by their normalized public path (`/images/...`) and
//! are not copied; the storefront serves them.
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (colors injected from config)
//! - `static/custom_html.js`: Script loader for custom HTML blocks, only
//!   included on pages that execute scripts
//!
//! ## Parallelism
//!
//! [`build`] renders artists with rayon's `par_iter` on the global pool; the
//! CLI sizes that pool from `processing.max_processes`. One artist failing
//! does not stop the others.

use crate::artist::{ArtistPage, ArtistRecord};
use crate::config::{self, SiteConfig};
use crate::images::normalize_with_prefix;
use crate::render::SectionRenderer;
use crate::store::{ArtistStore, StoreError, is_valid_artist_id};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Artist id {0:?} cannot be used as an output directory")]
    InvalidId(String),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const CUSTOM_HTML_JS: &str = include_str!("../static/custom_html.js");

/// One written artist page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Sections rendered on the page (enabled, known type).
    pub sections: usize,
    /// Whether the page carries the custom HTML script loader.
    pub scripts: bool,
}

/// Result of a full build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub pages: Vec<PageReport>,
    pub failures: Vec<(String, BuildError)>,
    pub index: Option<PathBuf>,
}

/// Full stylesheet for a page: config colors, section defaults, base styles.
pub fn page_css(config: &SiteConfig) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        config::generate_color_css(&config.colors),
        config::generate_section_css(&config.sections),
        CSS_STATIC
    )
}

/// Render one artist page, also reporting whether it needs the script loader.
fn render_page(artist: &ArtistRecord, config: &SiteConfig, css: &str) -> (Markup, usize, bool) {
    let page = ArtistPage::new(artist);
    let renderer = SectionRenderer::new(config, &artist.name);
    let loader = page.sections.iter().any(|s| renderer.executes_scripts(s));
    let rendered = page.sections.iter().filter(|s| s.kind().is_some()).count();

    let content = html! {
        (artist_header(artist, config))
        main.artist-sections {
            @for section in &page.sections {
                (renderer.render(section))
            }
        }
        @if loader {
            script { (PreEscaped(CUSTOM_HTML_JS)) }
        }
    };

    (
        base_document(&artist.name, css, Some("artist-page"), content),
        rendered,
        loader,
    )
}

/// Render a complete artist page document.
pub fn render_artist_page(artist: &ArtistRecord, config: &SiteConfig) -> Markup {
    render_page(artist, config, &page_css(config)).0
}

/// Render and write `<output_dir>/<id>/index.html`.
pub fn write_artist_page(
    artist: &ArtistRecord,
    config: &SiteConfig,
    output_dir: &Path,
) -> Result<PageReport, BuildError> {
    write_page_with_css(artist, config, output_dir, &page_css(config))
}

fn write_page_with_css(
    artist: &ArtistRecord,
    config: &SiteConfig,
    output_dir: &Path,
    css: &str,
) -> Result<PageReport, BuildError> {
    if !is_valid_artist_id(&artist.id) {
        return Err(BuildError::InvalidId(artist.id.clone()));
    }
    let (markup, sections, scripts) = render_page(artist, config, css);
    let dir = output_dir.join(&artist.id);
    fs::create_dir_all(&dir)?;
    let path = dir.join("index.html");
    fs::write(&path, markup.into_string())?;
    debug!(artist = %artist.id, sections, scripts, "wrote artist page");

    Ok(PageReport {
        id: artist.id.clone(),
        name: artist.name.clone(),
        path,
        sections,
        scripts,
    })
}

/// Render every artist in the store plus an index page.
///
/// Per-artist failures are collected in the summary; only failing to list
/// the store or to write the index is fatal.
pub fn build<S>(store: &S, config: &SiteConfig, output_dir: &Path) -> Result<BuildSummary, BuildError>
where
    S: ArtistStore + ?Sized,
{
    let artists = store.list()?;
    fs::create_dir_all(output_dir)?;
    let css = page_css(config);

    let results: Vec<(String, Result<PageReport, BuildError>)> = artists
        .par_iter()
        .map(|artist| {
            (
                artist.id.clone(),
                write_page_with_css(artist, config, output_dir, &css),
            )
        })
        .collect();

    let mut summary = BuildSummary::default();
    for (id, result) in results {
        match result {
            Ok(report) => summary.pages.push(report),
            Err(e) => {
                warn!(artist = %id, error = %e, "failed to build artist page");
                summary.failures.push((id, e));
            }
        }
    }

    let index_path = output_dir.join("index.html");
    fs::write(&index_path, render_index(&summary.pages, &css).into_string())?;
    summary.index = Some(index_path);
    info!(
        pages = summary.pages.len(),
        failures = summary.failures.len(),
        "site generated at {}",
        output_dir.display()
    );
    Ok(summary)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure.
///
/// `css` is embedded unescaped; every configurable value in it is validated
/// as a CSS color when the config loads.
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

fn artist_header(artist: &ArtistRecord, config: &SiteConfig) -> Markup {
    let portrait = artist
        .image
        .as_deref()
        .map(str::trim)
        .filter(|image| !image.is_empty())
        .map(|image| normalize_with_prefix(image, &config.images.public_prefix));

    html! {
        header.artist-header {
            nav.breadcrumb {
                a href="../" { "Artists" }
                " › "
                (artist.name)
            }
            @if let Some(src) = portrait {
                img.artist-portrait src=(src) alt=(artist.name);
            }
            h1.artist-name { (artist.name) }
        }
    }
}

/// Renders the index page listing built artists.
fn render_index(pages: &[PageReport], css: &str) -> Markup {
    let content = html! {
        header.artist-header {
            h1 { "Artists" }
        }
        main.index-page {
            ul.artist-list {
                @for page in pages {
                    li {
                        a href={ (page.id) "/" } { (page.name) }
                    }
                }
            }
        }
    };
    base_document("Artists", css, Some("index"), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_html::ScriptPolicy;
    use crate::section::SectionKind;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    #[test]
    fn base_document_includes_doctype() {
        let content = html! { p { "test" } };
        let doc = base_document("Test", "body {}", None, content).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<style>body {}</style>"));
    }

    #[test]
    fn base_document_applies_body_class() {
        let doc = base_document("Test", "", Some("artist-page"), html! {}).into_string();
        assert!(doc.contains(r#"<body class="artist-page">"#));
    }

    #[test]
    fn page_css_layers_config_over_static() {
        let css = page_css(&SiteConfig::default());
        let colors = css.find("--color-background").unwrap();
        let sections = css.find(".section-video").unwrap();
        let base = css.find(".artist-section {").unwrap();
        assert!(colors < sections && sections < base);
    }

    #[test]
    fn artist_page_renders_sections_in_order() {
        let mut hidden = text_section("Hidden", 2);
        hidden.enabled = false;
        let artist = artist_with(
            "Kim Deal",
            vec![text_section("Third", 3), hidden, text_section("First", 1)],
        );
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();

        let first = html.find("First body").unwrap();
        let third = html.find("Third body").unwrap();
        assert!(first < third);
        assert!(!html.contains("Hidden body"));
        assert!(html.contains("<title>Kim Deal</title>"));
        assert!(html.contains(r#"<h1 class="artist-name">Kim Deal</h1>"#));
    }

    #[test]
    fn artist_page_without_custom_template_has_no_sections() {
        let mut artist = artist_with("Kim Deal", vec![text_section("Bio", 1)]);
        artist.use_custom_template = false;
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();
        // The stylesheet mentions `.artist-section`; no element carries it.
        assert!(!html.contains("<section"));
        assert!(!html.contains(r#"class="artist-section"#));
        assert!(!html.contains("Bio body"));
        assert!(html.contains("Kim Deal"));
    }

    #[test]
    fn text_body_class_does_not_restyle_the_frame() {
        let css = page_css(&SiteConfig::default());
        // Only the generated type-color rule targets the frame class.
        assert_eq!(css.matches(".section-text").count(), 1);
        assert!(css.contains(".text-body {"));

        let mut section = text_section("Bio", 1);
        section.bg_color = Some("#101010".into());
        let artist = artist_with("Kim Deal", vec![section]);
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();
        assert_eq!(html.matches("section-text").count(), 2);
        assert!(html.contains(r#"<p class="text-body">Bio body</p>"#));
        assert!(html.contains(r#"style="background-color: #101010;""#));
    }

    #[test]
    fn custom_html_cannot_swallow_following_sections() {
        let custom = section_with(
            SectionKind::CustomHtml,
            "Promo",
            1,
            "<p>Signature fuzz</p><!-- draft notes <style>",
        );
        let artist = artist_with("Kim Deal", vec![custom, text_section("Bio", 2)]);
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();

        let comment_end = html.find("<!-- draft notes <style>-->").unwrap();
        let bio = html.find(r#"<h2 class="section-title">Bio</h2>"#).unwrap();
        assert!(comment_end < bio);
        assert_eq!(html.matches("<section").count(), 2);
    }

    #[test]
    fn custom_html_cannot_close_the_page_structure() {
        let custom = section_with(
            SectionKind::CustomHtml,
            "Promo",
            1,
            "</div></section></main><div><p>Pedal</div><textarea>",
        );
        let artist = artist_with("Kim Deal", vec![custom, text_section("Bio", 2)]);
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();

        assert_eq!(html.matches("</main>").count(), 1);
        assert_eq!(html.matches("</section>").count(), 2);
        assert!(html.contains(
            r#"<div class="custom-html-content"><div><p>Pedal</p></div><textarea></textarea></div>"#
        ));
    }

    #[test]
    fn artist_portrait_is_normalized() {
        let mut artist = artist_with("Kim Deal", vec![]);
        artist.image = Some("public/images/kim.jpg".into());
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();
        assert!(html.contains(r#"<img class="artist-portrait" src="/images/kim.jpg" alt="Kim Deal">"#));
    }

    #[test]
    fn loader_only_when_scripts_execute() {
        let custom = section_with(
            SectionKind::CustomHtml,
            "Promo",
            1,
            "<p>hi</p><script>go()</script>",
        );
        let artist = artist_with("Kim Deal", vec![custom]);

        let strip = render_artist_page(&artist, &SiteConfig::default()).into_string();
        assert!(!strip.contains("data-custom-html-mounted"));

        let mut config = SiteConfig::default();
        config.custom_html.scripts = ScriptPolicy::Execute;
        let execute = render_artist_page(&artist, &config).into_string();
        assert!(execute.contains("data-custom-html-mounted"));
    }

    #[test]
    fn artist_name_is_escaped() {
        let artist = artist_with("<script>alert('x')</script>", vec![]);
        let html = render_artist_page(&artist, &SiteConfig::default()).into_string();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn write_rejects_unsafe_ids() {
        let tmp = TempDir::new().unwrap();
        let mut artist = artist_with("x", vec![]);
        artist.id = "../escape".into();
        let result = write_artist_page(&artist, &SiteConfig::default(), tmp.path());
        assert!(matches!(result, Err(BuildError::InvalidId(_))));
    }

    #[test]
    fn build_writes_every_page_and_index() {
        let tmp = TempDir::new().unwrap();
        let mut bad = artist_with("Bad", vec![]);
        bad.id = "bad/id".into();
        let store = MemoryStore::with(artist_with("Kim Deal", vec![text_section("Bio", 1)]))
            .and(artist_with("J Mascis", vec![]))
            .and(bad);

        let summary = build(&store, &SiteConfig::default(), tmp.path()).unwrap();

        let ids: Vec<&str> = summary.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["j-mascis", "kim-deal"]);
        assert_eq!(summary.pages[1].sections, 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(tmp.path().join("kim-deal/index.html").is_file());
        assert!(tmp.path().join("j-mascis/index.html").is_file());

        let index = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        assert!(index.contains(r#"href="kim-deal/""#));
        assert!(index.contains("J Mascis"));
        assert!(!index.contains("bad/id"));
    }
}
