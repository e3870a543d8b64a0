//! Section rendering.
//!
//! [`SectionRenderer`] turns one section into markup. Every section renders
//! inside the same frame:
//!
//! ```html
//! <section class="artist-section section-gallery" id="section-…" style="…">
//!   <h2 class="section-title">On Tour</h2>
//!   …type-specific body…
//! </section>
//! ```
//!
//! The `section-<type>` class picks up the type-default colors generated from
//! `[sections.*]` in the config; per-section `bgColor`/`textColor` overrides go
//! in the inline `style` and win over them. Overrides that do not look like a
//! CSS color are ignored with a warning.
//!
//! Sections of unknown type render nothing. Gallery images that cannot be
//! displayed are logged and shown as a placeholder; they never stop sibling
//! sections from rendering.
//!
//! Custom HTML goes through [`crate::custom_html`]: markup is contained so it
//! cannot close the section around it, scripts run only under
//! [`ScriptPolicy::Execute`].

use crate::config::{SiteConfig, is_css_color};
use crate::custom_html::{ScriptPolicy, content_hash, scripts_payload, split_scripts};
use crate::gallery::{GalleryLayout, PartialGalleryConfig, scope_class};
use crate::images::{ImageCheck, caption_from_path, normalize_with_prefix, check_image};
use crate::section::{Section, SectionBody, SectionKind};
use maud::{Markup, PreEscaped, html};
use tracing::{debug, trace, warn};

/// Permissions for the embedded video player.
const VIDEO_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// Marks a gallery tile broken when the browser fails to load its image.
const IMG_ONERROR: &str = "this.closest('.gallery-item').classList.add('is-broken')";

/// Renders sections for one artist.
pub struct SectionRenderer<'a> {
    config: &'a SiteConfig,
    artist_name: &'a str,
}

impl<'a> SectionRenderer<'a> {
    pub fn new(config: &'a SiteConfig, artist_name: &'a str) -> Self {
        Self {
            config,
            artist_name,
        }
    }

    /// Render one section. Callers pass enabled sections only.
    pub fn render(&self, section: &Section) -> Markup {
        let kind = match section.kind() {
            Some(kind) => kind,
            None => {
                trace!(id = %section.id, kind = section.body.type_name(), "skipping unknown section type");
                return html! {};
            }
        };
        debug!(id = %section.id, kind = %kind, "rendering section");

        let body = match &section.body {
            SectionBody::Text(text) => render_text(text),
            SectionBody::Video(url) => render_video(&section.title, url),
            SectionBody::Gallery { images, config } => {
                self.render_gallery(section, images, config.as_ref())
            }
            SectionBody::BandsInTown => self.render_bandsintown(),
            SectionBody::CustomHtml(raw) => self.render_custom_html(raw),
            SectionBody::Unknown { .. } => html! {},
        };

        html! {
            section
                class={ "artist-section " (kind.css_class()) }
                id={ "section-" (section.id.as_str()) }
                data-section-id=(section.id.as_str())
                style=[color_overrides(section)]
            {
                h2.section-title { (section.title) }
                (body)
            }
        }
    }

    /// Whether rendering `section` emits scripts that need the page loader.
    pub fn executes_scripts(&self, section: &Section) -> bool {
        match &section.body {
            SectionBody::CustomHtml(raw) => {
                let policy = self.config.custom_html.scripts;
                policy == ScriptPolicy::Execute && !split_scripts(raw, policy).scripts.is_empty()
            }
            _ => false,
        }
    }

    fn render_gallery(
        &self,
        section: &Section,
        images: &[String],
        stored: Option<&PartialGalleryConfig>,
    ) -> Markup {
        let layout = GalleryLayout::from_stored(stored);
        let scope = scope_class(section.id.as_str());
        let css = layout.to_css(&scope);
        let prefix = &self.config.images.public_prefix;

        html! {
            style { (PreEscaped(css)) }
            div class={ "gallery-grid " (scope) } {
                @for (idx, reference) in images.iter().enumerate() {
                    @let src = normalize_with_prefix(reference, prefix);
                    @let caption = if layout.captions { caption_from_path(&src) } else { None };
                    @let alt = caption.clone().unwrap_or_else(|| format!("{} image {}", section.title, idx + 1));
                    @let check = check_image(&src, &self.config.images);
                    @match check {
                        ImageCheck::Broken { path, reason } => {
                            ({
                                warn!(section = %section.id, image = %src, path = %path.display(), reason = %reason, "gallery image unavailable");
                                broken_tile(&alt)
                            })
                        }
                        ImageCheck::Found { width, height } => {
                            (gallery_tile(&src, &alt, caption.as_deref(), layout.lightbox, (width > 0).then_some((width, height))))
                        }
                        ImageCheck::Unchecked => {
                            (gallery_tile(&src, &alt, caption.as_deref(), layout.lightbox, None))
                        }
                    }
                }
            }
        }
    }

    fn render_bandsintown(&self) -> Markup {
        html! {
            div.tour-dates {
                a.bit-widget-initializer
                    data-artist-name=(self.artist_name)
                    data-display-local-dates="false"
                    data-display-past-dates="false"
                    data-auto-style="false" {}
            }
            script charset="utf-8" src=(self.config.bandsintown.widget_src) {}
        }
    }

    fn render_custom_html(&self, raw: &str) -> Markup {
        let policy = self.config.custom_html.scripts;
        let split = split_scripts(raw, policy);
        let execute = policy == ScriptPolicy::Execute;
        if !execute && !split.scripts.is_empty() {
            debug!(stripped = split.scripts.len(), "dropping scripts from custom html");
        }

        html! {
            div.custom-html-content {
                (PreEscaped(&split.markup))
            }
            @if execute && !split.scripts.is_empty() {
                div.custom-html-scripts
                    hidden
                    data-content-hash=(content_hash(raw))
                    data-grace-ms=(self.config.custom_html.grace_period_ms)
                {
                    script type="application/json" { (PreEscaped(scripts_payload(&split.scripts))) }
                }
            }
        }
    }
}

fn render_text(text: &str) -> Markup {
    html! {
        @if !text.trim().is_empty() {
            p.text-body { (text) }
        }
    }
}

fn render_video(title: &str, url: &str) -> Markup {
    let url = url.trim();
    if url.is_empty() {
        return html! {};
    }
    if !is_embeddable_url(url) {
        warn!(url = %url, "refusing to embed video with unsupported URL scheme");
        return html! {};
    }
    html! {
        div.video-frame {
            iframe.video-embed
                src=(url)
                title=(title)
                allow=(VIDEO_ALLOW)
                allowfullscreen
                loading="lazy"
                frameborder="0" {}
        }
    }
}

fn gallery_tile(
    src: &str,
    alt: &str,
    caption: Option<&str>,
    lightbox: bool,
    dimensions: Option<(u32, u32)>,
) -> Markup {
    let (width, height) = match dimensions {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };
    let img = html! {
        img src=(src) alt=(alt) loading="lazy" width=[width] height=[height] onerror=(IMG_ONERROR);
    };
    html! {
        figure.gallery-item {
            @if lightbox {
                a.lightbox-link href=(src) target="_blank" rel="noopener noreferrer" { (img) }
            } @else {
                (img)
            }
            @if let Some(caption) = caption {
                figcaption.gallery-caption { (caption) }
            }
        }
    }
}

fn broken_tile(alt: &str) -> Markup {
    html! {
        figure.gallery-item.is-broken {
            span.broken-image role="img" aria-label=(alt) { "Image unavailable" }
        }
    }
}

/// Inline style for per-section color overrides, if any are usable.
fn color_overrides(section: &Section) -> Option<String> {
    let mut style = String::new();
    for (property, value) in [
        ("background-color", section.bg_color.as_deref()),
        ("color", section.text_color.as_deref()),
    ] {
        let Some(value) = value else { continue };
        if is_css_color(value) {
            style.push_str(&format!("{property}: {};", value.trim()));
        } else {
            warn!(section = %section.id, property, value, "ignoring invalid color override");
        }
    }
    (!style.is_empty()).then_some(style)
}

fn is_embeddable_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("//")
}
