//! Gallery configuration and layout resolution.
//!
//! A gallery section stores a possibly partial [`PartialGalleryConfig`]. All
//! defaulting happens in one place, [`resolve_config`], which fills every
//! missing field from [`GalleryConfig::default`]:
//!
//! ```text
//! gridColumns   mobile 1, tablet 2, desktop 3
//! aspectRatio   square
//! gap           md
//! borderRadius  md
//! hoverEffect   scale
//! lightbox      true
//! captions      false
//! ```
//!
//! [`GalleryLayout::resolve`] then turns the full configuration into concrete
//! style parameters, and [`GalleryLayout::to_css`] emits a CSS block scoped to
//! one gallery. Both are pure: the same configuration always yields the same
//! output.
//!
//! ## Scales
//!
//! | value | gap     | radius  |
//! |-------|---------|---------|
//! | none  | —       | 0       |
//! | sm    | 0.5rem  | 0.25rem |
//! | md    | 1rem    | 0.5rem  |
//! | lg    | 1.5rem  | 1rem    |
//!
//! Breakpoints: `tablet` applies from 768px, `desktop` from 1024px.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Duration of every hover transition other than `none`.
pub const HOVER_TRANSITION_MS: u32 = 300;

pub const TABLET_MIN_WIDTH_PX: u32 = 768;
pub const DESKTOP_MIN_WIDTH_PX: u32 = 1024;

/// Deserialize an optional field, treating any value that does not decode as
/// absent. Invalid enum strings, wrong JSON types and the like fall back to
/// defaults instead of failing the whole artist record.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    #[default]
    Square,
    Portrait,
    Landscape,
    Auto,
}

impl AspectRatio {
    /// Width:height, or `None` for intrinsic sizing.
    pub fn ratio(self) -> Option<(u32, u32)> {
        match self {
            AspectRatio::Square => Some((1, 1)),
            AspectRatio::Portrait => Some((3, 4)),
            AspectRatio::Landscape => Some((4, 3)),
            AspectRatio::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gap {
    Sm,
    #[default]
    Md,
    Lg,
}

impl Gap {
    pub fn rem(self) -> f32 {
        match self {
            Gap::Sm => 0.5,
            Gap::Md => 1.0,
            Gap::Lg => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderRadius {
    None,
    Sm,
    #[default]
    Md,
    Lg,
}

impl BorderRadius {
    pub fn rem(self) -> f32 {
        match self {
            BorderRadius::None => 0.0,
            BorderRadius::Sm => 0.25,
            BorderRadius::Md => 0.5,
            BorderRadius::Lg => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoverEffect {
    None,
    #[default]
    Scale,
    Fade,
    Lift,
}

/// Column counts per breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumns {
    pub mobile: u32,
    pub tablet: u32,
    pub desktop: u32,
}

impl Default for GridColumns {
    fn default() -> Self {
        Self {
            mobile: 1,
            tablet: 2,
            desktop: 3,
        }
    }
}

/// Fully populated gallery configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryConfig {
    pub grid_columns: GridColumns,
    pub aspect_ratio: AspectRatio,
    pub gap: Gap,
    pub border_radius: BorderRadius,
    pub hover_effect: HoverEffect,
    pub lightbox: bool,
    pub captions: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            grid_columns: GridColumns::default(),
            aspect_ratio: AspectRatio::Square,
            gap: Gap::Md,
            border_radius: BorderRadius::Md,
            hover_effect: HoverEffect::Scale,
            lightbox: true,
            captions: false,
        }
    }
}

/// Column counts as stored; any field may be missing or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialGridColumns {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub mobile: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub tablet: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub desktop: Option<u32>,
}

/// Gallery configuration as stored on a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialGalleryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub grid_columns: Option<PartialGridColumns>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub gap: Option<Gap>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub border_radius: Option<BorderRadius>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hover_effect: Option<HoverEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub lightbox: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub captions: Option<bool>,
}

impl PartialGalleryConfig {
    /// Overlay `patch` on top of `self`. Fields set in the patch win, fields it
    /// leaves unset are kept. Column counts merge per breakpoint.
    pub fn merge(self, patch: PartialGalleryConfig) -> PartialGalleryConfig {
        let grid_columns = match (self.grid_columns, patch.grid_columns) {
            (Some(base), Some(over)) => Some(PartialGridColumns {
                mobile: over.mobile.or(base.mobile),
                tablet: over.tablet.or(base.tablet),
                desktop: over.desktop.or(base.desktop),
            }),
            (base, over) => over.or(base),
        };
        PartialGalleryConfig {
            grid_columns,
            aspect_ratio: patch.aspect_ratio.or(self.aspect_ratio),
            gap: patch.gap.or(self.gap),
            border_radius: patch.border_radius.or(self.border_radius),
            hover_effect: patch.hover_effect.or(self.hover_effect),
            lightbox: patch.lightbox.or(self.lightbox),
            captions: patch.captions.or(self.captions),
        }
    }
}

impl From<GalleryConfig> for PartialGalleryConfig {
    fn from(config: GalleryConfig) -> Self {
        Self {
            grid_columns: Some(PartialGridColumns {
                mobile: Some(config.grid_columns.mobile),
                tablet: Some(config.grid_columns.tablet),
                desktop: Some(config.grid_columns.desktop),
            }),
            aspect_ratio: Some(config.aspect_ratio),
            gap: Some(config.gap),
            border_radius: Some(config.border_radius),
            hover_effect: Some(config.hover_effect),
            lightbox: Some(config.lightbox),
            captions: Some(config.captions),
        }
    }
}

/// Fill every missing field of a stored configuration with its default.
///
/// Column counts of zero are not positive and fall back per breakpoint.
pub fn resolve_config(partial: Option<&PartialGalleryConfig>) -> GalleryConfig {
    let defaults = GalleryConfig::default();
    let Some(partial) = partial else {
        return defaults;
    };
    let columns = partial.grid_columns.unwrap_or_default();
    let positive = |value: Option<u32>, fallback: u32| value.filter(|n| *n > 0).unwrap_or(fallback);

    GalleryConfig {
        grid_columns: GridColumns {
            mobile: positive(columns.mobile, defaults.grid_columns.mobile),
            tablet: positive(columns.tablet, defaults.grid_columns.tablet),
            desktop: positive(columns.desktop, defaults.grid_columns.desktop),
        },
        aspect_ratio: partial.aspect_ratio.unwrap_or(defaults.aspect_ratio),
        gap: partial.gap.unwrap_or(defaults.gap),
        border_radius: partial.border_radius.unwrap_or(defaults.border_radius),
        hover_effect: partial.hover_effect.unwrap_or(defaults.hover_effect),
        lightbox: partial.lightbox.unwrap_or(defaults.lightbox),
        captions: partial.captions.unwrap_or(defaults.captions),
    }
}

/// What happens to a gallery tile on pointer-over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverTransition {
    pub effect: HoverEffect,
    /// Zero for `none`.
    pub duration_ms: u32,
    pub transform: Option<&'static str>,
    pub opacity: Option<f32>,
    pub shadow: Option<&'static str>,
}

impl HoverTransition {
    pub fn for_effect(effect: HoverEffect) -> Self {
        let base = HoverTransition {
            effect,
            duration_ms: HOVER_TRANSITION_MS,
            transform: None,
            opacity: None,
            shadow: None,
        };
        match effect {
            HoverEffect::None => HoverTransition {
                duration_ms: 0,
                ..base
            },
            HoverEffect::Scale => HoverTransition {
                transform: Some("scale(1.05)"),
                ..base
            },
            HoverEffect::Fade => HoverTransition {
                opacity: Some(0.75),
                ..base
            },
            HoverEffect::Lift => HoverTransition {
                transform: Some("translateY(-4px)"),
                shadow: Some("0 10px 20px rgba(0, 0, 0, 0.25)"),
                ..base
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.effect != HoverEffect::None
    }
}

/// Concrete style parameters for one gallery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryLayout {
    pub columns: GridColumns,
    pub gap_rem: f32,
    pub radius_rem: f32,
    pub aspect: Option<(u32, u32)>,
    pub hover: HoverTransition,
    pub lightbox: bool,
    pub captions: bool,
}

impl GalleryLayout {
    pub fn resolve(config: &GalleryConfig) -> Self {
        Self {
            columns: config.grid_columns,
            gap_rem: config.gap.rem(),
            radius_rem: config.border_radius.rem(),
            aspect: config.aspect_ratio.ratio(),
            hover: HoverTransition::for_effect(config.hover_effect),
            lightbox: config.lightbox,
            captions: config.captions,
        }
    }

    /// Convenience for the render path: default, resolve, translate.
    pub fn from_stored(partial: Option<&PartialGalleryConfig>) -> Self {
        Self::resolve(&resolve_config(partial))
    }

    /// CSS for a grid carrying the class `scope`.
    ///
    /// `scope` must already be a valid class name; see [`scope_class`].
    pub fn to_css(&self, scope: &str) -> String {
        let mut css = String::new();
        let sel = format!(".{scope}");

        let _ = writeln!(
            css,
            "{sel} {{ display: grid; grid-template-columns: repeat({}, minmax(0, 1fr)); gap: {}; }}",
            self.columns.mobile,
            css_rem(self.gap_rem)
        );
        let _ = writeln!(
            css,
            "@media (min-width: {TABLET_MIN_WIDTH_PX}px) {{ {sel} {{ grid-template-columns: repeat({}, minmax(0, 1fr)); }} }}",
            self.columns.tablet
        );
        let _ = writeln!(
            css,
            "@media (min-width: {DESKTOP_MIN_WIDTH_PX}px) {{ {sel} {{ grid-template-columns: repeat({}, minmax(0, 1fr)); }} }}",
            self.columns.desktop
        );

        let mut item = format!(
            "{sel} .gallery-item {{ position: relative; overflow: hidden; border-radius: {};",
            css_rem(self.radius_rem)
        );
        if let Some((w, h)) = self.aspect {
            let _ = write!(item, " aspect-ratio: {w} / {h};");
        }
        if self.hover.is_visible() {
            let ms = self.hover.duration_ms;
            let _ = write!(
                item,
                " transition: transform {ms}ms ease, opacity {ms}ms ease, box-shadow {ms}ms ease;"
            );
        }
        item.push_str(" }");
        css.push_str(&item);
        css.push('\n');

        if self.aspect.is_some() {
            let _ = writeln!(
                css,
                "{sel} .gallery-item img {{ width: 100%; height: 100%; object-fit: cover; display: block; }}"
            );
        } else {
            let _ = writeln!(
                css,
                "{sel} .gallery-item img {{ width: 100%; height: auto; display: block; }}"
            );
        }

        if self.hover.is_visible() {
            let mut hover = format!("{sel} .gallery-item:hover {{");
            if let Some(transform) = self.hover.transform {
                let _ = write!(hover, " transform: {transform};");
            }
            if let Some(opacity) = self.hover.opacity {
                let _ = write!(hover, " opacity: {opacity};");
            }
            if let Some(shadow) = self.hover.shadow {
                let _ = write!(hover, " box-shadow: {shadow};");
            }
            hover.push_str(" }");
            css.push_str(&hover);
            css.push('\n');
        }

        css
    }
}

/// CSS class name for a gallery, derived from its section id.
///
/// Section ids come from stored data, so anything outside `[A-Za-z0-9_-]` is
/// replaced to keep the selector well-formed. A replaced id also gets a short
/// hash of the original, so `a.b` and `a-b` never share a class. The
/// `gallery-scope-` prefix keeps ids like `grid` off the shared gallery classes.
pub fn scope_class(section_id: &str) -> String {
    let cleaned: String = section_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned == section_id {
        return format!("gallery-scope-{cleaned}");
    }
    let digest = Sha256::digest(section_id.as_bytes());
    format!("gallery-scope-{cleaned}-{}", &format!("{digest:x}")[..8])
}

fn css_rem(value: f32) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}rem")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn partial(value: serde_json::Value) -> PartialGalleryConfig {
        serde_json::from_value(value).unwrap()
    }

    // =========================================================================
    // Defaulting
    // =========================================================================

    #[test]
    fn missing_config_resolves_to_documented_defaults() {
        let config = resolve_config(None);
        assert_eq!(
            config.grid_columns,
            GridColumns {
                mobile: 1,
                tablet: 2,
                desktop: 3
            }
        );
        assert_eq!(config.aspect_ratio, AspectRatio::Square);
        assert_eq!(config.gap, Gap::Md);
        assert_eq!(config.border_radius, BorderRadius::Md);
        assert_eq!(config.hover_effect, HoverEffect::Scale);
        assert!(config.lightbox);
        assert!(!config.captions);
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let config = resolve_config(Some(&PartialGalleryConfig::default()));
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn each_missing_field_is_filled() {
        let full: PartialGalleryConfig = GalleryConfig {
            grid_columns: GridColumns {
                mobile: 2,
                tablet: 4,
                desktop: 6,
            },
            aspect_ratio: AspectRatio::Auto,
            gap: Gap::Sm,
            border_radius: BorderRadius::None,
            hover_effect: HoverEffect::Lift,
            lightbox: false,
            captions: true,
        }
        .into();
        let defaults = GalleryConfig::default();

        // Drop one field at a time: that field must come back as the default,
        // every other field must survive.
        let mut p = full;
        p.aspect_ratio = None;
        assert_eq!(resolve_config(Some(&p)).aspect_ratio, defaults.aspect_ratio);
        let mut p = full;
        p.gap = None;
        assert_eq!(resolve_config(Some(&p)).gap, defaults.gap);
        let mut p = full;
        p.border_radius = None;
        assert_eq!(resolve_config(Some(&p)).border_radius, defaults.border_radius);
        let mut p = full;
        p.hover_effect = None;
        assert_eq!(resolve_config(Some(&p)).hover_effect, defaults.hover_effect);
        let mut p = full;
        p.lightbox = None;
        assert_eq!(resolve_config(Some(&p)).lightbox, defaults.lightbox);
        let mut p = full;
        p.captions = None;
        let resolved = resolve_config(Some(&p));
        assert_eq!(resolved.captions, defaults.captions);
        assert_eq!(resolved.gap, Gap::Sm);
        assert_eq!(resolved.grid_columns.desktop, 6);
    }

    #[test]
    fn partial_columns_fill_per_breakpoint() {
        let p = partial(json!({ "gridColumns": { "desktop": 5 } }));
        let config = resolve_config(Some(&p));
        assert_eq!(config.grid_columns.mobile, 1);
        assert_eq!(config.grid_columns.tablet, 2);
        assert_eq!(config.grid_columns.desktop, 5);
    }

    #[test]
    fn zero_columns_fall_back() {
        let p = partial(json!({ "gridColumns": { "mobile": 0, "tablet": 0, "desktop": 12 } }));
        let config = resolve_config(Some(&p));
        assert_eq!(config.grid_columns.mobile, 1);
        assert_eq!(config.grid_columns.tablet, 2);
        // Out of the authoring range but positive: tolerated.
        assert_eq!(config.grid_columns.desktop, 12);
    }

    #[test]
    fn invalid_enum_values_fall_back() {
        let p = partial(json!({
            "aspectRatio": "panoramic",
            "gap": "xl",
            "borderRadius": 3,
            "hoverEffect": "spin",
            "lightbox": "yes",
            "gridColumns": { "mobile": "two", "tablet": -1 }
        }));
        let config = resolve_config(Some(&p));
        assert_eq!(config, GalleryConfig::default());
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn merge_preserves_unspecified_fields() {
        let base = partial(json!({ "gap": "sm", "captions": true, "gridColumns": { "mobile": 2 } }));
        let patch = partial(json!({ "gap": "lg", "gridColumns": { "desktop": 6 } }));
        let merged = base.merge(patch);
        assert_eq!(merged.gap, Some(Gap::Lg));
        assert_eq!(merged.captions, Some(true));
        let cols = merged.grid_columns.unwrap();
        assert_eq!(cols.mobile, Some(2));
        assert_eq!(cols.desktop, Some(6));
        assert_eq!(cols.tablet, None);
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[test]
    fn layout_for_portrait_large_gap() {
        let p = partial(json!({
            "gridColumns": { "mobile": 1, "tablet": 2, "desktop": 4 },
            "aspectRatio": "portrait",
            "gap": "lg"
        }));
        let first = GalleryLayout::from_stored(Some(&p));
        assert_eq!(first.columns.desktop, 4);
        assert_eq!(first.aspect, Some((3, 4)));
        assert_eq!(first.gap_rem, Gap::Lg.rem());

        let second = GalleryLayout::from_stored(Some(&p));
        assert_eq!(first, second);
        assert_eq!(first.to_css("gallery-x"), second.to_css("gallery-x"));
    }

    #[test]
    fn scales_increase_monotonically() {
        assert!(Gap::Sm.rem() < Gap::Md.rem());
        assert!(Gap::Md.rem() < Gap::Lg.rem());
        assert!(BorderRadius::None.rem() < BorderRadius::Sm.rem());
        assert!(BorderRadius::Sm.rem() < BorderRadius::Md.rem());
        assert!(BorderRadius::Md.rem() < BorderRadius::Lg.rem());
    }

    #[test]
    fn aspect_ratios() {
        assert_eq!(AspectRatio::Square.ratio(), Some((1, 1)));
        assert_eq!(AspectRatio::Portrait.ratio(), Some((3, 4)));
        assert_eq!(AspectRatio::Landscape.ratio(), Some((4, 3)));
        assert_eq!(AspectRatio::Auto.ratio(), None);
    }

    #[test]
    fn hover_transitions() {
        let none = HoverTransition::for_effect(HoverEffect::None);
        assert_eq!(none.duration_ms, 0);
        assert!(none.transform.is_none() && none.opacity.is_none() && none.shadow.is_none());

        let scale = HoverTransition::for_effect(HoverEffect::Scale);
        assert_eq!(scale.duration_ms, 300);
        assert_eq!(scale.transform, Some("scale(1.05)"));

        let fade = HoverTransition::for_effect(HoverEffect::Fade);
        assert_eq!(fade.opacity, Some(0.75));

        let lift = HoverTransition::for_effect(HoverEffect::Lift);
        assert!(lift.shadow.is_some());
        assert_eq!(lift.transform, Some("translateY(-4px)"));
    }

    #[test]
    fn css_contains_breakpoints_and_aspect() {
        let layout = GalleryLayout::from_stored(Some(&partial(json!({
            "gridColumns": { "mobile": 1, "tablet": 3, "desktop": 5 },
            "aspectRatio": "landscape",
            "gap": "sm",
            "borderRadius": "none"
        }))));
        let css = layout.to_css("gallery-abc");
        assert!(css.contains(".gallery-abc { display: grid; grid-template-columns: repeat(1, minmax(0, 1fr)); gap: 0.5rem; }"));
        assert!(css.contains("@media (min-width: 768px) { .gallery-abc { grid-template-columns: repeat(3, minmax(0, 1fr)); } }"));
        assert!(css.contains("@media (min-width: 1024px) { .gallery-abc { grid-template-columns: repeat(5, minmax(0, 1fr)); } }"));
        assert!(css.contains("aspect-ratio: 4 / 3;"));
        assert!(css.contains("border-radius: 0;"));
        assert!(css.contains("transform: scale(1.05);"));
    }

    #[test]
    fn css_without_hover_has_no_transition() {
        let layout = GalleryLayout::from_stored(Some(&partial(json!({
            "hoverEffect": "none",
            "aspectRatio": "auto"
        }))));
        let css = layout.to_css("gallery-q");
        assert!(!css.contains("transition"));
        assert!(!css.contains(":hover"));
        assert!(!css.contains("aspect-ratio"));
        assert!(css.contains("height: auto"));
    }

    #[test]
    fn scope_class_sanitizes_ids() {
        assert_eq!(scope_class("section-1"), "gallery-scope-section-1");
        let odd = scope_class("a b}{x");
        assert!(odd.starts_with("gallery-scope-a-b--x-"));
        assert!(odd.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert_eq!(odd, scope_class("a b}{x"));
    }

    #[test]
    fn scope_class_keeps_distinct_ids_distinct() {
        assert_ne!(scope_class("a.b"), scope_class("a-b"));
        assert_ne!(scope_class("a.b"), scope_class("a b"));
        assert_eq!(scope_class("a-b"), "gallery-scope-a-b");
        assert_ne!(scope_class("grid"), "gallery-grid");
    }
}
