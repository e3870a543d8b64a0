//! Site configuration module.
//!
//! Loads, merges and validates the site config. `config.toml` in the artist
//! data directory overrides the stock defaults, and a `--config` file, say
//! for a staging storefront, overrides both. Every key is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! [colors.light]
//! background = "#ffffff"
//! text = "#111111"
//! text_muted = "#666666"    # Section captions, footer
//! border = "#e0e0e0"
//! link = "#333333"
//! link_hover = "#000000"
//!
//! [colors.dark]
//! background = "#0a0a0a"
//! text = "#eeeeee"
//! # ...
//!
//! [sections.text]           # Type-default styling, one table per section type
//! background = "transparent"
//! text = "inherit"
//!
//! [custom_html]
//! scripts = "strip"         # "strip" or "execute" (admin-trusted pages only)
//! grace_period_ms = 100     # Delay before injected script nodes are removed
//!
//! [images]
//! public_prefix = "/images" # Canonical URL prefix for site images
//! local_dir = "public/images" # Optional: check local images at render time
//!
//! [bandsintown]
//! widget_src = "https://widget.bandsintown.com/main.min.js"
//!
//! [processing]
//! max_processes = 4         # Max parallel page renders (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [custom_html]
//! scripts = "execute"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::custom_html::ScriptPolicy;
use crate::images::DEFAULT_PUBLIC_PREFIX;
use crate::section::SectionKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Stock config cannot be expressed as TOML: {0}")]
    Defaults(#[from] toml::ser::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
    /// Type-default styling for each section type.
    pub sections: SectionStyles,
    /// Trust policy for custom HTML blocks.
    pub custom_html: CustomHtmlConfig,
    /// Image reference handling.
    pub images: ImagesConfig,
    /// Live tour-date widget.
    pub bandsintown: BandsintownConfig,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

/// Longest accepted script grace period.
pub const MAX_GRACE_PERIOD_MS: u64 = 10_000;

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grace = self.custom_html.grace_period_ms;
        if grace == 0 || grace > MAX_GRACE_PERIOD_MS {
            return Err(ConfigError::Validation(format!(
                "custom_html.grace_period_ms must be 1-{MAX_GRACE_PERIOD_MS}"
            )));
        }
        if !self.images.public_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "images.public_prefix must start with '/'".into(),
            ));
        }
        if self.bandsintown.widget_src.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bandsintown.widget_src must not be empty".into(),
            ));
        }
        for (scheme_name, scheme) in [("light", &self.colors.light), ("dark", &self.colors.dark)] {
            for (field, value) in scheme.fields() {
                if !is_css_color(value) {
                    return Err(ConfigError::Validation(format!(
                        "colors.{scheme_name}.{field} is not a CSS color: {value:?}"
                    )));
                }
            }
        }
        for kind in SectionKind::ALL {
            let style = self.sections.for_kind(kind);
            for (field, value) in [("background", &style.background), ("text", &style.text)] {
                if !is_css_color(value) {
                    return Err(ConfigError::Validation(format!(
                        "sections.{kind}.{field} is not a CSS color: {value:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Custom HTML trust settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomHtmlConfig {
    /// Whether scripts in custom HTML are executed or stripped. Stripping is
    /// not sanitizing; see [`crate::markup`].
    pub scripts: ScriptPolicy,
    /// Milliseconds an injected script node stays attached before removal.
    pub grace_period_ms: u64,
}

impl Default for CustomHtmlConfig {
    fn default() -> Self {
        Self {
            scripts: ScriptPolicy::Strip,
            grace_period_ms: 100,
        }
    }
}

/// Image reference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// URL prefix that normalized local references are rewritten to.
    pub public_prefix: String,
    /// Filesystem directory served at `public_prefix`. When set, local images
    /// are checked at render time and broken ones replaced by a placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            local_dir: None,
        }
    }
}

/// Tour-date widget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BandsintownConfig {
    /// Script URL of the embeddable widget.
    pub widget_src: String,
}

impl Default for BandsintownConfig {
    fn default() -> Self {
        Self {
            widget_src: "https://widget.bandsintown.com/main.min.js".to_string(),
        }
    }
}

/// Parallel rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel page renders.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Default background/text colors of one section type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionStyle {
    pub background: String,
    pub text: String,
}

impl SectionStyle {
    fn new(background: &str, text: &str) -> Self {
        Self {
            background: background.to_string(),
            text: text.to_string(),
        }
    }
}

/// Type-default styling, used when a section has no color overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionStyles {
    pub text: SectionStyle,
    pub gallery: SectionStyle,
    pub video: SectionStyle,
    pub bandsintown: SectionStyle,
    pub custom_html: SectionStyle,
}

impl Default for SectionStyles {
    fn default() -> Self {
        Self {
            text: SectionStyle::new("transparent", "inherit"),
            gallery: SectionStyle::new("transparent", "inherit"),
            video: SectionStyle::new("#0a0a0a", "#eeeeee"),
            bandsintown: SectionStyle::new("#111111", "#eeeeee"),
            custom_html: SectionStyle::new("transparent", "inherit"),
        }
    }
}

impl SectionStyles {
    pub fn for_kind(&self, kind: SectionKind) -> &SectionStyle {
        match kind {
            SectionKind::Text => &self.text,
            SectionKind::Gallery => &self.gallery,
            SectionKind::Video => &self.video,
            SectionKind::BandsInTown => &self.bandsintown,
            SectionKind::CustomHtml => &self.custom_html,
        }
    }
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Light mode color scheme.
    pub light: ColorScheme,
    /// Dark mode color scheme.
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::from_palette([
                "#ffffff", "#111111", "#666666", "#e0e0e0", "#333333", "#000000",
            ]),
            dark: ColorScheme::from_palette([
                "#0a0a0a", "#eeeeee", "#999999", "#333333", "#cccccc", "#ffffff",
            ]),
        }
    }
}

/// Individual color scheme (light or dark).
///
/// A sparse `[colors.dark]` table is completed from the stock dark palette by
/// [`load_config`], not from [`ColorScheme::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Page background.
    pub background: String,
    /// Body text.
    pub text: String,
    /// Captions, placeholders and the page footer.
    pub text_muted: String,
    /// Section dividers and gallery tile borders.
    pub border: String,
    pub link: String,
    pub link_hover: String,
}

impl ColorScheme {
    /// `[background, text, text_muted, border, link, link_hover]`.
    fn from_palette([background, text, text_muted, border, link, link_hover]: [&str; 6]) -> Self {
        Self {
            background: background.to_string(),
            text: text.to_string(),
            text_muted: text_muted.to_string(),
            border: border.to_string(),
            link: link.to_string(),
            link_hover: link_hover.to_string(),
        }
    }

    /// Config key and value of every color, in palette order.
    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("background", self.background.as_str()),
            ("text", self.text.as_str()),
            ("text_muted", self.text_muted.as_str()),
            ("border", self.border.as_str()),
            ("link", self.link.as_str()),
            ("link_hover", self.link_hover.as_str()),
        ]
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorConfig::default().light
    }
}

/// Whether `value` is safe to place in a CSS color declaration.
///
/// Accepts hex colors, bare keywords (`red`, `transparent`, `inherit`) and
/// `rgb()/rgba()/hsl()/hsla()` with numeric arguments. Anything else is
/// rejected, which keeps stored color overrides from smuggling extra
/// declarations into a `style` attribute.
pub fn is_css_color(value: &str) -> bool {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    for func in ["rgba(", "rgb(", "hsla(", "hsl("] {
        if let Some(args) = lower.strip_prefix(func) {
            return args.strip_suffix(')').is_some_and(|inner| {
                !inner.trim().is_empty()
                    && inner.chars().all(|c| {
                        c.is_ascii_alphanumeric() || matches!(c, '.' | ',' | '%' | ' ' | '/' | '-' | '+')
                    })
            });
        }
    }
    false
}

// =============================================================================
// Config loading
// =============================================================================

/// Config file looked up in the artist data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Lay `overlay` over `base`. Tables merge key by key; any other overlay value
/// replaces the base value outright, arrays included.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                let value = match merged.remove(&key) {
                    Some(below) => merge_toml(below, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Read one config layer. Unknown keys are reported against the file that
/// has them rather than against the merged result.
fn read_layer(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let layer: toml::Value = toml::from_str(&content).map_err(parse_error)?;
    layer.clone().try_into::<SiteConfig>().map_err(parse_error)?;
    Ok(layer)
}

/// Load the site config for an artist data directory.
///
/// Layers, lowest first: the stock defaults, `<data_dir>/config.toml` when it
/// exists, then `overlay` (the CLI's `--config`), which must exist. The merged
/// result is validated.
pub fn load_config(data_dir: &Path, overlay: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let local = data_dir.join(CONFIG_FILE);
    let local = local.is_file().then_some(local.as_path());

    let mut merged = toml::Value::try_from(SiteConfig::default())?;
    for path in local.into_iter().chain(overlay) {
        debug!(path = %path.display(), "applying config layer");
        merged = merge_toml(merged, read_layer(path)?);
    }
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Artist Pages Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the artist data directory (next to the <id>.json records).
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Custom HTML blocks
# ---------------------------------------------------------------------------
[custom_html]
# "strip"   - <script> elements, on* event attributes, srcdoc and
#             javascript: URLs are removed; the rest of the markup is
#             published. This is not a sanitizer: styles, iframes and forms
#             still pass, so custom HTML is for trusted authors either way.
# "execute" - scripts run on the published page. Anyone who can edit artist
#             pages can then run code for every visitor; only enable this
#             when page authors are trusted admins.
# Under both policies markup is closed off so it cannot break the page
# around its section.
scripts = "strip"

# Milliseconds an injected script node stays attached before it is removed.
grace_period_ms = 100

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# URL prefix that local image references are rewritten to
# (images/x.jpg, public/images/x.jpg and bare x.jpg all become /images/x.jpg).
public_prefix = "/images"

# Directory served at public_prefix. When set, local gallery images are
# checked at render time; missing or unreadable ones are logged and shown as
# a placeholder.
# local_dir = "public/images"

# ---------------------------------------------------------------------------
# Live tour dates
# ---------------------------------------------------------------------------
[bandsintown]
widget_src = "https://widget.bandsintown.com/main.min.js"

# ---------------------------------------------------------------------------
# Section type defaults (used when a section sets no bgColor/textColor)
# ---------------------------------------------------------------------------
[sections.text]
background = "transparent"
text = "inherit"

[sections.gallery]
background = "transparent"
text = "inherit"

[sections.video]
background = "#0a0a0a"
text = "#eeeeee"

[sections.bandsintown]
background = "#111111"
text = "#eeeeee"

[sections.custom_html]
background = "transparent"
text = "inherit"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#111111"
text_muted = "#666666"    # Captions, footer
border = "#e0e0e0"
link = "#333333"
link_hover = "#000000"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0a0a0a"
text = "#eeeeee"
text_muted = "#999999"
border = "#333333"
link = "#cccccc"
link_hover = "#ffffff"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel page renders for `build`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate the `:root` color custom properties: the light scheme, then the
/// dark scheme under `prefers-color-scheme: dark`. Each key becomes
/// `--color-<key>` with underscores as dashes.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    let properties = |scheme: &ColorScheme, indent: &str| -> String {
        scheme
            .fields()
            .iter()
            .map(|(key, value)| format!("{indent}--color-{}: {value};\n", key.replace('_', "-")))
            .collect()
    };
    format!(
        ":root {{\n{}}}\n\n@media (prefers-color-scheme: dark) {{\n    :root {{\n{}    }}\n}}",
        properties(&colors.light, "    "),
        properties(&colors.dark, "        "),
    )
}

/// Generate the per-type default section rules.
///
/// Each section frame carries [`SectionKind::css_class`]; inline color
/// overrides on a section take precedence over these rules.
pub fn generate_section_css(styles: &SectionStyles) -> String {
    SectionKind::ALL
        .iter()
        .map(|kind| {
            let style = styles.for_kind(*kind);
            format!(
                ".{} {{ background-color: {}; color: {}; }}",
                kind.css_class(),
                style.background,
                style.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
