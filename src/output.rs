//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (artist, section, page) is its semantic identity (name or
//! title plus a positional index) with ids and paths shown as secondary
//! context on indented lines.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 J Mascis (0 sections)
//!     Id: j-mascis
//! 002 Kim Deal (3 sections, custom template)
//!     Id: kim-deal
//! ```
//!
//! ## Sections
//!
//! Section indices are storage positions, the same indices the editing
//! commands take.
//!
//! ```text
//! Kim Deal (custom template)
//! [0] order 1  text         Bio
//!     Content: Bass and vocals.
//! [1] order 2  gallery      Rig (hidden)
//!     Content: 4 images
//!     Colors: bg #111111
//! ```
//!
//! ## Build
//!
//! ```text
//! Kim Deal → kim-deal/index.html (3 sections, scripts)
//! J Mascis → j-mascis/index.html (0 sections)
//! Index → index.html
//!
//! Generated 2 pages
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::artist::{ArtistRecord, RecordIssue};
use crate::generate::{BuildSummary, PageReport};
use crate::section::{Section, SectionBody};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

/// Collapse whitespace runs so multi-line content fits on one line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Path relative to the output root for display, falling back to the full path.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn content_summary(section: &Section) -> Option<String> {
    let summary = match &section.body {
        SectionBody::Text(text) => one_line(text),
        SectionBody::Video(url) => url.trim().to_string(),
        SectionBody::Gallery { images, config } => {
            let mut line = plural(images.len(), "image");
            if config.is_some() {
                line.push_str(", custom layout");
            }
            line
        }
        SectionBody::BandsInTown => "tour dates widget".to_string(),
        SectionBody::CustomHtml(raw) => one_line(&strip_html_tags(raw)),
        SectionBody::Unknown { .. } => "unknown type, not rendered".to_string(),
    };
    (!summary.is_empty()).then(|| truncate_desc(&summary, 60))
}

// ============================================================================
// List
// ============================================================================

pub fn format_artist_list(artists: &[ArtistRecord]) -> Vec<String> {
    if artists.is_empty() {
        return vec!["No artists found".to_string()];
    }
    let mut lines = Vec::new();
    for (i, artist) in artists.iter().enumerate() {
        let mut detail = plural(artist.custom_sections.len(), "section");
        if artist.use_custom_template {
            detail.push_str(", custom template");
        }
        lines.push(format!("{} {} ({})", format_index(i + 1), artist.name, detail));
        lines.push(format!("{}Id: {}", indent(1), artist.id));
    }
    lines
}

pub fn print_artist_list(artists: &[ArtistRecord]) {
    for line in format_artist_list(artists) {
        println!("{}", line);
    }
}

// ============================================================================
// Sections
// ============================================================================

pub fn format_sections(artist: &ArtistRecord) -> Vec<String> {
    let mut lines = Vec::new();
    if artist.use_custom_template {
        lines.push(format!("{} (custom template)", artist.name));
    } else {
        lines.push(format!("{} (stock template, sections not published)", artist.name));
    }
    if artist.custom_sections.is_empty() {
        lines.push(format!("{}No sections", indent(1)));
        return lines;
    }

    for (i, section) in artist.custom_sections.iter().enumerate() {
        let hidden = if section.enabled { "" } else { " (hidden)" };
        lines.push(format!(
            "[{}] order {:<3}{:<13}{}{}",
            i,
            section.order,
            section.body.type_name(),
            section.title,
            hidden
        ));
        if let Some(summary) = content_summary(section) {
            lines.push(format!("{}Content: {}", indent(1), summary));
        }
        let colors: Vec<String> = [("bg", &section.bg_color), ("text", &section.text_color)]
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label} {v}")))
            .collect();
        if !colors.is_empty() {
            lines.push(format!("{}Colors: {}", indent(1), colors.join(", ")));
        }
    }
    lines
}

pub fn print_sections(artist: &ArtistRecord) {
    for line in format_sections(artist) {
        println!("{}", line);
    }
}

// ============================================================================
// Render / Build
// ============================================================================

fn page_line(page: &PageReport, output_dir: &Path) -> String {
    let mut detail = plural(page.sections, "section");
    if page.scripts {
        detail.push_str(", scripts");
    }
    format!(
        "{} → {} ({})",
        page.name,
        display_path(&page.path, output_dir),
        detail
    )
}

pub fn format_render_output(page: &PageReport, output_dir: &Path) -> Vec<String> {
    vec![page_line(page, output_dir)]
}

pub fn print_render_output(page: &PageReport, output_dir: &Path) {
    for line in format_render_output(page, output_dir) {
        println!("{}", line);
    }
}

pub fn format_build_output(summary: &BuildSummary, output_dir: &Path) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .pages
        .iter()
        .map(|page| page_line(page, output_dir))
        .collect();
    if let Some(index) = &summary.index {
        lines.push(format!("Index → {}", display_path(index, output_dir)));
    }

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for (id, err) in &summary.failures {
            lines.push(format!("{}{}: {}", indent(1), id, err));
        }
    }

    lines.push(String::new());
    let mut total = format!("Generated {}", plural(summary.pages.len(), "page"));
    if !summary.failures.is_empty() {
        total.push_str(&format!(", {} failed", summary.failures.len()));
    }
    lines.push(total);
    lines
}

pub fn print_build_output(summary: &BuildSummary, output_dir: &Path) {
    for line in format_build_output(summary, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(report: &[(ArtistRecord, Vec<RecordIssue>)]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut issue_count = 0;
    for (artist, issues) in report {
        if issues.is_empty() {
            lines.push(format!("{}: ok", artist.id));
            continue;
        }
        issue_count += issues.len();
        lines.push(format!("{}: {}", artist.id, plural(issues.len(), "issue")));
        for issue in issues {
            lines.push(format!("{}{}", indent(1), issue));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Checked {}, found {}",
        plural(report.len(), "artist"),
        plural(issue_count, "issue")
    ));
    lines
}

pub fn print_check_output(report: &[(ArtistRecord, Vec<RecordIssue>)]) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}
