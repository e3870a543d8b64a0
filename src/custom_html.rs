//! Custom HTML blocks and their scripts.
//!
//! A `custom_html` section is raw, admin-authored markup. Markup is published
//! after a containment pass ([`crate::markup`]) that keeps it inside its
//! block. `<script>` elements are the dangerous part: executing them extends
//! full page trust to whoever can edit artist pages, so they only run under
//! [`ScriptPolicy::Execute`], which has to be switched on in `config.toml`.
//!
//! [`ScriptPolicy::Strip`] also drops event handler attributes, `srcdoc` and
//! `javascript:` URLs, but it is not a sanitizer: styles, iframes, forms and
//! meta refreshes are published. Custom HTML is for trusted authors under
//! either policy.
//!
//! ## Mount lifecycle
//!
//! Browsers do not execute `<script>` elements inserted through `innerHTML`.
//! To run them, each script is re-created as a fresh node, attached to the
//! document, and removed again after a short grace period:
//!
//! ```text
//! mount(raw)         clear markup → inject non-script markup
//!                    → attach one node per script (scheduled for removal)
//! tick(now)          detach nodes whose grace period has elapsed
//! mount(same raw)    no-op: same content hash, scripts do not run twice
//! mount(other raw)   clear → re-inject → attach the new scripts
//! unmount()          clear markup, detach anything still attached
//! ```
//!
//! [`ScriptMount`] implements this against the [`ScriptHost`] trait so the
//! sequencing is testable without a browser; the published page runs the
//! same sequence through `static/custom_html.js`.

use crate::markup::{self, ActiveAttributes, ScriptElement};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Whether scripts in custom HTML run on the published page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPolicy {
    /// Drop every `<script>` and script-running attribute; publish markup
    /// only.
    #[default]
    Strip,
    /// Run scripts. Only for pages authored by trusted admins.
    Execute,
}

/// One `<script>` element lifted out of custom markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScriptFragment {
    External { src: String },
    Inline { text: String },
}

/// Custom markup split into publishable markup and script fragments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitMarkup {
    pub markup: String,
    pub scripts: Vec<ScriptFragment>,
}

/// Split raw markup into contained non-script markup and the scripts it
/// contains.
///
/// The markup goes through [`markup::contain`], so it cannot close or
/// swallow the page around it. Under [`ScriptPolicy::Strip`] attributes that
/// run script (`on*`, `srcdoc`, `javascript:` URLs) are dropped as well.
///
/// A script with a non-empty `src` becomes [`ScriptFragment::External`] (its
/// body is ignored, as browsers do); otherwise its text becomes
/// [`ScriptFragment::Inline`]. `<script … />` is an open tag like any other.
/// An unclosed `<script>` swallows the rest of the input. Empty inline
/// scripts are dropped.
pub fn split_scripts(raw: &str, policy: ScriptPolicy) -> SplitMarkup {
    let active = match policy {
        ScriptPolicy::Strip => ActiveAttributes::Drop,
        ScriptPolicy::Execute => ActiveAttributes::Keep,
    };
    let mut markup = raw.to_string();
    let mut scripts = Vec::new();

    // Repeat until a pass lifts nothing, so markup joined by a removal is
    // scanned again.
    loop {
        let pass = markup::contain(&markup, active);
        markup = pass.markup;
        if pass.scripts.is_empty() {
            break;
        }
        scripts.extend(pass.scripts.into_iter().filter_map(fragment));
    }

    SplitMarkup { markup, scripts }
}

fn fragment(script: ScriptElement) -> Option<ScriptFragment> {
    match script.src.as_deref().map(str::trim) {
        Some(src) if !src.is_empty() => Some(ScriptFragment::External {
            src: src.to_string(),
        }),
        _ if !script.text.trim().is_empty() => Some(ScriptFragment::Inline { text: script.text }),
        _ => None,
    }
}

/// Short content fingerprint used to key mounts.
pub fn content_hash(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// JSON payload of script fragments, safe to embed in
/// `<script type="application/json">`.
pub fn scripts_payload(scripts: &[ScriptFragment]) -> String {
    serde_json::to_string(scripts)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
        .replace("<!--", "<\\u0021--")
}

/// Where markup and script nodes are placed. Implemented by whatever owns the
/// live document.
pub trait ScriptHost {
    type Handle;

    /// Replace the block's markup container contents.
    fn set_markup(&mut self, markup: &str);
    /// Empty the block's markup container.
    fn clear_markup(&mut self);
    /// Create and attach an executable script node.
    fn attach_script(&mut self, script: &ScriptFragment) -> Self::Handle;
    /// Remove a previously attached script node.
    fn detach_script(&mut self, handle: Self::Handle);
}

/// Result of [`ScriptMount::mount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Same content as the current mount; nothing touched.
    Unchanged,
    /// Markup injected and `scripts` script nodes attached.
    Mounted { scripts: usize },
}

/// Mount state of one custom HTML block.
pub struct ScriptMount<H: ScriptHost> {
    policy: ScriptPolicy,
    grace: Duration,
    mounted: Option<String>,
    pending: Vec<(Instant, H::Handle)>,
}

impl<H: ScriptHost> ScriptMount<H> {
    pub fn new(policy: ScriptPolicy, grace: Duration) -> Self {
        Self {
            policy,
            grace,
            mounted: None,
            pending: Vec::new(),
        }
    }

    /// Mount `raw` into `host` at time `now`.
    pub fn mount(&mut self, host: &mut H, raw: &str, now: Instant) -> MountOutcome {
        let hash = content_hash(raw);
        if self.mounted.as_deref() == Some(hash.as_str()) {
            return MountOutcome::Unchanged;
        }

        host.clear_markup();
        let split = split_scripts(raw, self.policy);
        host.set_markup(&split.markup);

        let mut attached = 0;
        if self.policy == ScriptPolicy::Execute {
            for script in &split.scripts {
                let handle = host.attach_script(script);
                self.pending.push((now + self.grace, handle));
                attached += 1;
            }
        }
        tracing::debug!(hash = %hash, scripts = attached, "mounted custom html");
        self.mounted = Some(hash);
        MountOutcome::Mounted { scripts: attached }
    }

    /// Detach every script node whose grace period has elapsed by `now`.
    /// Returns how many were detached.
    pub fn tick(&mut self, host: &mut H, now: Instant) -> usize {
        let (expired, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(deadline, _)| *deadline <= now);
        self.pending = keep;
        let count = expired.len();
        for (_, handle) in expired {
            host.detach_script(handle);
        }
        count
    }

    /// Clear the block and detach anything still attached.
    pub fn unmount(&mut self, host: &mut H) {
        host.clear_markup();
        for (_, handle) in self.pending.drain(..) {
            host.detach_script(handle);
        }
        self.mounted = None;
    }

    /// Script nodes still attached.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
