//! Containment pass for custom HTML fragments.
//!
//! Custom markup is spliced between server-rendered elements, so a fragment
//! must not be able to swallow or close the page around it. [`contain`] walks
//! the fragment with the HTML tokenizer's rules for tags, attributes, comments
//! and raw-text elements and rewrites it so that:
//!
//! - comments and raw-text elements (`<style>`, `<textarea>`, …) end inside
//!   the fragment,
//! - a `<` that does not start a complete tag is emitted as `&lt;`,
//! - end tags with no matching open element are dropped,
//! - elements still open at the end are closed,
//! - `<html>`, `<head>`, `<body>` and `<base>` tags are dropped,
//! - `<script>` elements are lifted out into [`Contained::scripts`].
//!
//! End tags close the elements above their match explicitly, and the start
//! tags that make a browser close open elements implicitly (`<li>`, `<p>`,
//! `<button>`, `<select>`, foreign-content breakouts) are tracked, so the
//! open-element stack here never holds a `<div>` that the browser has
//! already closed.
//!
//! With [`ActiveAttributes::Drop`] it also removes attributes that run script
//! without a `<script>` element: `on*` event handlers, `srcdoc`, and
//! `javascript:`/`vbscript:` URLs (character references are decoded first).
//!
//! This is not a sanitizer. CSS, iframes, forms, `<meta http-equiv>` and SVG
//! animation of `href` pass through.

use std::fmt::Write as _;
use std::ops::Range;

/// Attributes that run script without a `<script>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveAttributes {
    Keep,
    /// Drop `on*` handlers, `srcdoc` and script URLs.
    Drop,
}

/// A `<script>` element lifted out of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    /// Value of the `src` attribute, if the element has one.
    pub src: Option<String>,
    /// Element body, verbatim.
    pub text: String,
}

/// Output of [`contain`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contained {
    pub markup: String,
    pub scripts: Vec<ScriptElement>,
}

/// Elements with no end tag.
const VOID: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "image", "img",
    "input", "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is text up to the matching end tag.
const RAW_TEXT: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "style", "textarea", "title", "xmp",
];

/// Tags that act on the whole document rather than the fragment.
const DOCUMENT_LEVEL: &[&str] = &["base", "body", "frameset", "head", "html"];

/// Start tags that close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p",
    "pre", "search", "section", "summary", "table", "ul", "xmp",
];

/// Elements that stop the `<li>`/`<dd>`/`<dt>` auto-close walk.
const SPECIAL: &[&str] = &[
    "applet", "area", "article", "aside", "blockquote", "button", "caption", "center", "col",
    "colgroup", "details", "dir", "dl", "embed", "fieldset", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "iframe", "img",
    "input", "listing", "main", "marquee", "menu", "nav", "object", "ol", "pre", "search",
    "section", "select", "summary", "table", "tbody", "td", "template", "tfoot", "th", "thead",
    "tr", "ul",
];

const DEFAULT_SCOPE: &[&str] = &[
    "applet", "caption", "html", "marquee", "object", "table", "td", "template", "th",
    "foreignobject", "desc", "title", "annotation-xml", "mi", "mn", "mo", "ms", "mtext",
];

const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
    "foreignobject", "desc", "title", "annotation-xml", "mi", "mn", "mo", "ms", "mtext",
];

/// Children of `<svg>`/`<math>` whose content is parsed as HTML again.
const INTEGRATION_POINTS: &[&str] = &[
    "annotation-xml", "desc", "foreignobject", "mi", "mn", "mo", "ms", "mtext", "title",
];

/// HTML start tags that end foreign content.
const BREAKOUT: &[&str] = &[
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em",
    "embed", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing", "menu",
    "meta", "nobr", "ol", "p", "pre", "ruby", "s", "small", "span", "strike", "strong", "sub",
    "sup", "table", "tt", "u", "ul", "var",
];

/// Attributes holding a URL the browser may navigate to or load.
const URL_ATTRIBUTES: &[&str] = &[
    "action", "background", "data", "formaction", "href", "poster", "src", "xlink:href",
];

/// Rewrite `fragment` so it stays inside whatever element it is placed in.
pub fn contain(fragment: &str, active: ActiveAttributes) -> Contained {
    let mut pass = Pass {
        src: fragment,
        lower: fragment.to_ascii_lowercase(),
        out: String::with_capacity(fragment.len()),
        open: Vec::new(),
        scripts: Vec::new(),
        active,
    };
    pass.run();
    Contained {
        markup: pass.out,
        scripts: pass.scripts,
    }
}

struct Pass<'a> {
    src: &'a str,
    // ASCII lowercasing keeps byte offsets aligned with `src`.
    lower: String,
    out: String,
    open: Vec<String>,
    scripts: Vec<ScriptElement>,
    active: ActiveAttributes,
}

impl Pass<'_> {
    fn run(&mut self) {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut cursor = 0;

        while let Some(rel) = src[cursor..].find('<') {
            let lt = cursor + rel;
            self.out.push_str(&src[cursor..lt]);
            cursor = match bytes.get(lt + 1) {
                Some(b'!') if src[lt..].starts_with("<!--") => self.comment(lt),
                Some(b'!' | b'?') => self.bogus_comment(lt),
                Some(b'/') => match bytes.get(lt + 2) {
                    Some(c) if c.is_ascii_alphabetic() => self.end_tag(lt),
                    _ => self.bogus_comment(lt),
                },
                Some(c) if c.is_ascii_alphabetic() => self.start_tag(lt),
                _ => self.text_lt(lt),
            };
        }
        self.out.push_str(&src[cursor..]);
        self.close_through(0);
    }

    fn text_lt(&mut self, lt: usize) -> usize {
        self.out.push_str("&lt;");
        lt + 1
    }

    fn comment(&mut self, lt: usize) -> usize {
        let body = lt + "<!--".len();
        let rest = &self.src[body..];
        let len = if rest.starts_with('>') {
            Some(1)
        } else if rest.starts_with("->") {
            Some(2)
        } else {
            [
                rest.find("-->").map(|p| p + 3),
                rest.find("--!>").map(|p| p + 4),
            ]
            .into_iter()
            .flatten()
            .min()
        };
        match len {
            Some(len) => {
                self.out.push_str(&self.src[lt..body + len]);
                body + len
            }
            None => {
                self.out.push_str(&self.src[lt..]);
                self.out.push_str("-->");
                self.src.len()
            }
        }
    }

    /// `<!doctype>`, `<?…>`, `</ …>`: inert up to the next `>`.
    fn bogus_comment(&mut self, lt: usize) -> usize {
        match self.src[lt..].find('>') {
            Some(gt) => {
                self.out.push_str(&self.src[lt..=lt + gt]);
                lt + gt + 1
            }
            None => self.text_lt(lt),
        }
    }

    fn end_tag(&mut self, lt: usize) -> usize {
        let Some(tag) = scan_tag(self.src, lt) else {
            return self.text_lt(lt);
        };
        let name = &self.lower[tag.name.clone()];
        if let Some(index) = self.open.iter().rposition(|open| open == name) {
            self.close_through(index);
        }
        tag.end + 1
    }

    fn start_tag(&mut self, lt: usize) -> usize {
        let Some(tag) = scan_tag(self.src, lt) else {
            return self.text_lt(lt);
        };
        let name = self.lower[tag.name.clone()].to_string();
        if name.contains('<') || name == "plaintext" {
            return self.text_lt(lt);
        }
        if DOCUMENT_LEVEL.contains(&name.as_str()) {
            return tag.end + 1;
        }
        if name == "script" {
            return self.script(&tag);
        }

        let mut foreign = self.in_foreign();
        if foreign && breaks_out(&name, &tag, &self.lower) {
            while self.in_foreign() {
                match self.open.iter().rposition(|n| n == "svg" || n == "math") {
                    Some(root) => self.close_through(root),
                    None => break,
                }
            }
            foreign = false;
        }
        if !foreign && !self.implicit_closes(&name) {
            return tag.end + 1;
        }

        self.emit_start_tag(lt, &tag);
        if !foreign && RAW_TEXT.contains(&name.as_str()) {
            return self.raw_text(&name, tag.end + 1);
        }
        let self_closing = tag.self_closing && (foreign || name == "svg" || name == "math");
        if !VOID.contains(&name.as_str()) && !self_closing {
            self.open.push(name);
        }
        tag.end + 1
    }

    /// Apply the closes a browser performs before inserting `name`. Returns
    /// false when the browser ignores the tag.
    fn implicit_closes(&mut self, name: &str) -> bool {
        match name {
            "li" => self.close_list_item(&["li"]),
            "dd" | "dt" => self.close_list_item(&["dd", "dt"]),
            _ => {}
        }
        if CLOSES_P.contains(&name) {
            if let Some(p) = self.in_scope("p", BUTTON_SCOPE) {
                self.close_through(p);
            }
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.open.last().is_some_and(|top| is_heading(top)) {
                    self.close_through(self.open.len() - 1);
                }
            }
            "button" => {
                if let Some(button) = self.in_scope("button", DEFAULT_SCOPE) {
                    self.close_through(button);
                }
            }
            "a" => {
                if let Some(a) = self.open.iter().rposition(|n| n == "a") {
                    self.close_through(a);
                }
            }
            "form" => return !self.open.iter().any(|n| n == "form"),
            "select" => {
                if let Some(select) = self.open.iter().rposition(|n| n == "select") {
                    self.close_through(select);
                    return false;
                }
            }
            "input" | "keygen" | "textarea" => {
                if let Some(select) = self.open.iter().rposition(|n| n == "select") {
                    self.close_through(select);
                }
            }
            _ => {}
        }
        true
    }

    fn close_list_item(&mut self, names: &[&str]) {
        for index in (0..self.open.len()).rev() {
            let open = self.open[index].as_str();
            if names.contains(&open) {
                self.close_through(index);
                return;
            }
            if SPECIAL.contains(&open) && !matches!(open, "address" | "div" | "p") {
                return;
            }
        }
    }

    fn in_scope(&self, name: &str, boundaries: &[&str]) -> Option<usize> {
        for (index, open) in self.open.iter().enumerate().rev() {
            if open == name {
                return Some(index);
            }
            if boundaries.contains(&open.as_str()) {
                return None;
            }
        }
        None
    }

    fn in_foreign(&self) -> bool {
        for open in self.open.iter().rev() {
            match open.as_str() {
                "svg" | "math" => return true,
                n if INTEGRATION_POINTS.contains(&n) => return false,
                _ => {}
            }
        }
        false
    }

    /// Pop and close every open element from `index` up.
    fn close_through(&mut self, index: usize) {
        while self.open.len() > index {
            if let Some(name) = self.open.pop() {
                let _ = write!(self.out, "</{name}>");
            }
        }
    }

    fn emit_start_tag(&mut self, lt: usize, tag: &Tag) {
        let raw = &self.src[lt..=tag.end];
        let dropped: Vec<bool> = match self.active {
            ActiveAttributes::Keep => Vec::new(),
            ActiveAttributes::Drop => tag
                .attributes
                .iter()
                .map(|attr| is_active(self.src, &self.lower, attr))
                .collect(),
        };
        if !dropped.contains(&true) {
            self.out.push_str(raw);
            return;
        }

        self.out.push('<');
        self.out.push_str(&self.src[tag.name.clone()]);
        for (attr, drop) in tag.attributes.iter().zip(dropped) {
            if !drop {
                self.out.push(' ');
                self.out.push_str(&self.src[attr.span.clone()]);
            }
        }
        if tag.self_closing {
            self.out.push_str(" /");
        }
        self.out.push('>');
    }

    fn raw_text(&mut self, name: &str, body_start: usize) -> usize {
        let close = find_close_tag(&self.lower, name, body_start);
        match close.and_then(|c| scan_tag(self.src, c)) {
            Some(end) => {
                self.out.push_str(&self.src[body_start..=end.end]);
                end.end + 1
            }
            None => {
                let body_end = close.unwrap_or(self.src.len());
                self.out.push_str(&self.src[body_start..body_end]);
                let _ = write!(self.out, "</{name}>");
                self.src.len()
            }
        }
    }

    /// Lift a `<script>` element. Its body runs to the next `</script`, or
    /// to the end of the fragment.
    fn script(&mut self, tag: &Tag) -> usize {
        let body_start = tag.end + 1;
        let close = find_close_tag(&self.lower, "script", body_start);
        let body_end = close.unwrap_or(self.src.len());
        let next = close
            .and_then(|c| scan_tag(self.src, c))
            .map_or(self.src.len(), |end| end.end + 1);
        self.scripts.push(ScriptElement {
            src: attribute(self.src, &self.lower, tag, "src").map(str::to_string),
            text: self.src[body_start..body_end].to_string(),
        });
        next
    }
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug)]
struct Attribute {
    name: Range<usize>,
    value: Option<Range<usize>>,
    span: Range<usize>,
}

#[derive(Debug)]
struct Tag {
    name: Range<usize>,
    attributes: Vec<Attribute>,
    self_closing: bool,
    /// Position of the closing `>`.
    end: usize,
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Scan the tag opening at `lt` (`<name…>` or `</name…>`). Quotes only count
/// in attribute values, as in the browser. `None` when the input ends inside
/// the tag.
fn scan_tag(src: &str, lt: usize) -> Option<Tag> {
    let bytes = src.as_bytes();
    let mut i = lt + 1;
    if bytes.get(i) == Some(&b'/') {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && !is_space(bytes[i]) && !matches!(bytes[i], b'/' | b'>') {
        i += 1;
    }
    let name = name_start..i;
    let mut attributes = Vec::new();

    loop {
        let mut slash = false;
        while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
            slash = bytes[i] == b'/';
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                return Some(Tag {
                    name,
                    attributes,
                    self_closing: slash,
                    end: i,
                });
            }
            Some(_) => {}
        }

        // A leading `=` belongs to the name.
        let attr_start = i;
        i += 1;
        while i < bytes.len() && !is_space(bytes[i]) && !matches!(bytes[i], b'/' | b'>' | b'=') {
            i += 1;
        }
        let attr_name = attr_start..i;

        let mut j = i;
        while j < bytes.len() && is_space(bytes[j]) {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            attributes.push(Attribute {
                name: attr_name.clone(),
                value: None,
                span: attr_name,
            });
            i = j;
            continue;
        }
        j += 1;
        while j < bytes.len() && is_space(bytes[j]) {
            j += 1;
        }
        let value = match bytes.get(j).copied() {
            None => return None,
            Some(quote @ (b'"' | b'\'')) => {
                let close = j + 1 + src[j + 1..].find(quote as char)?;
                i = close + 1;
                j + 1..close
            }
            Some(b'>') => {
                i = j;
                j..j
            }
            Some(_) => {
                let start = j;
                while j < bytes.len() && !is_space(bytes[j]) && bytes[j] != b'>' {
                    j += 1;
                }
                i = j;
                start..j
            }
        };
        attributes.push(Attribute {
            name: attr_name,
            value: Some(value),
            span: attr_start..i,
        });
    }
}

/// Value of attribute `name` (first occurrence); empty for a bare attribute.
fn attribute<'a>(src: &'a str, lower: &str, tag: &Tag, name: &str) -> Option<&'a str> {
    tag.attributes
        .iter()
        .find(|attr| &lower[attr.name.clone()] == name)
        .map(|attr| attr.value.clone().map_or("", |value| &src[value]))
}

/// Start of the next `</name` end tag at or after `from` in lowercased input.
fn find_close_tag(lower: &str, name: &str, from: usize) -> Option<usize> {
    let needle = format!("</{name}");
    let mut search = from;
    while let Some(rel) = lower[search..].find(&needle) {
        let pos = search + rel;
        match lower.as_bytes().get(pos + needle.len()) {
            Some(&b) if is_space(b) || b == b'/' || b == b'>' => return Some(pos),
            None => return Some(pos),
            // `</scripts>`, `</style-guide>`
            Some(_) => search = pos + 1,
        }
    }
    None
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn breaks_out(name: &str, tag: &Tag, lower: &str) -> bool {
    BREAKOUT.contains(&name)
        || (name == "font"
            && tag
                .attributes
                .iter()
                .any(|attr| matches!(&lower[attr.name.clone()], "color" | "face" | "size")))
}

// ============================================================================
// Active attributes
// ============================================================================

fn is_active(src: &str, lower: &str, attr: &Attribute) -> bool {
    let name = &lower[attr.name.clone()];
    if name.starts_with("on") || name == "srcdoc" {
        return true;
    }
    if !URL_ATTRIBUTES.contains(&name) {
        return false;
    }
    attr.value
        .clone()
        .is_some_and(|value| is_script_url(&src[value]))
}

/// Whether a URL attribute value runs script when followed.
fn is_script_url(value: &str) -> bool {
    let compact: String = decode_char_refs(value)
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

fn decode_char_refs(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match char_ref(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the character reference at the start of `s` (which starts with
/// `&`). Numeric references plus the named ones that can spell a scheme.
fn char_ref(s: &str) -> Option<(char, usize)> {
    let body = &s[1..];
    if let Some(number) = body.strip_prefix('#') {
        let (digits, radix, prefix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 {
            return None;
        }
        let c = u32::from_str_radix(&digits[..len], radix)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}');
        let semicolon = usize::from(digits[len..].starts_with(';'));
        return Some((c, 1 + prefix + len + semicolon));
    }
    [("colon;", ':'), ("tab;", '\t'), ("newline;", '\n')]
        .into_iter()
        .find(|(name, _)| {
            body.get(..name.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(name))
        })
        .map(|(name, c)| (c, 1 + name.len()))
}
