//! Document normalizer: source HTML in, paginated Markdown out.
//!
//! The pipeline is the same for every adapter: unescape entities, locate the
//! decision payload with a source-specific [`CleaningProfile`], drop pruned
//! subtrees, re-serialize, wrap into a minimal document and hand the result
//! to the HTML→Markdown converter. Pagination slices the full Markdown into
//! fixed-size chunks counted in Unicode scalar values.

use htmd::HtmlToMarkdown;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};
use serde::Serialize;

use crate::{Error, Result};

/// Fixed chunk size for HTML-derived Markdown, in characters.
pub const MARKDOWN_CHUNK_SIZE: usize = 5_000;

/// A single node-matching rule used by cleaning profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Match by tag name, e.g. `body`.
    Tag(&'static str),
    /// Match by CSS class, e.g. `WordSection1`.
    Class(&'static str),
    /// Match by element id, e.g. `Karar`.
    Id(&'static str),
}

impl Rule {
    fn matches(self, element: &Element) -> bool {
        match self {
            Self::Tag(name) => element.name() == name,
            Self::Class(class) => element.classes().any(|c| c == class),
            Self::Id(id) => element.id() == Some(id),
        }
    }
}

/// Per-source cleaning rules applied before conversion.
///
/// `payload` is a preference chain: the first rule that matches an element
/// selects the decision body; when none match, the document `<body>` is used.
/// `prune` subtrees are dropped from the serialized output. `script` and
/// `style` elements are always dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningProfile {
    /// Preferred payload locators, most specific first.
    pub payload: &'static [Rule],
    /// Subtrees to delete before conversion.
    pub prune: &'static [Rule],
}

/// Pagination state for a Markdown document chunk.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedMarkdown {
    /// The requested chunk, `None` when conversion failed.
    pub markdown_chunk: Option<String>,
    /// 1-indexed page of the chunk, clamped into `[1, total_pages]`.
    pub current_page: u32,
    /// Total number of 5 000-char chunks, at least 1.
    pub total_pages: u32,
    /// Whether the full content spans more than one chunk.
    pub is_paginated: bool,
}

/// Unescape HTML entities plus the JS-escaped sequences some of the JSON
/// endpoints embed in their `data` strings.
#[must_use]
pub fn unescape_document_html(raw: &str) -> String {
    let unescaped = html_escape::decode_html_entities(raw).into_owned();
    unescaped
        .replace("\\\"", "\"")
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Convert raw upstream HTML into a full Markdown string.
///
/// Never panics and never leaves partial state behind; a conversion problem
/// surfaces as [`Error::Conversion`].
pub fn html_to_markdown(raw_html: &str, profile: &CleaningProfile) -> Result<String> {
    if raw_html.trim().is_empty() {
        return Err(Error::Conversion("empty HTML document".into()));
    }

    let cleaned = unescape_document_html(raw_html);
    let document = Html::parse_document(&cleaned);

    let payload = locate_payload(&document, profile);
    let mut inner = String::new();
    for child in payload.children() {
        serialize_node(&mut inner, &child, profile.prune);
    }

    let wrapped = format!(
        "<html><head><meta charset=\"utf-8\"></head><body>{inner}</body></html>"
    );

    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build();
    let markdown = converter
        .convert(&wrapped)
        .map_err(|e| Error::Conversion(e.to_string()))?;

    let markdown = markdown.trim().to_string();
    if markdown.is_empty() {
        return Err(Error::Conversion("conversion produced no content".into()));
    }
    Ok(markdown)
}

/// Slice `full` into the requested 5 000-char chunk.
///
/// `total_pages = ceil(len / 5000)` with a floor of 1; the requested page is
/// clamped into range rather than rejected.
#[must_use]
pub fn paginate(full: &str, requested_page: u32) -> PaginatedMarkdown {
    paginate_with_chunk_size(full, requested_page, MARKDOWN_CHUNK_SIZE)
}

fn paginate_with_chunk_size(full: &str, requested_page: u32, chunk: usize) -> PaginatedMarkdown {
    let char_count = full.chars().count();
    let total_pages = u32::try_from(char_count.div_ceil(chunk).max(1)).unwrap_or(u32::MAX);
    let current_page = requested_page.clamp(1, total_pages);

    let skip = (current_page as usize - 1) * chunk;
    let chunk_text: String = full.chars().skip(skip).take(chunk).collect();

    PaginatedMarkdown {
        markdown_chunk: Some(chunk_text),
        current_page,
        total_pages,
        is_paginated: total_pages > 1,
    }
}

fn locate_payload<'a>(document: &'a Html, profile: &CleaningProfile) -> ElementRef<'a> {
    for rule in profile.payload {
        if let Some(found) = find_first(document.root_element(), *rule) {
            return found;
        }
    }
    find_first(document.root_element(), Rule::Tag("body")).unwrap_or_else(|| document.root_element())
}

fn find_first(root: ElementRef<'_>, rule: Rule) -> Option<ElementRef<'_>> {
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if rule.matches(current.value()) {
            return Some(current);
        }
        // Push in reverse so the leftmost match wins.
        let children: Vec<_> = current.children().filter_map(ElementRef::wrap).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    None
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn serialize_node(out: &mut String, node: &ego_tree::NodeRef<'_, Node>, prune: &[Rule]) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(&html_escape::encode_text(text.trim_matches('\u{0}')));
        },
        Node::Element(element) => {
            let name = element.name();
            if name == "script" || name == "style" {
                return;
            }
            if prune.iter().any(|rule| rule.matches(element)) {
                return;
            }
            out.push('<');
            out.push_str(name);
            for (attr_name, attr_value) in element.attrs() {
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(attr_value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&name) {
                return;
            }
            for child in node.children() {
                serialize_node(out, &child, prune);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        },
        _ => {},
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unescape_fixes_js_escaped_sequences() {
        let raw = "&lt;p&gt;bir\\r\\niki\\tüç \\\"dört\\\"&lt;/p&gt;";
        let fixed = unescape_document_html(raw);
        assert_eq!(fixed, "<p>bir\niki\tüç \"dört\"</p>");
    }

    #[test]
    fn payload_chain_prefers_specific_container() {
        let html = r#"<html><body>
            <div class="banner">reklam</div>
            <div class="WordSection1"><p>KARAR METNİ</p></div>
        </body></html>"#;
        let profile = CleaningProfile {
            payload: &[Rule::Class("WordSection1")],
            prune: &[],
        };
        let markdown = html_to_markdown(html, &profile).unwrap();
        assert!(markdown.contains("KARAR METNİ"));
        assert!(!markdown.contains("reklam"));
    }

    #[test]
    fn missing_payload_falls_back_to_body() {
        let html = "<html><body><p>gövde</p></body></html>";
        let profile = CleaningProfile {
            payload: &[Rule::Id("Karar")],
            prune: &[],
        };
        let markdown = html_to_markdown(html, &profile).unwrap();
        assert!(markdown.contains("gövde"));
    }

    #[test]
    fn pruned_subtrees_are_dropped() {
        let html = r#"<html><body>
            <div id="icerik"><p>metin</p><div class="modal fade">kapat</div></div>
            <script>alert(1)</script>
        </body></html>"#;
        let profile = CleaningProfile {
            payload: &[Rule::Id("icerik")],
            prune: &[Rule::Class("modal")],
        };
        let markdown = html_to_markdown(html, &profile).unwrap();
        assert!(markdown.contains("metin"));
        assert!(!markdown.contains("kapat"));
        assert!(!markdown.contains("alert"));
    }

    #[test]
    fn empty_html_is_a_conversion_failure() {
        let err = html_to_markdown("   ", &CleaningProfile::default()).unwrap_err();
        assert_eq!(err.kind(), "conversion_failure");
    }

    #[test]
    fn pagination_math_matches_ceiling_rule() {
        let text = "a".repeat(12_001);
        let page = paginate(&text, 1);
        assert_eq!(page.total_pages, 3);
        assert!(page.is_paginated);
        assert_eq!(page.markdown_chunk.unwrap().chars().count(), 5_000);

        let last = paginate(&text, 3);
        assert_eq!(last.current_page, 3);
        assert_eq!(last.markdown_chunk.unwrap().chars().count(), 1);
    }

    #[test]
    fn pagination_clamps_out_of_range_requests() {
        let text = "kısa metin";
        let page = paginate(text, 99);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.is_paginated);
        assert_eq!(page.markdown_chunk.as_deref(), Some(text));

        let zero = paginate(text, 0);
        assert_eq!(zero.current_page, 1);
    }

    #[test]
    fn pagination_counts_scalar_values_not_bytes() {
        // Multi-byte characters: 6 000 'ş' is 12 000 bytes but 6 000 chars.
        let text = "ş".repeat(6_000);
        let page = paginate(&text, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.markdown_chunk.unwrap().chars().count(), 1_000);
    }

    #[test]
    fn consecutive_chunks_reassemble_exactly() {
        let text: String = ('a'..='z').cycle().take(11_500).collect();
        let first = paginate(&text, 1).markdown_chunk.unwrap();
        let second = paginate(&text, 2).markdown_chunk.unwrap();
        let third = paginate(&text, 3).markdown_chunk.unwrap();
        assert_eq!(format!("{first}{second}{third}"), text);
    }
}
