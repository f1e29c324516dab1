//! Cutting raw source buffers into per-document blocks and per-citation
//! fragments.
//!
//! A source buffer holds the reference lists of one or more documents, each
//! introduced by a bibcode marker in one of three conventions:
//!
//! ```plain
//! <ADSBIBCODE>2020ApJ...900....1S</ADSBIBCODE>     (XML)
//! \adsbibcode{2020ApJ...900....1S}                 (LaTeX)
//! %R 2020ApJ...900....1S                           (tagged)
//! ```
//!
//! [`split_bibcode_blocks`] finds the convention in use and returns the text
//! between successive markers. XML blocks are then cut into fragments with
//! [`get_xml_block`]; plain text blocks go through [`split_text_references`].

mod continuation;
mod paragraphs;
mod text;

use std::sync::LazyLock;

use tracing::{debug, error, warn};

use crate::regex::{Captures, Regex, escape};

pub use text::{
    has_enumeration, inherit_authors, looks_like_reference, split_text_references,
    strip_enumeration,
};

/// Length of a valid bibcode.
pub const BIBCODE_LENGTH: usize = 19;

static XML_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ADSBIBCODE>\s*(.*?)\s*</ADSBIBCODE>").unwrap());
static LATEX_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\adsbibcode\{\s*([^}]*?)\s*\}").unwrap());
static TAG_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^%R[ \t]+(\S+)([^\r\n]*?)[ \t]*\r?$|bibcode="([^"]*)""#).unwrap()
});

/// How bibcodes are marked in a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BibcodeMarker {
    /// `<ADSBIBCODE>...</ADSBIBCODE>`
    Xml,
    /// `\adsbibcode{...}`
    Latex,
    /// A `%R ...` line or a `bibcode="..."` attribute.
    Tag,
}

impl BibcodeMarker {
    fn regex(self) -> &'static Regex {
        match self {
            BibcodeMarker::Xml => &XML_MARKER_REGEX,
            BibcodeMarker::Latex => &LATEX_MARKER_REGEX,
            BibcodeMarker::Tag => &TAG_MARKER_REGEX,
        }
    }

    fn bibcode<'h>(caps: &Captures<'h>) -> &'h str {
        caps.get(1)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str().trim())
    }

    /// Whatever follows the bibcode on a `%R` line.
    fn trailing<'h>(caps: &Captures<'h>) -> &'h str {
        caps.get(2).map_or("", |m| m.as_str().trim())
    }
}

/// The documents of a buffer, each with its reference fragments in source
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBlock {
    pub bibcode: String,
    pub fragments: Vec<String>,
}

/// Detect the bibcode marker convention used in `buffer`, checking XML,
/// LaTeX and tagged markers in that order.
pub fn detect_ref_format(buffer: &str) -> Option<BibcodeMarker> {
    [BibcodeMarker::Xml, BibcodeMarker::Latex, BibcodeMarker::Tag]
        .into_iter()
        .find(|marker| marker.regex().is_match(buffer))
}

/// Split `buffer` into `(bibcode, blob)` pairs in source order.
///
/// Each blob spans from just after its marker to just before the next one
/// (or the end of the buffer). Blocks whose bibcode is not
/// [`BIBCODE_LENGTH`] characters long are dropped. When no marker
/// convention is found the result is empty.
pub fn split_bibcode_blocks(buffer: &str) -> Vec<(String, String)> {
    let Some(marker) = detect_ref_format(buffer) else {
        error!("No bibcode marker found in buffer, nothing to split");
        return Vec::new();
    };
    debug!(?marker, "Detected bibcode marker convention");

    let markers: Vec<(&str, usize, usize)> = marker
        .regex()
        .captures_iter(buffer)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let bibcode = BibcodeMarker::bibcode(&caps);
            let trailing = BibcodeMarker::trailing(&caps);
            if !trailing.is_empty() {
                warn!(bibcode, trailing, "Ignoring text after bibcode marker");
            }
            Some((bibcode, whole.start(), whole.end()))
        })
        .collect();

    let mut blocks = Vec::with_capacity(markers.len());
    for (i, (bibcode, _, blob_start)) in markers.iter().enumerate() {
        let blob_end = markers.get(i + 1).map_or(buffer.len(), |next| next.1);
        if bibcode.chars().count() != BIBCODE_LENGTH {
            error!(bibcode, "Invalid bibcode, dropping its references");
            continue;
        }
        blocks.push((bibcode.to_string(), buffer[*blob_start..blob_end].to_string()));
    }
    blocks
}

/// Cut `buffer` into the top-level `<tag ...>...</tag>` fragments it holds.
///
/// A fragment without a closing tag runs to the next opening tag or the end
/// of the buffer. When no opening tag is found at all, the buffer is cut
/// after each closing tag instead.
pub fn get_xml_block(buffer: &str, tag: &str) -> Vec<String> {
    let name = escape(tag);
    let (Ok(open), Ok(close)) = (
        Regex::new(&format!(r"<{name}(?:\s[^>]*)?>")),
        Regex::new(&format!(r"</{name}\s*>")),
    ) else {
        return Vec::new();
    };

    let starts: Vec<usize> = open.find_iter(buffer).map(|m| m.start()).collect();
    if starts.is_empty() {
        let mut fragments = Vec::new();
        let mut from = 0;
        for end in close.find_iter(buffer) {
            push_fragment(&mut fragments, &buffer[from..end.end()]);
            from = end.end();
        }
        return fragments;
    }

    let mut fragments = Vec::with_capacity(starts.len());
    for (i, start) in starts.iter().enumerate() {
        let bound = starts.get(i + 1).copied().unwrap_or(buffer.len());
        let span = &buffer[*start..bound];
        let end = close.find_iter(span).last().map_or(span.len(), |m| m.end());
        push_fragment(&mut fragments, &span[..end]);
    }
    fragments
}

fn push_fragment(fragments: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        fragments.push(fragment.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const BIBCODE_A: &str = "2020ApJ...900....1S";
    const BIBCODE_B: &str = "2019MNRAS.480.1234J";
    const BIBCODE_C: &str = "2018A&A...610A..12K";

    #[rstest]
    #[case("<ADSBIBCODE>2020ApJ...900....1S</ADSBIBCODE>", Some(BibcodeMarker::Xml))]
    #[case(r"\adsbibcode{2020ApJ...900....1S}", Some(BibcodeMarker::Latex))]
    #[case("%R 2020ApJ...900....1S\nrefs", Some(BibcodeMarker::Tag))]
    #[case(r#"<references bibcode="2020ApJ...900....1S">"#, Some(BibcodeMarker::Tag))]
    #[case(
        "%R 2020ApJ...900....1S\n<ADSBIBCODE>2020ApJ...900....1S</ADSBIBCODE>",
        Some(BibcodeMarker::Xml)
    )]
    #[case("just some references", None)]
    fn test_detect_ref_format(#[case] buffer: &str, #[case] expected: Option<BibcodeMarker>) {
        assert_eq!(detect_ref_format(buffer), expected);
    }

    #[test]
    fn test_split_three_tagged_blocks() {
        let buffer = format!(
            "%R {BIBCODE_A}\nfirst a\nfirst b\n%R {BIBCODE_B}\nsecond\n%R {BIBCODE_C}\nthird\n"
        );
        let blocks = split_bibcode_blocks(&buffer);
        assert_eq!(
            blocks,
            vec![
                (BIBCODE_A.to_string(), "\nfirst a\nfirst b\n".to_string()),
                (BIBCODE_B.to_string(), "\nsecond\n".to_string()),
                (BIBCODE_C.to_string(), "\nthird\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_drops_invalid_bibcode() {
        let buffer = format!(
            "<ADSBIBCODE>{BIBCODE_A}</ADSBIBCODE><ref>a</ref><ADSBIBCODE>2020ApJ</ADSBIBCODE><ref>b</ref><ADSBIBCODE>{BIBCODE_B}</ADSBIBCODE><ref>c</ref>"
        );
        let blocks = split_bibcode_blocks(&buffer);
        assert_eq!(
            blocks,
            vec![
                (BIBCODE_A.to_string(), "<ref>a</ref>".to_string()),
                (BIBCODE_B.to_string(), "<ref>c</ref>".to_string()),
            ]
        );
    }

    #[rstest]
    #[case(
        format!("%R {BIBCODE_A} extra\nfirst\n%R {BIBCODE_B}\nsecond\n"),
        vec![BIBCODE_A, BIBCODE_B]
    )]
    #[case(
        format!("%R {BIBCODE_A}\nfirst\n%R {BIBCODE_B}\t0 refs \r\nsecond\n"),
        vec![BIBCODE_A, BIBCODE_B]
    )]
    #[case(
        format!("%R 2020ApJ extra\nfirst\n%R {BIBCODE_B}\nsecond\n"),
        vec![BIBCODE_B]
    )]
    fn test_tag_marker_with_trailing_text(#[case] buffer: String, #[case] expected: Vec<&str>) {
        let blocks = split_bibcode_blocks(&buffer);
        let bibcodes: Vec<&str> = blocks.iter().map(|(bibcode, _)| bibcode.as_str()).collect();
        assert_eq!(bibcodes, expected);
        assert!(blocks.iter().all(|(_, blob)| !blob.contains("extra")));
    }

    #[test]
    fn test_split_latex_blocks() {
        let buffer = format!(
            "\\adsbibcode{{{BIBCODE_A}}}\n\\bibitem a\n\\adsbibcode{{ {BIBCODE_B} }}\n\\bibitem b"
        );
        let bibcodes: Vec<String> = split_bibcode_blocks(&buffer)
            .into_iter()
            .map(|(bibcode, _)| bibcode)
            .collect();
        assert_eq!(bibcodes, vec![BIBCODE_A, BIBCODE_B]);
    }

    #[test]
    fn test_split_without_marker() {
        assert!(split_bibcode_blocks("Smith 1990, ApJ, 1, 2").is_empty());
    }

    #[rstest]
    #[case(
        r#"<ref id="1">a</ref> <ref id="2">b</ref>"#,
        &[r#"<ref id="1">a</ref>"#, r#"<ref id="2">b</ref>"#]
    )]
    #[case("<ref>a <ref>b</ref>", &["<ref>a", "<ref>b</ref>"])]
    #[case("<ref>a</ref><ref>b", &["<ref>a</ref>", "<ref>b"])]
    #[case("a</ref> b</ref> trailing", &["a</ref>", "b</ref>"])]
    #[case("<ref-list><ref>a</ref></ref-list>", &["<ref>a</ref>"])]
    #[case("nothing", &[])]
    fn test_get_xml_block(#[case] buffer: &str, #[case] expected: &[&str]) {
        assert_eq!(get_xml_block(buffer, "ref"), expected);
    }
}
