//! Reference lists scraped from HTML pages (`ADShtml`).

use std::sync::LazyLock;

use crate::Result;
use crate::parsers::ReferenceParser;
use crate::parsers::text::parse_text_reference;
use crate::reference::{ParseContext, Reference};
use crate::regex::Regex;
use crate::split::{inherit_authors, split_text_references, strip_enumeration};
use crate::utils::{match_arxiv_id, match_doi, squeeze, strip_tags};

static ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:li|p|dt|dd|br|tr)\b[^>]*>").unwrap());
static INLINE_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:a|b|i|u|em|strong|span|font|sup|sub|small|cite|var)\b[^>]*>").unwrap()
});
static HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap());
static SCRIPT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b.*?</(?:script|style|head)\s*>").unwrap()
});

/// Text of an HTML snippet: inline markup vanishes, block markup becomes a
/// space.
fn html_text(html: &str) -> String {
    strip_tags(&INLINE_TAG_REGEX.replace_all(html, ""))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl ReferenceParser for HtmlParser {
    fn name(&self) -> &'static str {
        "ADShtml"
    }

    fn split(&self, block: &str) -> Vec<String> {
        let block = SCRIPT_REGEX.replace_all(block, " ");
        if !ENTRY_REGEX.is_match(&block) {
            let lines: Vec<String> = block.lines().map(html_text).collect();
            return split_text_references(&lines.join("\n"));
        }

        let mut fragments: Vec<String> = Vec::new();
        let mut previous_text: Option<String> = None;
        for piece in ENTRY_REGEX.split(&block) {
            let text = squeeze(strip_enumeration(&html_text(piece)));
            if !text.chars().any(char::is_alphanumeric) {
                continue;
            }
            let inherited = previous_text
                .as_deref()
                .map(|previous| inherit_authors(previous, &text))
                .filter(|inherited| *inherited != text);
            match inherited {
                Some(inherited) => {
                    fragments.push(inherited.clone());
                    previous_text = Some(inherited);
                }
                None => {
                    fragments.push(piece.trim().to_string());
                    previous_text = Some(text);
                }
            }
        }
        fragments
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let links: Vec<&str> = HREF_REGEX
            .captures_iter(fragment)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        let text = squeeze(strip_enumeration(&html_text(fragment)));
        let mut reference = parse_text_reference(&text, ctx);
        if reference.doi.is_none() {
            reference.doi = links.iter().find_map(|link| match_doi(link));
        }
        if reference.arxiv.is_none() {
            reference.arxiv = links
                .iter()
                .filter(|link| link.contains("arxiv"))
                .find_map(|link| match_arxiv_id(link));
        }
        Ok(reference)
    }
}
