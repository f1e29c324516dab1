//! Plain text reference lists (`ADStxt`, `arXiv`) and the field reader
//! shared by every text-based format.

use std::sync::LazyLock;

use crate::Result;
use crate::authors::format_authors;
use crate::parsers::{ReferenceParser, set_page_pair};
use crate::reference::{ParseContext, Reference, field};
use crate::regex::{Captures, Regex};
use crate::split::{split_text_references, strip_enumeration};
use crate::utils::{match_arxiv_id, match_doi, match_year, squeeze};

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:doi:\s*|https?://|arxiv:\s*|e-?print:?\s+)\S*",
        r"|\b10\.\d{4,9}/\S+",
        r"|\b[a-z-]+(?:\.[a-z]{2})?/\d{7}(?:v\d+)?",
        r"|\[[a-z-]+(?:\.[a-z-]+)?\]",
    ))
    .unwrap()
});
static LEADING_NOISE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]?\)?[\s,.:;]*").unwrap());
static JOURNAL_VOLUME_PAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<journal>[A-Za-z][A-Za-z&.'\s]*?)[,\s]+(?:[Vv]ol\.?\s*)?(?P<volume>[A-Z]?\d+[A-Za-z]?)",
        r"\s*(?:\((?P<issue>[^)]{1,8})\))?\s*[,:]\s*(?:pp?\.?\s*)?",
        r"(?P<page>[A-Za-z]?\d+[A-Za-z]?)(?:\s*-+\s*(?P<last>[A-Za-z]?\d+))?",
    ))
    .unwrap()
});
static DIGITS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Read the fields of a free-text citation.
///
/// Identifiers are matched anywhere in the text. The authors are taken
/// from before the year and the journal, volume and pages from a
/// `Journal, volume, page` run after it; for the physics style where the
/// year comes last, the run is looked for before the year instead.
pub fn parse_text_reference(text: &str, ctx: &ParseContext) -> Reference {
    let text = squeeze(&ctx.to_ascii(text));
    let body = squeeze(&IDENTIFIER_REGEX.replace_all(&text, " "));

    let mut reference = Reference {
        doi: match_doi(&text),
        arxiv: match_arxiv_id(&text),
        ..Default::default()
    };

    let year = match_year(&body).and_then(|year| Some((year_position(&body, &year)?, year)));
    let Some((position, year)) = year else {
        if let Some(caps) = JOURNAL_VOLUME_PAGE_REGEX.captures(&body) {
            let start = caps.get(0).map_or(0, |m| m.start());
            reference.authors = authors_from(&body[..start]);
            fill_journal_volume_page(&mut reference, &caps);
        }
        return reference;
    };

    let before = &body[..position];
    let after = &body[position + year.len()..];
    let after = LEADING_NOISE_REGEX.replace(after, "");
    reference.year = Some(year);

    if let Some(caps) = JOURNAL_VOLUME_PAGE_REGEX.captures(&after) {
        let start = caps.get(0).map_or(0, |m| m.start());
        reference.title = title_from(&after[..start]);
        reference.authors = authors_from(before);
        fill_journal_volume_page(&mut reference, &caps);
    } else if let Some(caps) = JOURNAL_VOLUME_PAGE_REGEX.captures(before) {
        let start = caps.get(0).map_or(0, |m| m.start());
        reference.authors = authors_from(&before[..start]);
        fill_journal_volume_page(&mut reference, &caps);
    } else {
        reference.authors = authors_from(before);
        reference.title = title_from(&after);
    }
    reference
}

fn year_position(body: &str, year: &str) -> Option<usize> {
    DIGITS_REGEX
        .find_iter(body)
        .find(|m| m.as_str() == year)
        .map(|m| m.start())
}

fn authors_from(span: &str) -> Option<String> {
    let span = span
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '(' | ',' | ';' | ':' | '['));
    if !span.chars().any(char::is_alphabetic) {
        return None;
    }
    field(format_authors(span))
}

fn title_from(span: &str) -> Option<String> {
    let span = span
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '"'));
    if !span.chars().any(char::is_alphabetic) {
        return None;
    }
    field(span)
}

fn fill_journal_volume_page(reference: &mut Reference, caps: &Captures) {
    reference.journal = caps.name("journal").and_then(|m| field(m.as_str()));
    reference.volume = caps.name("volume").and_then(|m| field(m.as_str()));
    reference.issue = caps.name("issue").and_then(|m| field(m.as_str()));
    set_page_pair(
        reference,
        caps.name("page").map(|m| m.as_str()),
        caps.name("last").map(|m| m.as_str()),
    );
}

/// Plain text reference lists, one reference per (possibly wrapped) entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl ReferenceParser for TextParser {
    fn name(&self) -> &'static str {
        "ADStxt"
    }

    fn split(&self, block: &str) -> Vec<String> {
        split_text_references(block)
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        Ok(parse_text_reference(fragment, ctx))
    }
}

/// References extracted from arXiv full text: one per line, never wrapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArxivParser;

impl ReferenceParser for ArxivParser {
    fn name(&self) -> &'static str {
        "arXiv"
    }

    fn split(&self, block: &str) -> Vec<String> {
        block
            .lines()
            .map(|line| squeeze(strip_enumeration(line)))
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        Ok(parse_text_reference(fragment, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::UnicodeTable;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn parse(text: &str) -> Reference {
        parse_text_reference(text, &ParseContext::new(UnicodeTable::builtin()))
    }

    #[test]
    fn test_astronomy_style() {
        let reference = parse("Smith, J. 1999, ApJ, 512, L100");
        assert_eq!(reference.authors.as_deref(), Some("Smith, J."));
        assert_eq!(reference.year.as_deref(), Some("1999"));
        assert_eq!(reference.journal.as_deref(), Some("ApJ"));
        assert_eq!(reference.volume.as_deref(), Some("512"));
        assert_eq!(reference.page.as_deref(), Some("100"));
        assert_eq!(reference.qualifier.as_deref(), Some("L"));
    }

    #[test]
    fn test_physics_style() {
        let reference = parse("J. Smith and K. Jones, Phys. Rev. D 12, 345 (1999).");
        assert_eq!(reference.authors.as_deref(), Some("Smith, J., Jones, K."));
        assert_eq!(reference.year.as_deref(), Some("1999"));
        assert_eq!(reference.journal.as_deref(), Some("Phys. Rev. D"));
        assert_eq!(reference.volume.as_deref(), Some("12"));
        assert_eq!(reference.page.as_deref(), Some("345"));
    }

    #[test]
    fn test_identifiers_do_not_leak_into_fields() {
        let reference =
            parse("Doe, A., & Roe, B. 2003, A&A, 400(2), 100-110, doi:10.1051/0004-6361:20030001");
        assert_eq!(reference.authors.as_deref(), Some("Doe, A., Roe, B."));
        assert_eq!(reference.year.as_deref(), Some("2003"));
        assert_eq!(reference.journal.as_deref(), Some("A&A"));
        assert_eq!(reference.volume.as_deref(), Some("400"));
        assert_eq!(reference.issue.as_deref(), Some("2"));
        assert_eq!(reference.page.as_deref(), Some("100"));
        assert_eq!(reference.page_last.as_deref(), Some("110"));
        assert_eq!(reference.doi.as_deref(), Some("10.1051/0004-6361:20030001"));
    }

    #[test]
    fn test_title_before_journal() {
        let reference = parse("Brown, C. 2010, \"A long title\", MNRAS, 401, 5");
        assert_eq!(reference.title.as_deref(), Some("A long title"));
        assert_eq!(reference.journal.as_deref(), Some("MNRAS"));
    }

    #[test]
    fn test_thesis_falls_back_to_plain_text() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let text = "Brown, C. 2010, PhD thesis, University of Somewhere";
        let parsed = TextParser.parse_reference(text, &mut ctx).unwrap();
        assert_eq!(parsed.get("authors"), Some("Brown, C."));
        assert_eq!(parsed.get("refstr"), None);
        assert_eq!(parsed.get("refplaintext"), Some(text));
    }

    #[test]
    fn test_ibid_uses_previous_journal() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        TextParser
            .parse_reference("Smith, J. 1999, ApJ, 512, 100", &mut ctx)
            .unwrap();
        let second = TextParser
            .parse_reference("Smith, J. 2000, ibid., 513, 7", &mut ctx)
            .unwrap();
        assert_eq!(second.get("journal"), Some("ApJ"));
        assert_eq!(
            second.get("refstr"),
            Some("Smith, J., 2000, ApJ, 513, 7")
        );
    }

    #[rstest]
    #[case("arXiv:2105.00123 [astro-ph.GA]", "2105.00123")]
    #[case("Author, A. 2005, astro-ph/0501001", "astro-ph/0501001")]
    fn test_arxiv_identifiers(#[case] text: &str, #[case] expected: &str) {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let parsed = ArxivParser.parse_reference(text, &mut ctx).unwrap();
        assert_eq!(parsed.get("eprint"), Some(expected));
        assert!(parsed.get("refstr").is_some());
    }

    #[test]
    fn test_arxiv_split_one_per_line() {
        let block = "\n[1] Smith, J. 1999, ApJ, 512, 100\n\n[2] Doe, A. 2001, AJ, 1, 2\n";
        assert_eq!(
            ArxivParser.split(block),
            vec!["Smith, J. 1999, ApJ, 512, 100", "Doe, A. 2001, AJ, 1, 2"]
        );
    }
}
