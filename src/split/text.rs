//! Heuristics for line-oriented reference lists.

use std::sync::LazyLock;

use either::{Either, Left, Right};
use itertools::Itertools;
use tracing::debug;

use super::continuation::ReferenceLines;
use super::paragraphs::Paragraphs;
use crate::regex::Regex;
use crate::utils::{is_year_shaped, match_arxiv_id, match_doi, squeeze};

static ENUMERATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\[\s*\d{1,4}[a-z]?\s*\]\s*|\(\s*\d{1,4}\s*\)\s*|\d{1,3}[.)]\s+)").unwrap()
});
static DASHES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^\\s*[-_\u{2012}\u{2013}\u{2014}\u{2015}]{2,}").unwrap());
static DIGITS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static AUTHOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][A-Za-z'-]+,?\s+(?:[A-Z]\.|[A-Z][a-z]+)|[A-Z]\.\s*[A-Z][a-z]+").unwrap()
});
static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:references?|bibliography|literature\s+cited|notes)\s*:?$").unwrap()
});

/// Whether `line` starts with a list marker such as `[12]`, `(12)` or `12.`.
pub fn has_enumeration(line: &str) -> bool {
    ENUMERATION_REGEX.is_match(line)
}

/// `line` without its leading list marker.
pub fn strip_enumeration(line: &str) -> &str {
    match ENUMERATION_REGEX.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// A reference needs a year plus author-like capitalization, a DOI or an
/// arXiv id.
pub fn looks_like_reference(text: &str) -> bool {
    first_year(text).is_some()
        && (AUTHOR_REGEX.is_match(text)
            || match_doi(text).is_some()
            || match_arxiv_id(text).is_some())
}

/// Byte offset of the first year-shaped token in `text`.
fn first_year(text: &str) -> Option<usize> {
    DIGITS_REGEX
        .find_iter(text)
        .find(|m| is_year_shaped(m.as_str()))
        .map(|m| m.start())
}

/// Replace the "same authors" dashes at the start of `current` with the
/// author span of `previous`.
///
/// The author span is whatever precedes the first year in `previous`. When
/// `current` does not start with two or more dashes, or `previous` has no
/// year to anchor on, `current` is returned unchanged.
pub fn inherit_authors(previous: &str, current: &str) -> String {
    let Some(dashes) = DASHES_REGEX.find(current) else {
        return current.to_string();
    };
    let previous = strip_enumeration(previous);
    let Some(year) = first_year(previous) else {
        return current.to_string();
    };
    let authors = previous[..year]
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '(' | ',' | ';' | '['));
    if authors.is_empty() {
        return current.to_string();
    }
    let rest = current[dashes.end()..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':'));
    if rest.is_empty() {
        authors.to_string()
    } else {
        format!("{authors} {rest}")
    }
}

/// Split a plain text reference list into one string per reference.
///
/// Paragraphs are split on blank lines. Within a paragraph a line opens a
/// new reference when it carries a list marker; in lists without markers,
/// when it is not indented and the reference collected so far already looks
/// like a complete citation. Markers are stripped, dashes standing for
/// repeated authors are resolved and section headings are dropped.
pub fn split_text_references(block: &str) -> Vec<String> {
    let enumerated = block.lines().filter(|line| has_enumeration(line)).count() >= 2;

    let (headings, entries): (Vec<_>, Vec<_>) = Paragraphs::new(block)
        .flat_map(|(line_number, paragraph)| {
            ReferenceLines::new(paragraph.lines(), move |entry: &[&str], line: &str| {
                starts_reference(enumerated, entry, line)
            })
            .map(move |entry| (line_number, entry))
        })
        .partition_map(classify_entry);

    for (line_number, heading) in headings {
        debug!(line_number, %heading, "Skipping heading in reference list");
    }

    let mut references: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let text = squeeze(strip_enumeration(&entry));
        if text.is_empty() {
            continue;
        }
        let text = match references.last() {
            Some(previous) => inherit_authors(previous, &text),
            None => text,
        };
        references.push(text);
    }
    references
}

fn starts_reference(enumerated: bool, entry: &[&str], line: &str) -> bool {
    if has_enumeration(line) {
        return true;
    }
    if enumerated || line.starts_with(char::is_whitespace) {
        return false;
    }
    if DASHES_REGEX.is_match(line) {
        return true;
    }
    let so_far = entry.join(" ");
    looks_like_reference(&so_far) || HEADING_REGEX.is_match(so_far.trim())
}

fn classify_entry((line_number, entry): (usize, String)) -> Either<(usize, String), String> {
    if HEADING_REGEX.is_match(entry.trim()) {
        Left((line_number, entry))
    } else {
        Right(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("[12] Smith", true, "Smith")]
    #[case("  (3) Smith", true, "Smith")]
    #[case("12. Smith", true, "Smith")]
    #[case("4) Smith", true, "Smith")]
    #[case("1993. Smith", false, "1993. Smith")]
    #[case("Smith 12.", false, "Smith 12.")]
    fn test_enumeration(#[case] line: &str, #[case] marked: bool, #[case] stripped: &str) {
        assert_eq!(has_enumeration(line), marked);
        assert_eq!(strip_enumeration(line), stripped);
    }

    #[rstest]
    #[case("Smith, J. 1999, ApJ, 512, 100", true)]
    #[case("A. Einstein, Ann. Phys. 1905", true)]
    #[case("see 2020, doi:10.1000/xyz", true)]
    #[case("preprint 2021 arXiv:2105.00123", true)]
    #[case("Smith, J., ApJ, 512, 100", false)]
    #[case("table 1999 values", false)]
    fn test_looks_like_reference(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(looks_like_reference(text), expected);
    }

    #[rstest]
    #[case("Smith, J. (2019), ApJ, 1, 2", "--- (2020), ApJ, 3, 4", "Smith, J. (2020), ApJ, 3, 4")]
    #[case("Smith, J. 2019, ApJ, 1, 2", "______. 2020, ApJ, 3, 4", "Smith, J. 2020, ApJ, 3, 4")]
    #[case("[4] Smith, J., 2019, ApJ", "\u{2014}\u{2014} 2021, AJ", "Smith, J. 2021, AJ")]
    #[case("Smith, J., ApJ, 1, 2", "--- (2020), ApJ, 3, 4", "--- (2020), ApJ, 3, 4")]
    #[case("Smith, J. (2019), ApJ", "Jones, K. (2020), AJ", "Jones, K. (2020), AJ")]
    #[case("Smith, J. (2019), ApJ", "- 2020, AJ", "- 2020, AJ")]
    fn test_inherit_authors(#[case] previous: &str, #[case] current: &str, #[case] expected: &str) {
        assert_eq!(inherit_authors(previous, current), expected);
    }

    #[test]
    fn test_split_enumerated_list() {
        let block = "References\n\
                     [1] Smith, J. 1999, The Astrophysical Journal,\n\
                     512, 100\n\
                     [2] --- 2001, MNRAS, 321, 5\n\
                     [3] Doe, A. 2003, AJ, 125, 1-\n\
                     10\n";
        assert_eq!(
            split_text_references(block),
            vec![
                "Smith, J. 1999, The Astrophysical Journal, 512, 100",
                "Smith, J. 2001, MNRAS, 321, 5",
                "Doe, A. 2003, AJ, 125, 1-10",
            ]
        );
    }

    #[test]
    fn test_split_unmarked_list() {
        let block = "Smith, J. 1999, ApJ, 512, 100\n\
                     Jones, K. and Brown, L.\n    2001, MNRAS, 321, 5\n\
                     \n\
                     Doe, A. 2003, AJ, 125, 1\n";
        assert_eq!(
            split_text_references(block),
            vec![
                "Smith, J. 1999, ApJ, 512, 100",
                "Jones, K. and Brown, L. 2001, MNRAS, 321, 5",
                "Doe, A. 2003, AJ, 125, 1",
            ]
        );
    }

    #[test]
    fn test_split_unindented_wrapped_reference() {
        let block = "Jones, K., Brown, L., White, M.,\nand Black, N. 2001, MNRAS, 321, 5\nDoe, A. 2003, AJ, 125, 1";
        assert_eq!(
            split_text_references(block),
            vec![
                "Jones, K., Brown, L., White, M., and Black, N. 2001, MNRAS, 321, 5",
                "Doe, A. 2003, AJ, 125, 1",
            ]
        );
    }
}
