//! References read from scanned pages (`ADSocr`).
//!
//! OCR output is plain text with systematic damage: ligature glyphs, words
//! hyphenated across line breaks and letters read in place of digits. An
//! ordered cleanup table repairs what it can before the text goes through
//! the plain text reader.

use std::sync::LazyLock;

use crate::Result;
use crate::parsers::ReferenceParser;
use crate::parsers::text::parse_text_reference;
use crate::reference::{ParseContext, Reference};
use crate::regex::Regex;
use crate::split::split_text_references;

/// `(pattern, replacement)` pairs, applied in order.
const OCR_CLEANUP: [(&str, &str); 11] = [
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    // hyphenated words broken over a line
    (r"([a-z])-[ \t]*\r?\n[ \t]*([a-z])", "${1}${2}"),
    // O and l read for 0 and 1 inside numbers
    (r"(\d)[Oo]", "${1}0"),
    (r"[Oo](\d)", "0${1}"),
    (r"(\d)[lI]", "${1}1"),
    (r"\b[lI](\d{2,})", "1${1}"),
    // spaces before punctuation
    (r"[ \t]+([,;:])", "${1}"),
];

static OCR_CLEANUP_REGEXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    OCR_CLEANUP
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
});

/// Apply the OCR cleanup table to `text`.
///
/// Digit repairs run until nothing changes, so runs such as `1O0O` are
/// fixed completely.
pub fn clean_ocr(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for (regex, replacement) in OCR_CLEANUP_REGEXES.iter() {
            next = regex.replace_all(&next, *replacement).into_owned();
        }
        if next == current {
            return next;
        }
        current = next;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OcrParser;

impl ReferenceParser for OcrParser {
    fn name(&self) -> &'static str {
        "ADSocr"
    }

    fn split(&self, block: &str) -> Vec<String> {
        split_text_references(&clean_ocr(block))
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        Ok(parse_text_reference(&clean_ocr(fragment), ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::UnicodeTable;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("\u{FB01}eld theory", "field theory")]
    #[case("astro-\nphysics", "astrophysics")]
    #[case("pages 100-\n110", "pages 100-\n110")]
    #[case("ApJ 5l2, l00", "ApJ 512, 100")]
    #[case("1O0O", "1000")]
    #[case("Smith , J. l993", "Smith, J. 1993")]
    #[case("Orion Nebula", "Orion Nebula")]
    fn test_clean_ocr(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(clean_ocr(text), expected);
    }

    #[test]
    fn test_parse_damaged_reference() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let parsed = OcrParser
            .parse_reference("Smith, J. l999, ApJ, 5l2, l00", &mut ctx)
            .unwrap();
        assert_eq!(parsed.get("year"), Some("1999"));
        assert_eq!(parsed.get("volume"), Some("512"));
        assert_eq!(parsed.get("page"), Some("100"));
    }
}
