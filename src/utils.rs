//! Field extractors shared by every reference parser.

use std::sync::LazyLock;

use itertools::Itertools;
use thiserror::Error;

use crate::regex::{Regex, escape};

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());
static SPACES_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DIGITS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static DOI_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)doi\s*:?\s*(10\.\d{4,9}/[^\s<>"]+)"#).unwrap()
});
static DOI_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<doi[^>]*>\s*(10\.\d{4,9}/[^<]+?)\s*</doi>").unwrap()
});
static DOI_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)doi\.org/(10\.\d{4,9}/[^\s<>"]+)"#).unwrap()
});
static DOI_BARE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(10\.\d{4,9}/[^\s<>"]+)"#).unwrap()
});

static ARXIV_LEGACY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(astro-ph|cond-mat|gr-qc|hep-ex|hep-lat|hep-ph|hep-th|math-ph|nlin|nucl-ex|nucl-th|physics|quant-ph|math|cs|q-bio|q-fin|stat|chao-dyn|solv-int|patt-sol|adap-org|comp-gas|chem-ph|supr-con|alg-geom|dg-ga|funct-an|q-alg)(\.[A-Za-z-]{2,})?\s?/\s?(\d{7})(v\d+)?\b",
    )
    .unwrap()
});
static ARXIV_MODERN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2})(\d{2})\.(\d{4,5})(v\d+)?\b").unwrap());

static ROMAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^M{0,4}(CM|CD|D?C{0,3})(XC|XL|L?X{0,3})(IX|IV|V?I{0,3})$").unwrap()
});

const ROMAN_DIGITS: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Largest value the roman numeral helpers accept.
pub const ROMAN_MAX: u32 = 4000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RomanNumeralError {
    #[error("{0} is outside the supported range 1..=4000")]
    OutOfRange(u32),
    #[error("Not a roman numeral: {0:?}")]
    Malformed(String),
}

/// Options for [`extract_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagQuery {
    /// Cut the matched tag out of the returned text.
    pub remove: bool,
    /// Return the whole `<tag>...</tag>` span instead of just its content.
    pub keep_tag: bool,
    /// Run to the last closing tag instead of the first.
    pub greedy: bool,
    /// Match the tag name case-insensitively.
    pub fold_case: bool,
    /// Also match opening tags that carry attributes.
    pub attr: bool,
}

impl Default for TagQuery {
    fn default() -> Self {
        Self {
            remove: true,
            keep_tag: false,
            greedy: false,
            fold_case: false,
            attr: false,
        }
    }
}

impl TagQuery {
    pub fn with_attributes(mut self) -> Self {
        self.attr = true;
        self
    }

    pub fn keeping_tag(mut self) -> Self {
        self.keep_tag = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.fold_case = true;
        self
    }

    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn leave_in_place(mut self) -> Self {
        self.remove = false;
        self
    }
}

/// Locate the first `<tag>...</tag>` span in `text`.
///
/// Returns the text (with the span cut out when `query.remove` is set) and
/// the captured content, or the whole span when `query.keep_tag` is set.
/// Matching is non-greedy unless asked otherwise, since fragments often hold
/// sibling tags of the same name.
///
/// # Arguments
///
/// * `text` - The text to search
/// * `tag` - The tag name, without angle brackets
/// * `query` - Matching options
pub fn extract_tag(text: &str, tag: &str, query: &TagQuery) -> (String, Option<String>) {
    let name = escape(tag);
    let flags = if query.fold_case { "(?is)" } else { "(?s)" };
    let open = if query.attr {
        format!(r"<{name}(?:\s[^>]*)?>")
    } else {
        format!("<{name}>")
    };
    let body = if query.greedy { "(.*)" } else { "(.*?)" };
    let pattern = format!("{flags}{open}{body}</{name}\\s*>");
    let Ok(regex) = Regex::new(&pattern) else {
        return (text.to_string(), None);
    };

    let Some(caps) = regex.captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(whole), Some(content)) = (caps.get(0), caps.get(1)) else {
        return (text.to_string(), None);
    };
    let captured = if query.keep_tag {
        whole.as_str().to_string()
    } else {
        content.as_str().to_string()
    };
    let remaining = if query.remove {
        format!("{}{}", &text[..whole.start()], &text[whole.end()..])
    } else {
        text.to_string()
    };
    (remaining, Some(captured))
}

/// Remove all markup and squeeze whitespace.
pub fn strip_tags(text: &str) -> String {
    squeeze(&TAG_REGEX.replace_all(text, " "))
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn squeeze(text: &str) -> String {
    SPACES_REGEX.replace_all(text.trim(), " ").into_owned()
}

/// Find a DOI, trying the `doi:` prefix, a `<doi>` element, a `doi.org/` URL
/// and finally a bare `10.NNNN/` token, in that order.
pub fn match_doi(text: &str) -> Option<String> {
    [&DOI_PREFIX_REGEX, &DOI_TAG_REGEX, &DOI_URL_REGEX, &DOI_BARE_REGEX]
        .into_iter()
        .find_map(|regex| regex.captures(text))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .and_then(|doi| clean_doi(&doi))
}

/// Normalize a DOI found in running text.
///
/// URL and `doi:` prefixes are dropped, as is trailing punctuation that
/// belongs to the sentence rather than the identifier. A closing bracket is
/// only kept when the DOI opened one.
pub fn clean_doi(doi: &str) -> Option<String> {
    let doi = doi.trim().trim_end_matches("[doi]").trim();
    let start = doi.find("10.")?;
    let mut doi: String = doi[start..].chars().filter(|c| !c.is_whitespace()).collect();

    loop {
        let Some(last) = doi.chars().last() else {
            break;
        };
        let unbalanced = |open: char, close: char| {
            doi.matches(close).count() > doi.matches(open).count()
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '\'' | '"' => true,
            ')' => unbalanced('(', ')'),
            ']' => unbalanced('[', ']'),
            '}' => unbalanced('{', '}'),
            _ => false,
        };
        if !strip {
            break;
        }
        doi.pop();
    }

    doi.contains('/').then_some(doi)
}

/// Find an arXiv identifier.
///
/// Old-style identifiers come back as `archive/YYMMNNN` with the archive
/// lowercased and any subject class dropped; new-style ones as
/// `YYMM.NNNNN` without a version suffix.
pub fn match_arxiv_id(text: &str) -> Option<String> {
    for caps in ARXIV_LEGACY_REGEX.captures_iter(text) {
        let number = &caps[3];
        if valid_month(&number[2..4]) {
            return Some(format!("{}/{}", caps[1].to_lowercase(), number));
        }
    }
    for caps in ARXIV_MODERN_REGEX.captures_iter(text) {
        let (Some(whole), Some(sequence)) = (caps.get(0), caps.get(3)) else {
            continue;
        };
        // inside a DOI or a version-like string such as 1.2105.00123
        if text[..whole.start()].ends_with(['.', '/']) {
            continue;
        }
        let year: u32 = caps[1].parse().unwrap_or(0);
        // five digit sequence numbers start with 1501
        if sequence.len() == 5 && year < 15 {
            continue;
        }
        if valid_month(&caps[2]) && year >= 7 {
            return Some(format!("{}{}.{}", &caps[1], &caps[2], sequence.as_str()));
        }
    }
    None
}

fn valid_month(month: &str) -> bool {
    month.parse::<u32>().is_ok_and(|m| (1..=12).contains(&m))
}

/// Find the publication year.
///
/// Candidates are standalone four digit runs shaped like `[12][09]dd`. One
/// distinct value wins outright; with several, the one enclosed in
/// parentheses is taken. Anything else is ambiguous.
pub fn match_year(text: &str) -> Option<String> {
    let candidates: Vec<(&str, bool)> = DIGITS_REGEX
        .find_iter(text)
        .filter(|m| is_year_shaped(m.as_str()))
        .map(|m| (m.as_str(), is_parenthesized(text, m.start(), m.end())))
        .collect();

    let distinct: Vec<&str> = candidates.iter().map(|(year, _)| *year).unique().collect();
    match distinct.as_slice() {
        [] => None,
        [year] => Some(year.to_string()),
        _ => {
            let enclosed: Vec<&str> = candidates
                .iter()
                .filter(|(_, parens)| *parens)
                .map(|(year, _)| *year)
                .unique()
                .collect();
            match enclosed.as_slice() {
                [year] => Some(year.to_string()),
                _ => None,
            }
        }
    }
}

pub(crate) fn is_year_shaped(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 4 && matches!(bytes[0], b'1' | b'2') && matches!(bytes[1], b'0' | b'9')
}

fn is_parenthesized(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].trim_end().ends_with('(');
    let after = text[end..].trim_start_matches(|c: char| c.is_ascii_lowercase());
    before || after.trim_start().starts_with(')')
}

/// Split a page token into its numeric page and a one-letter qualifier.
///
/// `L23` gives `("23", Some('L'))`, `23S` gives `("23", Some('S'))`. A
/// leading character in `ignore` is dropped, one in `letters` becomes the
/// qualifier. When no digits remain the result is `("", None)`.
///
/// # Arguments
///
/// * `page` - The raw page token
/// * `ignore` - Leading characters to drop silently
/// * `letters` - Leading characters to keep as the qualifier
pub fn parse_pages(page: &str, ignore: &str, letters: &str) -> (String, Option<char>) {
    let page = page.trim();
    let mut chars = page.chars();
    let Some(first) = chars.next() else {
        return (String::new(), None);
    };
    let after_first = chars.as_str();

    let (rest, qualifier) = if matches!(first, 'L' | 'A') {
        (after_first, Some(first))
    } else if ignore.contains(first) {
        (after_first, None)
    } else if letters.contains(first) {
        (after_first, Some(first))
    } else if let Some(stripped) = page.strip_suffix('S') {
        (stripped, Some('S'))
    } else if first == 'S' {
        (after_first, Some('S'))
    } else {
        (page, None)
    };

    match DIGITS_REGEX.find(rest) {
        Some(digits) => (digits.as_str().to_string(), qualifier),
        None => (String::new(), None),
    }
}

/// The first run of digits in `text`, or an empty string.
pub fn parse_volume(text: &str) -> String {
    DIGITS_REGEX
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Split a page range into first and last page, completing an abbreviated
/// last page (`1234-45` gives `1245`).
pub fn split_page_range(range: &str) -> (String, Option<String>) {
    let range = range.trim();
    let Some((from, to)) = range.split_once(['-', '\u{2013}', '\u{2014}']) else {
        return (range.to_string(), None);
    };
    let from = from.trim();
    let to = to.trim_start_matches(['-', '\u{2013}', '\u{2014}']).trim();
    if to.is_empty() {
        return (from.to_string(), None);
    }

    let (from_prefix, from_num) = split_prefix_and_number(from);
    let (to_prefix, to_num) = split_prefix_and_number(to);
    let (Some(from_num), Some(to_num)) = (from_num, to_num) else {
        return (from.to_string(), Some(to.to_string()));
    };
    if !to_prefix.is_empty() && to_prefix != from_prefix {
        return (from.to_string(), Some(to.to_string()));
    }

    let completed = if to_num.len() < from_num.len() {
        format!("{}{}", &from_num[..from_num.len() - to_num.len()], to_num)
    } else {
        to_num.to_string()
    };
    if completed == from_num {
        return (from.to_string(), None);
    }
    (from.to_string(), Some(format!("{from_prefix}{completed}")))
}

fn split_prefix_and_number(input: &str) -> (&str, Option<&str>) {
    match input.find(|c: char| c.is_ascii_digit()) {
        Some(index) => {
            let digits_end = input[index..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(input.len(), |end| index + end);
            (&input[..index], Some(&input[index..digits_end]))
        }
        None => (input, None),
    }
}

/// Whether `text` is a well-formed roman numeral (case-insensitive).
pub fn is_roman(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    !upper.is_empty() && ROMAN_REGEX.is_match(&upper)
}

/// Convert a roman numeral between `I` and `MMMM` to an integer.
pub fn roman2int(text: &str) -> Result<u32, RomanNumeralError> {
    let upper = text.trim().to_uppercase();
    if !is_roman(&upper) {
        return Err(RomanNumeralError::Malformed(text.to_string()));
    }
    let mut value = 0;
    let mut rest = upper.as_str();
    for (amount, digits) in ROMAN_DIGITS {
        while let Some(stripped) = rest.strip_prefix(digits) {
            value += amount;
            rest = stripped;
        }
    }
    if !(1..=ROMAN_MAX).contains(&value) {
        return Err(RomanNumeralError::OutOfRange(value));
    }
    Ok(value)
}

/// Convert an integer between 1 and 4000 to a roman numeral.
pub fn int2roman(mut value: u32) -> Result<String, RomanNumeralError> {
    if !(1..=ROMAN_MAX).contains(&value) {
        return Err(RomanNumeralError::OutOfRange(value));
    }
    let mut roman = String::new();
    for (amount, digits) in ROMAN_DIGITS {
        while value >= amount {
            roman.push_str(digits);
            value -= amount;
        }
    }
    Ok(roman)
}
