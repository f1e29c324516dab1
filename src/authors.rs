//! Author list normalization.
//!
//! Every parser ends up with authors in the same shape:
//! `Last, F., Last2, O., et al.`. Free text goes through [`format_authors`];
//! XML sources that already separate surnames from given names use
//! [`join_name`] and [`join_authors`].

use std::sync::LazyLock;

use crate::regex::Regex;
use crate::utils::squeeze;

static ET_AL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)[,;]?\s*\bet\s*\.?\s*al\b\.?.*$").unwrap());
static SPLIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s*and\s+|\s*,\s*&\s*|\s+and\s+|\s*&\s*|\s*;\s*|\s*,\s*").unwrap()
});
static INITIALS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Z]\.?\s*-?\s*){1,4}$").unwrap());

const PARTICLES: [&str; 17] = [
    "van", "von", "de", "der", "den", "da", "di", "del", "della", "dos", "du", "des", "la",
    "le", "ter", "ten", "st.",
];
const SUFFIXES: [&str; 7] = ["Jr.", "Jr", "Sr.", "Sr", "II", "III", "IV"];
const COLLECTIVE_WORDS: [&str; 6] = [
    "collaboration",
    "team",
    "group",
    "consortium",
    "survey",
    "project",
];

/// Reformat a free-text author list into `Last, F., Last2, O.` form.
///
/// Names may be given as `F. Last`, `Last F.` or `Last, F.` and separated by
/// commas, semicolons, `and` or `&`. A trailing "et al." is kept as a
/// literal token at the end.
///
/// ```
/// use refparse::authors::format_authors;
///
/// assert_eq!(
///     format_authors("F. Last, O. Last2 and O. Last3"),
///     "Last, F., Last2, O., Last3, O."
/// );
/// ```
pub fn format_authors(text: &str) -> String {
    let text = squeeze(text);
    let (names, et_al) = match ET_AL_REGEX.find(&text) {
        Some(m) => (&text[..m.start()], true),
        None => (text.as_str(), false),
    };

    let mut authors: Vec<String> = Vec::new();
    let mut last_is_bare = false;
    for token in SPLIT_REGEX.split(names).map(str::trim) {
        if token.is_empty() || token.eq_ignore_ascii_case("and") {
            continue;
        }
        if last_is_bare && is_initials(token) {
            if let Some(last) = authors.last_mut() {
                last.push_str(", ");
                last.push_str(token);
                last_is_bare = false;
                continue;
            }
        }
        let formatted = format_name(token);
        last_is_bare = !formatted.contains(',') && !is_collective(token);
        authors.push(formatted);
    }

    join_authors(authors, et_al)
}

/// Turn one name into `Last, Given` form.
fn format_name(token: &str) -> String {
    let words: Vec<&str> = token.split_whitespace().collect();
    if words.len() < 2 || is_collective(token) {
        return token.to_string();
    }

    // `Last F. M.`
    if !is_initials(words[0]) {
        if let Some(split) = (1..words.len()).find(|&i| words[i..].iter().all(|w| is_initials(w))) {
            return join_name(&words[..split].join(" "), &words[split..].join(" "));
        }
    }

    // `F. M. Last Jr.`
    let mut end = words.len();
    let suffix = if SUFFIXES.contains(&words[end - 1]) && end > 2 {
        end -= 1;
        Some(words[end])
    } else {
        None
    };
    let mut start = end - 1;
    while start > 1 && PARTICLES.contains(&words[start - 1].to_lowercase().as_str()) {
        start -= 1;
    }
    let mut surname = words[start..end].join(" ");
    if let Some(suffix) = suffix {
        surname.push(' ');
        surname.push_str(suffix);
    }
    join_name(&surname, &words[..start].join(" "))
}

fn is_initials(text: &str) -> bool {
    INITIALS_REGEX.is_match(text)
}

fn is_collective(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split_whitespace()
        .any(|word| COLLECTIVE_WORDS.contains(&word.trim_matches(|c: char| !c.is_alphanumeric())))
}

/// `Surname, Given`, or just the surname when no given name is known.
pub fn join_name(surname: &str, given: &str) -> String {
    let surname = squeeze(surname);
    let given = squeeze(given);
    match (surname.is_empty(), given.is_empty()) {
        (true, _) => given,
        (false, true) => surname,
        (false, false) => format!("{surname}, {given}"),
    }
}

/// Join formatted names, appending "et al." when the list was truncated.
pub fn join_authors(authors: Vec<String>, et_al: bool) -> String {
    let mut joined = authors
        .into_iter()
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if et_al {
        if !joined.is_empty() {
            joined.push_str(", ");
        }
        joined.push_str("et al.");
    }
    joined
}

/// Whether an author field only holds a "same authors as above" rule such
/// as `---` or `___`.
pub fn is_author_placeholder(text: &str) -> bool {
    let text = text.trim().trim_end_matches([',', '.', ';']).trim();
    text.chars().filter(|c| is_dash(*c)).count() >= 2
        && text.chars().all(|c| is_dash(c) || c.is_whitespace())
}

pub(crate) fn is_dash(c: char) -> bool {
    matches!(c, '-' | '_' | '\u{2013}' | '\u{2014}' | '\u{2012}' | '\u{2015}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("F. Last, O. Last2 and O. Last3", "Last, F., Last2, O., Last3, O.")]
    #[case("Smith, J., Jones, K. L., et al.", "Smith, J., Jones, K. L., et al.")]
    #[case("Smith J, Jones K", "Smith, J, Jones, K")]
    #[case("A. Einstein & N. Rosen", "Einstein, A., Rosen, N.")]
    #[case("L. van der Berg", "van der Berg, L.")]
    #[case("J. Smith Jr. and A. B. Jones", "Smith Jr., J., Jones, A. B.")]
    #[case("J.-P. Dupont; M. Curie", "Dupont, J.-P., Curie, M.")]
    #[case("M. Smith et al", "Smith, M., et al.")]
    #[case("Planck Collaboration", "Planck Collaboration")]
    #[case("Hubble", "Hubble")]
    #[case("", "")]
    fn test_format_authors(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(format_authors(text), expected);
    }

    #[rstest]
    #[case("Smith", "J.", "Smith, J.")]
    #[case(" Smith ", "", "Smith")]
    #[case("", "Cher", "Cher")]
    fn test_join_name(#[case] surname: &str, #[case] given: &str, #[case] expected: &str) {
        assert_eq!(join_name(surname, given), expected);
    }

    #[test]
    fn test_join_authors() {
        let names = vec!["Smith, J.".to_string(), String::new(), "Doe, A.".to_string()];
        assert_eq!(join_authors(names, true), "Smith, J., Doe, A., et al.");
        assert_eq!(join_authors(Vec::new(), true), "et al.");
    }

    #[rstest]
    #[case("---", true)]
    #[case("\u{2014}\u{2014}\u{2014},", true)]
    #[case("__ __", true)]
    #[case("-", false)]
    #[case("Smith-Jones", false)]
    #[case("", false)]
    fn test_is_author_placeholder(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_author_placeholder(text), expected);
    }
}
