use std::ops::Add;

/// An [Iterator] which joins wrapped lines back into whole references.
///
/// Reference lists are usually wrapped, with continuation lines indented,
/// e.g.
///
/// ```plain
/// [1] Smith, J. 1999, The Astrophysical Journal, 512,
///     100
/// [2] Jones, K. 2001, MNRAS, 321, 5
/// ```
///
/// Whether a line opens a new reference is left to the `starts_entry`
/// predicate, which sees the lines collected so far for the current
/// reference. [ReferenceLines] yields each reference on one line:
///
/// ```plain
/// [1] Smith, J. 1999, The Astrophysical Journal, 512, 100
/// [2] Jones, K. 2001, MNRAS, 321, 5
/// ```
pub(crate) struct ReferenceLines<'a, I, F>
where
    I: Iterator<Item = &'a str>,
    F: FnMut(&[&'a str], &'a str) -> bool,
{
    lines: I,
    current: Option<&'a str>,
    starts_entry: F,
}

impl<'a, I, F> ReferenceLines<'a, I, F>
where
    I: Iterator<Item = &'a str>,
    F: FnMut(&[&'a str], &'a str) -> bool,
{
    pub(crate) fn new(mut lines: I, starts_entry: F) -> Self {
        Self {
            current: lines.next(),
            lines,
            starts_entry,
        }
    }

    /// Consume lines until the next reference starts, leaving its first line
    /// in `self.current`, and return the joined reference.
    fn consume_reference(&mut self, first_line: &'a str) -> String {
        let mut entry = vec![first_line];
        self.current = None;
        for line in self.lines.by_ref() {
            if (self.starts_entry)(&entry, line) {
                self.current = Some(line);
                break;
            }
            entry.push(line);
        }
        join_lines(entry)
    }
}

/// Join trimmed lines on a space, except after a hyphen, where the line
/// break split a word or a page range.
pub(crate) fn join_lines(lines: Vec<&str>) -> String {
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(String::new(), |acc, e| {
            if acc.ends_with('-') || acc.is_empty() {
                acc
            } else {
                acc.add(" ")
            }
            .add(e)
        })
}

impl<'a, I, F> Iterator for ReferenceLines<'a, I, F>
where
    I: Iterator<Item = &'a str>,
    F: FnMut(&[&'a str], &'a str) -> bool,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.current.map(|line| self.consume_reference(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn unindented(_: &[&str], line: &str) -> bool {
        !line.starts_with(char::is_whitespace)
    }

    #[rstest]
    #[case("", &[""])]
    #[case("one\ntwo\nthree", &["one", "two", "three"])]
    #[case(
        "Smith, J. 1999, ApJ, 512,\n    100\nJones, K. 2001, MNRAS, 321, 5",
        &["Smith, J. 1999, ApJ, 512, 100", "Jones, K. 2001, MNRAS, 321, 5"]
    )]
    #[case("Doe, A. 2000, ApJ, 1, 100-\n    110", &["Doe, A. 2000, ApJ, 1, 100-110"])]
    #[case("  leading\ncontinued", &["leading", "continued"])]
    fn test_reference_lines(#[case] text: &str, #[case] expected: &[&str]) {
        let actual = ReferenceLines::new(text.split('\n'), unindented).collect_vec();
        assert_eq!(&actual.iter().map(String::as_str).collect_vec(), expected)
    }

    #[test]
    fn test_predicate_sees_current_entry() {
        let text = "a\nb\nc\nd\ne";
        let actual = ReferenceLines::new(text.split('\n'), |entry: &[&str], _| entry.len() == 2)
            .collect_vec();
        assert_eq!(actual, vec!["a b", "c d", "e"]);
    }
}
