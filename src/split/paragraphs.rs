/// An [Iterator] over the paragraphs of a plain text reference list.
///
/// A paragraph is a run of consecutive non-blank lines; lines holding only
/// whitespace count as blank. [Iterator::next] returns each paragraph with
/// its surrounding blank lines removed, along with the number of the line
/// it starts on.
pub(crate) struct Paragraphs<'a> {
    line_number: usize,
    text: &'a str,
}

impl<'a> Paragraphs<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            line_number: 1,
            text,
        }
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let mut lines = self.text.split_inclusive('\n');

        let mut skipped = 0;
        let mut start = 0;
        let mut first = None;
        for line in lines.by_ref() {
            if is_blank(line) {
                skipped += 1;
                start += line.len();
            } else {
                first = Some(line);
                break;
            }
        }
        let Some(first) = first else {
            self.line_number += skipped;
            self.text = "";
            return None;
        };

        let mut count = 1;
        let mut end = start + first.len();
        for line in lines {
            if is_blank(line) {
                break;
            }
            count += 1;
            end += line.len();
        }

        let paragraph = self.text[start..end].trim_end();
        let line_number = self.line_number + skipped;
        self.text = &self.text[end..];
        self.line_number = line_number + count;
        Some((line_number, paragraph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("", &[])]
    #[case("\n", &[])]
    #[case(" \n\t\n", &[])]
    #[case("one", &[(1, "one")])]
    #[case("\none", &[(2, "one")])]
    #[case("one\n", &[(1, "one")])]
    #[case("one\ntwo\nthree\n", &[(1, "one\ntwo\nthree")])]
    #[case("one\ntwo\n\napple\nbat\n", &[(1, "one\ntwo"), (4, "apple\nbat")])]
    #[case("one\n  \n\n\napple\n\n\n", &[(1, "one"), (5, "apple")])]
    #[case("one\r\ntwo\r\n\r\nthree", &[(1, "one\r\ntwo"), (4, "three")])]
    #[case("\n\none\n\n\n\napple\nbat\n", &[(3, "one"), (7, "apple\nbat")])]
    fn test_paragraphs(#[case] text: &str, #[case] expected: &[(usize, &str)]) {
        let actual = Paragraphs::new(text).collect_vec();
        assert_eq!(&actual, expected)
    }
}
