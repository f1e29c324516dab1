//! Entity and non-ASCII character normalisation.
//!
//! Reference sources mix named entities (`&eacute;`), numeric entities
//! (`&#233;`, `&#xE9;`), raw UTF-8 and LaTeX accent commands. Everything is
//! reduced to plain ASCII through a [`UnicodeTable`], which maps each code
//! point to an entity name, an ASCII approximation and a LaTeX spelling.
//!
//! The table is read once and never mutated afterwards. The built-in table is
//! compiled into the crate from `data/unicode.dat` and initialised on first
//! use by [`UnicodeTable::builtin`]; callers that need a different table load
//! one with [`UnicodeTable::from_path`] and pass it by reference.
//!
//! # Example
//!
//! ```
//! use refparse::unicode::UnicodeTable;
//!
//! let table = UnicodeTable::builtin();
//! assert_eq!(table.ent2asc("Andr&eacute; &amp; G&#246;del").unwrap(), "Andre & Godel");
//! assert_eq!(table.u2asc("Ångström").unwrap(), "Angstrom");
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use thiserror::Error;
use tracing::debug;

use crate::regex::{Captures, Regex};

const BUILTIN_TABLE: &str = include_str!("../data/unicode.dat");

static BUILTIN: LazyLock<UnicodeTable> = LazyLock::new(|| {
    UnicodeTable::from_reader(BUILTIN_TABLE.as_bytes()).expect("built-in unicode table is valid")
});

static ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

// symbol accents may touch their letter (`\"o`), letter accents need a brace
// or a space (`\v{c}`, `\c c`) so that `\rm` and `\url` are left alone
static LATEX_ACCENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\{?\\(?:([`'^~=".])\s*(?:\{\s*(\\?[A-Za-z])\s*\}|(\\?[A-Za-z]))"#,
        r"|([uvHckdr])(?:\s*\{\s*(\\?[A-Za-z])\s*\}|\s+([A-Za-z])\b))\}?",
    ))
    .unwrap()
});

static LATEX_SYMBOL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{?\\(ss|ae|AE|oe|OE|aa|AA|o|O|l|L|i)\b\}?").unwrap());

/// Errors raised while converting text or loading a table.
#[derive(Error, Debug)]
pub enum UnicodeError {
    #[error("Unknown entity: &{0};")]
    UnknownEntity(String),

    #[error("Unknown character: {0:?}")]
    UnknownCharacter(char),

    #[error("Invalid unicode table entry at line {line}: {message}")]
    Table { line: usize, message: String },

    #[error("Unicode table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicodeChar {
    pub code: u32,
    /// Entity name without the surrounding `&` and `;`, empty when there is none.
    pub entity: String,
    pub ascii: String,
    pub latex: String,
}

/// Immutable lookup of code points, entity names and LaTeX spellings.
#[derive(Debug, Default, Clone)]
pub struct UnicodeTable {
    by_code: HashMap<u32, UnicodeChar>,
    by_name: HashMap<String, u32>,
    by_latex: HashMap<String, u32>,
}

impl UnicodeTable {
    /// The table shipped with the crate.
    pub fn builtin() -> &'static UnicodeTable {
        &BUILTIN
    }

    /// Load a table from a `;`-separated file (`code;entity;ascii;latex`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, UnicodeError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a table from any reader.
    ///
    /// Lines starting with `#` are comments. The code column is hexadecimal.
    /// A code may appear on several rows to register entity aliases; the
    /// first row for a code provides its ASCII and LaTeX spellings.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, UnicodeError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .comment(Some(b'#'))
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut table = UnicodeTable::default();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let code_field = record.get(0).unwrap_or("").trim();
            let code = u32::from_str_radix(code_field, 16).map_err(|e| UnicodeError::Table {
                line,
                message: format!("invalid code point '{code_field}': {e}"),
            })?;
            let entity = record.get(1).unwrap_or("").trim().to_string();
            let ascii = record.get(2).unwrap_or("").to_string();
            let latex = record.get(3).unwrap_or("").trim().to_string();

            if !entity.is_empty() {
                table.by_name.entry(entity.clone()).or_insert(code);
            }
            if !latex.is_empty() {
                table.by_latex.entry(latex.clone()).or_insert(code);
            }
            table.by_code.entry(code).or_insert(UnicodeChar {
                code,
                entity,
                ascii,
                latex,
            });
        }
        debug!(entries = table.by_code.len(), names = table.by_name.len(), "loaded unicode table");
        Ok(table)
    }

    pub fn get(&self, code: u32) -> Option<&UnicodeChar> {
        self.by_code.get(&code)
    }

    pub fn by_name(&self, name: &str) -> Option<&UnicodeChar> {
        self.by_name.get(name).and_then(|code| self.by_code.get(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// ASCII for a single entity body (`eacute`, `#233`, `#xE9`).
    fn entity_ascii(&self, body: &str) -> Option<String> {
        let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok()?
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok()?
        } else {
            return self.by_name(body).map(|c| c.ascii.clone());
        };
        if code < 128 {
            return char::from_u32(code).map(String::from);
        }
        self.get(code).map(|c| c.ascii.clone())
    }

    /// Resolve named, decimal and hexadecimal entities to ASCII.
    ///
    /// Fails with [`UnicodeError::UnknownEntity`] on the first entity the
    /// table does not cover. Replacement is repeated until no entity is left,
    /// so applying it twice yields the same string.
    pub fn ent2asc(&self, text: &str) -> Result<String, UnicodeError> {
        let mut current = text.to_string();
        loop {
            let mut unknown = None;
            let replaced = ENTITY_REGEX
                .replace_all(&current, |caps: &Captures| match self.entity_ascii(&caps[1]) {
                    Some(ascii) => ascii,
                    None => {
                        unknown.get_or_insert_with(|| caps[1].to_string());
                        caps[0].to_string()
                    }
                })
                .into_owned();
            if let Some(name) = unknown {
                return Err(UnicodeError::UnknownEntity(name));
            }
            if replaced == current {
                return Ok(current);
            }
            current = replaced;
        }
    }

    /// Map every non-ASCII character through the table.
    ///
    /// Characters up to code point 128 pass through unchanged; any other
    /// character missing from the table fails the whole call.
    pub fn u2asc(&self, text: &str) -> Result<String, UnicodeError> {
        let mut result = String::with_capacity(text.len());
        for c in text.chars() {
            if (c as u32) <= 128 {
                result.push(c);
            } else {
                match self.get(c as u32) {
                    Some(entry) => result.push_str(&entry.ascii),
                    None => return Err(UnicodeError::UnknownCharacter(c)),
                }
            }
        }
        Ok(result)
    }

    /// Replace LaTeX accent commands (`\'{e}`, `\"o`, `{\ss}`) by ASCII.
    pub fn latex2asc(&self, text: &str) -> String {
        let text = LATEX_ACCENT_REGEX.replace_all(text, |caps: &Captures| {
            let accent = caps.get(1).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
            let base = [2, 3, 5, 6]
                .into_iter()
                .find_map(|i| caps.get(i))
                .map_or("", |m| m.as_str());
            let key = format!("\\{accent}{{{base}}}");
            match self.by_latex.get(&key).and_then(|code| self.get(*code)) {
                Some(entry) => entry.ascii.clone(),
                None => base.trim_start_matches('\\').to_string(),
            }
        });
        LATEX_SYMBOL_REGEX
            .replace_all(&text, |caps: &Captures| {
                let key = format!("{{\\{}}}", &caps[1]);
                match self.by_latex.get(&key).and_then(|code| self.get(*code)) {
                    Some(entry) => entry.ascii.clone(),
                    None => match &caps[1] {
                        "aa" => "a".to_string(),
                        "AA" => "A".to_string(),
                        other => other.to_string(),
                    },
                }
            })
            .into_owned()
    }

    /// Last-resort cleaner that never fails.
    ///
    /// Known entities and characters are converted as by [`ent2asc`] and
    /// [`u2asc`]; unknown entities are dropped and unknown characters are
    /// decomposed to their ASCII base letter when the table knows a close
    /// relative, otherwise dropped. The output is pure ASCII without entities,
    /// so the function is idempotent.
    ///
    /// [`ent2asc`]: UnicodeTable::ent2asc
    /// [`u2asc`]: UnicodeTable::u2asc
    pub fn cleanall(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let replaced = ENTITY_REGEX
                .replace_all(&current, |caps: &Captures| {
                    self.entity_ascii(&caps[1]).unwrap_or_default()
                })
                .into_owned();
            if replaced == current {
                break;
            }
            current = replaced;
        }

        let mut result = String::with_capacity(current.len());
        for c in current.chars() {
            if c.is_ascii() {
                result.push(c);
            } else if let Some(entry) = self.get(c as u32) {
                result.push_str(&entry.ascii);
            } else if c.is_whitespace() {
                result.push(' ');
            }
        }
        // mapping characters can complete an entity (`&é;` -> `&e;`)
        if ENTITY_REGEX.is_match(&result) && result != current {
            return self.cleanall(&result);
        }
        result
    }

    /// Best-effort ASCII conversion: strict conversions first, [`cleanall`]
    /// when either of them hits a gap in the table.
    ///
    /// [`cleanall`]: UnicodeTable::cleanall
    pub fn to_ascii(&self, text: &str) -> String {
        match self.ent2asc(text).and_then(|t| self.u2asc(&t)) {
            Ok(ascii) => ascii,
            Err(e) => {
                debug!(error = %e, "falling back to cleanall");
                self.cleanall(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("caf&eacute;", "cafe")]
    #[case("G&#246;del", "Godel")]
    #[case("G&#xF6;del", "Godel")]
    #[case("A &amp; B", "A & B")]
    #[case("&lt;i&gt;", "<i>")]
    #[case("&alpha; Cen", "alpha Cen")]
    #[case("1&ndash;10", "1-10")]
    #[case("no entities", "no entities")]
    #[case("&#65;BC", "ABC")]
    fn test_ent2asc(#[case] input: &str, #[case] expected: &str) {
        let table = UnicodeTable::builtin();
        assert_eq!(table.ent2asc(input).unwrap(), expected);
    }

    #[test]
    fn test_ent2asc_unknown_entity() {
        let table = UnicodeTable::builtin();
        let err = table.ent2asc("foo &notanentity; bar").unwrap_err();
        assert!(matches!(err, UnicodeError::UnknownEntity(ref name) if name == "notanentity"));
    }

    #[rstest]
    #[case("caf&eacute; &amp; cr&egrave;me")]
    #[case("&Aring;ngstr&ouml;m")]
    #[case("&#8211; &#x2014;")]
    fn test_ent2asc_idempotent(#[case] input: &str) {
        let table = UnicodeTable::builtin();
        let once = table.ent2asc(input).unwrap();
        assert_eq!(table.ent2asc(&once).unwrap(), once);
    }

    #[rstest]
    #[case("Ångström", "Angstrom")]
    #[case("Müller–Smith", "Muller-Smith")]
    #[case("Łódź", "Lodz")]
    #[case("straße", "strasse")]
    #[case("plain", "plain")]
    fn test_u2asc(#[case] input: &str, #[case] expected: &str) {
        let table = UnicodeTable::builtin();
        assert_eq!(table.u2asc(input).unwrap(), expected);
    }

    #[test]
    fn test_u2asc_unknown_character() {
        let table = UnicodeTable::builtin();
        let err = table.u2asc("kanji 漢").unwrap_err();
        assert!(matches!(err, UnicodeError::UnknownCharacter('漢')));
    }

    #[rstest]
    #[case(r#"Schr\"{o}dinger"#, "Schrodinger")]
    #[case(r#"Schr\"odinger"#, "Schrodinger")]
    #[case(r#"G{\"o}del"#, "Godel")]
    #[case(r"Garc\'{\i}a", "Garcia")]
    #[case(r"Wei{\ss}", "Weiss")]
    fn test_latex2asc(#[case] input: &str, #[case] expected: &str) {
        let table = UnicodeTable::builtin();
        assert_eq!(table.latex2asc(input), expected);
    }

    #[test]
    fn test_cleanall_never_fails_and_is_idempotent() {
        let table = UnicodeTable::builtin();
        let input = "漢 caf&eacute; &bogus; &amp;amp; Ünïcödé";
        let once = table.cleanall(input);
        assert!(once.is_ascii());
        assert_eq!(table.cleanall(&once), once);
        assert_eq!(once, " cafe  & Unicode");
    }

    #[test]
    fn test_to_ascii_falls_back() {
        let table = UnicodeTable::builtin();
        assert_eq!(table.to_ascii("caf&eacute;"), "cafe");
        assert_eq!(table.to_ascii("caf&eacute; &bogus;"), "cafe ");
    }

    #[test]
    fn test_from_reader_custom_table() {
        let data = "# test\n00E9;eacute;e;\\'{e}\n00E9;eacu;e;\n";
        let table = UnicodeTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.by_name("eacu").map(|c| c.code), Some(0xE9));
        assert_eq!(table.ent2asc("&eacu;").unwrap(), "e");
    }

    #[test]
    fn test_from_reader_rejects_bad_code() {
        let data = "zz;foo;f;\n";
        assert!(matches!(
            UnicodeTable::from_reader(data.as_bytes()),
            Err(UnicodeError::Table { .. })
        ));
    }
}
