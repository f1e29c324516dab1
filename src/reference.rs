//! The record every parser fills in, and the map it is exported as.

use std::sync::LazyLock;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::authors::is_author_placeholder;
use crate::regex::Regex;
use crate::unicode::UnicodeTable;
use crate::utils::{clean_doi, match_arxiv_id, squeeze, strip_tags};
use crate::{ReferenceError, Result};

static IBID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:ibid|ibidem|id)\s*\.?\s*$").unwrap());
static JCAP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:JCAP|J\.?\s*Cosmol(?:ogy)?\.?\s*Astropart(?:icle)?\.?\s*Phys(?:ics)?\.?|Journal of Cosmology and Astroparticle Physics)$")
        .unwrap()
});
static PHYS_REV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:Phys(?:ical)?\.?\s*Rev(?:iew)?\.?|PR[A-EJLX]?\b|PRL\b)").unwrap()
});

/// A citation as a parser sees it. Every field is optional; unset fields
/// are left out of the exported [`ParsedReference`], and so are
/// `page_last`, `label`, `publisher`, `editors` and `series`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub title: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    /// Last page of a range, only used in `refstr`.
    pub page_last: Option<String>,
    pub qualifier: Option<String>,
    pub year: Option<String>,
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub issn: Option<String>,
    pub label: Option<String>,
    pub publisher: Option<String>,
    pub editors: Option<String>,
    pub series: Option<String>,
    pub refstr: Option<String>,
    pub refplaintext: Option<String>,
}

type FieldGetter = fn(&Reference) -> Option<&str>;

/// Output name of each exported field, in output order.
pub static EXPORTED_FIELDS: [(&str, FieldGetter); 13] = [
    ("authors", |r| r.authors.as_deref()),
    ("journal", |r| r.journal.as_deref()),
    ("title", |r| r.title.as_deref()),
    ("volume", |r| r.volume.as_deref()),
    ("issue", |r| r.issue.as_deref()),
    ("page", |r| r.page.as_deref()),
    ("qualifier", |r| r.qualifier.as_deref()),
    ("year", |r| r.year.as_deref()),
    ("doi", |r| r.doi.as_deref()),
    ("eprint", |r| r.arxiv.as_deref()),
    ("issn", |r| r.issn.as_deref()),
    ("refstr", |r| r.refstr.as_deref()),
    ("refplaintext", |r| r.refplaintext.as_deref()),
];

/// Squeezed, non-empty text, or `None`.
pub(crate) fn field<S: AsRef<str>>(text: S) -> Option<String> {
    let text = squeeze(text.as_ref());
    (!text.is_empty()).then_some(text)
}

impl Reference {
    /// Whether enough was recovered to rebuild a citation string.
    pub fn has_enough(&self) -> bool {
        (self.year.is_some() && (self.volume.is_some() || self.page.is_some()))
            || self.doi.is_some()
            || self.arxiv.is_some()
    }

    /// Rebuild a plain citation from the structured fields:
    /// `authors, year, journal, volume, page, doi:..., arXiv:...`.
    pub fn build_refstr(&self) -> String {
        let page = self.page.as_deref().map(|page| {
            let mut page = match self.qualifier.as_deref() {
                Some(q @ ("L" | "A")) => format!("{q}{page}"),
                Some(q) => format!("{page}{q}"),
                None => page.to_string(),
            };
            if let Some(last) = &self.page_last {
                page.push('-');
                page.push_str(last);
            }
            page
        });
        let doi = self.doi.as_deref().map(|doi| format!("doi:{doi}"));
        let arxiv = self.arxiv.as_deref().map(|id| format!("arXiv:{id}"));

        [
            self.authors.clone(),
            self.year.clone(),
            self.journal.clone().or_else(|| self.title.clone()),
            self.volume.clone(),
            page,
            doi,
            arxiv,
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Normalize fields, carry context over from the previous reference and
    /// fill in `refstr` or `refplaintext`.
    ///
    /// `raw` is the fragment as it appeared in the source; it provides
    /// `refplaintext` when the structured fields are too thin.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::EmptyFragment`] when neither could be
    /// produced.
    pub fn finish(mut self, raw: &str, ctx: &mut ParseContext) -> Result<Reference> {
        self.authors = ctx.resolve_authors(self.authors.take());
        self.journal = ctx.resolve_journal(self.journal.take());

        self.doi = self.doi.as_deref().and_then(clean_doi);
        self.arxiv = self.arxiv.as_deref().and_then(match_arxiv_id);
        self.year = self.year.as_deref().and_then(field);
        if let (Some(journal), Some(issue)) = (&self.journal, &self.issue) {
            self.issue = Some(pad_jcap_issue(journal, issue));
        }

        if self.refstr.is_none() && self.has_enough() {
            self.refstr = field(self.build_refstr());
        }
        if self.refstr.is_none() && self.refplaintext.is_none() {
            self.refplaintext = field(ctx.to_ascii(&strip_tags(raw)));
        }
        if self.refstr.is_none() && self.refplaintext.is_none() {
            return Err(ReferenceError::EmptyFragment);
        }
        Ok(self)
    }

    /// Map the record through [`EXPORTED_FIELDS`], dropping unset fields.
    pub fn get_parsed_reference(&self) -> ParsedReference {
        let fields = EXPORTED_FIELDS
            .iter()
            .filter_map(|(name, get)| get(self).map(|value| (*name, value.to_string())))
            .collect();
        ParsedReference { fields }
    }
}

/// JCAP numbers its issues `01` to `12`.
pub fn pad_jcap_issue(journal: &str, issue: &str) -> String {
    let issue = issue.trim();
    if JCAP_REGEX.is_match(journal.trim())
        && issue.len() == 1
        && issue.chars().all(|c| c.is_ascii_digit())
    {
        format!("0{issue}")
    } else {
        issue.to_string()
    }
}

/// Physical Review journals number articles instead of pages.
pub fn is_physical_review(journal: &str) -> bool {
    PHYS_REV_REGEX.is_match(journal.trim())
}

/// Field name to value, in export order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReference {
    fields: Vec<(&'static str, String)>,
}

impl ParsedReference {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ParsedReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// State carried from one fragment to the next within a bibcode block.
///
/// Fragments of a block must be parsed in source order with the same
/// context: "same authors" dashes and `ibid.` journals refer back to the
/// previous reference.
#[derive(Debug, Clone)]
pub struct ParseContext<'u> {
    unicode: &'u UnicodeTable,
    prev_authors: Option<String>,
    prev_journal: Option<String>,
}

impl<'u> ParseContext<'u> {
    pub fn new(unicode: &'u UnicodeTable) -> Self {
        Self {
            unicode,
            prev_authors: None,
            prev_journal: None,
        }
    }

    pub fn unicode(&self) -> &'u UnicodeTable {
        self.unicode
    }

    /// Best-effort ASCII through the context's table.
    pub fn to_ascii(&self, text: &str) -> String {
        self.unicode.to_ascii(text)
    }

    /// The journal of the previous reference, if any.
    pub fn previous_journal(&self) -> Option<&str> {
        self.prev_journal.as_deref()
    }

    /// Replace a dash placeholder with the previous authors and remember the
    /// result for the next reference.
    pub fn resolve_authors(&mut self, authors: Option<String>) -> Option<String> {
        let authors = match authors {
            Some(a) if is_author_placeholder(&a) => {
                debug!(previous = ?self.prev_authors, "Reusing previous authors");
                self.prev_authors.clone()
            }
            other => other,
        };
        if authors.is_some() {
            self.prev_authors.clone_from(&authors);
        }
        authors
    }

    /// Replace an `ibid.` journal with the previous journal and remember the
    /// result for the next reference.
    pub fn resolve_journal(&mut self, journal: Option<String>) -> Option<String> {
        let journal = match journal {
            Some(j) if IBID_REGEX.is_match(&j) => {
                debug!(previous = ?self.prev_journal, "Resolving ibid. journal");
                self.prev_journal.clone()
            }
            other => other,
        };
        if journal.is_some() {
            self.prev_journal.clone_from(&journal);
        }
        journal
    }
}
