//! Springer `<Citation>` entries.
//!
//! A citation holds at most one structured record, looked for in the order
//! `BibArticle`, `BibChapter`, `BibBook`, and usually a `BibUnstructured`
//! rendering of the same reference that is read when no structured record
//! is present.

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{
    ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair, text_of,
};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_doi, match_year};
use crate::xml::XmlElement;

const STRUCTURED_TAGS: [&str; 3] = ["BibArticle", "BibChapter", "BibBook"];
const SURNAME_TAGS: [&str; 1] = ["FamilyName"];
const GIVEN_TAGS: [&str; 1] = ["Initials"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SpringerParser;

impl ReferenceParser for SpringerParser {
    fn name(&self) -> &'static str {
        "SPRINGER"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "Citation")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();
        let label = first_text(root, &["CitationNumber"], ctx);

        let mut reference = match STRUCTURED_TAGS.iter().find_map(|tag| root.first(tag)) {
            Some(record) => structured(record, ctx),
            None => {
                let text = first_text(root, &["BibUnstructured"], ctx).unwrap_or_default();
                parse_text_reference(&text, ctx)
            }
        };
        reference.label = label;

        if reference.doi.is_none() {
            reference.doi = doi(root, ctx);
        }
        if reference.arxiv.is_none() {
            reference.arxiv = first_text(root, &["BibUnstructured"], ctx)
                .and_then(|text| match_arxiv_id(&text));
        }
        Ok(reference)
    }
}

fn structured(record: &XmlElement, ctx: &ParseContext) -> Reference {
    let et_al = record.first("Etal").is_some();
    let authors = collect_authors(record, "BibAuthorName", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx)
        .or_else(|| first_text(record, &["InstitutionalAuthorName"], ctx));

    let mut reference = Reference {
        authors,
        year: first_text(record, &["Year"], ctx).and_then(|year| match_year(&year)),
        volume: first_text(record, &["VolumeID"], ctx),
        issue: first_text(record, &["IssueID"], ctx),
        publisher: first_text(record, &["PublisherName"], ctx),
        editors: collect_authors(record, "BibEditorName", &SURNAME_TAGS, &GIVEN_TAGS, false, ctx),
        series: first_text(record, &["SeriesTitle"], ctx),
        ..Default::default()
    };

    match record.name.as_str() {
        "BibArticle" => {
            reference.journal = first_text(record, &["JournalTitle"], ctx);
            reference.title = first_text(record, &["ArticleTitle"], ctx);
        }
        "BibChapter" => {
            reference.journal = first_text(record, &["BookTitle"], ctx);
            reference.title = first_text(record, &["ChapterTitle"], ctx);
        }
        _ => reference.journal = first_text(record, &["BookTitle"], ctx),
    }

    let first_page = first_text(record, &["FirstPage"], ctx);
    let last_page = first_text(record, &["LastPage"], ctx);
    set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
    reference
}

/// DOI from an `Occurrence Type="DOI"` handle or an external link.
fn doi(root: &XmlElement, ctx: &ParseContext) -> Option<String> {
    root.first_with_attribute("Occurrence", "Type", "DOI")
        .and_then(|occurrence| text_of(occurrence.first("Handle"), ctx))
        .or_else(|| {
            root.first_with_attribute("RefTarget", "TargetType", "DOI")
                .and_then(|target| target.attribute("Address"))
                .map(str::to_string)
        })
        .and_then(|doi| match_doi(&doi).or(Some(doi)))
}
