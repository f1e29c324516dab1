//! Wiley `<citation>` entries.

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{
    ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair, text_of,
};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_year};
use crate::xml::XmlElement;

const SURNAME_TAGS: [&str; 1] = ["familyName"];
const GIVEN_TAGS: [&str; 1] = ["givenNames"];
const DOI_PREFIX: &str = "info:doi/";
const ARXIV_PREFIX: &str = "info:arxiv/";

#[derive(Debug, Clone, Copy, Default)]
pub struct WileyParser;

impl ReferenceParser for WileyParser {
    fn name(&self) -> &'static str {
        "WILEY"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "citation")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();
        let citation = root.first("citation").unwrap_or(root);

        let structured = ["journalTitle", "bookTitle", "pubYear"]
            .iter()
            .any(|tag| citation.first(tag).is_some());
        let mut reference = if structured {
            Reference::default()
        } else {
            parse_text_reference(&citation.text(), ctx)
        };

        let et_al = citation.first("etal").is_some();
        let authors = collect_authors(citation, "author", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx)
            .or_else(|| first_text(citation, &["groupName"], ctx));
        if authors.is_some() {
            reference.authors = authors;
        }
        let year = citation.first("pubYear").and_then(|year| {
            year.attribute("year")
                .map(str::to_string)
                .or_else(|| text_of(Some(year), ctx))
        });
        if let Some(year) = year {
            reference.year = match_year(&year);
        }
        if let Some(journal) = first_text(citation, &["journalTitle", "bookTitle"], ctx) {
            reference.journal = Some(journal);
        }
        if let Some(title) = first_text(citation, &["articleTitle", "chapterTitle"], ctx) {
            reference.title = Some(title);
        }
        if let Some(volume) = first_text(citation, &["vol"], ctx) {
            reference.volume = Some(volume);
        }
        if let Some(issue) = first_text(citation, &["issue"], ctx) {
            reference.issue = Some(issue);
        }
        let first_page = first_text(citation, &["pageFirst"], ctx);
        let last_page = first_text(citation, &["pageLast"], ctx);
        if first_page.is_some() {
            set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        }
        reference.publisher = first_text(citation, &["publisherName"], ctx);
        if let Some(doi) = accession(citation, DOI_PREFIX) {
            reference.doi = Some(doi);
        }
        if let Some(arxiv) = accession(citation, ARXIV_PREFIX).and_then(|id| match_arxiv_id(&id)) {
            reference.arxiv = Some(arxiv);
        }
        Ok(reference)
    }
}

/// Identifier from `<accessionId ref="info:doi/10.xxxx/...">` and the like.
fn accession(citation: &XmlElement, prefix: &str) -> Option<String> {
    citation
        .get_elements_by_tag_name("accessionId")
        .into_iter()
        .filter_map(|id| id.attribute("ref"))
        .find_map(|reference| reference.strip_prefix(prefix))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}
