//! CrossRef deposit citations (`<citation>`).

use crate::Result;
use crate::authors::format_authors;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, first_text, parse_fragment, set_page_pair};
use crate::reference::{ParseContext, Reference, field};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_year};

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossRefParser;

impl ReferenceParser for CrossRefParser {
    fn name(&self) -> &'static str {
        "CrossRef"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "citation")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        // a deposit may carry nothing but the unstructured text
        let mut reference = match first_text(root, &["unstructured_citation"], ctx) {
            Some(text) => parse_text_reference(&text, ctx),
            None => Reference::default(),
        };

        if let Some(author) = first_text(root, &["author"], ctx) {
            reference.authors = field(format_authors(&author));
        }
        if let Some(year) = first_text(root, &["cYear"], ctx) {
            reference.year = match_year(&year);
        }
        if let Some(journal) = first_text(root, &["journal_title", "series_title"], ctx) {
            reference.journal = Some(journal);
        }
        if let Some(title) = first_text(root, &["article_title", "volume_title"], ctx) {
            reference.title = Some(title);
        }
        if let Some(volume) = first_text(root, &["volume"], ctx) {
            reference.volume = Some(volume);
        }
        if let Some(issue) = first_text(root, &["issue"], ctx) {
            reference.issue = Some(issue);
        }
        let first_page = first_text(root, &["first_page"], ctx);
        let last_page = first_text(root, &["last_page"], ctx);
        set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        if let Some(doi) = first_text(root, &["doi"], ctx) {
            reference.doi = Some(doi);
        }
        if let Some(issn) = first_text(root, &["issn"], ctx) {
            reference.issn = Some(issn);
        }
        if reference.arxiv.is_none() {
            reference.arxiv =
                first_text(root, &["elocation_id"], ctx).and_then(|e| match_arxiv_id(&e));
        }
        Ok(reference)
    }
}
