//! American Geophysical Union `<citation>` entries.

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_doi, match_year};

const SURNAME_TAGS: [&str; 1] = ["last_name"];
const GIVEN_TAGS: [&str; 2] = ["first_name", "initials"];

#[derive(Debug, Clone, Copy, Default)]
pub struct AguParser;

impl ReferenceParser for AguParser {
    fn name(&self) -> &'static str {
        "AGU"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "citation")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        if root.first("journal_title").is_none() && root.first("reftitle").is_none() {
            return Ok(parse_text_reference(&root.text(), ctx));
        }

        let et_al = root.first("etal").is_some();
        let mut reference = Reference {
            authors: collect_authors(root, "cauthor", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx),
            title: first_text(root, &["reftitle"], ctx),
            journal: first_text(root, &["journal_title", "book_title"], ctx),
            volume: first_text(root, &["volume"], ctx),
            issue: first_text(root, &["issue"], ctx),
            year: first_text(root, &["year"], ctx).and_then(|year| match_year(&year)),
            doi: first_text(root, &["doi"], ctx).map(|doi| match_doi(&doi).unwrap_or(doi)),
            ..Default::default()
        };
        let first_page = first_text(root, &["first_page", "article_number"], ctx);
        let last_page = first_text(root, &["last_page"], ctx);
        set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        Ok(reference)
    }
}
