//! American Institute of Physics `<ref>` entries.

use tracing::debug;

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, collect_authors, first_text, parse_fragment, set_pages};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_doi, match_year};

const SURNAME_TAGS: [&str; 1] = ["surname"];
const GIVEN_TAGS: [&str; 1] = ["given"];

#[derive(Debug, Clone, Copy, Default)]
pub struct AipParser;

impl ReferenceParser for AipParser {
    fn name(&self) -> &'static str {
        "AIP"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "ref")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        let Some(biblioref) = root.first("biblioref") else {
            let text = first_text(root, &["otherref", "ref"], ctx).unwrap_or_default();
            return Ok(parse_text_reference(&text, ctx));
        };

        let et_al = biblioref.first("etal").is_some();
        let mut reference = Reference {
            authors: collect_authors(biblioref, "name", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx),
            title: first_text(biblioref, &["atitle"], ctx),
            volume: first_text(biblioref, &["vol"], ctx),
            issue: first_text(biblioref, &["iss"], ctx),
            year: first_text(biblioref, &["yr"], ctx).and_then(|year| match_year(&year)),
            publisher: first_text(biblioref, &["pub"], ctx),
            ..Default::default()
        };

        // follow-up references to the same journal leave it out
        reference.journal = first_text(biblioref, &["jour", "btitle"], ctx).or_else(|| {
            let previous = ctx.previous_journal().map(str::to_string);
            debug!(journal = ?previous, "Journal missing, using the previous one");
            previous
        });
        if let Some(page) = first_text(biblioref, &["pg", "eid"], ctx) {
            set_pages(&mut reference, &page);
        }
        reference.doi =
            first_text(biblioref, &["doi"], ctx).map(|doi| match_doi(&doi).unwrap_or(doi));
        reference.arxiv = first_text(biblioref, &["eprint"], ctx).and_then(|e| match_arxiv_id(&e));
        Ok(reference)
    }
}
