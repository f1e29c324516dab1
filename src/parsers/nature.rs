//! Nature Publishing Group `<reftxt>` entries.

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_doi, match_year};

const SURNAME_TAGS: [&str; 1] = ["snm"];
const GIVEN_TAGS: [&str; 1] = ["fnm"];

#[derive(Debug, Clone, Copy, Default)]
pub struct NatureParser;

impl ReferenceParser for NatureParser {
    fn name(&self) -> &'static str {
        "NATURE"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "reftxt")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        let mut reference = if root.first("jtl").is_some() || root.first("refau").is_some() {
            Reference::default()
        } else {
            parse_text_reference(&root.text(), ctx)
        };

        let et_al = root.text().contains("et al");
        if let Some(authors) =
            collect_authors(root, "refau", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx)
        {
            reference.authors = Some(authors);
        }
        if let Some(title) = first_text(root, &["atl"], ctx) {
            reference.title = Some(title.trim_end_matches('.').to_string());
        }
        if let Some(journal) = first_text(root, &["jtl", "btl"], ctx) {
            reference.journal = Some(journal);
        }
        if let Some(volume) = first_text(root, &["vid"], ctx) {
            reference.volume = Some(volume);
        }
        let first_page = first_text(root, &["ppf"], ctx);
        let last_page = first_text(root, &["ppl"], ctx);
        if first_page.is_some() {
            set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        }
        let year = root.first("cd").and_then(|cd| {
            cd.attribute("year")
                .map(str::to_string)
                .or_else(|| first_text(root, &["cd"], ctx))
        });
        if let Some(year) = year {
            reference.year = match_year(&year);
        }
        if let Some(doi) = first_text(root, &["refdoi", "doi"], ctx) {
            reference.doi = match_doi(&doi).or(Some(doi));
        }
        Ok(reference)
    }
}
