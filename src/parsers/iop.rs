//! IOP Publishing `<reference>` entries.

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_year};

const SURNAME_TAGS: [&str; 1] = ["surname"];
const GIVEN_TAGS: [&str; 2] = ["first_names", "givenname"];

#[derive(Debug, Clone, Copy, Default)]
pub struct IopParser;

impl ReferenceParser for IopParser {
    fn name(&self) -> &'static str {
        "IOP"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "reference")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        let mut reference = match first_text(root, &["ref_journal", "ref_item_title"], ctx) {
            Some(_) => Reference::default(),
            None => parse_text_reference(
                &first_text(root, &["ref_misc", "reference"], ctx).unwrap_or_default(),
                ctx,
            ),
        };

        let et_al = root.first("ref_etal").is_some();
        if let Some(authors) =
            collect_authors(root, "author", &SURNAME_TAGS, &GIVEN_TAGS, et_al, ctx)
        {
            reference.authors = Some(authors);
        }
        if let Some(journal) = first_text(root, &["ref_journal"], ctx) {
            reference.journal = Some(journal);
        }
        if let Some(title) = first_text(root, &["ref_item_title"], ctx) {
            reference.title = Some(title);
        }
        if let Some(year) = first_text(root, &["ref_year"], ctx) {
            reference.year = match_year(&year);
        }
        if let Some(volume) = first_text(root, &["ref_volume"], ctx) {
            reference.volume = Some(volume);
        }
        if let Some(issue) = first_text(root, &["ref_issue"], ctx) {
            reference.issue = Some(issue);
        }
        let first_page = first_text(root, &["ref_start_page", "ref_article_number"], ctx);
        let last_page = first_text(root, &["ref_end_page"], ctx);
        if first_page.is_some() {
            set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        }
        if let Some(doi) = first_text(root, &["ref_doi"], ctx) {
            reference.doi = Some(doi);
        }
        if let Some(arxiv) =
            first_text(root, &["ref_preprint"], ctx).and_then(|p| match_arxiv_id(&p))
        {
            reference.arxiv = Some(arxiv);
        }
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::UnicodeTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_journal_reference() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let fragment = r#"<reference id="jcapaa1bib3"><ref_authors><author><surname>Planck</surname></author>
<author><surname>Ade</surname><first_names>P A R</first_names></author><ref_etal/></ref_authors>
<ref_year>2016</ref_year><ref_journal>JCAP</ref_journal><ref_volume>2016</ref_volume>
<ref_issue>3</ref_issue><ref_start_page>012</ref_start_page><ref_doi>10.1088/1475-7516/2016/03/012</ref_doi>
<ref_preprint>arXiv:1502.01589</ref_preprint></reference>"#;
        let parsed = IopParser.parse_reference(fragment, &mut ctx).unwrap();
        assert_eq!(parsed.get("authors"), Some("Planck, Ade, P A R, et al."));
        assert_eq!(parsed.get("journal"), Some("JCAP"));
        assert_eq!(parsed.get("issue"), Some("03"));
        assert_eq!(parsed.get("page"), Some("012"));
        assert_eq!(parsed.get("doi"), Some("10.1088/1475-7516/2016/03/012"));
        assert_eq!(parsed.get("eprint"), Some("1502.01589"));
    }

    #[test]
    fn test_misc_reference() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let fragment = "<reference id=\"b7\"><ref_misc>Brown, C. 2010, MNRAS, 401, 5</ref_misc></reference>";
        let parsed = IopParser.parse_reference(fragment, &mut ctx).unwrap();
        assert_eq!(parsed.get("authors"), Some("Brown, C."));
        assert_eq!(parsed.get("volume"), Some("401"));
    }
}
