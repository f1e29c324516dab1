//! American Physical Society `<ref>` entries.
//!
//! Physical Review articles are paginated by electronic identifier, given in
//! `<eid>` rather than `<pages>`. References to several papers by the same
//! group often leave the journal out after the first; it is carried over
//! from the previous reference.

use tracing::debug;

use crate::Result;
use crate::authors::{format_authors, join_authors};
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, first_text, parse_fragment, set_pages, text_of};
use crate::reference::{ParseContext, Reference, field, is_physical_review};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_doi, match_year};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApsParser;

impl ReferenceParser for ApsParser {
    fn name(&self) -> &'static str {
        "APS"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "ref")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();
        let jcite = root.first("jcite");
        let cite = jcite.unwrap_or(root);
        let text = text_of(Some(cite), ctx).unwrap_or_default();

        let mut reference = if jcite.is_some() {
            Reference::default()
        } else {
            parse_text_reference(&text, ctx)
        };

        let names: Vec<String> = cite
            .get_elements_by_tag_name("refauth")
            .into_iter()
            .filter_map(|author| text_of(Some(author), ctx))
            .map(|author| format_authors(&author))
            .collect();
        if !names.is_empty() {
            let et_al = text.contains("et al");
            reference.authors = field(join_authors(names, et_al));
        }

        if let Some(year) = first_text(cite, &["year"], ctx) {
            reference.year = match_year(&year);
        }
        if let Some(volume) = first_text(cite, &["volume"], ctx) {
            reference.volume = Some(volume);
        }
        if let Some(issue) = first_text(cite, &["issue"], ctx) {
            reference.issue = Some(issue);
        }

        let journal = first_text(cite, &["jtitle"], ctx);
        if jcite.is_some() {
            reference.journal = journal.or_else(|| {
                let previous = ctx.previous_journal().map(str::to_string);
                debug!(journal = ?previous, "Journal missing, using the previous one");
                previous
            });
        }

        let eid = first_text(cite, &["eid"], ctx);
        let pages = first_text(cite, &["pages"], ctx);
        let phys_rev = reference.journal.as_deref().is_some_and(is_physical_review);
        match (eid, pages) {
            (Some(eid), _) if phys_rev => set_pages(&mut reference, &eid),
            (_, Some(pages)) => set_pages(&mut reference, &pages),
            (Some(eid), None) => set_pages(&mut reference, &eid),
            (None, None) => (),
        }

        if let Some(doi) = first_text(root, &["doi"], ctx) {
            reference.doi = match_doi(&doi).or(Some(doi));
        }
        if let Some(arxiv) =
            first_text(root, &["eprint", "arxiv"], ctx).and_then(|e| match_arxiv_id(&e))
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
    fn test_eid_is_the_page_for_physical_review() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let fragment = "<ref citid=\"c1\"><jcite><refauth>J. Smith</refauth> and <refauth>K. Jones</refauth>, <jtitle>Phys. Rev. D</jtitle> <volume>80</volume>, <pages>1</pages> <eid>123501</eid> (<year>2009</year>)</jcite></ref>";
        let parsed = ApsParser.parse_reference(fragment, &mut ctx).unwrap();
        assert_eq!(parsed.get("authors"), Some("Smith, J., Jones, K."));
        assert_eq!(parsed.get("journal"), Some("Phys. Rev. D"));
        assert_eq!(parsed.get("volume"), Some("80"));
        assert_eq!(parsed.get("page"), Some("123501"));
        assert_eq!(parsed.get("year"), Some("2009"));
    }

    #[test]
    fn test_missing_journal_is_carried_over() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        ApsParser
            .parse_reference(
                "<ref><jcite><refauth>A. Doe</refauth>, <jtitle>Phys. Rev. Lett.</jtitle> <volume>100</volume>, <pages>5</pages> (<year>2008</year>)</jcite></ref>",
                &mut ctx,
            )
            .unwrap();
        let second = ApsParser
            .parse_reference(
                "<ref><jcite><volume>101</volume>, <pages>7</pages> (<year>2008</year>)</jcite></ref>",
                &mut ctx,
            )
            .unwrap();
        assert_eq!(second.get("journal"), Some("Phys. Rev. Lett."));
        assert_eq!(second.get("refstr"), Some("2008, Phys. Rev. Lett., 101, 7"));
    }

    #[test]
    fn test_plain_reference() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let parsed = ApsParser
            .parse_reference("<ref citid=\"c9\">Brown, C. 2010, MNRAS, 401, 5</ref>", &mut ctx)
            .unwrap();
        assert_eq!(parsed.get("journal"), Some("MNRAS"));
    }
}
