//! Elsevier `ce:bib-reference` entries with their `sb:` structured part.

use tracing::debug;

use crate::Result;
use crate::parsers::text::parse_text_reference;
use crate::parsers::{ReferenceParser, collect_authors, first_text, parse_fragment, set_page_pair};
use crate::reference::{ParseContext, Reference};
use crate::split::get_xml_block;
use crate::utils::{is_roman, match_year, roman2int};
use crate::xml::XmlElement;

const SURNAME_TAGS: [&str; 1] = ["ce:surname"];
const GIVEN_TAGS: [&str; 2] = ["ce:given-name", "ce:initials"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ElsevierParser;

impl ElsevierParser {
    /// Volumes such as `XLII` are converted to arabic numerals.
    fn volume(host: &XmlElement, ctx: &ParseContext) -> Result<Option<String>> {
        let Some(volume) = first_text(host, &["sb:volume-nr"], ctx) else {
            return Ok(None);
        };
        if is_roman(&volume) {
            let arabic = roman2int(&volume)?;
            debug!(volume, arabic, "Converted roman volume");
            return Ok(Some(arabic.to_string()));
        }
        Ok(Some(volume))
    }
}

impl ReferenceParser for ElsevierParser {
    fn name(&self) -> &'static str {
        "ELSEVIER"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "ce:bib-reference")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let tree = parse_fragment(fragment)?;
        let root = tree.root();

        let Some(structured) = root.first("sb:reference") else {
            let text = first_text(root, &["ce:textref", "ce:other-ref"], ctx).unwrap_or_default();
            let mut reference = parse_text_reference(&text, ctx);
            reference.label = first_text(root, &["ce:label"], ctx);
            return Ok(reference);
        };

        let mut reference = Reference {
            label: first_text(root, &["ce:label"], ctx),
            ..Default::default()
        };

        if let Some(contribution) = structured.first("sb:contribution") {
            let et_al = contribution.first("sb:et-al").is_some();
            reference.authors = collect_authors(
                contribution,
                "sb:author",
                &SURNAME_TAGS,
                &GIVEN_TAGS,
                et_al,
                ctx,
            );
            reference.title = contribution
                .first("sb:title")
                .and_then(|title| first_text(title, &["sb:maintitle"], ctx));
        }

        if let Some(host) = structured.first("sb:host") {
            reference.journal = host
                .first("sb:series")
                .or_else(|| host.first("sb:edited-book"))
                .or_else(|| host.first("sb:book"))
                .and_then(|series| series.first("sb:title"))
                .and_then(|title| first_text(title, &["sb:maintitle"], ctx));
            reference.volume = Self::volume(host, ctx)?;
            reference.issue = first_text(host, &["sb:issue-nr"], ctx);
            reference.year = first_text(host, &["sb:date"], ctx).and_then(|date| match_year(&date));
            reference.publisher = first_text(host, &["sb:publisher"], ctx);

            let first_page = first_text(host, &["sb:first-page", "sb:article-number"], ctx);
            let last_page = first_text(host, &["sb:last-page"], ctx);
            set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
        }

        reference.doi = first_text(root, &["ce:doi"], ctx);
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceError;
    use crate::unicode::UnicodeTable;
    use pretty_assertions::assert_eq;

    const ARTICLE: &str = r#"<ce:bib-reference id="bib1"><ce:label>Smith et al., 1999</ce:label>
<sb:reference><sb:contribution langtype="en"><sb:authors>
<sb:author><ce:given-name>J.</ce:given-name><ce:surname>Smith</ce:surname></sb:author>
<sb:author><ce:given-name>K.</ce:given-name><ce:surname>M&uuml;ller</ce:surname></sb:author>
<sb:et-al/></sb:authors>
<sb:title><sb:maintitle>Dust in galaxies</sb:maintitle></sb:title></sb:contribution>
<sb:host><sb:issue><sb:series><sb:title><sb:maintitle>Icarus</sb:maintitle></sb:title>
<sb:volume-nr>XLII</sb:volume-nr></sb:series><sb:issue-nr>3</sb:issue-nr><sb:date>1999</sb:date></sb:issue>
<sb:pages><sb:first-page>100</sb:first-page><sb:last-page>110</sb:last-page></sb:pages></sb:host>
</sb:reference></ce:bib-reference>"#;

    #[test]
    fn test_structured_reference() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let parsed = ElsevierParser.parse_reference(ARTICLE, &mut ctx).unwrap();
        assert_eq!(parsed.get("authors"), Some("Smith, J., Muller, K., et al."));
        assert_eq!(parsed.get("title"), Some("Dust in galaxies"));
        assert_eq!(parsed.get("journal"), Some("Icarus"));
        assert_eq!(parsed.get("volume"), Some("42"));
        assert_eq!(parsed.get("issue"), Some("3"));
        assert_eq!(parsed.get("page"), Some("100"));
        assert_eq!(parsed.get("year"), Some("1999"));
        assert_eq!(
            parsed.get("refstr"),
            Some("Smith, J., Muller, K., et al., 1999, Icarus, 42, 100-110")
        );
    }

    #[test]
    fn test_other_ref() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let fragment = "<ce:bib-reference id=\"b2\"><ce:label>[2]</ce:label><ce:other-ref><ce:textref>Doe, A. 2001, AJ, 121, 5</ce:textref></ce:other-ref></ce:bib-reference>";
        let parsed = ElsevierParser.parse_reference(fragment, &mut ctx).unwrap();
        assert_eq!(parsed.get("journal"), Some("AJ"));
        assert_eq!(parsed.get("volume"), Some("121"));
    }

    #[test]
    fn test_out_of_range_roman_volume_is_an_error() {
        let mut ctx = ParseContext::new(UnicodeTable::builtin());
        let fragment = "<ce:bib-reference><sb:reference><sb:host><sb:issue><sb:series><sb:volume-nr>MMMMI</sb:volume-nr></sb:series></sb:issue></sb:host></sb:reference></ce:bib-reference>";
        assert!(matches!(
            ElsevierParser.parse(fragment, &mut ctx),
            Err(ReferenceError::RomanNumeral(_))
        ));
    }
}
