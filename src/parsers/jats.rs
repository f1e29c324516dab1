//! JATS and NLM `<ref>` entries.
//!
//! Both tag sets wrap the citation in one of `mixed-citation`,
//! `element-citation`, `nlm-citation` or `citation`. Names come in several
//! dialects: `<name>` with `surname`/`given-names`, `<string-name>` holding
//! either parts or free text, and `<collab>` for collaborations, optionally
//! grouped in a `<person-group>`.

use tracing::warn;

use crate::Result;
use crate::authors::{format_authors, join_authors};
use crate::parsers::text::parse_text_reference;
use crate::parsers::{
    ReferenceParser, first_text, parse_fragment, person_name, set_page_pair, text_of,
};
use crate::reference::{ParseContext, Reference, field};
use crate::split::get_xml_block;
use crate::utils::{match_arxiv_id, match_doi, match_year};
use crate::xml::XmlElement;

const CITATION_TAGS: [&str; 4] = ["mixed-citation", "element-citation", "nlm-citation", "citation"];
const PUBLICATION_TYPES: [&str; 18] = [
    "journal",
    "book",
    "bookchapter",
    "confproc",
    "conf-proc",
    "conference",
    "thesis",
    "report",
    "preprint",
    "eprint",
    "web",
    "webpage",
    "patent",
    "data",
    "software",
    "standard",
    "commun",
    "other",
];
const SURNAME_TAGS: [&str; 1] = ["surname"];
const GIVEN_TAGS: [&str; 2] = ["given-names", "initials"];

/// JATS journal archiving tag set.
#[derive(Debug, Clone, Copy, Default)]
pub struct JatsParser;

/// The NLM tag set JATS grew out of.
#[derive(Debug, Clone, Copy, Default)]
pub struct NlmParser;

impl ReferenceParser for JatsParser {
    fn name(&self) -> &'static str {
        "JATS"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "ref")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        parse_ref(fragment, ctx)
    }
}

impl ReferenceParser for NlmParser {
    fn name(&self) -> &'static str {
        "NLM"
    }

    fn split(&self, block: &str) -> Vec<String> {
        get_xml_block(block, "ref")
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        parse_ref(fragment, ctx)
    }
}

fn parse_ref(fragment: &str, ctx: &ParseContext) -> Result<Reference> {
    let tree = parse_fragment(fragment)?;
    let root = tree.root();
    let citation = CITATION_TAGS
        .iter()
        .find_map(|tag| root.first(tag))
        .unwrap_or(root);

    let publication_type = citation
        .attribute("publication-type")
        .or_else(|| citation.attribute("citation-type"));
    if let Some(kind) = publication_type {
        if !PUBLICATION_TYPES.iter().any(|known| known.eq_ignore_ascii_case(kind)) {
            warn!(publication_type = kind, "Unknown publication type, reading it as a journal");
        }
    }

    let source = first_text(citation, &["source"], ctx);
    let title = first_text(citation, &["article-title", "chapter-title", "part-title"], ctx);
    let year = first_text(citation, &["year"], ctx).and_then(|year| match_year(&year));

    // mixed citations without markup carry everything in their text
    let mut reference = if source.is_none() && title.is_none() && year.is_none() {
        parse_text_reference(&citation.text(), ctx)
    } else {
        Reference::default()
    };

    if let Some(authors) = authors(citation, ctx) {
        reference.authors = Some(authors);
    }
    reference.label = first_text(root, &["label"], ctx);
    if source.is_some() {
        reference.journal = source;
    }
    if title.is_some() {
        reference.title = title;
    }
    if year.is_some() {
        reference.year = year;
    }
    if let Some(volume) = first_text(citation, &["volume"], ctx) {
        reference.volume = Some(volume);
    }
    if let Some(issue) = first_text(citation, &["issue"], ctx) {
        reference.issue = Some(issue);
    }
    let first_page = first_text(citation, &["fpage", "elocation-id"], ctx);
    let last_page = first_text(citation, &["lpage"], ctx);
    if first_page.is_some() {
        set_page_pair(&mut reference, first_page.as_deref(), last_page.as_deref());
    }
    if let Some(issn) = first_text(citation, &["issn"], ctx) {
        reference.issn = Some(issn);
    }
    reference.publisher = first_text(citation, &["publisher-name"], ctx);

    let doi = text_of(citation.first_with_attribute("pub-id", "pub-id-type", "doi"), ctx)
        .or_else(|| {
            text_of(citation.first_with_attribute("ext-link", "ext-link-type", "doi"), ctx)
        });
    if let Some(doi) = doi {
        reference.doi = match_doi(&doi).or(Some(doi));
    }
    let arxiv = text_of(citation.first_with_attribute("pub-id", "pub-id-type", "arxiv"), ctx)
        .or_else(|| first_text(citation, &["ext-link", "comment"], ctx))
        .and_then(|text| match_arxiv_id(&text));
    if arxiv.is_some() {
        reference.arxiv = arxiv;
    }
    Ok(reference)
}

/// Authors in document order from the author `person-group`, or from the
/// citation itself when names are not grouped.
fn authors(citation: &XmlElement, ctx: &ParseContext) -> Option<String> {
    let container = citation
        .first_with_attribute("person-group", "person-group-type", "author")
        .or_else(|| citation.first("person-group"))
        .unwrap_or(citation);

    let mut names = Vec::new();
    let mut et_al = false;
    for element in container.elements() {
        match element.name.as_str() {
            "name" => names.extend(person_name(element, &SURNAME_TAGS, &GIVEN_TAGS, ctx)),
            "string-name" => {
                let has_parts = element.first("surname").is_some();
                let name = if has_parts {
                    person_name(element, &SURNAME_TAGS, &GIVEN_TAGS, ctx)
                } else {
                    text_of(Some(element), ctx).and_then(|text| field(format_authors(&text)))
                };
                names.extend(name);
            }
            "collab" => names.extend(text_of(Some(element), ctx)),
            "etal" => et_al = true,
            _ => (),
        }
    }
    if names.is_empty() {
        return None;
    }
    field(join_authors(names, et_al))
}
