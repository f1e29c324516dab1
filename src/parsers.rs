//! Per-format reference parsers.
//!
//! Each publisher format has a unit struct implementing [`ReferenceParser`].
//! A parser knows how to cut a bibcode block into fragments and how to read
//! the fields of one fragment; [`ReferenceParser::parse_reference`] ties the
//! two steps to the normalization in [`Reference::finish`].
//!
//! The XML parsers share the helpers in this module for reading element text
//! and person names. The plain text parsers share [`text::parse_text_reference`].

pub mod agu;
pub mod aip;
pub mod aps;
pub mod crossref;
pub mod elsevier;
pub mod html;
pub mod iop;
pub mod jats;
pub mod latex;
pub mod nature;
pub mod ocr;
pub mod springer;
pub mod text;
pub mod wiley;

use crate::Result;
use crate::authors::{join_authors, join_name};
use crate::reference::{ParseContext, ParsedReference, Reference, field};
use crate::utils::{parse_pages, split_page_range};
use crate::xml::{XmlElement, XmlFragment};

/// Trait for implementing reference parsers.
pub trait ReferenceParser {
    /// The name the format is registered under.
    fn name(&self) -> &'static str;

    /// Cut the text of one bibcode block into reference fragments, in
    /// source order.
    fn split(&self, block: &str) -> Vec<String>;

    /// Read the fields of one fragment.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` if the fragment cannot be read at all, e.g.
    /// when it is not even a malformed XML tree.
    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference>;

    /// Parse one fragment and export it.
    ///
    /// Fragments of a block must go through here in source order with a
    /// shared `ctx`.
    fn parse_reference(&self, fragment: &str, ctx: &mut ParseContext) -> Result<ParsedReference> {
        let reference = self.parse(fragment, ctx)?.finish(fragment, ctx)?;
        Ok(reference.get_parsed_reference())
    }
}

pub(crate) fn parse_fragment(fragment: &str) -> Result<XmlFragment> {
    Ok(XmlFragment::parse(fragment)?)
}

/// ASCII text of an element, or `None` when it is missing or blank.
pub(crate) fn text_of(element: Option<&XmlElement>, ctx: &ParseContext) -> Option<String> {
    element.and_then(|e| field(ctx.to_ascii(&e.text())))
}

/// Text of the first of `names` found under `root` with non-blank content.
pub(crate) fn first_text(root: &XmlElement, names: &[&str], ctx: &ParseContext) -> Option<String> {
    names.iter().find_map(|name| text_of(root.first(name), ctx))
}

/// `Surname, Given` from a person element with separate name parts, or the
/// element's whole text when none of the parts are present.
pub(crate) fn person_name(
    person: &XmlElement,
    surname_tags: &[&str],
    given_tags: &[&str],
    ctx: &ParseContext,
) -> Option<String> {
    let surname = first_text(person, surname_tags, ctx);
    let given = first_text(person, given_tags, ctx);
    match (surname, given) {
        (None, None) => text_of(Some(person), ctx),
        (surname, given) => field(join_name(
            surname.as_deref().unwrap_or_default(),
            given.as_deref().unwrap_or_default(),
        )),
    }
}

/// Authors from every `tag` element under `root`, joined in
/// `Last, F., Last2, O.` form.
pub(crate) fn collect_authors(
    root: &XmlElement,
    tag: &str,
    surname_tags: &[&str],
    given_tags: &[&str],
    et_al: bool,
    ctx: &ParseContext,
) -> Option<String> {
    let names: Vec<String> = root
        .get_elements_by_tag_name(tag)
        .into_iter()
        .filter_map(|person| person_name(person, surname_tags, given_tags, ctx))
        .collect();
    if names.is_empty() {
        return None;
    }
    field(join_authors(names, et_al))
}

/// Fill `page`, `qualifier` and `page_last` from a raw page or page range.
pub(crate) fn set_pages(reference: &mut Reference, raw: &str) {
    let (first, last) = split_page_range(raw);
    let (page, qualifier) = parse_pages(&first, "", "");
    if page.is_empty() {
        return;
    }
    reference.page = Some(page);
    reference.qualifier = qualifier.map(String::from);
    reference.page_last = last
        .map(|last| parse_pages(&last, "", "").0)
        .and_then(field);
}

/// Fill the pages from `first`, or `last` alone when only it is present.
pub(crate) fn set_page_pair(reference: &mut Reference, first: Option<&str>, last: Option<&str>) {
    match (first, last) {
        (Some(first), Some(last)) => set_pages(reference, &format!("{first}-{last}")),
        (Some(first), None) => set_pages(reference, first),
        _ => (),
    }
}
