//! A small tree model for reference fragments.
//!
//! Publisher reference lists are rarely well-formed documents: a fragment may
//! have several top-level elements, bare `&` characters, entities that no XML
//! parser knows (`&eacute;`), stray closing tags or tags that are never
//! closed. [`XmlFragment::parse`] tolerates all of these and builds a tree of
//! [`XmlElement`]s under a synthetic root, reading events with `quick_xml`.
//!
//! Text nodes keep unknown entities verbatim so that the caller can resolve
//! them with a [`UnicodeTable`](crate::unicode::UnicodeTable).
//!
//! # Example
//!
//! ```
//! use refparse::xml::XmlFragment;
//!
//! let fragment =
//!     XmlFragment::parse(r#"<ref id="r1"><year>1993</year><source>ApJ &amp; AJ</source></ref>"#)
//!         .unwrap();
//! let root = fragment.root();
//! assert_eq!(root.first("year").unwrap().text(), "1993");
//! assert_eq!(root.first("ref").unwrap().attribute("id"), Some("r1"));
//! assert_eq!(root.first("source").unwrap().text(), "ApJ & AJ");
//! ```

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

use crate::regex::{Captures, Regex};

/// Stands in for bare `&` while the fragment goes through the XML reader.
const AMP_PLACEHOLDER: &str = "\u{E000}";

/// Name of the synthetic element wrapping every fragment.
pub const ROOT_NAME: &str = "#fragment";

const PREDEFINED_ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^<>]*)>").unwrap());
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The fragment could not be turned into a tree at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot parse reference fragment: {message}")]
pub struct FragmentParseError {
    pub message: String,
}

impl FragmentParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed fragment: a synthetic root holding whatever the source contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlFragment {
    root: XmlElement,
}

impl XmlFragment {
    /// Parse a fragment permissively.
    ///
    /// Bare `&` is protected before parsing, whitespace inside tags is
    /// collapsed, unmatched closing tags are ignored and elements still open
    /// at the end of input are closed implicitly. Only errors the reader
    /// cannot recover from (an unterminated tag or comment, for example)
    /// produce a [`FragmentParseError`].
    pub fn parse(text: &str) -> Result<Self, FragmentParseError> {
        let prepared = prepare(text);
        let mut reader = Reader::from_str(&prepared);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.expand_empty_elements = false;

        let mut stack = vec![XmlElement {
            name: ROOT_NAME.to_string(),
            ..Default::default()
        }];

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(element_from(e)?),
                Ok(Event::Empty(ref e)) => {
                    let element = element_from(e)?;
                    push_child(&mut stack, XmlNode::Element(element));
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    close_element(&mut stack, &name);
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| FragmentParseError::new(format!("invalid text: {err}")))?;
                    push_text(&mut stack, &restore(&text));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_text(&mut stack, &restore(&text));
                }
                Ok(Event::Eof) => break,
                Ok(_) => (),
                Err(e) => {
                    return Err(FragmentParseError::new(format!(
                        "{e} at position {}",
                        reader.error_position()
                    )));
                }
            }
        }

        while stack.len() > 1 {
            if let Some(open) = stack.pop() {
                push_child(&mut stack, XmlNode::Element(open));
            }
        }
        let root = stack.pop().unwrap_or_default();
        Ok(Self { root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Serialize the fragment content (without the synthetic root).
    pub fn to_xml(&self) -> String {
        self.root.inner_xml()
    }
}

impl XmlElement {
    /// All descendant elements called `name`, in document order.
    pub fn get_elements_by_tag_name(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// The first descendant element called `name`.
    pub fn first(&self, name: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.first(name) {
                return Some(found);
            }
        }
        None
    }

    /// The first descendant called `name` whose attribute `attr` equals `value`.
    pub fn first_with_attribute(&self, name: &str, attr: &str, value: &str) -> Option<&XmlElement> {
        self.get_elements_by_tag_name(name)
            .into_iter()
            .find(|e| e.attribute(attr).is_some_and(|v| v.eq_ignore_ascii_case(value)))
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => text.push_str(t),
                XmlNode::Element(e) => e.collect_text(text),
            }
        }
    }

    /// Text held directly by this element, ignoring child elements.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// The element with its tags, attributes and children.
    ///
    /// Text is written back as it was read apart from `<` and `>`, so
    /// entities the reader did not know survive the round trip.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    /// The children of the element, serialized.
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(&escape_text(t)),
                XmlNode::Element(e) => e.write_xml(&mut out),
            }
        }
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {key}=\"{}\"", value.replace('"', "&quot;")));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&self.inner_xml());
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Protect bare `&` and `<`, and collapse whitespace inside tags.
/// CDATA sections are passed through untouched.
fn prepare(text: &str) -> String {
    let mut prepared = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<![CDATA[") {
        prepared.push_str(&prepare_markup(&rest[..start]));
        let section = &rest[start..];
        match section.find("]]>") {
            Some(end) => {
                prepared.push_str(&section[..end + 3]);
                rest = &section[end + 3..];
            }
            None => {
                prepared.push_str(section);
                rest = "";
            }
        }
    }
    prepared.push_str(&prepare_markup(rest));
    prepared
}

fn prepare_markup(text: &str) -> String {
    let mut protected = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(['&', '<']) {
        protected.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with('&') {
            if PREDEFINED_ENTITIES.iter().any(|e| tail.starts_with(e)) {
                protected.push('&');
            } else {
                protected.push_str(AMP_PLACEHOLDER);
            }
        } else {
            // a `<` that cannot open markup is text (`a < b`, `<5 per cent`)
            let opens_markup = tail[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?' | '_'));
            protected.push_str(if opens_markup { "<" } else { "&lt;" });
        }
        rest = &tail[1..];
    }
    protected.push_str(rest);

    TAG_REGEX
        .replace_all(&protected, |caps: &Captures| {
            let inner = WHITESPACE_REGEX.replace_all(caps[1].trim(), " ");
            let inner = inner.replace(" =", "=").replace("= ", "=");
            format!("<{inner}>")
        })
        .into_owned()
}

fn restore(text: &str) -> String {
    text.replace(AMP_PLACEHOLDER, "&")
}

fn escape_text(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

fn element_from(e: &BytesStart) -> Result<XmlElement, FragmentParseError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr =
            attr.map_err(|err| FragmentParseError::new(format!("invalid attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| FragmentParseError::new(format!("invalid attribute value: {err}")))?;
        attributes.push((key, restore(&value)));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn push_child(stack: &mut [XmlElement], node: XmlNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        if let Some(XmlNode::Text(previous)) = top.children.last_mut() {
            previous.push_str(text);
        } else {
            top.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

/// Close the innermost open element called `name` (ignoring case), closing
/// anything opened inside it on the way.
///
/// A closing tag with no open counterpart closes the innermost element when
/// that element holds only text, as in `<year>1999</b>`; otherwise it is
/// dropped.
fn close_element(stack: &mut Vec<XmlElement>, name: &str) {
    let Some(depth) = stack
        .iter()
        .skip(1)
        .rposition(|e| e.name.eq_ignore_ascii_case(name))
    else {
        let text_only = stack.len() > 1
            && stack
                .last()
                .is_some_and(|top| top.children.iter().all(|c| matches!(c, XmlNode::Text(_))));
        if text_only {
            if let Some(open) = stack.pop() {
                push_child(stack, XmlNode::Element(open));
            }
        }
        return;
    };
    let target = depth + 1;
    while stack.len() > target {
        if let Some(open) = stack.pop() {
            push_child(stack, XmlNode::Element(open));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[test]
    fn test_parse_simple_fragment() {
        let fragment = XmlFragment::parse(
            r#"<citation key="b1"><author>Smith J</author><cYear>1993</cYear><volume>12</volume></citation>"#,
        )
        .unwrap();
        let root = fragment.root();
        assert_eq!(root.name, ROOT_NAME);
        let citation = root.first("citation").unwrap();
        assert_eq!(citation.attribute("key"), Some("b1"));
        assert_eq!(citation.first("cYear").unwrap().text(), "1993");
        assert_eq!(citation.elements().count(), 3);
    }

    #[test]
    fn test_multiple_roots_and_text() {
        let fragment = XmlFragment::parse("lead <a>one</a> middle <b>two</b> tail").unwrap();
        let root = fragment.root();
        assert_eq!(root.elements().count(), 2);
        assert_eq!(root.text(), "lead one middle two tail");
        assert_eq!(root.own_text(), "lead  middle  tail");
    }

    #[rstest]
    #[case("<a>R&D</a>", "R&D")]
    #[case("<a>Andr&eacute;</a>", "Andr&eacute;")]
    #[case("<a>A &amp; B</a>", "A & B")]
    #[case("<a>x &lt; y</a>", "x < y")]
    #[case("<a>x < 5</a>", "x < 5")]
    #[case("<a>&#233;</a>", "&#233;")]
    fn test_ampersands_and_brackets(#[case] input: &str, #[case] expected: &str) {
        let fragment = XmlFragment::parse(input).unwrap();
        assert_eq!(fragment.root().first("a").unwrap().text(), expected);
    }

    #[test]
    fn test_get_elements_by_tag_name_nested() {
        let fragment = XmlFragment::parse(
            "<authors><au><name>A</name></au><au><name>B</name></au></authors><name>C</name>",
        )
        .unwrap();
        let names: Vec<String> = fragment
            .root()
            .get_elements_by_tag_name("name")
            .into_iter()
            .map(|e| e.text())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let fragment = XmlFragment::parse("<ref><year>1999</b><vol>5</ref></i>").unwrap();
        let reference = fragment.root().first("ref").unwrap();
        assert_eq!(reference.first("year").unwrap().text(), "1999");
        assert_eq!(reference.first("vol").unwrap().text(), "5");
    }

    #[rstest]
    #[case("<ref><year>1999</Year><vol>5</vol></ref>")]
    #[case("<ref><YEAR>1999</year><vol>5</vol></ref>")]
    #[case("<ref><year>1999</yr><vol>5</vol></ref>")]
    fn test_mismatched_end_tag_closes_text_element(#[case] input: &str) {
        let fragment = XmlFragment::parse(input).unwrap();
        let reference = fragment.root().first("ref").unwrap();
        assert_eq!(reference.elements().count(), 2);
        assert_eq!(reference.elements().next().unwrap().text(), "1999");
        assert_eq!(reference.first("vol").unwrap().text(), "5");
    }

    #[test]
    fn test_stray_end_tag_keeps_element_with_children_open() {
        let fragment = XmlFragment::parse("<ref><au><sn>Smith</sn></x>, J.</au></ref>").unwrap();
        let author = fragment.root().first("au").unwrap();
        assert_eq!(author.text(), "Smith, J.");
    }

    #[test]
    fn test_whitespace_inside_tags() {
        let fragment =
            XmlFragment::parse("<pub-id\n   pub-id-type = \"doi\" >10.1/x</pub-id >").unwrap();
        let id = fragment.root().first("pub-id").unwrap();
        assert_eq!(id.attribute("pub-id-type"), Some("doi"));
        assert_eq!(id.text(), "10.1/x");
    }

    #[test]
    fn test_first_with_attribute() {
        let fragment = XmlFragment::parse(
            r#"<pub-id pub-id-type="pmid">123</pub-id><pub-id pub-id-type="DOI">10.1/y</pub-id>"#,
        )
        .unwrap();
        let doi = fragment
            .root()
            .first_with_attribute("pub-id", "pub-id-type", "doi")
            .unwrap();
        assert_eq!(doi.text(), "10.1/y");
    }

    #[test]
    fn test_to_xml_round_trip() {
        let input = r#"<ref id="r1"><label>1</label>Smith &amp; Jones<etal/></ref>"#;
        let fragment = XmlFragment::parse(input).unwrap();
        assert_eq!(
            fragment.to_xml(),
            r#"<ref id="r1"><label>1</label>Smith & Jones<etal/></ref>"#
        );
    }

    #[test]
    fn test_cdata() {
        let fragment = XmlFragment::parse("<a><![CDATA[x < y & z]]></a>").unwrap();
        assert_eq!(fragment.root().first("a").unwrap().text(), "x < y & z");
    }

    #[rstest]
    #[case("<ref><!-- never closed")]
    #[case("<ref><year")]
    fn test_unrecoverable_fragment(#[case] input: &str) {
        assert!(XmlFragment::parse(input).is_err());
    }
}
