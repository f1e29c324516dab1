//! The formats the crate can read, by the names pipelines use for them.
//!
//! ```
//! use refparse::parsers::ReferenceParser;
//! use refparse::registry::{verify, Format};
//!
//! assert_eq!(verify("JATS"), Some(Format::Jats));
//! assert_eq!(verify("JATS").map(|f| f.name()), Some("JATS"));
//! assert_eq!(verify("BibTeX"), None);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::parsers::ReferenceParser;
use crate::parsers::agu::AguParser;
use crate::parsers::aip::AipParser;
use crate::parsers::aps::ApsParser;
use crate::parsers::crossref::CrossRefParser;
use crate::parsers::elsevier::ElsevierParser;
use crate::parsers::html::HtmlParser;
use crate::parsers::iop::IopParser;
use crate::parsers::jats::{JatsParser, NlmParser};
use crate::parsers::latex::LatexParser;
use crate::parsers::nature::NatureParser;
use crate::parsers::ocr::OcrParser;
use crate::parsers::springer::SpringerParser;
use crate::parsers::text::{ArxivParser, TextParser};
use crate::parsers::wiley::WileyParser;
use crate::reference::{ParseContext, Reference};
use crate::{ReferenceError, Result};

/// One variant per supported publisher or source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    CrossRef,
    Elsevier,
    Jats,
    Nlm,
    Iop,
    Springer,
    Aps,
    Nature,
    Aip,
    Wiley,
    Agu,
    Text,
    Arxiv,
    Ocr,
    Latex,
    Html,
}

/// Registered name of every format.
pub static FORMATS: [(&str, Format); 16] = [
    ("CrossRef", Format::CrossRef),
    ("ELSEVIER", Format::Elsevier),
    ("JATS", Format::Jats),
    ("NLM", Format::Nlm),
    ("IOP", Format::Iop),
    ("SPRINGER", Format::Springer),
    ("APS", Format::Aps),
    ("NATURE", Format::Nature),
    ("AIP", Format::Aip),
    ("WILEY", Format::Wiley),
    ("AGU", Format::Agu),
    ("ADStxt", Format::Text),
    ("arXiv", Format::Arxiv),
    ("ADSocr", Format::Ocr),
    ("ADStex", Format::Latex),
    ("ADShtml", Format::Html),
];

/// The format registered under `name`, or `None` for names the crate does
/// not know.
pub fn verify(name: &str) -> Option<Format> {
    FORMATS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, format)| *format)
}

impl Format {
    /// Whether the format is one of the publisher XML dialects.
    pub fn is_xml(self) -> bool {
        !matches!(
            self,
            Format::Text | Format::Arxiv | Format::Ocr | Format::Latex | Format::Html
        )
    }

    fn parser(self) -> &'static dyn ReferenceParser {
        match self {
            Format::CrossRef => &CrossRefParser,
            Format::Elsevier => &ElsevierParser,
            Format::Jats => &JatsParser,
            Format::Nlm => &NlmParser,
            Format::Iop => &IopParser,
            Format::Springer => &SpringerParser,
            Format::Aps => &ApsParser,
            Format::Nature => &NatureParser,
            Format::Aip => &AipParser,
            Format::Wiley => &WileyParser,
            Format::Agu => &AguParser,
            Format::Text => &TextParser,
            Format::Arxiv => &ArxivParser,
            Format::Ocr => &OcrParser,
            Format::Latex => &LatexParser,
            Format::Html => &HtmlParser,
        }
    }
}

impl ReferenceParser for Format {
    fn name(&self) -> &'static str {
        self.parser().name()
    }

    fn split(&self, block: &str) -> Vec<String> {
        self.parser().split(block)
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        self.parser().parse(fragment, ctx)
    }
}

impl FromStr for Format {
    type Err = ReferenceError;

    fn from_str(name: &str) -> Result<Self> {
        verify(name).ok_or_else(|| ReferenceError::UnknownParser(name.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[test]
    fn test_every_format_reports_its_registered_name() {
        for (name, format) in &FORMATS {
            assert_eq!(format.name(), *name);
            assert_eq!(verify(name), Some(*format));
        }
    }

    #[rstest]
    #[case("jats")]
    #[case("")]
    #[case("EndNote")]
    fn test_unknown_names(#[case] name: &str) {
        assert_eq!(verify(name), None);
        assert!(matches!(
            name.parse::<Format>(),
            Err(ReferenceError::UnknownParser(_))
        ));
    }

    #[rstest]
    #[case(Format::Springer, true)]
    #[case(Format::Latex, false)]
    #[case(Format::Ocr, false)]
    fn test_is_xml(#[case] format: Format, #[case] expected: bool) {
        assert_eq!(format.is_xml(), expected);
    }
}
