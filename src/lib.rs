//! Extraction of structured citation fields from publisher reference lists.
//!
//! `refparse` reads the raw reference sections that publishers deliver with
//! their articles and turns every citation into a flat record of
//! bibliographic fields, ready to be matched against a bibliographic
//! database. Sources are grouped by bibcode, the 19 character identifier of
//! the citing document.
//!
//! # Key Features
//!
//! - **Publisher XML**: CrossRef, Elsevier, JATS, NLM, IOP, Springer, APS,
//!   Nature, AIP, Wiley and AGU reference markup, read permissively since
//!   real deliveries are rarely well-formed.
//! - **Text sources**: plain text lists, arXiv full text, OCR output, LaTeX
//!   bibliographies and HTML pages.
//! - **Normalization**: entities and non-ASCII characters folded to ASCII,
//!   author lists in `Last, F.` form, DOI and arXiv identifiers cleaned,
//!   page qualifiers split off, roman volume numbers converted.
//! - **Fallbacks**: a reconstructed `refstr` when enough fields were found,
//!   the cleaned source text as `refplaintext` otherwise.
//!
//! # Basic Usage
//!
//! ```rust
//! use refparse::pipeline::Extractor;
//!
//! let source = r#"<ADSBIBCODE>2001AJ....121....1D</ADSBIBCODE>
//! <ref id="R1"><element-citation publication-type="journal">
//!   <person-group><name><surname>Smith</surname><given-names>J.</given-names></name></person-group>
//!   <source>ApJ</source><year>1999</year><volume>512</volume><fpage>L100</fpage>
//! </element-citation></ref>"#;
//!
//! let batches = Extractor::new().extract_buffer(source, "JATS").unwrap();
//! let reference = &batches[0].references[0];
//! assert_eq!(reference.get("authors"), Some("Smith, J."));
//! assert_eq!(reference.get("qualifier"), Some("L"));
//! assert_eq!(reference.get("refstr"), Some("Smith, J., 1999, ApJ, 512, L100"));
//! ```
//!
//! # Parsing Single Fragments
//!
//! ```rust
//! use refparse::parsers::ReferenceParser;
//! use refparse::reference::ParseContext;
//! use refparse::registry::verify;
//! use refparse::unicode::UnicodeTable;
//!
//! let format = verify("ADStxt").unwrap();
//! let mut ctx = ParseContext::new(UnicodeTable::builtin());
//! let parsed = format
//!     .parse_reference("Doe, A. 2001, AJ, 121, 5", &mut ctx)
//!     .unwrap();
//! assert_eq!(parsed.get("volume"), Some("121"));
//! ```
//!
//! # Error Handling
//!
//! Failures that concern a single reference or a single block are logged
//! through `tracing` and skipped by the [`pipeline`]; the crate installs no
//! subscriber. Errors surfaced to callers use [`ReferenceError`]:
//!
//! ```rust
//! use refparse::ReferenceError;
//! use refparse::pipeline::Extractor;
//!
//! match Extractor::new().extract_buffer("", "BibTeX") {
//!     Err(ReferenceError::UnknownParser(name)) => assert_eq!(name, "BibTeX"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! # Thread Safety
//!
//! Parsers are stateless unit structs and the Unicode table is immutable once
//! loaded. With the `parallel` feature, [`pipeline::ExtractorConfig`] can
//! process bibcode blocks and files on the `rayon` thread pool.

use thiserror::Error;

pub mod authors;
pub mod parsers;
pub mod pipeline;
pub mod reference;
mod regex;
pub mod registry;
pub mod split;
pub mod unicode;
pub mod utils;
pub mod xml;

// Reexports
pub use parsers::ReferenceParser;
pub use pipeline::{Extractor, ExtractorConfig, ReferenceBatch};
pub use reference::{ParseContext, ParsedReference, Reference};
pub use registry::{Format, verify};
pub use unicode::UnicodeTable;

/// A specialized Result type for reference parsing.
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Errors raised while reading references.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fragment error: {0}")]
    Fragment(#[from] xml::FragmentParseError),

    #[error("Unicode error: {0}")]
    Unicode(#[from] unicode::UnicodeError),

    #[error("Roman numeral error: {0}")]
    RomanNumeral(#[from] utils::RomanNumeralError),

    #[error("Unknown parser: {0}")]
    UnknownParser(String),

    #[error("Nothing could be read from the reference")]
    EmptyFragment,
}
