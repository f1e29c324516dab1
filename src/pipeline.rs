//! Batch driver: from source buffers and files to per-bibcode reference
//! batches.
//!
//! ## Usage
//!
//! ```rust
//! use refparse::pipeline::Extractor;
//!
//! let source = "%R 1999ApJ...512..100S\nSmith, J. 1998, ApJ, 500, 1\nDoe, A. 1997, AJ, 113, 5\n";
//! let batches = Extractor::new().extract_buffer(source, "ADStxt").unwrap();
//!
//! assert_eq!(batches.len(), 1);
//! assert_eq!(batches[0].bibcode, "1999ApJ...512..100S");
//! assert_eq!(batches[0].references.len(), 2);
//! assert_eq!(batches[0].references[1].get("journal"), Some("AJ"));
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use refparse::pipeline::{Extractor, ExtractorConfig};
//!
//! let config = ExtractorConfig {
//!     run_in_parallel: true,
//!     keep_empty_batches: false,
//!     ..Default::default()
//! };
//! let extractor = Extractor::new().with_config(config);
//! ```
//!
//! Blocks of different bibcodes are independent and may be processed in
//! parallel; the fragments of one block are always parsed in order, since
//! author dashes and `ibid.` refer back to the previous reference.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::Result;
use crate::parsers::ReferenceParser;
use crate::reference::{ParseContext, ParsedReference};
use crate::registry::Format;
use crate::split::{ReferenceBlock, split_bibcode_blocks};
use crate::unicode::UnicodeTable;

/// Options for the extraction run.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Process bibcode blocks and files in parallel. Only effective with the
    /// `parallel` feature.
    pub run_in_parallel: bool,
    /// Fragments shorter than this, once trimmed, are skipped.
    pub min_fragment_length: usize,
    /// Keep batches for bibcodes none of whose references survived.
    pub keep_empty_batches: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            min_fragment_length: 4,
            keep_empty_batches: true,
        }
    }
}

/// The references extracted for one bibcode, in source order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceBatch {
    pub bibcode: String,
    pub references: Vec<ParsedReference>,
}

/// Drives block splitting and per-format parsing.
#[derive(Debug, Clone)]
pub struct Extractor<'u> {
    config: ExtractorConfig,
    unicode: &'u UnicodeTable,
}

impl Default for Extractor<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor<'static> {
    /// An extractor with the default configuration and the built-in Unicode
    /// table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::default(),
            unicode: UnicodeTable::builtin(),
        }
    }
}

impl<'u> Extractor<'u> {
    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `table` instead of the built-in Unicode table.
    #[must_use]
    pub fn with_unicode_table<'t>(self, table: &'t UnicodeTable) -> Extractor<'t> {
        Extractor {
            config: self.config,
            unicode: table,
        }
    }

    /// Extract the references of every bibcode block in `buffer` with the
    /// parser registered as `parser`.
    ///
    /// A buffer without any bibcode marker yields no batches.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::UnknownParser`] when `parser` is not a
    /// registered format name.
    ///
    /// [`ReferenceError::UnknownParser`]: crate::ReferenceError::UnknownParser
    pub fn extract_buffer(&self, buffer: &str, parser: &str) -> Result<Vec<ReferenceBatch>> {
        let format: Format = parser.parse()?;
        Ok(self.extract_with(buffer, format))
    }

    /// Read `path` and extract its references.
    ///
    /// A file that cannot be read is logged and yields no batches.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::UnknownParser`] when `parser` is not a
    /// registered format name.
    ///
    /// [`ReferenceError::UnknownParser`]: crate::ReferenceError::UnknownParser
    pub fn extract_file<P: AsRef<Path>>(
        &self,
        path: P,
        parser: &str,
    ) -> Result<Vec<ReferenceBatch>> {
        let format: Format = parser.parse()?;
        Ok(self.extract_file_with(path.as_ref(), format))
    }

    /// Extract the references of several files, concatenated in the order
    /// of `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::UnknownParser`] when `parser` is not a
    /// registered format name.
    ///
    /// [`ReferenceError::UnknownParser`]: crate::ReferenceError::UnknownParser
    pub fn extract_files<P>(&self, paths: &[P], parser: &str) -> Result<Vec<ReferenceBatch>>
    where
        P: AsRef<Path> + Sync,
    {
        let format: Format = parser.parse()?;

        #[cfg(feature = "parallel")]
        if self.config.run_in_parallel {
            use rayon::prelude::*;

            let per_file: Vec<Vec<ReferenceBatch>> = paths
                .par_iter()
                .map(|path| self.extract_file_with(path.as_ref(), format))
                .collect();
            return Ok(per_file.into_iter().flatten().collect());
        }

        Ok(paths
            .iter()
            .flat_map(|path| self.extract_file_with(path.as_ref(), format))
            .collect())
    }

    /// Parse the fragments of one block in source order.
    ///
    /// Fragments that fail to parse are logged and dropped; the rest of the
    /// block is unaffected.
    pub fn parse_block(&self, format: Format, block: &ReferenceBlock) -> ReferenceBatch {
        let mut ctx = ParseContext::new(self.unicode);
        let mut references = Vec::with_capacity(block.fragments.len());

        for (index, fragment) in block.fragments.iter().enumerate() {
            if fragment.trim().chars().count() < self.config.min_fragment_length {
                continue;
            }
            match format.parse_reference(fragment, &mut ctx) {
                Ok(reference) => references.push(reference),
                Err(e) => error!(bibcode = %block.bibcode, index, error = %e, "Dropping reference"),
            }
        }

        debug!(
            bibcode = %block.bibcode,
            format = %format,
            fragments = block.fragments.len(),
            parsed = references.len(),
            "Parsed reference block"
        );
        ReferenceBatch {
            bibcode: block.bibcode.clone(),
            references,
        }
    }

    fn extract_with(&self, buffer: &str, format: Format) -> Vec<ReferenceBatch> {
        let blobs = split_bibcode_blocks(buffer);
        let process = |(bibcode, blob): &(String, String)| {
            let block = ReferenceBlock {
                bibcode: bibcode.clone(),
                fragments: format.split(blob),
            };
            self.parse_block(format, &block)
        };

        #[cfg(feature = "parallel")]
        let batches: Vec<ReferenceBatch> = if self.config.run_in_parallel {
            use rayon::prelude::*;

            blobs.par_iter().map(process).collect()
        } else {
            blobs.iter().map(process).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let batches: Vec<ReferenceBatch> = blobs.iter().map(process).collect();

        let total = batches.len();
        let batches: Vec<ReferenceBatch> = batches
            .into_iter()
            .filter(|batch| self.config.keep_empty_batches || !batch.references.is_empty())
            .collect();
        info!(
            blocks = total,
            kept = batches.len(),
            references = batches.iter().map(|b| b.references.len()).sum::<usize>(),
            "Extracted references"
        );
        batches
    }

    fn extract_file_with(&self, path: &Path, format: Format) -> Vec<ReferenceBatch> {
        match read_source(path) {
            Ok(buffer) => self.extract_with(&buffer, format),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Cannot read source file");
                Vec::new()
            }
        }
    }
}

/// Read a source file as UTF-8, falling back to ISO-8859-1 when it is not
/// valid UTF-8. Decoding never fails.
///
/// # Errors
///
/// Returns the I/O error when the file cannot be read.
pub fn read_source<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_source(bytes))
}

fn decode_source(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("Source is not UTF-8, reading it as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceError;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const TEXT_SOURCE: &str = "%R 2001AJ....121....1D\n\
Smith, J. 1999, ApJ, 512, 100\n\
--- 2000, ApJ, 530, 7\n\
%R 2002AJ....122....2X\n\
Brown, C. 2010, MNRAS, 401, 5\n";

    #[test]
    fn test_extract_text_buffer() {
        let batches = Extractor::new().extract_buffer(TEXT_SOURCE, "ADStxt").unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].bibcode, "2001AJ....121....1D");
        assert_eq!(batches[0].references.len(), 2);
        assert_eq!(batches[0].references[1].get("authors"), Some("Smith, J."));
        assert_eq!(batches[1].references[0].get("journal"), Some("MNRAS"));
    }

    #[test]
    fn test_unknown_parser() {
        assert!(matches!(
            Extractor::new().extract_buffer(TEXT_SOURCE, "BibTeX"),
            Err(ReferenceError::UnknownParser(name)) if name == "BibTeX"
        ));
    }

    #[test]
    fn test_no_marker_gives_no_batches() {
        let batches = Extractor::new()
            .extract_buffer("Smith, J. 1999, ApJ, 512, 100", "ADStxt")
            .unwrap();
        assert!(batches.is_empty());
    }

    #[rstest]
    #[case(true, 2)]
    #[case(false, 1)]
    fn test_keep_empty_batches(#[case] keep: bool, #[case] expected: usize) {
        let source = "<ADSBIBCODE>2001AJ....121....1D</ADSBIBCODE>\n<citation key=\"a\"><cYear>1999</cYear><volume>5</volume></citation>\n<ADSBIBCODE>2002AJ....122....2X</ADSBIBCODE>\n";
        let config = ExtractorConfig {
            keep_empty_batches: keep,
            ..Default::default()
        };
        let batches = Extractor::new()
            .with_config(config)
            .extract_buffer(source, "CrossRef")
            .unwrap();
        assert_eq!(batches.len(), expected);
    }

    #[test]
    fn test_broken_fragment_is_dropped() {
        let block = "<ref><element-citation><source>AJ</source><year>2001</year><volume>1</volume></element-citation></ref>\n<ref><!-- never closed\n<ref><element-citation><source>ApJ</source><year>2002</year><volume>2</volume></element-citation></ref>";
        let block = ReferenceBlock {
            bibcode: "2001AJ....121....1D".to_string(),
            fragments: Format::Jats.split(block),
        };
        assert_eq!(block.fragments.len(), 3);
        let batch = Extractor::new().parse_block(Format::Jats, &block);
        assert_eq!(batch.references.len(), 2);
        assert_eq!(batch.references[1].get("journal"), Some("ApJ"));
    }

    #[test]
    fn test_parallel_keeps_source_order() {
        let config = ExtractorConfig {
            run_in_parallel: true,
            ..Default::default()
        };
        let batches = Extractor::new()
            .with_config(config)
            .extract_buffer(TEXT_SOURCE, "ADStxt")
            .unwrap();
        let bibcodes: Vec<&str> = batches.iter().map(|b| b.bibcode.as_str()).collect();
        assert_eq!(bibcodes, vec!["2001AJ....121....1D", "2002AJ....122....2X"]);
    }

    #[test]
    fn test_latin1_fallback() {
        assert_eq!(decode_source(b"G\xf6del".to_vec()), "G\u{f6}del");
        assert_eq!(decode_source("Gödel".as_bytes().to_vec()), "Gödel");
    }

    #[test]
    fn test_missing_file_gives_no_batches() {
        let batches = Extractor::new()
            .extract_file("/nonexistent/refs.raw", "ADStxt")
            .unwrap();
        assert!(batches.is_empty());
    }
}
