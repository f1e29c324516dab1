//! LaTeX bibliographies (`ADStex`): `thebibliography` environments with
//! `\bibitem` entries and AASTeX `\reference` lists.

use std::sync::LazyLock;

use crate::Result;
use crate::parsers::ReferenceParser;
use crate::parsers::text::parse_text_reference;
use crate::reference::{ParseContext, Reference, field};
use crate::regex::{Captures, Regex};
use crate::split::split_text_references;
use crate::utils::squeeze;

static ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:bibitem|reference|refitem|item)\b\s*(?:\[[^\]]*\])?\s*(?:\{([^}]*)\})?").unwrap()
});
static MACRO_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)\b").unwrap());
static ENVIRONMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:begin|end)\s*\{thebibliography\}(?:\s*\{[^}]*\})?").unwrap()
});
static IDENTIFIER_COMMAND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(doi|eprint|arxiv|url|href)\s*\{([^}]*)\}(?:\s*\{[^}]*\})?").unwrap()
});
static STYLE_COMMAND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:textit|textbf|textrm|textsc|emph|mbox|hbox|bf|it|em|rm|sc|sl|tt|newblock|bibinfo\s*\{[^}]*\}|natexlab)\b\s*").unwrap()
});

/// AASTeX journal macros and what they stand for.
const JOURNAL_MACROS: [(&str, &str); 48] = [
    ("aj", "AJ"),
    ("actaa", "Acta Astron."),
    ("araa", "ARA&A"),
    ("apj", "ApJ"),
    ("apjl", "ApJ"),
    ("apjs", "ApJS"),
    ("ao", "Appl. Opt."),
    ("apss", "Ap&SS"),
    ("aap", "A&A"),
    ("aapr", "A&A Rev."),
    ("aaps", "A&AS"),
    ("azh", "AZh"),
    ("baas", "BAAS"),
    ("bac", "Bull. Astron. Inst. Czechoslovakia"),
    ("caa", "Chinese Astron. Astrophys."),
    ("cjaa", "Chinese J. Astron. Astrophys."),
    ("icarus", "Icarus"),
    ("jcap", "JCAP"),
    ("jrasc", "JRASC"),
    ("memras", "MmRAS"),
    ("mnras", "MNRAS"),
    ("na", "New A"),
    ("nar", "New A Rev."),
    ("pra", "Phys. Rev. A"),
    ("prb", "Phys. Rev. B"),
    ("prc", "Phys. Rev. C"),
    ("prd", "Phys. Rev. D"),
    ("pre", "Phys. Rev. E"),
    ("prl", "Phys. Rev. Lett."),
    ("pasa", "PASA"),
    ("pasp", "PASP"),
    ("pasj", "PASJ"),
    ("qjras", "QJRAS"),
    ("rmxaa", "Rev. Mexicana Astron. Astrofis."),
    ("skytel", "S&T"),
    ("solphys", "Sol. Phys."),
    ("sovast", "Soviet Ast."),
    ("ssr", "Space Sci. Rev."),
    ("zap", "ZAp"),
    ("nat", "Nature"),
    ("iaucirc", "IAU Circ."),
    ("aplett", "Astrophys. Lett."),
    ("apspr", "Astrophys. Space Phys. Res."),
    ("bain", "Bull. Astron. Inst. Netherlands"),
    ("fcp", "Fund. Cosmic Phys."),
    ("gca", "Geochim. Cosmochim. Acta"),
    ("grl", "Geophys. Res. Lett."),
    ("jgr", "J. Geophys. Res."),
];

/// Turn a LaTeX bibliography entry into plain text.
///
/// Journal macros are expanded, identifier commands become `doi:` and
/// `arXiv:` tokens, accents are folded through the Unicode table's LaTeX
/// column and the remaining markup is dropped.
pub fn clean_latex(text: &str, ctx: &ParseContext) -> String {
    let text = IDENTIFIER_COMMAND_REGEX.replace_all(text, |caps: &Captures| {
        let value = caps[2].trim();
        match &caps[1] {
            "doi" => format!(" doi:{value} "),
            "eprint" | "arxiv" => format!(" arXiv:{value} "),
            _ => format!(" {value} "),
        }
    });
    let text = STYLE_COMMAND_REGEX.replace_all(&text, "");
    let text = ctx.unicode().latex2asc(&text);
    let text = MACRO_REGEX.replace_all(&text, |caps: &Captures| {
        let name = &caps[1];
        match JOURNAL_MACROS.iter().find(|(macro_name, _)| *macro_name == name) {
            Some((_, journal)) => journal.to_string(),
            None => match name {
                "and" => " and ".to_string(),
                "etal" => " et al. ".to_string(),
                _ => String::new(),
            },
        }
    });

    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('&' | '%' | '_' | '#' | '$')) => plain.push(escaped),
                Some(',' | ';' | ' ') => plain.push(' '),
                Some(other) => plain.push(other),
                None => (),
            },
            '{' | '}' | '$' => (),
            '~' => plain.push(' '),
            '-' if chars.peek() == Some(&'-') => {
                while chars.peek() == Some(&'-') {
                    chars.next();
                }
                plain.push('-');
            }
            _ => plain.push(c),
        }
    }
    squeeze(&plain)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LatexParser;

impl ReferenceParser for LatexParser {
    fn name(&self) -> &'static str {
        "ADStex"
    }

    fn split(&self, block: &str) -> Vec<String> {
        let block = ENVIRONMENT_REGEX.replace_all(block, "\n");
        let starts: Vec<usize> = ITEM_REGEX.find_iter(&block).map(|m| m.start()).collect();
        if starts.is_empty() {
            return split_text_references(&block);
        }
        starts
            .iter()
            .enumerate()
            .map(|(i, start)| {
                let end = starts.get(i + 1).copied().unwrap_or(block.len());
                block[*start..end].trim().to_string()
            })
            .filter(|fragment| !fragment.is_empty())
            .collect()
    }

    fn parse(&self, fragment: &str, ctx: &mut ParseContext) -> Result<Reference> {
        let (label, body) = match ITEM_REGEX.captures(fragment) {
            Some(caps) => {
                let end = caps.get(0).map_or(0, |m| m.end());
                (caps.get(1).and_then(|m| field(m.as_str())), &fragment[end..])
            }
            None => (None, fragment),
        };
        let mut reference = parse_text_reference(&clean_latex(body, ctx), ctx);
        reference.label = label;
        Ok(reference)
    }
}
