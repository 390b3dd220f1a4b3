//! Template parsing for `{{ ... }}` expression tags.
//!
//! Splits a string into an ordered sequence of literal-text and expression
//! nodes. Parsing is purely syntactic: no variable lookups and no function
//! invocations happen here.
//!
//! Recognized tag forms:
//!
//! - `{{ name }}` - bare variable reference (an implicit lookup)
//! - `{{ name(args) }}` - function call with raw argument text
//! - `{{ $name arg1 arg2 }}` - function call, shorthand spelling
//!
//! Escaped braces (`\{{` and `\}}`) are literal text. Unbalanced or
//! malformed delimiters produce a parse failure carrying the offending
//! substring and its byte offset.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::RenderError;

/// Matches the `name(raw args)` call form. The `(?s)` flag lets raw
/// argument text span lines.
static CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_.\-]*)\((.*)\)$").expect("invalid call pattern")
});

/// Matches the `$name arg1 arg2` shorthand call form.
static SHORTHAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\$([A-Za-z_][A-Za-z0-9_.\-]*)(?:\s+(.*))?$").expect("invalid shorthand pattern")
});

/// Matches a bare variable reference.
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("invalid identifier pattern"));

/// An expression tag extracted from a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionTag {
    /// Function name, or variable name for bare references
    pub name: String,

    /// Raw argument text, empty for bare references
    pub raw_args: String,

    /// True for function calls, false for implicit variable lookups
    pub is_call: bool,

    /// Byte offset of the opening delimiter in the source string
    pub offset: usize,
}

/// One node of a parsed template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// A run of literal text outside any delimiter pair
    Literal(String),

    /// An expression between `{{` and `}}`
    Expression(ExpressionTag),
}

/// Fast check for whether a string can contain expression tags at all.
pub fn contains_tags(text: &str) -> bool {
    text.contains("{{")
}

/// Parses a string into an ordered sequence of template nodes.
///
/// # Errors
///
/// Returns [`RenderError::Parse`] for an unclosed `{{`, an empty tag, or
/// tag contents that match none of the recognized forms.
pub fn parse_template(text: &str) -> Result<Vec<TemplateNode>, RenderError> {
    let mut nodes = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        // Escaped braces are literal text.
        if rest.starts_with("\\{{") {
            literal.push_str("{{");
            i += 3;
            continue;
        }
        if rest.starts_with("\\}}") {
            literal.push_str("}}");
            i += 3;
            continue;
        }

        if rest.starts_with("{{") {
            let close = match rest[2..].find("}}") {
                Some(rel) => rel,
                None => {
                    return Err(RenderError::Parse {
                        fragment: rest.to_string(),
                        offset: i,
                    })
                }
            };

            if !literal.is_empty() {
                nodes.push(TemplateNode::Literal(std::mem::take(&mut literal)));
            }

            let inner = &rest[2..2 + close];
            nodes.push(TemplateNode::Expression(parse_tag(inner, i)?));
            i += 2 + close + 2;
            continue;
        }

        match rest.chars().next() {
            Some(ch) => {
                literal.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    if !literal.is_empty() {
        nodes.push(TemplateNode::Literal(literal));
    }

    Ok(nodes)
}

/// Parses the contents of one tag into an expression node.
fn parse_tag(inner: &str, offset: usize) -> Result<ExpressionTag, RenderError> {
    let trimmed = inner.trim();
    let malformed = || RenderError::Parse {
        fragment: format!("{{{{{}}}}}", inner),
        offset,
    };

    if trimmed.is_empty() {
        return Err(malformed());
    }

    if let Some(caps) = CALL_RE.captures(trimmed) {
        return Ok(ExpressionTag {
            name: caps[1].to_string(),
            raw_args: caps[2].trim().to_string(),
            is_call: true,
            offset,
        });
    }

    if let Some(caps) = SHORTHAND_RE.captures(trimmed) {
        let raw_args = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        return Ok(ExpressionTag {
            name: caps[1].to_string(),
            raw_args,
            is_call: true,
            offset,
        });
    }

    if IDENT_RE.is_match(trimmed) {
        return Ok(ExpressionTag {
            name: trimmed.to_string(),
            raw_args: String::new(),
            is_call: false,
            offset,
        });
    }

    Err(malformed())
}
