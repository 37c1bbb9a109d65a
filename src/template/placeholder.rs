//! `{{ path }}` placeholder substitution over plain text.
//!
//! Tokens are found in a single left-to-right pass. A token is `{{`, then
//! everything up to the first `}`, which must be followed by a second `}`.
//! The inner text, trimmed, is a [`PathExpression`](super::path::PathExpression).
//! Tokens that do not resolve are kept verbatim so the output shows them.

use crate::template::data::DataTree;
use crate::template::error::ResolveError;
use crate::template::path;
use memchr::memchr;
use memchr::memmem::Finder;
use once_cell::sync::Lazy;

pub const OPEN: &str = "{{";

static OPEN_FINDER: Lazy<Finder<'static>> = Lazy::new(|| Finder::new(OPEN));

/// A token that was left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The token as written, delimiters included
    pub token: String,
    pub error: ResolveError,
}

/// Outcome of substituting one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub resolved: usize,
    pub unresolved: Vec<Unresolved>,
}

#[inline]
pub fn has_placeholder(text: &str) -> bool {
    OPEN_FINDER.find(text.as_bytes()).is_some()
}

/// Replace every resolvable token in `text` and clean control characters
/// from the result.
pub fn substitute(text: &str, data: &DataTree) -> Substitution {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut resolved = 0;
    let mut unresolved = Vec::new();
    let mut pos = 0;

    while let Some(found) = OPEN_FINDER.find(&bytes[pos..]) {
        let start = pos + found;
        let inner_start = start + OPEN.len();
        out.push_str(&text[pos..start]);

        let close = memchr(b'}', &bytes[inner_start..])
            .map(|off| inner_start + off)
            .filter(|&close| bytes.get(close + 1) == Some(&b'}'));

        let Some(close) = close else {
            // not a token here; rescan from the second brace
            out.push('{');
            pos = start + 1;
            continue;
        };

        let end = close + 2;
        let token = &text[start..end];
        match path::resolve(text[inner_start..close].trim(), data) {
            Ok(value) => {
                out.push_str(&value);
                resolved += 1;
            },
            Err(error) => {
                out.push_str(token);
                unresolved.push(Unresolved {
                    token: token.to_string(),
                    error,
                });
            },
        }
        pos = end;
    }
    out.push_str(&text[pos..]);

    Substitution {
        text: sanitize_control_chars(&out),
        resolved,
        unresolved,
    }
}

/// Vertical tab becomes `\n`; other C0 controls except tab, `\n` and `\r`
/// are dropped.
pub fn sanitize_control_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{0B}' => Some('\n'),
            '\u{00}'..='\u{08}' | '\u{0C}' | '\u{0E}'..='\u{1F}' => None,
            _ => Some(c),
        })
        .collect()
}
