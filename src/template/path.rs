//! Path expressions into a [`DataTree`].
//!
//! ```text
//! path    := IDENT segment*
//! segment := "." IDENT | "[" DIGITS "]" | ".[" DIGITS "]"
//! ```
//!
//! An identifier is any run of characters other than `.`, `[`, `]`, `{`, `}`
//! and whitespace. `items[0].title` and `items.[0].title` are the same path.

use crate::template::data::DataTree;
use crate::template::error::ResolveError;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed path: a non-empty sequence of segments starting with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    segments: SmallVec<[Segment; 4]>,
}

#[inline]
fn is_ident_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']' | '{' | '}') && !c.is_whitespace()
}

impl PathExpression {
    pub fn parse(expr: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidPath(expr.to_string());
        let mut segments = SmallVec::new();
        let mut rest = expr;

        let (key, tail) = take_ident(rest).ok_or_else(invalid)?;
        segments.push(Segment::Key(key.to_string()));
        rest = tail;

        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix('.') {
                if tail.starts_with('[') {
                    rest = tail;
                    continue;
                }
                let (key, tail) = take_ident(tail).ok_or_else(invalid)?;
                segments.push(Segment::Key(key.to_string()));
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('[') {
                let close = tail.find(']').ok_or_else(invalid)?;
                let digits = &tail[..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let index = atoi_simd::parse::<u64, false, false>(digits.as_bytes())
                    .ok()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(invalid)?;
                segments.push(Segment::Index(index));
                rest = &tail[close + 1..];
            } else {
                return Err(invalid());
            }
        }

        Ok(Self { segments })
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the path from `root` to the value it names.
    pub fn lookup<'a>(&self, root: &'a DataTree) -> Result<&'a DataTree, ResolveError> {
        let mut current = root;
        for (depth, segment) in self.segments.iter().enumerate() {
            current = match segment {
                Segment::Key(key) => current.get(key).ok_or_else(|| ResolveError::PathNotFound {
                    path: self.prefix(depth + 1),
                    key: key.clone(),
                })?,
                Segment::Index(index) => current.index(*index).ok_or_else(|| ResolveError::IndexOutOfRange {
                    path: self.prefix(depth + 1),
                    index: *index,
                })?,
            };
        }
        Ok(current)
    }

    /// Resolve to display text. Lists and mappings are not values.
    pub fn resolve(&self, root: &DataTree) -> Result<String, ResolveError> {
        self.lookup(root)?
            .render()
            .ok_or_else(|| ResolveError::NotAScalar(self.to_string()))
    }

    /// The first `len` segments, written out.
    fn prefix(&self, len: usize) -> String {
        let mut out = String::new();
        write_segments(&self.segments[..len], &mut out);
        out
    }
}

/// Parse `expr` and resolve it against `root`.
pub fn resolve(expr: &str, root: &DataTree) -> Result<String, ResolveError> {
    PathExpression::parse(expr)?.resolve(root)
}

fn take_ident(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    if end == 0 { None } else { Some(s.split_at(end)) }
}

fn write_segments(segments: &[Segment], out: &mut String) {
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Key(key) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(key);
            },
            Segment::Index(index) => {
                out.push('[');
                out.push_str(itoa::Buffer::new().format(*index));
                out.push(']');
            },
        }
    }
}

impl FromStr for PathExpression {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_segments(&self.segments, &mut out);
        f.write_str(&out)
    }
}
