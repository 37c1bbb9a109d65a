//! Entity escaping for XML text and attribute values.
//!
//! Text and attribute values are kept in their escaped form inside
//! [`XmlElement`](super::XmlElement), so these helpers sit on the boundary
//! between the node tree and plain Rust strings.
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

const SPECIALS: [&str; 5] = ["&", "<", ">", "\"", "'"];
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

// Whitespace other than a space is normalized away in attribute values and
// `\r` in character data, unless written as a character reference.
const ATTR_SPECIALS: [&str; 8] = ["&", "<", ">", "\"", "'", "\n", "\r", "\t"];
const ATTR_ENTITIES: [&str; 8] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;", "&#10;", "&#13;", "&#9;"];
const TEXT_SPECIALS: [&str; 4] = ["&", "<", ">", "\r"];
const TEXT_ENTITIES: [&str; 4] = ["&amp;", "&lt;", "&gt;", "&#13;"];

static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(ATTR_SPECIALS)
        .expect("static escape patterns are valid")
});

static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(TEXT_SPECIALS)
        .expect("static escape patterns are valid")
});

// LeftmostLongest so `&amp;lt;` decodes to `&lt;` and not `<`.
static UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(ENTITIES)
        .expect("static unescape patterns are valid")
});

/// Escape a string for use inside a double-quoted attribute value.
///
/// ```
/// use deckstamp::common::xml::escape_attr;
/// assert_eq!(escape_attr(r#"a "b" & c"#), "a &quot;b&quot; &amp; c");
/// assert_eq!(escape_attr("a\tb\n"), "a&#9;b&#10;");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> String {
    ATTR_ESCAPER.replace_all(s, &ATTR_ENTITIES)
}

/// Escape a string for use as element character data.
///
/// Quotes are left alone, which keeps rewritten `<a:t>` content close to what
/// PowerPoint itself writes. A carriage return becomes `&#13;`.
///
/// ```
/// use deckstamp::common::xml::escape_text;
/// assert_eq!(escape_text("1 < 2 & \"x\""), "1 &lt; 2 &amp; \"x\"");
/// assert_eq!(escape_text("a\rb"), "a&#13;b");
/// ```
#[inline]
pub fn escape_text(s: &str) -> String {
    TEXT_ESCAPER.replace_all(s, &TEXT_ENTITIES)
}

/// Unescape the five predefined entities and numeric character references.
///
/// Unknown or malformed references are left unchanged.
///
/// ```
/// use deckstamp::common::xml::unescape;
/// assert_eq!(unescape("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape("&#x41;&#66;"), "AB");
/// assert_eq!(unescape("&invalid;"), "&invalid;");
/// ```
pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    if !s.contains("&#") {
        return UNESCAPER.replace_all(s, &SPECIALS);
    }
    unescape_with_char_refs(s)
}

fn unescape_with_char_refs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';').and_then(|end| decode_reference(&tail[1..end]).map(|c| (c, end + 1))) {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        },
    }
}
