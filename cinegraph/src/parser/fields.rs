//! Zero-copy field extraction.
//!
//! Every dataset line is addressed by column position. These helpers scan a
//! line once and hand back sub-slices of it, so a stage that only needs the
//! first and third column never allocates. Delimiters are single ASCII bytes,
//! which keeps byte offsets on UTF-8 character boundaries.

use std::borrow::Cow;

/// Tab delimiter used by the IMDb exports.
pub const TAB: u8 = b'\t';

/// Comma delimiter used by the MovieLens exports.
pub const COMMA: u8 = b',';

const QUOTE: u8 = b'"';

// =============================================================================
// Plain Fields
// =============================================================================

/// Return field `index` (0-based) of `line`.
///
/// The last field has no trailing delimiter. An index past the field count
/// yields `None`; a present but empty field yields `Some("")`.
pub fn field(line: &str, delim: u8, index: usize) -> Option<&str> {
    let [value] = fields(line, delim, [index]);
    value
}

/// Return several fields in one scan, aligned with `indices`.
///
/// Indices may be given in any order and may repeat.
pub fn fields<'a, const N: usize>(
    line: &'a str,
    delim: u8,
    indices: [usize; N],
) -> [Option<&'a str>; N] {
    let mut out = [None; N];
    let Some(&last_wanted) = indices.iter().max() else {
        return out;
    };

    let mut current = 0;
    let mut start = 0;
    for (pos, &byte) in line.as_bytes().iter().enumerate() {
        if byte != delim {
            continue;
        }
        assign(&mut out, &indices, current, &line[start..pos]);
        if current == last_wanted {
            return out;
        }
        current += 1;
        start = pos + 1;
    }
    assign(&mut out, &indices, current, &line[start..]);
    out
}

/// Split at the first delimiter: the key and the raw remainder.
pub fn split_once_field(line: &str, delim: u8) -> Option<(&str, &str)> {
    let pos = line.as_bytes().iter().position(|&b| b == delim)?;
    Some((&line[..pos], &line[pos + 1..]))
}

/// The text after the last delimiter, or `None` when the line has none.
pub fn last_field(line: &str, delim: u8) -> Option<&str> {
    let pos = line.as_bytes().iter().rposition(|&b| b == delim)?;
    Some(&line[pos + 1..])
}

fn assign<T: Clone, const N: usize>(
    out: &mut [Option<T>; N],
    indices: &[usize; N],
    current: usize,
    value: T,
) {
    for (slot, &wanted) in out.iter_mut().zip(indices) {
        if wanted == current {
            *slot = Some(value.clone());
        }
    }
}

// =============================================================================
// Quoted (CSV) Fields
// =============================================================================

/// Return field `index` of a comma-separated line that may contain quoted
/// fields.
pub fn quoted_field(line: &str, index: usize) -> Option<Cow<'_, str>> {
    let [value] = quoted_fields(line, [index]);
    value
}

/// Quote-aware variant of [`fields`] for comma-separated data.
///
/// Commas inside double quotes do not split, `""` inside quotes is an escaped
/// quote, and surrounding quotes are removed from the returned value.
pub fn quoted_fields<'a, const N: usize>(
    line: &'a str,
    indices: [usize; N],
) -> [Option<Cow<'a, str>>; N] {
    let mut out: [Option<Cow<'a, str>>; N] = std::array::from_fn(|_| None);
    let Some(&last_wanted) = indices.iter().max() else {
        return out;
    };

    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut current = 0;
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            QUOTE if in_quotes && bytes.get(pos + 1) == Some(&QUOTE) => pos += 1,
            QUOTE => in_quotes = !in_quotes,
            COMMA if !in_quotes => {
                assign(&mut out, &indices, current, unquote(&line[start..pos]));
                if current == last_wanted {
                    return out;
                }
                current += 1;
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    assign(&mut out, &indices, current, unquote(&line[start..]));
    out
}

/// Strip one pair of surrounding double quotes and collapse `""` escapes.
///
/// Unquoted input is returned borrowed and untouched.
pub fn unquote(raw: &str) -> Cow<'_, str> {
    let inner = match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner,
        None => return Cow::Borrowed(raw),
    };
    if inner.contains("\"\"") {
        Cow::Owned(inner.replace("\"\"", "\""))
    } else {
        Cow::Borrowed(inner)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIE_LINE: &str = "tt0000001\t1\tCarmencita\tUS\t\\N\timdbDisplay";

    #[test]
    fn test_field_by_index() {
        assert_eq!(field(MOVIE_LINE, TAB, 0), Some("tt0000001"));
        assert_eq!(field(MOVIE_LINE, TAB, 2), Some("Carmencita"));
        assert_eq!(field(MOVIE_LINE, TAB, 5), Some("imdbDisplay"));
        assert_eq!(field(MOVIE_LINE, TAB, 6), None);
    }

    #[test]
    fn test_field_empty_and_trailing() {
        assert_eq!(field("a\t\tc", TAB, 1), Some(""));
        assert_eq!(field("a\t", TAB, 1), Some(""));
        assert_eq!(field("", TAB, 0), Some(""));
        assert_eq!(field("", TAB, 1), None);
    }

    #[test]
    fn test_fields_any_order() {
        let [title, key, missing, region] = fields(MOVIE_LINE, TAB, [2, 0, 9, 3]);
        assert_eq!(title, Some("Carmencita"));
        assert_eq!(key, Some("tt0000001"));
        assert_eq!(missing, None);
        assert_eq!(region, Some("US"));
    }

    #[test]
    fn test_fields_multibyte_text() {
        let line = "tt0000002\t1\tLe clown et ses chiens é\tru";
        assert_eq!(field(line, TAB, 2), Some("Le clown et ses chiens é"));
        assert_eq!(field(line, TAB, 3), Some("ru"));
    }

    #[test]
    fn test_split_once_and_last_field() {
        assert_eq!(split_once_field("12,\"a, b\"", COMMA), Some(("12", "\"a, b\"")));
        assert_eq!(split_once_field("no-delimiter", COMMA), None);
        assert_eq!(last_field("1,2,0.75", COMMA), Some("0.75"));
        assert_eq!(last_field("0.75", COMMA), None);
    }

    #[test]
    fn test_quoted_fields_embedded_comma() {
        let line = "7,\"Crime, Drama\",0.9";
        let [code, name, score] = quoted_fields(line, [0, 1, 2]);
        assert_eq!(code.as_deref(), Some("7"));
        assert_eq!(name.as_deref(), Some("Crime, Drama"));
        assert_eq!(score.as_deref(), Some("0.9"));
        assert!(matches!(name, Some(Cow::Borrowed(_))));
    }

    #[test]
    fn test_quoted_field_escaped_quote() {
        let line = "3,\"the \"\"best\"\" one\"";
        let name = quoted_field(line, 1).unwrap();
        assert_eq!(name, "the \"best\" one");
        assert!(matches!(name, Cow::Owned(_)));
        assert_eq!(quoted_field(line, 2), None);
    }

    #[test]
    fn test_unquote_plain_text() {
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("\"open"), "\"open");
    }
}
