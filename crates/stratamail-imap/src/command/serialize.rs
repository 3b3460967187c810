//! Command serialization helpers.

use super::types::FetchItem;

/// Writes an astring: bare when it is a plain atom, quoted otherwise.
pub fn write_astring(buf: &mut String, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.push_str(s);
    }
}

/// Writes a quoted string, escaping `"` and `\`.
pub fn write_quoted(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

/// Writes FETCH items, parenthesized unless there is exactly one.
pub fn write_fetch_items(buf: &mut String, items: &[FetchItem]) {
    if let [item] = items {
        buf.push_str(&item.to_string());
        return;
    }

    buf.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(' ');
        }
        buf.push_str(&item.to_string());
    }
    buf.push(')');
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn astring(s: &str) -> String {
        let mut buf = String::new();
        write_astring(&mut buf, s);
        buf
    }

    #[test]
    fn test_astring() {
        assert_eq!(astring("user"), "user");
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("two words"), "\"two words\"");
        assert_eq!(astring("pa\"ss\\"), "\"pa\\\"ss\\\\\"");
        assert_eq!(astring("Entwürfe"), "\"Entwürfe\"");
    }

    #[test]
    fn test_fetch_items() {
        let mut buf = String::new();
        write_fetch_items(&mut buf, &[FetchItem::Uid]);
        assert_eq!(buf, "UID");

        let mut buf = String::new();
        write_fetch_items(&mut buf, &[FetchItem::Uid, FetchItem::Flags]);
        assert_eq!(buf, "(UID FLAGS)");
    }
}
