//! Parser for the parenthesized list syntax of IMAP responses.
//!
//! A logical response line such as
//! `* 3 FETCH (UID 7 FLAGS (\Seen) ENVELOPE ("date" "subject" ...))` is
//! turned into a [`TokenList`] tree. Atoms are decoded as they are built:
//! quoted strings lose their quotes and escapes, `NIL` becomes
//! `Token::Atom(None)`, and RFC 2047 encoded-words are decoded.
//!
//! # Example
//!
//! ```
//! use stratamail_imap::parser::parse;
//!
//! let list = parse("* 1 FETCH (UID 42 FLAGS (\\Seen))");
//! let items = list.list_at(3);
//! assert_eq!(items.value_after("UID").and_then(|t| t.as_str()), Some("42"));
//! assert_eq!(items.list_at(3).string_at(0), "\\Seen");
//! ```

mod token;

use std::str::Chars;

use stratamail_mime::decode_encoded_words;

pub use token::{Token, TokenList};

/// Parses one logical line into a token tree.
///
/// Parsing never fails. Unbalanced input simply ends the open lists, and an
/// unmatched `)` ends the top level.
#[must_use]
pub fn parse(line: &str) -> TokenList {
    parse_level(&mut line.chars())
}

/// Parses tokens up to the closing parenthesis of the current level.
fn parse_level(chars: &mut Chars<'_>) -> TokenList {
    let mut tokens = Vec::new();
    let mut atom = AtomBuffer::default();
    let mut quoted = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if escaped {
            if c != '"' && c != '\\' {
                atom.text.push('\\');
            }
            atom.text.push(c);
            escaped = false;
            continue;
        }

        match c {
            '\\' if quoted => escaped = true,
            '"' => {
                quoted = !quoted;
                atom.was_quoted = true;
            }
            ' ' if !quoted => atom.flush(&mut tokens),
            '(' if !quoted => {
                atom.flush(&mut tokens);
                tokens.push(Token::List(parse_level(chars)));
            }
            ')' if !quoted => break,
            _ => atom.text.push(c),
        }
    }

    atom.flush(&mut tokens);
    TokenList(tokens)
}

/// Characters of the atom currently being scanned.
#[derive(Default)]
struct AtomBuffer {
    text: String,
    was_quoted: bool,
}

impl AtomBuffer {
    fn flush(&mut self, tokens: &mut Vec<Token>) {
        if self.text.is_empty() && !self.was_quoted {
            return;
        }

        let text = std::mem::take(&mut self.text);
        let token = if !self.was_quoted && text == "NIL" {
            Token::Atom(None)
        } else {
            Token::Atom(Some(decode_encoded_words(&text)))
        };
        self.was_quoted = false;
        tokens.push(token);
    }
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
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        let list = parse("");
        assert!(list.is_empty());
        assert!(!list.is_string_at(0));
        assert!(!list.is_list_at(0));
    }

    #[test]
    fn test_nested_structure() {
        let list = parse("(0.0 0.1 (0.2.0 0.2.1) 0.3) 1 (2.0 2.1)");
        assert_eq!(list.len(), 3);
        assert!(list.is_list_at(0));
        assert!(list.is_string_at(1));
        assert_eq!(list.string_at(1), "1");
        assert!(list.is_list_at(2));

        let l0 = list.list_at(0);
        assert_eq!(l0.string_at(0), "0.0");
        assert_eq!(l0.string_at(1), "0.1");
        assert!(l0.is_list_at(2));
        assert_eq!(l0.string_at(3), "0.3");

        let l02 = l0.list_at(2);
        assert_eq!(l02.string_at(0), "0.2.0");
        assert_eq!(l02.string_at(1), "0.2.1");

        let l2 = list.list_at(2);
        assert_eq!(l2.string_at(0), "2.0");
        assert_eq!(l2.string_at(1), "2.1");
    }

    #[test]
    fn test_quoted_with_escaped_quotes() {
        let list = parse("\"Value with embedded \\\"quotes\\\" ..\"");
        assert_eq!(list.string_at(0), "Value with embedded \"quotes\" ..");
    }

    #[test]
    fn test_escaped_non_quote_keeps_backslash() {
        let list = parse("\"Value with escaped \\non quote char ..\"");
        assert_eq!(list.string_at(0), "Value with escaped \\non quote char ..");
    }

    #[test]
    fn test_escaped_backslashes() {
        let list = parse(
            "\"Some \\\\ backslashes \\\\\\\\\\\\ and explicit \\\\\\\" escape-like quote\"",
        );
        assert_eq!(
            list.string_at(0),
            "Some \\ backslashes \\\\\\ and explicit \\\" escape-like quote"
        );
    }

    #[test]
    fn test_nil_and_empty_string() {
        let list = parse("NIL \"\" \"NIL\" nil");
        assert_eq!(list.len(), 4);
        assert!(list.is_nil_at(0));
        assert_eq!(list.opt_string_at(1), Some(""));
        assert_eq!(list.opt_string_at(2), Some("NIL"));
        assert_eq!(list.opt_string_at(3), Some("nil"));
    }

    #[test]
    fn test_parens_inside_quotes() {
        let list = parse("(\"a (b\" \")c\") d");
        assert_eq!(list.list_at(0).string_at(0), "a (b");
        assert_eq!(list.list_at(0).string_at(1), ")c");
        assert_eq!(list.string_at(1), "d");
    }

    #[test]
    fn test_atom_before_paren_keeps_order() {
        let list = parse("BODY[HEADER.FIELDS (SUBJECT)] x");
        assert_eq!(list.string_at(0), "BODY[HEADER.FIELDS");
        assert_eq!(list.list_at(1).string_at(0), "SUBJECT");
        assert_eq!(list.string_at(2), "]");
        assert_eq!(list.string_at(3), "x");
    }

    #[test]
    fn test_unbalanced_input() {
        let list = parse("(a (b c");
        assert_eq!(list.list_at(0).string_at(0), "a");
        assert_eq!(list.list_at(0).list_at(1).string_at(1), "c");

        let list = parse("a) b");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_encoded_word_atoms_decoded() {
        let list = parse("(\"=?utf-8?B?5YiY5YWL5bOw?=\" NIL \"x\" \"y\")");
        assert_eq!(list.list_at(0).string_at(0), "刘克峰");
    }

    #[test]
    fn test_flags() {
        let list = parse("* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)");
        assert_eq!(list.string_at(1), "FLAGS");
        assert_eq!(list.list_at(2).atoms(), vec!["\\Answered", "\\Flagged", "\\Deleted", "\\Seen", "\\Draft"]);
    }

    #[derive(Debug, Clone)]
    enum Item {
        Bare(String),
        Quoted(String),
    }

    impl Item {
        fn render(&self) -> String {
            match self {
                Self::Bare(s) => s.clone(),
                Self::Quoted(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            }
        }

        fn value(&self) -> &str {
            match self {
                Self::Bare(s) | Self::Quoted(s) => s,
            }
        }
    }

    fn item() -> impl Strategy<Value = Item> {
        prop_oneof![
            "[a-z0-9.\\[\\]]{1,8}".prop_map(Item::Bare),
            "[a-z ()\\\\\"]{0,10}".prop_map(Item::Quoted),
        ]
    }

    proptest! {
        #[test]
        fn prop_flattened_atoms_match(items in proptest::collection::vec(item(), 0..10)) {
            let line = items.iter().map(Item::render).collect::<Vec<_>>().join(" ");
            let list = parse(&line);
            let expected: Vec<&str> = items.iter().map(Item::value).collect();
            prop_assert_eq!(list.atoms(), expected);
            prop_assert_eq!(list.len(), items.len());
        }

        #[test]
        fn prop_nested_list_preserves_atoms(items in proptest::collection::vec(item(), 0..6)) {
            let inner = items.iter().map(Item::render).collect::<Vec<_>>().join(" ");
            let list = parse(&format!("head ({inner}) tail"));
            prop_assert_eq!(list.len(), 3);
            let expected: Vec<&str> = items.iter().map(Item::value).collect();
            prop_assert_eq!(list.list_at(1).atoms(), expected);
        }
    }
}
