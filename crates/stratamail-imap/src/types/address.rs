//! Envelope addresses.

use std::fmt;

use crate::parser::{Token, TokenList};

/// A mail address from an envelope address list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Address {
    /// Display name, already decoded.
    pub display_name: Option<String>,
    /// Local part.
    pub mailbox: String,
    /// Domain part.
    pub host: String,
}

impl Address {
    /// Builds an address from a `(name adl mailbox host)` tuple.
    ///
    /// The source route is ignored. Returns `None` if the mailbox or host is
    /// missing, which also skips group start and end markers.
    #[must_use]
    pub fn from_tuple(tuple: &TokenList) -> Option<Self> {
        let mailbox = tuple.opt_string_at(2).filter(|s| !s.is_empty())?;
        let host = tuple.opt_string_at(3).filter(|s| !s.is_empty())?;
        let display_name = tuple
            .opt_string_at(0)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        Some(Self {
            display_name,
            mailbox: mailbox.to_string(),
            host: host.to_string(),
        })
    }

    /// Builds every valid address of an envelope address list.
    #[must_use]
    pub fn list_from(list: &TokenList) -> Vec<Self> {
        list.iter()
            .filter_map(Token::as_list)
            .filter_map(Self::from_tuple)
            .collect()
    }

    /// Returns `mailbox@host`.
    #[must_use]
    pub fn email(&self) -> String {
        format!("{}@{}", self.mailbox, self.host)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => {
                let name = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{name}\" <{}@{}>", self.mailbox, self.host)
            }
            None => write!(f, "{}@{}", self.mailbox, self.host),
        }
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
    use crate::parser::parse;

    #[test]
    fn test_from_tuple() {
        let list = parse("(\"Jane Doe\" NIL \"jane\" \"example.com\")");
        let address = Address::from_tuple(list.list_at(0)).unwrap();
        assert_eq!(address.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(address.email(), "jane@example.com");
        assert_eq!(address.to_string(), "\"Jane Doe\" <jane@example.com>");
    }

    #[test]
    fn test_without_display_name() {
        let list = parse("(NIL NIL \"tyler.austen.test1\" \"gmail.com\")");
        let address = Address::from_tuple(list.list_at(0)).unwrap();
        assert_eq!(address.display_name, None);
        assert_eq!(address.to_string(), "tyler.austen.test1@gmail.com");
    }

    #[test]
    fn test_invalid_tuples_dropped() {
        let list = parse(
            "((\"A\" NIL \"a\" \"x.org\") (\"B\" NIL NIL \"x.org\") (\"C\" NIL \"c\" \"\") (NIL NIL \"group\" NIL) (\"D\" NIL \"d\" \"y.org\"))",
        );
        let addresses = Address::list_from(list.list_at(0));
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].email(), "a@x.org");
        assert_eq!(addresses[1].email(), "d@y.org");
    }

    #[test]
    fn test_nil_list_is_empty() {
        let list = parse("NIL");
        assert!(Address::list_from(list.list_at(0)).is_empty());
    }
}
