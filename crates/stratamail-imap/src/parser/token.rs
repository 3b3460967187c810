//! Token tree produced by the list parser.

/// One node of a parsed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An atom or string; `None` is the protocol's `NIL`.
    Atom(Option<String>),
    /// A parenthesized list.
    List(TokenList),
}

impl Token {
    /// Returns the string value if this is a non-NIL atom.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Atom(Some(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this is a list.
    #[must_use]
    pub const fn as_list(&self) -> Option<&TokenList> {
        match self {
            Self::List(list) => Some(list),
            Self::Atom(_) => None,
        }
    }

    /// Returns true for `NIL`.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Atom(None))
    }
}

static EMPTY: TokenList = TokenList(Vec::new());

/// An ordered list of tokens.
///
/// Positional accessors never fail: an index that is out of range or holds
/// a token of another kind yields an empty string, an empty list or `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList(pub(crate) Vec<Token>);

impl TokenList {
    /// Returns a shared empty list.
    #[must_use]
    pub fn empty() -> &'static Self {
        &EMPTY
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the token at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.0.get(index)
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    /// Returns true if `index` holds a non-NIL atom.
    #[must_use]
    pub fn is_string_at(&self, index: usize) -> bool {
        self.get(index).and_then(Token::as_str).is_some()
    }

    /// Returns true if `index` holds `NIL`.
    #[must_use]
    pub fn is_nil_at(&self, index: usize) -> bool {
        self.get(index).is_some_and(Token::is_nil)
    }

    /// Returns true if `index` holds a list.
    #[must_use]
    pub fn is_list_at(&self, index: usize) -> bool {
        self.get(index).and_then(Token::as_list).is_some()
    }

    /// Returns the atom at `index`, or `""`.
    #[must_use]
    pub fn string_at(&self, index: usize) -> &str {
        self.opt_string_at(index).unwrap_or_default()
    }

    /// Returns the atom at `index`, or `None` for NIL, lists and gaps.
    #[must_use]
    pub fn opt_string_at(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Token::as_str)
    }

    /// Returns the list at `index`, or an empty list.
    #[must_use]
    pub fn list_at(&self, index: usize) -> &Self {
        self.get(index).and_then(Token::as_list).unwrap_or(&EMPTY)
    }

    /// Finds the first atom equal to `name`, ignoring ASCII case.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|t| t.as_str().is_some_and(|s| s.eq_ignore_ascii_case(name)))
    }

    /// Returns the element following the atom `name`.
    ///
    /// Named data items in a response are laid out as `NAME value`.
    #[must_use]
    pub fn value_after(&self, name: &str) -> Option<&Token> {
        self.get(self.index_of(name)? + 1)
    }

    /// Returns every non-NIL atom of the tree in order, depth first.
    #[must_use]
    pub fn atoms(&self) -> Vec<&str> {
        let mut atoms = Vec::new();
        collect_atoms(self, &mut atoms);
        atoms
    }
}

fn collect_atoms<'a>(list: &'a TokenList, out: &mut Vec<&'a str>) {
    for token in list.iter() {
        match token {
            Token::Atom(Some(s)) => out.push(s),
            Token::Atom(None) => {}
            Token::List(inner) => collect_atoms(inner, out),
        }
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
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

    fn atom(s: &str) -> Token {
        Token::Atom(Some(s.to_string()))
    }

    fn sample() -> TokenList {
        TokenList(vec![
            atom("UID"),
            atom("42"),
            Token::Atom(None),
            Token::List(TokenList(vec![atom("a"), atom("b")])),
        ])
    }

    #[test]
    fn test_empty_list_defaults() {
        let list = TokenList::default();
        assert!(list.is_empty());
        assert!(!list.is_string_at(0));
        assert!(!list.is_list_at(0));
        assert_eq!(list.string_at(0), "");
        assert!(list.list_at(0).is_empty());
    }

    #[test]
    fn test_type_mismatch_defaults() {
        let list = sample();
        assert_eq!(list.string_at(3), "");
        assert!(list.list_at(1).is_empty());
        assert!(!list.is_string_at(2));
        assert!(list.is_nil_at(2));
        assert_eq!(list.opt_string_at(2), None);
        assert_eq!(list.list_at(3).string_at(1), "b");
    }

    #[test]
    fn test_value_after() {
        let list = sample();
        assert_eq!(list.index_of("uid"), Some(0));
        assert_eq!(list.value_after("UID").and_then(Token::as_str), Some("42"));
        assert_eq!(list.value_after("b"), None);
        assert_eq!(list.index_of("ENVELOPE"), None);
    }

    #[test]
    fn test_atoms_flatten() {
        assert_eq!(sample().atoms(), vec!["UID", "42", "a", "b"]);
    }
}
