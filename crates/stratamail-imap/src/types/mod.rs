//! Records projected from parsed responses.
//!
//! Every builder here is a pure function of a [`TokenList`](crate::parser::TokenList)
//! or a slice of logical lines. Fields the server left out come back as
//! defaults instead of errors.

#![allow(clippy::missing_const_for_fn)]

mod address;
mod body_part;
mod date;
mod folder;
mod message;
mod sequence;

pub use address::Address;
pub use body_part::BodyPart;
pub use date::parse_envelope_date;
pub use folder::{Folder, ListedFolder};
pub use message::{ExtensionValue, Message};
pub use sequence::SequenceRange;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_sequence_range_display() {
        assert_eq!(SequenceRange::single(7).to_string(), "7");
        assert_eq!(SequenceRange::new(1, 10).to_string(), "1:10");
        assert_eq!(SequenceRange::all().to_string(), "1:*");
    }

    #[test]
    fn test_address_list_drops_incomplete() {
        let list = parse("((NIL NIL \"a\" \"x.org\") (NIL NIL NIL \"x.org\") (\"B\" NIL \"b\" \"\"))");
        let addresses = Address::list_from(list.list_at(0));
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].email(), "a@x.org");
    }
}
