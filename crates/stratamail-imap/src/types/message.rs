//! Messages built from FETCH responses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::address::Address;
use super::body_part::BodyPart;
use super::date::parse_envelope_date;
use crate::parser::{Token, TokenList};
use crate::{Error, Result};

/// Value of a fetch item the caller asked for by name, such as
/// `X-GM-LABELS` or `MODSEQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ExtensionValue {
    /// `NIL`.
    Nil,
    /// An atom or string, already decoded.
    Text(String),
    /// A parenthesized list.
    List(Vec<ExtensionValue>),
}

impl ExtensionValue {
    /// Converts a token tree into plain values.
    #[must_use]
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::Atom(None) => Self::Nil,
            Token::Atom(Some(text)) => Self::Text(text.clone()),
            Token::List(list) => Self::List(list.iter().map(Self::from_token).collect()),
        }
    }

    /// The text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The items, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A message summary from one `* n FETCH (...)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Message {
    /// Message sequence number.
    pub sequence_number: u32,
    /// Unique identifier.
    pub uid: u64,
    /// Envelope date, if present and parseable.
    pub timestamp: Option<DateTime<Utc>>,
    /// Decoded subject; empty when absent.
    pub subject: String,
    /// First address of the Sender field.
    pub sender: Option<Address>,
    /// First address of the From field.
    pub from: Option<Address>,
    /// First address of the Reply-To field.
    pub reply_to: Option<Address>,
    /// To recipients.
    pub to: Vec<Address>,
    /// Cc recipients.
    pub cc: Vec<Address>,
    /// Bcc recipients.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
    /// Flags, when FLAGS was fetched.
    pub flags: Vec<String>,
    /// Leaf body parts, when BODYSTRUCTURE was fetched.
    pub body_parts: Vec<BodyPart>,
    /// Requested extension items the server returned.
    pub extension_parameters: HashMap<String, ExtensionValue>,
}

impl Message {
    /// Builds a message from a parsed `* n FETCH (...)` line.
    ///
    /// Returns `Ok(None)` when the entry carries no UID, as servers send for
    /// unsolicited flag updates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the sequence number or UID is not a
    /// number.
    pub fn from_fetch(line: &TokenList, extension_names: &[&str]) -> Result<Option<Self>> {
        let sequence_number = line.string_at(1).parse::<u32>().map_err(|_| {
            Error::Parse(format!("invalid sequence number {:?}", line.string_at(1)))
        })?;
        let items = line.list_at(3);

        let Some(uid) = items.value_after("UID").and_then(Token::as_str) else {
            tracing::debug!(sequence_number, "FETCH entry without UID skipped");
            return Ok(None);
        };
        let uid = uid
            .parse::<u64>()
            .map_err(|_| Error::Parse(format!("invalid UID {uid:?}")))?;

        let mut message = Self {
            sequence_number,
            uid,
            ..Self::default()
        };

        if let Some(envelope) = items.value_after("ENVELOPE").and_then(Token::as_list) {
            message.apply_envelope(envelope);
        }

        if let Some(flags) = items.value_after("FLAGS").and_then(Token::as_list) {
            message.flags = flags
                .iter()
                .filter_map(Token::as_str)
                .map(ToString::to_string)
                .collect();
        }

        if let Some(structure) = items.value_after("BODYSTRUCTURE").and_then(Token::as_list)
            && !structure.is_empty()
        {
            message.body_parts = BodyPart::parse_structure(structure);
        }

        for name in extension_names {
            if let Some(value) = items.value_after(name) {
                message
                    .extension_parameters
                    .insert((*name).to_string(), ExtensionValue::from_token(value));
            }
        }

        Ok(Some(message))
    }

    fn apply_envelope(&mut self, envelope: &TokenList) {
        self.timestamp = envelope.opt_string_at(0).and_then(parse_envelope_date);
        self.subject = envelope.string_at(1).to_string();
        self.sender = first_address(envelope.list_at(2));
        self.from = first_address(envelope.list_at(3));
        self.reply_to = first_address(envelope.list_at(4));
        self.to = Address::list_from(envelope.list_at(5));
        self.cc = Address::list_from(envelope.list_at(6));
        self.bcc = Address::list_from(envelope.list_at(7));
        self.in_reply_to = envelope.opt_string_at(8).map(ToString::to_string);
        self.message_id = envelope.opt_string_at(9).map(ToString::to_string);
    }

    /// Whether the message carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// The body part with the given section path.
    #[must_use]
    pub fn body_part(&self, section: &str) -> Option<&BodyPart> {
        self.body_parts.iter().find(|p| p.section == section)
    }
}

fn first_address(list: &TokenList) -> Option<Address> {
    Address::list_from(list).into_iter().next()
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
    use chrono::TimeZone;

    use super::*;
    use crate::parser::parse;

    const NAME: &str = "=?utf-8?B?5YiY5YWL5bOw?=";

    fn gmail_fetch() -> String {
        let who = format!("((\"{NAME}\" NIL \"someuser\" \"someplace.com\"))");
        format!(
            "* 54 FETCH (X-GM-MSGID 1379514999738475089 UID 79 FLAGS () ENVELOPE \
             (\"Fri, 9 Sep 2011 15:38:52 -0700\" \"Simple message\" {who} {who} {who} \
             ((NIL NIL \"tyler.austen.test1\" \"gmail.com\")) NIL NIL NIL \
             \"<00a801cc6f41$408cd2f0$c1a678d0$@com>\") BODYSTRUCTURE \
             ((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"us-ascii\") NIL NIL \"7BIT\" 18 2 NIL NIL NIL)\
             (\"TEXT\" \"HTML\" (\"CHARSET\" \"us-ascii\") NIL NIL \"QUOTED-PRINTABLE\" 1657 47 NIL NIL NIL) \
             \"ALTERNATIVE\" (\"BOUNDARY\" \"----=_NextPart_000_00A9_01CC6F06.942DFAF0\") NIL NIL))"
        )
    }

    #[test]
    fn test_gmail_fetch_entry() {
        let line = parse(&gmail_fetch());
        let message = Message::from_fetch(&line, &["X-GM-MSGID"]).unwrap().unwrap();

        assert_eq!(message.sequence_number, 54);
        assert_eq!(message.uid, 79);
        assert_eq!(message.subject, "Simple message");
        assert_eq!(
            message.timestamp,
            Some(Utc.with_ymd_and_hms(2011, 9, 9, 22, 38, 52).unwrap())
        );

        let from = message.from.as_ref().unwrap();
        assert_eq!(from.display_name.as_deref(), Some("刘克峰"));
        assert_eq!(from.email(), "someuser@someplace.com");
        assert_eq!(message.sender, message.from);
        assert_eq!(message.to.len(), 1);
        assert_eq!(message.to[0].email(), "tyler.austen.test1@gmail.com");
        assert!(message.cc.is_empty());
        assert_eq!(message.in_reply_to, None);
        assert_eq!(
            message.message_id.as_deref(),
            Some("<00a801cc6f41$408cd2f0$c1a678d0$@com>")
        );
        assert!(message.flags.is_empty());

        assert_eq!(message.body_parts.len(), 2);
        assert_eq!(message.body_parts[0].section, "1");
        assert_eq!(message.body_parts[1].section, "2");
        assert_eq!(message.body_part("2").unwrap().encoding, "QUOTED-PRINTABLE");

        assert_eq!(
            message.extension_parameters.get("X-GM-MSGID"),
            Some(&ExtensionValue::Text("1379514999738475089".to_string()))
        );
    }

    #[test]
    fn test_extension_list_value() {
        let line = parse("* 3 FETCH (UID 10 X-GM-LABELS (\\Inbox \"Work stuff\" NIL))");
        let message = Message::from_fetch(&line, &["X-GM-LABELS", "MODSEQ"]).unwrap().unwrap();

        let labels = message.extension_parameters.get("X-GM-LABELS").unwrap();
        assert_eq!(
            labels.as_list().unwrap(),
            &[
                ExtensionValue::Text("\\Inbox".to_string()),
                ExtensionValue::Text("Work stuff".to_string()),
                ExtensionValue::Nil,
            ]
        );
        assert!(!message.extension_parameters.contains_key("MODSEQ"));
    }

    #[test]
    fn test_flags_and_missing_envelope() {
        let line = parse("* 7 FETCH (FLAGS (\\Seen \\Flagged) UID 1234)");
        let message = Message::from_fetch(&line, &[]).unwrap().unwrap();
        assert_eq!(message.uid, 1234);
        assert!(message.has_flag("\\seen"));
        assert!(message.has_flag("\\Flagged"));
        assert!(!message.has_flag("\\Deleted"));
        assert_eq!(message.subject, "");
        assert!(message.from.is_none());
        assert!(message.body_parts.is_empty());
    }

    #[test]
    fn test_entry_without_uid_skipped() {
        let line = parse("* 7 FETCH (FLAGS (\\Seen))");
        assert!(Message::from_fetch(&line, &[]).unwrap().is_none());
    }

    #[test]
    fn test_bad_numbers_are_parse_errors() {
        let line = parse("* x FETCH (UID 3)");
        assert!(matches!(Message::from_fetch(&line, &[]), Err(Error::Parse(_))));

        let line = parse("* 3 FETCH (UID abc)");
        assert!(matches!(Message::from_fetch(&line, &[]), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unparseable_date_leaves_timestamp_unset() {
        let line = parse(
            "* 1 FETCH (UID 5 ENVELOPE (\"sometime last week\" \"Hi\" NIL NIL NIL NIL NIL NIL NIL NIL))",
        );
        let message = Message::from_fetch(&line, &[]).unwrap().unwrap();
        assert_eq!(message.timestamp, None);
        assert_eq!(message.subject, "Hi");
    }
}
