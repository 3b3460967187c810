//! IMAP command builder.
//!
//! Commands serialize to a single line without the trailing CRLF; the
//! transport appends it.

mod serialize;
mod tag_generator;
mod types;

use crate::types::SequenceRange;

pub use tag_generator::TagGenerator;
pub use types::{FetchItem, FetchOptions, StoreAction};

use serialize::{write_astring, write_fetch_items, write_quoted};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AUTHENTICATE command with a SASL initial response.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Initial response, already encoded by the caller.
        data: String,
    },
    /// LIST, or the XLIST extension.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
        /// Send XLIST instead of LIST.
        xlist: bool,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: String,
    },
    /// UNSELECT command.
    Unselect,
    /// FETCH command.
    Fetch {
        /// Messages to fetch.
        range: SequenceRange,
        /// Items to fetch.
        items: Vec<FetchItem>,
        /// Address messages by UID.
        uid: bool,
    },
    /// UID STORE command.
    Store {
        /// Messages to change.
        range: SequenceRange,
        /// Add or remove.
        action: StoreAction,
        /// Flag such as `\Deleted`.
        flag: String,
    },
    /// LOGOUT command.
    Logout,
    /// Anything else, sent verbatim after the tag.
    Raw(String),
}

impl Command {
    /// Serializes the command with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> String {
        let mut buf = String::with_capacity(64);
        buf.push_str(tag);
        buf.push(' ');

        match self {
            Self::Login { username, password } => {
                buf.push_str("LOGIN ");
                write_astring(&mut buf, username);
                buf.push(' ');
                write_astring(&mut buf, password);
            }

            Self::Authenticate { mechanism, data } => {
                buf.push_str("AUTHENTICATE ");
                buf.push_str(mechanism);
                buf.push(' ');
                buf.push_str(data);
            }

            Self::List {
                reference,
                pattern,
                xlist,
            } => {
                buf.push_str(if *xlist { "XLIST " } else { "LIST " });
                write_quoted(&mut buf, reference);
                buf.push(' ');
                write_quoted(&mut buf, pattern);
            }

            Self::Select { mailbox } => {
                buf.push_str("SELECT ");
                write_quoted(&mut buf, mailbox);
            }

            Self::Examine { mailbox } => {
                buf.push_str("EXAMINE ");
                write_quoted(&mut buf, mailbox);
            }

            Self::Unselect => buf.push_str("UNSELECT"),

            Self::Fetch { range, items, uid } => {
                if *uid {
                    buf.push_str("UID ");
                }
                buf.push_str("FETCH ");
                buf.push_str(&range.to_string());
                buf.push(' ');
                write_fetch_items(&mut buf, items);
            }

            Self::Store {
                range,
                action,
                flag,
            } => {
                buf.push_str("UID STORE ");
                buf.push_str(&range.to_string());
                buf.push(' ');
                buf.push_str(action.as_str());
                buf.push_str(" (");
                buf.push_str(flag);
                buf.push(')');
            }

            Self::Logout => buf.push_str("LOGOUT"),
            Self::Raw(text) => buf.push_str(text),
        }

        buf
    }

    /// The command word, safe to log.
    #[must_use]
    pub fn verb(&self) -> &str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::List { xlist: true, .. } => "XLIST",
            Self::List { xlist: false, .. } => "LIST",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Unselect => "UNSELECT",
            Self::Fetch { uid: true, .. } => "UID FETCH",
            Self::Fetch { uid: false, .. } => "FETCH",
            Self::Store { .. } => "UID STORE",
            Self::Logout => "LOGOUT",
            Self::Raw(text) => text.split(' ').next().unwrap_or_default(),
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

    #[test]
    fn test_login() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "secret pass".to_string(),
        };
        assert_eq!(cmd.serialize("0"), "0 LOGIN user@example.com \"secret pass\"");
        assert_eq!(cmd.verb(), "LOGIN");
    }

    #[test]
    fn test_authenticate() {
        let cmd = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            data: "dXNlcj1h".to_string(),
        };
        assert_eq!(cmd.serialize("3"), "3 AUTHENTICATE XOAUTH2 dXNlcj1h");
    }

    #[test]
    fn test_list_and_xlist() {
        let list = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
            xlist: false,
        };
        assert_eq!(list.serialize("1"), "1 LIST \"\" \"*\"");

        let xlist = Command::List {
            reference: String::new(),
            pattern: "%".to_string(),
            xlist: true,
        };
        assert_eq!(xlist.serialize("2"), "2 XLIST \"\" \"%\"");
        assert_eq!(xlist.verb(), "XLIST");
    }

    #[test]
    fn test_select_quotes_name() {
        let cmd = Command::Select {
            mailbox: "[Gmail]/All Mail".to_string(),
        };
        assert_eq!(cmd.serialize("4"), "4 SELECT \"[Gmail]/All Mail\"");

        let cmd = Command::Examine {
            mailbox: "a\"b".to_string(),
        };
        assert_eq!(cmd.serialize("5"), "5 EXAMINE \"a\\\"b\"");
    }

    #[test]
    fn test_fetch() {
        let cmd = Command::Fetch {
            range: SequenceRange::new(1, 100),
            items: FetchOptions::all().items(&["X-GM-MSGID"]),
            uid: true,
        };
        assert_eq!(
            cmd.serialize("6"),
            "6 UID FETCH 1:100 (UID ENVELOPE FLAGS BODYSTRUCTURE X-GM-MSGID)"
        );

        let cmd = Command::Fetch {
            range: SequenceRange::all(),
            items: FetchOptions::uid_only().items(&[]),
            uid: false,
        };
        assert_eq!(cmd.serialize("7"), "7 FETCH 1:* UID");
        assert_eq!(cmd.verb(), "FETCH");
    }

    #[test]
    fn test_fetch_section() {
        let cmd = Command::Fetch {
            range: SequenceRange::single(42),
            items: vec![FetchItem::Body {
                section: "1.2".to_string(),
                peek: true,
            }],
            uid: true,
        };
        assert_eq!(cmd.serialize("8"), "8 UID FETCH 42 BODY.PEEK[1.2]");
    }

    #[test]
    fn test_store() {
        let cmd = Command::Store {
            range: SequenceRange::new(5, 9),
            action: StoreAction::Add,
            flag: "\\Deleted".to_string(),
        };
        assert_eq!(cmd.serialize("9"), "9 UID STORE 5:9 +FLAGS (\\Deleted)");

        let cmd = Command::Store {
            range: SequenceRange::single(5),
            action: StoreAction::Remove,
            flag: "\\Seen".to_string(),
        };
        assert_eq!(cmd.serialize("10"), "10 UID STORE 5 -FLAGS (\\Seen)");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::Unselect.serialize("11"), "11 UNSELECT");
        assert_eq!(Command::Logout.serialize("12"), "12 LOGOUT");
        let raw = Command::Raw("NOOP".to_string());
        assert_eq!(raw.serialize("13"), "13 NOOP");
        assert_eq!(raw.verb(), "NOOP");
    }
}
