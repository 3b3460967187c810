//! Mailbox state reported by SELECT and EXAMINE.

use crate::parser::{TokenList, parse};

/// Snapshot of a selected mailbox.
///
/// The snapshot is not updated by later untagged responses; select the
/// mailbox again for fresh counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Folder {
    /// Mailbox name as selected.
    pub name: String,
    /// Whether the server granted read-only access.
    pub read_only: bool,
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of messages with the `\Recent` flag.
    pub recent: u32,
    /// Predicted next UID, or `u64::MAX` if the server did not say.
    pub uid_next: u64,
    /// UID validity, or `u64::MAX` if the server did not say.
    pub uid_validity: u64,
    /// Flags defined in the mailbox.
    pub flags: Vec<String>,
    /// Flags the client can change permanently.
    pub permanent_flags: Vec<String>,
    /// Sequence number of the first unseen message.
    pub unseen: Option<u32>,
}

impl Folder {
    /// Builds the snapshot from the logical lines of a SELECT/EXAMINE
    /// response.
    #[must_use]
    pub fn from_lines(name: impl Into<String>, lines: &[String]) -> Self {
        let mut folder = Self {
            name: name.into(),
            read_only: false,
            exists: 0,
            recent: 0,
            uid_next: u64::MAX,
            uid_validity: u64::MAX,
            flags: Vec::new(),
            permanent_flags: Vec::new(),
            unseen: None,
        };

        for line in lines {
            let list = parse(line);
            if list.string_at(0) == "*" {
                folder.apply_untagged(&list);
            } else if list.index_of("[READ-ONLY]").is_some() {
                folder.read_only = true;
            }
        }

        folder
    }

    fn apply_untagged(&mut self, list: &TokenList) {
        if list.len() == 3 {
            if let Ok(count) = list.string_at(1).parse::<u32>() {
                let kind = list.string_at(2);
                if kind.eq_ignore_ascii_case("EXISTS") {
                    self.exists = count;
                } else if kind.eq_ignore_ascii_case("RECENT") {
                    self.recent = count;
                }
            }
        }

        if list.string_at(1).eq_ignore_ascii_case("FLAGS") {
            self.flags = string_atoms(list.list_at(2));
        }

        if let Some(uid_next) = response_code_number(list, "[UIDNEXT") {
            self.uid_next = uid_next;
        }
        if let Some(uid_validity) = response_code_number(list, "[UIDVALIDITY") {
            self.uid_validity = uid_validity;
        }
        if let Some(unseen) = response_code_number(list, "[UNSEEN") {
            self.unseen = u32::try_from(unseen).ok();
        }
        if let Some(index) = list.index_of("[PERMANENTFLAGS") {
            self.permanent_flags = string_atoms(list.list_at(index + 1));
        }
    }

    /// The next UID, if the server reported one.
    #[must_use]
    pub const fn known_uid_next(&self) -> Option<u64> {
        if self.uid_next == u64::MAX {
            None
        } else {
            Some(self.uid_next)
        }
    }

    /// The UID validity, if the server reported one.
    #[must_use]
    pub const fn known_uid_validity(&self) -> Option<u64> {
        if self.uid_validity == u64::MAX {
            None
        } else {
            Some(self.uid_validity)
        }
    }
}

/// Reads the number in `[CODE n]`, tokenized as `[CODE` and `n]`.
fn response_code_number(list: &TokenList, code: &str) -> Option<u64> {
    let index = list.index_of(code)?;
    list.string_at(index + 1).trim_end_matches(']').parse().ok()
}

fn string_atoms(list: &TokenList) -> Vec<String> {
    list.iter()
        .filter_map(|t| t.as_str())
        .map(ToString::to_string)
        .collect()
}

/// A mailbox returned by LIST or XLIST.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ListedFolder {
    /// Mailbox name.
    pub name: String,
    /// Name attributes such as `\HasNoChildren` or `\Sent`.
    pub flags: Vec<String>,
}

impl ListedFolder {
    /// Builds an entry from a `* LIST (flags) "delimiter" name` line.
    ///
    /// Returns `None` for lines that are not LIST or XLIST data.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let list = parse(line);
        let kind = list.string_at(1);
        let is_listing = kind.eq_ignore_ascii_case("LIST") || kind.eq_ignore_ascii_case("XLIST");
        if list.string_at(0) != "*" || !is_listing {
            return None;
        }

        Some(Self {
            name: list.string_at(4).to_string(),
            flags: string_atoms(list.list_at(2)),
        })
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

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_select_response() {
        let folder = Folder::from_lines(
            "INBOX",
            &lines(&[
                "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)",
                "* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited",
                "* 172 EXISTS",
                "* 1 RECENT",
                "* OK [UNSEEN 12] Message 12 is first unseen",
                "* OK [UIDVALIDITY 3857529045] UIDs valid",
                "* OK [UIDNEXT 4392] Predicted next UID",
                "3 OK [READ-WRITE] SELECT completed",
            ]),
        );

        assert_eq!(folder.name, "INBOX");
        assert!(!folder.read_only);
        assert_eq!(folder.exists, 172);
        assert_eq!(folder.recent, 1);
        assert_eq!(folder.uid_next, 4392);
        assert_eq!(folder.uid_validity, 3857529045);
        assert_eq!(folder.unseen, Some(12));
        assert_eq!(folder.flags.len(), 5);
        assert_eq!(folder.permanent_flags, vec!["\\Deleted", "\\Seen", "\\*"]);
    }

    #[test]
    fn test_read_only_and_missing_codes() {
        let folder = Folder::from_lines(
            "Archive",
            &lines(&["* 0 EXISTS", "4 OK [READ-ONLY] EXAMINE completed"]),
        );
        assert!(folder.read_only);
        assert_eq!(folder.exists, 0);
        assert_eq!(folder.uid_next, u64::MAX);
        assert_eq!(folder.known_uid_next(), None);
        assert_eq!(folder.known_uid_validity(), None);
    }

    #[test]
    fn test_untagged_read_only_ignored() {
        let folder = Folder::from_lines("X", &lines(&["* OK [READ-ONLY] odd", "5 OK done"]));
        assert!(!folder.read_only);
    }

    #[test]
    fn test_listed_folder() {
        let entry = ListedFolder::from_line("* LIST (\\HasNoChildren \\Sent) \"/\" \"Sent Items\"").unwrap();
        assert_eq!(entry.name, "Sent Items");
        assert_eq!(entry.flags, vec!["\\HasNoChildren", "\\Sent"]);

        let entry = ListedFolder::from_line("* XLIST (\\Inbox) \"/\" INBOX").unwrap();
        assert_eq!(entry.name, "INBOX");

        assert!(ListedFolder::from_line("7 OK LIST completed").is_none());
    }
}
