//! Fetch and store item definitions.

use std::fmt;

/// Which message summary items to fetch alongside the UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Request `ENVELOPE`.
    pub envelope: bool,
    /// Request `FLAGS`.
    pub flags: bool,
    /// Request `BODYSTRUCTURE`.
    pub body_structure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl FetchOptions {
    /// Envelope, flags and body structure.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            envelope: true,
            flags: true,
            body_structure: true,
        }
    }

    /// Only the UID.
    #[must_use]
    pub const fn uid_only() -> Self {
        Self {
            envelope: false,
            flags: false,
            body_structure: false,
        }
    }

    /// Expands the options into fetch items, UID first, then any extension
    /// names verbatim.
    #[must_use]
    pub fn items(self, extension_names: &[&str]) -> Vec<FetchItem> {
        let mut items = vec![FetchItem::Uid];
        if self.envelope {
            items.push(FetchItem::Envelope);
        }
        if self.flags {
            items.push(FetchItem::Flags);
        }
        if self.body_structure {
            items.push(FetchItem::BodyStructure);
        }
        items.extend(
            extension_names
                .iter()
                .map(|name| FetchItem::Named((*name).to_string())),
        );
        items
    }
}

/// A single FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `UID`.
    Uid,
    /// `ENVELOPE`.
    Envelope,
    /// `FLAGS`.
    Flags,
    /// `BODYSTRUCTURE`.
    BodyStructure,
    /// `BODY[section]` or `BODY.PEEK[section]`.
    Body {
        /// Section path; empty for the whole message.
        section: String,
        /// Leave `\Seen` untouched.
        peek: bool,
    },
    /// Any other item, such as `X-GM-MSGID`, sent verbatim.
    Named(String),
}

impl fmt::Display for FetchItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uid => f.write_str("UID"),
            Self::Envelope => f.write_str("ENVELOPE"),
            Self::Flags => f.write_str("FLAGS"),
            Self::BodyStructure => f.write_str("BODYSTRUCTURE"),
            Self::Body { section, peek } => {
                let body = if *peek { "BODY.PEEK" } else { "BODY" };
                write!(f, "{body}[{section}]")
            }
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// How a STORE changes the flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS`.
    Add,
    /// `-FLAGS`.
    Remove,
}

impl StoreAction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+FLAGS",
            Self::Remove => "-FLAGS",
        }
    }
}
