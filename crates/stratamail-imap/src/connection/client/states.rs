//! Type-state markers for client connection states.
//!
//! `Selected` is not a bare marker: it carries the snapshot of the mailbox
//! taken when it was selected.

use crate::types::Folder;

/// Connected, not yet logged in. Only LOGIN and AUTHENTICATE are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in. Mailbox listing and selection are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is selected. Message commands are valid.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) folder: Folder,
}

impl Selected {
    /// Creates the state for a freshly selected mailbox.
    #[must_use]
    pub const fn new(folder: Folder) -> Self {
        Self { folder }
    }

    /// The mailbox snapshot.
    #[must_use]
    pub const fn folder(&self) -> &Folder {
        &self.folder
    }
}
