//! Implementation for the authenticated state.

use super::states::{Authenticated, Selected};
use super::{Client, accept_no};
use crate::Result;
use crate::command::Command;
use crate::connection::Transport;
use crate::types::{Folder, ListedFolder};

impl<T> Client<T, Authenticated>
where
    T: Transport,
{
    /// Lists mailbox names matching `pattern` under `reference`.
    ///
    /// A NO answer yields an empty list.
    pub async fn list_folders(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>> {
        let folders = self.list(reference, pattern, false).await?;
        Ok(folders.into_iter().map(|f| f.name).collect())
    }

    /// Lists mailboxes with their attributes, optionally through XLIST.
    ///
    /// A NO answer yields an empty list.
    pub async fn list_folders_with_flags(
        &mut self,
        reference: &str,
        pattern: &str,
        use_xlist: bool,
    ) -> Result<Vec<ListedFolder>> {
        self.list(reference, pattern, use_xlist).await
    }

    async fn list(&mut self, reference: &str, pattern: &str, xlist: bool) -> Result<Vec<ListedFolder>> {
        let response = self
            .send_receive(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
                xlist,
            })
            .await?;
        let Some(response) = accept_no(response)? else {
            return Ok(Vec::new());
        };

        Ok(response
            .inline_literals()
            .iter()
            .filter_map(|line| ListedFolder::from_line(line))
            .collect())
    }

    /// Selects a mailbox for reading and writing.
    pub async fn select(self, name: &str) -> Result<(Client<T, Selected>, Folder)> {
        self.open_folder(name, false).await
    }

    /// Selects a mailbox read-only.
    pub async fn examine(self, name: &str) -> Result<(Client<T, Selected>, Folder)> {
        self.open_folder(name, true).await
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
    use tokio_test::io::{Builder, Mock};

    use crate::Error;
    use crate::connection::{Authenticated, Client, DEFAULT_READ_TIMEOUT, FramedStream};

    async fn logged_in(builder: &mut Builder) -> Client<FramedStream<Mock>, Authenticated> {
        let mock = builder.build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();
        client.login("u", "p").await.unwrap()
    }

    fn session() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"0 LOGIN u p\r\n")
            .read(b"0 OK done\r\n");
        builder
    }

    #[tokio::test]
    async fn test_list_folders() {
        let mut builder = session();
        builder
            .write(b"1 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\HasNoChildren \\Sent) \"/\" \"Sent Items\"\r\n")
            .read(b"1 OK LIST completed\r\n");
        let mut client = logged_in(&mut builder).await;

        let names = client.list_folders("", "*").await.unwrap();
        assert_eq!(names, vec!["INBOX", "Sent Items"]);
    }

    #[tokio::test]
    async fn test_list_name_sent_as_literal() {
        let mut builder = session();
        builder
            .write(b"1 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" {11}\r\n")
            .read(b"Sent \"Mail\"\r\n")
            .read(b"* LIST () \"/\" INBOX\r\n")
            .read(b"1 OK LIST completed\r\n");
        let mut client = logged_in(&mut builder).await;

        let folders = client.list_folders_with_flags("", "*", false).await.unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Sent \"Mail\"", "INBOX"]);
        assert_eq!(folders[0].flags, vec!["\\HasNoChildren"]);
    }

    #[tokio::test]
    async fn test_xlist_with_flags() {
        let mut builder = session();
        builder
            .write(b"1 XLIST \"\" \"*\"\r\n")
            .read(b"* XLIST (\\HasNoChildren \\Inbox) \"/\" \"Inbox\"\r\n")
            .read(b"* XLIST (\\HasNoChildren \\Trash) \"/\" \"[Gmail]/Trash\"\r\n")
            .read(b"1 OK XLIST completed\r\n");
        let mut client = logged_in(&mut builder).await;

        let folders = client.list_folders_with_flags("", "*", true).await.unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[1].name, "[Gmail]/Trash");
        assert_eq!(folders[1].flags, vec!["\\HasNoChildren", "\\Trash"]);
    }

    #[tokio::test]
    async fn test_list_no_is_empty_and_bad_is_error() {
        let mut builder = session();
        builder
            .write(b"1 LIST \"\" \"*\"\r\n")
            .read(b"1 NO LIST not allowed\r\n")
            .write(b"2 LIST \"\" \"*\"\r\n")
            .read(b"2 BAD LIST syntax\r\n");
        let mut client = logged_in(&mut builder).await;

        assert!(client.list_folders("", "*").await.unwrap().is_empty());
        let err = client.list_folders("", "*").await.unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
    }

    #[tokio::test]
    async fn test_select() {
        let mut builder = session();
        builder
            .write(b"1 SELECT \"INBOX\"\r\n")
            .read(b"* 18 EXISTS\r\n")
            .read(b"* 2 RECENT\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] Predicted next UID\r\n")
            .read(b"1 OK [READ-WRITE] SELECT completed\r\n");
        let client = logged_in(&mut builder).await;

        let (client, folder) = client.select("INBOX").await.unwrap();
        assert_eq!(folder.exists, 18);
        assert_eq!(folder.recent, 2);
        assert_eq!(folder.uid_next, 4392);
        assert!(!folder.read_only);
        assert_eq!(client.folder(), &folder);
    }

    #[tokio::test]
    async fn test_examine_is_read_only() {
        let mut builder = session();
        builder
            .write(b"1 EXAMINE \"Archive\"\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"1 OK [READ-ONLY] EXAMINE completed\r\n");
        let client = logged_in(&mut builder).await;

        let (_client, folder) = client.examine("Archive").await.unwrap();
        assert!(folder.read_only);
        assert_eq!(folder.uid_next, u64::MAX);
    }

    #[tokio::test]
    async fn test_select_missing_folder() {
        let mut builder = session();
        builder
            .write(b"1 SELECT \"Nope\"\r\n")
            .read(b"1 NO [NONEXISTENT] Unknown Mailbox\r\n");
        let client = logged_in(&mut builder).await;

        let err = client.select("Nope").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }
}
