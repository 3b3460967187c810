//! Implementation for the selected state.

use std::ops::ControlFlow;

use super::states::{Authenticated, Selected};
use super::{Client, accept_no};
use crate::command::{Command, FetchItem, FetchOptions, StoreAction};
use crate::connection::Transport;
use crate::failure::{ParseFailures, for_each_line};
use crate::fetch::SectionPayload;
use crate::parser::{Token, TokenList, parse};
use crate::response::Response;
use crate::types::{BodyPart, Folder, Message, SequenceRange};
use crate::{Error, Result};

impl<T> Client<T, Selected>
where
    T: Transport,
{
    /// The snapshot of the selected mailbox.
    #[must_use]
    pub const fn folder(&self) -> &Folder {
        self.state.folder()
    }

    /// Selects another mailbox for reading and writing.
    pub async fn select(self, name: &str) -> Result<(Self, Folder)> {
        self.open_folder(name, false).await
    }

    /// Selects another mailbox read-only.
    pub async fn examine(self, name: &str) -> Result<(Self, Folder)> {
        self.open_folder(name, true).await
    }

    /// Leaves the mailbox without expunging.
    pub async fn unselect(mut self) -> Result<Client<T, Authenticated>> {
        self.execute(&Command::Unselect).await?;
        Ok(self.into_state(Authenticated))
    }

    /// Fetches the UIDs of the messages in `range`.
    ///
    /// With `by_uid` the range holds UIDs, otherwise sequence numbers. A NO
    /// answer yields an empty list.
    pub async fn fetch_uids(&mut self, range: SequenceRange, by_uid: bool) -> Result<Vec<u64>> {
        let command = Command::Fetch {
            range,
            items: vec![FetchItem::Uid],
            uid: by_uid,
        };
        let Some(response) = accept_no(self.send_receive(&command).await?)? else {
            return Ok(Vec::new());
        };

        let mut uids: Vec<u64> = Vec::new();
        for_each_line(response.lines.iter().map(String::as_str), None, |line| {
            let list = parse(line);
            if let Some(items) = fetch_items(&list)
                && let Some(uid) = items.value_after("UID").and_then(Token::as_str)
            {
                uids.push(
                    uid.parse::<u64>()
                        .map_err(|_| Error::Parse(format!("invalid UID {uid:?}")))?,
                );
            }
            Ok(ControlFlow::Continue(()))
        })?;

        Ok(uids)
    }

    /// Fetches message summaries for a UID range.
    ///
    /// `extension_names` are additional fetch items, such as `X-GM-MSGID`,
    /// whose values land in [`Message::extension_parameters`]. Entries that
    /// fail to parse are collected in `failures` if given; otherwise the
    /// first one aborts the call. A NO answer yields an empty list.
    pub async fn fetch_messages(
        &mut self,
        range: SequenceRange,
        options: FetchOptions,
        extension_names: &[&str],
        failures: Option<&mut ParseFailures>,
    ) -> Result<Vec<Message>> {
        let command = Command::Fetch {
            range,
            items: options.items(extension_names),
            uid: true,
        };
        let Some(response) = accept_no(self.send_receive(&command).await?)? else {
            return Ok(Vec::new());
        };

        let lines = response.inline_literals();
        let mut messages = Vec::new();
        for_each_line(lines.iter().map(String::as_str), failures, |line| {
            let list = parse(line);
            if fetch_items(&list).is_some()
                && let Some(message) = Message::from_fetch(&list, extension_names)?
            {
                messages.push(message);
            }
            Ok(ControlFlow::Continue(()))
        })?;

        tracing::debug!(%range, count = messages.len(), "fetched messages");
        Ok(messages)
    }

    /// Fetches and decodes one body part of a message.
    ///
    /// With `peek` the `\Seen` flag is left untouched. Returns `None` when
    /// the server sent nothing for the section or its transfer encoding
    /// cannot be decoded.
    pub async fn fetch_section(
        &mut self,
        uid: u64,
        part: &BodyPart,
        peek: bool,
    ) -> Result<Option<SectionPayload>> {
        let command = Command::Fetch {
            range: SequenceRange::single(uid),
            items: vec![FetchItem::Body {
                section: part.section.clone(),
                peek,
            }],
            uid: true,
        };
        let Some(response) = accept_no(self.send_receive(&command).await?)? else {
            return Ok(None);
        };

        let Some(raw) = section_bytes(&response, &part.section) else {
            tracing::debug!(uid, section = %part.section, "no section data in response");
            return Ok(None);
        };
        Ok(SectionPayload::decode(part, &raw))
    }

    /// Marks messages `\Deleted`.
    pub async fn set_deleted(&mut self, range: SequenceRange) -> Result<()> {
        self.store_flag(range, "\\Deleted", true).await
    }

    /// Adds or removes a flag on messages by UID.
    pub async fn store_flag(&mut self, range: SequenceRange, flag: &str, add: bool) -> Result<()> {
        let action = if add { StoreAction::Add } else { StoreAction::Remove };
        self.execute(&Command::Store {
            range,
            action,
            flag: flag.to_string(),
        })
        .await?;
        Ok(())
    }
}

/// Returns the item list of a `* n FETCH (...)` line.
fn fetch_items(list: &TokenList) -> Option<&TokenList> {
    let is_fetch = list.string_at(0) == "*"
        && list.is_string_at(1)
        && list.string_at(2).eq_ignore_ascii_case("FETCH")
        && list.is_list_at(3);
    is_fetch.then(|| list.list_at(3))
}

/// Finds the payload of `BODY[<section>]` in a FETCH response.
///
/// The payload normally arrives as a literal after the FETCH line; some
/// servers send short sections inline as a quoted string instead.
fn section_bytes(response: &Response, section: &str) -> Option<Vec<u8>> {
    let name = format!("BODY[{section}]");
    let literal = response
        .literals()
        .into_iter()
        .find(|(signal, _)| announces_section(signal, &name));
    if let Some((_, bytes)) = literal {
        return Some(bytes.to_vec());
    }

    response.lines.iter().find_map(|line| {
        let list = parse(line);
        fetch_items(&list)?
            .value_after(&name)
            .and_then(Token::as_str)
            .map(|text| text.as_bytes().to_vec())
    })
}

/// Whether a literal signal line is a FETCH whose literal is `name`.
fn announces_section(signal: &str, name: &str) -> bool {
    let Some(before_literal) = signal.rfind('{').map(|i| signal[..i].trim_end()) else {
        return false;
    };
    signal.starts_with('*')
        && signal.contains("FETCH")
        && before_literal
            .to_ascii_uppercase()
            .ends_with(&name.to_ascii_uppercase())
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
    use stratamail_mime::ContentType;
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::connection::{DEFAULT_READ_TIMEOUT, FramedStream};
    use crate::response::Status;

    fn session() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"0 LOGIN u p\r\n")
            .read(b"0 OK done\r\n")
            .write(b"1 SELECT \"INBOX\"\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"1 OK [READ-WRITE] done\r\n");
        builder
    }

    async fn selected(builder: &mut Builder) -> Client<FramedStream<Mock>, Selected> {
        let client = Client::from_transport(FramedStream::new(builder.build()), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();
        let client = client.login("u", "p").await.unwrap();
        client.select("INBOX").await.unwrap().0
    }

    fn text_part(section: &str, charset: &str, encoding: &str) -> BodyPart {
        BodyPart {
            section: section.to_string(),
            content_type: ContentType::new("text", "plain").with_parameter("charset", charset),
            content_id: None,
            description: None,
            encoding: encoding.to_string(),
            size: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_uids() {
        let mut builder = session();
        builder
            .write(b"2 FETCH 1:* UID\r\n")
            .read(b"* 1 FETCH (UID 101)\r\n")
            .read(b"* 2 FETCH (UID 102)\r\n")
            .read(b"* 3 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"* 3 FETCH (UID 110)\r\n")
            .read(b"2 OK FETCH completed\r\n");
        let mut client = selected(&mut builder).await;

        let uids = client.fetch_uids(SequenceRange::all(), false).await.unwrap();
        assert_eq!(uids, vec![101, 102, 110]);
    }

    #[tokio::test]
    async fn test_fetch_messages_with_literal_subject() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 1:* (UID ENVELOPE)\r\n")
            .read(b"* 1 FETCH (UID 7 ENVELOPE (\"Mon, 7 Feb 1994 21:52:25 -0800\" {12}\r\n")
            .read(b"Re: \"quoted\"")
            .read(b" NIL NIL NIL NIL NIL NIL NIL \"<id@x>\"))\r\n")
            .read(b"2 OK FETCH completed\r\n");
        let mut client = selected(&mut builder).await;

        let options = FetchOptions {
            envelope: true,
            flags: false,
            body_structure: false,
        };
        let messages = client
            .fetch_messages(SequenceRange::all(), options, &[], None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].uid, 7);
        assert_eq!(messages[0].subject, "Re: \"quoted\"");
        assert_eq!(messages[0].message_id.as_deref(), Some("<id@x>"));
    }

    #[tokio::test]
    async fn test_fetch_messages_collects_failures() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 1:10 (UID FLAGS)\r\n")
            .read(b"* 1 FETCH (UID 1 FLAGS (\\Seen))\r\n")
            .read(b"* 2 FETCH (UID bogus FLAGS ())\r\n")
            .read(b"* 3 FETCH (UID 3 FLAGS ())\r\n")
            .read(b"2 OK done\r\n");
        let mut client = selected(&mut builder).await;

        let options = FetchOptions {
            envelope: false,
            flags: true,
            body_structure: false,
        };
        let mut failures = ParseFailures::new();
        let messages = client
            .fetch_messages(SequenceRange::new(1, 10), options, &[], Some(&mut failures))
            .await
            .unwrap();

        assert_eq!(messages.iter().map(|m| m.uid).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures.details()[0].line, "* 2 FETCH (UID bogus FLAGS ())");
    }

    #[tokio::test]
    async fn test_fetch_messages_failure_propagates_without_collector() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 1:10 (UID FLAGS)\r\n")
            .read(b"* 2 FETCH (UID bogus FLAGS ())\r\n")
            .read(b"2 OK done\r\n");
        let mut client = selected(&mut builder).await;

        let options = FetchOptions {
            envelope: false,
            flags: true,
            body_structure: false,
        };
        let err = client
            .fetch_messages(SequenceRange::new(1, 10), options, &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_section_literal() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 42 BODY.PEEK[1]\r\n")
            .read(b"* 5 FETCH (UID 42 BODY[1] {15}\r\n")
            .read(b"Caf=E9 au lait\n")
            .read(b")\r\n")
            .read(b"2 OK FETCH completed\r\n");
        let mut client = selected(&mut builder).await;

        let part = text_part("1", "\"iso-8859-1\"", "quoted-printable");
        let payload = client.fetch_section(42, &part, true).await.unwrap();
        assert_eq!(payload, Some(SectionPayload::Text("Café au lait\n".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_section_skips_other_literals() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 42 BODY[1]\r\n")
            .read(b"* 2 FETCH (X-GM-LABELS {4}\r\n")
            .read(b"Work")
            .read(b")\r\n")
            .read(b"* 5 FETCH (UID 42 BODY[1] {5}\r\n")
            .read(b"hello")
            .read(b")\r\n")
            .read(b"2 OK FETCH completed\r\n");
        let mut client = selected(&mut builder).await;

        let part = text_part("1", "utf-8", "7bit");
        let payload = client.fetch_section(42, &part, false).await.unwrap();
        assert_eq!(payload, Some(SectionPayload::Text("hello".to_string())));
    }

    #[test]
    fn test_announces_section() {
        assert!(announces_section("* 5 FETCH (UID 42 BODY[1.2] {10}", "BODY[1.2]"));
        assert!(announces_section("* 5 FETCH (UID 42 body[1] {10}", "BODY[1]"));
        assert!(!announces_section("* 5 FETCH (UID 42 BODY[1.2] {10}", "BODY[2]"));
        assert!(!announces_section("* 5 FETCH (X-GM-LABELS {4}", "BODY[1]"));
    }

    #[tokio::test]
    async fn test_fetch_section_unknown_encoding() {
        let mut builder = session();
        builder
            .write(b"2 UID FETCH 42 BODY[2]\r\n")
            .read(b"* 5 FETCH (UID 42 BODY[2] {3}\r\n")
            .read(b"abc")
            .read(b")\r\n")
            .read(b"2 OK FETCH completed\r\n");
        let mut client = selected(&mut builder).await;

        let part = text_part("2", "utf-8", "x-gzip");
        assert_eq!(client.fetch_section(42, &part, false).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_and_unselect() {
        let mut builder = session();
        builder
            .write(b"2 UID STORE 5:9 +FLAGS (\\Deleted)\r\n")
            .read(b"2 OK STORE completed\r\n")
            .write(b"3 UID STORE 5 -FLAGS (\\Seen)\r\n")
            .read(b"3 NO read-only\r\n")
            .write(b"4 UNSELECT\r\n")
            .read(b"4 OK done\r\n");
        let mut client = selected(&mut builder).await;

        client.set_deleted(SequenceRange::new(5, 9)).await.unwrap();
        let err = client
            .store_flag(SequenceRange::single(5), "\\Seen", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::No(_)));

        let client = client.unselect().await.unwrap();
        assert_eq!(client.next_command_number(), 5);
    }

    #[test]
    fn test_section_bytes_inline() {
        let response = Response::new(
            "2",
            Status::Ok,
            vec![
                "* 5 FETCH (UID 42 BODY[1] \"hello\")".to_string(),
                "2 OK done".to_string(),
            ],
        );
        assert_eq!(section_bytes(&response, "1"), Some(b"hello".to_vec()));
        assert_eq!(section_bytes(&response, "2"), None);
    }
}
