//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use stratamail_imap::parser::parse;
use stratamail_imap::{
    Client, Error, FetchOptions, FramedStream, Message, ParseFailures, SectionPayload,
    SequenceRange, uid_batches,
};

/// Mock stream that replays a server script and records what the client sent.
struct MockStream {
    /// Server bytes returned in order.
    responses: Cursor<Vec<u8>>,
    /// Commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const TIMEOUT: Duration = Duration::from_secs(120);

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_session() -> anyhow::Result<()> {
    let script: &[u8] = b"* OK [CAPABILITY IMAP4rev1] Dovecot ready.\r\n\
        0 OK Logged in\r\n\
        * LIST (\\HasNoChildren) \"/\" INBOX\r\n\
        * LIST (\\HasNoChildren) \"/\" \"Sent\"\r\n\
        1 OK List completed\r\n\
        * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
        * OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Flags permitted.\r\n\
        * 2 EXISTS\r\n\
        * 0 RECENT\r\n\
        * OK [UIDVALIDITY 1357] UIDs valid\r\n\
        * OK [UIDNEXT 13] Predicted next UID\r\n\
        2 OK [READ-WRITE] Select completed\r\n\
        * 1 FETCH (UID 11)\r\n\
        * 2 FETCH (UID 12)\r\n\
        3 OK Fetch completed\r\n\
        * 1 FETCH (UID 11 FLAGS (\\Seen) ENVELOPE (\"Tue, 1 Mar 2016 10:00:00 +0100 (CET)\" \"=?utf-8?Q?Gr=C3=BC=C3=9Fe?=\" \
((\"Ann\" NIL \"ann\" \"example.org\")) ((\"Ann\" NIL \"ann\" \"example.org\")) NIL \
((NIL NIL \"bob\" \"example.com\")(NIL NIL NIL \"example.com\")) NIL NIL NIL \"<m1@example.org>\") \
BODYSTRUCTURE (\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"BASE64\" 12 1 NIL NIL NIL))\r\n\
        * 2 FETCH (UID 12 FLAGS () ENVELOPE (NIL \"Wrapped \r\n\
subject\" NIL NIL NIL NIL NIL NIL NIL NIL) BODYSTRUCTURE (\"APPLICATION\" \"PDF\" NIL NIL NIL \"BASE64\" 4 NIL NIL NIL))\r\n\
        4 OK Fetch completed\r\n\
        * 1 FETCH (UID 11 BODY[1] {12}\r\n\
        SGVsbG8gd29y)\r\n\
        5 OK Fetch completed\r\n\
        6 OK Store completed\r\n\
        * BYE Logging out\r\n\
        7 OK Logout completed\r\n";

    let (stream, sent) = MockStream::new(script);
    let client = Client::from_transport(FramedStream::new(stream), TIMEOUT).await?;
    let mut client = client.login("ann", "secret").await?;

    let folders = client.list_folders("", "*").await?;
    assert_eq!(folders, vec!["INBOX", "Sent"]);

    let (mut client, folder) = client.select("INBOX").await?;
    assert_eq!(folder.exists, 2);
    assert_eq!(folder.uid_validity, 1357);
    assert_eq!(folder.known_uid_next(), Some(13));
    assert_eq!(folder.permanent_flags.len(), 3);

    let uids = client.fetch_uids(SequenceRange::all(), false).await?;
    assert_eq!(uids, vec![11, 12]);

    let mut messages: Vec<Message> = Vec::new();
    let mut failures = ParseFailures::new();
    for range in uid_batches(&uids, 1000) {
        messages.extend(
            client
                .fetch_messages(range, FetchOptions::all(), &[], Some(&mut failures))
                .await?,
        );
    }
    assert!(failures.is_empty());
    assert_eq!(messages.len(), 2);

    let first = &messages[0];
    assert_eq!(first.subject, "Grüße");
    assert!(first.has_flag("\\Seen"));
    assert_eq!(first.from.as_ref().unwrap().to_string(), "\"Ann\" <ann@example.org>");
    assert_eq!(first.to.len(), 1);
    assert!(first.reply_to.is_none());
    assert_eq!(first.body_parts[0].section, "1");
    assert!(first.timestamp.is_some());

    let second = &messages[1];
    assert_eq!(second.subject, "Wrapped subject");
    assert!(second.timestamp.is_none());
    assert_eq!(second.body_parts[0].content_type.mime_type(), "application/pdf");

    let payload = client.fetch_section(11, &first.body_parts[0], true).await?;
    assert_eq!(payload, Some(SectionPayload::Text("Hello wor".to_string())));

    client.set_deleted(SequenceRange::single(12)).await?;
    client.logout().await?;

    assert_eq!(
        sent_lines(&sent),
        vec![
            "0 LOGIN ann secret",
            "1 LIST \"\" \"*\"",
            "2 SELECT \"INBOX\"",
            "3 FETCH 1:* UID",
            "4 UID FETCH 11:12 (UID ENVELOPE FLAGS BODYSTRUCTURE)",
            "5 UID FETCH 11 BODY.PEEK[1]",
            "6 UID STORE 12 +FLAGS (\\Deleted)",
            "7 LOGOUT",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_server_hangs_up_mid_response() {
    let script: &[u8] = b"* OK ready\r\n* 1 FETCH (UID 1\r\n";
    let (stream, _sent) = MockStream::new(script);
    let client = Client::from_transport(FramedStream::new(stream), TIMEOUT)
        .await
        .unwrap();

    let err = client.login("a", "b").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
    assert!(err.is_transport());
}

#[test]
fn test_parse_gmail_fetch_line() {
    let line = "* 54 FETCH (X-GM-MSGID 1379514999738475089 UID 79 FLAGS () ENVELOPE (\"Fri, 9 Sep 2011 15:38:52 -0700\" \"Simple message\" ((\"=?utf-8?B?5YiY5YWL5bOw?=\" NIL \"someuser\" \"someplace.com\")) NIL NIL NIL NIL NIL NIL NIL))";
    let list = parse(line);
    let message = Message::from_fetch(&list, &["X-GM-MSGID"]).unwrap().unwrap();
    assert_eq!(message.uid, 79);
    assert_eq!(
        message.sender.as_ref().unwrap().display_name.as_deref(),
        Some("刘克峰")
    );
    assert!(message.from.is_none());
}
