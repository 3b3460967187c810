//! Implementation for the not-authenticated state.

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::Result;
use crate::command::Command;
use crate::connection::Transport;

impl<T> Client<T, NotAuthenticated>
where
    T: Transport,
{
    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    /// A rejected login is [`Error::No`](crate::Error::No).
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<T, Authenticated>> {
        self.execute(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;

        tracing::debug!("logged in");
        Ok(self.into_state(Authenticated))
    }

    /// Authenticates with a SASL mechanism and an initial response.
    ///
    /// `data` is sent as given, so it must already be Base64 encoded as the
    /// mechanism requires.
    pub async fn authenticate(
        mut self,
        mechanism: &str,
        data: &str,
    ) -> Result<Client<T, Authenticated>> {
        self.execute(&Command::Authenticate {
            mechanism: mechanism.to_string(),
            data: data.to_string(),
        })
        .await?;

        tracing::info!(mechanism, "authenticated");
        Ok(self.into_state(Authenticated))
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
    use std::sync::{Arc, Mutex};

    use tokio_test::io::Builder;

    use crate::Error;
    use crate::connection::{Client, DEFAULT_READ_TIMEOUT, FramedStream};

    #[tokio::test]
    async fn test_login_ok() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 LOGIN joe \"p w\"\r\n")
            .read(b"0 OK LOGIN completed\r\n")
            .build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        let client = client.login("joe", "p w").await.unwrap();
        assert_eq!(client.next_command_number(), 1);
    }

    /// Log sink shared with a test subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_logs_no_credentials() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 LOGIN mailuser hunter2\r\n")
            .read(b"0 OK LOGIN completed\r\n")
            .build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();
        client.login("mailuser", "hunter2").await.unwrap();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("LOGIN"));
        assert!(logs.contains("logged in"));
        assert!(!logs.contains("mailuser"));
        assert!(!logs.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 LOGIN joe wrong\r\n")
            .read(b"0 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        let err = client.login("joe", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::No(text) if text.contains("Invalid credentials")));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 AUTHENTICATE PLAIN AGpvZQBzZWNyZXQ=\r\n")
            .read(b"0 OK done\r\n")
            .build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        assert!(client.authenticate("PLAIN", "AGpvZQBzZWNyZXQ=").await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_bad() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 AUTHENTICATE NOPE x\r\n")
            .read(b"0 BAD unknown mechanism\r\n")
            .build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        let err = client.authenticate("NOPE", "x").await.unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
    }
}
