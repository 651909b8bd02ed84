//! The mail session the archiver drives, and the guard that releases it.

use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};

use crate::client::Client;
use crate::error::Result;
use crate::types::{Mailbox, Seq};

/// The protocol operations an archiving run needs from a connected mail session.
///
/// [`Client`] implements this over a real IMAP connection; tests substitute recording fakes.
pub trait MailSession {
    /// Authenticate with a username and password.
    fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// List mailboxes under `reference` matching `pattern`, as raw listing entries of the form
    /// `(<flags>) "<delimiter>" "<name>"`.
    fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>>;

    /// Open `mailbox` for read/write access.
    fn select(&mut self, mailbox: &str) -> Result<Mailbox>;

    /// Search the selected mailbox; identifiers come back sorted ascending without duplicates.
    fn search(&mut self, query: &str) -> Result<Vec<Seq>>;

    /// Copy the messages in `sequence_set` to `mailbox`.
    fn copy(&mut self, sequence_set: &str, mailbox: &str) -> Result<()>;

    /// Apply a flag alteration such as `+FLAGS (\Deleted)` to `sequence_set`.
    fn store(&mut self, sequence_set: &str, query: &str) -> Result<()>;

    /// Remove messages marked `\Deleted`, returning the expunged sequence numbers.
    fn expunge(&mut self) -> Result<Vec<Seq>>;

    /// End the session.
    fn logout(&mut self) -> Result<()>;
}

impl<T: Read + Write> MailSession for Client<T> {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        Client::login(self, username, password)
    }

    fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>> {
        Client::list(self, reference, pattern)
    }

    fn select(&mut self, mailbox: &str) -> Result<Mailbox> {
        Client::select(self, mailbox)
    }

    fn search(&mut self, query: &str) -> Result<Vec<Seq>> {
        Client::search(self, query)
    }

    fn copy(&mut self, sequence_set: &str, mailbox: &str) -> Result<()> {
        Client::copy(self, sequence_set, mailbox)
    }

    fn store(&mut self, sequence_set: &str, query: &str) -> Result<()> {
        Client::store(self, sequence_set, query).map(|_| ())
    }

    fn expunge(&mut self) -> Result<Vec<Seq>> {
        Client::expunge(self)
    }

    fn logout(&mut self) -> Result<()> {
        Client::logout(self)
    }
}

impl<S: MailSession + ?Sized> MailSession for &mut S {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        (**self).login(username, password)
    }
    fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>> {
        (**self).list(reference, pattern)
    }
    fn select(&mut self, mailbox: &str) -> Result<Mailbox> {
        (**self).select(mailbox)
    }
    fn search(&mut self, query: &str) -> Result<Vec<Seq>> {
        (**self).search(query)
    }
    fn copy(&mut self, sequence_set: &str, mailbox: &str) -> Result<()> {
        (**self).copy(sequence_set, mailbox)
    }
    fn store(&mut self, sequence_set: &str, query: &str) -> Result<()> {
        (**self).store(sequence_set, query)
    }
    fn expunge(&mut self) -> Result<Vec<Seq>> {
        (**self).expunge()
    }
    fn logout(&mut self) -> Result<()> {
        (**self).logout()
    }
}

/// Owns a [`MailSession`] for the length of a run and logs it out when dropped, whichever way
/// the run ended.
///
/// A failed logout is logged rather than reported: by then the run's own outcome is already
/// decided.
#[derive(Debug)]
pub struct SessionGuard<S: MailSession> {
    session: S,
}

impl<S: MailSession> SessionGuard<S> {
    /// Take ownership of `session`.
    pub fn new(session: S) -> Self {
        SessionGuard { session }
    }
}

impl<S: MailSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: MailSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: MailSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        match self.session.logout() {
            Ok(()) => tracing::debug!("logged out"),
            Err(e) => tracing::warn!("logout failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_stream::MockStream;

    #[test]
    fn guard_logs_out_on_drop() {
        let response = b"* BYE Logging out\r\na1 OK Logout completed.\r\n".to_vec();
        let mut client = Client::new(MockStream::new(response));
        {
            let _guard = SessionGuard::new(&mut client);
        }
        assert_eq!(client.stream.get_ref().written_buf, b"a1 LOGOUT\r\n".to_vec());
    }

    #[test]
    fn guard_swallows_logout_failure() {
        let client = Client::new(MockStream::default().with_eof());
        drop(SessionGuard::new(client));
    }
}
