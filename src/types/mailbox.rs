use super::Flag;
use std::fmt;

/// Meta-information about an IMAP mailbox, as returned by
/// [`SELECT`](https://tools.ietf.org/html/rfc3501#section-6.3.1).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
#[non_exhaustive]
pub struct Mailbox {
    /// Defined flags in the mailbox.
    pub flags: Vec<Flag>,

    /// The number of messages in the mailbox.
    pub exists: u32,

    /// The number of messages with the \Recent flag set.
    pub recent: u32,

    /// The message sequence number of the first unseen message in the mailbox.
    pub unseen: Option<u32>,

    /// A list of message flags that the client can change permanently.
    pub permanent_flags: Vec<Flag>,

    /// The next unique identifier value.
    pub uid_next: Option<u32>,

    /// The unique identifier validity value.
    pub uid_validity: Option<u32>,

    /// Whether the server granted read-only access.
    pub read_only: bool,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flags: {:?}, exists: {}, recent: {}, unseen: {:?}, permanent_flags: {:?}, \
             uid_next: {:?}, uid_validity: {:?}, read_only: {}",
            self.flags,
            self.exists,
            self.recent,
            self.unseen,
            self.permanent_flags,
            self.uid_next,
            self.uid_validity,
            self.read_only,
        )
    }
}
