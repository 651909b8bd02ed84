use std::fmt;

/// The system flags pre-defined in [RFC 3501 section
/// 2.3.2](https://tools.ietf.org/html/rfc3501#section-2.3.2), plus keywords as
/// [`Flag::Custom`]. All system flags begin with `\` in the IMAP protocol.
///
/// The archiver only ever *writes* [`Flag::Deleted`], and only ever *selects on*
/// the absence of [`Flag::Flagged`]; the remaining variants exist so that
/// `FLAGS` and `PERMANENTFLAGS` data in a `SELECT` response can be read back.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Flag {
    /// Message has been read
    Seen,

    /// Message has been answered
    Answered,

    /// Message is "flagged" for urgent/special attention
    Flagged,

    /// Message is "deleted" for removal by later EXPUNGE
    Deleted,

    /// Message has not completed composition (marked as a draft).
    Draft,

    /// Message is "recently" arrived in this mailbox.
    Recent,

    /// The [`Mailbox::permanent_flags`](crate::Mailbox::permanent_flags) can include this
    /// special flag (`\*`), which indicates that it is possible to create new keywords.
    MayCreate,

    /// A non-standard user- or server-defined flag.
    Custom(String),
}

impl Flag {
    fn system(s: &str) -> Option<Self> {
        match s {
            "\\Seen" => Some(Flag::Seen),
            "\\Answered" => Some(Flag::Answered),
            "\\Flagged" => Some(Flag::Flagged),
            "\\Deleted" => Some(Flag::Deleted),
            "\\Draft" => Some(Flag::Draft),
            "\\Recent" => Some(Flag::Recent),
            "\\*" => Some(Flag::MayCreate),
            _ => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Recent => write!(f, "\\Recent"),
            Flag::MayCreate => write!(f, "\\*"),
            Flag::Custom(ref s) => write!(f, "{}", s),
        }
    }
}

impl<'a> From<&'a str> for Flag {
    fn from(s: &'a str) -> Self {
        Flag::system(s).unwrap_or_else(|| Flag::Custom(s.to_string()))
    }
}
