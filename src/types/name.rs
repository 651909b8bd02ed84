use crate::parse::list_entry;

/// A name that matches a `LIST` command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Name {
    pub(crate) attributes: Vec<NameAttribute>,
    pub(crate) delimiter: String,
    pub(crate) name: String,
}

/// An attribute set for an IMAP name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum NameAttribute {
    /// It is not possible for any child levels of hierarchy to exist
    /// under this name; no child levels exist now and none can be
    /// created in the future.
    NoInferiors,

    /// It is not possible to use this name as a selectable mailbox.
    NoSelect,

    /// The mailbox has been marked "interesting" by the server; the
    /// mailbox probably contains messages that have been added since
    /// the last time the mailbox was selected.
    Marked,

    /// The mailbox does not contain any additional messages since the
    /// last time the mailbox was selected.
    Unmarked,

    /// A non-standard user- or server-defined name attribute.
    Custom(String),
}

impl NameAttribute {
    fn system(s: &str) -> Option<Self> {
        match s {
            "\\Noinferiors" => Some(NameAttribute::NoInferiors),
            "\\Noselect" => Some(NameAttribute::NoSelect),
            "\\Marked" => Some(NameAttribute::Marked),
            "\\Unmarked" => Some(NameAttribute::Unmarked),
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for NameAttribute {
    fn from(s: &'a str) -> Self {
        NameAttribute::system(s).unwrap_or_else(|| NameAttribute::Custom(s.to_string()))
    }
}

impl Name {
    /// Tokenize one raw `LIST` entry of the form `(<flags>) "<delimiter>" "<name>"`, as it
    /// appears after the `* LIST ` prefix.
    ///
    /// Returns `None` for entries that do not have that shape, including entries whose
    /// hierarchy delimiter is `NIL` or missing.
    pub fn from_list_entry(entry: &str) -> Option<Name> {
        list_entry(entry)
    }

    /// Attributes of this name.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes[..]
    }

    /// The hierarchy delimiter is a character used to delimit levels of hierarchy in a mailbox
    /// name.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The bare mailbox name, without quoting.
    pub fn name(&self) -> &str {
        &self.name
    }
}
