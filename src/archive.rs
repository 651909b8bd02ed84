//! Moving week-old, unflagged mail out of the inbox and into the archive mailbox.
//!
//! A run is strictly linear: log in, find the archive mailbox, select `INBOX`, search for
//! messages received before the cutoff that carry no `\Flagged` flag, then copy them across,
//! mark the originals `\Deleted` and expunge. The session is logged out however the run ends.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::client_builder::ClientBuilder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sequence::compress;
use crate::session::{MailSession, SessionGuard};
use crate::types::{Flag, Name};

/// Mailbox names, compared case-insensitively, that qualify as the archive destination.
pub const ARCHIVE_NAMES: [&str; 2] = ["archive", "archived"];

/// The mailbox messages are archived from.
pub const INBOX: &str = "INBOX";

/// Messages received at least this many days before the run are archived.
pub const RETENTION_DAYS: i64 = 7;

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Messages the server reported as expunged from the inbox.
    pub archived: usize,
    /// Messages the search matched.
    pub selected: usize,
    /// The archive mailbox the messages were copied to.
    pub destination: String,
}

/// Pick the archive mailbox out of raw `LIST` entries.
///
/// The first entry, in listing order, whose name is `Archive` or `Archived` in any letter case
/// wins. Entries that do not tokenize are skipped.
pub fn find_archive_mailbox<I, E>(entries: I) -> Option<String>
where
    I: IntoIterator<Item = E>,
    E: AsRef<str>,
{
    for entry in entries {
        let entry = entry.as_ref();
        let name = match Name::from_list_entry(entry) {
            Some(name) => name,
            None => {
                tracing::debug!("skipping malformed listing entry: {}", entry);
                continue;
            }
        };
        if ARCHIVE_NAMES
            .iter()
            .any(|candidate| name.name().eq_ignore_ascii_case(candidate))
        {
            tracing::debug!("using {:?} as the archive mailbox", name.name());
            return Some(name.name().to_string());
        }
    }
    None
}

/// The date messages must predate to be archived: [`RETENTION_DAYS`] before `now`, as a UTC date.
pub fn cutoff_date(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::days(RETENTION_DAYS)).date_naive()
}

/// The `SEARCH` criteria selecting unflagged messages received before `cutoff`.
pub fn search_query(cutoff: NaiveDate) -> String {
    format!("(BEFORE \"{}\" UNFLAGGED)", cutoff.format("%d-%b-%Y"))
}

/// Archive old inbox mail over an already-connected `session`, treating `now` as the current
/// time.
///
/// `session` is logged out before this returns, on success and on every error.
pub fn archive_with<S: MailSession>(
    session: S,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<Report> {
    let mut session = SessionGuard::new(session);

    session.login(username, password)?;
    tracing::info!("logged in as {}", username);

    let entries = session.list("", "%")?;
    let destination = find_archive_mailbox(&entries).ok_or(Error::NoArchiveMailbox)?;

    let inbox = session.select(INBOX)?;
    tracing::debug!("selected {}: {}", INBOX, inbox);
    if inbox.read_only {
        return Err(Error::ReadOnly(INBOX.to_string()));
    }

    let cutoff = cutoff_date(now);
    let ids = session.search(&search_query(cutoff))?;
    tracing::info!("{} messages received before {}", ids.len(), cutoff);

    let set = compress(&ids);
    if set.is_empty() {
        return Ok(Report {
            archived: 0,
            selected: 0,
            destination,
        });
    }

    session.copy(&set, &destination)?;
    tracing::info!("copied {} to {}", set, destination);
    session.store(&set, &format!("+FLAGS ({})", Flag::Deleted))?;
    let expunged = session.expunge()?;
    tracing::info!("expunged {} messages from {}", expunged.len(), INBOX);

    Ok(Report {
        archived: expunged.len(),
        selected: ids.len(),
        destination,
    })
}

/// Connect to the server described by `config` and archive its old inbox mail.
pub fn run(config: &Config) -> Result<Report> {
    let client = ClientBuilder::new(config.host.as_str(), config.port).connect_secure()?;
    tracing::info!("connected to {}:{}", config.host, config.port);
    archive_with(client, &config.username, &config.password, Utc::now())
}
