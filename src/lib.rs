//! Archive week-old, unflagged inbox mail over IMAP.
//!
//! This crate connects to an IMAP server over TLS, finds a mailbox called `Archive` or
//! `Archived`, and moves every message in `INBOX` that arrived more than seven days ago and is
//! not flagged into it. The protocol work is done by a small blocking [`Client`] that speaks just
//! the commands the archiver needs; the run itself lives in [`archive`].
//!
//! # Usage
//!
//! ```no_run
//! # fn main() -> Result<(), imap_archiver::Error> {
//! let config = imap_archiver::Config::from_parts(
//!     Some("imap.example.com".to_string()),
//!     Some(993),
//!     Some("me@example.com".to_string()),
//!     Some("password".to_string()),
//! )?;
//!
//! let report = imap_archiver::archive::run(&config)?;
//! println!("{} emails moved to {}", report.archived, report.destination);
//! # Ok(())
//! # }
//! ```
//!
//! The run is also available over any [`MailSession`] through [`archive::archive_with`], which
//! is how it is exercised without a server.
//!
//! ## Opting in to TLS
//!
//! `native-tls` is enabled by default. Building with `--no-default-features --features
//! rustls-tls` uses `rustls` instead. One of the two must be enabled.

#[cfg(not(any(feature = "native-tls", feature = "rustls-tls")))]
compile_error!("one of the `native-tls` or `rustls-tls` features must be enabled");

// Quote a string as an IMAP quoted string, escaping `\` and `"`.
macro_rules! quote {
    ($x:expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

mod parse;
mod utils;

pub mod archive;
pub mod types;

mod client;
pub use crate::client::Client;

mod client_builder;
pub use crate::client_builder::{ClientBuilder, SecureStream};

mod config;
pub use crate::config::Config;

pub mod error;
pub use crate::error::{Error, Result};

pub mod sequence;

mod session;
pub use crate::session::{MailSession, SessionGuard};

pub use crate::archive::Report;

#[cfg(test)]
mod mock_stream;
