use std::fmt;

use crate::error::{Error, Result};

/// Everything needed to reach and log in to the mailbox.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// IMAP server host name, also used for TLS certificate verification.
    pub host: String,
    /// IMAPS port, typically 993.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl Config {
    /// Assemble a `Config` from optionally-supplied inputs.
    ///
    /// Empty strings and a port of `0` count as missing. Every missing input is named in the
    /// returned [`Error::MissingConfig`], so nothing is attempted until all four are present.
    pub fn from_parts(
        host: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Config> {
        let host = host.filter(|h| !h.is_empty());
        let port = port.filter(|&p| p != 0);
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());

        match (host, port, username, password) {
            (Some(host), Some(port), Some(username), Some(password)) => Ok(Config {
                host,
                port,
                username,
                password,
            }),
            (host, port, username, password) => {
                let mut missing = Vec::new();
                if host.is_none() {
                    missing.push("host");
                }
                if port.is_none() {
                    missing.push("port");
                }
                if username.is_none() {
                    missing.push("username");
                }
                if password.is_none() {
                    missing.push("password");
                }
                Err(Error::MissingConfig(missing))
            }
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
