use clap::Parser;
use imap_archiver::Config;

#[derive(Debug, Parser)]
#[clap(name = "imap-archiver")]
#[clap(author, version, about)]
pub struct Args {
    /// IMAP server host name.
    #[clap(long, env = "IMAP_HOST")]
    pub host: Option<String>,
    /// IMAPS port, usually 993.
    #[clap(long, env = "IMAP_PORT")]
    pub port: Option<u16>,
    /// Login user name.
    #[clap(long, env = "IMAP_USERNAME")]
    pub username: Option<String>,
    /// Login password.
    #[clap(long, env = "IMAP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Args {
    pub fn into_config(self) -> imap_archiver::Result<Config> {
        Config::from_parts(self.host, self.port, self.username, self.password)
    }
}
