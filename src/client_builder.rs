use crate::{Client, Result};
use std::io::{Read, Write};
use std::net::TcpStream;

#[cfg(feature = "native-tls")]
use native_tls::{TlsConnector, TlsStream};
#[cfg(feature = "rustls-tls")]
use rustls_connector::{RustlsConnector, TlsStream as RustlsStream};

/// The transport [`ClientBuilder::connect_secure`] produces with the enabled TLS feature.
#[cfg(feature = "native-tls")]
pub type SecureStream = TlsStream<TcpStream>;

/// The transport [`ClientBuilder::connect_secure`] produces with the enabled TLS feature.
#[cfg(all(feature = "rustls-tls", not(feature = "native-tls")))]
pub type SecureStream = RustlsStream<TcpStream>;

/// A convenience builder for [`Client`] structs over implicit-TLS transports (IMAPS, usually
/// port 993).
///
/// ```no_run
/// # use imap_archiver::ClientBuilder;
/// # fn main() -> Result<(), imap_archiver::Error> {
/// let client = ClientBuilder::new("imap.example.com", 993).connect_secure()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<D>
where
    D: AsRef<str>,
{
    domain: D,
    port: u16,
}

impl<D> ClientBuilder<D>
where
    D: AsRef<str>,
{
    /// Make a new `ClientBuilder` using the given domain and port.
    pub fn new(domain: D, port: u16) -> Self {
        ClientBuilder { domain, port }
    }

    /// Return a new [`Client`] using a `native-tls` transport.
    #[cfg(feature = "native-tls")]
    pub fn native_tls(&self) -> Result<Client<TlsStream<TcpStream>>> {
        self.connect(|domain, tcp| {
            let ssl_conn = TlsConnector::builder().build()?;
            Ok(TlsConnector::connect(&ssl_conn, domain, tcp)?)
        })
    }

    /// Return a new [`Client`] using `rustls` transport.
    #[cfg(feature = "rustls-tls")]
    pub fn rustls(&self) -> Result<Client<RustlsStream<TcpStream>>> {
        self.connect(|domain, tcp| {
            let ssl_conn = RustlsConnector::new_with_native_certs()?;
            Ok(ssl_conn.connect(domain, tcp)?)
        })
    }

    /// Connect with whichever TLS backend the crate was built with, preferring `native-tls`.
    #[cfg(feature = "native-tls")]
    pub fn connect_secure(&self) -> Result<Client<SecureStream>> {
        self.native_tls()
    }

    /// Connect with whichever TLS backend the crate was built with, preferring `native-tls`.
    #[cfg(all(feature = "rustls-tls", not(feature = "native-tls")))]
    pub fn connect_secure(&self) -> Result<Client<SecureStream>> {
        self.rustls()
    }

    /// Make a [`Client`] using a custom TLS initialization.
    ///
    /// The `handshake` closure receives the domain and the connected [`TcpStream`], and should
    /// only perform TLS initialization over it, returning the encrypted stream. The server
    /// greeting is read before the client is handed back.
    pub fn connect<F, C>(&self, handshake: F) -> Result<Client<C>>
    where
        F: FnOnce(&str, TcpStream) -> Result<C>,
        C: Read + Write,
    {
        tracing::debug!("connecting to {}:{}", self.domain.as_ref(), self.port);
        let tcp = TcpStream::connect((self.domain.as_ref(), self.port))?;
        let tls = handshake(self.domain.as_ref(), tcp)?;
        let mut client = Client::new(tls);
        client.read_greeting()?;
        Ok(client)
    }
}
