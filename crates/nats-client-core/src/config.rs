use std::time::Duration;

use nats_protocol::ServerInfo;

use crate::error::ConnectError;

/// Authentication material presented during `CONNECT`. Exactly one scheme
/// is active at a time.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    UserPass {
        user: String,
        pass: String,
    },
    Token(String),
}

/// Local TLS posture. Does not itself perform a handshake -- see
/// [`ConnectOptions::connect_with_stream`] for supplying an
/// already-wrapped TLS transport. Carried here purely so the capability
/// mismatch invariant (`tls_required` vs. local intent) can be checked
/// before any bytes are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsOptions {
    pub enabled: bool,
}

/// Connection parameters, assembled via [`ConnectOptions::builder`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub credentials: Credentials,
    pub tls: TlsOptions,
    pub name: Option<String>,
    pub verbose: bool,
    pub pedantic: bool,
    pub echo: bool,
    pub ping_interval: Duration,
    pub max_outstanding_pings: u32,
    pub inbox_prefix: String,
}

impl ConnectOptions {
    pub fn builder(host: impl Into<String>, port: u16) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(2),
            credentials: Credentials::None,
            tls: TlsOptions::default(),
            name: None,
            verbose: false,
            pedantic: false,
            echo: true,
            ping_interval: Duration::from_secs(30),
            max_outstanding_pings: 2,
            inbox_prefix: format!("_INBOX.{}", random_inbox_suffix()),
        }
    }
}

pub struct ConnectOptionsBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    credentials: Credentials,
    tls: TlsOptions,
    name: Option<String>,
    verbose: bool,
    pedantic: bool,
    echo: bool,
    ping_interval: Duration,
    max_outstanding_pings: u32,
    inbox_prefix: String,
}

impl ConnectOptionsBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_pass(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.credentials = Credentials::UserPass {
            user: user.into(),
            pass: pass.into(),
        };
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Token(token.into());
        self
    }

    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls = TlsOptions { enabled };
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn pedantic(mut self, pedantic: bool) -> Self {
        self.pedantic = pedantic;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn max_outstanding_pings(mut self, max: u32) -> Self {
        self.max_outstanding_pings = max;
        self
    }

    pub fn inbox_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.inbox_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<ConnectOptions, ConnectError> {
        if self.connect_timeout.is_zero() {
            return Err(ConnectError::Other(
                "connect_timeout must be greater than zero".into(),
            ));
        }
        if self.max_outstanding_pings == 0 {
            return Err(ConnectError::Other(
                "max_outstanding_pings must be at least 1".into(),
            ));
        }
        Ok(ConnectOptions {
            host: self.host,
            port: self.port,
            connect_timeout: self.connect_timeout,
            credentials: self.credentials,
            tls: self.tls,
            name: self.name,
            verbose: self.verbose,
            pedantic: self.pedantic,
            echo: self.echo,
            ping_interval: self.ping_interval,
            max_outstanding_pings: self.max_outstanding_pings,
            inbox_prefix: self.inbox_prefix,
        })
    }
}

fn random_inbox_suffix() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| {
            let n: u8 = rng.gen_range(0..36);
            std::char::from_digit(n as u32, 36).unwrap()
        })
        .collect()
}

/// Capabilities advertised by the server, checked once at handshake time.
#[derive(Debug, Clone)]
pub struct ServerCapabilities(pub ServerInfo);

impl ServerCapabilities {
    /// Implements the capability-mismatch invariant: a server that
    /// requires TLS but whose client did not opt into TLS must fail the
    /// handshake rather than silently send `CONNECT` in the clear.
    pub fn check_tls(&self, tls: &TlsOptions) -> Result<(), ConnectError> {
        if self.0.tls_required && !tls.enabled {
            return Err(ConnectError::TlsHandshake(
                "server requires TLS but the client did not enable it".into(),
            ));
        }
        Ok(())
    }

    pub fn check_auth(&self, credentials: &Credentials) -> Result<(), ConnectError> {
        if self.0.auth_required && matches!(credentials, Credentials::None) {
            return Err(ConnectError::AuthFailed(
                "server requires authentication but no credentials were configured".into(),
            ));
        }
        Ok(())
    }

    pub fn max_payload(&self) -> i64 {
        self.0.max_payload
    }

    pub fn headers_supported(&self) -> bool {
        self.0.headers
    }

    pub fn stream_layer_enabled(&self) -> bool {
        self.0.stream_layer_enabled
    }
}
