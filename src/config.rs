//! Typed configuration for the feed job.
//!
//! A configuration file has two sections:
//!
//! ```ini
//! [main]
//! name = Alice
//! url_base = example.com
//! rss_base = mail
//! logfile = email-feed.log
//!
//! [imap]
//! mailbox = imap.example.com
//! user = alice
//! password = app-password
//! webmail = https://mail.example.com/
//! ```
//!
//! Load it with [`FeedConfig::from_file`]. All required keys are checked there,
//! before any connection is attempted.
//!
//! The IMAP side can also be built in code:
//!
//! ```
//! use email_feed::ImapConfig;
//!
//! let config = ImapConfig::builder()
//!     .host("imap.example.com")
//!     .user("alice")
//!     .password("app-password")
//!     .webmail("https://mail.example.com/")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.server_address(), "imap.example.com:993");
//! ```

use crate::error::{Error, Result};
use crate::sections::{ConfigFile, Section};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory the feed is written to unless `[main] feed_dir` says otherwise.
pub const DEFAULT_FEED_DIR: &str = "/var/www/html";

/// Mailbox selected unless `[imap] folder` says otherwise.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Complete configuration for one run.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// The `[main]` section.
    pub main: MainConfig,
    /// The `[imap]` section.
    pub imap: ImapConfig,
}

impl FeedConfig {
    /// Loads and validates the configuration file at `path`.
    ///
    /// A relative `logfile` is resolved against the directory holding the
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded, or if a required
    /// section or key is missing or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = ConfigFile::load(path)?;
        let mut config = Self::from_sections(&file)?;

        if config.main.logfile.is_relative() {
            if let Some(dir) = path.parent() {
                config.main.logfile = dir.join(&config.main.logfile);
            }
        }

        Ok(config)
    }

    /// Builds the configuration from already-loaded sections.
    ///
    /// # Errors
    ///
    /// Returns an error if a required section or key is missing or invalid.
    pub fn from_sections(file: &ConfigFile) -> Result<Self> {
        let main = MainConfig::from_section(file.require_section("main")?)?;
        let imap = ImapConfig::from_section(file.require_section("imap")?)?;
        Ok(Self { main, imap })
    }
}

/// Feed identity and output locations (`[main]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainConfig {
    /// Owner name shown in the feed title.
    pub name: String,
    /// Host (and optional path) the feed is served from, without scheme.
    pub url_base: String,
    /// Base file name of the feed; the file is `<rss_base>.xml`.
    pub rss_base: String,
    /// Log file path.
    pub logfile: PathBuf,
    /// Directory the feed file is written to.
    pub feed_dir: PathBuf,
}

impl MainConfig {
    fn from_section(section: &Section) -> Result<Self> {
        let rss_base = section.require("rss_base")?;
        if rss_base.is_empty() || rss_base.contains(['/', '\\']) {
            return Err(Error::InvalidConfig {
                message: format!("rss_base must be a plain file name, got '{rss_base}'"),
            });
        }

        Ok(Self {
            name: section.require("name")?.to_string(),
            url_base: section.require("url_base")?.to_string(),
            rss_base: rss_base.to_string(),
            logfile: PathBuf::from(section.require("logfile")?),
            feed_dir: PathBuf::from(section.get("feed_dir").unwrap_or(DEFAULT_FEED_DIR)),
        })
    }
}

/// Configuration for connecting to the IMAP server (`[imap]`).
///
/// Create using [`ImapConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials.
#[derive(Clone)]
pub struct ImapConfig {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (default: 993 for IMAPS).
    pub port: u16,
    /// Login name.
    user: String,
    /// Login password (protected from accidental logging).
    password: SecretString,
    /// Webmail URL used as the link of every feed item.
    pub webmail: String,
    /// Mailbox to search for unseen messages.
    pub folder: String,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("webmail", &self.webmail)
            .field("folder", &self.folder)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ImapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ImapConfigBuilder {
        ImapConfigBuilder::default()
    }

    /// Returns the login name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the password as a string slice.
    ///
    /// The password is intentionally not directly accessible to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_section(section: &Section) -> Result<Self> {
        let mut builder = Self::builder()
            .host(section.require("mailbox")?)
            .user(section.require("user")?)
            .password(section.require("password")?)
            .webmail(section.require("webmail")?);

        if let Some(port) = section.get("port") {
            let port = port.trim().parse().map_err(|_| Error::InvalidConfig {
                message: format!("[imap] port must be a number between 1 and 65535, got '{port}'"),
            })?;
            builder = builder.port(port);
        }

        if let Some(folder) = section.get("folder") {
            builder = builder.folder(folder);
        }

        builder.build()
    }
}

/// Timeout configuration for the IMAP steps of a run.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting a mailbox.
    pub select: Duration,
    /// Timeout for the UNSEEN search.
    pub search: Duration,
    /// Timeout for fetching one message's headers.
    pub fetch: Duration,
    /// Timeout for close and logout.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            search: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
            logout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`ImapConfig`].
#[derive(Debug, Default)]
pub struct ImapConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    webmail: Option<String>,
    folder: Option<String>,
    timeouts: Option<TimeoutConfig>,
}

impl ImapConfigBuilder {
    /// Sets the IMAP server hostname (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    ///
    /// Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the login name (required).
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the password (required).
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the webmail URL that feed items link to (required).
    #[must_use]
    pub fn webmail(mut self, webmail: impl Into<String>) -> Self {
        self.webmail = Some(webmail.into());
        self
    }

    /// Sets the mailbox to search. Default is `INBOX`.
    #[must_use]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<ImapConfig> {
        let host = required(self.host, "host")?;
        if host.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "host must not be empty".into(),
            });
        }

        let port = self.port.unwrap_or(DEFAULT_IMAP_PORT);
        if port == 0 {
            return Err(Error::InvalidConfig {
                message: "port must not be 0".into(),
            });
        }

        Ok(ImapConfig {
            host: host.trim().to_string(),
            port,
            user: required(self.user, "user")?,
            password: SecretString::from(required(self.password, "password")?),
            webmail: required(self.webmail, "webmail")?,
            folder: self.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            timeouts: self.timeouts.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| Error::InvalidConfig {
        message: format!("{field} is required"),
    })
}
