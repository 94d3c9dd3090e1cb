//! Error types for the email-feed crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Errors are categorized by their retryability - see [`Error::is_retryable`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a mailbox into a feed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// The configuration file could not be read.
    #[error("failed to load configuration from {}", path.display())]
    ConfigLoad {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying loader error.
        #[source]
        source: ini::Error,
    },

    /// The configuration file is syntactically invalid.
    #[error("malformed configuration")]
    ConfigParse {
        /// The underlying parse error (carries line and column).
        #[source]
        source: ini::ParseError,
    },

    /// A required section is absent from the configuration.
    #[error("configuration is missing section [{section}]")]
    MissingSection {
        /// The section name.
        section: String,
    },

    /// A required key is absent from a configuration section.
    #[error("configuration section [{section}] is missing key '{key}'")]
    MissingKey {
        /// The section name.
        section: String,
        /// The missing key.
        key: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    /// The log file could not be opened.
    #[error("failed to open log file {}", path.display())]
    LogInit {
        /// Path of the log file.
        path: PathBuf,
        /// The underlying appender error.
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    /// Another global log subscriber was installed first.
    #[error("cannot log to {}: a log subscriber is already installed", path.display())]
    LogInstall {
        /// Path of the log file.
        path: PathBuf,
        /// The underlying subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network / connection errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Timeout errors (RETRYABLE except logout)
    // ─────────────────────────────────────────────────────────────────────────
    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {user} after {timeout:?}")]
    AuthTimeout {
        /// The login name used for authentication.
        user: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox selection timeout.
    #[error("mailbox selection timeout for '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Search timeout.
    #[error("UNSEEN search timeout after {timeout:?}")]
    SearchTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Header fetch timeout.
    #[error("header fetch timeout for message {seq} after {timeout:?}")]
    FetchTimeout {
        /// Sequence number of the message.
        seq: u32,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Close/logout timeout.
    #[error("logout timeout after {timeout:?}")]
    LogoutTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors (RETRYABLE - could be transient server issues)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    #[error("IMAP login failed for {user}")]
    ImapLogin {
        /// The login name.
        user: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to select mailbox.
    #[error("failed to select mailbox '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// The UNSEEN search returned a non-OK status.
    #[error("getting the list of unseen messages failed")]
    ImapSearch {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Fetching a message's headers returned a non-OK status.
    #[error("fetching message {seq} failed")]
    ImapFetch {
        /// Sequence number of the message.
        seq: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// A fetch completed without the requested header section, including a
    /// fetch the server refused.
    #[error("server returned no headers for message {seq}")]
    MissingHeaders {
        /// Sequence number of the message.
        seq: u32,
    },

    /// IMAP CLOSE failed.
    #[error("IMAP close failed")]
    ImapClose {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Parsing errors (NOT retryable - malformed content won't change)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse a message's header block.
    #[error("failed to parse headers of message {seq}")]
    ParseHeaders {
        /// Sequence number of the message.
        seq: u32,
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Output errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to write the temporary feed file.
    #[error("failed to write feed file in {}", path.display())]
    FeedWrite {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to move the finished feed over the destination.
    #[error("failed to replace feed file {}", path.display())]
    FeedPersist {
        /// The destination path.
        path: PathBuf,
        /// The underlying rename error.
        #[source]
        source: tempfile::PersistError,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that the
    /// next scheduled run might not hit.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::SearchTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::ImapClose { .. } => true,

            Error::ConfigLoad { .. }
            | Error::ConfigParse { .. }
            | Error::MissingSection { .. }
            | Error::MissingKey { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::LogInit { .. }
            | Error::LogInstall { .. }
            | Error::LogoutTimeout { .. }
            | Error::ImapLogout { .. }
            | Error::MissingHeaders { .. }
            | Error::ParseHeaders { .. }
            | Error::FeedWrite { .. }
            | Error::FeedPersist { .. } => false,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConfigLoad { .. }
            | Error::ConfigParse { .. }
            | Error::MissingSection { .. }
            | Error::MissingKey { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::LogInit { .. }
            | Error::LogInstall { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. } | Error::TlsConnect { .. } => ErrorCategory::Network,

            Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::SearchTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::LogoutTimeout { .. } => ErrorCategory::Timeout,

            Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::MissingHeaders { .. }
            | Error::ImapClose { .. }
            | Error::ImapLogout { .. } => ErrorCategory::Protocol,

            Error::ParseHeaders { .. } => ErrorCategory::Parse,

            Error::FeedWrite { .. } | Error::FeedPersist { .. } => ErrorCategory::Output,
        }
    }
}

/// Error categories for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// Timeout errors.
    Timeout,
    /// IMAP protocol errors.
    Protocol,
    /// Header parsing errors.
    Parse,
    /// Feed file errors.
    Output,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::Output => write!(f, "output"),
        }
    }
}
