//! IMAP fetcher that turns unseen messages into feed items.
//!
//! The [`MailFetcher`] owns one authenticated session for the length of a
//! run. Every IMAP step is bounded by the matching [`TimeoutConfig`] entry.
//!
//! # Example
//!
//! ```no_run
//! use email_feed::{ImapConfig, MailFetcher};
//!
//! # async fn example() -> email_feed::Result<()> {
//! let config = ImapConfig::builder()
//!     .host("imap.example.com")
//!     .user("alice")
//!     .password("app-password")
//!     .webmail("https://mail.example.com/")
//!     .build()?;
//!
//! let mut fetcher = MailFetcher::connect(&config).await?;
//! let items = fetcher.fetch_unseen().await?;
//! println!("{} unseen", items.len());
//! fetcher.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TimeoutConfig`]: crate::config::TimeoutConfig

use crate::config::ImapConfig;
use crate::connection::{self, ImapStream, TlsStream};
use crate::error::{Error, Result};
use crate::feed::FeedItem;
use crate::parser;
use crate::session::{self, AuthConfig};
use async_imap::Session;
use tracing::{debug, instrument, warn};

/// One IMAP session used to collect unseen messages.
///
/// # Lifecycle
///
/// 1. [`connect`](MailFetcher::connect) logs in and selects the folder
/// 2. [`fetch_unseen`](Self::fetch_unseen) collects the items
/// 3. [`close`](Self::close) closes the folder and logs out, or
///    [`abandon`](Self::abandon) logs out after a failure
pub struct MailFetcher<T: ImapStream = TlsStream> {
    session: Box<Session<T>>,
    config: ImapConfig,
}

impl MailFetcher<TlsStream> {
    /// Connects to the IMAP server, authenticates and selects the folder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection cannot be established
    /// - Authentication fails
    /// - Mailbox selection fails
    #[instrument(
        name = "MailFetcher::connect",
        skip_all,
        fields(user = %config.user(), imap_host = %config.host)
    )]
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        let target_addr = config.server_address();
        let timeout = config.timeouts.connect;

        let tls_stream = tokio::time::timeout(
            timeout,
            connection::establish_tls_connection(&config.host, &target_addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout,
        })??;

        debug!("TLS connection established");

        Self::login(tls_stream, config).await
    }
}

impl<T: ImapStream> MailFetcher<T> {
    /// Authenticates over an already connected `stream` and selects the
    /// folder.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or mailbox selection fails or
    /// times out. A session whose select failed is logged out first.
    #[instrument(name = "MailFetcher::login", skip_all, fields(folder = %config.folder))]
    pub async fn login(stream: T, config: &ImapConfig) -> Result<Self> {
        let timeouts = &config.timeouts;

        let auth_config = AuthConfig {
            user: config.user(),
            password: config.password(),
        };

        let mut session = tokio::time::timeout(
            timeouts.auth,
            session::authenticate(stream, &auth_config),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            user: config.user().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        let selected = tokio::time::timeout(
            timeouts.select,
            session::select_mailbox(&mut session, &config.folder),
        )
        .await
        .map_err(|_| Error::SelectTimeout {
            mailbox: config.folder.clone(),
            timeout: timeouts.select,
        })
        .and_then(|result| result);

        if let Err(e) = selected {
            if let Err(logout_err) = session::logout(&mut session).await {
                warn!(error = %logout_err, "Logout after failed select failed");
            }
            return Err(e);
        }

        debug!(folder = %config.folder, "Fetcher connected and ready");

        Ok(Self {
            session: Box::new(session),
            config: config.clone(),
        })
    }

    /// Returns one feed item per unseen message, in ascending sequence order.
    ///
    /// Headers are fetched with `BODY.PEEK`, so the messages stay unseen.
    ///
    /// # Errors
    ///
    /// Fails on the first message whose headers cannot be fetched or parsed;
    /// no partial list is returned.
    #[instrument(name = "MailFetcher::fetch_unseen", skip(self))]
    pub async fn fetch_unseen(&mut self) -> Result<Vec<FeedItem>> {
        let timeouts = &self.config.timeouts;

        let seqs = tokio::time::timeout(timeouts.search, session::search_unseen(&mut self.session))
            .await
            .map_err(|_| Error::SearchTimeout {
                timeout: timeouts.search,
            })??;

        let mut items = Vec::with_capacity(seqs.len());

        for seq in seqs {
            let raw = tokio::time::timeout(
                timeouts.fetch,
                session::fetch_header_fields(&mut self.session, seq),
            )
            .await
            .map_err(|_| Error::FetchTimeout {
                seq,
                timeout: timeouts.fetch,
            })??;

            debug!("Fetched message {}.", seq);

            let headers = parser::parse_header_fields(&raw)
                .map_err(|source| Error::ParseHeaders { seq, source })?;

            items.push(headers.into_feed_item(&self.config.webmail));
        }

        Ok(items)
    }

    /// Closes the folder and logs out.
    ///
    /// # Errors
    ///
    /// Returns an error if CLOSE or LOGOUT fails or times out.
    #[instrument(name = "MailFetcher::close", skip(self))]
    pub async fn close(mut self) -> Result<()> {
        let timeout = self.config.timeouts.logout;

        tokio::time::timeout(timeout, async {
            session::close(&mut self.session).await?;
            session::logout(&mut self.session).await
        })
        .await
        .map_err(|_| Error::LogoutTimeout { timeout })?
    }

    /// Logs out without closing the folder, ignoring failures.
    ///
    /// Used when a run is already failing; the original error is what matters.
    #[instrument(name = "MailFetcher::abandon", skip(self))]
    pub async fn abandon(mut self) {
        let timeout = self.config.timeouts.logout;

        match tokio::time::timeout(timeout, session::logout(&mut self.session)).await {
            Ok(Ok(())) => debug!("Logged out after failure"),
            Ok(Err(e)) => warn!(error = %e, "Logout after failure failed"),
            Err(_) => warn!(
                timeout_secs = timeout.as_secs(),
                "Logout after failure timed out"
            ),
        }
    }
}

impl<T: ImapStream> std::fmt::Debug for MailFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailFetcher")
            .field("user", &self.config.user())
            .field("imap_host", &self.config.host)
            .field("folder", &self.config.folder)
            .finish_non_exhaustive()
    }
}
