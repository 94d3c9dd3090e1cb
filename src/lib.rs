//! # email-feed
//!
//! Turns the unread messages of an IMAP mailbox into an RSS feed of subject
//! lines. Meant to be run periodically from cron.
//!
//! A run:
//! - loads an INI configuration file with `[main]` and `[imap]` sections
//! - logs in over implicit TLS and searches the folder for `UNSEEN` messages
//! - peeks at each message's Subject/Date/From headers (messages stay unread)
//! - renders an RSS 2.0 document, newest first, and atomically replaces
//!   `<rss_base>.xml` in the feed directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use email_feed::{runner, FeedConfig};
//!
//! # async fn example() -> email_feed::Result<()> {
//! let config = FeedConfig::from_file("/etc/email-feed.cfg")?;
//! let report = runner::run(&config).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Rendering Without a Server
//!
//! ```
//! use chrono::Utc;
//! use email_feed::feed::{render_feed, FeedChannel, FeedItem};
//!
//! let channel = FeedChannel {
//!     name: "Alice".into(),
//!     link: "https://mail.example.com/".into(),
//!     url_base: "example.com".into(),
//!     rss_base: "mail".into(),
//!     generator: "email-feed".into(),
//! };
//! let items = [FeedItem {
//!     title: "Tom & Jerry".into(),
//!     link: "https://mail.example.com/".into(),
//!     date: "Mon, 1 Jan 2024 00:00:00 +0000".into(),
//! }];
//!
//! let xml = render_feed(&channel, &items, Utc::now());
//! assert!(xml.contains("<title>Tom &amp; Jerry</title>"));
//! ```
//!
//! ## Error Handling
//!
//! Every failure bubbles up to [`runner::run`] as an [`Error`]. Use
//! [`Error::category`] and [`Error::is_retryable`] to describe it:
//!
//! ```
//! use email_feed::Error;
//!
//! fn describe(error: &Error) -> String {
//!     if error.is_retryable() {
//!         format!("transient {} error, next run may succeed: {error}", error.category())
//!     } else {
//!         format!("{} error: {error}", error.category())
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing`. IMAP steps emit spans:
//!
//! - `MailFetcher::connect` - TLS connection
//! - `MailFetcher::login` - Login and folder selection
//! - `MailFetcher::fetch_unseen` - Search and header fetches
//! - `session::fetch_header_fields` - One message
//! - `feed::write_feed` - Rendering and file replacement
//! - `runner::run` - The whole run

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod logging;
pub mod runner;
pub mod sections;

// Internal modules
mod connection;
mod parser;
mod session;
#[cfg(test)]
mod test_support;

// Re-exports for ergonomic API
pub use config::{FeedConfig, ImapConfig, ImapConfigBuilder, MainConfig, TimeoutConfig};
pub use connection::{ImapStream, TlsStream};
pub use error::{Error, ErrorCategory, Result};
pub use feed::{FeedChannel, FeedItem, FeedStatus};
pub use fetcher::MailFetcher;
pub use runner::RunReport;
pub use sections::{ConfigFile, Section};
