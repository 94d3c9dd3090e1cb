//! RSS 2.0 rendering and atomic replacement of the feed file.
//!
//! Items are rendered newest first into a fixed template. The document is
//! written to a uniquely named temporary file in the feed directory and then
//! renamed over `<rss_base>.xml`, so readers only ever see a complete feed.
//!
//! ```
//! use email_feed::feed::{item_guid, FeedStatus};
//!
//! assert_eq!(item_guid("Hello", "Mon, 1 Jan 2024 00:00:00 +0000").len(), 40);
//! assert_eq!(FeedStatus::Updated { count: 2 }.to_string(), "OK (You got 2 new messages.)");
//! ```

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Trailing characters of the date left out of an item description.
const DESCRIPTION_DATE_TRIM: usize = 15;

/// RFC 822 timestamp used for the channel `pubDate`.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// One unseen message as it appears in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Decoded subject line.
    pub title: String,
    /// Link for the item (the webmail URL).
    pub link: String,
    /// The message's Date header, verbatim.
    pub date: String,
}

/// Channel-level fields of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    /// Owner name shown as "Emails for <name>".
    pub name: String,
    /// Channel link (the webmail URL).
    pub link: String,
    /// Host the feed is served from, without scheme.
    pub url_base: String,
    /// Base name of the feed file.
    pub rss_base: String,
    /// Program named in the channel description.
    pub generator: String,
}

impl FeedChannel {
    /// Builds the channel description from the run configuration.
    #[must_use]
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            name: config.main.name.clone(),
            link: config.imap.webmail.clone(),
            url_base: config.main.url_base.clone(),
            rss_base: config.main.rss_base.clone(),
            generator: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// File name of the published feed.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.xml", self.rss_base)
    }

    /// Public URL of the feed, used for the atom self link.
    #[must_use]
    pub fn self_link(&self) -> String {
        format!("http://{}/{}", self.url_base, self.file_name())
    }
}

/// Outcome of a feed update, as reported in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// There was nothing new; the feed file was not touched.
    Unchanged,
    /// The feed file was replaced with `count` items.
    Updated {
        /// Number of items written.
        count: usize,
    },
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Unchanged => write!(f, "OK"),
            FeedStatus::Updated { count } => write!(
                f,
                "OK (You got {count} new message{}.)",
                if *count > 1 { "s" } else { "" }
            ),
        }
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for inclusion in markup.
#[must_use]
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Feed entry identifier: hex SHA-1 of the escaped title followed by the raw date.
#[must_use]
pub fn item_guid(escaped_title: &str, date: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(escaped_title.as_bytes());
    hasher.update(date.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Drops the trailing zone/seconds part of a date for the description.
fn description_date(date: &str) -> &str {
    let len = date.chars().count();
    if len <= DESCRIPTION_DATE_TRIM {
        return "";
    }
    date.char_indices()
        .nth(len - DESCRIPTION_DATE_TRIM)
        .map_or(date, |(idx, _)| &date[..idx])
}

/// Renders the complete feed document. `items` are in fetch order; the
/// document lists them newest first.
#[must_use]
pub fn render_feed(channel: &FeedChannel, items: &[FeedItem], now: DateTime<Utc>) -> String {
    let mut doc = String::with_capacity(512 + items.len() * 320);

    // Writing into a String cannot fail.
    let _ = write!(
        doc,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">
<channel>
<title>Emails for {name}</title>
<link>{link}</link>
<atom:link href=\"{self_link}\" rel=\"self\" type=\"application/rss+xml\" />
<pubDate>{now}</pubDate>
<description>Feed automatically generated by {url_base}'s {generator}</description>
<language>en-us</language>
",
        name = escape_html(&channel.name),
        link = escape_html(&channel.link),
        self_link = escape_html(&channel.self_link()),
        now = now.format(PUB_DATE_FORMAT),
        url_base = escape_html(&channel.url_base),
        generator = escape_html(&channel.generator),
    );

    for item in items.iter().rev() {
        let title = escape_html(&item.title);
        let guid = item_guid(&title, &item.date);
        let _ = write!(
            doc,
            "<item>
<title>{title}</title>
<pubDate>{date}</pubDate>
<link>{link}</link>
<guid isPermaLink=\"false\">{guid}</guid>
<description>\"{title}\" sent on {sent}</description>
</item>
",
            date = escape_html(&item.date),
            link = escape_html(&item.link),
            sent = escape_html(description_date(&item.date)),
        );
    }

    doc.push_str("</channel></rss>");
    doc
}

/// Writes the feed into `feed_dir` if there are any items.
///
/// An empty `items` slice leaves the existing feed file untouched and
/// reports [`FeedStatus::Unchanged`].
///
/// # Errors
///
/// Returns [`Error::FeedWrite`] if the temporary file cannot be written and
/// [`Error::FeedPersist`] if it cannot be renamed over the feed file.
#[instrument(
    name = "feed::write_feed",
    skip_all,
    fields(feed_dir = %feed_dir.display(), items = items.len())
)]
pub fn write_feed(
    feed_dir: &Path,
    channel: &FeedChannel,
    items: &[FeedItem],
    now: DateTime<Utc>,
) -> Result<FeedStatus> {
    if items.is_empty() {
        debug!("No new items, feed left as is");
        return Ok(FeedStatus::Unchanged);
    }

    let document = render_feed(channel, items, now);
    let dest = feed_dir.join(channel.file_name());
    replace_file(feed_dir, &dest, document.as_bytes())?;

    debug!(dest = %dest.display(), bytes = document.len(), "Feed replaced");

    Ok(FeedStatus::Updated { count: items.len() })
}

/// Writes `contents` to a temporary file in `dir` and renames it to `dest`.
fn replace_file(dir: &Path, dest: &Path, contents: &[u8]) -> Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".email-feed.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_error(dir.to_path_buf()))?;

    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(write_error(temp.path().to_path_buf()))?;

    // The feed is served by a web server; tempfile creates files owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(write_error(temp.path().to_path_buf()))?;
    }

    temp.persist(dest).map_err(|source| Error::FeedPersist {
        path: dest.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn write_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> Error {
    move |source| Error::FeedWrite { path, source }
}
