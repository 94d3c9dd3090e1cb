//! Internal module for parsing fetched header blocks.

use crate::feed::FeedItem;
use mailparse::{parse_headers, MailHeader, MailHeaderMap, MailParseError};
use tracing::debug;

/// RFC 2047 encoded words start with this marker.
const ENCODED_WORD_MARKER: &str = "=?";

/// The header fields a feed item is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MessageHeaders {
    pub subject: String,
    pub from: String,
    pub date: String,
}

impl MessageHeaders {
    /// Turns the headers into a feed item pointing at `link`.
    pub(crate) fn into_feed_item(self, link: &str) -> FeedItem {
        FeedItem {
            title: self.subject,
            link: link.to_string(),
            date: self.date,
        }
    }
}

/// Parses a `HEADER.FIELDS` block.
///
/// Absent fields come back as empty strings.
pub(crate) fn parse_header_fields(raw: &[u8]) -> Result<MessageHeaders, MailParseError> {
    let (headers, _) = parse_headers(raw)?;

    let subject = headers
        .get_first_header("Subject")
        .map(decode_subject)
        .unwrap_or_default();
    let from = headers.get_first_value("From").unwrap_or_default();
    let date = headers.get_first_value("Date").unwrap_or_default();

    debug!("    Subject: {}", subject);
    debug!("    From: {}", from);
    debug!("    Date: {}", date);

    Ok(MessageHeaders {
        subject,
        from,
        date,
    })
}

/// Decodes a Subject header.
///
/// Encoded-word subjects are decoded with their declared charset. Anything
/// else is taken as UTF-8 text and only unfolded.
fn decode_subject(header: &MailHeader<'_>) -> String {
    let raw = unfold(&String::from_utf8_lossy(header.get_value_raw()));

    if raw.starts_with(ENCODED_WORD_MARKER) {
        header.get_value().trim().to_string()
    } else {
        raw
    }
}

/// Removes header folding (CRLF before continuation whitespace).
fn unfold(value: &str) -> String {
    value
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<String>()
        .trim()
        .to_string()
}
