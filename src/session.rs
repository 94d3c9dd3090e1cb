//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling.

use crate::connection::ImapStream;
use crate::error::{Error, Result};
use async_imap::Session;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Header fields requested per message. `BODY.PEEK` leaves `\Seen` untouched.
pub(crate) const HEADER_FIELDS_QUERY: &str = "(BODY.PEEK[HEADER.FIELDS (SUBJECT DATE FROM)])";

/// Authentication configuration for IMAP.
pub(crate) struct AuthConfig<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

/// Authenticates to IMAP server and returns a session.
#[instrument(name = "session::authenticate", skip_all, fields(user = %config.user))]
pub(crate) async fn authenticate<T: ImapStream>(
    stream: T,
    config: &AuthConfig<'_>,
) -> Result<Session<T>> {
    let client = async_imap::Client::new(stream);

    debug!("Authenticating to IMAP server");

    client
        .login(config.user, config.password)
        .await
        .map_err(|e| Error::ImapLogin {
            user: config.user.to_string(),
            source: e.0,
        })
}

/// Selects a mailbox (typically "INBOX").
#[instrument(name = "session::select", skip(session), fields(mailbox = %mailbox))]
pub(crate) async fn select_mailbox<T: ImapStream>(
    session: &mut Session<T>,
    mailbox: &str,
) -> Result<()> {
    debug!("Selecting mailbox");

    let status = session
        .select(mailbox)
        .await
        .map_err(|source| Error::SelectMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

    debug!(exists = status.exists, "Mailbox selected");

    Ok(())
}

/// Returns the sequence numbers of unseen messages in ascending order.
///
/// SEARCH answers with an unordered set; ascending order is the order
/// servers list the matches in.
#[instrument(name = "session::search_unseen", skip(session))]
pub(crate) async fn search_unseen<T: ImapStream>(session: &mut Session<T>) -> Result<Vec<u32>> {
    let found = session
        .search("UNSEEN")
        .await
        .map_err(|source| Error::ImapSearch { source })?;

    let mut seqs: Vec<u32> = found.into_iter().collect();
    seqs.sort_unstable();

    debug!("There are {} UNSEEN items.", seqs.len());

    Ok(seqs)
}

/// Fetches the Subject/Date/From header block of one message without
/// marking it read.
///
/// async-imap ends the response stream at the tagged completion whatever
/// its status, so a `NO` with no data surfaces as [`Error::MissingHeaders`].
#[instrument(name = "session::fetch_header_fields", skip(session))]
pub(crate) async fn fetch_header_fields<T: ImapStream>(
    session: &mut Session<T>,
    seq: u32,
) -> Result<Vec<u8>> {
    let mut stream = session
        .fetch(seq.to_string(), HEADER_FIELDS_QUERY)
        .await
        .map_err(|source| Error::ImapFetch { seq, source })?
        .boxed();

    let mut header = None;

    // The stream has to be drained before the session can issue another command.
    while let Some(fetch_result) = stream.next().await {
        let fetch = fetch_result.map_err(|source| Error::ImapFetch { seq, source })?;

        if fetch.message != seq {
            debug!(other = fetch.message, "Ignoring unsolicited FETCH response");
            continue;
        }

        if let Some(bytes) = fetch.header().or_else(|| fetch.body()) {
            header = Some(bytes.to_vec());
        }
    }

    header.ok_or(Error::MissingHeaders { seq })
}

/// Closes the selected mailbox.
#[instrument(name = "session::close", skip(session))]
pub(crate) async fn close<T: ImapStream>(session: &mut Session<T>) -> Result<()> {
    debug!("Closing mailbox");

    session
        .close()
        .await
        .map_err(|source| Error::ImapClose { source })
}

/// Logs out from IMAP session.
#[instrument(name = "session::logout", skip(session))]
pub(crate) async fn logout<T: ImapStream>(session: &mut Session<T>) -> Result<()> {
    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}
