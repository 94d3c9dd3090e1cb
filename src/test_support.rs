//! Scripted IMAP server over an in-memory duplex pipe.

use crate::config::ImapConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// Header block the scripted server returns for message `seq`.
pub(crate) fn headers_for(seq: u32) -> String {
    format!(
        "Subject: Message {seq}\r\nDate: Mon, 1 Jan 2024 08:00:0{seq} +0000\r\n\
         From: bob@example.com\r\n\r\n"
    )
}

/// Untagged FETCH response carrying `headers` as a literal.
pub(crate) fn fetch_reply(seq: u32, headers: &str) -> String {
    format!(
        "* {seq} FETCH (BODY[HEADER.FIELDS (SUBJECT DATE FROM)] {{{}}}\r\n{headers})",
        headers.len()
    )
}

/// Sequence number at the start of a FETCH command's arguments.
pub(crate) fn fetch_seq(args: &str) -> u32 {
    args.split(' ')
        .next()
        .and_then(|seq| seq.parse().ok())
        .unwrap_or_default()
}

/// Replies a healthy server gives to everything but FETCH.
///
/// `unseen` is the SEARCH result, listed as given.
pub(crate) fn standard_reply(tag: &str, command: &str, unseen: &[u32]) -> Vec<String> {
    match command {
        "SELECT" => vec![
            format!("* {} EXISTS", unseen.len()),
            "* FLAGS (\\Seen \\Answered)".to_string(),
            format!("{tag} OK [READ-WRITE] SELECT completed"),
        ],
        "SEARCH" => {
            let ids: Vec<String> = unseen.iter().map(u32::to_string).collect();
            vec![
                format!("* SEARCH {}", ids.join(" ")).trim_end().to_string(),
                format!("{tag} OK SEARCH completed"),
            ]
        }
        _ => vec![format!("{tag} OK {command} completed")],
    }
}

/// Spawns a server that answers each tagged command with `respond(tag,
/// command, args)` and acknowledges LOGOUT itself.
///
/// The handle yields every command line received, in order.
pub(crate) fn scripted_server<F>(mut respond: F) -> (DuplexStream, JoinHandle<Vec<String>>)
where
    F: FnMut(&str, &str, &str) -> Vec<String> + Send + 'static,
{
    let (client, server) = tokio::io::duplex(64 * 1024);

    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();

        while let Ok(Some(line)) = lines.next_line().await {
            let mut parts = line.splitn(3, ' ');
            let tag = parts.next().unwrap_or_default().to_string();
            let command = parts.next().unwrap_or_default().to_ascii_uppercase();
            let args = parts.next().unwrap_or_default().to_string();
            received.push(line);

            let logout = command == "LOGOUT";
            let reply = if logout {
                vec![
                    "* BYE logging out".to_string(),
                    format!("{tag} OK LOGOUT completed"),
                ]
            } else {
                respond(&tag, &command, &args)
            };

            for reply_line in reply {
                write.write_all(reply_line.as_bytes()).await.unwrap();
                write.write_all(b"\r\n").await.unwrap();
            }
            write.flush().await.unwrap();

            if logout {
                break;
            }
        }

        received
    });

    (client, handle)
}

/// Command names (second word) of the received lines.
pub(crate) fn command_names(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.split(' ').nth(1))
        .map(str::to_ascii_uppercase)
        .collect()
}

pub(crate) fn imap_config() -> ImapConfig {
    ImapConfig::builder()
        .host("imap.example.com")
        .user("alice")
        .password("secret")
        .webmail("https://mail.example.com/")
        .build()
        .unwrap()
}
