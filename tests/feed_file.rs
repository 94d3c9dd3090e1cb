//! Feed file and configuration behavior, exercised through the public API.

use chrono::{TimeZone, Utc};
use email_feed::feed::{item_guid, render_feed, write_feed};
use email_feed::{Error, FeedChannel, FeedConfig, FeedItem, FeedStatus};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;

fn channel() -> FeedChannel {
    FeedChannel {
        name: "Alice <alice@example.com>".into(),
        link: "https://mail.example.com/?_task=mail&_mbox=INBOX".into(),
        url_base: "example.com".into(),
        rss_base: "mail".into(),
        generator: "email-feed".into(),
    }
}

fn items() -> Vec<FeedItem> {
    [
        ("Re: <urgent> \"budget\" & 'plans'", "Mon, 1 Jan 2024 08:00:00 +0000"),
        ("Caf\u{e9} meeting", "Tue, 2 Jan 2024 09:15:00 +0100 (CET)"),
        ("", ""),
    ]
    .into_iter()
    .map(|(title, date)| FeedItem {
        title: title.into(),
        link: "https://mail.example.com/?_task=mail&_uid=1".into(),
        date: date.into(),
    })
    .collect()
}

/// Parses the whole document, returning the number of `<item>` elements and
/// the text of every item `<title>` in document order.
fn parse_items(xml: &str) -> (usize, Vec<String>) {
    let mut reader = Reader::from_str(xml);
    let mut count = 0;
    let mut titles = Vec::new();
    let mut in_item = false;
    let mut in_title = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => {
                    count += 1;
                    in_item = true;
                    titles.push(String::new());
                }
                b"title" if in_item => in_title = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => in_item = false,
                b"title" => in_title = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_title => {
                let text = t.unescape().expect("valid entity references");
                if let Some(last) = titles.last_mut() {
                    last.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("feed is not well-formed XML: {e}"),
        }
    }

    (count, titles)
}

#[test]
fn test_rendered_feed_is_well_formed_with_one_item_each() {
    let now = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    let items = items();

    let xml = render_feed(&channel(), &items, now);
    let (count, titles) = parse_items(&xml);

    assert_eq!(count, items.len());
    // Newest (last fetched) first
    assert_eq!(
        titles,
        vec![
            String::new(),
            "Caf\u{e9} meeting".to_string(),
            "Re: <urgent> \"budget\" & 'plans'".to_string(),
        ]
    );
}

#[test]
fn test_guid_uses_escaped_title() {
    let now = Utc::now();
    let items = items();
    let xml = render_feed(&channel(), &items[..1], now);

    let expected = item_guid(
        "Re: &lt;urgent&gt; &quot;budget&quot; &amp; &#x27;plans&#x27;",
        "Mon, 1 Jan 2024 08:00:00 +0000",
    );
    assert!(xml.contains(&expected));
}

#[test]
fn test_empty_run_leaves_existing_feed_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("mail.xml");
    fs::write(&dest, b"<rss>previous</rss>").unwrap();

    let status = write_feed(dir.path(), &channel(), &[], Utc::now()).unwrap();

    assert_eq!(status, FeedStatus::Unchanged);
    assert_eq!(status.to_string(), "OK");
    assert_eq!(fs::read(&dest).unwrap(), b"<rss>previous</rss>");
}

#[test]
fn test_update_replaces_existing_feed() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("mail.xml");
    fs::write(&dest, b"<rss>previous</rss>").unwrap();

    let items = items();
    let status = write_feed(dir.path(), &channel(), &items, Utc::now()).unwrap();

    assert_eq!(status.to_string(), "OK (You got 3 new messages.)");
    let xml = fs::read_to_string(&dest).unwrap();
    assert_eq!(parse_items(&xml).0, 3);
}

#[test]
fn test_failed_write_keeps_previous_feed() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("mail.xml");
    fs::write(&dest, b"<rss>previous</rss>").unwrap();

    // The destination name is taken by a non-empty directory, so the rename fails
    let mut blocked = channel();
    blocked.rss_base = "blocked".into();
    let blocked_dir = dir.path().join("blocked.xml");
    fs::create_dir(&blocked_dir).unwrap();
    fs::write(blocked_dir.join("keep"), b"x").unwrap();

    let err = write_feed(dir.path(), &blocked, &items(), Utc::now()).unwrap_err();
    assert!(matches!(err, Error::FeedPersist { .. }));
    assert_eq!(fs::read(&dest).unwrap(), b"<rss>previous</rss>");
}

#[test]
fn test_config_missing_key_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("email-feed.cfg");
    fs::write(
        &path,
        "[main]\nname = Alice\nurl_base = example.com\nrss_base = mail\nlogfile = feed.log\n\
         [imap]\nmailbox = imap.example.com\nuser = alice\nwebmail = https://mail.example.com/\n",
    )
    .unwrap();

    let err = FeedConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref key, .. } if key == "password"));
}

#[test]
fn test_config_relative_logfile_resolves_next_to_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("email-feed.cfg");
    fs::write(
        &path,
        "[main]\nname = Alice\nurl_base = example.com\nrss_base = mail\nlogfile = feed.log\n\
         [imap]\nmailbox = imap.example.com\nuser = alice\npassword = secret\n\
         webmail = https://mail.example.com/\n",
    )
    .unwrap();

    let config = FeedConfig::from_file(&path).unwrap();
    assert_eq!(config.main.logfile, dir.path().join("feed.log"));
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = FeedConfig::from_file(dir.path().join("absent.cfg")).unwrap_err();
    assert_eq!(err.category(), email_feed::ErrorCategory::Configuration);
}
