//! File logging for cron runs.
//!
//! Lines go to the configured log file as `<minute timestamp> <message>`,
//! without level or target. The filter defaults to `info`; set `RUST_LOG`
//! (for example `RUST_LOG=email_feed=debug`) to see per-message detail.

use crate::error::{Error, Result};
use chrono::Local;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `2024-10-15 09:30` style timestamps.
struct MinuteTime;

impl FormatTime for MinuteTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M"))
    }
}

/// Installs the global subscriber writing to `logfile`.
///
/// The returned guard flushes buffered lines when dropped; keep it alive
/// until the process exits.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `logfile` has no file name,
/// [`Error::LogInit`] if the file cannot be opened and
/// [`Error::LogInstall`] if a global subscriber is already set.
pub fn init(logfile: &Path) -> Result<WorkerGuard> {
    let appender = file_appender(logfile)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer(writer))
        .try_init()
        .map_err(|source| Error::LogInstall {
            path: logfile.to_path_buf(),
            source,
        })?;

    Ok(guard)
}

/// Formats events for the log file.
fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_level(false)
        .with_target(false)
        .with_timer(MinuteTime)
}

/// Opens `logfile` for appending, creating its directory if needed.
fn file_appender(logfile: &Path) -> Result<RollingFileAppender> {
    let file_name = logfile
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidConfig {
            message: format!("logfile '{}' has no file name", logfile.display()),
        })?;

    let dir = match logfile.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|source| Error::LogInit {
            path: logfile.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_appender_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let logfile = dir.path().join("email-feed.log");

        let appender = file_appender(&logfile).unwrap();
        drop(appender);

        assert!(logfile.exists());
    }

    /// Collects formatted output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_line_is_timestamp_then_message() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber =
            tracing_subscriber::registry().with(file_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(" 3s OK (You got 2 new messages.)");
            tracing::error!("Exception: boom");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            assert!(
                chrono::NaiveDateTime::parse_from_str(&line[..16], "%Y-%m-%d %H:%M").is_ok(),
                "no timestamp: {line}"
            );
            assert!(!line.contains("INFO") && !line.contains("ERROR"), "level shown: {line}");
        }
        assert!(lines[0].ends_with(" 3s OK (You got 2 new messages.)"));
        assert!(lines[1].ends_with(" Exception: boom"));
    }

    #[test]
    fn test_second_init_reports_installed_subscriber() {
        let dir = tempfile::tempdir().unwrap();

        let _guard = init(&dir.path().join("first.log")).unwrap();
        let err = init(&dir.path().join("second.log")).unwrap_err();

        assert!(matches!(err, Error::LogInstall { ref path, .. } if path.ends_with("second.log")));
    }

    #[test]
    fn test_logfile_without_name() {
        let err = file_appender(Path::new("/")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
