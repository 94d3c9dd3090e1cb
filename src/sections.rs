//! Read-only access to an INI-style configuration file.
//!
//! Every `[section]` of the file becomes a [`Section`] holding its key/value
//! pairs as plain strings. Loaded sections expose read accessors only, so a
//! value can never change after startup.
//!
//! ```
//! use email_feed::sections::ConfigFile;
//!
//! let file = ConfigFile::parse("[main]\nname = Alice\n").expect("valid ini");
//! let main = file.require_section("main").expect("section present");
//! assert_eq!(main.get("name"), Some("Alice"));
//! ```

use crate::error::{Error, Result};
use ini::{Ini, ParseOption};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One named section of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    values: BTreeMap<String, String>,
}

impl Section {
    /// Looks up a key. Keys are case-insensitive.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Looks up a key that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if the key is absent.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingKey {
            section: self.name.clone(),
            key: key.to_string(),
        })
    }
}

/// A parsed configuration file: a set of named, read-only sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: BTreeMap<String, Section>,
}

impl ConfigFile {
    /// Loads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] if the file cannot be read or parsed, and
    /// [`Error::InvalidConfig`] if keys appear before the first section header.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ini = Ini::load_from_file_opt(path, parse_options()).map_err(|source| {
            Error::ConfigLoad {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let file = Self::from_ini(&ini)?;
        debug!(path = %path.display(), sections = file.sections.len(), "Loaded configuration");
        Ok(file)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] on a syntax error, and
    /// [`Error::InvalidConfig`] if keys appear before the first section header.
    pub fn parse(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(text, parse_options())
            .map_err(|source| Error::ConfigParse { source })?;
        Self::from_ini(&ini)
    }

    /// Returns the named section, if present.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Returns the named section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSection`] if the file has no such section.
    pub fn require_section(&self, name: &str) -> Result<&Section> {
        self.section(name).ok_or_else(|| Error::MissingSection {
            section: name.to_string(),
        })
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut sections: BTreeMap<String, Section> = BTreeMap::new();

        for (name, properties) in ini.iter() {
            let Some(name) = name else {
                if properties.iter().next().is_none() {
                    continue;
                }
                return Err(Error::InvalidConfig {
                    message: "key/value pairs found before the first [section] header".into(),
                });
            };

            let section = sections
                .entry(name.to_string())
                .or_insert_with(|| Section {
                    name: name.to_string(),
                    values: BTreeMap::new(),
                });

            for (key, value) in properties.iter() {
                section
                    .values
                    .insert(key.to_ascii_lowercase(), value.to_string());
            }
        }

        Ok(Self { sections })
    }
}

/// Values are taken literally: passwords may contain quotes or backslashes.
/// Indented lines continue the previous value, joined with a newline.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        enabled_indented_mutiline_value: true,
        ..ParseOption::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# cron job settings
[main]
name = Alice
url_base = example.com
rss_base = mail

[imap]
Mailbox = imap.example.com
user: alice
password = p@ss\\w\"rd
";

    #[test]
    fn test_parse_sections_and_values() {
        let file = ConfigFile::parse(SAMPLE).unwrap();

        let main = file.require_section("main").unwrap();
        assert_eq!(main.get("name"), Some("Alice"));
        assert_eq!(main.get("url_base"), Some("example.com"));
        assert_eq!(main.get("rss_base"), Some("mail"));

        let imap = file.require_section("imap").unwrap();
        assert_eq!(imap.get("user"), Some("alice"));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let file = ConfigFile::parse(SAMPLE).unwrap();
        let imap = file.require_section("imap").unwrap();

        assert_eq!(imap.get("mailbox"), Some("imap.example.com"));
        assert_eq!(imap.get("MAILBOX"), Some("imap.example.com"));
    }

    #[test]
    fn test_values_are_literal() {
        let file = ConfigFile::parse(SAMPLE).unwrap();
        let password = file.require_section("imap").unwrap().get("password").unwrap();

        assert_eq!(password, "p@ss\\w\"rd");
    }

    #[test]
    fn test_missing_section_and_key() {
        let file = ConfigFile::parse(SAMPLE).unwrap();

        let err = file.require_section("smtp").unwrap_err();
        assert!(matches!(err, Error::MissingSection { ref section } if section == "smtp"));

        let err = file
            .require_section("main")
            .unwrap()
            .require("logfile")
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { ref key, .. } if key == "logfile"));
    }

    #[test]
    fn test_keys_before_first_section_rejected() {
        let result = ConfigFile::parse("name = orphan\n[main]\nname = Alice\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_malformed_section_header() {
        let result = ConfigFile::parse("[main\nname = Alice\n");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::load("/nonexistent/email-feed.cfg");
        assert!(matches!(result, Err(Error::ConfigLoad { .. })));
    }

    #[test]
    fn test_empty_section_kept() {
        let file = ConfigFile::parse("[main]\n[imap]\nuser = bob\n").unwrap();
        assert_eq!(file.require_section("main").unwrap().get("name"), None);
        assert!(file.section("missing").is_none());
    }

    #[test]
    fn test_indented_line_continues_value() {
        let file = ConfigFile::parse(
            "[main]
name = Alice
  and Bob
url_base = example.com
",
        )
        .unwrap();
        let main = file.require_section("main").unwrap();

        let name: Vec<&str> = main.get("name").unwrap().lines().map(str::trim).collect();
        assert_eq!(name, ["Alice", "and Bob"]);
        assert_eq!(main.get("url_base"), Some("example.com"));
        assert_eq!(main.get("and bob"), None);
    }
}
