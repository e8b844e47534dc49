//! my.cnf editor
//!
//! Keeps the file as lines so comments, ordering, `!include` directives and
//! sections this crate does not touch survive a round trip. Option names
//! compare the way the server compares them: case-insensitive, with `-`
//! and `_` interchangeable.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{GrError, GrResult};

/// Section read by the server
pub const MYSQLD_SECTION: &str = "mysqld";

enum Line<'a> {
    Section(&'a str),
    Option { key: &'a str, value: Option<&'a str> },
    Other,
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(['#', ';', '!']) {
        return Line::Other;
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return Line::Section(trimmed[1..trimmed.len() - 1].trim());
    }
    match trimmed.split_once('=') {
        Some((key, value)) => Line::Option {
            key: key.trim(),
            value: Some(value.trim()),
        },
        None => Line::Option {
            key: trimmed,
            value: None,
        },
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// An option file loaded into memory
#[derive(Debug, Clone)]
pub struct OptionFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl OptionFile {
    /// Empty file at `path`; nothing is read
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    /// Load `path`; a missing file loads as empty
    pub fn open(path: impl Into<PathBuf>) -> GrResult<Self> {
        let path = path.into();
        let lines = match fs::read_to_string(&path) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        Ok(Self { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the line holding `key` inside `section`
    fn find(&self, section: &str, key: &str) -> Option<usize> {
        let wanted = normalize(key);
        let mut in_section = false;
        for (index, line) in self.lines.iter().enumerate() {
            match classify(line) {
                Line::Section(name) => in_section = name.eq_ignore_ascii_case(section),
                Line::Option { key, .. } if in_section && normalize(key) == wanted => {
                    return Some(index)
                }
                _ => {}
            }
        }
        None
    }

    /// Value of `key` in `section`. A bare option (`skip_name_resolve`)
    /// reads as the empty string.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        let index = self.find(section, key)?;
        match classify(&self.lines[index]) {
            Line::Option { value, .. } => Some(unquote(value.unwrap_or("")).to_string()),
            _ => None,
        }
    }

    /// Set `key = value` in `section`, creating the section when missing
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let line = format!("{} = {}", key, value);

        if let Some(index) = self.find(section, key) {
            self.lines[index] = line;
            return;
        }

        // Insert after the last non-blank line of the section
        let mut section_end = None;
        let mut in_section = false;
        for (index, text) in self.lines.iter().enumerate() {
            match classify(text) {
                Line::Section(name) => {
                    in_section = name.eq_ignore_ascii_case(section);
                    if in_section {
                        section_end = Some(index);
                    }
                }
                _ if in_section && !text.trim().is_empty() => section_end = Some(index),
                _ => {}
            }
        }

        match section_end {
            Some(index) => self.lines.insert(index + 1, line),
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{}]", section));
                self.lines.push(line);
            }
        }
    }

    /// Remove `key` from `section`; returns whether it was there
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        match self.find(section, key) {
            Some(index) => {
                self.lines.remove(index);
                true
            }
            None => false,
        }
    }

    /// Write the file back to `path`
    pub fn save(&self) -> GrResult<()> {
        let mut text = self.lines.join("\n");
        text.push('\n');
        fs::write(&self.path, text).map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> GrError {
    GrError::FileAccess {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# managed by hand
[client]
port = 3306

[mysqld]
server-id = 7
gtid_mode=\"ON\"
skip_name_resolve
!includedir /etc/mysql/conf.d/
";

    fn sample(dir: &tempfile::TempDir) -> OptionFile {
        let path = dir.path().join("my.cnf");
        fs::write(&path, SAMPLE).unwrap();
        OptionFile::open(&path).unwrap()
    }

    #[test]
    fn test_get_normalizes_names_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let file = sample(&dir);
        assert_eq!(file.get(MYSQLD_SECTION, "server_id").as_deref(), Some("7"));
        assert_eq!(file.get(MYSQLD_SECTION, "GTID-MODE").as_deref(), Some("ON"));
        assert_eq!(file.get(MYSQLD_SECTION, "skip-name-resolve").as_deref(), Some(""));
        assert_eq!(file.get(MYSQLD_SECTION, "port"), None);
        assert_eq!(file.get("client", "port").as_deref(), Some("3306"));
    }

    #[test]
    fn test_set_replaces_in_place_and_keeps_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = sample(&dir);
        file.set(MYSQLD_SECTION, "server_id", "42");
        file.set(MYSQLD_SECTION, "binlog_format", "ROW");
        file.save().unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("# managed by hand\n[client]\nport = 3306\n"));
        assert!(text.contains("server_id = 42"));
        assert!(!text.contains("server-id = 7"));
        assert!(text.contains("!includedir /etc/mysql/conf.d/"));

        let reloaded = OptionFile::open(file.path()).unwrap();
        assert_eq!(reloaded.get(MYSQLD_SECTION, "binlog-format").as_deref(), Some("ROW"));
    }

    #[test]
    fn test_set_creates_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = OptionFile::open(dir.path().join("absent.cnf")).unwrap();
        file.set(MYSQLD_SECTION, "gtid_mode", "ON");
        file.save().unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        assert_eq!(text, "[mysqld]\ngtid_mode = ON\n");
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = sample(&dir);
        assert!(file.remove(MYSQLD_SECTION, "gtid_mode"));
        assert!(!file.remove(MYSQLD_SECTION, "gtid_mode"));
        assert_eq!(file.get(MYSQLD_SECTION, "gtid_mode"), None);
    }

    #[test]
    fn test_open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = OptionFile::open(dir.path());
        assert!(matches!(result, Err(GrError::FileAccess { .. })));
    }
}
