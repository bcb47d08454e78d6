//! Line-preserving model of a shared credentials file
//!
//! The format is INI: `[profile]` headers, `key = value` or `key: value`
//! entries, `#` and `;` comments, and values continued on lines indented
//! deeper than their key. Rewriting a profile's pair touches only the two
//! affected lines; comments, ordering, blank lines and other profiles survive
//! byte for byte. The file's line ending (LF or CRLF, taken from the first
//! line) is used for every line on output.

use std::path::{Path, PathBuf};

use crate::core::{LocalRecord, PairId, StoreError};
use crate::utils::SecretString;

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

#[derive(Debug, Clone)]
enum Line {
    /// Blank, comment, or continuation line, kept verbatim
    Verbatim(String),
    Section { name: String, raw: String },
    Entry { key: String, value: String, raw: String },
}

impl Line {
    fn raw(&self) -> &str {
        match self {
            Self::Verbatim(raw) | Self::Section { raw, .. } | Self::Entry { raw, .. } => raw,
        }
    }
}

/// Parsed credentials file
#[derive(Debug, Clone)]
pub struct CredentialsDocument {
    path: PathBuf,
    lines: Vec<Line>,
    line_ending: &'static str,
    trailing_newline: bool,
}

/// Width of the leading whitespace of `raw`
fn indent_of(raw: &str) -> usize {
    raw.len() - raw.trim_start().len()
}

impl CredentialsDocument {
    /// Parse file content; `path` is only used in error messages
    pub fn parse(content: &str, path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut lines = Vec::new();
        // Indentation of the entry whose value may continue on following lines
        let mut entry_indent: Option<usize> = None;

        for (index, raw) in content.lines().enumerate() {
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                lines.push(Line::Verbatim(raw.to_string()));
                continue;
            }

            // Deeper-indented lines continue the previous value (nested sub-keys).
            if entry_indent.is_some_and(|indent| indent_of(raw) > indent) {
                lines.push(Line::Verbatim(raw.to_string()));
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_suffix(']')
                    .map(|inner| inner[1..].trim())
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| StoreError::Parse {
                        path: path.clone(),
                        line: index + 1,
                        reason: "malformed section header".to_string(),
                    })?;
                lines.push(Line::Section {
                    name: name.to_string(),
                    raw: raw.to_string(),
                });
                entry_indent = None;
                continue;
            }

            // Whichever delimiter comes first splits key from value.
            let Some((key, value)) = trimmed
                .find(['=', ':'])
                .map(|at| (&trimmed[..at], &trimmed[at + 1..]))
            else {
                return Err(StoreError::Parse {
                    path,
                    line: index + 1,
                    reason: "expected 'key = value' or 'key: value'".to_string(),
                });
            };

            if lines.iter().all(|line| !matches!(line, Line::Section { .. })) {
                return Err(StoreError::Parse {
                    path,
                    line: index + 1,
                    reason: "entry outside of any [profile] section".to_string(),
                });
            }

            lines.push(Line::Entry {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
                raw: raw.to_string(),
            });
            entry_indent = Some(indent_of(raw));
        }

        let line_ending = match content.find('\n') {
            Some(at) if content[..at].ends_with('\r') => "\r\n",
            _ => "\n",
        };

        Ok(Self {
            path,
            lines,
            line_ending,
            trailing_newline: content.is_empty() || content.ends_with('\n'),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profile names in file order, without duplicates
    pub fn profiles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for line in &self.lines {
            if let Line::Section { name, .. } = line
                && !names.contains(&name.as_str())
            {
                names.push(name);
            }
        }
        names
    }

    /// Profiles holding both an access key id and a secret
    pub fn rotatable_profiles(&self) -> Vec<&str> {
        self.profiles()
            .into_iter()
            .filter(|profile| {
                self.get(profile, ACCESS_KEY_ID).is_some_and(|v| !v.is_empty())
                    && self.get(profile, SECRET_ACCESS_KEY).is_some_and(|v| !v.is_empty())
            })
            .collect()
    }

    pub fn has_profile(&self, profile: &str) -> bool {
        self.lines
            .iter()
            .any(|line| matches!(line, Line::Section { name, .. } if name == profile))
    }

    /// Value of `key` in `profile`; the last occurrence wins
    pub fn get(&self, profile: &str, key: &str) -> Option<&str> {
        self.section_entries(profile)
            .filter_map(|index| match &self.lines[index] {
                Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
                _ => None,
            })
            .last()
    }

    /// The pair recorded for `profile`
    pub fn local_record(&self, profile: &str) -> Result<LocalRecord, StoreError> {
        if !self.has_profile(profile) {
            return Err(StoreError::ProfileNotFound {
                profile: profile.to_string(),
            });
        }

        let key_id = self
            .get(profile, ACCESS_KEY_ID)
            .ok_or_else(|| StoreError::MissingKey {
                profile: profile.to_string(),
                key: ACCESS_KEY_ID,
            })?;
        let secret = self
            .get(profile, SECRET_ACCESS_KEY)
            .ok_or_else(|| StoreError::MissingKey {
                profile: profile.to_string(),
                key: SECRET_ACCESS_KEY,
            })?;

        let pair_id = PairId::new(key_id).map_err(|source| StoreError::InvalidPairId {
            profile: profile.to_string(),
            source,
        })?;

        Ok(LocalRecord::new(profile, pair_id, SecretString::new(secret)))
    }

    /// Set `key` in `profile`
    ///
    /// Every existing occurrence is rewritten in place; a missing key is
    /// appended after the profile's last entry.
    pub fn set(&mut self, profile: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let indices: Vec<usize> = self.section_entries(profile).collect();
        if indices.is_empty() && !self.has_profile(profile) {
            return Err(StoreError::ProfileNotFound {
                profile: profile.to_string(),
            });
        }

        let mut replaced = false;
        for &index in &indices {
            if let Line::Entry { key: k, raw, .. } = &self.lines[index]
                && k == key
            {
                let indent = raw[..indent_of(raw)].to_string();
                self.lines[index] = Line::Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                    raw: format!("{indent}{key} = {value}"),
                };
                replaced = true;
            }
        }

        if !replaced {
            let insert_at = match indices.last() {
                Some(&last) => self.end_of_entry(last),
                None => self.last_header_index(profile).map_or(self.lines.len(), |i| i + 1),
            };
            self.lines.insert(
                insert_at,
                Line::Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                    raw: format!("{key} = {value}"),
                },
            );
        }

        Ok(())
    }

    /// Replace the pair recorded for `profile`
    pub fn set_pair(
        &mut self,
        profile: &str,
        pair_id: &PairId,
        secret: &SecretString,
    ) -> Result<(), StoreError> {
        self.set(profile, ACCESS_KEY_ID, pair_id.as_str())?;
        secret.expose_secret(|value| self.set(profile, SECRET_ACCESS_KEY, value))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push_str(self.line_ending);
            }
            out.push_str(line.raw());
        }
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }

    /// Indices of the entry lines in every `[profile]` block
    fn section_entries(&self, profile: &str) -> impl Iterator<Item = usize> + '_ {
        let mut current: Option<&str> = None;
        let target = profile.to_string();
        self.lines
            .iter()
            .enumerate()
            .filter_map(move |(index, line)| match line {
                Line::Section { name, .. } => {
                    current = Some(name.as_str());
                    None
                }
                Line::Entry { .. } if current == Some(target.as_str()) => Some(index),
                _ => None,
            })
    }

    /// Index just past the entry at `index` and its continuation lines
    fn end_of_entry(&self, index: usize) -> usize {
        let indent = indent_of(self.lines[index].raw());
        let continued = self.lines[index + 1..]
            .iter()
            .take_while(|line| {
                matches!(line, Line::Verbatim(raw)
                    if !raw.trim().is_empty() && indent_of(raw) > indent)
            })
            .count();
        index + 1 + continued
    }

    fn last_header_index(&self, profile: &str) -> Option<usize> {
        self.lines
            .iter()
            .rposition(|line| matches!(line, Line::Section { name, .. } if name == profile))
    }
}
