use std::fs;
use std::path::Path as StdPath;

use super::{Completions, ITokenClass, MatchStatus};
use crate::value::Value;

/// What a [`Path`] token is allowed to resolve to.
/// Grounded on `nessaid_cli.tokens.PathToken`'s `ANY`/`FILE`/`DIRECTORY` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Any,
    File,
    Directory,
}

/// Matches filesystem paths, completing against the actual filesystem.
/// Case-insensitive on Windows, where paths are case-insensitive by
/// convention; case-sensitive elsewhere.
#[derive(Debug, Clone)]
pub struct Path {
    pub kind: PathKind,
    pub helpstring: Option<String>,
}

impl Path {
    pub fn new(kind: PathKind, helpstring: Option<String>) -> Self {
        Self { kind, helpstring }
    }

    fn kind_matches(&self, entry: &StdPath) -> bool {
        match self.kind {
            PathKind::Any => true,
            PathKind::File => entry.is_file(),
            PathKind::Directory => entry.is_dir(),
        }
    }
}

fn split_input(input: &str) -> (std::path::PathBuf, String) {
    let p = StdPath::new(input);
    if input.ends_with('/') || input.ends_with(std::path::MAIN_SEPARATOR) {
        (p.to_path_buf(), String::new())
    } else {
        match (p.parent(), p.file_name()) {
            (Some(parent), Some(name)) => {
                let dir = if parent.as_os_str().is_empty() {
                    std::path::PathBuf::from(".")
                } else {
                    parent.to_path_buf()
                };
                (dir, name.to_string_lossy().to_string())
            }
            _ => (std::path::PathBuf::from("."), input.to_string()),
        }
    }
}

fn eq_component(a: &str, b: &str) -> bool {
    if cfg!(windows) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

impl Path {
    fn candidates(&self, input: &str) -> Vec<String> {
        let (dir, prefix) = split_input(input);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => return vec![],
        };
        let dir_prefix = if input.is_empty() || input.ends_with('/') {
            input.to_string()
        } else {
            let (d, _) = split_input(input);
            let d = d.to_string_lossy().to_string();
            if d == "." {
                String::new()
            } else {
                format!("{}/", d)
            }
        };

        let mut out = vec![];
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let matches_prefix = if cfg!(windows) {
                name.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase())
            } else {
                name.starts_with(&prefix)
            };
            if !matches_prefix {
                continue;
            }
            if !self.kind_matches(&entry.path()) {
                continue;
            }
            let mut candidate = format!("{}{}", dir_prefix, name);
            if entry.path().is_dir() {
                candidate.push('/');
            }
            out.push(candidate);
        }
        out.sort();
        out
    }

    fn resolves(&self, input: &str) -> bool {
        let p = StdPath::new(input);
        p.exists() && self.kind_matches(p)
    }
}

impl ITokenClass for Path {
    fn match_input(&self, input: &str) -> MatchStatus {
        if input.is_empty() {
            return MatchStatus::Partial;
        }
        if self.resolves(input) {
            MatchStatus::Success
        } else if !self.candidates(input).is_empty() {
            MatchStatus::Partial
        } else {
            MatchStatus::Failure
        }
    }

    fn complete(&self, input: &str) -> Completions {
        Completions::Bounded(self.candidates(input))
    }

    fn get_value(&self, input: &str) -> Value {
        if self.resolves(input) {
            Value::Str(input.to_string())
        } else {
            Value::Null
        }
    }

    fn get_helpstring(&self) -> String {
        self.helpstring.clone().unwrap_or_else(|| match self.kind {
            PathKind::Any => "A filesystem path".to_string(),
            PathKind::File => "A path to a file".to_string(),
            PathKind::Directory => "A path to a directory".to_string(),
        })
    }

    fn case_insensitive(&self) -> bool {
        cfg!(windows)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn splits_directory_and_prefix() {
        let (dir, prefix) = split_input("src/to");
        assert_eq!(dir.to_string_lossy(), "src");
        assert_eq!(prefix, "to");
    }

    #[test]
    fn component_equality_respects_platform() {
        assert!(eq_component("a", "a"));
    }
}
