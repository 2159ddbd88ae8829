use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Reserved inside segments: it delimits the parts of a record key.
const RESERVED_CHAR: char = ':';

/// Hierarchical ledger path.
///
/// A path is an ordered sequence of non-empty segments. The textual form
/// carries a leading `/`; a trailing `/` marks the path as a *directory*
/// (a container of other paths), otherwise it is a *leaf* (an addressable
/// record). The root `/` is a directory with zero segments.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LedgerPath {
    segments: Vec<String>,
    is_directory: bool,
}

impl LedgerPath {
    /// The root directory `/`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            is_directory: true,
        }
    }

    /// Parse a textual path.
    ///
    /// Fails with [`TypeError::MalformedPath`] on empty input, a missing
    /// leading separator, empty segments, or reserved characters inside a
    /// segment. Never silently truncates.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let malformed = || TypeError::MalformedPath(value.to_string());

        let rest = value.strip_prefix(PATH_SEPARATOR).ok_or_else(malformed)?;
        if rest.is_empty() {
            return Ok(Self::root());
        }

        let (body, is_directory) = match rest.strip_suffix(PATH_SEPARATOR) {
            Some(body) => (body, true),
            None => (rest, false),
        };
        if body.is_empty() {
            return Err(malformed());
        }

        let mut segments = Vec::new();
        for segment in body.split(PATH_SEPARATOR) {
            if segment.is_empty() || segment.contains(RESERVED_CHAR) {
                return Err(malformed());
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            segments,
            is_directory,
        })
    }

    /// Non-throwing variant of [`Self::parse`].
    pub fn try_parse(value: &str) -> Option<Self> {
        Self::parse(value).ok()
    }

    /// Returns `true` if the given string parses as a valid path.
    pub fn is_valid_path(value: &str) -> bool {
        Self::parse(value).is_ok()
    }

    /// Build a path from pre-validated segments.
    pub fn from_segments(segments: &[&str], is_directory: bool) -> Result<Self, TypeError> {
        let rendered = format!(
            "/{}{}",
            segments.join("/"),
            if is_directory && !segments.is_empty() { "/" } else { "" }
        );
        Self::parse(&rendered)
    }

    /// The path segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` if the trailing separator marks this as a directory.
    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Segment-wise containment, used for recursive ACL matching.
    ///
    /// Returns `true` if every segment of `self` is a leading segment of
    /// `other` (equality of segment lists included). Only a directory can
    /// contain other paths.
    pub fn is_prefix_of(&self, other: &LedgerPath) -> bool {
        if !self.is_directory {
            return false;
        }
        if self.segments.len() > other.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }

    /// The canonical textual form.
    pub fn full_path(&self) -> String {
        if self.segments.is_empty() {
            return String::from("/");
        }
        format!(
            "/{}{}",
            self.segments.join("/"),
            if self.is_directory { "/" } else { "" }
        )
    }
}

impl fmt::Debug for LedgerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerPath({})", self.full_path())
    }
}

impl fmt::Display for LedgerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

impl FromStr for LedgerPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LedgerPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full_path())
    }
}

impl<'de> Deserialize<'de> for LedgerPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
