use serde::{Deserialize, Serialize};

use opal_types::{ByteString, LedgerPath};

use crate::permissions::PermissionSet;

/// Record name under which a path's dynamic ACL document is stored.
pub const ACL_RESOURCE_NAME: &str = "acl";

/// How a record-name pattern matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternMatching {
    Exact,
    Prefix,
    MatchAll,
}

/// A record-name pattern: exact string, prefix, or match-everything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPattern {
    pub pattern: String,
    pub matching: PatternMatching,
}

impl StringPattern {
    pub fn new(pattern: impl Into<String>, matching: PatternMatching) -> Self {
        Self {
            pattern: pattern.into(),
            matching,
        }
    }

    /// The pattern matching every record name.
    pub fn match_all() -> Self {
        Self::new("", PatternMatching::MatchAll)
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self.matching {
            PatternMatching::Exact => value == self.pattern,
            PatternMatching::Prefix => value.starts_with(&self.pattern),
            PatternMatching::MatchAll => true,
        }
    }
}

impl Default for StringPattern {
    fn default() -> Self {
        Self::match_all()
    }
}

/// Who an ACL applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Subject {
    /// An m-of-n key set: at least `required` of `keys` (Ed25519 public
    /// keys) must be present in the identity set.
    Key {
        keys: Vec<ByteString>,
        required: usize,
    },
    /// Every identity, signed or not.
    Everyone,
}

impl Subject {
    /// The 1-of-1 subject for a single signing identity.
    pub fn single(key: ByteString) -> Self {
        Subject::Key {
            keys: vec![key],
            required: 1,
        }
    }

    fn is_match(&self, identities: &[ByteString]) -> bool {
        match self {
            Subject::Key { keys, required } => {
                keys.iter()
                    .filter(|key| identities.contains(key))
                    .count()
                    >= *required
            }
            Subject::Everyone => true,
        }
    }
}

/// One access rule: a set of subjects, a base path, a record-name pattern
/// and the rights it grants or denies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub subjects: Vec<Subject>,
    pub path: LedgerPath,
    pub recursive: bool,
    #[serde(default)]
    pub record_name: StringPattern,
    pub permissions: PermissionSet,
}

impl Acl {
    /// Whether this ACL applies to a permission query.
    ///
    /// Matches iff all of:
    /// - a subject matches the identity set (or the ACL grants to everyone);
    /// - path containment holds: non-recursive ACLs require path equality,
    ///   recursive ACLs require the base path to contain the query path;
    /// - a `recursive_only` query is never satisfied by a non-recursive ACL;
    /// - the record-name pattern matches.
    pub fn is_match(
        &self,
        identities: &[ByteString],
        path: &LedgerPath,
        recursive_only: bool,
        record_name: &str,
    ) -> bool {
        if recursive_only && !self.recursive {
            return false;
        }

        let contained = if self.recursive {
            self.path.is_prefix_of(path)
        } else {
            self.path == *path
        };
        if !contained {
            return false;
        }

        if !self.record_name.is_match(record_name) {
            return false;
        }

        self.subjects.iter().any(|subject| subject.is_match(identities))
    }
}

/// An ACL as stored in a dynamic `acl` record: the base path is implied by
/// where the document is stored, so it is absent from the JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAcl {
    pub subjects: Vec<Subject>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default)]
    pub record_name: StringPattern,
    pub permissions: PermissionSet,
}

fn default_recursive() -> bool {
    true
}

impl StoredAcl {
    /// Anchor this stored rule at the path whose record holds it.
    pub fn at_path(self, path: LedgerPath) -> Acl {
        Acl {
            subjects: self.subjects,
            path,
            recursive: self.recursive,
            record_name: self.record_name,
            permissions: self.permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject_key() -> ByteString {
        ByteString::from_hex("abcdef").unwrap()
    }

    fn identities() -> Vec<ByteString> {
        vec![subject_key()]
    }

    fn acl(recursive: bool) -> Acl {
        Acl {
            subjects: vec![Subject::single(subject_key())],
            path: LedgerPath::parse("/root/subitem/").unwrap(),
            recursive,
            record_name: StringPattern::new("name", PatternMatching::Exact),
            permissions: PermissionSet::allow_all(),
        }
    }

    #[test]
    fn recursive_acl_matches_both_query_kinds() {
        let acl = acl(true);
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        assert!(acl.is_match(&identities(), &path, true, "name"));
        assert!(acl.is_match(&identities(), &path, false, "name"));
    }

    #[test]
    fn non_recursive_acl_never_matches_recursive_only_query() {
        let acl = acl(false);
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        assert!(acl.is_match(&identities(), &path, false, "name"));
        assert!(!acl.is_match(&identities(), &path, true, "name"));
    }

    #[test]
    fn path_mismatch_fails() {
        let acl = acl(false);
        let root = LedgerPath::parse("/").unwrap();
        assert!(!acl.is_match(&identities(), &root, false, "name"));
    }

    #[test]
    fn recursive_acl_contains_descendants() {
        let acl = acl(true);
        let child = LedgerPath::parse("/root/subitem/leaf").unwrap();
        assert!(acl.is_match(&identities(), &child, false, "name"));
        let sibling = LedgerPath::parse("/root/other/").unwrap();
        assert!(!acl.is_match(&identities(), &sibling, false, "name"));
    }

    #[test]
    fn name_mismatch_fails() {
        let acl = acl(true);
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        assert!(!acl.is_match(&identities(), &path, false, "n"));
    }

    #[test]
    fn identity_mismatch_fails() {
        let acl = acl(true);
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        let strangers = vec![ByteString::from_hex("ab").unwrap()];
        assert!(!acl.is_match(&strangers, &path, false, "name"));
    }

    #[test]
    fn everyone_matches_empty_identity_set() {
        let mut acl = acl(true);
        acl.subjects = vec![Subject::Everyone];
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        assert!(acl.is_match(&[], &path, false, "name"));
    }

    #[test]
    fn threshold_subject_needs_enough_keys() {
        let keys: Vec<ByteString> = ["aa", "bb", "cc"]
            .iter()
            .map(|h| ByteString::from_hex(h).unwrap())
            .collect();
        let mut acl = acl(true);
        acl.subjects = vec![Subject::Key {
            keys: keys.clone(),
            required: 2,
        }];
        let path = LedgerPath::parse("/root/subitem/").unwrap();
        assert!(!acl.is_match(&keys[..1], &path, false, "name"));
        assert!(acl.is_match(&keys[..2], &path, false, "name"));
        assert!(acl.is_match(&keys, &path, false, "name"));
    }

    #[test]
    fn prefix_pattern() {
        let pattern = StringPattern::new("/asset/gold/", PatternMatching::Prefix);
        assert!(pattern.is_match("/asset/gold/vault"));
        assert!(!pattern.is_match("/asset/silver/"));
    }

    #[test]
    fn stored_acl_json_roundtrip() {
        let json = r#"{
            "subjects": [
                {"type": "key", "keys": ["abcdef", "012345"], "required": 2},
                {"type": "everyone"}
            ],
            "recursive": false,
            "record_name": {"pattern": "acl", "matching": "Exact"},
            "permissions": {"data_modify": "Deny"}
        }"#;
        let stored: StoredAcl = serde_json::from_str(json).unwrap();
        assert!(!stored.recursive);
        assert_eq!(stored.subjects.len(), 2);

        let acl = stored.at_path(LedgerPath::parse("/root/").unwrap());
        assert_eq!(acl.path.full_path(), "/root/");
    }

    #[test]
    fn stored_acl_defaults() {
        let json = r#"{"subjects": [{"type": "everyone"}], "permissions": {}}"#;
        let stored: StoredAcl = serde_json::from_str(json).unwrap();
        assert!(stored.recursive);
        assert_eq!(stored.record_name, StringPattern::match_all());
    }
}
