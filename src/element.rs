//! Element paths and pattern matching.
//!
//! A UI-addressable unit is named by a colon-delimited path
//! (`module:resource:view:control`). Permission names are the same shape
//! with `*` segments allowed; a trailing `*` matches any remaining suffix.

use crate::{
    action::Action,
    error::{Error, Result},
};

/// A normalized, namespaced element path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    normalized: String,
}

impl ElementPath {
    /// Parse and normalize a raw path, prepending `namespace` when the
    /// path does not already start with it.
    pub fn parse(raw: &str, namespace: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidPath("element path cannot be empty".to_string()));
        }
        if raw.contains('\0') {
            return Err(Error::InvalidPath(format!(
                "element path cannot contain null characters: '{raw}'"
            )));
        }

        let segments: Vec<&str> = raw.split(':').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::InvalidPath(format!(
                "element path cannot contain empty segments: '{raw}'"
            )));
        }

        let normalized = if segments[0] == namespace {
            raw.to_string()
        } else {
            format!("{namespace}:{raw}")
        };

        Ok(Self { normalized })
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The path segments.
    pub fn segments(&self) -> Vec<&str> {
        self.normalized.split(':').collect()
    }

    /// Candidate permission patterns for this path and action, ordered
    /// from most to least specific and deduplicated.
    ///
    /// The order is load-bearing: the evaluator grants on the first
    /// candidate any permission satisfies, so reordering changes who can
    /// see what.
    pub fn candidates(&self, action: Action) -> Vec<String> {
        let segments = self.segments();
        let mut candidates = vec![
            format!("{}:{}", self.normalized, action),
            self.normalized.clone(),
        ];

        if segments.len() >= 3 {
            candidates.push(format!("{}:*", segments[..3].join(":")));
        }
        if segments.len() >= 2 {
            candidates.push(format!("{}:*", segments[..2].join(":")));
        }

        candidates.push(format!("*:{action}"));
        candidates.push("*".to_string());

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates
    }
}

impl std::fmt::Display for ElementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

/// Check whether a wildcard pattern matches a candidate value.
///
/// A `*` segment matches exactly one segment; a trailing `*` matches any
/// remaining suffix (including none). All other segments match literally.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split(':').collect();
    let value_segments: Vec<&str> = value.split(':').collect();

    for (i, segment) in pattern_segments.iter().enumerate() {
        if *segment == "*" && i == pattern_segments.len() - 1 {
            return value_segments.len() >= i;
        }
        match value_segments.get(i) {
            Some(value_segment) if *segment == "*" || segment == value_segment => {}
            _ => return false,
        }
    }

    pattern_segments.len() == value_segments.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prepends_namespace() {
        let path = ElementPath::parse("contacts:list", "crm").unwrap();
        assert_eq!(path.as_str(), "crm:contacts:list");

        let already = ElementPath::parse("crm:contacts:list", "crm").unwrap();
        assert_eq!(already.as_str(), "crm:contacts:list");
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(ElementPath::parse("", "crm").is_err());
        assert!(ElementPath::parse("   ", "crm").is_err());
        assert!(ElementPath::parse("crm::list", "crm").is_err());
        assert!(ElementPath::parse("crm:con\0tacts", "crm").is_err());
    }

    #[test]
    fn test_candidates_specificity_order() {
        let path = ElementPath::parse("crm:contacts:list", "crm").unwrap();
        let candidates = path.candidates(Action::Visible);

        assert_eq!(
            candidates,
            vec![
                "crm:contacts:list:visible",
                "crm:contacts:list",
                "crm:contacts:list:*",
                "crm:contacts:*",
                "*:visible",
                "*",
            ]
        );
    }

    #[test]
    fn test_candidates_short_path() {
        let path = ElementPath::parse("crm:dashboard", "crm").unwrap();
        let candidates = path.candidates(Action::View);

        assert_eq!(
            candidates,
            vec![
                "crm:dashboard:view",
                "crm:dashboard",
                "crm:dashboard:*",
                "*:view",
                "*",
            ]
        );
    }

    #[test]
    fn test_candidates_deep_path_are_deduplicated() {
        let path = ElementPath::parse("crm:contacts:list:export-btn", "crm").unwrap();
        let candidates = path.candidates(Action::Export);

        assert_eq!(
            candidates,
            vec![
                "crm:contacts:list:export-btn:export",
                "crm:contacts:list:export-btn",
                "crm:contacts:list:*",
                "crm:contacts:*",
                "*:export",
                "*",
            ]
        );
    }

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("crm:contacts:list", "crm:contacts:list"));
        assert!(!pattern_matches("crm:contacts:list", "crm:contacts:edit"));

        // Single-segment wildcard.
        assert!(pattern_matches("crm:*:list", "crm:contacts:list"));
        assert!(!pattern_matches("crm:*:list", "crm:contacts:list:visible"));

        // Trailing wildcard swallows any suffix.
        assert!(pattern_matches("crm:*", "crm:contacts:list:visible"));
        assert!(pattern_matches("crm:*", "crm"));
        assert!(pattern_matches("*", "anything:at:all"));

        // Length mismatch without a trailing wildcard.
        assert!(!pattern_matches("crm:contacts", "crm:contacts:list"));
        assert!(!pattern_matches("crm:contacts:list:visible", "crm:contacts:list"));
    }

    #[test]
    fn test_pattern_matching_against_wildcard_candidates() {
        // Candidates themselves contain literal '*' segments.
        assert!(pattern_matches("crm:contacts:*", "crm:contacts:*"));
        assert!(pattern_matches("crm:*", "crm:contacts:*"));
        assert!(pattern_matches("*", "*:visible"));
    }
}
