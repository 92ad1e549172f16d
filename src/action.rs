//! UI-element actions subject to permission checks.

use serde::{Deserialize, Serialize};

/// An action a guard can ask about for a UI element.
///
/// The element path names *what* is being guarded; the action names *how*
/// the actor wants to interact with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// The element is rendered at all.
    Visible,
    /// The element is interactive (not greyed out).
    Enabled,
    /// View a record or listing behind the element.
    View,
    /// Create a new record.
    Create,
    /// Edit an existing record.
    Edit,
    /// Delete a record.
    Delete,
    /// Export data out of the application.
    Export,
    /// Print a record or listing.
    Print,
}

impl Action {
    /// All known actions.
    pub const ALL: [Action; 8] = [
        Action::Visible,
        Action::Enabled,
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Export,
        Action::Print,
    ];

    /// Get the string representation used in permission patterns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Visible => "visible",
            Action::Enabled => "enabled",
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Print => "print",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visible" => Ok(Action::Visible),
            "enabled" => Ok(Action::Enabled),
            "view" => Ok(Action::View),
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            "export" => Ok(Action::Export),
            "print" => Ok(Action::Print),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_action_parsing_is_case_insensitive() {
        assert_eq!("Visible".parse::<Action>().unwrap(), Action::Visible);
        assert_eq!("EXPORT".parse::<Action>().unwrap(), Action::Export);
        assert!("transmogrify".parse::<Action>().is_err());
    }
}
