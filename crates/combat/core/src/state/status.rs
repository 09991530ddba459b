//! Status tags carried by actors.

use std::fmt;

use crate::config::RulesConfig;

/// A status tag such as `focus` or `ko`.
///
/// The well-known tags drive rules directly; anything else is carried as
/// [`Status::Custom`] and only matters to effects that reference it by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    /// Grants a bonus secondary slot at turn start.
    Focus,
    /// Knocked out.
    Ko,
    Dead,
    Comatose,
    Brink,
    #[strum(default)]
    Custom(String),
}

impl Status {
    /// Conditions that survive combat cleanup.
    pub fn is_persistent(&self) -> bool {
        RulesConfig::persistent_conditions().contains(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Focus => "focus",
            Self::Ko => "ko",
            Self::Dead => "dead",
            Self::Comatose => "comatose",
            Self::Brink => "brink",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_custom_tags() {
        assert_eq!("ko".parse::<Status>().unwrap(), Status::Ko);
        assert_eq!(
            "bleeding".parse::<Status>().unwrap(),
            Status::Custom("bleeding".into())
        );
        assert_eq!(Status::Comatose.as_str(), "comatose");
    }

    #[test]
    fn persistent_conditions() {
        assert!(Status::Brink.is_persistent());
        assert!(Status::Dead.is_persistent());
        assert!(!Status::Focus.is_persistent());
        assert!(!Status::Custom("ko-ish".into()).is_persistent());
    }
}
