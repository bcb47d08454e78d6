//! Which profiles a run touches

use serde::{Deserialize, Serialize};

use crate::core::ConfigurationError;

/// Profile filter applied to the rotatable profiles of a credentials file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "profiles")]
pub enum ProfileSelection {
    /// Every rotatable profile
    #[default]
    All,
    /// Only the named profiles
    Include(Vec<String>),
    /// Every rotatable profile except the named ones
    Exclude(Vec<String>),
}

impl ProfileSelection {
    /// Build a selection from optional include and exclude lists
    ///
    /// Giving both is a configuration error; giving neither selects all.
    pub fn from_lists(
        include: Vec<String>,
        exclude: Vec<String>,
    ) -> Result<Self, ConfigurationError> {
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(Self::All),
            (false, true) => Ok(Self::Include(include)),
            (true, false) => Ok(Self::Exclude(exclude)),
            (false, false) => Err(ConfigurationError::ConflictingSelection),
        }
    }

    /// Resolve against the rotatable profiles, keeping file order
    ///
    /// Every name given must be a rotatable profile, for exclusions too: a
    /// typo would otherwise silently rotate a profile meant to be skipped.
    pub fn apply(&self, rotatable: &[&str]) -> Result<Vec<String>, ConfigurationError> {
        let named = match self {
            Self::All => return Ok(rotatable.iter().map(ToString::to_string).collect()),
            Self::Include(names) | Self::Exclude(names) => names,
        };

        let mut unknown: Vec<String> = named
            .iter()
            .filter(|name| !rotatable.contains(&name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            unknown.dedup();
            return Err(ConfigurationError::UnknownProfiles { names: unknown });
        }

        let include = matches!(self, Self::Include(_));
        Ok(rotatable
            .iter()
            .filter(|profile| named.iter().any(|n| n == *profile) == include)
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const ROTATABLE: &[&str] = &["default", "staging", "prod"];

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case(ProfileSelection::All, &["default", "staging", "prod"])]
    #[case(ProfileSelection::Include(names(&["prod", "default"])), &["default", "prod"])]
    #[case(ProfileSelection::Exclude(names(&["staging"])), &["default", "prod"])]
    #[case(ProfileSelection::Exclude(names(&["default", "staging", "prod"])), &[])]
    fn test_apply(#[case] selection: ProfileSelection, #[case] expected: &[&str]) {
        assert_eq!(selection.apply(ROTATABLE).unwrap(), names(expected));
    }

    #[test]
    fn test_both_lists_conflict() {
        let err = ProfileSelection::from_lists(names(&["a"]), names(&["b"])).unwrap_err();
        assert!(matches!(err, ConfigurationError::ConflictingSelection));
    }

    #[test]
    fn test_empty_lists_select_all() {
        assert_eq!(
            ProfileSelection::from_lists(vec![], vec![]).unwrap(),
            ProfileSelection::All
        );
    }

    #[rstest]
    #[case(ProfileSelection::Include(names(&["prod", "qa", "dev", "qa"])))]
    #[case(ProfileSelection::Exclude(names(&["dev", "qa"])))]
    fn test_unknown_names_are_reported(#[case] selection: ProfileSelection) {
        match selection.apply(ROTATABLE) {
            Err(ConfigurationError::UnknownProfiles { names }) => {
                assert_eq!(names, vec!["dev".to_string(), "qa".to_string()]);
            }
            other => panic!("expected UnknownProfiles, got {other:?}"),
        }
    }
}
