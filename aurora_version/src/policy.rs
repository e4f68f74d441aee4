use std::{fmt, ops::Deref, str::FromStr};

#[cfg(feature = "serde")]
use ::serde::{Deserialize, Serialize};

use crate::{ApplicationVersion, AuroraVersion, LATEST_TAG};

const MAJOR_TOKEN: &str = "major";
const MINOR_TOKEN: &str = "minor";
const PATCH_TOKEN: &str = "patch";
const LATEST_TOKEN: &str = "latest";

/// Which auxiliary tags a semantic release should be pushed with, next to its exact version.
///
/// Written as a comma separated list of tokens, e.g. `major,minor,latest`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PushExtraTags {
    pub latest: bool,
    pub major: bool,
    pub minor: bool,
    pub patch: bool,
}

impl PushExtraTags {
    pub const NONE: Self = Self {
        latest: false,
        major: false,
        minor: false,
        patch: false,
    };

    pub const ALL: Self = Self {
        latest: true,
        major: true,
        minor: true,
        patch: true,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    fn tokens(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.major, MAJOR_TOKEN),
            (self.minor, MINOR_TOKEN),
            (self.patch, PATCH_TOKEN),
            (self.latest, LATEST_TOKEN),
        ]
        .into_iter()
        .filter_map(|(enabled, token)| enabled.then_some(token))
    }
}

impl fmt::Display for PushExtraTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, token) in self.tokens().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePushExtraTagsError(String);

impl std::error::Error for ParsePushExtraTagsError {}

impl fmt::Display for ParsePushExtraTagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown extra tag {:?}, expected one of {MAJOR_TOKEN}, {MINOR_TOKEN}, {PATCH_TOKEN} or {LATEST_TOKEN}",
            self.0
        )
    }
}

impl FromStr for PushExtraTags {
    type Err = ParsePushExtraTagsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tags = Self::NONE;
        for token in s.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            let flag = match token {
                MAJOR_TOKEN => &mut tags.major,
                MINOR_TOKEN => &mut tags.minor,
                PATCH_TOKEN => &mut tags.patch,
                LATEST_TOKEN => &mut tags.latest,
                other => return Err(ParsePushExtraTagsError(other.to_owned())),
            };
            *flag = true;
        }
        Ok(tags)
    }
}

/// The ordered tags a build should be published under, before filtering against the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateTags(Vec<String>);

impl CandidateTags {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for CandidateTags {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for CandidateTags {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl FromIterator<String> for CandidateTags {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CandidateTags {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateTags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Produces the raw candidate tags for a build. The composite version always comes first. The
/// policy only applies to semantic releases; snapshots and arbitrary versions have no bucket to
/// move and get the composite version alone.
pub fn candidate_tags(
    version: &AuroraVersion,
    app_version: &ApplicationVersion,
    policy: PushExtraTags,
) -> CandidateTags {
    let mut tags = vec![version.to_string()];

    if let Some(release) = app_version.semantic_release() {
        if policy.latest {
            tags.push(LATEST_TAG.to_owned());
        }
        if policy.major {
            tags.push(release.major_tag());
        }
        if policy.minor {
            tags.push(release.minor_tag());
        }
        if policy.patch {
            tags.push(app_version.to_string());
        }
    }

    CandidateTags(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose;

    fn tags(app_version: &str, policy: PushExtraTags) -> Vec<String> {
        let app_version = ApplicationVersion::new(app_version).unwrap();
        let version = compose(&app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap();
        candidate_tags(&version, &app_version, policy).into_vec()
    }

    #[test]
    fn candidate_tags_for_release_work() {
        assert_eq!(
            tags("2.3.1", PushExtraTags::ALL),
            ["2.3.1-b1.11.0-oracle8-1.0.2", "latest", "2", "2.3", "2.3.1"]
        );
        assert_eq!(
            tags("2.3.1", PushExtraTags::NONE),
            ["2.3.1-b1.11.0-oracle8-1.0.2"]
        );
        assert_eq!(
            tags(
                "2.3.1",
                PushExtraTags {
                    minor: true,
                    ..PushExtraTags::NONE
                }
            ),
            ["2.3.1-b1.11.0-oracle8-1.0.2", "2.3"]
        );
    }

    #[test]
    fn policy_is_ignored_without_semantic_release() {
        assert_eq!(
            tags("SNAPSHOT-feature", PushExtraTags::ALL),
            ["SNAPSHOT-feature-b1.11.0-oracle8-1.0.2"]
        );
        assert_eq!(
            tags("2.3", PushExtraTags::ALL),
            ["2.3-b1.11.0-oracle8-1.0.2"]
        );
    }

    #[test]
    fn push_extra_tags_display_works() {
        assert_eq!(PushExtraTags::ALL.to_string(), "major,minor,patch,latest");
        assert_eq!(PushExtraTags::NONE.to_string(), "");
        assert_eq!(
            PushExtraTags {
                latest: true,
                major: true,
                minor: true,
                patch: false,
            }
            .to_string(),
            "major,minor,latest"
        );
    }

    #[test]
    fn push_extra_tags_parsing_works() {
        assert_eq!("".parse(), Ok(PushExtraTags::NONE));
        assert_eq!("latest, patch,minor,major".parse(), Ok(PushExtraTags::ALL));
        assert_eq!(
            "latest,latest".parse(),
            Ok(PushExtraTags {
                latest: true,
                ..PushExtraTags::NONE
            })
        );
        assert_eq!(
            "major,nightly".parse::<PushExtraTags>(),
            Err(ParsePushExtraTagsError("nightly".to_owned()))
        );
        for policy in [PushExtraTags::ALL, PushExtraTags::NONE] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn push_extra_tags_serde_works() {
        let policy: PushExtraTags = serde_json::from_str(r#"{"latest":true,"minor":true}"#).unwrap();
        assert_eq!(
            policy,
            PushExtraTags {
                latest: true,
                minor: true,
                ..PushExtraTags::NONE
            }
        );
    }
}
