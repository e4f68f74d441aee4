//! Version metadata embedded into every built image as environment variables. It is the only
//! channel through which a promotion learns which version a previously built image carries.

use std::collections::HashMap;

use aurora_version::{candidate_tags, ApplicationVersion, AuroraVersion, CandidateTags, PushExtraTags};

use crate::error::{Error, Stage};

pub const APP_VERSION: &str = "APP_VERSION";
pub const AURORA_VERSION: &str = "AURORA_VERSION";
pub const PUSH_EXTRA_TAGS: &str = "PUSH_EXTRA_TAGS";
pub const SNAPSHOT_TAG: &str = "SNAPSHOT_TAG";

/// Entry through which a base image advertises its complete version.
pub const IMAGE_VERSION: &str = "IMAGE_VERSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Release { push_extra_tags: PushExtraTags },
    Snapshot { snapshot_tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub app_version: ApplicationVersion,
    pub aurora_version: AuroraVersion,
    pub variant: Variant,
}

fn non_empty<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

impl BuildMetadata {
    /// The environment entries to write into the image.
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (APP_VERSION, self.app_version.to_string()),
            (AURORA_VERSION, self.aurora_version.to_string()),
        ];
        match &self.variant {
            Variant::Release { push_extra_tags } => {
                pairs.push((PUSH_EXTRA_TAGS, push_extra_tags.to_string()))
            }
            Variant::Snapshot { snapshot_tag } => pairs.push((SNAPSHOT_TAG, snapshot_tag.clone())),
        }
        pairs
    }

    /// Reconstructs the metadata from the environment of `image`. An empty `PUSH_EXTRA_TAGS` means
    /// no extra tags; every other entry has to be non-empty.
    pub fn from_env_map(image: &str, env: &HashMap<String, String>) -> Result<Self, Error> {
        let missing = |key| Error::MissingMetadataKey {
            image: image.to_owned(),
            key,
        };

        let app_version = non_empty(env, APP_VERSION).ok_or_else(|| missing(APP_VERSION))?;
        let aurora_version =
            non_empty(env, AURORA_VERSION).ok_or_else(|| missing(AURORA_VERSION))?;
        let app_version =
            ApplicationVersion::new(app_version).map_err(|source| Error::VersionParse {
                stage: Stage::Policy,
                source,
            })?;

        let variant = if app_version.is_snapshot() {
            Variant::Snapshot {
                snapshot_tag: non_empty(env, SNAPSHOT_TAG)
                    .ok_or_else(|| missing(SNAPSHOT_TAG))?
                    .to_owned(),
            }
        } else if app_version.is_semantic_release() {
            let value = env.get(PUSH_EXTRA_TAGS).ok_or_else(|| missing(PUSH_EXTRA_TAGS))?;
            Variant::Release {
                push_extra_tags: value.parse().map_err(|error| {
                    Error::configuration(format!("image {image} has an invalid {PUSH_EXTRA_TAGS}: {error}"))
                })?,
            }
        } else {
            return Err(Error::configuration(format!(
                "image {image} carries application version {app_version:?}, which is neither a semantic release nor a snapshot"
            )));
        };

        Ok(Self {
            app_version,
            aurora_version: AuroraVersion::from(aurora_version.to_owned()),
            variant,
        })
    }

    /// The tags a build with this metadata is published under, before filtering.
    pub fn candidate_tags(&self) -> CandidateTags {
        match &self.variant {
            Variant::Release { push_extra_tags } => {
                candidate_tags(&self.aurora_version, &self.app_version, *push_extra_tags)
            }
            Variant::Snapshot { snapshot_tag } => CandidateTags::from(vec![snapshot_tag.clone()]),
        }
    }
}

/// Parses `KEY=VALUE` entries as found in an image configuration. Entries without `=` map to an
/// empty value.
pub fn parse_env<I, S>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| {
            let entry = entry.as_ref();
            let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
            (key.to_owned(), value.to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use aurora_version::compose;

    use super::*;

    fn release_metadata() -> BuildMetadata {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        BuildMetadata {
            aurora_version: compose(&app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap(),
            app_version,
            variant: Variant::Release {
                push_extra_tags: "major,minor,latest".parse().unwrap(),
            },
        }
    }

    fn to_env(metadata: &BuildMetadata) -> HashMap<String, String> {
        metadata
            .env_pairs()
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect()
    }

    #[test]
    fn release_metadata_round_trips() {
        let metadata = release_metadata();
        let env = to_env(&metadata);
        assert_eq!(env[APP_VERSION], "1.2.0");
        assert_eq!(env[AURORA_VERSION], "1.2.0-b1.11.0-oracle8-1.0.2");
        assert_eq!(env[PUSH_EXTRA_TAGS], "major,minor,latest");
        assert!(!env.contains_key(SNAPSHOT_TAG));

        let parsed = BuildMetadata::from_env_map("console:temp", &env).unwrap();
        assert_eq!(parsed, metadata);
        assert_eq!(
            parsed.candidate_tags().into_vec(),
            ["1.2.0-b1.11.0-oracle8-1.0.2", "latest", "1", "1.2"]
        );
    }

    #[test]
    fn snapshot_metadata_round_trips() {
        let app_version = ApplicationVersion::new("SNAPSHOT-feature-1").unwrap();
        let aurora_version = compose(&app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap();
        let metadata = BuildMetadata {
            variant: Variant::Snapshot {
                snapshot_tag: aurora_version.to_string(),
            },
            app_version,
            aurora_version,
        };

        let parsed = BuildMetadata::from_env_map("console:temp", &to_env(&metadata)).unwrap();
        assert_eq!(parsed, metadata);
        assert_eq!(
            parsed.candidate_tags().into_vec(),
            ["SNAPSHOT-feature-1-b1.11.0-oracle8-1.0.2"]
        );
    }

    #[test]
    fn empty_push_extra_tags_means_none() {
        let mut env = to_env(&release_metadata());
        env.insert(PUSH_EXTRA_TAGS.to_owned(), String::new());
        let parsed = BuildMetadata::from_env_map("console:temp", &env).unwrap();
        assert_eq!(
            parsed.variant,
            Variant::Release {
                push_extra_tags: PushExtraTags::NONE
            }
        );
    }

    #[test]
    fn missing_keys_are_reported() {
        for key in [APP_VERSION, AURORA_VERSION, PUSH_EXTRA_TAGS] {
            let mut env = to_env(&release_metadata());
            env.remove(key);
            match BuildMetadata::from_env_map("console:temp", &env) {
                Err(Error::MissingMetadataKey { key: missing, image }) => {
                    assert_eq!(missing, key);
                    assert_eq!(image, "console:temp");
                }
                other => panic!("expected missing {key}, got {other:?}"),
            }
        }

        let env = parse_env(["APP_VERSION=SNAPSHOT-x", "AURORA_VERSION=SNAPSHOT-x-b1-oracle8-1"]);
        assert!(matches!(
            BuildMetadata::from_env_map("console:temp", &env),
            Err(Error::MissingMetadataKey {
                key: SNAPSHOT_TAG,
                ..
            })
        ));
    }

    #[test]
    fn parse_env_works() {
        let env = parse_env(["PATH=/usr/bin:/bin", "A=b=c", "EMPTY=", "FLAG"]);
        assert_eq!(env["PATH"], "/usr/bin:/bin");
        assert_eq!(env["A"], "b=c");
        assert_eq!(env["EMPTY"], "");
        assert_eq!(env["FLAG"], "");
    }
}
