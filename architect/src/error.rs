use std::fmt;

use aurora_version::{ComposeError, VersionParseError};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The step of a build or promotion that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Compose,
    Policy,
    Filter,
    Build,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Download => "download",
            Stage::Compose => "compose",
            Stage::Policy => "policy",
            Stage::Filter => "filter",
            Stage::Build => "build",
            Stage::Push => "push",
        })
    }
}

#[derive(Debug)]
pub enum Error {
    /// Missing or invalid input. Raised before the registry is contacted.
    Configuration(String),
    VersionParse {
        stage: Stage,
        source: VersionParseError,
    },
    /// An input of the composite version is empty.
    Compose(ComposeError),
    /// The base image does not carry its complete version in its metadata.
    BaseImageVersionUnavailable { image: String, key: &'static str },
    /// An image to promote lacks a metadata entry written at build time.
    MissingMetadataKey { image: String, key: &'static str },
    Registry {
        stage: Stage,
        context: String,
        source: BoxError,
    },
    Transport {
        stage: Stage,
        context: String,
        source: BoxError,
    },
    /// Some tags were pushed before pushing another one failed. Pushed tags stay in place.
    PartialPush {
        pushed: Vec<String>,
        failed: String,
        unpushed: Vec<String>,
        source: BoxError,
    },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::VersionParse { stage, .. }
            | Error::Registry { stage, .. }
            | Error::Transport { stage, .. } => Some(*stage),
            Error::Compose(_)
            | Error::BaseImageVersionUnavailable { .. }
            | Error::MissingMetadataKey { .. } => Some(Stage::Compose),
            Error::PartialPush { .. } => Some(Stage::Push),
            Error::Configuration(_) => None,
        }
    }
}

impl From<ComposeError> for Error {
    fn from(value: ComposeError) -> Self {
        Error::Compose(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(message) => write!(f, "invalid configuration: {message}"),
            Error::VersionParse { stage, source } => write!(f, "{stage} failed: {source}"),
            Error::Compose(source) => write!(f, "{} failed: {source}", Stage::Compose),
            Error::BaseImageVersionUnavailable { image, key } => write!(
                f,
                "compose failed: base image {image} does not define a non-empty {key} environment variable"
            ),
            Error::MissingMetadataKey { image, key } => write!(
                f,
                "compose failed: image {image} is missing the {key} metadata entry, was it built by architect?"
            ),
            Error::Registry {
                stage,
                context,
                source,
            } => write!(f, "{stage} failed: registry error while {context}: {source}"),
            Error::Transport {
                stage,
                context,
                source,
            } => write!(f, "{stage} failed: {context}: {source}"),
            Error::PartialPush {
                pushed,
                failed,
                unpushed,
                source,
            } => {
                write!(f, "push failed for tag {failed:?}: {source}")?;
                if !pushed.is_empty() {
                    write!(f, "; already pushed: {}", pushed.join(", "))?;
                }
                if !unpushed.is_empty() {
                    write!(f, "; not pushed: {}", unpushed.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::VersionParse { source, .. } => Some(source),
            Error::Compose(source) => Some(source),
            Error::Registry { source, .. }
            | Error::Transport { source, .. }
            | Error::PartialPush { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use aurora_version::{compose, ApplicationVersion, ComposeInput};

    use super::*;

    #[test]
    fn compose_errors_carry_the_compose_stage() {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        let error: Error = compose(&app_version, "", "1.0.2", "aurora/oracle8")
            .unwrap_err()
            .into();
        assert!(matches!(&error, Error::Compose(source) if source.input() == ComposeInput::BuilderVersion));
        assert_eq!(error.stage(), Some(Stage::Compose));
        assert_eq!(
            error.to_string(),
            "compose failed: unable to compose version: the builder version is empty"
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn partial_push_lists_remaining_tags() {
        let error = Error::PartialPush {
            pushed: vec!["1.2.0-b1-oracle8-1".to_owned()],
            failed: "1".to_owned(),
            unpushed: vec!["1.2".to_owned()],
            source: "connection reset".into(),
        };
        assert_eq!(error.stage(), Some(Stage::Push));
        assert_eq!(
            error.to_string(),
            "push failed for tag \"1\": connection reset; already pushed: 1.2.0-b1-oracle8-1; not pushed: 1.2"
        );
    }
}
