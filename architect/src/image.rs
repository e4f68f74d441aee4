use std::{fmt, sync::LazyLock};

use regex::Regex;

// Grammar from https://github.com/distribution/distribution/blob/v2.7.1/reference/reference.go.
static REPOSITORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[_.]|__|[-]*)[a-z0-9]+)*(?:/[a-z0-9]+(?:(?:[_.]|__|[-]*)[a-z0-9]+)*)*$")
        .unwrap()
});
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").unwrap());

#[derive(Debug, PartialEq, Eq)]
pub enum InvalidImageName {
    Registry(String),
    Repository(String),
    Tag(String),
}

impl std::error::Error for InvalidImageName {}

impl fmt::Display for InvalidImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidImageName::Registry(value) => write!(f, "invalid registry: {value:?}"),
            InvalidImageName::Repository(value) => write!(f, "invalid repository: {value:?}"),
            InvalidImageName::Tag(value) => write!(f, "invalid tag: {value:?}"),
        }
    }
}

/// A `<registry>/<repository>[:<tag>]` reference to an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    registry: String,
    repository: String,
    tag: Option<String>,
}

fn is_valid_registry(registry: &str) -> bool {
    !registry.is_empty()
        && !registry.contains('/')
        && registry
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b':'))
}

fn is_valid_tag(tag: &str) -> bool {
    TAG_REGEX.is_match(tag)
}

impl ImageName {
    pub fn new(registry: &str, repository: &str, tag: Option<&str>) -> Result<Self, InvalidImageName> {
        if !is_valid_registry(registry) {
            return Err(InvalidImageName::Registry(registry.to_owned()));
        }
        if !REPOSITORY_REGEX.is_match(repository) {
            return Err(InvalidImageName::Repository(repository.to_owned()));
        }
        if let Some(tag) = tag {
            if !is_valid_tag(tag) {
                return Err(InvalidImageName::Tag(tag.to_owned()));
            }
        }
        Ok(Self {
            registry: registry.to_owned(),
            repository: repository.to_owned(),
            tag: tag.map(str::to_owned),
        })
    }

    /// Returns the same image with a different tag.
    pub fn with_tag(&self, tag: &str) -> Result<Self, InvalidImageName> {
        if !is_valid_tag(tag) {
            return Err(InvalidImageName::Tag(tag.to_owned()));
        }
        Ok(Self {
            tag: Some(tag.to_owned()),
            ..self.clone()
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}
