use std::fmt;

use crate::ApplicationVersion;

/// The canonical identity of one built image:
/// `<application version>-b<builder version>-<base image name>-<base image version>`, e.g.
/// `2.0.0-b1.11.0-oracle8-1.0.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuroraVersion(String);

impl AuroraVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Wraps a previously composed version, e.g. one read back from image metadata.
impl From<String> for AuroraVersion {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<AuroraVersion> for String {
    fn from(value: AuroraVersion) -> Self {
        value.0
    }
}

impl AsRef<str> for AuroraVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuroraVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeInput {
    ApplicationVersion,
    BuilderVersion,
    BaseImageVersion,
    BaseImageRepository,
}

impl fmt::Display for ComposeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComposeInput::ApplicationVersion => "application version",
            ComposeInput::BuilderVersion => "builder version",
            ComposeInput::BaseImageVersion => "base image version",
            ComposeInput::BaseImageRepository => "base image repository",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeError(ComposeInput);

impl ComposeError {
    pub fn input(&self) -> ComposeInput {
        self.0
    }
}

impl std::error::Error for ComposeError {}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to compose version: the {} is empty", self.0)
    }
}

/// Returns the last path segment of a repository, e.g. `oracle8` for
/// `registry.example/aurora/oracle8`.
pub fn repository_name(repository: &str) -> &str {
    repository.rsplit('/').next().unwrap_or(repository)
}

/// Composes the [`AuroraVersion`] of a build. All inputs are opaque; only emptiness is checked.
pub fn compose(
    app_version: &ApplicationVersion,
    builder_version: &str,
    base_image_version: &str,
    base_image_repository: &str,
) -> Result<AuroraVersion, ComposeError> {
    let require = |value: &str, input: ComposeInput| {
        if value.is_empty() {
            Err(ComposeError(input))
        } else {
            Ok(())
        }
    };

    require(app_version.as_str(), ComposeInput::ApplicationVersion)?;
    require(builder_version, ComposeInput::BuilderVersion)?;
    require(base_image_version, ComposeInput::BaseImageVersion)?;
    let base_image_name = repository_name(base_image_repository);
    require(base_image_name, ComposeInput::BaseImageRepository)?;

    Ok(AuroraVersion(format!(
        "{app_version}-b{builder_version}-{base_image_name}-{base_image_version}"
    )))
}
