use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use semver::Version;

/// A version containing this marker is a snapshot build.
pub const SNAPSHOT_MARKER: &str = "SNAPSHOT";

static SEMANTIC_RELEASE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$").unwrap());

/// Returns true if the input looks like a strict `MAJOR.MINOR.PATCH` release. The components may
/// still be too large to parse, see [`SemanticRelease::from_str`].
pub fn is_semantic_release(value: &str) -> bool {
    SEMANTIC_RELEASE_REGEX.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(String);

impl VersionParseError {
    /// The string that could not be parsed.
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::error::Error for VersionParseError {}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid semantic release version: {:?}", self.0)
    }
}

/// A strict `MAJOR.MINOR.PATCH` release without pre-release or build components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticRelease(Version);

impl SemanticRelease {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// The mutable tag designating this release's major bucket, e.g. `2` for `2.3.1`.
    pub fn major_tag(&self) -> String {
        self.major().to_string()
    }

    /// The mutable tag designating this release's minor bucket, e.g. `2.3` for `2.3.1`.
    pub fn minor_tag(&self) -> String {
        format!("{}.{}", self.major(), self.minor())
    }

    /// Exclusive upper bound of the major bucket, `(major + 1).0.0`. Returns `None` when the bound
    /// is not representable, in which case the bucket is unbounded.
    pub fn major_bucket_end(&self) -> Option<Self> {
        self.major()
            .checked_add(1)
            .map(|major| Self::new(major, 0, 0))
    }

    /// Exclusive upper bound of the minor bucket, `major.(minor + 1).0`.
    pub fn minor_bucket_end(&self) -> Option<Self> {
        self.minor()
            .checked_add(1)
            .map(|minor| Self::new(self.major(), minor, 0))
    }
}

impl FromStr for SemanticRelease {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || VersionParseError(s.to_owned());
        let captures = SEMANTIC_RELEASE_REGEX.captures(s).ok_or_else(error)?;
        let component = |index: usize| -> Result<u64, VersionParseError> {
            captures[index].parse().map_err(|_| error())
        };
        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

impl fmt::Display for SemanticRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How an [`ApplicationVersion`] is treated when deciding tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    SemanticRelease(SemanticRelease),
    Snapshot,
    /// Anything else. Passed through without any ordering semantics.
    Arbitrary,
}

/// The version of the packaged artifact, as found in its Maven or NPM coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationVersion {
    raw: String,
    kind: VersionKind,
}

impl ApplicationVersion {
    /// Classifies the version. Fails only when the value has the shape of a semantic release but
    /// one of its components does not fit in a `u64`.
    pub fn new(raw: impl Into<String>) -> Result<Self, VersionParseError> {
        let raw = raw.into();
        let kind = if is_semantic_release(&raw) {
            VersionKind::SemanticRelease(raw.parse()?)
        } else if raw.contains(SNAPSHOT_MARKER) {
            VersionKind::Snapshot
        } else {
            VersionKind::Arbitrary
        };
        Ok(Self { raw, kind })
    }

    /// Synthesizes the version of a snapshot build from the deliverable's file name: the artifact
    /// id prefix and the deliverable suffix are stripped, e.g.
    /// `app-1.0.0-20170101.101010-3-Leveransepakke.zip` becomes
    /// `SNAPSHOT-1.0.0-20170101.101010-3`.
    pub fn snapshot_from_deliverable(file_name: &str, artifact_id: &str, suffix: &str) -> Self {
        let stem = file_name.strip_suffix(suffix).unwrap_or(file_name);
        let stem = stem.strip_prefix(artifact_id).unwrap_or(stem);
        let stem = stem.trim_start_matches('-');
        Self {
            raw: format!("{SNAPSHOT_MARKER}-{stem}"),
            kind: VersionKind::Snapshot,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &VersionKind {
        &self.kind
    }

    pub fn semantic_release(&self) -> Option<&SemanticRelease> {
        match &self.kind {
            VersionKind::SemanticRelease(release) => Some(release),
            _ => None,
        }
    }

    pub fn is_semantic_release(&self) -> bool {
        matches!(self.kind, VersionKind::SemanticRelease(_))
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self.kind, VersionKind::Snapshot)
    }
}

impl fmt::Display for ApplicationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ApplicationVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
