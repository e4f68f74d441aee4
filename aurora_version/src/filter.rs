use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::{
    is_semantic_release, ApplicationVersion, CandidateTags, SemanticRelease, VersionParseError,
};

pub const LATEST_TAG: &str = "latest";

static MAJOR_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());
static MINOR_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").unwrap());

/// The role a tag plays in a repository. Only `Latest`, `Major` and `Minor` tags are mutable
/// pointers; everything else is an exact tag that identifies one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Latest,
    Major,
    Minor,
    Exact,
}

impl TagClass {
    pub fn of(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case(LATEST_TAG) {
            TagClass::Latest
        } else if MAJOR_TAG_REGEX.is_match(tag) {
            TagClass::Major
        } else if MINOR_TAG_REGEX.is_match(tag) {
            TagClass::Minor
        } else {
            TagClass::Exact
        }
    }

    pub fn is_mutable(self) -> bool {
        !matches!(self, TagClass::Exact)
    }
}

impl fmt::Display for TagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagClass::Latest => "latest",
            TagClass::Major => "major",
            TagClass::Minor => "minor",
            TagClass::Exact => "exact",
        })
    }
}

/// Which mutable tag classes already designate something newer than the version being published.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Exclusions {
    pub latest: bool,
    pub major: bool,
    pub minor: bool,
}

impl Exclusions {
    /// Inspects the tags currently in the registry. Tags that do not look like semantic releases
    /// are ignored.
    ///
    /// - `latest` is excluded by any release newer than `version`.
    /// - the major tag is excluded by a release in `(version, (major + 1).0.0)`.
    /// - the minor tag is excluded by a release in `(version, major.(minor + 1).0)`.
    pub fn compute<I>(version: &SemanticRelease, registry_tags: I) -> Result<Self, VersionParseError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let major_end = version.major_bucket_end();
        let minor_end = version.minor_bucket_end();
        let below = |end: &Option<SemanticRelease>, other: &SemanticRelease| {
            end.as_ref().map_or(true, |end| other < end)
        };

        let mut exclusions = Self::default();
        for tag in registry_tags {
            let tag = tag.as_ref();
            if !is_semantic_release(tag) {
                continue;
            }
            let other: SemanticRelease = tag.parse()?;
            if other <= *version {
                continue;
            }
            exclusions.latest = true;
            exclusions.major |= below(&major_end, &other);
            exclusions.minor |= below(&minor_end, &other);
        }
        Ok(exclusions)
    }

    pub fn excludes(&self, class: TagClass) -> bool {
        match class {
            TagClass::Latest => self.latest,
            TagClass::Major => self.major,
            TagClass::Minor => self.minor,
            TagClass::Exact => false,
        }
    }
}

/// The outcome of filtering a single candidate tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDecision {
    pub tag: String,
    pub class: TagClass,
    pub keep: bool,
}

/// Decides for every candidate whether it may be pushed. Candidates of a version that is not a
/// semantic release are all kept.
pub fn decide<I>(
    app_version: &ApplicationVersion,
    candidates: CandidateTags,
    registry_tags: I,
) -> Result<Vec<TagDecision>, VersionParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let exclusions = match app_version.semantic_release() {
        Some(release) => Exclusions::compute(release, registry_tags)?,
        None => Exclusions::default(),
    };

    Ok(candidates
        .into_iter()
        .map(|tag| {
            let class = TagClass::of(&tag);
            TagDecision {
                keep: !exclusions.excludes(class),
                tag,
                class,
            }
        })
        .collect())
}

/// Removes every mutable candidate that would move backwards relative to a newer release already
/// present in the registry. Exact tags are never removed.
pub fn filter<I>(
    app_version: &ApplicationVersion,
    candidates: CandidateTags,
    registry_tags: I,
) -> Result<CandidateTags, VersionParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    if !app_version.is_semantic_release() {
        return Ok(candidates);
    }

    Ok(decide(app_version, candidates, registry_tags)?
        .into_iter()
        .filter_map(|decision| decision.keep.then_some(decision.tag))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{candidate_tags, compose, PushExtraTags};

    const COMPOSITE: &str = "1.2.0-b1.11.0-oracle8-1.0.2";

    fn candidates(app_version: &ApplicationVersion) -> CandidateTags {
        let version = compose(app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap();
        candidate_tags(&version, app_version, PushExtraTags::ALL)
    }

    fn run(app_version: &str, registry_tags: &[&str]) -> Vec<String> {
        let app_version = ApplicationVersion::new(app_version).unwrap();
        filter(&app_version, candidates(&app_version), registry_tags)
            .unwrap()
            .into_vec()
    }

    #[test]
    fn tag_class_works() {
        assert_eq!(TagClass::of("latest"), TagClass::Latest);
        assert_eq!(TagClass::of(" Latest "), TagClass::Latest);
        assert_eq!(TagClass::of("2"), TagClass::Major);
        assert_eq!(TagClass::of("2.3"), TagClass::Minor);
        assert_eq!(TagClass::of("2.3.1"), TagClass::Exact);
        assert_eq!(TagClass::of("2x3"), TagClass::Exact);
        assert_eq!(TagClass::of(COMPOSITE), TagClass::Exact);
    }

    #[test]
    fn empty_registry_keeps_everything() {
        assert_eq!(run("1.2.0", &[]), [COMPOSITE, "latest", "1", "1.2", "1.2.0"]);
    }

    #[test]
    fn older_releases_keep_everything() {
        assert_eq!(
            run("1.2.0", &["1.1.0", "1.0.0", "0.9.9", "1", "1.1", "latest"]),
            [COMPOSITE, "latest", "1", "1.2", "1.2.0"]
        );
    }

    #[test]
    fn newer_release_in_next_minor_excludes_major_and_latest() {
        assert_eq!(run("1.2.0", &["1.3.0"]), [COMPOSITE, "1.2", "1.2.0"]);
    }

    #[test]
    fn newer_patch_excludes_every_mutable_tag() {
        assert_eq!(run("1.2.0", &["1.2.1"]), [COMPOSITE, "1.2.0"]);
    }

    #[test]
    fn newer_major_only_excludes_latest() {
        assert_eq!(run("1.2.0", &["2.0.0"]), [COMPOSITE, "1", "1.2", "1.2.0"]);
    }

    #[test]
    fn republishing_the_same_release_keeps_everything() {
        assert_eq!(
            run("1.2.0", &["1.2.0", COMPOSITE]),
            [COMPOSITE, "latest", "1", "1.2", "1.2.0"]
        );
    }

    #[test]
    fn non_release_registry_tags_are_ignored() {
        assert_eq!(
            run(
                "1.2.0",
                &["9", "9.9", "1.3.0-b1.11.0-oracle8-1.0.2", "SNAPSHOT-x", "1.3.0-rc1"]
            ),
            [COMPOSITE, "latest", "1", "1.2", "1.2.0"]
        );
    }

    #[test]
    fn major_bucket_monotonicity() {
        let version = SemanticRelease::new(3, 4, 5);
        for other in ["3.4.6", "3.5.0", "3.99.0"] {
            assert!(Exclusions::compute(&version, [other]).unwrap().major, "{other}");
        }
        for other in ["3.4.5", "3.4.4", "2.99.99", "4.0.0", "10.0.0"] {
            assert!(!Exclusions::compute(&version, [other]).unwrap().major, "{other}");
        }
    }

    #[test]
    fn exact_tags_are_never_excluded() {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        let candidates = CandidateTags::from(vec![COMPOSITE.to_owned(), "1.2.0".to_owned()]);
        let filtered = filter(&app_version, candidates.clone(), ["1.2.1", "1.3.0", "2.0.0"]).unwrap();
        assert_eq!(filtered, candidates);
    }

    #[test]
    fn non_semantic_versions_pass_through() {
        for version in ["SNAPSHOT-feature", "1.0", "nightly"] {
            let app_version = ApplicationVersion::new(version).unwrap();
            let candidates = CandidateTags::from(vec![
                "x".to_owned(),
                "latest".to_owned(),
                "1".to_owned(),
            ]);
            assert_eq!(
                filter(&app_version, candidates.clone(), ["99.0.0"]).unwrap(),
                candidates
            );
        }
    }

    #[test]
    fn unparsable_registry_release_fails() {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        let error = filter(
            &app_version,
            candidates(&app_version),
            ["1.3.99999999999999999999"],
        )
        .unwrap_err();
        assert_eq!(error.value(), "1.3.99999999999999999999");
    }

    #[test]
    fn decide_reports_classes() {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        let decisions = decide(&app_version, candidates(&app_version), ["1.3.0"]).unwrap();
        let summary: Vec<_> = decisions
            .iter()
            .map(|decision| (decision.class, decision.keep))
            .collect();
        assert_eq!(
            summary,
            [
                (TagClass::Exact, true),
                (TagClass::Latest, false),
                (TagClass::Major, false),
                (TagClass::Minor, true),
                (TagClass::Exact, true),
            ]
        );
    }
}
