//! Version resolution for container images built from application deliverables.
//!
//! Every image is identified by an [`AuroraVersion`] composed of the application version, the
//! builder version and the base image it was built on:
//!
//! ```txt
//! <application version>-b<builder version>-<base image name>-<base image version>
//! 2.0.0-b1.11.0-oracle8-1.0.2
//! ```
//!
//! Besides this exact tag, a semantic release can be published under mutable tags that point at
//! the newest release of a bucket:
//!
//! ```txt
//! latest  newest release overall
//! 2       newest release in [2.0.0, 3.0.0)
//! 2.0     newest release in [2.0.0, 2.1.0)
//! 2.0.0   the application version itself, only enabled through the patch flag
//! ```
//!
//! Builds can finish out of order, so [`filter`] drops every mutable tag that would be moved
//! backwards relative to a newer release already present in the registry.

mod app_version;
mod composer;
mod filter;
mod policy;

pub use app_version::*;
pub use composer::*;
pub use filter::*;
pub use policy::*;

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds `1.2.0` and promotes it twice while the registry evolves.
    #[test]
    fn promotion_scenario_works() {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        let version = compose(&app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap();
        assert_eq!(version.as_str(), "1.2.0-b1.11.0-oracle8-1.0.2");

        let policy: PushExtraTags = "major,minor,latest".parse().unwrap();

        let first = filter(
            &app_version,
            candidate_tags(&version, &app_version, policy),
            ["1.1.0", "1.0.0"],
        )
        .unwrap();
        assert_eq!(
            first.into_vec(),
            ["1.2.0-b1.11.0-oracle8-1.0.2", "latest", "1", "1.2"]
        );

        let second = filter(
            &app_version,
            candidate_tags(&version, &app_version, policy),
            ["1.3.0"],
        )
        .unwrap();
        assert_eq!(second.into_vec(), ["1.2.0-b1.11.0-oracle8-1.0.2", "1.2"]);
    }
}
