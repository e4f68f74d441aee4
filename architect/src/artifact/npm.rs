use std::collections::HashMap;

use reqwest::{blocking, Url};
use serde::Deserialize;

use super::{get, sanitize_file_name, save, ArtifactSource, Deliverable};
use crate::{config::Coordinates, Result};

/// Partial package document, see
/// https://github.com/npm/registry/blob/main/docs/REGISTRY-API.md#getpackage.
#[derive(Deserialize)]
struct Package {
    versions: HashMap<String, PackageVersion>,
}

#[derive(Deserialize)]
struct PackageVersion {
    dist: Dist,
}

#[derive(Deserialize)]
struct Dist {
    tarball: String,
}

/// Downloads NodeJS deliverables from an NPM registry.
pub struct NpmRegistry {
    base_url: String,
    client: blocking::Client,
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: blocking::Client::builder().build()?,
        })
    }
}

/// Scoped packages are requested as `@scope%2fname`.
fn package_url(base_url: &str, name: &str) -> String {
    format!("{base_url}/{}", name.replace('/', "%2f"))
}

fn tarball_url(package: &Package, name: &str, version: &str) -> Result<String> {
    package
        .versions
        .get(version)
        .map(|version| version.dist.tarball.clone())
        .ok_or_else(|| format!("{name}@{version} is not published").into())
}

impl ArtifactSource for NpmRegistry {
    fn download(&self, coordinates: Coordinates<'_>) -> Result<Deliverable> {
        let Coordinates::NodeJs(gav) = coordinates else {
            return Err(format!("{coordinates} can not be downloaded from an NPM registry").into());
        };

        let package: Package = get(&self.client, &package_url(&self.base_url, &gav.npm_name))?.json()?;
        let tarball = tarball_url(&package, &gav.npm_name, &gav.version)?;

        let file_name = Url::parse(&tarball)?
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(sanitize_file_name)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}-{}.tgz", coordinates.artifact_id(), gav.version));

        save(get(&self.client, &tarball)?, &file_name)
    }
}
