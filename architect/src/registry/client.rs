use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use log::debug;
use reqwest::{blocking, header};
use serde::Deserialize;

use super::{ImageInfoProvider, RegistryCredentials};
use crate::{metadata, Result};

const TIMEOUT: Duration = Duration::from_secs(30);

const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
const DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

// Authoritative list: https://github.com/google/go-containerregistry/blob/6bce25ecf0297c1aa9072bc665b5cf58d53e1c54/pkg/v1/types/types.go#L22
const ACCEPTABLE_MANIFEST_TYPES: &[&str] =
    &[DOCKER_MANIFEST, DOCKER_MANIFEST_LIST, OCI_MANIFEST, OCI_INDEX];

/// Response of `GET /v2/<name>/tags/list`. A repository without tags may report `null`.
#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct Descriptor {
    digest: String,
    #[serde(default)]
    platform: Option<Platform>,
}

#[derive(Deserialize)]
struct Platform {
    architecture: String,
    os: String,
}

/// Either an image manifest (with `config`) or a manifest list / image index (with `manifests`).
#[derive(Deserialize)]
struct Manifest {
    #[serde(default)]
    config: Option<Descriptor>,
    #[serde(default)]
    manifests: Option<Vec<Descriptor>>,
}

/// Partial image configuration, see
/// https://github.com/opencontainers/image-spec/blob/main/config.md.
#[derive(Deserialize)]
struct ImageConfig {
    #[serde(default)]
    config: Option<ContainerConfig>,
}

#[derive(Deserialize)]
struct ContainerConfig {
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
}

/// Picks the `linux/amd64` entry of a manifest list, or the first entry if there is none.
fn select_manifest(manifests: &[Descriptor]) -> Option<&str> {
    manifests
        .iter()
        .find(|descriptor| {
            descriptor
                .platform
                .as_ref()
                .is_some_and(|platform| platform.os == "linux" && platform.architecture == "amd64")
        })
        .or(manifests.first())
        .map(|descriptor| descriptor.digest.as_str())
}

/// Extracts the target of a `Link: <...>; rel="next"` pagination header, resolved against the
/// registry endpoint.
fn next_link(value: &str, endpoint: &str) -> Option<String> {
    value.split(',').find_map(|link| {
        let (target, params) = link.split_once(';')?;
        if !params.contains(r#"rel="next""#) {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Some(if target.starts_with('/') {
            format!("{endpoint}{target}")
        } else {
            target.to_owned()
        })
    })
}

/// Upper bound on the number of tag list pages read for one repository.
const MAX_TAG_PAGES: usize = 1000;

/// The tag list page following the `visited` ones. A page that was already read or more than
/// [`MAX_TAG_PAGES`] pages are an error, an incomplete tag list must not reach the filter.
fn next_page(
    link: Option<&str>,
    endpoint: &str,
    visited: &HashSet<String>,
) -> Result<Option<String>> {
    let Some(next) = link.and_then(|value| next_link(value, endpoint)) else {
        return Ok(None);
    };
    if visited.contains(&next) {
        return Err(format!("registry returned the tag list page {next} twice").into());
    }
    if visited.len() >= MAX_TAG_PAGES {
        return Err(format!("tag list has more than {MAX_TAG_PAGES} pages").into());
    }
    Ok(Some(next))
}

/// Client for the registry HTTP API, see https://distribution.github.io/distribution/spec/api/.
pub struct RegistryClient {
    endpoint: String,
    credentials: Option<RegistryCredentials>,
    client: blocking::Client,
}

impl RegistryClient {
    pub fn new(endpoint: impl Into<String>, credentials: Option<RegistryCredentials>) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            credentials,
            client: blocking::Client::builder().timeout(TIMEOUT).build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn get(&self, url: &str, accept: Option<&str>) -> Result<blocking::Response> {
        debug!("GET {url}");
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("GET {url} returned {status}").into());
        }
        Ok(response)
    }

    fn manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        let url = format!(
            "{endpoint}/v2/{repository}/manifests/{reference}",
            endpoint = self.endpoint
        );
        Ok(self
            .get(&url, Some(&ACCEPTABLE_MANIFEST_TYPES.join(",")))?
            .json()?)
    }
}

impl ImageInfoProvider for RegistryClient {
    fn tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        let mut url = format!(
            "{endpoint}/v2/{repository}/tags/list",
            endpoint = self.endpoint
        );
        let mut visited = HashSet::new();
        loop {
            let response = self.get(&url, None)?;
            let link = response
                .headers()
                .get(header::LINK)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let page: TagList = response.json()?;
            tags.extend(page.tags.unwrap_or_default());
            visited.insert(url);
            match next_page(link.as_deref(), &self.endpoint, &visited)? {
                Some(next) => url = next,
                None => break,
            }
        }
        debug!("{repository} has {} tags", tags.len());
        Ok(tags)
    }

    fn manifest_env_map(&self, repository: &str, tag: &str) -> Result<HashMap<String, String>> {
        let mut manifest = self.manifest(repository, tag)?;
        if let Some(manifests) = manifest.manifests.as_deref() {
            let digest = select_manifest(manifests)
                .ok_or_else(|| format!("manifest list of {repository}:{tag} is empty"))?
                .to_owned();
            debug!("{repository}:{tag} is a manifest list, using {digest}");
            manifest = self.manifest(repository, &digest)?;
        }

        let config = manifest
            .config
            .ok_or_else(|| format!("manifest of {repository}:{tag} has no config"))?;
        let url = format!(
            "{endpoint}/v2/{repository}/blobs/{digest}",
            endpoint = self.endpoint,
            digest = config.digest
        );
        let image_config: ImageConfig = self.get(&url, None)?.json()?;

        Ok(metadata::parse_env(
            image_config
                .config
                .and_then(|config| config.env)
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_link_works() {
        assert_eq!(
            next_link(
                r#"</v2/aurora/console/tags/list?last=1.2.0&n=100>; rel="next""#,
                "https://registry.example"
            )
            .as_deref(),
            Some("https://registry.example/v2/aurora/console/tags/list?last=1.2.0&n=100")
        );
        assert_eq!(
            next_link(
                r#"<https://other.example/v2/x/tags/list?last=a>; rel="next""#,
                "https://registry.example"
            )
            .as_deref(),
            Some("https://other.example/v2/x/tags/list?last=a")
        );
        assert_eq!(
            next_link(r#"</v2/x/tags/list>; rel="prev""#, "https://registry.example"),
            None
        );
    }

    #[test]
    fn next_page_stops_on_repeated_pages() {
        let endpoint = "https://registry.example";
        let first = format!("{endpoint}/v2/x/tags/list");
        let second = format!("{endpoint}/v2/x/tags/list?last=b");
        let mut visited = HashSet::from([first.clone()]);

        let link = r#"</v2/x/tags/list?last=b>; rel="next""#;
        assert_eq!(next_page(Some(link), endpoint, &visited).unwrap(), Some(second.clone()));
        assert_eq!(next_page(None, endpoint, &visited).unwrap(), None);

        visited.insert(second);
        assert!(next_page(Some(link), endpoint, &visited).is_err());

        let link = r#"</v2/x/tags/list>; rel="next""#;
        assert!(next_page(Some(link), endpoint, &HashSet::from([first])).is_err());
    }

    #[test]
    fn next_page_is_bounded() {
        let endpoint = "https://registry.example";
        let visited: HashSet<String> = (0..MAX_TAG_PAGES)
            .map(|page| format!("{endpoint}/v2/x/tags/list?last={page}"))
            .collect();
        let link = r#"</v2/x/tags/list?last=next>; rel="next""#;
        assert!(next_page(Some(link), endpoint, &visited).is_err());
    }

    #[test]
    fn select_manifest_prefers_linux_amd64() {
        let list: Manifest = serde_json::from_str(
            r#"{
                "schemaVersion": 2,
                "mediaType": "application/vnd.oci.image.index.v1+json",
                "manifests": [
                    { "digest": "sha256:arm", "platform": { "architecture": "arm64", "os": "linux" } },
                    { "digest": "sha256:amd", "platform": { "architecture": "amd64", "os": "linux" } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            select_manifest(list.manifests.as_deref().unwrap()),
            Some("sha256:amd")
        );

        let list: Manifest =
            serde_json::from_str(r#"{ "manifests": [{ "digest": "sha256:only" }] }"#).unwrap();
        assert_eq!(
            select_manifest(list.manifests.as_deref().unwrap()),
            Some("sha256:only")
        );
        assert_eq!(select_manifest(&[]), None);
    }

    #[test]
    fn image_config_env_is_parsed() {
        let config: ImageConfig = serde_json::from_str(
            r#"{ "architecture": "amd64", "config": { "Env": ["IMAGE_VERSION=1.0.2", "LANG=C"] } }"#,
        )
        .unwrap();
        let env = metadata::parse_env(config.config.and_then(|config| config.env).unwrap());
        assert_eq!(env["IMAGE_VERSION"], "1.0.2");

        let tags: TagList = serde_json::from_str(r#"{ "name": "aurora/console", "tags": null }"#).unwrap();
        assert!(tags.tags.is_none());
    }
}
