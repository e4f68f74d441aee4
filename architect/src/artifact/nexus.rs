use reqwest::{blocking, header, Url};

use super::{get, sanitize_file_name, save, ArtifactSource, Deliverable};
use crate::{config::Coordinates, Result};

pub const DEFAULT_CLASSIFIER: &str = "Leveransepakke";

/// Downloads Maven deliverables through the Nexus content API, e.g.
/// `http://nexus/service/local/artifact/maven/content`.
pub struct NexusDownloader {
    base_url: String,
    client: blocking::Client,
}

impl NexusDownloader {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: blocking::Client::builder().build()?,
        })
    }
}

/// Extracts `filename` from a `Content-Disposition: attachment; filename="..."` header.
fn content_disposition_file_name(value: &str) -> Option<&str> {
    value.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        (key.trim() == "filename").then(|| value.trim().trim_matches('"'))
    })
}

impl ArtifactSource for NexusDownloader {
    fn download(&self, coordinates: Coordinates<'_>) -> Result<Deliverable> {
        let Coordinates::Maven(gav) = coordinates else {
            return Err(format!("{coordinates} can not be downloaded from Nexus").into());
        };
        let classifier = gav.classifier.as_deref().unwrap_or(DEFAULT_CLASSIFIER);

        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("r", "public")
            .append_pair("g", &gav.group_id)
            .append_pair("a", &gav.artifact_id)
            .append_pair("v", &gav.version)
            .append_pair("e", "zip")
            .append_pair("c", classifier);

        let response = get(&self.client, url.as_str())?;

        // Snapshot versions are resolved by Nexus, the actual name carries the timestamp.
        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(content_disposition_file_name)
            .or_else(|| {
                response
                    .url()
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|segment| segment.ends_with(".zip"))
            })
            .and_then(sanitize_file_name)
            .map(str::to_owned)
            .unwrap_or_else(|| {
                format!(
                    "{artifact}-{version}-{classifier}.zip",
                    artifact = gav.artifact_id,
                    version = gav.version,
                )
            });

        save(response, &file_name)
    }
}
