mod local;
mod nexus;
mod npm;

use std::{
    fs,
    path::{Path, PathBuf},
};

pub use local::*;
use log::debug;
pub use nexus::*;
pub use npm::*;
use reqwest::blocking;

use crate::{config::Coordinates, temp_path::tmp_path, Result};

/// A downloaded application deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deliverable {
    pub path: PathBuf,
}

impl Deliverable {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Where deliverables are fetched from.
pub trait ArtifactSource {
    fn download(&self, coordinates: Coordinates<'_>) -> Result<Deliverable>;
}

/// Only keeps the final path component so a server provided name can not escape the download
/// directory.
fn sanitize_file_name(name: &str) -> Option<&str> {
    Path::new(name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "..")
}

/// Streams the response body into a fresh directory.
fn save(mut response: blocking::Response, file_name: &str) -> Result<Deliverable> {
    let dir = tmp_path("");
    fs::create_dir_all(&dir)?;
    let path = dir.join(file_name);
    let mut file = fs::File::create(&path)?;
    let bytes = response.copy_to(&mut file)?;
    debug!("downloaded {bytes} bytes to {}", path.display());
    Ok(Deliverable { path })
}

fn get(client: &blocking::Client, url: &str) -> Result<blocking::Response> {
    debug!("GET {url}");
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("GET {url} returned {status}").into());
    }
    Ok(response)
}
