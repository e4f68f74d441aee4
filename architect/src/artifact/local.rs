use std::path::PathBuf;

use log::debug;

use super::{ArtifactSource, Deliverable, DEFAULT_CLASSIFIER};
use crate::{config::Coordinates, Result};

/// A local Maven repository, `~/.m2/repository` by default.
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn maven_default() -> Result<Self> {
        let home = home::home_dir().ok_or("failed to determine home directory")?;
        Ok(Self::new(home.join(".m2").join("repository")))
    }
}

impl ArtifactSource for LocalRepository {
    fn download(&self, coordinates: Coordinates<'_>) -> Result<Deliverable> {
        let Coordinates::Maven(gav) = coordinates else {
            return Err(format!("{coordinates} can not be resolved from a local Maven repository").into());
        };
        let classifier = gav.classifier.as_deref().unwrap_or(DEFAULT_CLASSIFIER);

        let mut path = self.root.clone();
        path.extend(gav.group_id.split('.'));
        path.push(&gav.artifact_id);
        path.push(&gav.version);
        path.push(format!(
            "{artifact}-{version}-{classifier}.zip",
            artifact = gav.artifact_id,
            version = gav.version,
        ));

        debug!("looking up {coordinates} at {}", path.display());
        if !path.is_file() {
            return Err(format!("{coordinates} not found at {}", path.display()).into());
        }
        Ok(Deliverable { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MavenGav, NodeJsGav};

    fn gav() -> MavenGav {
        MavenGav {
            group_id: "no.example.aurora".to_owned(),
            artifact_id: "console".to_owned(),
            version: "1.2.0".to_owned(),
            classifier: None,
        }
    }

    #[test]
    fn local_repository_works() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("no/example/aurora/console/1.2.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("console-1.2.0-Leveransepakke.zip"), b"PK").unwrap();

        let repository = LocalRepository::new(root.path());
        let gav = gav();
        let deliverable = repository.download(Coordinates::Maven(&gav)).unwrap();
        assert_eq!(deliverable.file_name(), "console-1.2.0-Leveransepakke.zip");
    }

    #[test]
    fn missing_artifacts_fail() {
        let root = tempfile::tempdir().unwrap();
        let repository = LocalRepository::new(root.path());
        let gav = gav();
        assert!(repository.download(Coordinates::Maven(&gav)).is_err());

        let npm = NodeJsGav {
            npm_name: "web".to_owned(),
            version: "1.0.0".to_owned(),
        };
        assert!(repository.download(Coordinates::NodeJs(&npm)).is_err());
    }
}
