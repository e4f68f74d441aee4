use std::{fmt, path::Path};

use aurora_version::PushExtraTags;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::Error, image::ImageName};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApplicationType {
    #[serde(rename = "JavaLeveransepakke")]
    Java,
    #[serde(rename = "NodeJsLeveranse")]
    NodeJs,
}

impl ApplicationType {
    /// The file name suffix of a deliverable of this type.
    pub const fn deliverable_suffix(self) -> &'static str {
        match self {
            ApplicationType::Java => "-Leveransepakke.zip",
            ApplicationType::NodeJs => ".tgz",
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplicationType::Java => "JavaLeveransepakke",
            ApplicationType::NodeJs => "NodeJsLeveranse",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MavenGav {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub classifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeJsGav {
    pub npm_name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockerSpec {
    pub output_registry: String,
    pub output_repository: String,
    /// Repository of the base image, e.g. `aurora/oracle8`.
    pub base_image: String,
    /// Tag of the base image the complete base image version is read from.
    pub base_version: String,
    #[serde(default)]
    pub push_extra_tags: PushExtraTags,
    /// Registry API endpoint used to look up tags and image metadata. Defaults to the output
    /// registry.
    #[serde(default)]
    pub external_docker_registry: Option<String>,
    /// Temporary tag a fresh build is pushed under for verification before promotion.
    #[serde(default)]
    pub tag_with: Option<String>,
    /// Temporary tag of a previous build to promote.
    #[serde(default)]
    pub retag_with: Option<String>,
    /// Push every candidate tag without consulting the registry.
    #[serde(default)]
    pub tag_overwrite: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuilderSpec {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub application_type: ApplicationType,
    #[serde(default)]
    pub maven_gav: Option<MavenGav>,
    #[serde(default, rename = "nodeJsGav")]
    pub nodejs_gav: Option<NodeJsGav>,
    /// NPM has no snapshot semantics of its own, so snapshot builds are requested explicitly.
    #[serde(default)]
    pub snapshot: bool,
    pub docker_spec: DockerSpec,
    pub builder_spec: BuilderSpec,
}

/// Coordinates identifying the deliverable to package.
#[derive(Debug, Clone, Copy)]
pub enum Coordinates<'a> {
    Maven(&'a MavenGav),
    NodeJs(&'a NodeJsGav),
}

impl<'a> Coordinates<'a> {
    /// Name the deliverable file starts with.
    pub fn artifact_id(&self) -> &'a str {
        match *self {
            Coordinates::Maven(gav) => &gav.artifact_id,
            Coordinates::NodeJs(gav) => gav.npm_name.rsplit('/').next().unwrap_or(&gav.npm_name),
        }
    }

    pub fn version(&self) -> &'a str {
        match *self {
            Coordinates::Maven(gav) => &gav.version,
            Coordinates::NodeJs(gav) => &gav.version,
        }
    }
}

impl fmt::Display for Coordinates<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinates::Maven(gav) => {
                write!(f, "{}:{}:{}", gav.group_id, gav.artifact_id, gav.version)?;
                if let Some(classifier) = &gav.classifier {
                    write!(f, ":{classifier}")?;
                }
                Ok(())
            }
            Coordinates::NodeJs(gav) => write!(f, "{}@{}", gav.npm_name, gav.version),
        }
    }
}

fn require(value: &str, name: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        Err(Error::configuration(format!("{name} must not be empty")))
    } else {
        Ok(())
    }
}

impl Config {
    /// Reads the configuration from a JSON or YAML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|error| {
            Error::configuration(format!("unable to read {}: {error}", path.display()))
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|extension| extension.to_str()),
            Some("yaml" | "yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(&content).map_err(|error| error.to_string())
        } else {
            serde_json::from_str(&content).map_err(|error| error.to_string())
        }
        .map_err(|error| {
            Error::configuration(format!("unable to parse {}: {error}", path.display()))
        })?;
        debug!("read configuration from {}", path.display());
        Ok(config)
    }

    /// Parses a JSON configuration, as handed to the build through the environment.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|error| Error::configuration(format!("unable to parse configuration: {error}")))
    }

    pub fn coordinates(&self) -> Result<Coordinates<'_>, Error> {
        match self.application_type {
            ApplicationType::Java => self.maven_gav.as_ref().map(Coordinates::Maven),
            ApplicationType::NodeJs => self.nodejs_gav.as_ref().map(Coordinates::NodeJs),
        }
        .ok_or_else(|| {
            Error::configuration(format!(
                "no artifact coordinates given for application type {}",
                self.application_type
            ))
        })
    }

    /// Checks every input the build and promotion need, so that a bad configuration fails before
    /// the registry is contacted.
    pub fn validate(&self) -> Result<(), Error> {
        match self.coordinates()? {
            Coordinates::Maven(gav) => {
                require(&gav.group_id, "mavenGav.groupId")?;
                require(&gav.artifact_id, "mavenGav.artifactId")?;
                require(&gav.version, "mavenGav.version")?;
            }
            Coordinates::NodeJs(gav) => {
                require(&gav.npm_name, "nodeJsGav.npmName")?;
                require(&gav.version, "nodeJsGav.version")?;
            }
        }

        let docker = &self.docker_spec;
        require(&docker.output_registry, "dockerSpec.outputRegistry")?;
        require(&docker.output_repository, "dockerSpec.outputRepository")?;
        require(&docker.base_image, "dockerSpec.baseImage")?;
        require(&docker.base_version, "dockerSpec.baseVersion")?;
        require(&self.builder_spec.version, "builderSpec.version")?;

        for (tag, name) in [
            (&docker.tag_with, "dockerSpec.tagWith"),
            (&docker.retag_with, "dockerSpec.retagWith"),
        ] {
            if let Some(tag) = tag {
                require(tag, name)?;
            }
        }

        self.output_image()?;
        Ok(())
    }

    /// The output image, without a tag.
    pub fn output_image(&self) -> Result<ImageName, Error> {
        ImageName::new(
            &self.docker_spec.output_registry,
            &self.docker_spec.output_repository,
            None,
        )
        .map_err(|error| Error::configuration(error.to_string()))
    }

    /// The endpoint of the registry API used to look up tags and image metadata.
    pub fn registry_endpoint(&self) -> String {
        let registry = self
            .docker_spec
            .external_docker_registry
            .as_deref()
            .filter(|registry| !registry.trim().is_empty())
            .unwrap_or(&self.docker_spec.output_registry)
            .trim_end_matches('/');
        if registry.starts_with("http://") || registry.starts_with("https://") {
            registry.to_owned()
        } else {
            format!("https://{registry}")
        }
    }
}
