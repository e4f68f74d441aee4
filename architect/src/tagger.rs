//! Builds images and publishes them under their permanent tags.
//!
//! A build and its promotion may happen in different processes, hours apart. Everything a
//! promotion needs to know about a build travels inside the image as [`BuildMetadata`], and the
//! registry tags the filter consults are read again right before every push.

use aurora_version::{
    compose, decide, ApplicationVersion, AuroraVersion, CandidateTags, TagDecision, VersionKind,
    SNAPSHOT_MARKER,
};
use log::{debug, info};

use crate::{
    artifact::Deliverable,
    builder::{BuildArgs, ImageBuilder},
    config::Config,
    context::{BuildContext, BuildContextArgs},
    error::{Error, Stage},
    image::ImageName,
    metadata::{self, BuildMetadata, Variant},
    registry::{ImageInfoProvider, RegistryCredentials},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    Release,
    Snapshot,
}

fn parse_version(value: &str, stage: Stage) -> Result<ApplicationVersion, Error> {
    ApplicationVersion::new(value).map_err(|source| Error::VersionParse { stage, source })
}

impl BuildKind {
    /// Chooses how the configured artifact is built. Versions that are neither a semantic release
    /// nor a snapshot are rejected.
    pub fn select(config: &Config) -> Result<Self, Error> {
        let version = config.coordinates()?.version();
        if config.snapshot || version.contains(SNAPSHOT_MARKER) {
            return Ok(BuildKind::Snapshot);
        }
        Self::of(&parse_version(version, Stage::Compose)?)
    }

    pub fn of(app_version: &ApplicationVersion) -> Result<Self, Error> {
        match app_version.kind() {
            VersionKind::SemanticRelease(_) => Ok(BuildKind::Release),
            VersionKind::Snapshot => Ok(BuildKind::Snapshot),
            VersionKind::Arbitrary => Err(Error::configuration(format!(
                "application version \"{app_version}\" is neither a semantic release (MAJOR.MINOR.PATCH) nor a snapshot"
            ))),
        }
    }

    /// Snapshot versions are derived from the downloaded deliverable, which carries the
    /// timestamped version the repository resolved.
    pub fn application_version(
        self,
        config: &Config,
        deliverable: &Deliverable,
    ) -> Result<ApplicationVersion, Error> {
        let coordinates = config.coordinates()?;
        match self {
            BuildKind::Release => parse_version(coordinates.version(), Stage::Compose),
            BuildKind::Snapshot => Ok(ApplicationVersion::snapshot_from_deliverable(
                deliverable.file_name(),
                coordinates.artifact_id(),
                config.application_type.deliverable_suffix(),
            )),
        }
    }

    fn variant(self, config: &Config, aurora_version: &AuroraVersion) -> Variant {
        match self {
            BuildKind::Release => Variant::Release {
                push_extra_tags: config.docker_spec.push_extra_tags,
            },
            BuildKind::Snapshot => Variant::Snapshot {
                snapshot_tag: aurora_version.to_string(),
            },
        }
    }
}

/// An image built into the local daemon.
#[derive(Debug)]
pub struct Built {
    pub image_id: String,
    pub metadata: BuildMetadata,
    pub base_image_version: String,
}

pub struct Tagger<'a> {
    config: &'a Config,
    registry: &'a dyn ImageInfoProvider,
    builder: &'a dyn ImageBuilder,
}

impl<'a> Tagger<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a dyn ImageInfoProvider,
        builder: &'a dyn ImageBuilder,
    ) -> Self {
        Self {
            config,
            registry,
            builder,
        }
    }

    pub fn login(&self, credentials: &RegistryCredentials) -> Result<(), Error> {
        let registry = &self.config.docker_spec.output_registry;
        self.builder
            .login(registry, credentials)
            .map_err(|source| Error::Transport {
                stage: Stage::Push,
                context: format!("logging in to {registry}"),
                source,
            })
    }

    fn output_image(&self, tag: &str) -> Result<ImageName, Error> {
        self.config
            .output_image()?
            .with_tag(tag)
            .map_err(|error| Error::configuration(error.to_string()))
    }

    /// Reads the complete version of the configured base image from its metadata.
    pub fn base_image_version(&self) -> Result<String, Error> {
        let docker = &self.config.docker_spec;
        let image = format!("{}:{}", docker.base_image, docker.base_version);
        let value = self
            .registry
            .manifest_env_value(
                &docker.base_image,
                &docker.base_version,
                metadata::IMAGE_VERSION,
            )
            .map_err(|source| Error::Registry {
                stage: Stage::Compose,
                context: format!("reading the metadata of {image}"),
                source,
            })?;

        match value.filter(|value| !value.trim().is_empty()) {
            Some(value) => {
                debug!("{image} is version {value}");
                Ok(value)
            }
            None => Err(Error::BaseImageVersionUnavailable {
                image,
                key: metadata::IMAGE_VERSION,
            }),
        }
    }

    fn compose(
        &self,
        app_version: &ApplicationVersion,
        base_image_version: &str,
    ) -> Result<AuroraVersion, Error> {
        Ok(compose(
            app_version,
            &self.config.builder_spec.version,
            base_image_version,
            &self.config.docker_spec.base_image,
        )?)
    }

    /// Builds the deliverable on top of the base image. The image is tagged locally with its
    /// composite version and the temporary tag, if configured.
    pub fn build(&self, kind: BuildKind, deliverable: &Deliverable) -> Result<Built, Error> {
        let docker = &self.config.docker_spec;
        let app_version = kind.application_version(self.config, deliverable)?;
        let base_image_version = self.base_image_version()?;
        let aurora_version = self.compose(&app_version, &base_image_version)?;
        let metadata = BuildMetadata {
            variant: kind.variant(self.config, &aurora_version),
            app_version,
            aurora_version,
        };
        info!(
            "building {} version {} as {}",
            docker.output_repository, metadata.app_version, metadata.aurora_version
        );

        // Pinned to the complete version the composite version was computed from.
        let base_image = ImageName::new(
            &docker.output_registry,
            &docker.base_image,
            Some(&base_image_version),
        )
        .map_err(|error| Error::configuration(format!("base image: {error}")))?;

        let context = BuildContext::prepare(BuildContextArgs {
            deliverable,
            application_type: self.config.application_type,
            base_image: &base_image,
            metadata: &metadata,
        })
        .map_err(|source| Error::Transport {
            stage: Stage::Build,
            context: "preparing the build context".to_owned(),
            source,
        })?;

        let mut tags = vec![self.output_image(metadata.aurora_version.as_str())?];
        if let Some(tag) = &docker.tag_with {
            tags.push(self.output_image(tag)?);
        }

        let output = self
            .builder
            .build(BuildArgs {
                context_dir: context.dir(),
                tags: &tags,
            })
            .map_err(|source| Error::Transport {
                stage: Stage::Build,
                context: format!("building {}", tags[0]),
                source,
            })?;
        info!("built image {}", output.image_id);

        Ok(Built {
            image_id: output.image_id,
            metadata,
            base_image_version,
        })
    }

    /// Publishes a fresh build under its permanent tags. Release versions are recomputed and the
    /// mutable tags filtered against the current registry tags.
    pub fn tag(&self, built: &Built) -> Result<Vec<String>, Error> {
        let metadata = &built.metadata;
        let tags = match metadata.variant {
            Variant::Snapshot { .. } => metadata.candidate_tags().into_vec(),
            Variant::Release { .. } => {
                let base_image_version = self.base_image_version()?;
                let aurora_version = self.compose(&metadata.app_version, &base_image_version)?;
                if aurora_version != metadata.aurora_version {
                    let docker = &self.config.docker_spec;
                    return Err(Error::Registry {
                        stage: Stage::Compose,
                        context: format!(
                            "verifying the base image {}:{}",
                            docker.base_image, docker.base_version
                        ),
                        source: format!(
                            "its version changed from {} to {base_image_version} after {} was built",
                            built.base_image_version, metadata.aurora_version
                        )
                        .into(),
                    });
                }
                self.publishable(&metadata.app_version, metadata.candidate_tags())?
            }
        };
        self.push_tags(&built.image_id, &tags)
    }

    /// Pushes the configured temporary tag without any filtering.
    pub fn tag_temporary(&self, built: &Built) -> Result<Vec<String>, Error> {
        let tag = self
            .config
            .docker_spec
            .tag_with
            .as_deref()
            .ok_or_else(|| Error::configuration("no temporary tag (dockerSpec.tagWith) configured"))?;
        self.push_tags(&built.image_id, &[tag.to_owned()])
    }

    /// Promotes an image previously pushed under the temporary tag `from`, without rebuilding it.
    pub fn retag_temporary(&self, from: &str) -> Result<Vec<String>, Error> {
        let source = self.output_image(from)?;
        let env = self
            .registry
            .manifest_env_map(source.repository(), from)
            .map_err(|error| Error::Registry {
                stage: Stage::Policy,
                context: format!("reading the metadata of {source}"),
                source: error,
            })?;
        let metadata = BuildMetadata::from_env_map(&source.to_string(), &env)?;
        info!("promoting {source} built as {}", metadata.aurora_version);

        let tags = self.publishable(&metadata.app_version, metadata.candidate_tags())?;

        self.builder
            .pull(&source)
            .map_err(|error| Error::Transport {
                stage: Stage::Push,
                context: format!("pulling {source}"),
                source: error,
            })?;
        self.push_tags(&source.to_string(), &tags)
    }

    /// Decides which tags a build of `app_version` would be published under, without pushing.
    /// The composite version is computed from the current base image unless given.
    pub fn plan(
        &self,
        app_version: ApplicationVersion,
        aurora_version: Option<AuroraVersion>,
    ) -> Result<Vec<TagDecision>, Error> {
        let kind = BuildKind::of(&app_version)?;
        let aurora_version = match aurora_version {
            Some(aurora_version) => aurora_version,
            None => self.compose(&app_version, &self.base_image_version()?)?,
        };
        let metadata = BuildMetadata {
            variant: kind.variant(self.config, &aurora_version),
            app_version,
            aurora_version,
        };
        self.decisions(&metadata.app_version, metadata.candidate_tags())
    }

    fn decisions(
        &self,
        app_version: &ApplicationVersion,
        candidates: CandidateTags,
    ) -> Result<Vec<TagDecision>, Error> {
        let docker = &self.config.docker_spec;
        let registry_tags = if docker.tag_overwrite {
            info!("tag overwrite is enabled, pushing every candidate tag");
            Vec::new()
        } else if app_version.is_semantic_release() {
            let tags = self
                .registry
                .tags(&docker.output_repository)
                .map_err(|source| Error::Registry {
                    stage: Stage::Filter,
                    context: format!("listing the tags of {}", docker.output_repository),
                    source,
                })?;
            debug!("{} has tags {tags:?}", docker.output_repository);
            tags
        } else {
            Vec::new()
        };

        decide(app_version, candidates, &registry_tags).map_err(|source| Error::VersionParse {
            stage: Stage::Filter,
            source,
        })
    }

    fn publishable(
        &self,
        app_version: &ApplicationVersion,
        candidates: CandidateTags,
    ) -> Result<Vec<String>, Error> {
        Ok(self
            .decisions(app_version, candidates)?
            .into_iter()
            .filter_map(|decision| {
                if decision.keep {
                    Some(decision.tag)
                } else {
                    info!(
                        "skipping {} tag {:?}, the registry already holds a newer release",
                        decision.class, decision.tag
                    );
                    None
                }
            })
            .collect())
    }

    /// Tags `source` with every tag and pushes them in order. Stops at the first failure, tags
    /// pushed before it stay in place.
    fn push_tags(&self, source: &str, tags: &[String]) -> Result<Vec<String>, Error> {
        let targets = tags
            .iter()
            .map(|tag| self.output_image(tag))
            .collect::<Result<Vec<_>, _>>()?;

        for (index, target) in targets.iter().enumerate() {
            let result = self
                .builder
                .tag(source, target)
                .and_then(|()| self.builder.push(target));
            if let Err(error) = result {
                return Err(Error::PartialPush {
                    pushed: tags[..index].to_vec(),
                    failed: tags[index].clone(),
                    unpushed: tags[index + 1..].to_vec(),
                    source: error,
                });
            }
            info!("pushed {target}");
        }

        Ok(tags.to_vec())
    }
}
