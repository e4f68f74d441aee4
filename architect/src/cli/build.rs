use clap::Args;
use log::info;

use super::CommonArgs;
use crate::{
    artifact::{ArtifactSource, LocalRepository, NexusDownloader, NpmRegistry},
    builder::DockerBuilder,
    config::{ApplicationType, Config},
    error::{Error, Stage},
    tagger::{BuildKind, Tagger},
    Result,
};

const DEFAULT_MAVEN_REPO: &str = "http://aurora/nexus/service/local/artifact/maven/content";
const DEFAULT_NPM_REGISTRY: &str = "http://aurora/npm/repository/npm-internal";

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Build the image without pushing any tag.
    #[arg(long = "skip-push", default_value_t)]
    pub skip_push: bool,

    /// Resolve Maven deliverables from the local repository in ~/.m2/repository.
    #[arg(long = "local-repo", default_value_t)]
    pub local_repo: bool,

    /// The Nexus Maven content API to download Maven deliverables from.
    #[arg(long = "maven-repo", env = "MAVEN_REPO", default_value = DEFAULT_MAVEN_REPO)]
    pub maven_repo: String,

    /// The NPM registry to download NodeJS deliverables from.
    #[arg(long = "npm-registry", env = "NPM_REGISTRY", default_value = DEFAULT_NPM_REGISTRY)]
    pub npm_registry: String,

    /// Push the built image under this temporary tag only, overriding dockerSpec.tagWith.
    #[arg(long = "tag-with")]
    pub tag_with: Option<String>,
}

fn artifact_source(config: &Config, args: &BuildArgs) -> Result<Box<dyn ArtifactSource>> {
    Ok(match config.application_type {
        ApplicationType::Java if args.local_repo => Box::new(LocalRepository::maven_default()?),
        ApplicationType::Java => Box::new(NexusDownloader::new(&args.maven_repo)?),
        ApplicationType::NodeJs => Box::new(NpmRegistry::new(&args.npm_registry)?),
    })
}

pub fn build(common: &CommonArgs, args: BuildArgs) -> Result<()> {
    let config = common.config(|config| {
        if let Some(tag) = &args.tag_with {
            config.docker_spec.tag_with = Some(tag.clone());
        }
    })?;
    let kind = BuildKind::select(&config)?;

    let coordinates = config.coordinates()?;
    info!("downloading {coordinates}");
    let deliverable = artifact_source(&config, &args)?
        .download(coordinates)
        .map_err(|source| Error::Transport {
            stage: Stage::Download,
            context: format!("downloading {coordinates}"),
            source,
        })?;

    let registry = common.registry(&config)?;
    let builder = DockerBuilder;
    let tagger = Tagger::new(&config, &registry, &builder);
    let built = tagger.build(kind, &deliverable)?;

    if args.skip_push {
        info!("skipping push of {}", built.metadata.aurora_version);
        return Ok(());
    }

    if let Some(credentials) = common.credentials() {
        tagger.login(&credentials)?;
    }

    let pushed = if config.docker_spec.tag_with.is_some() {
        tagger.tag_temporary(&built)?
    } else {
        tagger.tag(&built)?
    };
    info!("published {}", pushed.join(", "));

    Ok(())
}
