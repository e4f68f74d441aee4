use log::debug;

use super::{BuildArgs, BuildOutput, ImageBuilder};
use crate::{docker, image::ImageName, registry::RegistryCredentials, Result};

/// Builds and pushes through the `docker` command line.
pub struct DockerBuilder;

impl ImageBuilder for DockerBuilder {
    fn build(&self, args: BuildArgs<'_>) -> Result<BuildOutput> {
        let tags: Vec<String> = args.tags.iter().map(ToString::to_string).collect();
        let docker::BuildOutput { image_id } = docker::build(docker::BuildArgs {
            context_dir: args.context_dir,
            tags: &tags,
        })?;
        debug!("image_id: {image_id:?}");
        Ok(BuildOutput { image_id })
    }

    fn login(&self, registry: &str, credentials: &RegistryCredentials) -> Result<()> {
        docker::login(registry, credentials)
    }

    fn pull(&self, image: &ImageName) -> Result<()> {
        docker::pull(&image.to_string())
    }

    fn tag(&self, source: &str, target: &ImageName) -> Result<()> {
        docker::tag(source, &target.to_string())
    }

    fn push(&self, image: &ImageName) -> Result<()> {
        docker::push(&image.to_string())
    }
}
