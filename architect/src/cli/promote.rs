use clap::Args;
use log::info;

use super::CommonArgs;
use crate::{builder::DockerBuilder, error::Error, tagger::Tagger, Result};

#[derive(Debug, Args)]
pub struct PromoteArgs {
    /// The temporary tag to promote, overriding dockerSpec.retagWith.
    #[arg(long = "from")]
    pub from: Option<String>,
}

pub fn promote(common: &CommonArgs, args: PromoteArgs) -> Result<()> {
    let config = common.config(|config| {
        if let Some(from) = args.from {
            config.docker_spec.retag_with = Some(from);
        }
    })?;
    let from = config.docker_spec.retag_with.as_deref().ok_or_else(|| {
        Error::configuration("nothing to promote, pass --from or set dockerSpec.retagWith")
    })?;

    let registry = common.registry(&config)?;
    let builder = DockerBuilder;
    let tagger = Tagger::new(&config, &registry, &builder);
    if let Some(credentials) = common.credentials() {
        tagger.login(&credentials)?;
    }

    let pushed = tagger.retag_temporary(from)?;
    info!("promoted {from} to {}", pushed.join(", "));

    Ok(())
}
