mod build;
mod plan;
mod promote;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use constcat::concat;
use log::debug;

use crate::{
    config::Config,
    error::Error,
    registry::{RegistryClient, RegistryCredentials},
    version, Result,
};

const CONFIG_ENV: &str = "ARCHITECT_CONFIG";

#[derive(Debug, Parser)]
#[command(version = version::VERSION, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download the deliverable, build the image and push it
    Build(build::BuildArgs),

    /// Publish a previously built temporary image under its permanent tags
    Promote(promote::PromoteArgs),

    /// Show which tags a version would be published under without pushing anything
    #[command(arg_required_else_help = true)]
    Plan(plan::PlanArgs),
}

#[derive(Debug, Args)]
pub(crate) struct CommonArgs {
    /// Path to the build configuration, JSON or YAML (.yaml, .yml).
    #[arg(long = "config", short = 'f', global = true)]
    config: Option<PathBuf>,

    #[arg(long = "config-json", env = CONFIG_ENV, hide_env_values = true, global = true, help = concat!("The build configuration as JSON. Read from ", CONFIG_ENV, " unless --config is given."))]
    config_json: Option<String>,

    #[arg(long = "registry-username", env = "REGISTRY_USERNAME", global = true)]
    registry_username: Option<String>,

    #[arg(long = "registry-password", env = "REGISTRY_PASSWORD", hide_env_values = true, global = true)]
    registry_password: Option<String>,
}

impl CommonArgs {
    /// Reads the configuration, applies command line overrides and validates the result. A
    /// configuration file takes precedence over JSON from the environment.
    fn config(&self, overrides: impl FnOnce(&mut Config)) -> Result<Config, Error> {
        let mut config = match (&self.config, &self.config_json) {
            (Some(path), _) => Config::from_file(path)?,
            (None, Some(json)) => {
                debug!("reading configuration from {CONFIG_ENV}");
                Config::from_json(json)?
            }
            (None, None) => {
                return Err(Error::configuration(concat!(
                    "no configuration given, pass --config or set ",
                    CONFIG_ENV
                )))
            }
        };
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn credentials(&self) -> Option<RegistryCredentials> {
        match (&self.registry_username, &self.registry_password) {
            (Some(username), Some(password)) => Some(RegistryCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    fn registry(&self, config: &Config) -> Result<RegistryClient> {
        let client = RegistryClient::new(config.registry_endpoint(), self.credentials())?;
        debug!("using the registry API at {}", client.endpoint());
        Ok(client)
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let Cli { command, common } = self;
        match command {
            Commands::Build(args) => build::build(&common, args),
            Commands::Promote(args) => promote::promote(&common, args),
            Commands::Plan(args) => plan::plan(&common, args),
        }
    }
}
