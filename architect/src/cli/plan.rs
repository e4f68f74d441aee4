use aurora_version::{ApplicationVersion, AuroraVersion};
use clap::Args;

use super::CommonArgs;
use crate::{
    builder::DockerBuilder,
    error::{Error, Stage},
    tagger::Tagger,
    Result,
};

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// The application version to plan for, e.g. 1.2.0.
    #[arg(long = "app-version")]
    pub app_version: String,

    /// Use this composite version instead of composing one from the current base image.
    #[arg(long = "aurora-version")]
    pub aurora_version: Option<String>,
}

pub fn plan(common: &CommonArgs, args: PlanArgs) -> Result<()> {
    use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

    let config = common.config(|_| {})?;
    let app_version =
        ApplicationVersion::new(args.app_version).map_err(|source| Error::VersionParse {
            stage: Stage::Policy,
            source,
        })?;

    let registry = common.registry(&config)?;
    // Only consulted for decisions, nothing is built or pushed.
    let builder = DockerBuilder;
    let decisions = Tagger::new(&config, &registry, &builder)
        .plan(app_version, args.aurora_version.map(AuroraVersion::from))?;

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["tag", "class", "decision"].map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        );

    for decision in decisions {
        let outcome = if decision.keep {
            Cell::new("push").fg(Color::Green)
        } else {
            Cell::new("skip, newer release present").fg(Color::Yellow)
        };
        table.add_row([Cell::new(&decision.tag), Cell::new(decision.class), outcome]);
    }

    println!("{table}");

    Ok(())
}
