use std::{ffi::OsStr, path::Path};

use log::debug;

use crate::{process, registry::RegistryCredentials, temp_path::tmp_path, Result};

pub struct BuildArgs<'a> {
    pub context_dir: &'a Path,
    pub tags: &'a [String],
}

pub struct BuildOutput {
    pub image_id: String,
}

/// Builds the image described by the `Dockerfile` in the context directory and tags it locally.
pub fn build(args: BuildArgs) -> Result<BuildOutput> {
    let iidfile = tmp_path(".iid");

    process::command!("docker", "build", args.context_dir, "--iidfile", iidfile)
        .args(
            args.tags
                .iter()
                .flat_map(|tag| [OsStr::new("--tag"), OsStr::new(tag)]),
        )
        .status()?;

    let image_id = std::fs::read_to_string(&iidfile)?.trim().to_owned();
    if let Err(error) = std::fs::remove_file(&iidfile) {
        debug!("unable to remove {}: {error}", iidfile.display());
    }

    Ok(BuildOutput { image_id })
}

pub fn pull(image: &str) -> Result<()> {
    process::command!("docker", "pull", image).status()?;
    Ok(())
}

pub fn tag(source: &str, target: &str) -> Result<()> {
    process::command!("docker", "tag", source, target).status()?;
    Ok(())
}

pub fn push(image: &str) -> Result<()> {
    process::command!("docker", "push", image).status()?;
    Ok(())
}

/// Logs in through stdin so the password does not show up in the process list.
pub fn login(registry: &str, credentials: &RegistryCredentials) -> Result<()> {
    let output = process::command!(
        "docker",
        "login",
        registry,
        "--username",
        credentials.username,
        "--password-stdin",
    )
    .output_with_input(credentials.password.as_bytes())?;
    debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
    Ok(())
}
