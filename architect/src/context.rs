use std::{
    fmt::{self, Write as _},
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    artifact::Deliverable, config::ApplicationType, image::ImageName, metadata::BuildMetadata,
    temp_path::tmp_path, version, Result,
};

/// Directory the deliverable is installed into inside the image.
pub const INSTALL_DIR: &str = "/u01/";

pub struct BuildContextArgs<'a> {
    pub deliverable: &'a Deliverable,
    pub application_type: ApplicationType,
    /// The base image, tagged with its complete version.
    pub base_image: &'a ImageName,
    pub metadata: &'a BuildMetadata,
}

/// A directory holding a `Dockerfile` and the deliverable it installs. Removed on drop.
#[derive(Debug)]
pub struct BuildContext {
    dir: PathBuf,
}

impl BuildContext {
    pub fn prepare(args: BuildContextArgs) -> Result<Self> {
        let dir = tmp_path("");
        fs::create_dir_all(&dir)?;
        let context = Self { dir };

        fs::copy(
            &args.deliverable.path,
            context.dir.join(deliverable_name(args.application_type)),
        )?;

        let created = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let dockerfile = dockerfile(&args, &created)?;
        debug!("Dockerfile:\n{dockerfile}");
        fs::write(context.dir.join("Dockerfile"), dockerfile)?;

        info!("prepared build context in {}", context.dir.display());
        Ok(context)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for BuildContext {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir_all(&self.dir) {
            debug!("unable to remove {}: {error}", self.dir.display());
        }
    }
}

/// Name of the deliverable inside the build context. Independent of the downloaded file name.
fn deliverable_name(application_type: ApplicationType) -> &'static str {
    match application_type {
        ApplicationType::Java => "deliverable.zip",
        ApplicationType::NodeJs => "deliverable.tgz",
    }
}

/// Double quotes a value for use in `LABEL` and `ENV` instructions.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn dockerfile(args: &BuildContextArgs, created: &str) -> Result<String, fmt::Error> {
    let file_name = deliverable_name(args.application_type);
    let mut dockerfile = String::new();

    writeln!(dockerfile, "FROM {}", args.base_image)?;
    writeln!(dockerfile)?;
    writeln!(
        dockerfile,
        "LABEL architect.version={} org.opencontainers.image.version={} org.opencontainers.image.created={}",
        quote(version::VERSION),
        quote(args.metadata.aurora_version.as_str()),
        quote(created),
    )?;
    writeln!(dockerfile)?;

    match args.application_type {
        ApplicationType::Java => {
            writeln!(dockerfile, "COPY {file_name} {INSTALL_DIR}")?;
            writeln!(
                dockerfile,
                "RUN cd {INSTALL_DIR} && unzip -q {file_name} && rm {file_name}"
            )?;
        }
        // `ADD` unpacks local tar archives.
        ApplicationType::NodeJs => writeln!(dockerfile, "ADD {file_name} {INSTALL_DIR}")?,
    }
    writeln!(dockerfile)?;

    let env = args
        .metadata
        .env_pairs()
        .into_iter()
        .map(|(key, value)| format!("{key}={}", quote(&value)))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(dockerfile, "ENV {env}")?;

    Ok(dockerfile)
}

#[cfg(test)]
mod tests {
    use aurora_version::{compose, ApplicationVersion};

    use super::*;
    use crate::metadata::Variant;

    fn metadata() -> BuildMetadata {
        let app_version = ApplicationVersion::new("1.2.0").unwrap();
        BuildMetadata {
            aurora_version: compose(&app_version, "1.11.0", "1.0.2", "aurora/oracle8").unwrap(),
            app_version,
            variant: Variant::Release {
                push_extra_tags: "major,minor".parse().unwrap(),
            },
        }
    }

    #[test]
    fn quote_works() {
        assert_eq!(quote("1.2.0"), r#""1.2.0""#);
        assert_eq!(quote(r#"a"b\c$d"#), r#""a\"b\\c\$d""#);
    }

    #[test]
    fn java_dockerfile_works() {
        let metadata = metadata();
        let base_image = ImageName::new("registry.example", "aurora/oracle8", Some("1.0.2")).unwrap();
        let deliverable = Deliverable {
            path: PathBuf::from("/tmp/x/console-1.2.0-Leveransepakke.zip"),
        };
        let dockerfile = dockerfile(
            &BuildContextArgs {
                deliverable: &deliverable,
                application_type: ApplicationType::Java,
                base_image: &base_image,
                metadata: &metadata,
            },
            "2024-05-01T10:00:00Z",
        )
        .unwrap();

        let lines: Vec<&str> = dockerfile.lines().collect();
        assert_eq!(lines[0], "FROM registry.example/aurora/oracle8:1.0.2");
        assert!(lines[2].contains(r#"org.opencontainers.image.version="1.2.0-b1.11.0-oracle8-1.0.2""#));
        assert!(lines[2].contains(r#"org.opencontainers.image.created="2024-05-01T10:00:00Z""#));
        assert_eq!(lines[4], "COPY deliverable.zip /u01/");
        assert_eq!(lines[5], "RUN cd /u01/ && unzip -q deliverable.zip && rm deliverable.zip");
        assert_eq!(
            lines[7],
            r#"ENV APP_VERSION="1.2.0" AURORA_VERSION="1.2.0-b1.11.0-oracle8-1.0.2" PUSH_EXTRA_TAGS="major,minor""#
        );
    }

    #[test]
    fn prepare_works() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web-2.0.0.tgz");
        fs::write(&path, b"tarball").unwrap();

        let metadata = metadata();
        let base_image = ImageName::new("registry.example", "aurora/wrench", Some("8.1.0")).unwrap();
        let context = BuildContext::prepare(BuildContextArgs {
            deliverable: &Deliverable { path },
            application_type: ApplicationType::NodeJs,
            base_image: &base_image,
            metadata: &metadata,
        })
        .unwrap();

        let context_dir = context.dir().to_owned();
        assert_eq!(fs::read(context_dir.join("deliverable.tgz")).unwrap(), b"tarball");
        let dockerfile = fs::read_to_string(context_dir.join("Dockerfile")).unwrap();
        assert!(dockerfile.contains("ADD deliverable.tgz /u01/\n"));
        assert!(!dockerfile.contains("unzip"));

        drop(context);
        assert!(!context_dir.exists());
    }

    #[test]
    fn deliverable_file_name_stays_out_of_the_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app;touch pwned;x-Leveransepakke.zip");
        fs::write(&path, b"zip").unwrap();

        let metadata = metadata();
        let base_image = ImageName::new("registry.example", "aurora/oracle8", Some("1.0.2")).unwrap();
        let context = BuildContext::prepare(BuildContextArgs {
            deliverable: &Deliverable { path },
            application_type: ApplicationType::Java,
            base_image: &base_image,
            metadata: &metadata,
        })
        .unwrap();

        assert_eq!(fs::read(context.dir().join("deliverable.zip")).unwrap(), b"zip");
        let dockerfile = fs::read_to_string(context.dir().join("Dockerfile")).unwrap();
        assert!(!dockerfile.contains("pwned"));
        assert!(dockerfile.contains("\nRUN cd /u01/ && unzip -q deliverable.zip && rm deliverable.zip\n"));
    }
}
