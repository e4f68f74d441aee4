mod docker;

use std::path::Path;

pub use docker::*;

use crate::{image::ImageName, registry::RegistryCredentials, Result};

pub struct BuildArgs<'a> {
    pub context_dir: &'a Path,
    /// Local tags the built image receives.
    pub tags: &'a [ImageName],
}

pub struct BuildOutput {
    pub image_id: String,
}

/// Builds images and moves them between the local daemon and a registry.
pub trait ImageBuilder {
    fn build(&self, args: BuildArgs<'_>) -> Result<BuildOutput>;

    fn login(&self, registry: &str, credentials: &RegistryCredentials) -> Result<()>;

    fn pull(&self, image: &ImageName) -> Result<()>;

    /// Tags the local image `source`, an image id or name, as `target`.
    fn tag(&self, source: &str, target: &ImageName) -> Result<()>;

    fn push(&self, image: &ImageName) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Build { tags: Vec<String>, dockerfile: String },
        Login(String),
        Pull(String),
        Tag(String, String),
        Push(String),
    }

    /// Records every call. Pushing an image whose tag is listed in `failing_pushes` fails.
    #[derive(Default)]
    pub(crate) struct FakeBuilder {
        pub calls: RefCell<Vec<Call>>,
        pub failing_pushes: Vec<String>,
    }

    impl FakeBuilder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub fn pushed(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| match call {
                    Call::Push(image) => Some(image.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ImageBuilder for FakeBuilder {
        fn build(&self, args: BuildArgs<'_>) -> Result<BuildOutput> {
            let dockerfile = std::fs::read_to_string(args.context_dir.join("Dockerfile"))?;
            self.calls.borrow_mut().push(Call::Build {
                tags: args.tags.iter().map(ToString::to_string).collect(),
                dockerfile,
            });
            Ok(BuildOutput {
                image_id: "sha256:0123456789abcdef".to_owned(),
            })
        }

        fn login(&self, registry: &str, _credentials: &RegistryCredentials) -> Result<()> {
            self.calls.borrow_mut().push(Call::Login(registry.to_owned()));
            Ok(())
        }

        fn pull(&self, image: &ImageName) -> Result<()> {
            self.calls.borrow_mut().push(Call::Pull(image.to_string()));
            Ok(())
        }

        fn tag(&self, source: &str, target: &ImageName) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Tag(source.to_owned(), target.to_string()));
            Ok(())
        }

        fn push(&self, image: &ImageName) -> Result<()> {
            if image
                .tag()
                .is_some_and(|tag| self.failing_pushes.iter().any(|failing| failing == tag))
            {
                return Err(format!("push of {image} was denied").into());
            }
            self.calls.borrow_mut().push(Call::Push(image.to_string()));
            Ok(())
        }
    }
}
