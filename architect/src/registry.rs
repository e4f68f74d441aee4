mod client;

use std::{collections::HashMap, fmt};

pub use client::*;

use crate::Result;

/// Read access to the registry images are published to.
pub trait ImageInfoProvider {
    /// Lists every tag the repository currently holds. Never cached, other pipelines may publish at
    /// any time.
    fn tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Returns the environment embedded in the configuration of `repository:tag`.
    fn manifest_env_map(&self, repository: &str, tag: &str) -> Result<HashMap<String, String>>;

    fn manifest_env_value(&self, repository: &str, tag: &str, key: &str) -> Result<Option<String>> {
        Ok(self.manifest_env_map(repository, tag)?.remove(key))
    }
}

#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
