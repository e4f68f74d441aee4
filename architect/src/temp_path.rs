use std::path::PathBuf;

/// Returns a path in the system temporary directory that is unlikely to exist, e.g.
/// `/tmp/architect-3fZ0c9QhX1pLk7Ve.json`.
pub fn tmp_path(extension: &str) -> PathBuf {
    use rand::distributions::{Alphanumeric, DistString};

    const PREFIX: &str = "architect-";
    const LEN: usize = 16;

    let mut name = String::with_capacity(PREFIX.len() + LEN + extension.len());
    name.push_str(PREFIX);
    Alphanumeric.append_string(&mut rand::thread_rng(), &mut name, LEN);
    name.push_str(extension);
    std::env::temp_dir().join(name)
}
