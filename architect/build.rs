use std::{env, fs, io::BufRead, path::PathBuf, process::Command};

fn git<'a, I: IntoIterator<Item = &'a str>>(args: I) -> Option<Vec<u8>> {
    let output = Command::new("git").args(args).output().ok()?;
    output.status.success().then_some(output.stdout)
}

fn git_commit_hash() -> Option<String> {
    let stdout = git(["rev-parse", "--short", "HEAD"])?;
    stdout.lines().next()?.ok()
}

fn git_is_clean() -> bool {
    git(["status", "--porcelain"]).is_some_and(|stdout| stdout.is_empty())
}

fn main() {
    let doing_release = env::var("ARCHITECT_RELEASE")
        .map(|env| matches!(env.as_str(), "1" | "true"))
        .unwrap_or_default();

    let mut version = env!("CARGO_PKG_VERSION").to_owned();
    if !doing_release {
        // Builds outside of a git checkout, e.g. from a source archive, carry the plain version.
        if let Some(commit_hash) = git_commit_hash() {
            version.push('+');
            version.push_str(&commit_hash);
            if !git_is_clean() {
                version.push_str(".dirty");
            }
        }
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::write(
        out_dir.join("version.rs"),
        format!("pub const VERSION: &str = {version:?};"),
    )
    .unwrap();
}
