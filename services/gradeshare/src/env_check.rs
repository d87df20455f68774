use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

#[derive(Debug, PartialEq, Eq)]
pub enum EnvFileStatus {
    /// No `.env` or no recorded digest next to it.
    Unchecked,
    UpToDate,
    Outdated { expected: String, actual: String },
}

/// Compares `.env` in `dir` against the digest recorded in `.env.sha256`
/// (first whitespace-separated token, `sha256sum` output works as-is).
pub fn check_env_file(dir: &Path) -> Result<EnvFileStatus> {
    let env_path = dir.join(".env");
    let digest_path = dir.join(".env.sha256");
    if !env_path.is_file() || !digest_path.is_file() {
        return Ok(EnvFileStatus::Unchecked);
    }

    let content = std::fs::read(&env_path).with_context(|| format!("reading {}", env_path.display()))?;
    let recorded = std::fs::read_to_string(&digest_path)
        .with_context(|| format!("reading {}", digest_path.display()))?;

    let expected = recorded.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    let actual = hex::encode(Sha256::digest(&content));

    if expected == actual {
        Ok(EnvFileStatus::UpToDate)
    } else {
        Ok(EnvFileStatus::Outdated { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchecked_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_env_file(dir.path()).unwrap(), EnvFileStatus::Unchecked);

        std::fs::write(dir.path().join(".env"), "A=1\n").unwrap();
        assert_eq!(check_env_file(dir.path()).unwrap(), EnvFileStatus::Unchecked);
    }

    #[test]
    fn detects_matching_and_stale_digest() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"CONFIG_SEMESTER=112-1\n";
        std::fs::write(dir.path().join(".env"), body).unwrap();

        let digest = hex::encode(Sha256::digest(body));
        std::fs::write(dir.path().join(".env.sha256"), format!("{digest}  .env\n")).unwrap();
        assert_eq!(check_env_file(dir.path()).unwrap(), EnvFileStatus::UpToDate);

        std::fs::write(dir.path().join(".env"), "CONFIG_SEMESTER=112-2\n").unwrap();
        assert!(matches!(
            check_env_file(dir.path()).unwrap(),
            EnvFileStatus::Outdated { .. }
        ));
    }
}
