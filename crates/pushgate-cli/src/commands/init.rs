//! `pushgate init`: write a starter configuration.

use std::path::Path;

use anyhow::bail;
use tracing::info;

use crate::config::PushConfig;

pub fn init(path: &Path, host: &str, job: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let content = PushConfig::scaffold(host, job).to_toml_string()?;
    std::fs::write(path, &content)?;
    info!(path = %path.display(), "configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushgate.toml");
        init(&path, "push.example.com", "demo", false).unwrap();

        let config = PushConfig::from_file(&path).unwrap();
        assert_eq!(config.gateway.host, "push.example.com");
        assert_eq!(config.gateway.job, "demo");
        assert!(!config.metrics.is_empty());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushgate.toml");
        std::fs::write(&path, "keep me").unwrap();

        assert!(init(&path, "h", "j", false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

        init(&path, "h", "j", true).unwrap();
        assert!(PushConfig::from_file(&path).is_ok());
    }
}
