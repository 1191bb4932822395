//! Process bootstrap: repo directory, configuration and service wiring.

use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use warrant_core::WarrantConfig;
use warrant_jwt::{SigningKey, TokenCodec};
use warrant_store::{CredentialStore, open_engine};

use crate::service::TokenService;

/// Repo directory used when neither `--repo` nor `WARRANT_HOME` is given.
pub const DEFAULT_REPO: &str = "~/.warrant";

/// Name of the config file inside the repo directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the data directory inside the repo directory.
pub const DATA_DIR: &str = "data";

/// Resolved on-disk layout plus the loaded configuration.
#[derive(Debug)]
pub struct Bootstrap {
    pub repo: PathBuf,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: WarrantConfig,
    /// Whether a default config file was written during this start.
    pub created_config: bool,
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &Path) -> anyhow::Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().context("cannot determine home directory to expand '~'")?;
    Ok(home.join(rest))
}

/// Create the repo and data directories, then load the config file or write
/// a default one with a freshly generated secret.
pub fn prepare(repo: &Path, config_path: Option<&Path>) -> anyhow::Result<Bootstrap> {
    let repo = expand_home(repo)?;
    std::fs::create_dir_all(&repo)
        .with_context(|| format!("failed to create repo directory {}", repo.display()))?;

    let data_dir = repo.join(DATA_DIR);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let config_path = match config_path {
        Some(path) => expand_home(path)?,
        None => repo.join(CONFIG_FILE),
    };

    let (config, created_config) = if config_path.exists() {
        (WarrantConfig::load(&config_path)?, false)
    } else {
        let config = WarrantConfig {
            secret: SigningKey::generate().to_base64(),
            ..WarrantConfig::default()
        };
        config.save(&config_path)?;
        (config, true)
    };

    Ok(Bootstrap {
        repo,
        data_dir,
        config_path,
        config,
        created_config,
    })
}

/// Build the codec from the configured current and retired secrets.
pub fn build_codec(config: &WarrantConfig) -> anyhow::Result<TokenCodec> {
    if config.secret.trim().is_empty() {
        bail!("no signing secret configured; set `secret` in the config file or WARRANT_SECRET");
    }
    let key = SigningKey::from_base64(&config.secret).context("invalid signing secret")?;

    let mut codec = TokenCodec::new(key);
    for (i, retired) in config.retired_secrets.iter().enumerate() {
        let key = SigningKey::from_base64(retired)
            .with_context(|| format!("invalid retired secret #{}", i + 1))?;
        codec = codec.with_retired_key(key);
    }
    Ok(codec)
}

/// Wire codec and store into a shared token service.
pub fn build_service(config: &WarrantConfig, data_dir: &Path) -> anyhow::Result<Arc<TokenService>> {
    let codec = build_codec(config)?;
    let engine = open_engine(&config.store, data_dir)
        .with_context(|| format!("failed to open credential store in {}", data_dir.display()))?;
    let store = CredentialStore::open(engine).context("failed to load credential store")?;
    Ok(Arc::new(TokenService::new(codec, store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warrant_core::Permission;

    #[test]
    fn test_prepare_writes_default_config_once() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");

        let first = prepare(&repo, None).unwrap();
        assert!(first.created_config);
        assert!(first.data_dir.is_dir());
        assert_eq!(first.config_path, repo.join(CONFIG_FILE));
        assert!(SigningKey::from_base64(&first.config.secret).is_ok());

        let second = prepare(&repo, None).unwrap();
        assert!(!second.created_config);
        assert_eq!(second.config.secret, first.config.secret);
    }

    #[test]
    fn test_prepare_honours_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("elsewhere.toml");
        std::fs::write(&custom, "listen = \"0.0.0.0:9000\"\nsecret = \"c2VjcmV0LXNlY3JldC1zZWNyZXQ=\"\n")
            .unwrap();

        let boot = prepare(&dir.path().join("repo"), Some(&custom)).unwrap();
        assert!(!boot.created_config);
        assert_eq!(boot.config.listen, "0.0.0.0:9000");
        assert!(!boot.repo.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home(Path::new("/var/lib/warrant")).unwrap(),
            PathBuf::from("/var/lib/warrant")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.warrant")).unwrap(), home.join(".warrant"));
        }
    }

    #[test]
    fn test_build_codec_rejects_missing_or_weak_secret() {
        let mut config = WarrantConfig::default();
        assert!(build_codec(&config).is_err());

        config.secret = "c2hvcnQ=".into();
        assert!(build_codec(&config).is_err());

        config.secret = SigningKey::generate().to_base64();
        config.retired_secrets = vec!["not base64 !!".into()];
        assert!(build_codec(&config).is_err());
    }

    #[test]
    fn test_retired_secret_verifies_old_tokens() {
        let old = SigningKey::generate();
        let token = TokenCodec::new(old.clone())
            .encode("alice", Permission::Read, "", chrono::Utc::now())
            .unwrap();

        let config = WarrantConfig {
            secret: SigningKey::generate().to_base64(),
            retired_secrets: vec![old.to_base64()],
            ..WarrantConfig::default()
        };
        let codec = build_codec(&config).unwrap();
        assert_eq!(codec.decode(&token).unwrap().name, "alice");
    }

    #[test]
    fn test_build_service_over_file_store() {
        let dir = TempDir::new().unwrap();
        let boot = prepare(dir.path(), None).unwrap();

        let token = {
            let service = build_service(&boot.config, &boot.data_dir).unwrap();
            service.generate_token("alice", "sign", "").unwrap()
        };

        let service = build_service(&boot.config, &boot.data_dir).unwrap();
        let principal = service.verify_token(&token, Permission::Sign).unwrap();
        assert_eq!(principal.name, "alice");
    }
}
