use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub database_path: String,
    pub uploads_dir: String,
    pub static_dir: String,
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5000".to_string(),
            database_path: "./database.db".to_string(),
            uploads_dir: "./uploads".to_string(),
            static_dir: "./static".to_string(),
            max_upload_size: 500 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reads the TOML file at `path`, or writes the defaults there if it does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
        } else {
            let default_config = Config::default();
            let toml_string = toml::to_string_pretty(&default_config)
                .context("failed to serialize default config")?;
            std::fs::write(path, toml_string)
                .with_context(|| format!("failed to create {}", path.display()))?;
            log::info!("wrote default config to {}", path.display());
            Ok(default_config)
        }
    }

    pub fn from_args_env() -> anyhow::Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var("RECORDER_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::load(Path::new(&path))?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.prepare_dirs()?;
        Ok(cfg)
    }

    /// Applies `RECORDER_*` overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("RECORDER_LISTEN") {
            self.listen = v;
        }
        if let Some(v) = var("RECORDER_DATABASE") {
            self.database_path = v;
        }
        if let Some(v) = var("RECORDER_UPLOADS_DIR") {
            self.uploads_dir = v;
        }
        if let Some(v) = var("RECORDER_STATIC_DIR") {
            self.static_dir = v;
        }
        if let Some(v) = var("RECORDER_MAX_UPLOAD_SIZE") {
            self.max_upload_size = v
                .trim()
                .parse()
                .with_context(|| format!("invalid RECORDER_MAX_UPLOAD_SIZE: {v:?}"))?;
        }
        Ok(())
    }

    pub fn prepare_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)
            .with_context(|| format!("create uploads dir {}", self.uploads_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:5000");
        assert!(path.exists());

        let reread = Config::load(&path).unwrap();
        assert_eq!(reread.database_path, cfg.database_path);
        assert_eq!(reread.max_upload_size, cfg.max_upload_size);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "listen = \"0.0.0.0:8080\"\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:8080");
        assert_eq!(cfg.uploads_dir, "./uploads");
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RECORDER_DATABASE", "/tmp/rec.db"),
            ("RECORDER_MAX_UPLOAD_SIZE", "1024"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.database_path, "/tmp/rec.db");
        assert_eq!(cfg.max_upload_size, 1024);
        assert_eq!(cfg.listen, "127.0.0.1:5000");
    }

    #[test]
    fn bad_upload_size_is_rejected() {
        let mut cfg = Config::default();
        let res = cfg.apply_overrides(|k| {
            (k == "RECORDER_MAX_UPLOAD_SIZE").then(|| "lots".to_string())
        });
        assert!(res.is_err());
    }
}
