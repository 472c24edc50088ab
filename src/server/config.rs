use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_model_path")]
    pub model_path: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    listen_address: Option<String>,
    model_path: Option<String>,
    log_dir: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_model_path() -> String {
    "xgboost_air_quality_model.json".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: default_listen_address(),
            model_path: default_model_path(),
            log_dir: default_log_dir(),
        }
    }
}

impl PartialServerConfig {
    /// Reads a TOML file. A path that does not exist yields an empty layer.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(PartialServerConfig::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    pub fn from_env() -> Result<Self, String> {
        envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) => PartialServerConfig::from_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env()?;

        // 3. Merge: environment overrides file
        let config = Self::merge(file_config, env_config);
        config.socket_addr()?;
        Ok(config)
    }

    pub fn merge(file_config: PartialServerConfig, env_config: PartialServerConfig) -> Self {
        ServerConfig {
            listen_address: env_config
                .listen_address
                .or(file_config.listen_address)
                .unwrap_or_else(default_listen_address),
            model_path: env_config
                .model_path
                .or(file_config.model_path)
                .unwrap_or_else(default_model_path),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.listen_address
            .parse()
            .map_err(|e| format!("Invalid listen_address '{}': {e}", self.listen_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_layer(vars: &[(&str, &str)]) -> PartialServerConfig {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_when_no_layers() {
        let config = ServerConfig::merge(PartialServerConfig::default(), env_layer(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.model_path, "xgboost_air_quality_model.json");
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "listen_address = \"127.0.0.1:9000\"").unwrap();
        writeln!(file, "model_path = \"models/from_file.json\"").unwrap();

        let file_layer = PartialServerConfig::from_file(&path).unwrap();
        let env = env_layer(&[("MODEL_PATH", "/srv/model.json")]);
        let config = ServerConfig::merge(file_layer, env);

        assert_eq!(config.listen_address, "127.0.0.1:9000");
        assert_eq!(config.model_path, "/srv/model.json");
        assert_eq!(config.log_dir, "logs");
    }

    #[test]
    fn test_missing_file_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let layer = PartialServerConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert!(layer.listen_address.is_none());
        assert!(layer.model_path.is_none());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "listen_address = [").unwrap();

        let err = PartialServerConfig::from_file(&path).unwrap_err();
        assert!(err.contains("Failed to parse TOML"));
    }

    #[test]
    fn test_invalid_listen_address() {
        let config = ServerConfig {
            listen_address: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().unwrap_err().contains("Invalid listen_address"));
    }
}
