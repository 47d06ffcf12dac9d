use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PORT: u16 = 8080;
const STORE_FILE: &str = "store.json";
const SURVEY_FILE: &str = "survey.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Config {
    /// Reads `APP_DATA_DIR` and `PORT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(env::var("APP_DATA_DIR").ok(), env::var("PORT").ok())
    }

    fn from_vars(data_dir: Option<String>, port: Option<String>) -> Self {
        let data_dir = data_dir
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let port = port
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { data_dir, port }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn survey_path(&self) -> PathBuf {
        self.data_dir.join(SURVEY_FILE)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset_or_invalid() {
        let config = Config::from_vars(None, Some("not-a-port".into()));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_path(), PathBuf::from("data").join("store.json"));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = Config::from_vars(Some("/tmp/smokelog".into()), Some("9000".into()));
        assert_eq!(config.survey_path(), PathBuf::from("/tmp/smokelog/survey.json"));
        assert_eq!(config.socket_addr().port(), 9000);
    }
}
