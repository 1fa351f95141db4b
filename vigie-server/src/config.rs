use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub database_path: String,
    pub llm: LlmConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConf {
    pub base_url: String,
    pub model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            database_path: "./data/vigie.db".into(),
            llm: LlmConf {
                base_url: "https://api.openai.com/v1".into(),
                model: "gpt-4o".into(),
            },
        }
    }
}

pub async fn load_config() -> ServerConfig {
    let path = std::env::var("VIGIE_CONFIG").unwrap_or_else(|_| "vigie.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() { return ServerConfig::default(); }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[kernel] config invalide: {e}");
            ServerConfig::default()
        })
    } else {
        eprintln!("[kernel] pas de vigie.yaml, usage config par défaut");
        ServerConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_port, 8080);
        assert_eq!(cfg.llm.model, "gpt-4o");
    }

    #[test]
    fn test_yaml_parsing() {
        let cfg: ServerConfig = serde_yaml::from_str(
            "listen_port: 9090\n\
             database_path: /tmp/vigie-test.db\n\
             llm:\n  base_url: https://llm.internal/v1\n  model: gpt-4o\n",
        )
        .unwrap();
        assert_eq!(cfg.listen_port, 9090);
        assert_eq!(cfg.llm.base_url, "https://llm.internal/v1");
    }
}
