use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wordvault")]
#[command(about = "Runs the wordvault service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wordvault")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct App {
    database: String,
    port: i32,
    author_code: String,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_sync_interval() -> u64 {
    60
}

impl App {
    pub fn get_db(&self) -> &str {
        return &self.database;
    }

    pub fn get_port(&self) -> i32 {
        return self.port;
    }

    pub fn get_author_code(&self) -> &str {
        return &self.author_code;
    }
}

/// Identity provider settings. Tokens are RS256 JWTs; the JWKS is fetched
/// once at startup from `jwks_url`.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Auth {
    pub jwks_url: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    pub auth: Auth,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        let yaml_with_env = Config::substitute_env_vars(&yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_env_vars_with_defaults() {
        // SAFETY: test runs single-threaded over this variable
        unsafe { env::set_var("WORDVAULT_TEST_CODE", "hunter2") };

        let yaml = "code: ${WORDVAULT_TEST_CODE}\nport: ${WORDVAULT_TEST_MISSING:-8080}";
        let substituted = Config::substitute_env_vars(yaml).unwrap();
        assert_eq!(substituted, "code: hunter2\nport: 8080");
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
app:
  database: words.db
  port: 5000
  author_code: secret
auth:
  jwks_url: https://keys.example.com/jwks.json
  issuer: https://issuer.example.com/project
  audience: project
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "words.db");
        assert_eq!(cfg.app.get_port(), 5000);
        assert_eq!(cfg.app.get_author_code(), "secret");
        assert_eq!(cfg.app.sync_interval_seconds, 60);
        assert_eq!(cfg.auth.audience, "project");
    }
}
