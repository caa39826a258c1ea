#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ConfigFile,
    ErrorDismiss,
    GatewayToken,
    GatewayURL,
    HistoryLimit,
    RefreshInterval,
    SendTimeout,
    SessionLimit,
}

impl ConfigKey {
    /// Keys holding a positive integer.
    fn is_numeric(&self) -> bool {
        return matches!(
            self,
            ConfigKey::ErrorDismiss
                | ConfigKey::HistoryLimit
                | ConfigKey::RefreshInterval
                | ConfigKey::SendTimeout
                | ConfigKey::SessionLimit
        );
    }
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = dirs::config_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("agentdeck/config.toml");

        let res = match key {
            ConfigKey::ErrorDismiss => "5000",
            ConfigKey::GatewayToken => "",
            ConfigKey::GatewayURL => "http://localhost:18789",
            ConfigKey::HistoryLimit => "100",
            ConfigKey::RefreshInterval => "5000",
            ConfigKey::SendTimeout => "60",
            ConfigKey::SessionLimit => "50",

            // Special
            ConfigKey::ConfigFile => return config_path.to_string_lossy().to_string(),
        };

        return res.to_string();
    }

    pub async fn load(clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::set(key, val_str);
                    } else {
                        bail!(format!(
                            "config.toml has an invalid value for key '{key}': {val}"
                        ));
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        Config::validate()?;

        // Never log the token.
        tracing::debug!(
            gateway_url = Config::get(ConfigKey::GatewayURL),
            refresh_interval = Config::get(ConfigKey::RefreshInterval),
            session_limit = Config::get(ConfigKey::SessionLimit),
            history_limit = Config::get(ConfigKey::HistoryLimit),
            send_timeout = Config::get(ConfigKey::SendTimeout),
            error_dismiss = Config::get(ConfigKey::ErrorDismiss),
            "config"
        );

        return Ok(());
    }

    fn validate() -> Result<()> {
        for key in ConfigKey::iter().filter(|key| return key.is_numeric()) {
            let val = Config::get(key);
            match val.parse::<u64>() {
                Ok(num) if num > 0 => {}
                _ => {
                    bail!(format!(
                        "Invalid value for '{key}': {val}\nExpected a positive whole number."
                    ));
                }
            }
        }

        let url = Config::get(ConfigKey::GatewayURL);
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!(format!(
                "Invalid value for '{}': {url}\nExpected an http(s) URL.",
                ConfigKey::GatewayURL
            ));
        }

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default()
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
