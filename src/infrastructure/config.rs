use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct FleetConfig {
    pub backend: BackendSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the fleet backend, including its API prefix.
    pub base_url: String,
    pub api_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn load_fleet_config() -> anyhow::Result<FleetConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/fleet"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[backend]\nbase_url = \"http://localhost:3000/api/v1\"\napi_token = \"secret\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let parsed: FleetConfig = settings.try_deserialize().unwrap();
        assert_eq!(parsed.backend.base_url, "http://localhost:3000/api/v1");
        assert_eq!(parsed.backend.request_timeout_secs, 10);
        assert_eq!(parsed.server.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                concat!(
                    "[backend]\n",
                    "base_url = \"https://fleet.example.com/api/v1\"\n",
                    "api_token = \"secret\"\n",
                    "request_timeout_secs = 3\n",
                    "[server]\n",
                    "listen_addr = \"127.0.0.1:9090\"\n",
                ),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let parsed: FleetConfig = settings.try_deserialize().unwrap();
        assert_eq!(parsed.backend.request_timeout_secs, 3);
        assert_eq!(parsed.server.listen_addr, "127.0.0.1:9090");
    }
}
