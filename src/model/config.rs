use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding tasks.json, lists.json, ui.json and session.json.
    /// Default: `$XDG_DATA_HOME/doit`
    #[serde(default)]
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Report operations on missing ids as errors instead of silent no-ops
    #[serde(default)]
    pub strict: bool,
    /// Remove a deleted task's id from every list
    #[serde(default)]
    pub purge_lists_on_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap key. `DOIT_WEATHER_API_KEY` overrides.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geo_url")]
    pub geo_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Location consulted for outdoor tasks
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Inclusive comfortable range, Celsius
    #[serde(default = "default_min_temp")]
    pub min_temp: f64,
    #[serde(default = "default_max_temp")]
    pub max_temp: f64,
    /// Condition names that rule out outdoor work
    #[serde(default = "default_bad_conditions")]
    pub bad_conditions: Vec<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            api_key: None,
            geo_url: default_geo_url(),
            weather_url: default_weather_url(),
            location: default_location(),
            timeout_secs: default_timeout_secs(),
            min_temp: default_min_temp(),
            max_temp: default_max_temp(),
            bad_conditions: default_bad_conditions(),
        }
    }
}

fn default_geo_url() -> String {
    "http://api.openweathermap.org/geo/1.0/direct".to_string()
}

fn default_weather_url() -> String {
    "http://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_location() -> String {
    "India".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_temp() -> f64 {
    15.0
}

fn default_max_temp() -> f64 {
    30.0
}

fn default_bad_conditions() -> Vec<String> {
    vec!["Rain".into(), "Thunderstorm".into(), "Snow".into()]
}

/// The single accepted credential pair and the user it signs in as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_user_name")]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            email: default_email(),
            password: default_password(),
            user_id: default_user_id(),
            name: default_user_name(),
            avatar: String::new(),
        }
    }
}

fn default_email() -> String {
    "demo@example.com".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_user_id() -> String {
    "1".to_string()
}

fn default_user_name() -> String {
    "Demo User".to_string()
}
