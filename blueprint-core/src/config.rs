use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BlueprintConfig {
    pub service: ServiceConfig,
    pub http: HttpConfig,
    pub completion: CompletionConfig,
    pub mail: MailConfig,
    pub document: DocumentConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// `*` (or an empty list) allows any origin.
    pub allowed_origins: Vec<String>,
    /// Directory served for any path not matched by the API routes.
    pub static_dir: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: Vec::new(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 1500,
            temperature: 0.7,
            timeout_seconds: 60,
        }
    }
}

impl CompletionConfig {
    /// Configured key, else `OPENAI_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default()
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MailSecurity {
    /// Implicit TLS (port 465).
    #[default]
    Tls,
    /// Plain connection upgraded with STARTTLS (port 587).
    Starttls,
    /// Unencrypted, for local relays and test catchers.
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub security: MailSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address; defaults to the username when unset.
    pub from: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            security: MailSecurity::Tls,
            username: None,
            password: None,
            from: None,
            timeout_seconds: 30,
        }
    }
}

impl MailConfig {
    pub fn resolved_username(&self) -> Option<String> {
        self.username
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var("SMTP_USER").ok())
    }

    pub fn resolved_password(&self) -> Option<String> {
        self.password
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| std::env::var("SMTP_PASS").ok())
    }

    pub fn resolved_from(&self) -> Option<String> {
        self.from
            .clone()
            .filter(|f| !f.is_empty())
            .or_else(|| self.resolved_username())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DocumentConfig {
    pub discount_percent: u8,
    /// `markdown` or `outline`.
    pub classifier: String,
    /// When set, every finalized PDF is also written here.
    pub archive_dir: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            discount_percent: 10,
            classifier: "markdown".to_string(),
            archive_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_minutes: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 120,
            sweep_interval_seconds: 300,
        }
    }
}

impl BlueprintConfig {
    /// Optional TOML file at `path`, overridden by `BLUEPRINT_*` environment
    /// variables (`BLUEPRINT_HTTP__PORT=8080`).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env_source())
            .build()?;
        s.try_deserialize()
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("BLUEPRINT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("http.allowed_origins")
}
