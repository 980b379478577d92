use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::service::reconciler::ScoringRules;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub api: ApiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub write_timeout_secs: u64,
}

/// 匹配引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub amount_match_score: f64,
    pub date_proximity_bonus: f64,
    pub date_window_days: i64,
    /// 发票数达到该值时并行评分, 0 表示不并行
    pub parallel_threshold: usize,
    pub persist_matches: bool,
}

impl EngineConfig {
    pub fn scoring_rules(&self) -> ScoringRules {
        ScoringRules {
            amount_match_score: self.amount_match_score,
            date_proximity_bonus: self.date_proximity_bonus,
            date_window_days: self.date_window_days,
        }
    }
}

/// 接口读取上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub invoice_list_limit: usize,
    pub transaction_list_limit: usize,
    pub match_list_limit: usize,
    pub match_invoice_limit: usize,
    pub match_transaction_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl LogConfig {
    pub fn max_level(&self) -> Result<tracing::Level, String> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| format!("unknown log level '{}'", self.level))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let rules = ScoringRules::default();
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/bookkeeping".to_string(),
                max_connections: 20,
            },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                write_timeout_secs: 30,
            },
            engine: EngineConfig {
                amount_match_score: rules.amount_match_score,
                date_proximity_bonus: rules.date_proximity_bonus,
                date_window_days: rules.date_window_days,
                parallel_threshold: 512,
                persist_matches: true,
            },
            api: ApiConfig {
                invoice_list_limit: 100,
                transaction_list_limit: 200,
                match_list_limit: 500,
                match_invoice_limit: 500,
                match_transaction_limit: 1000,
            },
            log: LogConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/default.toml -> $APP_CONFIG -> APP_* 环境变量 -> 兼容变量
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::base_builder()?
            .add_source(File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("APP_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 兼容旧环境变量
        let port = std::env::var("SERVER_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .map(i64::from);
        builder = builder
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", port)?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?;

        Self::finish(builder)
    }

    /// 默认值叠加一段 TOML
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let builder = Self::base_builder()?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    fn base_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder().add_source(Config::try_from(&AppConfig::default())?))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port must be > 0".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("database.max_connections must be > 0".to_string()));
        }
        if self.store.write_timeout_secs == 0 {
            return Err(ConfigError::Message("store.write_timeout_secs must be > 0".to_string()));
        }
        self.engine
            .scoring_rules()
            .validate()
            .map_err(|e| ConfigError::Message(format!("engine: {}", e)))?;
        self.log.max_level().map_err(ConfigError::Message)?;
        Ok(())
    }
}
