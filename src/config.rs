//! # 配置模块
//!
//! 所有配置都来自环境变量（或测试中的内存表）。
//! - `Config`：监听地址等启动时读取一次的设置
//! - `AuthConfig`：密码、音频地址等每次请求时重新读取的设置

use std::collections::HashMap;
use std::net::IpAddr;

/// 音频地址未配置时使用的站内路径
pub const DEFAULT_AUDIO_URL: &str = "/audio/surprise.mp3";

/// 既没有配置站点地址、请求里也没有 Host 头时使用的占位地址
pub const FALLBACK_SITE_URL: &str = "https://localhost";

/// 配置来源
///
/// 空字符串一律视为未设置。
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// 从进程环境变量读取配置
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl ConfigProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

/// 服务启动配置
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub admin_host: IpAddr,
    /// 未设置时不启动运维接口
    pub admin_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_provider(&EnvConfig)
    }

    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        Self {
            host: parse_or(provider, "HOST", IpAddr::from([0, 0, 0, 0])),
            port: parse_or(provider, "PORT", 8888),
            admin_host: parse_or(provider, "ADMIN_HOST", IpAddr::from([127, 0, 0, 1])),
            admin_port: provider.get("ADMIN_PORT").and_then(|v| match v.parse() {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(value = %v, "ignoring invalid ADMIN_PORT");
                    None
                }
            }),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn admin_addr(&self) -> Option<String> {
        self.admin_port
            .map(|port| format!("{}:{}", self.admin_host, port))
    }
}

fn parse_or<T>(provider: &dyn ConfigProvider, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match provider.get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, fallback = %default, "invalid config value");
            default
        }),
        None => default,
    }
}

/// 鉴权相关配置，每次请求时读取
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub master_password: Option<String>,
    pub audio_url: String,
    /// 显式配置的站点地址（`SITE_URL`，兼容旧的 `URL`）
    pub site_url: Option<String>,
}

impl AuthConfig {
    pub fn load(provider: &dyn ConfigProvider) -> Self {
        Self {
            master_password: provider.get("MASTER_PASSWORD"),
            audio_url: provider
                .get("AUDIO_URL")
                .unwrap_or_else(|| DEFAULT_AUDIO_URL.to_string()),
            site_url: provider.get("SITE_URL").or_else(|| provider.get("URL")),
        }
    }
}

/// 是否处于开发模式（开发模式下错误响应附带内部信息）
pub fn is_development(provider: &dyn ConfigProvider) -> bool {
    provider.get("NODE_ENV").as_deref() == Some("development")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_provider(&provider(&[]));
        assert_eq!(config.addr(), "0.0.0.0:8888");
        assert!(config.admin_addr().is_none());

        let auth = AuthConfig::load(&provider(&[]));
        assert!(auth.master_password.is_none());
        assert_eq!(auth.audio_url, DEFAULT_AUDIO_URL);
        assert!(auth.site_url.is_none());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_provider(&provider(&[
            ("PORT", "not-a-port"),
            ("HOST", "nowhere"),
            ("ADMIN_PORT", "99999"),
        ]));
        assert_eq!(config.addr(), "0.0.0.0:8888");
        assert!(config.admin_port.is_none());
    }

    #[test]
    fn test_admin_addr() {
        let config = Config::from_provider(&provider(&[("ADMIN_PORT", "9001")]));
        assert_eq!(config.admin_addr().as_deref(), Some("127.0.0.1:9001"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let auth = AuthConfig::load(&provider(&[("MASTER_PASSWORD", ""), ("AUDIO_URL", "")]));
        assert!(auth.master_password.is_none());
        assert_eq!(auth.audio_url, DEFAULT_AUDIO_URL);
    }

    #[test]
    fn test_site_url_prefers_site_url_over_legacy() {
        let auth = AuthConfig::load(&provider(&[
            ("SITE_URL", "https://a.example"),
            ("URL", "https://b.example"),
        ]));
        assert_eq!(auth.site_url.as_deref(), Some("https://a.example"));

        let auth = AuthConfig::load(&provider(&[("URL", "https://b.example")]));
        assert_eq!(auth.site_url.as_deref(), Some("https://b.example"));
    }

    #[test]
    fn test_is_development() {
        assert!(is_development(&provider(&[("NODE_ENV", "development")])));
        assert!(!is_development(&provider(&[("NODE_ENV", "production")])));
        assert!(!is_development(&provider(&[])));
    }
}
