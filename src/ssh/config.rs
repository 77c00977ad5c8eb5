// SSH 连接配置

use serde::{Deserialize, Serialize};

/// SSH 连接配置
/// 凭据记录 (host/port/username/auth) 由调用方的设置存储提供，
/// 其余字段为引擎调优项，均有合理默认值
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// 目标主机（数字 IPv4 地址，不做 DNS 解析）
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// PTY 终端类型
    pub term: String,
    /// PTY 列数
    pub columns: u32,
    /// PTY 行数
    pub rows: u32,
    /// 主循环等待本地输入的超时（毫秒）
    pub poll_interval_ms: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            auth: AuthMethod::Password(String::new()),
            connect_timeout: 30,
            term: "xterm-256color".to_string(),
            columns: 80,
            rows: 24,
            poll_interval_ms: 10,
            keepalive: KeepaliveConfig::default(),
        }
    }
}

impl SshConfig {
    /// 从凭据记录构建配置（密码认证，其余字段取默认值）
    pub fn from_credentials(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            auth: AuthMethod::Password(password.into()),
            ..Default::default()
        }
    }

    /// 主循环输入等待超时
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// 构建 russh 配置
    /// 注意: 不设置 inactivity_timeout —— Shell 激活后会话没有整体超时，
    /// 只有每轮循环的输入等待是有界的
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        if self.keepalive.enabled {
            config.keepalive_interval =
                Some(std::time::Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        }
        config
    }
}

/// 认证方式
/// 目前只实现密码认证；公钥/交互式认证作为新变体扩展，
/// 不需要改动引擎的控制流
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
}

/// 心跳配置
/// 仅用于传输层保活，不是重连策略
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 60,
            max_retries: 3,
        }
    }
}
