// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use std::future::Future;

use russh::keys::PublicKey;
use tracing::{debug, info};

/// SSH 客户端 Handler
/// 处理 SSH 连接过程中的各种回调
pub struct ClientHandler {
    /// 服务器主机名（用于日志）
    host: String,
}

impl ClientHandler {
    /// 创建新的 Handler
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl russh::client::Handler for ClientHandler {
    type Error = russh::Error;

    /// 检查服务器公钥
    /// 主机密钥校验与缓存不在本引擎范围内，记录指纹后接受所有公钥
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(russh::keys::ssh_key::HashAlg::Sha256);

        info!("[SSH] {}: server key fingerprint: {}", self.host, fingerprint);
        debug!(
            "[SSH] {}: server key type: {}",
            self.host,
            server_public_key.algorithm()
        );

        async { Ok(true) }
    }
}
