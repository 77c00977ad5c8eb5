// SSH 协议协商
// 握手与认证分为两步暴露，引擎状态机据此报告独立的阶段；
// 认证成功之前 Handle 不会交给通道层，通道操作在结构上不可达

use std::sync::Arc;

use russh::client::Handle;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::config::{AuthMethod, SshConfig};
use super::error::NegotiationError;
use super::handler::ClientHandler;

/// SSH 握手（密钥交换，建立加密传输）
pub async fn handshake(
    config: &SshConfig,
    stream: TcpStream,
) -> Result<Handle<ClientHandler>, NegotiationError> {
    info!("[SSH] Starting SSH handshake...");

    let russh_config = Arc::new(config.to_russh_config());
    let handler = ClientHandler::new(config.host.clone());

    let handle = russh::client::connect_stream(russh_config, stream, handler)
        .await
        .map_err(|e| NegotiationError::HandshakeFailed(e.to_string()))?;

    debug!("[SSH] SSH handshake completed");
    Ok(handle)
}

/// 密码认证
pub async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &SshConfig,
) -> Result<(), NegotiationError> {
    use russh::client::AuthResult;

    info!("[SSH] Authenticating as '{}'...", config.username);

    match &config.auth {
        AuthMethod::Password(password) => {
            debug!("[SSH] Using password authentication");

            let auth_result = handle
                .authenticate_password(&config.username, password)
                .await
                .map_err(|e| NegotiationError::AuthRejected {
                    user: config.username.clone(),
                    reason: e.to_string(),
                })?;

            match auth_result {
                AuthResult::Success => {}
                AuthResult::Failure {
                    remaining_methods,
                    partial_success,
                } => {
                    if partial_success {
                        return Err(NegotiationError::AuthRejected {
                            user: config.username.clone(),
                            reason: "partial authentication - additional auth required"
                                .to_string(),
                        });
                    }
                    return Err(NegotiationError::AuthRejected {
                        user: config.username.clone(),
                        reason: format!(
                            "password authentication failed, server suggests: {:?}",
                            remaining_methods
                        ),
                    });
                }
            }
        }
    }

    info!("[SSH] Authentication successful");
    Ok(())
}
