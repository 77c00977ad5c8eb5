// SSH 错误类型定义
//
// 分层错误模型: 每个建立阶段有独立的错误类型，
// 统一通过 #[from] 汇入顶层 SessionError 返回给调用方。
// 所有致命错误: 记录日志、清理已建立的会话状态、返回调用方，不中止进程。

use thiserror::Error;

/// TCP 连接建立错误
#[derive(Debug, Error)]
pub enum ConnectError {
    /// 地址无效（引擎只接受数字 IPv4 地址，不做 DNS 解析）
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// 连接被拒绝
    #[error("connection refused by {0}")]
    Refused(String),

    /// 连接超时
    #[error("connection timed out after {0}s")]
    Timeout(u64),

    /// 其他 IO 错误（网络不可达等）
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 协议协商错误
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// SSH 握手（密钥交换）失败
    #[error("ssh handshake failed: {0}")]
    HandshakeFailed(String),

    /// 认证被服务器拒绝
    #[error("authentication rejected for user '{user}': {reason}")]
    AuthRejected { user: String, reason: String },
}

/// 通道错误
#[derive(Debug, Error)]
pub enum ChannelError {
    /// 打开会话通道失败
    #[error("failed to open channel: {0}")]
    OpenFailed(String),

    /// 请求 PTY 失败
    #[error("failed to request pty: {0}")]
    PtyFailed(String),

    /// 请求 Shell 失败
    #[error("failed to request shell: {0}")]
    ShellFailed(String),

    /// 写入失败（包括向已 EOF 的通道写入）
    #[error("failed to write to channel: {0}")]
    WriteFailed(String),
}

/// 会话级错误，run_session 的统一错误返回
#[derive(Debug, Error)]
pub enum SessionError {
    /// 连接建立失败
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// 握手或认证失败
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// 通道建立或 I/O 失败
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// 运行时构建失败（仅 run_session_blocking）
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}
