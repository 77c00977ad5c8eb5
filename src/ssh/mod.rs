// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SshConfig, AuthMethod, KeepaliveConfig)
// - error: 错误类型 (ConnectError, NegotiationError, ChannelError, SessionError)
// - handler: russh Handler 实现
// - connect: TCP 连接建立
// - negotiate: SSH 握手与密码认证
// - channel: Shell 通道生命周期与非阻塞 I/O (ShellChannel, ShellIo)

pub mod channel;
pub mod config;
pub mod connect;
pub mod error;
pub mod handler;
pub mod negotiate;

pub use channel::{PtyRequest, ReadOutcome, ShellChannel, ShellIo};
pub use config::{AuthMethod, KeepaliveConfig, SshConfig};
pub use error::{ChannelError, ConnectError, NegotiationError, SessionError};
