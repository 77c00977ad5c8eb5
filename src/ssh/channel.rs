// Shell 通道生命周期与非阻塞 I/O
//
// 建立顺序严格固定: open -> request_pty -> request_shell，
// 任一步失败则整个会话尝试中止，不做部分恢复。
// Shell 建立后所有通道 I/O 均为非阻塞:
// 读取通过 now_or_never 单次轮询消息流实现，永不挂起。
//
// 读写路径分离以避免死锁（与上游消息循环竞争通道状态）:
// - 读: channel.wait() 持有通道内部状态
// - 写: 直接使用 handle.data()，不需要持有通道

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use russh::client::{Handle, Msg};
use russh::{ChannelId, ChannelMsg};
use tracing::{debug, trace, warn};

use super::config::SshConfig;
use super::error::ChannelError;
use super::handler::ClientHandler;

/// PTY 请求参数
#[derive(Clone, Debug)]
pub struct PtyRequest {
    /// 终端类型
    pub term: String,
    /// 列数
    pub col_width: u32,
    /// 行数
    pub row_height: u32,
    /// 像素宽度
    pub pix_width: u32,
    /// 像素高度
    pub pix_height: u32,
    /// 终端模式
    pub modes: Vec<(russh::Pty, u32)>,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: "xterm-256color".to_string(),
            col_width: 80,
            row_height: 24,
            pix_width: 0,
            pix_height: 0,
            modes: vec![],
        }
    }
}

impl PtyRequest {
    /// 从会话配置构建 PTY 请求
    pub fn from_config(config: &SshConfig) -> Self {
        Self {
            term: config.term.clone(),
            col_width: config.columns,
            row_height: config.rows,
            ..Default::default()
        }
    }
}

/// 一次非阻塞读取的结果
/// 零长度的 Bytes 不代表流结束；流结束只由 is_eof 信号给出
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 读到 0..n 字节
    Bytes(Vec<u8>),
    /// 当前没有可读数据，稳态行为而非错误
    WouldBlock,
}

/// 通道 I/O 契约
/// 事件循环只通过这个接口驱动通道，便于用脚本化的假通道测试循环行为
#[async_trait]
pub trait ShellIo {
    /// 写入数据；不要求部分写入重试，调用方可重新发起
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError>;

    /// 非阻塞读取最多 max_len 字节，永不挂起
    fn read_nonblocking(&mut self, max_len: usize) -> ReadOutcome;

    /// 远端是否已发出 EOF
    fn is_eof(&self) -> bool;

    /// 关闭通道，幂等
    async fn close(&mut self);
}

// 使用 russh::client::Msg 作为消息类型
type RusshChannel = russh::Channel<Msg>;

/// Shell 通道
/// 持有已认证会话的 Handle —— 通道绝不会先于会话存在
pub struct ShellChannel {
    id: ChannelId,
    handle: Arc<Handle<ClientHandler>>,
    channel: RusshChannel,
    /// 已从消息流取出但尚未被 read_nonblocking 消费的字节
    pending: Vec<u8>,
    pty_requested: bool,
    shell_requested: bool,
    eof: bool,
    closed: bool,
}

impl ShellChannel {
    /// 在已认证的会话上打开会话通道
    pub async fn open(handle: Arc<Handle<ClientHandler>>) -> Result<Self, ChannelError> {
        debug!("[SSH] Opening session channel");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::OpenFailed(e.to_string()))?;

        Ok(Self {
            id: channel.id(),
            handle,
            channel,
            pending: Vec::new(),
            pty_requested: false,
            shell_requested: false,
            eof: false,
            closed: false,
        })
    }

    /// 请求 PTY
    pub async fn request_pty(&mut self, pty: &PtyRequest) -> Result<(), ChannelError> {
        if self.pty_requested {
            return Err(ChannelError::PtyFailed("pty already requested".to_string()));
        }

        debug!("[SSH] Requesting pty ({})", pty.term);

        self.channel
            .request_pty(
                false, // want_reply
                &pty.term,
                pty.col_width,
                pty.row_height,
                pty.pix_width,
                pty.pix_height,
                &pty.modes,
            )
            .await
            .map_err(|e| ChannelError::PtyFailed(e.to_string()))?;

        self.pty_requested = true;
        Ok(())
    }

    /// 请求交互式 Shell
    /// 必须在 request_pty 成功之后调用
    pub async fn request_shell(&mut self) -> Result<(), ChannelError> {
        if !self.pty_requested {
            return Err(ChannelError::ShellFailed(
                "shell requested before pty".to_string(),
            ));
        }
        if self.shell_requested {
            return Err(ChannelError::ShellFailed(
                "shell already requested".to_string(),
            ));
        }

        debug!("[SSH] Requesting shell");

        self.channel
            .request_shell(false)
            .await
            .map_err(|e| ChannelError::ShellFailed(e.to_string()))?;

        self.shell_requested = true;
        Ok(())
    }

    /// 取出缓冲区中最多 max_len 字节
    fn take_pending(&mut self, max_len: usize) -> Vec<u8> {
        let n = self.pending.len().min(max_len);
        self.pending.drain(..n).collect()
    }
}

#[async_trait]
impl ShellIo for ShellChannel {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError> {
        if !self.shell_requested {
            return Err(ChannelError::WriteFailed(
                "write before shell setup completed".to_string(),
            ));
        }
        if self.eof || self.closed {
            return Err(ChannelError::WriteFailed("channel is at eof".to_string()));
        }

        self.handle
            .data(self.id, bytes.to_vec().into())
            .await
            .map_err(|_| ChannelError::WriteFailed("failed to send data to channel".to_string()))?;

        trace!("[SSH] Wrote {} bytes to channel", bytes.len());
        Ok(bytes.len())
    }

    fn read_nonblocking(&mut self, max_len: usize) -> ReadOutcome {
        if self.eof || self.closed {
            return ReadOutcome::WouldBlock;
        }
        if !self.pending.is_empty() {
            return ReadOutcome::Bytes(self.take_pending(max_len));
        }

        // 单次轮询消息流；没有就绪的消息时立刻返回
        match self.channel.wait().now_or_never() {
            None => ReadOutcome::WouldBlock,
            Some(None) => {
                debug!("[SSH] Channel message stream ended");
                self.eof = true;
                ReadOutcome::WouldBlock
            }
            Some(Some(msg)) => match msg {
                ChannelMsg::Data { data } => {
                    trace!("[SSH] Received {} bytes", data.len());
                    self.pending.extend_from_slice(&data);
                    ReadOutcome::Bytes(self.take_pending(max_len))
                }
                ChannelMsg::ExtendedData { data, .. } => {
                    self.pending.extend_from_slice(&data);
                    ReadOutcome::Bytes(self.take_pending(max_len))
                }
                ChannelMsg::Eof | ChannelMsg::Close => {
                    debug!("[SSH] Server sent EOF");
                    self.eof = true;
                    ReadOutcome::WouldBlock
                }
                // 其他控制消息（退出码等）: 零长度读取，不是流结束
                _ => ReadOutcome::Bytes(Vec::new()),
            },
        }
    }

    fn is_eof(&self) -> bool {
        self.eof
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        debug!("[SSH] Closing channel");
        if let Err(e) = self.channel.eof().await {
            warn!("[SSH] Failed to close channel cleanly: {}", e);
        }
    }
}
