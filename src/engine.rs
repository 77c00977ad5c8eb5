// 会话引擎 - 状态机编排与非阻塞双向泵
//
// 单线程协作式: 唯一的挂起点是对本地输入源的有界等待，
// 通道读取按构造即非阻塞，永不挂起。
// 顺序保证: 同一轮循环中，本地写入总是先于远端排空执行，
// 维持"先打字后见回显"的因果顺序。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::controls::LocalControls;
use crate::input::{translate, InputEvent, InputSource, LocalAction, Outbound};
use crate::ssh::channel::{PtyRequest, ReadOutcome, ShellChannel, ShellIo};
use crate::ssh::config::SshConfig;
use crate::ssh::error::SessionError;
use crate::ssh::{connect, negotiate};
use crate::terminal::{RenderSurface, TerminalSink};

/// 每次非阻塞读取的最大字节数
const READ_CHUNK: usize = 4096;

/// 会话状态机的阶段
/// 建立阶段中任何失败都直接进入 Closed 并把原始错误交还调用方，
/// 不做重试或退避
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Negotiating,
    Authenticating,
    ChannelOpening,
    PtyRequested,
    ShellActive,
    Closing,
    Closed,
}

/// 会话结束方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// 远端发出 EOF
    RemoteEof,
    /// 本地请求关闭
    LocalClose,
}

/// 状态机推进
fn enter(phase: &mut SessionPhase, next: SessionPhase) {
    debug!("[Session] {:?} -> {:?}", phase, next);
    *phase = next;
}

/// 运行一次交互式会话，阻塞（await）直到会话结束
///
/// 终端模拟器、渲染表面、输入源与本地控制都由调用方持有并显式传入；
/// 引擎不写任何持久化状态，结束后控制权交还调用方（例如菜单）
pub async fn run_session<I, T, S, C>(
    input: &mut I,
    terminal: &mut T,
    surface: &mut S,
    controls: &mut C,
    config: &SshConfig,
) -> Result<SessionEnd, SessionError>
where
    I: InputSource + Send,
    T: TerminalSink,
    S: RenderSurface,
    C: LocalControls,
{
    let mut phase = SessionPhase::Disconnected;

    enter(&mut phase, SessionPhase::Connecting);
    let stream = connect::establish(&config.host, config.port, config.connect_timeout).await?;

    enter(&mut phase, SessionPhase::Negotiating);
    let mut handle = negotiate::handshake(config, stream).await?;

    enter(&mut phase, SessionPhase::Authenticating);
    negotiate::authenticate(&mut handle, config).await?;

    // Handle 只有在认证成功之后才会交给通道层
    enter(&mut phase, SessionPhase::ChannelOpening);
    let mut channel = ShellChannel::open(Arc::new(handle)).await?;

    enter(&mut phase, SessionPhase::PtyRequested);
    channel.request_pty(&PtyRequest::from_config(config)).await?;
    channel.request_shell().await?;

    enter(&mut phase, SessionPhase::ShellActive);
    info!("[Session] Shell active, entering main loop");

    let result = shell_loop(
        &mut channel,
        input,
        terminal,
        surface,
        controls,
        config.poll_interval(),
    )
    .await;

    // 成功、失败或本地关闭都从这一条路径释放会话，不会重复关闭
    enter(&mut phase, SessionPhase::Closing);
    channel.close().await;

    enter(&mut phase, SessionPhase::Closed);
    match &result {
        Ok(end) => info!("[Session] Session ended: {:?}", end),
        Err(e) => error!("[Session] Session ended with error: {}", e),
    }
    result
}

/// run_session 的同步封装，内部持有一个当前线程的 tokio 运行时
pub fn run_session_blocking<I, T, S, C>(
    input: &mut I,
    terminal: &mut T,
    surface: &mut S,
    controls: &mut C,
    config: &SshConfig,
) -> Result<SessionEnd, SessionError>
where
    I: InputSource + Send,
    T: TerminalSink,
    S: RenderSurface,
    C: LocalControls,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(input, terminal, surface, controls, config))
}

/// ShellActive 主循环
///
/// 每轮迭代:
/// 1. 有界等待本地输入（超时不是错误，保证无输入时排空步骤照常运行）
/// 2. 本地动作立即执行、不触碰通道；其余事件翻译后写入通道
/// 3. 总是执行一次输出泵排空
/// 4. 通道 EOF 则退出
/// 5. 本地请求关闭则退出
async fn shell_loop<Ch, I, T, S, C>(
    channel: &mut Ch,
    input: &mut I,
    terminal: &mut T,
    surface: &mut S,
    controls: &mut C,
    poll_interval: Duration,
) -> Result<SessionEnd, SessionError>
where
    Ch: ShellIo,
    I: InputSource + Send,
    T: TerminalSink,
    S: RenderSurface,
    C: LocalControls,
{
    loop {
        let event = match timeout(poll_interval, input.next_event()).await {
            Ok(event) => event,
            Err(_) => InputEvent::None,
        };

        let mut close_requested = false;
        match translate(&event) {
            Some(Outbound::Local(action)) => match action {
                LocalAction::CloseSession => {
                    info!("[Session] Close requested, returning to launcher");
                    close_requested = true;
                }
                LocalAction::ToggleKeyboardBacklight => controls.toggle_keyboard_backlight(),
                LocalAction::CycleDisplayBacklight => controls.cycle_display_backlight(),
            },
            Some(Outbound::Remote(bytes)) => {
                if !channel.is_eof() {
                    if let Err(e) = channel.write(&bytes).await {
                        // 写入失败升级为会话错误，走干净的关闭路径
                        error!("[Session] Channel write failed: {}", e);
                        return Err(e.into());
                    }
                }
            }
            None => {}
        }

        pump_remote_output(channel, terminal, surface);

        if channel.is_eof() {
            debug!("[Session] Server sent EOF");
            return Ok(SessionEnd::RemoteEof);
        }
        if close_requested {
            return Ok(SessionEnd::LocalClose);
        }
    }
}

/// 输出泵: 每次调用至多发起一次非阻塞读取
/// 读到 n>0 字节时按序喂给终端模拟器并请求恰好一次重绘；
/// 零长度读取与 WouldBlock 什么都不做，流结束只由 is_eof 信号判定
pub fn pump_remote_output<Ch, T, S>(channel: &mut Ch, terminal: &mut T, surface: &mut S) -> bool
where
    Ch: ShellIo,
    T: TerminalSink,
    S: RenderSurface,
{
    if channel.is_eof() {
        return false;
    }

    match channel.read_nonblocking(READ_CHUNK) {
        ReadOutcome::WouldBlock => false,
        ReadOutcome::Bytes(bytes) if bytes.is_empty() => false,
        ReadOutcome::Bytes(bytes) => {
            terminal.input(&bytes);
            surface.blit();
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, NavKey};
    use crate::ssh::error::ChannelError;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// 脚本化的读取步骤
    enum ReadStep {
        Data(Vec<u8>),
        Block,
        Eof,
    }

    /// 通道观察到的操作，用于断言顺序
    #[derive(Debug, PartialEq, Eq)]
    enum Op {
        Write(Vec<u8>),
        Read,
        Close,
    }

    struct ScriptedChannel {
        script: VecDeque<ReadStep>,
        ops: Vec<Op>,
        eof: bool,
        fail_writes: bool,
    }

    impl ScriptedChannel {
        fn new(script: Vec<ReadStep>) -> Self {
            Self {
                script: script.into(),
                ops: Vec::new(),
                eof: false,
                fail_writes: false,
            }
        }
    }

    #[async_trait]
    impl ShellIo for ScriptedChannel {
        async fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError> {
            if self.fail_writes {
                return Err(ChannelError::WriteFailed("scripted failure".to_string()));
            }
            self.ops.push(Op::Write(bytes.to_vec()));
            Ok(bytes.len())
        }

        fn read_nonblocking(&mut self, _max_len: usize) -> ReadOutcome {
            self.ops.push(Op::Read);
            match self.script.pop_front() {
                Some(ReadStep::Data(data)) => ReadOutcome::Bytes(data),
                Some(ReadStep::Eof) => {
                    self.eof = true;
                    ReadOutcome::WouldBlock
                }
                Some(ReadStep::Block) | None => ReadOutcome::WouldBlock,
            }
        }

        fn is_eof(&self) -> bool {
            self.eof
        }

        async fn close(&mut self) {
            self.ops.push(Op::Close);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        bytes: Vec<u8>,
        chunks: usize,
    }

    impl TerminalSink for RecordingSink {
        fn input(&mut self, data: &[u8]) {
            self.bytes.extend_from_slice(data);
            self.chunks += 1;
        }
    }

    #[derive(Default)]
    struct CountingSurface {
        blits: usize,
    }

    impl RenderSurface for CountingSurface {
        fn blit(&mut self) {
            self.blits += 1;
        }
    }

    #[derive(Default)]
    struct CountingControls {
        keyboard: usize,
        display: usize,
    }

    impl LocalControls for CountingControls {
        fn toggle_keyboard_backlight(&mut self) {
            self.keyboard += 1;
        }

        fn cycle_display_backlight(&mut self) {
            self.display += 1;
        }
    }

    struct ScriptedInput {
        events: VecDeque<InputEvent>,
    }

    impl ScriptedInput {
        fn new(events: Vec<InputEvent>) -> Self {
            Self {
                events: events.into(),
            }
        }

        fn empty() -> Self {
            Self::new(vec![])
        }
    }

    #[async_trait]
    impl InputSource for ScriptedInput {
        async fn next_event(&mut self) -> InputEvent {
            match self.events.pop_front() {
                Some(event) => event,
                // 脚本耗尽后输入源保持安静，循环只能靠超时推进
                None => std::future::pending().await,
            }
        }
    }

    /// 初始化日志输出
    /// 通过 RUST_LOG 环境变量控制级别，例如: RUST_LOG=debug cargo test
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn press(key: NavKey) -> InputEvent {
        InputEvent::Navigation {
            key,
            modifiers: Modifiers::default(),
            pressed: true,
        }
    }

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn test_pump_feeds_bytes_and_blits_once() {
        let mut channel = ScriptedChannel::new(vec![ReadStep::Data(b"hello\r\n".to_vec())]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();

        assert!(pump_remote_output(&mut channel, &mut sink, &mut surface));
        assert_eq!(sink.bytes, b"hello\r\n");
        assert_eq!(sink.chunks, 1);
        assert_eq!(surface.blits, 1);

        // 没有数据时不喂入也不重绘
        assert!(!pump_remote_output(&mut channel, &mut sink, &mut surface));
        assert_eq!(surface.blits, 1);
    }

    #[test]
    fn test_pump_preserves_byte_order_across_reads() {
        let mut channel = ScriptedChannel::new(vec![
            ReadStep::Data(b"hel".to_vec()),
            ReadStep::Block,
            ReadStep::Data(b"lo".to_vec()),
        ]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();

        pump_remote_output(&mut channel, &mut sink, &mut surface);
        pump_remote_output(&mut channel, &mut sink, &mut surface);
        pump_remote_output(&mut channel, &mut sink, &mut surface);

        assert_eq!(sink.bytes, b"hello");
        // 每次非空读取恰好一次重绘
        assert_eq!(surface.blits, 2);
    }

    #[test]
    fn test_pump_zero_length_read_is_not_eof() {
        let mut channel = ScriptedChannel::new(vec![ReadStep::Data(vec![])]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();

        assert!(!pump_remote_output(&mut channel, &mut sink, &mut surface));
        assert!(!channel.is_eof());
        assert_eq!(surface.blits, 0);
    }

    #[test]
    fn test_pump_skips_read_after_eof() {
        let mut channel = ScriptedChannel::new(vec![]);
        channel.eof = true;
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();

        assert!(!pump_remote_output(&mut channel, &mut sink, &mut surface));
        assert!(channel.ops.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_writes_before_draining_each_iteration() {
        init_tracing();
        let mut channel = ScriptedChannel::new(vec![ReadStep::Block, ReadStep::Block, ReadStep::Eof]);
        let mut input = ScriptedInput::new(vec![press(NavKey::Down), press(NavKey::Return)]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::RemoteEof);
        // 每轮迭代: 先写后读; 第三轮输入超时后仍然排空并观察到 EOF
        assert_eq!(
            channel.ops,
            vec![
                Op::Write(vec![0x1b, 0x5b, 0x42]),
                Op::Read,
                Op::Write(vec![0x0a]),
                Op::Read,
                Op::Read,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_drains_without_local_input() {
        init_tracing();
        let mut channel = ScriptedChannel::new(vec![
            ReadStep::Data(b"hello\r\n".to_vec()),
            ReadStep::Eof,
        ]);
        let mut input = ScriptedInput::empty();
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::RemoteEof);
        assert_eq!(sink.bytes, b"hello\r\n");
        assert_eq!(surface.blits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eof_exits_without_further_writes() {
        let mut channel = ScriptedChannel::new(vec![ReadStep::Eof]);
        let mut input = ScriptedInput::new(vec![
            press(NavKey::Down),
            press(NavKey::Down),
            press(NavKey::Down),
        ]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        // 观察到 EOF 的同一轮迭代内退出，之后不再有写入
        assert_eq!(end, SessionEnd::RemoteEof);
        assert_eq!(
            channel.ops,
            vec![Op::Write(vec![0x1b, 0x5b, 0x42]), Op::Read]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_close_action() {
        let mut channel = ScriptedChannel::new(vec![ReadStep::Block]);
        let mut input = ScriptedInput::new(vec![press(NavKey::F1)]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::LocalClose);
        // 本地动作不触碰通道: 无写入，只有关闭前的那次排空读取
        assert_eq!(channel.ops, vec![Op::Read]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlight_actions_stay_local() {
        let mut channel = ScriptedChannel::new(vec![
            ReadStep::Block,
            ReadStep::Block,
            ReadStep::Block,
        ]);
        let mut input = ScriptedInput::new(vec![
            press(NavKey::F2),
            press(NavKey::F3),
            press(NavKey::F1),
        ]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::LocalClose);
        assert_eq!(controls.keyboard, 1);
        assert_eq!(controls.display, 1);
        assert!(!channel.ops.iter().any(|op| matches!(op, Op::Write(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_escalates_to_session_error() {
        let mut channel = ScriptedChannel::new(vec![]);
        channel.fail_writes = true;
        let mut input = ScriptedInput::new(vec![press(NavKey::Return)]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let result = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await;

        assert!(matches!(
            result,
            Err(SessionError::Channel(ChannelError::WriteFailed(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_release_writes_nothing() {
        let mut channel = ScriptedChannel::new(vec![ReadStep::Block, ReadStep::Eof]);
        let mut input = ScriptedInput::new(vec![InputEvent::Navigation {
            key: NavKey::Return,
            modifiers: Modifiers::default(),
            pressed: false,
        }]);
        let mut sink = RecordingSink::default();
        let mut surface = CountingSurface::default();
        let mut controls = CountingControls::default();

        let end = shell_loop(
            &mut channel,
            &mut input,
            &mut sink,
            &mut surface,
            &mut controls,
            POLL,
        )
        .await
        .unwrap();

        assert_eq!(end, SessionEnd::RemoteEof);
        assert_eq!(channel.ops, vec![Op::Read, Op::Read]);
    }
}
