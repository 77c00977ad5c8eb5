// ShellBridge - 交互式远程 Shell 会话引擎
//
// 将本地输入设备的按键/导航事件桥接到远程 SSH Shell，
// 并把远端输出的字节流渲染到本地终端表面。
//
// 模块结构:
// - ssh: 连接建立、协议协商、通道生命周期 (russh 封装)
// - input: 输入事件模型与按键转义序列翻译
// - controls: 本地副作用 (键盘/屏幕背光)
// - terminal: 终端模拟器与渲染表面接口
// - engine: 会话状态机与非阻塞双向泵

pub mod controls;
pub mod engine;
pub mod input;
pub mod ssh;
pub mod terminal;

pub use controls::{LocalControls, NoopControls};
pub use engine::{run_session, run_session_blocking, SessionEnd, SessionPhase};
pub use input::{translate, InputEvent, InputSource, LocalAction, Modifiers, NavKey, Outbound};
pub use ssh::channel::{PtyRequest, ReadOutcome, ShellChannel, ShellIo};
pub use ssh::config::{AuthMethod, KeepaliveConfig, SshConfig};
pub use ssh::error::{ChannelError, ConnectError, NegotiationError, SessionError};
pub use terminal::{RenderSurface, TerminalEmulator, TerminalSink};
