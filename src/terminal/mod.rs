// Terminal 模块 - 基于 alacritty_terminal 的终端模拟器
//
// 引擎本身不渲染: 远端字节喂给 TerminalSink，
// 每次非空读取后向 RenderSurface 请求一次重绘

mod emulator;

pub use emulator::{EventProxy, TerminalEmulator, TerminalSize};

/// 终端字节接收端
/// 远端输出按顺序喂入，立即消费，不做持久化
pub trait TerminalSink {
    fn input(&mut self, data: &[u8]);
}

/// 渲染表面
/// 调用方持有的不透明句柄，支持"把当前帧刷到屏幕"
pub trait RenderSurface {
    fn blit(&mut self);
}
