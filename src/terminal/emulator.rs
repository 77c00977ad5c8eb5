// 终端模拟器 - 封装 alacritty_terminal::Term
//
// 模拟器是调用方渲染上下文持有的普通值，由引擎显式传递，
// 不存在进程级单例；多个会话可各自持有独立实例

use alacritty_terminal::event::{Event as AlacEvent, EventListener};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::term::Config as TermConfig;
use alacritty_terminal::vte::ansi;
use alacritty_terminal::Term;

use super::TerminalSink;

/// 终端尺寸信息
#[derive(Clone, Debug)]
pub struct TerminalSize {
    /// 列数
    pub columns: usize,
    /// 行数
    pub lines: usize,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            columns: 80,
            lines: 24,
        }
    }
}

impl TerminalSize {
    pub fn new(columns: usize, lines: usize) -> Self {
        Self {
            columns: columns.max(1),
            lines: lines.max(1),
        }
    }
}

impl Dimensions for TerminalSize {
    fn total_lines(&self) -> usize {
        self.lines
    }

    fn screen_lines(&self) -> usize {
        self.lines
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn last_column(&self) -> alacritty_terminal::index::Column {
        alacritty_terminal::index::Column(self.columns.saturating_sub(1))
    }

    fn bottommost_line(&self) -> alacritty_terminal::index::Line {
        alacritty_terminal::index::Line(self.lines as i32 - 1)
    }

    fn topmost_line(&self) -> alacritty_terminal::index::Line {
        alacritty_terminal::index::Line(0)
    }
}

/// 事件代理 - 接收终端事件（标题变化、铃声等暂不处理）
#[derive(Clone)]
pub struct EventProxy;

impl EventListener for EventProxy {
    fn send_event(&self, _event: AlacEvent) {}
}

/// 终端模拟器状态
pub struct TerminalEmulator {
    /// alacritty 终端实例
    term: Term<EventProxy>,
    /// VTE 解析器
    parser: ansi::Processor,
    /// 当前尺寸
    size: TerminalSize,
}

impl TerminalEmulator {
    /// 创建新的终端模拟器
    pub fn new(columns: usize, lines: usize) -> Self {
        let size = TerminalSize::new(columns, lines);
        let term = Term::new(TermConfig::default(), &size, EventProxy);

        Self {
            term,
            parser: ansi::Processor::new(),
            size,
        }
    }

    /// 获取终端实例（供渲染器读取内容）
    pub fn term(&self) -> &Term<EventProxy> {
        &self.term
    }

    /// 获取当前尺寸
    pub fn size(&self) -> &TerminalSize {
        &self.size
    }

    /// 调整终端尺寸
    pub fn resize(&mut self, columns: usize, lines: usize) {
        let new_size = TerminalSize::new(columns, lines);
        if new_size.columns != self.size.columns || new_size.lines != self.size.lines {
            self.size = new_size.clone();
            self.term.resize(new_size);
        }
    }
}

impl TerminalSink for TerminalEmulator {
    /// 远端字节经 VTE 解析器更新终端状态
    fn input(&mut self, data: &[u8]) {
        self.parser.advance(&mut self.term, data);
    }
}
