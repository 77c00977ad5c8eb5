// 输入事件模型与按键翻译
// 将本地输入设备的事件转换为终端转义序列或本地动作

use async_trait::async_trait;

/// 修饰键状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// 导航键
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    Escape,
    Up,
    Down,
    Left,
    Right,
    Tab,
    Backspace,
    Return,
    /// 关闭会话，返回启动器
    F1,
    /// 键盘背光开关
    F2,
    /// 屏幕背光档位
    F3,
}

/// 本地输入事件
/// 由外部输入源产生，每轮循环消费一个
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// 非事件（输入等待超时等）
    None,
    /// 可打印按键
    Key { code: u8, modifiers: Modifiers },
    /// 导航键，pressed 区分按下/抬起
    Navigation {
        key: NavKey,
        modifiers: Modifiers,
        pressed: bool,
    },
    /// 设备动作事件（电源键等），不转发到远端
    Action { kind: u32, pressed: bool },
}

/// 仅在本地执行的动作，不触碰通道
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalAction {
    /// 请求关闭会话
    CloseSession,
    /// 切换键盘背光
    ToggleKeyboardBacklight,
    /// 调整屏幕背光档位
    CycleDisplayBacklight,
}

/// 翻译结果: 发往远端的字节，或本地动作
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Remote(Vec<u8>),
    Local(LocalAction),
}

/// 将输入事件翻译为输出
/// 纯函数，无副作用；只有按下转换产生输出，未映射的事件不产生任何东西
pub fn translate(event: &InputEvent) -> Option<Outbound> {
    match event {
        InputEvent::Key { code, .. } => Some(Outbound::Remote(vec![*code])),

        InputEvent::Navigation { pressed: false, .. } => None,
        InputEvent::Navigation { key, .. } => match key {
            NavKey::Escape => Some(Outbound::Remote(vec![0x1b])),

            // 方向键: CSI 序列
            NavKey::Up => Some(Outbound::Remote(vec![0x1b, b'[', b'A'])),
            NavKey::Down => Some(Outbound::Remote(vec![0x1b, b'[', b'B'])),
            NavKey::Right => Some(Outbound::Remote(vec![0x1b, b'[', b'C'])),
            NavKey::Left => Some(Outbound::Remote(vec![0x1b, b'[', b'D'])),

            NavKey::Tab => Some(Outbound::Remote(vec![0x09])),
            NavKey::Backspace => Some(Outbound::Remote(vec![0x08])),
            NavKey::Return => Some(Outbound::Remote(vec![0x0a])),

            // 功能键保留给本地动作，不转发到远端
            NavKey::F1 => Some(Outbound::Local(LocalAction::CloseSession)),
            NavKey::F2 => Some(Outbound::Local(LocalAction::ToggleKeyboardBacklight)),
            NavKey::F3 => Some(Outbound::Local(LocalAction::CycleDisplayBacklight)),
        },

        InputEvent::None | InputEvent::Action { .. } => None,
    }
}

/// 本地输入源
/// 每次调用等待并返回一个事件；事件循环用有界超时包裹这次等待
#[async_trait]
pub trait InputSource {
    async fn next_event(&mut self) -> InputEvent;
}

/// 输入队列的默认实现
#[async_trait]
impl InputSource for tokio::sync::mpsc::UnboundedReceiver<InputEvent> {
    async fn next_event(&mut self) -> InputEvent {
        match self.recv().await {
            Some(event) => event,
            // 发送端全部释放后队列保持安静: 挂起等待而不是立即返回，
            // 否则主循环会从 10ms 节奏退化成忙轮询
            None => std::future::pending().await,
        }
    }
}
