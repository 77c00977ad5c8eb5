// 本地控制 - 键盘/屏幕背光
// 纯本地副作用，不属于会话逻辑；引擎只通过 LocalControls 触发

use tracing::debug;

/// 本地硬件控制
/// 由调用方实现（背光驱动在设备侧）；引擎在对应的功能键按下时调用，
/// 这些调用从不触碰通道
pub trait LocalControls {
    /// 切换键盘背光
    fn toggle_keyboard_backlight(&mut self);
    /// 调整屏幕背光档位
    fn cycle_display_backlight(&mut self);
}

/// 无背光硬件时的空实现
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopControls;

impl LocalControls for NoopControls {
    fn toggle_keyboard_backlight(&mut self) {
        debug!("[Controls] Keyboard backlight toggle ignored (no hardware)");
    }

    fn cycle_display_backlight(&mut self) {
        debug!("[Controls] Display backlight cycle ignored (no hardware)");
    }
}

/// 键盘背光在全亮和关闭之间切换
pub fn toggle_keyboard_level(current: u8) -> u8 {
    if current != 100 {
        100
    } else {
        0
    }
}

/// 屏幕背光每次加一档，超过上限回到最低可读档位
pub fn cycle_display_level(current: u8) -> u8 {
    let next = current.saturating_add(15);
    if next > 100 {
        10
    } else {
        next
    }
}
