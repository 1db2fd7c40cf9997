//! # Input 模块
//!
//! 开关设备输入：在独立线程上读取设备事件，转换为窗口动作后投递到主循环。
//!
//! ## 设计说明
//!
//! - 设备以文本行的形式上报事件（标准输入或其他 `BufRead` 来源）
//! - 激活事件做防抖，避免抖动的开关重复触发
//! - 动作通过 `LoopSender` 投递，只在主循环线程上接触窗口
//!
//! ## 事件格式
//!
//! | 行 | 动作 |
//! |----|------|
//! | `activate` / `a` | 激活当前焦点 |
//! | `click <名称>` | 点击指定名称的演员 |
//! | `focus <名称>` | 把键盘焦点移到指定名称的演员 |
//! | `quit` / `q` | 销毁窗口 |

use crate::window::{ViewError, Window};
use pisak_runtime::{CLICKED_SIGNAL, LoopSender};
use std::io::BufRead;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 激活防抖间隔
const ACTIVATE_DEBOUNCE: Duration = Duration::from_millis(150);

/// 设备事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Activate,
    Click(String),
    Focus(String),
    Quit,
}

impl DeviceCommand {
    /// 解析一行设备事件，无法识别时返回 `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match (verb, arg) {
            ("activate" | "a", "") => Some(Self::Activate),
            ("quit" | "q", "") => Some(Self::Quit),
            ("click", name) if !name.is_empty() => Some(Self::Click(name.to_string())),
            ("focus", name) if !name.is_empty() => Some(Self::Focus(name.to_string())),
            _ => None,
        }
    }

    /// 在窗口上执行，返回是否有处理器响应
    pub fn apply(&self, window: &mut Window) -> Result<bool, ViewError> {
        match self {
            Self::Activate => window.activate(),
            Self::Click(name) => match window.stage.find(name) {
                Some(actor) => window.emit(actor, CLICKED_SIGNAL),
                None => {
                    warn!(name = %name, "点击的演员不存在");
                    Ok(false)
                }
            },
            Self::Focus(name) => match window.stage.find(name) {
                Some(actor) => {
                    window.stage.set_key_focus(Some(actor))?;
                    Ok(true)
                }
                None => {
                    warn!(name = %name, "聚焦的演员不存在");
                    Ok(false)
                }
            },
            Self::Quit => {
                info!("设备请求退出");
                window.destroy();
                Ok(true)
            }
        }
    }
}

/// 设备事件读取器
///
/// 负责解析与防抖，不持有窗口。
#[derive(Debug, Default)]
pub struct DeviceReader {
    /// 上次激活时间（用于防抖）
    last_activate: Option<Instant>,
}

impl DeviceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一行事件，返回需要投递的命令
    pub fn feed(&mut self, line: &str, now: Instant) -> Option<DeviceCommand> {
        let Some(command) = DeviceCommand::parse(line) else {
            if !line.trim().is_empty() {
                debug!(line = line.trim(), "无法识别的设备事件");
            }
            return None;
        };
        if command == DeviceCommand::Activate {
            if let Some(last) = self.last_activate {
                if now.duration_since(last) < ACTIVATE_DEBOUNCE {
                    debug!("激活事件被防抖丢弃");
                    return None;
                }
            }
            self.last_activate = Some(now);
        }
        Some(command)
    }
}

/// 在后台线程上读取设备事件并投递到主循环
///
/// 来源读完或主循环已结束时线程退出。
pub fn spawn_reader(
    source: impl BufRead + Send + 'static,
    sender: LoopSender<Window>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("pisak-device".to_string())
        .spawn(move || {
            let mut reader = DeviceReader::new();
            for line in source.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "读取设备事件失败");
                        break;
                    }
                };
                let Some(command) = reader.feed(&line, Instant::now()) else {
                    continue;
                };
                let delivered = sender.send(move |window: &mut Window| {
                    if let Err(e) = command.apply(window) {
                        warn!(error = %e, "执行设备事件失败");
                    }
                });
                if !delivered {
                    break;
                }
            }
            debug!("设备读取线程结束");
        })
}
