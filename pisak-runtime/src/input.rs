//! # Input 模块
//!
//! 输入中间件协调器：把辅助输入（开关、眼控、驻留点击）转换为界面动作的那一层。
//!
//! ## 中间件模式
//!
//! - `None`：没有中间件，协调器的启停都是空操作
//! - `Sprite`：软件层绘制的虚拟光标，渲染目标可通过 `load_content` 重新绑定
//! - `Signal`：外部设备直接发出激活信号，由获得焦点的演员消费
//!
//! 启停必须严格成对出现，协调器把不成对的调用报告为错误，而不是静默忽略。

use crate::scene::{ActorId, Stage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Signal 模式下默认的激活信号名
pub const DEFAULT_ACTION_SIGNAL: &str = "activate";

fn default_action_signal() -> String {
    DEFAULT_ACTION_SIGNAL.to_string()
}

/// 输入中间件配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Middleware {
    /// 无中间件
    #[default]
    None,
    /// 虚拟光标
    Sprite,
    /// 信号驱动
    Signal {
        /// 设备发出的激活信号名
        #[serde(default = "default_action_signal")]
        action_signal: String,
    },
}

/// 中间件模式（不带参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    None,
    Sprite,
    Signal,
}

impl Middleware {
    pub fn kind(&self) -> MiddlewareKind {
        match self {
            Middleware::None => MiddlewareKind::None,
            Middleware::Sprite => MiddlewareKind::Sprite,
            Middleware::Signal { .. } => MiddlewareKind::Signal,
        }
    }
}

/// 协调器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// 只有 Sprite 模式可以加载内容
    #[error("当前中间件 {0:?} 不支持加载内容，只有 sprite 模式可以")]
    ContentNotSupported(MiddlewareKind),

    /// 只有 Signal 模式有激活信号
    #[error("当前中间件 {0:?} 没有激活信号")]
    NoActionSignal(MiddlewareKind),

    /// 重复启动
    #[error("中间件已在运行")]
    AlreadyRunning,

    /// 未启动就停止
    #[error("中间件未在运行")]
    NotRunning,

    /// 加载的内容不在舞台上
    #[error("内容演员不存在: {0:?}")]
    UnknownContent(ActorId),
}

/// 内容绑定快照，用于在模态切换后恢复
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSnapshot {
    pub content: Option<ActorId>,
    pub running: bool,
}

/// 输入中间件协调器
#[derive(Debug, Clone)]
pub struct InputGroup {
    middleware: Middleware,
    running: bool,
    content: Option<ActorId>,
}

impl InputGroup {
    pub fn new(middleware: Middleware) -> Self {
        info!(middleware = ?middleware.kind(), "输入中间件已配置");
        Self {
            middleware,
            running: false,
            content: None,
        }
    }

    pub fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    pub fn kind(&self) -> MiddlewareKind {
        self.middleware.kind()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 当前绑定的内容
    pub fn content(&self) -> Option<ActorId> {
        self.content
    }

    /// 虚拟光标当前的渲染目标
    ///
    /// 仅在 Sprite 模式运行中且已绑定内容时存在。
    pub fn cursor_target(&self) -> Option<ActorId> {
        match self.middleware {
            Middleware::Sprite if self.running => self.content,
            _ => None,
        }
    }

    /// Signal 模式的激活信号名
    pub fn action_signal(&self) -> Result<&str, InputError> {
        match &self.middleware {
            Middleware::Signal { action_signal } => Ok(action_signal.as_str()),
            other => Err(InputError::NoActionSignal(other.kind())),
        }
    }

    /// 启动中间件
    pub fn start_middleware(&mut self) -> Result<(), InputError> {
        if self.kind() == MiddlewareKind::None {
            return Ok(());
        }
        if self.running {
            return Err(InputError::AlreadyRunning);
        }
        self.running = true;
        debug!(middleware = ?self.kind(), content = ?self.content, "中间件启动");
        Ok(())
    }

    /// 停止中间件
    pub fn stop_middleware(&mut self) -> Result<(), InputError> {
        if self.kind() == MiddlewareKind::None {
            return Ok(());
        }
        if !self.running {
            return Err(InputError::NotRunning);
        }
        self.running = false;
        debug!(middleware = ?self.kind(), "中间件停止");
        Ok(())
    }

    /// 重新绑定虚拟光标的渲染目标并启动
    ///
    /// 只在 Sprite 模式有效；运行中时先停止再重新启动。
    pub fn load_content(&mut self, stage: &Stage, target: ActorId) -> Result<(), InputError> {
        if self.kind() != MiddlewareKind::Sprite {
            return Err(InputError::ContentNotSupported(self.kind()));
        }
        if !stage.contains(target) {
            return Err(InputError::UnknownContent(target));
        }
        if self.running {
            self.stop_middleware()?;
        }
        self.content = Some(target);
        self.start_middleware()
    }

    /// 记录当前内容绑定与运行状态
    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            content: self.content,
            running: self.running,
        }
    }

    /// 恢复 `snapshot` 记录的状态
    ///
    /// 调用前中间件必须处于停止状态。
    pub fn restore(&mut self, snapshot: ContentSnapshot) -> Result<(), InputError> {
        if self.running {
            return Err(InputError::AlreadyRunning);
        }
        self.content = snapshot.content;
        if snapshot.running {
            self.start_middleware()?;
        }
        Ok(())
    }
}

impl Default for InputGroup {
    fn default() -> Self {
        Self::new(Middleware::None)
    }
}
