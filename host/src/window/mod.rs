//! # Window 模块
//!
//! 应用窗口与窗口后端。
//!
//! ## 结构
//!
//! ```text
//! Window
//! ├── stage: Stage              场景图根
//! ├── input_group: InputGroup   输入中间件协调器
//! ├── wrapper: Option<NativeWindow>  嵌入式后端的外层窗口
//! └── content: Box<dyn WindowContent> 当前视图
//! ```
//!
//! 后端（`WindowBackend`）负责初始化工具包、创建窗口、运行与退出主循环。
//! [`stage`] 和 [`embedded`] 在内存中建立窗口结构，自带主循环；
//! [`desktop`] 包在它们外面，用 winit 打开真实的原生窗口并驱动事件循环。

pub mod desktop;
pub mod embedded;
mod native;
pub mod stage;

pub use desktop::DesktopBackend;
pub use embedded::EmbeddedBackend;
pub use native::NativeWindow;
pub use stage::StageBackend;

use crate::app::{AppArgs, RunningFlag};
use crate::config::{AppConfig, MonitorConfig};
use pisak_runtime::{
    ActorId, CLICKED_SIGNAL, Descriptor, FullscreenError, HandlerId, InputError, InputGroup,
    LoopHandle, LoopSender, MainLoop, Middleware, MiddlewareKind, SceneError, Stage, StageAccess,
    UiContext,
};
use thiserror::Error;
use tracing::{debug, info};

/// 调试模式下窗口占显示器尺寸的比例
pub const DEBUG_SIZE_FACTOR: f32 = 0.7;

/// 视图错误
#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Fullscreen(#[from] FullscreenError),
}

/// 窗口后端错误
#[derive(Error, Debug)]
pub enum BackendError {
    /// 原生窗口工具包无法初始化（例如没有可用的显示服务）
    #[error("窗口工具包初始化失败: {0}")]
    Toolkit(String),
}

/// 窗口中显示的视图
pub trait WindowContent {
    /// 视图名称（日志用）
    fn name(&self) -> &str;

    /// 视图根演员
    fn root(&self) -> ActorId;

    /// 处理投递到视图内演员上的信号，返回是否已处理
    fn on_signal(
        &mut self,
        ctx: &mut UiContext<'_>,
        actor: ActorId,
        handler: HandlerId,
    ) -> Result<bool, ViewError>;
}

/// 应用窗口
pub struct Window {
    pub stage: Stage,
    pub input_group: InputGroup,
    /// 嵌入式后端的外层窗口
    pub wrapper: Option<NativeWindow>,
    content: Option<Box<dyn WindowContent>>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("stage", &self.stage)
            .field("input_group", &self.input_group)
            .field("wrapper", &self.wrapper)
            .field("content", &self.content.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl StageAccess for Window {
    fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

impl Window {
    pub fn new(stage: Stage, middleware: Middleware) -> Self {
        Self {
            stage,
            input_group: InputGroup::new(middleware),
            wrapper: None,
            content: None,
        }
    }

    /// 舞台与协调器组成的组件上下文
    pub fn ui_context(&mut self) -> UiContext<'_> {
        UiContext::new(&mut self.stage, &mut self.input_group)
    }

    /// 当前视图名称
    pub fn content_name(&self) -> Option<&str> {
        self.content.as_deref().map(|c| c.name())
    }

    /// 加载视图
    ///
    /// 视图根挂到舞台上，并按中间件模式接管输入：
    /// Sprite 模式把光标绑定到视图根，Signal 模式启动中间件。
    pub fn load_view(&mut self, view: Box<dyn WindowContent>) -> Result<(), ViewError> {
        let root = view.root();
        if let Some(old) = self.content.take() {
            let old_root = old.root();
            if let Some(parent) = self.stage.parent(old_root) {
                self.stage.remove_child(parent, old_root)?;
            }
            debug!(view = old.name(), "卸载视图");
        }
        if self.stage.parent(root).is_none() {
            let stage_root = self.stage.root();
            self.stage.add_child(stage_root, root)?;
        }

        match self.input_group.kind() {
            MiddlewareKind::None => {}
            MiddlewareKind::Sprite => self.input_group.load_content(&self.stage, root)?,
            MiddlewareKind::Signal => {
                if !self.input_group.is_running() {
                    self.input_group.start_middleware()?;
                }
            }
        }

        info!(view = view.name(), middleware = ?self.input_group.kind(), "加载视图");
        self.content = Some(view);
        Ok(())
    }

    /// 向演员投递输入信号，返回是否有处理器处理
    pub fn emit(&mut self, actor: ActorId, signal: &str) -> Result<bool, ViewError> {
        let handlers = self.stage.deliver_input(actor, signal);
        let Some(content) = self.content.as_mut() else {
            return Ok(false);
        };

        let mut handled = false;
        for handler in handlers {
            let mut ctx = UiContext::new(&mut self.stage, &mut self.input_group);
            handled |= content.on_signal(&mut ctx, actor, handler)?;
        }
        debug!(?actor, signal, handled, "投递信号");
        Ok(handled)
    }

    /// 开关设备的一次激活
    ///
    /// Signal 模式向焦点演员发出激活信号；其他模式视为点击焦点演员，
    /// Sprite 模式下焦点必须在光标的渲染目标之内。
    pub fn activate(&mut self) -> Result<bool, ViewError> {
        let Some(target) = self.stage.key_focus() else {
            return Ok(false);
        };
        let signal = match self.input_group.kind() {
            MiddlewareKind::Signal => self.input_group.action_signal()?.to_string(),
            MiddlewareKind::Sprite => {
                let inside = self
                    .input_group
                    .cursor_target()
                    .is_some_and(|content| self.stage.is_ancestor_or_self(content, target));
                if !inside {
                    return Ok(false);
                }
                CLICKED_SIGNAL.to_string()
            }
            MiddlewareKind::None => CLICKED_SIGNAL.to_string(),
        };
        self.emit(target, &signal)
    }

    /// 把几何信息同时应用到舞台与外层窗口
    pub fn apply_geometry(&mut self, geometry: &Geometry, title: &str) {
        geometry.apply_to_stage(&mut self.stage, title);
        if let Some(wrapper) = self.wrapper.as_mut() {
            wrapper.set_title(title);
            wrapper.move_to(geometry.x, geometry.y);
            wrapper.set_default_size(geometry.width, geometry.height);
            wrapper.set_resizable(geometry.resizable);
            wrapper.set_fullscreen(geometry.fullscreen);
        }
    }

    /// 显示外层窗口与舞台
    pub fn show_all(&mut self) {
        if let Some(wrapper) = self.wrapper.as_mut() {
            wrapper.show_all();
        }
        self.stage.show_all();
    }

    /// 销毁原生表面：先外层窗口，再舞台
    pub fn destroy(&mut self) {
        if let Some(wrapper) = self.wrapper.as_mut() {
            wrapper.destroy();
        }
        self.stage.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.stage.is_destroyed()
    }
}

/// 窗口尺寸策略
///
/// 调试模式占显示器的 70% 且可调整大小，否则铺满显示器并全屏。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub resizable: bool,
    pub fullscreen: bool,
}

impl Geometry {
    /// 配置中覆盖的显示器，没有覆盖时使用内置默认值
    pub fn for_config(config: &AppConfig, debug: bool) -> Self {
        Self::new(config.monitor.unwrap_or_default(), debug)
    }

    pub fn new(monitor: MonitorConfig, debug: bool) -> Self {
        if debug {
            Self {
                x: monitor.x,
                y: monitor.y,
                width: monitor.width * DEBUG_SIZE_FACTOR,
                height: monitor.height * DEBUG_SIZE_FACTOR,
                resizable: true,
                fullscreen: false,
            }
        } else {
            Self {
                x: monitor.x,
                y: monitor.y,
                width: monitor.width,
                height: monitor.height,
                resizable: false,
                fullscreen: true,
            }
        }
    }

    /// 把标题、位置与尺寸应用到舞台
    pub fn apply_to_stage(&self, stage: &mut Stage, title: &str) {
        stage.set_title(title);
        stage.set_position(self.x, self.y);
        stage.set_size(self.width, self.height);
        stage.set_user_resizable(self.resizable);
        stage.set_fullscreen(self.fullscreen);
    }
}

/// 窗口后端
///
/// 每个后端都必须实现全部操作，缺失的实现在编译期就会报错。
pub trait WindowBackend: Sized {
    /// 后端名称
    const NAME: &'static str;

    /// 初始化工具包
    fn init(args: &AppArgs) -> Result<Self, BackendError>;

    /// 创建并显示窗口
    fn create_window(&mut self, args: &AppArgs, descriptor: &Descriptor, config: &AppConfig)
    -> Window;

    /// 后端的主循环
    fn main_loop(&self) -> &MainLoop<Window>;

    /// 运行主循环直到窗口被销毁
    ///
    /// 实现必须通过 [`crate::app::run_main_loop`] 运行，以维护运行标志。
    fn main(&mut self, window: &mut Window, running: &RunningFlag);

    /// 请求退出：销毁窗口，由销毁回调结束主循环
    fn main_quit(&mut self, window: &mut Window);

    fn loop_handle(&self) -> LoopHandle<Window> {
        self.main_loop().handle()
    }

    fn loop_sender(&self) -> LoopSender<Window> {
        self.main_loop().sender()
    }
}
