//! # Fullscreen 模块
//!
//! 影片播放器的全屏组件。
//!
//! ## 状态机
//!
//! ```text
//! Windowed ── toggle ──► Fullscreen(TransitionRecord)
//!    ▲                         │
//!    └──────── toggle ─────────┘
//! ```
//!
//! 进入全屏时把播放引擎从原父节点摘下挂到舞台根上，并按当前中间件模式挂起输入：
//! - `None` / `Sprite`：在最上层插入全舞台透明遮罩（退出按钮在遮罩里），
//!   遮罩是输入捕获层，其下的演员收不到设备输入；
//!   Sprite 模式还要把虚拟光标重定向到遮罩上
//! - `Signal`：停止中间件，引擎变为可响应并获得键盘焦点，激活信号直接触发退出
//!
//! 退出全屏是严格的逆操作：原父节点、原下标、扩展属性、焦点、可响应状态
//! 以及中间件的内容绑定都恢复到进入前的样子。
//!
//! 切换是同步的且需要 `&mut self`，因此不存在嵌套或并发切换。
//! 退出失败时组件保持全屏状态，可以再次切换重试。

use crate::input::{ContentSnapshot, InputError, InputGroup, MiddlewareKind};
use crate::scene::{ActorId, HandlerId, SceneError, Stage};
use thiserror::Error;
use tracing::{debug, info};

/// 退出按钮的点击信号
pub const CLICKED_SIGNAL: &str = "clicked";

/// 组件操作所需的上下文
///
/// 由窗口显式传入，组件不持有全局应用句柄。
pub struct UiContext<'a> {
    pub stage: &'a mut Stage,
    pub input: &'a mut InputGroup,
}

impl<'a> UiContext<'a> {
    pub fn new(stage: &'a mut Stage, input: &'a mut InputGroup) -> Self {
        Self { stage, input }
    }
}

/// 全屏组件错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FullscreenError {
    #[error("未设置播放引擎")]
    NoEngine,

    #[error("播放引擎 {0:?} 不在场景树中，无法进入全屏")]
    EngineDetached(ActorId),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// 输入挂起方式
#[derive(Debug, Clone)]
enum Suspension {
    /// 透明遮罩；Sprite 模式附带进入前的内容绑定
    Cover { sprite: Option<ContentSnapshot> },
    /// 信号驱动
    Signal {
        handler: HandlerId,
        was_reactive: bool,
        was_running: bool,
    },
}

/// 进入全屏时记录的状态，退出时据此恢复
#[derive(Debug, Clone)]
struct TransitionRecord {
    stage_root: ActorId,
    parent: ActorId,
    index: usize,
    expand: (bool, bool),
    /// 摘下引擎之前的键盘焦点
    focus: Option<ActorId>,
    suspension: Suspension,
}

#[derive(Debug, Clone)]
enum FullscreenState {
    Windowed,
    Fullscreen(TransitionRecord),
}

/// 影片全屏组件
#[derive(Debug, Clone)]
pub struct MovieFullscreen {
    engine: Option<ActorId>,
    exit_button: Option<ActorId>,
    exit_button_handler: Option<HandlerId>,
    menu: Option<ActorId>,
    cover: ActorId,
    state: FullscreenState,
}

impl MovieFullscreen {
    pub fn new(stage: &mut Stage) -> Self {
        let cover = stage.create_capture_layer("fullscreen-cover");
        Self {
            engine: None,
            exit_button: None,
            exit_button_handler: None,
            menu: None,
            cover,
            state: FullscreenState::Windowed,
        }
    }

    /// 播放影片的引擎
    pub fn engine(&self) -> Option<ActorId> {
        self.engine
    }

    pub fn set_engine(&mut self, engine: ActorId) {
        self.engine = Some(engine);
    }

    /// 退出全屏的按钮
    pub fn exit_button(&self) -> Option<ActorId> {
        self.exit_button
    }

    /// 设置退出按钮：放进遮罩并把点击连接到切换
    pub fn set_exit_button(&mut self, stage: &mut Stage, button: ActorId) -> Result<(), SceneError> {
        if let Some(old) = self.exit_button.take() {
            if let Some(handler) = self.exit_button_handler.take() {
                stage.disconnect(old, handler)?;
            }
            stage.remove_child(self.cover, old)?;
        }
        stage.add_child(self.cover, button)?;
        stage.set_reactive(button, true)?;
        self.exit_button_handler = Some(stage.connect(button, CLICKED_SIGNAL)?);
        self.exit_button = Some(button);
        Ok(())
    }

    /// 播放器的按钮菜单
    pub fn menu(&self) -> Option<ActorId> {
        self.menu
    }

    pub fn set_menu(&mut self, menu: ActorId) {
        self.menu = Some(menu);
    }

    /// 全屏时覆盖舞台的透明遮罩
    pub fn cover(&self) -> ActorId {
        self.cover
    }

    pub fn is_fullscreen(&self) -> bool {
        matches!(self.state, FullscreenState::Fullscreen(_))
    }

    /// 进入或退出全屏
    pub fn toggle(&mut self, ctx: &mut UiContext<'_>) -> Result<(), FullscreenError> {
        match &self.state {
            FullscreenState::Windowed => {
                let record = self.enter(ctx)?;
                self.state = FullscreenState::Fullscreen(record);
                info!("进入全屏");
            }
            FullscreenState::Fullscreen(record) => {
                let record = record.clone();
                self.exit(ctx, &record)?;
                self.state = FullscreenState::Windowed;
                info!("退出全屏");
            }
        }
        Ok(())
    }

    /// 处理信号，处理器属于本组件时切换全屏
    ///
    /// 返回是否已处理。
    pub fn handle_signal(
        &mut self,
        ctx: &mut UiContext<'_>,
        handler: HandlerId,
    ) -> Result<bool, FullscreenError> {
        let owned = match &self.state {
            FullscreenState::Windowed => false,
            FullscreenState::Fullscreen(record) => match record.suspension {
                Suspension::Cover { .. } => self.exit_button_handler == Some(handler),
                Suspension::Signal { handler: h, .. } => h == handler,
            },
        };
        if owned {
            self.toggle(ctx)?;
        }
        Ok(owned)
    }

    fn enter(&mut self, ctx: &mut UiContext<'_>) -> Result<TransitionRecord, FullscreenError> {
        let engine = self.engine.ok_or(FullscreenError::NoEngine)?;
        let stage_root = ctx.stage.root();
        let parent = ctx
            .stage
            .parent(engine)
            .ok_or(FullscreenError::EngineDetached(engine))?;
        let index = ctx
            .stage
            .index_of(engine)
            .ok_or(FullscreenError::EngineDetached(engine))?;
        let mode = ctx.input.kind();
        let action_signal = match mode {
            MiddlewareKind::Signal => Some(ctx.input.action_signal()?.to_string()),
            _ => None,
        };
        let expand = ctx.stage.expand(engine);
        // 摘下引擎会清除其子树内的焦点，必须先记录
        let focus = ctx.stage.key_focus();

        debug!(?engine, ?parent, index, ?mode, ?focus, "记录全屏前状态");
        ctx.stage.remove_child(parent, engine)?;
        ctx.stage.add_child(stage_root, engine)?;
        ctx.stage.set_expand(engine, true, true)?;

        let suspension = match action_signal {
            None => {
                let (width, height) = ctx.stage.size();
                ctx.stage.set_actor_size(self.cover, width, height)?;
                ctx.stage.add_child(stage_root, self.cover)?;
                let sprite = if mode == MiddlewareKind::Sprite {
                    let snapshot = ctx.input.snapshot();
                    if snapshot.running {
                        ctx.input.stop_middleware()?;
                    }
                    ctx.input.load_content(&*ctx.stage, self.cover)?;
                    Some(snapshot)
                } else {
                    None
                };
                Suspension::Cover { sprite }
            }
            Some(signal) => {
                let was_running = ctx.input.is_running();
                if was_running {
                    ctx.input.stop_middleware()?;
                }
                let was_reactive = ctx.stage.is_reactive(engine);
                ctx.stage.set_reactive(engine, true)?;
                ctx.stage.set_key_focus(Some(engine))?;
                let handler = ctx.stage.connect(engine, signal)?;
                Suspension::Signal {
                    handler,
                    was_reactive,
                    was_running,
                }
            }
        };

        Ok(TransitionRecord {
            stage_root,
            parent,
            index,
            expand,
            focus,
            suspension,
        })
    }

    /// 按记录恢复全屏前的状态
    ///
    /// 已经恢复的步骤会被跳过，因此失败后可以重试。
    fn exit(
        &mut self,
        ctx: &mut UiContext<'_>,
        record: &TransitionRecord,
    ) -> Result<(), FullscreenError> {
        let engine = self.engine.ok_or(FullscreenError::NoEngine)?;

        if ctx.stage.parent(engine) != Some(record.parent) {
            if ctx.stage.is_ancestor_or_self(engine, record.parent) {
                return Err(SceneError::Cycle(engine).into());
            }
            if let Some(current) = ctx.stage.parent(engine) {
                ctx.stage.remove_child(current, engine)?;
            }
            ctx.stage
                .insert_child_at_index(record.parent, engine, record.index)?;
        }
        ctx.stage
            .set_expand(engine, record.expand.0, record.expand.1)?;

        match &record.suspension {
            Suspension::Cover { sprite } => {
                if ctx.stage.parent(self.cover) == Some(record.stage_root) {
                    ctx.stage.remove_child(record.stage_root, self.cover)?;
                }
                if let Some(snapshot) = sprite {
                    if ctx.input.is_running() {
                        ctx.input.stop_middleware()?;
                    }
                    ctx.input.restore(*snapshot)?;
                }
            }
            Suspension::Signal {
                handler,
                was_reactive,
                was_running,
            } => {
                ctx.stage.set_reactive(engine, *was_reactive)?;
                match ctx.stage.disconnect(engine, *handler) {
                    Ok(()) | Err(SceneError::UnknownHandler { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                if *was_running && !ctx.input.is_running() {
                    ctx.input.start_middleware()?;
                }
            }
        }

        let focus = record.focus.filter(|f| ctx.stage.contains(*f));
        ctx.stage.set_key_focus(focus)?;
        debug!(?engine, parent = ?record.parent, index = record.index, ?focus, "已恢复全屏前状态");
        Ok(())
    }
}
