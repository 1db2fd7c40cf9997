//! # PISAK Runtime
//!
//! 辅助技术应用套件的核心运行时库，不依赖任何窗口系统或音频设备。
//!
//! ## 架构概述
//!
//! ```text
//! Host (窗口后端 / 生命周期)
//!   │
//!   │── UiContext { &mut Stage, &mut InputGroup } ──► 组件（MovieFullscreen 等）
//!   │
//!   └── MainLoop<C>::run(&mut C) ◄── LoopSender（设备线程）
//! ```
//!
//! 组件通过显式传入的 `UiContext` 访问舞台和输入中间件，
//! 不存在全局的应用句柄，因此每个部分都可以单独测试。
//!
//! ## 模块结构
//!
//! - [`scene`]：无头场景图（舞台、演员、信号、焦点）
//! - [`input`]：输入中间件协调器
//! - [`fullscreen`]：影片全屏组件
//! - [`movie`]：影片库平铺数据源
//! - [`main_loop`]：协作式主循环
//! - [`descriptor`]：应用描述符与元素盒

pub mod descriptor;
pub mod fullscreen;
pub mod input;
pub mod main_loop;
pub mod movie;
pub mod scene;

pub use descriptor::{Descriptor, ElementBox};
pub use fullscreen::{CLICKED_SIGNAL, FullscreenError, MovieFullscreen, UiContext};
pub use input::{
    ContentSnapshot, DEFAULT_ACTION_SIGNAL, InputError, InputGroup, Middleware, MiddlewareKind,
};
pub use main_loop::{Continue, LoopHandle, LoopSender, MainLoop, QuitHandle, SourceId};
pub use movie::{FlatSource, MovieItem, PHOTO_TILE_STYLE, PhotoTile, PreviewPolling};
pub use scene::{ActorId, HandlerId, SceneError, Stage, StageAccess};
