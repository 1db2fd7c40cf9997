//! # PISAK Host
//!
//! 宿主层：把 `pisak-runtime` 的纯逻辑接到配置、资源目录、样式、音效与窗口后端上。
//!
//! ## 模块结构
//!
//! - [`app`]：应用生命周期（启动顺序、主循环运行标志）
//! - [`window`]：窗口与后端（舞台后端、嵌入式后端、winit 桌面后端）
//! - [`config`]：分层 JSON 配置
//! - [`resources`]：用户目录与发布目录的资源解析
//! - [`style`]：全局样式表
//! - [`audio`]：音效播放
//! - [`movie`]：影片播放器视图
//! - [`input`]：开关设备输入
//! - [`layout`]：视图布局描述
//! - [`logging`]：日志初始化

pub mod app;
pub mod audio;
pub mod config;
pub mod input;
pub mod layout;
pub mod logging;
pub mod movie;
pub mod resources;
pub mod style;
pub mod window;

pub use app::{AppArgs, AppError, Application, RunningFlag};
pub use audio::{AudioError, SoundEffectsPlayer, SoundOutput};
pub use config::{AppConfig, ConfigError, MonitorConfig};
pub use layout::{LayoutError, ViewLayout};
pub use movie::{MoviePlayerView, scan_library};
pub use resources::{Dirs, ResourceError};
pub use style::{StyleError, StyleSheet};
pub use window::{
    BackendError, DesktopBackend, EmbeddedBackend, Geometry, NativeWindow, StageBackend, ViewError,
    Window, WindowBackend, WindowContent,
};
