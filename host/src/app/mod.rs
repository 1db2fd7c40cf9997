//! # App 模块
//!
//! 应用生命周期。
//!
//! ## 启动顺序
//!
//! 1. 初始化窗口后端的工具包
//! 2. 读取描述符，注册共享元素
//! 3. 应用配置：音效开关、皮肤对应的样式表路径、音效文件路径
//! 4. 加载全局样式（失败即终止启动）
//! 5. 由后端创建窗口
//! 6. 启用音效时创建音效播放器
//!
//! 之后 `main` 运行主循环，窗口销毁时循环结束。

pub mod init;
mod running;

pub use running::{RunningFlag, RunningGuard, run_main_loop};

use crate::audio::{AudioError, SoundEffectsPlayer, SoundOutput};
use crate::config::{AppConfig, ConfigError};
use crate::resources::{Dirs, ResourceError};
use crate::style::{StyleError, StyleSheet};
use crate::window::{BackendError, ViewError, Window, WindowBackend, WindowContent};
use pisak_runtime::{Descriptor, ElementBox, LoopHandle, LoopSender};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// 启动参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppArgs {
    /// 原始命令行参数，交给工具包初始化
    pub argv: Vec<String>,
    /// 调试模式：窗口缩小且可调整大小
    pub debug: bool,
}

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// 全局样式无法加载
    #[error("默认样式加载失败: {path}")]
    Style {
        path: PathBuf,
        #[source]
        source: StyleError,
    },

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// PISAK 应用
///
/// 后端通过类型参数选择，例如 `Application<StageBackend>`。
pub struct Application<B: WindowBackend> {
    backend: B,
    window: Window,
    config: AppConfig,
    element_box: ElementBox,
    style_path: PathBuf,
    style: StyleSheet,
    sound_effects: BTreeMap<String, PathBuf>,
    sound_effects_player: Option<SoundEffectsPlayer>,
    running: RunningFlag,
}

impl<B: WindowBackend> Application<B> {
    /// 从资源目录加载配置并启动
    pub fn new(args: AppArgs, descriptor: &Descriptor, dirs: &Dirs) -> Result<Self, AppError> {
        let config = init::load_config(dirs)?;
        Self::with_config(args, descriptor, dirs, config, init::default_sound_output)
    }

    /// 使用已加载的配置与指定的音频输出启动
    pub fn with_config(
        args: AppArgs,
        descriptor: &Descriptor,
        dirs: &Dirs,
        config: AppConfig,
        open_output: impl FnOnce() -> Result<Box<dyn SoundOutput>, AudioError>,
    ) -> Result<Self, AppError> {
        let mut backend = B::init(&args)?;

        let element_box = init::register_elements(descriptor);

        let config = init::apply_descriptor(config, descriptor);
        config.validate()?;
        let style_path = dirs.css_path(&config.skin)?;
        let sound_effects = init::resolve_sound_effects(dirs, &config.sound_effects);

        let style = init::load_style(&style_path)?;

        let window = backend.create_window(&args, descriptor, &config);

        let sound_effects_player = if config.sound_effects_enabled {
            init::create_sound_effects_player(
                sound_effects.clone(),
                config.sound_effects_volume,
                open_output,
            )
        } else {
            None
        };

        info!(
            backend = B::NAME,
            skin = %config.skin,
            sound_effects = sound_effects.len(),
            sound_enabled = config.sound_effects_enabled,
            "应用初始化完成"
        );

        Ok(Self {
            backend,
            window,
            config,
            element_box,
            style_path,
            style,
            sound_effects,
            sound_effects_player,
            running: RunningFlag::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// 共享元素
    pub fn element(&self, name: &str) -> Option<&Value> {
        self.element_box.get(name)
    }

    pub fn element_box(&self) -> &ElementBox {
        &self.element_box
    }

    /// 全局样式表路径
    pub fn style_path(&self) -> &Path {
        &self.style_path
    }

    pub fn style(&self) -> &StyleSheet {
        &self.style
    }

    /// 已解析到文件的音效（事件名 -> 路径）
    pub fn sound_effects(&self) -> &BTreeMap<String, PathBuf> {
        &self.sound_effects
    }

    pub fn sound_effects_player(&self) -> Option<&SoundEffectsPlayer> {
        self.sound_effects_player.as_ref()
    }

    /// 播放音效，未启用音效时什么都不做
    pub fn play_sound_effect(&self, name: &str) {
        if let Some(player) = &self.sound_effects_player {
            player.play(name);
        }
    }

    /// 在窗口中加载视图
    pub fn load_view(&mut self, view: Box<dyn WindowContent>) -> Result<(), AppError> {
        Ok(self.window.load_view(view)?)
    }

    pub fn loop_handle(&self) -> LoopHandle<Window> {
        self.backend.loop_handle()
    }

    /// 设备线程使用的任务发送端
    pub fn loop_sender(&self) -> LoopSender<Window> {
        self.backend.loop_sender()
    }

    /// 运行标志的共享句柄
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    pub fn main_loop_is_running(&self) -> bool {
        self.running.is_running()
    }

    /// 运行主循环，窗口销毁后返回
    pub fn main(&mut self) {
        self.backend.main(&mut self.window, &self.running);
        info!("主循环已结束");
    }

    /// 退出应用：销毁窗口，由销毁回调结束主循环
    pub fn main_quit(&mut self) {
        self.backend.main_quit(&mut self.window);
    }
}
