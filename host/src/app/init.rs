//! Application 初始化拆分
//!
//! 把 `Application::new` 中"描述符/配置/样式/音效"等初始化逻辑按职责拆开，
//! 让 `app/mod.rs` 只保留启动顺序。

use super::AppError;
use crate::audio::{AudioError, SoundEffectsPlayer, SoundOutput};
use crate::config::AppConfig;
use crate::resources::Dirs;
use crate::style::StyleSheet;
use pisak_runtime::{Descriptor, ElementBox};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// 加载分层配置
pub fn load_config(dirs: &Dirs) -> Result<AppConfig, AppError> {
    let layers = dirs.general_configs()?;
    Ok(AppConfig::load_layered(&layers)?)
}

/// 读取描述符中的共享元素
pub fn register_elements(descriptor: &Descriptor) -> ElementBox {
    let mut element_box = ElementBox::new();
    if let Some(elements) = &descriptor.elements {
        element_box.register(elements);
        debug!(names = ?element_box.names(), "注册应用元素");
    }
    element_box
}

/// 描述符中的皮肤与音效覆盖配置
pub fn apply_descriptor(mut config: AppConfig, descriptor: &Descriptor) -> AppConfig {
    if let Some(style) = &descriptor.style {
        config.skin = style.clone();
    }
    for (event, sound) in &descriptor.sound_effects {
        config.sound_effects.insert(event.clone(), sound.clone());
    }
    config
}

/// 解析音效文件路径，找不到的条目直接丢弃
pub fn resolve_sound_effects(
    dirs: &Dirs,
    sound_effects: &BTreeMap<String, String>,
) -> BTreeMap<String, PathBuf> {
    sound_effects
        .iter()
        .filter_map(|(event, sound)| dirs.sound_path(sound).map(|path| (event.clone(), path)))
        .collect()
}

/// 加载全局样式，失败对应用是致命的
pub fn load_style(path: &Path) -> Result<StyleSheet, AppError> {
    StyleSheet::load(path).map_err(|source| {
        error!(path = %path.display(), error = %source, "默认样式加载失败");
        AppError::Style {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// 系统默认音频输出
pub fn default_sound_output() -> Result<Box<dyn SoundOutput>, AudioError> {
    Ok(Box::new(crate::audio::RodioOutput::open_default()?))
}

/// 创建音效播放器，输出设备不可用时返回 `None`
pub fn create_sound_effects_player(
    effects: BTreeMap<String, PathBuf>,
    volume: f32,
    open_output: impl FnOnce() -> Result<Box<dyn SoundOutput>, AudioError>,
) -> Option<SoundEffectsPlayer> {
    match open_output() {
        Ok(output) => {
            let mut player = SoundEffectsPlayer::with_output(effects, output);
            player.set_volume(volume);
            info!("音效系统初始化成功");
            Some(player)
        }
        Err(e) => {
            warn!(error = %e, "音效系统初始化失败");
            None
        }
    }
}
