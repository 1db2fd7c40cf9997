//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 用户配置文件 (`~/.pisak/configs/main_config.json`，可选)
//! 3. 随程序发布的默认配置 (`res/configs/default_config.json`，必需)
//! 4. 内置默认值（最低）
//!
//! 各层按 JSON 对象逐键合并，后一层只覆盖它写出的键。

use pisak_runtime::Middleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 是否启用音效
    #[serde(default)]
    pub sound_effects_enabled: bool,

    /// 音效音量 (0.0 - 1.0)
    #[serde(default = "default_sound_effects_volume")]
    pub sound_effects_volume: f32,

    /// 皮肤名，对应 `css/<skin>.css`
    #[serde(default = "default_skin")]
    pub skin: String,

    /// 音效映射（事件名 -> 音效名）
    #[serde(default)]
    pub sound_effects: BTreeMap<String, String>,

    /// 输入中间件
    #[serde(default)]
    pub input: Middleware,

    /// 显示器几何覆盖
    ///
    /// 未设置时桌面后端使用探测到的主显示器，无头后端使用内置默认值。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,
}

/// 显示器配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_monitor_width")]
    pub width: f32,
    #[serde(default = "default_monitor_height")]
    pub height: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: default_monitor_width(),
            height: default_monitor_height(),
        }
    }
}

// 默认值函数
fn default_sound_effects_volume() -> f32 {
    1.0
}

fn default_skin() -> String {
    "default".to_string()
}

fn default_title() -> String {
    "PISAK".to_string()
}

fn default_monitor_width() -> f32 {
    1920.0
}

fn default_monitor_height() -> f32 {
    1080.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sound_effects_enabled: false,
            sound_effects_volume: default_sound_effects_volume(),
            skin: default_skin(),
            sound_effects: BTreeMap::new(),
            input: Middleware::default(),
            monitor: None,
            title: default_title(),
        }
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败: {path} - {message}")]
    Io { path: PathBuf, message: String },

    /// 配置文件不是合法 JSON
    #[error("配置文件解析失败: {path} - {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 配置文件顶层不是 JSON 对象
    #[error("配置文件顶层必须是对象: {0}")]
    NotAnObject(PathBuf),

    /// 合并后的配置字段类型不正确
    #[error("配置字段无效: {0}")]
    InvalidField(#[source] serde_json::Error),

    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

impl AppConfig {
    /// 按顺序叠加多个配置文件
    ///
    /// 列表中的每个文件都必须存在且可解析，可选文件由调用方过滤。
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = serde_json::to_value(Self::default()).map_err(ConfigError::Serialization)?;

        for path in paths {
            let layer = read_layer(path)?;
            merge_json(&mut merged, layer);
            debug!(path = %path.display(), "叠加配置文件");
        }

        let config: Self = serde_json::from_value(merged).map_err(ConfigError::InvalidField)?;
        info!(layers = paths.len(), skin = %config.skin, "配置加载完成");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialization)?;
        fs::write(path, json).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("皮肤名不能为空".to_string()));
        }

        if let Some(monitor) = self.monitor
            && (monitor.width <= 0.0 || monitor.height <= 0.0)
        {
            return Err(ConfigError::ValidationFailed(format!(
                "显示器尺寸必须为正数: {}x{}",
                monitor.width, monitor.height
            )));
        }

        if !(0.0..=1.0).contains(&self.sound_effects_volume) {
            return Err(ConfigError::ValidationFailed(
                "音效音量必须在 0.0 - 1.0 之间".to_string(),
            ));
        }

        Ok(())
    }
}

fn read_layer(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject(path.to_path_buf()));
    }
    Ok(value)
}

/// 把 `overlay` 逐键合并进 `base`
///
/// 两边都是对象时递归合并，其余情况直接覆盖。
/// `input` 这类带标签的枚举也是对象，但必须整体替换，否则旧变体的字段会残留。
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) if key != "input" => merge_json(slot, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
