//! # Audio 模块
//!
//! 界面音效播放，使用 rodio 库实现。
//!
//! ## 功能特性
//!
//! - 按事件名播放音效（扫描、选择等）
//! - 多个音效可同时播放，互不打断
//! - 输出设备抽象为 `SoundOutput`，测试与无声卡环境可以替换

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// 音频错误
#[derive(Error, Debug)]
pub enum AudioError {
    /// 无法打开音频输出设备
    #[error("无法初始化音频输出: {0}")]
    Output(String),

    /// 无法打开音频文件
    #[error("无法打开音频文件: {path} - {message}")]
    Open { path: PathBuf, message: String },

    /// 无法解码音频文件
    #[error("无法解码音频文件: {path} - {message}")]
    Decode { path: PathBuf, message: String },
}

/// 音频输出
pub trait SoundOutput {
    /// 播放一个音频文件，不等待播放结束
    fn play_file(&self, path: &Path, volume: f32) -> Result<(), AudioError>;
}

/// 默认音频设备输出
pub struct RodioOutput {
    /// 音频输出流（必须保持存活）
    stream: OutputStream,
}

impl RodioOutput {
    /// 打开系统默认输出设备
    pub fn open_default() -> Result<Self, AudioError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AudioError::Output(e.to_string()))?;
        Ok(Self { stream })
    }
}

impl SoundOutput for RodioOutput {
    fn play_file(&self, path: &Path, volume: f32) -> Result<(), AudioError> {
        let file = File::open(path).map_err(|e| AudioError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(volume);
        sink.append(source);
        // 分离后播放完自动释放
        sink.detach();
        Ok(())
    }
}

/// 音效播放器
///
/// 持有事件名到音效文件的映射，按名字播放。
pub struct SoundEffectsPlayer {
    effects: BTreeMap<String, PathBuf>,
    volume: f32,
    output: Box<dyn SoundOutput>,
}

impl std::fmt::Debug for SoundEffectsPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEffectsPlayer")
            .field("effects", &self.effects)
            .field("volume", &self.volume)
            .finish()
    }
}

impl SoundEffectsPlayer {
    pub fn with_output(effects: BTreeMap<String, PathBuf>, output: Box<dyn SoundOutput>) -> Self {
        debug!(count = effects.len(), "音效播放器就绪");
        Self {
            effects,
            volume: 1.0,
            output,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// 设置音量 (0.0 - 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    /// 播放音效
    ///
    /// 未注册的名字与播放失败都只记录日志。
    pub fn play(&self, name: &str) {
        let Some(path) = self.effects.get(name) else {
            debug!(name, "未注册的音效");
            return;
        };
        if let Err(e) = self.output.play_file(path, self.volume) {
            warn!(name, error = %e, "播放音效失败");
        }
    }
}
