//! # Resource Error 模块
//!
//! 定义资源目录解析相关的错误类型。

use std::path::PathBuf;
use thiserror::Error;

/// 资源解析错误
#[derive(Error, Debug)]
pub enum ResourceError {
    /// 用户目录与随程序发布的目录中都找不到
    #[error("{kind} 未找到: {home} 或 {res}")]
    NotFound {
        /// 资源类型（css、icon、json 等）
        kind: &'static str,
        /// 用户目录中的候选路径
        home: PathBuf,
        /// 发布目录中的候选路径
        res: PathBuf,
    },

    /// 必需的默认配置缺失
    #[error("res 目录中缺少默认配置: {0}")]
    MissingDefaultConfig(PathBuf),

    /// 目录创建失败
    #[error("创建目录失败: {path} - {message}")]
    CreateDirFailed {
        /// 目录路径
        path: PathBuf,
        /// 错误消息
        message: String,
    },

    /// 读取目录失败
    #[error("读取目录失败: {path} - {message}")]
    ReadDirFailed {
        /// 目录路径
        path: PathBuf,
        /// 错误消息
        message: String,
    },

    /// 无法确定用户主目录
    #[error("无法确定用户主目录（HOME 未设置）")]
    NoHomeDir,
}
