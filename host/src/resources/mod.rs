//! # Resources 模块
//!
//! 资源目录解析：用户目录（`~/.pisak`）优先，其次是随程序发布的 `res` 目录。
//!
//! ## 目录结构
//!
//! ```text
//! ~/.pisak/                 res/
//! ├── configs/              ├── configs/default_config.json
//! │   └── main_config.json  ├── css/<skin>.css
//! ├── css/<skin>.css        ├── icons/<name>.svg
//! ├── icons/<name>.svg      ├── json/<app>/<layout>/<view>.json
//! ├── json/...              └── sounds/<name>
//! ├── logs/
//! └── sounds/<name>
//! ```

mod error;

pub use error::ResourceError;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIGS_DIR: &str = "configs";
const CSS_DIR: &str = "css";
const ICONS_DIR: &str = "icons";
const JSON_DIR: &str = "json";
const SOUNDS_DIR: &str = "sounds";
const LOGS_DIR: &str = "logs";

const DEFAULT_CONFIG_FILE: &str = "default_config.json";
const MAIN_CONFIG_FILE: &str = "main_config.json";
const DEFAULT_LAYOUT: &str = "default";

/// 创建目录（已存在时不做任何事），返回该目录
pub fn ensure_dir(path: impl Into<PathBuf>) -> Result<PathBuf, ResourceError> {
    let path = path.into();
    if !path.is_dir() {
        std::fs::create_dir_all(&path).map_err(|e| ResourceError::CreateDirFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "创建目录");
    }
    Ok(path)
}

/// 音效名规范化：小写，空格和换行替换为下划线
pub fn normalize_sound_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '\n'], "_")
}

/// 资源目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    home: PathBuf,
    res: PathBuf,
}

impl Dirs {
    /// 使用显式的用户目录与发布目录
    pub fn new(home: impl Into<PathBuf>, res: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            res: res.into(),
        }
    }

    /// 用户目录取 `$HOME/.pisak`
    pub fn from_env(res: impl Into<PathBuf>) -> Result<Self, ResourceError> {
        let home = std::env::var_os("HOME").ok_or(ResourceError::NoHomeDir)?;
        Ok(Self::new(PathBuf::from(home).join(".pisak"), res))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn res(&self) -> &Path {
        &self.res
    }

    /// 创建用户目录下的全部子目录
    pub fn ensure_layout(&self) -> Result<(), ResourceError> {
        for sub in [CONFIGS_DIR, CSS_DIR, ICONS_DIR, JSON_DIR, SOUNDS_DIR, LOGS_DIR] {
            ensure_dir(self.home.join(sub))?;
        }
        Ok(())
    }

    /// 用户主配置文件路径（不保证存在）
    pub fn main_config_path(&self) -> PathBuf {
        self.home.join(CONFIGS_DIR).join(MAIN_CONFIG_FILE)
    }

    /// 发布目录中的默认配置路径（不保证存在）
    pub fn default_config_path(&self) -> PathBuf {
        self.res.join(CONFIGS_DIR).join(DEFAULT_CONFIG_FILE)
    }

    /// 先在用户目录的 `home_sub` 下查找，再到发布目录的 `res_sub` 下查找
    pub fn find_path(&self, home_sub: &str, res_sub: &str, file: &str) -> Option<PathBuf> {
        self.candidates(home_sub, res_sub, file)
            .into_iter()
            .find(|path| path.is_file())
    }

    fn candidates(&self, home_sub: &str, res_sub: &str, file: &str) -> [PathBuf; 2] {
        [
            self.home.join(home_sub).join(file),
            self.res.join(res_sub).join(file),
        ]
    }

    fn require(
        &self,
        kind: &'static str,
        home_sub: &str,
        res_sub: &str,
        file: &str,
    ) -> Result<PathBuf, ResourceError> {
        self.find_path(home_sub, res_sub, file).ok_or_else(|| {
            let [home, res] = self.candidates(home_sub, res_sub, file);
            ResourceError::NotFound { kind, home, res }
        })
    }

    /// 通用配置文件列表，从最默认到最定制
    ///
    /// 发布目录中的默认配置必须存在，用户配置可选。
    pub fn general_configs(&self) -> Result<Vec<PathBuf>, ResourceError> {
        let default = self.default_config_path();
        if !default.is_file() {
            return Err(ResourceError::MissingDefaultConfig(default));
        }
        let mut configs = vec![default];
        let user = self.main_config_path();
        if user.is_file() {
            configs.push(user);
        }
        Ok(configs)
    }

    /// 皮肤对应的全局样式表
    pub fn css_path(&self, skin: &str) -> Result<PathBuf, ResourceError> {
        self.require("css", CSS_DIR, CSS_DIR, &format!("{skin}.css"))
    }

    /// 图标文件（SVG）
    pub fn icon_path(&self, name: &str) -> Result<PathBuf, ResourceError> {
        self.require("icon", ICONS_DIR, ICONS_DIR, &format!("{name}.svg"))
    }

    /// 音效文件
    ///
    /// 找不到时记录警告并返回 `None`，缺失的音效不应阻止启动。
    pub fn sound_path(&self, name: &str) -> Option<PathBuf> {
        let file = normalize_sound_name(name);
        let found = self.find_path(SOUNDS_DIR, SOUNDS_DIR, &file);
        if found.is_none() {
            let [home, res] = self.candidates(SOUNDS_DIR, SOUNDS_DIR, &file);
            warn!(home = %home.display(), res = %res.display(), "音效文件不存在");
        }
        found
    }

    /// 应用视图的布局描述文件
    ///
    /// 查找顺序：用户目录 → 发布目录的指定布局 → 发布目录的默认布局。
    pub fn json_view_path(&self, app: &str, layout: &str, view: &str) -> Result<PathBuf, ResourceError> {
        let file = format!("{view}.json");
        let home = self.home.join(JSON_DIR).join(app).join(layout).join(&file);
        let res = self.res.join(JSON_DIR).join(app).join(layout).join(&file);
        let mut candidates = vec![home.clone(), res];
        if layout != DEFAULT_LAYOUT {
            candidates.push(
                self.res
                    .join(JSON_DIR)
                    .join(app)
                    .join(DEFAULT_LAYOUT)
                    .join(&file),
            );
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(ResourceError::NotFound {
                kind: "json",
                home,
                res: self
                    .res
                    .join(JSON_DIR)
                    .join(app)
                    .join(DEFAULT_LAYOUT)
                    .join(&file),
            }),
        }
    }
}
