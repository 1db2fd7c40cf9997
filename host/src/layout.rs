//! # Layout 模块
//!
//! 视图布局描述：`json/<app>/<layout>/<view>.json`，按演员名给出样式类与文字。
//!
//! ```json
//! {
//!     "fullscreen-button": {"style_class": "menu-button", "label": "Pełny ekran"},
//!     "movie-library": {"style_class": "tiles"}
//! }
//! ```

use pisak_runtime::{SceneError, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// 布局文件错误
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("读取布局文件失败: {path} - {message}")]
    Io { path: PathBuf, message: String },

    #[error("布局文件解析失败: {path} - {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 单个演员的布局属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// 视图布局（演员名 -> 属性）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewLayout {
    actors: BTreeMap<String, ActorLayout>,
}

impl ViewLayout {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LayoutError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let layout: Self = serde_json::from_str(&text).map_err(|source| LayoutError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), actors = layout.actors.len(), "读取视图布局");
        Ok(layout)
    }

    pub fn get(&self, name: &str) -> Option<&ActorLayout> {
        self.actors.get(name)
    }

    /// 应用到舞台上的同名演员，返回应用的演员数
    ///
    /// 舞台上不存在的演员名只记录警告。
    pub fn apply(&self, stage: &mut Stage) -> Result<usize, SceneError> {
        let mut applied = 0;
        for (name, layout) in &self.actors {
            let Some(actor) = stage.find(name) else {
                warn!(name = %name, "布局中的演员不存在");
                continue;
            };
            if let Some(class) = &layout.style_class {
                stage.set_style_class(actor, class.as_str())?;
            }
            if let Some(label) = &layout.label {
                stage.set_label(actor, label.as_str())?;
            }
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_to_named_actors() {
        let mut stage = Stage::new();
        let button = stage.create_actor("fullscreen-button");
        let library = stage.create_actor("movie-library");
        let layout: ViewLayout = serde_json::from_str(
            r#"{
                "fullscreen-button": {"style_class": "menu-button", "label": "Pełny ekran"},
                "movie-library": {"style_class": "tiles"},
                "absent": {"label": "x"}
            }"#,
        )
        .unwrap();

        assert_eq!(layout.apply(&mut stage).unwrap(), 2);
        assert_eq!(stage.style_class(button), Some("menu-button"));
        assert_eq!(stage.label(button), Some("Pełny ekran"));
        assert_eq!(stage.style_class(library), Some("tiles"));
        assert_eq!(stage.label(library), None);
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        std::fs::write(&path, r#"{"fullscreen-button": {"label": 3}}"#).unwrap();

        assert!(matches!(
            ViewLayout::load(&path),
            Err(LayoutError::Parse { .. })
        ));
        assert!(matches!(
            ViewLayout::load(dir.path().join("absent.json")),
            Err(LayoutError::Io { .. })
        ));
    }

    #[test]
    fn test_found_through_view_path() {
        use crate::resources::Dirs;

        let dir = tempfile::tempdir().unwrap();
        let dirs = Dirs::new(dir.path().join("home"), dir.path().join("res"));
        let path = dir.path().join("res/json/movie/default/player.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"movie-engine": {"style_class": "engine"}}"#).unwrap();

        // 指定的布局不存在时回退到默认布局
        let found = dirs.json_view_path("movie", "large", "player").unwrap();
        let layout = ViewLayout::load(found).unwrap();
        assert_eq!(
            layout.get("movie-engine").and_then(|a| a.style_class.as_deref()),
            Some("engine")
        );
    }
}
