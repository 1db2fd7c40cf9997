//! # Movie 模块
//!
//! 影片播放器视图：影片库磁贴 + 播放区（菜单与播放引擎）+ 全屏组件。
//!
//! ```text
//! movie-player
//! ├── movie-library      磁贴
//! └── player-box
//!     ├── player-menu
//!     │   └── fullscreen-button
//!     └── movie-engine
//! ```
//!
//! 全屏时的退出按钮 `fullscreen-exit` 放在全屏组件的遮罩里，
//! 图标与文字由 [`MoviePlayerView::apply_theme`] 按资源目录和样式表设置。

use crate::resources::{Dirs, ResourceError};
use crate::style::StyleSheet;
use crate::window::{ViewError, Window, WindowContent};
use pisak_runtime::{
    ActorId, CLICKED_SIGNAL, FlatSource, HandlerId, LoopHandle, MovieFullscreen, MovieItem,
    PhotoTile, Stage, UiContext,
};
use std::path::Path;
use tracing::{debug, info};

/// 识别为影片的扩展名
const MOVIE_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "webm", "ogv", "mov"];

/// 封面所在的子目录，封面文件名为 `<影片文件名去扩展名>.png`
const COVERS_DIR: &str = "covers";

pub const FULLSCREEN_BUTTON: &str = "fullscreen-button";
pub const FULLSCREEN_EXIT: &str = "fullscreen-exit";
pub const MOVIE_ENGINE: &str = "movie-engine";

/// 退出按钮的样式类
pub const FULLSCREEN_EXIT_CLASS: &str = "fullscreen-exit";

const EXIT_ICON: &str = "exit";

/// 扫描影片目录（不递归）
///
/// 条目 ID 按文件名排序后从 1 开始编号；封面可能尚未生成。
pub fn scan_library(dir: &Path) -> Result<Vec<MovieItem>, ResourceError> {
    let read_failed = |e: std::io::Error| ResourceError::ReadDirFailed {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_failed)? {
        let path = entry.map_err(read_failed)?.path();
        let is_movie = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MOVIE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_movie {
            paths.push(path);
        }
    }
    paths.sort();

    let items: Vec<MovieItem> = paths
        .into_iter()
        .zip(1u64..)
        .map(|(path, id)| {
            let cover = path.file_stem().map(|stem| {
                dir.join(COVERS_DIR)
                    .join(format!("{}.png", stem.to_string_lossy()))
            });
            MovieItem { id, path, cover }
        })
        .collect();
    info!(dir = %dir.display(), count = items.len(), "扫描影片库");
    Ok(items)
}

/// 影片播放器视图
#[derive(Debug)]
pub struct MoviePlayerView {
    root: ActorId,
    library: ActorId,
    engine: ActorId,
    fullscreen_button: ActorId,
    fullscreen_handler: HandlerId,
    fullscreen: MovieFullscreen,
    tiles: Vec<PhotoTile>,
    items: Vec<MovieItem>,
    current: Option<u64>,
}

impl MoviePlayerView {
    pub fn new(
        stage: &mut Stage,
        main_loop: &LoopHandle<Window>,
        source: &FlatSource,
    ) -> Result<Self, ViewError> {
        let root = stage.create_actor("movie-player");
        let library = stage.create_actor("movie-library");
        let player_box = stage.create_actor("player-box");
        let menu = stage.create_actor("player-menu");
        let fullscreen_button = stage.create_actor(FULLSCREEN_BUTTON);
        let engine = stage.create_actor(MOVIE_ENGINE);

        stage.add_child(root, library)?;
        stage.add_child(root, player_box)?;
        stage.add_child(player_box, menu)?;
        stage.add_child(menu, fullscreen_button)?;
        stage.add_child(player_box, engine)?;

        stage.set_reactive(fullscreen_button, true)?;
        let fullscreen_handler = stage.connect(fullscreen_button, CLICKED_SIGNAL)?;

        let tiles = source.produce_tiles(stage, main_loop)?;
        for tile in &tiles {
            stage.add_child(library, tile.actor)?;
        }

        let mut fullscreen = MovieFullscreen::new(stage);
        fullscreen.set_engine(engine);
        fullscreen.set_menu(menu);
        let exit = stage.create_actor(FULLSCREEN_EXIT);
        stage.set_label(exit, "×")?;
        stage.set_style_class(exit, FULLSCREEN_EXIT_CLASS)?;
        fullscreen.set_exit_button(stage, exit)?;

        debug!(tiles = tiles.len(), "影片播放器视图构建完成");
        Ok(Self {
            root,
            library,
            engine,
            fullscreen_button,
            fullscreen_handler,
            fullscreen,
            tiles,
            items: source.items().to_vec(),
            current: None,
        })
    }

    pub fn library(&self) -> ActorId {
        self.library
    }

    pub fn engine(&self) -> ActorId {
        self.engine
    }

    pub fn fullscreen_button(&self) -> ActorId {
        self.fullscreen_button
    }

    pub fn fullscreen(&self) -> &MovieFullscreen {
        &self.fullscreen
    }

    pub fn tiles(&self) -> &[PhotoTile] {
        &self.tiles
    }

    /// 当前选中的影片 ID
    pub fn current(&self) -> Option<u64> {
        self.current
    }

    /// 设置退出按钮的图标与文字
    ///
    /// 图标缺失时保留文字；样式表的 `content` 属性覆盖文字。
    pub fn apply_theme(
        &self,
        stage: &mut Stage,
        dirs: &Dirs,
        style: &StyleSheet,
    ) -> Result<(), ViewError> {
        let Some(exit) = self.fullscreen.exit_button() else {
            return Ok(());
        };
        match dirs.icon_path(EXIT_ICON) {
            Ok(icon) => stage.set_image(exit, icon)?,
            Err(e) => debug!(error = %e, "退出按钮没有图标"),
        }
        let selector = format!(".{FULLSCREEN_EXIT_CLASS}");
        if let Some(content) = style.lookup(&selector, "content") {
            stage.set_label(exit, content.trim_matches('"'))?;
        }
        Ok(())
    }

    fn select(&mut self, stage: &mut Stage, movie_id: u64) -> Result<(), ViewError> {
        let Some(item) = self.items.iter().find(|item| item.id == movie_id) else {
            return Ok(());
        };
        let title = item
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        stage.set_label(self.engine, title.as_str())?;
        self.current = Some(movie_id);
        info!(movie_id, title = %title, "选中影片");
        Ok(())
    }
}

impl WindowContent for MoviePlayerView {
    fn name(&self) -> &str {
        "movie"
    }

    fn root(&self) -> ActorId {
        self.root
    }

    fn on_signal(
        &mut self,
        ctx: &mut UiContext<'_>,
        _actor: ActorId,
        handler: HandlerId,
    ) -> Result<bool, ViewError> {
        if self.fullscreen.handle_signal(ctx, handler)? {
            return Ok(true);
        }
        if handler == self.fullscreen_handler {
            self.fullscreen.toggle(ctx)?;
            return Ok(true);
        }
        let tile = self.tiles.iter().find(|tile| tile.handler == handler).copied();
        match tile {
            Some(tile) => {
                self.select(ctx.stage, tile.movie_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pisak_runtime::{MainLoop, Middleware};
    use std::fs;
    use std::path::PathBuf;

    fn items() -> Vec<MovieItem> {
        vec![
            MovieItem {
                id: 1,
                path: PathBuf::from("/movies/b.mp4"),
                cover: None,
            },
            MovieItem {
                id: 2,
                path: PathBuf::from("/movies/a.mkv"),
                cover: None,
            },
        ]
    }

    fn window_with_view(middleware: Middleware) -> (MainLoop<Window>, Window, ActorId, Vec<PhotoTile>) {
        let main_loop: MainLoop<Window> = MainLoop::new();
        let mut window = Window::new(Stage::new(), middleware);
        window.stage.set_size(1280.0, 720.0);
        let view = MoviePlayerView::new(
            &mut window.stage,
            &main_loop.handle(),
            &FlatSource::new(items()),
        )
        .unwrap();
        let button = view.fullscreen_button();
        let tiles = view.tiles().to_vec();
        window.load_view(Box::new(view)).unwrap();
        (main_loop, window, button, tiles)
    }

    #[test]
    fn test_scan_library() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Zulu.MP4"), b"").unwrap();
        fs::write(dir.path().join("alpha.mkv"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("covers")).unwrap();

        let items = scan_library(dir.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, dir.path().join("Zulu.MP4"));
        assert_eq!(items[0].id, 1);
        assert_eq!(
            items[1].cover.as_deref(),
            Some(dir.path().join("covers/alpha.png").as_path())
        );
    }

    #[test]
    fn test_scan_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_library(&dir.path().join("absent"));
        assert!(matches!(result, Err(ResourceError::ReadDirFailed { .. })));
    }

    #[test]
    fn test_tile_click_selects_movie() {
        let (_loop, mut window, _button, tiles) = window_with_view(Middleware::None);
        // 磁贴按文件名排序，a.mkv 在前
        assert_eq!(tiles[0].movie_id, 2);

        assert!(window.emit(tiles[0].actor, CLICKED_SIGNAL).unwrap());
        let engine = window.stage.find(MOVIE_ENGINE).unwrap();
        assert_eq!(window.stage.label(engine), Some("a.mkv"));
    }

    #[test]
    fn test_fullscreen_round_trip_through_view() {
        let (_loop, mut window, button, _tiles) = window_with_view(Middleware::None);
        let engine = window.stage.find(MOVIE_ENGINE).unwrap();
        let player_box = window.stage.parent(engine).unwrap();
        let index = window.stage.index_of(engine).unwrap();

        assert!(window.emit(button, CLICKED_SIGNAL).unwrap());
        assert_eq!(window.stage.parent(engine), Some(window.stage.root()));

        let exit = window.stage.find(FULLSCREEN_EXIT).unwrap();
        assert!(window.emit(exit, CLICKED_SIGNAL).unwrap());
        assert_eq!(window.stage.parent(engine), Some(player_box));
        assert_eq!(window.stage.index_of(engine), Some(index));
    }

    #[test]
    fn test_tiles_unreachable_while_fullscreen() {
        let (_loop, mut window, button, tiles) = window_with_view(Middleware::None);
        let engine = window.stage.find(MOVIE_ENGINE).unwrap();

        assert!(window.emit(button, CLICKED_SIGNAL).unwrap());
        window.stage.set_key_focus(Some(tiles[0].actor)).unwrap();
        assert!(!window.activate().unwrap());
        assert_eq!(window.stage.label(engine), None);

        let exit = window.stage.find(FULLSCREEN_EXIT).unwrap();
        assert!(window.emit(exit, CLICKED_SIGNAL).unwrap());
        window.stage.set_key_focus(Some(tiles[0].actor)).unwrap();
        assert!(window.activate().unwrap());
        assert_eq!(window.stage.label(engine), Some("a.mkv"));
    }

    #[test]
    fn test_theme_sets_exit_icon_and_label() {
        let main_loop: MainLoop<Window> = MainLoop::new();
        let mut stage = Stage::new();
        let view =
            MoviePlayerView::new(&mut stage, &main_loop.handle(), &FlatSource::new(items())).unwrap();
        let exit = stage.find(FULLSCREEN_EXIT).unwrap();
        assert_eq!(stage.style_class(exit), Some(FULLSCREEN_EXIT_CLASS));

        let dir = tempfile::tempdir().unwrap();
        let dirs = Dirs::new(dir.path().join("home"), dir.path().join("res"));

        // 没有图标也没有样式时保持默认文字
        view.apply_theme(&mut stage, &dirs, &StyleSheet::default()).unwrap();
        assert_eq!(stage.image(exit), None);
        assert_eq!(stage.label(exit), Some("×"));

        let icon = dir.path().join("res/icons/exit.svg");
        fs::create_dir_all(icon.parent().unwrap()).unwrap();
        fs::write(&icon, b"<svg/>").unwrap();
        let style = StyleSheet::parse(r#".fullscreen-exit { content: "Wyjdź"; }"#).unwrap();

        view.apply_theme(&mut stage, &dirs, &style).unwrap();
        assert_eq!(stage.image(exit), Some(icon.as_path()));
        assert_eq!(stage.label(exit), Some("Wyjdź"));
    }

    #[test]
    fn test_signal_mode_exit_by_activation() {
        let (_loop, mut window, button, _tiles) = window_with_view(Middleware::Signal {
            action_signal: "press".to_string(),
        });
        let engine = window.stage.find(MOVIE_ENGINE).unwrap();

        assert!(window.emit(button, CLICKED_SIGNAL).unwrap());
        assert_eq!(window.stage.key_focus(), Some(engine));
        assert!(!window.input_group.is_running());

        assert!(window.activate().unwrap());
        assert_ne!(window.stage.parent(engine), Some(window.stage.root()));
        assert!(window.input_group.is_running());
    }
}
