//! # Movie 模块
//!
//! 影片库的平铺数据源：为库中每部影片生成一个图片磁贴。
//!
//! 封面图片可能还在后台生成，尚未落盘时通过主循环的定时任务轮询，
//! 直到文件出现或超时为止。

use crate::fullscreen::CLICKED_SIGNAL;
use crate::main_loop::{Continue, LoopHandle};
use crate::scene::{ActorId, HandlerId, SceneError, Stage, StageAccess};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 磁贴的样式类
pub const PHOTO_TILE_STYLE: &str = "PisakMoviePhotoTile";

/// 影片库条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieItem {
    pub id: u64,
    pub path: PathBuf,
    /// 封面图片路径
    pub cover: Option<PathBuf>,
}

/// 封面轮询配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewPolling {
    /// 两次检查的间隔
    pub interval: Duration,
    /// 放弃前的最长等待时间
    pub timeout: Duration,
}

impl Default for PreviewPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// 生成的磁贴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoTile {
    pub actor: ActorId,
    pub movie_id: u64,
    /// 磁贴点击信号的处理器
    pub handler: HandlerId,
}

/// 平铺结构的影片数据源
#[derive(Debug, Clone, Default)]
pub struct FlatSource {
    data: Vec<MovieItem>,
    polling: PreviewPolling,
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FlatSource {
    /// 创建数据源，条目按文件名排序
    pub fn new(items: impl IntoIterator<Item = MovieItem>) -> Self {
        let mut data: Vec<MovieItem> = items.into_iter().collect();
        data.sort_by_key(|item| basename(&item.path));
        Self {
            data,
            polling: PreviewPolling::default(),
        }
    }

    pub fn with_polling(mut self, polling: PreviewPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn items(&self) -> &[MovieItem] {
        &self.data
    }

    /// 为所有条目生成磁贴
    ///
    /// 磁贴未挂到场景树上，由调用方决定放在哪里。
    pub fn produce_tiles<C: StageAccess + 'static>(
        &self,
        stage: &mut Stage,
        main_loop: &LoopHandle<C>,
    ) -> Result<Vec<PhotoTile>, SceneError> {
        self.data
            .iter()
            .map(|movie| self.produce_item(stage, main_loop, movie))
            .collect()
    }

    fn produce_item<C: StageAccess + 'static>(
        &self,
        stage: &mut Stage,
        main_loop: &LoopHandle<C>,
        movie: &MovieItem,
    ) -> Result<PhotoTile, SceneError> {
        let actor = stage.create_actor(format!("movie-tile-{}", movie.id));
        stage.set_style_class(actor, PHOTO_TILE_STYLE)?;
        stage.set_reactive(actor, true)?;
        let label = movie
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        stage.set_label(actor, label)?;
        let handler = stage.connect(actor, CLICKED_SIGNAL)?;

        if let Some(cover) = &movie.cover {
            if cover.is_file() {
                stage.set_image(actor, cover)?;
            } else {
                schedule_preview(main_loop, actor, cover.clone(), self.polling);
            }
        }

        Ok(PhotoTile {
            actor,
            movie_id: movie.id,
            handler,
        })
    }
}

/// 在主循环上轮询封面文件，出现后设置一次图片
fn schedule_preview<C: StageAccess + 'static>(
    main_loop: &LoopHandle<C>,
    tile: ActorId,
    path: PathBuf,
    polling: PreviewPolling,
) {
    debug!(path = %path.display(), "封面尚未生成，开始轮询");
    let deadline = Instant::now() + polling.timeout;
    main_loop.timeout_add(polling.interval, move |ctx| {
        if path.is_file() {
            if let Err(e) = ctx.stage_mut().set_image(tile, &path) {
                warn!(error = %e, "设置封面失败");
            }
            return Continue::Stop;
        }
        if Instant::now() >= deadline {
            warn!(path = %path.display(), timeout = ?polling.timeout, "等待封面超时，放弃");
            return Continue::Stop;
        }
        Continue::Keep
    });
}
