//! 原生外层窗口
//!
//! 嵌入式后端用它包住舞台：标题、默认尺寸、可调整大小、全屏、显示与销毁。

use tracing::debug;

/// 原生窗口
#[derive(Default)]
pub struct NativeWindow {
    title: String,
    position: (f32, f32),
    default_size: (f32, f32),
    resizable: bool,
    fullscreen: bool,
    visible: bool,
    destroyed: bool,
    destroy_callbacks: Vec<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeWindow")
            .field("title", &self.title)
            .field("default_size", &self.default_size)
            .field("resizable", &self.resizable)
            .field("fullscreen", &self.fullscreen)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl NativeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.position = (x, y);
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn set_default_size(&mut self, width: f32, height: f32) {
        self.default_size = (width, height);
    }

    pub fn default_size(&self) -> (f32, f32) {
        self.default_size
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn show_all(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn connect_destroy(&mut self, callback: impl FnMut() + 'static) {
        self.destroy_callbacks.push(Box::new(callback));
    }

    /// 销毁窗口，回调只执行一次
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.visible = false;
        debug!(title = %self.title, "原生窗口销毁");
        for mut callback in std::mem::take(&mut self.destroy_callbacks) {
            callback();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
