//! 嵌入式后端
//!
//! 在原生窗口工具包之上运行：舞台嵌在一个原生外层窗口里，
//! 标题、位置、尺寸与全屏设置同时作用于两者。
//! 销毁回调绑定在外层窗口上，外层窗口销毁时连同嵌入的舞台一起销毁。

use super::{BackendError, Geometry, NativeWindow, Window, WindowBackend};
use crate::app::{AppArgs, RunningFlag, run_main_loop};
use crate::config::AppConfig;
use pisak_runtime::{Descriptor, MainLoop, Stage};
use tracing::info;

/// 嵌入式后端
#[derive(Debug)]
pub struct EmbeddedBackend {
    main_loop: MainLoop<Window>,
}

impl WindowBackend for EmbeddedBackend {
    const NAME: &'static str = "embedded";

    fn init(args: &AppArgs) -> Result<Self, BackendError> {
        info!(argc = args.argv.len(), "初始化场景图工具包");
        info!(argc = args.argv.len(), "初始化原生窗口工具包");
        Ok(Self {
            main_loop: MainLoop::new(),
        })
    }

    fn create_window(
        &mut self,
        args: &AppArgs,
        _descriptor: &Descriptor,
        config: &AppConfig,
    ) -> Window {
        let geometry = Geometry::for_config(config, args.debug);

        let mut wrapper = NativeWindow::new();
        let quit = self.main_loop.quit_handle();
        wrapper.connect_destroy(move || quit.quit());

        let mut window = Window::new(Stage::new(), config.input.clone());
        window.wrapper = Some(wrapper);
        window.apply_geometry(&geometry, &config.title);

        info!(
            width = geometry.width,
            height = geometry.height,
            fullscreen = geometry.fullscreen,
            "创建嵌入式窗口"
        );
        window
    }

    fn main_loop(&self) -> &MainLoop<Window> {
        &self.main_loop
    }

    fn main(&mut self, window: &mut Window, running: &RunningFlag) {
        window.show_all();
        run_main_loop("原生窗口主循环", running, || self.main_loop.run(window));
    }

    fn main_quit(&mut self, window: &mut Window) {
        window.destroy();
    }
}
