//! 舞台后端
//!
//! 只使用场景图工具包，舞台本身就是顶层窗口。

use super::{BackendError, Geometry, Window, WindowBackend};
use crate::app::{AppArgs, RunningFlag, run_main_loop};
use crate::config::AppConfig;
use pisak_runtime::{Descriptor, MainLoop, Stage};
use tracing::info;

/// 舞台后端
#[derive(Debug)]
pub struct StageBackend {
    main_loop: MainLoop<Window>,
}

impl WindowBackend for StageBackend {
    const NAME: &'static str = "stage";

    fn init(args: &AppArgs) -> Result<Self, BackendError> {
        info!(argc = args.argv.len(), "初始化场景图工具包");
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
        let mut stage = Stage::new();
        let geometry = Geometry::for_config(config, args.debug);

        // 舞台销毁即退出主循环
        let quit = self.main_loop.quit_handle();
        stage.connect_destroy(move || quit.quit());

        let mut window = Window::new(stage, config.input.clone());
        window.apply_geometry(&geometry, &config.title);

        info!(
            width = geometry.width,
            height = geometry.height,
            fullscreen = geometry.fullscreen,
            "创建舞台窗口"
        );
        window
    }

    fn main_loop(&self) -> &MainLoop<Window> {
        &self.main_loop
    }

    fn main(&mut self, window: &mut Window, running: &RunningFlag) {
        window.show_all();
        run_main_loop("场景图主循环", running, || self.main_loop.run(window));
    }

    fn main_quit(&mut self, window: &mut Window) {
        window.stage.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(debug: bool) -> AppArgs {
        AppArgs {
            argv: vec!["pisak".to_string()],
            debug,
        }
    }

    #[test]
    fn test_debug_window_is_resizable() {
        let mut backend = StageBackend::init(&args(true)).unwrap();
        let window = backend.create_window(&args(true), &Descriptor::default(), &AppConfig::default());

        assert_eq!(window.stage.title(), "PISAK");
        assert!(window.stage.is_user_resizable());
        assert!(!window.stage.is_fullscreen());
        assert!(window.wrapper.is_none());
    }

    #[test]
    fn test_destroy_requests_quit() {
        let mut backend = StageBackend::init(&args(false)).unwrap();
        let mut window =
            backend.create_window(&args(false), &Descriptor::default(), &AppConfig::default());
        assert!(window.stage.is_fullscreen());

        backend.main_quit(&mut window);
        assert!(backend.main_loop().quit_handle().is_requested());

        // 退出请求已发出，主循环立即返回
        let running = RunningFlag::default();
        backend.main(&mut window, &running);
        assert!(!running.is_running());
    }
}
