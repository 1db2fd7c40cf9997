//! # 影片播放器集成测试
//!
//! 测试 设备事件 → 主循环 → 视图 → 全屏组件 的执行链路。

use pisak_host::audio::{AudioError, SoundOutput};
use pisak_host::config::AppConfig;
use pisak_host::input::DeviceCommand;
use pisak_host::movie::{FULLSCREEN_BUTTON, FULLSCREEN_EXIT, MOVIE_ENGINE};
use pisak_host::{AppArgs, Application, Dirs, MoviePlayerView, StageBackend, Window, scan_library};
use pisak_runtime::{Continue, Descriptor, FlatSource, Middleware, PreviewPolling};
use std::fs;
use std::path::Path;
use std::time::Duration;

struct Silent;

impl SoundOutput for Silent {
    fn play_file(&self, _path: &Path, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

fn start(dirs: &Dirs, middleware: Middleware) -> Application<StageBackend> {
    fs::create_dir_all(dirs.res().join("css")).unwrap();
    fs::write(dirs.res().join("css/default.css"), "").unwrap();
    let config = AppConfig {
        input: middleware,
        ..AppConfig::default()
    };
    Application::<StageBackend>::with_config(
        AppArgs::default(),
        &Descriptor::default(),
        dirs,
        config,
        || Ok(Box::new(Silent) as Box<dyn SoundOutput>),
    )
    .unwrap()
}

fn command(window: &mut Window, line: &str) -> bool {
    DeviceCommand::parse(line).unwrap().apply(window).unwrap()
}

/// Sprite 模式：全屏期间光标只在遮罩内，退出后回到视图
#[test]
fn test_sprite_fullscreen_through_device_commands() {
    let dir = tempfile::tempdir().unwrap();
    let dirs = Dirs::new(dir.path().join("home"), dir.path().join("res"));
    let mut app = start(&dirs, Middleware::Sprite);

    let handle = app.loop_handle();
    let view = MoviePlayerView::new(&mut app.window_mut().stage, &handle, &FlatSource::default())
        .unwrap();
    let view_root = pisak_host::WindowContent::root(&view);
    app.load_view(Box::new(view)).unwrap();

    handle.idle_add(move |window: &mut Window| {
        let engine = window.stage.find(MOVIE_ENGINE).unwrap();
        let player_box = window.stage.parent(engine).unwrap();

        assert!(command(window, &format!("click {FULLSCREEN_BUTTON}")));
        assert_eq!(window.stage.parent(engine), Some(window.stage.root()));
        assert_ne!(window.input_group.cursor_target(), Some(view_root));

        // 光标被限制在遮罩里，视图内的按钮无法激活
        assert!(command(window, &format!("focus {FULLSCREEN_BUTTON}")));
        assert!(!command(window, "activate"));

        assert!(command(window, &format!("focus {FULLSCREEN_EXIT}")));
        assert!(command(window, "activate"));
        assert_eq!(window.stage.parent(engine), Some(player_box));
        assert_eq!(window.input_group.cursor_target(), Some(view_root));

        command(window, "quit");
    });

    app.main();
    assert!(app.window().is_destroyed());
}

/// 封面在启动后才生成：主循环轮询到文件后设置到磁贴上
#[test]
fn test_library_cover_arrives_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let dirs = Dirs::new(dir.path().join("home"), dir.path().join("res"));
    let library = dir.path().join("videos");
    fs::create_dir_all(library.join("covers")).unwrap();
    fs::write(library.join("film.mp4"), b"").unwrap();

    let mut app = start(&dirs, Middleware::None);
    let items = scan_library(&library).unwrap();
    let source = FlatSource::new(items).with_polling(PreviewPolling {
        interval: Duration::from_millis(2),
        timeout: Duration::from_secs(5),
    });
    let handle = app.loop_handle();
    let view = MoviePlayerView::new(&mut app.window_mut().stage, &handle, &source).unwrap();
    let tile = view.tiles()[0].actor;
    app.load_view(Box::new(view)).unwrap();

    let cover = library.join("covers/film.png");
    let written = cover.clone();
    handle.timeout_add(Duration::from_millis(10), move |_| {
        fs::write(&written, b"png").unwrap();
        Continue::Stop
    });
    handle.timeout_add(Duration::from_millis(5), move |window: &mut Window| {
        if window.stage.image(tile).is_some() {
            window.destroy();
            Continue::Stop
        } else {
            Continue::Keep
        }
    });

    app.main();
    assert_eq!(app.window().stage.image(tile), Some(cover.as_path()));
}
