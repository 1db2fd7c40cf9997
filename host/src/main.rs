//! # PISAK
//!
//! 影片播放器应用入口。
//!
//! ## 用法
//!
//! ```bash
//! pisak --library ~/Videos
//! pisak --debug --res res --home /tmp/pisak-home
//! pisak --embedded --middleware signal --action-signal press
//! pisak --headless --quit-after 5
//! pisak --layout large --save-config
//! ```
//!
//! 默认打开原生窗口；`--headless` 只运行内存中的窗口结构。
//! 开关设备事件从标准输入读取，格式见 `pisak_host::input`。

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pisak_host::app::init;
use pisak_host::input::spawn_reader;
use pisak_host::logging::init_logging;
use pisak_host::{
    AppArgs, Application, DesktopBackend, Dirs, EmbeddedBackend, MoviePlayerView, StageBackend,
    ViewLayout, WindowBackend, scan_library,
};
use pisak_runtime::{Continue, DEFAULT_ACTION_SIGNAL, Descriptor, FlatSource, Middleware};
use serde_json::Value;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "pisak")]
#[command(about = "PISAK 辅助技术应用 - 影片播放器")]
#[command(version)]
struct Cli {
    /// 调试模式：窗口为显示器的 70% 且可调整大小
    #[arg(long)]
    debug: bool,

    /// 使用嵌入式后端（原生窗口包裹舞台）
    #[arg(long)]
    embedded: bool,

    /// 不打开原生窗口，只运行内存中的窗口结构
    #[arg(long)]
    headless: bool,

    /// 视图布局名，对应 `json/movie/<layout>/player.json`
    #[arg(long, default_value = "default")]
    layout: String,

    /// 把生效的配置写入用户配置文件
    #[arg(long)]
    save_config: bool,

    /// 应用描述符（JSON）
    #[arg(long)]
    descriptor: Option<PathBuf>,

    /// 随程序发布的资源目录（默认：res）
    #[arg(long, default_value = "res")]
    res: PathBuf,

    /// 用户目录（默认：~/.pisak）
    #[arg(long)]
    home: Option<PathBuf>,

    /// 影片库目录，缺省时使用描述符元素 `library.path`
    #[arg(long)]
    library: Option<PathBuf>,

    /// 指定秒数后自动退出
    #[arg(long)]
    quit_after: Option<u64>,

    /// 输入中间件（覆盖配置文件）
    #[arg(long, value_enum)]
    middleware: Option<MiddlewareArg>,

    /// signal 中间件的激活信号名
    #[arg(long, default_value = DEFAULT_ACTION_SIGNAL)]
    action_signal: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MiddlewareArg {
    None,
    Sprite,
    Signal,
}

impl Cli {
    fn middleware_override(&self) -> Option<Middleware> {
        self.middleware.map(|arg| match arg {
            MiddlewareArg::None => Middleware::None,
            MiddlewareArg::Sprite => Middleware::Sprite,
            MiddlewareArg::Signal => Middleware::Signal {
                action_signal: self.action_signal.clone(),
            },
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let dirs = match &cli.home {
        Some(home) => Dirs::new(home, &cli.res),
        None => Dirs::from_env(&cli.res)?,
    };
    dirs.ensure_layout()?;

    let descriptor = load_descriptor(cli.descriptor.as_deref())?;
    let args = AppArgs {
        argv: std::env::args().collect(),
        debug: cli.debug,
    };

    match (cli.headless, cli.embedded) {
        (true, true) => run::<EmbeddedBackend>(&cli, args, &descriptor, &dirs),
        (true, false) => run::<StageBackend>(&cli, args, &descriptor, &dirs),
        (false, true) => run::<DesktopBackend<EmbeddedBackend>>(&cli, args, &descriptor, &dirs),
        (false, false) => run::<DesktopBackend<StageBackend>>(&cli, args, &descriptor, &dirs),
    }
}

fn load_descriptor(path: Option<&Path>) -> Result<Descriptor> {
    let Some(path) = path else {
        return Ok(Descriptor::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取描述符失败: {}", path.display()))?;
    Descriptor::from_json(&text).with_context(|| format!("描述符解析失败: {}", path.display()))
}

fn run<B: WindowBackend>(
    cli: &Cli,
    args: AppArgs,
    descriptor: &Descriptor,
    dirs: &Dirs,
) -> Result<()> {
    let mut config = init::load_config(dirs)?;
    if let Some(middleware) = cli.middleware_override() {
        config.input = middleware;
    }
    if cli.save_config {
        let path = dirs.main_config_path();
        config
            .save(&path)
            .with_context(|| format!("保存配置失败: {}", path.display()))?;
        info!(path = %path.display(), "配置已保存");
    }

    let mut app =
        Application::<B>::with_config(args, descriptor, dirs, config, init::default_sound_output)?;

    let library = cli.library.clone().or_else(|| {
        app.element("library")
            .and_then(|library| library.get("path"))
            .and_then(Value::as_str)
            .map(PathBuf::from)
    });
    let items = match library {
        Some(dir) => scan_library(&dir)?,
        None => {
            warn!("未指定影片库目录");
            Vec::new()
        }
    };

    let handle = app.loop_handle();
    let source = FlatSource::new(items);
    let style = app.style().clone();
    let stage = &mut app.window_mut().stage;
    let view = MoviePlayerView::new(stage, &handle, &source)?;
    view.apply_theme(stage, dirs, &style)?;
    match dirs.json_view_path("movie", &cli.layout, "player") {
        Ok(path) => {
            let applied = ViewLayout::load(&path)?.apply(stage)?;
            info!(path = %path.display(), applied, "应用视图布局");
        }
        Err(e) => debug!(error = %e, "没有视图布局文件"),
    }
    app.load_view(Box::new(view))?;

    spawn_reader(BufReader::new(std::io::stdin()), app.loop_sender()).context("启动设备读取线程失败")?;

    if let Some(seconds) = cli.quit_after {
        handle.timeout_add(Duration::from_secs(seconds), move |window| {
            info!(seconds, "到达自动退出时间");
            window.destroy();
            Continue::Stop
        });
    }

    app.play_sound_effect("start");
    app.main();
    Ok(())
}
