use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Layered, SubscriberExt},
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync + 'static>;

/// 日志文件名前缀
const LOG_FILE_PREFIX: &str = "duckcoding-switch";

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// 初始化日志系统
///
/// 支持基于配置的日志输出，包括：
/// - 日志级别（trace/debug/info/warn/error）
/// - 输出格式（JSON/纯文本）
/// - 输出目标（控制台/文件/both）
/// - 文件目录（用于文件输出，按天滚动）
///
/// 日志级别可以通过 [`update_log_level`] 动态调整，其他配置需要重新启动后生效。
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(&config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    if LOG_LEVEL_HANDLE.get().is_some() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let file_path = config.file_path.as_deref();
    let layers: Vec<BoxedLayer> = match (&config.output, &config.format) {
        (LogOutput::Console, LogFormat::Text) => vec![create_console_text_layer()],
        (LogOutput::Console, LogFormat::Json) => vec![create_console_json_layer()],
        (LogOutput::File, LogFormat::Text) => vec![create_file_text_layer(file_path)?],
        (LogOutput::File, LogFormat::Json) => vec![create_file_json_layer(file_path)?],
        (LogOutput::Both, LogFormat::Text) => vec![
            create_console_text_layer(),
            create_file_text_layer(file_path)?,
        ],
        (LogOutput::Both, LogFormat::Json) => vec![
            create_console_json_layer(),
            create_file_json_layer(file_path)?,
        ],
    };

    Registry::default()
        .with(filter_layer)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("注册全局日志订阅器失败: {}", e))?;

    // 订阅器注册成功后才保存 handle，失败的初始化可以重试
    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 创建环境过滤器
fn create_env_filter(level: &LogLevel) -> EnvFilter {
    // 优先从环境变量读取，格式：RUST_LOG=duckcoding_switch=trace
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter(level))
}

fn default_env_filter(level: &LogLevel) -> EnvFilter {
    EnvFilter::new(default_filter_directive(level))
}

/// 应用代码使用指定级别，第三方库使用 WARN
fn default_filter_directive(level: &LogLevel) -> String {
    format!("duckcoding_switch={},tokio=warn", level.as_str())
}

fn create_console_text_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(true)
        .with_span_events(if cfg!(debug_assertions) {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .boxed()
}

fn create_console_json_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_writer(std::io::stdout)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .boxed()
}

fn create_file_text_layer<S>(
    file_path: Option<&Path>,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = non_blocking(file_appender);

    // guard 必须活到进程结束，否则缓冲日志会丢失
    Box::leak(Box::new(guard));

    Ok(fmt::layer()
        .with_writer(non_blocking)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(false)
        .boxed())
}

fn create_file_json_layer<S>(
    file_path: Option<&Path>,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = non_blocking(file_appender);

    Box::leak(Box::new(guard));

    Ok(fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .boxed())
}

/// 获取日志目录，未指定时使用配置目录下的 logs
fn get_log_dir(file_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = match file_path {
        Some(path) => path.to_path_buf(),
        None => crate::utils::config::config_dir()?.join("logs"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// 动态更新日志级别（热重载）
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(&new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {}", e))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}
