use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 覆盖默认日志级别的环境变量
pub const LOG_ENV: &str = "ECHOCHECK_LOG";

/// 日志级别：优先取 ECHOCHECK_LOG，否则按 verbose 选择 debug 或 info
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "echocheck=debug,warn"
    } else {
        "echocheck=info,warn"
    }
}

/// 初始化日志，输出到 stderr，stdout 留给答案和 JSON
///
/// 重复初始化时静默忽略。
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
