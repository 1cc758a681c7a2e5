use std::path::PathBuf;

use bracket_config::{AppConfig, ConfigError};
use bracket_frontend::CliRequest;
use bracket_frontend::selection::SelectionRequest;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut selection = SelectionRequest::default();
    let mut dxf: Option<PathBuf> = None;
    let mut thickness: Option<f64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--sku" => {
                let Some(sku) = args.next() else {
                    eprintln!("`--sku` 需要提供产品编号");
                    std::process::exit(1);
                };
                selection.sku = Some(sku);
            }
            "--option" => {
                let Some((key, value)) = args.next().as_deref().and_then(SelectionRequest::parse_option)
                else {
                    eprintln!("`--option` 需要 KEY=VALUE 形式的参数");
                    std::process::exit(1);
                };
                selection.options.insert(key, value);
            }
            "--dxf" => {
                let Some(path) = args.next() else {
                    eprintln!("`--dxf` 需要提供图纸路径");
                    std::process::exit(1);
                };
                dxf = Some(PathBuf::from(path));
            }
            "--thickness" => {
                let Some(value) = args.next().and_then(|raw| raw.parse::<f64>().ok()) else {
                    eprintln!("`--thickness` 需要提供数值");
                    std::process::exit(1);
                };
                thickness = Some(value);
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动支架图纸重建工具");

    let request = match dxf {
        Some(path) => CliRequest::Drawing { path, thickness },
        None => {
            if thickness.is_some() {
                warn!("`--thickness` 仅在 `--dxf` 模式下生效，已忽略");
            }
            CliRequest::Assembly(selection)
        }
    };

    if let Err(err) = bracket_frontend::run_cli(&config, request) {
        error!(error = %err, "执行失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid { .. } | ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
