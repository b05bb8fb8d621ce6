use dlstate::cli;
use dlstate::ui;
use dlstate::utils::logger;
use log::info;

fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok((args, config)) => (args, config),
        Err(e) => {
            ui::print_error(&format!("参数解析失败: {}", e));
            std::process::exit(1);
        }
    };

    logger::init_logging(&config)?;
    info!("dlstate {} (git {}) 启动", env!("CARGO_PKG_VERSION"), cli::build_sha());
    info!("配置文件路径: {}", args.config);
    info!("{}", config.get_summary());

    if let Err(e) = cli::run(&args, &config) {
        log::error!("命令执行失败: {:#}", e);
        ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
