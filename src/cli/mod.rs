//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - 把命令转换为对下载记录的请求并写回记录文件
//!
//! ## 支持的命令
//!
//! - 添加或合并请求：`dlstate add <uri>`
//! - 标记删除：`dlstate remove <id>`
//! - 彻底删除：`dlstate delete <id>`
//! - 查看：`dlstate show <id>` / `dlstate list`
//! - 状态码表：`dlstate states`
//! - 编辑配置：`dlstate -e`

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;
use std::env;
use uuid::Uuid;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::core::task::{
    failure_label, state_label, DownloadAction, DownloadState, FailureReason, RequirementFlags,
    StreamKey, MANUAL_STOP_REASON_UNDEFINED,
};
use crate::store::RecordStore;
use crate::ui;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/dlstate/dlstate.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/dlstate/dlstate.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/dlstate/dlstate.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// 构建时记录的 git 版本
pub const fn build_sha() -> &'static str {
    match option_env!("VERGEN_GIT_SHA") {
        Some(sha) => sha,
        None => "unknown",
    }
}

/// dlstate 命令行参数
///
/// 示例用法：
///   dlstate add https://example.com/video.mp4
///   dlstate add --id movie --type dash --key 0.1.0 https://example.com/manifest.mpd
///   dlstate remove movie
///   dlstate -e  # 编辑配置文件
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dlstate",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "离线下载任务状态记录工具",
    long_about = "维护离线下载任务的状态记录：创建、合并新请求、标记删除，并查看进度。\n\n示例：\n  dlstate add https://example.com/video.mp4\n  dlstate add --type dash --key 0.1.0 --key 0.2.0 https://example.com/manifest.mpd\n  dlstate remove <id>\n  dlstate list\n"
)]
pub struct Args {
    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 记录文件路径
    #[arg(short = 's', long, help = "下载记录文件路径，覆盖配置文件中的设置。")]
    pub store: Option<String>,

    /// 日志级别
    #[arg(long, help = "日志级别 (error/warn/info/debug/trace)，覆盖配置文件中的设置。")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 创建下载记录，或把请求合并到已有记录
    Add(AddArgs),
    /// 把记录标记为删除中
    Remove { id: String },
    /// 从记录文件中彻底删除
    Delete { id: String },
    /// 查看单条记录
    Show { id: String },
    /// 列出全部记录
    List,
    /// 打印状态码与失败原因码
    States,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AddArgs {
    /// 内容地址
    pub uri: String,

    /// 任务ID，缺省时自动生成
    #[arg(long)]
    pub id: Option<String>,

    /// 内容类型，缺省时使用配置中的 default_content_type
    #[arg(long = "type", short = 't')]
    pub content_type: Option<String>,

    /// 缓存键
    #[arg(long)]
    pub cache_key: Option<String>,

    /// 选择下载的子流 period.group.track，可重复，不指定表示全部
    #[arg(long = "key", short = 'k')]
    pub keys: Vec<StreamKey>,

    /// 附加数据（按 UTF-8 保存）
    #[arg(long)]
    pub data: Option<String>,

    /// 手动停止原因，不带值时表示未指定原因
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "2147483647",
        value_parser = clap::value_parser!(i32).range(0..)
    )]
    pub stop_reason: Option<i32>,

    /// 未满足的外部条件位
    #[arg(long)]
    pub unmet: Option<u32>,
}

impl AddArgs {
    /// 转换为下载请求
    pub fn to_action(&self, config: &Config) -> Result<DownloadAction> {
        let uri = validator::parse_locator(&self.uri)?;
        let id = match &self.id {
            Some(id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        };
        validator::validate_id(&id)?;
        let content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| config.default_content_type.clone());
        validator::validate_content_type(&content_type)?;

        let mut action = DownloadAction::new(id, content_type, uri)
            .with_keys(self.keys.iter().copied())
            .with_manual_stop_reason(self.stop_reason.unwrap_or(0))
            .with_unmet_requirements(RequirementFlags::from_bits(self.unmet.unwrap_or(0)));
        if let Some(key) = &self.cache_key {
            action = action.with_cache_key(key.clone());
        }
        if let Some(data) = &self.data {
            action = action.with_data(data.clone().into_bytes());
        }
        Ok(action)
    }
}

impl Args {
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        if args.edit_config {
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 加载或创建配置文件，合并命令行参数并校验
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }
}

/// 执行命令
pub fn run(args: &Args, config: &Config) -> Result<()> {
    let command = args.command.clone().unwrap_or(Command::List);
    if let Command::States = command {
        print_state_table();
        return Ok(());
    }

    let mut store = RecordStore::open(&config.store_path)
        .with_context(|| format!("无法打开记录文件: {}", config.store_path))?;

    match command {
        Command::Add(add) => {
            let action = add.to_action(config)?;
            let record = store.apply(&action)?;
            info!("请求已应用到 {}: {}", record.id(), record.state());
            ui::print_success(&format!("{} -> {}", record.id(), record.state()));
        }
        Command::Remove { id } => {
            let record = store.request_removal(&id)?;
            ui::print_success(&format!("{} -> {}", record.id(), record.state()));
        }
        Command::Delete { id } => {
            if store.delete(&id)? {
                ui::print_success(&format!("已删除记录 {}", id));
            } else {
                return Err(DownloadError::NotFound(id).into());
            }
        }
        Command::Show { id } => {
            let record = store.get(&id).ok_or_else(|| DownloadError::NotFound(id.clone()))?;
            println!("{}", ui::describe_record(record));
        }
        Command::List => {
            let records = store.list();
            for record in &records {
                println!("{}", ui::record_line(record));
            }
            print!("{}", ui::RecordSummary::from_records(records));
        }
        Command::States => {}
    }
    Ok(())
}

fn print_state_table() {
    println!("状态码:");
    for state in DownloadState::ALL {
        if let Ok(label) = state_label(state.code()) {
            println!("  {} = {}", state.code(), label);
        }
    }
    println!("失败原因码:");
    for reason in [FailureReason::None, FailureReason::Unknown] {
        if let Ok(label) = failure_label(reason.code()) {
            println!("  {} = {}", reason.code(), label);
        }
    }
    println!("手动停止原因: 0 = 未停止, {} = 未指定原因", MANUAL_STOP_REASON_UNDEFINED);
}
