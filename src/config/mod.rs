use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use log::LevelFilter;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::task::TYPE_PROGRESSIVE;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 下载记录文件路径
    pub store_path: String,
    /// 日志文件路径，为空时输出到终端
    pub log_file: String,
    /// 日志级别：error / warn / info / debug / trace
    pub log_level: String,
    /// 日志文件最大大小（字节），超过后轮转
    pub max_log_size: u64,
    /// 未指定类型时使用的内容类型
    pub default_content_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: "./downloads/records.json".to_string(),
            log_file: String::new(),
            log_level: "info".to_string(),
            max_log_size: 10 * 1024 * 1024,
            default_content_type: TYPE_PROGRESSIVE.to_string(),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在时写入默认配置
    pub fn load(path: &str) -> DownloadResult<Self> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带说明的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> DownloadResult<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let config_content = toml::to_string_pretty(self)?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    fn generate_tutorial_content() -> &'static str {
        r#"# dlstate 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# 配置文件位置：
# - Windows: %APPDATA%/dlstate/dlstate.conf
# - macOS: ~/Library/Application Support/dlstate/dlstate.conf
# - Linux: ~/.config/dlstate/dlstate.conf
#
# store_path            下载记录文件（JSON），不存在时自动创建
# log_file              日志文件路径，留空则输出到终端（可用 RUST_LOG 覆盖级别）
# log_level             error / warn / info / debug / trace
# max_log_size          日志文件超过该大小（字节）后轮转为 <log_file>.backup
# default_content_type  add 命令未指定 --type 时使用，例如 progressive / dash / hls / ss
#
# 使用示例：
#   dlstate add https://example.com/video.mp4
#   dlstate add --type dash --key 0.1.0 https://example.com/manifest.mpd
#   dlstate remove <id>
#   dlstate list
"#
    }

    pub fn level_filter(&self) -> DownloadResult<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| DownloadError::config(format!("未知的日志级别: {}", self.log_level)))
    }

    /// 校验配置合法性
    pub fn validate(&self) -> DownloadResult<()> {
        if self.store_path.trim().is_empty() {
            return Err(DownloadError::config("记录文件路径不能为空"));
        }

        if self.max_log_size == 0 {
            return Err(DownloadError::config("日志文件大小必须大于0"));
        }

        if self.default_content_type.trim().is_empty() {
            return Err(DownloadError::config("默认内容类型不能为空"));
        }

        self.level_filter()?;
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(store) = &args.store {
            self.store_path = store.clone();
        }

        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 记录文件: {}\n\
            - 日志输出: {}\n\
            - 日志级别: {}\n\
            - 默认类型: {}",
            self.store_path,
            if self.log_file.is_empty() { "终端" } else { self.log_file.as_str() },
            self.log_level,
            self.default_content_type,
        )
    }
}
