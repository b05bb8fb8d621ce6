use chrono::Local; // 用于获取本地时间
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::config::Config;
use crate::core::error::DownloadResult;

struct LogFile {
    writer: BufWriter<File>,
    current_size: u64,
}

/// 写入文件的日志器，超过大小后轮转为 `<file>.backup`
pub struct FileLogger {
    inner: Mutex<LogFile>,
    level: LevelFilter,
    file_path: String,
    max_size: u64, // 最大文件大小 (bytes)
}

impl FileLogger {
    pub fn new(file_path: &str, level: LevelFilter, max_size: u64) -> Result<Self, std::io::Error> {
        // 确保日志目录存在
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            inner: Mutex::new(LogFile {
                writer: BufWriter::new(file),
                current_size,
            }),
            level,
            file_path: file_path.to_string(),
            max_size,
        })
    }

    /// 检查并执行日志轮转
    fn check_rotation(&self, log: &mut LogFile) -> Result<(), std::io::Error> {
        if log.current_size > self.max_size {
            log.writer.flush()?;

            let backup_path = format!("{}.backup", self.file_path);
            if Path::new(&backup_path).exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&self.file_path, &backup_path)?;

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;

            log.writer = BufWriter::new(file);
            log.current_size = 0;
        }
        Ok(())
    }

    fn write_log(&self, record: &Record) -> Result<(), std::io::Error> {
        let log_entry = format!(
            "{} [{}] {} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        );

        let mut log = match self.inner.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.check_rotation(&mut log)?;
        log.writer.write_all(log_entry.as_bytes())?;
        log.current_size += log_entry.len() as u64;
        log.writer.flush()
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Err(e) = self.write_log(record) {
                eprintln!("日志写入失败: {}", e);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut log) = self.inner.lock() {
            let _ = log.writer.flush();
        }
    }
}

/// 按配置安装全局日志器：配置了日志文件时写文件，否则使用 env_logger 输出到终端
pub fn init_logging(config: &Config) -> DownloadResult<()> {
    let level = config.level_filter()?;
    if config.log_file.is_empty() {
        // RUST_LOG 优先于配置文件
        if let Err(e) = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
        {
            eprintln!("日志系统初始化失败，沿用已安装的日志器: {}", e);
        }
    } else {
        let logger = FileLogger::new(&config.log_file, level, config.max_log_size)?;
        match log::set_boxed_logger(Box::new(logger)) {
            Ok(()) => log::set_max_level(level),
            Err(e) => eprintln!("日志系统初始化失败，沿用已安装的日志器: {}", e),
        }
    }
    Ok(())
}
