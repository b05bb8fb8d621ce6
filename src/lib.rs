//! dlstate: 离线下载任务的状态记录
//!
//! [`core`] 中的 [`DownloadRecord`] 是不可变快照，新请求通过
//! [`DownloadRecord::merge_action`] 合并，删除请求通过
//! [`DownloadRecord::set_remove_state`] 处理。其余模块负责持久化、配置与命令行。

pub mod cli;
pub mod config;
pub mod core;
pub mod store;
pub mod ui;
pub mod utils;

pub use crate::core::error::{DownloadError, DownloadResult, RecordError, RecordResult};
pub use crate::core::task::{
    DownloadAction, DownloadRecord, DownloadState, FailureReason, ProgressSnapshot,
    ProgressSource, RequirementFlags, SharedProgress, StoredRecord, StreamKey,
};
pub use crate::store::RecordStore;
