//! Core: 下载任务状态记录、状态迁移规则与错误类型
//!
//! 本模块不做任何 IO，所有迁移都是纯函数。

pub mod error;
pub mod task;

pub use error::{DownloadError, DownloadResult, RecordError, RecordResult};
pub use task::{
    DownloadAction, DownloadRecord, DownloadState, FailureReason, ProgressSnapshot,
    ProgressSource, RequirementFlags, SharedProgress, StoredRecord, StreamKey,
};
