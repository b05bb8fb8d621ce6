//! `task` 模块包含单个下载任务的状态记录
//!
//! 主要包括：
//! - `state`: 状态 `DownloadState`、失败原因与外部条件标志
//! - `stream_key`: 子流选择及其合并规则
//! - `action`: 针对任务的请求 `DownloadAction`
//! - `progress`: 进度快照与进度来源
//! - `record`: 不可变记录 `DownloadRecord` 及状态迁移
//! - `stored`: 记录的持久化形式

pub mod state;
pub mod stream_key;
pub mod action;
pub mod progress;
pub mod record;
pub mod stored;

// 导出核心组件，方便外部使用
pub use action::{DownloadAction, TYPE_DASH, TYPE_HLS, TYPE_PROGRESSIVE, TYPE_SS};
pub use progress::{ProgressSnapshot, ProgressSource, SharedProgress};
pub use record::{DownloadRecord, RecordParts};
pub use state::{
    failure_label, state_label, DownloadState, FailureReason, RequirementFlags,
    MANUAL_STOP_REASON_NONE, MANUAL_STOP_REASON_UNDEFINED,
};
pub use stored::StoredRecord;
pub use stream_key::{merge_stream_keys, StreamKey};
