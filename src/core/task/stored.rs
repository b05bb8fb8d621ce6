use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use std::sync::Arc;
use url::Url;

use crate::core::error::RecordError;
use super::progress::ProgressSnapshot;
use super::record::{DownloadRecord, RecordParts};
use super::state::{DownloadState, FailureReason, RequirementFlags};
use super::stream_key::StreamKey;

/// 记录的持久化形式
///
/// 状态和失败原因以整数编码保存，时间以毫秒时间戳保存。
/// 进度只保存写入时的快照。
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub content_type: String,
    pub uri: Url,
    #[serde(default)]
    pub cache_key: Option<String>,
    pub state: i32,
    pub failure_reason: i32,
    pub unmet_requirements: u32,
    pub manual_stop_reason: i32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub update_time: DateTime<Utc>,
    #[serde(default)]
    pub stream_keys: Vec<StreamKey>,
    #[serde(default)]
    pub custom_metadata: Bytes,
    #[serde(default)]
    pub progress: ProgressSnapshot,
}

impl From<&DownloadRecord> for StoredRecord {
    fn from(record: &DownloadRecord) -> Self {
        StoredRecord {
            id: record.id().to_string(),
            content_type: record.content_type().to_string(),
            uri: record.uri().clone(),
            cache_key: record.cache_key().map(str::to_string),
            state: record.state().code(),
            failure_reason: record.failure_reason().code(),
            unmet_requirements: record.unmet_requirements().bits(),
            manual_stop_reason: record.manual_stop_reason(),
            start_time: record.start_time(),
            update_time: record.update_time(),
            stream_keys: record.stream_keys().iter().copied().collect(),
            custom_metadata: record.custom_metadata().clone(),
            progress: record.progress(),
        }
    }
}

impl TryFrom<StoredRecord> for DownloadRecord {
    type Error = RecordError;

    /// 经过完整构造校验，损坏的数据不会变成记录
    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        DownloadRecord::from_parts(RecordParts {
            state: DownloadState::try_from(stored.state)?,
            failure_reason: FailureReason::try_from(stored.failure_reason)?,
            unmet_requirements: RequirementFlags::from_bits(stored.unmet_requirements),
            manual_stop_reason: stored.manual_stop_reason,
            stream_keys: stored.stream_keys.into_iter().collect(),
            progress: Arc::new(stored.progress),
            id: stored.id,
            content_type: stored.content_type,
            uri: stored.uri,
            cache_key: stored.cache_key,
            start_time: stored.start_time,
            update_time: stored.update_time,
            custom_metadata: stored.custom_metadata,
        })
    }
}
