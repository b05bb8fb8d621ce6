use bytes::Bytes;
use serde::{Serialize, Deserialize};
use url::Url;

use super::state::{RequirementFlags, MANUAL_STOP_REASON_NONE};
use super::stream_key::StreamKey;

/// 渐进式下载
pub const TYPE_PROGRESSIVE: &str = "progressive";
/// DASH 自适应流
pub const TYPE_DASH: &str = "dash";
/// HLS 自适应流
pub const TYPE_HLS: &str = "hls";
/// SmoothStreaming 自适应流
pub const TYPE_SS: &str = "ss";

/// 针对某个下载任务的请求
///
/// `manual_stop_reason` 和 `unmet_requirements` 由发起合并的调用方给出，
/// 记录本身不负责计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadAction {
    pub id: String,
    pub content_type: String,
    pub uri: Url,
    pub custom_cache_key: Option<String>,
    /// 为空表示下载全部子流
    pub keys: Vec<StreamKey>,
    pub data: Bytes,
    pub manual_stop_reason: i32,
    pub unmet_requirements: RequirementFlags,
}

impl DownloadAction {
    pub fn new(id: impl Into<String>, content_type: impl Into<String>, uri: Url) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            uri,
            custom_cache_key: None,
            keys: Vec::new(),
            data: Bytes::new(),
            manual_stop_reason: MANUAL_STOP_REASON_NONE,
            unmet_requirements: RequirementFlags::NONE,
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.custom_cache_key = Some(key.into());
        self
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = StreamKey>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_manual_stop_reason(mut self, reason: i32) -> Self {
        self.manual_stop_reason = reason;
        self
    }

    pub fn with_unmet_requirements(mut self, flags: RequirementFlags) -> Self {
        self.unmet_requirements = flags;
        self
    }

    /// 手动停止或存在未满足的条件
    pub fn is_blocked(&self) -> bool {
        self.manual_stop_reason != MANUAL_STOP_REASON_NONE || !self.unmet_requirements.is_empty()
    }
}
