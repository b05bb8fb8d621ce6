use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

use crate::core::error::{RecordError, RecordResult};
use super::action::DownloadAction;
use super::progress::{ProgressSnapshot, ProgressSource};
use super::state::{DownloadState, FailureReason, RequirementFlags, MANUAL_STOP_REASON_NONE};
use super::stream_key::{merge_stream_keys, StreamKey};

/// 构造记录所需的全部字段
///
/// 只能通过 [`DownloadRecord::from_parts`] 变成记录，构造时会校验不变式。
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub id: String,
    pub content_type: String,
    pub uri: Url,
    pub cache_key: Option<String>,
    pub state: DownloadState,
    pub failure_reason: FailureReason,
    pub unmet_requirements: RequirementFlags,
    pub manual_stop_reason: i32,
    pub start_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub stream_keys: BTreeSet<StreamKey>,
    pub custom_metadata: Bytes,
    pub progress: Arc<dyn ProgressSource>,
}

impl RecordParts {
    fn check(&self) -> RecordResult<()> {
        let failed = self.state == DownloadState::Failed;
        let has_reason = self.failure_reason != FailureReason::None;
        let blocked = self.manual_stop_reason != MANUAL_STOP_REASON_NONE
            || !self.unmet_requirements.is_empty();
        let progressing = matches!(self.state, DownloadState::Downloading | DownloadState::Queued);
        if failed != has_reason || (blocked && progressing) {
            return Err(RecordError::InvalidState {
                state: self.state.code(),
                failure_reason: self.failure_reason.code(),
                manual_stop_reason: self.manual_stop_reason,
                unmet_requirements: self.unmet_requirements.bits(),
            });
        }
        Ok(())
    }
}

/// 单个下载任务的不可变快照
///
/// 记录从不原地修改，状态迁移总是返回一个新的记录。
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    id: String,
    content_type: String,
    uri: Url,
    cache_key: Option<String>,
    state: DownloadState,
    failure_reason: FailureReason,
    unmet_requirements: RequirementFlags,
    manual_stop_reason: i32,
    start_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    stream_keys: BTreeSet<StreamKey>,
    custom_metadata: Bytes,
    progress: Arc<dyn ProgressSource>,
}

impl DownloadRecord {
    /// 根据首个请求创建记录，状态为 `Queued`
    pub fn new(action: &DownloadAction) -> Self {
        Self::new_at(action, Utc::now())
    }

    pub fn new_at(action: &DownloadAction, now: DateTime<Utc>) -> Self {
        debug!("创建下载记录 {} ({})", action.id, action.content_type);
        Self {
            id: action.id.clone(),
            content_type: action.content_type.clone(),
            uri: action.uri.clone(),
            cache_key: action.custom_cache_key.clone(),
            state: DownloadState::Queued,
            failure_reason: FailureReason::None,
            unmet_requirements: RequirementFlags::NONE,
            manual_stop_reason: MANUAL_STOP_REASON_NONE,
            start_time: now,
            update_time: now,
            stream_keys: action.keys.iter().copied().collect(),
            custom_metadata: action.data.clone(),
            progress: Arc::new(ProgressSnapshot::default()),
        }
    }

    /// 完整构造，违反不变式时返回 `InvalidState`
    pub fn from_parts(parts: RecordParts) -> RecordResult<Self> {
        parts.check()?;
        Ok(Self::assemble(parts))
    }

    fn assemble(parts: RecordParts) -> Self {
        Self {
            id: parts.id,
            content_type: parts.content_type,
            uri: parts.uri,
            cache_key: parts.cache_key,
            state: parts.state,
            failure_reason: parts.failure_reason,
            unmet_requirements: parts.unmet_requirements,
            manual_stop_reason: parts.manual_stop_reason,
            start_time: parts.start_time,
            update_time: parts.update_time,
            stream_keys: parts.stream_keys,
            custom_metadata: parts.custom_metadata,
            progress: parts.progress,
        }
    }

    /// 拆回全部字段
    pub fn to_parts(&self) -> RecordParts {
        RecordParts {
            id: self.id.clone(),
            content_type: self.content_type.clone(),
            uri: self.uri.clone(),
            cache_key: self.cache_key.clone(),
            state: self.state,
            failure_reason: self.failure_reason,
            unmet_requirements: self.unmet_requirements,
            manual_stop_reason: self.manual_stop_reason,
            start_time: self.start_time,
            update_time: self.update_time,
            stream_keys: self.stream_keys.clone(),
            custom_metadata: self.custom_metadata.clone(),
            progress: Arc::clone(&self.progress),
        }
    }

    /// 把新请求合并进记录，请求的 id 和类型必须与记录一致
    pub fn merge_action(&self, action: &DownloadAction) -> RecordResult<Self> {
        self.merge_action_at(action, Utc::now())
    }

    pub fn merge_action_at(
        &self,
        action: &DownloadAction,
        now: DateTime<Utc>,
    ) -> RecordResult<Self> {
        if action.id != self.id {
            warn!("拒绝合并: 请求 id {} 与记录 {} 不一致", action.id, self.id);
            return Err(RecordError::MismatchedTarget {
                field: "id",
                expected: self.id.clone(),
                actual: action.id.clone(),
            });
        }
        if action.content_type != self.content_type {
            warn!(
                "拒绝合并: 记录 {} 的类型 {} 与请求类型 {} 不一致",
                self.id, self.content_type, action.content_type
            );
            return Err(RecordError::MismatchedTarget {
                field: "content_type",
                expected: self.content_type.clone(),
                actual: action.content_type.clone(),
            });
        }

        let state = self.state.next_on_merge(action.is_blocked());
        debug!("合并请求到下载记录 {}: {} -> {}", self.id, self.state, state);
        Self::from_parts(RecordParts {
            id: self.id.clone(),
            content_type: self.content_type.clone(),
            uri: action.uri.clone(),
            cache_key: action.custom_cache_key.clone(),
            state,
            failure_reason: FailureReason::None,
            unmet_requirements: action.unmet_requirements,
            manual_stop_reason: action.manual_stop_reason,
            start_time: self.start_time,
            update_time: self.next_update_time(now),
            stream_keys: merge_stream_keys(&self.stream_keys, &action.keys),
            custom_metadata: action.data.clone(),
            progress: Arc::clone(&self.progress),
        })
    }

    /// 返回状态为 `Removing` 的副本，其余字段不变
    pub fn set_remove_state(&self) -> Self {
        self.set_remove_state_at(Utc::now())
    }

    pub fn set_remove_state_at(&self, now: DateTime<Utc>) -> Self {
        debug!("下载记录 {} 标记删除: {} -> {}", self.id, self.state, DownloadState::Removing);
        let parts = RecordParts {
            state: DownloadState::Removing,
            failure_reason: FailureReason::None,
            update_time: self.next_update_time(now),
            ..self.to_parts()
        };
        // Removing 且无失败原因，两条状态不变式都必然成立
        debug_assert!(parts.check().is_ok());
        Self::assemble(parts)
    }

    /// 替换进度来源
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSource>) -> Self {
        self.progress = progress;
        self
    }

    fn next_update_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.update_time)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// 缓存键，未设置时由 uri 推导
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    pub fn effective_cache_key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or_else(|| self.uri.as_str())
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn failure_reason(&self) -> FailureReason {
        self.failure_reason
    }

    pub fn unmet_requirements(&self) -> RequirementFlags {
        self.unmet_requirements
    }

    pub fn manual_stop_reason(&self) -> i32 {
        self.manual_stop_reason
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    /// 为空表示下载全部子流
    pub fn stream_keys(&self) -> &BTreeSet<StreamKey> {
        &self.stream_keys
    }

    pub fn custom_metadata(&self) -> &Bytes {
        &self.custom_metadata
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.progress.snapshot().downloaded_bytes
    }

    /// 总大小，未知时为 `None`
    pub fn total_bytes(&self) -> Option<u64> {
        self.progress.snapshot().total_bytes
    }

    /// 估算的完成百分比，无法估算时为 `None`
    pub fn download_percentage(&self) -> Option<f32> {
        self.progress.snapshot().percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::action::TYPE_DASH;
    use crate::core::task::progress::SharedProgress;
    use chrono::{Duration, TimeZone};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn uri(path: &str) -> Url {
        Url::parse(&format!("https://media.example.com/{}", path)).unwrap()
    }

    fn key(p: u32, g: u32, tr: u32) -> StreamKey {
        StreamKey::new(p, g, tr)
    }

    fn action(keys: &[StreamKey]) -> DownloadAction {
        DownloadAction::new("movie", TYPE_DASH, uri("movie.mpd"))
            .with_keys(keys.iter().copied())
            .with_data(&b"meta"[..])
    }

    fn record_in(state: DownloadState, failure_reason: FailureReason) -> DownloadRecord {
        let mut parts = DownloadRecord::new_at(&action(&[key(0, 0, 0)]), t(1_000)).to_parts();
        parts.state = state;
        parts.failure_reason = failure_reason;
        DownloadRecord::from_parts(parts).unwrap()
    }

    #[test]
    fn test_new_record() {
        let request = action(&[key(0, 1, 0), key(0, 1, 0)]).with_cache_key("k");
        let record = DownloadRecord::new_at(&request, t(5_000));
        assert_eq!(record.id(), "movie");
        assert_eq!(record.content_type(), TYPE_DASH);
        assert_eq!(record.state(), DownloadState::Queued);
        assert_eq!(record.failure_reason(), FailureReason::None);
        assert_eq!(record.manual_stop_reason(), 0);
        assert!(record.unmet_requirements().is_empty());
        assert_eq!(record.start_time(), t(5_000));
        assert_eq!(record.update_time(), t(5_000));
        assert_eq!(record.stream_keys().len(), 1);
        assert_eq!(record.cache_key(), Some("k"));
        assert_eq!(record.custom_metadata().as_ref(), b"meta");
        assert_eq!(record.downloaded_bytes(), 0);
        assert_eq!(record.total_bytes(), None);
        assert_eq!(record.download_percentage(), None);
    }

    #[test]
    fn test_new_record_ignores_request_stop_values() {
        let request = action(&[]).with_manual_stop_reason(4)
            .with_unmet_requirements(RequirementFlags::NETWORK);
        let record = DownloadRecord::new_at(&request, t(0));
        assert_eq!(record.state(), DownloadState::Queued);
        assert_eq!(record.manual_stop_reason(), 0);
        assert!(record.unmet_requirements().is_empty());
    }

    #[test]
    fn test_effective_cache_key() {
        let record = DownloadRecord::new_at(&action(&[]), t(0));
        assert_eq!(record.effective_cache_key(), "https://media.example.com/movie.mpd");
        let record = DownloadRecord::new_at(&action(&[]).with_cache_key("custom"), t(0));
        assert_eq!(record.effective_cache_key(), "custom");
    }

    #[test]
    fn test_failure_reason_must_match_failed_state() {
        let mut parts = DownloadRecord::new_at(&action(&[]), t(0)).to_parts();
        parts.state = DownloadState::Failed;
        assert!(matches!(
            DownloadRecord::from_parts(parts.clone()),
            Err(RecordError::InvalidState { state: 4, failure_reason: 0, .. })
        ));

        parts.failure_reason = FailureReason::Unknown;
        assert!(DownloadRecord::from_parts(parts.clone()).is_ok());

        parts.state = DownloadState::Completed;
        assert!(DownloadRecord::from_parts(parts).is_err());
    }

    #[test]
    fn test_blocked_record_cannot_progress() {
        for state in [DownloadState::Queued, DownloadState::Downloading] {
            let mut parts = DownloadRecord::new_at(&action(&[]), t(0)).to_parts();
            parts.state = state;
            parts.manual_stop_reason = 1;
            assert!(DownloadRecord::from_parts(parts.clone()).is_err());

            parts.manual_stop_reason = 0;
            parts.unmet_requirements = RequirementFlags::DEVICE_IDLE;
            assert!(DownloadRecord::from_parts(parts).is_err());
        }

        let mut parts = DownloadRecord::new_at(&action(&[]), t(0)).to_parts();
        parts.state = DownloadState::Stopped;
        parts.manual_stop_reason = 1;
        assert!(DownloadRecord::from_parts(parts).is_ok());
    }

    #[test]
    fn test_merge_replaces_request_fields() {
        let record = DownloadRecord::new_at(&action(&[]).with_cache_key("old"), t(1_000));
        let request = DownloadAction::new("movie", TYPE_DASH, uri("other.mpd"))
            .with_data(&b"new"[..]);
        let merged = record.merge_action_at(&request, t(2_000)).unwrap();
        assert_eq!(merged.uri(), &uri("other.mpd"));
        assert_eq!(merged.cache_key(), None);
        assert_eq!(merged.custom_metadata().as_ref(), b"new");
        assert_eq!(merged.start_time(), t(1_000));
        assert_eq!(merged.update_time(), t(2_000));
    }

    #[test]
    fn test_merge_clears_failure() {
        let record = record_in(DownloadState::Failed, FailureReason::Unknown);
        let merged = record.merge_action_at(&action(&[]), t(2_000)).unwrap();
        assert_eq!(merged.failure_reason(), FailureReason::None);
        assert_eq!(merged.state(), DownloadState::Queued);
    }

    #[test]
    fn test_merge_restarts_pending_removal() {
        for state in [DownloadState::Removing, DownloadState::Restarting] {
            let record = record_in(state, FailureReason::None);
            let blocked = action(&[]).with_manual_stop_reason(2);
            let merged = record.merge_action_at(&blocked, t(2_000)).unwrap();
            assert_eq!(merged.state(), DownloadState::Restarting);
            let merged = record.merge_action_at(&action(&[]), t(2_000)).unwrap();
            assert_eq!(merged.state(), DownloadState::Restarting);
        }
    }

    #[test]
    fn test_merge_blocked_stops() {
        for state in [
            DownloadState::Queued,
            DownloadState::Downloading,
            DownloadState::Completed,
            DownloadState::Stopped,
        ] {
            let record = record_in(state, FailureReason::None);
            let request = action(&[]).with_unmet_requirements(RequirementFlags::DEVICE_CHARGING);
            let merged = record.merge_action_at(&request, t(2_000)).unwrap();
            assert_eq!(merged.state(), DownloadState::Stopped);
            assert_eq!(merged.unmet_requirements(), RequirementFlags::DEVICE_CHARGING);
        }
    }

    #[test]
    fn test_merge_completed_requeues() {
        let record = record_in(DownloadState::Completed, FailureReason::None);
        let merged = record.merge_action_at(&action(&[]), t(2_000)).unwrap();
        assert_eq!(merged.state(), DownloadState::Queued);
    }

    #[test]
    fn test_merge_rejects_mismatched_target() {
        let record = DownloadRecord::new_at(&action(&[]), t(0));
        let other_id = DownloadAction::new("other", TYPE_DASH, uri("movie.mpd"));
        assert!(matches!(
            record.merge_action_at(&other_id, t(1)),
            Err(RecordError::MismatchedTarget { field: "id", .. })
        ));
        let other_type = DownloadAction::new("movie", "hls", uri("movie.mpd"));
        assert!(matches!(
            record.merge_action_at(&other_type, t(1)),
            Err(RecordError::MismatchedTarget { field: "content_type", .. })
        ));
    }

    #[test]
    fn test_merge_never_moves_update_time_back() {
        let record = DownloadRecord::new_at(&action(&[]), t(10_000));
        let merged = record
            .merge_action_at(&action(&[]), t(10_000) - Duration::seconds(5))
            .unwrap();
        assert_eq!(merged.update_time(), t(10_000));
        let removed = merged.set_remove_state_at(t(1));
        assert_eq!(removed.update_time(), t(10_000));
    }

    #[test]
    fn test_set_remove_state_keeps_fields() {
        let request = action(&[key(0, 0, 1)]).with_cache_key("ck").with_manual_stop_reason(9);
        let record = DownloadRecord::new_at(&action(&[key(0, 0, 2)]), t(0))
            .merge_action_at(&request, t(100))
            .unwrap();
        assert_eq!(record.state(), DownloadState::Stopped);

        let removed = record.set_remove_state_at(t(200));
        assert_eq!(removed.state(), DownloadState::Removing);
        assert_eq!(removed.failure_reason(), FailureReason::None);
        assert_eq!(removed.update_time(), t(200));
        assert_eq!(removed.start_time(), record.start_time());
        assert_eq!(removed.uri(), record.uri());
        assert_eq!(removed.cache_key(), Some("ck"));
        assert_eq!(removed.manual_stop_reason(), 9);
        assert_eq!(removed.stream_keys(), record.stream_keys());
        assert_eq!(removed.custom_metadata(), record.custom_metadata());

        let twice = removed.set_remove_state_at(t(300));
        assert_eq!(twice.state(), DownloadState::Removing);
    }

    #[test]
    fn test_set_remove_state_clears_failure() {
        let record = record_in(DownloadState::Failed, FailureReason::Unknown);
        let removed = record.set_remove_state_at(t(5_000));
        assert_eq!(removed.state(), DownloadState::Removing);
        assert_eq!(removed.failure_reason(), FailureReason::None);
    }

    #[test]
    fn test_progress_reference_survives_transitions() {
        let shared = Arc::new(SharedProgress::new());
        let record = DownloadRecord::new_at(&action(&[]), t(0)).with_progress(shared.clone());
        shared.publish(ProgressSnapshot::from_counts(512, Some(2048)));
        assert_eq!(record.downloaded_bytes(), 512);
        assert_eq!(record.total_bytes(), Some(2048));
        assert_eq!(record.download_percentage(), Some(25.0));

        let merged = record.merge_action_at(&action(&[]), t(1)).unwrap();
        let removed = merged.set_remove_state_at(t(2));
        shared.add_downloaded(512);
        assert_eq!(removed.downloaded_bytes(), 1024);
        assert_eq!(removed.download_percentage(), Some(50.0));
    }
}
