use serde::{Serialize, Deserialize};
use std::fmt;

use crate::core::error::{RecordError, RecordResult};

/// 下载任务状态
///
/// 数值编码会被持久化，不能修改或复用。6 未分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum DownloadState {
    /// 等待开始
    Queued = 0,
    /// 已停止
    Stopped = 1,
    /// 正在下载
    Downloading = 2,
    /// 下载完成
    Completed = 3,
    /// 下载失败
    Failed = 4,
    /// 正在删除
    Removing = 5,
    /// 删除已下载数据后重新开始
    Restarting = 7,
}

impl DownloadState {
    pub const ALL: [DownloadState; 7] = [
        DownloadState::Queued,
        DownloadState::Stopped,
        DownloadState::Downloading,
        DownloadState::Completed,
        DownloadState::Failed,
        DownloadState::Removing,
        DownloadState::Restarting,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            DownloadState::Queued => "QUEUED",
            DownloadState::Stopped => "STOPPED",
            DownloadState::Downloading => "DOWNLOADING",
            DownloadState::Completed => "COMPLETED",
            DownloadState::Failed => "FAILED",
            DownloadState::Removing => "REMOVING",
            DownloadState::Restarting => "RESTARTING",
        }
    }

    /// 删除流程尚未结束
    pub fn is_removal_pending(self) -> bool {
        matches!(self, DownloadState::Removing | DownloadState::Restarting)
    }

    /// 合并新请求后的下一个状态
    pub fn next_on_merge(self, blocked: bool) -> DownloadState {
        if self.is_removal_pending() {
            DownloadState::Restarting
        } else if blocked {
            DownloadState::Stopped
        } else {
            DownloadState::Queued
        }
    }
}

impl From<DownloadState> for i32 {
    fn from(state: DownloadState) -> Self {
        state.code()
    }
}

impl TryFrom<i32> for DownloadState {
    type Error = RecordError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DownloadState::Queued),
            1 => Ok(DownloadState::Stopped),
            2 => Ok(DownloadState::Downloading),
            3 => Ok(DownloadState::Completed),
            4 => Ok(DownloadState::Failed),
            5 => Ok(DownloadState::Removing),
            7 => Ok(DownloadState::Restarting),
            _ => Err(RecordError::InvalidEnumValue { kind: "state", value }),
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// 失败原因，只有 `Failed` 状态才会携带非 `None` 的值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum FailureReason {
    #[default]
    None = 0,
    Unknown = 1,
}

impl FailureReason {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureReason::None => "NO_REASON",
            FailureReason::Unknown => "UNKNOWN_REASON",
        }
    }
}

impl From<FailureReason> for i32 {
    fn from(reason: FailureReason) -> Self {
        reason.code()
    }
}

impl TryFrom<i32> for FailureReason {
    type Error = RecordError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FailureReason::None),
            1 => Ok(FailureReason::Unknown),
            _ => Err(RecordError::InvalidEnumValue { kind: "failure_reason", value }),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// 持久化状态码对应的显示名称
pub fn state_label(code: i32) -> RecordResult<&'static str> {
    DownloadState::try_from(code).map(DownloadState::label)
}

/// 持久化失败原因码对应的显示名称
pub fn failure_label(code: i32) -> RecordResult<&'static str> {
    FailureReason::try_from(code).map(FailureReason::label)
}

/// 未被手动停止
pub const MANUAL_STOP_REASON_NONE: i32 = 0;
/// 被手动停止，但未给出原因
pub const MANUAL_STOP_REASON_UNDEFINED: i32 = i32::MAX;

/// 阻止下载继续进行的外部条件（由调度器给出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementFlags(u32);

impl RequirementFlags {
    pub const NONE: RequirementFlags = RequirementFlags(0);
    pub const NETWORK: RequirementFlags = RequirementFlags(1);
    pub const NETWORK_UNMETERED: RequirementFlags = RequirementFlags(1 << 1);
    pub const DEVICE_IDLE: RequirementFlags = RequirementFlags(1 << 2);
    pub const DEVICE_CHARGING: RequirementFlags = RequirementFlags(1 << 3);
    pub const DEVICE_STORAGE_NOT_LOW: RequirementFlags = RequirementFlags(1 << 4);

    const NAMES: [(RequirementFlags, &'static str); 5] = [
        (RequirementFlags::NETWORK, "NETWORK"),
        (RequirementFlags::NETWORK_UNMETERED, "NETWORK_UNMETERED"),
        (RequirementFlags::DEVICE_IDLE, "DEVICE_IDLE"),
        (RequirementFlags::DEVICE_CHARGING, "DEVICE_CHARGING"),
        (RequirementFlags::DEVICE_STORAGE_NOT_LOW, "DEVICE_STORAGE_NOT_LOW"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        RequirementFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: RequirementFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: RequirementFlags) -> Self {
        RequirementFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for RequirementFlags {
    type Output = RequirementFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for RequirementFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut known = 0;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                known |= flag.0;
                first = false;
            }
        }
        // 未命名的位按十六进制输出
        let rest = self.0 & !known;
        if rest != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{:#x}", rest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_are_stable() {
        let codes: Vec<i32> = DownloadState::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 7]);
        for state in DownloadState::ALL {
            assert_eq!(DownloadState::try_from(state.code()), Ok(state));
        }
    }

    #[test]
    fn test_unassigned_state_code_rejected() {
        for code in [-1, 6, 8, i32::MAX] {
            assert_eq!(
                DownloadState::try_from(code),
                Err(RecordError::InvalidEnumValue { kind: "state", value: code })
            );
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(state_label(0), Ok("QUEUED"));
        assert_eq!(state_label(5), Ok("REMOVING"));
        assert_eq!(state_label(7), Ok("RESTARTING"));
        assert!(state_label(6).is_err());
        assert_eq!(failure_label(0), Ok("NO_REASON"));
        assert_eq!(failure_label(1), Ok("UNKNOWN_REASON"));
        assert!(matches!(
            failure_label(2),
            Err(RecordError::InvalidEnumValue { kind: "failure_reason", value: 2 })
        ));
        assert_eq!(DownloadState::Downloading.to_string(), "DOWNLOADING");
    }

    #[test]
    fn test_serialized_as_integer() {
        assert_eq!(serde_json::to_string(&DownloadState::Restarting).unwrap(), "7");
        assert_eq!(serde_json::to_string(&FailureReason::Unknown).unwrap(), "1");
        let state: DownloadState = serde_json::from_str("3").unwrap();
        assert_eq!(state, DownloadState::Completed);
        assert!(serde_json::from_str::<DownloadState>("6").is_err());
        assert!(serde_json::from_str::<FailureReason>("5").is_err());
    }

    #[test]
    fn test_next_on_merge_table() {
        for state in DownloadState::ALL {
            let expected_blocked = if state.is_removal_pending() {
                DownloadState::Restarting
            } else {
                DownloadState::Stopped
            };
            let expected_free = if state.is_removal_pending() {
                DownloadState::Restarting
            } else {
                DownloadState::Queued
            };
            assert_eq!(state.next_on_merge(true), expected_blocked);
            assert_eq!(state.next_on_merge(false), expected_free);
        }
    }

    #[test]
    fn test_requirement_flags() {
        let flags = RequirementFlags::NETWORK | RequirementFlags::DEVICE_CHARGING;
        assert!(flags.contains(RequirementFlags::NETWORK));
        assert!(!flags.contains(RequirementFlags::DEVICE_IDLE));
        assert_eq!(flags.bits(), 9);
        assert_eq!(flags.to_string(), "NETWORK|DEVICE_CHARGING");
        assert_eq!(RequirementFlags::NONE.to_string(), "NONE");
        assert_eq!(RequirementFlags::from_bits(1 | 64).to_string(), "NETWORK|0x40");
    }
}
