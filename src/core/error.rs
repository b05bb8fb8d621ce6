use thiserror::Error;
use std::borrow::Cow;
use std::io;

/// 下载记录核心层的错误
///
/// 全部属于调用方违反契约的情况，核心层不会重试，也不会静默修正。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("非法的记录状态: state={state}, failure_reason={failure_reason}, manual_stop_reason={manual_stop_reason}, unmet_requirements={unmet_requirements:#x}")]
    InvalidState {
        state: i32,
        failure_reason: i32,
        manual_stop_reason: i32,
        unmet_requirements: u32,
    },

    #[error("请求目标不匹配: {field} 预期 {expected}, 实际 {actual}")]
    MismatchedTarget {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("无效的枚举值: {kind} = {value}")]
    InvalidEnumValue {
        kind: &'static str,
        value: i32,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON格式错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置文件格式错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("无法序列化配置: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("下载记录不存在: {0}")]
    NotFound(String),

    #[error("无效的URL: {0}")]
    InvalidUrl(Cow<'static, str>),

    #[error("无效的下载请求: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("配置无效: {0}")]
    Config(Cow<'static, str>),
}

impl DownloadError {
    pub fn invalid_url(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::InvalidUrl(msg.into())
    }

    pub fn invalid_request(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        DownloadError::Config(msg.into())
    }

    /// 调用方违反契约或数据已损坏，重试没有意义
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::Record(_) |
            DownloadError::Json(_) |
            DownloadError::InvalidUrl(_) |
            DownloadError::InvalidRequest(_)
        )
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

pub type DownloadResult<T> = Result<T, DownloadError>;
