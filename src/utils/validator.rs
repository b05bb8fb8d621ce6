use url::Url;

use crate::core::error::{DownloadError, DownloadResult};

const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "file", "content"];

/// 解析并校验内容地址
pub fn parse_locator(uri: &str) -> DownloadResult<Url> {
    let url = Url::parse(uri.trim())
        .map_err(|e| DownloadError::invalid_url(format!("{}: {}", uri, e)))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(DownloadError::invalid_url(format!("不支持的协议: {}", url.scheme())));
    }
    Ok(url)
}

pub fn validate_id(id: &str) -> DownloadResult<()> {
    if id.trim().is_empty() {
        return Err(DownloadError::invalid_request("任务ID不能为空"));
    }
    if id.chars().any(char::is_control) {
        return Err(DownloadError::invalid_request("任务ID不能包含控制字符"));
    }
    Ok(())
}

pub fn validate_content_type(content_type: &str) -> DownloadResult<()> {
    if content_type.trim().is_empty() {
        return Err(DownloadError::invalid_request("内容类型不能为空"));
    }
    Ok(())
}
