use crate::core::task::{
    DownloadRecord, ProgressSnapshot, MANUAL_STOP_REASON_NONE, MANUAL_STOP_REASON_UNDEFINED,
};
use super::format_size;

const BAR_WIDTH: usize = 20;

/// 进度文本，例如 `[#####...............] 25% | 1.00 KB / 4.00 KB`
pub fn format_progress(progress: &ProgressSnapshot) -> String {
    let bar = match progress.percentage {
        Some(percentage) => {
            let ratio = percentage.clamp(0.0, 100.0) / 100.0;
            let filled = (ratio * BAR_WIDTH as f32).round() as usize;
            format!("[{}{}] {:.0}%", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled), percentage)
        }
        None => format!("[{}] --%", "?".repeat(BAR_WIDTH)),
    };
    let total = progress.total_bytes.map_or_else(|| "未知".to_string(), format_size);
    format!("{} | {} / {}", bar, format_size(progress.downloaded_bytes), total)
}

fn format_stop_reason(reason: i32) -> String {
    match reason {
        MANUAL_STOP_REASON_NONE => "无".to_string(),
        MANUAL_STOP_REASON_UNDEFINED => "未指定".to_string(),
        other => other.to_string(),
    }
}

/// 列表中的单行显示
pub fn record_line(record: &DownloadRecord) -> String {
    format!(
        "{:<12} {:<36} {:<12} {}",
        record.state(),
        record.id(),
        record.content_type(),
        format_progress(&record.progress())
    )
}

/// 记录的完整显示
pub fn describe_record(record: &DownloadRecord) -> String {
    let keys = if record.stream_keys().is_empty() {
        "全部".to_string()
    } else {
        record.stream_keys().iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
    };
    format!(
        "任务ID: {}\n\
        类型: {}\n\
        地址: {}\n\
        缓存键: {}\n\
        状态: {} ({})\n\
        失败原因: {}\n\
        未满足条件: {}\n\
        手动停止原因: {}\n\
        创建时间: {}\n\
        更新时间: {}\n\
        子流: {}\n\
        附加数据: {} 字节\n\
        进度: {}",
        record.id(),
        record.content_type(),
        record.uri(),
        record.effective_cache_key(),
        record.state(),
        record.state().code(),
        record.failure_reason(),
        record.unmet_requirements(),
        format_stop_reason(record.manual_stop_reason()),
        record.start_time().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        record.update_time().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        keys,
        record.custom_metadata().len(),
        format_progress(&record.progress()),
    )
}
