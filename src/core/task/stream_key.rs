use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// 选中下载的子流（周期 / 轨道组 / 轨道）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    pub period_index: u32,
    pub group_index: u32,
    pub track_index: u32,
}

impl StreamKey {
    pub fn new(period_index: u32, group_index: u32, track_index: u32) -> Self {
        Self { period_index, group_index, track_index }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.period_index, self.group_index, self.track_index)
    }
}

impl FromStr for StreamKey {
    type Err = String;

    /// 解析 `period.group.track` 形式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("流标识格式应为 period.group.track: {}", s));
        }
        let parse = |p: &str| p.parse::<u32>().map_err(|e| format!("无效的流标识 {}: {}", s, e));
        Ok(StreamKey::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

/// 合并子流选择
///
/// 空集合表示下载全部内容：已有记录为空时保持为空，新请求为空时扩大为空，
/// 否则取并集。
pub fn merge_stream_keys(
    current: &BTreeSet<StreamKey>,
    requested: &[StreamKey],
) -> BTreeSet<StreamKey> {
    if current.is_empty() || requested.is_empty() {
        return BTreeSet::new();
    }
    current.iter().chain(requested.iter()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[(u32, u32, u32)]) -> Vec<StreamKey> {
        list.iter().map(|&(p, g, t)| StreamKey::new(p, g, t)).collect()
    }

    #[test]
    fn test_parse_and_display() {
        let key: StreamKey = "1.2.3".parse().unwrap();
        assert_eq!(key, StreamKey::new(1, 2, 3));
        assert_eq!(key.to_string(), "1.2.3");
        assert!("1.2".parse::<StreamKey>().is_err());
        assert!("1.x.3".parse::<StreamKey>().is_err());
        assert!("1.2.3.4".parse::<StreamKey>().is_err());
    }

    #[test]
    fn test_merge_everything_is_sticky() {
        let current = BTreeSet::new();
        let merged = merge_stream_keys(&current, &keys(&[(0, 0, 1)]));
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_empty_request_widens() {
        let current: BTreeSet<_> = keys(&[(0, 0, 1), (0, 1, 0)]).into_iter().collect();
        let merged = merge_stream_keys(&current, &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_union_deduplicates() {
        let current: BTreeSet<_> = keys(&[(0, 0, 1), (0, 1, 0)]).into_iter().collect();
        let merged = merge_stream_keys(&current, &keys(&[(0, 1, 0), (1, 0, 0), (1, 0, 0)]));
        let expected: BTreeSet<_> = keys(&[(0, 0, 1), (0, 1, 0), (1, 0, 0)]).into_iter().collect();
        assert_eq!(merged, expected);
    }
}
