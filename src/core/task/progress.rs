use serde::{Serialize, Deserialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// 进度快照：已下载字节、总大小（可能未知）、完成百分比（可能无法估计）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub percentage: Option<f32>,
}

impl ProgressSnapshot {
    /// 根据字节数构造快照，总大小未知时百分比不可用
    pub fn from_counts(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        let percentage = match total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((downloaded_bytes.min(total) as f64 / total as f64 * 100.0) as f32),
            None => None,
        };
        Self { downloaded_bytes, total_bytes, percentage }
    }
}

/// 进度提供方
///
/// 由负责实际传输的组件实现并注入记录，记录只读取。
pub trait ProgressSource: Send + Sync {
    fn snapshot(&self) -> ProgressSnapshot;
}

impl ProgressSource for ProgressSnapshot {
    fn snapshot(&self) -> ProgressSnapshot {
        *self
    }
}

impl fmt::Debug for dyn ProgressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}

const TOTAL_UNSET: u64 = u64::MAX;
const PERCENTAGE_UNSET: u32 = u32::MAX;

/// 传输组件写入、记录读取的共享计数器
#[derive(Debug)]
pub struct SharedProgress {
    downloaded: AtomicU64,
    total: AtomicU64,
    percentage: AtomicU32,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            downloaded: AtomicU64::new(0),
            total: AtomicU64::new(TOTAL_UNSET),
            percentage: AtomicU32::new(PERCENTAGE_UNSET),
        }
    }

    /// 发布一份新的快照
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        self.downloaded.store(snapshot.downloaded_bytes, Ordering::SeqCst);
        self.total.store(snapshot.total_bytes.unwrap_or(TOTAL_UNSET), Ordering::SeqCst);
        self.percentage.store(
            snapshot.percentage.map_or(PERCENTAGE_UNSET, f32::to_bits),
            Ordering::SeqCst,
        );
    }

    /// 累加已下载字节并重新计算百分比
    ///
    /// 多个线程可以同时调用，已下载字节只通过原子累加更新。
    pub fn add_downloaded(&self, bytes: u64) {
        let previous = self
            .downloaded
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(bytes))
            })
            .unwrap_or_else(|previous| previous);
        let downloaded = previous.saturating_add(bytes);
        let total = match self.total.load(Ordering::SeqCst) {
            TOTAL_UNSET => return,
            total => total,
        };
        let snapshot = ProgressSnapshot::from_counts(downloaded, Some(total));
        if let Some(percentage) = snapshot.percentage {
            // 非负浮点数的位模式与数值同序，较晚的线程不会把百分比写小
            let bits = percentage.to_bits();
            let _ = self.percentage.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current == PERCENTAGE_UNSET || bits > current).then_some(bits)
            });
        }
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSource for SharedProgress {
    fn snapshot(&self) -> ProgressSnapshot {
        let total = self.total.load(Ordering::SeqCst);
        let percentage = self.percentage.load(Ordering::SeqCst);
        ProgressSnapshot {
            downloaded_bytes: self.downloaded.load(Ordering::SeqCst),
            total_bytes: (total != TOTAL_UNSET).then_some(total),
            percentage: (percentage != PERCENTAGE_UNSET).then(|| f32::from_bits(percentage)),
        }
    }
}
