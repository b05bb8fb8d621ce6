//! Store: 以 JSON 文件保存下载记录
//!
//! 记录按 id 保存在内存中，每次变更后整体写回文件。
//! 状态迁移本身全部委托给 [`DownloadRecord`]。

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{DownloadError, DownloadResult};
use crate::core::task::{DownloadAction, DownloadRecord, StoredRecord};

pub struct RecordStore {
    path: PathBuf,
    records: HashMap<String, DownloadRecord>,
}

impl RecordStore {
    /// 打开记录文件，不存在时从空集合开始
    pub fn open(path: impl AsRef<Path>) -> DownloadResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = HashMap::new();
        if path.exists() {
            let data = fs::read_to_string(&path)?;
            let list: Vec<StoredRecord> = serde_json::from_str(&data)?;
            for stored in list {
                let record = DownloadRecord::try_from(stored)?;
                records.insert(record.id().to_string(), record);
            }
            info!("从 {} 加载了 {} 条下载记录", path.display(), records.len());
        }
        Ok(Self { path, records })
    }

    pub fn save(&self) -> DownloadResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let list: Vec<StoredRecord> = self.list().into_iter().map(StoredRecord::from).collect();
        let json = serde_json::to_string_pretty(&list)?;
        fs::write(&self.path, json)?;
        info!("已保存 {} 条下载记录到 {}", list.len(), self.path.display());
        Ok(())
    }

    /// 新 id 创建记录，已有 id 则合并请求
    pub fn apply(&mut self, action: &DownloadAction) -> DownloadResult<DownloadRecord> {
        self.apply_at(action, Utc::now())
    }

    pub fn apply_at(
        &mut self,
        action: &DownloadAction,
        now: DateTime<Utc>,
    ) -> DownloadResult<DownloadRecord> {
        let record = match self.records.get(&action.id) {
            Some(existing) => existing.merge_action_at(action, now)?,
            None => DownloadRecord::new_at(action, now),
        };
        self.commit(record.clone())?;
        Ok(record)
    }

    /// 把已有记录标记为删除中
    pub fn request_removal(&mut self, id: &str) -> DownloadResult<DownloadRecord> {
        self.request_removal_at(id, Utc::now())
    }

    pub fn request_removal_at(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DownloadResult<DownloadRecord> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))?
            .set_remove_state_at(now);
        self.commit(record.clone())?;
        Ok(record)
    }

    /// 从存储中彻底删除记录
    pub fn delete(&mut self, id: &str) -> DownloadResult<bool> {
        let Some(removed) = self.records.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.save() {
            self.records.insert(id.to_string(), removed);
            return Err(e);
        }
        Ok(true)
    }

    /// 写入记录并保存，保存失败时恢复内存中的旧值
    fn commit(&mut self, record: DownloadRecord) -> DownloadResult<()> {
        let id = record.id().to_string();
        let previous = self.records.insert(id.clone(), record);
        if let Err(e) = self.save() {
            warn!("保存下载记录 {} 失败，已回滚: {}", id, e);
            match previous {
                Some(previous) => self.records.insert(id, previous),
                None => self.records.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DownloadRecord> {
        self.records.get(id)
    }

    /// 按创建时间、id 排序
    pub fn list(&self) -> Vec<&DownloadRecord> {
        let mut list: Vec<&DownloadRecord> = self.records.values().collect();
        list.sort_by(|a, b| a.start_time().cmp(&b.start_time()).then_with(|| a.id().cmp(b.id())));
        list
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
