//! 错误记忆持久化
//!
//! 单文件 JSON：按类别保存错误记录与运行计数。每个操作都是「读 → 改 → 写」整文件；
//! 不加锁，仅适用于单进程顺序使用。读失败回退为空快照，写失败记录日志后丢弃。

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::AppConfig;
use crate::core::{LearningStats, MemorySnapshot, Mistake};

/// 错误记忆存储：路径、容量上限、反复出现阈值
#[derive(Debug, Clone)]
pub struct MistakeStore {
    path: PathBuf,
    max_mistakes: usize,
    recurrence_threshold: u32,
}

impl MistakeStore {
    pub fn new(path: impl AsRef<Path>, max_mistakes: usize, recurrence_threshold: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_mistakes,
            recurrence_threshold,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.mistakes_file(),
            cfg.memory.max_mistakes_stored,
            cfg.memory.recurrence_threshold,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照；文件不存在或无法解析时返回空快照（版本 1.0，计数为 0）
    pub fn load(&self) -> MemorySnapshot {
        if !self.path.exists() {
            return MemorySnapshot::default();
        }
        match self.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to load mistakes, starting empty");
                MemorySnapshot::default()
            }
        }
    }

    fn read(&self) -> anyhow::Result<MemorySnapshot> {
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data).context("parse mistakes file")?;
        Ok(snapshot)
    }

    /// 整体覆盖写入；失败仅记录日志
    pub fn save(&self, snapshot: &MemorySnapshot) {
        if let Err(e) = self.write(snapshot) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save mistakes");
        }
    }

    /// 先写临时文件再 rename，避免写到一半留下残缺文件；父目录不存在时自动创建
    fn write(&self, snapshot: &MemorySnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// 合并新错误：同类别已存在则频次递增并更新时间戳，否则追加；超出上限时只保留频次最高的
    pub fn add_mistakes(&self, new_mistakes: &[Mistake]) {
        let mut snapshot = self.load();

        for new in new_mistakes {
            match snapshot
                .mistakes
                .iter_mut()
                .find(|m| m.mistake_type == new.mistake_type)
            {
                Some(existing) => {
                    existing.frequency = existing.frequency.saturating_add(new.frequency.max(1));
                    existing.timestamp = new.timestamp;
                }
                None => snapshot.mistakes.push(new.clone()),
            }
        }

        if snapshot.mistakes.len() > self.max_mistakes {
            // 稳定排序：同频次时保留先记录的
            snapshot.mistakes.sort_by(|a, b| b.frequency.cmp(&a.frequency));
            snapshot.mistakes.truncate(self.max_mistakes);
        }

        self.save(&snapshot);
    }

    /// 频次达到阈值的错误
    pub fn recurring_mistakes(&self) -> Vec<Mistake> {
        self.load()
            .mistakes
            .into_iter()
            .filter(|m| m.frequency >= self.recurrence_threshold)
            .collect()
    }

    pub fn update_stats(&self, success: bool) {
        let mut snapshot = self.load();
        snapshot.total_runs += 1;
        if success {
            snapshot.successful_runs += 1;
        }
        self.save(&snapshot);
    }

    pub fn get_stats(&self) -> LearningStats {
        let snapshot = self.load();
        let total = snapshot.total_runs;
        let successful = snapshot.successful_runs.min(total);

        LearningStats {
            total_runs: total,
            successful_runs: successful,
            failed_runs: total - successful,
            success_rate: if total > 0 {
                successful as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            total_mistakes: snapshot.mistakes.len(),
            recurring_patterns: snapshot
                .mistakes
                .iter()
                .filter(|m| m.frequency >= self.recurrence_threshold)
                .count(),
        }
    }

    /// 清空：覆盖为空快照（计数一并归零）
    pub fn clear(&self) {
        self.save(&MemorySnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MistakeKind;
    use chrono::NaiveDate;

    fn mistake(kind: MistakeKind, frequency: u32, minute: u32) -> Mistake {
        Mistake {
            mistake_type: kind,
            description: format!("{kind} happened"),
            corrective_rule: format!("avoid {kind}"),
            frequency,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(12, minute, 0))
                .unwrap(),
            question: "What is the capital of France?".to_string(),
        }
    }

    fn store(dir: &tempfile::TempDir, cap: usize) -> MistakeStore {
        MistakeStore::new(dir.path().join("data").join("mistakes.json"), cap, 2)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snap = store(&dir, 100).load();
        assert_eq!(snap, MemorySnapshot::default());
    }

    #[test]
    fn test_garbled_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 100);
        std::fs::create_dir_all(s.path().parent().unwrap()).unwrap();
        std::fs::write(s.path(), "{not json").unwrap();
        assert_eq!(s.load(), MemorySnapshot::default());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 100);
        let snap = MemorySnapshot {
            mistakes: vec![
                mistake(MistakeKind::ToolSkipped, 3, 1),
                mistake(MistakeKind::WrongOrder, 1, 2),
            ],
            version: "1.0".to_string(),
            total_runs: 7,
            successful_runs: 4,
        };
        s.save(&snap);
        assert_eq!(s.load(), snap);
    }

    #[test]
    fn test_same_category_merges_into_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 100);
        s.add_mistakes(&[
            mistake(MistakeKind::ToolSkipped, 1, 1),
            mistake(MistakeKind::ToolSkipped, 1, 5),
        ]);

        let snap = s.load();
        assert_eq!(snap.mistakes.len(), 1);
        assert_eq!(snap.mistakes[0].frequency, 2);
        assert_eq!(snap.mistakes[0].timestamp, mistake(MistakeKind::ToolSkipped, 1, 5).timestamp);
    }

    #[test]
    fn test_cap_evicts_least_frequent() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 2);
        s.save(&MemorySnapshot {
            mistakes: vec![
                mistake(MistakeKind::WrongOrder, 1, 1),
                mistake(MistakeKind::ToolSkipped, 5, 2),
            ],
            ..MemorySnapshot::default()
        });
        s.add_mistakes(&[mistake(MistakeKind::PrematureAnswer, 3, 3)]);

        let kinds: Vec<_> = s.load().mistakes.iter().map(|m| m.mistake_type).collect();
        assert_eq!(kinds, vec![MistakeKind::ToolSkipped, MistakeKind::PrematureAnswer]);
    }

    #[test]
    fn test_stats_with_zero_runs() {
        let dir = tempfile::tempdir().unwrap();
        let stats = store(&dir, 100).get_stats();
        assert_eq!(stats.total_runs, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.failed_runs, 0);
    }

    #[test]
    fn test_update_stats_and_recurring() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 100);
        s.update_stats(true);
        s.update_stats(false);
        s.update_stats(false);
        s.add_mistakes(&[mistake(MistakeKind::ToolSkipped, 1, 1)]);
        s.add_mistakes(&[mistake(MistakeKind::ToolSkipped, 1, 2), mistake(MistakeKind::WrongOrder, 1, 2)]);

        let stats = s.get_stats();
        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.successful_runs, 1);
        assert_eq!(stats.failed_runs, 2);
        assert!((stats.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.total_mistakes, 2);
        assert_eq!(stats.recurring_patterns, 1);
        assert_eq!(s.recurring_mistakes()[0].mistake_type, MistakeKind::ToolSkipped);
    }

    #[test]
    fn test_clear_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir, 100);
        s.update_stats(true);
        s.add_mistakes(&[mistake(MistakeKind::WrongOrder, 1, 1)]);
        s.clear();
        assert_eq!(s.load(), MemorySnapshot::default());
    }
}
