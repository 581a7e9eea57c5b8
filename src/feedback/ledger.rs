//! 反馈台账：每位员工的历史项目分配决定（accepted / rejected ...）
//!
//! 台账只追加、由外部拥有；匹配运行只读。读失败（文件还没建、表不存在）是正常情况，
//! 由 AcceptanceEstimator 退回中性先验。

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};

use crate::core::MatchError;

/// 一条反馈记录
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub candidate_id: String,
    pub decision: String,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(candidate_id: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            decision: decision.into(),
            recorded_at: Utc::now(),
        }
    }

    /// 决定是否为 accepted（只忽略大小写）
    pub fn is_accepted(&self) -> bool {
        self.decision.to_lowercase() == "accepted"
    }
}

/// 反馈台账 trait；多个运行并发读取，读路径不得加全局锁
pub trait FeedbackLedger: Send + Sync {
    /// 某候选人的全部记录；Err 表示台账不可用
    fn records_for(&self, candidate_id: &str) -> Result<Vec<FeedbackRecord>, MatchError>;

    /// 追加一条记录
    fn append(&self, record: FeedbackRecord) -> Result<(), MatchError>;
}

/// 内存台账（测试 / 演示）
#[derive(Debug, Default)]
pub struct InMemoryFeedbackLedger {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<FeedbackRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeedbackLedger for InMemoryFeedbackLedger {
    fn records_for(&self, candidate_id: &str) -> Result<Vec<FeedbackRecord>, MatchError> {
        let records = self
            .records
            .read()
            .map_err(|e| MatchError::Ledger(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|r| r.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    fn append(&self, record: FeedbackRecord) -> Result<(), MatchError> {
        self.records
            .write()
            .map_err(|e| MatchError::Ledger(e.to_string()))?
            .push(record);
        Ok(())
    }
}

/// SQLite 台账：写时按需建库建表；读时每次以只读方式打开，互不阻塞
#[derive(Debug, Clone)]
pub struct SqliteFeedbackLedger {
    path: PathBuf,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id TEXT NOT NULL,
    decision TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_candidate ON feedback(candidate_id);";

impl SqliteFeedbackLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_write(&self) -> Result<Connection, MatchError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MatchError::Ledger(e.to_string()))?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    fn open_for_read(&self) -> Result<Connection, MatchError> {
        if !self.path.exists() {
            return Err(MatchError::Ledger(format!(
                "ledger not found: {}",
                self.path.display()
            )));
        }
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

impl FeedbackLedger for SqliteFeedbackLedger {
    fn records_for(&self, candidate_id: &str) -> Result<Vec<FeedbackRecord>, MatchError> {
        let conn = self.open_for_read()?;
        let mut stmt = conn.prepare(
            "SELECT candidate_id, decision, recorded_at FROM feedback
             WHERE candidate_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![candidate_id], |row| {
            Ok(FeedbackRecord {
                candidate_id: row.get(0)?,
                decision: row.get(1)?,
                recorded_at: row.get(2)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn append(&self, record: FeedbackRecord) -> Result<(), MatchError> {
        let conn = self.open_for_write()?;
        conn.execute(
            "INSERT INTO feedback (candidate_id, decision, recorded_at) VALUES (?1, ?2, ?3)",
            params![record.candidate_id, record.decision, record.recorded_at],
        )?;
        Ok(())
    }
}
