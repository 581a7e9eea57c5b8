//! 档案索引持久化
//!
//! 将档案库（文本、技能元数据、向量）写入/从 JSON 文件加载，重启后不必重新抽取技能和编码。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::MatchError;
use crate::retrieval::{IndexedProfile, InMemoryProfileStore};

const INDEX_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    profiles: Vec<IndexedProfile>,
}

/// 单文件 JSON 索引
#[derive(Debug, Clone)]
pub struct ProfileIndex {
    path: PathBuf,
}

impl ProfileIndex {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从 JSON 文件加载档案；文件不存在时返回空 Vec
    pub fn load(&self) -> Result<Vec<IndexedProfile>, MatchError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| MatchError::Index(format!("{}: {}", self.path.display(), e)))?;
        let file: IndexFile = serde_json::from_str(&data)
            .map_err(|e| MatchError::Index(format!("{}: {}", self.path.display(), e)))?;
        if file.version != INDEX_VERSION {
            return Err(MatchError::Index(format!(
                "unsupported index version {} (expected {})",
                file.version, INDEX_VERSION
            )));
        }
        Ok(file.profiles)
    }

    /// 将档案写入 JSON 文件；父目录不存在时自动创建
    pub fn save(&self, profiles: &[IndexedProfile]) -> Result<(), MatchError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MatchError::Index(e.to_string()))?;
            }
        }
        let file = IndexFile {
            version: INDEX_VERSION,
            profiles: profiles.to_vec(),
        };
        let json =
            serde_json::to_string_pretty(&file).map_err(|e| MatchError::Index(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| MatchError::Index(e.to_string()))?;
        Ok(())
    }

    /// 把索引文件中的档案装入内存档案库，返回装入条数
    pub fn load_into(&self, store: &InMemoryProfileStore) -> Result<usize, MatchError> {
        let profiles = self.load()?;
        let n = profiles.len();
        for profile in profiles {
            store.insert_indexed(profile)?;
        }
        Ok(n)
    }
}
