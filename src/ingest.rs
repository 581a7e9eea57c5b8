//! 档案目录导入
//!
//! 只读取纯文本档案（.txt / .md）；PDF、DOCX 等二进制格式需先在外部转换为文本。
//! 候选人 id 取文件名主干按 `_` 切分后的最后一段：`cv_john_E102.txt` -> `E102`。

use std::path::Path;

use walkdir::WalkDir;

use crate::core::MatchError;
use crate::retrieval::IndexedProfile;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// 从文件名推导候选人 id
pub fn candidate_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.split('.').next().unwrap_or(stem);
    let id = stem.rsplit('_').next().unwrap_or(stem).trim();
    (!id.is_empty()).then(|| id.to_string())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// 读取目录（不递归）下的全部文本档案，按文件名排序
pub fn load_profiles(dir: &Path) -> Result<Vec<IndexedProfile>, MatchError> {
    if !dir.is_dir() {
        return Err(MatchError::Index(format!(
            "profiles dir not found: {}",
            dir.display()
        )));
    }

    let mut profiles = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MatchError::Index(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_supported(path) {
            tracing::debug!(path = %path.display(), "skipping unsupported profile format");
            continue;
        }
        let Some(id) = candidate_id_from_path(path) else {
            tracing::warn!(path = %path.display(), "cannot derive candidate id, skipped");
            continue;
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Index(format!("{}: {}", path.display(), e)))?;
        if text.trim().is_empty() {
            tracing::warn!(path = %path.display(), "empty profile, skipped");
            continue;
        }
        profiles.push(IndexedProfile::new(id, text));
    }
    Ok(profiles)
}
