//! Canonical JSON writer for the extracted meta-data documents.
//!
//! Every document is pretty-printed with two-space indentation, keeps
//! non-ASCII text as-is, and replaces any existing file atomically
//! (write to a hidden temp sibling, then rename).

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use edumeta_shared::{
    EduMetaError, ITEMS_FILE, ItemRecord, KNOW_ITEM_FILE, KnowledgeIndex, LEARNING_ORDER_FILE,
    LearningOrder, Result,
};

/// Metadata for a single written document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Render a value as the canonical document text.
pub fn render_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| EduMetaError::validation(format!("JSON serialization failed: {e}")))
}

/// Serialize `data` to `path`, creating parent directories and
/// overwriting any existing file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<ArtifactMeta> {
    let content = render_json(data)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            EduMetaError::validation(format!("output path '{}' has no file name", path.display()))
        })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| EduMetaError::io(&parent, e))?;

    let temp = parent.join(format!(".{filename}.tmp"));
    std::fs::write(&temp, &content).map_err(|e| EduMetaError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        EduMetaError::io(path, e)
    })?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %filename, size = content.len(), "wrote JSON document");

    Ok(ArtifactMeta {
        filename,
        path: path.to_path_buf(),
        sha256,
        size_bytes: content.len(),
    })
}

/// Write `learning_order.json`, `items.json` and `know_item.json` into
/// `output_dir`, in that order.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn write_meta(
    output_dir: &Path,
    learning_order: &LearningOrder,
    items: &[ItemRecord],
    know_item: &KnowledgeIndex,
) -> Result<Vec<ArtifactMeta>> {
    let metas = vec![
        write_json(&output_dir.join(LEARNING_ORDER_FILE), learning_order)?,
        write_json(&output_dir.join(ITEMS_FILE), items)?,
        write_json(&output_dir.join(KNOW_ITEM_FILE), know_item)?,
    ];

    info!(count = metas.len(), "meta-data documents written");
    Ok(metas)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "edumeta-artifacts-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn item(id: i64, knowledge: i64, difficulty: f64) -> ItemRecord {
        ItemRecord {
            id,
            knowledge,
            difficulty,
            content: serde_json::Map::new(),
        }
    }

    #[test]
    fn render_uses_two_space_indent() {
        let text = render_json(&vec![item(10, 1, 0.5)]).unwrap();
        assert_eq!(
            text,
            "[\n  {\n    \"id\": 10,\n    \"knowledge\": 1,\n    \"difficulty\": 0.5,\n    \"content\": {}\n  }\n]"
        );
    }

    #[test]
    fn render_preserves_non_ascii() {
        let text = render_json(&serde_json::json!({"name": "分数 ≥ ½"})).unwrap();
        assert!(text.contains("分数 ≥ ½"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn write_json_creates_missing_parents() {
        let tmp = temp_dir();
        let path = tmp.join("nested/deeper/learning_order.json");

        let meta = write_json(&path, &LearningOrder(vec![3, 1, 2])).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\n  3,\n  1,\n  2\n]");
        assert_eq!(meta.filename, "learning_order.json");
        assert_eq!(meta.sha256.len(), 64);
        assert_eq!(meta.size_bytes, 17);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_json_overwrites_existing_file() {
        let tmp = temp_dir();
        let path = tmp.join("items.json");
        std::fs::write(&path, "stale content that is much longer than the new document").unwrap();

        write_json(&path, &Vec::<ItemRecord>::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_meta_writes_three_documents_without_temp_files() {
        let tmp = temp_dir();
        let mut index = BTreeMap::new();
        index.insert(1, vec![10]);
        index.insert(2, vec![11]);

        let metas = write_meta(
            &tmp,
            &LearningOrder(vec![1, 2]),
            &[item(10, 1, 0.5), item(11, 2, 1.0)],
            &KnowledgeIndex(index),
        )
        .unwrap();

        let names: Vec<_> = metas.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(names, vec![LEARNING_ORDER_FILE, ITEMS_FILE, KNOW_ITEM_FILE]);

        let know_item = std::fs::read_to_string(tmp.join(KNOW_ITEM_FILE)).unwrap();
        assert_eq!(know_item, "{\n  \"1\": [\n    10\n  ],\n  \"2\": [\n    11\n  ]\n}");

        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn identical_data_hashes_identically() {
        let tmp = temp_dir();
        let order = LearningOrder(vec![4, 2]);
        let a = write_json(&tmp.join("a.json"), &order).unwrap();
        let b = write_json(&tmp.join("b.json"), &order).unwrap();
        assert_eq!(a.sha256, b.sha256);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
