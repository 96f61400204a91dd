//! 长期存储后端
//!
//! LongTermStore 是按字符串键寻址的持久化 KV：值为任意嵌套 JSON，键可枚举，
//! 进程重启后仍在。InMemoryStore 供测试与默认使用（克隆句柄共享同一底层表），
//! FileStore 在目录下为每个键落一个 <key>.json 文件。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// 持久化 KV 存储接口
pub trait LongTermStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

/// 内存实现：克隆出的句柄共享同一张表，模拟多个管理器挂同一存储
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LongTermStore for InMemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(entries.keys().cloned().collect())
    }
}

/// 文件实现：目录下每键一个 JSON 文件；目录按需创建
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 键名直接充当文件名，拒绝路径穿越
    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            anyhow::bail!("invalid memory key: {key}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LongTermStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_shared_handles() {
        let a = InMemoryStore::new();
        let b = a.clone();
        a.set("k", &json!("v")).unwrap();
        assert_eq!(b.get("k").unwrap(), Some(json!("v")));
        b.remove("k").unwrap();
        assert_eq!(a.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set("nested", &json!({"a": [1, 2, {"b": null}]})).unwrap();
        assert_eq!(
            store.get("nested").unwrap(),
            Some(json!({"a": [1, 2, {"b": null}]}))
        );

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["nested"]);

        store.remove("nested").unwrap();
        assert_eq!(store.get("nested").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("absent").unwrap(), None);
        store.remove("absent").unwrap();
    }

    #[test]
    fn test_file_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("../escape").is_err());
        assert!(store.set("a/b", &json!(1)).is_err());
        assert!(store.set("", &json!(1)).is_err());
    }
}
