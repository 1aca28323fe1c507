//! # 共享数据存储
//!
//! 以目录为后端的键值存储：每个键对应 `<dir>/<key>.json`，内容为格式化 JSON。
//! 多个独立进程通过同一个目录交换数据。
//!
//! - 写入先落到同目录临时文件再原子重命名，读者永远看不到写了一半的记录
//! - 所有公开操作都不向调用方抛错：失败转为默认值 / `false`，并记录 `warn` 日志
//! - 同一个键的并发写入以最后一次为准

mod record;

pub use record::{validate_key, RecordInfo, RecordMeta, RECORD_EXTENSION};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// 共享存储句柄。克隆开销很小，多个组件可各持一份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// 创建句柄，目录在第一次写入时才创建
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// 创建句柄并立即确保目录存在
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StoreError> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).map_err(|e| StoreError::io(&store.dir, e))?;
        tracing::info!(dir = %store.dir.display(), "store opened");
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 键对应的记录文件路径
    pub fn record_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// 保存记录，整体替换旧值
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(path) => {
                tracing::debug!(key, path = %path.display(), "record saved");
                true
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "save failed");
                false
            }
        }
    }

    pub fn try_save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<PathBuf, StoreError> {
        let path = self.record_path(key)?;
        let mut body =
            serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })?;
        body.push(b'\n');

        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        Ok(path)
    }

    /// 读取记录；不存在、损坏或不可读时返回 `default`
    pub fn load(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// 读取记录；不存在、损坏或不可读时返回 `None`
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "load failed, treating record as absent");
                None
            }
        }
    }

    /// 读取并反序列化为具体类型；类型不匹配同样视为不存在
    pub fn load_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "record has unexpected shape");
                None
            }
        }
    }

    pub fn try_load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(key)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(key, "record not found");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// 删除记录；只有确实删掉了文件才返回 true
    pub fn delete(&self, key: &str) -> bool {
        let path = match self.record_path(key) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(key, error = %e, "delete skipped");
                return false;
            }
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key, "record deleted");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(key, error = %e, "delete failed");
                false
            }
        }
    }

    /// 扫描目录列出当前所有键，每次调用都重新扫描
    pub fn list(&self) -> BTreeSet<String> {
        match self.try_list() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "list failed");
                BTreeSet::new()
            }
        }
    }

    pub fn try_list(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut keys = BTreeSet::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();

            if !path.is_file()
                || path.extension().and_then(|s| s.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_key(key).is_ok() {
                keys.insert(key.to_string());
            }
        }

        Ok(keys)
    }

    /// 更新记录。
    ///
    /// `merge` 为 true 且新旧值都是对象时做浅合并：顶层键由 `partial` 覆盖，
    /// 嵌套结构整体替换。其余情况等同于 `save(key, partial)`。
    pub fn update(&self, key: &str, partial: Value, merge: bool) -> bool {
        if !merge {
            return self.save(key, &partial);
        }

        match (self.load(key, Value::Object(Map::new())), partial) {
            (Value::Object(mut existing), Value::Object(incoming)) => {
                existing.extend(incoming);
                self.save(key, &Value::Object(existing))
            }
            (_, partial) => {
                tracing::debug!(key, "merge not applicable to non-object values, overwriting");
                self.save(key, &partial)
            }
        }
    }

    /// 记录文件信息
    pub fn info(&self, key: &str) -> RecordInfo {
        let Ok(path) = self.record_path(key) else {
            return RecordInfo::Missing;
        };

        match fs::metadata(&path) {
            Ok(meta) => RecordInfo::Present(RecordMeta {
                size_bytes: meta.len(),
                created: meta.created().ok().map(Into::into),
                modified: meta.modified().ok().map(Into::into),
                path,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => RecordInfo::Missing,
            Err(e) => RecordInfo::Unreadable {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::new(temp_dir.path().join("data"));
        (temp_dir, store)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_tmp, store) = temp_store();
        let value = json!({
            "user_name": "张三",
            "age": 25,
            "skills": ["Python", "数据分析"],
            "nested": {"deep": [1, {"x": null}]}
        });

        assert!(store.save("user_profile", &value));
        assert_eq!(store.load("user_profile", Value::Null), value);
    }

    #[test]
    fn test_scalars_and_sequences_round_trip() {
        let (_tmp, store) = temp_store();
        for (key, value) in [
            ("number", json!(42.5)),
            ("text", json!("hello")),
            ("flag", json!(false)),
            ("list", json!([1, "two", [3]])),
        ] {
            assert!(store.save(key, &value));
            assert_eq!(store.get(key), Some(value));
        }
    }

    #[test]
    fn test_missing_key_returns_default() {
        let (_tmp, store) = temp_store();
        assert_eq!(store.load("never_saved", json!({"d": 1})), json!({"d": 1}));
        assert_eq!(store.get("never_saved"), None);
    }

    #[test]
    fn test_corrupt_record_degrades_to_default() {
        let (_tmp, store) = temp_store();
        assert!(store.save("broken", &json!({"ok": true})));
        fs::write(store.record_path("broken").unwrap(), b"{\"ok\": tr").unwrap();

        assert_eq!(store.load("broken", json!("fallback")), json!("fallback"));
        assert!(matches!(
            store.try_load("broken"),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_save_overwrites_whole_record() {
        let (_tmp, store) = temp_store();
        assert!(store.save("k", &json!({"a": 1, "b": 2})));
        assert!(store.save("k", &json!({"c": 3})));
        assert_eq!(store.get("k"), Some(json!({"c": 3})));
    }

    #[test]
    fn test_unserializable_value_fails_without_touching_disk() {
        let (_tmp, store) = temp_store();
        let mut bad: BTreeMap<Vec<u8>, i32> = BTreeMap::new();
        bad.insert(vec![1, 2], 3);

        assert!(!store.save("bad", &bad));
        assert!(matches!(
            store.try_save("bad", &bad),
            Err(StoreError::Serialization { .. })
        ));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_invalid_key_is_rejected_everywhere() {
        let (_tmp, store) = temp_store();
        assert!(!store.save("../escape", &json!(1)));
        assert_eq!(store.load("../escape", json!(0)), json!(0));
        assert!(!store.delete("../escape"));
        assert_eq!(store.info("../escape"), RecordInfo::Missing);
    }

    #[test]
    fn test_delete_semantics() {
        let (_tmp, store) = temp_store();
        assert!(!store.delete("absent"));

        assert!(store.save("present", &json!([1])));
        assert!(store.delete("present"));
        assert_eq!(store.load("present", json!("gone")), json!("gone"));
        assert!(!store.delete("present"));
    }

    #[test]
    fn test_list_reflects_saves_and_deletes() {
        let (_tmp, store) = temp_store();
        assert!(store.list().is_empty());

        for i in 0..5 {
            assert!(store.save(&format!("key_{i}"), &json!(i)));
        }
        assert!(store.delete("key_1"));
        assert!(store.delete("key_3"));

        let keys: Vec<String> = store.list().into_iter().collect();
        assert_eq!(keys, vec!["key_0", "key_2", "key_4"]);
    }

    #[test]
    fn test_list_ignores_foreign_and_temporary_files() {
        let (_tmp, store) = temp_store();
        assert!(store.save("real", &json!(1)));
        fs::write(store.dir().join("notes.txt"), b"x").unwrap();
        fs::write(store.dir().join(".tmp-abc.part"), b"{").unwrap();
        fs::write(store.dir().join(".hidden.json"), b"{}").unwrap();
        fs::create_dir(store.dir().join("sub.json")).unwrap();

        assert_eq!(store.list(), BTreeSet::from(["real".to_string()]));
    }

    #[test]
    fn test_update_merges_top_level_only() {
        let (_tmp, store) = temp_store();
        assert!(store.save(
            "profile",
            &json!({"name": "张三", "age": 25, "address": {"city": "上海", "zip": "200000"}})
        ));

        assert!(store.update(
            "profile",
            json!({"age": 26, "address": {"city": "北京"}}),
            true
        ));

        assert_eq!(
            store.get("profile"),
            Some(json!({"name": "张三", "age": 26, "address": {"city": "北京"}}))
        );
    }

    #[test]
    fn test_update_without_merge_replaces() {
        let (_tmp, store) = temp_store();
        assert!(store.save("profile", &json!({"name": "张三", "age": 25})));
        assert!(store.update("profile", json!({"age": 26}), false));
        assert_eq!(store.get("profile"), Some(json!({"age": 26})));
    }

    #[test]
    fn test_update_merge_falls_back_to_overwrite() {
        let (_tmp, store) = temp_store();
        assert!(store.save("list", &json!([1, 2])));
        assert!(store.update("list", json!({"a": 1}), true));
        assert_eq!(store.get("list"), Some(json!({"a": 1})));

        assert!(store.update("fresh", json!({"b": 2}), true));
        assert_eq!(store.get("fresh"), Some(json!({"b": 2})));
    }

    #[test]
    fn test_update_merge_with_non_object_incoming_overwrites() {
        let (_tmp, store) = temp_store();
        assert!(store.save("profile", &json!({"name": "张三", "age": 25})));

        assert!(store.update("profile", json!(["a", "b"]), true));
        assert_eq!(store.get("profile"), Some(json!(["a", "b"])));

        assert!(store.save("status", &json!({"state": "running"})));
        assert!(store.update("status", json!("done"), true));
        assert_eq!(store.get("status"), Some(json!("done")));
    }

    #[test]
    fn test_info_reports_presence_explicitly() {
        let (_tmp, store) = temp_store();
        assert_eq!(store.info("nothing"), RecordInfo::Missing);

        assert!(store.save("sized", &json!({"payload": "x".repeat(100)})));
        let info = store.info("sized");
        let meta = info.meta().expect("record should exist");
        assert!(info.exists());
        assert!(meta.size_bytes > 100);
        assert_eq!(meta.path, store.record_path("sized").unwrap());
        assert!(meta.modified.is_some());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("data");
        let store = Store::open(&dir).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_load_as_typed() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Status {
            status: String,
        }

        let (_tmp, store) = temp_store();
        assert!(store.save("result", &json!({"status": "success", "extra": 1})));
        assert_eq!(
            store.load_as::<Status>("result"),
            Some(Status {
                status: "success".into()
            })
        );
        assert!(store.save("wrong", &json!([1])));
        assert_eq!(store.load_as::<Status>("wrong"), None);
    }
}
