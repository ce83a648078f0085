//! # JSON 文档存储
//!
//! 每个存储是一个 `{name: value}` 形式的 JSON 文档，与现有的
//! `positions.json` / `procedures.json` / `calibrations.json` 兼容。
//!
//! - 打开时加载；文件不存在或损坏时记录日志并以空存储启动
//! - 每次修改后整体写回：先写临时文件，再 `rename` 覆盖（原子替换）
//! - 没有路径时是纯内存存储（测试和离线演示用）

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::calibration::PlaneCalibration;
use crate::error::StoreError;
use crate::position::SavedPosition;
use crate::procedure::Procedure;

/// 已保存位置的存储
pub type PositionStore = JsonStore<SavedPosition>;

/// 程序存储
pub type ProcedureStore = JsonStore<Procedure>;

/// 平面标定存储
pub type CalibrationStore = JsonStore<PlaneCalibration>;

/// 按名称索引的 JSON 文档存储
pub struct JsonStore<T> {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T> JsonStore<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// 纯内存存储
    pub fn in_memory() -> Self {
        JsonStore {
            path: None,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// 打开文件存储
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!(path = %path.display(), count = entries.len(), "store opened");
        JsonStore {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// 有路径时打开文件，否则使用内存存储
    pub fn from_optional(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// 文件路径
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<T> {
        self.entries.read().get(name).cloned()
    }

    /// 是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// 全部条目（按名称排序）
    pub fn list(&self) -> Vec<(String, T)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 全部名称（排序）
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 新增条目，名称已存在时拒绝
    pub fn insert(&self, name: &str, value: T) -> Result<(), StoreError> {
        self.mutate(|entries| {
            if entries.contains_key(name) {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            entries.insert(name.to_string(), value);
            Ok(())
        })
    }

    /// 新增或覆盖，返回旧值
    pub fn upsert(&self, name: &str, value: T) -> Result<Option<T>, StoreError> {
        self.mutate(|entries| Ok(entries.insert(name.to_string(), value)))
    }

    /// 就地修改已有条目
    pub fn modify<R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        self.mutate(|entries| {
            let entry = entries
                .get_mut(name)
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
            Ok(f(entry))
        })
    }

    /// 删除条目
    pub fn remove(&self, name: &str) -> Result<T, StoreError> {
        self.mutate(|entries| {
            entries
                .remove(name)
                .ok_or_else(|| StoreError::NotFound(name.to_string()))
        })
    }

    /// 在写锁内修改副本，持久化成功后才提交
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        let result = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *entries = next;
        Ok(result)
    }
}

impl<T> std::fmt::Debug for JsonStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("path", &self.path)
            .field("len", &self.entries.read().len())
            .finish()
    }
}

fn load_entries<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read store, starting empty");
            return BTreeMap::new();
        },
    };
    if content.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt store, starting empty");
            BTreeMap::new()
        },
    }
}

fn persist<T: Serialize>(path: &Path, entries: &BTreeMap<String, T>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(entries)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    debug!(path = %path.display(), count = entries.len(), "store saved");
    Ok(())
}
