//! 内存注册表（测试与离线演练用）。
//!
//! 行为约定（与真实注册表保持一致）：
//! - 键名、值名大小写不敏感，但保留首次写入时的大小写
//! - 只读句柄上的写操作返回 `AccessDenied`
//! - 句柄按路径解析，键被删除后再使用旧句柄返回 `NotFound`
//!
//! 观测能力：
//! - [`MemoryRegistry::open_count`]：累计打开键次数（用于断言“未访问注册表”）
//! - [`MemoryRegistry::write_count`]：累计写操作次数（用于断言“未写入”）
//! - [`MemoryRegistry::deny_open`]：模拟某路径拒绝访问
//! - [`MemoryRegistry::fail_writes`]：模拟某键上的写操作失败（权限/IO/其它）
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::registry::{RegValue, RegistryAccess, RegistryAccessError, RegistryKey};

#[derive(Debug, Default)]
struct Node {
    name: String,
    values: BTreeMap<String, (String, RegValue)>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn find(&self, segments: &[String]) -> Option<&Node> {
        segments
            .iter()
            .try_fold(self, |node, seg| node.children.get(&seg.to_ascii_lowercase()))
    }

    fn find_mut(&mut self, segments: &[String]) -> Option<&mut Node> {
        let mut node = self;
        for seg in segments {
            node = node.children.get_mut(&seg.to_ascii_lowercase())?;
        }
        Some(node)
    }

    fn ensure(&mut self, segments: &[String]) -> &mut Node {
        let mut node = self;
        for seg in segments {
            node = node
                .children
                .entry(seg.to_ascii_lowercase())
                .or_insert_with(|| Node::named(seg));
        }
        node
    }
}

#[derive(Debug, Default)]
struct Inner {
    root: Mutex<Node>,
    denied: Mutex<HashSet<String>>,
    write_failures: Mutex<HashMap<String, RegistryAccessError>>,
    opens: AtomicUsize,
    writes: AtomicUsize,
}

impl Inner {
    fn root(&self) -> MutexGuard<'_, Node> {
        self.root.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_denied(&self, path: &str) -> bool {
        self.denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&path.to_ascii_lowercase())
    }

    fn write_failure(&self, path: &str) -> Option<RegistryAccessError> {
        self.write_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&path.to_ascii_lowercase())
            .cloned()
    }
}

/// 内存注册表（HKEY_CLASSES_ROOT 视图）。
///
/// 克隆后共享同一棵树与计数器。
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Inner>,
}

impl MemoryRegistry {
    /// 创建空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个键（沿途缺失的父键一并创建），不计入写操作次数。
    pub fn seed_key(&self, path: &str) {
        self.inner.root().ensure(&split_path(path));
    }

    /// 预置一个值（键不存在时自动创建），不计入写操作次数。
    pub fn seed_value(&self, path: &str, name: &str, value: RegValue) {
        let mut root = self.inner.root();
        let node = root.ensure(&split_path(path));
        node.values
            .insert(name.to_ascii_lowercase(), (name.to_string(), value));
    }

    /// 预置字符串值的便捷写法。
    pub fn seed_string(&self, path: &str, name: &str, value: &str) {
        self.seed_value(path, name, RegValue::String(value.to_string()));
    }

    /// 模拟打开 `path` 时被拒绝访问。
    pub fn deny_open(&self, path: &str) {
        self.inner
            .denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_ascii_lowercase());
    }

    /// 让 `path` 键上的写操作（写值/删值/删子键/建子键）返回 `err`，键本身仍可正常打开与读取。
    pub fn fail_writes(&self, path: &str, err: RegistryAccessError) {
        let key = split_path(path).join("\\").to_ascii_lowercase();
        self.inner
            .write_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, err);
    }

    /// 读取值（测试断言用）。
    pub fn value(&self, path: &str, name: &str) -> Option<RegValue> {
        let root = self.inner.root();
        root.find(&split_path(path))
            .and_then(|n| n.values.get(&name.to_ascii_lowercase()))
            .map(|(_, v)| v.clone())
    }

    /// 键是否存在（测试断言用）。
    pub fn key_exists(&self, path: &str) -> bool {
        self.inner.root().find(&split_path(path)).is_some()
    }

    /// 累计打开键次数。
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// 累计写操作次数（写值/删值/删键/建键）。
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn open_path(&self, segments: Vec<String>, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        let path = segments.join("\\");
        if self.inner.is_denied(&path) {
            return Err(RegistryAccessError::AccessDenied(format!("拒绝访问: {path}")));
        }
        if self.inner.root().find(&segments).is_none() {
            return Err(RegistryAccessError::NotFound);
        }
        Ok(Box::new(MemoryKey {
            registry: self.clone(),
            path,
            segments,
            writable,
        }))
    }
}

impl RegistryAccess for MemoryRegistry {
    fn open_classes_root(&self, path: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        self.open_path(split_path(path), writable)
    }
}

/// [`MemoryRegistry`] 上的键句柄。
struct MemoryKey {
    registry: MemoryRegistry,
    path: String,
    segments: Vec<String>,
    writable: bool,
}

impl MemoryKey {
    fn child_segments(&self, name: &str) -> Vec<String> {
        let mut segments = self.segments.clone();
        segments.extend(split_path(name));
        segments
    }

    fn check_writable(&self) -> Result<(), RegistryAccessError> {
        if !self.writable {
            return Err(RegistryAccessError::AccessDenied(format!("键以只读方式打开: {}", self.path)));
        }
        match self.registry.inner.write_failure(&self.path) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_node<T>(&self, f: impl FnOnce(&mut Node) -> Result<T, RegistryAccessError>) -> Result<T, RegistryAccessError> {
        let mut root = self.registry.inner.root();
        let node = root
            .find_mut(&self.segments)
            .ok_or(RegistryAccessError::NotFound)?;
        f(node)
    }

    fn record_write(&self) {
        self.registry.inner.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl RegistryKey for MemoryKey {
    fn path(&self) -> &str {
        &self.path
    }

    fn subkey_names(&self) -> Result<Vec<String>, RegistryAccessError> {
        self.with_node(|node| Ok(node.children.values().map(|c| c.name.clone()).collect()))
    }

    fn open_subkey(&self, name: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        self.registry.open_path(self.child_segments(name), writable)
    }

    fn get_value(&self, name: &str) -> Result<Option<RegValue>, RegistryAccessError> {
        self.with_node(|node| {
            Ok(node
                .values
                .get(&name.to_ascii_lowercase())
                .map(|(_, v)| v.clone()))
        })
    }

    fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryAccessError> {
        self.check_writable()?;
        self.with_node(|node| {
            node.values
                .insert(name.to_ascii_lowercase(), (name.to_string(), value.clone()));
            Ok(())
        })?;
        self.record_write();
        Ok(())
    }

    fn delete_value(&self, name: &str) -> Result<(), RegistryAccessError> {
        self.check_writable()?;
        self.with_node(|node| {
            node.values
                .remove(&name.to_ascii_lowercase())
                .map(|_| ())
                .ok_or(RegistryAccessError::NotFound)
        })?;
        self.record_write();
        Ok(())
    }

    fn delete_subkey_tree(&self, name: &str) -> Result<(), RegistryAccessError> {
        self.check_writable()?;
        let child = split_path(name);
        let Some((last, parents)) = child.split_last() else {
            return Err(RegistryAccessError::Other("子键名为空".to_string()));
        };
        self.with_node(|node| {
            node.find_mut(parents)
                .and_then(|parent| parent.children.remove(&last.to_ascii_lowercase()))
                .map(|_| ())
                .ok_or(RegistryAccessError::NotFound)
        })?;
        self.record_write();
        Ok(())
    }

    fn create_subkey(&self, name: &str) -> Result<Box<dyn RegistryKey>, RegistryAccessError> {
        self.check_writable()?;
        let child = split_path(name);
        if child.is_empty() {
            return Err(RegistryAccessError::Other("子键名为空".to_string()));
        }
        self.with_node(|node| {
            node.ensure(&child);
            Ok(())
        })?;
        self.record_write();
        self.registry.open_path(self.child_segments(name), true)
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('\\')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
