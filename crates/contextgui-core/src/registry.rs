//! 注册表访问抽象。
//!
//! 目标：
//! - 扫描与变更逻辑只依赖本模块的 trait，不直接依赖 Win32/winreg
//! - 真实实现：`contextgui_windows::registry::WinRegistry`
//! - 测试实现：[`crate::memory::MemoryRegistry`]
//!
//! 约定：
//! - 所有路径均相对 HKEY_CLASSES_ROOT（不含 `HKEY_CLASSES_ROOT\` 前缀），分隔符为 `\`
//! - 值名 `""` 表示键的默认值
//! - “不存在”统一返回 [`RegistryAccessError::NotFound`]，与其它失败区分
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use thiserror::Error;

/// 注册表访问错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryAccessError {
    /// 键或值不存在。
    #[error("注册表项不存在")]
    NotFound,
    /// 系统拒绝访问（权限不足/安全策略）。
    #[error("拒绝访问: {0}")]
    AccessDenied(String),
    /// 其它 IO 错误。
    #[error("IO 错误: {0}")]
    Io(String),
    /// 未归类的错误（保留系统原文）。
    #[error("{0}")]
    Other(String),
}

/// 注册表值的类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegValueKind {
    /// REG_SZ。
    String,
    /// REG_EXPAND_SZ。
    ExpandString,
    /// REG_DWORD。
    Dword,
    /// REG_BINARY 及其它未单独建模的类型。
    Binary,
}

/// 带类型的注册表值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    String(String),
    ExpandString(String),
    Dword(u32),
    Binary(Vec<u8>),
}

impl RegValue {
    /// 值的类型。
    pub fn kind(&self) -> RegValueKind {
        match self {
            RegValue::String(_) => RegValueKind::String,
            RegValue::ExpandString(_) => RegValueKind::ExpandString,
            RegValue::Dword(_) => RegValueKind::Dword,
            RegValue::Binary(_) => RegValueKind::Binary,
        }
    }

    /// 以文本形式读取值（用于显示名称、图标、命令等字段）。
    ///
    /// 返回值：
    /// - 字符串类：原文
    /// - DWORD：十进制文本
    /// - 二进制：`None`（无法作为文本展示）
    pub fn as_text(&self) -> Option<String> {
        match self {
            RegValue::String(s) | RegValue::ExpandString(s) => Some(s.clone()),
            RegValue::Dword(v) => Some(v.to_string()),
            RegValue::Binary(_) => None,
        }
    }
}

/// 已打开的注册表键句柄。
///
/// 说明：
/// - 句柄以只读或可写方式打开；只读句柄上的写操作应返回 `AccessDenied`
/// - `name` 参数均为单级子键名或值名
pub trait RegistryKey: Send {
    /// 键的完整路径（相对 HKEY_CLASSES_ROOT）。
    fn path(&self) -> &str;

    /// 枚举直接子键名。
    fn subkey_names(&self) -> Result<Vec<String>, RegistryAccessError>;

    /// 打开子键（可选可写）。
    fn open_subkey(&self, name: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError>;

    /// 读取值；值不存在返回 `Ok(None)`。
    fn get_value(&self, name: &str) -> Result<Option<RegValue>, RegistryAccessError>;

    /// 写入值（按 [`RegValue`] 携带的类型写入）。
    fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryAccessError>;

    /// 删除值；值不存在返回 `NotFound`。
    fn delete_value(&self, name: &str) -> Result<(), RegistryAccessError>;

    /// 递归删除子键树；子键不存在返回 `NotFound`。
    fn delete_subkey_tree(&self, name: &str) -> Result<(), RegistryAccessError>;

    /// 打开或创建子键（可写）。
    fn create_subkey(&self, name: &str) -> Result<Box<dyn RegistryKey>, RegistryAccessError>;
}

/// HKEY_CLASSES_ROOT 访问入口。
pub trait RegistryAccess: Send + Sync {
    /// 打开 HKEY_CLASSES_ROOT 下的子键。
    ///
    /// 参数：
    /// - `path`：相对路径（如 `*\shell`）
    /// - `writable`：是否以可写方式打开
    fn open_classes_root(&self, path: &str, writable: bool) -> Result<Box<dyn RegistryKey>, RegistryAccessError>;
}

/// 读取文本值，空白文本视为不存在。
///
/// 异常处理：
/// - 读取失败视为不存在（扫描阶段不因单个值读取失败中断）。
pub fn read_text(key: &dyn RegistryKey, name: &str) -> Option<String> {
    key.get_value(name)
        .ok()
        .flatten()
        .and_then(|v| v.as_text())
        .filter(|s| !s.trim().is_empty())
}
