//! ContextGUI 核心库（平台无关）。
//!
//! 功能：
//! - 定义右键菜单条目、备份记录与统一操作结果模型
//! - 定义注册表访问、权限检测、外部工具执行三类抽象（真实实现见 `contextgui-windows`）
//! - 提供注册表扫描/分类、先备份后修改的变更流程、备份历史与还原
//! - 提供统一路径约定与配置文件模型
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

pub mod backup;
pub mod cancel;
pub mod config;
pub mod error;
pub mod history;
pub mod memory;
pub mod model;
pub mod mutator;
pub mod paths;
pub mod policy;
pub mod privilege;
pub mod registry;
pub mod scanner;
pub mod tool;

/// HKEY_CLASSES_ROOT 完整路径前缀（所有条目标识均以此开头）。
pub const CLASSES_ROOT_PREFIX: &str = "HKEY_CLASSES_ROOT\\";

/// 旧式 COM 右键菜单处理器所在的路径片段。
pub const LEGACY_HANDLER_SEGMENT: &str = "\\shellex\\ContextMenuHandlers";

/// 禁用标记值名：存在即表示该条目在资源管理器中被隐藏。
pub const LEGACY_DISABLE_VALUE: &str = "LegacyDisable";

/// 判断 `haystack` 是否以 `prefix` 开头（ASCII 忽略大小写）。
pub(crate) fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// 判断 `haystack` 是否包含 `needle`（ASCII 忽略大小写）。
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}
