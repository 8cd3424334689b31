//! 右键菜单扫描与分类。
//!
//! 扫描范围（固定、有序）：见 [`BASE_PATHS`]。
//!
//! 容错策略：
//! - 某个基路径不存在或无法打开：记录诊断日志后跳过，继续扫描其余路径
//! - 不做跨条目去重：同一处理器出现在多个基路径下会得到多个独立条目
//!
//! 取消：
//! - 在每个基路径之前、每个子键之间检查取消信号；取消后丢弃已收集的结果
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::error::RegistryError;
use crate::model::{ContextMenuItem, MenuCategory, RegistryResult};
use crate::privilege::PrivilegeCheck;
use crate::registry::{read_text, RegistryAccess, RegistryAccessError, RegistryKey};
use crate::{contains_ignore_case, starts_with_ignore_case, CLASSES_ROOT_PREFIX, LEGACY_DISABLE_VALUE, LEGACY_HANDLER_SEGMENT};

/// 扫描的基路径（相对 HKEY_CLASSES_ROOT），按此顺序输出。
pub const BASE_PATHS: [&str; 10] = [
    "*\\shell",
    "AllFilesystemObjects\\shell",
    "Directory\\shell",
    "Directory\\Background\\shell",
    "Folder\\shell",
    "Drive\\shell",
    "*\\shellex\\ContextMenuHandlers",
    "AllFilesystemObjects\\shellex\\ContextMenuHandlers",
    "Folder\\shellex\\ContextMenuHandlers",
    "Directory\\Background\\shellex\\ContextMenuHandlers",
];

/// 分类表：按顺序匹配基路径前缀，首个命中生效。
const CATEGORY_TABLE: [(&str, MenuCategory); 6] = [
    ("AllFilesystemObjects\\", MenuCategory::AllFiles),
    ("Directory\\Background", MenuCategory::FolderBackground),
    ("Folder\\", MenuCategory::Folder),
    ("Directory\\", MenuCategory::Folder),
    ("Drive\\", MenuCategory::Drive),
    ("*\\", MenuCategory::AllFiles),
];

const DELEGATE_EXECUTE: &str = "DelegateExecute";
const EXPLORER_COMMAND_HANDLER: &str = "ExplorerCommandHandler";

/// 注册表扫描器。
pub struct RegistryScanner {
    registry: Arc<dyn RegistryAccess>,
    privilege: Arc<dyn PrivilegeCheck>,
}

impl RegistryScanner {
    pub fn new(registry: Arc<dyn RegistryAccess>, privilege: Arc<dyn PrivilegeCheck>) -> Self {
        Self { registry, privilege }
    }

    /// 扫描全部基路径并返回统一的条目列表。
    ///
    /// 返回值：
    /// - 非管理员：成功，空列表（界面层将其视为“权限状态”而非错误），且不访问注册表
    /// - 管理员：按 [`BASE_PATHS`] 顺序输出的条目
    ///
    /// 异常处理：
    /// - 单个基路径失败只记录日志，不影响整体结果
    /// - 取消：返回 `Cancelled`，不返回部分结果
    pub fn scan_all(&self, cancel: &CancelFlag) -> RegistryResult<Vec<ContextMenuItem>> {
        if !self.privilege.is_elevated() {
            warn!("未以管理员权限运行，跳过右键菜单扫描");
            return RegistryResult::ok(Vec::new());
        }
        match self.collect(cancel) {
            Ok(items) => {
                info!("右键菜单扫描完成: {} 项", items.len());
                RegistryResult::ok(items)
            }
            Err(e) => {
                warn!("右键菜单扫描中止: {}", e);
                RegistryResult::fail(e)
            }
        }
    }

    fn collect(&self, cancel: &CancelFlag) -> Result<Vec<ContextMenuItem>, RegistryError> {
        let mut items = Vec::new();
        for base_path in BASE_PATHS {
            cancel.check()?;

            let base_key = match self.registry.open_classes_root(base_path, false) {
                Ok(k) => k,
                Err(RegistryAccessError::NotFound) => {
                    debug!("基路径不存在，跳过: {}", base_path);
                    continue;
                }
                Err(e) => {
                    warn!("读取注册表路径失败 {}: {}", base_path, e);
                    continue;
                }
            };
            let names = match base_key.subkey_names() {
                Ok(v) => v,
                Err(e) => {
                    warn!("枚举子键失败 {}: {}", base_path, e);
                    continue;
                }
            };

            for name in names {
                cancel.check()?;
                match base_key.open_subkey(&name, false) {
                    Ok(sub_key) => items.push(classify(base_path, &name, sub_key.as_ref())),
                    Err(RegistryAccessError::NotFound) => continue,
                    Err(e) => warn!("打开子键失败 {}\\{}: {}", base_path, name, e),
                }
            }
        }
        Ok(items)
    }
}

/// 将一个子键分类为 [`ContextMenuItem`]。
///
/// 分类顺序固定：显示名称 → 图标 → 命令/处理器 → 旧式标记 → 系统标记 → 分类。
pub fn classify(base_path: &str, name: &str, key: &dyn RegistryKey) -> ContextMenuItem {
    let display_name = resolve_display_name(name, key);
    let icon_path = read_text(key, "Icon");
    let (command, is_modern_handler) = resolve_command_or_handler(key);
    let is_legacy_handler = is_legacy_handler_path(base_path);
    let is_system_item = is_system_name(name);
    let category = category_for(base_path);
    let is_enabled = !matches!(key.get_value(LEGACY_DISABLE_VALUE), Ok(Some(_)));

    ContextMenuItem {
        name: name.to_string(),
        registry_path: format!("{CLASSES_ROOT_PREFIX}{base_path}\\{name}"),
        display_name,
        is_enabled,
        icon_path,
        command,
        is_system_item,
        is_legacy_handler,
        is_modern_handler,
        category,
    }
}

fn resolve_display_name(name: &str, key: &dyn RegistryKey) -> String {
    read_text(key, "")
        .or_else(|| read_text(key, "MUIVerb"))
        .unwrap_or_else(|| name.to_string())
}

/// 解析命令行或新式处理器描述。
///
/// 返回值：
/// - `command` 子键默认值非空：`(命令行, 是否新式处理器)`
/// - 否则存在新式处理器值：`(处理器描述, true)`
/// - 都没有：`(None, false)`
fn resolve_command_or_handler(key: &dyn RegistryKey) -> (Option<String>, bool) {
    let command = key
        .open_subkey("command", false)
        .ok()
        .and_then(|k| read_text(k.as_ref(), ""));
    let delegate = read_text(key, DELEGATE_EXECUTE);
    let explorer = read_text(key, EXPLORER_COMMAND_HANDLER);
    let is_modern = delegate.is_some() || explorer.is_some();

    if command.is_some() {
        return (command, is_modern);
    }
    if is_modern {
        return (Some(handler_text(delegate.as_deref(), explorer.as_deref())), true);
    }
    (None, false)
}

/// 拼接新式处理器描述，两者都存在时以 `" | "` 连接。
pub fn handler_text(delegate: Option<&str>, explorer: Option<&str>) -> String {
    let parts: Vec<String> = [
        delegate.map(|v| format!("{DELEGATE_EXECUTE}: {v}")),
        explorer.map(|v| format!("{EXPLORER_COMMAND_HANDLER}: {v}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    parts.join(" | ")
}

/// 路径是否位于 `shellex\ContextMenuHandlers` 下。
pub fn is_legacy_handler_path(path: &str) -> bool {
    contains_ignore_case(path, LEGACY_HANDLER_SEGMENT)
}

/// 子键名是否为系统内置条目。
pub fn is_system_name(name: &str) -> bool {
    starts_with_ignore_case(name, "Windows.")
        || name.eq_ignore_ascii_case("OpenWith")
        || name.eq_ignore_ascii_case("Sharing")
}

/// 根据基路径确定分类，未命中返回 `Other`。
pub fn category_for(base_path: &str) -> MenuCategory {
    CATEGORY_TABLE
        .iter()
        .find(|(prefix, _)| starts_with_ignore_case(base_path, prefix))
        .map(|(_, category)| *category)
        .unwrap_or(MenuCategory::Other)
}

/// 键是否带有新式处理器值（任意内容均算）。
pub(crate) fn has_modern_handler_value(key: &dyn RegistryKey) -> Result<bool, RegistryAccessError> {
    Ok(key.get_value(DELEGATE_EXECUTE)?.is_some() || key.get_value(EXPLORER_COMMAND_HANDLER)?.is_some())
}
