//! 右键菜单变更（启用/禁用/删除/编辑），统一遵循“先备份后修改”。
//!
//! 事务流程（四个操作一致）：
//! 1) 前置检查（按顺序，首个不满足即失败）：管理员权限 → 路径必须为 HKEY_CLASSES_ROOT → 操作特有检查
//! 2) 调用备份引擎导出目标键；备份失败则整个操作失败，注册表不做任何修改
//! 3) 执行修改；此后无论成功失败，结果都携带备份文件路径
//!
//! 调用方约定：
//! - 本模块不检查系统条目；删除/编辑前应先经过 [`crate::policy::check_mutation`]
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::sync::Arc;

use tracing::{error, info};

use crate::backup::BackupEngine;
use crate::cancel::CancelFlag;
use crate::error::RegistryError;
use crate::model::RegistryResult;
use crate::policy::MutationOp;
use crate::privilege::PrivilegeCheck;
use crate::registry::{RegValue, RegistryAccess, RegistryAccessError, RegistryKey};
use crate::scanner::{has_modern_handler_value, is_legacy_handler_path};
use crate::{starts_with_ignore_case, CLASSES_ROOT_PREFIX, LEGACY_DISABLE_VALUE};

/// 注册表变更器。
pub struct RegistryMutator {
    registry: Arc<dyn RegistryAccess>,
    privilege: Arc<dyn PrivilegeCheck>,
    backup: Arc<BackupEngine>,
}

impl RegistryMutator {
    pub fn new(registry: Arc<dyn RegistryAccess>, privilege: Arc<dyn PrivilegeCheck>, backup: Arc<BackupEngine>) -> Self {
        Self {
            registry,
            privilege,
            backup,
        }
    }

    /// 禁用条目：写入空字符串 `LegacyDisable` 标记。
    ///
    /// 异常处理：
    /// - 键不存在：`NotFound`（备份路径仍会返回）
    pub fn disable(&self, key_path: &str, cancel: &CancelFlag) -> RegistryResult<bool> {
        self.transact(MutationOp::Disable, key_path, cancel, || Ok(()), |sub_path| {
            let key = self.open_target(sub_path, key_path)?;
            key.set_value(LEGACY_DISABLE_VALUE, &RegValue::String(String::new()))
                .map_err(|e| RegistryError::from_access(e, key_path))
        })
    }

    /// 启用条目：删除 `LegacyDisable` 标记（标记不存在不视为错误）。
    pub fn enable(&self, key_path: &str, cancel: &CancelFlag) -> RegistryResult<bool> {
        self.transact(MutationOp::Enable, key_path, cancel, || Ok(()), |sub_path| {
            let key = self.open_target(sub_path, key_path)?;
            tolerate_missing(key.delete_value(LEGACY_DISABLE_VALUE))
                .map_err(|e| RegistryError::from_access(e, key_path))
        })
    }

    /// 删除条目：打开父键并递归删除目标子键（子键已不存在视为成功）。
    ///
    /// 异常处理：
    /// - 路径没有父键（无分隔符或分隔符在末尾）：`InvalidArgument`
    /// - 父键不存在：`NotFound`
    pub fn delete(&self, key_path: &str, cancel: &CancelFlag) -> RegistryResult<bool> {
        self.transact(MutationOp::Delete, key_path, cancel, || Ok(()), |sub_path| {
            let (parent_path, name) = split_parent(sub_path)
                .ok_or_else(|| RegistryError::InvalidArgument(format!("无效的注册表键路径: {key_path}")))?;
            let parent = self.open_target(parent_path, key_path)?;
            tolerate_missing(parent.delete_subkey_tree(name)).map_err(|e| RegistryError::from_access(e, key_path))
        })
    }

    /// 编辑条目：显示名称、图标与命令。
    ///
    /// 参数：
    /// - `display_name`：新显示名称（必填）
    /// - `icon_path`：新图标；为空则删除 `Icon` 值
    /// - `command`：新命令行（必填）
    ///
    /// 异常处理：
    /// - 旧式处理器路径：`Unsupported`（不备份）
    /// - 显示名称或命令为空：`InvalidArgument`（不备份）
    /// - 目标带 `DelegateExecute`/`ExplorerCommandHandler`：`Unsupported`（已备份，不写入）
    pub fn update(
        &self,
        key_path: &str,
        display_name: &str,
        icon_path: Option<&str>,
        command: &str,
        cancel: &CancelFlag,
    ) -> RegistryResult<bool> {
        let precheck = || {
            if is_legacy_handler_path(key_path) {
                return Err(RegistryError::Unsupported("旧式处理器不支持编辑".to_string()));
            }
            if display_name.trim().is_empty() {
                return Err(RegistryError::InvalidArgument("显示名称不能为空".to_string()));
            }
            if command.trim().is_empty() {
                return Err(RegistryError::InvalidArgument("命令不能为空".to_string()));
            }
            Ok(())
        };
        self.transact(MutationOp::Update, key_path, cancel, precheck, |sub_path| {
            let key = self.open_target(sub_path, key_path)?;
            let access = |e: RegistryAccessError| RegistryError::from_access(e, key_path);

            if has_modern_handler_value(key.as_ref()).map_err(access)? {
                return Err(RegistryError::Unsupported("新式处理器不支持编辑".to_string()));
            }

            key.set_value("", &RegValue::String(display_name.to_string()))
                .map_err(access)?;
            match icon_path.map(str::trim).filter(|s| !s.is_empty()) {
                Some(icon) => key.set_value("Icon", &RegValue::String(icon.to_string())).map_err(access)?,
                None => tolerate_missing(key.delete_value("Icon")).map_err(access)?,
            }

            let command_key = match key.open_subkey("command", true) {
                Ok(k) => k,
                Err(RegistryAccessError::NotFound) => key.create_subkey("command").map_err(access)?,
                Err(e) => return Err(access(e)),
            };
            command_key
                .set_value("", &RegValue::String(command.to_string()))
                .map_err(access)
        })
    }

    /// 统一事务骨架：前置检查 → 备份 → 修改 → 附带备份路径返回。
    fn transact(
        &self,
        op: MutationOp,
        key_path: &str,
        cancel: &CancelFlag,
        precheck: impl FnOnce() -> Result<(), RegistryError>,
        apply: impl FnOnce(&str) -> Result<(), RegistryError>,
    ) -> RegistryResult<bool> {
        let sub_path = match self.preconditions(key_path, precheck) {
            Ok(p) => p,
            Err(e) => {
                info!("{}被拒绝: {} ({})", op, key_path, e);
                return RegistryResult::fail(e);
            }
        };
        if let Err(e) = cancel.check() {
            return RegistryResult::fail(e);
        }

        let backup_path = match self.backup.create_backup(key_path, cancel) {
            Ok(p) => p,
            Err(e) => {
                error!("备份失败，已放弃{}: {} ({})", op, key_path, e);
                return RegistryResult::fail(e);
            }
        };

        match apply(sub_path) {
            Ok(()) => {
                info!("已{}右键菜单条目: {}", op, key_path);
                RegistryResult::ok(true).with_backup(backup_path)
            }
            Err(e) => {
                error!("{}右键菜单条目失败: {} ({})", op, key_path, e);
                RegistryResult::fail(e).with_backup(backup_path)
            }
        }
    }

    fn preconditions<'a>(
        &self,
        key_path: &'a str,
        precheck: impl FnOnce() -> Result<(), RegistryError>,
    ) -> Result<&'a str, RegistryError> {
        if !self.privilege.is_elevated() {
            return Err(RegistryError::admin_required());
        }
        let sub_path = classes_root_subpath(key_path)?;
        precheck()?;
        Ok(sub_path)
    }

    fn open_target(&self, sub_path: &str, key_path: &str) -> Result<Box<dyn RegistryKey>, RegistryError> {
        self.registry
            .open_classes_root(sub_path, true)
            .map_err(|e| RegistryError::from_access(e, key_path))
    }
}

/// 校验完整键路径并返回去掉 `HKEY_CLASSES_ROOT\` 前缀后的相对路径。
///
/// 异常处理：
/// - 空路径、非 HKEY_CLASSES_ROOT 路径、只有前缀：`InvalidArgument`
pub fn classes_root_subpath(key_path: &str) -> Result<&str, RegistryError> {
    if key_path.trim().is_empty() {
        return Err(RegistryError::InvalidArgument("注册表键路径不能为空".to_string()));
    }
    if !starts_with_ignore_case(key_path, CLASSES_ROOT_PREFIX) {
        return Err(RegistryError::InvalidArgument(format!(
            "仅支持 {CLASSES_ROOT_PREFIX} 路径"
        )));
    }
    let sub_path = &key_path[CLASSES_ROOT_PREFIX.len()..];
    if sub_path.trim_matches('\\').is_empty() {
        return Err(RegistryError::InvalidArgument(format!("无效的注册表键路径: {key_path}")));
    }
    Ok(sub_path)
}

/// 拆分父路径与末级子键名；无分隔符、分隔符在开头或末尾时返回 `None`。
fn split_parent(sub_path: &str) -> Option<(&str, &str)> {
    match sub_path.rfind('\\') {
        Some(idx) if idx > 0 && idx + 1 < sub_path.len() => Some((&sub_path[..idx], &sub_path[idx + 1..])),
        _ => None,
    }
}

fn tolerate_missing(result: Result<(), RegistryAccessError>) -> Result<(), RegistryAccessError> {
    match result {
        Err(RegistryAccessError::NotFound) => Ok(()),
        other => other,
    }
}
