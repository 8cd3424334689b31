//! 备份历史：列出与还原已创建的 `.reg` 备份。
//!
//! 说明：
//! - 只读取 [`crate::backup::BackupEngine`] 写入的目录，不创建、不删除备份文件
//! - 还原本身即恢复动作，还原前不再额外备份
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::cancel::CancelFlag;
use crate::config::DEFAULT_REG_TOOL;
use crate::error::RegistryError;
use crate::model::{BackupEntry, RegistryResult};
use crate::privilege::PrivilegeCheck;
use crate::tool::{ToolError, ToolRunner};

/// 备份历史存储。
pub struct BackupHistory {
    privilege: Arc<dyn PrivilegeCheck>,
    tool: Arc<dyn ToolRunner>,
    backup_dir: PathBuf,
    reg_tool: String,
}

impl BackupHistory {
    /// 创建备份历史存储。
    ///
    /// 参数：
    /// - `privilege`：权限检测（仅还原需要）
    /// - `tool`：外部工具执行器（执行 `reg import`）
    /// - `backup_dir`：备份目录（与备份引擎一致）
    pub fn new(privilege: Arc<dyn PrivilegeCheck>, tool: Arc<dyn ToolRunner>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            privilege,
            tool,
            backup_dir: backup_dir.into(),
            reg_tool: DEFAULT_REG_TOOL.to_string(),
        }
    }

    /// 替换导入工具（默认 `reg`）。
    pub fn with_reg_tool(mut self, program: impl Into<String>) -> Self {
        self.reg_tool = program.into();
        self
    }

    /// 列出全部备份，按创建时间从新到旧排序。
    ///
    /// 返回值：
    /// - 目录不存在：成功，空列表
    /// - 否则：`*.reg` 文件列表（创建时间相同时按文件名倒序）
    ///
    /// 异常处理：
    /// - 目录读取失败：`IoError`
    /// - 遍历期间取消：`Cancelled`
    pub fn list_backups(&self, cancel: &CancelFlag) -> RegistryResult<Vec<BackupEntry>> {
        RegistryResult::from_result(self.read_entries(cancel), None)
    }

    /// 还原最新的一份备份。
    ///
    /// 异常处理：
    /// - 没有任何备份：`NotFound`
    /// - 其余同 [`BackupHistory::restore_backup`]
    pub fn restore_latest(&self, cancel: &CancelFlag) -> RegistryResult<bool> {
        let entries = match self.read_entries(cancel) {
            Ok(v) => v,
            Err(e) => return RegistryResult::fail(e),
        };
        match entries.first() {
            Some(latest) => self.restore_backup(&latest.file_path, cancel),
            None => RegistryResult::fail(RegistryError::NotFound("未找到备份".to_string())),
        }
    }

    /// 通过 `reg import "<file>"` 还原指定备份。
    ///
    /// 返回值：
    /// - 成功：`value = true`，`backup_path` 为被还原的文件
    ///
    /// 异常处理：
    /// - 非管理员：`Unauthorized`
    /// - 文件不存在：`NotFound`
    /// - 导入工具退出码非 0：`BackupFailed`，携带 stderr 内容
    pub fn restore_backup(&self, backup_file: &Path, cancel: &CancelFlag) -> RegistryResult<bool> {
        match self.import(backup_file, cancel) {
            Ok(()) => RegistryResult::ok(true).with_backup(backup_file.to_path_buf()),
            Err(e) => RegistryResult::fail(e),
        }
    }

    fn import(&self, backup_file: &Path, cancel: &CancelFlag) -> Result<(), RegistryError> {
        if !self.privilege.is_elevated() {
            return Err(RegistryError::admin_required());
        }
        if backup_file.as_os_str().is_empty() || !backup_file.is_file() {
            return Err(RegistryError::NotFound(format!(
                "备份文件不存在: {}",
                backup_file.display()
            )));
        }
        cancel.check()?;

        let args = vec!["import".to_string(), backup_file.to_string_lossy().into_owned()];
        let out = self.tool.run(&self.reg_tool, &args, cancel).map_err(|e| match e {
            ToolError::Cancelled => RegistryError::Cancelled,
            ToolError::Spawn(msg) => RegistryError::BackupFailed(format!("注册表还原失败: {msg}")),
        })?;
        if !out.success() {
            let detail = out.diagnostic();
            error!("注册表还原失败: {}: {}", backup_file.display(), detail);
            return Err(RegistryError::BackupFailed(format!("注册表还原失败: {detail}")));
        }
        info!("已从备份还原注册表: {}", backup_file.display());
        Ok(())
    }

    fn read_entries(&self, cancel: &CancelFlag) -> Result<Vec<BackupEntry>, RegistryError> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }
        let dir = std::fs::read_dir(&self.backup_dir).map_err(|e| {
            RegistryError::Io(format!("读取备份目录失败: {}: {e}", self.backup_dir.display()))
        })?;

        let mut entries = Vec::new();
        for dent in dir {
            cancel.check()?;
            let dent = match dent {
                Ok(d) => d,
                Err(e) => {
                    warn!("跳过无法读取的目录项: {}", e);
                    continue;
                }
            };
            let path = dent.path();
            let is_reg = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("reg"));
            if !is_reg {
                continue;
            }
            let meta = match dent.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!("读取备份文件信息失败: {}: {}", path.display(), e);
                    continue;
                }
            };
            let created_at = meta
                .created()
                .or_else(|_| meta.modified())
                .map(OffsetDateTime::from)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);
            let file_name = dent.file_name().to_string_lossy().into_owned();
            entries.push(BackupEntry {
                source_hint: source_hint(&file_name),
                file_name,
                file_path: path,
                created_at,
            });
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(entries)
    }
}

/// 从备份文件名解析来源提示。
///
/// 规则：
/// - 按 `_` 切分，少于 3 段返回 `None`
/// - 去掉前两段（日期、时间），其余部分以 `_` 重新拼接，并去掉 `.reg` 后缀
///
/// 示例：
/// - `20260101_120000_HKEY_CLASSES_ROOT___shell_MyItem.reg` → `HKEY_CLASSES_ROOT___shell_MyItem`
pub fn source_hint(file_name: &str) -> Option<String> {
    let parts: Vec<&str> = file_name.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let raw = parts[2..].join("_");
    let len = raw.len();
    let hint = if len >= 4 && raw.is_char_boundary(len - 4) && raw[len - 4..].eq_ignore_ascii_case(".reg") {
        raw[..len - 4].to_string()
    } else {
        raw
    };
    Some(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_hint_strips_timestamp_and_extension() {
        assert_eq!(
            source_hint("20260101_120000_HKEY_CLASSES_ROOT___shell_MyItem.reg").as_deref(),
            Some("HKEY_CLASSES_ROOT___shell_MyItem")
        );
        assert_eq!(source_hint("20260101_120000_Key.REG").as_deref(), Some("Key"));
        assert_eq!(source_hint("20260101_120000_notes").as_deref(), Some("notes"));
    }

    #[test]
    fn source_hint_needs_three_segments() {
        assert_eq!(source_hint("backup.reg"), None);
        assert_eq!(source_hint("20260101_120000.reg"), None);
    }
}
