//! 注册表备份（修改前导出 `.reg` 文件）。
//!
//! 文件命名：
//! - `<yyyyMMdd_HHmmss>_<净化后的键路径>.reg`（本地时间，取不到本地时区时使用 UTC）
//! - 净化规则：路径分隔符与文件名非法字符替换为 `_`
//! - 同一秒内重名时追加 `_1`、`_2` …… 已写入的备份不会被覆盖
//!
//! 原子性：
//! - 先导出到同目录下的隐藏临时文件 `.<文件名>.partial`
//! - 校验文件头后再重命名为最终文件名
//! - 任一步骤失败都会删除临时文件：要么得到完整的 `.reg`，要么什么都不留下
//!
//! 权限要求：
//! - 需要管理员权限
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::cancel::CancelFlag;
use crate::config::DEFAULT_REG_TOOL;
use crate::error::RegistryError;
use crate::paths;
use crate::privilege::PrivilegeCheck;
use crate::tool::{ToolError, ToolRunner};

/// 备份引擎。
pub struct BackupEngine {
    privilege: Arc<dyn PrivilegeCheck>,
    tool: Arc<dyn ToolRunner>,
    backup_dir: PathBuf,
    reg_tool: String,
}

impl BackupEngine {
    /// 创建备份引擎。
    ///
    /// 参数：
    /// - `privilege`：权限检测
    /// - `tool`：外部工具执行器（执行 `reg export`）
    /// - `backup_dir`：备份目录（不存在时在首次备份时创建）
    pub fn new(privilege: Arc<dyn PrivilegeCheck>, tool: Arc<dyn ToolRunner>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            privilege,
            tool,
            backup_dir: backup_dir.into(),
            reg_tool: DEFAULT_REG_TOOL.to_string(),
        }
    }

    /// 替换导出工具（默认 `reg`）。
    pub fn with_reg_tool(mut self, program: impl Into<String>) -> Self {
        self.reg_tool = program.into();
        self
    }

    /// 备份目录。
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// 导出 `key_path` 对应的注册表子树。
    ///
    /// 参数：
    /// - `key_path`：完整键路径（如 `HKEY_CLASSES_ROOT\*\shell\MyItem`）
    /// - `cancel`：取消信号（等待导出进程期间生效）
    ///
    /// 返回值：
    /// - 成功：备份文件完整路径
    ///
    /// 异常处理：
    /// - 非管理员：`Unauthorized`
    /// - 空路径：`InvalidArgument`
    /// - 导出工具退出码非 0：`BackupFailed`，携带 stderr 内容
    /// - 备份目录创建失败、导出文件校验失败/重命名失败：`BackupFailed`
    pub fn create_backup(&self, key_path: &str, cancel: &CancelFlag) -> Result<PathBuf, RegistryError> {
        if !self.privilege.is_elevated() {
            return Err(RegistryError::admin_required());
        }
        if key_path.trim().is_empty() {
            return Err(RegistryError::InvalidArgument("注册表键路径不能为空".to_string()));
        }
        cancel.check()?;

        paths::ensure_dir(&self.backup_dir).map_err(|e| match e {
            RegistryError::Io(msg) => RegistryError::BackupFailed(msg),
            other => other,
        })?;

        let file_name = backup_file_name(local_now(), key_path)?;
        let temp_path = self.backup_dir.join(format!(".{file_name}.partial"));

        if let Err(e) = self.export_to(key_path, &temp_path, cancel) {
            let _ = std::fs::remove_file(&temp_path);
            warn!("注册表备份失败: {} ({})", key_path, e);
            return Err(e);
        }

        let final_path = unused_backup_path(&self.backup_dir, &file_name);
        if let Err(e) = std::fs::rename(&temp_path, &final_path) {
            let _ = std::fs::remove_file(&temp_path);
            error!("备份文件落盘失败: {}: {}", final_path.display(), e);
            return Err(RegistryError::BackupFailed(format!(
                "备份文件落盘失败: {}: {e}",
                final_path.display()
            )));
        }

        info!("已创建注册表备份: {}", final_path.display());
        Ok(final_path)
    }

    /// 执行 `reg export "<key>" "<file>" /y` 并校验导出结果。
    fn export_to(&self, key_path: &str, target: &Path, cancel: &CancelFlag) -> Result<(), RegistryError> {
        let args = vec![
            "export".to_string(),
            key_path.to_string(),
            target.to_string_lossy().into_owned(),
            "/y".to_string(),
        ];
        let out = self.tool.run(&self.reg_tool, &args, cancel).map_err(|e| match e {
            ToolError::Cancelled => RegistryError::Cancelled,
            ToolError::Spawn(msg) => RegistryError::BackupFailed(format!("注册表导出失败: {msg}")),
        })?;
        if !out.success() {
            return Err(RegistryError::BackupFailed(format!(
                "注册表导出失败: {}",
                out.diagnostic()
            )));
        }
        verify_export(target)
    }
}

/// 校验导出文件：存在、非空、文件头为 `.reg` 格式。
///
/// 可接受的文件头：
/// - UTF-16 LE BOM（`reg export` 默认输出）
/// - `Windows Registry Editor`（可带 UTF-8 BOM）
/// - `REGEDIT4`
fn verify_export(path: &Path) -> Result<(), RegistryError> {
    let mut head = Vec::with_capacity(64);
    File::open(path)
        .and_then(|f| f.take(64).read_to_end(&mut head))
        .map_err(|e| RegistryError::BackupFailed(format!("导出文件不可读: {}: {e}", path.display())))?;

    let text = head.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&head);
    let valid = head.starts_with(&[0xFF, 0xFE])
        || text.starts_with(b"Windows Registry Editor")
        || text.starts_with(b"REGEDIT4");
    if valid {
        Ok(())
    } else {
        Err(RegistryError::BackupFailed(format!(
            "导出文件格式无效: {}",
            path.display()
        )))
    }
}

/// 选择不与已有备份冲突的最终路径。
///
/// 同一秒内对同一键的多次备份会得到相同文件名；已有文件不可覆盖，
/// 依次尝试 `<名称>_1.reg`、`<名称>_2.reg` ……
fn unused_backup_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name.strip_suffix(".reg").unwrap_or(file_name);
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{n}.reg")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// 生成备份文件名：`<yyyyMMdd_HHmmss>_<净化后的键路径>.reg`。
pub fn backup_file_name(at: OffsetDateTime, key_path: &str) -> Result<String, RegistryError> {
    let stamp = at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .map_err(|e| RegistryError::Unexpected(format!("格式化时间失败: {e}")))?;
    Ok(format!("{stamp}_{}.reg", sanitize_key_path(key_path)))
}

/// 将键路径净化为可用作文件名的文本。
///
/// 规则：
/// - `\`、`/` 与 Windows 文件名非法字符（`<>:"|?*`、控制字符）替换为 `_`
pub fn sanitize_key_path(key_path: &str) -> String {
    key_path
        .chars()
        .map(|c| match c {
            '\\' | '/' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
