//! 右键菜单条目、备份记录与统一操作结果模型。
//!
//! 约定：
//! - 该模块仅定义数据结构与纯函数，不执行任何 IO
//! - 所有结构均可序列化为 JSON（命令行 `--json` 输出与界面层共用）
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{FailureKind, RegistryError};

/// 条目分类（仅由发现该条目的基路径决定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuCategory {
    #[serde(rename = "All Files")]
    AllFiles,
    #[serde(rename = "Folder")]
    Folder,
    #[serde(rename = "Folder Background")]
    FolderBackground,
    #[serde(rename = "Drive")]
    Drive,
    #[serde(rename = "Other")]
    Other,
}

impl MenuCategory {
    /// 界面展示用名称。
    pub fn label(self) -> &'static str {
        match self {
            MenuCategory::AllFiles => "All Files",
            MenuCategory::Folder => "Folder",
            MenuCategory::FolderBackground => "Folder Background",
            MenuCategory::Drive => "Drive",
            MenuCategory::Other => "Other",
        }
    }
}

impl fmt::Display for MenuCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 扫描得到的一条右键菜单条目。
///
/// 字段说明：
/// - `name`：原始子键名（在所属基路径内唯一）
/// - `registry_path`：`HKEY_CLASSES_ROOT\<基路径>\<name>`，后续所有操作均以此为标识
/// - `display_name`：默认值，其次 `MUIVerb`，都没有则为 `name`
/// - `is_enabled`：不存在 `LegacyDisable` 值时为 true
/// - `command`：`command` 子键默认值，或新式处理器的描述文本
/// - `is_system_item`：系统内置条目（`Windows.*`、`OpenWith`、`Sharing`），禁止删除与编辑
/// - `is_legacy_handler`：位于 `shellex\ContextMenuHandlers` 下，仅支持启用/禁用
/// - `is_modern_handler`：带 `DelegateExecute`/`ExplorerCommandHandler`，仅支持启用/禁用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuItem {
    pub name: String,
    pub registry_path: String,
    pub display_name: String,
    pub is_enabled: bool,
    pub icon_path: Option<String>,
    pub command: Option<String>,
    pub is_system_item: bool,
    pub is_legacy_handler: bool,
    pub is_modern_handler: bool,
    pub category: MenuCategory,
}

impl ContextMenuItem {
    /// 是否允许启用/禁用（所有条目均允许）。
    pub fn can_toggle(&self) -> bool {
        true
    }

    /// 是否允许删除（系统条目禁止删除）。
    pub fn can_delete(&self) -> bool {
        !self.is_system_item
    }

    /// 是否允许编辑：系统条目、旧式处理器、新式处理器均不可编辑。
    pub fn can_edit(&self) -> bool {
        !self.is_system_item && !self.is_legacy_handler && !self.is_modern_handler
    }
}

/// 一份已落盘的备份文件记录。
///
/// 说明：
/// - `created_at` 取文件创建时间；文件系统不支持创建时间时退回修改时间
/// - `source_hint` 为从文件名解析出的来源提示（尽力而为，可能为空）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub file_path: PathBuf,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub source_hint: Option<String>,
}

/// 所有查询/变更操作的统一结果。
///
/// 约定：
/// - `success = false` 时 `error` 与 `kind` 必有值
/// - 只要备份已成功创建，`backup_path` 就会携带，无论后续操作成功与否
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResult<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<String>,
    pub kind: Option<FailureKind>,
    pub backup_path: Option<PathBuf>,
}

impl<T> RegistryResult<T> {
    /// 成功结果（无备份）。
    pub fn ok(value: T) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            kind: None,
            backup_path: None,
        }
    }

    /// 失败结果（无备份）。
    pub fn fail(err: RegistryError) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
            backup_path: None,
        }
    }

    /// 由 `Result` 构造，并附带（可选的）备份路径。
    pub fn from_result(result: Result<T, RegistryError>, backup_path: Option<PathBuf>) -> Self {
        let mut out = match result {
            Ok(v) => Self::ok(v),
            Err(e) => Self::fail(e),
        };
        out.backup_path = backup_path;
        out
    }

    /// 附带备份路径。
    pub fn with_backup(mut self, backup_path: PathBuf) -> Self {
        self.backup_path = Some(backup_path);
        self
    }
}
