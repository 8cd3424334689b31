//! 集成测试公共工具：临时目录、内存注册表装配、可编程的导出/导入工具。
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use contextgui_core::backup::BackupEngine;
use contextgui_core::cancel::CancelFlag;
use contextgui_core::history::BackupHistory;
use contextgui_core::memory::MemoryRegistry;
use contextgui_core::mutator::RegistryMutator;
use contextgui_core::privilege::StaticPrivilege;
use contextgui_core::tool::{ToolError, ToolOutput, ToolRunner};
use uuid::Uuid;

pub const REG_HEADER: &str = "Windows Registry Editor Version 5.00\r\n";

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content)
        .unwrap_or_else(|e| panic!("write {} failed: {e}", path.display()));
}

pub fn dir_file_names(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub struct CleanupDir(pub PathBuf);

impl Drop for CleanupDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// 模拟 `reg export` / `reg import`。
///
/// - 成功导出时向目标文件写入合法的 `.reg` 文件头
/// - 退出码与 stderr 可配置，用于构造失败场景
pub struct FakeRegTool {
    calls: Mutex<Vec<Vec<String>>>,
    exit_code: i32,
    stderr: String,
    export_content: String,
}

impl FakeRegTool {
    pub fn ok() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code: 0,
            stderr: String::new(),
            export_content: REG_HEADER.to_string(),
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stderr: stderr.to_string(),
            ..Self::ok()
        }
    }

    /// 退出码为 0，但写出的文件不是 `.reg` 格式。
    pub fn writing(content: &str) -> Self {
        Self {
            export_content: content.to_string(),
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("lock calls").clone()
    }
}

impl ToolRunner for FakeRegTool {
    fn run(&self, _program: &str, args: &[String], cancel: &CancelFlag) -> Result<ToolOutput, ToolError> {
        self.calls.lock().expect("lock calls").push(args.to_vec());
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        if self.exit_code == 0 && args.first().map(String::as_str) == Some("export") {
            let target = args.get(2).expect("export target");
            std::fs::write(target, &self.export_content).expect("write export");
        }
        Ok(ToolOutput {
            exit_code: Some(self.exit_code),
            stdout: String::new(),
            stderr: self.stderr.clone(),
        })
    }
}

/// 一套基于内存注册表的变更环境。
pub struct Fixture {
    pub registry: MemoryRegistry,
    pub tool: Arc<FakeRegTool>,
    pub backup_dir: PathBuf,
    pub mutator: RegistryMutator,
    _cleanup: CleanupDir,
}

impl Fixture {
    pub fn new(elevated: bool) -> Self {
        Self::with_tool(elevated, FakeRegTool::ok())
    }

    pub fn with_tool(elevated: bool, tool: FakeRegTool) -> Self {
        let dir = unique_temp_dir("contextgui-core");
        let backup_dir = dir.join("Backups");
        let registry = MemoryRegistry::new();
        let tool = Arc::new(tool);
        let privilege = Arc::new(StaticPrivilege(elevated));
        let backup = Arc::new(BackupEngine::new(privilege.clone(), tool.clone(), backup_dir.clone()));
        let mutator = RegistryMutator::new(Arc::new(registry.clone()), privilege, backup);
        Self {
            registry,
            tool,
            backup_dir,
            mutator,
            _cleanup: CleanupDir(dir),
        }
    }

    pub fn history(&self, elevated: bool) -> BackupHistory {
        BackupHistory::new(
            Arc::new(StaticPrivilege(elevated)),
            self.tool.clone(),
            self.backup_dir.clone(),
        )
    }
}
