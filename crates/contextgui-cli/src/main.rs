//! ContextGUI 命令行前端。
//!
//! 职责：
//! - 扫描资源管理器右键菜单条目并输出（文本或 JSON）
//! - 对条目执行禁用/启用/删除/编辑（修改前自动备份）
//! - 浏览备份历史并还原指定备份或最新备份
//! - 环境自检（管理员权限、备份目录、导出工具）
//!
//! 权限要求：
//! - 扫描与修改需要管理员权限；浏览备份历史不需要
//!
//! 作者：ContextGUI 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use contextgui_core::backup::BackupEngine;
use contextgui_core::cancel::CancelFlag;
use contextgui_core::config::AppConfig;
use contextgui_core::history::BackupHistory;
use contextgui_core::model::{BackupEntry, ContextMenuItem, RegistryResult};
use contextgui_core::mutator::RegistryMutator;
use contextgui_core::paths;
use contextgui_core::policy::{self, MutationOp};
use contextgui_core::privilege::PrivilegeCheck;
use contextgui_core::scanner::RegistryScanner;
use contextgui_core::tool::ToolRunner;
use contextgui_windows::process::ProcessToolRunner;
use serde::Serialize;
use tracing::{info, warn};

/// 命令行参数。
///
/// 说明：
/// - `config` 指向配置文件（默认 `%APPDATA%\ContextGUI\config.json`，不存在时使用默认配置）
/// - `json` 输出完整的结果 JSON，便于脚本处理
#[derive(Debug, Parser)]
#[command(name = "contextgui", version)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令。
#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// 扫描全部右键菜单条目。
    Scan,
    /// 禁用条目（写入 `LegacyDisable`）。
    Disable { registry_path: String },
    /// 启用条目（移除 `LegacyDisable`）。
    Enable { registry_path: String },
    /// 删除条目（整棵子键）。
    Delete { registry_path: String },
    /// 编辑条目的显示名称、图标与命令。
    Update {
        registry_path: String,
        #[arg(long)]
        name: String,
        /// 省略或传空字符串则清除图标。
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        command: String,
    },
    /// 列出备份历史（最新在前）。
    Backups,
    /// 还原指定备份文件。
    Restore { file: PathBuf },
    /// 还原最新的一份备份。
    RestoreLatest,
    /// 环境自检。
    Doctor,
}

/// 程序入口：加载配置、初始化日志，并在 Tokio 阻塞线程池中执行子命令。
///
/// 异常处理：
/// - 操作失败时返回 `Err`，进程以非 0 退出码结束
fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_deref())?;
    init_logging(config.log_filter.as_deref());

    let rt = tokio::runtime::Runtime::new().context("创建 Tokio Runtime 失败")?;
    rt.block_on(run(cli, config, config_path))
}

fn init_logging(filter: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter.unwrap_or("info")));
    // stdout 留给结果输出（尤其是 --json），日志统一写 stderr。
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 读取配置文件。
///
/// 返回值：
/// - 配置内容与实际使用的配置文件路径（无法确定默认路径时为 `None`）
fn load_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => paths::default_config_file().ok(),
    };
    let config = match &path {
        Some(p) => AppConfig::load(p).with_context(|| format!("加载配置失败: {}", p.display()))?,
        None => AppConfig::default(),
    };
    Ok((config, path))
}

async fn run(cli: Cli, config: AppConfig, config_path: Option<PathBuf>) -> Result<()> {
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到 Ctrl+C，正在取消当前操作");
            on_signal.cancel();
        }
    });

    let app = App::new(config, config_path);
    let json = cli.json;
    let command = cli.command;
    tokio::task::spawn_blocking(move || dispatch(&app, command, json, &cancel))
        .await
        .context("后台任务异常退出")?
}

/// 子命令运行所需的共享依赖。
struct App {
    config: AppConfig,
    config_path: Option<PathBuf>,
    privilege: Arc<dyn PrivilegeCheck>,
    tool: Arc<dyn ToolRunner>,
}

impl App {
    fn new(config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            privilege: platform::privilege(),
            tool: Arc::new(ProcessToolRunner::new()),
        }
    }

    fn backup_dir(&self) -> Result<PathBuf> {
        self.config.backup_dir().context("无法确定备份目录")
    }

    fn backup_engine(&self) -> Result<Arc<BackupEngine>> {
        let engine = BackupEngine::new(self.privilege.clone(), self.tool.clone(), self.backup_dir()?)
            .with_reg_tool(self.config.reg_tool.clone());
        Ok(Arc::new(engine))
    }

    fn history(&self) -> Result<BackupHistory> {
        Ok(
            BackupHistory::new(self.privilege.clone(), self.tool.clone(), self.backup_dir()?)
                .with_reg_tool(self.config.reg_tool.clone()),
        )
    }

    fn scanner(&self) -> Result<RegistryScanner> {
        Ok(RegistryScanner::new(platform::registry()?, self.privilege.clone()))
    }

    fn mutator(&self) -> Result<RegistryMutator> {
        Ok(RegistryMutator::new(
            platform::registry()?,
            self.privilege.clone(),
            self.backup_engine()?,
        ))
    }
}

fn dispatch(app: &App, command: Commands, json: bool, cancel: &CancelFlag) -> Result<()> {
    match command {
        Commands::Scan => {
            let result = app.scanner()?.scan_all(cancel);
            report(&result, json, print_items)
        }
        Commands::Disable { registry_path } => mutate(app, MutationOp::Disable, &registry_path, json, |m| {
            m.disable(&registry_path, cancel)
        }),
        Commands::Enable { registry_path } => mutate(app, MutationOp::Enable, &registry_path, json, |m| {
            m.enable(&registry_path, cancel)
        }),
        Commands::Delete { registry_path } => mutate(app, MutationOp::Delete, &registry_path, json, |m| {
            m.delete(&registry_path, cancel)
        }),
        Commands::Update {
            registry_path,
            name,
            icon,
            command,
        } => mutate(app, MutationOp::Update, &registry_path, json, |m| {
            m.update(&registry_path, &name, icon.as_deref(), &command, cancel)
        }),
        Commands::Backups => {
            let result = app.history()?.list_backups(cancel);
            report(&result, json, print_backups)
        }
        Commands::Restore { file } => {
            let result = app.history()?.restore_backup(&file, cancel);
            finish_restore(&result, json)
        }
        Commands::RestoreLatest => {
            let result = app.history()?.restore_latest(cancel);
            finish_restore(&result, json)
        }
        Commands::Doctor => doctor(app, json),
    }
}

/// 执行一次修改：先过调用方策略检查，再交给变更器；成功后通知资源管理器刷新。
fn mutate(
    app: &App,
    op: MutationOp,
    registry_path: &str,
    json: bool,
    apply: impl FnOnce(&RegistryMutator) -> RegistryResult<bool>,
) -> Result<()> {
    let result = match policy::check_mutation(op, registry_path) {
        Ok(()) => apply(&app.mutator()?),
        Err(e) => {
            warn!("{}被拒绝: {}: {}", op, registry_path, e);
            RegistryResult::fail(e)
        }
    };
    if result.success {
        platform::notify_shell();
        info!("{}完成: {}", op, registry_path);
    }
    report(&result, json, |_| {
        println!("{op}完成: {registry_path}");
    })
}

fn finish_restore(result: &RegistryResult<bool>, json: bool) -> Result<()> {
    if result.success {
        platform::notify_shell();
    }
    report(result, json, |_| {
        if let Some(p) = &result.backup_path {
            println!("已还原: {}", p.display());
        }
    })
}

/// 输出结果并将失败转换为 `Err`（用于非 0 退出码）。
///
/// 说明：
/// - `--json` 模式下无论成功失败都输出完整结果
/// - 文本模式下失败信息由 `main` 返回的错误打印到 stderr
fn report<T: Serialize>(result: &RegistryResult<T>, json: bool, render: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result).context("序列化结果失败")?);
    } else if let Some(v) = &result.value {
        render(v);
    }
    if result.success {
        Ok(())
    } else {
        let msg = result.error.clone().unwrap_or_else(|| "未知错误".to_string());
        match (&result.backup_path, json) {
            // 修改已备份但未完成时，提示备份位置以便手动还原。
            (Some(p), false) => Err(anyhow!("{msg}（备份文件: {}）", p.display())),
            _ => Err(anyhow!(msg)),
        }
    }
}

fn print_items(items: &Vec<ContextMenuItem>) {
    for item in items {
        let state = if item.is_enabled { "启用" } else { "禁用" };
        let mut flags = Vec::new();
        if item.is_system_item {
            flags.push("系统");
        }
        if item.is_legacy_handler {
            flags.push("旧式");
        }
        if item.is_modern_handler {
            flags.push("新式");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(","))
        };
        println!(
            "[{state}] {} ({}){flags}\n    {}",
            item.display_name, item.category, item.registry_path
        );
        if let Some(cmd) = &item.command {
            println!("    命令: {cmd}");
        }
    }
    println!("共 {} 项", items.len());
}

fn print_backups(entries: &Vec<BackupEntry>) {
    for entry in entries {
        println!(
            "{}  {}  {}",
            entry.created_at,
            entry.file_name,
            entry.source_hint.as_deref().unwrap_or("-")
        );
    }
    println!("共 {} 份备份", entries.len());
}

/// 自检结果。
#[derive(Debug, Serialize)]
struct DoctorReport {
    platform: &'static str,
    admin: bool,
    config_file: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    backup_dir_error: Option<String>,
    reg_tool: String,
    registry_available: bool,
}

fn doctor(app: &App, json: bool) -> Result<()> {
    let (backup_dir, backup_dir_error) = match app.backup_dir() {
        Ok(p) => (Some(p), None),
        Err(e) => (None, Some(format!("{e:#}"))),
    };
    let report = DoctorReport {
        platform: std::env::consts::OS,
        admin: app.privilege.is_elevated(),
        config_file: app.config_path.clone(),
        backup_dir,
        backup_dir_error,
        reg_tool: app.config.reg_tool.clone(),
        registry_available: platform::registry().is_ok(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("序列化自检结果失败")?);
        return Ok(());
    }
    println!("platform = {}", report.platform);
    println!("admin = {}", report.admin);
    println!(
        "config_file = {}",
        report
            .config_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    match (&report.backup_dir, &report.backup_dir_error) {
        (Some(p), _) => println!("backup_dir = {}", p.display()),
        (None, Some(e)) => println!("backup_dir = <{e}>"),
        (None, None) => println!("backup_dir = -"),
    }
    println!("reg_tool = {}", report.reg_tool);
    println!("registry_available = {}", report.registry_available);
    Ok(())
}

#[cfg(windows)]
mod platform {
    use std::sync::Arc;

    use anyhow::Result;
    use contextgui_core::privilege::PrivilegeCheck;
    use contextgui_core::registry::RegistryAccess;
    use contextgui_windows::elevation::AdminPrivilege;
    use contextgui_windows::registry::WinRegistry;
    use contextgui_windows::shell;

    pub fn registry() -> Result<Arc<dyn RegistryAccess>> {
        Ok(Arc::new(WinRegistry::classes_root()))
    }

    pub fn privilege() -> Arc<dyn PrivilegeCheck> {
        Arc::new(AdminPrivilege)
    }

    pub fn notify_shell() {
        shell::notify_association_changed();
    }
}

#[cfg(not(windows))]
mod platform {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use contextgui_core::privilege::{PrivilegeCheck, StaticPrivilege};
    use contextgui_core::registry::RegistryAccess;

    pub fn registry() -> Result<Arc<dyn RegistryAccess>> {
        Err(anyhow!("注册表操作仅支持 Windows"))
    }

    pub fn privilege() -> Arc<dyn PrivilegeCheck> {
        Arc::new(StaticPrivilege::denied())
    }

    pub fn notify_shell() {}
}
