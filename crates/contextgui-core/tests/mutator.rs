mod common;

use std::sync::Arc;

use common::{dir_file_names, FakeRegTool, Fixture};
use contextgui_core::cancel::CancelFlag;
use contextgui_core::error::FailureKind;
use contextgui_core::model::ContextMenuItem;
use contextgui_core::policy::{self, MutationOp};
use contextgui_core::privilege::StaticPrivilege;
use contextgui_core::registry::{RegValue, RegistryAccessError};
use contextgui_core::scanner::RegistryScanner;

const MY_ITEM: &str = "HKEY_CLASSES_ROOT\\*\\shell\\MyItem";

fn seed_my_item(fx: &Fixture) {
    fx.registry.seed_string("*\\shell\\MyItem", "", "My Item");
    fx.registry.seed_string("*\\shell\\MyItem\\command", "", "notepad.exe %1");
}

fn rescan(fx: &Fixture) -> Vec<ContextMenuItem> {
    let scanner = RegistryScanner::new(Arc::new(fx.registry.clone()), Arc::new(StaticPrivilege::elevated()));
    scanner.scan_all(&CancelFlag::new()).value.expect("scan value")
}

fn text(s: &str) -> Option<RegValue> {
    Some(RegValue::String(s.to_string()))
}

#[test]
fn non_classes_root_path_is_rejected_without_backup() {
    let fx = Fixture::new(true);

    let result = fx.mutator.disable("HKEY_LOCAL_MACHINE\\Software", &CancelFlag::new());
    assert!(!result.success);
    assert_eq!(result.kind, Some(FailureKind::InvalidArgument));
    assert!(
        result.error.as_deref().unwrap_or_default().contains("HKEY_CLASSES_ROOT"),
        "error: {:?}",
        result.error
    );
    assert!(result.backup_path.is_none());
    assert!(fx.tool.calls().is_empty());
    assert_eq!(fx.registry.open_count(), 0);
}

#[test]
fn empty_or_prefix_only_path_is_invalid() {
    let fx = Fixture::new(true);
    let cancel = CancelFlag::new();

    for path in ["", "   ", "HKEY_CLASSES_ROOT\\"] {
        let result = fx.mutator.enable(path, &cancel);
        assert_eq!(result.kind, Some(FailureKind::InvalidArgument), "path: {path:?}");
    }
    assert!(fx.tool.calls().is_empty());
}

#[test]
fn mutation_without_admin_is_unauthorized() {
    let fx = Fixture::new(false);
    seed_my_item(&fx);

    let result = fx.mutator.disable(MY_ITEM, &CancelFlag::new());
    assert!(!result.success);
    assert_eq!(result.kind, Some(FailureKind::Unauthorized));
    assert!(fx.tool.calls().is_empty());
    assert_eq!(fx.registry.write_count(), 0);
}

#[test]
fn disable_writes_marker_after_backup() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);

    let result = fx.mutator.disable(MY_ITEM, &CancelFlag::new());
    assert!(result.success, "disable failed: {:?}", result.error);
    assert_eq!(result.value, Some(true));

    let backup = result.backup_path.expect("backup path");
    assert!(backup.is_file(), "backup missing: {}", backup.display());
    assert!(backup.starts_with(&fx.backup_dir));

    let calls = fx.tool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], "export");
    assert_eq!(calls[0][1], MY_ITEM);
    assert_eq!(calls[0][3], "/y");

    assert_eq!(fx.registry.value("*\\shell\\MyItem", "LegacyDisable"), text(""));
}

#[test]
fn disable_then_enable_round_trips() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    let cancel = CancelFlag::new();

    assert!(fx.mutator.disable(MY_ITEM, &cancel).success);
    let items = rescan(&fx);
    assert!(!items[0].is_enabled);

    assert!(fx.mutator.enable(MY_ITEM, &cancel).success);
    let items = rescan(&fx);
    assert!(items[0].is_enabled);
    assert_eq!(fx.registry.value("*\\shell\\MyItem", "LegacyDisable"), None);
}

#[test]
fn enable_without_marker_succeeds() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);

    let result = fx.mutator.enable(MY_ITEM, &CancelFlag::new());
    assert!(result.success, "enable failed: {:?}", result.error);
    assert!(result.backup_path.is_some());
}

#[test]
fn missing_target_fails_but_keeps_backup_path() {
    let fx = Fixture::new(true);

    let result = fx.mutator.disable("HKEY_CLASSES_ROOT\\*\\shell\\Ghost", &CancelFlag::new());
    assert!(!result.success);
    assert_eq!(result.kind, Some(FailureKind::NotFound));
    let backup = result.backup_path.expect("backup path");
    assert!(backup.is_file());
}

#[test]
fn backup_failure_aborts_without_writes() {
    let fx = Fixture::with_tool(true, FakeRegTool::failing(1, "ERROR: access denied"));
    seed_my_item(&fx);

    let result = fx.mutator.disable(MY_ITEM, &CancelFlag::new());
    assert!(!result.success);
    assert_eq!(result.kind, Some(FailureKind::BackupFailed));
    assert!(result.error.as_deref().unwrap_or_default().contains("access denied"));
    assert!(result.backup_path.is_none());
    assert_eq!(fx.registry.write_count(), 0);
    assert_eq!(fx.registry.value("*\\shell\\MyItem", "LegacyDisable"), None);
}

#[test]
fn cancelled_mutation_does_not_backup_or_write() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = fx.mutator.delete(MY_ITEM, &cancel);
    assert_eq!(result.kind, Some(FailureKind::Cancelled));
    assert!(fx.tool.calls().is_empty());
    assert!(fx.registry.key_exists("*\\shell\\MyItem"));
}

#[test]
fn delete_removes_whole_subtree() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);

    let result = fx.mutator.delete(MY_ITEM, &CancelFlag::new());
    assert!(result.success, "delete failed: {:?}", result.error);
    assert!(result.backup_path.is_some());
    assert!(!fx.registry.key_exists("*\\shell\\MyItem"));
    assert!(fx.registry.key_exists("*\\shell"));
}

#[test]
fn delete_of_already_removed_subkey_succeeds() {
    let fx = Fixture::new(true);
    fx.registry.seed_key("*\\shell");

    let result = fx.mutator.delete(MY_ITEM, &CancelFlag::new());
    assert!(result.success, "delete failed: {:?}", result.error);
}

#[test]
fn delete_without_parent_segment_is_invalid() {
    let fx = Fixture::new(true);
    fx.registry.seed_key("TopLevel");

    let result = fx.mutator.delete("HKEY_CLASSES_ROOT\\TopLevel", &CancelFlag::new());
    assert_eq!(result.kind, Some(FailureKind::InvalidArgument));
    assert!(fx.registry.key_exists("TopLevel"));
}

#[test]
fn update_rejects_legacy_handler_before_backup() {
    let fx = Fixture::new(true);
    fx.registry.seed_key("*\\shellex\\ContextMenuHandlers\\7-Zip");

    let result = fx.mutator.update(
        "HKEY_CLASSES_ROOT\\*\\shellex\\ContextMenuHandlers\\7-Zip",
        "7-Zip",
        None,
        "7z.exe",
        &CancelFlag::new(),
    );
    assert_eq!(result.kind, Some(FailureKind::Unsupported));
    assert!(fx.tool.calls().is_empty());
}

#[test]
fn update_rejects_blank_name_or_command() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    let cancel = CancelFlag::new();

    let blank_name = fx.mutator.update(MY_ITEM, "  ", None, "notepad.exe", &cancel);
    assert_eq!(blank_name.kind, Some(FailureKind::InvalidArgument));
    assert_eq!(blank_name.error.as_deref(), Some("显示名称不能为空"));

    let blank_command = fx.mutator.update(MY_ITEM, "Name", None, "", &cancel);
    assert_eq!(blank_command.kind, Some(FailureKind::InvalidArgument));
    assert_eq!(blank_command.error.as_deref(), Some("命令不能为空"));

    assert!(fx.tool.calls().is_empty());
}

#[test]
fn update_rejects_modern_handler_without_writing() {
    let fx = Fixture::new(true);
    fx.registry.seed_string("Directory\\shell\\Modern", "ExplorerCommandHandler", "{GUID}");
    let writes_before = fx.registry.write_count();

    let result = fx.mutator.update(
        "HKEY_CLASSES_ROOT\\Directory\\shell\\Modern",
        "Renamed",
        None,
        "cmd.exe",
        &CancelFlag::new(),
    );
    assert!(!result.success);
    assert_eq!(result.kind, Some(FailureKind::Unsupported));
    assert!(result.backup_path.is_some());
    assert_eq!(fx.registry.write_count(), writes_before);
    assert_eq!(fx.registry.value("Directory\\shell\\Modern", ""), None);
}

#[test]
fn update_writes_name_icon_and_command() {
    let fx = Fixture::new(true);
    fx.registry.seed_string("Directory\\shell\\Term", "", "Old");

    let result = fx.mutator.update(
        "HKEY_CLASSES_ROOT\\Directory\\shell\\Term",
        "Open Terminal",
        Some("wt.exe,0"),
        "wt.exe -d \"%V\"",
        &CancelFlag::new(),
    );
    assert!(result.success, "update failed: {:?}", result.error);

    assert_eq!(fx.registry.value("Directory\\shell\\Term", ""), text("Open Terminal"));
    assert_eq!(fx.registry.value("Directory\\shell\\Term", "Icon"), text("wt.exe,0"));
    assert_eq!(
        fx.registry.value("Directory\\shell\\Term\\command", ""),
        text("wt.exe -d \"%V\"")
    );

    let items = rescan(&fx);
    assert_eq!(items[0].display_name, "Open Terminal");
    assert_eq!(items[0].command.as_deref(), Some("wt.exe -d \"%V\""));
}

#[test]
fn update_with_empty_icon_clears_it() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    fx.registry.seed_string("*\\shell\\MyItem", "Icon", "old.ico");

    let result = fx.mutator.update(MY_ITEM, "My Item", Some(""), "notepad.exe %1", &CancelFlag::new());
    assert!(result.success, "update failed: {:?}", result.error);
    assert_eq!(fx.registry.value("*\\shell\\MyItem", "Icon"), None);
}

#[test]
fn every_successful_mutation_leaves_one_backup_file() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);

    let result = fx.mutator.disable(MY_ITEM, &CancelFlag::new());
    assert!(result.success);
    let names = dir_file_names(&fx.backup_dir);
    assert_eq!(names.len(), 1, "files: {names:?}");
    assert!(names[0].ends_with("_HKEY_CLASSES_ROOT___shell_MyItem.reg"), "files: {names:?}");
}

#[test]
fn policy_rejects_system_items_and_legacy_edits() {
    let system = "HKEY_CLASSES_ROOT\\*\\shell\\Windows.Share";
    let legacy = "HKEY_CLASSES_ROOT\\*\\shellex\\ContextMenuHandlers\\7-Zip";

    assert!(policy::check_mutation(MutationOp::Disable, system).is_ok());
    assert!(policy::check_mutation(MutationOp::Enable, system).is_ok());
    let err = policy::check_mutation(MutationOp::Delete, system).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Unsupported);
    assert_eq!(err.to_string(), "系统条目不支持删除");
    assert!(policy::check_mutation(MutationOp::Update, system).is_err());

    assert!(policy::check_mutation(MutationOp::Delete, legacy).is_ok());
    assert!(policy::check_mutation(MutationOp::Update, legacy).is_err());
    assert!(policy::check_mutation(MutationOp::Update, MY_ITEM).is_ok());
}

#[test]
fn policy_on_scanned_items_blocks_modern_handler_edits() {
    let fx = Fixture::new(true);
    fx.registry.seed_string("Directory\\shell\\Modern", "DelegateExecute", "{GUID}");
    fx.registry.seed_key("Directory\\shell\\OpenWith");

    let items = rescan(&fx);
    let modern = items.iter().find(|i| i.name == "Modern").expect("modern item");
    let system = items.iter().find(|i| i.name == "OpenWith").expect("system item");

    assert!(policy::check_item(MutationOp::Disable, modern).is_ok());
    assert!(policy::check_item(MutationOp::Delete, modern).is_ok());
    assert_eq!(
        policy::check_item(MutationOp::Update, modern).unwrap_err().to_string(),
        "新式处理器不支持编辑"
    );
    assert!(policy::check_item(MutationOp::Delete, system).is_err());
    assert!(policy::check_item(MutationOp::Enable, system).is_ok());
}

#[test]
fn write_failures_after_backup_map_to_kind_and_keep_backup() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    let cancel = CancelFlag::new();

    fx.registry
        .fail_writes("*\\shell\\MyItem", RegistryAccessError::AccessDenied("denied".to_string()));
    let denied = fx.mutator.disable(MY_ITEM, &cancel);
    assert_eq!(denied.kind, Some(FailureKind::Unauthorized));

    fx.registry
        .fail_writes("*\\shell\\MyItem", RegistryAccessError::Io("disk error".to_string()));
    fx.registry.seed_string("*\\shell\\MyItem", "LegacyDisable", "");
    let io = fx.mutator.enable(MY_ITEM, &cancel);
    assert_eq!(io.kind, Some(FailureKind::IoError));

    fx.registry
        .fail_writes("*\\shell", RegistryAccessError::Other("unexpected".to_string()));
    let other = fx.mutator.delete(MY_ITEM, &cancel);
    assert_eq!(other.kind, Some(FailureKind::Unexpected));

    for result in [&denied, &io, &other] {
        assert!(!result.success);
        let backup = result.backup_path.as_ref().expect("backup path");
        assert!(backup.is_file(), "backup missing: {}", backup.display());
    }
    assert_eq!(fx.registry.write_count(), 0);
    assert!(fx.registry.key_exists("*\\shell\\MyItem"));
}

#[test]
fn repeated_mutations_keep_every_backup_file() {
    let fx = Fixture::new(true);
    seed_my_item(&fx);
    let cancel = CancelFlag::new();

    let paths: Vec<_> = (0..3)
        .map(|i| {
            let result = if i % 2 == 0 {
                fx.mutator.disable(MY_ITEM, &cancel)
            } else {
                fx.mutator.enable(MY_ITEM, &cancel)
            };
            assert!(result.success, "mutation failed: {:?}", result.error);
            result.backup_path.expect("backup path")
        })
        .collect();

    assert_ne!(paths[0], paths[1]);
    assert_ne!(paths[1], paths[2]);
    assert_ne!(paths[0], paths[2]);
    assert!(paths.iter().all(|p| p.is_file()));

    // 无论是否跨秒，都应有三份独立文件且不残留临时文件。
    let names = dir_file_names(&fx.backup_dir);
    assert_eq!(names.len(), 3, "files: {names:?}");
    assert!(names.iter().all(|n| n.ends_with(".reg") && !n.starts_with('.')), "files: {names:?}");
}
