// Integration tests for the public indexing API
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use codeatlas::{AnalysisTools, CodeIndexer, IndexError, IndexerConfig, SymbolKind, VERSION};

fn indexer_with(cache: &TempDir, watch: bool) -> CodeIndexer {
    let config = IndexerConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        watch,
    };
    CodeIndexer::new(&config).unwrap()
}

fn write_sample_project(root: &Path) {
    fs::create_dir_all(root.join("src/main/java")).unwrap();
    fs::create_dir_all(root.join("web")).unwrap();
    fs::create_dir_all(root.join("node_modules/lib")).unwrap();
    fs::write(
        root.join("src/main/java/Order.java"),
        r#"package com.example.shop;

import java.util.List;

public class Order {
    void confirm() { ship(); }
    void ship() {}
}
"#,
    )
    .unwrap();
    fs::write(
        root.join("web/cart.ts"),
        "import { Order } from './order';\nexport function shipOrder(): void {}\n",
    )
    .unwrap();
    fs::write(root.join("web/app.jsx"), "function boot() { render(); }\nfunction render() {}\n").unwrap();
    fs::write(root.join("node_modules/lib/skip.js"), "function skipped() {}\n").unwrap();
    fs::write(root.join("README.md"), "# sample\n").unwrap();
}

#[test]
fn version_is_exported() {
    assert!(!VERSION.is_empty());
}

#[test]
fn full_build_counts_non_ignored_files() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, false);
    let report = indexer.set_project_path(project.path()).unwrap();
    assert_eq!(report.file_count, 3);
}

#[test]
fn files_match_by_relative_path_and_basename() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, false);
    indexer.set_project_path(project.path()).unwrap();

    assert_eq!(indexer.find_files("*.java"), vec!["src/main/java/Order.java"]);
    assert_eq!(indexer.find_files("Order.java"), vec!["src/main/java/Order.java"]);
    assert!(indexer.find_files("*.py").is_empty());
}

#[test]
fn call_graph_connects_confirm_to_ship() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, false);
    indexer.set_project_path(project.path()).unwrap();

    let report = indexer.find_functions_calling("ship");
    assert_eq!(report.callers.len(), 1);
    assert_eq!(report.callers[0].symbol_name, "Order.confirm");
}

#[test]
fn symbol_usage_is_loose_by_design() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, false);
    indexer.set_project_path(project.path()).unwrap();

    let matches = indexer.find_symbol_usage("Order", None);
    let names: Vec<&str> = matches.iter().map(|m| m.symbol_name.as_str()).collect();
    assert!(names.contains(&"Order"));
    assert!(names.contains(&"shipOrder"));

    let classes = indexer.find_symbol_usage("Order", Some(SymbolKind::Class));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].symbol_name, "Order");
}

#[test]
fn refresh_picks_up_new_files() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, false);
    indexer.set_project_path(project.path()).unwrap();

    fs::write(project.path().join("web/extra.ts"), "export function extra() {}\n").unwrap();
    let report = indexer.refresh_index().unwrap();
    assert_eq!(report.file_count, 4);
    assert_eq!(indexer.find_files("extra.ts"), vec!["web/extra.ts"]);
}

#[test]
fn watcher_indexes_created_files() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, true);
    indexer.set_project_path(project.path()).unwrap();

    fs::write(
        project.path().join("web/fresh.ts"),
        "export function fresh() {}\n",
    )
    .unwrap();
    thread::sleep(Duration::from_secs(2));

    assert_eq!(indexer.find_files("fresh.ts"), vec!["web/fresh.ts"]);
    let analysis = indexer.analyse_file("web/fresh.ts").unwrap();
    assert_eq!(analysis.record.functions, vec!["fresh"]);
    indexer.shutdown();
}

#[test]
fn watcher_replaces_modified_files_in_place() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, true);
    indexer.set_project_path(project.path()).unwrap();

    fs::write(
        project.path().join("web/app.jsx"),
        "function boot() {}\nfunction shutdownHook() {}\n",
    )
    .unwrap();
    thread::sleep(Duration::from_secs(2));

    let analysis = indexer.analyse_file("web/app.jsx").unwrap();
    assert_eq!(analysis.record.functions, vec!["boot", "shutdownHook"]);
    // The old `render` symbol is gone, not accumulated alongside.
    assert!(indexer.find_symbol_usage("render", None).is_empty());
    indexer.shutdown();
}

#[test]
fn watcher_removes_deleted_files() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, true);
    indexer.set_project_path(project.path()).unwrap();

    fs::remove_file(project.path().join("web/cart.ts")).unwrap();
    thread::sleep(Duration::from_secs(2));

    assert!(indexer.find_files("cart.ts").is_empty());
    assert!(matches!(
        indexer.analyse_file("web/cart.ts"),
        Err(IndexError::NotIndexed(_))
    ));
    assert!(indexer.find_symbol_usage("shipOrder", None).is_empty());
    indexer.shutdown();
}

#[test]
fn shutdown_stops_the_watcher() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let indexer = indexer_with(&cache, true);
    indexer.set_project_path(project.path()).unwrap();
    assert!(indexer.is_watching());

    indexer.shutdown();
    indexer.shutdown();
    assert!(!indexer.is_watching());

    fs::write(project.path().join("web/late.ts"), "export function late() {}\n").unwrap();
    thread::sleep(Duration::from_millis(1500));
    assert!(indexer.find_files("late.ts").is_empty());
}

#[test]
fn snapshot_restores_across_instances() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    {
        let indexer = indexer_with(&cache, false);
        indexer.set_project_path(project.path()).unwrap();
    }

    let warm = indexer_with(&cache, false);
    assert!(warm.try_restore(project.path()).unwrap());
    assert_eq!(warm.find_files("*").len(), 3);
    let report = warm.find_functions_calling("ship");
    assert_eq!(report.callers.len(), 1);
}

#[tokio::test]
async fn agent_tool_surface_end_to_end() {
    let cache = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_sample_project(project.path());

    let tools = AnalysisTools::new(Arc::new(indexer_with(&cache, false)));

    let built = tools
        .execute_tool("set_project_path", json!({"path": project.path()}))
        .await
        .unwrap();
    assert!(built.success);
    assert_eq!(built.data["file_count"], 3);

    let structure = tools.execute_tool("get_project_structure", json!({})).await.unwrap();
    assert!(structure.success);
    assert_eq!(structure.data["total_files"], 3);
    assert_eq!(structure.data["tree"]["web"]["cart.ts"], "file");

    let callers = tools
        .execute_tool("find_functions_calling", json!({"function_name": "ship"}))
        .await
        .unwrap();
    assert!(callers.success);
    assert_eq!(callers.data["total_callers"], 1);

    let imports = tools
        .execute_tool("get_file_imports", json!({"file_path": "src/main/java/Order.java"}))
        .await
        .unwrap();
    assert!(imports.success);
    assert_eq!(imports.data["imports"][0], "java.util.List");
    assert_eq!(imports.data["package"], "com.example.shop");

    let in_file = tools
        .execute_tool(
            "search_in_file",
            json!({"file_path": "web/cart.ts", "pattern": "shiporder"}),
        )
        .await
        .unwrap();
    assert!(in_file.success);
    assert_eq!(in_file.data["total_matches"], 1);

    let done = tools.execute_tool("shutdown", json!({})).await.unwrap();
    assert!(done.success);
}
