use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use godisk_api::{GoDiskClient, GoDiskClientConfig, ReportKind, RetryPolicy};
use godisk_console::{
    AuthService, Console, ConsoleConfig, ContentOpener, DispatchOutcome, FileKeyValueStore,
    FileOpenRequest, Session, SessionStore,
};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<FileOpenRequest>>,
}

#[async_trait]
impl ContentOpener for RecordingOpener {
    async fn open(&self, request: FileOpenRequest) {
        self.opened.lock().expect("opener lock").push(request);
    }
}

fn client_for(server: &MockServer) -> Arc<GoDiskClient> {
    Arc::new(
        GoDiskClient::new(GoDiskClientConfig {
            api_base: format!("{}/api", server.base_url()),
            request_timeout_ms: 5_000,
        })
        .expect("client should be created"),
    )
}

fn fast_config() -> ConsoleConfig {
    ConsoleConfig {
        retry: RetryPolicy::new(2, 5),
        ..ConsoleConfig::default()
    }
}

// Shaped like the backend's encoder output: byte slices as base64 strings and
// unused pointers as -1.
fn backend_inode(index: i64, inode_type: &str, perm_raw: &str, used: &[i64]) -> serde_json::Value {
    let mut blocks = used.to_vec();
    blocks.resize(15, -1);
    json!({
        "kind": "inode",
        "diskPath": "/tmp/A.mia",
        "id": "391A",
        "index": index,
        "type": inode_type,
        "rawType": if inode_type == "dir" { 0 } else { 1 },
        "size": 64,
        "uid": 1,
        "gid": 1,
        "perm": "664",
        "permRaw": perm_raw,
        "atime": "2025-09-20 10:11:12",
        "mtime": "2025-09-20 10:11:12",
        "ctime": "2025-09-20 10:11:12",
        "blocksUsed": used.len(),
        "blocks": blocks
    })
}

#[tokio::test]
async fn integration_script_run_reconciles_every_requested_report() {
    let server = MockServer::start();
    let script = "mkdisk -size=5 -unit=M -path=/tmp/A.mia\n\
                  rep -name=disk -id=391A -path=/tmp/disk.jpg\n\
                  rep -name=tree -id=391A -path=/tmp/tree.jpg\n\
                  rep -name=inodes -id=391A -max=3\n\
                  rep -name=bm_inode -id=391A -path=/tmp/bm.txt\n\
                  rep -name=file -id=391A -path_file_ls=/users.txt -path=/tmp/f.txt";
    let exec = server.mock(|when, then| {
        when.method(POST)
            .path("/api/exec")
            .json_body(json!({ "script": script }));
        then.status(200)
            .json_body(json!({ "output": "Disco creado\nReportes generados" }));
    });
    let disk = server.mock(|when, then| {
        when.method(GET).path("/api/reports/disk").query_param("id", "391A");
        then.status(200).json_body(json!({
            "kind": "disk",
            "diskPath": "/tmp/A.mia",
            "sizeBytes": 5242880,
            "segments": [
                {"kind": "MBR", "label": "MBR", "start": 0, "size": 158, "end": 157, "percent": 1.0},
                {"kind": "P", "label": "Part1", "start": 158, "size": 1024, "end": 1181, "percent": 49.0},
                {"kind": "E", "label": "Ext", "start": 1182, "size": 1024, "end": 2205, "percent": 30.0},
                {"kind": "FREE", "label": "", "start": 2206, "size": 900, "end": 3105, "percent": 20.0}
            ],
            "extended": {
                "start": 1182,
                "size": 1024,
                "segments": [
                    {"kind": "EBR", "label": "EBR", "start": 1182, "size": 30, "end": 1211, "percent": 10.0},
                    {"kind": "L", "label": "Log1", "start": 1212, "size": 500, "end": 1711, "percent": 50.0}
                ]
            }
        }));
    });
    let tree = server.mock(|when, then| {
        when.method(GET).path("/api/reports/tree").query_param("id", "391A");
        then.status(200).json_body(json!({
            "kind": "tree",
            "root": 0,
            "nodes": [
                {"index": 0, "type": "dir", "size": 64, "blocks": {"direct": [0]}, "blocksFlat": [0], "directCards": null},
                {"index": 1, "type": "file", "size": 27, "blocks": {"direct": null}, "blocksFlat": null, "directCards": null}
            ],
            "edges": [{"parent": 0, "name": "users.txt", "child": 1}]
        }));
    });
    let inodes = server.mock(|when, then| {
        when.method(GET)
            .path("/api/reports/inodes")
            .query_param("id", "391A")
            .query_param("max", "3");
        then.status(200).json_body(json!({
            "kind": "inodes",
            "id": "391A",
            "count": 2,
            "items": [
                {"index": 0, "type": "dir", "size": 64, "blocksUsed": 1},
                {"index": 1, "type": "file", "size": 27, "blocksUsed": 1}
            ]
        }));
    });
    let inode_zero = server.mock(|when, then| {
        when.method(GET)
            .path("/api/reports/inode")
            .query_param("ruta", "0");
        then.status(200).json_body(backend_inode(0, "dir", "NzU1", &[0]));
    });
    let inode_one = server.mock(|when, then| {
        when.method(GET)
            .path("/api/reports/inode")
            .query_param("ruta", "1");
        then.status(200).json_body(backend_inode(1, "file", "NjY0", &[1, 2]));
    });
    let bitmap = server.mock(|when, then| {
        when.method(GET).path("/api/reports/bm_inode");
        then.status(200).body("   \n");
    });

    let opener = Arc::new(RecordingOpener::default());
    let console = Console::new(client_for(&server), opener.clone(), fast_config());
    let outcome = console.execute(script).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Applied {
            token: 1,
            pending: vec![ReportKind::BitmapInode]
        }
    );
    exec.assert();
    disk.assert();
    tree.assert();
    inodes.assert();
    inode_zero.assert();
    inode_one.assert();
    bitmap.assert_calls(3);

    let surfaces = console.snapshot();
    assert_eq!(surfaces.output, "Disco creado\nReportes generados");
    assert_eq!(surfaces.disk_tiles.len(), 100);
    assert_eq!(
        surfaces
            .disk_tiles
            .iter()
            .filter(|tile| tile.kind == "P")
            .count(),
        49
    );
    assert_eq!(surfaces.extended_tiles.len(), 60);
    assert_eq!(
        surfaces
            .extended_tiles
            .iter()
            .filter(|tile| tile.kind == "L")
            .count(),
        50
    );
    assert_eq!(surfaces.tree_selection, Some(0));
    assert_eq!(
        surfaces
            .inode_chain
            .iter()
            .map(|inode| inode.index)
            .collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(surfaces.inode_chain[1].perm_raw, "NjY0");
    assert!(surfaces.bitmap_inode.is_none());

    let selected = console.select_inode(1).await.expect("select inode");
    assert_eq!(selected.blocks_used, 2);
    let surfaces = console.snapshot();
    assert_eq!(surfaces.inode_selected.map(|inode| inode.index), Some(1));
    assert_eq!(surfaces.inode_runs, vec![vec![1, 2]]);

    let opened = opener.opened.lock().expect("opener lock").clone();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].ruta, "/users.txt");
    assert!(opened[0].location.contains("/api/reports/file?id=391A"));
}

#[tokio::test]
async fn integration_report_failure_turns_into_error_output() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/exec");
        then.status(200).json_body(json!({ "output": "ok" }));
    });
    let sb = server.mock(|when, then| {
        when.method(GET).path("/api/reports/sb");
        then.status(404)
            .json_body(json!({ "error": "partición 999Z no montada" }));
    });

    let console = Console::new(
        client_for(&server),
        Arc::new(RecordingOpener::default()),
        fast_config(),
    );
    let outcome = console.execute("rep -name=sb -id=999Z").await;

    sb.assert_calls(3);
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    let surfaces = console.snapshot();
    assert_eq!(surfaces.output, "Error: partición 999Z no montada");
    assert!(surfaces.superblock.is_none());
    assert!(!surfaces.busy);
}

#[tokio::test]
async fn integration_login_session_survives_reload_over_http() {
    let server = MockServer::start();
    let state = tempdir().expect("tempdir");
    let storage = state.path().join("storage.json");
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/exec")
            .json_body(json!({ "script": "login -usr=\"ana\" -pwd=\"pwd\" -id=\"391A\"" }));
        then.status(200)
            .json_body(json!({ "output": "Bienvenida ana" }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/exec")
            .json_body(json!({ "script": "login -usr=\"ana\" -pwd=\"bad\" -id=\"391A\"" }));
        then.status(200)
            .json_body(json!({ "output": "Error: bad password" }));
    });

    let client = client_for(&server);
    let auth = AuthService::new(
        client.clone(),
        Arc::new(SessionStore::open(Box::new(FileKeyValueStore::new(&storage)))),
    );
    let rejected = auth
        .login("ana", "bad", "391A")
        .await
        .expect_err("bad password must fail");
    assert_eq!(rejected.user_message(), "bad password");
    assert!(!auth.sessions().is_logged_in());

    auth.login("ana", "pwd", "391A").await.expect("login");
    let reloaded = SessionStore::open(Box::new(FileKeyValueStore::new(&storage)));
    assert_eq!(reloaded.get(), Some(Session::new("ana", "391A")));
}
