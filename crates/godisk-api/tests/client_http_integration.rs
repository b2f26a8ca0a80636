use godisk_api::{
    ConsoleBackend, FindQuery, GoDiskApiError, GoDiskClient, GoDiskClientConfig, ReportKind,
    ReportPayload, ReportRequest,
};
use httpmock::prelude::*;
use serde_json::json;

fn client_for(server: &MockServer) -> GoDiskClient {
    GoDiskClient::new(GoDiskClientConfig {
        api_base: format!("{}/api", server.base_url()),
        request_timeout_ms: 5_000,
    })
    .expect("client should be created")
}

#[tokio::test]
async fn integration_execute_posts_script_and_decodes_output() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/exec")
            .json_body(json!({ "script": "mkdisk -size=5 -unit=M -path=/tmp/A.mia" }));
        then.status(200)
            .json_body(json!({ "output": "Disco creado correctamente" }));
    });

    let response = client_for(&server)
        .execute("mkdisk -size=5 -unit=M -path=/tmp/A.mia")
        .await
        .expect("exec should succeed");

    mock.assert();
    assert_eq!(response.output, "Disco creado correctamente");
    assert_eq!(response.ok, None);
}

#[tokio::test]
async fn integration_fetch_report_sends_id_and_cache_buster() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/reports/mbr")
            .query_param("id", "391A")
            .query_param_exists("t");
        then.status(200).json_body(json!({
            "kind": "mbr",
            "diskPath": "/tmp/A.mia",
            "sizeBytes": 5242880,
            "partitions": [
                {"index": 1, "status": "active", "type": "P", "fit": "WF", "start": 158, "size": 1024, "name": "Part1", "usable": true, "id": "391A"}
            ]
        }));
    });

    let payload = client_for(&server)
        .fetch_report(&ReportRequest::new(ReportKind::Mbr, "391A"))
        .await
        .expect("report should decode");

    mock.assert();
    let ReportPayload::Mbr(report) = payload else {
        panic!("expected mbr payload");
    };
    assert_eq!(report.partitions.len(), 1);
    assert_eq!(report.partitions[0].part_type, "P");
    assert_eq!(report.partitions[0].id.as_deref(), Some("391A"));
}

#[tokio::test]
async fn integration_text_reports_are_returned_verbatim() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/reports/bm_inode")
            .query_param("id", "391A");
        then.status(200).body("1100000000\n0000000000\n");
    });

    let payload = client_for(&server)
        .fetch_report(&ReportRequest::new(ReportKind::BitmapInode, "391A"))
        .await
        .expect("bitmap should load");

    assert_eq!(
        payload,
        ReportPayload::BitmapInode("1100000000\n0000000000\n".to_string())
    );
}

#[tokio::test]
async fn integration_error_status_surfaces_structured_error_field() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/reports/sb");
        then.status(400).json_body(json!({ "error": "partición no montada" }));
    });

    let error = client_for(&server)
        .fetch_report(&ReportRequest::new(ReportKind::Superblock, "999Z"))
        .await
        .expect_err("400 must fail");

    assert!(matches!(error, GoDiskApiError::HttpStatus { status: 400, .. }));
    assert_eq!(error.user_message(), "partición no montada");
}

#[tokio::test]
async fn integration_mounts_are_normalized_through_alias_table() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/mounts").query_param_exists("t");
        then.status(200).json_body(json!([
            {"ID": "391A", "disk_path": "/tmp/A.mia", "part_name": "Part1", "start": 158, "size": 1024},
            {"id": "392A", "DiskPath": "/tmp/A.mia"}
        ]));
    });

    let mounts = client_for(&server)
        .list_mounts()
        .await
        .expect("mounts should load");

    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].id, "391A");
    assert_eq!(mounts[0].name.as_deref(), Some("Part1"));
    assert_eq!(mounts[1].disk_path, "/tmp/A.mia");
    assert_eq!(mounts[1].start, None);
}

#[tokio::test]
async fn regression_malformed_mounts_body_is_an_error_not_an_empty_list() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/mounts");
        then.status(200).body("<html>proxy error</html>");
    });

    let error = client_for(&server)
        .list_mounts()
        .await
        .expect_err("malformed body must fail");

    assert!(matches!(error, GoDiskApiError::Serde(_)));
}

#[tokio::test]
async fn integration_find_with_mount_id_uses_pre_split_shape() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/fs/find")
            .query_param("id", "391A")
            .query_param("ruta", "/home");
        then.status(200)
            .json_body(json!({ "dirs": ["user"], "files": ["users.txt"] }));
    });

    let listing = client_for(&server)
        .find(&FindQuery::for_mount("391A", "home/"))
        .await
        .expect("find should succeed");

    mock.assert();
    assert_eq!(listing.ruta, "/home");
    assert_eq!(listing.dirs, vec!["user".to_string()]);
    assert_eq!(listing.files, vec!["users.txt".to_string()]);
}

#[tokio::test]
async fn integration_list_directory_decodes_ls_items() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/fs/ls")
            .query_param("id", "391A")
            .query_param("ruta", "/");
        then.status(200).json_body(json!({
            "kind": "ls",
            "diskPath": "/tmp/A.mia",
            "id": "391A",
            "dir": "/",
            "items": [
                {"name": "users.txt", "type": "file", "rawType": 1, "inode": 1, "size": 27, "perm": "664", "uid": 1, "gid": 1, "owner": "root", "mtime": "2025-09-01", "atime": "2025-09-01", "ctime": "2025-09-01"}
            ]
        }));
    });

    let report = client_for(&server)
        .list_directory("391A", "/")
        .await
        .expect("ls should load");

    let items = report.items.expect("items present");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].owner.as_deref(), Some("root"));
    assert_eq!(items[0].group, None);
}
