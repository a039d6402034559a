// Integration tests for the fgtctl binary

use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Command isolated from any user or project config.
fn fgtctl(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fgtctl");
    cmd.current_dir(home.path())
        .env("FGTCTL_CONFIG_DIR", home.path().join("config"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_request_commands() {
    let home = tempfile::tempdir().unwrap();
    fgtctl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("FortiGate"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("--max-fields"));
}

#[test]
fn completion_script_mentions_binary() {
    let home = tempfile::tempdir().unwrap();
    fgtctl(&home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fgtctl"));
}

#[test]
fn missing_host_is_reported() {
    let home = tempfile::tempdir().unwrap();
    fgtctl(&home)
        .args(["-k", "key", "get", "/cmdb/firewall/address"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("host is required"));
}

#[test]
fn renders_address_table() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/cmdb/firewall/address")
            .header("Authorization", "Bearer key")
            .query_param("vdom", "root");
        then.status(200).json_body(json!({
            "status": "success",
            "results": [
                {"name": "h1", "subnet": "10.1.1.1 255.255.255.255", "type": "ipmask", "comment": "c1", "uuid": "x"}
            ]
        }));
    });

    let addr = server.address().to_string();
    fgtctl(&home)
        .args(["--host", addr.as_str(), "--no-ssl", "-k", "key"])
        .args(["get", "/cmdb/firewall/address", "-q", "vdom=root"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Status Code: 200"))
        .stdout(predicate::str::contains("Endpoint: /cmdb/firewall/address | Records: 1"))
        .stdout(predicate::str::contains("| name"))
        .stdout(predicate::str::contains("h1"))
        .stdout(predicate::str::contains("uuid").not());
    mock.assert();
}

#[test]
fn http_errors_exit_with_two() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/api/v2/cmdb/firewall/address/missing");
        then.status(404)
            .json_body(json!({"status": "error", "http_status": 404}));
    });

    let addr = server.address().to_string();
    fgtctl(&home)
        .args(["--ip", addr.as_str(), "--no-ssl", "-k", "key", "-f", "json"])
        .args(["delete", "/cmdb/firewall/address/missing"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""http_status":404"#));
}

#[test]
fn text_error_page_is_printed_in_table_mode() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/monitor/system/status");
        then.status(502)
            .header("content-type", "text/html")
            .body("<html>Bad Gateway: upstream daemon crashed</html>");
    });

    let addr = server.address().to_string();
    fgtctl(&home)
        .args(["--host", addr.as_str(), "--no-ssl", "-k", "key"])
        .args(["get", "/monitor/system/status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Status Code: 502"))
        .stdout(predicate::str::contains("Cannot render a string response as a table"))
        .stdout(predicate::str::contains(
            "<html>Bad Gateway: upstream daemon crashed</html>",
        ));
}

#[test]
fn unreachable_host_exits_with_one() {
    let home = tempfile::tempdir().unwrap();
    fgtctl(&home)
        .args(["-i", "127.0.0.1:1", "--no-ssl", "-k", "key", "--timeout", "5", "-f", "pretty"])
        .args(["get", "/monitor/system/status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Status Code: -1"))
        .stdout(predicate::str::contains("Connection failed"));
}

#[test]
fn configure_then_show_masks_secrets() {
    let home = tempfile::tempdir().unwrap();
    fgtctl(&home)
        .args(["-i", "192.168.1.99", "-k", "secret-key", "configure", "--scope", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved connection settings"));

    fgtctl(&home)
        .arg("config-show")
        .assert()
        .success()
        .stdout(predicate::str::contains("192.168.1.99"))
        .stdout(predicate::str::contains("*****"))
        .stdout(predicate::str::contains("secret-key").not());
}

#[test]
fn explicit_ini_config_is_used() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/monitor/system/resource/usage")
            .header("Authorization", "Bearer ini-key");
        then.status(200).json_body(json!({
            "results": {"cpu": [
                {"current": 5, "historical": {"1-min": {"min": 3, "max": 7, "average": 5}}}
            ]}
        }));
    });
    let ini = home.path().join("fgt.ini");
    std::fs::write(
        &ini,
        format!(
            "[fortigate]\nhost = {}\napikey = ini-key\nuse_ssl = false\n",
            server.address()
        ),
    )
    .unwrap();

    fgtctl(&home)
        .args(["-c", ini.to_str().unwrap(), "get", "/monitor/system/resource/usage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Cpu ==="))
        .stdout(predicate::str::contains("1-min"));
    mock.assert();
}
