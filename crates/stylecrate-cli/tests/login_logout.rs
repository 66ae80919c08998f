//! Integration tests for login/logout and session-backed commands.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_storage(home: &Path) -> Value {
    let contents = fs::read_to_string(home.join("storage.json")).unwrap();
    serde_json::from_str(&contents).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("userLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"userLogin": {
                "user": {"name": "Ada", "email": "ada@example.com", "role": "USER", "style_survey": 2},
                "token": "abcdefghijklmnop"
            }}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_stores_token_and_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .env_remove("STYLECRATE_PASSWORD")
        .args(["login", "--email", "ada@example.com"])
        .write_stdin("secret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged in as Ada"))
        .stdout(predicate::str::contains("abcdefgh..."));

    let storage = read_storage(home.path());
    assert_eq!(storage["token"], "abcdefghijklmnop");
    let user: Value = serde_json::from_str(storage["user"].as_str().unwrap()).unwrap();
    assert_eq!(user["name"], "Ada");

    let cookies = fs::read_to_string(home.path().join("cookies.json")).unwrap();
    assert!(cookies.contains("auth="));
}

#[tokio::test]
async fn test_login_sends_password_from_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("\"password\":\"hunter2\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"userLogin": {"user": {"name": "Ada"}, "token": "tok"}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada"));
}

#[tokio::test]
async fn test_login_invalid_credentials_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Invalid credentials"}],
            "data": {"userLogin": null}
        })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    assert!(!home.path().join("storage.json").exists());
}

#[tokio::test]
async fn test_login_server_down_asks_to_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please try again"));
}

#[test]
fn test_login_empty_password_rejected() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", "http://127.0.0.1:9/")
        .env_remove("STYLECRATE_PASSWORD")
        .args(["login", "--email", "ada@example.com"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password cannot be empty"));
}

#[tokio::test]
async fn test_whoami_and_logout_after_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "secret"])
        .assert()
        .success();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"))
        .stdout(predicate::str::contains("Style reference: 2"));

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged out"));

    let storage = read_storage(home.path());
    assert!(storage.get("token").is_none());
    assert!(storage.get("user").is_none());
    let cookies = fs::read_to_string(home.path().join("cookies.json")).unwrap();
    assert!(!cookies.contains("auth="));

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_style_sends_stored_bearer_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("styleById"))
        .and(body_string_contains("\"styleId\":2"))
        .and(header("authorization", "Bearer abcdefghijklmnop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"styleById": {"id": 2, "description": "Classic", "image_url": "/classic.png"}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args(["login", "--email", "ada@example.com", "--password", "secret"])
        .assert()
        .success();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .arg("style")
        .assert()
        .success()
        .stdout(predicate::str::contains("Style 2: Classic"))
        .stdout(predicate::str::contains("/classic.png"));
}

#[test]
fn test_style_requires_login() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .arg("style")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_register_and_genders() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("userSignup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"userSignup": {"id": 7, "name": "Ada", "email": "ada@example.com"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("userGenders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"userGenders": [{"id": 1, "name": "Male"}, {"id": 2, "name": "Female"}]}
        })))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .args([
            "register",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--password",
            "secret",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Registered Ada <ada@example.com> (id 7)"));

    // Registering does not log in.
    assert!(!home.path().join("storage.json").exists());

    cargo_bin_cmd!("stylecrate")
        .env("STYLECRATE_HOME", home.path())
        .env("STYLECRATE_API_URL", server.uri())
        .arg("genders")
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tMale"))
        .stdout(predicate::str::contains("2\tFemale"));
}
