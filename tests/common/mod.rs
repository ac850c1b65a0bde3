//! Shared fixtures for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::MockConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

pub const USER_TXT: &str = "Date: Wed, 26 Apr 2017 09:32:13 GMT\n\
Content-Length: 1823\n\
X-Resource-Count: 2\n\
\n\
{\"name\":\"tom\",\"from\":\"txt\"}";

/// A project directory with `data/` and `public/` populated.
pub fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("data/users")).unwrap();
    fs::create_dir_all(root.join("public")).unwrap();

    write(root, "data/users/index.json", r#"[{"name":"tom"},{"name":"jerry"}]"#);
    write(root, "data/users/tom.json", r#"{"name":"tom"}"#);
    write(root, "data/users/jerry.txt", USER_TXT);
    write(root, "data/query/name.json", r#"{"match":"name"}"#);
    write(root, "data/broken.json", "{not json");
    write(root, "public/index.html", "<h1>static</h1>");
    write(root, "public/app.css", "body{}");

    dir
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Config rooted at `project` with the given rules.
pub fn config(project: &Path, rules: &[(&str, &str)]) -> MockConfig {
    let mut config = MockConfig::default();
    config.data_dir = project.join("data");
    for (key, value) in rules {
        config.api.insert(key.to_string(), (*value).into());
    }
    config
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

pub async fn send(router: &Router, request: Request<Body>) -> Reply {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub async fn get(router: &Router, uri: &str) -> Reply {
    send(router, request("GET", uri, Body::empty())).await
}

pub fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}
