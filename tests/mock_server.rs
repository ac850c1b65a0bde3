mod common;

use axum::body::Body;
use axum::http::{header, StatusCode};
use common::{config, get, project, request, send};
use mock_server::routing::compile;
use mock_server::{MockRequest, MockResponse, MockServer};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn test_inline_json_rule() {
    let dir = project();
    let router = MockServer::new(config(dir.path(), &[("GET /inline", r#"{"type":"json"}"#)]))
        .unwrap()
        .into_router();

    let reply = get(&router, "/inline").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(reply.body, r#"{"type":"json"}"#);
}

#[tokio::test]
async fn test_file_rules() {
    let dir = project();
    let router = MockServer::new(config(
        dir.path(),
        &[
            ("GET /users", "users"),
            ("GET /users/tom", "users/tom"),
            ("GET /users/jerry", "users/jerry"),
        ],
    ))
    .unwrap()
    .into_router();

    let reply = get(&router, "/users").await;
    assert_eq!(reply.body, r#"[{"name":"tom"},{"name":"jerry"}]"#);

    let reply = get(&router, "/users/tom").await;
    assert_eq!(reply.body, r#"{"name":"tom"}"#);

    let reply = get(&router, "/users/jerry").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["x-resource-count"], "2");
    assert_eq!(reply.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(reply.body, r#"{"name":"tom","from":"txt"}"#);
}

#[tokio::test]
async fn test_query_and_wildcard_rules() {
    let dir = project();
    let router = MockServer::new(config(
        dir.path(),
        &[
            ("GET /api/user/tom", r#"{"who":"jack"}"#),
            ("GET /api/user/*", r#"{"who":"user"}"#),
            ("GET /api/**/tom", r#"{"who":"rose"}"#),
            ("GET /q?name=tom&age=/^\\d+$/", r#"{"who":"tom-aged"}"#),
            ("GET /q?name=tom", "query/name"),
            ("GET /q", r#"{"who":"nobody"}"#),
            ("GET /q?tags[]=a&tags[]=b", r#"{"who":"tagged"}"#),
        ],
    ))
    .unwrap()
    .into_router();

    let cases = [
        ("/api/user/tom", r#"{"who":"jack"}"#),
        ("/api/user/obama", r#"{"who":"user"}"#),
        ("/api/car/belong/tom", r#"{"who":"rose"}"#),
        ("/q?name=tom&age=18", r#"{"who":"tom-aged"}"#),
        ("/q?name=tom&school=x", r#"{"match":"name"}"#),
        ("/q", r#"{"who":"nobody"}"#),
        ("/q?tags=a", r#"{"who":"tagged"}"#),
        ("/q?tags%5B%5D=b&tags%5B%5D=a", r#"{"who":"tagged"}"#),
    ];
    for (uri, expected) in cases {
        let reply = get(&router, uri).await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert_eq!(reply.body, expected, "{uri}");
    }

    let reply = get(&router, "/q?name=tom&age=old").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "config not found: GET /q?name=tom&age=old");
}

#[tokio::test]
async fn test_percent_encoded_paths() {
    let dir = project();
    let router = MockServer::new(config(dir.path(), &[("GET /中文/路径", r#"{"ok":true}"#)]))
        .unwrap()
        .into_router();

    let reply = get(&router, "/%E4%B8%AD%E6%96%87/%E8%B7%AF%E5%BE%84").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn test_percent_encoded_rule_paths() {
    let dir = project();
    let router = MockServer::new(config(dir.path(), &[("GET /a%20b", r#"{"ok":true}"#)]))
        .unwrap()
        .into_router();

    let reply = get(&router, "/a%20b").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn test_not_found() {
    let dir = project();
    let router = MockServer::new(config(dir.path(), &[("GET /a", "{}")]))
        .unwrap()
        .into_router();

    let reply = get(&router, "/nope?x=%20y").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "config not found: GET /nope?x= y");

    let reply = send(&router, request("PUT", "/a", Body::empty())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "config not found: PUT /a");
}

#[tokio::test]
async fn test_unreadable_data_file_is_500() {
    let dir = project();
    let router = MockServer::new(config(
        dir.path(),
        &[("GET /missing", "users/nobody"), ("GET /broken", "broken.json")],
    ))
    .unwrap()
    .into_router();

    let reply = get(&router, "/missing").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.body.starts_with("cannot resolve path"), "{}", reply.body);

    let reply = get(&router, "/broken").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_handler_rules() {
    let dir = project();
    let router = MockServer::builder()
        .config(config(dir.path(), &[("GET /plain", r#"{"from":"config"}"#)]))
        .handler("POST /echo", |req: &MockRequest| {
            MockResponse::json(req.body.clone()).with_status(StatusCode::CREATED)
        })
        .handler("GET /who/*", |req: &MockRequest| {
            let name = req
                .query
                .get("name")
                .and_then(|v| v.scalars())
                .and_then(|s| s.first().map(|n| n.to_string()))
                .unwrap_or_default();
            MockResponse::text(format!("{} {} {}", req.method, req.path, name))
        })
        .build()
        .unwrap()
        .into_router();

    let reply = send(&router, request("POST", "/echo", r#"{"a":1}"#)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body, r#"{"a":1}"#);

    let reply = get(&router, "/who/x?name=tom").await;
    assert_eq!(reply.body, "GET /who/x tom");

    let reply = get(&router, "/plain").await;
    assert_eq!(reply.body, r#"{"from":"config"}"#);
}

#[tokio::test]
async fn test_handler_body_limit() {
    let dir = project();
    let mut cfg = config(dir.path(), &[]);
    cfg.server.max_body_size = 4;
    let router = MockServer::builder()
        .config(cfg)
        .handler("POST /echo", |req: &MockRequest| MockResponse::text(req.body.clone()))
        .build()
        .unwrap()
        .into_router();

    let reply = send(&router, request("POST", "/echo", "abc")).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&router, request("POST", "/echo", "0123456789")).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_static_fallback() {
    let dir = project();
    let mut cfg = config(dir.path(), &[("GET /app.css", r#"{"rule":"wins"}"#)]);
    cfg.static_dir = Some(dir.path().join("public"));
    let router = MockServer::new(cfg).unwrap().into_router();

    let reply = get(&router, "/index.html").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "<h1>static</h1>");

    let reply = get(&router, "/app.css").await;
    assert_eq!(reply.body, r#"{"rule":"wins"}"#);

    let reply = get(&router, "/missing.js").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "config not found: GET /missing.js");

    let reply = send(&router, request("POST", "/index.html", Body::empty())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_and_cors() {
    let dir = project();
    let router = MockServer::new(config(dir.path(), &[("GET /a", "{}")]))
        .unwrap()
        .into_router();

    let reply = get(&router, "/a").await;
    assert!(reply.headers.contains_key("x-request-id"));

    let mut req = request("GET", "/a", Body::empty());
    req.headers_mut().insert("x-request-id", "given-id".parse().unwrap());
    req.headers_mut().insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());
    let reply = send(&router, req).await;
    assert_eq!(reply.headers["x-request-id"], "given-id");
    assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let mut cfg = config(dir.path(), &[("GET /a", "{}")]);
    cfg.server.cors = false;
    let router = MockServer::new(cfg).unwrap().into_router();
    let mut req = request("GET", "/a", Body::empty());
    req.headers_mut().insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());
    let reply = send(&router, req).await;
    assert!(!reply.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_published_table_is_served_without_rebuild() {
    let dir = project();
    let server = MockServer::new(config(dir.path(), &[("GET /v", r#"{"v":1}"#)])).unwrap();
    let store = server.store();
    let router = server.into_router();

    assert_eq!(get(&router, "/v").await.body, r#"{"v":1}"#);

    store.publish(compile([("GET /v", r#"{"v":2}"#)]).unwrap());
    assert_eq!(get(&router, "/v").await.body, r#"{"v":2}"#);
}

#[tokio::test]
async fn test_config_file_end_to_end() {
    let dir = project();
    common::write(
        dir.path(),
        "mock.toml",
        r#"
        dataFile = "data"

        [server]
        bind_address = "127.0.0.1:0"

        [api]
        "GET /users/tom" = "users/tom.json"
        "post /users" = { created = true }
        "#,
    );

    let config = mock_server::load_config(dir.path()).unwrap();
    let router = MockServer::new(config).unwrap().into_router();

    assert_eq!(get(&router, "/users/tom").await.body, r#"{"name":"tom"}"#);
    let reply = send(&router, request("POST", "/users", Body::empty())).await;
    assert_eq!(reply.body, r#"{"created":true}"#);
}

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let dir = project();
    let server = MockServer::new(config(dir.path(), &[("GET /ping", r#"{"pong":true}"#)])).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = mock_server::Shutdown::new();
    let serving = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(listener, &shutdown).await })
    };

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"), "{raw}");
    assert!(raw.ends_with(r#"{"pong":true}"#), "{raw}");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
