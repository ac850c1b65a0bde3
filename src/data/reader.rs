//! Data file lookup and rendering.

use axum::body::Bytes;
use axum::http::{header, HeaderName, HeaderValue};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::routing::descriptor::MockResponse;

/// Extensions tried, in order, when the named file does not exist.
const EXTENSIONS: [&str; 2] = ["json", "txt"];

/// File looked up when a descriptor names a directory.
const INDEX_FILE: &str = "index";

/// Headers a `.txt` file may not set; the server computes them.
const SKIPPED_HEADERS: [&str; 3] = ["content-length", "transfer-encoding", "connection"];

/// Errors while turning a file descriptor into a response.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot resolve path: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path escapes the data directory: {}", .0.display())]
    OutsideDataDir(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the data file `relative` (under `data_dir`) into a response.
pub async fn read_response(data_dir: &Path, relative: &Path) -> Result<MockResponse, DataError> {
    if !stays_inside(relative) {
        return Err(DataError::OutsideDataDir(relative.to_path_buf()));
    }

    let path = locate(data_dir.join(relative)).await?;
    let content = fs::read(&path).await.map_err(|source| DataError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::trace!(path = %path.display(), bytes = content.len(), "Data file read");

    match extension(&path).as_deref() {
        Some("json") => render_json(&path, content),
        Some("txt") => Ok(render_txt(&content)),
        ext => Ok(MockResponse::new(axum::http::StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(ext)))
            .with_body(content)),
    }
}

fn stays_inside(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Existing file → itself; directory → its index file; otherwise try the
/// known extensions.
async fn locate(mut path: PathBuf) -> Result<PathBuf, DataError> {
    loop {
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => return Ok(path),
            Ok(meta) if meta.is_dir() => {
                path = path.join(INDEX_FILE);
                continue;
            }
            _ => {}
        }

        for ext in EXTENSIONS {
            let candidate = with_appended_extension(&path, ext);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return Ok(candidate);
            }
        }
        return Err(DataError::NotFound(path));
    }
}

/// `users/tom` + `json` → `users/tom.json`; keeps any existing dot suffix.
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn render_json(path: &Path, content: Vec<u8>) -> Result<MockResponse, DataError> {
    serde_json::from_slice::<serde_json::Value>(&content).map_err(|source| {
        DataError::InvalidJson {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(MockResponse::json(content))
}

/// `.txt` layout: `Name: Value` header lines, a blank line, then the body.
fn render_txt(content: &[u8]) -> MockResponse {
    let text = String::from_utf8_lossy(content).replace("\r\n", "\n");
    let (head, body) = text.split_once("\n\n").unwrap_or(("", text.as_str()));

    let mut response = if serde_json::from_str::<serde_json::Value>(body).is_ok() {
        MockResponse::json(Bytes::from(body.to_string()))
    } else {
        MockResponse::text(Bytes::from(body.to_string()))
    };

    for line in head.lines() {
        let Some((name, value)) = line.split_once(": ") else {
            continue;
        };
        let name = name.trim();
        if SKIPPED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %line, "Ignoring malformed header line in data file"),
        }
    }

    response
}

fn content_type_for(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
