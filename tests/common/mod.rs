//! Test utilities and common setup.

use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use lanserve::{AppState, ListingOptions, ServerConfig};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "http://192.168.1.20:8412/";

pub const NOTES: &[u8] = b"first line\nsecond line\n";

/// Fixture directory holding `notes.txt` and an empty `docs/` folder.
pub struct Fixture {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("notes.txt"), NOTES).unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn app(&self) -> Router {
        self.app_with(ListingOptions::default())
    }

    pub fn app_with(&self, listing: ListingOptions) -> Router {
        let mut config = ServerConfig::new(self.root.clone(), 8412);
        config.listing = listing;
        lanserve::app(AppState::new(config, PUBLIC_URL))
    }
}

/// Send a GET request for `uri` through a fresh router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn content_type(response: &Response<Body>) -> String {
    response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
