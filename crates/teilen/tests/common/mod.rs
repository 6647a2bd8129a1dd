//! Test utilities and common setup.

use std::path::PathBuf;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response},
};
use tempfile::TempDir;
use tower::ServiceExt;

use teilen::{AppConfig, AppState, routes};

/// A shared directory laid out like `/srv/share` in the docs:
/// `a.txt` (10 bytes), `sub/` with `sub/b.txt`, plus a sibling
/// `outside/` next to the share that must never be reachable.
pub struct Share {
    _temp_dir: TempDir,
    pub root: PathBuf,
    pub outside: PathBuf,
}

pub fn share() -> Share {
    let temp_dir = TempDir::new().expect("create temp dir");
    let base = temp_dir.path().canonicalize().expect("canonical temp dir");
    let root = base.join("share");
    let outside = base.join("outside");

    std::fs::create_dir_all(root.join("sub")).expect("create share");
    std::fs::create_dir_all(&outside).expect("create outside");
    std::fs::write(root.join("a.txt"), "0123456789").expect("write a.txt");
    std::fs::write(root.join("sub").join("b.txt"), "nested").expect("write b.txt");
    std::fs::write(outside.join("secret.txt"), "secret").expect("write secret");

    Share {
        _temp_dir: temp_dir,
        root,
        outside,
    }
}

pub fn test_app(share: &Share, password: Option<&str>) -> Router {
    let config = AppConfig {
        working_dir: share.root.clone(),
        password: password.map(str::to_string),
        ..AppConfig::default()
    };
    let state = AppState::from_config(config).expect("build state");
    routes::create_router(state)
}

pub async fn get(app: Router, uri: &str, secret: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri).method(Method::GET);
    if let Some(secret) = secret {
        request = request.header("X-Teilen-Auth", secret);
    }

    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
