//! In-process app harness shared by the handler tests.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use photoline_api::SignupResponse;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    config::ServerConfig,
    router::build_router,
    storage::{memory::MemoryStorage, Storage},
};

pub(crate) const HOST: &str = "photos.test";
const BOUNDARY: &str = "photoline-test-boundary";

#[derive(Clone)]
pub(crate) struct TestApp {
    pub app: Router,
    pub storage: Arc<dyn Storage>,
    pub config: ServerConfig,
    _dir: Arc<TempDir>,
}

pub(crate) fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("tmp")).unwrap();
    let config = ServerConfig {
        data_dir: dir.path().join("data"),
        tmp_dir: dir.path().join("tmp"),
        poll_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(20),
        ..ServerConfig::default()
    };
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let app = build_router(Arc::clone(&storage), config.clone());
    TestApp {
        app,
        storage,
        config,
        _dir: Arc::new(dir),
    }
}

pub(crate) struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Reply {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = header_string(resp.headers(), header::CONTENT_TYPE);
        let cache_control = header_string(resp.headers(), header::CACHE_CONTROL);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        Reply {
            status,
            content_type,
            cache_control,
            body,
        }
    }

    /// Files left behind in the scratch directory.
    pub fn leftover_temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.config.tmp_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    pub async fn get(&self, uri: &str, api_key: Option<&str>) -> Reply {
        let mut req = Request::get(uri).header(header::HOST, HOST);
        if let Some(key) = api_key {
            req = req.header("x-api-key", key);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, api_key: Option<&str>, form: &str) -> Reply {
        let mut req = Request::post(uri)
            .header(header::HOST, HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(key) = api_key {
            req = req.header("x-api-key", key);
        }
        self.send(req.body(Body::from(form.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        api_key: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> Reply {
        let req = Request::post(uri)
            .header(header::HOST, HOST)
            .header("x-api-key", api_key)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, image)))
            .unwrap();
        self.send(req).await
    }

    pub async fn signup(&self, name: &str) -> SignupResponse {
        let reply = self.post_form("/signup", None, &format!("name={name}")).await;
        assert_eq!(reply.status, StatusCode::OK, "signup {name} failed");
        serde_json::from_slice(&reply.body).unwrap()
    }

    /// Upload a `width × height` JPEG and return the entry JSON.
    pub async fn post_entry(&self, api_key: &str, level: u8, width: u32, height: u32) -> serde_json::Value {
        let level = level.to_string();
        let reply = self
            .post_multipart(
                "/entry",
                api_key,
                &[("publish_level", level.as_str())],
                Some(("image/jpeg", jpeg_bytes(width, height).as_slice())),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.json()
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn encode(width: u32, height: u32, format: image::ImageOutputFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageOutputFormat::Jpeg(85))
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageOutputFormat::Png)
}

/// Decoded `(width, height)` of an encoded image.
pub(crate) fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

/// The last path segment of an image or icon URL.
pub(crate) fn url_id(url: &str) -> &str {
    url.rsplit('/').next().unwrap()
}
