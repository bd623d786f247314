//! End-to-end conformance tests for the photoline HTTP API.
//!
//! Each test spawns an ephemeral in-process server (real TCP, real HTTP) via
//! [`photoline_conformance::spawn_server`] and drives it with a `reqwest`
//! client. Callers authenticate with the `X-API-Key` header returned by
//! `POST /signup`, except where a test exercises the cookie fallback.
//!
//! # Coverage
//!
//! | Test | Area |
//! |------|------|
//! | `signup_and_me` | accounts |
//! | `cookie_authenticates` | auth fallback |
//! | `duplicate_signup_returns_409` | accounts |
//! | `unauthenticated_calls_return_400` | auth |
//! | `timeline_respects_visibility` | timeline + visibility |
//! | `image_respects_visibility` | image route + visibility |
//! | `image_sizes` | on-demand transforms |
//! | `icon_upload_and_sizes` | icon route |
//! | `empty_timeline_times_out_with_cursor` | long-poll deadline |
//! | `waiting_timeline_wakes_on_new_entry` | long-poll wake-up |
//! | `cursor_never_moves_backward` | poll cursor |
//! | `follow_list_newest_first` | follows |
//! | `delete_entry_rules` | entry deletion |

use std::io::Cursor;
use std::time::{Duration, Instant};

use photoline_api::{FollowingResponse, SignupResponse, TimelineResponse};
use photoline_conformance::{spawn_server, TestServer, POLL_TIMEOUT};
use reqwest::{multipart, StatusCode};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

fn encode(width: u32, height: u32, format: image::ImageOutputFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 90])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageOutputFormat::Jpeg(85))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageOutputFormat::Png)
}

fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

fn image_part(data: Vec<u8>, mime: &str) -> multipart::Part {
    multipart::Part::bytes(data)
        .file_name("upload")
        .mime_str(mime)
        .unwrap()
}

async fn signup(client: &reqwest::Client, server: &TestServer, name: &str) -> SignupResponse {
    let resp = client
        .post(server.url("/signup"))
        .form(&[("name", name)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "signup {name}");
    resp.json().await.unwrap()
}

/// Post a `width × height` JPEG at `level` and return the entry JSON.
async fn post_entry(
    client: &reqwest::Client,
    server: &TestServer,
    key: &str,
    level: u8,
    width: u32,
    height: u32,
) -> Value {
    let form = multipart::Form::new()
        .text("publish_level", level.to_string())
        .part("image", image_part(jpeg(width, height), "image/jpeg"));
    let resp = client
        .post(server.url("/entry"))
        .header("x-api-key", key)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

async fn timeline(
    client: &reqwest::Client,
    server: &TestServer,
    key: &str,
    cursor: i64,
) -> TimelineResponse {
    let resp = client
        .get(server.url("/timeline"))
        .header("x-api-key", key)
        .query(&[("latest_entry", cursor)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("cache-control").and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
    resp.json().await.unwrap()
}

async fn follow(client: &reqwest::Client, server: &TestServer, key: &str, targets: &[i64]) -> FollowingResponse {
    let form: Vec<(&str, String)> = targets.iter().map(|t| ("target", t.to_string())).collect();
    let resp = client
        .post(server.url("/follow"))
        .header("x-api-key", key)
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

async fn fetch_status(client: &reqwest::Client, url: &str, key: Option<&str>) -> StatusCode {
    let mut req = client.get(url);
    if let Some(key) = key {
        req = req.header("x-api-key", key);
    }
    req.send().await.unwrap().status()
}

fn entry_ids(resp: &TimelineResponse) -> Vec<i64> {
    resp.entries.iter().map(|e| e.id).collect()
}

// ---------------------------------------------------------------------------
// Accounts and auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_and_me() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;
    assert_eq!(alice.icon, server.url("/icon/default"));

    let me: Value = client
        .get(server.url("/me"))
        .header("x-api-key", &alice.api_key)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["id"], alice.id);
    assert_eq!(me["name"], "alice");
}

#[tokio::test]
async fn cookie_authenticates() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;

    let resp = client
        .get(server.url("/me"))
        .header("cookie", format!("api_key={}", alice.api_key))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_signup_returns_409() {
    let server = spawn_server().await;
    let client = make_client();
    signup(&client, &server, "alice").await;
    let resp = client
        .post(server.url("/signup"))
        .form(&[("name", "alice")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn unauthenticated_calls_return_400() {
    let server = spawn_server().await;
    let client = make_client();
    for path in ["/me", "/timeline", "/following"] {
        let status = fetch_status(&client, &server.url(path), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
    }
    let status = fetch_status(&client, &server.url("/me"), Some("bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// A posts one entry at each level; B follows A, C does not.
struct Scenario {
    a: SignupResponse,
    b: SignupResponse,
    c: SignupResponse,
    private: Value,
    followers: Value,
    public: Value,
}

async fn scenario(client: &reqwest::Client, server: &TestServer) -> Scenario {
    let a = signup(client, server, "user_a").await;
    let b = signup(client, server, "user_b").await;
    let c = signup(client, server, "user_c").await;
    follow(client, server, &b.api_key, &[a.id]).await;

    let private = post_entry(client, server, &a.api_key, 0, 64, 48).await;
    let followers = post_entry(client, server, &a.api_key, 1, 64, 48).await;
    let public = post_entry(client, server, &a.api_key, 2, 64, 48).await;
    Scenario {
        a,
        b,
        c,
        private,
        followers,
        public,
    }
}

fn id_of(entry: &Value) -> i64 {
    entry["id"].as_i64().unwrap()
}

#[tokio::test]
async fn timeline_respects_visibility() {
    let server = spawn_server().await;
    let client = make_client();
    let s = scenario(&client, &server).await;
    let (p0, p1, p2) = (id_of(&s.private), id_of(&s.followers), id_of(&s.public));

    let for_a = timeline(&client, &server, &s.a.api_key, 0).await;
    assert_eq!(entry_ids(&for_a), vec![p2, p1, p0]);
    assert_eq!(for_a.latest_entry, p2);

    let for_b = timeline(&client, &server, &s.b.api_key, 0).await;
    assert_eq!(entry_ids(&for_b), vec![p2, p1]);
    assert_eq!(for_b.entries[0].user.name, "user_a");

    let for_c = timeline(&client, &server, &s.c.api_key, 0).await;
    assert_eq!(entry_ids(&for_c), vec![p2]);
}

#[tokio::test]
async fn image_respects_visibility() {
    let server = spawn_server().await;
    let client = make_client();
    let s = scenario(&client, &server).await;
    let url = |entry: &Value| entry["image"].as_str().unwrap().to_string();

    let cases = [
        (url(&s.private), [true, false, false, false]),
        (url(&s.followers), [true, true, false, false]),
        (url(&s.public), [true, true, true, true]),
    ];
    for (image, expected) in cases {
        let viewers = [
            Some(s.a.api_key.as_str()),
            Some(s.b.api_key.as_str()),
            Some(s.c.api_key.as_str()),
            None,
        ];
        for (viewer, visible) in viewers.into_iter().zip(expected) {
            let want = if visible {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            assert_eq!(fetch_status(&client, &image, viewer).await, want, "{image} as {viewer:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// Images and icons
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_sizes() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;
    let entry = post_entry(&client, &server, &alice.api_key, 2, 600, 400).await;
    let image = entry["image"].as_str().unwrap();

    for (size, expected) in [("s", (128, 128)), ("m", (256, 256)), ("l", (600, 400)), ("bogus", (600, 400))] {
        let resp = client
            .get(image)
            .query(&[("size", size)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("image/jpeg")
        );
        let body = resp.bytes().await.unwrap();
        assert_eq!(dimensions(&body), expected, "size {size}");
    }

    let missing = fetch_status(&client, &server.url("/image/0123abcd"), None).await;
    assert_eq!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn icon_upload_and_sizes() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;

    let form = multipart::Form::new().part("image", image_part(png(200, 300), "image/png"));
    let resp = client
        .post(server.url("/icon"))
        .header("x-api-key", &alice.api_key)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let icon = body["icon"].as_str().unwrap().to_string();

    let id = icon.rsplit('/').next().unwrap();
    assert!(server.data_dir().join("icon").join(format!("{id}.png")).is_file());

    for (size, side) in [("s", 32), ("m", 64), ("l", 128)] {
        let resp = client
            .get(&icon)
            .query(&[("size", size)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
        assert_eq!(dimensions(&resp.bytes().await.unwrap()), (side, side));
    }
}

// ---------------------------------------------------------------------------
// Long-poll timeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_timeline_times_out_with_cursor() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;

    let started = Instant::now();
    let resp = timeline(&client, &server, &alice.api_key, 41).await;
    assert!(started.elapsed() >= POLL_TIMEOUT);
    assert!(resp.entries.is_empty());
    assert_eq!(resp.latest_entry, 41);
}

#[tokio::test]
async fn waiting_timeline_wakes_on_new_entry() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;
    let bob = signup(&client, &server, "bob").await;

    let waiter = {
        let client = client.clone();
        let url = server.url("/timeline");
        let key = alice.api_key.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let resp: TimelineResponse = client
                .get(url)
                .header("x-api-key", key)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            (resp, started.elapsed())
        })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    let entry = post_entry(&client, &server, &bob.api_key, 2, 16, 16).await;

    let (resp, elapsed) = waiter.await.unwrap();
    assert!(elapsed < POLL_TIMEOUT);
    assert_eq!(entry_ids(&resp), vec![id_of(&entry)]);
    assert_eq!(resp.latest_entry, id_of(&entry));
}

#[tokio::test]
async fn cursor_never_moves_backward() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;

    let first = post_entry(&client, &server, &alice.api_key, 0, 8, 8).await;
    let page = timeline(&client, &server, &alice.api_key, 0).await;
    assert_eq!(page.latest_entry, id_of(&first));

    let second = post_entry(&client, &server, &alice.api_key, 0, 8, 8).await;
    let page = timeline(&client, &server, &alice.api_key, page.latest_entry).await;
    assert_eq!(entry_ids(&page), vec![id_of(&second)]);

    let ahead = page.latest_entry + 100;
    let page = timeline(&client, &server, &alice.api_key, ahead).await;
    assert!(page.entries.is_empty());
    assert_eq!(page.latest_entry, ahead);
}

// ---------------------------------------------------------------------------
// Follows and deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn follow_list_newest_first() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;
    let bob = signup(&client, &server, "bob").await;
    let carol = signup(&client, &server, "carol").await;

    let list = follow(&client, &server, &alice.api_key, &[bob.id, alice.id, 9999]).await;
    let names: Vec<_> = list.users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["bob"]);

    let list = follow(&client, &server, &alice.api_key, &[carol.id, bob.id]).await;
    let names: Vec<_> = list.users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["carol", "bob"]);

    let resp = client
        .post(server.url("/unfollow"))
        .header("x-api-key", &alice.api_key)
        .form(&[("target", carol.id.to_string())])
        .send()
        .await
        .unwrap();
    let list: FollowingResponse = resp.json().await.unwrap();
    assert_eq!(list.users.len(), 1);
    assert_eq!(list.users[0].id, bob.id);
}

#[tokio::test]
async fn delete_entry_rules() {
    let server = spawn_server().await;
    let client = make_client();
    let alice = signup(&client, &server, "alice").await;
    let bob = signup(&client, &server, "bob").await;
    let entry = post_entry(&client, &server, &alice.api_key, 2, 8, 8).await;
    let url = server.url(&format!("/entry/{}", id_of(&entry)));

    let delete_as = |key: &str| {
        client
            .post(&url)
            .header("x-api-key", key)
            .form(&[("__method", "DELETE")])
            .send()
    };

    assert_eq!(delete_as(&bob.api_key).await.unwrap().status(), StatusCode::BAD_REQUEST);
    assert_eq!(delete_as(&alice.api_key).await.unwrap().status(), StatusCode::OK);
    assert_eq!(delete_as(&alice.api_key).await.unwrap().status(), StatusCode::NOT_FOUND);

    let gone = fetch_status(&client, entry["image"].as_str().unwrap(), None).await;
    assert_eq!(gone, StatusCode::NOT_FOUND);
}
