use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as StdPath;
use std::sync::{Arc, Mutex};

use axum::{Json, Router};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bing_gallery::config::{PipelineConfig, setup_logging};
use bing_gallery::constants::{LOCALES, MAX_DAY_OFFSET};
use bing_gallery::encode::{EncodeSetting, encode_jpeg};
use bing_gallery::error::PipelineError;
use bing_gallery::pipeline::run;
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::{Value, json};
use url::Url;

/// Stand-in for both the archive endpoint and the image host.
#[derive(Clone, Default)]
struct MockBing {
    /// (idx, mkt) -> images array
    pages: Arc<HashMap<(String, String), Vec<Value>>>,
    /// file name under /img/ -> body; anything else is a 404
    images: Arc<HashMap<String, Vec<u8>>>,
    archive_calls: Arc<Mutex<Vec<(String, String)>>>,
    image_requests: Arc<Mutex<Vec<String>>>,
}

async fn archive_handler(
    State(state): State<MockBing>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(params.get("format").map(String::as_str), Some("js"));
    assert_eq!(params.get("n").map(String::as_str), Some("1"));
    let idx = params.get("idx").cloned().unwrap_or_default();
    let mkt = params.get("mkt").cloned().unwrap_or_default();
    state
        .archive_calls
        .lock()
        .unwrap()
        .push((idx.clone(), mkt.clone()));
    let images = state.pages.get(&(idx, mkt)).cloned().unwrap_or_default();
    Json(json!({ "images": images }))
}

async fn image_handler(State(state): State<MockBing>, Path(name): Path<String>) -> Response {
    state.image_requests.lock().unwrap().push(name.clone());
    match state.images.get(&name) {
        Some(bytes) => ([(CONTENT_TYPE, "image/jpeg")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start(state: MockBing) -> SocketAddr {
    let app = Router::new()
        .route("/HPImageArchive.aspx", get(archive_handler))
        .route("/img/{name}", get(image_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    addr
}

fn config_for(addr: SocketAddr, output_dir: &StdPath) -> PipelineConfig {
    let mut config = PipelineConfig::with_output_dir(output_dir).expect("default config");
    config.archive_url =
        Url::parse(&format!("http://{addr}/HPImageArchive.aspx")).expect("archive url");
    config.image_host = Url::parse(&format!("http://{addr}")).expect("image host");
    config
}

fn entry(name: &str) -> Value {
    json!({
        "url": format!("/img/{name}.jpg"),
        "urlbase": format!("/img/{name}"),
        "copyright": "Somewhere (© Someone)",
    })
}

/// Small smooth JPEG; `seed` changes the pixels so each fixture is distinct.
fn small_jpeg(seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(32, 24, |x, y| Rgb([x as u8 * 8, y as u8 * 10, seed]));
    encode_jpeg(
        &DynamicImage::ImageRgb8(img),
        EncodeSetting {
            width: 32,
            quality: 90,
        },
    )
    .expect("encode fixture")
}

fn noisy_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9e37_79b9;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    }))
}

fn saved_files(dir: &StdPath) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    names.sort_by_key(|name| {
        name.trim_end_matches(".jpg")
            .parse::<usize>()
            .unwrap_or(usize::MAX)
    });
    names
}

#[tokio::test]
async fn fifty_images_from_the_first_call() {
    let _ = setup_logging(true);
    let names: Vec<String> = (1..=50).map(|i| format!("photo{i}")).collect();
    let mut images = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        images.insert(format!("{name}.jpg"), small_jpeg(i as u8));
    }
    let mut pages: HashMap<(String, String), Vec<Value>> = HashMap::new();
    pages.insert(
        ("0".to_string(), "en-US".to_string()),
        names.iter().map(|name| entry(name)).collect(),
    );
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("nested").join("gallery");
    let config = config_for(addr, &output);

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 50);
    assert_eq!(summary.unique_candidates, 50);
    let expected: Vec<String> = (1..=50).map(|i| format!("{i}.jpg")).collect();
    assert_eq!(saved_files(&output), expected);
    assert_eq!(
        *state.archive_calls.lock().unwrap(),
        vec![("0".to_string(), "en-US".to_string())]
    );
    // canonical URL only, no fallbacks needed
    assert_eq!(state.image_requests.lock().unwrap().len(), 50);
    assert_eq!(
        std::fs::read(output.join("7.jpg")).expect("read 7.jpg"),
        small_jpeg(6)
    );
}

#[tokio::test]
async fn no_images_anywhere_is_fatal() {
    let _ = setup_logging(true);
    let state = MockBing::default();
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(addr, dir.path());

    let result = run(&config).await;

    assert!(matches!(result, Err(PipelineError::NoCandidates)));
    assert!(saved_files(dir.path()).is_empty());
    let calls = state.archive_calls.lock().unwrap();
    assert_eq!(calls.len(), LOCALES.len() * MAX_DAY_OFFSET as usize);
    // markets outer, days inner
    assert_eq!(calls[0], ("0".to_string(), LOCALES[0].to_string()));
    assert_eq!(calls[1], ("1".to_string(), LOCALES[0].to_string()));
    assert_eq!(
        calls[MAX_DAY_OFFSET as usize],
        ("0".to_string(), LOCALES[1].to_string())
    );
}

#[tokio::test]
async fn duplicates_across_calls_are_collected_once_then_padded() {
    let _ = setup_logging(true);
    let mut pages = HashMap::new();
    pages.insert(
        ("0".to_string(), "en-US".to_string()),
        vec![entry("a"), entry("b")],
    );
    // same urlbase as "b", different canonical URL
    pages.insert(
        ("1".to_string(), "en-US".to_string()),
        vec![
            json!({"url": "/img/b_1366x768.jpg", "urlbase": "/img/b"}),
            entry("c"),
            json!({"title": "no url at all"}),
        ],
    );
    let mut images = HashMap::new();
    for (seed, name) in ["a", "b", "c"].iter().enumerate() {
        images.insert(format!("{name}.jpg"), small_jpeg(seed as u8));
    }
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 7;
    config.max_day_offset = 3;
    config.locales = vec!["en-US".to_string(), "en-GB".to_string()];

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.unique_candidates, 3);
    assert_eq!(summary.saved, 7);
    let read = |n: usize| std::fs::read(dir.path().join(format!("{n}.jpg"))).expect("read");
    // a b c a b c a
    assert_eq!(read(1), small_jpeg(0));
    assert_eq!(read(2), small_jpeg(1));
    assert_eq!(read(3), small_jpeg(2));
    assert_eq!(read(4), read(1));
    assert_eq!(read(5), read(2));
    assert_eq!(read(6), read(3));
    assert_eq!(read(7), read(1));
    // the short supply meant every (day, market) pair was asked once
    assert_eq!(state.archive_calls.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn falls_back_through_size_variants() {
    let _ = setup_logging(true);
    let mut pages = HashMap::new();
    pages.insert(
        ("0".to_string(), "en-US".to_string()),
        vec![entry("first"), entry("second")],
    );
    let mut images = HashMap::new();
    // canonical missing for both, "second" only exists at the smallest size
    images.insert("first_800x600.jpg".to_string(), small_jpeg(1));
    images.insert("second_400x240.jpg".to_string(), small_jpeg(2));
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 2;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 2);
    assert_eq!(
        *state.image_requests.lock().unwrap(),
        vec![
            "first.jpg",
            "first_800x600.jpg",
            "second.jpg",
            "second_800x600.jpg",
            "second_640x480.jpg",
            "second_400x240.jpg",
        ]
    );
    assert_eq!(
        std::fs::read(dir.path().join("2.jpg")).expect("read"),
        small_jpeg(2)
    );
}

#[tokio::test]
async fn failed_slot_leaves_no_gap() {
    let _ = setup_logging(true);
    let mut pages = HashMap::new();
    pages.insert(
        ("0".to_string(), "en-US".to_string()),
        vec![entry("one"), entry("broken"), entry("three")],
    );
    let mut images = HashMap::new();
    images.insert("one.jpg".to_string(), small_jpeg(1));
    images.insert("three.jpg".to_string(), small_jpeg(3));
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 3;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 2);
    assert!(!summary.is_complete());
    assert_eq!(saved_files(dir.path()), vec!["1.jpg", "2.jpg"]);
    assert_eq!(
        std::fs::read(dir.path().join("2.jpg")).expect("read"),
        small_jpeg(3)
    );
}

#[tokio::test]
async fn oversized_download_is_reencoded_under_budget() {
    let _ = setup_logging(true);
    let image = noisy_image(600, 400);
    let original = encode_jpeg(
        &image,
        EncodeSetting {
            width: 600,
            quality: 100,
        },
    )
    .expect("encode original");
    // the last grid point for a 600px source, so the budget is reachable
    let budget = encode_jpeg(
        &image,
        EncodeSetting {
            width: 600,
            quality: 35,
        },
    )
    .expect("encode floor")
    .len() as u64;
    assert!(original.len() as u64 > budget);

    let mut pages = HashMap::new();
    pages.insert(("0".to_string(), "en-US".to_string()), vec![entry("big")]);
    let mut images = HashMap::new();
    images.insert("big.jpg".to_string(), original);
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 1;
    config.max_bytes = budget;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 1);
    let stored = std::fs::read(dir.path().join("1.jpg")).expect("read");
    assert!(stored.len() as u64 <= budget);
    let decoded = image::load_from_memory(&stored).expect("decode stored");
    assert_eq!(decoded.width(), 600);
    // accepted on the canonical URL
    assert_eq!(*state.image_requests.lock().unwrap(), vec!["big.jpg"]);
}

#[tokio::test]
async fn over_download_limit_falls_through_to_variant() {
    let _ = setup_logging(true);
    let mut pages = HashMap::new();
    pages.insert(("0".to_string(), "en-US".to_string()), vec![entry("huge")]);
    let mut images = HashMap::new();
    images.insert("huge.jpg".to_string(), vec![0u8; 64 * 1024]);
    images.insert("huge_800x600.jpg".to_string(), small_jpeg(9));
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 1;
    config.download_limit = 16 * 1024;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 1);
    assert_eq!(
        std::fs::read(dir.path().join("1.jpg")).expect("read"),
        small_jpeg(9)
    );
}

#[tokio::test]
async fn undecodable_oversized_file_is_removed() {
    let _ = setup_logging(true);
    let mut pages = HashMap::new();
    pages.insert(("0".to_string(), "en-US".to_string()), vec![entry("junk")]);
    let mut images = HashMap::new();
    images.insert("junk.jpg".to_string(), vec![0xAB; 8 * 1024]);
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(addr, dir.path());
    config.target_count = 1;
    config.max_bytes = 1024;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 0);
    assert!(saved_files(dir.path()).is_empty());
}

#[tokio::test]
async fn earlier_gallery_files_survive_failed_slots() {
    let _ = setup_logging(true);
    let dir = tempfile::tempdir().expect("tempdir");
    for n in 1..=4 {
        std::fs::write(dir.path().join(format!("{n}.jpg")), format!("old {n}")).expect("seed");
    }
    let mut pages = HashMap::new();
    pages.insert(
        ("0".to_string(), "en-US".to_string()),
        vec![entry("one"), entry("two"), entry("gone"), entry("lost")],
    );
    let mut images = HashMap::new();
    images.insert("one.jpg".to_string(), small_jpeg(1));
    images.insert("two.jpg".to_string(), small_jpeg(2));
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state).await;
    let mut config = config_for(addr, dir.path());
    config.target_count = 4;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 2);
    assert_eq!(
        saved_files(dir.path()),
        vec!["1.jpg", "2.jpg", "3.jpg", "4.jpg"]
    );
    let read = |n: usize| std::fs::read(dir.path().join(format!("{n}.jpg"))).expect("read");
    assert_eq!(read(1), small_jpeg(1));
    assert_eq!(read(2), small_jpeg(2));
    // nothing was downloaded for slots 3 and 4, so the old files stay put
    assert_eq!(read(3), b"old 3");
    assert_eq!(read(4), b"old 4");
}

#[tokio::test]
async fn rejected_reencode_leaves_existing_file_alone() {
    let _ = setup_logging(true);
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("1.jpg"), b"old 1").expect("seed");
    let mut pages = HashMap::new();
    pages.insert(("0".to_string(), "en-US".to_string()), vec![entry("junk")]);
    let mut images = HashMap::new();
    images.insert("junk.jpg".to_string(), vec![0xAB; 8 * 1024]);
    let state = MockBing {
        pages: Arc::new(pages),
        images: Arc::new(images),
        ..Default::default()
    };
    let addr = start(state).await;
    let mut config = config_for(addr, dir.path());
    config.target_count = 1;
    config.max_bytes = 1024;

    let summary = run(&config).await.expect("run");

    assert_eq!(summary.saved, 0);
    assert_eq!(saved_files(dir.path()), vec!["1.jpg"]);
    assert_eq!(
        std::fs::read(dir.path().join("1.jpg")).expect("read"),
        b"old 1"
    );
}
