//! Integration tests for the retrieval endpoints.
//!
//! These tests start a real HTTP server and make actual requests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use carserve_gateway::{AppState, SealedArchiveRecord, ServerConfig};
use carserve_car::{Cid, write_varint};
use reqwest::StatusCode;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Serialized CAR header frame content (roots + version map).
const HEADER: &[u8] = b"\xa2eroots\x81\x00gversion\x01";

fn build_car(blocks: &[(&Cid, &[u8])]) -> Vec<u8> {
    let mut car = Vec::new();
    car.extend_from_slice(&write_varint(HEADER.len() as u64));
    car.extend_from_slice(HEADER);
    for (cid, payload) in blocks {
        car.extend_from_slice(&write_varint((cid.len() + payload.len()) as u64));
        car.extend_from_slice(cid.as_bytes());
        car.extend_from_slice(payload);
    }
    car
}

/// A deterministic payload large enough to make range math interesting.
fn block_payload() -> Vec<u8> {
    (0..4096u32).map(|i| (i % 251) as u8).collect()
}

struct TestServer {
    addr: SocketAddr,
    root_cid: String,
    block_cid: Cid,
    car_bytes: Vec<u8>,
    payload: Vec<u8>,
    _car: NamedTempFile,
    _mappings: NamedTempFile,
}

/// Start test HTTP server on a random port, backed by a freshly
/// sealed single-block archive.
async fn start_test_server() -> TestServer {
    let payload = block_payload();
    let block_cid = Cid::new_v1(carserve_car::cid::CODEC_RAW, &[0x42; 32]);
    let car_bytes = build_car(&[(&block_cid, &payload)]);

    let mut car = NamedTempFile::new().expect("Failed to create temporary archive file");
    car.write_all(&car_bytes)
        .expect("Failed to write archive bytes");

    let root_cid = Cid::new_v1(carserve_car::cid::CODEC_DAG_PB, &[0x17; 32]).to_string();
    let records = vec![
        SealedArchiveRecord {
            id: 1,
            root_cid: root_cid.clone(),
            car_path: car.path().to_path_buf(),
        },
        SealedArchiveRecord {
            id: 2,
            root_cid: block_cid.to_string(),
            car_path: car.path().to_path_buf(),
        },
    ];

    let mut mappings = NamedTempFile::new().expect("Failed to create temporary mappings file");
    mappings
        .write_all(serde_json::to_string(&records).unwrap().as_bytes())
        .expect("Failed to write mappings JSON");

    let config = ServerConfig {
        http_bind: "127.0.0.1:0"
            .parse()
            .expect("Failed to parse HTTP bind address"),
        mappings: mappings.path().to_path_buf(),
    };

    let state = Arc::new(AppState::new(&config).expect("Failed to initialize AppState"));
    let app = carserve_gateway::http::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind HTTP listener");
    let addr = listener
        .local_addr()
        .expect("Failed to get listener address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("HTTP server failed to run");
    });

    // Give server time to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    TestServer {
        addr,
        root_cid,
        block_cid,
        car_bytes,
        payload,
        _car: car,
        _mappings: mappings,
    }
}

#[tokio::test]
async fn test_piece_full_object() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .send()
        .await
        .expect("Failed to send GET request to test server");

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Response should have content-type header")
        .to_str()
        .expect("Content-Type header should be valid UTF-8");
    assert_eq!(content_type, "application/octet-stream");

    let content_length: u64 = response
        .headers()
        .get("content-length")
        .expect("Response should have content-length header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(content_length, server.car_bytes.len() as u64);

    assert_eq!(
        response
            .headers()
            .get("accept-ranges")
            .expect("Response should advertise range support")
            .to_str()
            .unwrap(),
        "bytes"
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), server.car_bytes.as_slice());
}

#[tokio::test]
async fn test_piece_bounded_range() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .header("range", "bytes=0-999")
        .send()
        .await
        .expect("Failed to send ranged GET request");

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("content-range")
            .expect("206 response should carry content-range")
            .to_str()
            .unwrap(),
        format!("bytes 0-999/{}", server.car_bytes.len())
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.len(), 1000);
    assert_eq!(body.as_ref(), &server.car_bytes[..1000]);
}

#[tokio::test]
async fn test_piece_open_ended_range_covers_tail() {
    let server = start_test_server().await;
    let total = server.car_bytes.len() as u64;
    let start = total - 10;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .header("range", format!("bytes={start}-"))
        .send()
        .await
        .expect("Failed to send open-ended ranged GET request");

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("content-range")
            .unwrap()
            .to_str()
            .unwrap(),
        format!("bytes {start}-{}/{total}", total - 1)
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), &server.car_bytes[start as usize..]);
}

#[tokio::test]
async fn test_piece_overlong_range_is_clamped() {
    let server = start_test_server().await;
    let total = server.car_bytes.len() as u64;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .header("range", "bytes=100-999999999")
        .send()
        .await
        .expect("Failed to send over-long ranged GET request");

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("content-range")
            .unwrap()
            .to_str()
            .unwrap(),
        format!("bytes 100-{}/{total}", total - 1)
    );

    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), &server.car_bytes[100..]);
}

#[tokio::test]
async fn test_piece_inverted_range_is_refused() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .header("range", "bytes=50-10")
        .send()
        .await
        .expect("Failed to send inverted ranged GET request");

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_piece_multi_range_is_refused() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
        .header("range", "bytes=0-1,3-4")
        .send()
        .await
        .expect("Failed to send multi-range GET request");

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_unknown_identifier_is_not_found() {
    let server = start_test_server().await;
    let unknown = Cid::new_v1(carserve_car::cid::CODEC_DAG_PB, &[0x99; 32]);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece/{unknown}", server.addr))
        .send()
        .await
        .expect("Failed to send GET request for unknown identifier");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_identifier_is_bad_request() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/piece", server.addr))
        .send()
        .await
        .expect("Failed to send GET request with no identifier");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_block_payload_and_range() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();

    // Whole payload, addressed by the block's own identifier
    let response = client
        .get(format!("http://{}/block/{}", server.addr, server.block_cid))
        .send()
        .await
        .expect("Failed to send GET request for block");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), server.payload.as_slice());

    // A span of the payload, not of the container file
    let response = client
        .get(format!("http://{}/block/{}", server.addr, server.block_cid))
        .header("range", "bytes=16-31")
        .send()
        .await
        .expect("Failed to send ranged GET request for block");
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("content-range")
            .unwrap()
            .to_str()
            .unwrap(),
        format!("bytes 16-31/{}", server.payload.len())
    );
    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), &server.payload[16..=31]);
}

#[tokio::test]
async fn test_block_first_fallback() {
    let server = start_test_server().await;

    // Addressed by the root identifier, which no block carries;
    // first=true serves the first decoded block anyway.
    let client = reqwest::Client::new();
    let response = client
        .get(format!(
            "http://{}/block/{}?first=true",
            server.addr, server.root_cid
        ))
        .send()
        .await
        .expect("Failed to send first-block GET request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.bytes().await.expect("Failed to read body");
    assert_eq!(body.as_ref(), server.payload.as_slice());
}

#[tokio::test]
async fn test_truncated_archive_is_server_error() {
    let server = start_test_server().await;

    let mut truncated = NamedTempFile::new().unwrap();
    truncated.write_all(&server.car_bytes[..10]).unwrap();

    let records = vec![SealedArchiveRecord {
        id: 1,
        root_cid: server.root_cid.clone(),
        car_path: truncated.path().to_path_buf(),
    }];
    let mut mappings = NamedTempFile::new().unwrap();
    mappings
        .write_all(serde_json::to_string(&records).unwrap().as_bytes())
        .unwrap();

    let config = ServerConfig {
        http_bind: "127.0.0.1:0".parse().unwrap(),
        mappings: mappings.path().to_path_buf(),
    };
    let state = Arc::new(AppState::new(&config).unwrap());
    let app = carserve_gateway::http::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/block/{}?first=true", server.root_cid))
        .send()
        .await
        .expect("Failed to send GET request against truncated archive");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_repeat_ranged_requests_are_byte_identical() {
    let server = start_test_server().await;

    let client = reqwest::Client::new();
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = client
            .get(format!("http://{}/piece/{}", server.addr, server.root_cid))
            .header("range", "bytes=7-77")
            .send()
            .await
            .expect("Failed to send repeated ranged GET request");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        bodies.push(response.bytes().await.expect("Failed to read body"));
    }

    assert_eq!(bodies[0], bodies[1]);
}
