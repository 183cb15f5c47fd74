//! End-to-end tests against the live mock storage service.
//!
//! # Design
//! Starts the mock server on a random port in a background tokio runtime,
//! then drives `StorageClient` over real HTTP through `UreqTransport`. The
//! server's request counters show how many auth round trips actually
//! happened.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use mock_server::{MockState, DEFAULT_KEY, DEFAULT_USER};
use storage_core::config::DEFAULT_USER_AGENT;
use storage_core::{
    ClientConfig, Error, HttpMethod, Payload, StorageClient, TransportErrorKind,
};

const NO_CONTENT: &str = "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n";

/// Start the mock server on a random port and return its address and state.
fn start_server() -> (SocketAddr, Arc<MockState>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = Arc::new(MockState::default());
    let server_state = Arc::clone(&state);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, server_state).await
        })
        .unwrap();
    });

    (addr, state)
}

/// Accept a single connection, answer it with `reply` verbatim and hand back
/// the request head the client sent.
fn one_shot_server(reply: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        stream.write_all(reply.as_bytes()).unwrap();
        String::from_utf8(head).unwrap()
    });
    (addr, handle)
}

/// Value of request header `name` in a captured head, any case.
fn request_header(head: &str, name: &str) -> Option<String> {
    head.split("\r\n").skip(1).find_map(|line| {
        let (found, value) = line.split_once(':')?;
        found
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

fn config(addr: SocketAddr, key: &str) -> ClientConfig {
    ClientConfig::new(
        DEFAULT_USER,
        key,
        &format!("http://{addr}/auth/v1.0"),
        &format!("http://{addr}/v1/SEL_1"),
    )
    .with_timeout(Duration::from_secs(5))
}

fn body_text(payload: Payload) -> String {
    match payload {
        Payload::Body(body) => String::from_utf8(body).unwrap(),
        Payload::Headers(headers) => panic!("expected a body, got headers {headers:?}"),
    }
}

#[test]
fn storage_lifecycle() {
    let (addr, state) = start_server();
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();
    assert!(!client.has_token());

    // Step 1: first private call logs in, empty account answers with headers.
    let payload = client.make_private_request(HttpMethod::Get, &[], &[]).unwrap();
    let headers = payload.headers().expect("empty account has no body");
    assert_eq!(headers.get_str("X-Account-Container-Count"), Some("0"));
    assert!(client.has_token());
    assert_eq!(state.auth_requests(), 1);

    // Step 2: create three containers.
    for name in ["alpha", "beta", "gamma"] {
        let exchange = client
            .execute_private_at(name, HttpMethod::Put, &[], &[])
            .unwrap();
        assert_eq!(exchange.info.status, 201);
        assert!(exchange.body.is_empty());
    }

    // Step 3: first page of the listing, with a Link to the next page.
    let exchange = client
        .execute_private(HttpMethod::Get, &[("limit", "2")], &[])
        .unwrap();
    assert_eq!(exchange.info.status, 200);
    assert_eq!(exchange.request.url, format!("http://{addr}/v1/SEL_1?limit=2"));
    let link = exchange.headers.link().expect("first page carries a Link header");
    assert_eq!(
        link.get("next"),
        Some(format!("http://{addr}/v1/SEL_1?marker=beta&limit=2").as_str())
    );
    assert_eq!(body_text(exchange.into_payload()), "alpha\nbeta\n");

    // Step 4: second page, through the payload-level call.
    let payload = client
        .make_private_request(HttpMethod::Get, &[("marker", "beta"), ("limit", "2")], &[])
        .unwrap();
    assert_eq!(body_text(payload), "gamma\n");

    // Step 5: delete one container.
    let payload = client
        .make_private_request_at("beta", HttpMethod::Delete, &[], &[])
        .unwrap();
    assert!(payload.headers().is_some());
    assert_eq!(state.containers_blocking(), vec!["alpha", "gamma"]);

    // Step 6: the whole session cost a single login.
    assert_eq!(state.auth_requests(), 1);
    assert_eq!(state.storage_requests(), 7);
}

#[test]
fn public_request_carries_no_token() {
    let (addr, state) = start_server();
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();

    let payload = client.make_public_request(HttpMethod::Get, &[]).unwrap();
    assert_eq!(body_text(payload), "401 Unauthorized\n");
    assert_eq!(state.auth_requests(), 0);
    assert!(!client.has_token());
}

#[test]
fn wrong_key_is_an_authentication_error() {
    let (addr, state) = start_server();
    let client = StorageClient::new(config(addr, "wrong")).unwrap();

    let err = client.auth().unwrap_err();
    assert!(matches!(err, Error::Authentication { status: 403, .. }));

    let err = client.make_private_request(HttpMethod::Get, &[], &[]).unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert!(!client.has_token());
    assert_eq!(state.auth_requests(), 2);
    assert_eq!(state.storage_requests(), 0);
}

#[test]
fn advertised_storage_url_is_adopted() {
    let (addr, _state) = start_server();
    let mut cfg = config(addr, DEFAULT_KEY);
    cfg.storage_url = "http://127.0.0.1:9/unused".to_string();
    cfg.adopt_storage_url = true;
    let client = StorageClient::new(cfg).unwrap();

    let token = client.auth().unwrap();
    assert_eq!(token, "tk-1");
    assert_eq!(client.storage_url(), format!("http://{addr}/v1/SEL_1"));

    let payload = client.make_private_request(HttpMethod::Get, &[], &[]).unwrap();
    assert!(payload.headers().is_some());
}

#[test]
fn expired_token_is_not_refreshed() {
    let (addr, state) = start_server();
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();
    client.auth().unwrap();
    state.revoke_tokens_blocking();

    let exchange = client.execute_private(HttpMethod::Get, &[], &[]).unwrap();
    assert_eq!(exchange.info.status, 401);
    assert_eq!(state.auth_requests(), 1);
}

#[test]
fn refused_connection_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();

    let err = client.make_private_request(HttpMethod::Get, &[], &[]).unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert!(!client.has_token());
}

#[test]
fn silent_server_times_out() {
    // Accepts at the TCP level (backlog) but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client =
        StorageClient::new(config(addr, DEFAULT_KEY).with_timeout(Duration::from_secs(1))).unwrap();

    let err = client.make_public_request(HttpMethod::Get, &[]).unwrap_err();
    match err {
        Error::Transport(inner) => assert_eq!(inner.kind, TransportErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
    drop(listener);
}

#[test]
fn empty_header_value_survives_the_wire() {
    let (addr, server) = one_shot_server(
        "HTTP/1.1 204 No Content\r\nX-Container-Meta-Note: \r\nX-Count: 1\r\nConnection: close\r\n\r\n",
    );
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();

    let payload = client.make_public_request(HttpMethod::Get, &[]).unwrap();
    let headers = payload.headers().expect("204 has no body");
    assert_eq!(headers.get_str("X-Container-Meta-Note"), Some(""));
    assert_eq!(headers.get_str("X-Count"), Some("1"));
    server.join().unwrap();
}

#[test]
fn default_user_agent_reaches_the_server() {
    let (addr, server) = one_shot_server(NO_CONTENT);
    let client = StorageClient::new(config(addr, DEFAULT_KEY)).unwrap();

    client.make_public_request(HttpMethod::Get, &[]).unwrap();
    let head = server.join().unwrap();
    assert!(DEFAULT_USER_AGENT.starts_with("storage-core/"));
    assert_eq!(
        request_header(&head, "User-Agent").as_deref(),
        Some(DEFAULT_USER_AGENT)
    );
}

#[test]
fn configured_user_agent_reaches_the_server() {
    let (addr, server) = one_shot_server(NO_CONTENT);
    let mut cfg = config(addr, DEFAULT_KEY).with_verify_tls(true);
    cfg.user_agent = "backup-tool/2.1".to_string();
    let client = StorageClient::new(cfg).unwrap();

    // Verification only applies to TLS; plain http still goes through.
    let exchange = client.execute_public(HttpMethod::Get, &[]).unwrap();
    assert_eq!(exchange.info.status, 204);
    let head = server.join().unwrap();
    assert_eq!(
        request_header(&head, "User-Agent").as_deref(),
        Some("backup-tool/2.1")
    );
}
