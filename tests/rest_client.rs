//! Integration tests for the REST client against a mock platform.

use coursesync_core::{ApiError, ContentPath, CourseApi, HandlerKind, RestClient};
use futures_util::StreamExt;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestClient {
    RestClient::new(&server.uri(), "test-token").unwrap()
}

#[tokio::test]
async fn test_fetch_children_parses_wire_nodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/learn/api/public/v1/courses/_c1_1/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results": [{
                "id": "_n1_1",
                "title": "Week 1",
                "contentHandler": {"id": "resource/x-bb-folder"},
                "modified": "2026-08-01T12:00:00.000Z",
                "hasChildren": true,
                "availability": {"available": "Yes"}
            }]}"#,
        ))
        .mount(&server)
        .await;

    let nodes = client(&server)
        .fetch_children(&ContentPath::course_root("_c1_1"))
        .await
        .unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, "_n1_1");
    assert_eq!(nodes[0].handler_kind(), Some(HandlerKind::Folder));
    assert!(nodes[0].has_children);
    assert!(nodes[0].is_available());
}

#[tokio::test]
async fn test_fetch_children_follows_result_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/learn/api/public/v1/courses/_c1_1/contents"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results": [{"id": "_n1_1"}],
                 "paging": {"nextPage": "/learn/api/public/v1/courses/_c1_1/contents?offset=1"}}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/learn/api/public/v1/courses/_c1_1/contents"))
        .and(query_param("offset", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"results": [{"id": "_n2_1"}]}"#),
        )
        .mount(&server)
        .await;

    let nodes = client(&server)
        .fetch_children(&ContentPath::course_root("_c1_1"))
        .await
        .unwrap();

    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["_n1_1", "_n2_1"]);
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/learn/api/public/v1/courses/_c1_1/contents"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results": []}"#))
        .expect(1)
        .mount(&server)
        .await;

    let nodes = client(&server)
        .fetch_children(&ContentPath::course_root("_c1_1"))
        .await
        .unwrap();
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn test_bad_request_maps_to_bad_request_class() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/learn/api/public/v1/courses/_c1_1/contents/_n1_1/attachments",
        ))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_attachments(&ContentPath::course_root("_c1_1").child("_n1_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest { .. }));
}

#[tokio::test]
async fn test_unauthorized_maps_to_fatal_class() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_children(&ContentPath::course_root("_c1_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_malformed_body_maps_to_malformed_class() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_children(&ContentPath::course_root("_c1_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_attachment_stream_exposes_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/learn/api/public/v1/courses/_c1_1/contents/_n1_1/attachments/_a1_1/download",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .insert_header(
                    "Content-Disposition",
                    r#"attachment; filename="slides.pdf""#,
                )
                .set_body_bytes(b"pdf bytes".to_vec()),
        )
        .mount(&server)
        .await;

    let mut response = client(&server)
        .fetch_attachment_stream(&ContentPath::course_root("_c1_1").child("_n1_1"), "_a1_1")
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(
        response.content_disposition.as_deref(),
        Some(r#"attachment; filename="slides.pdf""#)
    );

    let mut collected = Vec::new();
    while let Some(chunk) = response.body.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, b"pdf bytes");
}

#[tokio::test]
async fn test_direct_fetch_passes_non_success_status_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bbcswebdav/files/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let response = client(&server)
        .fetch_direct(&format!("{}/bbcswebdav/files/missing.pdf", server.uri()))
        .await
        .unwrap();
    // The acceptance gate, not the client, decides what to do with a 404.
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}
