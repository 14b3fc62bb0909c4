mod common;

use clipper_archive::ArticleClient;
use clipper_session::{Error, Session};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ArticleClient {
    common::init_test_tracing();
    let session = Session::new().expect("session builds");
    ArticleClient::with_session(&format!("{}/v1/", server.uri()), session)
        .expect("prefix parses")
}

#[tokio::test]
async fn list_sends_compact_pipeline_and_optional_collation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/article/posts"))
        .and(query_param("pipeline", r#"[{"$match":{"site":"news"}}]"#))
        .and(query_param("collation", r#"{"locale":"en"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"_id": "1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .list(
            "posts",
            &json!([{"$match": {"site": "news"}}]),
            Some(&json!({"locale": "en"})),
        )
        .await
        .unwrap();
    assert_eq!(result, json!([{"_id": "1"}]));
}

#[tokio::test]
async fn list_omits_collation_when_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/article/posts"))
        .and(query_param("pipeline", "[]"))
        .and(query_param_is_missing("collation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .list("posts", &json!([]), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn create_returns_the_assigned_id() {
    let server = MockServer::start().await;
    let article = json!({"title": "hello", "content": "<p>hi</p>"});

    Mock::given(method("POST"))
        .and(path("/v1/article/posts"))
        .and(query_param("resolve_attachments", "false"))
        .and(query_param("replace", "false"))
        .and(body_json(&article))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server)
        .create("posts", &article, false, false)
        .await
        .unwrap();
    assert_eq!(id, "abc123");
}

#[tokio::test]
async fn create_forwards_the_flag_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/article/posts"))
        .and(query_param("resolve_attachments", "true"))
        .and(query_param("replace", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "existing"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server)
        .create("posts", &json!({"title": "again"}), true, true)
        .await
        .unwrap();
    assert_eq!(id, "existing");
}

#[tokio::test]
async fn get_resolves_the_documented_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/article/posts/42"))
        .and(query_param_is_missing("projection"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"_id": "42", "title": "t"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let article = client_for(&server).get("posts", "42", None).await.unwrap();
    assert_eq!(article["title"], "t");
}

#[tokio::test]
async fn get_sends_a_compact_projection_when_given() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/article/posts/42"))
        .and(query_param("projection", r#"{"title":1}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "t"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .get("posts", "42", Some(&json!({"title": 1})))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_succeeds_silently_on_204() {
    let server = MockServer::start().await;
    let patch = json!({"$set": {"title": "new"}});

    Mock::given(method("PUT"))
        .and(path("/v1/article/posts/42"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .update("posts", "42", &patch)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_missing_article_is_a_404_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/article/posts/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .update("posts", "nope", &json!({"$set": {"a": 1}}))
        .await
        .unwrap_err();
    match err {
        Error::Api { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_succeeds_silently_on_204() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/article/posts/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete("posts", "42").await.unwrap();
}

#[tokio::test]
async fn delete_missing_article_is_a_404_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/article/posts/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).delete("posts", "nope").await.unwrap_err();
    match err {
        Error::Api { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_failure_carries_the_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/article/posts"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"success": false, "message": "aggregation exceeded time limit"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list("posts", &json!([]), None)
        .await
        .unwrap_err();
    match err {
        Error::Api { status, body, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("aggregation exceeded time limit"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
