use super::*;
use loraflow_core::GenerationParams;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params() -> GenerationParams {
    GenerationParams {
        sampler: "euler".to_string(),
        steps: 20,
        cfg_scale: 7.0,
        width: 512,
        height: 512,
        seed: None,
        batch_size: 1,
    }
}

fn request() -> GenerationRequest {
    GenerationRequest {
        prompt: "a cat".to_string(),
        negative_prompt: None,
        params: params(),
    }
}

#[tokio::test]
async fn start_returns_handle_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"handle": "gen-1"})))
        .mount(&server)
        .await;

    let client = GeneratorClient::new(server.uri(), Duration::from_secs(5));
    let handle = client.start(request()).await.unwrap();
    assert_eq!(handle, "gen-1");
}

#[tokio::test]
async fn start_surfaces_rejection_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad prompt"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeneratorClient::new(server.uri(), Duration::from_secs(5));
    let result = client.start(request()).await;
    assert!(matches!(result, Err(GeneratorError::Rejected(_))));
}

#[tokio::test]
async fn poll_parses_completed_status_with_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate/gen-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "succeeded",
            "progress": 1.0,
            "images": ["http://example.com/a.png"],
        })))
        .mount(&server)
        .await;

    let client = GeneratorClient::new(server.uri(), Duration::from_secs(5));
    let status = client.poll(&"gen-1".to_string()).await.unwrap();
    assert_eq!(status.state, "succeeded");
    assert_eq!(status.images.len(), 1);
}

#[tokio::test]
async fn healthcheck_reports_failure_on_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GeneratorClient::new(server.uri(), Duration::from_secs(5));
    let result = client.healthcheck().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn cancel_succeeds_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate/gen-1/cancel"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = GeneratorClient::new(server.uri(), Duration::from_secs(5));
    client.cancel(&"gen-1".to_string()).await.unwrap();
}
