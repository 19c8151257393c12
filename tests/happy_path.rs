//! Queued-mode request, no adapters, generator completes on the second poll.

use crate::support::{simple_generate_body, FakeGenerator, ServerOptions, TestServer};
use std::time::Duration;

#[tokio::test]
async fn queued_job_reaches_completed_with_composed_prompt() {
    let generator = FakeGenerator::completes_after_one_poll().await;
    let server = TestServer::start(ServerOptions::new(&generator.base_url())).await;

    let client = server.client();
    let created: serde_json::Value = client
        .post(server.url("/jobs"))
        .json(&simple_generate_body("queued"))
        .send()
        .await
        .expect("submit job")
        .json()
        .await
        .expect("decode created job");

    assert_eq!(created["status"], "queued");
    assert_eq!(created["prompt"], "a cat");
    let id = created["id"].as_str().expect("job id").to_string();

    let mut last_status = String::new();
    let mut last_progress = 0.0;
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job: serde_json::Value = client
            .get(server.url(&format!("/jobs/{id}")))
            .send()
            .await
            .expect("poll job")
            .json()
            .await
            .expect("decode job");
        last_status = job["status"].as_str().unwrap_or_default().to_string();
        last_progress = job["progress"].as_f64().unwrap_or_default();
        if last_status == "completed" {
            let images = job["result"]["images"].as_array().expect("completed job has images");
            assert_eq!(images.len(), 1);
            break;
        }
        if std::time::Instant::now() >= deadline {
            panic!("job never completed, last status {last_status} progress {last_progress}");
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    assert_eq!(last_status, "completed");
    assert_eq!(last_progress, 1.0);
}
