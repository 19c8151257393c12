//! Cancellation (spec §4.E, §4.G): an operator cancels a job mid-processing
//! and the worker transitions it to `canceled` on its next poll tick.

use crate::support::{simple_generate_body, FakeGenerator, ServerOptions, TestServer};
use std::time::Duration;

#[tokio::test]
async fn cancel_during_processing_reaches_canceled() {
    let generator = FakeGenerator::never_completes().await;
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
    let id = created["id"].as_str().expect("job id").to_string();

    wait_for_status(&client, &server, &id, "processing").await;

    let cancel_response = client
        .post(server.url(&format!("/jobs/{id}/cancel")))
        .send()
        .await
        .expect("request cancel");
    assert_eq!(cancel_response.status(), 202);

    wait_for_status(&client, &server, &id, "canceled").await;

    let job: serde_json::Value =
        client.get(server.url(&format!("/jobs/{id}"))).send().await.unwrap().json().await.unwrap();
    assert_eq!(job["result"]["kind"], "failure");
    assert_eq!(job["result"]["error_kind"], "canceled");
}

#[tokio::test]
async fn cancel_on_already_terminal_job_is_rejected() {
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
    let id = created["id"].as_str().expect("job id").to_string();

    wait_for_status(&client, &server, &id, "completed").await;

    let cancel_response = client
        .post(server.url(&format!("/jobs/{id}/cancel")))
        .send()
        .await
        .expect("request cancel on terminal job");
    assert_eq!(cancel_response.status(), 409);
}

async fn wait_for_status(client: &reqwest::Client, server: &TestServer, id: &str, want: &str) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job: serde_json::Value =
            client.get(server.url(&format!("/jobs/{id}"))).send().await.unwrap().json().await.unwrap();
        if job["status"] == want {
            return;
        }
        if std::time::Instant::now() >= deadline {
            panic!("job {id} never reached status {want}, last seen {}", job["status"]);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
