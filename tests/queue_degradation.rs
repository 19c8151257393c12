//! Broker outage (spec §4.D): with a broker configured but unreachable, the
//! orchestrator degrades to the in-process queue, jobs still complete, and
//! exactly one warning is logged for the transition no matter how many
//! submissions race through it.

use crate::support::{simple_generate_body, FakeGenerator, ServerOptions, TestServer};
use std::time::Duration;

#[tokio::test]
async fn broker_outage_degrades_once_and_still_delivers() {
    let generator = FakeGenerator::completes_after_one_poll().await;
    let mut options = ServerOptions::new(&generator.base_url());
    // Nothing listens here; every broker call fails immediately.
    options.broker_url = Some("http://127.0.0.1:1");
    let server = TestServer::start(options).await;

    let client = server.client();
    let mut ids = Vec::new();
    for _ in 0..5 {
        let created: serde_json::Value = client
            .post(server.url("/jobs"))
            .json(&simple_generate_body("queued"))
            .send()
            .await
            .expect("submit job")
            .json()
            .await
            .expect("decode created job");
        ids.push(created["id"].as_str().expect("job id").to_string());
    }

    for id in &ids {
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
            if job["status"] == "completed" {
                break;
            }
            if std::time::Instant::now() >= deadline {
                panic!("job {id} never completed while queue was degraded");
            }
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
    }

    assert_eq!(
        server.log_lines_containing("degrading to in-process queue"),
        1,
        "broker outage must log exactly one degradation warning regardless of submission count"
    );
}
