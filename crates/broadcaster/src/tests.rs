use super::*;
use loraflow_core::{CanonicalStatus, FakeClock, JobId, StatusEvent};
use std::time::Duration;

fn event(job_id: &JobId, status: CanonicalStatus, sequence: u64) -> StatusEvent {
    StatusEvent::builder()
        .job_id(*job_id)
        .status(status)
        .sequence(sequence)
        .build()
}

fn settings() -> BroadcasterSettings {
    BroadcasterSettings {
        buffer_size: 4,
        terminal_retain: Duration::from_secs(300),
        terminal_retry_deadline: Duration::from_millis(50),
        shutdown_drain: Duration::from_millis(200),
    }
}

#[tokio::test]
async fn all_subscriber_receives_every_job() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let mut sub = hub.subscribe(Filter::All);

    let job_a = JobId::new();
    let job_b = JobId::new();
    hub.publish(event(&job_a, CanonicalStatus::Processing, 1)).await;
    hub.publish(event(&job_b, CanonicalStatus::Processing, 1)).await;

    let first = sub.recv().await.unwrap();
    let second = sub.recv().await.unwrap();
    assert!(matches!(first, SubscriptionEvent::Status(e) if e.job_id == job_a));
    assert!(matches!(second, SubscriptionEvent::Status(e) if e.job_id == job_b));
}

#[tokio::test]
async fn job_filtered_subscriber_ignores_other_jobs() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let target = JobId::new();
    let other = JobId::new();
    let mut sub = hub.subscribe(Filter::Job(target.clone()));

    hub.publish(event(&other, CanonicalStatus::Processing, 1)).await;
    hub.publish(event(&target, CanonicalStatus::Processing, 1)).await;

    let received = sub.recv().await.unwrap();
    assert!(matches!(received, SubscriptionEvent::Status(e) if e.job_id == target));
}

#[tokio::test]
async fn per_job_sequence_is_delivered_in_order() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let job = JobId::new();
    let mut sub = hub.subscribe(Filter::Job(job.clone()));

    for seq in 1..=5u64 {
        hub.publish(event(&job, CanonicalStatus::Processing, seq)).await;
    }
    hub.publish(event(&job, CanonicalStatus::Completed, 6)).await;

    let mut last_seq = 0;
    for _ in 0..6 {
        match sub.recv().await.unwrap() {
            SubscriptionEvent::Status(e) => {
                assert!(e.sequence > last_seq);
                last_seq = e.sequence;
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn newly_subscribing_client_replays_recent_terminal_event() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let job = JobId::new();
    hub.publish(event(&job, CanonicalStatus::Completed, 1)).await;

    let mut sub = hub.subscribe(Filter::Job(job.clone()));
    let replayed = sub.recv().await.unwrap();
    assert!(matches!(replayed, SubscriptionEvent::Status(e) if e.status == CanonicalStatus::Completed));
}

#[tokio::test]
async fn expired_terminal_event_is_not_replayed() {
    let clock = FakeClock::default();
    let hub = ProgressBroadcaster::new(settings(), clock.clone());
    let job = JobId::new();
    hub.publish(event(&job, CanonicalStatus::Completed, 1)).await;

    clock.advance(Duration::from_secs(301));

    let mut sub = hub.subscribe(Filter::Job(job.clone()));
    // Nothing should be queued; publishing a fresh event is the only thing
    // that should arrive.
    hub.publish(event(&job, CanonicalStatus::Processing, 2)).await;
    let received = sub.recv().await.unwrap();
    assert!(matches!(received, SubscriptionEvent::Status(e) if e.sequence == 2));
}

#[tokio::test]
async fn slow_consumer_drops_non_terminal_events() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let job = JobId::new();
    let mut sub = hub.subscribe(Filter::Job(job.clone()));

    // Fill the buffer (capacity 4) without draining it.
    for seq in 1..=8u64 {
        hub.publish(event(&job, CanonicalStatus::Processing, seq)).await;
    }

    // Only the events that fit in the buffer should be present; later ones
    // were dropped rather than blocking the publisher.
    let mut received = Vec::new();
    while let Ok(Some(item)) = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await {
        received.push(item);
    }
    assert!(received.len() <= 4);
}

#[tokio::test]
async fn slow_consumer_is_closed_when_terminal_event_cannot_be_delivered() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let job = JobId::new();
    let mut sub = hub.subscribe(Filter::Job(job.clone()));

    for seq in 1..=4u64 {
        hub.publish(event(&job, CanonicalStatus::Processing, seq)).await;
    }
    hub.publish(event(&job, CanonicalStatus::Completed, 5)).await;

    // Drain whatever fit in the buffer; the very last item must be the
    // slow_consumer close notice, since the buffer was already full when the
    // terminal event tried to land.
    let mut last = None;
    while let Some(item) = sub.recv().await {
        last = Some(item);
    }
    assert!(matches!(
        last,
        Some(SubscriptionEvent::Closed(CloseReason::SlowConsumer))
    ));
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn broadcast_shutdown_closes_every_subscription() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let mut sub = hub.subscribe(Filter::All);

    hub.broadcast_shutdown().await;

    let received = sub.recv().await.unwrap();
    assert!(matches!(received, SubscriptionEvent::Closed(CloseReason::ServerShutdown)));
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn closing_a_subscription_is_idempotent() {
    let hub = ProgressBroadcaster::new(settings(), FakeClock::default());
    let mut sub = hub.subscribe(Filter::All);
    sub.close();
    sub.close();
    assert_eq!(hub.subscriber_count(), 0);
}
