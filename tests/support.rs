//! Shared scaffolding for the workspace's black-box integration tests.
//!
//! Each scenario in `tests/` spawns the real `loraflowd` binary against a
//! `wiremock`-faked external generator, then drives it exactly the way an
//! operator or the SPA frontend would: over HTTP and the `/ws/progress`
//! WebSocket feed. Nothing here reaches into the crates directly — that
//! would just re-test the unit suites already living next to the code.

use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate, Respond};

/// A fake SDNext-style generator backend.
pub struct FakeGenerator {
    server: MockServer,
}

impl FakeGenerator {
    /// A generator whose first poll reports 50% progress and whose second
    /// poll (and every one after) reports completion (spec §8 scenario 1:
    /// `queued -> processing -> processing(progress>=0.5) -> completed`).
    pub async fn completes_after_one_poll() -> Self {
        let server = MockServer::start().await;
        mount_common(&server).await;
        Mock::given(method("GET"))
            .and(path("/generate/gen-1"))
            .respond_with(ProgressThenComplete::default())
            .mount(&server)
            .await;
        Self { server }
    }

    /// A generator that reports `steps` distinct, monotonically advancing
    /// `processing` updates before completing, for scenarios that need
    /// several intermediate events published rather than just one.
    pub async fn many_steps_then_complete(steps: usize) -> Self {
        let server = MockServer::start().await;
        mount_common(&server).await;
        Mock::given(method("GET"))
            .and(path("/generate/gen-1"))
            .respond_with(ManyStepsThenComplete { steps, calls: AtomicUsize::new(0) })
            .mount(&server)
            .await;
        Self { server }
    }

    /// A generator that reports `processing` forever, for scenarios that
    /// exercise cancellation or immediate-mode timeout rather than letting
    /// the job finish on its own.
    pub async fn never_completes() -> Self {
        let server = MockServer::start().await;
        mount_common(&server).await;
        Mock::given(method("GET"))
            .and(path("/generate/gen-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "processing",
                "progress": 10,
            })))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }
}

async fn mount_common(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "handle": "gen-1" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate/gen-1/cancel"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[derive(Default)]
struct ProgressThenComplete {
    calls: AtomicUsize,
}

impl Respond for ProgressThenComplete {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(200).set_body_json(json!({
                "state": "processing",
                "progress": 50,
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "state": "completed",
                "progress": 100,
                "images": ["https://generator.example/out-0.png"],
            }))
        }
    }
}

struct ManyStepsThenComplete {
    steps: usize,
    calls: AtomicUsize,
}

impl Respond for ManyStepsThenComplete {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.steps {
            let progress = ((n + 1) * 100 / (self.steps + 1)) as u64;
            ResponseTemplate::new(200).set_body_json(json!({
                "state": "processing",
                "progress": progress,
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "state": "completed",
                "progress": 100,
                "images": ["https://generator.example/out-0.png"],
            }))
        }
    }
}

/// A running `loraflowd` child process bound to a throwaway port, torn down
/// on drop.
pub struct TestServer {
    child: Child,
    pub base_url: String,
    _config_dir: tempfile::TempDir,
    stderr: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

pub struct ServerOptions<'a> {
    pub generator_base_url: &'a str,
    pub broker_url: Option<&'a str>,
    pub disable_in_process_fallback: bool,
    pub immediate_mode_deadline_ms: u64,
    pub ws_buffer_size: usize,
}

impl<'a> ServerOptions<'a> {
    pub fn new(generator_base_url: &'a str) -> Self {
        Self {
            generator_base_url,
            broker_url: None,
            disable_in_process_fallback: false,
            immediate_mode_deadline_ms: 800,
            ws_buffer_size: 64,
        }
    }
}

impl TestServer {
    pub async fn start(options: ServerOptions<'_>) -> Self {
        let config_dir = tempfile::tempdir().expect("create temp config dir");
        let port = free_port();
        let bind_addr = format!("127.0.0.1:{port}");

        let mut toml_body = format!(
            "bind_addr = \"{bind_addr}\"\n\
             log_filter = \"loraflow=debug\"\n\
             generator_base_url = \"{generator}\"\n\
             generator_timeout_s = 5\n\
             poll_interval_ms = 30\n\
             max_job_duration_s = 10\n\
             immediate_mode_deadline_ms = {deadline}\n\
             queue_capacity = 32\n\
             ws_buffer_size = {ws_buffer_size}\n\
             disable_in_process_fallback = {fallback}\n",
            generator = options.generator_base_url,
            fallback = options.disable_in_process_fallback,
            deadline = options.immediate_mode_deadline_ms,
            ws_buffer_size = options.ws_buffer_size,
        );
        if let Some(broker) = options.broker_url {
            toml_body.push_str(&format!("broker_url = \"{broker}\"\n"));
        }

        let config_path = config_dir.path().join("loraflow.toml");
        std::fs::write(&config_path, toml_body).expect("write test config");

        let mut child = Command::new(loraflowd_bin())
            .arg("--config")
            .arg(&config_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn loraflowd");

        let stderr = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let child_stderr = child.stderr.take().expect("piped stderr");
        let collected = stderr.clone();
        std::thread::spawn(move || {
            use std::io::BufRead;
            let reader = std::io::BufReader::new(child_stderr);
            for line in reader.lines().map_while(Result::ok) {
                collected.lock().expect("stderr buffer lock").push(line);
            }
        });

        let base_url = format!("http://{bind_addr}");
        wait_for_ready(&base_url, &mut child).await;

        Self { child, base_url, _config_dir: config_dir, stderr }
    }

    /// Count log lines emitted so far that contain `needle`, for asserting
    /// a warning fired exactly once across a degradation transition.
    pub fn log_lines_containing(&self, needle: &str) -> usize {
        self.stderr.lock().expect("stderr buffer lock").iter().filter(|line| line.contains(needle)).count()
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self, job_id: Option<&str>) -> String {
        let ws_base = self.base_url.replacen("http://", "ws://", 1);
        match job_id {
            Some(id) => format!("{ws_base}/ws/progress?job_id={id}"),
            None => format!("{ws_base}/ws/progress"),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn wait_for_ready(base_url: &str, child: &mut Child) {
    let client = reqwest::Client::new();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            panic!("loraflowd exited early during startup with {status}");
        }
        if client.get(format!("{base_url}/jobs")).send().await.is_ok() {
            return;
        }
        if std::time::Instant::now() >= deadline {
            panic!("loraflowd did not become ready within 5s");
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("read local addr").port()
}

fn loraflowd_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_loraflowd"))
}

pub fn loraflowctl_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_loraflowctl"))
}

/// A minimal generate-request body for `POST /jobs` with no adapters.
pub fn simple_generate_body(mode: &str) -> Value {
    json!({
        "prefix": "a cat",
        "params": {
            "sampler": "euler",
            "steps": 20,
            "cfg_scale": 7.0,
            "width": 512,
            "height": 512,
            "batch_size": 1
        },
        "mode": mode
    })
}
