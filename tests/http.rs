use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodaySummary {
    date: String,
    count: u32,
    goal: u32,
    can_decrement: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyLog {
    date: String,
    count: u32,
    goal: u32,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    daily_goal: u32,
    start_date: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("smokelog_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/settings")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_smokelog"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", unique_data_dir())
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn today(client: &Client, server: &TestServer) -> TodaySummary {
    client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_increment_updates_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;

    let response = client
        .post(format!("{}/api/today/increment", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let returned: TodaySummary = response.json().await.unwrap();
    assert_eq!(returned.count, before.count + 1);

    let settings: Settings = client
        .get(format!("{}/api/settings", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let after = today(&client, &server).await;
    assert_eq!(after.count, before.count + 1);
    assert_eq!(after.goal, settings.daily_goal);
    assert!(after.can_decrement);
    assert!(!after.date.is_empty());
}

#[tokio::test]
async fn http_decrement_and_set_count() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/today/count", server.base_url))
        .json(&serde_json::json!({ "count": 4 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/api/today/decrement", server.base_url))
        .send()
        .await
        .unwrap();
    let summary: TodaySummary = response.json().await.unwrap();
    assert_eq!(summary.count, 3);

    let response = client
        .put(format!("{}/api/today/count", server.base_url))
        .json(&serde_json::json!({ "count": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(today(&client, &server).await.count, 3);
}

#[tokio::test]
async fn http_settings_validate_goal() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .patch(format!("{}/api/settings", server.base_url))
        .json(&serde_json::json!({ "dailyGoal": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let settings: Settings = client
        .patch(format!("{}/api/settings", server.base_url))
        .json(&serde_json::json!({ "dailyGoal": 15 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(settings.daily_goal, 15);
    assert!(!settings.start_date.is_empty());

    let response = client
        .patch(format!("{}/api/settings", server.base_url))
        .json(&serde_json::json!({ "dailyGoal": 20 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn http_export_csv_has_header_and_filename() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let summary = today(&client, &server).await;

    let response = client
        .get(format!("{}/api/export/csv", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("smokelog_export_"));
    assert!(disposition.ends_with(".csv\""));

    let body = response.text().await.unwrap();
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("Fecha,Cantidad,Objetivo,Notas"));
    let first = lines.next().expect("today's row");
    assert!(first.starts_with(&format!("\"{}\",", summary.date)));
}

#[tokio::test]
async fn http_clear_all_resets_store() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    client
        .post(format!("{}/api/today/increment", server.base_url))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(format!("{}/api/data", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let settings: Settings = response.json().await.unwrap();
    assert_eq!(settings.daily_goal, 20);

    let logs: Vec<serde_json::Value> = client
        .get(format!("{}/api/logs", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(logs.is_empty());

    let response = client
        .get(format!("{}/api/settings", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn http_missing_log_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/logs/1999-01-01", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_put_log_accepts_plan_goals_outside_settings_range() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    for (date, goal) in [("2020-01-01", 0), ("2020-01-02", 150)] {
        let response = client
            .put(format!("{}/api/logs/{date}", server.base_url))
            .json(&serde_json::json!({ "count": 3, "goal": goal }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success(), "goal {goal}");
        let log: DailyLog = response.json().await.unwrap();
        assert_eq!(log.date, date);
        assert_eq!(log.goal, goal);
    }
}

#[tokio::test]
async fn http_patch_log_sets_notes_only() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/logs/2020-02-01", server.base_url))
        .json(&serde_json::json!({ "count": 5, "goal": 9 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let log: DailyLog = client
        .patch(format!("{}/api/logs/2020-02-01", server.base_url))
        .json(&serde_json::json!({ "notes": "long meeting" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(log.count, 5);
    assert_eq!(log.goal, 9);
    assert_eq!(log.notes.as_deref(), Some("long meeting"));

    let response = client
        .patch(format!("{}/api/logs/1999-02-01", server.base_url))
        .json(&serde_json::json!({ "notes": "nothing here" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_survey_reports_completion() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let status: serde_json::Value = client
        .get(format!("{}/api/survey", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["completed"], false);
    assert!(status["answers"].is_null());
}
