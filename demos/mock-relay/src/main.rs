use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sunrelay::prelude::*;

// ---------------------------------------------------------------------------
// Upstream data
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
struct Task {
    #[serde(rename = "_id")]
    id: String,
    text: String,
    completed: bool,
}

#[derive(Deserialize)]
struct CreateTask {
    text: String,
}

#[derive(Deserialize)]
struct TaskRef {
    id: String,
}

/// Server-side state of the fake upstream.
struct Backend {
    /// token → when it stops being accepted
    sessions: HashMap<String, Instant>,
    tasks: Vec<Task>,
    next_task: u64,
}

// ---------------------------------------------------------------------------
// Upstream client
// ---------------------------------------------------------------------------

/// An in-memory stand-in for the real upstream. Sessions expire after
/// `ttl`, and expired sessions are reported the way a real API often
/// does: a plain message, no structured kind.
struct MockUpstream {
    ttl: Duration,
    backend: Mutex<Backend>,
}

struct MockClient {
    token: String,
    email: String,
}

impl MockUpstream {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            backend: Mutex::new(Backend {
                sessions: HashMap::new(),
                tasks: Vec::new(),
                next_task: 1,
            }),
        }
    }

    fn backend(&self) -> Result<std::sync::MutexGuard<'_, Backend>, UpstreamError> {
        self.backend
            .lock()
            .map_err(|_| UpstreamError::other("mock backend poisoned"))
    }

    fn run(&self, client: &MockClient, operation: &str, args: Value) -> Result<Value, UpstreamError> {
        let mut backend = self.backend()?;

        match backend.sessions.get(&client.token) {
            Some(expires) if *expires > Instant::now() => {}
            _ => return Err(UpstreamError::other("Session expired, please log in again")),
        }

        match operation {
            "getUser" => Ok(json!({ "_id": client.email, "email": client.email })),
            "getTasksBacklog" => {
                let open: Vec<&Task> = backend.tasks.iter().filter(|t| !t.completed).collect();
                Ok(json!(open))
            }
            "createTask" => {
                let req: CreateTask = serde_json::from_value(args).map_err(UpstreamError::other)?;
                let task = Task {
                    id: format!("task-{}", backend.next_task),
                    text: req.text,
                    completed: false,
                };
                backend.next_task += 1;
                backend.tasks.push(task.clone());
                Ok(json!(task))
            }
            "completeTask" => {
                let req: TaskRef = serde_json::from_value(args).map_err(UpstreamError::other)?;
                let task = backend
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == req.id)
                    .ok_or_else(|| UpstreamError::Api {
                        status: 404,
                        message: format!("task {} not found", req.id),
                    })?;
                task.completed = true;
                Ok(json!(task))
            }
            other => Err(UpstreamError::UnknownOperation(other.to_string())),
        }
    }
}

impl Upstream for MockUpstream {
    type Connection = MockClient;

    async fn login(&self, credentials: &Credentials) -> Result<MockClient, UpstreamError> {
        if credentials.secret().len() < 4 {
            return Err(UpstreamError::Auth("invalid email or password".into()));
        }
        let token = generate_token();
        self.backend()?
            .sessions
            .insert(token.clone(), Instant::now() + self.ttl);
        Ok(MockClient {
            token,
            email: credentials.principal().to_string(),
        })
    }

    async fn logout(&self, client: &MockClient) -> Result<(), UpstreamError> {
        self.backend()?.sessions.remove(&client.token);
        Ok(())
    }

    async fn invoke(
        &self,
        client: &MockClient,
        operation: &str,
        args: Value,
    ) -> Result<Value, UpstreamError> {
        self.run(client, operation, args)
    }
}

/// Random 32-character hex session token.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

/// How long the fake upstream honours a session token.
const SESSION_TTL_KEY: &str = "MOCK_SESSION_TTL_SECS";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30);

fn session_ttl(config: &dyn ConfigSource) -> Result<Duration, ConfigError> {
    match config.get(SESSION_TTL_KEY) {
        None => Ok(DEFAULT_SESSION_TTL),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid(SESSION_TTL_KEY, "a number of seconds")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config: Arc<dyn ConfigSource> = Arc::new(EnvConfig);
    let ttl = session_ttl(config.as_ref())?;

    let server = RelayServerBuilder::new()
        .config(config)
        .build(MockUpstream::new(ttl))
        .await?;

    tracing::info!(
        addr = %server.local_addr()?,
        ttl_secs = ttl.as_secs(),
        "mock relay ready (set API_KEY, SUNSAMA_EMAIL, SUNSAMA_PASSWORD)"
    );

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
