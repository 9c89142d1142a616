//! Runs the whole scenario against an in-process fake of the backup service.

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use jibutest_e2e::{run_scenario, Cli, ScenarioConfig, ScenarioError};

const TENANT: &str = "1";
const TIMESTAMP: &str = "20240101000000";
const BACKUP_PLAN: &str = "backup-20240101000000";

// ─────────────────────────────────────────────────────────────────────────────
// Fake control plane
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Behaviour {
    /// Number of GETs after which a plan reports Ready; `None` never does.
    plan_ready_after: Option<usize>,
    /// Number of GETs after which a job stops.
    job_finished_after: usize,
    job_outcome: &'static str,
    /// Period at which repeated plans spawn jobs.
    repeat_period: Duration,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            plan_ready_after: Some(2),
            job_finished_after: 2,
            job_outcome: "JobCompleted",
            repeat_period: Duration::from_millis(300),
        }
    }
}

struct PlanRecord {
    body: Value,
    gets: usize,
    created: Instant,
    generated: usize,
}

struct JobRecord {
    seq: usize,
    name: String,
    plan: String,
    body: Value,
    gets: usize,
}

#[derive(Default)]
struct FakeState {
    clusters: Vec<Value>,
    namespaces: HashMap<String, Vec<String>>,
    storages: Vec<Value>,
    backup_plans: HashMap<String, PlanRecord>,
    backup_jobs: Vec<JobRecord>,
    restore_plans: HashMap<String, PlanRecord>,
    restore_jobs: HashMap<String, JobRecord>,
    requests: Vec<String>,
    next_seq: usize,
    behaviour: Behaviour,
}

#[derive(Clone)]
struct Fake(Arc<Mutex<FakeState>>);

impl Fake {
    fn new(behaviour: Behaviour) -> Self {
        let mut state = FakeState {
            behaviour,
            ..Default::default()
        };
        state.clusters = vec![
            cluster("c-broken", "NotReady"),
            cluster("c-main", "Ready"),
        ];
        state.namespaces.insert(
            "c-main".to_string(),
            vec!["kube-system".to_string(), "app-ns".to_string()],
        );
        state.storages = vec![
            json!({"metadata": {"name": "s3"}, "spec": {"displayName": "S3"}, "status": {"phase": "Ready"}}),
        ];
        Self(Arc::new(Mutex::new(state)))
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }

    fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    fn position(&self, request: &str) -> Option<usize> {
        self.requests().iter().position(|r| r == request)
    }
}

fn cluster(name: &str, phase: &str) -> Value {
    json!({
        "metadata": {"name": name},
        "spec": {"displayName": name.to_uppercase()},
        "status": {"phase": phase},
    })
}

fn not_found(kind: &str, name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": "NotFound", "message": format!("{} {} not found", kind, name)})),
    )
        .into_response()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl FakeState {
    fn push_job(&mut self, name: String, plan: String, mut body: Value) {
        body["metadata"]["creationTimestamp"] = json!(now_rfc3339());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.backup_jobs.push(JobRecord {
            seq,
            name,
            plan,
            body,
            gets: 0,
        });
    }

    /// Spawn the jobs a repeated plan would have created by now.
    fn generate_repeated_jobs(&mut self) {
        let period = self.behaviour.repeat_period.as_millis().max(1);
        let mut due = Vec::new();
        for (name, plan) in self.backup_plans.iter_mut() {
            if plan.body["spec"]["policy"]["repeat"] != json!(true) {
                continue;
            }
            let expected = (plan.created.elapsed().as_millis() / period) as usize;
            while plan.generated < expected.min(10) {
                due.push((name.clone(), plan.generated));
                plan.generated += 1;
            }
        }
        for (plan, index) in due {
            let name = format!("{}-auto-{}", plan, index);
            let body = json!({
                "metadata": {"name": name},
                "spec": {"action": "StartJob", "backupName": plan, "tenant": TENANT},
            });
            self.push_job(name, plan, body);
        }
    }

    fn plan_phase(&self, gets: usize) -> &'static str {
        match self.behaviour.plan_ready_after {
            Some(after) if gets >= after => "Ready",
            _ => "NotReady",
        }
    }

    fn job_phase(&self, gets: usize) -> &'static str {
        if gets >= self.behaviour.job_finished_after {
            self.behaviour.job_outcome
        } else {
            "JobInProgress"
        }
    }
}

fn with_phase(body: &Value, phase: &str) -> Value {
    let mut body = body.clone();
    body["status"] = json!({"phase": phase});
    body
}

async fn record(State(fake): State<Fake>, request: Request, next: Next) -> Response {
    let line = match request.uri().query() {
        Some(query) => format!("{} {}?{}", request.method(), request.uri().path(), query),
        None => format!("{} {}", request.method(), request.uri().path()),
    };
    fake.lock().requests.push(line);
    next.run(request).await
}

async fn list_clusters(State(fake): State<Fake>, Path(_tenant): Path<String>) -> Json<Value> {
    Json(json!({"items": fake.lock().clusters.clone()}))
}

async fn get_cluster(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let state = fake.lock();
    match state.clusters.iter().find(|c| c["metadata"]["name"] == json!(name)) {
        Some(c) => Json(c.clone()).into_response(),
        None => not_found("cluster", &name),
    }
}

async fn list_namespaces(
    State(fake): State<Fake>,
    Path((_tenant, cluster)): Path<(String, String)>,
) -> Response {
    let state = fake.lock();
    match state.namespaces.get(&cluster) {
        Some(names) => {
            let items: Vec<Value> = names
                .iter()
                .map(|n| json!({"metadata": {"name": n}}))
                .collect();
            Json(json!({"items": items})).into_response()
        }
        None => not_found("cluster", &cluster),
    }
}

async fn list_storages(State(fake): State<Fake>, Path(_tenant): Path<String>) -> Json<Value> {
    Json(json!({"items": fake.lock().storages.clone()}))
}

async fn get_storage(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let state = fake.lock();
    match state.storages.iter().find(|s| s["metadata"]["name"] == json!(name)) {
        Some(s) => Json(s.clone()).into_response(),
        None => not_found("storage", &name),
    }
}

async fn create_backup_plan(
    State(fake): State<Fake>,
    Path(_tenant): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = fake.lock();
    let name = body["metadata"]["name"].as_str().unwrap_or_default().to_string();
    state.backup_plans.insert(
        name,
        PlanRecord {
            body: body.clone(),
            gets: 0,
            created: Instant::now(),
            generated: 0,
        },
    );
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_backup_plan(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let mut state = fake.lock();
    let Some(plan) = state.backup_plans.get_mut(&name) else {
        return not_found("backupplan", &name);
    };
    plan.gets += 1;
    let (gets, body) = (plan.gets, plan.body.clone());
    Json(with_phase(&body, state.plan_phase(gets))).into_response()
}

async fn delete_backup_plan(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    match fake.lock().backup_plans.remove(&name) {
        Some(_) => StatusCode::OK.into_response(),
        None => not_found("backupplan", &name),
    }
}

async fn list_backup_jobs(
    State(fake): State<Fake>,
    Path(_tenant): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = fake.lock();
    state.generate_repeated_jobs();

    let mut jobs: Vec<&JobRecord> = state
        .backup_jobs
        .iter()
        .filter(|j| query.get("planName").map_or(true, |p| *p == j.plan))
        .collect();
    let oldest_first = query.get("sortBy").map(String::as_str) == Some("creationTimestamp")
        && query.get("ascending").map(String::as_str) == Some("true");
    if oldest_first {
        jobs.sort_by_key(|j| j.seq);
    } else {
        jobs.sort_by_key(|j| std::cmp::Reverse(j.seq));
    }

    let items: Vec<Value> = jobs
        .iter()
        .map(|j| with_phase(&j.body, state.job_phase(j.gets)))
        .collect();
    Json(json!({"items": items}))
}

async fn create_backup_job(
    State(fake): State<Fake>,
    Path(_tenant): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = fake.lock();
    let name = body["metadata"]["name"].as_str().unwrap_or_default().to_string();
    let plan = body["spec"]["backupName"].as_str().unwrap_or_default().to_string();
    state.push_job(name, plan, body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_backup_job(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let mut state = fake.lock();
    state.generate_repeated_jobs();
    let Some(job) = state.backup_jobs.iter_mut().find(|j| j.name == name) else {
        return not_found("backupjob", &name);
    };
    job.gets += 1;
    let (gets, body) = (job.gets, job.body.clone());
    Json(with_phase(&body, state.job_phase(gets))).into_response()
}

async fn delete_backup_job(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let mut state = fake.lock();
    let before = state.backup_jobs.len();
    state.backup_jobs.retain(|j| j.name != name);
    if state.backup_jobs.len() == before {
        return not_found("backupjob", &name);
    }
    StatusCode::OK.into_response()
}

async fn create_restore_plan(
    State(fake): State<Fake>,
    Path(_tenant): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = fake.lock();
    let name = body["metadata"]["name"].as_str().unwrap_or_default().to_string();
    state.restore_plans.insert(
        name,
        PlanRecord {
            body: body.clone(),
            gets: 0,
            created: Instant::now(),
            generated: 0,
        },
    );
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_restore_plan(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let mut state = fake.lock();
    let Some(plan) = state.restore_plans.get_mut(&name) else {
        return not_found("restoreplan", &name);
    };
    plan.gets += 1;
    let (gets, body) = (plan.gets, plan.body.clone());
    Json(with_phase(&body, state.plan_phase(gets))).into_response()
}

async fn delete_restore_plan(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    match fake.lock().restore_plans.remove(&name) {
        Some(_) => StatusCode::OK.into_response(),
        None => not_found("restoreplan", &name),
    }
}

async fn create_restore_job(
    State(fake): State<Fake>,
    Path(_tenant): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = fake.lock();
    let name = body["metadata"]["name"].as_str().unwrap_or_default().to_string();
    let plan = body["spec"]["restoreName"].as_str().unwrap_or_default().to_string();
    let seq = state.next_seq;
    state.next_seq += 1;
    state.restore_jobs.insert(
        name.clone(),
        JobRecord {
            seq,
            name,
            plan,
            body: body.clone(),
            gets: 0,
        },
    );
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_restore_job(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    let mut state = fake.lock();
    let Some(job) = state.restore_jobs.get_mut(&name) else {
        return not_found("restorejob", &name);
    };
    job.gets += 1;
    let (gets, body) = (job.gets, job.body.clone());
    Json(with_phase(&body, state.job_phase(gets))).into_response()
}

async fn delete_restore_job(
    State(fake): State<Fake>,
    Path((_tenant, name)): Path<(String, String)>,
) -> Response {
    match fake.lock().restore_jobs.remove(&name) {
        Some(_) => StatusCode::OK.into_response(),
        None => not_found("restorejob", &name),
    }
}

fn router(fake: Fake) -> Router {
    Router::new()
        .route("/v1alpha1/tenants/{tenant}/clusters", get(list_clusters))
        .route("/v1alpha1/tenants/{tenant}/clusters/{name}", get(get_cluster))
        .route(
            "/v1alpha1/tenants/{tenant}/clusters/{name}/namespaces",
            get(list_namespaces),
        )
        .route("/v1alpha1/tenants/{tenant}/storages", get(list_storages))
        .route("/v1alpha1/tenants/{tenant}/storages/{name}", get(get_storage))
        .route(
            "/v1alpha1/tenants/{tenant}/backupplans",
            axum::routing::post(create_backup_plan),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/backupplans/{name}",
            get(get_backup_plan).delete(delete_backup_plan),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/backupjobs",
            get(list_backup_jobs).post(create_backup_job),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/backupjobs/{name}",
            get(get_backup_job).delete(delete_backup_job),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/restoreplans",
            axum::routing::post(create_restore_plan),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/restoreplans/{name}",
            get(get_restore_plan).delete(delete_restore_plan),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/restorejobs",
            axum::routing::post(create_restore_job),
        )
        .route(
            "/v1alpha1/tenants/{tenant}/restorejobs/{name}",
            get(get_restore_job).delete(delete_restore_job),
        )
        .layer(middleware::from_fn_with_state(fake.clone(), record))
        .with_state(fake)
}

async fn start(fake: Fake) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(fake);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(endpoint: &str, extra: &[&str]) -> ScenarioConfig {
    let mut args = vec![
        "jibutest",
        "--tenant",
        TENANT,
        "--api-endpoint",
        endpoint,
        "--exclude-namespaces",
        "kube-system",
        "--pick-retry-limit",
        "64",
        "--poll-interval",
        "20ms",
        "--backup-plan-ready-timeout",
        "5s",
        "--backup-job-creation-timeout",
        "5s",
        "--backup-job-finished-timeout",
        "5s",
        "--restore-plan-ready-timeout",
        "5s",
        "--restore-job-finished-timeout",
        "5s",
    ];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args)
        .unwrap()
        .into_config_at(TIMESTAMP)
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn on_demand_backup_and_restore_succeed() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    let config = config(&endpoint, &[]);

    let report = run_scenario(&config).await.expect("scenario succeeds");

    assert_eq!(report.backup_plan, BACKUP_PLAN);
    assert_eq!(report.backup_cluster.as_deref(), Some("c-main"));
    assert_eq!(report.backup_namespace.as_deref(), Some("app-ns"));
    assert_eq!(report.storage.as_deref(), Some("s3"));
    assert_eq!(report.backup_jobs, vec![config.names.backup_job.clone()]);
    assert_eq!(report.restored_from.as_deref(), Some(config.names.backup_job.as_str()));

    let restore_ns = report.restore_namespace.clone().unwrap();
    assert!(restore_ns.starts_with("app-ns-"));
    assert_ne!(restore_ns, "app-ns");
    assert!(restore_ns.len() <= 64);
    // No kubeconfig on the fake clusters, so the namespace is left in place.
    assert_eq!(report.deleted_namespace, None);

    let state = fake.lock();
    let plan = &state.backup_plans[BACKUP_PLAN].body;
    assert_eq!(plan["spec"]["namespaces"], json!(["app-ns"]));
    assert_eq!(plan["spec"]["excludePV"], json!(false));
    assert_eq!(plan["spec"]["copyMethod"], json!("filesystem"));
    assert_eq!(plan["spec"]["policy"]["retention"], json!(240));
    assert_eq!(plan["spec"]["policy"]["repeat"], json!(false));
    let restore_plan = &state.restore_plans[&config.names.restore_plan].body;
    assert_eq!(
        restore_plan["spec"]["namespaceMappings"],
        json!([format!("app-ns:{}", restore_ns)])
    );
    assert_eq!(restore_plan["spec"]["destClusterName"], json!("c-main"));
    // Jobs and the restore job are cleaned up, the on-demand plan stays.
    assert!(state.backup_jobs.is_empty());
    assert!(state.restore_jobs.is_empty());
}

#[tokio::test]
async fn excluded_namespace_is_never_picked() {
    for _ in 0..5 {
        let fake = Fake::new(Behaviour::default());
        let endpoint = start(fake.clone()).await;
        let config = config(&endpoint, &["--skip-restore"]);

        let report = run_scenario(&config).await.expect("scenario succeeds");
        assert_ne!(report.backup_namespace.as_deref(), Some("kube-system"));
        assert!(report.restore_job.is_none());
    }
}

#[tokio::test]
async fn backup_plan_that_never_gets_ready_times_out() {
    let fake = Fake::new(Behaviour {
        plan_ready_after: None,
        ..Default::default()
    });
    let endpoint = start(fake.clone()).await;
    let config = config(&endpoint, &["--backup-plan-ready-timeout", "300ms"]);

    let started = Instant::now();
    let err = run_scenario(&config).await.unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(err.to_string().contains(BACKUP_PLAN));
    assert!(started.elapsed() >= Duration::from_millis(300));
    // No job is created and cleanup still runs.
    let requests = fake.requests();
    assert!(!requests.iter().any(|r| r == "POST /v1alpha1/tenants/1/backupjobs"));
    assert!(fake
        .position(&format!(
            "DELETE /v1alpha1/tenants/1/restorejobs/{}",
            config.names.restore_job
        ))
        .is_some());
}

#[tokio::test]
async fn failed_backup_job_is_reported_with_its_phase() {
    let fake = Fake::new(Behaviour {
        job_outcome: "JobFailed",
        ..Default::default()
    });
    let endpoint = start(fake.clone()).await;
    let config = config(&endpoint, &[]);

    match run_scenario(&config).await.unwrap_err() {
        ScenarioError::UnexpectedPhase {
            what,
            expected,
            actual,
        } => {
            assert_eq!(what, format!("backup job {}", config.names.backup_job));
            assert_eq!(expected, "JobCompleted");
            assert_eq!(actual, "JobFailed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fake.lock().restore_plans.is_empty());
}

#[tokio::test]
async fn explicit_resources_skip_sampling() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    // c-broken is NotReady, but an explicit choice is trusted.
    fake.lock()
        .namespaces
        .insert("c-broken".to_string(), vec!["kube-system".to_string()]);
    let config = config(
        &endpoint,
        &[
            "--backup-cluster",
            "c-broken",
            "--backup-namespace",
            "kube-system",
            "--storage",
            "s3",
            "--skip-restore",
        ],
    );

    let report = run_scenario(&config).await.expect("scenario succeeds");
    assert_eq!(report.backup_cluster.as_deref(), Some("c-broken"));
    assert_eq!(report.backup_namespace.as_deref(), Some("kube-system"));

    let requests = fake.requests();
    assert!(requests.contains(&"GET /v1alpha1/tenants/1/clusters/c-broken".to_string()));
    assert!(requests.contains(&"GET /v1alpha1/tenants/1/storages/s3".to_string()));
    assert!(!requests.contains(&"GET /v1alpha1/tenants/1/clusters".to_string()));
}

#[tokio::test]
async fn missing_explicit_cluster_fails_the_pick() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    let config = config(&endpoint, &["--backup-cluster", "nope"]);

    let err = run_scenario(&config).await.unwrap_err();
    assert!(matches!(
        err,
        ScenarioError::Select {
            what: "backup cluster",
            ..
        }
    ));
}

#[tokio::test]
async fn cleanup_runs_before_anything_is_created() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    let config = config(&endpoint, &["--skip-restore", "--clean-up-on-end", "false"]);

    run_scenario(&config).await.expect("scenario succeeds");

    let delete_plan = fake
        .position(&format!("DELETE /v1alpha1/tenants/1/backupplans/{}", BACKUP_PLAN))
        .unwrap();
    let create_plan = fake
        .position("POST /v1alpha1/tenants/1/backupplans")
        .unwrap();
    assert!(delete_plan < create_plan);
    // Nothing is removed at the end.
    assert_eq!(fake.lock().backup_jobs.len(), 1);
}

#[tokio::test]
async fn repeated_backup_waits_for_each_job_in_creation_order() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    let config = config(
        &endpoint,
        &[
            "--backup-repeat-enabled",
            "--backup-frequency",
            "*/1 * * * * *",
            "--backup-repeat-check-num",
            "3",
        ],
    );

    let report = run_scenario(&config).await.expect("scenario succeeds");

    assert_eq!(
        report.backup_jobs,
        vec![
            format!("{}-auto-0", BACKUP_PLAN),
            format!("{}-auto-1", BACKUP_PLAN),
            format!("{}-auto-2", BACKUP_PLAN),
        ]
    );
    // The restore uses the oldest job of the plan.
    assert_eq!(
        report.restored_from.as_deref(),
        Some(format!("{}-auto-0", BACKUP_PLAN).as_str())
    );

    let requests = fake.requests();
    assert!(requests.contains(&format!(
        "GET /v1alpha1/tenants/1/backupjobs?planName={}&sortBy=creationTimestamp&ascending=true",
        BACKUP_PLAN
    )));
    // A repeated plan is deleted at the end.
    assert!(!fake.lock().backup_plans.contains_key(BACKUP_PLAN));
}

#[tokio::test]
async fn restore_only_run_uses_existing_backup() {
    let fake = Fake::new(Behaviour::default());
    let endpoint = start(fake.clone()).await;
    {
        let mut state = fake.lock();
        state.backup_plans.insert(
            "nightly".to_string(),
            PlanRecord {
                body: json!({"metadata": {"name": "nightly"}, "spec": {}}),
                gets: 0,
                created: Instant::now(),
                generated: 0,
            },
        );
        state.push_job(
            "nightly-older".to_string(),
            "nightly".to_string(),
            json!({"metadata": {"name": "nightly-older"}, "spec": {"backupName": "nightly"}}),
        );
        state.push_job(
            "nightly-newer".to_string(),
            "nightly".to_string(),
            json!({"metadata": {"name": "nightly-newer"}, "spec": {"backupName": "nightly"}}),
        );
    }
    let config = config(
        &endpoint,
        &[
            "--skip-backup",
            "--backup-plan-name",
            "nightly",
            "--backup-namespace",
            "app-ns",
            "--restore-same-namespace",
            "--restore-cluster",
            "c-main",
        ],
    );

    let report = run_scenario(&config).await.expect("scenario succeeds");

    assert_eq!(report.restored_from.as_deref(), Some("nightly-older"));
    assert_eq!(report.restore_namespace.as_deref(), Some("app-ns"));
    // The existing backup is left untouched.
    let state = fake.lock();
    assert!(state.backup_plans.contains_key("nightly"));
    assert_eq!(state.backup_jobs.len(), 2);
}
