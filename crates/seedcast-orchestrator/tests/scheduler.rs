//! Scheduling, isolation and ordering with in-memory destinations.

use async_trait::async_trait;
use seedcast_core::{
    build_no_redirect_client, CandidateMatch, DestinationCredentials, DestinationId, NetworkConfig,
    ReleaseDescriptor, RunId, UploadOutcome,
};
use seedcast_destination::{
    Destination, DestinationDefinition, DestinationRegistry, Eligibility, RunContext,
    SessionRequirements, SuccessPolicy, TaskContext, UploadPackage,
};
use seedcast_orchestrator::{RunMode, RunOptions, UploadOrchestrator};
use seedcast_session::{FileSessionStore, SessionAuthenticator, SessionCredential, ValidatedSession};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct Behaviour {
    rename: Option<String>,
    panic_in_search: bool,
    delay_ms: u64,
}

struct TestDestination {
    definition: DestinationDefinition,
    behaviour: Behaviour,
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl TestDestination {
    fn new(id: &str, behaviour: Behaviour, seen: Arc<Mutex<Vec<(String, String)>>>) -> Self {
        let toml = format!(
            r#"
[destination]
id = "{id}"
name = "{id}"
base_url = "https://{id}.example"

[auth]
method = "none"

[search]
method = "none"

[upload]
method = "multipart"
url = "https://{id}.example/upload"
success_status_codes = [200]
"#
        );
        Self {
            definition: toml::from_str(&toml).expect("parse definition"),
            behaviour,
            seen,
        }
    }
}

#[async_trait]
impl Destination for TestDestination {
    fn id(&self) -> &DestinationId {
        self.definition.id()
    }

    fn definition(&self) -> &DestinationDefinition {
        &self.definition
    }

    fn prepare(&self, release: &mut ReleaseDescriptor) {
        if let Some(name) = &self.behaviour.rename {
            release.name.clone_from(name);
            release.files.push("extra.nfo".to_string());
        }
    }

    fn session_requirements(
        &self,
        _credentials: &DestinationCredentials,
    ) -> seedcast_destination::Result<Option<SessionRequirements>> {
        Ok(None)
    }

    async fn check_eligibility(&self, _release: &ReleaseDescriptor, _ctx: &TaskContext) -> Eligibility {
        Eligibility::Eligible
    }

    fn check_rules(&self, _release: &ReleaseDescriptor, _ctx: &TaskContext) -> Eligibility {
        Eligibility::Eligible
    }

    async fn search(
        &self,
        release: &ReleaseDescriptor,
        _ctx: &TaskContext,
        _session: Option<&SessionCredential>,
    ) -> seedcast_destination::Result<Vec<CandidateMatch>> {
        tokio::time::sleep(Duration::from_millis(self.behaviour.delay_ms)).await;
        assert!(!self.behaviour.panic_in_search, "search exploded");
        self.seen
            .lock()
            .expect("lock")
            .push((self.id().to_string(), release.name.clone()));
        Ok(Vec::new())
    }

    fn success_policy(&self) -> seedcast_destination::Result<SuccessPolicy> {
        Ok(SuccessPolicy::StatusCodeSet(vec![200]))
    }

    fn render_fields(
        &self,
        release: &ReleaseDescriptor,
        _package: &UploadPackage,
        _ctx: &TaskContext,
        _token: Option<&str>,
    ) -> Vec<(String, String)> {
        vec![("name".to_string(), release.name.clone())]
    }

    async fn submit(
        &self,
        _release: &ReleaseDescriptor,
        _package: &UploadPackage,
        _ctx: &TaskContext,
        _session: Option<&ValidatedSession>,
    ) -> seedcast_destination::Result<UploadOutcome> {
        Ok(UploadOutcome {
            success: true,
            assigned_id: Some(format!("{}-1", self.id())),
            message: "Torrent uploaded successfully.".to_string(),
            details_url: None,
            announce_url: None,
            artifact: None,
        })
    }
}

fn orchestrator(temp: &TempDir, registry: DestinationRegistry, options: RunOptions) -> UploadOrchestrator {
    let network = NetworkConfig::default();
    let run = Arc::new(
        RunContext::new(RunId::generate(), temp.path().to_path_buf(), network.clone()).expect("run context"),
    );
    let authenticator = SessionAuthenticator::new(
        Arc::new(FileSessionStore::new(temp.path())),
        run.client.clone(),
        build_no_redirect_client(&network).expect("client"),
        run.artifacts.clone(),
    );
    UploadOrchestrator::new(registry, run, authenticator, options)
}

fn unattended() -> RunOptions {
    RunOptions {
        mode: RunMode::Unattended,
        ..RunOptions::default()
    }
}

fn id(value: &str) -> DestinationId {
    DestinationId::new(value).expect("valid id")
}

#[tokio::test]
async fn test_task_mutations_stay_private() {
    let temp = TempDir::new().expect("temp dir");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = DestinationRegistry::new();
    registry.register(Arc::new(TestDestination::new("AA", Behaviour::default(), Arc::clone(&seen))));
    registry.register(Arc::new(TestDestination::new(
        "BB",
        Behaviour {
            rename: Some("Rewritten by BB".to_string()),
            ..Behaviour::default()
        },
        Arc::clone(&seen),
    )));

    let release = ReleaseDescriptor {
        files: vec!["movie.mkv".to_string()],
        ..ReleaseDescriptor::named("Movie 2020 1080p BluRay x264-GRP")
    };
    let before = serde_json::to_vec(&release).expect("serialize");

    let summary = orchestrator(&temp, registry, unattended())
        .run(&release, &UploadPackage::default(), &[id("AA"), id("BB")])
        .await;

    assert_eq!(serde_json::to_vec(&release).expect("serialize"), before);

    let mut seen = seen.lock().expect("lock").clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("AA".to_string(), "Movie 2020 1080p BluRay x264-GRP".to_string()),
            ("BB".to_string(), "Rewritten by BB".to_string()),
        ]
    );
    assert_eq!(summary.uploaded().len(), 2);
}

#[tokio::test]
async fn test_panicking_task_does_not_affect_siblings() {
    let temp = TempDir::new().expect("temp dir");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = DestinationRegistry::new();
    registry.register(Arc::new(TestDestination::new(
        "BOOM",
        Behaviour {
            panic_in_search: true,
            ..Behaviour::default()
        },
        Arc::clone(&seen),
    )));
    registry.register(Arc::new(TestDestination::new(
        "FINE",
        Behaviour {
            delay_ms: 20,
            ..Behaviour::default()
        },
        Arc::clone(&seen),
    )));

    let summary = orchestrator(&temp, registry, unattended())
        .run(
            &ReleaseDescriptor::named("Movie"),
            &UploadPackage::default(),
            &[id("BOOM"), id("FINE")],
        )
        .await;

    let boom = summary.status(&id("BOOM")).expect("status");
    assert!(boom.skipped());
    assert!(boom
        .status_message()
        .is_some_and(|m| m.contains("internal error: search exploded")));

    let fine = summary.status(&id("FINE")).expect("status");
    assert!(fine.uploaded());
    assert_eq!(fine.assigned_id(), Some("FINE-1"));
}

#[tokio::test]
async fn test_statuses_keep_input_order_and_unknown_ids_are_skipped() {
    let temp = TempDir::new().expect("temp dir");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = DestinationRegistry::new();
    registry.register(Arc::new(TestDestination::new(
        "SLOW",
        Behaviour {
            delay_ms: 50,
            ..Behaviour::default()
        },
        Arc::clone(&seen),
    )));
    registry.register(Arc::new(TestDestination::new("QUICK", Behaviour::default(), Arc::clone(&seen))));

    let summary = orchestrator(&temp, registry, unattended())
        .run(
            &ReleaseDescriptor::named("Movie"),
            &UploadPackage::default(),
            &[id("SLOW"), id("NOPE"), id("QUICK")],
        )
        .await;

    let order: Vec<String> = summary
        .statuses()
        .iter()
        .map(|s| s.destination().to_string())
        .collect();
    assert_eq!(order, vec!["SLOW", "NOPE", "QUICK"]);

    let unknown = summary.status(&id("NOPE")).expect("status");
    assert!(unknown.skipped());
    assert_eq!(unknown.status_message(), Some("NOPE is not recognized"));

    // Both known destinations finished; the quick one was not held back
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.first().map(|(id, _)| id.as_str()), Some("QUICK"));
}

#[tokio::test]
async fn test_dry_run_stops_before_upload() {
    let temp = TempDir::new().expect("temp dir");
    let registry = DestinationRegistry::new();
    registry.register(Arc::new(TestDestination::new(
        "AA",
        Behaviour::default(),
        Arc::new(Mutex::new(Vec::new())),
    )));

    let options = RunOptions {
        dry_run: true,
        ..unattended()
    };
    let summary = orchestrator(&temp, registry, options)
        .run(&ReleaseDescriptor::named("Movie"), &UploadPackage::default(), &[id("AA")])
        .await;

    let status = summary.status(&id("AA")).expect("status");
    assert!(!status.uploaded());
    assert!(status.passed());
    assert_eq!(status.status_message(), Some(seedcast_orchestrator::DRY_RUN_MESSAGE));
}

#[tokio::test]
async fn test_check_session() {
    let temp = TempDir::new().expect("temp dir");
    let registry = DestinationRegistry::new();
    registry.register(Arc::new(TestDestination::new(
        "AA",
        Behaviour::default(),
        Arc::new(Mutex::new(Vec::new())),
    )));
    let orchestrator = orchestrator(&temp, registry, unattended());

    let session = orchestrator.check_session(&id("AA")).await.expect("check");
    assert!(session.is_none());

    let err = orchestrator
        .check_session(&id("NOPE"))
        .await
        .expect_err("unknown destination");
    assert_eq!(err.to_string(), "NOPE is not recognized");
}
