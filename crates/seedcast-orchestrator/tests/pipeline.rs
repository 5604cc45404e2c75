//! Full destination pipelines against mock UNIT3D sites.

use async_trait::async_trait;
use seedcast_core::{
    build_no_redirect_client, DestinationCredentials, DestinationId, NetworkConfig, ReleaseDescriptor, RunId,
};
use seedcast_destination::{ConfiguredDestination, Destination, DestinationRegistry, RunContext, UploadPackage};
use seedcast_orchestrator::{DecisionPrompter, Question, RunMode, RunOptions, UploadOrchestrator};
use seedcast_session::{FileSessionStore, SessionAuthenticator};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELEASE_NAME: &str = "Movie 2020 1080p BluRay x264-GRP";
const OTHER_GROUP: &str =
    r#"{"data":[{"attributes":{"name":"Movie.2020.1080p.BluRay.x264-OTHER","size":1000,"files":[]}}]}"#;
const NO_RESULTS: &str = r#"{"data":[]}"#;

/// Answers every question the same way and remembers what was asked.
struct ScriptedPrompter {
    answer: bool,
    asked: Mutex<Vec<Question>>,
}

impl ScriptedPrompter {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    fn asked(&self) -> Vec<Question> {
        self.asked.lock().expect("lock").clone()
    }
}

#[async_trait]
impl DecisionPrompter for ScriptedPrompter {
    async fn ask(&self, question: Question) -> seedcast_orchestrator::Result<bool> {
        self.asked.lock().expect("lock").push(question);
        Ok(self.answer)
    }
}

fn definition(id: &str, uri: &str, banned: &[&str]) -> ConfiguredDestination {
    let mut toml = format!(
        r#"
[destination]
id = "{id}"
name = "{id} Tracker"
base_url = "{uri}"

[auth]
method = "api-token"

[search]
method = "unit3d-api"
url = "{uri}/{id}/api/torrents/filter"

[upload]
method = "multipart"
url = "{uri}/{id}/api/torrents/upload"
success_text = '"success":true'

[upload.fields]
name = "{{name}}"
anonymous = "{{anon}}"
"#
    );
    for group in banned {
        toml.push_str(&format!("\n[[eligibility.banned_groups]]\nname = \"{group}\"\n"));
    }
    ConfiguredDestination::new(toml::from_str(&toml).expect("parse definition"))
}

async fn mock_search(server: &MockServer, id: &str, status: u16, body: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{id}/api/torrents/filter")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(hits)
        .mount(server)
        .await;
}

async fn mock_upload(server: &MockServer, id: &str, hits: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{id}/api/torrents/upload")))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true,"message":"Uploaded"}"#))
        .expect(hits)
        .mount(server)
        .await;
}

fn orchestrator(
    temp: &TempDir,
    destinations: Vec<ConfiguredDestination>,
    options: RunOptions,
) -> UploadOrchestrator {
    let registry = DestinationRegistry::new();
    let mut credentials = HashMap::new();
    for destination in destinations {
        credentials.insert(
            destination.id().as_str().to_lowercase(),
            DestinationCredentials {
                api_key: Some("key".to_string()),
                ..DestinationCredentials::default()
            },
        );
        registry.register(Arc::new(destination));
    }

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
    UploadOrchestrator::new(registry, run, authenticator, options).with_credentials(credentials)
}

fn unattended() -> RunOptions {
    RunOptions {
        mode: RunMode::Unattended,
        ..RunOptions::default()
    }
}

fn release() -> ReleaseDescriptor {
    ReleaseDescriptor {
        resolution: Some("1080p".to_string()),
        tag: Some("-GRP".to_string()),
        ..ReleaseDescriptor::named(RELEASE_NAME)
    }
}

fn package() -> UploadPackage {
    UploadPackage {
        torrent: Arc::from(b"d4:infod4:name5:moviee".to_vec()),
        description: "A movie.".to_string(),
        images: Vec::new(),
    }
}

fn id(value: &str) -> DestinationId {
    DestinationId::new(value).expect("valid id")
}

#[tokio::test]
async fn test_clean_search_uploads() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, NO_RESULTS, 1).await;
    mock_upload(&server, "AITHER", 1).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], unattended())
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.uploaded());
    assert!(status.passed());
    assert_eq!(status.status_message(), Some("Uploaded"));
    assert!(status.upload_duration().is_some());
}

#[tokio::test]
async fn test_duplicate_blocks_unattended_upload() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, OTHER_GROUP, 1).await;
    mock_upload(&server, "AITHER", 0).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], unattended())
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.dupe());
    assert!(!status.uploaded());
    assert_eq!(status.duplicates(), ["Movie.2020.1080p.BluRay.x264-OTHER".to_string()]);
    assert!(status
        .status_message()
        .is_some_and(|m| m.starts_with("Possible duplicates")));
}

#[tokio::test]
async fn test_upload_dupes_uploads_anyway() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, OTHER_GROUP, 1).await;
    mock_upload(&server, "AITHER", 1).await;

    let temp = TempDir::new().expect("temp dir");
    let options = RunOptions {
        upload_dupes: true,
        ..unattended()
    };
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], options)
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.dupe());
    assert!(status.uploaded());
}

#[tokio::test]
async fn test_banned_group_stops_before_search() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, NO_RESULTS, 0).await;
    mock_upload(&server, "AITHER", 0).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &["grp"])], unattended())
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.banned());
    assert_eq!(status.status_message(), Some("grp is banned from AITHER Tracker"));
    assert!(summary.skipped().contains(&&id("AITHER")));
}

#[tokio::test]
async fn test_interactive_operator_overrides_ban_and_confirms() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, NO_RESULTS, 1).await;
    mock_upload(&server, "AITHER", 1).await;

    let temp = TempDir::new().expect("temp dir");
    let prompter = Arc::new(ScriptedPrompter::new(true));
    let summary = orchestrator(
        &temp,
        vec![definition("AITHER", &server.uri(), &["GRP"])],
        RunOptions::default(),
    )
    .with_prompter(Arc::clone(&prompter) as Arc<dyn DecisionPrompter>)
    .run(&release(), &package(), &[id("AITHER")])
    .await;

    assert!(summary.status(&id("AITHER")).expect("status").uploaded());

    let asked = prompter.asked();
    assert_eq!(asked.len(), 2);
    assert!(matches!(&asked[0], Question::OverrideBan { group, .. } if group == "GRP"));
    assert!(matches!(&asked[1], Question::ConfirmUpload { name, .. } if name == RELEASE_NAME));
}

#[tokio::test]
async fn test_operator_declines_upload() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, NO_RESULTS, 1).await;
    mock_upload(&server, "AITHER", 0).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], RunOptions::default())
        .with_prompter(Arc::new(ScriptedPrompter::new(false)))
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.skipped());
    assert_eq!(status.status_message(), Some("Upload declined by operator."));
}

#[tokio::test]
async fn test_missing_api_key_skips_destination() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, NO_RESULTS, 0).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], unattended())
        .with_credentials(HashMap::new())
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.skipped());
    assert_eq!(
        status.status_message(),
        Some("Missing API key in config file for AITHER")
    );
}

#[tokio::test]
async fn test_search_failure_only_ends_its_destination() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 503, "maintenance", 1).await;
    mock_upload(&server, "AITHER", 0).await;
    mock_search(&server, "BLU", 200, NO_RESULTS, 1).await;
    mock_upload(&server, "BLU", 1).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(
        &temp,
        vec![
            definition("AITHER", &server.uri(), &[]),
            definition("BLU", &server.uri(), &[]),
        ],
        unattended(),
    )
    .run(&release(), &package(), &[id("AITHER"), id("BLU")])
    .await;

    let failed = summary.status(&id("AITHER")).expect("status");
    assert!(failed.skipped());
    assert!(!failed.uploaded());

    assert!(summary.status(&id("BLU")).expect("status").uploaded());
    assert_eq!(summary.uploaded(), vec![&id("BLU")]);
}

#[tokio::test]
async fn test_unreadable_search_answer_is_listed_on_status() {
    let server = MockServer::start().await;
    mock_search(&server, "AITHER", 200, "<html>Login</html>", 1).await;
    mock_upload(&server, "AITHER", 0).await;

    let temp = TempDir::new().expect("temp dir");
    let summary = orchestrator(&temp, vec![definition("AITHER", &server.uri(), &[])], unattended())
        .run(&release(), &package(), &[id("AITHER")])
        .await;

    let status = summary.status(&id("AITHER")).expect("status");
    assert!(status.skipped());
    let [artifact] = status.artifacts() else {
        panic!("expected one artifact, got {:?}", status.artifacts());
    };
    assert!(artifact.ends_with("[AITHER]Failed_Search.html"));
    assert_eq!(
        std::fs::read_to_string(artifact).expect("read artifact"),
        "<html>Login</html>"
    );
}
