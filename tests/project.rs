//! End-to-end tests of project creation, update and scope assembly through the
//! public library API, with a deterministic summarizer standing in for a model.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use strata::adapters::live::filesystem::LiveFileSystem;
use strata::config::Config;
use strata::context::ServiceContext;
use strata::ports::summarizer::{
    ExternalContext, ExternalContextsRequest, ExternalContextsResponse, ModuleContextRequest,
    ModuleContextResponse, Summarizer, SummarizerFuture,
};
use strata::project::builder::TokenBudget;
use strata::project::{self, Module};
use strata::scope::ScopeRequest;

/// Summarizes every module as a fixed function of its name and records calls.
#[derive(Default)]
struct EchoSummarizer {
    summarized: Mutex<Vec<String>>,
}

impl EchoSummarizer {
    fn summarized(&self) -> Vec<String> {
        let mut names = self.summarized.lock().unwrap().clone();
        names.sort();
        names
    }
}

impl Summarizer for EchoSummarizer {
    fn summarize_module(
        &self,
        request: ModuleContextRequest,
    ) -> SummarizerFuture<'_, ModuleContextResponse> {
        self.summarized.lock().unwrap().push(request.target_module_name.clone());
        Box::pin(async move {
            let name = request.target_module_name;
            Ok(ModuleContextResponse {
                internal_context: format!("internal {name}"),
                public_context: format!("public {name}"),
            })
        })
    }

    fn external_contexts(
        &self,
        request: ExternalContextsRequest,
    ) -> SummarizerFuture<'_, ExternalContextsResponse> {
        Box::pin(async move {
            let modules = request
                .modules
                .into_iter()
                .map(|m| ExternalContext {
                    external_context: format!("external {}", m.name),
                    name: m.name,
                })
                .collect();
            Ok(ExternalContextsResponse { modules })
        })
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sources() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "README.md", "# demo\n");
    write(dir.path(), "src/lib.rs", "pub mod net;\npub mod store;\n");
    write(dir.path(), "src/net/client.rs", "pub fn connect() {}\n");
    write(dir.path(), "src/store/disk.rs", "pub fn flush() {}\n");
    dir
}

fn config() -> Config {
    Config { budget: TokenBudget { min_tokens: 0, max_tokens: 0 }, ..Config::default() }
}

fn names(root: &Module) -> Vec<String> {
    root.names().into_iter().collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn create_annotates_every_module_and_persists() {
    let dir = sources();
    let summarizer = Arc::new(EchoSummarizer::default());
    let ctx = ServiceContext::new(Arc::new(LiveFileSystem), summarizer.clone());

    let root = project::create(&ctx, dir.path(), &config()).await.unwrap();

    let expected = vec![".", "src", "src/net", "src/store"];
    assert_eq!(names(&root), expected);
    assert_eq!(summarizer.summarized(), expected);

    let stored = project::load(&LiveFileSystem, dir.path()).unwrap();
    assert_eq!(names(&stored), expected);
    let net = stored.find_by_name("src/net").unwrap();
    assert_eq!(net.parent.as_deref(), Some("src"));
    assert_eq!(net.public_context(), "public src/net");
    assert_eq!(net.annotation.as_ref().unwrap().external_context, "external src/net");
    assert_eq!(stored.token_count, root.token_count);
    assert!(dir.path().join(".strata/config.yaml").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_resummarizes_only_changed_modules() {
    let dir = sources();
    let ctx = ServiceContext::new(Arc::new(LiveFileSystem), Arc::new(EchoSummarizer::default()));
    project::create(&ctx, dir.path(), &config()).await.unwrap();

    write(dir.path(), "src/net/client.rs", "pub fn connect() { retry(); }\n");
    write(dir.path(), "src/cache/lru.rs", "pub struct Lru;\n");

    let summarizer = Arc::new(EchoSummarizer::default());
    let ctx = ServiceContext::new(Arc::new(LiveFileSystem), summarizer.clone());
    let result = project::update(&ctx, dir.path()).await.unwrap();

    assert_eq!(result.added, vec!["src/cache"]);
    assert!(result.removed.is_empty());
    assert!(result.changed.contains_key("src/net"));
    assert!(!result.changed.contains_key("src/store"));
    // Ancestors change hash along with the edited module.
    assert_eq!(summarizer.summarized(), vec![".", "src", "src/cache", "src/net"]);

    let stored = project::load(&LiveFileSystem, dir.path()).unwrap();
    assert!(stored.find_by_name("src/cache").unwrap().has_summary());
}

#[tokio::test(flavor = "multi_thread")]
async fn context_command_prints_scope_for_target() {
    let dir = sources();
    let ctx = ServiceContext::new(Arc::new(LiveFileSystem), Arc::new(EchoSummarizer::default()));
    project::create(&ctx, dir.path(), &config()).await.unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_strata"))
        .args(["context", "net/client.rs"])
        .current_dir(dir.path().join("src"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let request: ScopeRequest = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(request.target_directory, "src/net");
    assert_eq!(request.working_module, "src");
    assert_eq!(request.target_module, "src/net");
    assert_eq!(
        request.target_module_context,
        "External Context: external src/net\n\nInternal Context: internal src/net"
    );
    let parents: Vec<&str> =
        request.parent_module_contexts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(parents, vec!["src/store"]);
    let files: Vec<&str> = request.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(files, vec!["src/net/client.rs"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn context_command_requires_fresh_metadata() {
    let dir = sources();
    let ctx = ServiceContext::new(Arc::new(LiveFileSystem), Arc::new(EchoSummarizer::default()));
    project::create(&ctx, dir.path(), &config()).await.unwrap();
    write(dir.path(), "src/cache/lru.rs", "pub struct Lru;\n");

    let output = Command::new(env!("CARGO_BIN_EXE_strata"))
        .arg("context")
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("strata update"));
}
