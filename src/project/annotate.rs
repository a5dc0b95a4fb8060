//! Dependency-ordered, concurrent module annotation.
//!
//! Every module lacking a summary gets one task. A task waits on the
//! completion signal of each direct sub-module, then asks the summarizer for
//! its own internal and public context and publishes its public context on
//! its own signal. Modules that are already summarized start out signalled.
//! Once every summary is final, one batch request fills in external contexts.
//!
//! The first failure cancels the shared token so waiting and in-flight tasks
//! stop early; all tasks are still joined before the error is returned, and
//! nothing is written back to the tree unless every task succeeded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::module::{Annotation, Module};
use crate::error::AnnotateError;
use crate::ports::filesystem::FileSystem;
use crate::ports::summarizer::{
    ExternalContextsRequest, FileContent, ModuleContextRequest, ModuleContextResponse,
    ModuleOverview, NamedContext, Summarizer,
};

/// Completion state published by each module.
#[derive(Debug, Clone)]
enum Signal {
    Pending,
    Done(String),
    Failed,
}

/// Work description for one unannotated module, detached from the tree so it
/// can move into a task.
struct Plan {
    name: String,
    files: Vec<String>,
    directories: Vec<String>,
    children: Vec<(String, watch::Receiver<Signal>)>,
}

/// Fills in missing annotations of `root` and its descendants.
///
/// File contents are read through `fs`, relative to `project_root`.
///
/// # Errors
///
/// Returns the first summarizer or file-read failure. The tree is left
/// untouched in that case.
pub async fn annotate(
    root: &mut Module,
    project_root: &Path,
    fs: &Arc<dyn FileSystem>,
    summarizer: &Arc<dyn Summarizer>,
) -> Result<(), AnnotateError> {
    let summaries = summarize_modules(root, project_root, fs, summarizer).await?;
    let produced = summaries.len();
    for (name, response) in summaries {
        if let Some(module) = root.find_by_name_mut(&name) {
            let annotation = module.annotation.get_or_insert_with(Annotation::default);
            annotation.internal_context = response.internal_context;
            annotation.public_context = response.public_context;
        }
    }
    info!(modules = produced, "module summaries complete");

    annotate_external(root, summarizer).await
}

async fn summarize_modules(
    root: &Module,
    project_root: &Path,
    fs: &Arc<dyn FileSystem>,
    summarizer: &Arc<dyn Summarizer>,
) -> Result<Vec<(String, ModuleContextResponse)>, AnnotateError> {
    let modules = root.descendants();

    let mut receivers: HashMap<&str, watch::Receiver<Signal>> = HashMap::new();
    let mut senders: HashMap<&str, watch::Sender<Signal>> = HashMap::new();
    for module in &modules {
        let initial = if module.has_summary() {
            Signal::Done(module.public_context().to_string())
        } else {
            Signal::Pending
        };
        let (tx, rx) = watch::channel(initial);
        receivers.insert(module.name.as_str(), rx);
        senders.insert(module.name.as_str(), tx);
    }

    let cancel = CancellationToken::new();
    let mut set = JoinSet::new();
    let mut skipped = 0usize;

    for module in &modules {
        if module.has_summary() {
            skipped += 1;
            continue;
        }
        let Some(tx) = senders.remove(module.name.as_str()) else {
            continue;
        };
        let plan = Plan {
            name: module.name.clone(),
            files: module.files.iter().map(|f| f.name.clone()).collect(),
            directories: module.directories.clone(),
            children: module
                .modules
                .iter()
                .filter_map(|child| {
                    receivers.get(child.name.as_str()).map(|rx| (child.name.clone(), rx.clone()))
                })
                .collect(),
        };

        let fs = Arc::clone(fs);
        let summarizer = Arc::clone(summarizer);
        let cancel = cancel.clone();
        let project_root = project_root.to_path_buf();
        set.spawn(async move {
            let name = plan.name.clone();
            let result = summarize_one(plan, &project_root, fs, summarizer, &cancel).await;
            match &result {
                Ok(response) => {
                    tx.send_replace(Signal::Done(response.public_context.clone()));
                }
                Err(_) => {
                    cancel.cancel();
                    tx.send_replace(Signal::Failed);
                }
            }
            (name, result)
        });
    }
    debug!(tasks = set.len(), skipped, "scheduled module summaries");

    let mut summaries = Vec::new();
    let mut first_error: Option<AnnotateError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok((name, result)) => result.map(|response| (name, response)),
            Err(err) => {
                cancel.cancel();
                Err(AnnotateError::TaskPanicked(err.to_string()))
            }
        };
        match outcome {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                let replace = match &first_error {
                    None => true,
                    Some(AnnotateError::Cancelled(_)) => !matches!(err, AnnotateError::Cancelled(_)),
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(summaries),
    }
}

async fn summarize_one(
    plan: Plan,
    project_root: &Path,
    fs: Arc<dyn FileSystem>,
    summarizer: Arc<dyn Summarizer>,
    cancel: &CancellationToken,
) -> Result<ModuleContextResponse, AnnotateError> {
    let Plan { name, files, directories, children } = plan;

    let mut sub_contexts = Vec::with_capacity(children.len());
    for (child, mut rx) in children {
        let state = tokio::select! {
            () = cancel.cancelled() => Signal::Failed,
            state = settled(&mut rx) => state,
        };
        match state {
            Signal::Done(content) => sub_contexts.push(NamedContext { name: child, content }),
            Signal::Pending | Signal::Failed => return Err(AnnotateError::Cancelled(name)),
        }
    }

    let mut contents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = fs.read(&project_root.join(&path)).map_err(|source| {
            AnnotateError::ReadFile { module: name.clone(), path: path.clone(), source }
        })?;
        contents.push(FileContent::from_bytes(path, &bytes));
    }

    let request = ModuleContextRequest {
        target_module_name: name.clone(),
        target_module_files: contents,
        target_module_directories: directories,
        sub_modules_public_contexts: sub_contexts,
    };

    debug!(module = %name, "requesting module summary");
    let response = tokio::select! {
        () = cancel.cancelled() => return Err(AnnotateError::Cancelled(name)),
        response = summarizer.summarize_module(request) => response,
    };
    let response =
        response.map_err(|source| AnnotateError::Summarizer { module: name.clone(), source })?;
    info!(module = %name, "module summarized");
    Ok(response)
}

/// Waits until the signal leaves `Pending`. A dropped sender that never
/// settled counts as a failure.
async fn settled(rx: &mut watch::Receiver<Signal>) -> Signal {
    let _ = rx.wait_for(|state| !matches!(state, Signal::Pending)).await;
    match &*rx.borrow() {
        Signal::Pending => Signal::Failed,
        other => other.clone(),
    }
}

async fn annotate_external(
    root: &mut Module,
    summarizer: &Arc<dyn Summarizer>,
) -> Result<(), AnnotateError> {
    let complete = root
        .descendants()
        .into_iter()
        .filter(|m| !m.is_root())
        .all(|m| m.annotation.as_ref().is_some_and(Annotation::has_external));
    if complete {
        debug!("external contexts already present, skipping batch");
        return Ok(());
    }

    let modules = root
        .descendants()
        .into_iter()
        .map(|m| {
            let annotation = m.annotation.clone().unwrap_or_default();
            ModuleOverview {
                name: m.name.clone(),
                parent_name: m.parent.clone().unwrap_or_default(),
                internal_context: annotation.internal_context,
                public_context: annotation.public_context,
            }
        })
        .collect();

    let response = summarizer
        .external_contexts(ExternalContextsRequest { modules })
        .await
        .map_err(|source| AnnotateError::ExternalContext { source })?;

    let mut written = 0usize;
    for entry in response.modules {
        match root.find_by_name_mut(&entry.name) {
            Some(module) => {
                module.annotation.get_or_insert_with(Annotation::default).external_context =
                    entry.external_context;
                written += 1;
            }
            None => warn!(module = %entry.name, "external context returned for unknown module"),
        }
    }
    info!(modules = written, "external contexts complete");
    Ok(())
}
