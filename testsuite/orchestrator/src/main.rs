// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! `nodefuzz`: the distributed configuration fuzz orchestrator binary.
//!
//! Loads an [`OrchestratorConfig`](config::OrchestratorConfig), builds one
//! [`Worker`] per node (binding each to its own config file, node-control
//! scripts and results directory), and runs them forever on a fixed-size
//! thread pool, re-submitting each worker's next round the instant the
//! previous one completes. A [`Reporter`] snapshots the shared
//! [`KnowledgeBase`] to disk every `report_interval` completed rounds.

mod config;
mod pool;
mod reporter;

use config::{NodeRole, NodeSpec, OrchestratorConfig};
use failure::{format_err, Result};
use nodefuzz_config::{CategoryMap, ConfigStore};
use nodefuzz_kb::KnowledgeBase;
use nodefuzz_node::{ArtifactStore, NodeRunner, ScriptNodeRunner};
use nodefuzz_verdict::{RestartMutex, VerdictConfig};
use nodefuzz_worker::{Role, Worker};
use rand::rngs::StdRng;
use reporter::Reporter;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "nodefuzz",
    about = "Configuration-aware fuzzing orchestrator for long-lived node processes"
)]
struct Opt {
    /// Path to the orchestrator's own TOML configuration (node roster,
    /// results root, category map path, tunables).
    #[structopt(long, parse(from_os_str))]
    config: std::path::PathBuf,
}

fn main() {
    let opt = Opt::from_args();
    let _guard = init_logging();
    if let Err(e) = run(&opt) {
        slog_scope::error!("orchestrator exited with an error"; "error" => e.to_string());
        std::process::exit(1);
    }
}

/// `slog-term` + `slog-async` + `slog-envlogger`, scoped globally so library
/// crates can log through plain `slog_scope::{info,warn,error}` calls
/// without threading a `Logger` through every constructor.
fn init_logging() -> slog_scope::GlobalLoggerGuard {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain);
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, slog::o!());
    slog_scope::set_global_logger(logger)
}

fn run(opt: &Opt) -> Result<()> {
    let config = OrchestratorConfig::load(&opt.config)?;

    let category_map = Arc::new(CategoryMap::load(&config.category_map_path)?);
    let kb = KnowledgeBase::with_threshold(config.consistent_threshold);
    let restart_mutex: Arc<RestartMutex> = Arc::new(Mutex::new(()));
    let verdict_config = VerdictConfig {
        post_restart_delay: Duration::from_secs(config.post_restart_delay_secs),
        ..VerdictConfig::default()
    };
    let reporter = Arc::new(Reporter::new(
        kb.clone(),
        config.results_root.join("reports"),
        config.report_interval,
    )?);

    let pool = threadpool::ThreadPool::new(config.nodes.len());
    for node in &config.nodes {
        let worker = build_worker(
            node,
            &config.results_root,
            &category_map,
            &kb,
            &restart_mutex,
            &verdict_config,
        )?;
        slog_scope::info!(
            "worker started";
            "node" => node.name.as_str(),
            "role" => format!("{:?}", node.role),
        );
        pool::spawn(&pool, Arc::new(worker), reporter.clone());
    }

    slog_scope::info!(
        "orchestrator running";
        "nodes" => config.nodes.len(),
        "report_interval" => config.report_interval,
        "reports_dir" => reporter.reports_dir().display().to_string(),
    );

    // No cancellation or timeout model beyond the worker pool's own loop:
    // the process runs indefinitely until a deployment-level signal kills
    // it (spec.md §5, §7).
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn build_worker(
    node: &NodeSpec,
    results_root: &Path,
    category_map: &Arc<CategoryMap>,
    kb: &KnowledgeBase,
    restart_mutex: &Arc<RestartMutex>,
    verdict_config: &VerdictConfig,
) -> Result<Worker<StdRng>> {
    let store = ConfigStore::open(&node.config_path)
        .map_err(|e| format_err!("node {}: {}", node.name, e))?;
    let initial_tree = store
        .load()
        .map_err(|e| format_err!("node {}: failed to load initial config: {}", node.name, e))?;
    let runner: Box<dyn NodeRunner> = Box::new(
        ScriptNodeRunner::new(&node.dir, &node.liveness_selector)
            .map_err(|e| format_err!("node {}: {}", node.name, e))?,
    );
    let artifacts = ArtifactStore::new(results_root, &node.name)
        .map_err(|e| format_err!("node {}: {}", node.name, e))?;

    Ok(Worker::new(
        node.name.clone(),
        role_of(node.role),
        category_map.clone(),
        kb.clone(),
        store,
        initial_tree,
        runner,
        artifacts,
        restart_mutex.clone(),
        verdict_config.clone(),
    ))
}

fn role_of(role: NodeRole) -> Role {
    match role {
        NodeRole::Fuzzing => Role::Fuzzing,
        NodeRole::Exploration => Role::Exploration,
    }
}
