// tests/watch_loop.rs

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};
use wsrun::dag::{order, OrderResult};
use wsrun::exec::RunSummary;
use wsrun::types::RerunScope;
use wsrun::watch::{ExecutionPass, WatchOptions, WatchReport, Watcher};
use wsrun::workspace::Workspace;
use wsrun_test_utils::builders::{TestWorkspace, WorkspaceBuilder};
use wsrun_test_utils::fakes::RecordingPass;
use wsrun_test_utils::{init_tracing, with_timeout};

fn sample() -> TestWorkspace {
    WorkspaceBuilder::new()
        .member("core", &[("build", "tsc")], &[])
        .member("app", &[("build", "tsc")], &["core"])
        .member("docs", &[("build", "mkdocs")], &[])
        .build()
}

fn options(rerun: RerunScope) -> WatchOptions {
    WatchOptions {
        poll_interval: Duration::from_millis(25),
        debounce: Duration::from_millis(25),
        rerun,
        ..WatchOptions::default()
    }
}

fn watcher(workspace: &Workspace, rerun: RerunScope) -> Watcher {
    let plan = order(&workspace.members, &workspace.dependencies, true).unwrap();
    Watcher::new(
        workspace.members.clone(),
        &workspace.dependencies,
        plan,
        &options(rerun),
    )
    .unwrap()
}

fn member_dir(workspace: &Workspace, name: &str) -> PathBuf {
    workspace.member(name).unwrap().abs_path.clone()
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        sleep(Duration::from_millis(10)).await;
    }
}

/// Run `watcher` while `driver` pokes the filesystem; stop when it returns.
async fn drive<F>(watcher: Watcher, pass: Arc<dyn ExecutionPass>, driver: F) -> WatchReport
where
    F: std::future::Future<Output = ()>,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = stop_rx.await;
    };
    let driver = async move {
        // Let the baseline scan finish first.
        sleep(Duration::from_millis(150)).await;
        driver.await;
        let _ = stop_tx.send(());
    };
    let (report, ()) =
        with_timeout(async move { tokio::join!(watcher.run(pass, shutdown), driver) }).await;
    report.unwrap()
}

#[tokio::test]
async fn change_triggers_a_full_rerun_by_default() {
    init_tracing();
    let ws = sample();
    let workspace = ws.load();
    let pass = Arc::new(RecordingPass::new());

    let core_dir = member_dir(&workspace, "core");
    let observed = Arc::clone(&pass);
    let report = drive(watcher(&workspace, RerunScope::All), pass.clone(), async move {
        fs::write(core_dir.join("index.ts"), "export const x = 1;").unwrap();
        wait_for(|| observed.run_count() >= 1).await;
    })
    .await;

    assert_eq!(report.passes, 1);
    assert_eq!(report.last_summary, Some(RunSummary { success: 3, failed: 0, skipped: 0 }));
    assert_eq!(pass.runs()[0], ["core", "docs", "app"]);
    assert_eq!(pass.announced()[0], ["core"]);
}

#[tokio::test]
async fn affected_scope_reruns_changed_members_and_dependents() {
    init_tracing();
    let ws = sample();
    let workspace = ws.load();
    let pass = Arc::new(RecordingPass::new());

    let core_dir = member_dir(&workspace, "core");
    let docs_dir = member_dir(&workspace, "docs");
    let observed = Arc::clone(&pass);
    drive(watcher(&workspace, RerunScope::Affected), pass.clone(), async move {
        fs::write(docs_dir.join("guide.md"), "# Guide").unwrap();
        wait_for(|| observed.run_count() >= 1).await;
        fs::write(core_dir.join("lib.ts"), "export {};").unwrap();
        wait_for(|| observed.run_count() >= 2).await;
    })
    .await;

    let runs = pass.runs();
    assert_eq!(runs[0], ["docs"]);
    assert_eq!(runs[1], ["core", "app"]);
}

#[tokio::test]
async fn shutdown_without_changes_runs_nothing() {
    let ws = sample();
    let workspace = ws.load();
    let pass = Arc::new(RecordingPass::new());

    let report = drive(watcher(&workspace, RerunScope::All), pass.clone(), async {}).await;
    assert_eq!(report, WatchReport::default());
    assert_eq!(pass.run_count(), 0);
}

#[tokio::test]
async fn excluded_paths_do_not_trigger() {
    let ws = sample();
    let workspace = ws.load();
    let pass = Arc::new(RecordingPass::new());

    let modules = member_dir(&workspace, "app").join("node_modules/dep");
    fs::create_dir_all(&modules).unwrap();
    drive(watcher(&workspace, RerunScope::All), pass.clone(), async move {
        fs::write(modules.join("index.js"), "module.exports = 1;").unwrap();
        sleep(Duration::from_millis(200)).await;
    })
    .await;
    assert_eq!(pass.run_count(), 0);
}

/// Writes `file` (relative to `dir`) during its first pass only.
struct WritingPass {
    dir: PathBuf,
    file: &'static str,
    runs: AtomicUsize,
}

impl WritingPass {
    fn new(dir: PathBuf, file: &'static str) -> Self {
        Self {
            dir,
            file,
            runs: AtomicUsize::new(0),
        }
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ExecutionPass for WritingPass {
    fn run(&self, plan: &OrderResult) -> RunSummary {
        if self.runs.load(Ordering::SeqCst) == 0 {
            let path = self.dir.join(self.file);
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            std::thread::sleep(Duration::from_millis(30));
            let _ = fs::write(&path, "written during a pass");
            std::thread::sleep(Duration::from_millis(30));
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        RunSummary {
            success: plan.member_count(),
            failed: 0,
            skipped: 0,
        }
    }
}

#[tokio::test]
async fn edit_made_during_a_pass_triggers_the_next_pass() {
    init_tracing();
    let ws = sample();
    let workspace = ws.load();
    let core_dir = member_dir(&workspace, "core");
    let pass = Arc::new(WritingPass::new(core_dir.clone(), "src/edited-during-pass.ts"));

    let observed = Arc::clone(&pass);
    let report = drive(watcher(&workspace, RerunScope::All), pass.clone(), async move {
        fs::write(core_dir.join("index.ts"), "export const x = 2;").unwrap();
        wait_for(|| observed.runs() >= 2).await;
        sleep(Duration::from_millis(200)).await;
    })
    .await;

    assert_eq!(report.passes, 2);
}

#[tokio::test]
async fn edit_made_during_the_initial_pass_is_picked_up() {
    init_tracing();
    let ws = sample();
    let workspace = ws.load();
    let docs_dir = member_dir(&workspace, "docs");
    let pass = Arc::new(WritingPass::new(docs_dir, "guide.md"));

    let mut watcher = watcher(&workspace, RerunScope::Affected);
    let dyn_pass: Arc<dyn ExecutionPass> = pass.clone();
    let initial = watcher.run_initial(&dyn_pass).await.unwrap();
    assert_eq!(initial.success, 3);

    let observed = Arc::clone(&pass);
    let report = drive(watcher, dyn_pass, async move {
        wait_for(|| observed.runs() >= 2).await;
        sleep(Duration::from_millis(200)).await;
    })
    .await;

    assert_eq!(report.passes, 1);
    assert_eq!(report.last_summary.map(|s| s.success), Some(1));
}

#[tokio::test]
async fn build_output_does_not_retrigger() {
    let ws = sample();
    let workspace = ws.load();
    let core_dir = member_dir(&workspace, "core");
    let pass = Arc::new(WritingPass::new(core_dir.clone(), "dist/index.js"));

    let observed = Arc::clone(&pass);
    let report = drive(watcher(&workspace, RerunScope::All), pass.clone(), async move {
        fs::write(core_dir.join("src.ts"), "1").unwrap();
        wait_for(|| observed.runs() >= 1).await;
        sleep(Duration::from_millis(250)).await;
    })
    .await;

    assert_eq!(report.passes, 1);
}

#[tokio::test]
async fn burst_across_members_is_coalesced_into_one_pass() {
    init_tracing();
    let ws = sample();
    let workspace = ws.load();
    let pass = Arc::new(RecordingPass::new());
    let options = WatchOptions {
        poll_interval: Duration::from_millis(25),
        debounce: Duration::from_millis(300),
        rerun: RerunScope::Affected,
        ..WatchOptions::default()
    };
    let plan = order(&workspace.members, &workspace.dependencies, true).unwrap();
    let watcher = Watcher::new(
        workspace.members.clone(),
        &workspace.dependencies,
        plan,
        &options,
    )
    .unwrap();

    let dirs: Vec<PathBuf> = ["core", "app", "docs"]
        .into_iter()
        .map(|name| member_dir(&workspace, name))
        .collect();
    let observed = Arc::clone(&pass);
    let report = drive(watcher, pass.clone(), async move {
        for dir in &dirs {
            fs::write(dir.join("a.ts"), "a").unwrap();
            fs::write(dir.join("b.ts"), "b").unwrap();
        }
        wait_for(|| observed.run_count() >= 1).await;
        sleep(Duration::from_millis(400)).await;
    })
    .await;

    assert_eq!(report.passes, 1);
    let announced = pass.announced();
    assert_eq!(announced.len(), 1);
    let mut changed = announced[0].clone();
    changed.sort();
    assert_eq!(changed, ["app", "core", "docs"]);
    assert_eq!(pass.runs()[0], ["core", "docs", "app"]);
}
