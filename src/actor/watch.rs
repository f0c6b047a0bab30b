//! Source and output watcher.
//!
//! `src/` and `dist/` are watched recursively and the project root
//! non-recursively, so either tree is picked up again when it is created
//! after startup. Events are routed by path prefix: source subtrees to the
//! stage that owns them, `dist/` to a client reload. Events are dispatched
//! on a single thread, so stage runs never overlap; every matched stage runs
//! once per event, without debouncing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::ReloadChannel;
use crate::config::ProjectConfig;
use crate::core::{Layout, StageId};
use crate::pipeline::Reporter;
use crate::stage::{BuildContext, run_stage};
use crate::utils::fs::{has_extension, is_temp_file};
use crate::{debug, log};

/// Stages re-run on source changes.
const WATCHED_STAGES: [StageId; 5] = [
    StageId::Markup,
    StageId::Assets,
    StageId::Styles,
    StageId::Images,
    StageId::Scripts,
];

/// Output files that never trigger a reload: maps are not loaded by pages.
const NO_RELOAD_EXTENSIONS: &[&str] = &["map"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Stage(StageId),
    Output,
}

/// What one watcher event asks for.
#[derive(Debug, Default, PartialEq, Eq)]
struct Dispatch {
    stages: Vec<StageId>,
    /// First output path that changed.
    reload: Option<PathBuf>,
}

/// Path prefixes and the target each one maps to.
struct Routes {
    entries: Vec<(PathBuf, Target)>,
    /// Stylesheets here are streamed by `compile-styles`, not reloaded.
    streamed_css: PathBuf,
    /// Trees watched recursively.
    trees: [PathBuf; 2],
}

impl Routes {
    fn new(layout: &Layout) -> Self {
        let mut entries: Vec<_> = WATCHED_STAGES
            .iter()
            .filter_map(|&stage| Some((layout.watched_source(stage)?, Target::Stage(stage))))
            .collect();
        entries.push((layout.output_dir(), Target::Output));
        Self {
            entries,
            streamed_css: layout.styles_out(),
            trees: [layout.source_dir(), layout.output_dir()],
        }
    }

    /// Watched trees among the paths an event created.
    fn created_trees<'e>(&self, event: &'e Event) -> impl Iterator<Item = &'e PathBuf> {
        let created = matches!(event.kind, EventKind::Create(_));
        event
            .paths
            .iter()
            .filter(move |path| created && self.trees.contains(path))
    }

    fn reloads(&self, path: &Path) -> bool {
        if has_extension(path, NO_RELOAD_EXTENSIONS) || path.is_dir() {
            return false;
        }
        !(has_extension(path, &["css"]) && path.starts_with(&self.streamed_css))
    }

    fn target(&self, path: &Path) -> Option<Target> {
        self.entries
            .iter()
            .find(|(root, _)| path.starts_with(root))
            .map(|(_, target)| *target)
    }

    fn classify(&self, event: &Event) -> Dispatch {
        let mut dispatch = Dispatch::default();
        if !is_content_change(&event.kind) {
            return dispatch;
        }

        for path in event.paths.iter().filter(|p| !is_temp_file(p)) {
            match self.target(path) {
                Some(Target::Stage(stage)) if !dispatch.stages.contains(&stage) => {
                    dispatch.stages.push(stage);
                }
                Some(Target::Output) if dispatch.reload.is_none() && self.reloads(path) => {
                    dispatch.reload = Some(path.clone());
                }
                _ => {}
            }
        }
        dispatch.stages.sort();
        dispatch
    }
}

/// Create, remove and content modifications; metadata-only changes and
/// access notifications are ignored.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// The notify watcher, shared with the dispatch thread so trees created
/// later can be added. `None` once stopped.
type SharedWatcher = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Running watcher with its dispatch thread.
pub struct SourceWatcher {
    watcher: SharedWatcher,
    thread: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    pub fn start(config: Arc<ProjectConfig>, channel: ReloadChannel) -> Result<Self> {
        let layout = config.layout();
        let routes = Routes::new(&layout);

        let (tx, rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(layout.root(), RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", layout.root().display()))?;
        for tree in routes.trees.iter().filter(|tree| tree.is_dir()) {
            watcher
                .watch(tree, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch {}", tree.display()))?;
            debug!("watch"; "watching {}", layout.relative(tree).display());
        }

        let watcher: SharedWatcher = Arc::new(Mutex::new(Some(watcher)));
        let shared = Arc::clone(&watcher);
        let thread = std::thread::Builder::new()
            .name("kiln-watch".into())
            .spawn(move || dispatch_loop(&rx, &routes, &shared, &config, &channel))
            .context("failed to spawn watch thread")?;

        Ok(Self {
            watcher,
            thread: Some(thread),
        })
    }

    /// Stop watching and wait for a running stage to finish.
    pub fn stop(&mut self) {
        // Dropping the watcher drops its sender, which ends the dispatch loop
        drop(self.watcher.lock().take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(
    rx: &Receiver<notify::Result<Event>>,
    routes: &Routes,
    watcher: &SharedWatcher,
    config: &ProjectConfig,
    channel: &ReloadChannel,
) {
    let layout = config.layout();
    let reporter = Reporter::watching(channel.clone());

    for result in rx {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log!("watch"; "notify error: {}", e);
                continue;
            }
        };

        for tree in routes.created_trees(&event) {
            if let Some(watcher) = watcher.lock().as_mut() {
                match watcher.watch(tree, RecursiveMode::Recursive) {
                    Ok(()) => debug!("watch"; "watching {}", layout.relative(tree).display()),
                    Err(e) => log!("watch"; "failed to watch {}: {}", layout.relative(tree).display(), e),
                }
            }
        }

        let dispatch = routes.classify(&event);
        for stage in dispatch.stages {
            debug!("watch"; "{:?} {}, running {}", event.kind, describe_paths(&layout, &event), stage);
            let ctx = BuildContext::new(config).with_publisher(channel);
            reporter.report(stage, &run_stage(stage, &ctx));
        }

        if let Some(path) = dispatch.reload {
            let rel = layout.relative(&path).display().to_string();
            debug!("watch"; "output changed: {}", rel);
            channel.reload(rel);
        }
    }
    debug!("watch"; "stopped");
}

fn describe_paths(layout: &Layout, event: &Event) -> String {
    event
        .paths
        .iter()
        .map(|p| layout.relative(p).display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::messages::WsMsg;
    use crate::stage::testing::Fixture;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::time::{Duration, Instant};

    fn routes() -> Routes {
        Routes::new(&Layout::new("/site"))
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn modified(paths: &[&str]) -> Event {
        event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), paths)
    }

    #[test]
    fn test_source_changes_map_to_stages() {
        let dispatch = routes().classify(&modified(&[
            "/site/src/scss/_vars.scss",
            "/site/src/html/index.html",
            "/site/src/scss/main.scss",
        ]));
        assert_eq!(dispatch.stages, vec![StageId::Styles, StageId::Markup]);
        assert_eq!(dispatch.reload, None);

        let created = event(EventKind::Create(CreateKind::File), &["/site/src/js/util.js"]);
        assert_eq!(routes().classify(&created).stages, vec![StageId::Scripts]);

        let removed = event(EventKind::Remove(RemoveKind::File), &["/site/src/images/a.png"]);
        assert_eq!(routes().classify(&removed).stages, vec![StageId::Images]);
    }

    #[test]
    fn test_output_changes_reload() {
        let dispatch = routes().classify(&modified(&["/site/dist/index.html"]));
        assert!(dispatch.stages.is_empty());
        assert_eq!(dispatch.reload, Some(PathBuf::from("/site/dist/index.html")));

        for ignored in ["/site/dist/css/main.min.css", "/site/dist/js/scripts.min.js.map"] {
            assert_eq!(routes().classify(&modified(&[ignored])), Dispatch::default());
        }
    }

    #[test]
    fn test_copied_stylesheets_reload() {
        for path in ["/site/dist/assets/vendor/bootstrap.css", "/site/dist/print.css"] {
            let dispatch = routes().classify(&modified(&[path]));
            assert_eq!(dispatch.reload, Some(PathBuf::from(path)));
        }
        let streamed = modified(&["/site/dist/css/pages/home.min.css"]);
        assert_eq!(routes().classify(&streamed).reload, None);
    }

    #[test]
    fn test_created_trees() {
        let created = event(
            EventKind::Create(CreateKind::Folder),
            &["/site/dist", "/site/src", "/site/other"],
        );
        let trees: Vec<_> = routes().created_trees(&created).cloned().collect();
        assert_eq!(trees, [PathBuf::from("/site/dist"), PathBuf::from("/site/src")]);

        let removed = event(EventKind::Remove(RemoveKind::Folder), &["/site/dist"]);
        assert_eq!(routes().created_trees(&removed).count(), 0);
    }

    #[test]
    fn test_ignored_events() {
        let metadata = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/site/src/html/index.html"],
        );
        let access = event(EventKind::Access(AccessKind::Read), &["/site/src/html/index.html"]);
        let temp = modified(&["/site/src/scss/.main.scss.swp", "/site/src/scss/main.scss~"]);
        let outside = modified(&["/site/kiln.toml", "/elsewhere/x.html"]);

        for e in [metadata, access, temp, outside] {
            assert_eq!(routes().classify(&e), Dispatch::default(), "{:?}", e.kind);
        }
    }

    #[test]
    fn test_watcher_rebuilds_styles_and_streams_css() {
        let fixture = Fixture::new();
        fixture.write("src/scss/main.scss", ".a { color: red; }\n");
        std::fs::create_dir_all(fixture.root().join("dist")).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let config = Arc::new(fixture.config.clone());
        let mut watcher = SourceWatcher::start(config, ReloadChannel::new(tx)).unwrap();

        fixture.write("src/scss/main.scss", ".b { margin: 3px; }\n");

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut streamed = None;
        while streamed.is_none() && Instant::now() < deadline {
            match rx.try_recv() {
                Ok(WsMsg::Css { paths }) => streamed = Some(paths),
                Ok(_) => {}
                Err(_) => std::thread::sleep(Duration::from_millis(20)),
            }
        }
        watcher.stop();

        assert_eq!(streamed, Some(vec!["/css/main.min.css".to_string()]));
        assert!(fixture.read("dist/css/main.min.css").contains(".b{margin:3px}"));
    }

    /// Poll `rx` for a `Css` message, calling `touch` between polls so a
    /// write racing the watch registration is repeated.
    fn wait_for_css(
        rx: &mut tokio::sync::mpsc::Receiver<WsMsg>,
        mut touch: impl FnMut(),
    ) -> Option<Vec<String>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut last_touch = Instant::now();
        touch();
        while Instant::now() < deadline {
            match rx.try_recv() {
                Ok(WsMsg::Css { paths }) => return Some(paths),
                Ok(_) => {}
                Err(_) => std::thread::sleep(Duration::from_millis(20)),
            }
            if last_touch.elapsed() > Duration::from_millis(500) {
                touch();
                last_touch = Instant::now();
            }
        }
        None
    }

    #[test]
    fn test_subtree_created_after_start_is_watched() {
        let fixture = Fixture::new();
        fixture.write("src/html/index.html", "<p>hi</p>\n");

        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let config = Arc::new(fixture.config.clone());
        let mut watcher = SourceWatcher::start(config, ReloadChannel::new(tx)).unwrap();

        let streamed = wait_for_css(&mut rx, || {
            fixture.write("src/scss/main.scss", ".late { color: blue; }\n");
        });
        watcher.stop();

        assert_eq!(streamed, Some(vec!["/css/main.min.css".to_string()]));
    }

    #[test]
    fn test_source_tree_created_after_start_is_watched() {
        let fixture = Fixture::new();

        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let config = Arc::new(fixture.config.clone());
        let mut watcher = SourceWatcher::start(config, ReloadChannel::new(tx)).unwrap();

        let streamed = wait_for_css(&mut rx, || {
            fixture.write("src/scss/site.scss", "body { margin: 0; }\n");
        });
        watcher.stop();

        assert_eq!(streamed, Some(vec!["/css/site.min.css".to_string()]));
    }
}
