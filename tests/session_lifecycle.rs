use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use remote_edit::remote::{RemoteTarget, Settings, SettingsLayer, Transfer, TransferOutcome, classify};
use remote_edit::session::{
    Disposition, EditorEvent, OpenRequest, SessionController, SessionError, ViewId,
};
use serde_json::json;
use tempfile::TempDir;

/// Transfer stub backed by a local directory standing in for remote hosts.
///
/// `user@host:/path` maps to `<root>/host/path`. Missing remote files produce
/// the same stderr scp prints, run through the real classifier.
struct FakeRemote {
    root: PathBuf,
    calls: RefCell<Vec<Call>>,
    fail_pushes: Cell<bool>,
}

#[derive(Debug, Clone)]
struct Call {
    source: String,
    destination: String,
    create_if_missing: bool,
}

impl FakeRemote {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: RefCell::new(Vec::new()),
            fail_pushes: Cell::new(false),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match location.split_once(':') {
            Some((host, path)) if location.contains('@') => {
                let host = host.rsplit('@').next().unwrap();
                self.root.join(host).join(path.trim_start_matches('/'))
            }
            _ => PathBuf::from(location),
        }
    }

    fn put(&self, host: &str, path: &str, content: &str) {
        let file = self.root.join(host).join(path.trim_start_matches('/'));
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }

    fn read(&self, host: &str, path: &str) -> Option<String> {
        fs::read_to_string(self.root.join(host).join(path.trim_start_matches('/'))).ok()
    }

    fn fetches(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.source.contains('@'))
            .count()
    }

    fn pushes(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.destination.contains('@'))
            .cloned()
            .collect()
    }
}

impl Transfer for FakeRemote {
    fn transfer(&self, source: &str, destination: &str, create_if_missing: bool) -> TransferOutcome {
        self.calls.borrow_mut().push(Call {
            source: source.to_string(),
            destination: destination.to_string(),
            create_if_missing,
        });

        if destination.contains('@') && self.fail_pushes.get() {
            return classify(Some(1), "scp: /etc/app.conf: Permission denied\n", source, destination, create_if_missing);
        }

        let from = self.resolve(source);
        let to = self.resolve(destination);
        if !from.is_file() {
            let path = source.split_once(':').map_or(source, |(_, p)| p);
            let stderr = format!("scp: {}: No such file or directory\n", path);
            return classify(Some(1), &stderr, source, destination, create_if_missing);
        }
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::copy(from, to).unwrap();
        TransferOutcome::Success
    }
}

struct Harness {
    _remote_dir: TempDir,
    temp_root: TempDir,
    controller: SessionController<FakeRemote>,
}

impl Harness {
    fn new(settings: serde_json::Value) -> Self {
        let remote_dir = TempDir::new().unwrap();
        let temp_root = TempDir::new().unwrap();
        let settings = Settings::from_layers(&[SettingsLayer::new("test", settings)]);
        let controller = SessionController::new(settings, FakeRemote::new(remote_dir.path()))
            .with_temp_root(temp_root.path());
        Self {
            _remote_dir: remote_dir,
            temp_root,
            controller,
        }
    }

    fn prod(create_if_missing: bool) -> Self {
        Self::new(json!({
            "create_if_missing": create_if_missing,
            "ssh_configs": {
                "prod": { "address": "10.0.0.5", "username": "dev" },
                "prod-ip": { "address": "10.0.0.5", "username": "dev" },
            }
        }))
    }

    fn remote(&self) -> &FakeRemote {
        self.controller.transfer()
    }

    fn temp_entries(&self) -> usize {
        fs::read_dir(self.temp_root.path()).unwrap().count()
    }

    fn open(&mut self, alias: &str, path: &str) -> Result<Disposition, SessionError> {
        self.controller
            .dispatch(EditorEvent::Open(OpenRequest::new(alias, path)))
    }

    fn open_view(&mut self, alias: &str, path: &str) -> (ViewId, PathBuf) {
        match self.open(alias, path).unwrap() {
            Disposition::Opened {
                view, local_path, ..
            } => (view, local_path),
            other => panic!("expected Opened, got {other:?}"),
        }
    }
}

fn app_conf() -> RemoteTarget {
    RemoteTarget::new("10.0.0.5", Some("dev".into()), "/etc/app.conf")
}

#[test]
fn open_save_close_round_trip_preserves_content() {
    let mut h = Harness::prod(false);
    let content = "listen = 8080\n# comment with ünïcode\n\n";
    h.remote().put("10.0.0.5", "/etc/app.conf", content);

    let (view, local_path) = h.open_view("prod", "/etc/app.conf");
    assert_eq!(fs::read_to_string(&local_path).unwrap(), content);

    // Overwrite the remote so the push is observable.
    h.remote().put("10.0.0.5", "/etc/app.conf", "stale");
    assert_eq!(
        h.controller.dispatch(EditorEvent::Saved(view)).unwrap(),
        Disposition::Pushed(view)
    );
    assert_eq!(h.remote().read("10.0.0.5", "/etc/app.conf").unwrap(), content);

    assert_eq!(
        h.controller.dispatch(EditorEvent::Closed(view)).unwrap(),
        Disposition::Released(view)
    );
    assert_eq!(h.remote().fetches(), 1);
    assert_eq!(h.remote().pushes().len(), 1);
}

#[test]
fn edits_are_pushed_on_every_save() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "v1\n");

    let (view, local_path) = h.open_view("prod", "/etc/app.conf");
    for version in ["v2\n", "v3\n"] {
        fs::write(&local_path, version).unwrap();
        h.controller.dispatch(EditorEvent::Saved(view)).unwrap();
        assert_eq!(h.remote().read("10.0.0.5", "/etc/app.conf").unwrap(), version);
    }
    assert_eq!(h.remote().pushes().len(), 2);
}

#[test]
fn second_open_reuses_session_without_fetching() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "x");

    let (first, path) = h.open_view("prod", "/etc/app.conf");
    match h.open("prod", "/etc/app.conf:7").unwrap() {
        Disposition::Opened {
            view,
            local_path,
            line,
            reused,
            ..
        } => {
            assert_eq!(view, first);
            assert_eq!(local_path, path);
            assert_eq!(line, Some(7));
            assert!(reused);
        }
        other => panic!("expected Opened, got {other:?}"),
    }

    assert_eq!(h.remote().fetches(), 1);
    assert_eq!(h.controller.registry().len(), 1);
}

#[test]
fn aliases_resolving_to_same_target_share_a_session() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "x");

    let (a, _) = h.open_view("prod", "/etc/app.conf");
    let (b, _) = h.open_view("prod-ip", "/etc/app.conf");
    assert_eq!(a, b);
    assert_eq!(h.remote().fetches(), 1);
}

#[test]
fn reopen_after_close_fetches_again() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "x");

    let (first, _) = h.open_view("prod", "/etc/app.conf");
    h.controller.dispatch(EditorEvent::Closed(first)).unwrap();
    let (second, _) = h.open_view("prod", "/etc/app.conf");

    assert_ne!(first, second);
    assert_eq!(h.remote().fetches(), 2);
}

#[test]
fn close_removes_local_copy_and_directory() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "x");

    let (view, local_path) = h.open_view("prod", "/etc/app.conf");
    let local_dir = local_path.parent().unwrap().to_path_buf();
    assert!(h.controller.registry().find(&app_conf()).is_some());

    h.controller.dispatch(EditorEvent::Closed(view)).unwrap();

    assert!(!local_path.exists());
    assert!(!local_dir.exists());
    assert!(h.controller.registry().find(&app_conf()).is_none());
    assert_eq!(h.temp_entries(), 0);
}

#[test]
fn unknown_alias_touches_nothing() {
    let mut h = Harness::prod(true);
    let err = h.open("staging", "/etc/app.conf").unwrap_err();
    assert!(matches!(err, SessionError::UnknownAlias(_)));
    assert!(h.remote().calls.borrow().is_empty());
    assert_eq!(h.temp_entries(), 0);
}

#[test]
fn missing_remote_without_create_aborts_cleanly() {
    let mut h = Harness::prod(false);

    let err = h.open("prod", "/etc/app.conf").unwrap_err();
    match err {
        SessionError::FatalTransfer(message) => {
            assert_eq!(message, "scp: /etc/app.conf: No such file or directory");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.controller.registry().is_empty());
    assert_eq!(h.temp_entries(), 0);
}

#[test]
fn missing_remote_with_create_opens_empty_copy() {
    let mut h = Harness::prod(true);

    match h.open("prod", "/etc/app.conf").unwrap() {
        Disposition::Opened {
            view,
            local_path,
            status,
            reused,
            ..
        } => {
            assert!(!reused);
            assert_eq!(fs::read_to_string(&local_path).unwrap(), "");
            assert_eq!(status.as_deref(), Some("Could not get file, so creating it"));
            assert!(h.controller.session(view).unwrap().create_if_missing);
        }
        other => panic!("expected Opened, got {other:?}"),
    }
    assert!(h.controller.registry().find(&app_conf()).is_some());
}

#[test]
fn first_save_of_created_file_creates_it_remotely() {
    let mut h = Harness::prod(true);

    let (view, local_path) = h.open_view("prod", "/srv/new.txt");
    fs::write(&local_path, "fresh\n").unwrap();
    h.controller.dispatch(EditorEvent::Saved(view)).unwrap();

    assert_eq!(h.remote().read("10.0.0.5", "/srv/new.txt").unwrap(), "fresh\n");
}

#[test]
fn explicit_policy_overrides_settings_and_sticks_to_session() {
    let mut h = Harness::prod(false);

    let request = OpenRequest::new("prod", "/srv/new.txt").with_create_if_missing(Some(true));
    let view = match h.controller.dispatch(EditorEvent::Open(request)).unwrap() {
        Disposition::Opened { view, .. } => view,
        other => panic!("expected Opened, got {other:?}"),
    };

    h.controller.dispatch(EditorEvent::Saved(view)).unwrap();
    h.controller.dispatch(EditorEvent::Saved(view)).unwrap();

    let calls = h.remote().calls.borrow().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.create_if_missing));
}

#[test]
fn alias_default_policy_applies() {
    let mut h = Harness::new(json!({
        "create_if_missing": false,
        "ssh_configs": { "lab": { "address": "lab.local", "username": "me", "create_if_missing": true } }
    }));

    match h.open("lab", "/tmp/scratch.txt").unwrap() {
        Disposition::Opened { status, .. } => assert!(status.is_some()),
        other => panic!("expected Opened, got {other:?}"),
    }
}

#[test]
fn failed_push_keeps_local_copy_for_retry() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "old\n");

    let (view, local_path) = h.open_view("prod", "/etc/app.conf");
    fs::write(&local_path, "new\n").unwrap();

    h.remote().fail_pushes.set(true);
    let err = h.controller.dispatch(EditorEvent::Saved(view)).unwrap_err();
    assert_eq!(err.to_string(), "scp: /etc/app.conf: Permission denied");
    assert_eq!(fs::read_to_string(&local_path).unwrap(), "new\n");
    assert!(h.controller.session(view).is_some());

    h.remote().fail_pushes.set(false);
    assert_eq!(
        h.controller.dispatch(EditorEvent::Saved(view)).unwrap(),
        Disposition::Pushed(view)
    );
    assert_eq!(h.remote().read("10.0.0.5", "/etc/app.conf").unwrap(), "new\n");
}

#[test]
fn line_suffix_only_when_numeric() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "a\nb\nc\n");
    h.remote().put("10.0.0.5", "/tmp/odd:abc", "odd");

    match h.open("prod", "/etc/app.conf:3").unwrap() {
        Disposition::Opened { line, local_path, .. } => {
            assert_eq!(line, Some(3));
            assert_eq!(local_path.file_name().unwrap(), "app.conf");
        }
        other => panic!("expected Opened, got {other:?}"),
    }

    match h.open("prod", "/tmp/odd:abc").unwrap() {
        Disposition::Opened { line, local_path, .. } => {
            assert_eq!(line, None);
            assert_eq!(fs::read_to_string(local_path).unwrap(), "odd");
        }
        other => panic!("expected Opened, got {other:?}"),
    }

    let calls = h.remote().calls.borrow();
    assert_eq!(calls[0].source, "dev@10.0.0.5:/etc/app.conf");
    assert_eq!(calls[1].source, "dev@10.0.0.5:/tmp/odd:abc");
}

#[test]
fn plain_path_has_no_line() {
    let mut h = Harness::prod(false);
    h.remote().put("10.0.0.5", "/etc/app.conf", "x");
    match h.open("prod", "/etc/app.conf").unwrap() {
        Disposition::Opened { line, .. } => assert_eq!(line, None),
        other => panic!("expected Opened, got {other:?}"),
    }
}
