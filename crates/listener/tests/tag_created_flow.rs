//! End-to-end behaviour of the tag-created path: settings check, filter chain,
//! and notifier submission.

use std::sync::{Arc, Mutex};
use std::thread;

use listener::{EventListener, ListenerSet, RefsChangedListener, TagCreatedListener};
use webhook::eligibility::{FilterVerdict, FnFilter, IgnoreCommittersFilter};
use webhook::{
    BackgroundNotifier, CiEndpoint, DeliveryError, DispatchOutcome, EligibilityFilterChain,
    EventDispatcher, InMemorySettingsService, NotificationRequest, NotificationTransport,
    Notifier, PlatformUser, ProjectKey, Repository, RepositorySlug, Settings, SettingsService,
    Tag, TagCreatedEvent, UserName,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingNotifier {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_background(&self, request: NotificationRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

fn repository() -> Repository {
    Repository::new(
        ProjectKey::new("PRJ").unwrap(),
        RepositorySlug::new("service").unwrap(),
    )
}

fn tag_created(user: &str) -> TagCreatedEvent {
    TagCreatedEvent {
        repository: repository(),
        user: Some(PlatformUser {
            name: user.to_string(),
        }),
        tag: Tag {
            id: "42".to_string(),
            display_id: "v1.0".to_string(),
            latest_commit: "abc123".to_string(),
        },
    }
}

fn enabled() -> Arc<dyn SettingsService> {
    let mut service = InMemorySettingsService::new();
    service.insert(Settings::new(repository(), CiEndpoint::new("https://ci.example.com")));
    Arc::new(service)
}

fn tag_listener(
    settings: Arc<dyn SettingsService>,
    chain: EligibilityFilterChain,
) -> (TagCreatedListener, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = EventDispatcher::new(settings, Arc::new(chain), notifier.clone());
    (TagCreatedListener::new(dispatcher), notifier)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn enabled_repository_with_eligible_tag_notifies_once() {
    let chain = EligibilityFilterChain::new()
        .with_filter(FnFilter::new("always", |_| FilterVerdict::Eligible));
    let (listener, notifier) = tag_listener(enabled(), chain);

    let outcome = listener.on_tag_created(tag_created("alice"));

    assert_eq!(outcome, DispatchOutcome::Dispatched { notifications: 1 });
    let requests = notifier.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].repository, repository());
    assert_eq!(requests[0].git_ref.as_str(), "pr/42/from");
    assert_eq!(requests[0].commit.as_str(), "abc123");
    assert_eq!(requests[0].target_branch.as_str(), "v1.0");
}

#[test]
fn repository_without_settings_never_notifies() {
    let (listener, notifier) = tag_listener(
        Arc::new(InMemorySettingsService::new()),
        EligibilityFilterChain::new(),
    );

    assert_eq!(listener.on_tag_created(tag_created("alice")), DispatchOutcome::Disabled);
    assert!(notifier.requests().is_empty());
}

#[test]
fn disabled_repository_never_notifies_even_with_malformed_tag() {
    let (listener, notifier) = tag_listener(
        Arc::new(InMemorySettingsService::new()),
        EligibilityFilterChain::new(),
    );
    let mut event = tag_created("alice");
    event.tag.latest_commit.clear();

    assert_eq!(listener.on_tag_created(event), DispatchOutcome::Disabled);
    assert!(notifier.requests().is_empty());
}

#[test]
fn vetoed_event_never_notifies() {
    let mut service = InMemorySettingsService::new();
    let mut configured = Settings::new(repository(), CiEndpoint::new("https://ci.example.com"));
    configured.ignore_committers = vec![UserName::new("release-bot").unwrap()];
    service.insert(configured);
    let service: Arc<dyn SettingsService> = Arc::new(service);

    let chain = EligibilityFilterChain::new()
        .with_filter(IgnoreCommittersFilter::new(Arc::clone(&service)));
    let (listener, notifier) = tag_listener(service, chain);

    assert_eq!(
        listener.on_tag_created(tag_created("release-bot")),
        DispatchOutcome::Ineligible
    );
    assert!(notifier.requests().is_empty());
}

#[test]
fn malformed_tag_is_contained_at_the_listener() {
    let (listener, notifier) = tag_listener(enabled(), EligibilityFilterChain::new());
    let mut event = tag_created("alice");
    event.tag.display_id.clear();

    assert_eq!(listener.on_tag_created(event), DispatchOutcome::Malformed);
    assert!(notifier.requests().is_empty());
}

#[test]
fn concurrent_tags_on_one_repository_both_notify() {
    let (listener, notifier) = tag_listener(enabled(), EligibilityFilterChain::new());
    let listener = Arc::new(listener);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let listener = Arc::clone(&listener);
            thread::spawn(move || listener.on_tag_created(tag_created("alice")))
        })
        .collect();
    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            DispatchOutcome::Dispatched { notifications: 1 }
        );
    }

    let requests = notifier.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.git_ref.as_str() == "pr/42/from"));
    assert_ne!(requests[0].id, requests[1].id);
}

#[test]
fn listener_set_routes_by_event_kind() {
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = EventDispatcher::new(
        enabled(),
        Arc::new(EligibilityFilterChain::new()),
        notifier.clone(),
    );
    let listeners = ListenerSet::new()
        .with_listener(TagCreatedListener::new(dispatcher.clone()))
        .with_listener(RefsChangedListener::new(dispatcher));

    let tag_json = r#"{
        "type": "tag_created",
        "repository": { "project_key": "PRJ", "slug": "service" },
        "user": { "name": "alice" },
        "tag": { "id": "42", "display_id": "v1.0", "latest_commit": "abc123" }
    }"#;
    let push_json = r#"{
        "type": "refs_changed",
        "repository": { "project_key": "PRJ", "slug": "service" },
        "user": { "name": "alice" },
        "changes": [
            { "ref_id": "refs/heads/main", "from_hash": "111", "to_hash": "222", "type": "update" }
        ]
    }"#;

    assert_eq!(
        listeners.handle_json(tag_json),
        DispatchOutcome::Dispatched { notifications: 1 }
    );
    assert_eq!(
        listeners.handle_json(push_json),
        DispatchOutcome::Dispatched { notifications: 1 }
    );
    assert_eq!(listeners.handle_json("{ not json"), DispatchOutcome::Malformed);

    let refs: Vec<_> = notifier
        .requests()
        .iter()
        .map(|r| r.git_ref.to_string())
        .collect();
    assert_eq!(refs, vec!["pr/42/from", "refs/heads/main"]);
}

#[test]
fn listener_ignores_other_event_kinds() {
    let (listener, notifier) = tag_listener(enabled(), EligibilityFilterChain::new());
    let push: webhook::PlatformEvent = serde_json::from_str(
        r#"{
            "type": "refs_changed",
            "repository": { "project_key": "PRJ", "slug": "service" },
            "user": { "name": "alice" },
            "changes": []
        }"#,
    )
    .unwrap();

    assert_eq!(listener.on_event(Arc::new(push)), DispatchOutcome::NothingToNotify);
    assert!(notifier.requests().is_empty());
}

// ---------------------------------------------------------------------------
// With the background notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CountingTransport {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl NotificationTransport for CountingTransport {
    async fn deliver(
        &self,
        _settings: &Settings,
        endpoint: &CiEndpoint,
        request: &NotificationRequest,
    ) -> Result<String, DeliveryError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", endpoint.base_url, request.git_ref));
        Err(DeliveryError::Rejected {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delivery_failure_never_reaches_the_event_path() {
    let settings = enabled();
    let transport = Arc::new(CountingTransport::default());
    let notifier = Arc::new(BackgroundNotifier::new(
        Arc::clone(&settings),
        transport.clone(),
        tokio::runtime::Handle::current(),
    ));
    let dispatcher = EventDispatcher::new(
        settings,
        Arc::new(EligibilityFilterChain::new()),
        notifier.clone(),
    );
    let listener = TagCreatedListener::new(dispatcher);

    let outcome = thread::spawn(move || listener.on_tag_created(tag_created("alice")))
        .join()
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Dispatched { notifications: 1 });

    notifier.shutdown().await;
    assert_eq!(
        transport.calls.lock().unwrap().clone(),
        vec!["https://ci.example.com pr/42/from".to_string()]
    );
}
