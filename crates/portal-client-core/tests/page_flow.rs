use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::block_on;
use portal_client_core::testing::{FakePage, ManualScheduler, RecordingNavigator, StubTransport};
use portal_client_core::{
    ApiResponse, CallOptions, FieldKind, MemoryStore, PageContext, PageServices, PortalConfig,
    ToastKind,
};

struct Harness {
    page: PageContext,
    store: MemoryStore,
    dom: Rc<FakePage>,
    transport: Rc<StubTransport>,
    navigator: Rc<RecordingNavigator>,
    scheduler: Rc<ManualScheduler>,
}

fn harness_with(store: MemoryStore, dom: Rc<FakePage>) -> Harness {
    let transport = Rc::new(StubTransport::new());
    let navigator = Rc::new(RecordingNavigator::new(true));
    let scheduler = Rc::new(ManualScheduler::new());
    let page = PageContext::new(
        PortalConfig::default(),
        PageServices {
            store: Rc::new(store.clone()),
            transport: transport.clone(),
            navigator: navigator.clone(),
            scheduler: scheduler.clone(),
            page_view: dom.clone(),
            form_view: dom.clone(),
            toast_surface: dom.clone(),
        },
    );
    Harness {
        page,
        store,
        dom,
        transport,
        navigator,
        scheduler,
    }
}

fn dashboard_dom() -> Rc<FakePage> {
    let dom = Rc::new(FakePage::new());
    dom.add_element("userDisplay");
    dom.add_element("userInitial");
    dom.add_hidden_element("nav-jobs");
    dom.add_hidden_element("nav-users");
    dom.add_hidden_element("nav-admin-header");
    dom.add_field("postTitle", FieldKind::Text, "");
    dom.add_field("channel", FieldKind::Select, "facebook");
    dom.add_radio("schedule", "schedule-now", "now");
    dom.add_radio("schedule", "schedule-later", "later");
    dom
}

#[test]
fn admin_session_loads_profile_and_reveals_admin_navigation() {
    let harness = harness_with(MemoryStore::new(), dashboard_dom());
    harness.page.session().save("tok-admin", "nadia").expect("save");
    harness
        .transport
        .push_response(ApiResponse::new(200, r#"{"username":"nadia","role":"admin"}"#));

    let user = block_on(harness.page.auth().check_auth(None)).expect("admin user");
    assert_eq!(user.username, "nadia");
    assert_eq!(harness.dom.text("userInitial").as_deref(), Some("N"));
    assert!(harness.dom.is_visible("nav-admin-header"));
    assert_eq!(harness.page.auth().current_user(), Some(user));
    assert!(harness.navigator.navigations().is_empty());
}

#[test]
fn any_401_from_api_client_logs_the_user_out() {
    let harness = harness_with(MemoryStore::new(), dashboard_dom());
    harness.page.session().save("tok", "omar").expect("save");
    harness.transport.push_response(ApiResponse::new(401, ""));

    let response =
        block_on(harness.page.api().call("/posts", CallOptions::default())).expect("response");
    assert!(response.is_unauthorized());
    assert!(!harness.page.session().is_logged_in());
    assert_eq!(harness.page.session().username(), None);
    assert_eq!(harness.navigator.navigations(), vec!["index.html".to_string()]);
    assert!(harness.store.is_empty());
}

#[test]
fn draft_survives_navigation_until_cleared() {
    let store = MemoryStore::new();
    let fields = vec![
        "postTitle".to_string(),
        "channel".to_string(),
        "schedule".to_string(),
    ];

    let first = harness_with(store.clone(), dashboard_dom());
    let persist = first.page.form_persist("post", fields.clone());
    let bindings = persist.init();
    assert_eq!(bindings.fields.len(), 2);
    assert_eq!(bindings.radio_groups, vec!["schedule".to_string()]);

    first.dom.type_value("postTitle", "Weekend promo");
    persist.save();
    first.dom.choose_radio("schedule", "later");
    persist.save_radio("schedule");

    let second = harness_with(store.clone(), dashboard_dom());
    second.page.form_persist("post", fields.clone()).init();
    assert_eq!(second.dom.value("postTitle").as_deref(), Some("Weekend promo"));
    assert_eq!(second.dom.value("channel").as_deref(), Some("facebook"));
    assert_eq!(second.dom.checked("schedule").as_deref(), Some("later"));

    second.page.form_persist("post", fields.clone()).clear();
    let third = harness_with(store, dashboard_dom());
    third.page.form_persist("post", fields).init();
    assert_eq!(third.dom.value("postTitle").as_deref(), Some(""));
    assert_eq!(third.dom.checked("schedule"), None);
}

#[test]
fn polling_pauses_while_typing_and_toasts_expire() {
    let harness = harness_with(MemoryStore::new(), dashboard_dom());
    let polls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&polls);
    harness.page.refresh().start(
        "postList",
        move || counter.set(counter.get() + 1),
        Duration::from_secs(10),
    );

    harness.scheduler.advance(Duration::from_secs(10));
    assert_eq!(polls.get(), 1);

    harness.page.refresh().typing_started();
    harness.scheduler.advance(Duration::from_secs(30));
    assert_eq!(polls.get(), 1);

    harness.page.refresh().typing_ended();
    harness.scheduler.advance(Duration::from_secs(10));
    assert_eq!(polls.get(), 2);

    let toast = harness
        .page
        .toasts()
        .show_default("Post saved", ToastKind::parse("success"))
        .expect("toast");
    harness.scheduler.advance(Duration::from_millis(3_300));
    assert!(!harness.page.toasts().is_active(toast));
    assert_eq!(harness.dom.toast_shown(toast), None);
}
