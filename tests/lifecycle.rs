mod common;

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use common::Fixture;
use eddy::{
    Callback, Component, Controller, Props, Render, RenderCx, VNode, Value, ViewType,
};
use futures::{
    channel::oneshot,
    future::{FutureExt, LocalBoxFuture},
};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static GATES: RefCell<Vec<oneshot::Receiver<()>>> = const { RefCell::new(Vec::new()) };
}

fn log(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

fn events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// Renders its `label` prop followed by its `count` state.
struct Counter {
    renders: Rc<Cell<usize>>,
}

impl Component for Counter {
    fn create(_props: &Props) -> Self {
        Self {
            renders: Rc::new(Cell::new(0)),
        }
    }

    fn render(&self, cx: &RenderCx<'_>) -> Render {
        self.renders.set(self.renders.get() + 1);
        let label = cx.prop("label").and_then(Value::as_str).unwrap_or("count");
        let count = cx.state().get("count").and_then(Value::as_int).unwrap_or(0);
        VNode::text(format!("{label}:{count}")).into()
    }

    fn load(&mut self, controller: &Controller) -> Option<LocalBoxFuture<'static, ()>> {
        // state written before mount is merged without scheduling anything
        controller.update([("count", 1)]);
        controller.update([("count", 2)]);
        None
    }

    fn mounted(&mut self, controller: &Controller) {
        log(format!("mounted {}", controller.state().get("count").unwrap_or(&Value::Null)));
    }

    fn destroyed(&mut self, _controller: &Controller) {
        log("destroyed");
    }
}

fn renders(controller: &Controller) -> usize {
    controller
        .with_component(|counter: &Counter| counter.renders.get())
        .unwrap_or_default()
}

fn counters(count: usize) -> VNode {
    VNode::view(ViewType::VIEW)
        .children((0..count).map(|index| {
            VNode::controller::<Counter>()
                .prop("label", format!("c{index}"))
                .reference(format!("c{index}"))
                .key(index)
        }))
        .build()
}

#[test]
fn mounted_fires_once_despite_early_updates() {
    let mut fixture = Fixture::new();
    events();
    fixture.app.render(counters(1)).unwrap();
    let counter = fixture.controller("c0");

    counter.update([("count", 3)]);
    counter.update([("count", 4)]);
    fixture.app.run_until_stalled().unwrap();

    assert_eq!(events(), ["mounted 2"]);
    assert_eq!(fixture.host.borrow().labels(fixture.top()), ["c0:4"]);
}

#[test]
fn updates_are_batched_into_one_flush() {
    let mut fixture = Fixture::new();
    fixture.app.render(counters(4)).unwrap();
    let controllers: Vec<_> = (0..4).map(|i| fixture.controller(&format!("c{i}"))).collect();
    let before: Vec<_> = controllers.iter().map(renders).collect();

    for (offset, controller) in controllers.iter().enumerate() {
        controller.update([("count", i64::try_from(offset).unwrap() + 10)]);
        controller.update([("count", i64::try_from(offset).unwrap() + 20)]);
    }
    assert_eq!(fixture.app.scheduler().pending_len(), 4);
    let report = fixture.app.run_until_stalled().unwrap();

    assert_eq!(fixture.app.scheduler().flush_count(), 1);
    assert_eq!(report.rendered, 4);
    for (controller, before) in controllers.iter().zip(before) {
        assert_eq!(renders(controller), before + 1);
    }
    assert_eq!(
        fixture.host.borrow().labels(fixture.top()),
        ["c0:20", "c1:21", "c2:22", "c3:23"]
    );
}

#[test]
fn parent_render_absorbs_child_update() {
    let mut fixture = Fixture::new();
    fixture.app.render(counters(2)).unwrap();
    let child = fixture.controller("c1");
    let before = renders(&child);

    child.update([("count", 9)]);
    let tree = VNode::view(ViewType::VIEW)
        .children((0..2).map(|index| {
            VNode::controller::<Counter>()
                .prop("label", format!("n{index}"))
                .reference(format!("c{index}"))
                .key(index)
        }))
        .build();
    fixture.app.render(tree).unwrap();
    assert!(!fixture.app.scheduler().is_pending(&child));

    let report = fixture.app.run_until_stalled().unwrap();
    assert_eq!(report.rendered, 0);
    assert_eq!(renders(&child), before + 1);
    assert_eq!(fixture.host.borrow().labels(fixture.top()), ["n0:2", "n1:9"]);
}

#[test]
fn destroy_is_idempotent() {
    let fixture = Fixture::new();
    events();
    fixture.app.render(counters(1)).unwrap();
    let counter = fixture.controller("c0");
    events();

    counter.destroy();
    counter.destroy();

    assert_eq!(events(), ["destroyed"]);
    assert!(counter.is_destroyed());
    assert!(fixture.app.root().find_ref("c0").is_none());
}

#[test]
fn unmount_releases_everything() {
    let mut fixture = Fixture::new();
    fixture.app.render(counters(3)).unwrap();
    let counter = fixture.controller("c2");
    counter.update([("count", 1)]);

    fixture.app.unmount();

    let host = fixture.host.borrow();
    assert!(host.is_empty());
    assert!(host.violations().is_empty());
    assert!(counter.is_destroyed());
    assert_eq!(fixture.app.scheduler().flush_count(), 1);
    assert_eq!(fixture.app.scheduler().pending_len(), 0);
}

#[test]
fn update_callbacks_follow_render() {
    let mut fixture = Fixture::new();
    fixture.app.render(counters(1)).unwrap();
    let counter = fixture.controller("c0");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    let probe = counter.clone();
    counter.update_with([("count", 5)], move || {
        sink.borrow_mut().push(probe.rendered().map(|node| node.to_string()));
    });
    assert!(seen.borrow().is_empty());
    fixture.app.run_until_stalled().unwrap();

    assert_eq!(
        seen.borrow().as_slice(),
        [Some("<label value=\"c0:5\"/>\n".to_owned())]
    );

    let sink = seen.clone();
    counter.update_with([("count", 5)], move || sink.borrow_mut().push(None));
    assert_eq!(seen.borrow().len(), 2);
}

/// Mirrors its `title` prop into a field and counts hook calls.
struct Linked {
    title: Value,
    updates: usize,
}

impl Component for Linked {
    fn create(_props: &Props) -> Self {
        Self {
            title: Value::Null,
            updates: 0,
        }
    }

    fn render(&self, _cx: &RenderCx<'_>) -> Render {
        VNode::view(ViewType::VIEW).prop("title", self.title.clone()).into()
    }

    fn updated(&mut self, _controller: &Controller, _old: &VNode, _new: &VNode) {
        self.updates += 1;
    }

    fn linked_props(&self) -> &'static [&'static str] {
        &["title"]
    }

    fn link_prop(&mut self, name: &str, value: &Value) {
        if name == "title" {
            self.title = value.clone();
        }
    }
}

#[test]
fn linked_props_follow_parent() {
    let fixture = Fixture::new();
    let tree = |title: Option<&str>| {
        let mut node = VNode::controller::<Linked>().reference("linked");
        if let Some(title) = title {
            node = node.prop("title", title.to_owned());
        }
        node
    };

    fixture.app.render(tree(Some("first"))).unwrap();
    assert_eq!(
        fixture.host.borrow().prop(fixture.top(), "title"),
        Some(&Value::from("first"))
    );

    fixture.app.render(tree(Some("second"))).unwrap();
    fixture.app.render(tree(None)).unwrap();

    let linked = fixture.controller("linked");
    assert_eq!(
        linked.with_component(|linked: &Linked| (linked.title.clone(), linked.updates)),
        Some((Value::Null, 2))
    );
    assert_eq!(
        fixture.host.borrow().prop(fixture.top(), "title"),
        Some(&Value::Null)
    );
}

/// Shows `loading` until its gate opens.
struct Remote;

impl Component for Remote {
    fn create(_props: &Props) -> Self {
        Self
    }

    fn render(&self, cx: &RenderCx<'_>) -> Render {
        if cx.controller().is_loaded() {
            "ready".into()
        } else {
            "loading".into()
        }
    }

    fn load(&mut self, _controller: &Controller) -> Option<LocalBoxFuture<'static, ()>> {
        let gate = GATES.with(|gates| gates.borrow_mut().pop())?;
        Some(gate.map(|_| ()).boxed_local())
    }

    fn destroyed(&mut self, _controller: &Controller) {
        log("remote destroyed");
    }
}

fn gate() -> oneshot::Sender<()> {
    let (open, gate) = oneshot::channel();
    GATES.with(|gates| gates.borrow_mut().push(gate));
    open
}

#[test]
fn load_completion_triggers_render() {
    let mut fixture = Fixture::new();
    let open = gate();
    fixture.app.render(VNode::controller::<Remote>()).unwrap();
    assert_eq!(fixture.host.borrow().text(fixture.container()), "loading");

    fixture.app.run_until_stalled().unwrap();
    assert_eq!(fixture.host.borrow().text(fixture.container()), "loading");

    open.send(()).unwrap();
    let report = fixture.app.run_until_stalled().unwrap();
    assert_eq!(report.rendered, 1);
    assert_eq!(fixture.host.borrow().text(fixture.container()), "ready");
}

#[test]
fn load_after_destroy_is_dropped() {
    let mut fixture = Fixture::new();
    events();
    let open = gate();
    fixture
        .app
        .render(VNode::controller::<Remote>().reference("remote"))
        .unwrap();
    let remote = fixture.controller("remote");

    fixture.app.render(VNode::empty()).unwrap();
    open.send(()).unwrap();
    let report = fixture.app.run_until_stalled().unwrap();

    assert_eq!(events(), ["remote destroyed"]);
    assert!(!remote.is_loaded());
    assert_eq!(report.rendered, 0);
    assert_eq!(report.stats.renders, 0);
}

/// Forwards clicks from its button to a shared counter.
struct Clicker {
    clicks: Rc<Cell<u32>>,
    on_click: Callback,
}

impl Component for Clicker {
    fn create(_props: &Props) -> Self {
        let clicks = Rc::new(Cell::new(0));
        let on_click = {
            let clicks = clicks.clone();
            Callback::new(move |_| clicks.set(clicks.get() + 1))
        };
        Self { clicks, on_click }
    }

    fn render(&self, _cx: &RenderCx<'_>) -> Render {
        VNode::view(ViewType::new("button"))
            .prop("on_click", self.on_click.clone())
            .reference("button")
            .into()
    }
}

#[test]
fn refs_resolve_to_live_views() {
    let fixture = Fixture::new();
    fixture
        .app
        .render(VNode::controller::<Clicker>().reference("clicker"))
        .unwrap();
    let clicker = fixture.controller("clicker");

    let button = clicker
        .find_ref("button")
        .and_then(|target| target.as_view())
        .unwrap();
    assert_eq!(button, fixture.top());

    let handler = fixture
        .host
        .borrow()
        .prop(button, "on_click")
        .and_then(Value::as_callback)
        .cloned()
        .unwrap();
    handler.call(&Value::Null);
    handler.call(&Value::Null);
    assert_eq!(
        clicker.with_component(|clicker: &Clicker| clicker.clicks.get()),
        Some(2)
    );

    clicker.refresh();
    assert_eq!(clicker.ref_count(), 1);
}
