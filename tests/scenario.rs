mod common;

use common::Fixture;
use eddy::{Component, Key, Props, Render, RenderCx, VNode, Value, ViewType};
use eddy_memory::Op;

/// Renders its `items` prop as a keyed list of labels.
struct List;

impl Component for List {
    fn create(_props: &Props) -> Self {
        Self
    }

    fn render(&self, cx: &RenderCx<'_>) -> Render {
        let items = match cx.prop("items") {
            Some(Value::List(items)) => items.as_slice(),
            _ => &[],
        };
        let rows = items.iter().filter_map(|item| {
            let Value::Map(item) = item else {
                return None;
            };
            let key = item.get("key").and_then(Value::as_int)?;
            let text = item.get("text").cloned().unwrap_or_default();
            Some(VNode::view(ViewType::LABEL).prop("value", text).key(key).build())
        });
        VNode::view(ViewType::VIEW)
            .child(VNode::collection(rows.map(Some).collect::<Vec<_>>()))
            .into()
    }
}

fn items(entries: &[(i64, &'static str)]) -> Value {
    Value::List(
        entries
            .iter()
            .map(|&(key, text)| Value::Map(Props::new().with("key", key).with("text", text)))
            .collect(),
    )
}

fn list(entries: &[(i64, &'static str)]) -> VNode {
    VNode::controller::<List>()
        .prop("items", items(entries))
        .reference("list")
        .build()
}

#[test]
fn keyed_list_rerender() {
    let fixture = Fixture::new();
    fixture.app.render(list(&[(1, "a"), (2, "b")])).unwrap();
    let top = fixture.top();
    let (first, second) = {
        let host = fixture.host.borrow();
        (host.children(top)[0], host.children(top)[1])
    };
    fixture.host.borrow_mut().take_ops();

    fixture.app.render(list(&[(2, "b"), (3, "c")])).unwrap();

    let host = fixture.host.borrow();
    let children = host.children(top);
    assert_eq!(children.len(), 2);
    // key 2 kept its view and now comes first
    assert_eq!(children[0], second);
    assert!(!host.contains(first));
    assert_eq!(host.labels(top), ["b", "c"]);

    let ops = host.ops();
    let created: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Create { view, .. } => Some(*view),
            _ => None,
        })
        .collect();
    assert_eq!(created, [children[1]]);
    assert!(ops.contains(&Op::Destroy { view: first }));
    assert!(
        !ops.iter()
            .any(|op| matches!(op, Op::Set { view, .. } if *view == second)),
        "reused item was rewritten: {ops:?}"
    );
    assert!(host.violations().is_empty());

    let list = fixture.controller("list");
    let keys = list
        .with_live(|live| {
            let view = live.as_view()?;
            let collection = view.children().iter().flatten().next()?.as_collection()?;
            Some(collection.keys().cloned().collect::<Vec<_>>())
        })
        .flatten();
    assert_eq!(keys, Some(vec![Key::Int(2), Key::Int(3)]));
}

#[test]
fn list_state_round_trip() {
    let mut fixture = Fixture::new();
    fixture.app.render(list(&[(1, "a")])).unwrap();
    fixture.app.render(list(&[])).unwrap();
    fixture.app.render(list(&[(5, "e"), (4, "d")])).unwrap();
    fixture.app.render(list(&[(4, "d"), (5, "e")])).unwrap();

    let report = fixture.app.run_until_stalled().unwrap();
    assert_eq!(report.rendered, 0);
    assert_eq!(fixture.host.borrow().labels(fixture.top()), ["d", "e"]);
    fixture.assert_clean();
}
