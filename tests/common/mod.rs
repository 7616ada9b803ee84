#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use eddy::{App, Controller, Settings, VNode, ViewId, ViewType, share};
use eddy_memory::MemoryHost;

pub struct Fixture {
    pub app: App,
    pub host: Rc<RefCell<MemoryHost>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let (host, shared) = share(MemoryHost::new());
        let container = host.borrow().container();
        let app = App::new(settings, shared, container);
        Self { app, host }
    }

    pub fn container(&self) -> ViewId {
        self.host.borrow().container()
    }

    /// The single view attached to the container.
    pub fn top(&self) -> ViewId {
        let host = self.host.borrow();
        let children = host.children(host.container());
        assert_eq!(children.len(), 1, "expected one top view");
        children[0]
    }

    pub fn controller(&self, name: &str) -> Controller {
        self.app
            .root()
            .find_ref(name)
            .and_then(|target| target.as_controller().cloned())
            .unwrap_or_else(|| panic!("no controller ref `{name}`"))
    }

    pub fn assert_clean(&self) {
        assert!(
            self.host.borrow().violations().is_empty(),
            "host violations: {:?}",
            self.host.borrow().violations()
        );
    }
}

pub fn label(key: i64, text: &str) -> VNode {
    VNode::view(ViewType::LABEL)
        .prop("value", text.to_owned())
        .key(key)
        .build()
}

pub fn keyed_list(items: &[(i64, &str)]) -> VNode {
    VNode::view(ViewType::VIEW)
        .child(VNode::collection(
            items
                .iter()
                .map(|&(key, text)| Some(label(key, text)))
                .collect::<Vec<_>>(),
        ))
        .build()
}
