#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

mod app;
mod error;
pub mod logging;
pub mod settings;

#[doc(inline)]
pub use app::App;
#[doc(inline)]
pub use eddy_core::*;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use settings::Settings;

pub mod prelude {
    //! Commonly used types, for a single glob import.
    //!
    //! ```rust
    //! use eddy::prelude::*;
    //!
    //! struct Hello;
    //!
    //! impl Component for Hello {
    //!     fn create(_props: &Props) -> Self {
    //!         Self
    //!     }
    //!
    //!     fn render(&self, cx: &RenderCx<'_>) -> Render {
    //!         let name = cx.prop("name").and_then(Value::as_str).unwrap_or("world");
    //!         VNode::text(format!("hello, {name}")).into()
    //!     }
    //! }
    //! ```
    pub use crate::{App, Settings};
    pub use eddy_core::{
        Component, Controller, Key, Props, Render, RenderCx, State, VNode, Value, ViewType,
    };
}
