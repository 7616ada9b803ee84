use core::fmt;

use eddy_core::ViewId;

/// A host operation that broke the host contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The operation named a view that does not exist or was destroyed.
    UnknownView {
        /// Name of the offending operation.
        op: &'static str,
        /// The missing view.
        view: ViewId,
    },
    /// A sibling-relative insert used an anchor without a parent.
    DetachedAnchor {
        /// The anchor view.
        anchor: ViewId,
    },
    /// A view was placed inside itself or one of its descendants.
    Cycle {
        /// The parent that would have been created.
        parent: ViewId,
        /// The view being placed.
        child: ViewId,
    },
    /// A view was destroyed while it still had children.
    DestroyedWithChildren {
        /// The destroyed view.
        view: ViewId,
        /// How many children it still had.
        children: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownView { op, view } => write!(f, "{op} on unknown view {view}"),
            Self::DetachedAnchor { anchor } => {
                write!(f, "insert relative to detached view {anchor}")
            }
            Self::Cycle { parent, child } => {
                write!(f, "placing {child} under {parent} would create a cycle")
            }
            Self::DestroyedWithChildren { view, children } => {
                write!(f, "view {view} destroyed with {children} children attached")
            }
        }
    }
}

impl std::error::Error for Violation {}
