use core::fmt;

use eddy_core::{Props, ViewId, ViewType};

/// A printable copy of a view tree.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    lines: Vec<SnapshotLine>,
}

impl Snapshot {
    pub(crate) fn push(&mut self, depth: usize, view: ViewId, ty: ViewType, props: &Props) {
        self.lines.push(SnapshotLine {
            depth,
            view,
            ty,
            props: props.clone(),
        });
    }

    /// Returns the recorded lines in tree order.
    #[must_use]
    pub fn lines(&self) -> &[SnapshotLine] {
        &self.lines
    }

    /// Returns `true` if the tree was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// One view of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotLine {
    depth: usize,
    view: ViewId,
    ty: ViewType,
    props: Props,
}

impl SnapshotLine {
    /// Nesting depth below the snapshot's top.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// The view this line shows.
    #[must_use]
    pub const fn view(&self) -> ViewId {
        self.view
    }

    /// Type of the view.
    #[must_use]
    pub const fn ty(&self) -> ViewType {
        self.ty
    }

    /// Properties of the view, sorted by name when printed.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }
}

impl fmt::Display for SnapshotLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", "  ".repeat(self.depth), self.ty)?;
        let mut props: Vec<_> = self.props.iter().collect();
        props.sort_by_key(|(name, _)| *name);
        for (name, value) in props {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use eddy_core::{Host, Value};

    use crate::MemoryHost;

    #[test]
    fn prints_indented_tree() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let row = host.create_view(eddy_core::ViewType::VIEW);
        let text = host.create_view(eddy_core::ViewType::LABEL);
        host.set_property(row, "width", &Value::from(2));
        host.set_property(row, "color", &Value::from("red"));
        host.set_property(text, "value", &Value::from("hi"));
        host.append_child(root, row);
        host.append_child(row, text);

        assert_eq!(
            host.snapshot().to_string(),
            "view color=\"red\" width=2\n  label value=\"hi\"\n"
        );
        assert_eq!(host.snapshot_of(text).lines().len(), 0);
    }
}
