//! Hierarchical status snapshots.
//!
//! A [`StatusTree`] is a plain value: callers build a fresh one for every
//! update and hand it to the [`Reporter`](super::Reporter), which replaces
//! whatever it showed before.

use console::style;

use crate::modern_ui::symbols;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusNode {
    pub label: String,
    pub running: bool,
    /// `Some(true)` ticked, `Some(false)` crossed, `None` no indicator.
    pub complete: Option<bool>,
    pub hidden: bool,
    pub children: Vec<StatusNode>,
}

impl StatusNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn running(mut self) -> Self {
        self.running = true;
        self
    }

    pub fn completed(mut self, ok: bool) -> Self {
        self.running = false;
        self.complete = Some(ok);
        self
    }

    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_child(mut self, child: StatusNode) -> Self {
        self.children.push(child);
        self
    }

    fn render_into(&self, spinner: &str, out: &mut String) {
        out.push(' ');
        if self.running {
            out.push_str(&style(spinner).cyan().to_string());
            out.push(' ');
        } else {
            match self.complete {
                Some(true) => {
                    out.push_str(&style(symbols::TICK).green().to_string());
                    out.push(' ');
                }
                Some(false) => {
                    out.push_str(&style(symbols::CROSS).red().to_string());
                    out.push(' ');
                }
                None => out.push_str("  "),
            }
        }
        out.push_str(&self.label);

        for child in self.children.iter().filter(|c| !c.hidden) {
            out.push_str("\n  ");
            child.render_into(spinner, out);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTree {
    pub roots: Vec<StatusNode>,
}

impl StatusTree {
    pub fn new(roots: Vec<StatusNode>) -> Self {
        Self { roots }
    }

    /// Renders every visible root, substituting `spinner` for running nodes.
    pub fn render(&self, spinner: &str) -> String {
        let mut out = String::new();
        for (i, node) in self.roots.iter().filter(|n| !n.hidden).enumerate() {
            if i > 0 {
                out.push('\n');
            }
            node.render_into(spinner, &mut out);
        }
        out
    }
}

impl From<StatusNode> for StatusTree {
    fn from(node: StatusNode) -> Self {
        Self { roots: vec![node] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(tree: &StatusTree, spinner: &str) -> String {
        console::strip_ansi_codes(&tree.render(spinner)).to_string()
    }

    #[test]
    fn test_render_indicators() {
        let tree = StatusTree::from(
            StatusNode::new("Getting some things ready")
                .running()
                .with_child(StatusNode::new("FFmpeg is installed").completed(true))
                .with_child(StatusNode::new("Could not scan for files").completed(false))
                .with_child(StatusNode::new("Plain")),
        );

        assert_eq!(
            plain(&tree, "⠋"),
            " ⠋ Getting some things ready\n   ✔ FFmpeg is installed\n   ✖ Could not scan for files\n     Plain"
        );
    }

    #[test]
    fn test_render_skips_hidden() {
        let tree = StatusTree::new(vec![
            StatusNode::new("a"),
            StatusNode::new("b").hide(),
            StatusNode::new("c").with_child(StatusNode::new("d").hide()),
        ]);
        assert_eq!(plain(&tree, "x"), "   a\n   c");
    }

    #[test]
    fn test_grandchildren_share_child_indent() {
        let tree = StatusTree::from(
            StatusNode::new("root")
                .with_child(StatusNode::new("child").with_child(StatusNode::new("grandchild"))),
        );
        assert_eq!(plain(&tree, "x"), "   root\n     child\n     grandchild");
    }
}
