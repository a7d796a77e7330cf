//! Row rendering for terminal views.
//!
//! Works from the flat list produced by [`crate::tree::visible_nodes`], one
//! row at a time. The guide columns for a row are derived from its
//! `ancestors_last` stack, so no recursion over the tree is needed.

use std::fmt::Write as _;

use serde::Serialize;

use crate::config::{GuideStyle, RenderConfig};
use crate::model::{NodeId, Status};
use crate::tree::{Tree, VisibleNode};

/// Glyph set for guides and disclosure markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    pub branch: &'static str,
    pub last: &'static str,
    pub pipe: &'static str,
    pub blank: &'static str,
    pub expanded: &'static str,
    pub collapsed: &'static str,
    pub leaf: &'static str,
}

impl Glyphs {
    pub const UNICODE: Self = Self {
        branch: "├─ ",
        last: "└─ ",
        pipe: "│  ",
        blank: "   ",
        expanded: "▾",
        collapsed: "▸",
        leaf: "•",
    };

    pub const ASCII: Self = Self {
        branch: "|- ",
        last: "`- ",
        pipe: "|  ",
        blank: "   ",
        expanded: "-",
        collapsed: "+",
        leaf: "*",
    };

    #[must_use]
    pub const fn for_style(style: GuideStyle) -> Self {
        match style {
            GuideStyle::Unicode => Self::UNICODE,
            GuideStyle::Ascii => Self::ASCII,
        }
    }
}

/// Short badge text for a status.
#[must_use]
pub const fn status_badge(status: Status) -> &'static str {
    match status {
        Status::Draft => "draft",
        Status::InReview => "review",
        Status::Approved => "approved",
        Status::Archived => "archived",
    }
}

/// Everything a view needs to draw one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub id: NodeId,
    pub depth: usize,
    /// Guide columns plus the connector for this row.
    pub guides: String,
    pub marker: &'static str,
    pub icon: Option<String>,
    pub title: String,
    pub status: Option<Status>,
    pub labels: Vec<String>,
    pub unpublished: bool,
}

impl RenderedRow {
    /// Plain one-line rendering.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!("{}{} ", self.guides, self.marker);
        if let Some(icon) = &self.icon {
            let _ = write!(line, "{icon} ");
        }
        line.push_str(&self.title);
        if let Some(status) = self.status {
            let _ = write!(line, " [{}]", status_badge(status));
        }
        for label in &self.labels {
            let _ = write!(line, " #{label}");
        }
        if self.unpublished {
            line.push_str(" *");
        }
        line
    }
}

/// Guide prefix for `row`: one column per non-root ancestor, then the
/// connector.
#[must_use]
pub fn guide_prefix(row: &VisibleNode, glyphs: &Glyphs) -> String {
    if row.depth == 0 {
        return String::new();
    }
    let mut prefix = String::with_capacity(row.depth * 4);
    for &ancestor_last in row.ancestors_last.iter().skip(1) {
        prefix.push_str(if ancestor_last { glyphs.blank } else { glyphs.pipe });
    }
    prefix.push_str(if row.is_last { glyphs.last } else { glyphs.branch });
    prefix
}

/// Disclosure marker for `row`.
#[must_use]
pub const fn marker(row: &VisibleNode, glyphs: &Glyphs) -> &'static str {
    match (row.has_children, row.is_expanded) {
        (false, _) => glyphs.leaf,
        (true, true) => glyphs.expanded,
        (true, false) => glyphs.collapsed,
    }
}

/// Render every visible row. Rows whose node vanished are skipped.
#[must_use]
pub fn render_rows(tree: &Tree, rows: &[VisibleNode], config: &RenderConfig) -> Vec<RenderedRow> {
    let glyphs = Glyphs::for_style(config.guides);
    rows.iter()
        .filter_map(|row| {
            let node = tree.get(row.id.as_str())?;
            Some(RenderedRow {
                id: row.id.clone(),
                depth: row.depth,
                guides: guide_prefix(row, &glyphs),
                marker: marker(row, &glyphs),
                icon: node.icon.clone(),
                title: node.title.clone(),
                status: config.show_status.then_some(node.status),
                labels: if config.show_labels {
                    node.labels.iter().map(|l| l.name.clone()).collect()
                } else {
                    Vec::new()
                },
                unpublished: node.has_unpublished_changes,
            })
        })
        .collect()
}

/// Multi-line text rendering, one row per line.
#[must_use]
pub fn render_text(tree: &Tree, rows: &[VisibleNode], config: &RenderConfig) -> String {
    let mut out = String::new();
    for row in render_rows(tree, rows, config) {
        out.push_str(&row.to_line());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Label, TreeNode};
    use crate::tree::{build_tree, visible_nodes};
    use std::collections::HashSet;

    fn plain() -> RenderConfig {
        RenderConfig {
            guides: GuideStyle::Ascii,
            show_status: false,
            show_labels: false,
        }
    }

    fn render(config: &RenderConfig) -> String {
        let tree = build_tree(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("b", Some("a".into()), "B").with_position(0),
            TreeNode::new("c", Some("a".into()), "C").with_position(1),
            TreeNode::new("d", Some("b".into()), "D").with_position(0),
            TreeNode::new("e", Some("c".into()), "E").with_position(0),
        ]);
        let expanded: HashSet<NodeId> = ["a", "b", "c"].into_iter().map(NodeId::from).collect();
        let rows = visible_nodes(&tree, &expanded, None);
        render_text(&tree, &rows, config)
    }

    #[test]
    fn ascii_guides_follow_sibling_structure() {
        let expected = "\
- A
|- - B
|  `- * D
`- - C
   `- * E
";
        assert_eq!(render(&plain()), expected);
    }

    #[test]
    fn unicode_guides() {
        let config = RenderConfig {
            guides: GuideStyle::Unicode,
            ..plain()
        };
        let text = render(&config);
        assert!(text.contains("├─ ▾ B"));
        assert!(text.contains("│  └─ • D"));
        assert!(text.contains("   └─ • E"));
    }

    #[test]
    fn badges_labels_and_unpublished_marker() {
        let mut node = TreeNode::new("a", None, "Roadmap");
        node.status = Status::InReview;
        node.icon = Some("📘".into());
        node.has_unpublished_changes = true;
        node.labels = vec![Label {
            id: "l".into(),
            name: "infra".into(),
            color: "blue".into(),
        }];
        let tree = build_tree(vec![node]);
        let rows = visible_nodes(&tree, &HashSet::new(), None);
        let line = render_text(&tree, &rows, &RenderConfig::default());
        assert_eq!(line, "• 📘 Roadmap [review] #infra *\n");
    }

    #[test]
    fn collapsed_marker() {
        let tree = build_tree(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("b", Some("a".into()), "B"),
        ]);
        let rows = visible_nodes(&tree, &HashSet::new(), None);
        assert_eq!(render_text(&tree, &rows, &plain()), "+ A\n");
    }
}
