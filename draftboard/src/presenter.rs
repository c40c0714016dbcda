//! A headless stand-in for the outliner panel: keeps one row per node, in sync with a document by listening
//! for changes and reconciling, rather than rebuilding every row after each edit.

use draftboard_core::document::Document;
use draftboard_core::events::ChangeEvent;
use draftboard_core::scene::{NodeKind, SceneGraph};
use draftboard_core::NodeID;

const POINT_ICON: &str = "•";
const LINE_ICON: &str = "╱";
const CIRCLE_ICON: &str = "◯";
const PARAMETRIC_ICON: &str = "∿";
const GROUP_ICON: &str = "▤";
const GENERIC_ICON: &str = "？";

#[must_use]
pub fn icon_of_kind(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Point => POINT_ICON,
        NodeKind::Line => LINE_ICON,
        NodeKind::Circle => CIRCLE_ICON,
        NodeKind::Parametric => PARAMETRIC_ICON,
        NodeKind::Group => GROUP_ICON,
        NodeKind::Generic => GENERIC_ICON,
    }
}

/// What the panel shows for one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub icon: &'static str,
    pub label: String,
    /// Shown in the editor, counting every ancestor.
    pub shown: bool,
    /// Takes part in output, counting every ancestor.
    pub rendered: bool,
}
impl Row {
    /// Stands in until the first refresh fills it.
    fn placeholder() -> Self {
        Self {
            icon: GENERIC_ICON,
            label: String::new(),
            shown: true,
            rendered: true,
        }
    }
    fn read(graph: &SceneGraph, id: NodeID) -> Option<Self> {
        let node = graph.get(id)?;
        Some(Self {
            icon: icon_of_kind(node.kind()),
            label: node.label().to_owned(),
            shown: graph.effective_visible(id).ok()?,
            rendered: graph.effective_render_enabled(id).ok()?,
        })
    }
}

pub struct OutlinePresenter {
    events: crossbeam::channel::Receiver<ChangeEvent>,
    rows: hashbrown::HashMap<NodeID, Row>,
    /// Rows built since attaching, for diagnostics.
    built: usize,
}
impl OutlinePresenter {
    /// Start presenting `document`, building rows for everything already in it.
    #[must_use]
    pub fn attach(document: &Document) -> Self {
        let mut this = Self {
            events: document.write_with(|outline| outline.subscribe()),
            rows: hashbrown::HashMap::new(),
            built: 0,
        };
        this.sync(document);
        this
    }
    /// Catch up with any changes made since the last pump. Returns whether there were any.
    pub fn pump(&mut self, document: &Document) -> bool {
        let events: Vec<_> = self.events.try_iter().collect();
        if events.is_empty() {
            return false;
        }
        log::trace!("presenting {} change(s)", events.len());
        self.sync(document);
        true
    }
    fn sync(&mut self, document: &Document) {
        document.write_with(|outline| {
            if outline.needs_reconcile() || self.rows.is_empty() {
                let live = self.rows.keys().copied().collect();
                let reconciliation = outline.reconcile_display_cache(&live);
                for id in &reconciliation.to_discard {
                    self.rows.remove(id);
                }
                self.built += reconciliation.to_create.len();
                for id in reconciliation.to_create {
                    self.rows.insert(id, Row::placeholder());
                }
            }
            // Flags and labels can change without the tree changing shape. Rows are cheap to refresh.
            let graph = outline.graph();
            for (id, row) in &mut self.rows {
                if let Some(fresh) = Row::read(graph, *id) {
                    *row = fresh;
                }
            }
        });
    }
    #[must_use]
    pub fn row(&self, id: NodeID) -> Option<&Row> {
        self.rows.get(&id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    #[must_use]
    pub fn rows_built(&self) -> usize {
        self.built
    }
    /// The panel as text, one indented line per row in outliner order.
    #[must_use]
    pub fn render(&self, document: &Document) -> Vec<String> {
        document.read_with(|graph| {
            graph
                .iter_display_order()
                .filter_map(|(depth, id)| {
                    let row = self.rows.get(&id)?;
                    let mut line = format!("{}{} {}", "  ".repeat(depth), row.icon, row.label);
                    if !row.shown {
                        line.push_str(" (hidden)");
                    }
                    if !row.rendered {
                        line.push_str(" (not rendered)");
                    }
                    Some(line)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows_follow_document() {
        let document = Document::default();
        let group = document
            .write_with(|outline| outline.create_node(NodeKind::Group, "Shapes", None))
            .unwrap();
        let mut presenter = OutlinePresenter::attach(&document);
        assert_eq!(presenter.len(), 1);
        assert!(!presenter.pump(&document));

        let circle = document
            .write_with(|outline| outline.create_node(NodeKind::Circle, "Circle", Some(group)))
            .unwrap();
        assert!(presenter.pump(&document));
        assert_eq!(presenter.row(circle).map(|row| row.icon), Some(CIRCLE_ICON));
        assert_eq!(presenter.rows_built(), 2);

        document
            .write_with(|outline| outline.toggle_visibility(group))
            .unwrap();
        assert!(presenter.pump(&document));
        assert!(!presenter.row(circle).unwrap().shown);
        assert_eq!(
            presenter.render(&document),
            vec!["▤ Shapes (hidden)", "  ◯ Circle (hidden)"]
        );
        // Nothing structural, nothing rebuilt.
        assert_eq!(presenter.rows_built(), 2);

        document
            .write_with(|outline| outline.remove_subtree(group))
            .unwrap();
        assert!(presenter.pump(&document));
        assert!(presenter.is_empty());
    }
    #[test]
    fn untouched_rows_survive_moves() {
        let document = Document::default();
        let (a, b) = document.write_with(|outline| {
            let a = outline.create_node(NodeKind::Point, "A", None).unwrap();
            let b = outline.create_node(NodeKind::Group, "B", None).unwrap();
            (a, b)
        });
        let mut presenter = OutlinePresenter::attach(&document);
        document
            .write_with(|outline| outline.handle_drop(&[a], Some(b), 0))
            .unwrap();
        assert!(presenter.pump(&document));
        assert_eq!(presenter.rows_built(), 2);
        assert_eq!(presenter.render(&document), vec!["▤ B", "  • A"]);
    }
}
