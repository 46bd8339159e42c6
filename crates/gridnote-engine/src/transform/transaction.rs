use super::{Mapping, Step, TransformError};
use crate::model::{Attrs, Node};
use crate::state::Selection;

/// A batch of steps derived from one document, plus an optional selection
/// update.
///
/// Every builder method validates its step against the current intermediate
/// document; a failing step leaves the transaction unchanged.
#[derive(Debug, Clone)]
pub struct Transaction {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    mapping: Mapping,
    selection_before: Selection,
    selection: Option<Selection>,
}

impl Transaction {
    pub fn new(doc: Node, selection: Selection) -> Self {
        Self {
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            mapping: Mapping::new(),
            selection_before: selection,
            selection: None,
        }
    }

    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let doc = step.apply(&self.doc)?;
        self.mapping.push(step.map());
        self.steps.push(step);
        self.doc = doc;
        Ok(self)
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace_with(from, to, Vec::new())
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace { from, to, content })
    }

    pub fn set_node_attrs(&mut self, pos: usize, attrs: Attrs) -> Result<&mut Self, TransformError> {
        self.step(Step::SetAttrs { pos, attrs })
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self
    }

    /// The document the transaction started from.
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// The document after all steps so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// The explicitly set selection, or the starting selection mapped through
    /// the steps so far.
    pub fn selection(&self) -> Selection {
        self.selection
            .unwrap_or_else(|| self.selection_before.map(&self.doc, &self.mapping))
    }

    pub fn selection_before(&self) -> Selection {
        self.selection_before
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Assoc;
    use pretty_assertions::assert_eq;

    fn doc() -> Node {
        Node::doc(vec![Node::paragraph(vec![Node::plain("hello")])])
    }

    #[test]
    fn chained_steps_map_positions() {
        let mut tr = Transaction::new(doc(), Selection::cursor(6));
        tr.insert(1, vec![Node::plain(">> ")]).unwrap();
        tr.delete(4, 5).unwrap();
        assert_eq!(tr.doc().text_content(), ">> ello");
        assert_eq!(tr.mapping().map(6, Assoc::After), 8);
        assert_eq!(tr.selection(), Selection::Cursor { pos: 8 });
        assert!(tr.doc_changed());
        assert!(!tr.selection_set());
    }

    #[test]
    fn failing_step_leaves_transaction_untouched() {
        let mut tr = Transaction::new(doc(), Selection::cursor(1));
        assert!(tr.delete(3, 99).is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc(), tr.before());
    }

    #[test]
    fn explicit_selection_wins() {
        let mut tr = Transaction::new(doc(), Selection::cursor(1));
        tr.set_selection(Selection::cursor(3));
        assert_eq!(tr.selection(), Selection::cursor(3));
        assert!(tr.selection_set());
    }
}
