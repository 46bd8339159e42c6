//! # Commands
//!
//! A command inspects an [`EditorState`] and, when it applies, hands exactly
//! one [`Transaction`] to the dispatch callback. Called without a callback it
//! only reports whether it would apply, which is how menus and keymaps decide
//! enablement.

use crate::state::EditorState;
use crate::transform::Transaction;

/// The dispatch callback handed to commands.
pub type Dispatch<'a> = Option<&'a mut dyn FnMut(Transaction)>;

pub trait Command {
    /// Runs the command, returning whether it applied.
    fn run(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool;

    /// Dry run: whether the command would apply, without side effects.
    fn can_run(&self, state: &EditorState) -> bool {
        self.run(state, None)
    }
}

impl<F> Command for F
where
    F: Fn(&EditorState, Dispatch<'_>) -> bool,
{
    fn run(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self(state, dispatch)
    }
}

/// Pins a closure to the command signature so its lifetimes are inferred as
/// higher-ranked.
pub fn command<F>(f: F) -> F
where
    F: Fn(&EditorState, Dispatch<'_>) -> bool,
{
    f
}

/// Travel direction for navigation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// Hands `tr` to `dispatch` when there is one.
pub(crate) fn send(dispatch: Dispatch<'_>, tr: Transaction) {
    if let Some(dispatch) = dispatch {
        dispatch(tr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Selection;

    fn move_to_start(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        if state.selection() == Selection::cursor(1) {
            return false;
        }
        let mut tr = state.tr();
        tr.set_selection(Selection::cursor(1));
        send(dispatch, tr);
        true
    }

    #[test]
    fn functions_are_commands() {
        let state = EditorState::from_markdown("hello").with_selection(Selection::cursor(3));
        assert!(move_to_start.can_run(&state));

        let mut applied = None;
        let mut dispatch = |tr: Transaction| applied = Some(state.apply(tr));
        assert!(move_to_start.run(&state, Some(&mut dispatch)));
        let next = applied.expect("dispatched");
        assert!(!move_to_start.can_run(&next));
    }

    #[test]
    fn closures_are_commands() {
        let always = command(|_state: &EditorState, _dispatch: Dispatch<'_>| true);
        assert!(always.can_run(&EditorState::from_markdown("")));
    }
}
