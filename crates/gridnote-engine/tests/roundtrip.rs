use gridnote_engine::{
    Alignment, Attrs, Direction, Dispatch, EditorState, Node, NodeType, Selection, Transaction,
    add_column_after, create_table, delete_row, go_to_next_cell, normalize_tables, parse,
    serialize, set_column_alignment,
};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

#[test]
fn fixture_tables() {
    assert_fixture("tables");
}

#[test]
fn fixture_mixed() {
    assert_fixture("mixed");
}

/// Canonical markdown comes back byte for byte and needs no normalization.
fn assert_fixture(name: &str) {
    let md = std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();

    let doc = parse(&md);
    assert_eq!(serialize(&doc), md);

    let state = EditorState::from_markdown(&md);
    assert!(!normalize_tables(&state, None));
}

fn run(
    state: &EditorState,
    cmd: impl Fn(&EditorState, Dispatch<'_>) -> bool,
) -> EditorState {
    let mut out = None;
    let mut dispatch = |tr: Transaction| out = Some(state.apply(tr));
    assert!(cmd(state, Some(&mut dispatch)), "command not applicable");
    out.unwrap()
}

fn type_text(state: &EditorState, text: &str) -> EditorState {
    let mut tr = state.tr();
    tr.insert(state.selection().head(), vec![Node::plain(text)])
        .unwrap();
    state.apply(tr)
}

#[test]
fn short_rows_are_written_full_width() {
    let doc = parse("| a | b |\n|---|---|\n| 1 |\n");
    assert_snapshot!(serialize(&doc).trim_end(), @r"
    | a | b |
    | --- | --- |
    | 1 |  |
    ");
}

#[test]
fn editing_session() {
    // cursor in the "1" cell
    let state = EditorState::from_markdown("| A | B |\n|---|---|\n| 1 | 2 |\n")
        .with_selection(Selection::cursor(11));

    let state = run(&state, add_column_after);
    let state = run(&state, go_to_next_cell(Direction::Forward));
    let state = type_text(&state, "new");
    let state = run(&state, set_column_alignment(Some(Alignment::Center)));
    assert_snapshot!(state.to_markdown().trim_end(), @r"
    | A |  | B |
    | --- | :---: | --- |
    | 1 | new | 2 |
    ");

    let state = run(&state, delete_row);
    assert_snapshot!(state.to_markdown().trim_end(), @r"
    | A |  | B |
    | --- | :---: | --- |
    ");
}

#[test]
fn wiki_links_and_code_round_trip_in_paragraphs() {
    let md = "see [[a|b]] and `[[not]]` or [[c]]\n";
    assert_eq!(serialize(&parse(md)), md);
}

fn first_item(doc: &Node) -> &Node {
    doc.child(0)
        .and_then(|list| list.child(0))
        .expect("document starts with a list item")
}

#[test]
fn table_in_tight_list_keeps_following_paragraph() {
    // end of "a": list@0 item@1 paragraph@2
    let state = EditorState::from_markdown("- a\n- b\n").with_selection(Selection::cursor(4));
    let state = run(&state, create_table(2, 2, true));

    let item = first_item(state.doc());
    let kinds: Vec<_> = item.children().map(Node::kind).collect();
    assert_eq!(
        kinds,
        vec![NodeType::Paragraph, NodeType::Table, NodeType::Paragraph]
    );
    let trailing: usize = 2 + item.children().take(2).map(Node::node_size).sum::<usize>() + 1;
    let state = type_text(&state.with_selection(Selection::cursor(trailing)), "after");

    let markdown = state.to_markdown();
    assert_snapshot!(markdown.trim_end(), @r"
    - a

      |  |  |
      | --- | --- |
      |  |  |

      after

    - b
    ");

    let reparsed = parse(&markdown);
    let item = first_item(&reparsed);
    let kinds: Vec<_> = item.children().map(Node::kind).collect();
    assert_eq!(
        kinds,
        vec![NodeType::Paragraph, NodeType::Table, NodeType::Paragraph]
    );
    assert_eq!(item.child(1).map(Node::child_count), Some(2));
    assert_eq!(item.child(2).map(Node::text_content).as_deref(), Some("after"));
    assert_eq!(serialize(&reparsed), markdown);
}

#[test]
fn markdown_lookalike_text_round_trips() {
    let doc = Node::doc(vec![
        Node::paragraph(vec![Node::plain("| x |\n| --- |")]),
        Node::paragraph(vec![Node::plain("x [[a]] y")]),
        Node::paragraph(vec![Node::leaf(
            NodeType::WikiLink,
            Attrs::WikiLink {
                href: "page".into(),
                title: "*x* _y_ `z`".into(),
            },
        )]),
    ]);

    let reparsed = parse(&serialize(&doc));
    assert_eq!(reparsed, doc);
}
