//! Visual-only spans handed to the host for painting.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::model::{Mark, Node};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: &'static str,
}

pub const TAG_LINK_CLASS: &str = "tag-link";

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| Regex::new(r"#[\p{L}\p{N}_/-]+").expect("Invalid tag regex"))
}

/// `#tag` runs in text outside code spans, as document positions.
pub fn tag_links(doc: &Node) -> Vec<Decoration> {
    let mut found = Vec::new();
    doc.descendants(&mut |node, pos| {
        let Some(text) = node.text_str() else {
            return true;
        };
        if node.marks().contains(&Mark::Code) {
            return false;
        }
        for m in tag_regex().find_iter(text) {
            // a `#` glued to a word is not a tag
            let glued = text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
            if glued {
                continue;
            }
            let from = pos + text[..m.start()].chars().count();
            found.push(Decoration {
                from,
                to: from + m.as_str().chars().count(),
                class: TAG_LINK_CLASS,
            });
        }
        false
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_tags_in_text() {
        let doc = parse("see #todo and #a/b");
        let spans: Vec<_> = tag_links(&doc).iter().map(|d| (d.from, d.to)).collect();
        assert_eq!(spans, vec![(5, 10), (15, 19)]);
    }

    #[test]
    fn skips_code_and_anchors() {
        let doc = parse("`#code` issue#3 #ok");
        let spans: Vec<_> = tag_links(&doc).iter().map(|d| (d.from, d.to)).collect();
        assert_eq!(spans, vec![(15, 18)]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let doc = parse("é #tag");
        assert_eq!(
            tag_links(&doc),
            vec![Decoration {
                from: 3,
                to: 7,
                class: TAG_LINK_CLASS
            }]
        );
    }

    #[test]
    fn tags_inside_table_cells() {
        let doc = parse("| #a |\n|---|\n| b |\n");
        assert_eq!(tag_links(&doc).len(), 1);
    }
}
