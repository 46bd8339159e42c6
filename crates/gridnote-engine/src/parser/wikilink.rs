use super::cursor::Cursor;

/// Delimiters of the `[[target|display]]` syntax.
pub struct WikiLink;

impl WikiLink {
    pub const OPEN: &'static [u8; 2] = b"[[";
    pub const CLOSE: &'static [u8; 2] = b"]]";
    pub const ALIAS: u8 = b'|';
}

/// A piece of scanned inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    WikiLink { href: &'a str, title: &'a str },
}

/// Splits `s` into plain text and wiki links.
///
/// A link runs from `[[` to the first `]]` on the same line. An unterminated
/// or empty link is left in the text untouched.
pub fn scan(s: &str) -> Vec<Piece<'_>> {
    scan_escaped(s, &[])
}

/// Like [`scan`], but brackets at the byte offsets in `escaped` are literal:
/// they never open or close a link.
pub fn scan_escaped<'a>(s: &'a str, escaped: &[usize]) -> Vec<Piece<'a>> {
    let mut cur = Cursor::new(s);
    let mut out = vec![];
    let mut text_start = cur.pos();

    while !cur.eof() {
        let start = cur.pos();
        if let Some((href, title)) = try_parse_wikilink(&mut cur, escaped) {
            if start > text_start {
                out.push(Piece::Text(cur.slice(text_start, start)));
            }
            out.push(Piece::WikiLink { href, title });
            text_start = cur.pos();
            continue;
        }
        cur.bump_char();
    }

    if cur.pos() > text_start {
        out.push(Piece::Text(cur.slice(text_start, cur.pos())));
    }
    out
}

/// Attempts to parse a wiki link at the cursor, returning `(href, title)`.
/// On failure the cursor is restored.
fn try_parse_wikilink<'a>(cur: &mut Cursor<'a>, escaped: &[usize]) -> Option<(&'a str, &'a str)> {
    if !delimiter_at(cur, WikiLink::OPEN, escaped) {
        return None;
    }

    let saved = cur.clone();
    cur.bump_n(WikiLink::OPEN.len());
    let body_start = cur.pos();

    while !cur.eof() && !delimiter_at(cur, WikiLink::CLOSE, escaped) {
        if cur.peek() == Some(b'\n') {
            *cur = saved;
            return None;
        }
        cur.bump();
    }
    if cur.eof() {
        *cur = saved;
        return None;
    }
    let body = cur.slice(body_start, cur.pos());
    cur.bump_n(WikiLink::CLOSE.len());

    let (href, display) = match body.find(WikiLink::ALIAS as char) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };
    if href.trim().is_empty() {
        *cur = saved;
        return None;
    }
    let title = display.filter(|d| !d.is_empty()).unwrap_or(href);
    Some((href, title))
}

fn delimiter_at(cur: &Cursor<'_>, delimiter: &[u8; 2], escaped: &[usize]) -> bool {
    let at = cur.pos();
    cur.starts_with(delimiter) && !escaped.contains(&at) && !escaped.contains(&(at + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn plain_link() {
        assert_eq!(
            scan("see [[Page]] now"),
            vec![
                Piece::Text("see "),
                Piece::WikiLink {
                    href: "Page",
                    title: "Page"
                },
                Piece::Text(" now"),
            ]
        );
    }

    #[test]
    fn aliased_link() {
        assert_eq!(
            scan("[[notes/a|Alpha]]"),
            vec![Piece::WikiLink {
                href: "notes/a",
                title: "Alpha"
            }]
        );
    }

    #[test]
    fn stops_at_first_close() {
        assert_eq!(
            scan("[[a]]b]]"),
            vec![
                Piece::WikiLink {
                    href: "a",
                    title: "a"
                },
                Piece::Text("b]]"),
            ]
        );
    }

    #[rstest]
    #[case("[[foo")]
    #[case("[[]]")]
    #[case("[[|x]]")]
    #[case("[[a\nb]]")]
    #[case("[[   ]]")]
    fn non_links_stay_text(#[case] input: &str) {
        assert_eq!(scan(input), vec![Piece::Text(input)]);
    }

    #[test]
    fn adjacent_links() {
        let pieces = scan("[[a]][[b]]");
        assert_eq!(pieces.len(), 2);
    }

    #[rstest]
    #[case(&[0])]
    #[case(&[1])]
    #[case(&[0, 1, 3, 4])]
    fn escaped_open_bracket_is_literal(#[case] escaped: &[usize]) {
        assert_eq!(scan_escaped("[[a]]", escaped), vec![Piece::Text("[[a]]")]);
    }

    #[test]
    fn escaped_close_bracket_stays_in_body() {
        assert_eq!(
            scan_escaped("[[a]]]", &[3]),
            vec![Piece::WikiLink {
                href: "a]",
                title: "a]"
            }]
        );
    }

    #[test]
    fn multibyte_text_around_links() {
        assert_eq!(
            scan("日本[[語]]"),
            vec![
                Piece::Text("日本"),
                Piece::WikiLink {
                    href: "語",
                    title: "語"
                },
            ]
        );
    }
}
