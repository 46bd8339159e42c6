use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Horizontal alignment of a table column, as written in a GFM delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Lenient parse: anything outside the three known values is `None`.
    pub fn parse(s: &str) -> Option<Alignment> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

fn text_align_regex() -> &'static Regex {
    static TEXT_ALIGN: OnceLock<Regex> = OnceLock::new();
    TEXT_ALIGN.get_or_init(|| {
        Regex::new(r"(?i)(?:^|;)\s*text-align\s*:\s*([a-z]+)").expect("Invalid text-align regex")
    })
}

/// Attributes shared by `table_cell` and `table_header`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CellAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    pub colspan: u32,
    pub rowspan: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colwidth: Option<Vec<u32>>,
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self {
            alignment: None,
            colspan: 1,
            rowspan: 1,
            colwidth: None,
        }
    }
}

impl CellAttrs {
    pub fn aligned(alignment: Option<Alignment>) -> Self {
        Self {
            alignment,
            ..Self::default()
        }
    }

    /// Reads cell attributes from DOM-style `(name, value)` pairs.
    ///
    /// Invalid values never fail: spans fall back to 1, alignment and widths
    /// fall back to `None`.
    pub fn from_dom<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut out = CellAttrs::default();
        let mut widths = None;
        for (name, value) in attrs {
            match name.to_ascii_lowercase().as_str() {
                "colspan" => out.colspan = parse_span(value),
                "rowspan" => out.rowspan = parse_span(value),
                "data-colwidth" => widths = Some(value.to_string()),
                "style" => {
                    out.alignment = text_align_regex()
                        .captures(value)
                        .and_then(|c| c.get(1))
                        .and_then(|m| Alignment::parse(m.as_str()));
                }
                _ => {}
            }
        }
        out.colwidth = widths.and_then(|w| parse_colwidth(&w, out.colspan));
        out
    }

    /// Writes the attributes back out as DOM-style pairs. Defaults are omitted.
    pub fn to_dom(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if self.colspan != 1 {
            out.push(("colspan", self.colspan.to_string()));
        }
        if self.rowspan != 1 {
            out.push(("rowspan", self.rowspan.to_string()));
        }
        if let Some(widths) = &self.colwidth {
            let joined: Vec<String> = widths.iter().map(u32::to_string).collect();
            out.push(("data-colwidth", joined.join(",")));
        }
        if let Some(alignment) = self.alignment {
            out.push(("style", format!("text-align: {}", alignment.as_str())));
        }
        out
    }

    /// The DOM attributes rendered as an HTML attribute string with a leading
    /// space per attribute, values escaped for double quotes.
    pub fn to_dom_string(&self) -> String {
        self.to_dom()
            .into_iter()
            .map(|(name, value)| {
                format!(
                    " {name}=\"{}\"",
                    html_escape::encode_double_quoted_attribute(&value)
                )
            })
            .collect()
    }
}

fn parse_span(value: &str) -> u32 {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => 1,
    }
}

fn parse_colwidth(value: &str, colspan: u32) -> Option<Vec<u32>> {
    let widths: Vec<u32> = value
        .split(',')
        .map(|w| w.trim().parse::<u32>().ok().filter(|n| *n > 0))
        .collect::<Option<_>>()?;
    (widths.len() == colspan as usize).then_some(widths)
}

/// Per-kind node attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(untagged)]
pub enum Attrs {
    #[default]
    None,
    Heading {
        level: u8,
    },
    CodeBlock {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    List {
        tight: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
    },
    Image {
        src: String,
        alt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Cell(CellAttrs),
    WikiLink {
        href: String,
        title: String,
    },
}

/// Inline marks. The derived ordering is the canonical mark order on a text
/// node and the nesting order used by the serializer (outermost first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Link {
        href: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Strong,
    Em,
    Strike,
    Code,
}
