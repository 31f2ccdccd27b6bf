//! The canonical on-disk form: a Markdown document, bidirectional and
//! lossless modulo whitespace (node prose descriptions are the one
//! exception — see [`MarkdownFormat::from_markdown`]).
//!
//! Groups ride along in the JSON alternative format but are not part of
//! this document; a Markdown round trip silently drops them.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

use crate::core::GraphRecord;
use crate::error::Result;

use super::{flatten, split, FlatNodeRecord};

pub struct MarkdownFormat;

impl MarkdownFormat {
    pub fn to_markdown(record: &GraphRecord) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", record.graph_title));
        if !record.graph_description.is_empty() {
            out.push_str(&record.graph_description);
            out.push_str("\n\n");
        }

        for entry in flatten(record) {
            write_node_section(&mut out, &entry);
        }

        out.push_str("## Connections\n\n```json\n");
        out.push_str(&serde_json::to_string_pretty(&record.connections).unwrap_or_else(|_| "[]".to_string()));
        out.push_str("\n```\n");
        out
    }

    /// Parse a Markdown document by walking the token stream: level-2
    /// `Node:` headings switch the current node, a level-2 `Connections`
    /// heading switches section, level-3 headings select the current
    /// component, and a fenced code block applies to whichever component is
    /// current. Malformed JSON in any fenced block falls through to the
    /// entry's defaults rather than aborting the load.
    ///
    /// Node prose descriptions are write-only: nothing in the document
    /// structure names them as a field to parse back, so a round trip loses
    /// them, matching the source tool's behavior.
    pub fn from_markdown(content: &str) -> Result<GraphRecord> {
        let mut entries: Vec<FlatNodeRecord> = Vec::new();
        let mut connections = Vec::new();
        let mut current_node_index: Option<usize> = None;
        let mut in_connections = false;
        let mut current_component: Option<String> = None;

        let mut heading_level: Option<HeadingLevel> = None;
        let mut heading_text = String::new();

        let mut parser = Parser::new(content).into_iter();
        while let Some(event) = parser.next() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading_level = Some(level);
                    heading_text.clear();
                }
                Event::Text(text) if heading_level.is_some() => {
                    heading_text.push_str(&text);
                }
                Event::End(TagEnd::Heading(level)) => {
                    match level {
                        HeadingLevel::H2 => {
                            if heading_text == "Connections" {
                                in_connections = true;
                                current_node_index = None;
                            } else if let Some((title, uuid_text)) = parse_node_heading(&heading_text) {
                                let mut entry = FlatNodeRecord::default();
                                entry.title = title;
                                if let Ok(uuid) = uuid_text.parse() {
                                    entry.uuid = uuid;
                                }
                                entries.push(entry);
                                current_node_index = Some(entries.len() - 1);
                                in_connections = false;
                            }
                        }
                        HeadingLevel::H3 if current_node_index.is_some() => {
                            current_component = Some(heading_text.to_ascii_lowercase());
                        }
                        _ => {}
                    }
                    heading_level = None;
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    let mut content_buf = String::new();
                    for ev in parser.by_ref() {
                        match ev {
                            Event::Text(text) => content_buf.push_str(&text),
                            Event::End(TagEnd::CodeBlock) => break,
                            _ => {}
                        }
                    }
                    apply_fence(&language, content_buf.trim(), in_connections, &mut connections, current_node_index.map(|i| &mut entries[i]), current_component.as_deref());
                }
                _ => {}
            }
        }

        let (nodes, reroutes) = split(entries);
        Ok(GraphRecord {
            graph_title: String::new(),
            graph_description: String::new(),
            nodes,
            reroutes,
            connections,
            groups: Vec::new(),
        })
    }
}

fn parse_node_heading(text: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix("Node:")?.trim();
    let marker = "(ID:";
    let start = rest.rfind(marker)?;
    let title = rest[..start].trim().to_string();
    let after = rest[start + marker.len()..].trim();
    let uuid = after.strip_suffix(')')?.trim().to_string();
    Some((title, uuid))
}

fn apply_fence(
    language: &str,
    content: &str,
    in_connections: bool,
    connections: &mut Vec<crate::core::ConnectionRecord>,
    current_entry: Option<&mut FlatNodeRecord>,
    component: Option<&str>,
) {
    if in_connections {
        if language == "json" {
            *connections = serde_json::from_str(content).unwrap_or_default();
        }
        return;
    }

    let Some(entry) = current_entry else { return };
    match component {
        Some("metadata") if language == "json" => apply_metadata(entry, content),
        Some("logic") if language == "python" => entry.code = content.to_string(),
        Some("gui definition") if language == "python" => entry.gui_code = content.to_string(),
        Some("gui state handler") if language == "python" => entry.gui_get_values_code = content.to_string(),
        _ => {}
    }
}

fn apply_metadata(entry: &mut FlatNodeRecord, content: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return;
    };
    if let Some(pos) = value.get("pos").and_then(|v| v.as_array()) {
        if let [x, y] = pos.as_slice() {
            entry.pos = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
        }
    }
    if let Some(size) = value.get("size").and_then(|v| v.as_array()) {
        if let [w, h] = size.as_slice() {
            entry.size = (w.as_f64().unwrap_or(200.0), h.as_f64().unwrap_or(150.0));
        }
    }
    if let Some(colors) = value.get("colors") {
        if let Some(title) = colors.get("title").and_then(|v| v.as_str()) {
            entry.colors.title = title.to_string();
        }
        if let Some(body) = colors.get("body").and_then(|v| v.as_str()) {
            entry.colors.body = body.to_string();
        }
    }
    if let Some(gui_state) = value.get("gui_state").and_then(|v| v.as_object()) {
        entry.gui_state = gui_state.clone().into_iter().collect();
    }
    if let Some(is_reroute) = value.get("is_reroute").and_then(|v| v.as_bool()) {
        entry.is_reroute = is_reroute;
    }
}

fn write_node_section(out: &mut String, entry: &FlatNodeRecord) {
    out.push_str(&format!("## Node: {} (ID: {})\n\n", entry.title, entry.uuid));

    if !entry.description.is_empty() {
        out.push_str(&entry.description);
    } else {
        out.push_str("Node description goes here.");
    }
    out.push_str("\n\n");

    let mut metadata = serde_json::Map::new();
    metadata.insert("uuid".to_string(), serde_json::Value::String(entry.uuid.to_string()));
    metadata.insert("title".to_string(), serde_json::Value::String(entry.title.clone()));
    metadata.insert("pos".to_string(), serde_json::json!([entry.pos.0, entry.pos.1]));
    metadata.insert("size".to_string(), serde_json::json!([entry.size.0, entry.size.1]));
    if entry.is_reroute {
        metadata.insert("is_reroute".to_string(), serde_json::Value::Bool(true));
    }
    metadata.insert("colors".to_string(), serde_json::to_value(&entry.colors).unwrap_or_default());
    metadata.insert("gui_state".to_string(), serde_json::to_value(&entry.gui_state).unwrap_or_default());

    out.push_str("### Metadata\n\n```json\n");
    out.push_str(&serde_json::to_string_pretty(&metadata).unwrap_or_default());
    out.push_str("\n```\n\n");

    if !entry.is_reroute {
        out.push_str("### Logic\n\n```python\n");
        out.push_str(&entry.code);
        out.push_str("\n```\n\n");

        if !entry.gui_code.trim().is_empty() {
            out.push_str("### GUI Definition\n\n```python\n");
            out.push_str(&entry.gui_code);
            out.push_str("\n```\n\n");
        }
        if !entry.gui_get_values_code.trim().is_empty() {
            out.push_str("### GUI State Handler\n\n```python\n");
            out.push_str(&entry.gui_get_values_code);
            out.push_str("\n```\n\n");
        }
    }
}
