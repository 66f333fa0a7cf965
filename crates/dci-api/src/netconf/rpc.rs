// RPC rendering and minimal reply inspection.
//
// Replies are only ever probed for a handful of well-known elements
// (`ok`, `data`, `rpc-error` and its children), so a namespace-prefix
// tolerant scanner is enough; payload XML is produced by drivers and passed
// through verbatim.

use std::fmt::Write as _;

use super::{BASE_1_0, Datastore, EditConfig};

/// Client `<hello>` advertising base:1.0.
pub fn client_hello() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{BASE_1_0}"><capabilities><capability>{BASE_1_0}</capability></capabilities></hello>"#
    )
}

/// Wrap an operation element in `<rpc message-id="..">`.
pub fn envelope(message_id: u64, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{message_id}" xmlns="{BASE_1_0}">{body}</rpc>"#
    )
}

pub fn lock(target: Datastore) -> String {
    format!("<lock><target><{target}/></target></lock>")
}

pub fn unlock(target: Datastore) -> String {
    format!("<unlock><target><{target}/></target></unlock>")
}

pub fn discard_changes() -> String {
    "<discard-changes/>".to_owned()
}

pub fn validate(source: Datastore) -> String {
    format!("<validate><source><{source}/></source></validate>")
}

pub fn commit() -> String {
    "<commit/>".to_owned()
}

pub fn close_session() -> String {
    "<close-session/>".to_owned()
}

pub fn edit_config(edit: &EditConfig) -> String {
    let mut out = format!("<edit-config><target><{}/></target>", edit.target);
    if let Some(op) = edit.default_operation {
        let _ = write!(out, "<default-operation>{}</default-operation>", op.as_str());
    }
    if let Some(test) = edit.test_option {
        let _ = write!(out, "<test-option>{}</test-option>", test.as_str());
    }
    if let Some(err) = edit.error_option {
        let _ = write!(out, "<error-option>{}</error-option>", err.as_str());
    }
    let _ = write!(out, "<config>{}</config></edit-config>", edit.config);
    out
}

pub fn get(filter: Option<&str>) -> String {
    match filter {
        Some(f) => format!(r#"<get><filter type="subtree">{f}</filter></get>"#),
        None => "<get/>".to_owned(),
    }
}

pub fn get_config(source: Datastore, filter: Option<&str>) -> String {
    match filter {
        Some(f) => format!(
            r#"<get-config><source><{source}/></source><filter type="subtree">{f}</filter></get-config>"#
        ),
        None => format!("<get-config><source><{source}/></source></get-config>"),
    }
}

/// Escape text for inclusion in an XML element body or attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Reply scanning ──────────────────────────────────────────────────

/// Local name of a tag, with any namespace prefix stripped.
fn local_name(tag: &str) -> &str {
    tag.rsplit_once(':').map_or(tag, |(_, local)| local)
}

/// Inner text of the first element whose local name is `local`.
///
/// Self-closing elements yield `Some("")`.
pub fn element_text<'a>(xml: &'a str, local: &str) -> Option<&'a str> {
    element_span(xml, local).map(|(start, end)| &xml[start..end])
}

/// Byte range of the first matching element's body.
fn element_span(xml: &str, local: &str) -> Option<(usize, usize)> {
    let mut search = 0;
    while let Some(rel) = xml[search..].find('<') {
        let open = search + rel;
        let rest = &xml[open + 1..];
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        search = open + 1;

        if name.is_empty() || name.starts_with(['/', '?', '!']) || local_name(name) != local {
            continue;
        }

        let tag_end = open + 1 + rest.find('>')?;
        if xml[..tag_end].ends_with('/') {
            return Some((tag_end, tag_end));
        }
        let body_start = tag_end + 1;
        return find_close(&xml[body_start..], local).map(|end| (body_start, body_start + end));
    }
    None
}

fn find_close(xml: &str, local: &str) -> Option<usize> {
    let mut search = 0;
    while let Some(rel) = xml[search..].find("</") {
        let at = search + rel;
        let rest = &xml[at + 2..];
        let name = &rest[..rest.find('>')?];
        if local_name(name.trim()) == local {
            return Some(at);
        }
        search = at + 2;
    }
    None
}

/// Inner text of every element whose local name is `local`, in document
/// order. Nested matches are not descended into.
pub fn element_texts<'a>(xml: &'a str, local: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some((start, end)) = element_span(&xml[offset..], local) {
        found.push(&xml[offset + start..offset + end]);
        offset += end.max(start) + 1;
        if offset >= xml.len() {
            break;
        }
    }
    found
}

/// Every `<capability>` advertised in a server hello.
pub fn hello_capabilities(hello: &str) -> Vec<String> {
    element_texts(hello, "capability")
        .into_iter()
        .map(|c| c.trim().to_owned())
        .collect()
}

/// `<session-id>` from a server hello.
pub fn hello_session_id(hello: &str) -> Option<u32> {
    element_text(hello, "session-id")?.trim().parse().ok()
}
