//! Static HTML index of stored messages
//!
//! The page is regenerated from a fresh listing every time and written over
//! `index.html`. Concurrent rebuilds race; the last writer wins and each
//! write is a complete snapshot of one listing.

use crate::error::{Result, WriterError};
use crate::key::{is_message_key, INDEX_KEY, MESSAGE_PREFIX};
use crate::storage::{ObjectEntry, ObjectStore, PutRequest};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

const INDEX_TITLE: &str = "Stored Messages";

/// Summary of a successful rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub entries: usize,
}

#[derive(Clone)]
pub struct IndexRebuilder {
    store: Arc<dyn ObjectStore>,
}

impl IndexRebuilder {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List `messages/` and overwrite `index.html`.
    ///
    /// Callers treat the error as non-fatal; the index is a derived artifact.
    pub async fn rebuild(&self) -> Result<IndexReport> {
        let listing = self
            .store
            .list(MESSAGE_PREFIX)
            .await
            .map_err(WriterError::index_rebuild)?;

        let mut entries: Vec<ObjectEntry> = listing
            .into_iter()
            .filter(|entry| is_message_key(&entry.key))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let html = render_index(&entries);
        self.store
            .put(PutRequest {
                key: INDEX_KEY.to_string(),
                body: html.into_bytes(),
                content_type: "text/html",
                metadata: HashMap::new(),
            })
            .await
            .map_err(WriterError::index_rebuild)?;

        tracing::debug!(entries = entries.len(), "Rebuilt {}", INDEX_KEY);
        Ok(IndexReport {
            entries: entries.len(),
        })
    }
}

/// Render the listing page for already-filtered entries
pub fn render_index(entries: &[ObjectEntry]) -> String {
    let mut html = String::with_capacity(256 + entries.len() * 160);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "  <title>{}</title>", INDEX_TITLE);
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "  <h1>{}</h1>", INDEX_TITLE);
    html.push_str("  <ul>\n");

    for entry in entries {
        let name = entry.key.rsplit('/').next().unwrap_or(&entry.key);
        let modified = entry.last_modified.as_deref().unwrap_or("unknown");
        let _ = writeln!(
            html,
            "    <li><a href=\"{}\">{}</a> ({})</li>",
            html_escape(&entry.key),
            html_escape(name),
            html_escape(modified)
        );
    }

    html.push_str("  </ul>\n</body>\n</html>\n");
    html
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
