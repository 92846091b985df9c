//! Document representations: turn rendered text into file bytes and recover
//! the text again.
//!
//! Extraction never fails; an unreadable artifact degrades to empty text,
//! which validation then sees as "no matches".

use std::path::Path;

use chrono::Utc;

use crate::document::{DocumentFormat, DocumentPlan};
use crate::error::Result;

const DEFAULT_FROM: &str = "no-reply@example.com";
const DEFAULT_TO: &str = "recipient@example.com";

/// A file attached to a representation (ex.: the CSV carried by an e-mail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Rendered text plus the plan it came from.
#[derive(Debug, Clone, Copy)]
pub struct RenderedDocument<'a> {
    pub plan: &'a DocumentPlan,
    pub text: &'a str,
    pub attachments: &'a [Attachment],
}

/// Text-to-bytes conversion and its inverse.
pub trait Representation: Send + Sync {
    /// Stable identifier (ex.: `eml`).
    fn id(&self) -> &'static str;
    /// Ledger column that records the artifact path.
    fn column(&self) -> &'static str;
    /// File extension without the dot.
    fn extension(&self) -> &'static str;
    fn applies_to(&self, format: DocumentFormat) -> bool;
    fn encode(&self, doc: &RenderedDocument<'_>) -> Result<Vec<u8>>;
    fn extract_text(&self, bytes: &[u8]) -> String;
}

/// UTF-8 text file; the representation every document gets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Representation for PlainText {
    fn id(&self) -> &'static str {
        "txt"
    }

    fn column(&self) -> &'static str {
        "actual_file_path"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn applies_to(&self, _format: DocumentFormat) -> bool {
        true
    }

    fn encode(&self, doc: &RenderedDocument<'_>) -> Result<Vec<u8>> {
        Ok(doc.text.as_bytes().to_vec())
    }

    fn extract_text(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// RFC 822 style message; multipart when attachments are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmlMessage;

impl Representation for EmlMessage {
    fn id(&self) -> &'static str {
        "eml"
    }

    fn column(&self) -> &'static str {
        "eml_path"
    }

    fn extension(&self) -> &'static str {
        "eml"
    }

    fn applies_to(&self, format: DocumentFormat) -> bool {
        format.is_email()
    }

    fn encode(&self, doc: &RenderedDocument<'_>) -> Result<Vec<u8>> {
        let headers = MessageHeaders::from_text(doc.text, doc.plan.stem());
        let mut out = String::new();
        push_header(&mut out, "Subject", &headers.subject);
        push_header(&mut out, "From", &headers.from);
        push_header(&mut out, "To", &headers.to);
        push_header(&mut out, "Date", &Utc::now().to_rfc2822());
        push_header(&mut out, "MIME-Version", "1.0");

        if doc.attachments.is_empty() {
            push_header(&mut out, "Content-Type", "text/plain; charset=utf-8");
            push_header(&mut out, "Content-Transfer-Encoding", "8bit");
            out.push_str("\r\n");
            out.push_str(&crlf(doc.text));
            out.push_str("\r\n");
            return Ok(out.into_bytes());
        }

        let boundary = format!("=_sitcorpus_{:05}", doc.plan.doc_id);
        push_header(
            &mut out,
            "Content-Type",
            &format!("multipart/mixed; boundary=\"{boundary}\""),
        );
        out.push_str("\r\n");

        out.push_str(&format!("--{boundary}\r\n"));
        push_header(&mut out, "Content-Type", "text/plain; charset=utf-8");
        push_header(&mut out, "Content-Transfer-Encoding", "8bit");
        out.push_str("\r\n");
        out.push_str(&crlf(doc.text));
        out.push_str("\r\n");

        for attachment in doc.attachments {
            out.push_str(&format!("--{boundary}\r\n"));
            push_header(
                &mut out,
                "Content-Type",
                &format!("{}; name=\"{}\"", attachment.content_type, attachment.file_name),
            );
            push_header(
                &mut out,
                "Content-Disposition",
                &format!("attachment; filename=\"{}\"", attachment.file_name),
            );
            push_header(&mut out, "Content-Transfer-Encoding", "8bit");
            out.push_str("\r\n");
            out.push_str(&crlf(&String::from_utf8_lossy(&attachment.data)));
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        Ok(out.into_bytes())
    }

    fn extract_text(&self, bytes: &[u8]) -> String {
        let raw = String::from_utf8_lossy(bytes).replace("\r\n", "\n");
        let (headers, body) = split_entity(&raw);
        let content_type = header_value(&headers, "content-type").unwrap_or_default();

        if content_type.to_ascii_lowercase().starts_with("multipart/") {
            let Some(boundary) = boundary_param(&content_type) else {
                return String::new();
            };
            return multipart_text_parts(body, &boundary).join("\n");
        }

        if is_plain_text(&content_type) {
            body.trim_end_matches('\n').to_string()
        } else {
            String::new()
        }
    }
}

/// Representations shipped in-tree, plain text first.
pub fn default_representations() -> Vec<Box<dyn Representation>> {
    vec![Box::new(PlainText), Box::new(EmlMessage)]
}

/// Pick the representation that owns a file extension.
pub fn representation_for_path<'a>(
    representations: &'a [Box<dyn Representation>],
    path: &Path,
) -> Option<&'a dyn Representation> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    representations
        .iter()
        .find(|representation| representation.extension() == extension)
        .map(|representation| representation.as_ref())
}

struct MessageHeaders {
    subject: String,
    from: String,
    to: String,
}

impl MessageHeaders {
    /// Header lines already present in the rendered text win over defaults.
    fn from_text(text: &str, stem: &str) -> Self {
        let mut headers = Self {
            subject: format!("Automated message {stem}"),
            from: DEFAULT_FROM.to_string(),
            to: DEFAULT_TO.to_string(),
        };
        for line in text.lines().take_while(|line| !line.trim().is_empty()) {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "subject" => headers.subject = value,
                "from" => headers.from = value,
                "to" => headers.to = value,
                _ => {}
            }
        }
        headers
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    let value: String = value.chars().filter(|ch| *ch != '\r' && *ch != '\n').collect();
    out.push_str(name);
    out.push_str(": ");
    out.push_str(&value);
    out.push_str("\r\n");
}

fn crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Split an entity into unfolded header pairs and its body.
fn split_entity(raw: &str) -> (Vec<(String, String)>, &str) {
    let (head, body) = match raw.find("\n\n") {
        Some(idx) => (&raw[..idx], &raw[idx + 2..]),
        None => (raw, ""),
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    (headers, body)
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

fn is_plain_text(content_type: &str) -> bool {
    content_type.is_empty() || content_type.to_ascii_lowercase().starts_with("text/plain")
}

fn boundary_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn multipart_text_parts(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    body.split(delimiter.as_str())
        .skip(1)
        .take_while(|part| !part.starts_with("--"))
        .filter_map(|part| {
            let part = part.strip_prefix('\n').unwrap_or(part);
            let (headers, content) = split_entity(part);
            let content_type = header_value(&headers, "content-type").unwrap_or_default();
            let disposition = header_value(&headers, "content-disposition").unwrap_or_default();
            if is_plain_text(&content_type) && !disposition.to_ascii_lowercase().starts_with("attachment")
            {
                Some(content.trim_end_matches('\n').to_string())
            } else {
                None
            }
        })
        .collect()
}
