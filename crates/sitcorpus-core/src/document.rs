use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Expected outcome for a category inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// The document must contain a valid-looking instance.
    #[serde(rename = "TP")]
    Tp,
    /// The document must not contain a valid-looking instance.
    #[serde(rename = "FP")]
    Fp,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Tp => "TP",
            Label::Fp => "FP",
        }
    }

    pub fn wants_valid(self) -> bool {
        matches!(self, Label::Tp)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TP" => Ok(Label::Tp),
            "FP" => Ok(Label::Fp),
            other => Err(format!("unknown label '{other}'")),
        }
    }
}

/// Coarse confidence tier derived from label and instance count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }

    /// Tier rules: TP at or above `high_min_instances` is High, TP with 3..=5 is
    /// Medium, FP with 3 or more is Medium, everything else is Low.
    pub fn derive(label: Label, instances: u32, high_min_instances: u32) -> Self {
        match label {
            Label::Tp if instances >= high_min_instances => Confidence::High,
            Label::Tp if (3..=5).contains(&instances) => Confidence::Medium,
            Label::Tp => Confidence::Low,
            Label::Fp if instances >= 3 => Confidence::Medium,
            Label::Fp => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of document layouts the renderer knows how to compose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[serde(alias = "pdf")]
    Document,
    Email,
    Chat,
    EmailWithAttachment,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Document => "document",
            DocumentFormat::Email => "email",
            DocumentFormat::Chat => "chat",
            DocumentFormat::EmailWithAttachment => "email_with_attachment",
        }
    }

    pub fn is_email(self) -> bool {
        matches!(
            self,
            DocumentFormat::Email | DocumentFormat::EmailWithAttachment
        )
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "document" | "pdf" => Ok(DocumentFormat::Document),
            "email" => Ok(DocumentFormat::Email),
            "chat" => Ok(DocumentFormat::Chat),
            "email_with_attachment" => Ok(DocumentFormat::EmailWithAttachment),
            other => Err(format!("unknown document format '{other}'")),
        }
    }
}

/// One category assigned to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitAssignment {
    pub sit_id: String,
    pub sit_name: String,
    pub label: Label,
    pub instances: u32,
    pub confidence: Confidence,
    #[serde(default)]
    pub tcs: Vec<String>,
}

/// A planned document. Immutable once emitted by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPlan {
    pub doc_id: u64,
    pub filename: String,
    pub format: DocumentFormat,
    pub word_count_target: u64,
    pub sits: Vec<SitAssignment>,
    pub created_at: DateTime<Utc>,
}

impl DocumentPlan {
    /// Filename convention: zero padded id plus format, unique per doc id.
    pub fn filename_for(doc_id: u64, format: DocumentFormat) -> String {
        format!("doc_{doc_id:05}_{}.txt", format.as_str())
    }

    /// Filename without its extension, used to name sibling representations.
    pub fn stem(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.filename)
    }

    pub fn sit_ids(&self) -> Vec<&str> {
        self.sits.iter().map(|sit| sit.sit_id.as_str()).collect()
    }

    /// Union of test-case tags across assignments, sorted.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.sits
            .iter()
            .flat_map(|sit| sit.tcs.iter().map(String::as_str))
            .collect()
    }
}
