use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A sensitive information type as declared in the corpus catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    /// Stable identifier (ex.: `SIT_CCN`).
    pub id: String,
    /// Human readable name used in rendered documents.
    #[serde(default, alias = "display_name")]
    pub name: String,
    /// Test-case tags associated with the category.
    #[serde(default, alias = "tags")]
    pub tc: Vec<String>,
    /// Extraction pattern used by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Explicit generator; when absent the built-in table keyed by id applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<ValueKind>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tc: Vec::new(),
            regex: None,
            generator: None,
        }
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tc = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_generator(mut self, generator: ValueKind) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Name shown in documents; falls back to the id when the catalog omits it.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Closed set of value generator kinds a category can map to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueKind {
    /// Payment-card-like number with a mod-10 check digit.
    Luhn {
        /// Issuer families; one family is drawn, then one prefix inside it.
        #[serde(default = "default_luhn_issuers")]
        issuers: Vec<Vec<String>>,
        #[serde(default = "default_luhn_length")]
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    /// IBAN-style account identifier with a mod-97 checksum.
    Iban {
        #[serde(default = "default_iban_country")]
        country: String,
        #[serde(default = "default_iban_body_len")]
        body_len: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    /// Brazilian CPF with both mod-11 check digits.
    Cpf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    /// Value sampled from a regular expression shape.
    Pattern {
        pattern: String,
        placeholder: String,
    },
    /// Digit run with a random length inside `[min_len, max_len]`.
    Digits {
        min_len: usize,
        max_len: usize,
        placeholder: String,
    },
    /// Dotted-quad IPv4 address.
    Ipv4 { placeholder: String },
    /// Generic placeholder strategy.
    Fallback,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Luhn { .. } => "luhn",
            ValueKind::Iban { .. } => "iban",
            ValueKind::Cpf { .. } => "cpf",
            ValueKind::Pattern { .. } => "pattern",
            ValueKind::Digits { .. } => "digits",
            ValueKind::Ipv4 { .. } => "ipv4",
            ValueKind::Fallback => "fallback",
        }
    }
}

pub fn default_luhn_issuers() -> Vec<Vec<String>> {
    vec![
        vec!["4".to_string()],
        ["51", "52", "53", "54", "55"]
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
    ]
}

pub fn default_luhn_length() -> usize {
    16
}

pub fn default_iban_country() -> String {
    "GB".to_string()
}

pub fn default_iban_body_len() -> usize {
    16
}

/// Find a category by id.
pub fn find_category<'a>(catalog: &'a [Category], id: &str) -> Option<&'a Category> {
    catalog.iter().find(|category| category.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_id() {
        let category = Category::new("SIT_X", " ");
        assert_eq!(category.display_name(), "SIT_X");
    }

    #[test]
    fn parses_tagged_generator_with_defaults() {
        let json = r#"{"id":"SIT_CCN","name":"Credit Card","tc":["TC1"],"generator":{"kind":"luhn"}}"#;
        let category: Category = serde_json::from_str(json).expect("parse category");
        match category.generator {
            Some(ValueKind::Luhn {
                issuers, length, ..
            }) => {
                assert_eq!(length, 16);
                assert_eq!(issuers.len(), 2);
            }
            other => panic!("unexpected generator {other:?}"),
        }
    }
}
