//! Synthetic value library: one generator per catalog category.
//!
//! `want_valid = true` produces a value satisfying the category's structural
//! or checksum rule; `want_valid = false` produces the category's fixed
//! placeholder. Generator failures never escape: they degrade to the generic
//! fallback and are reported through [`ValueOrigin::FailedOver`].

pub mod builtin;
pub mod checksum;
pub mod fallback;
pub mod shaped;

use std::collections::HashMap;

use rand::RngCore;
use sitcorpus_core::{Category, ValueKind};
use tracing::warn;

use crate::context::GenerationContext;
use crate::errors::GenerationError;

pub use builtin::{BUILTIN_IDS, builtin_kind};
pub use checksum::{
    CpfGenerator, IbanGenerator, LuhnGenerator, cpf_is_valid, iban_checksum, iban_is_valid,
    luhn_check_digit, luhn_is_valid,
};
pub use fallback::{FallbackGenerator, fallback_redacted, fallback_token};
pub use shaped::{DigitsGenerator, Ipv4Generator, PatternGenerator};

/// A value generator for one category.
pub trait ValueGenerator: Send + Sync {
    /// Generator kind, used for usage accounting.
    fn kind(&self) -> &'static str;
    /// Draw a structurally valid value from `rng`.
    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError>;
    /// Fixed placeholder; never random.
    fn placeholder(&self) -> String;
}

/// Where a generated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    Generated,
    Placeholder,
    /// Category has no registered generator.
    Fallback,
    /// The registered generator failed; the generic fallback was used.
    FailedOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedValue {
    pub value: String,
    pub origin: ValueOrigin,
    pub kind: &'static str,
}

struct Entry {
    generator: Box<dyn ValueGenerator>,
    fallback: FallbackGenerator,
}

/// Category id to generator map, built once per run from the catalog.
pub struct ValueLibrary {
    entries: HashMap<String, Entry>,
}

impl ValueLibrary {
    pub fn new(catalog: &[Category]) -> Self {
        let entries = catalog
            .iter()
            .map(|category| {
                let entry = Entry {
                    generator: build_generator(category),
                    fallback: FallbackGenerator::new(&category.id, category.display_name()),
                };
                (category.id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Value for `sit_id`; see [`ValueLibrary::generate_value`] for provenance.
    pub fn generate(&self, sit_id: &str, want_valid: bool, ctx: &mut GenerationContext) -> String {
        self.generate_value(sit_id, want_valid, ctx).value
    }

    pub fn generate_value(
        &self,
        sit_id: &str,
        want_valid: bool,
        ctx: &mut GenerationContext,
    ) -> GeneratedValue {
        let Some(entry) = self.entries.get(sit_id) else {
            let fallback = FallbackGenerator::new(sit_id, sit_id);
            return GeneratedValue {
                value: fallback_value(&fallback, want_valid),
                origin: ValueOrigin::Fallback,
                kind: fallback.kind(),
            };
        };

        let kind = entry.generator.kind();
        if !want_valid {
            let origin = if kind == "fallback" {
                ValueOrigin::Fallback
            } else {
                ValueOrigin::Placeholder
            };
            return GeneratedValue {
                value: entry.generator.placeholder(),
                origin,
                kind,
            };
        }

        match entry.generator.valid(ctx.rng()) {
            Ok(value) if kind == "fallback" => GeneratedValue {
                value,
                origin: ValueOrigin::Fallback,
                kind,
            },
            Ok(value) => GeneratedValue {
                value,
                origin: ValueOrigin::Generated,
                kind,
            },
            Err(err) => {
                warn!(sit_id, kind, error = %err, "generator failed; using fallback");
                GeneratedValue {
                    value: fallback_value(&entry.fallback, true),
                    origin: ValueOrigin::FailedOver,
                    kind,
                }
            }
        }
    }

    pub fn kind_of(&self, sit_id: &str) -> &'static str {
        self.entries
            .get(sit_id)
            .map(|entry| entry.generator.kind())
            .unwrap_or("fallback")
    }

    pub fn contains(&self, sit_id: &str) -> bool {
        self.entries.contains_key(sit_id)
    }
}

impl std::fmt::Debug for ValueLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.generator.kind()))
            .collect();
        kinds.sort_unstable();
        f.debug_struct("ValueLibrary").field("entries", &kinds).finish()
    }
}

/// Explicit catalog generator first, then the built-in table, then the fallback.
pub fn build_generator(category: &Category) -> Box<dyn ValueGenerator> {
    let kind = category
        .generator
        .clone()
        .or_else(|| builtin_kind(&category.id))
        .unwrap_or(ValueKind::Fallback);
    generator_for_kind(category, kind)
}

fn generator_for_kind(category: &Category, kind: ValueKind) -> Box<dyn ValueGenerator> {
    let id = category.id.as_str();
    match kind {
        ValueKind::Luhn {
            issuers,
            length,
            placeholder,
        } => Box::new(LuhnGenerator::new(id, issuers, length, placeholder)),
        ValueKind::Iban {
            country,
            body_len,
            placeholder,
        } => Box::new(IbanGenerator::new(id, country, body_len, placeholder)),
        ValueKind::Cpf { placeholder } => Box::new(CpfGenerator::new(placeholder)),
        ValueKind::Pattern {
            pattern,
            placeholder,
        } => Box::new(PatternGenerator::new(id, &pattern, &placeholder)),
        ValueKind::Digits {
            min_len,
            max_len,
            placeholder,
        } => Box::new(DigitsGenerator::new(id, min_len, max_len, &placeholder)),
        ValueKind::Ipv4 { placeholder } => Box::new(Ipv4Generator::new(&placeholder)),
        ValueKind::Fallback => Box::new(FallbackGenerator::new(id, category.display_name())),
    }
}

fn fallback_value(fallback: &FallbackGenerator, want_valid: bool) -> String {
    if want_valid {
        fallback.token().to_string()
    } else {
        fallback.placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Category> {
        vec![
            Category::new("SIT_CCN", "Credit Card Number"),
            Category::new("SIT_IBAN", "IBAN"),
            Category::new("SIT_BADGE", "Employee Badge"),
            Category::new("SIT_BROKEN", "Broken Shape").with_generator(ValueKind::Pattern {
                pattern: "([A-Z".to_string(),
                placeholder: "XXXX".to_string(),
            }),
        ]
    }

    #[test]
    fn valid_values_follow_checksums() {
        let library = ValueLibrary::new(&catalog());
        let mut ctx = GenerationContext::new(1);
        for _ in 0..50 {
            assert!(luhn_is_valid(&library.generate("SIT_CCN", true, &mut ctx)));
            assert!(iban_is_valid(&library.generate("SIT_IBAN", true, &mut ctx)));
        }
    }

    #[test]
    fn placeholders_are_fixed_per_category() {
        let library = ValueLibrary::new(&catalog());
        let mut first = GenerationContext::new(1);
        let mut second = GenerationContext::new(999);
        for id in ["SIT_CCN", "SIT_IBAN", "SIT_BADGE"] {
            let a = library.generate(id, false, &mut first);
            let b = library.generate(id, false, &mut second);
            assert_eq!(a, b);
        }
        assert_eq!(
            library.generate("SIT_CCN", false, &mut first),
            "0000 0000 0000 0000"
        );
    }

    #[test]
    fn unregistered_category_uses_generic_tokens() {
        let library = ValueLibrary::new(&catalog());
        let mut ctx = GenerationContext::new(1);
        let valid = library.generate_value("SIT_BADGE", true, &mut ctx);
        assert_eq!(valid.value, "<EMPLOYEE_BADGE_VALUE>");
        assert_eq!(valid.origin, ValueOrigin::Fallback);
        assert_eq!(
            library.generate("SIT_BADGE", false, &mut ctx),
            "REDACTED_SIT_BADGE"
        );
        assert_eq!(
            library.generate("SIT_NOT_IN_CATALOG", false, &mut ctx),
            "REDACTED_SIT_NOT_IN_CATALOG"
        );
    }

    #[test]
    fn failing_generator_fails_over_to_fallback() {
        let library = ValueLibrary::new(&catalog());
        let mut ctx = GenerationContext::new(1);
        let value = library.generate_value("SIT_BROKEN", true, &mut ctx);
        assert_eq!(value.origin, ValueOrigin::FailedOver);
        assert_eq!(value.value, "<BROKEN_SHAPE_VALUE>");
        assert_eq!(library.generate("SIT_BROKEN", false, &mut ctx), "XXXX");
    }

    #[test]
    fn same_seed_gives_same_values() {
        let library = ValueLibrary::new(&catalog());
        let mut a = GenerationContext::for_document(10, 3);
        let mut b = GenerationContext::for_document(10, 3);
        for id in ["SIT_CCN", "SIT_IBAN"] {
            assert_eq!(
                library.generate(id, true, &mut a),
                library.generate(id, true, &mut b)
            );
        }
    }
}
