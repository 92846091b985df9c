use rand::RngCore;

use crate::errors::GenerationError;
use crate::generators::ValueGenerator;

/// Generic strategy for categories without a registered generator.
///
/// A requested valid value becomes a template token such as
/// `<EMPLOYEE_ID_VALUE>`; a placeholder becomes `REDACTED_<ID>`.
pub struct FallbackGenerator {
    token: String,
    redacted: String,
}

impl FallbackGenerator {
    pub fn new(sit_id: &str, display_name: &str) -> Self {
        Self {
            token: fallback_token(display_name),
            redacted: fallback_redacted(sit_id),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl ValueGenerator for FallbackGenerator {
    fn kind(&self) -> &'static str {
        "fallback"
    }

    fn valid(&self, _rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        Ok(self.token.clone())
    }

    fn placeholder(&self) -> String {
        self.redacted.clone()
    }
}

pub fn fallback_token(display_name: &str) -> String {
    format!("<{}_VALUE>", display_name.trim().replace(' ', "_").to_uppercase())
}

pub fn fallback_redacted(sit_id: &str) -> String {
    format!("REDACTED_{sit_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_use_display_name_and_id() {
        assert_eq!(fallback_token("Employee Badge"), "<EMPLOYEE_BADGE_VALUE>");
        assert_eq!(fallback_redacted("SIT_BADGE"), "REDACTED_SIT_BADGE");
    }
}
