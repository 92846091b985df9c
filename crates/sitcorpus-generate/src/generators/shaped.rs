use fake::Fake;
use fake::faker::internet::en::IPv4;
use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;

use crate::errors::GenerationError;
use crate::generators::ValueGenerator;

const DEFAULT_MAX_REPEAT: u32 = 32;

/// Value sampled from a regular expression describing the real-world shape.
pub struct PatternGenerator {
    sit_id: String,
    pattern: String,
    compiled: Result<RandRegex, String>,
    placeholder: String,
}

impl PatternGenerator {
    pub fn new(sit_id: &str, pattern: &str, placeholder: &str) -> Self {
        let compiled =
            RandRegex::compile(pattern, DEFAULT_MAX_REPEAT).map_err(|err| err.to_string());
        Self {
            sit_id: sit_id.to_string(),
            pattern: pattern.to_string(),
            compiled,
            placeholder: placeholder.to_string(),
        }
    }
}

impl ValueGenerator for PatternGenerator {
    fn kind(&self) -> &'static str {
        "pattern"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        let regex = self
            .compiled
            .as_ref()
            .map_err(|err| GenerationError::InvalidGenerator {
                sit_id: self.sit_id.clone(),
                message: format!("invalid shape pattern '{}': {err}", self.pattern),
            })?;
        let value: String = rng.sample(regex);
        Ok(value)
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

/// Digit run with a random length. The first digit is never zero.
pub struct DigitsGenerator {
    sit_id: String,
    min_len: usize,
    max_len: usize,
    placeholder: String,
}

impl DigitsGenerator {
    pub fn new(sit_id: &str, min_len: usize, max_len: usize, placeholder: &str) -> Self {
        Self {
            sit_id: sit_id.to_string(),
            min_len,
            max_len,
            placeholder: placeholder.to_string(),
        }
    }
}

impl ValueGenerator for DigitsGenerator {
    fn kind(&self) -> &'static str {
        "digits"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        if self.min_len == 0 || self.min_len > self.max_len {
            return Err(GenerationError::InvalidGenerator {
                sit_id: self.sit_id.clone(),
                message: format!(
                    "digit run needs 0 < min_len <= max_len (got {}..={})",
                    self.min_len, self.max_len
                ),
            });
        }
        let len = rng.random_range(self.min_len..=self.max_len);
        let mut value = String::with_capacity(len);
        value.push(char::from(b'0' + rng.random_range(1..=9u8)));
        for _ in 1..len {
            value.push(char::from(b'0' + rng.random_range(0..=9u8)));
        }
        Ok(value)
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

/// Dotted-quad IPv4 address drawn from `fake`.
pub struct Ipv4Generator {
    placeholder: String,
}

impl Ipv4Generator {
    pub fn new(placeholder: &str) -> Self {
        Self {
            placeholder: placeholder.to_string(),
        }
    }
}

impl ValueGenerator for Ipv4Generator {
    fn kind(&self) -> &'static str {
        "ipv4"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        let value: String = IPv4().fake_with_rng(rng);
        Ok(value)
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn pattern_values_follow_the_shape() {
        let generator = PatternGenerator::new(
            "SIT_SSN",
            "[1-8][0-9]{2}-[1-9][0-9]-[1-9][0-9]{3}",
            "XXX-XX-XXXX",
        );
        let check = regex::Regex::new(r"^\d{3}-\d{2}-\d{4}$").expect("regex");
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..50 {
            let value = generator.valid(&mut rng).expect("value");
            assert!(check.is_match(&value), "{value}");
        }
    }

    #[test]
    fn broken_pattern_reports_an_error_instead_of_panicking() {
        let generator = PatternGenerator::new("SIT_BAD", "([a-z", "XXXX");
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(generator.valid(&mut rng).is_err());
        assert_eq!(generator.placeholder(), "XXXX");
    }

    #[test]
    fn digit_runs_respect_length_bounds() {
        let generator = DigitsGenerator::new("SIT_BANK_US", 6, 17, "0000000");
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let value = generator.valid(&mut rng).expect("digits");
            assert!((6..=17).contains(&value.len()));
            assert!(value.bytes().all(|b| b.is_ascii_digit()));
            assert!(!value.starts_with('0'));
        }
    }

    #[test]
    fn ipv4_values_have_four_octets() {
        let generator = Ipv4Generator::new("000.000.000.000");
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let value = generator.valid(&mut rng).expect("ip");
        let octets: Vec<&str> = value.split('.').collect();
        assert_eq!(octets.len(), 4);
        assert!(octets.iter().all(|octet| octet.parse::<u8>().is_ok()));
    }
}
