use sitcorpus_core::ValueKind;
use sitcorpus_core::catalog::{
    default_iban_body_len, default_iban_country, default_luhn_issuers, default_luhn_length,
};

/// Built-in generator kinds keyed by well-known category id.
pub fn builtin_kind(sit_id: &str) -> Option<ValueKind> {
    let kind = match sit_id {
        "SIT_CCN" | "SIT_EU_DEBIT" => ValueKind::Luhn {
            issuers: default_luhn_issuers(),
            length: default_luhn_length(),
            placeholder: None,
        },
        "SIT_IBAN" => ValueKind::Iban {
            country: default_iban_country(),
            body_len: default_iban_body_len(),
            placeholder: None,
        },
        "SIT_BR_CPF" => ValueKind::Cpf { placeholder: None },
        "SIT_SSN" | "SIT_ITIN" => pattern("[1-8][0-9]{2}-[1-9][0-9]-[1-9][0-9]{3}", "XXX-XX-XXXX"),
        "SIT_PASSPORT_US_UK" | "SIT_CAN_PASSPORT" => pattern("[A-Z][0-9]{7}", "XXXXXXXX"),
        "SIT_AUS_PASSPORT" => pattern("[A-Z][0-9]{7}", "A0000000"),
        "SIT_DRIVER_US" => pattern("[A-Z][0-9]{6}[A-Z]", "XXXXXXX"),
        "SIT_CAN_DRIVER" => pattern("[A-Z]{2}[0-9]{6}", "XXXXXX"),
        "SIT_AUS_DRIVER" => pattern("[A-Z]{2}-[0-9]{6}", "XXXX-000000"),
        "SIT_DEA" => pattern("[A-Z]{2}[0-9]{7}", "ZZ0000000"),
        "SIT_ICD10" => pattern("[A-TV-Z][0-9]{2}", "X00"),
        "SIT_ICD9" => pattern(r"[1-9][0-9]{2}\.[0-9]{1,2}", "000"),
        "SIT_SWIFT" => pattern("[A-Z]{6}[A-Z0-9]{2}", "XXXXXX"),
        "SIT_CAN_SIN" => pattern("[1-9][0-9]{2}-[1-9][0-9]{2}-[1-9][0-9]{2}", "000-000-000"),
        "SIT_BR_RG" => pattern(
            r"[1-9][0-9]\.[1-9][0-9]{2}\.[1-9][0-9]{2}-[0-9]",
            "00.000.000-0",
        ),
        "SIT_UK_NINO" => pattern("[ABCEGHJKLMNOPRSTWXYZ]{2}[0-9]{6}[A-D]", "QQ000000C"),
        "SIT_AZURE_SAS" => pattern("sig=[A-Za-z0-9]{43}%3D", "sig=XXXXX"),
        "SIT_BANK_US" => digits(6, 17, "0000000"),
        "SIT_CAN_BANK" => digits(7, 12, "0000000"),
        "SIT_AUS_BANK" => digits(6, 9, "0000000"),
        "SIT_AUS_MEDACC" => digits(6, 12, "0000000"),
        "SIT_ABA" => digits(9, 9, "000000000"),
        "SIT_AUS_TFN" => digits(8, 8, "00000000"),
        "SIT_CAN_PHIN" | "SIT_CAN_HEALTH" => digits(9, 9, "000000000"),
        "SIT_FR_INSEE" => digits(13, 13, "0000000000000"),
        "SIT_IP" => ValueKind::Ipv4 {
            placeholder: "000.000.000.000".to_string(),
        },
        _ => return None,
    };
    Some(kind)
}

/// Ids with a built-in generator, in table order.
pub const BUILTIN_IDS: &[&str] = &[
    "SIT_CCN",
    "SIT_EU_DEBIT",
    "SIT_IBAN",
    "SIT_BR_CPF",
    "SIT_SSN",
    "SIT_ITIN",
    "SIT_PASSPORT_US_UK",
    "SIT_CAN_PASSPORT",
    "SIT_AUS_PASSPORT",
    "SIT_DRIVER_US",
    "SIT_CAN_DRIVER",
    "SIT_AUS_DRIVER",
    "SIT_DEA",
    "SIT_ICD10",
    "SIT_ICD9",
    "SIT_SWIFT",
    "SIT_CAN_SIN",
    "SIT_BR_RG",
    "SIT_UK_NINO",
    "SIT_AZURE_SAS",
    "SIT_BANK_US",
    "SIT_CAN_BANK",
    "SIT_AUS_BANK",
    "SIT_AUS_MEDACC",
    "SIT_ABA",
    "SIT_AUS_TFN",
    "SIT_CAN_PHIN",
    "SIT_CAN_HEALTH",
    "SIT_FR_INSEE",
    "SIT_IP",
];

fn pattern(pattern: &str, placeholder: &str) -> ValueKind {
    ValueKind::Pattern {
        pattern: pattern.to_string(),
        placeholder: placeholder.to_string(),
    }
}

fn digits(min_len: usize, max_len: usize, placeholder: &str) -> ValueKind {
    ValueKind::Digits {
        min_len,
        max_len,
        placeholder: placeholder.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_id_has_a_kind() {
        for id in BUILTIN_IDS {
            assert!(builtin_kind(id).is_some(), "{id}");
        }
        assert!(builtin_kind("SIT_UNKNOWN").is_none());
    }
}
