//! Value objects for the Patient context.

use serde::{Deserialize, Serialize};

/// An account with a private health fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateHealthFundAccount {
    /// Name of the fund provider.
    pub provider_name: String,
    /// Membership or account number with the provider.
    pub account_number: String,
}

impl PrivateHealthFundAccount {
    /// Returns `true` if this account has the given provider and number,
    /// ignoring case.
    #[must_use]
    pub fn matches(&self, provider_name: &str, account_number: &str) -> bool {
        self.provider_name.to_lowercase() == provider_name.to_lowercase()
            && self.account_number.to_lowercase() == account_number.to_lowercase()
    }
}

/// Medicare card and private health fund details of a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalAidDetails {
    /// Medicare card number.
    pub medicare_card_number: Option<String>,
    /// Position of the patient on the Medicare card.
    pub medicare_card_reference_number: Option<i32>,
    /// Private health fund accounts, in the order they were added.
    #[serde(default)]
    pub private_health_fund_accounts: Vec<PrivateHealthFundAccount>,
}

impl MedicalAidDetails {
    /// Returns `true` if an account with this provider and number already
    /// exists, ignoring case.
    #[must_use]
    pub fn has_account(&self, provider_name: &str, account_number: &str) -> bool {
        self.private_health_fund_accounts
            .iter()
            .any(|a| a.matches(provider_name, account_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_match_ignores_case() {
        let account = PrivateHealthFundAccount {
            provider_name: "Bupa".to_owned(),
            account_number: "AB-123".to_owned(),
        };

        assert!(account.matches("BUPA", "ab-123"));
        assert!(!account.matches("Bupa", "AB-124"));
        assert!(!account.matches("Medibank", "AB-123"));
    }

    #[test]
    fn test_missing_accounts_field_defaults_to_empty() {
        let json = serde_json::json!({
            "medicare_card_number": "2123456701",
            "medicare_card_reference_number": 1
        });

        let details: MedicalAidDetails = serde_json::from_value(json).unwrap();

        assert!(details.private_health_fund_accounts.is_empty());
        assert_eq!(details.medicare_card_reference_number, Some(1));
    }
}
