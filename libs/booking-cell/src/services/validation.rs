// =====================================================================================
// VALIDATION RULES - SYNCHRONOUS FIELD CHECKS, NO REMOTE CALLS
// =====================================================================================

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::models::{CardDetails, FieldIssue, PatientRegistration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    IdentityNumber,
    Phone,
    Email,
    PersonName,
    CardNumber,
    CardExpiry,
    CardCvv,
    BirthDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: &'static str,
}

impl RuleOutcome {
    fn pass() -> Self {
        Self {
            passed: true,
            message: "",
        }
    }

    fn fail(message: &'static str) -> Self {
        Self { passed: false, message }
    }
}

pub struct ValidationService {
    identity_number: Regex,
    phone: Regex,
    email: Regex,
    person_name: Regex,
    card_number: Regex,
    card_expiry: Regex,
    card_cvv: Regex,
}

impl ValidationService {
    pub fn new() -> Self {
        Self {
            identity_number: Regex::new(r"^\d{8}$").unwrap(),
            phone: Regex::new(r"^9\d{8}$").unwrap(),
            email: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap(),
            person_name: Regex::new(r"^[A-Za-zÁÉÍÓÚÜÑáéíóúüñ]+( [A-Za-zÁÉÍÓÚÜÑáéíóúüñ]+)*$")
                .unwrap(),
            card_number: Regex::new(r"^\d{16}$").unwrap(),
            card_expiry: Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").unwrap(),
            card_cvv: Regex::new(r"^\d{3,4}$").unwrap(),
        }
    }

    /// Evaluate one rule against a candidate value. Never panics; the outcome
    /// carries the canonical failure message for the rule.
    pub fn check(&self, rule: Rule, value: &str) -> RuleOutcome {
        let outcome = match rule {
            Rule::IdentityNumber => Self::matches(
                &self.identity_number,
                value,
                "identity number must be exactly 8 digits",
            ),
            Rule::Phone => Self::matches(
                &self.phone,
                value,
                "phone must be 9 digits starting with 9",
            ),
            Rule::Email => Self::matches(&self.email, value, "email address is not valid"),
            Rule::PersonName => Self::matches(
                &self.person_name,
                value,
                "name may only contain letters and spaces",
            ),
            Rule::CardNumber => Self::matches(
                &self.card_number,
                value,
                "card number must be exactly 16 digits",
            ),
            Rule::CardExpiry => Self::matches(
                &self.card_expiry,
                value,
                "card expiry must be in MM/YY format",
            ),
            Rule::CardCvv => Self::matches(&self.card_cvv, value, "CVV must be 3 or 4 digits"),
            Rule::BirthDate => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(date) if date <= chrono::Utc::now().date_naive() => RuleOutcome::pass(),
                Ok(_) => RuleOutcome::fail("birth date cannot be in the future"),
                Err(_) => RuleOutcome::fail("birth date must be a valid YYYY-MM-DD date"),
            },
        };

        if !outcome.passed {
            debug!("Validation rule {:?} failed: {}", rule, outcome.message);
        }
        outcome
    }

    fn matches(regex: &Regex, value: &str, message: &'static str) -> RuleOutcome {
        if regex.is_match(value) {
            RuleOutcome::pass()
        } else {
            RuleOutcome::fail(message)
        }
    }

    // ==============================================================================
    // SCHEMAS
    // ==============================================================================

    /// Patient search asks for the identity number only.
    pub fn validate_patient_search(&self, identity_number: &str) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        self.collect(&mut issues, "identity_number", Rule::IdentityNumber, identity_number);
        issues
    }

    /// Full registration form: all patient fields.
    pub fn validate_patient_registration(
        &self,
        registration: &PatientRegistration,
        today: NaiveDate,
    ) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        self.collect(
            &mut issues,
            "identity_number",
            Rule::IdentityNumber,
            &registration.identity_number,
        );
        self.collect(&mut issues, "given_names", Rule::PersonName, &registration.given_names);
        self.collect(
            &mut issues,
            "family_names",
            Rule::PersonName,
            &registration.family_names,
        );
        self.collect(&mut issues, "phone", Rule::Phone, &registration.phone);
        self.collect(&mut issues, "email", Rule::Email, &registration.email);
        if registration.birth_date > today {
            issues.push(FieldIssue {
                field: "birth_date".to_string(),
                message: "birth date cannot be in the future".to_string(),
            });
        }
        issues
    }

    pub fn validate_card(&self, card: &CardDetails) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        self.collect(&mut issues, "number", Rule::CardNumber, &card.number);
        self.collect(&mut issues, "holder_name", Rule::PersonName, &card.holder_name);
        self.collect(&mut issues, "expiry", Rule::CardExpiry, &card.expiry);
        self.collect(&mut issues, "cvv", Rule::CardCvv, &card.cvv);
        issues
    }

    fn collect(&self, issues: &mut Vec<FieldIssue>, field: &str, rule: Rule, value: &str) {
        let outcome = self.check(rule, value);
        if !outcome.passed {
            issues.push(FieldIssue {
                field: field.to_string(),
                message: outcome.message.to_string(),
            });
        }
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ValidationService {
        ValidationService::new()
    }

    #[test]
    fn test_identity_number_rule() {
        let v = service();
        assert!(v.check(Rule::IdentityNumber, "12345678").passed);
        assert!(!v.check(Rule::IdentityNumber, "1234567").passed);
        assert!(!v.check(Rule::IdentityNumber, "123456789").passed);
        assert!(!v.check(Rule::IdentityNumber, "1234567a").passed);
    }

    #[test]
    fn test_phone_rule_requires_leading_nine() {
        let v = service();
        assert!(v.check(Rule::Phone, "987654321").passed);
        assert!(!v.check(Rule::Phone, "887654321").passed);
        assert!(!v.check(Rule::Phone, "98765432").passed);
        assert!(!v.check(Rule::Phone, "9876543210").passed);
    }

    #[test]
    fn test_email_rule() {
        let v = service();
        assert!(v.check(Rule::Email, "ana.perez@clinica.pe").passed);
        assert!(!v.check(Rule::Email, "ana.perez@clinica").passed);
        assert!(!v.check(Rule::Email, "no-at-sign.example.com").passed);
    }

    #[test]
    fn test_person_name_accepts_accents_and_enie() {
        let v = service();
        assert!(v.check(Rule::PersonName, "María José Muñoz").passed);
        assert!(v.check(Rule::PersonName, "Ángel Núñez").passed);
        assert!(!v.check(Rule::PersonName, "R2D2").passed);
        assert!(!v.check(Rule::PersonName, "").passed);
    }

    #[test]
    fn test_card_rules() {
        let v = service();
        assert!(v.check(Rule::CardNumber, "4111111111111111").passed);
        assert!(!v.check(Rule::CardNumber, "4111 1111 1111 1111").passed);
        assert!(v.check(Rule::CardExpiry, "09/27").passed);
        assert!(!v.check(Rule::CardExpiry, "13/27").passed);
        assert!(!v.check(Rule::CardExpiry, "9/27").passed);
        assert!(v.check(Rule::CardCvv, "123").passed);
        assert!(v.check(Rule::CardCvv, "1234").passed);
        assert!(!v.check(Rule::CardCvv, "12").passed);
    }

    #[test]
    fn test_birth_date_rule_rejects_future() {
        let v = service();
        assert!(v.check(Rule::BirthDate, "1990-05-20").passed);
        assert!(!v.check(Rule::BirthDate, "2999-01-01").passed);
        assert!(!v.check(Rule::BirthDate, "not-a-date").passed);
    }

    #[test]
    fn test_registration_schema_collects_all_issues() {
        let v = service();
        let registration = PatientRegistration {
            identity_number: "99".to_string(),
            given_names: "Ana".to_string(),
            family_names: "123".to_string(),
            phone: "111".to_string(),
            email: "broken".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2999, 1, 1).unwrap(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let issues = v.validate_patient_registration(&registration, today);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["identity_number", "family_names", "phone", "email", "birth_date"]
        );
    }

    #[test]
    fn test_search_schema_checks_identity_number_only() {
        let v = service();
        assert!(v.validate_patient_search("12345678").is_empty());
        assert_eq!(v.validate_patient_search("abc").len(), 1);
    }
}
