use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::booking::NewPassenger;
use crate::{BookingError, BookingResult};

/// Composition thresholds. The adult/infant ages are deliberately
/// configuration, not constants: an "adult" here is whoever counts for the
/// accompaniment rules, which is a fare-rule concern, not a legal-age one.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRules {
    #[serde(default = "default_max_party_size")]
    pub max_party_size: usize,
    #[serde(default = "default_adult_age")]
    pub adult_age: i32,
    #[serde(default = "default_infant_age")]
    pub infant_age: i32,
}

fn default_max_party_size() -> usize {
    9
}

fn default_adult_age() -> i32 {
    12
}

fn default_infant_age() -> i32 {
    2
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_party_size: default_max_party_size(),
            adult_age: default_adult_age(),
            infant_age: default_infant_age(),
        }
    }
}

/// Pure validation over the passenger list. No I/O; every failure names the
/// offending passenger or rule.
#[derive(Debug, Clone)]
pub struct PassengerValidator {
    rules: ValidationRules,
}

impl PassengerValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, passengers: &[NewPassenger]) -> BookingResult<()> {
        self.validate_at(passengers, Utc::now().date_naive())
    }

    pub fn validate_at(&self, passengers: &[NewPassenger], today: NaiveDate) -> BookingResult<()> {
        let mut problems = Vec::new();

        if passengers.is_empty() {
            problems.push("at least one passenger is required".to_string());
        }
        if passengers.len() > self.rules.max_party_size {
            problems.push(format!(
                "party size {} exceeds the maximum of {}",
                passengers.len(),
                self.rules.max_party_size
            ));
        }

        let mut adults = 0usize;
        let mut infants = 0usize;
        for (idx, passenger) in passengers.iter().enumerate() {
            let seat = idx + 1;
            let age = age_on(passenger.birth_date, today);
            if !(0..=120).contains(&age) {
                problems.push(format!("passenger {}: age {} is out of range", seat, age));
            } else if age >= self.rules.adult_age {
                adults += 1;
            } else if age < self.rules.infant_age {
                infants += 1;
            }
            if !is_valid_cpf(&passenger.document) {
                problems.push(format!("passenger {}: invalid identity document", seat));
            }
        }

        if !passengers.is_empty() {
            if adults == 0 {
                problems.push("at least one adult is required".to_string());
            }
            if infants > adults {
                problems.push("infants must not outnumber adults".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(BookingError::Validation(problems.join("; ")))
        }
    }
}

/// Whole elapsed years from `birth` to `today`; one less if the birthday has
/// not yet occurred in the current year. Negative for future birth dates.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// CPF two-pass mod-11 checksum: check digit 1 over the first 9 digits with
/// weights 10..2, check digit 2 over the first 10 with weights 11..2, check
/// values of 10 and 11 folding to 0. All-identical sequences pass the
/// arithmetic but are invalid by definition.
pub fn is_valid_cpf(document: &str) -> bool {
    let digits: Vec<u32> = document.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let check_digit = |count: usize| -> u32 {
        let first_weight = (count + 1) as u32;
        let sum: u32 = digits
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, &d)| d * (first_weight - i as u32))
            .sum();
        let digit = 11 - (sum % 11);
        if digit >= 10 {
            0
        } else {
            digit
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}
