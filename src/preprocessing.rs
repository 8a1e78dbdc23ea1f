//! Request validation and field derivation.
//!
//! Turns the raw JSON record submitted to `/predict` into a typed
//! [`LoanApplication`]:
//! 1. Check every expected column is present (or derivable)
//! 2. Coerce numeric and categorical fields
//! 3. Derive `term`, `credit_age`, issue date parts and `zip_code`
//! 4. Ignore columns the model was never trained on
use crate::errors::AppError;
use crate::models::LoanApplication;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Columns every prediction request must carry, in validation order.
pub const EXPECTED_COLUMNS: [&str; 19] = [
    "loan_amnt",
    "term",
    "int_rate",
    "sub_grade",
    "home_ownership",
    "annual_inc",
    "verification_status",
    "purpose",
    "dti",
    "open_acc",
    "pub_rec",
    "revol_util",
    "initial_list_status",
    "application_type",
    "mort_acc",
    "loan_issue_year",
    "loan_issue_month",
    "credit_age",
    "zip_code",
];

/// Columns removed before encoding. They may or may not be present.
pub const DROPPED_COLUMNS: [&str; 9] = [
    "grade",
    "emp_length",
    "emp_title",
    "title",
    "revol_bal",
    "pub_rec_bankruptcies",
    "earliest_cr_line",
    "issue_d",
    "address",
];

/// Month-year layouts seen in credit bureau exports (`Jan-2005`, `January 2005`).
const MONTH_YEAR_FORMATS: [&str; 3] = ["%b-%Y", "%B %Y", "%b %Y"];
const FULL_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Raw field a derived column can be computed from.
pub fn raw_source(column: &str) -> Option<&'static str> {
    match column {
        "credit_age" => Some("earliest_cr_line"),
        "loan_issue_year" | "loan_issue_month" => Some("issue_d"),
        "zip_code" => Some("address"),
        _ => None,
    }
}

/// Verify every expected column is present, reporting the first missing one.
///
/// A derived column counts as present when its raw source is. No type
/// coercion happens here.
pub fn validate_columns(record: &Map<String, Value>) -> Result<(), AppError> {
    for column in EXPECTED_COLUMNS {
        if record.contains_key(column) {
            continue;
        }
        match raw_source(column) {
            Some(source) if record.contains_key(source) => continue,
            _ => return Err(AppError::MissingColumn(column.to_string())),
        }
    }
    Ok(())
}

/// Extract the leading integer from a term such as `"36 months"`.
pub fn parse_term(raw: &str) -> Option<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"(\d+)").expect("valid term regex"));
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Fold the rare `NONE`/`ANY` ownership values into `OTHER`.
pub fn normalize_home_ownership(raw: &str) -> String {
    let value = raw.trim().to_uppercase();
    match value.as_str() {
        "NONE" | "ANY" => "OTHER".to_string(),
        _ => value,
    }
}

/// Parse a month-year (or full) date. Month-year values resolve to the 1st.
pub fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    MONTH_YEAR_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(&format!("01 {}", raw), &format!("%d {}", fmt)).ok()
        })
        .or_else(|| {
            FULL_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

/// Last five digits at the end of a free-text address.
pub fn extract_zip_code(address: &str) -> Option<String> {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    let re = ZIP.get_or_init(|| Regex::new(r"(\d{5})\s*$").expect("valid zip regex"));
    re.captures(address)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn invalid(field: &str, reason: impl Into<String>) -> AppError {
    AppError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn field<'a>(record: &'a Map<String, Value>, name: &str) -> Result<&'a Value, AppError> {
    record
        .get(name)
        .ok_or_else(|| AppError::MissingColumn(name.to_string()))
}

fn number(record: &Map<String, Value>, name: &str) -> Result<f64, AppError> {
    let value = match field(record, name)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(name, "number out of range"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(name, format!("expected a number, got {:?}", s)))?,
        Value::Null => return Err(invalid(name, "value is null")),
        other => return Err(invalid(name, format!("expected a number, got {}", other))),
    };

    if !value.is_finite() {
        return Err(invalid(name, "number must be finite"));
    }
    Ok(value)
}

fn integer(record: &Map<String, Value>, name: &str) -> Result<i64, AppError> {
    let value = number(record, name)?;
    if value.fract() != 0.0 {
        return Err(invalid(name, format!("expected an integer, got {}", value)));
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(invalid(name, "integer out of range"));
    }
    Ok(value as i64)
}

fn int32(record: &Map<String, Value>, name: &str) -> Result<i32, AppError> {
    let value = integer(record, name)?;
    i32::try_from(value).map_err(|_| invalid(name, format!("{} is out of range", value)))
}

fn is_zip_code(raw: &str) -> bool {
    raw.len() == 5 && raw.bytes().all(|b| b.is_ascii_digit())
}

fn category(record: &Map<String, Value>, name: &str) -> Result<String, AppError> {
    match field(record, name)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err(invalid(name, "value is empty")),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(invalid(name, "value is null")),
        other => Err(invalid(name, format!("expected a string, got {}", other))),
    }
}

fn raw_date(record: &Map<String, Value>, name: &str) -> Result<NaiveDate, AppError> {
    let raw = match field(record, name)? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    parse_month_year(&raw).ok_or(AppError::InvalidDate {
        field: name.to_string(),
        value: raw,
    })
}

/// Computes the typed application from a validated raw record.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    reference_year: i32,
}

impl FeatureDeriver {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    /// Validate and derive in one step.
    pub fn derive(&self, record: &Map<String, Value>) -> Result<LoanApplication, AppError> {
        validate_columns(record)?;

        let ignored = DROPPED_COLUMNS
            .iter()
            .filter(|c| record.contains_key(**c))
            .count();
        tracing::debug!("Dropping {} non-model columns from record", ignored);

        let loan_issue_year = match record.contains_key("loan_issue_year") {
            true => int32(record, "loan_issue_year")?,
            false => raw_date(record, "issue_d")?.year(),
        };
        let loan_issue_month = match record.contains_key("loan_issue_month") {
            true => integer(record, "loan_issue_month")?,
            false => raw_date(record, "issue_d")?.month() as i64,
        };
        if !(1..=12).contains(&loan_issue_month) {
            return Err(invalid(
                "loan_issue_month",
                format!("month must be between 1 and 12, got {}", loan_issue_month),
            ));
        }

        Ok(LoanApplication {
            loan_amnt: number(record, "loan_amnt")?,
            term: self.term(record)?,
            int_rate: number(record, "int_rate")?,
            sub_grade: category(record, "sub_grade")?.to_uppercase(),
            home_ownership: normalize_home_ownership(&category(record, "home_ownership")?),
            annual_inc: number(record, "annual_inc")?,
            verification_status: category(record, "verification_status")?,
            purpose: category(record, "purpose")?,
            dti: number(record, "dti")?,
            open_acc: number(record, "open_acc")?,
            pub_rec: number(record, "pub_rec")?,
            revol_util: number(record, "revol_util")?,
            initial_list_status: category(record, "initial_list_status")?,
            application_type: category(record, "application_type")?,
            mort_acc: number(record, "mort_acc")?,
            loan_issue_year,
            loan_issue_month: loan_issue_month as u32,
            credit_age: self.credit_age(record)?,
            zip_code: self.zip_code(record)?,
        })
    }

    fn term(&self, record: &Map<String, Value>) -> Result<u32, AppError> {
        match field(record, "term")? {
            Value::String(s) => parse_term(s)
                .ok_or_else(|| invalid("term", format!("no month count in {:?}", s))),
            _ => {
                let months = integer(record, "term")?;
                u32::try_from(months).map_err(|_| invalid("term", "must be positive"))
            }
        }
    }

    fn credit_age(&self, record: &Map<String, Value>) -> Result<i32, AppError> {
        if record.contains_key("credit_age") {
            return int32(record, "credit_age");
        }
        let opened = raw_date(record, "earliest_cr_line")?;
        Ok(self.reference_year - opened.year())
    }

    fn zip_code(&self, record: &Map<String, Value>) -> Result<String, AppError> {
        if record.contains_key("zip_code") {
            let zip = match field(record, "zip_code")? {
                // Numeric zips lose their leading zeros in JSON.
                Value::Number(_) => match integer(record, "zip_code")? {
                    n @ 0..=99_999 => format!("{:05}", n),
                    n => {
                        return Err(invalid(
                            "zip_code",
                            format!("{} is not a 5-digit zip code", n),
                        ))
                    }
                },
                _ => category(record, "zip_code")?,
            };
            if !is_zip_code(&zip) {
                return Err(invalid("zip_code", format!("{:?} is not a 5-digit zip code", zip)));
            }
            return Ok(zip);
        }
        match field(record, "address")? {
            Value::String(address) => extract_zip_code(address)
                .ok_or_else(|| invalid("address", "no 5-digit zip code at the end")),
            other => Err(invalid("address", format!("expected a string, got {}", other))),
        }
    }
}
