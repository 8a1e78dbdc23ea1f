/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use loan_risk_api::classifier::LogisticRegressionModel;
use loan_risk_api::config::Config;
use loan_risk_api::models::{RiskLevel, RiskScore};
use loan_risk_api::predictor::{Predictor, RiskThresholds};
use loan_risk_api::preprocessing::{
    extract_zip_code, normalize_home_ownership, parse_month_year, parse_term,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const MODEL_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/model.json");

fn predictor() -> Predictor {
    let model = LogisticRegressionModel::load(MODEL_PATH).expect("fixture model loads");
    Predictor::new(Arc::new(model), &Config::default())
}

// Property: field parsers should never panic
proptest! {
    #[test]
    fn parsers_never_panic(raw in "\\PC*") {
        let _ = parse_term(&raw);
        let _ = parse_month_year(&raw);
        let _ = extract_zip_code(&raw);
        let _ = normalize_home_ownership(&raw);
    }

    #[test]
    fn term_strings_yield_leading_months(months in 1u32..=600) {
        prop_assert_eq!(parse_term(&format!("{} months", months)), Some(months));
        prop_assert_eq!(parse_term(&format!(" {} months", months)), Some(months));
    }

    #[test]
    fn home_ownership_normalization_is_idempotent(raw in "[A-Za-z]{0,10}") {
        let once = normalize_home_ownership(&raw);
        prop_assert_eq!(normalize_home_ownership(&once), once.clone());
        prop_assert_ne!(once.as_str(), "ANY");
        prop_assert_ne!(once.as_str(), "NONE");
    }

    #[test]
    fn addresses_ending_in_zip_extract_it(street in "[A-Za-z0-9 ,]{0,30}", zip in "[0-9]{5}") {
        let address = format!("{}\nSomewhere, TX {}", street, zip);
        prop_assert_eq!(extract_zip_code(&address), Some(zip));
    }
}

// Property: month-year dates round-trip through the accepted layouts
proptest! {
    #[test]
    fn month_year_layouts_agree(year in 1950i32..=2020, month in 1u32..=12) {
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun",
            "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let short = format!("{}-{}", MONTHS[(month - 1) as usize], year);
        let iso = format!("{}-{:02}-01", year, month);
        prop_assert!(parse_month_year(&short).is_some());
        prop_assert_eq!(parse_month_year(&short), parse_month_year(&iso));
    }
}

// Property: risk tier is consistent with the returned score
proptest! {
    #[test]
    fn tiers_partition_probability_range(p in 0.0f64..=1.0) {
        let level = RiskThresholds::default().level(p);
        let expected = if p < 0.3 {
            RiskLevel::Low
        } else if p < 0.6 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        };
        prop_assert_eq!(level, expected);
    }

    #[test]
    fn valid_records_yield_binary_prediction_and_consistent_tier(
        loan_amnt in 500.0f64..40000.0,
        int_rate in 5.0f64..31.0,
        annual_inc in 5000.0f64..500000.0,
        dti in 0.0f64..60.0,
        revol_util in 0.0f64..150.0,
        grade in prop::sample::select(vec!["A", "B", "C", "D", "E", "F", "G"]),
        grade_step in 1u8..=5,
        zip in prop::sample::select(vec!["00813", "05113", "11650", "22690", "30723", "86630", "93700"]),
        term in prop::sample::select(vec![" 36 months", " 60 months"]),
    ) {
        let record = json!({
            "loan_amnt": loan_amnt,
            "term": term,
            "int_rate": int_rate,
            "sub_grade": format!("{}{}", grade, grade_step),
            "home_ownership": "MORTGAGE",
            "annual_inc": annual_inc,
            "verification_status": "Source Verified",
            "purpose": "debt_consolidation",
            "dti": dti,
            "open_acc": 9,
            "pub_rec": 0,
            "revol_util": revol_util,
            "initial_list_status": "w",
            "application_type": "INDIVIDUAL",
            "mort_acc": 2,
            "loan_issue_year": 2014,
            "loan_issue_month": 7,
            "credit_age": 12,
            "zip_code": zip
        });

        let predictor = predictor();
        let result = predictor.predict_record(&record).unwrap();
        prop_assert!(result.prediction == 0 || result.prediction == 1);

        let score = match &result.risk_score {
            RiskScore::Probability(p) => *p,
            RiskScore::Percent(_) => unreachable!("default format is probability"),
        };
        prop_assert!((0.0..=1.0).contains(&score));

        // Tier and decision agree with the score the client sees.
        prop_assert_eq!(result.risk_level, RiskThresholds::default().level(score));
        prop_assert_eq!(result.prediction, u8::from(score < 0.55));

        let again = predictor.predict_record(&record).unwrap();
        prop_assert_eq!(again, result);
    }
}
