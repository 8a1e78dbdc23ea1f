//! One-hot encoding and reconciliation against the frozen training schema.
//!
//! The model was trained on a fixed, ordered column list (`final_columns`).
//! [`FeatureSchema`] turns that list into a `column -> index` lookup table
//! once at startup; every request is then encoded and scattered into a
//! zero-filled row of exactly that shape.

use crate::models::LoanApplication;
use std::collections::HashMap;

/// Categorical fields expanded into `<field>_<value>` indicator columns.
pub const CATEGORICAL_COLUMNS: [&str; 7] = [
    "sub_grade",
    "home_ownership",
    "verification_status",
    "purpose",
    "initial_list_status",
    "application_type",
    "zip_code",
];

/// Sparse encoded row: the numeric fields plus one indicator per categorical field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedRow {
    columns: Vec<(String, f64)>,
}

impl EncodedRow {
    pub fn push(&mut self, column: impl Into<String>, value: f64) {
        self.columns.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Indicator column name for a categorical value.
pub fn indicator_column(field: &str, value: &str) -> String {
    format!("{}_{}", field, value)
}

/// One-hot encode an application.
///
/// Emits the indicator for the observed level of each categorical field.
/// The reference level of a field (the one dropped at training time) has
/// no column in the frozen schema, so it is discarded during
/// reconciliation and leaves all of that field's indicators at zero.
pub fn encode(app: &LoanApplication) -> EncodedRow {
    let mut row = EncodedRow::default();

    row.push("loan_amnt", app.loan_amnt);
    row.push("term", f64::from(app.term));
    row.push("int_rate", app.int_rate);
    row.push("annual_inc", app.annual_inc);
    row.push("dti", app.dti);
    row.push("open_acc", app.open_acc);
    row.push("pub_rec", app.pub_rec);
    row.push("revol_util", app.revol_util);
    row.push("mort_acc", app.mort_acc);
    row.push("loan_issue_year", f64::from(app.loan_issue_year));
    row.push("loan_issue_month", f64::from(app.loan_issue_month));
    row.push("credit_age", f64::from(app.credit_age));

    let categories = [
        ("sub_grade", &app.sub_grade),
        ("home_ownership", &app.home_ownership),
        ("verification_status", &app.verification_status),
        ("purpose", &app.purpose),
        ("initial_list_status", &app.initial_list_status),
        ("application_type", &app.application_type),
        ("zip_code", &app.zip_code),
    ];
    for (field, value) in categories {
        row.push(indicator_column(field, value), 1.0);
    }

    row
}

/// Frozen, ordered column list with a static name lookup.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build the lookup table. Duplicate or empty column names are rejected.
    pub fn new(columns: Vec<String>) -> anyhow::Result<Self> {
        if columns.is_empty() {
            anyhow::bail!("feature schema has no columns");
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                anyhow::bail!("feature schema column {} has an empty name", position);
            }
            if index.insert(column.clone(), position).is_some() {
                anyhow::bail!("feature schema lists column '{}' twice", column);
            }
        }

        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Levels of a categorical field that have their own indicator column.
    pub fn levels(&self, field: &str) -> Vec<&str> {
        let prefix = format!("{}_", field);
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix(prefix.as_str()))
            .collect()
    }

    /// Scatter an encoded row into the frozen column order.
    ///
    /// Columns missing from the row stay 0; columns unknown to the schema
    /// (reference levels, unseen categories) are dropped.
    pub fn reconcile(&self, row: &EncodedRow) -> FeatureVector<'_> {
        let mut values = vec![0.0; self.columns.len()];
        let mut dropped = Vec::new();

        for (column, value) in row.iter() {
            match self.position(column) {
                Some(position) => values[position] = value,
                None => dropped.push(column),
            }
        }

        if !dropped.is_empty() {
            tracing::debug!("Columns outside the frozen schema set to zero: {:?}", dropped);
        }

        FeatureVector {
            schema: self,
            values,
        }
    }
}

/// Dense model input row, ordered exactly like its schema.
#[derive(Debug, Clone)]
pub struct FeatureVector<'a> {
    schema: &'a FeatureSchema,
    values: Vec<f64>,
}

impl<'a> FeatureVector<'a> {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn schema(&self) -> &'a FeatureSchema {
        self.schema
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
