//! Disposal plan CSV parsing.
//!
//! A plan row carries everything the runner enters for one asset. Only
//! `asset_id` is required; every other column may be empty or missing:
//!
//! - `asset_id`: the external asset key
//! - `discard_date`: disposal date, `YYYY-MM-DD`
//! - `sold_value`: sale amount as a decimal
//! - `vendor`: vendor name, resolved against the reference list at submit
//! - `location_id`: numeric location id
//! - `remarks`: free text
//! - `attachment`: path to a file to upload with the record

use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when reading a disposal plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),
}

impl From<csv::Error> for PlanError {
    fn from(err: csv::Error) -> Self {
        PlanError::CsvParse(err.to_string())
    }
}

/// One row of the disposal plan.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlanRow {
    pub asset_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub discard_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub sold_value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub location_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub remarks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub attachment: Option<String>,
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Reader for disposal plan CSV files.
pub struct DisposalPlan;

impl DisposalPlan {
    /// Parse plan rows from any CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<PlanRow>, PlanError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();

        for result in csv_reader.deserialize() {
            let row: PlanRow = result?;
            rows.push(row);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_full_row() {
        let csv = "asset_id,discard_date,sold_value,vendor,location_id,remarks,attachment\n\
                   A1,2024-01-10,800.00,Acme Salvage,10,sold for scrap,receipt.pdf";

        let rows = DisposalPlan::parse(csv.as_bytes()).expect("plan should parse");

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            PlanRow {
                asset_id: "A1".to_string(),
                discard_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                sold_value: Some(dec!(800.00)),
                vendor: Some("Acme Salvage".to_string()),
                location_id: Some(10),
                remarks: Some("sold for scrap".to_string()),
                attachment: Some("receipt.pdf".to_string()),
            }
        );
    }

    #[test]
    fn parse_row_with_empty_optionals() {
        let csv = "asset_id,discard_date,sold_value,vendor,location_id,remarks,attachment\n\
                   A1,,,,,,";

        let rows = DisposalPlan::parse(csv.as_bytes()).expect("plan should parse");

        assert_eq!(rows[0].asset_id, "A1");
        assert_eq!(rows[0].discard_date, None);
        assert_eq!(rows[0].sold_value, None);
        assert_eq!(rows[0].vendor, None);
        assert_eq!(rows[0].location_id, None);
        assert_eq!(rows[0].remarks, None);
        assert_eq!(rows[0].attachment, None);
    }

    #[test]
    fn parse_tolerates_missing_columns() {
        let csv = "asset_id,sold_value\nA1,800.00";

        let rows = DisposalPlan::parse(csv.as_bytes()).expect("plan should parse");

        assert_eq!(rows[0].sold_value, Some(dec!(800.00)));
        assert_eq!(rows[0].discard_date, None);
    }

    #[test]
    fn parse_rejects_a_bad_decimal() {
        let csv = "asset_id,sold_value\nA1,abc";

        let err = DisposalPlan::parse(csv.as_bytes()).expect_err("bad decimal");

        let PlanError::CsvParse(msg) = err;
        assert!(msg.to_lowercase().contains("invalid"), "got: {msg}");
    }

    #[test]
    fn parse_rejects_a_bad_date() {
        let csv = "asset_id,discard_date\nA1,10/01/2024";

        let result = DisposalPlan::parse(csv.as_bytes());

        assert!(result.is_err());
    }

    #[test]
    fn parse_empty_plan() {
        let csv = "asset_id,discard_date,sold_value\n";

        let rows = DisposalPlan::parse(csv.as_bytes()).expect("plan should parse");

        assert!(rows.is_empty());
    }
}
