//! Fund data types and the provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// A single NAV observation. Series from the data source arrive
/// newest-first and are kept in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Trailing time window over which a return is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl Horizon {
    pub const ALL: [Horizon; 6] = [
        Horizon::OneMonth,
        Horizon::ThreeMonths,
        Horizon::SixMonths,
        Horizon::OneYear,
        Horizon::ThreeYears,
        Horizon::FiveYears,
    ];

    pub fn to_duration(&self) -> Duration {
        match self {
            Horizon::OneMonth => Duration::days(30),
            Horizon::ThreeMonths => Duration::days(91),
            Horizon::SixMonths => Duration::days(182),
            Horizon::OneYear => Duration::days(365),
            Horizon::ThreeYears => Duration::days(1095),
            Horizon::FiveYears => Duration::days(1825),
        }
    }
}

impl Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Horizon::OneMonth => "1M",
                Horizon::ThreeMonths => "3M",
                Horizon::SixMonths => "6M",
                Horizon::OneYear => "1Y",
                Horizon::ThreeYears => "3Y",
                Horizon::FiveYears => "5Y",
            }
        )
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1M" => Ok(Horizon::OneMonth),
            "3M" => Ok(Horizon::ThreeMonths),
            "6M" => Ok(Horizon::SixMonths),
            "1Y" => Ok(Horizon::OneYear),
            "3Y" => Ok(Horizon::ThreeYears),
            "5Y" => Ok(Horizon::FiveYears),
            _ => Err(anyhow::anyhow!("Invalid horizon: {}", s)),
        }
    }
}

/// Minimal fund information, produced by the search operation.
/// Identity key is `scheme_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: Option<String>,
    pub category: Option<String>,
}

/// Detailed fund record with derived trailing returns. Immutable once
/// constructed by the detail fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundDetail {
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: Option<String>,
    pub scheme_type: Option<String>,
    pub scheme_category: Option<String>,
    pub latest_nav: Option<f64>,
    pub latest_nav_date: Option<NaiveDate>,
    pub returns: BTreeMap<Horizon, f64>,
    pub nav_history: Option<Vec<NavPoint>>,
}

/// Access to the external fund data source.
///
/// Transport and HTTP failures are soft: they degrade to an empty or
/// absent result plus a log entry, never an error value. Callers cannot
/// distinguish "no match" from "source unavailable".
#[async_trait]
pub trait FundDataProvider: Send + Sync {
    async fn search_funds(&self, query: &str, limit: usize) -> Vec<FundSummary>;

    async fn fund_details(&self, scheme_code: &str, include_history: bool) -> Option<FundDetail>;
}
