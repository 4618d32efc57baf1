use serde::{Deserialize, Serialize};

pub const DEFAULT_FRONT_END_RATIO: f64 = 0.28;
pub const DEFAULT_BACK_END_RATIO: f64 = 0.36;
pub const DEFAULT_FLAT_RATIO: f64 = 0.33;

pub const CENTRAL_LJUBLJANA_PRICE_PER_M2: f64 = 4687.0;
pub const SUBURBAN_LJUBLJANA_PRICE_PER_M2: f64 = 2500.0;

/// Debt-to-income underwriting rule applied when solving for the maximum price.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DtiPolicy {
    /// Housing costs capped at `front_end` of monthly income, all debt at `back_end`.
    TwoTier { front_end: f64, back_end: f64 },
    /// Housing costs plus existing debt capped at a single `ratio` of monthly income.
    Flat { ratio: f64 },
}

impl Default for DtiPolicy {
    fn default() -> Self {
        DtiPolicy::TwoTier {
            front_end: DEFAULT_FRONT_END_RATIO,
            back_end: DEFAULT_BACK_END_RATIO,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarketZone {
    pub name: String,
    pub price_per_square_meter: f64,
}

/// Policy and reference prices for one housing market.
#[derive(Clone, Debug, PartialEq)]
pub struct Market {
    pub dti_policy: DtiPolicy,
    pub zones: Vec<MarketZone>,
}

impl Market {
    pub fn ljubljana(dti_policy: DtiPolicy) -> Self {
        Self {
            dti_policy,
            zones: vec![
                MarketZone {
                    name: "central".to_string(),
                    price_per_square_meter: CENTRAL_LJUBLJANA_PRICE_PER_M2,
                },
                MarketZone {
                    name: "suburban".to_string(),
                    price_per_square_meter: SUBURBAN_LJUBLJANA_PRICE_PER_M2,
                },
            ],
        }
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::ljubljana(DtiPolicy::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffordabilityInput {
    pub annual_income: f64,
    pub down_payment: f64,
    pub monthly_debt: f64,
    pub interest_rate_percent: f64,
    pub loan_term_years: u32,
    pub insurance_rate_percent: f64,
    pub hoa_fees: f64,
}

/// Monthly obligations at the maximum affordable price.
///
/// `total_piti = mortgage_payment + monthly_insurance + hoa_fees` and
/// `total_debt = total_piti + monthly_debt` hold for every value produced by
/// this crate. The trailing context fields are optional on input; results
/// received from clients may carry only the obligation figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilityResult {
    pub max_price: f64,
    pub loan_amount: f64,
    pub mortgage_payment: f64,
    pub monthly_insurance: f64,
    pub hoa_fees: f64,
    #[serde(rename = "totalPITI", alias = "totalPiti")]
    pub total_piti: f64,
    #[serde(rename = "maxPITI", alias = "maxPiti")]
    pub max_piti: f64,
    pub total_debt: f64,
    pub max_total_debt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub monthly_debt: f64,
    #[serde(default)]
    pub down_payment: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApartmentType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroomOrLarger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeEstimate {
    pub zone: String,
    pub price_per_square_meter: f64,
    pub size_square_meters: f64,
    pub apartment_type: ApartmentType,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AffordabilityRisk {
    Comfortable,
    Stretched,
    Risky,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilityReport {
    #[serde(flatten)]
    pub result: AffordabilityResult,
    pub size_estimates: Vec<SizeEstimate>,
    /// Income-dependent view, absent when the result carries no income.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_to_income_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<AffordabilityRisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WealthInput {
    pub current_capital: f64,
    pub monthly_income: f64,
    pub investment_percentage: f64,
    pub return_rate_percent: f64,
    pub expense_ratio_percent: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: u32,
    pub capital: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthResult {
    pub capital_by_year: Vec<f64>,
    pub effective_annual_rate: f64,
    pub monthly_investment: f64,
    pub total_contributed: f64,
    pub final_capital: f64,
}

impl WealthResult {
    /// `(year, capital)` pairs in year order, as consumed by charts.
    pub fn points(&self) -> Vec<YearPoint> {
        self.capital_by_year
            .iter()
            .enumerate()
            .map(|(year, &capital)| YearPoint {
                year: year as u32,
                capital,
            })
            .collect()
    }
}
