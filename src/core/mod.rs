mod adjustment;
mod affordability;
mod amortization;
mod error;
mod projection;
mod types;

pub use adjustment::{AdjustmentSession, MAX_ADJUSTMENT_PERCENT, adjust_payment};
pub use affordability::{
    assess, classify_apartment, classify_risk, compute_affordability, estimate_sizes,
    payment_to_income_percent, validate_policy,
};
pub use amortization::Amortization;
pub use error::CalcError;
pub use projection::{MAX_PROJECTION_YEARS, project_wealth};
pub use types::{
    AffordabilityInput, AffordabilityReport, AffordabilityResult, AffordabilityRisk,
    ApartmentType, CENTRAL_LJUBLJANA_PRICE_PER_M2, DEFAULT_BACK_END_RATIO, DEFAULT_FLAT_RATIO,
    DEFAULT_FRONT_END_RATIO, DtiPolicy, Market, MarketZone, SUBURBAN_LJUBLJANA_PRICE_PER_M2,
    WealthInput, WealthResult, YearPoint,
};
