use tracing::debug;

use super::amortization::Amortization;
use super::error::{CalcError, require_non_negative, require_range};
use super::types::{
    AffordabilityInput, AffordabilityReport, AffordabilityResult, AffordabilityRisk,
    ApartmentType, DtiPolicy, Market, SizeEstimate,
};

pub const MAX_LOAN_TERM_YEARS: u32 = 50;
pub const MAX_INTEREST_RATE_PERCENT: f64 = 20.0;
pub const MAX_INSURANCE_RATE_PERCENT: f64 = 5.0;

const COMFORTABLE_PAYMENT_SHARE: f64 = 28.0;
const SENSIBLE_PAYMENT_SHARE: f64 = 30.0;

pub fn validate_affordability_input(input: &AffordabilityInput) -> Result<(), CalcError> {
    require_non_negative("annualIncome", input.annual_income)?;
    if input.annual_income <= 0.0 {
        return Err(CalcError::invalid("annualIncome", "must be > 0"));
    }
    require_non_negative("downPayment", input.down_payment)?;
    require_non_negative("monthlyDebt", input.monthly_debt)?;
    require_non_negative("hoaFees", input.hoa_fees)?;
    require_range(
        "interestRatePercent",
        input.interest_rate_percent,
        0.0,
        MAX_INTEREST_RATE_PERCENT,
    )?;
    require_range(
        "insuranceRatePercent",
        input.insurance_rate_percent,
        0.0,
        MAX_INSURANCE_RATE_PERCENT,
    )?;
    if !(1..=MAX_LOAN_TERM_YEARS).contains(&input.loan_term_years) {
        return Err(CalcError::invalid(
            "loanTermYears",
            format!("must be between 1 and {MAX_LOAN_TERM_YEARS}"),
        ));
    }
    Ok(())
}

pub fn validate_policy(policy: DtiPolicy) -> Result<(), CalcError> {
    match policy {
        DtiPolicy::TwoTier {
            front_end,
            back_end,
        } => {
            require_ratio("frontEndRatio", front_end)?;
            require_ratio("backEndRatio", back_end)?;
            if front_end > back_end {
                return Err(CalcError::invalid(
                    "frontEndRatio",
                    "must not exceed the back-end ratio",
                ));
            }
            Ok(())
        }
        DtiPolicy::Flat { ratio } => require_ratio("flatRatio", ratio),
    }
}

fn require_ratio(field: &'static str, ratio: f64) -> Result<(), CalcError> {
    require_range(field, ratio, 0.0, 1.0)?;
    if ratio == 0.0 {
        return Err(CalcError::invalid(field, "must be > 0"));
    }
    Ok(())
}

/// Per-calculation constants shared by the price solve and the recompute.
#[derive(Debug, Clone, Copy)]
struct PricingTerms {
    schedule: Amortization,
    monthly_insurance_rate: f64,
    down_payment: f64,
    monthly_debt: f64,
    hoa_fees: f64,
}

impl PricingTerms {
    fn from_input(input: &AffordabilityInput) -> Self {
        Self {
            schedule: Amortization::new(input.interest_rate_percent, input.loan_term_years),
            monthly_insurance_rate: input.insurance_rate_percent / 100.0 / 12.0,
            down_payment: input.down_payment,
            monthly_debt: input.monthly_debt,
            hoa_fees: input.hoa_fees,
        }
    }

    /// Price whose monthly housing cost equals `housing_budget`:
    /// `budget = m * (price - down) + insurance * price + hoa`.
    fn price_for_budget(self, housing_budget: f64) -> f64 {
        if self.monthly_insurance_rate == 0.0 {
            // Nothing scales with price, so the loan is the annuity value of the budget.
            return self.down_payment
                + self.schedule.present_value(housing_budget - self.hoa_fees);
        }
        let m = self.schedule.constant();
        (housing_budget + m * self.down_payment - self.hoa_fees)
            / (m + self.monthly_insurance_rate)
    }

    fn obligations_at(self, max_price: f64, caps: Caps) -> AffordabilityResult {
        let loan_amount = max_price - self.down_payment;
        let mortgage_payment = self.schedule.payment(loan_amount);
        let monthly_insurance = self.monthly_insurance_rate * max_price;
        let total_piti = mortgage_payment + monthly_insurance + self.hoa_fees;
        AffordabilityResult {
            max_price,
            loan_amount,
            mortgage_payment,
            monthly_insurance,
            hoa_fees: self.hoa_fees,
            total_piti,
            max_piti: caps.max_piti,
            total_debt: total_piti + self.monthly_debt,
            max_total_debt: caps.max_total_debt,
            monthly_income: Some(caps.monthly_income),
            monthly_debt: self.monthly_debt,
            down_payment: self.down_payment,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Caps {
    monthly_income: f64,
    max_piti: f64,
    max_total_debt: f64,
}

/// Maximum property price under `policy`, with the monthly obligations at that price.
pub fn compute_affordability(
    input: &AffordabilityInput,
    policy: DtiPolicy,
) -> Result<AffordabilityResult, CalcError> {
    validate_affordability_input(input)?;
    validate_policy(policy)?;
    let terms = PricingTerms::from_input(input);
    let monthly_income = input.annual_income / 12.0;

    let result = match policy {
        DtiPolicy::TwoTier {
            front_end,
            back_end,
        } => {
            let caps = Caps {
                monthly_income,
                max_piti: monthly_income * front_end,
                max_total_debt: monthly_income * back_end,
            };
            let uncapped = terms.obligations_at(terms.price_for_budget(caps.max_piti), caps);
            if uncapped.total_debt > caps.max_total_debt {
                // Single linear shrink, not a re-solve under the back-end cap.
                let excess = uncapped.total_debt - caps.max_total_debt;
                let factor = (caps.max_piti - excess) / caps.max_piti;
                debug!(
                    excess,
                    factor, "back-end ratio binds, scaling maximum price down"
                );
                terms.obligations_at(uncapped.max_price * factor, caps)
            } else {
                uncapped
            }
        }
        DtiPolicy::Flat { ratio } => {
            let max_total_debt = monthly_income * ratio;
            let caps = Caps {
                monthly_income,
                max_piti: max_total_debt - input.monthly_debt,
                max_total_debt,
            };
            terms.obligations_at(terms.price_for_budget(caps.max_piti), caps)
        }
    };
    Ok(result)
}

pub fn classify_apartment(size_square_meters: f64) -> ApartmentType {
    if size_square_meters < 40.0 {
        ApartmentType::Studio
    } else if size_square_meters < 64.0 {
        ApartmentType::OneBedroom
    } else if size_square_meters < 90.0 {
        ApartmentType::TwoBedroom
    } else {
        ApartmentType::ThreeBedroomOrLarger
    }
}

pub fn estimate_sizes(max_price: f64, market: &Market) -> Vec<SizeEstimate> {
    market
        .zones
        .iter()
        .map(|zone| {
            let size = max_price / zone.price_per_square_meter;
            SizeEstimate {
                zone: zone.name.clone(),
                price_per_square_meter: zone.price_per_square_meter,
                size_square_meters: size,
                apartment_type: classify_apartment(size),
            }
        })
        .collect()
}

/// Share of monthly income spent on housing, `None` without a usable income.
pub fn payment_to_income_percent(result: &AffordabilityResult) -> Option<f64> {
    result
        .monthly_income
        .filter(|income| income.is_finite() && *income > 0.0)
        .map(|income| result.total_piti / income * 100.0)
}

pub fn classify_risk(payment_to_income_percent: f64) -> AffordabilityRisk {
    if payment_to_income_percent <= COMFORTABLE_PAYMENT_SHARE {
        AffordabilityRisk::Comfortable
    } else if payment_to_income_percent <= SENSIBLE_PAYMENT_SHARE {
        AffordabilityRisk::Stretched
    } else {
        AffordabilityRisk::Risky
    }
}

/// Attaches size estimates and the payment-to-income view to a result.
pub fn assess(result: AffordabilityResult, market: &Market) -> AffordabilityReport {
    let share = payment_to_income_percent(&result);
    AffordabilityReport {
        size_estimates: estimate_sizes(result.max_price, market),
        payment_to_income_percent: share,
        risk: share.map(classify_risk),
        sensible: share.map(|share| share < SENSIBLE_PAYMENT_SHARE),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DEFAULT_FLAT_RATIO;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_input() -> AffordabilityInput {
        AffordabilityInput {
            annual_income: 30_000.0,
            down_payment: 50_000.0,
            monthly_debt: 100.0,
            interest_rate_percent: 3.0,
            loan_term_years: 20,
            insurance_rate_percent: 0.2,
            hoa_fees: 0.0,
        }
    }

    fn assert_consistent(result: &AffordabilityResult) {
        assert_approx(
            result.total_piti,
            result.mortgage_payment + result.monthly_insurance + result.hoa_fees,
        );
        assert_approx(result.total_debt, result.total_piti + result.monthly_debt);
        assert_approx(result.loan_amount, result.max_price - result.down_payment);
    }

    #[test]
    fn reference_scenario_fits_under_both_caps() {
        let result = compute_affordability(&sample_input(), DtiPolicy::default())
            .expect("valid input");

        assert_eq!(result.monthly_income, Some(2_500.0));
        assert_approx(result.max_piti, 700.0);
        assert_approx(result.max_total_debt, 900.0);
        assert!(result.max_price > 0.0);
        assert!((result.max_price - 171_076.48).abs() < 0.01);
        assert_approx(result.total_piti, 700.0);
        assert_approx(result.total_debt, 800.0);
        assert!(result.total_debt <= result.max_total_debt + EPS);
        assert_consistent(&result);
    }

    #[test]
    fn back_end_correction_scales_price_down_once() {
        let mut input = sample_input();
        input.monthly_debt = 400.0;

        let uncapped = compute_affordability(&sample_input(), DtiPolicy::default()).unwrap();
        let result = compute_affordability(&input, DtiPolicy::default()).expect("valid input");

        // Uncapped total debt would be 700 + 400 = 1100, 200 over the 900 cap.
        let factor = (700.0 - 200.0) / 700.0;
        assert_approx(result.max_price, uncapped.max_price * factor);
        assert!(result.total_debt <= result.max_total_debt + EPS);
        assert!(result.total_piti < result.max_piti);
        assert_consistent(&result);
    }

    #[test]
    fn back_end_correction_overshoots_when_hoa_exceeds_down_payment_financing() {
        let mut input = sample_input();
        input.down_payment = 0.0;
        input.hoa_fees = 100.0;
        input.monthly_debt = 400.0;

        let result = compute_affordability(&input, DtiPolicy::default()).expect("valid input");

        // Uncapped: housing 700 + debt 400 = 1100, 200 over the 900 cap.
        let factor = (700.0 - 200.0) / 700.0;
        let m = Amortization::new(3.0, 20).constant();
        let overshoot = (factor - 1.0) * (m * input.down_payment - input.hoa_fees);
        assert!(overshoot > 0.0);
        assert_approx(result.total_debt, result.max_total_debt + overshoot);
        assert!(result.total_debt > result.max_total_debt);
        assert_consistent(&result);
    }

    #[test]
    fn zero_interest_uses_straight_line_payment() {
        let mut input = sample_input();
        input.interest_rate_percent = 0.0;

        let result = compute_affordability(&input, DtiPolicy::default()).expect("valid input");
        assert!(result.max_price.is_finite());
        assert_eq!(result.mortgage_payment, result.loan_amount / 240.0);
        assert_consistent(&result);
    }

    #[test]
    fn flat_policy_spends_whole_budget_on_housing_and_debt() {
        let policy = DtiPolicy::Flat {
            ratio: DEFAULT_FLAT_RATIO,
        };
        let mut input = sample_input();
        input.insurance_rate_percent = 0.0;

        let result = compute_affordability(&input, policy).expect("valid input");
        assert_approx(result.max_total_debt, 2_500.0 * 0.33);
        assert_approx(result.max_piti, 2_500.0 * 0.33 - 100.0);
        assert_approx(result.total_debt, result.max_total_debt);

        // Without insurance or HOA the loan is the annuity present value of the budget.
        let schedule = Amortization::new(3.0, 20);
        assert_approx(result.loan_amount, schedule.present_value(result.max_piti));
        assert_consistent(&result);
    }

    #[test]
    fn hoa_fees_reduce_price_and_pass_through() {
        let mut input = sample_input();
        input.hoa_fees = 80.0;
        let with_hoa = compute_affordability(&input, DtiPolicy::default()).unwrap();
        let without = compute_affordability(&sample_input(), DtiPolicy::default()).unwrap();

        assert!(with_hoa.max_price < without.max_price);
        assert_approx(with_hoa.hoa_fees, 80.0);
        assert_consistent(&with_hoa);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let cases: [(fn(&mut AffordabilityInput), &str); 7] = [
            (|i| i.loan_term_years = 0, "loanTermYears"),
            (|i| i.loan_term_years = 51, "loanTermYears"),
            (|i| i.interest_rate_percent = 20.5, "interestRatePercent"),
            (|i| i.insurance_rate_percent = -0.1, "insuranceRatePercent"),
            (|i| i.annual_income = 0.0, "annualIncome"),
            (|i| i.down_payment = -1.0, "downPayment"),
            (|i| i.monthly_debt = f64::NAN, "monthlyDebt"),
        ];
        for (mutate, field) in cases {
            let mut input = sample_input();
            mutate(&mut input);
            let err = compute_affordability(&input, DtiPolicy::default())
                .expect_err("must reject invalid input");
            assert_eq!(err.field(), field);
        }
    }

    #[test]
    fn rejects_degenerate_policies() {
        let zero = DtiPolicy::TwoTier {
            front_end: 0.0,
            back_end: 0.36,
        };
        let inverted = DtiPolicy::TwoTier {
            front_end: 0.4,
            back_end: 0.36,
        };
        assert_eq!(
            compute_affordability(&sample_input(), zero).unwrap_err().field(),
            "frontEndRatio"
        );
        assert_eq!(validate_policy(inverted).unwrap_err().field(), "frontEndRatio");
        assert_eq!(
            validate_policy(DtiPolicy::Flat { ratio: 1.2 }).unwrap_err().field(),
            "flatRatio"
        );
    }

    #[test]
    fn apartment_boundaries_are_half_open() {
        assert_eq!(classify_apartment(0.0), ApartmentType::Studio);
        assert_eq!(classify_apartment(39.999), ApartmentType::Studio);
        assert_eq!(classify_apartment(40.0), ApartmentType::OneBedroom);
        assert_eq!(classify_apartment(63.999), ApartmentType::OneBedroom);
        assert_eq!(classify_apartment(64.0), ApartmentType::TwoBedroom);
        assert_eq!(classify_apartment(89.999), ApartmentType::TwoBedroom);
        assert_eq!(classify_apartment(90.0), ApartmentType::ThreeBedroomOrLarger);
    }

    #[test]
    fn assess_reports_both_ljubljana_zones() {
        let result = compute_affordability(&sample_input(), DtiPolicy::default()).unwrap();
        let report = assess(result.clone(), &Market::default());

        assert_eq!(report.size_estimates.len(), 2);
        let central = &report.size_estimates[0];
        let suburban = &report.size_estimates[1];
        assert_eq!(central.zone, "central");
        assert_approx(central.size_square_meters, result.max_price / 4687.0);
        assert_eq!(central.apartment_type, ApartmentType::Studio);
        assert_eq!(suburban.zone, "suburban");
        assert_approx(suburban.size_square_meters, result.max_price / 2500.0);
        assert_eq!(suburban.apartment_type, ApartmentType::TwoBedroom);

        // Housing cost sits exactly on the 28% front-end cap.
        assert_approx(report.payment_to_income_percent.unwrap(), 28.0);
        assert_ne!(report.risk, Some(AffordabilityRisk::Risky));
        assert_eq!(report.sensible, Some(true));
    }

    #[test]
    fn assess_without_income_omits_risk_view() {
        let mut result = compute_affordability(&sample_input(), DtiPolicy::default()).unwrap();
        result.monthly_income = None;
        let report = assess(result, &Market::default());

        assert_eq!(report.size_estimates.len(), 2);
        assert_eq!(report.payment_to_income_percent, None);
        assert_eq!(report.risk, None);
        assert_eq!(report.sensible, None);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("risk").is_none());
        assert!(json.get("monthlyIncome").is_none());
    }

    #[test]
    fn risk_bands() {
        assert_eq!(classify_risk(28.0), AffordabilityRisk::Comfortable);
        assert_eq!(classify_risk(29.5), AffordabilityRisk::Stretched);
        assert_eq!(classify_risk(30.0), AffordabilityRisk::Stretched);
        assert_eq!(classify_risk(30.1), AffordabilityRisk::Risky);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_results_are_internally_consistent(
            income in 6_000u32..400_000,
            down_payment in 0u32..300_000,
            monthly_debt in 0u32..3_000,
            rate_bp in 0u32..2_001,
            term in 1u32..51,
            insurance_bp in 0u32..501,
            hoa in 0u32..400,
        ) {
            let input = AffordabilityInput {
                annual_income: income as f64,
                down_payment: down_payment as f64,
                monthly_debt: monthly_debt as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term,
                insurance_rate_percent: insurance_bp as f64 / 100.0,
                hoa_fees: hoa as f64,
            };
            for policy in [DtiPolicy::default(), DtiPolicy::Flat { ratio: DEFAULT_FLAT_RATIO }] {
                let result = compute_affordability(&input, policy).unwrap();
                prop_assert!(result.max_price.is_finite());
                prop_assert!(result.mortgage_payment.is_finite());
                let piti = result.mortgage_payment + result.monthly_insurance + result.hoa_fees;
                prop_assert!((result.total_piti - piti).abs() <= EPS * result.total_piti.abs().max(1.0));
                let debt = result.total_piti + result.monthly_debt;
                prop_assert!((result.total_debt - debt).abs() <= EPS * result.total_debt.abs().max(1.0));
            }
        }

        #[test]
        fn prop_back_end_cap_holds_after_correction(
            income in 6_000u32..400_000,
            down_payment in 0u32..300_000,
            monthly_debt in 0u32..3_000,
            rate_bp in 0u32..2_001,
            term in 1u32..51,
            insurance_bp in 0u32..501,
        ) {
            // HOA above `m * down_payment` lets the single-pass shrink overshoot the cap.
            let input = AffordabilityInput {
                annual_income: income as f64,
                down_payment: down_payment as f64,
                monthly_debt: monthly_debt as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term,
                insurance_rate_percent: insurance_bp as f64 / 100.0,
                hoa_fees: 0.0,
            };
            let result = compute_affordability(&input, DtiPolicy::default()).unwrap();
            let tolerance = EPS * result.max_total_debt.max(1.0);
            prop_assert!(result.total_debt <= result.max_total_debt + tolerance);
        }
    }
}
