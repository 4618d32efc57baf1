use super::error::{CalcError, require_range};
use super::types::AffordabilityResult;

pub const MAX_ADJUSTMENT_PERCENT: f64 = 50.0;

pub fn validate_adjustment(adjustment_percent: f64) -> Result<(), CalcError> {
    require_range(
        "adjustmentPercent",
        adjustment_percent,
        -MAX_ADJUSTMENT_PERCENT,
        MAX_ADJUSTMENT_PERCENT,
    )
}

/// Stress-test view of `base` with price and price-driven costs scaled by
/// `1 + adjustment_percent / 100`.
///
/// HOA fees are a fixed charge and do not scale. Dependent totals are
/// re-derived from the scaled parts; the DTI caps are carried unchanged.
pub fn adjust_payment(
    base: &AffordabilityResult,
    adjustment_percent: f64,
) -> Result<AffordabilityResult, CalcError> {
    validate_adjustment(adjustment_percent)?;
    let factor = 1.0 + adjustment_percent / 100.0;

    let down_payment = base.max_price - base.loan_amount;
    let monthly_debt = base.total_debt - base.total_piti;
    let max_price = base.max_price * factor;
    let mortgage_payment = base.mortgage_payment * factor;
    let monthly_insurance = base.monthly_insurance * factor;
    let total_piti = mortgage_payment + monthly_insurance + base.hoa_fees;

    Ok(AffordabilityResult {
        max_price,
        loan_amount: max_price - down_payment,
        mortgage_payment,
        monthly_insurance,
        hoa_fees: base.hoa_fees,
        total_piti,
        max_piti: base.max_piti,
        total_debt: total_piti + monthly_debt,
        max_total_debt: base.max_total_debt,
        monthly_income: base.monthly_income,
        monthly_debt,
        down_payment,
    })
}

/// Holds the last computed result and the slider position applied to it.
///
/// Every adjustment is derived from the stored base, so moving the slider
/// back to zero restores the computed result without drift.
#[derive(Debug, Clone, Default)]
pub struct AdjustmentSession {
    base: Option<AffordabilityResult>,
    adjustment_percent: f64,
}

impl AdjustmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh result and resets the adjustment to 0%.
    pub fn calculate(&mut self, base: AffordabilityResult) {
        self.base = Some(base);
        self.adjustment_percent = 0.0;
    }

    pub fn set_adjustment(&mut self, adjustment_percent: f64) -> Result<(), CalcError> {
        validate_adjustment(adjustment_percent)?;
        if self.base.is_none() {
            return Err(CalcError::invalid(
                "adjustmentPercent",
                "requires a calculated result",
            ));
        }
        self.adjustment_percent = adjustment_percent;
        Ok(())
    }

    pub fn adjustment_percent(&self) -> f64 {
        self.adjustment_percent
    }

    /// The result as currently displayed, `None` before the first calculation.
    pub fn current(&self) -> Option<AffordabilityResult> {
        let base = self.base.as_ref()?;
        if self.adjustment_percent == 0.0 {
            return Some(base.clone());
        }
        adjust_payment(base, self.adjustment_percent).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::affordability::compute_affordability;
    use crate::core::types::{AffordabilityInput, DtiPolicy};
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn base_with_hoa(hoa_fees: f64) -> AffordabilityResult {
        let input = AffordabilityInput {
            annual_income: 42_000.0,
            down_payment: 60_000.0,
            monthly_debt: 150.0,
            interest_rate_percent: 3.5,
            loan_term_years: 25,
            insurance_rate_percent: 0.3,
            hoa_fees,
        };
        compute_affordability(&input, DtiPolicy::default()).expect("valid input")
    }

    fn assert_close(actual: &AffordabilityResult, expected: &AffordabilityResult) {
        assert_approx(actual.max_price, expected.max_price);
        assert_approx(actual.loan_amount, expected.loan_amount);
        assert_approx(actual.mortgage_payment, expected.mortgage_payment);
        assert_approx(actual.monthly_insurance, expected.monthly_insurance);
        assert_approx(actual.hoa_fees, expected.hoa_fees);
        assert_approx(actual.total_piti, expected.total_piti);
        assert_approx(actual.total_debt, expected.total_debt);
        assert_approx(actual.max_piti, expected.max_piti);
        assert_approx(actual.max_total_debt, expected.max_total_debt);
    }

    #[test]
    fn scales_price_driven_fields_only() {
        let base = base_with_hoa(60.0);
        let adjusted = adjust_payment(&base, 20.0).expect("valid adjustment");

        assert_approx(adjusted.max_price, base.max_price * 1.2);
        assert_approx(adjusted.mortgage_payment, base.mortgage_payment * 1.2);
        assert_approx(adjusted.monthly_insurance, base.monthly_insurance * 1.2);
        assert_approx(adjusted.hoa_fees, 60.0);
        assert_approx(
            adjusted.total_piti,
            adjusted.mortgage_payment + adjusted.monthly_insurance + 60.0,
        );
        assert_approx(adjusted.total_debt, adjusted.total_piti + 150.0);
        assert_approx(adjusted.loan_amount, adjusted.max_price - 60_000.0);
        assert_approx(adjusted.max_piti, base.max_piti);
        assert_approx(adjusted.max_total_debt, base.max_total_debt);
    }

    #[test]
    fn without_hoa_total_piti_scales_uniformly() {
        let base = base_with_hoa(0.0);
        let adjusted = adjust_payment(&base, -30.0).unwrap();
        assert_approx(adjusted.total_piti, base.total_piti * 0.7);
    }

    #[test]
    fn zero_adjustment_is_identity() {
        let base = base_with_hoa(45.0);
        assert_close(&adjust_payment(&base, 0.0).unwrap(), &base);
    }

    #[test]
    fn rejects_out_of_range_adjustment() {
        let base = base_with_hoa(0.0);
        assert!(adjust_payment(&base, 50.0).is_ok());
        assert!(adjust_payment(&base, -50.0).is_ok());
        assert_eq!(
            adjust_payment(&base, 50.5).unwrap_err().field(),
            "adjustmentPercent"
        );
        assert!(adjust_payment(&base, f64::NAN).is_err());
    }

    #[test]
    fn session_follows_compute_adjust_reset_cycle() {
        let mut session = AdjustmentSession::new();
        assert!(session.current().is_none());
        assert!(session.set_adjustment(10.0).is_err());

        let base = base_with_hoa(30.0);
        session.calculate(base.clone());
        assert_eq!(session.current(), Some(base.clone()));

        session.set_adjustment(20.0).unwrap();
        let raised = session.current().unwrap();
        assert_approx(raised.max_price, base.max_price * 1.2);

        // Repeated moves derive from the base, never from the previous view.
        session.set_adjustment(-10.0).unwrap();
        session.set_adjustment(20.0).unwrap();
        assert_close(&session.current().unwrap(), &raised);

        session.set_adjustment(0.0).unwrap();
        assert_eq!(session.current(), Some(base.clone()));

        session.set_adjustment(15.0).unwrap();
        let recomputed = base_with_hoa(0.0);
        session.calculate(recomputed.clone());
        assert_eq!(session.adjustment_percent(), 0.0);
        assert_eq!(session.current(), Some(recomputed));
    }

    #[test]
    fn invalid_slider_move_keeps_previous_position() {
        let mut session = AdjustmentSession::new();
        session.calculate(base_with_hoa(0.0));
        session.set_adjustment(25.0).unwrap();
        assert!(session.set_adjustment(75.0).is_err());
        assert_eq!(session.adjustment_percent(), 25.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_adjusted_results_stay_consistent(percent in -50i32..51, hoa in 0u32..300) {
            let base = base_with_hoa(hoa as f64);
            let adjusted = adjust_payment(&base, percent as f64).unwrap();
            let piti = adjusted.mortgage_payment + adjusted.monthly_insurance + adjusted.hoa_fees;
            prop_assert!((adjusted.total_piti - piti).abs() <= EPS);
            prop_assert!((adjusted.total_debt - adjusted.total_piti - base.monthly_debt).abs() <= EPS);
        }
    }
}
