use super::error::{CalcError, require_non_negative, require_range};
use super::types::{WealthInput, WealthResult};

pub const MAX_PROJECTION_YEARS: u32 = 100;

pub fn validate_wealth_input(input: &WealthInput) -> Result<(), CalcError> {
    require_non_negative("currentCapital", input.current_capital)?;
    require_non_negative("monthlyIncome", input.monthly_income)?;
    require_range("investmentPercentage", input.investment_percentage, 0.0, 100.0)?;
    require_range("expenseRatioPercent", input.expense_ratio_percent, 0.0, 100.0)?;
    require_range("returnRatePercent", input.return_rate_percent, -100.0, 1_000.0)?;
    if input.return_rate_percent <= -100.0 {
        return Err(CalcError::invalid("returnRatePercent", "must be > -100"));
    }
    if input.years > MAX_PROJECTION_YEARS {
        return Err(CalcError::invalid(
            "years",
            format!("must be <= {MAX_PROJECTION_YEARS}"),
        ));
    }
    Ok(())
}

/// Year-by-year capital with contributions credited at each year end.
///
/// Runs the recurrence `c[y] = c[y-1] * (1 + rate) + 12 * monthly` step by
/// step rather than the annuity closed form, which divides by the rate. A
/// negative effective rate is allowed and capital is not floored.
pub fn project_wealth(input: &WealthInput) -> Result<WealthResult, CalcError> {
    validate_wealth_input(input)?;

    let effective_annual_rate = (input.return_rate_percent - input.expense_ratio_percent) / 100.0;
    let monthly_investment = input.monthly_income * input.investment_percentage / 100.0;
    let annual_contribution = monthly_investment * 12.0;

    let mut capital_by_year = Vec::with_capacity(input.years as usize + 1);
    let mut capital = input.current_capital;
    capital_by_year.push(capital);
    for _ in 1..=input.years {
        capital = capital * (1.0 + effective_annual_rate) + annual_contribution;
        capital_by_year.push(capital);
    }

    Ok(WealthResult {
        effective_annual_rate,
        monthly_investment,
        total_contributed: annual_contribution * input.years as f64,
        final_capital: capital,
        capital_by_year,
    })
}
