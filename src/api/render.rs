use std::fmt::Write;

use crate::core::{AffordabilityReport, AffordabilityRisk, ApartmentType, WealthResult};

/// Formats euros the way Slovenian locale does: `1.234.567,89 €`.
pub fn format_eur(value: f64, fraction_digits: usize) -> String {
    if !value.is_finite() {
        return "0 €".to_string();
    }
    let rounded = format!("{:.*}", fraction_digits, value.abs());
    let (whole, fraction) = match rounded.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (rounded.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}{grouped},{fraction} €"),
        None => format!("{sign}{grouped} €"),
    }
}

pub fn apartment_label(apartment_type: ApartmentType) -> &'static str {
    match apartment_type {
        ApartmentType::Studio => "studio",
        ApartmentType::OneBedroom => "one bedroom",
        ApartmentType::TwoBedroom => "two bedroom",
        ApartmentType::ThreeBedroomOrLarger => "three bedroom or larger",
    }
}

fn risk_label(risk: AffordabilityRisk) -> &'static str {
    match risk {
        AffordabilityRisk::Comfortable => "comfortable",
        AffordabilityRisk::Stretched => "stretched",
        AffordabilityRisk::Risky => "risky",
    }
}

pub fn affordability_text(report: &AffordabilityReport, adjustment_percent: f64) -> String {
    let result = &report.result;
    let mut out = String::new();
    let _ = writeln!(out, "Maximum property price: {}", format_eur(result.max_price, 0));
    if adjustment_percent != 0.0 {
        let _ = writeln!(out, "Payment adjustment: {adjustment_percent:+}%");
    }
    match (report.payment_to_income_percent, report.risk) {
        (Some(share), Some(risk)) => {
            let _ = writeln!(
                out,
                "Housing cost share: {share:.1}% of income ({})",
                risk_label(risk)
            );
        }
        _ => {
            let _ = writeln!(out, "Housing cost share: unknown, no income on record");
        }
    }
    for estimate in &report.size_estimates {
        let _ = writeln!(
            out,
            "  {} ({} per m2): {:.2} m2, {}",
            estimate.zone,
            format_eur(estimate.price_per_square_meter, 0),
            estimate.size_square_meters,
            apartment_label(estimate.apartment_type)
        );
    }
    let _ = writeln!(out, "Monthly obligations:");
    for (label, amount) in [
        ("Mortgage", result.mortgage_payment),
        ("Insurance", result.monthly_insurance),
        ("HOA fees", result.hoa_fees),
        ("Total housing", result.total_piti),
        ("Housing cap", result.max_piti),
        ("Total debt", result.total_debt),
        ("Debt cap", result.max_total_debt),
    ] {
        let _ = writeln!(out, "  {label:<14}{:>14}", format_eur(amount, 0));
    }
    out
}

pub fn projection_text(result: &WealthResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Monthly investment: {}, effective return {:.2}%",
        format_eur(result.monthly_investment, 2),
        result.effective_annual_rate * 100.0
    );
    for point in result.points() {
        let _ = writeln!(out, "  year {:>3}: {:>18}", point.year, format_eur(point.capital, 0));
    }
    let _ = writeln!(
        out,
        "Contributed {} for a final capital of {}",
        format_eur(result.total_contributed, 0),
        format_eur(result.final_capital, 0)
    );
    out
}
