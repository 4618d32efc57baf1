/// Fixed-rate, fully amortizing loan schedule with monthly payments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amortization {
    monthly_rate: f64,
    payments: u32,
}

impl Amortization {
    pub fn new(annual_rate_percent: f64, term_years: u32) -> Self {
        Self {
            monthly_rate: annual_rate_percent / 100.0 / 12.0,
            payments: term_years * 12,
        }
    }

    pub fn monthly_rate(self) -> f64 {
        self.monthly_rate
    }

    pub fn payments(self) -> u32 {
        self.payments
    }

    fn is_interest_free(self) -> bool {
        self.monthly_rate.abs() < 1e-12
    }

    /// Monthly payment per unit of principal, `r / (1 - (1 + r)^-n)`.
    ///
    /// Falls back to straight-line repayment `1 / n` when the rate is zero,
    /// where the closed form is `0 / 0`.
    pub fn constant(self) -> f64 {
        let n = self.payments as f64;
        if self.is_interest_free() {
            return 1.0 / n;
        }
        let r = self.monthly_rate;
        r / (1.0 - (1.0 + r).powf(-n))
    }

    pub fn payment(self, principal: f64) -> f64 {
        if self.is_interest_free() {
            return principal / self.payments as f64;
        }
        self.constant() * principal
    }

    /// Principal that a monthly `payment` repays over the term.
    pub fn present_value(self, payment: f64) -> f64 {
        if self.is_interest_free() {
            return payment * self.payments as f64;
        }
        payment / self.constant()
    }
}
