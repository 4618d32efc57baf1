use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("{field} {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },
}

impl CalcError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { field, .. } => field,
        }
    }
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), CalcError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalcError::invalid(field, "must be a finite number"))
    }
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), CalcError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(CalcError::invalid(field, "must be >= 0"));
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), CalcError> {
    require_finite(field, value)?;
    if !(min..=max).contains(&value) {
        return Err(CalcError::invalid(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}
