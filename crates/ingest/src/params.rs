//! Control parameter validation.
//!
//! Values are rejected rather than clamped: a slider outside `1..=10` means the
//! caller and the service disagree about the contract, and silently moving the
//! value would change what the caller asked for. All four fields are checked
//! before returning, so a single error names every bad field.
use crate::error::{ParameterViolation, ValidationError, ViolationReason};
use crate::types::{ControlParameters, ParameterField, RawParameters, RawValue};

pub const PARAM_MIN: i64 = 1;
pub const PARAM_MAX: i64 = 10;

/// Parses and range-checks the four control parameters.
///
/// Text values are trimmed and must parse as a base-10 integer. Numeric values
/// must be whole; `5.0` from a JSON body is rejected like `"5.0"` from a form.
pub fn validate_parameters(raw: &RawParameters) -> Result<ControlParameters, ValidationError> {
    let mut values = [0u8; 4];
    let mut violations = Vec::new();

    for (slot, field) in values.iter_mut().zip(ParameterField::ALL) {
        match check_value(raw.get(field)) {
            Ok(value) => *slot = value,
            Err(reason) => violations.push(ParameterViolation { field, reason }),
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError::InvalidParameters(violations));
    }

    let [faithfulness, human_like, ai_like, formality] = values;
    Ok(ControlParameters {
        faithfulness,
        human_like,
        ai_like,
        formality,
    })
}

fn check_value(value: Option<&RawValue>) -> Result<u8, ViolationReason> {
    let parsed = match value {
        None => return Err(ViolationReason::Missing),
        Some(RawValue::Integer(v)) => *v,
        Some(RawValue::Float(v)) => return Err(ViolationReason::NotAnInteger(v.to_string())),
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(ViolationReason::Missing);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| ViolationReason::NotAnInteger(text.clone()))?
        }
    };

    if !(PARAM_MIN..=PARAM_MAX).contains(&parsed) {
        return Err(ViolationReason::OutOfRange(parsed));
    }
    // In range, so the cast cannot truncate.
    Ok(parsed as u8)
}
