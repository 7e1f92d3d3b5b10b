use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::temporal::now_timestamp;

/// One temperature sample for a container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// RFC 3339 timestamp of the sample.
    pub date: String,
    pub value: f64,
}

impl TemperatureReading {
    /// A reading taken now. Rejects NaN and infinities.
    pub fn now(value: f64) -> TypeResult<Self> {
        if !value.is_finite() {
            return Err(TypeError::NonFiniteReading(value.to_string()));
        }
        Ok(Self {
            date: now_timestamp(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_value_is_accepted() {
        let r = TemperatureReading::now(24.5).unwrap();
        assert_eq!(r.value, 24.5);
    }

    #[test]
    fn nan_is_rejected() {
        assert!(matches!(
            TemperatureReading::now(f64::NAN),
            Err(TypeError::NonFiniteReading(_))
        ));
    }

    #[test]
    fn decodes_stored_shape() {
        let raw = r#"[{"date":"2024-01-01T08:00:00.000Z","value":25}]"#;
        let rs: Vec<TemperatureReading> = serde_json::from_str(raw).unwrap();
        assert_eq!(rs[0].value, 25.0);
    }
}
