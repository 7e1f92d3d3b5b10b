use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::temporal::now_timestamp;

/// Water chemistry and habitat measurements taken together.
///
/// Every field is optional: an aquarium logs ammonia and nitrate, a
/// terrarium logs humidity and soil moisture.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammonia: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrite: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
}

impl WaterStats {
    fn fields(&self) -> [(&'static str, Option<f64>); 9] {
        [
            ("ph", self.ph),
            ("ammonia", self.ammonia),
            ("nitrite", self.nitrite),
            ("nitrate", self.nitrate),
            ("hardness", self.hardness),
            ("co2", self.co2),
            ("humidity", self.humidity),
            ("light", self.light),
            ("soilMoisture", self.soil_moisture),
        ]
    }

    /// Measurements that are set, by wire name.
    pub fn present(&self) -> Vec<(&'static str, f64)> {
        self.fields()
            .into_iter()
            .filter_map(|(name, v)| v.map(|v| (name, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    /// At least one measurement, all of them finite.
    pub fn validate(&self) -> TypeResult<()> {
        let present = self.present();
        if present.is_empty() {
            return Err(TypeError::EmptyStats);
        }
        for (name, v) in present {
            if !v.is_finite() {
                return Err(TypeError::NonFiniteReading(format!("{name}={v}")));
            }
        }
        Ok(())
    }
}

/// One dated entry in a container's stats history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsEntry {
    /// RFC 3339 timestamp of the entry.
    pub date: String,
    pub stats: WaterStats,
}

impl StatsEntry {
    /// An entry stamped now, after validating `stats`.
    pub fn now(stats: WaterStats) -> TypeResult<Self> {
        stats.validate()?;
        Ok(Self {
            date: now_timestamp(),
            stats,
        })
    }
}
