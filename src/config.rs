use std::collections::HashMap;
use thiserror::Error;

use crate::core::{
    CENTRAL_LJUBLJANA_PRICE_PER_M2, DEFAULT_BACK_END_RATIO, DEFAULT_FLAT_RATIO,
    DEFAULT_FRONT_END_RATIO, DtiPolicy, Market, MarketZone, SUBURBAN_LJUBLJANA_PRICE_PER_M2,
    validate_policy,
};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub market: Market,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            market: Market::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let dti_policy = match env_map
            .get("DTI_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("two-tier")
        {
            "two-tier" => DtiPolicy::TwoTier {
                front_end: parse_f64(&env_map, "DTI_FRONT_END", DEFAULT_FRONT_END_RATIO)?,
                back_end: parse_f64(&env_map, "DTI_BACK_END", DEFAULT_BACK_END_RATIO)?,
            },
            "flat" => DtiPolicy::Flat {
                ratio: parse_f64(&env_map, "DTI_FLAT", DEFAULT_FLAT_RATIO)?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "DTI_POLICY".to_string(),
                    format!("must be two-tier or flat, got {}", other),
                ));
            }
        };
        validate_policy(dti_policy)
            .map_err(|e| ConfigError::InvalidValue("DTI_POLICY".to_string(), e.to_string()))?;

        let central = parse_price(
            &env_map,
            "CENTRAL_PRICE_PER_M2",
            CENTRAL_LJUBLJANA_PRICE_PER_M2,
        )?;
        let suburban = parse_price(
            &env_map,
            "SUBURB_PRICE_PER_M2",
            SUBURBAN_LJUBLJANA_PRICE_PER_M2,
        )?;

        Ok(Config {
            port,
            market: Market {
                dti_policy,
                zones: vec![
                    MarketZone {
                        name: "central".to_string(),
                        price_per_square_meter: central,
                    },
                    MarketZone {
                        name: "suburban".to_string(),
                        price_per_square_meter: suburban,
                    },
                ],
            },
        })
    }
}

fn parse_f64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    let Some(raw) = env_map.get(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ConfigError::InvalidValue(key.to_string(), "must be a number".to_string())
        })
}

fn parse_price(
    env_map: &HashMap<String, String>,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    let price = parse_f64(env_map, key, default)?;
    if price <= 0.0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be > 0".to_string(),
        ));
    }
    Ok(price)
}
