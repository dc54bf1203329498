use crate::adapt::{candidates::CandidateList, strategy::Strategy};
use crate::domain::mesh::{MeshRegularity, MAX_POLYNOMIAL_ORDER};
use crate::newton::ConvergenceMeasure;

use json::JsonValue;
use std::fs::read_to_string;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Parameters of the inner (adaptivity) loop and of the [RefinementSelector](crate::adapt::selector::RefinementSelector)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptivityParams {
    /// Stop once the relative error estimate (in percent) drops below this value
    pub err_stop: f64,
    /// Stop once the coarse space has at least this many DoFs
    pub ndof_stop: usize,
    /// Quantitative parameter of the selection [Strategy]
    pub threshold: f64,
    pub strategy: Strategy,
    pub regularity: MeshRegularity,
    /// Largest expansion order a refinement candidate may use
    pub max_order: u8,
    /// Added to every expansion order of the coarse space to build the reference space
    pub order_increase: u8,
    pub candidates: CandidateList,
    /// Exponent applied to the DoF cost when scoring candidates
    pub conv_exp: f64,
}

impl Default for AdaptivityParams {
    fn default() -> Self {
        Self {
            err_stop: 5.0,
            ndof_stop: 60000,
            threshold: 0.3,
            strategy: Strategy::RelativeToMax,
            regularity: MeshRegularity::Unconstrained,
            max_order: 5,
            order_increase: 1,
            candidates: CandidateList::HpAniso,
            conv_exp: 1.0,
        }
    }
}

/// Newton tolerances: the coarse tolerance is the looser of the two
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonParams {
    pub tol_coarse: f64,
    pub tol_fine: f64,
    pub max_iter: usize,
    pub convergence: ConvergenceMeasure,
}

impl Default for NewtonParams {
    fn default() -> Self {
        Self {
            tol_coarse: 0.05,
            tol_fine: 0.01,
            max_iter: 50,
            convergence: ConvergenceMeasure::ResidualNorm,
        }
    }
}

/// Everything the [TimeStepDriver](crate::time_stepping::TimeStepDriver) needs to know about the solution process
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
    pub adaptivity: AdaptivityParams,
    pub newton: NewtonParams,
    /// Uniform expansion order of the coarse space after every derefinement
    pub initial_order: u8,
    /// The coarse mesh is reset to the base mesh every `n` steps (never if `None`)
    pub derefinement_period: Option<NonZeroUsize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            adaptivity: AdaptivityParams::default(),
            newton: NewtonParams::default(),
            initial_order: 2,
            derefinement_period: NonZeroUsize::new(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: '{name}' must be {requirement}!")]
    Invalid {
        name: &'static str,
        requirement: &'static str,
    },
    #[error("Unable to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse configuration file: {0}")]
    Json(#[from] json::Error),
    #[error("Configuration entry '{0}' has the wrong type!")]
    WrongType(&'static str),
    #[error("Configuration entry '{name}' has an unknown value: {value}")]
    UnknownValue { name: &'static str, value: String },
}

impl SolverConfig {
    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.adaptivity;
        let n = &self.newton;

        require(a.err_stop > 0.0, "err_stop", "positive")?;
        require(a.ndof_stop > 0, "ndof_stop", "positive")?;
        require(
            a.threshold.is_finite() && a.threshold >= 0.0,
            "threshold",
            "finite and non-negative",
        )?;
        if matches!(a.strategy, Strategy::ProcessedFraction | Strategy::RelativeToMax) {
            require(a.threshold <= 1.0, "threshold", "at most 1 for this strategy")?;
        }
        require(a.max_order >= 1, "max_order", "at least 1")?;
        require(a.order_increase >= 1, "order_increase", "at least 1")?;
        require(
            a.max_order as usize + a.order_increase as usize <= MAX_POLYNOMIAL_ORDER as usize,
            "order_increase",
            "small enough that reference orders stay within MAX_POLYNOMIAL_ORDER",
        )?;
        require(
            a.conv_exp.is_finite() && a.conv_exp > 0.0,
            "conv_exp",
            "finite and positive",
        )?;

        require(n.tol_coarse > 0.0, "tol_coarse", "positive")?;
        require(n.tol_fine > 0.0, "tol_fine", "positive")?;
        require(n.max_iter > 0, "max_iter", "positive")?;

        require(self.initial_order >= 1, "initial_order", "at least 1")?;
        require(
            self.initial_order <= a.max_order,
            "initial_order",
            "no larger than max_order",
        )
    }

    /// Load a configuration from a JSON file
    ///
    /// Every entry is optional; missing entries take their default values.
    /// `"derefinement_period": false` turns derefinement off, a period of 0 is rejected.
    ///
    /// ```text
    /// {
    ///     "initial_order": 2,
    ///     "derefinement_period": 1,
    ///     "adaptivity": {
    ///         "err_stop": 5.0, "ndof_stop": 60000, "threshold": 0.3, "strategy": 1,
    ///         "mesh_regularity": -1, "max_order": 5, "order_increase": 1,
    ///         "candidates": "hp_aniso", "conv_exp": 1.0
    ///     },
    ///     "newton": { "tol_coarse": 0.05, "tol_fine": 0.01, "max_iter": 50, "convergence": "residual" }
    /// }
    /// ```
    pub fn from_file(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        let contents = read_to_string(path.as_ref())?;
        let config_json = json::parse(&contents)?;
        Self::from_json(&config_json)
    }

    pub fn from_json(config_json: &JsonValue) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(order) = read_u64(config_json, "initial_order")? {
            config.initial_order = to_u8(order, "initial_order")?;
        }
        match &config_json["derefinement_period"] {
            JsonValue::Boolean(false) => config.derefinement_period = None,
            _ => {
                if let Some(period) = read_u64(config_json, "derefinement_period")? {
                    config.derefinement_period = Some(NonZeroUsize::new(period as usize).ok_or(
                        ConfigError::Invalid {
                            name: "derefinement_period",
                            requirement: "at least 1 (or false to never derefine)",
                        },
                    )?);
                }
            }
        }

        let adapt_json = &config_json["adaptivity"];
        let a = &mut config.adaptivity;
        if let Some(v) = read_f64(adapt_json, "err_stop")? {
            a.err_stop = v;
        }
        if let Some(v) = read_u64(adapt_json, "ndof_stop")? {
            a.ndof_stop = v as usize;
        }
        if let Some(v) = read_f64(adapt_json, "threshold")? {
            a.threshold = v;
        }
        if let Some(v) = read_i64(adapt_json, "strategy")? {
            a.strategy = Strategy::from_code(v).ok_or(ConfigError::UnknownValue {
                name: "strategy",
                value: v.to_string(),
            })?;
        }
        if let Some(v) = read_i64(adapt_json, "mesh_regularity")? {
            a.regularity = match v {
                -1 => MeshRegularity::Unconstrained,
                level if (0..=u8::MAX as i64).contains(&level) => {
                    MeshRegularity::MaxHangingLevel(level as u8)
                }
                _ => {
                    return Err(ConfigError::UnknownValue {
                        name: "mesh_regularity",
                        value: v.to_string(),
                    })
                }
            };
        }
        if let Some(v) = read_u64(adapt_json, "max_order")? {
            a.max_order = to_u8(v, "max_order")?;
        }
        if let Some(v) = read_u64(adapt_json, "order_increase")? {
            a.order_increase = to_u8(v, "order_increase")?;
        }
        if let Some(v) = read_str(adapt_json, "candidates")? {
            a.candidates = CandidateList::from_name(v).ok_or_else(|| ConfigError::UnknownValue {
                name: "candidates",
                value: v.to_string(),
            })?;
        }
        if let Some(v) = read_f64(adapt_json, "conv_exp")? {
            a.conv_exp = v;
        }

        let newton_json = &config_json["newton"];
        let n = &mut config.newton;
        if let Some(v) = read_f64(newton_json, "tol_coarse")? {
            n.tol_coarse = v;
        }
        if let Some(v) = read_f64(newton_json, "tol_fine")? {
            n.tol_fine = v;
        }
        if let Some(v) = read_u64(newton_json, "max_iter")? {
            n.max_iter = v as usize;
        }
        if let Some(v) = read_str(newton_json, "convergence")? {
            n.convergence = match v {
                "residual" => ConvergenceMeasure::ResidualNorm,
                "update" => ConvergenceMeasure::UpdateNorm,
                _ => {
                    return Err(ConfigError::UnknownValue {
                        name: "convergence",
                        value: v.to_string(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

fn require(condition: bool, name: &'static str, requirement: &'static str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid { name, requirement })
    }
}

fn read_f64(section: &JsonValue, key: &'static str) -> Result<Option<f64>, ConfigError> {
    match &section[key] {
        JsonValue::Null => Ok(None),
        value => value.as_f64().map(Some).ok_or(ConfigError::WrongType(key)),
    }
}

fn read_u64(section: &JsonValue, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match &section[key] {
        JsonValue::Null => Ok(None),
        value => value.as_u64().map(Some).ok_or(ConfigError::WrongType(key)),
    }
}

fn read_i64(section: &JsonValue, key: &'static str) -> Result<Option<i64>, ConfigError> {
    match &section[key] {
        JsonValue::Null => Ok(None),
        value => value.as_i64().map(Some).ok_or(ConfigError::WrongType(key)),
    }
}

fn read_str<'a>(section: &'a JsonValue, key: &'static str) -> Result<Option<&'a str>, ConfigError> {
    match &section[key] {
        JsonValue::Null => Ok(None),
        value => value.as_str().map(Some).ok_or(ConfigError::WrongType(key)),
    }
}

fn to_u8(value: u64, name: &'static str) -> Result<u8, ConfigError> {
    u8::try_from(value).map_err(|_| ConfigError::Invalid {
        name,
        requirement: "at most 255",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SolverConfig::default();
        config.validate().unwrap();

        assert_eq!(config.initial_order, 2);
        assert_eq!(config.derefinement_period, NonZeroUsize::new(1));
        assert_eq!(config.adaptivity.err_stop, 5.0);
        assert_eq!(config.adaptivity.ndof_stop, 60000);
        assert_eq!(config.adaptivity.strategy, Strategy::RelativeToMax);
        assert!(config.newton.tol_coarse > config.newton.tol_fine);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SolverConfig::default();
        config.adaptivity.err_stop = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "err_stop", .. })
        ));

        let mut config = SolverConfig::default();
        config.adaptivity.threshold = 1.5;
        assert!(config.validate().is_err());
        config.adaptivity.strategy = Strategy::Absolute;
        assert!(config.validate().is_ok());

        let mut config = SolverConfig::default();
        config.newton.max_iter = 0;
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.adaptivity.order_increase = 16;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "order_increase", .. })
        ));

        let mut config = SolverConfig::default();
        config.initial_order = 6;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "initial_order", .. })
        ));
    }

    #[test]
    fn unreachable_stop_threshold_is_valid() {
        let mut config = SolverConfig::default();
        config.adaptivity.err_stop = 1e9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_config() {
        let config_json = json::parse(
            r#"{
                "derefinement_period": 3,
                "adaptivity": { "err_stop": 1.0, "strategy": 0, "mesh_regularity": 1, "candidates": "p_iso" },
                "newton": { "convergence": "update", "max_iter": 20 }
            }"#,
        )
        .unwrap();
        let config = SolverConfig::from_json(&config_json).unwrap();

        assert_eq!(config.derefinement_period, NonZeroUsize::new(3));
        assert_eq!(config.adaptivity.err_stop, 1.0);
        assert_eq!(config.adaptivity.strategy, Strategy::ProcessedFraction);
        assert_eq!(config.adaptivity.regularity, MeshRegularity::MaxHangingLevel(1));
        assert_eq!(config.adaptivity.candidates, CandidateList::PIso);
        assert_eq!(config.adaptivity.ndof_stop, 60000);
        assert_eq!(config.newton.convergence, ConvergenceMeasure::UpdateNorm);
        assert_eq!(config.newton.max_iter, 20);
        assert_eq!(config.newton.tol_fine, 0.01);
    }

    #[test]
    fn bad_json_config() {
        let unknown = json::parse(r#"{ "adaptivity": { "strategy": 7 } }"#).unwrap();
        assert!(matches!(
            SolverConfig::from_json(&unknown),
            Err(ConfigError::UnknownValue { name: "strategy", .. })
        ));

        let wrong_type = json::parse(r#"{ "newton": { "tol_fine": "small" } }"#).unwrap();
        assert!(matches!(
            SolverConfig::from_json(&wrong_type),
            Err(ConfigError::WrongType("tol_fine"))
        ));

        let zero = json::parse(r#"{ "derefinement_period": 0 }"#).unwrap();
        assert!(matches!(
            SolverConfig::from_json(&zero),
            Err(ConfigError::Invalid {
                name: "derefinement_period",
                ..
            })
        ));

        let never = json::parse(r#"{ "derefinement_period": false }"#).unwrap();
        assert_eq!(SolverConfig::from_json(&never).unwrap().derefinement_period, None);

        let negative = json::parse(r#"{ "derefinement_period": -2 }"#).unwrap();
        assert!(matches!(
            SolverConfig::from_json(&negative),
            Err(ConfigError::WrongType("derefinement_period"))
        ));
    }

    #[test]
    fn config_file() {
        let config = SolverConfig::from_file("./test_input/solver_config.json").unwrap();
        assert_eq!(config.adaptivity.threshold, 0.3);
        assert_eq!(config.adaptivity.candidates, CandidateList::HpAniso);
        assert_eq!(config.adaptivity.regularity, MeshRegularity::Unconstrained);

        assert!(matches!(
            SolverConfig::from_file("./test_input/missing_config.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
