//! Problem parameters and the typed parameter holder they are loaded from.
//!
//! A [`ParameterHolder`] is the external configuration surface: a mapping from
//! parameter name to a typed value (`bool` or `f64`) plus a table of aliases
//! (`freq`, `goal`, `startp`, `startv`). [`Parameters`] is the immutable,
//! validated view the simulator reads from.
//!
//! # Loading policy
//!
//! - A key absent from the holder falls back to its default.
//! - A key present with the wrong value type rejects construction.
//! - `min > max` bounds or non-finite values reject construction.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Parameter key: whether episodes start from a random state.
pub const RANDOM_START_STATES: &str = "randomStartStates";
/// Parameter key: lower velocity bound.
pub const MIN_VELOCITY: &str = "minVelocity";
/// Parameter key: upper velocity bound.
pub const MAX_VELOCITY: &str = "maxVelocity";
/// Parameter key: lower position bound.
pub const MIN_POSITION: &str = "minPosition";
/// Parameter key: upper position bound.
pub const MAX_POSITION: &str = "maxPosition";
/// Parameter key: thrust per unit of action.
pub const ACCELERATION: &str = "acceleration";
/// Parameter key: gravity coefficient applied to the slope.
pub const GRAVITY: &str = "gravity";
/// Parameter key: angular frequency of the hill profile.
pub const HILL_PEAK_FREQUENCY: &str = "frequency of the hill Peak";
/// Parameter key: position at or beyond which the episode ends.
pub const GOAL_POSITION: &str = "goalPosition";
/// Parameter key: fixed start position.
pub const START_POSITION: &str = "startPosition";
/// Parameter key: fixed start velocity.
pub const START_VELOCITY: &str = "startVelocity";

/// Short names every holder understands, even without an alias table.
pub const STANDARD_ALIASES: [(&str, &str); 4] = [
    ("freq", HILL_PEAK_FREQUENCY),
    ("goal", GOAL_POSITION),
    ("startp", START_POSITION),
    ("startv", START_VELOCITY),
];

/// A single typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Double(f64),
}

impl ParamValue {
    /// Returns the type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Double(_) => "double",
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Double(d) => write!(f, "{:?}", d),
        }
    }
}

/// Named, typed configuration values with optional aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterHolder {
    params: BTreeMap<String, ParamValue>,

    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl ParameterHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the holder carries no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of parameters (aliases not counted).
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Adds or replaces a boolean parameter.
    pub fn add_bool_param(&mut self, name: &str, value: bool) {
        let key = self.resolve(name).to_string();
        self.params.insert(key, ParamValue::Bool(value));
    }

    /// Adds or replaces a floating-point parameter.
    pub fn add_double_param(&mut self, name: &str, value: f64) {
        let key = self.resolve(name).to_string();
        self.params.insert(key, ParamValue::Double(value));
    }

    /// Registers `alias` as another name for `target`.
    pub fn set_alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Maps an alias to its canonical name; other names pass through.
    ///
    /// The holder's own alias table wins, then [`STANDARD_ALIASES`].
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        if let Some(target) = self.aliases.get(name) {
            return target;
        }
        STANDARD_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, target)| *target)
            .unwrap_or(name)
    }

    /// Returns true if `name` (or the parameter it aliases) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(self.resolve(name))
    }

    /// Looks up a raw value by name or alias.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(self.resolve(name))
    }

    /// Iterates over `(canonical name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reads a boolean parameter.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when it holds a
    /// value of another type.
    pub fn bool_param(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(ParamValue::Double(_)) => Err(ConfigError::TypeMismatch {
                key: self.resolve(name).to_string(),
                expected: "bool",
            }),
        }
    }

    /// Reads a floating-point parameter.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when it holds a
    /// value of another type.
    pub fn double_param(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Double(d)) => Ok(Some(*d)),
            Some(ParamValue::Bool(_)) => Err(ConfigError::TypeMismatch {
                key: self.resolve(name).to_string(),
                expected: "double",
            }),
        }
    }

    /// Overwrites an existing parameter from its textual form.
    ///
    /// The text is interpreted according to the type the parameter already
    /// has, so `set_from_str("goal", "0.45")` stores a double and
    /// `set_from_str("randomStartStates", "true")` stores a bool.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<(), ConfigError> {
        let key = self.resolve(name).to_string();
        let raw = raw.trim();

        let value = match self.params.get(&key) {
            None => return Err(ConfigError::UnknownParameter(name.to_string())),
            Some(ParamValue::Bool(_)) => raw
                .parse::<bool>()
                .map(ParamValue::Bool)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: raw.to_string(),
                })?,
            Some(ParamValue::Double(_)) => raw
                .parse::<f64>()
                .map(ParamValue::Double)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: raw.to_string(),
                })?,
        };

        debug!("Parameter {} set to {}", key, value);
        self.params.insert(key, value);
        Ok(())
    }

    /// Copies every parameter and alias of `other` into this holder.
    ///
    /// Names in `other` are resolved through this holder's aliases first, so
    /// merging `{"freq": 2.0}` updates `frequency of the hill Peak`.
    pub fn merge(&mut self, other: &ParameterHolder) {
        for (alias, target) in &other.aliases {
            self.aliases.insert(alias.clone(), target.clone());
        }
        for (name, value) in &other.params {
            let key = self.resolve(name).to_string();
            self.params.insert(key, *value);
        }
    }

    /// Serializes the holder to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a holder from JSON.
    ///
    /// Keys given by alias are stored under their canonical name.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: ParameterHolder = serde_json::from_str(json)?;
        let mut holder = ParameterHolder {
            params: BTreeMap::new(),
            aliases: raw.aliases.clone(),
        };
        for (name, value) in &raw.params {
            let key = holder.resolve(name).to_string();
            holder.params.insert(key, *value);
        }
        Ok(holder)
    }
}

/// Immutable problem parameters read by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Start each episode from a uniformly random state
    pub random_starts: bool,

    /// Position bounds
    pub min_position: f64,
    pub max_position: f64,

    /// Velocity bounds
    pub min_velocity: f64,
    pub max_velocity: f64,

    /// Episode terminates once `position >= goal_position`
    pub goal_position: f64,

    /// Velocity change per unit of thrust
    pub acceleration_factor: f64,

    /// Multiplies the slope term; negative pulls the car downhill
    pub gravity_factor: f64,

    /// Angular frequency of the hill profile
    pub hill_peak_frequency: f64,

    /// Start state used when `random_starts` is off
    pub default_init_position: f64,
    pub default_init_velocity: f64,

    /// Reward for every non-terminal step
    pub reward_per_step: f64,

    /// Reward for the step that reaches the goal
    pub reward_at_goal: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            random_starts: false,
            min_position: -1.2,
            max_position: 0.6,
            min_velocity: -0.07,
            max_velocity: 0.07,
            goal_position: 0.5,
            acceleration_factor: 0.001,
            gravity_factor: -0.0025,
            hill_peak_frequency: 3.0,
            default_init_position: -0.5,
            default_init_velocity: 0.0,
            reward_per_step: -1.0,
            reward_at_goal: 0.0,
        }
    }
}

impl Parameters {
    /// Builds a holder containing every recognised key with its default value
    /// and the standard aliases.
    pub fn default_holder() -> ParameterHolder {
        Self::default().to_holder()
    }

    /// Exports these parameters as a holder (with aliases registered).
    pub fn to_holder(&self) -> ParameterHolder {
        let mut p = ParameterHolder::new();
        p.add_bool_param(RANDOM_START_STATES, self.random_starts);

        p.add_double_param(MIN_VELOCITY, self.min_velocity);
        p.add_double_param(MAX_VELOCITY, self.max_velocity);

        p.add_double_param(MIN_POSITION, self.min_position);
        p.add_double_param(MAX_POSITION, self.max_position);

        p.add_double_param(ACCELERATION, self.acceleration_factor);
        p.add_double_param(GRAVITY, self.gravity_factor);
        p.add_double_param(HILL_PEAK_FREQUENCY, self.hill_peak_frequency);
        p.set_alias("freq", HILL_PEAK_FREQUENCY);

        p.add_double_param(GOAL_POSITION, self.goal_position);
        p.set_alias("goal", GOAL_POSITION);

        p.add_double_param(START_POSITION, self.default_init_position);
        p.set_alias("startp", START_POSITION);
        p.add_double_param(START_VELOCITY, self.default_init_velocity);
        p.set_alias("startv", START_VELOCITY);
        p
    }

    /// Loads parameters from a holder, falling back to defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] if a key holds a value of the
    /// wrong type and [`ConfigError::Inconsistent`] if the result fails
    /// [`validate`](Self::validate).
    pub fn from_holder(holder: &ParameterHolder) -> Result<Self, ConfigError> {
        let d = Self::default();
        if holder.is_empty() {
            return Ok(d);
        }

        // Aliased names resolve through the holder's own alias table, and the
        // canonical names always work.
        let params = Self {
            random_starts: holder.bool_param(RANDOM_START_STATES)?.unwrap_or(d.random_starts),
            min_velocity: holder.double_param(MIN_VELOCITY)?.unwrap_or(d.min_velocity),
            max_velocity: holder.double_param(MAX_VELOCITY)?.unwrap_or(d.max_velocity),
            min_position: holder.double_param(MIN_POSITION)?.unwrap_or(d.min_position),
            max_position: holder.double_param(MAX_POSITION)?.unwrap_or(d.max_position),
            acceleration_factor: holder.double_param(ACCELERATION)?.unwrap_or(d.acceleration_factor),
            gravity_factor: holder.double_param(GRAVITY)?.unwrap_or(d.gravity_factor),
            hill_peak_frequency: holder
                .double_param(HILL_PEAK_FREQUENCY)?
                .unwrap_or(d.hill_peak_frequency),
            goal_position: holder.double_param(GOAL_POSITION)?.unwrap_or(d.goal_position),
            default_init_position: holder
                .double_param(START_POSITION)?
                .unwrap_or(d.default_init_position),
            default_init_velocity: holder
                .double_param(START_VELOCITY)?
                .unwrap_or(d.default_init_velocity),
            reward_per_step: d.reward_per_step,
            reward_at_goal: d.reward_at_goal,
        };

        params.validate()?;
        debug!(
            "Loaded parameters: velocity [{}, {}], position [{}, {}]",
            params.min_velocity, params.max_velocity, params.min_position, params.max_position
        );
        Ok(params)
    }

    /// Checks that every value is finite and every bound pair is ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("minPosition", self.min_position),
            ("maxPosition", self.max_position),
            ("minVelocity", self.min_velocity),
            ("maxVelocity", self.max_velocity),
            ("goalPosition", self.goal_position),
            ("acceleration", self.acceleration_factor),
            ("gravity", self.gravity_factor),
            ("frequency of the hill Peak", self.hill_peak_frequency),
            ("startPosition", self.default_init_position),
            ("startVelocity", self.default_init_velocity),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Inconsistent(format!("{} is not finite ({})", name, value)));
        }

        if self.min_position > self.max_position {
            return Err(ConfigError::Inconsistent(format!(
                "minPosition {} exceeds maxPosition {}",
                self.min_position, self.max_position
            )));
        }
        if self.min_velocity > self.max_velocity {
            return Err(ConfigError::Inconsistent(format!(
                "minVelocity {} exceeds maxVelocity {}",
                self.min_velocity, self.max_velocity
            )));
        }
        if self.max_velocity < 0.0 {
            return Err(ConfigError::Inconsistent(format!(
                "maxVelocity {} is negative",
                self.max_velocity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_holder_gives_defaults() {
        let params = Parameters::from_holder(&ParameterHolder::new()).unwrap();
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn test_default_holder_roundtrips_to_defaults() {
        let holder = Parameters::default_holder();
        assert_eq!(holder.len(), 11);
        assert_eq!(Parameters::from_holder(&holder).unwrap(), Parameters::default());
    }

    #[test]
    fn test_aliases_resolve() {
        let mut holder = Parameters::default_holder();
        holder.add_double_param("freq", 2.5);
        holder.add_double_param("goal", 0.45);
        holder.add_double_param("startp", -0.3);
        holder.add_double_param("startv", 0.01);

        assert!(holder.contains("frequency of the hill Peak"));
        assert_eq!(holder.get("freq"), Some(&ParamValue::Double(2.5)));

        let params = Parameters::from_holder(&holder).unwrap();
        assert_eq!(params.hill_peak_frequency, 2.5);
        assert_eq!(params.goal_position, 0.45);
        assert_eq!(params.default_init_position, -0.3);
        assert_eq!(params.default_init_velocity, 0.01);
    }

    #[test]
    fn test_partial_holder_falls_back_to_defaults() {
        let mut holder = ParameterHolder::new();
        holder.add_bool_param(RANDOM_START_STATES, true);
        holder.add_double_param(GOAL_POSITION, 0.4);

        let params = Parameters::from_holder(&holder).unwrap();
        assert!(params.random_starts);
        assert_eq!(params.goal_position, 0.4);
        assert_eq!(params.min_position, -1.2);
        assert_eq!(params.gravity_factor, -0.0025);
    }

    #[test]
    fn test_type_mismatch_rejects() {
        let mut holder = ParameterHolder::new();
        holder.add_bool_param(MIN_POSITION, true);

        let err = Parameters::from_holder(&holder).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TypeMismatch {
                key: MIN_POSITION.to_string(),
                expected: "double"
            }
        );
    }

    #[test]
    fn test_inverted_bounds_reject() {
        let mut holder = ParameterHolder::new();
        holder.add_double_param(MIN_POSITION, 1.0);
        holder.add_double_param(MAX_POSITION, 0.0);
        assert!(matches!(
            Parameters::from_holder(&holder),
            Err(ConfigError::Inconsistent(_))
        ));

        let mut holder = ParameterHolder::new();
        holder.add_double_param(GRAVITY, f64::NAN);
        assert!(matches!(
            Parameters::from_holder(&holder),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_set_from_str_follows_existing_type() {
        let mut holder = Parameters::default_holder();
        holder.set_from_str("randomStartStates", "true").unwrap();
        holder.set_from_str("goal", "0.45").unwrap();

        assert_eq!(holder.bool_param(RANDOM_START_STATES).unwrap(), Some(true));
        assert_eq!(holder.double_param(GOAL_POSITION).unwrap(), Some(0.45));

        assert!(matches!(
            holder.set_from_str("goal", "far"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            holder.set_from_str("randomStartStates", "0.3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            holder.set_from_str("wind", "0.3"),
            Err(ConfigError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_aliases() {
        let mut holder = Parameters::default_holder();
        holder.add_double_param("freq", 4.0);

        let json = holder.to_json().unwrap();
        let restored = ParameterHolder::from_json(&json).unwrap();

        assert_eq!(restored, holder);
        assert_eq!(restored.double_param("freq").unwrap(), Some(4.0));
    }

    #[test]
    fn test_merge_resolves_aliases() {
        let mut overrides = ParameterHolder::new();
        overrides.add_double_param("freq", 2.0);
        overrides.add_bool_param(RANDOM_START_STATES, true);

        let mut holder = Parameters::default_holder();
        holder.merge(&overrides);

        assert_eq!(holder.len(), 11);
        assert_eq!(holder.double_param(HILL_PEAK_FREQUENCY).unwrap(), Some(2.0));
        assert_eq!(holder.bool_param(RANDOM_START_STATES).unwrap(), Some(true));
    }

    #[test]
    fn test_standard_aliases_without_alias_table() {
        let holder = ParameterHolder::from_json(r#"{"params":{"goal":0.3,"freq":2.0}}"#).unwrap();
        assert!(holder.contains(GOAL_POSITION));
        let params = Parameters::from_holder(&holder).unwrap();
        assert_eq!(params.goal_position, 0.3);
        assert_eq!(params.hill_peak_frequency, 2.0);

        let mut holder = ParameterHolder::new();
        holder.add_double_param("startp", -0.3);
        holder.add_double_param("startv", 0.02);
        let params = Parameters::from_holder(&holder).unwrap();
        assert_eq!(params.default_init_position, -0.3);
        assert_eq!(params.default_init_velocity, 0.02);
    }

    #[test]
    fn test_json_integer_reads_as_double() {
        let holder = ParameterHolder::from_json(r#"{"params":{"goalPosition":1}}"#).unwrap();
        assert_eq!(holder.double_param(GOAL_POSITION).unwrap(), Some(1.0));
    }
}
