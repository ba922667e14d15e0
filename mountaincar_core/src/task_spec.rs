//! Task specification string emitted by `initialize`.
//!
//! Grammar (fixed, consumed by external agents):
//!
//! ```text
//! <version>:<e|c>:<n>_[f,...]_[lo,hi]..._:<m>_[i,...]_[lo,hi]...
//! 1:e:2_[f,f]_[-1.2,0.6]_[-0.07,0.07]:1_[i]_[0,2]
//! ```
//!
//! Observation dimensions are continuous (`f`), action dimensions discrete
//! (`i`). Bounds are written in shortest round-trip form with a trailing
//! `.0` for integral values. Magnitudes outside `[1e-3, 1e7)` use scientific
//! notation with an upper-case `E` (`-1.0E-4`, `2.5E7`), as JVM consumers of
//! the grammar print them.

use crate::error::ProtocolError;
use crate::params::Parameters;
use std::fmt;
use std::str::FromStr;

/// Parsed form of the task specification string.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    /// Grammar version
    pub version: u32,

    /// Episodic (`e`) or continuing (`c`)
    pub episodic: bool,

    /// `[lo, hi]` per continuous observation dimension
    pub observation_bounds: Vec<(f64, f64)>,

    /// `[lo, hi]` per discrete action dimension
    pub action_bounds: Vec<(i64, i64)>,
}

impl TaskSpec {
    /// Builds the Mountain Car task spec for the given parameters.
    pub fn for_parameters(params: &Parameters) -> Self {
        Self {
            version: 1,
            episodic: true,
            observation_bounds: vec![
                (params.min_position, params.max_position),
                (params.min_velocity, params.max_velocity),
            ],
            action_bounds: vec![(0, 2)],
        }
    }

    /// Number of observation dimensions.
    pub fn num_observations(&self) -> usize {
        self.observation_bounds.len()
    }

    /// Number of action dimensions.
    pub fn num_actions(&self) -> usize {
        self.action_bounds.len()
    }
}

/// Formats a bound the way `Double.toString` does.
fn format_bound(v: f64) -> String {
    let magnitude = v.abs();
    if v == 0.0 || !v.is_finite() || (1e-3..1e7).contains(&magnitude) {
        return format!("{:?}", v);
    }
    let sci = format!("{:e}", v);
    match sci.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{}E{}", mantissa, exponent),
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => sci,
    }
}

fn type_list(tag: &str, n: usize) -> String {
    vec![tag; n].join(",")
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}_[{}]",
            self.version,
            if self.episodic { "e" } else { "c" },
            self.observation_bounds.len(),
            type_list("f", self.observation_bounds.len()),
        )?;
        for (lo, hi) in &self.observation_bounds {
            write!(f, "_[{},{}]", format_bound(*lo), format_bound(*hi))?;
        }
        write!(
            f,
            ":{}_[{}]",
            self.action_bounds.len(),
            type_list("i", self.action_bounds.len())
        )?;
        for (lo, hi) in &self.action_bounds {
            write!(f, "_[{},{}]", lo, hi)?;
        }
        Ok(())
    }
}

/// Splits `<n>_[t,...]_[lo,hi]...` into its declared count, types and bounds.
fn parse_section<'a>(
    spec: &str,
    section: &'a str,
    expected_type: &str,
) -> Result<Vec<(&'a str, &'a str)>, ProtocolError> {
    let mut parts = section.split('_');

    let count: usize = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| ProtocolError::malformed(spec, "missing dimension count"))?;

    let types = parts
        .next()
        .and_then(|t| t.strip_prefix('[')?.strip_suffix(']'))
        .ok_or_else(|| ProtocolError::malformed(spec, "missing type list"))?;
    let types: Vec<&str> = types.split(',').collect();
    if types.len() != count || types.iter().any(|t| *t != expected_type) {
        return Err(ProtocolError::malformed(
            spec,
            format!("expected {} '{}' dimensions", count, expected_type),
        ));
    }

    let bounds: Vec<(&str, &str)> = parts
        .map(|b| {
            b.strip_prefix('[')
                .and_then(|b| b.strip_suffix(']'))
                .and_then(|b| b.split_once(','))
                .ok_or_else(|| ProtocolError::malformed(spec, format!("bad bounds '{}'", b)))
        })
        .collect::<Result<_, _>>()?;
    if bounds.len() != count {
        return Err(ProtocolError::malformed(
            spec,
            format!("expected {} bounds, got {}", count, bounds.len()),
        ));
    }
    Ok(bounds)
}

impl FromStr for TaskSpec {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sections: Vec<&str> = s.trim().split(':').collect();
        if sections.len() != 4 {
            return Err(ProtocolError::malformed(s, "expected 4 ':'-separated sections"));
        }

        let version = sections[0]
            .parse()
            .map_err(|_| ProtocolError::malformed(s, "bad version"))?;
        let episodic = match sections[1] {
            "e" => true,
            "c" => false,
            other => {
                return Err(ProtocolError::malformed(
                    s,
                    format!("unknown task kind '{}'", other),
                ))
            }
        };

        let observation_bounds = parse_section(s, sections[2], "f")?
            .into_iter()
            .map(|(lo, hi)| match (lo.parse::<f64>(), hi.parse::<f64>()) {
                (Ok(lo), Ok(hi)) => Ok((lo, hi)),
                _ => Err(ProtocolError::malformed(s, "non-numeric observation bound")),
            })
            .collect::<Result<_, _>>()?;

        let action_bounds = parse_section(s, sections[3], "i")?
            .into_iter()
            .map(|(lo, hi)| match (lo.parse::<i64>(), hi.parse::<i64>()) {
                (Ok(lo), Ok(hi)) => Ok((lo, hi)),
                _ => Err(ProtocolError::malformed(s, "non-integer action bound")),
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            version,
            episodic,
            observation_bounds,
            action_bounds,
        })
    }
}
