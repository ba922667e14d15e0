//! Textual query protocol spoken by agents and visualizers.
//!
//! Every message is a single string of `:`-separated tokens; the first token
//! names the request or response. Parsing produces a closed [`Request`] enum,
//! so the dispatcher can handle every variant exhaustively.
//!
//! | request                          | response                          |
//! |----------------------------------|-----------------------------------|
//! | `GETMCSTATE`                     | `MCSTATE:p:v:h:h+:ep:step:total`  |
//! | `GETHEIGHTS:n:p1:...:pn`         | `HEIGHTS:n:h1:...:hn`             |
//! | `GETMAXVALUE:dim`                | `VALUE:x`                         |
//! | `GETMINVALUE:dim`                | `VALUE:x`                         |
//! | `GETOBSFORSTATE:n:s1:...:sn`     | `OBS:n:o1:...:on`                 |
//! | `SETPARAMS:<json>`               | `ACK:true`                        |
//! | `GETVERSION`                     | `VERSION:major:minor`             |
//!
//! Failures are answered with `ERROR:<KIND>:<detail>`.

use crate::error::{ErrorKind, ProtocolError};
use crate::params::ParameterHolder;
use std::fmt;

/// Offset ahead of the car at which `GETMCSTATE` samples a second height.
pub const HEIGHT_LOOKAHEAD: f64 = 0.05;

const GET_STATE: &str = "GETMCSTATE";
const GET_HEIGHTS: &str = "GETHEIGHTS";
const GET_MAX_VALUE: &str = "GETMAXVALUE";
const GET_MIN_VALUE: &str = "GETMINVALUE";
const GET_OBS_FOR_STATE: &str = "GETOBSFORSTATE";
const SET_PARAMS: &str = "SETPARAMS";
const GET_VERSION: &str = "GETVERSION";

const MC_STATE: &str = "MCSTATE";
const HEIGHTS: &str = "HEIGHTS";
const VALUE: &str = "VALUE";
const OBS: &str = "OBS";
const ACK: &str = "ACK";
const VERSION: &str = "VERSION";
const ERROR: &str = "ERROR";

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Full car state plus counters
    GetState,

    /// Hill heights at the given positions, answered in order
    GetHeights(Vec<f64>),

    /// Upper bound of a variable (0 = position, 1 = velocity)
    GetMaxValue(usize),

    /// Lower bound of a variable (0 = position, 1 = velocity)
    GetMinValue(usize),

    /// Observation an agent would see for the given state
    ObservationForState(Vec<f64>),

    /// Run-time parameter injection
    SetParameters(ParameterHolder),

    /// Protocol version query
    GetVersion,
}

/// Car state reported to visualizers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McState {
    pub position: f64,
    pub velocity: f64,

    /// Height under the car
    pub height: f64,

    /// Height [`HEIGHT_LOOKAHEAD`] ahead of the car
    pub delta_height: f64,

    pub episode_number: u32,
    pub current_step: u32,
    pub total_steps: u32,
}

/// A response ready to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    State(McState),
    Heights(Vec<f64>),
    Value(f64),
    Observation(Vec<f64>),
    Ack(bool),
    Version { major: u32, minor: u32 },
    Error { kind: ErrorKind, detail: String },
}

/// Splits a message into its head token and the remainder (if any).
fn split_head(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (raw, None),
    }
}

fn parse_f64(raw: &str, token: &str) -> Result<f64, ProtocolError> {
    token
        .trim()
        .parse()
        .map_err(|_| ProtocolError::malformed(raw, format!("'{}' is not a number", token)))
}

fn parse_u32(raw: &str, token: &str) -> Result<u32, ProtocolError> {
    token
        .trim()
        .parse()
        .map_err(|_| ProtocolError::malformed(raw, format!("'{}' is not a count", token)))
}

/// Reads `n:v1:...:vn`; tokens beyond the declared count are ignored.
fn parse_counted(raw: &str, rest: Option<&str>) -> Result<Vec<f64>, ProtocolError> {
    let rest = rest.ok_or_else(|| ProtocolError::malformed(raw, "missing sample count"))?;
    let mut tokens = rest.split(':');

    let count_token = tokens.next().unwrap_or("");
    let count: usize = count_token.trim().parse().map_err(|_| {
        ProtocolError::malformed(raw, format!("'{}' is not a sample count", count_token))
    })?;

    let samples: Vec<&str> = tokens.take(count).collect();
    if samples.len() < count {
        return Err(ProtocolError::malformed(
            raw,
            format!("declared {} samples, got {}", count, samples.len()),
        ));
    }
    samples.into_iter().map(|t| parse_f64(raw, t)).collect()
}

fn parse_dimension(raw: &str, rest: Option<&str>) -> Result<usize, ProtocolError> {
    let token = rest.ok_or_else(|| ProtocolError::malformed(raw, "missing dimension"))?;
    token
        .trim()
        .parse()
        .map_err(|_| ProtocolError::malformed(raw, format!("'{}' is not a dimension", token)))
}

fn reject_arguments(raw: &str, rest: Option<&str>) -> Result<(), ProtocolError> {
    match rest {
        Some(args) if !args.trim().is_empty() => {
            Err(ProtocolError::malformed(raw, "request takes no arguments"))
        }
        _ => Ok(()),
    }
}

fn write_counted(f: &mut fmt::Formatter<'_>, head: &str, values: &[f64]) -> fmt::Result {
    write!(f, "{}:{}", head, values.len())?;
    for v in values {
        write!(f, ":{:?}", v)?;
    }
    Ok(())
}

impl Request {
    /// Decodes a request string.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownRequest`] if the head token is not recognised,
    /// [`ProtocolError::MalformedRequest`] if its arguments are unusable.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        let (head, rest) = split_head(raw);

        match head {
            GET_STATE => reject_arguments(raw, rest).map(|_| Request::GetState),
            GET_HEIGHTS => parse_counted(raw, rest).map(Request::GetHeights),
            GET_MAX_VALUE => parse_dimension(raw, rest).map(Request::GetMaxValue),
            GET_MIN_VALUE => parse_dimension(raw, rest).map(Request::GetMinValue),
            GET_OBS_FOR_STATE => parse_counted(raw, rest).map(Request::ObservationForState),
            SET_PARAMS => {
                let json = rest.ok_or_else(|| ProtocolError::malformed(raw, "missing payload"))?;
                ParameterHolder::from_json(json)
                    .map(Request::SetParameters)
                    .map_err(|e| ProtocolError::malformed(raw, e.to_string()))
            }
            GET_VERSION => reject_arguments(raw, rest).map(|_| Request::GetVersion),
            _ => Err(ProtocolError::unknown(raw)),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::GetState => f.write_str(GET_STATE),
            Request::GetHeights(positions) => write_counted(f, GET_HEIGHTS, positions),
            Request::GetMaxValue(dim) => write!(f, "{}:{}", GET_MAX_VALUE, dim),
            Request::GetMinValue(dim) => write!(f, "{}:{}", GET_MIN_VALUE, dim),
            Request::ObservationForState(state) => write_counted(f, GET_OBS_FOR_STATE, state),
            Request::SetParameters(holder) => {
                let json = holder.to_json().map_err(|_| fmt::Error)?;
                write!(f, "{}:{}", SET_PARAMS, json)
            }
            Request::GetVersion => f.write_str(GET_VERSION),
        }
    }
}

impl Response {
    /// Builds the error reply for a protocol failure.
    pub fn from_error(err: &ProtocolError) -> Self {
        Self::Error {
            kind: err.kind(),
            detail: err.detail(),
        }
    }

    /// Encodes the response as a protocol string.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes a response string (client side).
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        let (head, rest) = split_head(raw);
        let fields: Vec<&str> = rest.map(|r| r.split(':').collect()).unwrap_or_default();

        match head {
            MC_STATE => {
                if fields.len() != 7 {
                    return Err(ProtocolError::malformed(raw, "MCSTATE carries 7 fields"));
                }
                Ok(Response::State(McState {
                    position: parse_f64(raw, fields[0])?,
                    velocity: parse_f64(raw, fields[1])?,
                    height: parse_f64(raw, fields[2])?,
                    delta_height: parse_f64(raw, fields[3])?,
                    episode_number: parse_u32(raw, fields[4])?,
                    current_step: parse_u32(raw, fields[5])?,
                    total_steps: parse_u32(raw, fields[6])?,
                }))
            }
            HEIGHTS => parse_counted(raw, rest).map(Response::Heights),
            OBS => parse_counted(raw, rest).map(Response::Observation),
            VALUE => match fields.as_slice() {
                [v] => Ok(Response::Value(parse_f64(raw, v)?)),
                _ => Err(ProtocolError::malformed(raw, "VALUE carries 1 field")),
            },
            ACK => match fields.as_slice() {
                ["true"] => Ok(Response::Ack(true)),
                ["false"] => Ok(Response::Ack(false)),
                _ => Err(ProtocolError::malformed(raw, "ACK carries true or false")),
            },
            VERSION => match fields.as_slice() {
                [major, minor] => Ok(Response::Version {
                    major: parse_u32(raw, major)?,
                    minor: parse_u32(raw, minor)?,
                }),
                _ => Err(ProtocolError::malformed(raw, "VERSION carries 2 fields")),
            },
            ERROR => {
                let rest = rest.unwrap_or("");
                let (kind, detail) = rest.split_once(':').unwrap_or((rest, ""));
                let kind = kind
                    .parse()
                    .map_err(|e: String| ProtocolError::malformed(raw, e))?;
                Ok(Response::Error {
                    kind,
                    detail: detail.to_string(),
                })
            }
            _ => Err(ProtocolError::unknown(raw)),
        }
    }

    /// Returns true for error replies.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::State(s) => write!(
                f,
                "{}:{:?}:{:?}:{:?}:{:?}:{}:{}:{}",
                MC_STATE,
                s.position,
                s.velocity,
                s.height,
                s.delta_height,
                s.episode_number,
                s.current_step,
                s.total_steps
            ),
            Response::Heights(heights) => write_counted(f, HEIGHTS, heights),
            Response::Value(v) => write!(f, "{}:{:?}", VALUE, v),
            Response::Observation(values) => write_counted(f, OBS, values),
            Response::Ack(ok) => write!(f, "{}:{}", ACK, ok),
            Response::Version { major, minor } => write!(f, "{}:{}:{}", VERSION, major, minor),
            Response::Error { kind, detail } => write!(f, "{}:{}:{}", ERROR, kind, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;

    #[test]
    fn test_parse_state_and_version() {
        assert_eq!(Request::parse("GETMCSTATE").unwrap(), Request::GetState);
        assert_eq!(Request::parse("  GETVERSION\n").unwrap(), Request::GetVersion);
        assert_eq!(
            Request::parse("GETMCSTATE:now").unwrap_err().kind(),
            ErrorKind::MalformedRequest
        );
    }

    #[test]
    fn test_parse_heights() {
        let req = Request::parse("GETHEIGHTS:3:0.0:0.5:-0.5").unwrap();
        assert_eq!(req, Request::GetHeights(vec![0.0, 0.5, -0.5]));

        assert_eq!(Request::parse("GETHEIGHTS:0").unwrap(), Request::GetHeights(vec![]));

        // Trailing tokens past the declared count are ignored.
        assert_eq!(
            Request::parse("GETHEIGHTS:1:0.25:9.9").unwrap(),
            Request::GetHeights(vec![0.25])
        );
    }

    #[test]
    fn test_parse_heights_malformed() {
        for raw in [
            "GETHEIGHTS",
            "GETHEIGHTS:",
            "GETHEIGHTS:3:0.0:0.5",
            "GETHEIGHTS:two:0.0:0.5",
            "GETHEIGHTS:-1",
            "GETHEIGHTS:2:0.0:up",
        ] {
            let err = Request::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedRequest, "{}", raw);
        }
    }

    #[test]
    fn test_parse_bounds_queries() {
        assert_eq!(Request::parse("GETMAXVALUE:0").unwrap(), Request::GetMaxValue(0));
        assert_eq!(Request::parse("GETMINVALUE:1").unwrap(), Request::GetMinValue(1));
        assert!(Request::parse("GETMAXVALUE").is_err());
        assert!(Request::parse("GETMINVALUE:x").is_err());
    }

    #[test]
    fn test_parse_set_params() {
        let holder = Parameters::default_holder();
        let raw = format!("SETPARAMS:{}", holder.to_json().unwrap());

        assert_eq!(Request::parse(&raw).unwrap(), Request::SetParameters(holder));
        assert_eq!(
            Request::parse("SETPARAMS:{not json").unwrap_err().kind(),
            ErrorKind::MalformedRequest
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = Request::parse("GETWEATHER:today").unwrap_err();
        assert_eq!(err, ProtocolError::unknown("GETWEATHER:today"));
        assert_eq!(Request::parse("").unwrap_err().kind(), ErrorKind::UnknownRequest);
        // Prefix matching is on whole tokens only.
        assert_eq!(
            Request::parse("GETHEIGHTSX:1:0.0").unwrap_err().kind(),
            ErrorKind::UnknownRequest
        );
    }

    #[test]
    fn test_request_display_parses_back() {
        let requests = [
            Request::GetState,
            Request::GetHeights(vec![-1.2, 0.0, 0.6]),
            Request::GetMaxValue(1),
            Request::ObservationForState(vec![0.1, 0.01]),
            Request::SetParameters(Parameters::default_holder()),
        ];
        for req in requests {
            assert_eq!(Request::parse(&req.to_string()).unwrap(), req);
        }
    }

    #[test]
    fn test_encode_responses() {
        assert_eq!(Response::Heights(vec![0.0, -1.0]).encode(), "HEIGHTS:2:0.0:-1.0");
        assert_eq!(Response::Value(0.6).encode(), "VALUE:0.6");
        assert_eq!(Response::Ack(true).encode(), "ACK:true");
        assert_eq!(Response::Version { major: 1, minor: 1 }.encode(), "VERSION:1:1");
        assert_eq!(
            Response::from_error(&ProtocolError::unknown("HELLO")).encode(),
            "ERROR:UNKNOWN_REQUEST:HELLO"
        );
    }

    #[test]
    fn test_state_response_decodes() {
        let state = McState {
            position: -0.5,
            velocity: 0.001,
            height: 0.9975,
            delta_height: 0.9996,
            episode_number: 3,
            current_step: 17,
            total_steps: 90,
        };
        let encoded = Response::State(state).encode();
        assert!(encoded.starts_with("MCSTATE:-0.5:0.001:"));
        assert_eq!(Response::parse(&encoded).unwrap(), Response::State(state));
    }

    #[test]
    fn test_error_response_keeps_colons_in_detail() {
        let err = ProtocolError::malformed("GETHEIGHTS:2:0.1", "declared 2 samples, got 1");
        let decoded = Response::parse(&Response::from_error(&err).encode()).unwrap();
        assert_eq!(
            decoded,
            Response::Error {
                kind: ErrorKind::MalformedRequest,
                detail: "GETHEIGHTS:2:0.1 (declared 2 samples, got 1)".to_string(),
            }
        );
        assert!(decoded.is_error());
    }

    #[test]
    fn test_response_parse_rejects_garbage() {
        assert!(Response::parse("MCSTATE:1:2").is_err());
        assert!(Response::parse("VALUE").is_err());
        assert!(Response::parse("ERROR:BOGUS:x").is_err());
        assert_eq!(Response::parse("PONG").unwrap_err().kind(), ErrorKind::UnknownRequest);
    }
}
