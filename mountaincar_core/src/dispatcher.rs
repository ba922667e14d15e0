//! Request dispatch: text in, text out.
//!
//! [`respond`] is the total function from a raw message to
//! `Result<Response, ProtocolError>`. [`handle_message`] additionally folds
//! errors into `ERROR` replies so a transport always has something to send
//! back. Protocol errors never touch simulator state.

use crate::capabilities::{BoundsQueryable, ObservationForState, ParameterReceivable, VersionAware};
use crate::error::ProtocolError;
use crate::protocol::{McState, Request, Response, HEIGHT_LOOKAHEAD};
use crate::simulator::Simulator;
use rand::Rng;
use tracing::{debug, warn};

/// Answers an already decoded request.
pub fn dispatch<R: Rng>(
    sim: &mut Simulator<R>,
    request: &Request,
) -> Result<Response, ProtocolError> {
    match request {
        Request::GetState => {
            let state = sim.state();
            Ok(Response::State(McState {
                position: state.position,
                velocity: state.velocity,
                height: sim.height(),
                delta_height: sim.height_at(state.position + HEIGHT_LOOKAHEAD),
                episode_number: state.episode_number,
                current_step: state.current_step,
                total_steps: state.total_steps,
            }))
        }
        Request::GetHeights(positions) => Ok(Response::Heights(
            positions.iter().map(|&p| sim.height_at(p)).collect(),
        )),
        Request::GetMaxValue(dim) => Ok(Response::Value(sim.max_value_for_variable(*dim))),
        Request::GetMinValue(dim) => Ok(Response::Value(sim.min_value_for_variable(*dim))),
        Request::ObservationForState(state) => {
            Ok(Response::Observation(sim.observation_for_state(state)))
        }
        Request::SetParameters(holder) => Ok(Response::Ack(sim.receive_parameters(holder))),
        Request::GetVersion => {
            let (major, minor) = sim.supported_version();
            Ok(Response::Version { major, minor })
        }
    }
}

/// Decodes and answers a raw message.
pub fn respond<R: Rng>(sim: &mut Simulator<R>, raw: &str) -> Result<Response, ProtocolError> {
    let request = Request::parse(raw)?;
    debug!("Dispatching {:?}", request);
    dispatch(sim, &request)
}

/// Decodes and answers a raw message, encoding failures as `ERROR` replies.
pub fn handle_message<R: Rng>(sim: &mut Simulator<R>, raw: &str) -> String {
    match respond(sim, raw) {
        Ok(response) => response.encode(),
        Err(err) => {
            warn!("Rejected message: {}", err);
            Response::from_error(&err).encode()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::params::Parameters;
    use crate::simulator::Action;
    use approx::assert_abs_diff_eq;

    fn ready_sim() -> Simulator {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        sim.start_episode();
        sim
    }

    #[test]
    fn test_heights_example() {
        let mut sim = ready_sim();
        let response = respond(&mut sim, "GETHEIGHTS:3:0.0:0.5:-0.5").unwrap();

        let Response::Heights(h) = response else {
            panic!("expected Heights, got {:?}", response);
        };
        assert_eq!(h, vec![-(0.0f64).sin(), -(1.5f64).sin(), -(-1.5f64).sin()]);
        assert_abs_diff_eq!(h[0], 0.0);
        assert_abs_diff_eq!(h[1], -0.997, epsilon = 1e-3);
        assert_abs_diff_eq!(h[2], 0.997, epsilon = 1e-3);
    }

    #[test]
    fn test_state_query() {
        let mut sim = ready_sim();
        sim.step(Action::Forward);

        let Response::State(state) = respond(&mut sim, "GETMCSTATE").unwrap() else {
            panic!("expected State");
        };
        assert_eq!(state.position, sim.position());
        assert_eq!(state.velocity, sim.velocity());
        assert_eq!(state.height, sim.height_at(sim.position()));
        assert_eq!(state.delta_height, sim.height_at(sim.position() + 0.05));
        assert_eq!(state.episode_number, 1);
        assert_eq!(state.current_step, 1);
        assert_eq!(state.total_steps, 2);
    }

    #[test]
    fn test_bounds_queries() {
        let mut sim = ready_sim();
        assert_eq!(handle_message(&mut sim, "GETMAXVALUE:0"), "VALUE:0.6");
        assert_eq!(handle_message(&mut sim, "GETMINVALUE:0"), "VALUE:-1.2");
        assert_eq!(handle_message(&mut sim, "GETMAXVALUE:1"), "VALUE:0.07");
        assert_eq!(handle_message(&mut sim, "GETMINVALUE:1"), "VALUE:-0.07");
        assert_eq!(handle_message(&mut sim, "GETMAXVALUE:5"), "VALUE:0.07");
        assert_eq!(handle_message(&mut sim, "GETMINVALUE:5"), "VALUE:-0.07");

        let err = respond(&mut sim, "GETMAXVALUE:x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
    }

    #[test]
    fn test_velocity_bounds_follow_max_velocity() {
        let params = Parameters {
            min_velocity: -0.05,
            ..Parameters::default()
        };
        let mut sim = Simulator::new(params);
        assert_eq!(handle_message(&mut sim, "GETMINVALUE:1"), "VALUE:-0.07");
        assert_eq!(handle_message(&mut sim, "GETMAXVALUE:2"), "VALUE:0.07");
    }

    #[test]
    fn test_standard_queries() {
        let mut sim = ready_sim();
        assert_eq!(handle_message(&mut sim, "GETOBSFORSTATE:2:0.1:-0.02"), "OBS:2:0.1:-0.02");
        assert_eq!(handle_message(&mut sim, "GETVERSION"), "VERSION:1:1");

        let raw = format!("SETPARAMS:{}", Parameters::default_holder().to_json().unwrap());
        assert_eq!(handle_message(&mut sim, &raw), "ACK:true");
    }

    #[test]
    fn test_errors_do_not_touch_state() {
        let mut sim = ready_sim();
        sim.step(Action::Reverse);
        let before = *sim.state();

        let reply = handle_message(&mut sim, "GETHEIGHTS:4:0.1");
        assert!(reply.starts_with("ERROR:MALFORMED_REQUEST:"));

        let reply = handle_message(&mut sim, "DANCE");
        assert_eq!(reply, "ERROR:UNKNOWN_REQUEST:DANCE");

        assert_eq!(*sim.state(), before);

        // The session keeps working after a bad request.
        assert!(handle_message(&mut sim, "GETMCSTATE").starts_with("MCSTATE:"));
    }
}
