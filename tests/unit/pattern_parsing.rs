//! Unit tests for theta-rho decoding and motion planning.

use proptest::prelude::*;

use sandtable_motion::motion::plan;
use sandtable_motion::pattern::{decode, Coordinate};

#[test]
fn decode_accepts_crlf_line_endings() {
    let coords = decode("0.0 0.2\r\n1.0 0.5\r\n").unwrap();
    assert_eq!(coords.len(), 2);
    assert_eq!(coords[1], Coordinate::new(1.0, 0.5));
}

#[test]
fn decode_accepts_tab_separated_fields() {
    let coords = decode("0.0\t0.2\n1.0\t 0.5\n").unwrap();
    assert_eq!(coords.len(), 2);
}

#[test]
fn decode_accepts_scientific_notation() {
    let coords = decode("1.5e1 0.5\n-2e0 1e0\n").unwrap();
    assert_eq!(coords[0].theta, 15.0);
    assert_eq!(coords[1], Coordinate::new(-2.0, 1.0));
}

#[test]
fn decode_skips_indented_comments() {
    let coords = decode("  # indented comment\n0.0 0.5\n").unwrap();
    assert_eq!(coords.len(), 1);
}

proptest! {
    /// Any rendered coordinate list decodes back to the same sequence,
    /// in order.
    #[test]
    fn prop_decode_round_trips(
        coords in prop::collection::vec((-50.0f64..50.0, 0.0f64..=1.0), 1..64)
    ) {
        let text = coords
            .iter()
            .map(|(theta, rho)| format!("{:.6} {:.6}", theta, rho))
            .collect::<Vec<_>>()
            .join("\n");

        let decoded = decode(&text).unwrap();
        prop_assert_eq!(decoded.len(), coords.len());
        for (decoded, (theta, rho)) in decoded.iter().zip(&coords) {
            prop_assert!((decoded.theta - theta).abs() < 1e-5);
            prop_assert!((decoded.rho - rho).abs() < 1e-5);
        }
    }

    /// Decoding is deterministic over arbitrary input, success or failure.
    #[test]
    fn prop_decode_is_deterministic(text in ".{0,256}") {
        prop_assert_eq!(decode(&text), decode(&text));
    }

    /// Planned commands always carry positive durations, and a plan never
    /// has more commands than segments.
    #[test]
    fn prop_planned_durations_positive(
        coords in prop::collection::vec((-50.0f64..50.0, 0.0f64..=1.0), 2..32),
        speed in 0.1f64..10.0
    ) {
        let coords: Vec<Coordinate> = coords
            .into_iter()
            .map(|(theta, rho)| Coordinate::new(theta, rho))
            .collect();

        let commands = plan(&coords, speed).unwrap();
        prop_assert!(commands.len() <= coords.len() - 1);
        for command in &commands {
            prop_assert!(command.duration > std::time::Duration::ZERO);
            prop_assert!(command.distance > 0.0);
        }
    }
}
