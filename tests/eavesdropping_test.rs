//! Statistical tests for interception and channel noise.
//!
//! Each test drives a full session with a fixed seed, so the assertions are
//! deterministic while the tolerances still reflect the expected rates.

use bb84_sim::{
    Basis, Bb84Session, NOISE_FLIP_PROBABILITY, Party, SessionConfig, Stage, Verdict,
    protocols::bb84,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const LONG_MESSAGE: &str = "The quick brown fox jumps over the lazy dog. ";

fn long_message(repeats: usize) -> String {
    LONG_MESSAGE.repeat(repeats)
}

fn session(seed: u64, message: &str) -> Bb84Session<ChaCha8Rng> {
    let mut session = Bb84Session::with_rng(ChaCha8Rng::seed_from_u64(seed));
    session.set_message(message);
    session
}

/// Copies Alice's bases to Bob so every position survives sifting.
fn bob_mirrors_alice(session: &mut Bb84Session<ChaCha8Rng>) {
    let alice: Vec<Basis> = session.bases(Party::Alice).iter().collect();
    for (i, basis) in alice.into_iter().enumerate() {
        session.set_basis(Party::Bob, i, basis).unwrap();
    }
}

fn sifted_error_rate(session: &Bb84Session<ChaCha8Rng>) -> f64 {
    let (alice, bob) = session.sifted_keys().unwrap();
    let errors = alice.iter().zip(bob).filter(|(a, b)| a != b).count();
    errors as f64 / alice.len() as f64
}

#[test]
fn random_eve_disturbs_a_quarter_of_sifted_bits() {
    let mut s = session(1, &long_message(25));
    s.set_eavesdropper(true).unwrap();
    s.randomize_bases(Party::Alice).unwrap();
    s.randomize_bases(Party::Eve).unwrap();
    bob_mirrors_alice(&mut s);

    s.transmit().unwrap();
    s.intercept_and_measure().unwrap();
    s.forward_to_bob().unwrap();
    s.measure_bob().unwrap();
    s.compare_bases().unwrap();
    s.sift_key().unwrap();

    let rate = sifted_error_rate(&s);
    assert!((rate - 0.25).abs() < 0.03, "error rate {rate}");

    let estimate = s.estimate_errors().unwrap();
    assert_eq!(estimate.verdict, Verdict::EavesdroppingDetected);
}

#[test]
fn eve_only_disturbs_where_her_basis_differs() {
    let mut s = session(2, &long_message(25));
    s.set_eavesdropper(true).unwrap();
    s.randomize_bases(Party::Alice).unwrap();
    s.randomize_bases(Party::Eve).unwrap();
    bob_mirrors_alice(&mut s);
    s.transmit().unwrap();
    s.intercept_and_measure().unwrap();
    s.forward_to_bob().unwrap();
    s.measure_bob().unwrap();

    let bits = s.bits().to_vec();
    let alice = s.bases(Party::Alice).clone();
    let eve = s.bases(Party::Eve).clone();
    let eve_results = s.measurements(Party::Eve).unwrap().to_vec();
    let bob_results = s.measurements(Party::Bob).unwrap();

    let mut wrong = 0usize;
    let mut disturbed = 0usize;
    for i in 0..bits.len() {
        if alice.get(i) == eve.get(i) {
            assert_eq!(eve_results[i], bits[i]);
            assert_eq!(bob_results[i], bits[i]);
        } else {
            wrong += 1;
            if bob_results[i] != bits[i] {
                disturbed += 1;
            }
        }
    }

    let rate = disturbed as f64 / wrong as f64;
    assert!((rate - 0.5).abs() < 0.04, "disturbance given wrong basis {rate}");
}

#[test]
fn forwarded_qubits_carry_eve_choices() {
    let mut s = session(3, "intercept");
    s.set_eavesdropper(true).unwrap();
    s.randomize_bases(Party::Eve).unwrap();
    s.transmit().unwrap();
    s.intercept_and_measure().unwrap();
    assert!(s.forwarded_qubits().is_none());
    s.forward_to_bob().unwrap();

    let eve_results = s.measurements(Party::Eve).unwrap();
    let forwarded = s.forwarded_qubits().unwrap();
    assert_eq!(forwarded.len(), s.len());
    for (i, qubit) in forwarded.iter().enumerate() {
        assert_eq!(qubit.bit, eve_results[i]);
        assert_eq!(Some(qubit.basis), s.bases(Party::Eve).get(i));
    }

    s.set_message("again");
    assert!(s.forwarded_qubits().is_none());
}

#[test]
fn opposite_eve_is_detected_on_long_message() {
    let message = "A".repeat(250);
    let mut s = session(4, &message);
    s.set_eavesdropper(true).unwrap();
    for i in 0..s.len() {
        s.set_basis(Party::Eve, i, Basis::Diagonal).unwrap();
    }

    s.transmit().unwrap();
    s.intercept_and_measure().unwrap();
    s.forward_to_bob().unwrap();
    s.measure_bob().unwrap();
    assert_eq!(s.compare_bases().unwrap().len(), 2000);
    s.sift_key().unwrap();

    let rate = sifted_error_rate(&s);
    assert!((rate - 0.5).abs() < 0.05, "error rate {rate}");

    let estimate = s.estimate_errors().unwrap();
    assert_eq!(estimate.sample_size, 600);
    assert!(estimate.error_rate > 11.0);
    assert_eq!(estimate.verdict, Verdict::EavesdroppingDetected);
}

#[test]
fn noise_alone_stays_below_threshold() {
    let mut s = session(5, &long_message(25));
    assert_eq!(s.set_noise(true), Ok(true));
    s.transmit().unwrap();
    s.measure_bob().unwrap();
    s.compare_bases().unwrap();
    s.sift_key().unwrap();

    let rate = sifted_error_rate(&s);
    assert!((rate - NOISE_FLIP_PROBABILITY).abs() < 0.015, "noise rate {rate}");

    let estimate = s.estimate_errors().unwrap();
    assert_eq!(estimate.verdict, Verdict::ChannelSecure);
}

#[test]
fn noise_and_eve_compose() {
    let config = SessionConfig {
        eavesdropper_enabled: true,
        noise_enabled: true,
    };
    let rng = ChaCha8Rng::seed_from_u64(6);
    let result = bb84::run_with_rng(rng, &long_message(40), config).unwrap();
    assert!(result.eve_intercepted);
    assert!(result.noise_applied);

    let errors = result
        .alice_sifted_key
        .iter()
        .zip(&result.bob_sifted_key)
        .filter(|(a, b)| a != b)
        .count();
    // 0.25 from Eve, then independent 5% flips: 0.25 * 0.95 + 0.75 * 0.05
    let rate = errors as f64 / result.sifted_length as f64;
    assert!((rate - 0.275).abs() < 0.03, "combined rate {rate}");
    assert_eq!(result.estimate.verdict, Verdict::EavesdroppingDetected);
}

#[test]
fn short_message_refuses_noise_in_run() {
    let config = SessionConfig {
        eavesdropper_enabled: false,
        noise_enabled: true,
    };
    let result = bb84::run_with_rng(ChaCha8Rng::seed_from_u64(7), "tiny", config).unwrap();
    assert!(!result.noise_applied);
    assert_eq!(result.alice_sifted_key, result.bob_sifted_key);
}

#[test]
fn error_estimation_redraws_sample() {
    let mut s = session(8, &long_message(10));
    s.transmit().unwrap();
    s.measure_bob().unwrap();
    s.compare_bases().unwrap();
    s.sift_key().unwrap();

    let first = s.estimate_errors().unwrap().sample_indices.clone();
    let second = s.estimate_errors().unwrap().sample_indices.clone();
    assert_eq!(first.len(), second.len());
    assert_ne!(first, second);
    assert_eq!(s.stage(), Stage::ErrorEstimated);
}
