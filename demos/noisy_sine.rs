//! Filter and smooth a noisy sine wave with a constant-velocity model.
use kalman_engine_rs::{process_batch, KalmanEngine, StateSpaceModel};

fn main() {
    let dt = 0.1;
    let model = StateSpaceModel::from_rows(
        &[vec![1.0, dt], vec![0.0, 1.0]],
        &[vec![1.0, 0.0]],
        &[vec![1e-4, 0.0], vec![0.0, 1e-2]],
        &[vec![0.04]],
        &[0.0, 1.0],
    )
    .expect("model shapes are consistent");
    let engine = KalmanEngine::new(model);

    // Deterministic pseudo-noise so runs are comparable
    let truth: Vec<f64> = (0..100).map(|i| (i as f64 * dt).sin()).collect();
    let input: Vec<Vec<f64>> = truth
        .iter()
        .enumerate()
        .map(|(i, y)| vec![y + 0.2 * ((i as f64) * 12.9898).sin().fract()])
        .collect();

    let report = process_batch(&engine, &input).expect("filter run");

    let rms = |estimate: &dyn Fn(usize) -> f64| {
        let sum: f64 = truth
            .iter()
            .enumerate()
            .map(|(i, y)| (estimate(i) - y).powi(2))
            .sum();
        (sum / truth.len() as f64).sqrt()
    };

    println!("=== Noisy sine: Kalman filter vs RTS smoother ===");
    println!("  raw input RMS error:      {:.4}", rms(&|i: usize| input[i][0]));
    println!("  filtered state RMS error: {:.4}", rms(&|i: usize| report.raw_state[i][0]));
    println!("  smoothed state RMS error: {:.4}", rms(&|i: usize| report.smooth_state[i][0]));
}
