/// Linear Kalman filtering
///
/// `kalman` holds the engine and the forward (predict/update) pass,
/// `rts` the Rauch-Tung-Striebel backward pass over a forward trace.
pub mod kalman;
pub mod rts;

pub use kalman::{InitialCovariance, KalmanEngine};
