use crate::models::{Circle, DetectionResult};

/// Infected share of all detected cells; zero when nothing was detected.
pub fn parasitemia_rate(infected: usize, normal: usize) -> f64 {
    let total = infected + normal;
    if total == 0 {
        0.0
    } else {
        infected as f64 / total as f64
    }
}

pub fn quantify(infected: Vec<Circle>, normal: Vec<Circle>) -> DetectionResult {
    let parasitemia_rate = parasitemia_rate(infected.len(), normal.len());
    DetectionResult {
        infected,
        normal,
        parasitemia_rate,
    }
}
