//! Moving average of the adaptive line.
//!
//! Window clamped to the defined history: the first defined band value is
//! its own average, the second averages two values, and so on up to
//! `length`. Undefined values before the first band are skipped, so the
//! output never goes back to `None` once a band exists.

/// Simple moving average over an optional series.
///
/// `length == 0` disables smoothing (all `None`).
pub fn smooth(values: &[Option<f64>], length: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if length == 0 {
        return out;
    }

    let mut window: Vec<f64> = Vec::with_capacity(length);
    let mut sum = 0.0;
    let mut head = 0;

    for (i, value) in values.iter().enumerate() {
        if let Some(v) = *value {
            if window.len() < length {
                window.push(v);
            } else {
                sum -= window[head];
                window[head] = v;
                head = (head + 1) % length;
            }
            sum += v;
        }
        if !window.is_empty() {
            out[i] = Some(sum / window.len() as f64);
        }
    }

    out
}
