//! Time codes and time-sampled values.
//!
//! Op values are either static (a default value) or sampled over time. A
//! [`TimeCode`] selects which value a read resolves to.

/// Time at which an op value is read or written.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TimeCode {
    /// The static (non-sampled) value.
    #[default]
    Default,
    /// The first authored sample, falling back to the default value.
    EarliestTime,
    /// A specific time.
    At(f64),
}

impl TimeCode {
    /// Check if this is the default time code.
    #[inline]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<f64> for TimeCode {
    fn from(t: f64) -> Self {
        Self::At(t)
    }
}

/// A default value plus sorted time samples.
#[derive(Clone, Debug)]
pub struct TimeSamples<T> {
    default: Option<T>,
    times: Vec<f64>,
    values: Vec<T>,
}

impl<T> Default for TimeSamples<T> {
    fn default() -> Self {
        Self {
            default: None,
            times: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Clone> TimeSamples<T> {
    /// Create with a static value only.
    pub fn constant(value: T) -> Self {
        Self {
            default: Some(value),
            ..Self::default()
        }
    }

    /// The static value, if authored.
    #[inline]
    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    /// Number of authored time samples.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.times.len()
    }

    /// Authored sample times, ascending.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// True if neither a default nor any sample is authored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.times.is_empty()
    }

    /// Insert or replace the sample at `time`.
    pub fn insert(&mut self, time: f64, value: T) {
        match self.times.binary_search_by(|t| t.total_cmp(&time)) {
            Ok(i) => self.values[i] = value,
            Err(i) => {
                self.times.insert(i, time);
                self.values.insert(i, value);
            }
        }
    }

    /// Write a value at a time code.
    pub fn set(&mut self, time: TimeCode, value: T) {
        match time {
            TimeCode::Default => self.default = Some(value),
            TimeCode::EarliestTime => {
                if let Some(first) = self.values.first_mut() {
                    *first = value;
                } else {
                    self.default = Some(value);
                }
            }
            TimeCode::At(t) => self.insert(t, value),
        }
    }

    /// Largest sample index with time <= `time`.
    pub fn floor_index(&self, time: f64) -> Option<usize> {
        let upper = self.times.partition_point(|&t| t <= time);
        upper.checked_sub(1)
    }

    /// Resolve the value at `time`, interpolating between samples with `lerp`.
    ///
    /// Samples override the default value for timed reads. Outside the
    /// sampled range the nearest sample is held.
    pub fn resolve_with<F>(&self, time: TimeCode, lerp: F) -> Option<T>
    where
        F: Fn(&T, &T, f64) -> Option<T>,
    {
        match time {
            TimeCode::Default => self.default.clone().or_else(|| self.values.first().cloned()),
            TimeCode::EarliestTime => self.values.first().cloned().or_else(|| self.default.clone()),
            TimeCode::At(t) => {
                if self.values.is_empty() {
                    return self.default.clone();
                }
                let Some(lo) = self.floor_index(t) else {
                    return self.values.first().cloned();
                };
                if lo + 1 >= self.values.len() || self.times[lo] == t {
                    return Some(self.values[lo].clone());
                }
                let (t0, t1) = (self.times[lo], self.times[lo + 1]);
                let alpha = (t - t0) / (t1 - t0);
                lerp(&self.values[lo], &self.values[lo + 1], alpha)
                    .or_else(|| Some(self.values[lo].clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lerp(a: &f64, b: &f64, t: f64) -> Option<f64> {
        Some(a + (b - a) * t)
    }

    #[test]
    fn test_constant() {
        let s = TimeSamples::constant(3.0);
        assert_eq!(s.num_samples(), 0);
        assert_eq!(s.resolve_with(TimeCode::Default, lerp), Some(3.0));
        assert_eq!(s.resolve_with(TimeCode::At(10.0), lerp), Some(3.0));
        assert_eq!(s.resolve_with(TimeCode::EarliestTime, lerp), Some(3.0));
    }

    #[test]
    fn test_sampled() {
        let mut s = TimeSamples::default();
        s.insert(10.0, 1.0);
        s.insert(0.0, 0.0);
        s.insert(20.0, 5.0);
        assert_eq!(s.times(), &[0.0, 10.0, 20.0]);

        assert_eq!(s.resolve_with(TimeCode::At(5.0), lerp), Some(0.5));
        assert_eq!(s.resolve_with(TimeCode::At(-1.0), lerp), Some(0.0));
        assert_eq!(s.resolve_with(TimeCode::At(30.0), lerp), Some(5.0));
        assert_eq!(s.resolve_with(TimeCode::At(10.0), lerp), Some(1.0));
        assert_eq!(s.resolve_with(TimeCode::EarliestTime, lerp), Some(0.0));
    }

    #[test]
    fn test_floor_index() {
        let mut s = TimeSamples::default();
        for i in 0..10 {
            s.insert(i as f64, i as f64);
        }
        assert_eq!(s.floor_index(0.5), Some(0));
        assert_eq!(s.floor_index(1.5), Some(1));
        assert_eq!(s.floor_index(5.0), Some(5));
        assert_eq!(s.floor_index(-0.5), None);
    }

    #[test]
    fn test_set_time_codes() {
        let mut s = TimeSamples::default();
        s.set(TimeCode::EarliestTime, 1.0);
        assert_eq!(s.default_value(), Some(&1.0));
        s.set(TimeCode::At(2.0), 4.0);
        s.set(TimeCode::EarliestTime, 3.0);
        assert_eq!(s.resolve_with(TimeCode::At(2.0), lerp), Some(3.0));
    }
}
