//! Raw ADC counts to distance.

/// `cm = coefficient * raw^exponent`, the usual fit for Sharp-style IR
/// rangefinders. The exponent is negative: closer objects read higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    pub coefficient: f32,
    pub exponent: f32,
}

impl Default for PowerLaw {
    /// GP2Y0A21 on a 10-bit ADC.
    fn default() -> Self {
        Self {
            coefficient: 12_343.85,
            exponent: -1.15,
        }
    }
}

impl PowerLaw {
    /// Distance for an averaged raw reading. Averages below one count are
    /// clamped to one so the curve stays finite.
    pub fn to_cm(&self, avg_raw: f32) -> f32 {
        let x = if avg_raw.is_finite() { avg_raw.max(1.0) } else { 1.0 };
        self.coefficient * x.powf(self.exponent)
    }
}
