use serde::{Deserialize, Serialize};

/// Quantification affine int8 : `q = round(x / scale) + zero_point`.
///
/// # Example
/// ```
/// use pc_model::QuantParams;
/// let q = QuantParams { scale: 0.5, zero_point: 0 };
/// assert_eq!(q.quantize(1.0), 2);
/// assert_eq!(q.dequantize(2), 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    /// Step between two quantized levels.
    pub scale: f32,
    /// Quantized value representing 0.0.
    pub zero_point: i32,
}

impl QuantParams {
    /// `true` if the scale is finite and positive and the zero point fits in i8.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
            && self.scale > 0.0
            && (i32::from(i8::MIN)..=i32::from(i8::MAX)).contains(&self.zero_point)
    }

    /// Quantize one value, saturating at the i8 range.
    #[inline]
    #[must_use]
    pub fn quantize(&self, x: f32) -> i8 {
        let q = (x / self.scale).round() + self.zero_point as f32;
        q.clamp(f32::from(i8::MIN), f32::from(i8::MAX)) as i8
    }

    /// Map a quantized value back to f32.
    #[inline]
    #[must_use]
    pub fn dequantize(&self, q: i8) -> f32 {
        (i32::from(q) - self.zero_point) as f32 * self.scale
    }

    /// Arrondit chaque valeur sur la grille int8, en place.
    ///
    /// Le modèle voit exactement ce qu'il verrait avec une entrée int8.
    pub fn snap_in_place(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.dequantize(self.quantize(*v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_saturates() {
        let q = QuantParams {
            scale: 0.1,
            zero_point: 0,
        };
        assert_eq!(q.quantize(100.0), 127);
        assert_eq!(q.quantize(-100.0), -128);
    }

    #[test]
    fn zero_point_shifts_grid() {
        let q = QuantParams {
            scale: 1.0,
            zero_point: -10,
        };
        assert_eq!(q.quantize(0.0), -10);
        assert_eq!(q.dequantize(-10), 0.0);
        assert_eq!([q.quantize(3.0), q.quantize(-3.0)], [-7, -13]);
    }

    #[test]
    fn snap_keeps_values_on_grid() {
        let q = QuantParams {
            scale: 0.25,
            zero_point: 0,
        };
        let mut v = [0.3f32, -0.6, 0.0];
        q.snap_in_place(&mut v);
        assert_eq!(v, [0.25, -0.5, 0.0]);
    }

    #[test]
    fn validity() {
        assert!(QuantParams { scale: 0.1, zero_point: 3 }.is_valid());
        assert!(!QuantParams { scale: 0.0, zero_point: 0 }.is_valid());
        assert!(!QuantParams { scale: 0.1, zero_point: 200 }.is_valid());
    }
}
