/// Cumul par classe de tous les vecteurs vus depuis la dernière confirmation.
///
/// # Example
/// ```
/// use pc_vote::VotingPool;
/// let mut pool = VotingPool::new(2);
/// pool.add(&[0.25, 0.75]);
/// pool.add(&[0.5, 0.5]);
/// assert_eq!(pool.totals(), &[0.75, 1.25]);
/// ```
#[derive(Clone, Debug)]
pub struct VotingPool {
    totals: Vec<f32>,
}

/// Tolérance relative sous laquelle la part ancienne du pool est considérée nulle.
const OLDER_EPSILON: f32 = 1e-4;

impl VotingPool {
    /// Zeroed pool for `num_classes` classes.
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            totals: vec![0.0; num_classes],
        }
    }

    /// Accumulate one score vector.
    pub fn add(&mut self, scores: &[f32]) {
        for (acc, &s) in self.totals.iter_mut().zip(scores) {
            *acc += s;
        }
    }

    /// Remplace le cumul par `seed` (somme de l'historique courant).
    pub fn reseed(&mut self, seed: &[f32]) {
        self.totals.copy_from_slice(seed);
    }

    /// Current totals.
    #[must_use]
    pub fn totals(&self) -> &[f32] {
        &self.totals
    }

    /// Écrit `pool - recent` dans `out` : les votes plus anciens que l'historique.
    ///
    /// Returns `false` when every entry is near zero, i.e. there is no older
    /// evidence yet.
    pub fn older_into(&self, recent: &[f32], out: &mut [f32]) -> bool {
        let scale = self
            .totals
            .iter()
            .fold(1.0f32, |m, &v| m.max(v.abs()));
        let tolerance = OLDER_EPSILON * scale;
        let mut any = false;
        for ((slot, &total), &r) in out.iter_mut().zip(&self.totals).zip(recent) {
            *slot = total - r;
            any |= slot.abs() > tolerance;
        }
        any
    }

    /// Remet le cumul à zéro.
    pub fn clear(&mut self) {
        self.totals.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_is_empty_until_eviction() {
        let mut pool = VotingPool::new(2);
        pool.add(&[0.1, 0.9]);
        pool.add(&[0.3, 0.7]);
        let mut older = [0.0; 2];
        assert!(!pool.older_into(&[0.4, 1.6], &mut older));
        assert!(pool.older_into(&[0.3, 0.7], &mut older));
        assert!((older[0] - 0.1).abs() < 1e-6);
        assert!((older[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn reseed_replaces_totals() {
        let mut pool = VotingPool::new(3);
        pool.add(&[5.0, 5.0, 5.0]);
        pool.reseed(&[1.0, 0.0, 2.0]);
        assert_eq!(pool.totals(), &[1.0, 0.0, 2.0]);
        pool.clear();
        assert_eq!(pool.totals(), &[0.0; 3]);
    }
}
