/// Anneau des `K` derniers vecteurs de scores.
///
/// Rempli de zéros à la création : la somme est toujours définie, même
/// avant `K` poussées. Capacité fixe, index d'écriture modulo `K`.
///
/// # Example
/// ```
/// use pc_vote::VoteHistory;
/// let mut h = VoteHistory::new(2, 2);
/// h.push(&[1.0, 0.0]);
/// h.push(&[0.0, 1.0]);
/// h.push(&[0.0, 1.0]); // évince [1, 0]
/// let mut sum = [0.0; 2];
/// h.sum_into(&mut sum);
/// assert_eq!(sum, [0.0, 2.0]);
/// ```
#[derive(Clone, Debug)]
pub struct VoteHistory {
    /// `[capacity][num_classes]` aplati.
    slots: Vec<f32>,
    num_classes: usize,
    capacity: usize,
    next: usize,
    filled: usize,
}

impl VoteHistory {
    /// Zero-filled ring of `capacity` vectors of `num_classes` scores.
    ///
    /// A zero capacity is treated as 1.
    #[must_use]
    pub fn new(capacity: usize, num_classes: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![0.0; capacity * num_classes],
            num_classes,
            capacity,
            next: 0,
            filled: 0,
        }
    }

    /// Écrase le plus ancien vecteur avec `scores`.
    pub fn push(&mut self, scores: &[f32]) {
        debug_assert_eq!(scores.len(), self.num_classes);
        let start = self.next * self.num_classes;
        for (slot, &s) in self.slots[start..start + self.num_classes]
            .iter_mut()
            .zip(scores)
        {
            *slot = s;
        }
        self.next = (self.next + 1) % self.capacity;
        self.filled = (self.filled + 1).min(self.capacity);
    }

    /// Component-wise sum of all slots into `out`.
    pub fn sum_into(&self, out: &mut [f32]) {
        out.fill(0.0);
        for row in self.slots.chunks_exact(self.num_classes) {
            for (acc, &s) in out.iter_mut().zip(row) {
                *acc += s;
            }
        }
    }

    /// Vectors pushed so far, capped at the capacity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filled
    }

    /// `true` before the first push.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Ring capacity `K`.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Scores per vector.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Itère du plus ancien au plus récent (slots zéro inclus avant `K` poussées).
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &[f32]> {
        let split = self.next * self.num_classes;
        let (head, tail) = self.slots.split_at(split);
        tail.chunks_exact(self.num_classes)
            .chain(head.chunks_exact(self.num_classes))
    }

    /// Remet tous les slots à zéro sans réallouer.
    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.next = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest() {
        let mut h = VoteHistory::new(3, 2);
        for i in 0..4 {
            h.push(&[i as f32, 1.0]);
        }
        assert_eq!(h.len(), 3);
        let rows: Vec<Vec<f32>> = h.iter_oldest_first().map(<[f32]>::to_vec).collect();
        assert_eq!(rows, vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![3.0, 1.0]]);
        let mut sum = [0.0; 2];
        h.sum_into(&mut sum);
        assert_eq!(sum, [6.0, 3.0]);
    }

    #[test]
    fn sum_defined_before_full() {
        let mut h = VoteHistory::new(4, 3);
        let mut sum = [9.0; 3];
        h.sum_into(&mut sum);
        assert_eq!(sum, [0.0; 3]);
        h.push(&[0.2, 0.3, 0.5]);
        h.sum_into(&mut sum);
        assert_eq!(sum, [0.2, 0.3, 0.5]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn clear_resets_ring() {
        let mut h = VoteHistory::new(2, 1);
        h.push(&[1.0]);
        h.clear();
        assert!(h.is_empty());
        let mut sum = [0.0];
        h.sum_into(&mut sum);
        assert_eq!(sum, [0.0]);
    }
}
