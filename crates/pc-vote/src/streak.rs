use pc_core::event::Polarity;

/// Compteurs de fenêtres consécutives positives / négatives.
///
/// Incrémenter un compteur remet l'autre à zéro dès que le compteur
/// incrémenté atteint `confirm_streak` : une fenêtre isolée de polarité
/// opposée n'efface pas une série établie.
///
/// # Example
/// ```
/// use pc_core::event::Polarity;
/// use pc_vote::StreakState;
/// let mut s = StreakState::default();
/// s.update(Polarity::Positive, 2);
/// s.update(Polarity::Positive, 2);
/// s.update(Polarity::Negative, 2);
/// assert_eq!((s.positive(), s.negative()), (2, 1));
/// s.update(Polarity::Negative, 2);
/// assert_eq!((s.positive(), s.negative()), (0, 2));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreakState {
    positive: u32,
    negative: u32,
}

impl StreakState {
    /// Count one window of `polarity`.
    pub fn update(&mut self, polarity: Polarity, confirm_streak: u32) {
        match polarity {
            Polarity::Positive => {
                self.positive = self.positive.saturating_add(1);
                if self.positive >= confirm_streak {
                    self.negative = 0;
                }
            }
            Polarity::Negative => {
                self.negative = self.negative.saturating_add(1);
                if self.negative >= confirm_streak {
                    self.positive = 0;
                }
            }
        }
    }

    /// Counter for `polarity`.
    #[inline]
    #[must_use]
    pub fn get(&self, polarity: Polarity) -> u32 {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
        }
    }

    /// Consecutive vehicle windows.
    #[must_use]
    pub fn positive(&self) -> u32 {
        self.positive
    }

    /// Consecutive background windows.
    #[must_use]
    pub fn negative(&self) -> u32 {
        self.negative
    }

    /// `true` if `polarity`'s streak has reached `confirm_streak`.
    #[inline]
    #[must_use]
    pub fn reached(&self, polarity: Polarity, confirm_streak: u32) -> bool {
        self.get(polarity) >= confirm_streak
    }
}
