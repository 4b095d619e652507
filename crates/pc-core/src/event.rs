/// Polarité d'une classe : véhicule (positive) ou background (negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Any vehicle class.
    Positive,
    /// The background class.
    Negative,
}

impl Polarity {
    /// Polarity of `class` given the background index.
    ///
    /// # Example
    /// ```
    /// use pc_core::event::Polarity;
    /// assert_eq!(Polarity::of(0, 0), Polarity::Negative);
    /// assert_eq!(Polarity::of(2, 0), Polarity::Positive);
    /// ```
    #[inline]
    #[must_use]
    pub fn of(class: usize, background_index: usize) -> Self {
        if class == background_index {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    /// The other polarity.
    #[inline]
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

/// Dernière polarité confirmée par le moteur de vote.
///
/// Trois états : rien n'a encore été confirmé au démarrage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfirmedPolarity {
    /// No transition confirmed since start or reset.
    #[default]
    Unknown,
    /// Last confirmation was a vehicle.
    Positive,
    /// Last confirmation was background.
    Negative,
}

impl ConfirmedPolarity {
    /// `true` when `polarity` would be a change. `Unknown` differs from both.
    ///
    /// # Example
    /// ```
    /// use pc_core::event::{ConfirmedPolarity, Polarity};
    /// assert!(ConfirmedPolarity::Unknown.differs_from(Polarity::Negative));
    /// assert!(!ConfirmedPolarity::Positive.differs_from(Polarity::Positive));
    /// ```
    #[inline]
    #[must_use]
    pub fn differs_from(self, polarity: Polarity) -> bool {
        !matches!(
            (self, polarity),
            (Self::Positive, Polarity::Positive) | (Self::Negative, Polarity::Negative)
        )
    }
}

impl From<Polarity> for ConfirmedPolarity {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::Positive => Self::Positive,
            Polarity::Negative => Self::Negative,
        }
    }
}

/// A confirmed classification: winning class and the window that triggered it.
///
/// Emitted once per confirmed transition by the voting engine, consumed by
/// the reporter, never retained by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassificationEvent {
    /// Index of the winning class.
    pub class_index: usize,
    /// Zero-based index of the window whose cycle confirmed the transition.
    pub window_index: u64,
}
