use pc_core::config::PassConfig;
use pc_core::error::DegenerateSignal;
use pc_core::window::AudioWindow;

/// Niveau sous lequel un signal est considéré comme du silence numérique.
pub const SILENCE_EPSILON: f32 = 1e-8;

/// Maximum absolute sample value, 0.0 for an empty slice.
#[inline]
#[must_use]
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Root mean square, 0.0 for an empty slice.
#[inline]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Normalise la crête à 1.0 : `audio[i] /= max(|audio|)`.
///
/// Returns the gain applied.
///
/// # Errors
/// [`DegenerateSignal`] when the peak is under [`SILENCE_EPSILON`]; the
/// samples are left untouched.
///
/// # Example
/// ```
/// use pc_audio::preprocess::peak_normalize;
/// let mut x = [0.5, -0.25];
/// peak_normalize(&mut x).unwrap();
/// assert_eq!(x, [1.0, -0.5]);
/// ```
pub fn peak_normalize(samples: &mut [f32]) -> Result<f32, DegenerateSignal> {
    let max = peak(samples);
    if max < SILENCE_EPSILON {
        return Err(DegenerateSignal {
            stage: "peak",
            level: max,
        });
    }
    for s in samples.iter_mut() {
        *s /= max;
    }
    Ok(1.0 / max)
}

/// Ramène le RMS de la fenêtre à `target_rms` par un gain uniforme.
///
/// Returns the gain applied.
///
/// # Errors
/// [`DegenerateSignal`] when the RMS is under [`SILENCE_EPSILON`].
///
/// # Example
/// ```
/// use pc_audio::preprocess::{rms, rms_normalize};
/// let mut x = [1.0, -1.0, 1.0, -1.0];
/// rms_normalize(&mut x, 0.2).unwrap();
/// assert!((rms(&x) - 0.2).abs() < 1e-6);
/// ```
pub fn rms_normalize(samples: &mut [f32], target_rms: f32) -> Result<f32, DegenerateSignal> {
    let current = rms(samples);
    if current < SILENCE_EPSILON {
        return Err(DegenerateSignal {
            stage: "rms",
            level: current,
        });
    }
    let gain = target_rms / current;
    for s in samples.iter_mut() {
        *s *= gain;
    }
    Ok(gain)
}

/// Filtre de pré-emphase causal, en place : `y[n] = x[n] - alpha * x[n-1]`.
///
/// `x[n-1]` est l'échantillon brut, conservé avant d'être écrasé.
///
/// # Example
/// ```
/// use pc_audio::preprocess::pre_emphasis;
/// let mut x = [1.0, 1.0, 1.0, 1.0];
/// pre_emphasis(&mut x, 0.97);
/// assert_eq!(x[0], 1.0);
/// assert!((x[3] - 0.03).abs() < 1e-6);
/// ```
pub fn pre_emphasis(samples: &mut [f32], alpha: f32) {
    let mut prev_raw = match samples.first() {
        Some(&first) => first,
        None => return,
    };
    for s in samples.iter_mut().skip(1) {
        let raw = *s;
        *s = raw - alpha * prev_raw;
        prev_raw = raw;
    }
}

/// Résultat d'une étape de normalisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StageOutcome {
    /// Stage turned off in config.
    Disabled,
    /// Stage ran with this gain.
    Applied(f32),
    /// Signal too small, stage skipped.
    Skipped(DegenerateSignal),
}

/// Ce que la chaîne a fait à une fenêtre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreprocessReport {
    /// Peak normalization.
    pub peak: StageOutcome,
    /// RMS normalization.
    pub rms: StageOutcome,
    /// `true` if pre-emphasis ran.
    pub pre_emphasis: bool,
}

impl PreprocessReport {
    /// `true` if any stage was skipped as degenerate.
    #[must_use]
    pub fn degenerate(&self) -> bool {
        matches!(self.peak, StageOutcome::Skipped(_)) || matches!(self.rms, StageOutcome::Skipped(_))
    }
}

/// Chaîne de conditionnement appliquée à chaque fenêtre, dans l'ordre :
/// crête, RMS, pré-emphase.
///
/// Sans état entre fenêtres.
///
/// # Example
/// ```
/// use pc_audio::preprocess::PreprocessingChain;
/// use pc_core::config::PassConfig;
/// use pc_core::window::AudioWindow;
///
/// let chain = PreprocessingChain::from_config(&PassConfig::default());
/// let mut w = AudioWindow::new(16);
/// let report = chain.apply(&mut w);
/// assert!(report.degenerate()); // silence
/// ```
#[derive(Clone, Debug)]
pub struct PreprocessingChain {
    peak: bool,
    target_rms: Option<f32>,
    alpha: Option<f32>,
}

impl PreprocessingChain {
    /// Build with explicit stage parameters. `None` disables a stage.
    #[must_use]
    pub fn new(peak: bool, target_rms: Option<f32>, alpha: Option<f32>) -> Self {
        Self {
            peak,
            target_rms,
            alpha,
        }
    }

    /// Stages and parameters from the `[preprocess]` section.
    #[must_use]
    pub fn from_config(config: &PassConfig) -> Self {
        Self::new(
            config.peak_normalize,
            config.rms_normalize.then_some(config.target_rms),
            config.pre_emphasis.then_some(config.pre_emphasis_alpha),
        )
    }

    /// Applique la chaîne en place.
    pub fn apply(&self, window: &mut AudioWindow) -> PreprocessReport {
        let samples = window.samples_mut();

        let peak = if self.peak {
            match peak_normalize(samples) {
                Ok(gain) => StageOutcome::Applied(gain),
                Err(e) => {
                    log::debug!("{e}, normalisation crête ignorée");
                    StageOutcome::Skipped(e)
                }
            }
        } else {
            StageOutcome::Disabled
        };

        let rms = match self.target_rms {
            Some(target) => match rms_normalize(samples, target) {
                Ok(gain) => StageOutcome::Applied(gain),
                Err(e) => {
                    log::debug!("{e}, normalisation RMS ignorée");
                    StageOutcome::Skipped(e)
                }
            },
            None => StageOutcome::Disabled,
        };

        if let Some(alpha) = self.alpha {
            pre_emphasis(samples, alpha);
        }

        PreprocessReport {
            peak,
            rms,
            pre_emphasis: self.alpha.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (i as f32 * 0.05).sin())
            .collect()
    }

    #[test]
    fn pre_emphasis_constant_sequence() {
        let mut x = [1.0f32, 1.0, 1.0, 1.0];
        pre_emphasis(&mut x, 0.97);
        let expected = [1.0f32, 0.03, 0.03, 0.03];
        for (got, want) in x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn pre_emphasis_uses_raw_previous_sample() {
        // Un filtre qui relirait la valeur filtrée donnerait 3 - 0.5 * 1.0 = 2.5.
        let mut x = [2.0f32, 2.0, 3.0];
        pre_emphasis(&mut x, 0.5);
        assert_eq!(x, [2.0, 1.0, 2.0]);
    }

    #[test]
    fn pre_emphasis_empty_and_single() {
        let mut empty: [f32; 0] = [];
        pre_emphasis(&mut empty, 0.97);
        let mut one = [0.4f32];
        pre_emphasis(&mut one, 0.97);
        assert_eq!(one, [0.4]);
    }

    #[test]
    fn peak_normalize_is_idempotent() {
        let mut once = sine(512, 0.3);
        peak_normalize(&mut once).unwrap();
        let mut twice = once.clone();
        peak_normalize(&mut twice).unwrap();
        assert_eq!(once, twice);
        assert!((peak(&once) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rms_normalize_at_target_is_near_noop() {
        let mut x = sine(1024, 1.0);
        rms_normalize(&mut x, 0.2).unwrap();
        let before = x.clone();
        rms_normalize(&mut x, 0.2).unwrap();
        for (a, b) in before.iter().zip(&x) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn silence_is_degenerate_and_untouched() {
        let mut x = vec![1e-10f32; 64];
        assert!(peak_normalize(&mut x).is_err());
        assert!(rms_normalize(&mut x, 0.2).is_err());
        assert!(x.iter().all(|&s| s == 1e-10));
    }

    #[test]
    fn chain_reports_each_stage() {
        let chain = PreprocessingChain::new(true, Some(0.2), None);
        let mut w = AudioWindow::from(sine(800, 0.1));
        let report = chain.apply(&mut w);
        assert!(matches!(report.peak, StageOutcome::Applied(g) if (g - 10.0).abs() < 0.5));
        assert!(matches!(report.rms, StageOutcome::Applied(_)));
        assert!(!report.pre_emphasis);
        assert!(!report.degenerate());
        assert!((rms(w.samples()) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn chain_skips_degenerate_stages_but_still_filters() {
        let chain = PreprocessingChain::new(true, Some(0.2), Some(0.97));
        let mut w = AudioWindow::new(32);
        let report = chain.apply(&mut w);
        assert!(matches!(report.peak, StageOutcome::Skipped(d) if d.stage == "peak"));
        assert!(matches!(report.rms, StageOutcome::Skipped(d) if d.stage == "rms"));
        assert!(report.pre_emphasis);
        assert!(w.samples().iter().all(|&s| s == 0.0));
    }
}
