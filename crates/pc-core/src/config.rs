use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Configuration complète du pipeline de classification.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine : les
/// défauts reproduisent le modèle embarqué (16 kHz, fenêtres de 0.5 s,
/// 40 MFCC × 16 frames, 4 classes dont background à l'index 0).
///
/// # Example
/// ```
/// use pc_core::config::PassConfig;
/// let config = PassConfig::default();
/// assert_eq!(config.window_samples, 8000);
/// assert_eq!(config.expected_frames(), 16);
/// assert!(config.validate().is_ok());
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PassConfig {
    // === Audio ===
    /// Fréquence d'échantillonnage cible en Hz.
    pub sample_rate: u32,
    /// Longueur d'une fenêtre en échantillons.
    pub window_samples: usize,
    /// Recouvrement entre fenêtres successives (sources fichier uniquement).
    pub overlap_samples: usize,

    // === Pré-traitement ===
    /// Normalisation crête vers [-1, 1].
    pub peak_normalize: bool,
    /// Normalisation RMS vers `target_rms`.
    pub rms_normalize: bool,
    /// RMS cible. Plage recommandée [0.1, 0.3].
    pub target_rms: f32,
    /// Filtre de pré-emphase.
    pub pre_emphasis: bool,
    /// Coefficient de pré-emphase [0.0, 1.0).
    pub pre_emphasis_alpha: f32,

    // === Features ===
    /// Nombre de coefficients MFCC.
    pub num_coefficients: usize,
    /// Nombre de bandes mel.
    pub num_bands: usize,
    /// Taille de FFT.
    pub fft_size: usize,
    /// Pas entre frames d'analyse.
    pub hop_size: usize,
    /// Fréquence basse du banc de filtres (Hz).
    pub f_min: f32,
    /// Fréquence haute du banc de filtres (Hz), bornée à Nyquist.
    pub f_max: f32,

    // === Modèle ===
    /// Poids du classifieur (JSON). Requis pour le mode streaming.
    pub model_path: Option<PathBuf>,
    /// Libellé de chaque classe, dans l'ordre des sorties du modèle.
    pub labels: Vec<String>,
    /// Index de la classe background (négative).
    pub background_index: usize,

    // === Vote ===
    /// Capacité K de l'historique de votes.
    pub history_len: usize,
    /// Fenêtres consécutives requises pour valider une polarité.
    pub confirm_streak: u32,
    /// Cycles de debounce entre candidat et confirmation.
    pub min_votes_before_classify: u32,

    // === Rapport ===
    /// Flush des statistiques tous les N véhicules. 0 = désactivé.
    pub flush_every: u32,
    /// Émettre une ligne VOTE par cycle.
    pub emit_votes: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            window_samples: 8000,
            overlap_samples: 0,
            peak_normalize: true,
            rms_normalize: true,
            target_rms: 0.2,
            pre_emphasis: true,
            pre_emphasis_alpha: 0.97,
            num_coefficients: 40,
            num_bands: 40,
            fft_size: 1024,
            hop_size: 512,
            f_min: 20.0,
            f_max: 8000.0,
            model_path: None,
            labels: vec![
                "background".into(),
                "car".into(),
                "motorcycle".into(),
                "commercial".into(),
            ],
            background_index: 0,
            history_len: 3,
            confirm_streak: 2,
            min_votes_before_classify: 5,
            flush_every: 10,
            emit_votes: false,
        }
    }
}

impl PassConfig {
    /// Nombre de classes (une sortie du modèle par libellé).
    #[inline]
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Frames produced per window by centered framing: `1 + window / hop`.
    #[must_use]
    pub fn expected_frames(&self) -> usize {
        if self.hop_size == 0 {
            return 0;
        }
        1 + self.window_samples / self.hop_size
    }

    /// Pas entre deux fenêtres successives d'une source fichier.
    #[must_use]
    pub fn window_stride(&self) -> usize {
        self.window_samples.saturating_sub(self.overlap_samples)
    }

    /// Libellé d'une classe, `"?"` si l'index est hors bornes.
    #[must_use]
    pub fn label(&self, class: usize) -> &str {
        self.labels.get(class).map_or("?", String::as_str)
    }

    /// Clamp all soft numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        if !(0.1..=0.3).contains(&self.target_rms) {
            log::warn!(
                "target_rms = {} hors de la plage recommandée [0.1, 0.3]",
                self.target_rms
            );
        }
        self.target_rms = self.target_rms.clamp(1e-3, 1.0);
        self.pre_emphasis_alpha = self.pre_emphasis_alpha.clamp(0.0, 0.999);
        let nyquist = self.sample_rate as f32 / 2.0;
        self.f_max = self.f_max.clamp(1.0, nyquist.max(1.0));
        self.f_min = self.f_min.clamp(0.0, self.f_max);
    }

    /// Vérifie les invariants structurels. Une erreur ici est fatale au démarrage.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fail = |msg: String| Err(CoreError::Config(msg));

        if self.sample_rate == 0 {
            return fail("sample_rate doit être > 0".into());
        }
        if self.window_samples == 0 {
            return fail("window_samples doit être > 0".into());
        }
        if self.overlap_samples >= self.window_samples {
            return fail(format!(
                "overlap_samples ({}) doit être < window_samples ({})",
                self.overlap_samples, self.window_samples
            ));
        }
        if self.fft_size == 0 || self.hop_size == 0 {
            return fail("fft_size et hop_size doivent être > 0".into());
        }
        if self.window_samples <= self.fft_size / 2 {
            return fail(format!(
                "window_samples ({}) trop court pour fft_size {}",
                self.window_samples, self.fft_size
            ));
        }
        if self.num_bands == 0 || self.num_coefficients == 0 {
            return fail("num_bands et num_coefficients doivent être > 0".into());
        }
        if self.num_coefficients > self.num_bands {
            return fail(format!(
                "num_coefficients ({}) > num_bands ({})",
                self.num_coefficients, self.num_bands
            ));
        }
        if self.f_min >= self.f_max {
            return fail(format!("f_min ({}) >= f_max ({})", self.f_min, self.f_max));
        }
        if self.labels.len() < 2 {
            return fail("au moins deux classes sont requises".into());
        }
        if self.background_index >= self.labels.len() {
            return fail(format!(
                "background_index {} hors bornes ({} classes)",
                self.background_index,
                self.labels.len()
            ));
        }
        if self.history_len == 0 {
            return fail("history_len doit être >= 1".into());
        }
        if self.confirm_streak == 0 {
            return fail("confirm_streak doit être >= 1".into());
        }
        Ok(())
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    audio: Option<AudioSection>,
    preprocess: Option<PreprocessSection>,
    features: Option<FeaturesSection>,
    model: Option<ModelSection>,
    voting: Option<VotingSection>,
    report: Option<ReportSection>,
}

/// Audio section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct AudioSection {
    sample_rate: Option<u32>,
    window_samples: Option<usize>,
    window_seconds: Option<f32>,
    overlap_samples: Option<usize>,
}

#[derive(Deserialize)]
struct PreprocessSection {
    peak_normalize: Option<bool>,
    rms_normalize: Option<bool>,
    target_rms: Option<f32>,
    pre_emphasis: Option<bool>,
    pre_emphasis_alpha: Option<f32>,
}

#[derive(Deserialize)]
struct FeaturesSection {
    num_coefficients: Option<usize>,
    num_bands: Option<usize>,
    fft_size: Option<usize>,
    hop_size: Option<usize>,
    f_min: Option<f32>,
    f_max: Option<f32>,
}

#[derive(Deserialize)]
struct ModelSection {
    path: Option<PathBuf>,
    labels: Option<Vec<String>>,
    background_index: Option<usize>,
}

#[derive(Deserialize)]
struct VotingSection {
    history_len: Option<usize>,
    confirm_streak: Option<u32>,
    min_votes_before_classify: Option<u32>,
}

#[derive(Deserialize)]
struct ReportSection {
    flush_every: Option<u32>,
    emit_votes: Option<bool>,
}

/// Parse une config TOML et fusionne avec les valeurs par défaut.
///
/// Les chemins relatifs (`[model] path`) sont résolus par rapport à `base_dir`.
///
/// # Errors
/// Returns an error if the TOML is malformed or the merged config is invalid.
///
/// # Example
/// ```
/// use pc_core::config::parse_config;
/// let config = parse_config("[voting]\nhistory_len = 4\n", None).unwrap();
/// assert_eq!(config.history_len, 4);
/// assert_eq!(config.confirm_streak, 2);
/// ```
pub fn parse_config(content: &str, base_dir: Option<&Path>) -> Result<PassConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = PassConfig::default();

    if let Some(a) = file.audio {
        if let Some(v) = a.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = a.window_samples {
            config.window_samples = v;
        } else if let Some(secs) = a.window_seconds {
            config.window_samples = (secs.max(0.0) * config.sample_rate as f32).round() as usize;
        }
        if let Some(v) = a.overlap_samples {
            config.overlap_samples = v;
        }
    }

    if let Some(p) = file.preprocess {
        if let Some(v) = p.peak_normalize {
            config.peak_normalize = v;
        }
        if let Some(v) = p.rms_normalize {
            config.rms_normalize = v;
        }
        if let Some(v) = p.target_rms {
            config.target_rms = v;
        }
        if let Some(v) = p.pre_emphasis {
            config.pre_emphasis = v;
        }
        if let Some(v) = p.pre_emphasis_alpha {
            config.pre_emphasis_alpha = v;
        }
    }

    if let Some(f) = file.features {
        if let Some(v) = f.num_coefficients {
            config.num_coefficients = v;
        }
        if let Some(v) = f.num_bands {
            config.num_bands = v;
        }
        if let Some(v) = f.fft_size {
            config.fft_size = v;
        }
        if let Some(v) = f.hop_size {
            config.hop_size = v;
        }
        if let Some(v) = f.f_min {
            config.f_min = v;
        }
        if let Some(v) = f.f_max {
            config.f_max = v;
        }
    }

    if let Some(m) = file.model {
        if let Some(v) = m.path {
            config.model_path = Some(match base_dir {
                Some(dir) if v.is_relative() => dir.join(v),
                _ => v,
            });
        }
        if let Some(v) = m.labels {
            config.labels = v;
        }
        if let Some(v) = m.background_index {
            config.background_index = v;
        }
    }

    if let Some(v) = file.voting {
        if let Some(x) = v.history_len {
            config.history_len = x;
        }
        if let Some(x) = v.confirm_streak {
            config.confirm_streak = x;
        }
        if let Some(x) = v.min_votes_before_classify {
            config.min_votes_before_classify = x;
        }
    }

    if let Some(r) = file.report {
        if let Some(v) = r.flush_every {
            config.flush_every = v;
        }
        if let Some(v) = r.emit_votes {
            config.emit_votes = v;
        }
    }

    config.clamp_all();
    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or fails validation.
///
/// # Example
/// ```no_run
/// use pc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PassConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content, path.parent())
        .with_context(|| format!("Configuration rejetée : {}", path.display()))
}
