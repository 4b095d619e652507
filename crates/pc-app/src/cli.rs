use std::path::PathBuf;

use clap::Parser;

use pc_core::config::PassConfig;

/// passcount : comptage de passages de véhicules par classification acoustique.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Flux brut f32 little-endian mono : chemin (fichier, port série) ou "-" pour stdin.
    #[arg(long)]
    pub input: Option<String>,

    /// Enregistrement audio décodé (WAV, MP3, FLAC, OGG).
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Traiter tous les fichiers audio d'un dossier (récursif), en parallèle.
    #[arg(long = "batch")]
    pub batch_folder: Option<PathBuf>,

    /// Fichier JSON lines du mode batch. Défaut : stdout.
    #[arg(long)]
    pub batch_out: Option<PathBuf>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Modèle JSON (remplace `[model] path`).
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Longueur de l'historique de vote (K).
    #[arg(long)]
    pub history: Option<usize>,

    /// Fenêtres consécutives requises pour une polarité.
    #[arg(long)]
    pub confirm_streak: Option<u32>,

    /// Cycles de debounce avant confirmation.
    #[arg(long)]
    pub debounce: Option<u32>,

    /// Écrire une ligne VOTE par fenêtre.
    #[arg(long, default_value_t = false)]
    pub votes: bool,

    /// Fichier de télémétrie. Défaut : stdout.
    #[arg(long)]
    pub telemetry_out: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one input is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one input is specified.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        let count = usize::from(self.input.is_some())
            + usize::from(self.audio.is_some())
            + usize::from(self.batch_folder.is_some());

        if count == 0 {
            anyhow::bail!("Aucune entrée spécifiée. Utilisez --input, --audio, ou --batch.");
        }
        if count > 1 {
            anyhow::bail!("Une seule entrée à la fois : --input, --audio, OU --batch.");
        }
        Ok(())
    }

    /// Applique les overrides de la ligne de commande sur `config`.
    pub fn apply_overrides(&self, config: &mut PassConfig) {
        if let Some(ref path) = self.model {
            config.model_path = Some(path.clone());
        }
        if let Some(k) = self.history {
            config.history_len = k;
        }
        if let Some(n) = self.confirm_streak {
            config.confirm_streak = n;
        }
        if let Some(n) = self.debounce {
            config.min_votes_before_classify = n;
        }
        if self.votes {
            config.emit_votes = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_source() {
        let cli = Cli::parse_from(["passcount"]);
        assert!(cli.validate_source().is_err());
        let cli = Cli::parse_from(["passcount", "--input", "-", "--audio", "a.wav"]);
        assert!(cli.validate_source().is_err());
        let cli = Cli::parse_from(["passcount", "--input", "-"]);
        assert!(cli.validate_source().is_ok());
    }

    #[test]
    fn overrides_reach_voting_config() {
        let cli = Cli::parse_from([
            "passcount",
            "--batch",
            "data",
            "--history",
            "5",
            "--confirm-streak",
            "3",
            "--debounce",
            "7",
            "--votes",
            "--model",
            "m.json",
        ]);
        let mut config = PassConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.history_len, 5);
        assert_eq!(config.confirm_streak, 3);
        assert_eq!(config.min_votes_before_classify, 7);
        assert!(config.emit_votes);
        assert_eq!(config.model_path, Some(PathBuf::from("m.json")));
    }
}
