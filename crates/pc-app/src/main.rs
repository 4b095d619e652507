use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pc_audio::mfcc::{MfccExtractor, MfccParams};
use pc_audio::source::{SampleSource, StreamSource};
use pc_core::config::PassConfig;
use pc_core::traits::FrameSource;
use pc_model::LinearClassifier;
use pc_vote::EventReporter;

pub mod batch;
pub mod cli;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider l'entrée
    cli.validate_source()?;

    // 4. Charger la config, appliquer les overrides CLI, puis valider
    let mut config = resolve_config(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate().context("Configuration rejetée")?;

    // 5. Modèle
    let model_path = config
        .model_path
        .clone()
        .context("Aucun modèle : renseigner [model] path ou --model")?;
    let classifier = LinearClassifier::load(&model_path)?;

    // Traitement par lots
    if let Some(folder) = cli.batch_folder.as_deref() {
        log::info!("Lancement du traitement par lots...");
        let totals = batch::run_batch(folder, cli.batch_out.as_deref(), &config, &classifier)?;
        if totals.failed > 0 {
            log::warn!("{} fichiers en échec", totals.failed);
        }
        return Ok(());
    }

    // 6. Source
    let mut source: Box<dyn FrameSource> = match (cli.input.as_deref(), cli.audio.as_deref()) {
        (Some("-"), _) => {
            log::info!("Lecture du flux sur stdin");
            Box::new(StreamSource::new(io::stdin().lock(), config.window_samples))
        }
        (Some(path), _) => {
            let file = File::open(path).with_context(|| format!("Ouverture de {path}"))?;
            log::info!("Lecture du flux {path}");
            Box::new(StreamSource::new(
                BufReader::new(file),
                config.window_samples,
            ))
        }
        (None, Some(path)) => Box::new(SampleSource::from_file(path, &config)?),
        (None, None) => anyhow::bail!("Aucune entrée spécifiée."),
    };

    // 7. Télémétrie
    let out: Box<dyn Write> = match cli.telemetry_out.as_deref() {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Création de {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut reporter = EventReporter::from_config(out, &config);

    // 8. Pipeline
    let extractor = MfccExtractor::new(MfccParams::from_config(&config));
    let mut pipeline = pipeline::Pipeline::new(&config, extractor, classifier)?;

    reporter.telemetry_mut().status(format_args!(
        "start sample_rate={} window={} classes={} history={} confirm={} debounce={}",
        config.sample_rate,
        config.window_samples,
        config.num_classes(),
        config.history_len,
        config.confirm_streak,
        config.min_votes_before_classify
    ));

    // 9. Boucle principale
    let result = pipeline.run(source.as_mut(), &mut reporter);

    // 10. Bilan (TOUJOURS, même en cas d'erreur)
    let (summary, _) = reporter.finish();
    log::info!(
        "{} fenêtres, {} véhicules, {} cycles ignorés",
        summary.windows,
        summary.vehicles,
        summary.errors
    );

    result.context("Boucle interrompue")?;
    Ok(())
}

/// Charge `path`, ou les défauts s'il n'existe pas.
fn resolve_config(path: &Path) -> Result<PassConfig> {
    if path.exists() {
        pc_core::config::load_config(path)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            path.display()
        );
        Ok(PassConfig::default())
    }
}
