use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use pc_audio::decode::is_audio_file;
use pc_audio::mfcc::{MfccExtractor, MfccParams};
use pc_audio::source::SampleSource;
use pc_core::config::PassConfig;
use pc_core::error::PipelineError;
use pc_core::traits::{Classifier, FeatureExtractor};
use pc_model::LinearClassifier;
use pc_vote::{EventReporter, ReportSummary, Telemetry};
use rayon::prelude::*;
use serde::Serialize;

use crate::pipeline::Pipeline;

/// Un passage confirmé dans un fichier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    /// Confirming window.
    pub window: u64,
    /// Start of that window, in seconds.
    pub time_s: f64,
    /// Winning class.
    pub class_index: usize,
    /// Class label.
    pub label: String,
    /// `false` for "road clear" transitions.
    pub vehicle: bool,
}

/// Ligne JSON écrite par fichier traité.
#[derive(Clone, Debug, Serialize)]
pub struct FileReport {
    /// Input file.
    pub file: PathBuf,
    /// Aggregate counts, absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReportSummary>,
    /// Confirmed transitions in order.
    pub events: Vec<EventRecord>,
    /// Failure reason, if the file could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totaux du lot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchTotals {
    /// Files processed successfully.
    pub files: usize,
    /// Files that failed.
    pub failed: usize,
    /// Vehicle passes across all files.
    pub vehicles: u64,
}

/// Extrait récursivement les fichiers audio reconnus, triés.
///
/// # Errors
/// Retourne une erreur si un dossier ne peut être lu.
pub fn scan_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                scan_dir(&path, files)?;
            } else if is_audio_file(&path) {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// Classe un fichier de bout en bout avec son propre pipeline.
///
/// # Errors
/// Returns an error if decoding fails, the pipeline cannot be built, or the
/// source fails for a reason other than end of stream.
pub fn process_file<E, C>(
    path: &Path,
    config: &PassConfig,
    extractor: E,
    classifier: C,
) -> Result<(ReportSummary, Vec<EventRecord>)>
where
    E: FeatureExtractor,
    C: Classifier,
{
    let mut source = SampleSource::from_file(path, config)?;
    let mut pipeline = Pipeline::new(config, extractor, classifier)?;
    let mut reporter = EventReporter::new(
        Telemetry::new(std::io::sink()),
        config.labels.clone(),
        config.background_index,
        0,
    );

    let stride_s = config.window_stride() as f64 / f64::from(config.sample_rate);
    let mut events = Vec::new();
    loop {
        match pipeline.run_cycle(&mut source, &mut reporter) {
            Ok(Some(event)) => events.push(EventRecord {
                window: event.window_index,
                time_s: event.window_index as f64 * stride_s,
                class_index: event.class_index,
                label: config.label(event.class_index).to_string(),
                vehicle: event.class_index != config.background_index,
            }),
            Ok(None) => {}
            Err(PipelineError::StreamExhausted { .. }) => break,
            Err(e) => return Err(e).context("Lecture interrompue"),
        }
    }
    Ok((reporter.summary(), events))
}

/// Point d'entrée du mode batch : un pipeline par fichier, en parallèle.
///
/// Chaque worker possède son extracteur et son clone du classifieur ; seule
/// la sortie est partagée, sous `Mutex`.
///
/// # Errors
/// Retourne une erreur si le dossier ne peut être lu, s'il ne contient aucun
/// fichier audio, ou si la sortie ne peut être créée.
pub fn run_batch(
    folder: &Path,
    output: Option<&Path>,
    config: &PassConfig,
    classifier: &LinearClassifier,
) -> Result<BatchTotals> {
    let mut files = Vec::new();
    scan_dir(folder, &mut files)
        .with_context(|| format!("Lecture du dossier {}", folder.display()))?;
    files.sort();
    if files.is_empty() {
        anyhow::bail!("Aucun fichier audio trouvé dans {}", folder.display());
    }
    log::info!("Batch : {} fichiers dans {}", files.len(), folder.display());

    let sink: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("Création de {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let sink = Mutex::new(sink);
    let params = MfccParams::from_config(config);

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let extractor = MfccExtractor::new(params.clone());
            let report = match process_file(path, config, extractor, classifier.clone()) {
                Ok((summary, events)) => FileReport {
                    file: path.clone(),
                    summary: Some(summary),
                    events,
                    error: None,
                },
                Err(e) => {
                    log::warn!("{} : {e:#}", path.display());
                    FileReport {
                        file: path.clone(),
                        summary: None,
                        events: Vec::new(),
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            write_report(&sink, &report);
            report
        })
        .collect();

    let mut totals = BatchTotals::default();
    for report in &reports {
        match report.summary {
            Some(ref s) => {
                totals.files += 1;
                totals.vehicles += s.vehicles;
            }
            None => totals.failed += 1,
        }
    }
    log::info!(
        "Batch terminé : {} fichiers, {} échecs, {} véhicules",
        totals.files,
        totals.failed,
        totals.vehicles
    );
    Ok(totals)
}

fn write_report(sink: &Mutex<Box<dyn Write + Send>>, report: &FileReport) {
    let line = match serde_json::to_string(report) {
        Ok(line) => line,
        Err(e) => {
            log::warn!("Sérialisation impossible pour {} : {e}", report.file.display());
            return;
        }
    };
    let Ok(mut out) = sink.lock() else {
        log::warn!("Sortie batch empoisonnée, ligne perdue");
        return;
    };
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        log::warn!("Écriture batch échouée : {e}");
    }
}
