use std::io::Write;

use pc_audio::preprocess::PreprocessingChain;
use pc_core::config::PassConfig;
use pc_core::error::{CoreError, PipelineError};
use pc_core::event::ClassificationEvent;
use pc_core::traits::{Classifier, EventSink, FeatureExtractor, FrameSource};
use pc_core::window::{AudioWindow, FeatureMatrix, FeatureTensor, ScoreVector};
use pc_vote::{EventReporter, VotingConfig, VotingEngine};

/// Boucle de classification : source → préparation → features → modèle → vote.
///
/// Tous les buffers sont alloués ici, une fois ; un cycle n'alloue pas.
pub struct Pipeline<E, C> {
    chain: PreprocessingChain,
    extractor: E,
    classifier: C,
    engine: VotingEngine,
    window: AudioWindow,
    features: FeatureMatrix,
    tensor: FeatureTensor,
    scores: ScoreVector,
    next_index: u64,
    emit_votes: bool,
}

impl<E: FeatureExtractor, C: Classifier> Pipeline<E, C> {
    /// Assemble the pipeline and check shapes across the stages.
    ///
    /// # Errors
    /// [`CoreError::ShapeMismatch`] if the extractor output is not the
    /// transpose of the model input, [`CoreError::Config`] if the model class
    /// count differs from the configured labels or the voting parameters are
    /// invalid.
    pub fn new(config: &PassConfig, extractor: E, classifier: C) -> Result<Self, CoreError> {
        let (coeffs, frames) = extractor.output_shape();
        let (expected_frames, expected_coeffs) = classifier.input_shape();
        if frames != expected_frames || coeffs != expected_coeffs {
            return Err(CoreError::ShapeMismatch {
                expected_frames,
                expected_coeffs,
                frames,
                coeffs,
            });
        }
        if classifier.num_classes() != config.num_classes() {
            return Err(CoreError::Config(format!(
                "le modèle a {} classes, {} libellés configurés",
                classifier.num_classes(),
                config.num_classes()
            )));
        }
        let engine = VotingEngine::new(VotingConfig::from_config(config))?;

        log::info!(
            "Pipeline : fenêtre {} échantillons, features {}×{}, {} classes",
            config.window_samples,
            coeffs,
            frames,
            config.num_classes()
        );

        Ok(Self {
            chain: PreprocessingChain::from_config(config),
            extractor,
            classifier,
            engine,
            window: AudioWindow::new(config.window_samples),
            features: FeatureMatrix::new(coeffs, frames),
            tensor: FeatureTensor::new(frames, coeffs),
            scores: ScoreVector::zeros(config.num_classes()),
            next_index: 0,
            emit_votes: config.emit_votes,
        })
    }

    /// Voting engine, for inspection.
    #[must_use]
    pub fn engine(&self) -> &VotingEngine {
        &self.engine
    }

    /// Windows read so far.
    #[must_use]
    pub fn windows(&self) -> u64 {
        self.next_index
    }

    /// Réinitialise le vote et le compteur de fenêtres.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.next_index = 0;
    }

    fn classify(&mut self) -> Result<(), PipelineError> {
        let report = self.chain.apply(&mut self.window);
        if report.degenerate() {
            log::debug!("fenêtre {} : signal dégénéré {report:?}", self.next_index);
        }
        self.extractor.extract(&self.window, &mut self.features)?;
        self.tensor.fill_transposed(&self.features);
        self.classifier.infer(&self.tensor, &mut self.scores)
    }

    /// Un cycle complet.
    ///
    /// Un échec d'extraction ou d'inférence saute le cycle sans toucher au
    /// vote : une ligne `ERROR` est écrite et `Ok(None)` est retourné.
    ///
    /// # Errors
    /// Source errors ([`PipelineError::StreamExhausted`], I/O), terminal or
    /// not; the window index is consumed only once a window is read.
    pub fn run_cycle<S, W>(
        &mut self,
        source: &mut S,
        reporter: &mut EventReporter<W>,
    ) -> Result<Option<ClassificationEvent>, PipelineError>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        source.next_window(&mut self.window)?;
        let index = self.next_index;
        self.next_index += 1;
        reporter.record_window();

        if let Err(e) = self.classify() {
            log::debug!("fenêtre {index} ignorée : {e}");
            reporter.record_error();
            reporter.telemetry_mut().error(index, &e);
            return Ok(None);
        }

        let outcome = self.engine.observe(index, &self.scores);
        if self.emit_votes {
            reporter.telemetry_mut().vote(&outcome);
        }
        if let Some(ref event) = outcome.event {
            reporter.on_event(event);
        }
        Ok(outcome.event)
    }

    /// Boucle jusqu'à la fin du flux. Retourne le nombre de fenêtres lues.
    ///
    /// Une erreur de source non terminale (délai série) est signalée par une
    /// ligne `ERROR` puis la boucle continue, sans consommer d'index.
    ///
    /// # Errors
    /// Propagates terminal I/O errors from the source, after an `ERROR` line;
    /// end of stream is a clean stop.
    pub fn run<S, W>(
        &mut self,
        source: &mut S,
        reporter: &mut EventReporter<W>,
    ) -> Result<u64, PipelineError>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        loop {
            match self.run_cycle(source, reporter) {
                Ok(_) => {}
                Err(PipelineError::StreamExhausted { read, expected }) => {
                    log::info!(
                        "Fin du flux après {} fenêtres ({read}/{expected} échantillons en attente)",
                        self.next_index
                    );
                    return Ok(self.next_index);
                }
                Err(e) => {
                    reporter.record_error();
                    reporter.telemetry_mut().error(self.next_index, &e);
                    if e.is_terminal() {
                        log::error!("Source perdue après {} fenêtres : {e}", self.next_index);
                        return Err(e);
                    }
                    log::warn!("Source : {e}, nouvel essai");
                }
            }
        }
    }
}
