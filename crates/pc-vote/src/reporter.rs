use std::io::Write;

use pc_core::config::PassConfig;
use pc_core::event::ClassificationEvent;
use pc_core::traits::EventSink;
use serde::Serialize;

use crate::telemetry::Telemetry;

/// Bilan agrégé d'une exécution, sérialisable en JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Windows processed (including skipped cycles).
    pub windows: u64,
    /// Cycles skipped on extraction, inference or source errors.
    pub errors: u64,
    /// Confirmed vehicle passes.
    pub vehicles: u64,
    /// Confirmed "road clear" transitions.
    pub clears: u64,
    /// `(label, count)` per class, in class order.
    pub counts: Vec<(String, u64)>,
}

/// Compteur de passages : un compte par classe, bilan `STATUS` périodique.
///
/// Les événements négatifs (classe background) sont comptés à part et ne
/// sont pas des véhicules.
///
/// # Example
/// ```
/// use pc_core::event::ClassificationEvent;
/// use pc_core::traits::EventSink;
/// use pc_vote::{EventReporter, Telemetry};
///
/// let labels = vec!["background".to_string(), "car".to_string()];
/// let mut reporter = EventReporter::new(Telemetry::new(Vec::new()), labels, 0, 10);
/// reporter.on_event(&ClassificationEvent { class_index: 1, window_index: 16 });
/// assert_eq!(reporter.vehicles(), 1);
/// assert_eq!(reporter.count(1), 1);
/// ```
pub struct EventReporter<W: Write> {
    telemetry: Telemetry<W>,
    labels: Vec<String>,
    background_index: usize,
    flush_every: u32,
    counts: Vec<u64>,
    vehicles: u64,
    clears: u64,
    windows: u64,
    errors: u64,
}

impl<W: Write> EventReporter<W> {
    /// Reporter over `telemetry`. `flush_every = 0` disables periodic status lines.
    pub fn new(
        telemetry: Telemetry<W>,
        labels: Vec<String>,
        background_index: usize,
        flush_every: u32,
    ) -> Self {
        Self {
            telemetry,
            counts: vec![0; labels.len()],
            labels,
            background_index,
            flush_every,
            vehicles: 0,
            clears: 0,
            windows: 0,
            errors: 0,
        }
    }

    /// Reporter configured from `[model]` and `[report]`, writing to `out`.
    pub fn from_config(out: W, config: &PassConfig) -> Self {
        Self::new(
            Telemetry::with_labels(out, config.labels.clone()),
            config.labels.clone(),
            config.background_index,
            config.flush_every,
        )
    }

    /// Count one processed window.
    pub fn record_window(&mut self) {
        self.windows += 1;
    }

    /// Count one skipped cycle.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Confirmed vehicle passes.
    #[must_use]
    pub fn vehicles(&self) -> u64 {
        self.vehicles
    }

    /// Count for `class`, 0 if out of range.
    #[must_use]
    pub fn count(&self, class: usize) -> u64 {
        self.counts.get(class).copied().unwrap_or(0)
    }

    /// Telemetry writer, for `VOTE` and `ERROR` lines.
    pub fn telemetry_mut(&mut self) -> &mut Telemetry<W> {
        &mut self.telemetry
    }

    /// Current aggregate.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            windows: self.windows,
            errors: self.errors,
            vehicles: self.vehicles,
            clears: self.clears,
            counts: self
                .labels
                .iter()
                .cloned()
                .zip(self.counts.iter().copied())
                .collect(),
        }
    }

    /// Écrit le bilan courant en ligne `STATUS`.
    pub fn flush_status(&mut self) {
        let mut body = format!(
            "windows={} errors={} vehicles={} clears={}",
            self.windows, self.errors, self.vehicles, self.clears
        );
        for (class, (label, count)) in self.labels.iter().zip(&self.counts).enumerate() {
            if class != self.background_index {
                body.push_str(&format!(" {label}={count}"));
            }
        }
        self.telemetry.status(format_args!("{body}"));
    }

    /// Bilan final, puis rend le résumé et le writer.
    pub fn finish(mut self) -> (ReportSummary, W) {
        self.flush_status();
        let summary = self.summary();
        (summary, self.telemetry.into_inner())
    }
}

impl<W: Write> EventSink for EventReporter<W> {
    fn on_event(&mut self, event: &ClassificationEvent) {
        if let Some(count) = self.counts.get_mut(event.class_index) {
            *count += 1;
        } else {
            log::warn!("Classe {} hors bornes, événement ignoré", event.class_index);
            return;
        }

        let vehicle = event.class_index != self.background_index;
        if vehicle {
            self.vehicles += 1;
        } else {
            self.clears += 1;
        }
        log::info!(
            "Passage confirmé : {} (fenêtre {})",
            self.labels[event.class_index],
            event.window_index
        );
        self.telemetry.event(event, vehicle, self.vehicles);

        if vehicle && self.flush_every > 0 && self.vehicles % u64::from(self.flush_every) == 0 {
            self.flush_status();
        }
    }
}
