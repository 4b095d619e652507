use std::fmt;
use std::io::Write;

use pc_core::event::ClassificationEvent;

use crate::engine::{EngineState, VoteOutcome};

/// Écrivain de télémétrie : une ligne préfixée par message.
///
/// `STATUS`, `VOTE`, `EVENT`, `ERROR`. Ne propage jamais d'erreur : un échec
/// d'écriture est journalisé en `warn` et compté.
///
/// # Example
/// ```
/// use pc_vote::Telemetry;
/// let mut t = Telemetry::new(Vec::new());
/// t.status(format_args!("windows=3"));
/// assert_eq!(String::from_utf8(t.into_inner()).unwrap(), "STATUS windows=3\n");
/// ```
pub struct Telemetry<W: Write> {
    out: W,
    labels: Vec<String>,
    failures: u64,
}

impl<W: Write> Telemetry<W> {
    /// Writer without class labels (indices are printed).
    pub fn new(out: W) -> Self {
        Self::with_labels(out, Vec::new())
    }

    /// Writer printing class names from `labels`.
    pub fn with_labels(out: W, labels: Vec<String>) -> Self {
        Self {
            out,
            labels,
            failures: 0,
        }
    }

    fn label(&self, class: usize) -> Label<'_> {
        Label {
            name: self.labels.get(class).map(String::as_str),
            class,
        }
    }

    fn line(&mut self, tag: &str, body: fmt::Arguments<'_>) {
        let result = writeln!(self.out, "{tag} {body}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            self.failures += 1;
            log::warn!("Écriture télémétrie échouée ({tag}) : {e}");
        }
    }

    /// `STATUS <body>`.
    pub fn status(&mut self, body: fmt::Arguments<'_>) {
        self.line("STATUS", body);
    }

    /// `VOTE` line tracing one engine cycle.
    pub fn vote(&mut self, outcome: &VoteOutcome) {
        let state = match outcome.state {
            EngineState::Idle => "idle".to_string(),
            EngineState::Locked { candidate } => format!("locked:{candidate:?}").to_lowercase(),
        };
        let older = match outcome.vote_older {
            Some(c) => self.label(c).to_string(),
            None => "-".to_string(),
        };
        let body = format!(
            "window={} inst={} recent={} older={} state={} pos={} neg={} debounce={}",
            outcome.window_index,
            self.label(outcome.instantaneous),
            self.label(outcome.vote_recent),
            older,
            state,
            outcome.streaks.positive(),
            outcome.streaks.negative(),
            outcome.debounce
        );
        self.line("VOTE", format_args!("{body}"));
    }

    /// `EVENT` line for a confirmed transition.
    pub fn event(&mut self, event: &ClassificationEvent, vehicle: bool, total: u64) {
        let body = format!(
            "window={} class={} index={} vehicle={} total={}",
            event.window_index,
            self.label(event.class_index),
            event.class_index,
            vehicle,
            total
        );
        self.line("EVENT", format_args!("{body}"));
    }

    /// `ERROR` line for a skipped cycle.
    pub fn error(&mut self, window_index: u64, error: &dyn fmt::Display) {
        self.line("ERROR", format_args!("window={window_index} {error}"));
    }

    /// Write failures swallowed so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

struct Label<'a> {
    name: Option<&'a str>,
    class: usize,
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::StreakState;
    use pc_core::event::Polarity;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("port fermé"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn labels() -> Vec<String> {
        vec!["background".into(), "car".into()]
    }

    #[test]
    fn vote_line_format() {
        let mut t = Telemetry::with_labels(Vec::new(), labels());
        t.vote(&VoteOutcome {
            window_index: 12,
            instantaneous: 1,
            vote_recent: 1,
            vote_older: Some(0),
            state: EngineState::Locked {
                candidate: Polarity::Positive,
            },
            streaks: StreakState::default(),
            debounce: 5,
            event: None,
        });
        let text = String::from_utf8(t.into_inner()).unwrap();
        assert_eq!(
            text,
            "VOTE window=12 inst=car recent=car older=background state=locked:positive pos=0 neg=0 debounce=5\n"
        );
    }

    #[test]
    fn event_and_error_lines() {
        let mut t = Telemetry::with_labels(Vec::new(), labels());
        t.event(
            &ClassificationEvent {
                class_index: 1,
                window_index: 16,
            },
            true,
            1,
        );
        t.error(3, &"inférence impossible");
        let text = String::from_utf8(t.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "EVENT window=16 class=car index=1 vehicle=true total=1");
        assert_eq!(lines[1], "ERROR window=3 inférence impossible");
    }

    #[test]
    fn unknown_label_prints_index() {
        let mut t = Telemetry::new(Vec::new());
        t.event(
            &ClassificationEvent {
                class_index: 7,
                window_index: 0,
            },
            true,
            1,
        );
        let text = String::from_utf8(t.into_inner()).unwrap();
        assert!(text.contains("class=7"));
    }

    #[test]
    fn write_failures_are_swallowed() {
        let mut t = Telemetry::new(Broken);
        t.status(format_args!("ok"));
        t.error(0, &"x");
        assert_eq!(t.failures(), 2);
    }
}
