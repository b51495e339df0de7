use adaptflow::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const SPINNER_TICK_MS: u64 = 80;

/// A phase spinner above a per-round bar that fills as completions arrive.
struct Bars {
    phase: ProgressBar,
    round: ProgressBar,
    round_number: usize,
    missing: u64,
}

impl Bars {
    fn new() -> Self {
        let phase = ProgressBar::new(0)
            .with_style(CliProgressHandler::spinner_style())
            .with_message("Initializing...");
        phase.set_draw_target(ProgressDrawTarget::stderr());
        phase.disable_steady_tick();
        phase.finish_and_clear();

        let round = ProgressBar::new(0).with_style(CliProgressHandler::bar_style());
        round.set_draw_target(ProgressDrawTarget::stderr());
        round.finish_and_clear();

        Self {
            phase,
            round,
            round_number: 0,
            missing: 0,
        }
    }
}

#[derive(Clone)]
pub struct CliProgressHandler {
    bars: Arc<Mutex<Bars>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self {
            bars: Arc::new(Mutex::new(Bars::new())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bars = self.bars.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut bars) = bars.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    bars.phase.reset();
                    bars.phase.set_style(Self::spinner_style());
                    bars.phase
                        .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    bars.phase.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    bars.phase.disable_steady_tick();
                    bars.phase.finish_with_message("✓ Done");
                }
                Progress::RoundStart { round, expected } => {
                    bars.round_number = round;
                    bars.missing = 0;
                    bars.round.reset();
                    bars.round.set_length(expected as u64);
                    bars.round.set_position(0);
                    bars.round.set_style(Self::bar_style());
                    bars.round.set_message(format!("Round {}", round));
                    info!(round, expected, "Round started.");
                }
                Progress::CompletionRecorded { work } => {
                    bars.round.inc(1);
                    bars.round.set_message(work);
                }
                Progress::CompletionMissing { work } => {
                    bars.missing += 1;
                    bars.round.inc(1);
                    warn!(round = bars.round_number, %work, "Completion missing.");
                }
                Progress::Decided { decision } => {
                    let missing = bars.missing;
                    let settled = bars.round.position();
                    info!(
                        round = bars.round_number,
                        recorded = settled.saturating_sub(missing),
                        missing,
                        decision,
                        "Decision taken."
                    );
                    if !bars.round.is_finished() {
                        bars.round.abandon_with_message(format!("Decided: {}", decision));
                    }
                }
                Progress::Expanded { round, tasks } => {
                    info!(round, tasks, "Attached new work.");
                }
                Progress::Terminated { reason } => {
                    bars.phase.disable_steady_tick();
                    bars.phase.finish_with_message(format!("✓ Finished: {}", reason));
                    info!(%reason, "Campaign terminated.");
                }
                Progress::Message(msg) => {
                    if !bars.phase.is_finished() {
                        bars.phase.println(format!("  {}", msg));
                    } else {
                        bars.phase.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        match ProgressStyle::with_template("{msg:<28} [{bar:40.cyan/blue}] {pos}/{len} ({eta})") {
            Ok(style) => style
                .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                })
                .progress_chars("##-"),
            Err(_) => ProgressStyle::default_bar(),
        }
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let bars = handler.bars.lock().unwrap();
        assert_eq!(bars.phase.length(), Some(0));
        assert!(bars.phase.is_finished());
        assert_eq!(bars.round.length(), Some(0));
        assert_eq!(bars.round_number, 0);
    }

    #[test]
    fn round_bar_fills_with_recorded_and_missing_completions() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Launch" });
        callback(Progress::RoundStart {
            round: 2,
            expected: 4,
        });
        callback(Progress::PhaseFinish);
        {
            let bars = handler.bars.lock().unwrap();
            assert_eq!(bars.phase.message(), "✓ Done");
            assert_eq!(bars.round.length(), Some(4));
            assert_eq!(bars.round.position(), 0);
            assert!(!bars.round.is_finished());
        }

        callback(Progress::CompletionRecorded {
            work: "distance probe at 1.000".to_string(),
        });
        callback(Progress::CompletionRecorded {
            work: "distance probe at 1.500".to_string(),
        });
        callback(Progress::CompletionMissing {
            work: "distance probe at 2.000".to_string(),
        });
        {
            let bars = handler.bars.lock().unwrap();
            assert_eq!(bars.round.position(), 3);
            assert_eq!(bars.round.message(), "distance probe at 1.500");
            assert_eq!(bars.missing, 1);
            assert_eq!(bars.round_number, 2);
        }

        callback(Progress::PhaseStart { name: "Deciding" });
        callback(Progress::Decided {
            decision: "continue",
        });
        {
            let bars = handler.bars.lock().unwrap();
            assert_eq!(bars.phase.message(), "Deciding");
            assert!(bars.round.is_finished());
            assert_eq!(bars.round.message(), "Decided: continue");
        }

        callback(Progress::RoundStart {
            round: 3,
            expected: 1,
        });
        let bars = handler.bars.lock().unwrap();
        assert_eq!(bars.round.length(), Some(1));
        assert_eq!(bars.round.position(), 0);
        assert_eq!(bars.missing, 0);
    }

    #[test]
    fn termination_finishes_the_phase_spinner_with_the_reason() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Terminating",
        });
        callback(Progress::Terminated {
            reason: "campaign complete".to_string(),
        });

        let bars = handler.bars.lock().unwrap();
        assert!(bars.phase.is_finished());
        assert_eq!(bars.phase.message(), "✓ Finished: campaign complete");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::RoundStart {
                round: 1,
                expected: 2,
            });
            callback(Progress::CompletionRecorded {
                work: "grid point [0, 1]".to_string(),
            });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let bars = handler.bars.lock().unwrap();
        assert_eq!(bars.round.position(), 1);
        assert!(bars.phase.is_finished());
    }
}
