use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use qcurate::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders [`Progress`] events as a single stderr progress bar, one stage at a time.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::StageStart {
                    name,
                    total_records,
                } => {
                    pb_guard.reset();
                    pb_guard.set_message(name.to_string());
                    if total_records == 0 {
                        pb_guard.set_length(0);
                        pb_guard.set_style(Self::spinner_style());
                        pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    } else {
                        pb_guard.disable_steady_tick();
                        pb_guard.set_length(total_records);
                        pb_guard.set_position(0);
                        pb_guard.set_style(Self::bar_style());
                    }
                }
                Progress::RecordEvaluated => {
                    pb_guard.inc(1);
                }
                Progress::StageFinish { kept, dropped } => {
                    pb_guard.disable_steady_tick();
                    let length = pb_guard.length().unwrap_or(0);
                    if pb_guard.position() < length {
                        pb_guard.set_position(length);
                    }
                    let stage = pb_guard.message();
                    pb_guard.finish_with_message(format!("✓ {stage}: kept {kept}, dropped {dropped}"));
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
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
        ProgressStyle::with_template("{msg:<28} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
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
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn callback_tracks_a_filter_stage() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::StageStart {
            name: "ElementFilter",
            total_records: 10,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "ElementFilter");
            assert_eq!(pb.length(), Some(10));
            assert_eq!(pb.position(), 0);
            assert!(!pb.is_finished());
        }

        callback(Progress::RecordEvaluated);
        callback(Progress::RecordEvaluated);
        assert_eq!(handler.pb.lock().unwrap().position(), 2);

        callback(Progress::StageFinish { kept: 7, dropped: 3 });
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.position(), 10);
            assert_eq!(pb.message(), "✓ ElementFilter: kept 7, dropped 3");
        }
    }

    #[test]
    fn empty_stage_uses_a_spinner() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();
        callback(Progress::StageStart {
            name: "Fetching records",
            total_records: 0,
        });
        callback(Progress::StageFinish { kept: 0, dropped: 0 });
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Fetching records: kept 0, dropped 0");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::StageStart {
                name: "Thread Test",
                total_records: 1,
            });
            callback(Progress::RecordEvaluated);
            callback(Progress::StageFinish { kept: 1, dropped: 0 });
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Thread Test: kept 1, dropped 0");
    }
}
