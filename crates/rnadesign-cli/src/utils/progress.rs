use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use rnadesign::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

struct BarDisplay {
    bar: ProgressBar,
    phase: Option<&'static str>,
    run: Option<String>,
    completed: Vec<&'static str>,
}

impl BarDisplay {
    fn label(&self, phase: &str) -> String {
        match &self.run {
            Some(run) => format!("[{run}] {phase}"),
            None => phase.to_string(),
        }
    }

    fn handle(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = Some(name);
                self.bar.reset();
                self.bar.set_length(0);
                self.bar.set_style(spinner_style());
                self.bar
                    .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                self.bar.set_message(self.label(name));
            }
            Progress::PhaseFinish => {
                self.bar.disable_steady_tick();
                let Some(name) = self.phase.take() else {
                    debug!("Phase finish received outside a phase.");
                    return;
                };
                self.bar.finish_with_message(format!("✓ {}", self.label(name)));
                self.completed.push(name);
            }
            Progress::TaskStart { total_steps } => {
                self.bar.disable_steady_tick();
                self.bar.reset();
                self.bar.set_length(total_steps);
                self.bar.set_style(bar_style());
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                if let Some(length) = self.bar.length() {
                    self.bar.set_position(length);
                }
                self.bar.set_style(spinner_style());
                self.bar
                    .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::Message(msg) => {
                // The design workflow opens each pass with "Run i/n"; any other
                // message ends the pass.
                self.run = msg.starts_with("Run ").then(|| msg.clone());
                self.bar.println(format!("  {msg}"));
            }
        }
    }
}

/// Renders workflow progress on stderr, labelling phases with the current design run.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<BarDisplay>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that never draws, for `--quiet` runs.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target)
            .with_style(spinner_style())
            .with_message("Initializing...");
        Self {
            display: Arc::new(Mutex::new(BarDisplay {
                bar,
                phase: None,
                run: None,
                completed: Vec::new(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();
        Box::new(move |event: Progress| match display.lock() {
            Ok(mut display) => display.handle(event),
            Err(_) => warn!("Progress display mutex was poisoned. Cannot update progress."),
        })
    }

    /// Names of the phases that finished, in order.
    pub fn completed_phases(&self) -> Vec<&'static str> {
        self.lock().map(|d| d.completed.clone()).unwrap_or_default()
    }

    /// Clears the bar once the workflow has returned.
    pub fn finish(&self) {
        if let Some(display) = self.lock() {
            display.bar.finish_and_clear();
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, BarDisplay>> {
        self.display.lock().ok()
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .expect("Failed to create spinner style template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<32} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .expect("Failed to create bar style template")
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("##-")
}
