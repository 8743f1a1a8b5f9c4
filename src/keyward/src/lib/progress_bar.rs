use indicatif::{ProgressBar as IndicatifProgressBar, ProgressStyle};
use keyward_core::bootstrap::{BootstrapProgress, Stage};
use keyward_core::daemon::{ProgressEvent, ProgressSink};
use std::borrow::Cow;
use std::time::Duration;

/// A spinner that can be switched off, in which case every call is a no-op.
pub struct ProgressBar {
    bar: Option<IndicatifProgressBar>,
}

macro_rules! forward_fn_impl {
    ($name: ident) => {
        pub fn $name(&self) {
            if let Some(ref progress_bar) = self.bar {
                progress_bar.$name();
            }
        }
    };

    ($name: ident, $( $tname: ident: $t: ty )+) => {
        pub fn $name(&self, $($tname: $t,)+) {
            if let Some(ref progress_bar) = self.bar {
                progress_bar.$name( $($tname,)+ );
            }
        }
    }
}

impl ProgressBar {
    pub fn new_spinner(message: Cow<'static, str>) -> Self {
        let progress_bar = IndicatifProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            progress_bar.set_style(style);
        }
        progress_bar.set_message(message);
        progress_bar.enable_steady_tick(Duration::from_millis(80));

        ProgressBar {
            bar: Some(progress_bar),
        }
    }

    forward_fn_impl!(finish_and_clear);
    forward_fn_impl!(set_message, message: Cow<'static, str>);

    pub fn discard() -> Self {
        ProgressBar { bar: None }
    }
}

impl ProgressSink for ProgressBar {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.set_message(Cow::Owned(event.message.clone()));
    }
}

impl BootstrapProgress for ProgressBar {
    fn stage_started(&mut self, stage: Stage) {
        if stage != Stage::Complete {
            self.set_message(Cow::Owned(stage_message(stage)));
        }
    }

    fn on_progress(&mut self, _stage: Stage, event: &ProgressEvent) {
        self.set_message(Cow::Owned(event.message.clone()));
    }
}

/// "signing up" becomes "Signing up...".
fn stage_message(stage: Stage) -> String {
    let text = stage.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}...", first.to_uppercase(), chars.as_str()),
        None => text,
    }
}
