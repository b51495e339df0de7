#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    RoundStart { round: usize, expected: usize },
    CompletionRecorded { work: String },
    CompletionMissing { work: String },

    Decided { decision: &'static str },
    Expanded { round: usize, tasks: usize },
    Terminated { reason: String },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callback_receives_reported_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(format!("{event:?}"));
        }));

        reporter.report(Progress::RoundStart {
            round: 1,
            expected: 4,
        });
        reporter.report(Progress::PhaseFinish);

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].starts_with("RoundStart"));
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::Message("ignored".to_string()));
    }
}
