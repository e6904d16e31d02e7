//! Progress reporting for long-running build stages.

/// A snapshot of progress within one build stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// The current stage, e.g. "Writing senses".
    pub stage_description: String,
    /// Items processed so far in this stage.
    pub current_item: u64,
    /// Items expected in this stage, if known.
    pub total_items: Option<u64>,
    pub message: Option<String>,
}

/// Receives progress updates from the build.
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) + Send>;

impl ProgressUpdate {
    /// Creates an update for the start of a stage.
    pub fn new_stage(description: impl Into<String>, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description.into(),
            current_item: 0,
            total_items,
            message: None,
        }
    }

    /// The same stage, advanced to `current_item`.
    pub fn at(&self, current_item: u64) -> Self {
        ProgressUpdate {
            current_item,
            ..self.clone()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.total_items
            .is_some_and(|total| self.current_item >= total)
    }
}

/// Sends `update` to the callback, if any.
pub(crate) fn report(callback: &mut Option<ProgressCallback>, update: ProgressUpdate) {
    if let Some(cb) = callback.as_mut() {
        cb(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_stage_progression() {
        let stage = ProgressUpdate::new_stage("Writing forms", Some(20_000));
        assert_eq!(stage.current_item, 0);
        assert!(!stage.is_complete());
        let done = stage.at(20_000).with_message("forms written");
        assert!(done.is_complete());
        assert_eq!(done.stage_description, "Writing forms");
        assert_eq!(done.message.as_deref(), Some("forms written"));
        assert!(!ProgressUpdate::new_stage("Unknown size", None).at(5).is_complete());
    }

    #[test]
    fn test_report_invokes_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut callback: Option<ProgressCallback> = Some(Box::new(move |u: ProgressUpdate| {
            sink.lock().unwrap().push(u.current_item);
        }));
        let stage = ProgressUpdate::new_stage("Writing lemmas", Some(2));
        report(&mut callback, stage.at(1));
        report(&mut callback, stage.at(2));
        report(&mut None, stage.at(3));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
