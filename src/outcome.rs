use crate::error::StepError;

/// What happened to one step during a run.
#[derive(Debug)]
pub enum StepOutcome {
    /// Precondition satisfied; nothing ran.
    Skipped,
    /// Confirmation provider did not answer yes; nothing ran.
    Declined,
    Completed(Option<String>),
    /// Action failed under warn-and-continue.
    Failed(StepError),
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Skipped => "skipped",
            StepOutcome::Declined => "declined",
            StepOutcome::Completed(_) => "completed",
            StepOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub steps: Vec<(String, StepOutcome)>,
}

impl RunReport {
    pub fn push(&mut self, name: impl Into<String>, outcome: StepOutcome) {
        self.steps.push((name.into(), outcome));
    }

    #[cfg(test)]
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(step, _)| step == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn count(&self, label: &str) -> usize {
        self.steps
            .iter()
            .filter(|(_, outcome)| outcome.label() == label)
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &StepError)> {
        self.steps.iter().filter_map(|(name, outcome)| match outcome {
            StepOutcome::Failed(err) => Some((name.as_str(), err)),
            _ => None,
        })
    }

    pub fn totals_line(&self) -> String {
        format!(
            "{} completed, {} skipped, {} declined, {} failed",
            self.count("completed"),
            self.count("skipped"),
            self.count("declined"),
            self.count("failed")
        )
    }
}
