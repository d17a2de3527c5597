use serde::{Deserialize, Serialize};
use std::fmt;

/// Named phases of a training job that the recorder can time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Job,
    Step,
    AcceleratorInit,
    TrainingPreparation,
    DataLoading,
    CustomBadput,
}

impl Event {
    pub const ALL: [Event; 6] = [
        Event::Job,
        Event::Step,
        Event::AcceleratorInit,
        Event::TrainingPreparation,
        Event::DataLoading,
        Event::CustomBadput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Job => "job",
            Event::Step => "step",
            Event::AcceleratorInit => "accelerator_init",
            Event::TrainingPreparation => "training_preparation",
            Event::DataLoading => "data_loading",
            Event::CustomBadput => "custom_badput",
        }
    }

    /// Time spent in this event counts against goodput.
    pub fn is_badput(&self) -> bool {
        !matches!(self, Event::Job | Event::Step)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
