//! Per-task outcomes and the aggregate run report

use std::fmt;

/// Kind of object a creation task produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A Node, followed by readiness emulation
    Node,
    /// A Pod
    Pod,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Node => write!(f, "Node"),
            ObjectKind::Pod => write!(f, "Pod"),
        }
    }
}

/// Why a single creation task gave up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFailure {
    /// Kind of object the task was creating
    pub kind: ObjectKind,
    /// Name prefix of the template the task was created from
    pub template: String,
    /// Rendered error
    pub reason: String,
}

/// Result of one creation task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The object exists (and, for nodes, was emulated ready)
    Created {
        /// Kind of object created
        kind: ObjectKind,
        /// Server-assigned name
        name: String,
    },
    /// The task stopped at the first error
    Failed(TaskFailure),
}

impl TaskOutcome {
    /// Failed outcome for a template
    pub fn failed(kind: ObjectKind, template: impl Into<String>, reason: impl fmt::Display) -> Self {
        TaskOutcome::Failed(TaskFailure {
            kind,
            template: template.into(),
            reason: reason.to_string(),
        })
    }
}

/// What a load run did, collected after the pool drained
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Scenario that was materialized
    pub scenario: String,
    /// Repetitions requested
    pub repeat_count: u32,
    /// Tasks handed to the pool
    pub submitted: usize,
    /// Nodes created and emulated ready
    pub nodes_created: usize,
    /// Pods created
    pub pods_created: usize,
    /// Every task that failed, in completion order
    pub failures: Vec<TaskFailure>,
    /// Tasks that panicked instead of returning an outcome
    pub panicked: usize,
}

impl LoadReport {
    /// Empty report for a scenario
    pub fn new(scenario: impl Into<String>, repeat_count: u32) -> Self {
        Self {
            scenario: scenario.into(),
            repeat_count,
            ..Default::default()
        }
    }

    /// Fold one task outcome into the report
    pub fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Created {
                kind: ObjectKind::Node,
                ..
            } => self.nodes_created += 1,
            TaskOutcome::Created {
                kind: ObjectKind::Pod,
                ..
            } => self.pods_created += 1,
            TaskOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    /// Failed plus panicked tasks
    pub fn failure_count(&self) -> usize {
        self.failures.len() + self.panicked
    }

    /// True when every submitted task created its object
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }

    /// Failures for one object kind
    pub fn failures_for(&self, kind: ObjectKind) -> impl Iterator<Item = &TaskFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}
