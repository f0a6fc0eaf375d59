//! The daily three-task chain and its retry policy.

use crate::error::WeatherOpsError;
use crate::utils::error_chain;
use async_trait::async_trait;
use log::{error, info, warn};
use std::fmt;
use std::time::Duration;

pub const DAG_ID: &str = "weather_ops_pipeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    FetchWeatherData,
    TransformWeatherData,
    LoadToBigQuery,
}

impl Task {
    /// Execution order; each task depends on the one before it.
    pub const ORDER: [Task; 3] = [
        Task::FetchWeatherData,
        Task::TransformWeatherData,
        Task::LoadToBigQuery,
    ];

    pub fn task_id(&self) -> &'static str {
        match self {
            Task::FetchWeatherData => "fetch_weather_data",
            Task::TransformWeatherData => "transform_weather_data",
            Task::LoadToBigQuery => "load_to_bigquery",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Success,
    Failed,
    /// Not run because a task before it failed.
    UpstreamFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub task: Task,
    pub state: TaskState,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagRun {
    pub tasks: Vec<TaskRun>,
}

impl DagRun {
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Success)
    }
}

/// Runs a single task attempt.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: Task) -> Result<(), WeatherOpsError>;
}

async fn run_with_retries<E: TaskExecutor + ?Sized>(
    executor: &E,
    task: Task,
    policy: &RetryPolicy,
) -> TaskRun {
    let mut attempts = 0;
    loop {
        attempts += 1;
        info!("Running task {} (attempt {})", task, attempts);
        match executor.execute(task).await {
            Ok(()) => {
                info!("Task {} succeeded", task);
                return TaskRun {
                    task,
                    state: TaskState::Success,
                    attempts,
                };
            }
            Err(e) if attempts <= policy.retries => warn!(
                "Task {} failed: {}, retrying in {}s",
                task,
                error_chain(&e),
                policy.retry_delay.as_secs()
            ),
            Err(e) => {
                error!(
                    "Task {} failed after {} attempts: {}",
                    task,
                    attempts,
                    error_chain(&e)
                );
                return TaskRun {
                    task,
                    state: TaskState::Failed,
                    attempts,
                };
            }
        }
        tokio::time::sleep(policy.retry_delay).await;
    }
}

/// Runs the tasks in order. A task that exhausts its retries marks every later
/// task as upstream-failed.
pub async fn run_dag<E: TaskExecutor + ?Sized>(executor: &E, policy: &RetryPolicy) -> DagRun {
    info!("Starting DAG run {}", DAG_ID);
    let mut tasks = Vec::with_capacity(Task::ORDER.len());
    let mut blocked = false;
    for task in Task::ORDER {
        if blocked {
            warn!("Skipping task {}, upstream failed", task);
            tasks.push(TaskRun {
                task,
                state: TaskState::UpstreamFailed,
                attempts: 0,
            });
            continue;
        }
        let run = run_with_retries(executor, task, policy).await;
        blocked = run.state != TaskState::Success;
        tasks.push(run);
    }
    let run = DagRun { tasks };
    info!(
        "DAG run {} finished: {}",
        DAG_ID,
        if run.succeeded() { "success" } else { "failed" }
    );
    run
}
