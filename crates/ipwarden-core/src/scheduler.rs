//! Scheduler subsystem. Runs one-shot and recurring maintenance jobs
//! inside the server process.
//!
//! Jobs queue in a time-ordered map; a timer loop pops due entries and
//! spawns them, a completion loop requeues recurring ones. Failed runs
//! back off exponentially per task retry policy. State is in-process
//! only; jobs are re-registered at startup.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use croner::Cron;
use parking_lot::Mutex;

use crate::prelude::*;

pub type TaskId = u64;

// CronSchedule //
//**************//

/// Cron schedule wrapper using the croner crate. Keeps the original
/// expression string for log lines.
#[derive(Debug, Clone)]
pub struct CronSchedule {
	expr: Box<str>,
	cron: Cron,
}

impl CronSchedule {
	/// Parse a cron expression (5 fields: minute hour day month weekday)
	pub fn parse(expr: &str) -> IwResult<Self> {
		let cron = Cron::from_str(expr).map_err(|e| {
			Error::ValidationError(format!("invalid cron expression: {}", e).into())
		})?;
		Ok(Self { expr: expr.into(), cron })
	}

	/// Calculate the next execution time after the given timestamp
	pub fn next_execution(&self, after: Timestamp) -> IwResult<Timestamp> {
		let dt = DateTime::<Utc>::from_timestamp(after.0, 0).unwrap_or_else(Utc::now);

		self.cron
			.find_next_occurrence(&dt, false)
			.map(|next| Timestamp(next.timestamp()))
			.map_err(|e| {
				error!("Failed to find next cron occurrence for '{}': {}", self.expr, e);
				Error::ValidationError(format!("cron next_execution failed: {}", e).into())
			})
	}

	pub fn expression(&self) -> &str {
		&self.expr
	}
}

impl PartialEq for CronSchedule {
	fn eq(&self, other: &Self) -> bool {
		self.expr == other.expr
	}
}

impl Eq for CronSchedule {}

// Task //
//******//

/// A schedulable unit of work. `S` is the shared application state
/// handed to every run.
#[async_trait]
pub trait Task<S: Clone>: Send + Sync + Debug {
	/// Stable name used in log lines
	fn kind_of(&self) -> &'static str;

	async fn run(&self, state: &S) -> IwResult<()>;
}

// RetryPolicy //
//*************//

#[derive(Debug, Clone)]
pub struct RetryPolicy {
	wait_min_max: (u64, u64),
	times: u16,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self { wait_min_max: (60, 3600), times: 10 }
	}
}

impl RetryPolicy {
	/// Create a new RetryPolicy with custom min/max backoff and number of retries
	pub fn new(wait_min_max: (u64, u64), times: u16) -> Self {
		Self { wait_min_max, times }
	}

	/// Calculate exponential backoff in seconds: min * (2^attempt),
	/// capped at max. The shift is clamped so high attempt counts
	/// saturate instead of overflowing.
	pub fn calculate_backoff(&self, attempt_count: u16) -> u64 {
		let (min, max) = self.wait_min_max;
		let backoff = min.saturating_mul(1u64 << u64::from(attempt_count.min(62)));
		backoff.min(max)
	}

	/// Check if we should continue retrying
	pub fn should_retry(&self, attempt_count: u16) -> bool {
		attempt_count < self.times
	}
}

// TaskSchedulerBuilder - Fluent API for task scheduling
//************************************************************

pub struct TaskSchedulerBuilder<'a, S: Clone> {
	scheduler: &'a Scheduler<S>,
	task: Arc<dyn Task<S>>,
	next_at: Option<Timestamp>,
	retry: Option<RetryPolicy>,
	cron: Option<CronSchedule>,
}

impl<'a, S: Clone + Send + Sync + 'static> TaskSchedulerBuilder<'a, S> {
	fn new(scheduler: &'a Scheduler<S>, task: Arc<dyn Task<S>>) -> Self {
		Self { scheduler, task, next_at: None, retry: None, cron: None }
	}

	/// Schedule for a specific absolute timestamp
	pub fn schedule_at(mut self, timestamp: Timestamp) -> Self {
		self.next_at = Some(timestamp);
		self
	}

	/// Schedule after a relative delay (in seconds)
	pub fn schedule_after(mut self, seconds: i64) -> Self {
		self.next_at = Some(Timestamp::from_now(seconds));
		self
	}

	/// Enable automatic retry with exponential backoff
	pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
		self.retry = Some(policy);
		self
	}

	/// Recur on `schedule`; the first run lands on the next occurrence.
	pub fn cron(mut self, schedule: CronSchedule) -> Self {
		self.next_at = schedule.next_execution(Timestamp::now()).ok();
		self.cron = Some(schedule);
		self
	}

	/// Queue the task with all configured options
	pub fn schedule(self) -> TaskId {
		let meta =
			TaskMeta { task: self.task, retry_count: 0, retry: self.retry, cron: self.cron };
		self.scheduler.enqueue(self.next_at.unwrap_or_else(Timestamp::now), meta)
	}
}

#[derive(Debug, Clone)]
pub struct TaskMeta<S: Clone> {
	pub task: Arc<dyn Task<S>>,
	retry_count: u16,
	pub retry: Option<RetryPolicy>,
	pub cron: Option<CronSchedule>,
}

type ScheduledTaskMap<S> = BTreeMap<(Timestamp, TaskId), TaskMeta<S>>;

// Scheduler //
//***********//

#[derive(Clone)]
pub struct Scheduler<S: Clone> {
	next_id: Arc<AtomicU64>,
	tasks_scheduled: Arc<Mutex<ScheduledTaskMap<S>>>,
	tasks_running: Arc<Mutex<HashMap<TaskId, TaskMeta<S>>>>,
	tx_finish: flume::Sender<TaskId>,
	rx_finish: flume::Receiver<TaskId>,
	notify_schedule: Arc<tokio::sync::Notify>,
}

impl<S: Clone + Send + Sync + 'static> Scheduler<S> {
	pub fn new() -> Arc<Self> {
		let (tx_finish, rx_finish) = flume::unbounded();

		Arc::new(Self {
			next_id: Arc::new(AtomicU64::new(1)),
			tasks_scheduled: Arc::new(Mutex::new(BTreeMap::new())),
			tasks_running: Arc::new(Mutex::new(HashMap::new())),
			tx_finish,
			rx_finish,
			notify_schedule: Arc::new(tokio::sync::Notify::new()),
		})
	}

	/// Start the scheduler loops. Call once; `state` is handed to every
	/// task run.
	pub fn start(&self, state: S) {
		// Completion loop: requeue recurring tasks, drop the rest
		let schedule = self.clone();
		let rx_finish = self.rx_finish.clone();
		tokio::spawn(async move {
			while let Ok(id) = rx_finish.recv_async().await {
				debug!("Completed task {} (notified)", id);

				let Some(meta) = schedule.tasks_running.lock().remove(&id) else {
					warn!("Completed task {} not found in running queue", id);
					continue;
				};

				if let Some(ref cron) = meta.cron {
					let next_at = match cron.next_execution(Timestamp::now()) {
						Ok(ts) => ts,
						Err(e) => {
							error!("Recurring task {} will not reschedule: {}", id, e);
							continue;
						}
					};
					info!("Recurring task {} completed, next execution at {}", id, next_at);

					// A fresh occurrence starts with a clean retry budget
					let mut requeued = meta.clone();
					requeued.retry_count = 0;
					schedule.requeue(id, next_at, requeued);
				}
			}
		});

		// Timer loop: pop due tasks, sleep until the next one
		let schedule = self.clone();
		tokio::spawn(async move {
			loop {
				if schedule.tasks_scheduled.lock().is_empty() {
					schedule.notify_schedule.notified().await;
				}
				let time = Timestamp::now();
				if let Some(next_at) = loop {
					let mut tasks_scheduled = schedule.tasks_scheduled.lock();
					let Some((&(timestamp, id), _)) = tasks_scheduled.first_key_value() else {
						break None;
					};
					if timestamp > Timestamp::now() {
						break Some(timestamp);
					}
					debug!("Spawning task id {} (from schedule)", id);
					if let Some(meta) = tasks_scheduled.remove(&(timestamp, id)) {
						schedule.tasks_running.lock().insert(id, meta.clone());
						schedule.spawn_task(state.clone(), id, meta);
					}
				} {
					let diff = next_at.0 - time.0;
					let wait =
						tokio::time::Duration::from_secs(u64::try_from(diff).unwrap_or_default());
					tokio::select! {
						() = tokio::time::sleep(wait) => (),
						() = schedule.notify_schedule.notified() => (),
					};
				}
			}
		});
	}

	/// Create a builder for scheduling a task using the fluent API
	pub fn task(&self, task: Arc<dyn Task<S>>) -> TaskSchedulerBuilder<'_, S> {
		TaskSchedulerBuilder::new(self, task)
	}

	/// Queue `task` for immediate execution
	pub fn add(&self, task: Arc<dyn Task<S>>) -> TaskId {
		self.task(task).schedule()
	}

	fn enqueue(&self, at: Timestamp, meta: TaskMeta<S>) -> TaskId {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.requeue(id, at, meta);
		id
	}

	fn requeue(&self, id: TaskId, at: Timestamp, meta: TaskMeta<S>) {
		self.tasks_scheduled.lock().insert((at, id), meta);
		self.notify_schedule.notify_one();
	}

	fn spawn_task(&self, state: S, id: TaskId, meta: TaskMeta<S>) {
		let tx_finish = self.tx_finish.clone();
		let scheduler = self.clone();
		tokio::spawn(async move {
			match meta.task.run(&state).await {
				Ok(()) => {
					debug!("Task {} completed successfully", id);
					tx_finish.send(id).unwrap_or(());
				}
				Err(e) => {
					if let Some(retry_policy) = &meta.retry {
						if retry_policy.should_retry(meta.retry_count) {
							let backoff = retry_policy.calculate_backoff(meta.retry_count);
							let next_at = Timestamp::from_now(backoff.cast_signed());

							info!(
								"Task {} failed (attempt {}/{}). Scheduling retry in {} seconds: {}",
								id,
								meta.retry_count + 1,
								retry_policy.times,
								backoff,
								e
							);

							// Not a completion; requeue directly instead of
							// signalling tx_finish
							scheduler.tasks_running.lock().remove(&id);
							let mut retry_meta = meta.clone();
							retry_meta.retry_count += 1;
							scheduler.requeue(id, next_at, retry_meta);
						} else {
							error!(
								"Task {} failed after {} retries: {}",
								id, meta.retry_count, e
							);
							tx_finish.send(id).unwrap_or(());
						}
					} else {
						error!("Task {} failed: {}", id, e);
						tx_finish.send(id).unwrap_or(());
					}
				}
			}
		});
	}
}


// vim: ts=4
