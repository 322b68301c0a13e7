//! Composed application runtime. [`AppBuilder`] assembles the shared
//! state; [`run`] schedules maintenance, starts the scheduler, and
//! serves HTTP until shutdown.

use std::sync::Arc;

use crate::prelude::*;
use crate::{routes, webserver};
use ipwarden_core::maintenance::{PurgeCacheTask, ScanTask};
use ipwarden_core::scheduler::{CronSchedule, RetryPolicy};

pub use ipwarden_core::app::{Adapters, App, AppBuilder, AppOpts, AppState, VERSION};

/// Cadence of the expired-entry sweep over the shared store.
const PURGE_CRON: &str = "*/10 * * * *";

/// Run the application: recurring jobs on the scheduler, then the HTTP
/// server on `app.opts.listen`. Returns when the server shuts down.
pub async fn run(app: App) -> IwResult<()> {
	info!("ipwarden v{}", VERSION);

	let scan_schedule = CronSchedule::parse(&app.opts.scan_cron)?;
	info!("Scheduling activity scan on '{}'", scan_schedule.expression());
	app.scheduler
		.task(Arc::new(ScanTask))
		.cron(scan_schedule)
		.with_retry(RetryPolicy::default())
		.schedule();
	app.scheduler.task(Arc::new(PurgeCacheTask)).cron(CronSchedule::parse(PURGE_CRON)?).schedule();
	app.scheduler.start(app.clone());

	let router = routes::init(app.clone());
	webserver::serve(app, router).await
}

// vim: ts=4
