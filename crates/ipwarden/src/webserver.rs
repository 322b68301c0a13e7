//! Plain-HTTP server front. Peer addresses are attached to every
//! connection for the address resolver.

use std::net::SocketAddr;

use axum::Router;

use crate::app::App;
use crate::prelude::*;

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		error!("Cannot listen for the shutdown signal: {}", err);
	}
	info!("Shutting down");
}

/// Bind `app.opts.listen` and serve `router` until SIGINT.
pub async fn serve(app: App, router: Router) -> IwResult<()> {
	let listener = tokio::net::TcpListener::bind(app.opts.listen.as_ref()).await?;
	info!("Listening on {}", app.opts.listen);

	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	Ok(())
}

// vim: ts=4
