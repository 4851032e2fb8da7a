use std::{
	path::PathBuf,
	process::ExitCode,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use anyhow::Context;
use log::info;

mod handler;
mod item;
mod path;
mod response;
mod supervisor;
mod tcp;
mod utils;

use supervisor::Supervisor;

/// Port this server listens on. RFC 1436 reserves 70 for Gopher.
const PORT: u16 = 70;

/// Compile-time default hostname embedded in auto-generated item entries.
const DEFAULT_HOSTNAME: &str = "localhost";

fn usage(program: &str) {
	eprintln!("usage: {program} docroot");
}

#[async_std::main]
async fn main() -> ExitCode {
	env_logger::init_from_env("GOPHERD_LOG");

	if std::env::var_os("GOPHERD_LOG").is_none() {
		eprintln!("Logging is not configured, and only errors will be logged by default");
		eprintln!("Configure logging using the `GOPHERD_LOG` environment variable");
	}

	let mut args = std::env::args_os();
	let program = args
		.next()
		.map(|p| p.to_string_lossy().into_owned())
		.unwrap_or_else(|| "gopherd".to_string());

	let Some(docroot) = args.next().map(PathBuf::from) else {
		usage(&program);
		return ExitCode::FAILURE;
	};

	if !docroot.is_dir() {
		eprintln!(
			"ERROR: Document root path '{}' doesn't exist.",
			docroot.display()
		);
		return ExitCode::FAILURE;
	}

	let docroot = match docroot.canonicalize() {
		Ok(docroot) => docroot,
		Err(e) => {
			eprintln!("ERROR: failed to canonicalize '{}': {e}", docroot.display());
			return ExitCode::FAILURE;
		}
	};

	match start(docroot).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("ERROR: {e:#}");
			ExitCode::FAILURE
		}
	}
}

/// Install the signal handler, bind the listening socket, and run the
/// supervisor to completion. Errors here are unexpected runtime failures
/// (signal installation, port already in use) rather than the two
/// user-facing CLI-validation cases handled directly in `main`.
async fn start(docroot: PathBuf) -> anyhow::Result<()> {
	let running = Arc::new(AtomicBool::new(true));

	{
		let running = Arc::clone(&running);
		ctrlc::set_handler(move || {
			info!("received shutdown signal");
			running.store(false, Ordering::Release);
		})
		.context("failed to install signal handler")?;
	}

	let supervisor = Supervisor::bind(docroot, DEFAULT_HOSTNAME.to_string(), PORT, running)
		.with_context(|| format!("failed to bind port {PORT}"))?;

	supervisor.run().await;

	Ok(())
}
