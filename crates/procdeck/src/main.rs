use anyhow::Context;
use clap::Parser;
use procdeck::cli::{Cli, Commands, MenuArgs, WorkerArgs};
use procdeck::tui::MenuFrontend;
use procdeck::{factory, logging, workers};
use procdeck_core::{Registry, Scheduler, StopSignal, host_stdio};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Worker(args)) => run_worker(args),
        None => run_menu(cli.menu),
    }
}

fn run_worker(args: WorkerArgs) -> anyhow::Result<()> {
    logging::init_worker_logging()?;
    let stop = StopSignal::new();

    #[cfg(unix)]
    procdeck_unix::install_termination_handlers(stop.clone())?;

    host_stdio(&workers::worker_table(), &args.entry, stop)
        .with_context(|| format!("worker {} failed", args.entry))
}

fn run_menu(args: MenuArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    logging::init_menu_logging(config.log_file.as_deref())?;
    info!(
        "Starting procdeck on {} at {} ticks per second",
        factory::platform_name(),
        config.ticks_per_second
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        let mut registry = Registry::new(factory::create_launcher(&config)?, config.history_capacity);
        workers::register_all(&mut registry)?;

        let frontend = MenuFrontend::new(config.title.clone())
            .context("failed to set up the terminal")?;
        let mut scheduler = Scheduler::new(registry, frontend, config.tick_interval());
        scheduler.run().await?;
        info!("procdeck exited cleanly");
        Ok::<(), anyhow::Error>(())
    })
}
