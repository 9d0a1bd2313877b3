// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

mod args;
mod config;
mod log;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use blocksyncer::backfill::backfill_bucket_sizes;
use blocksyncer::chain::rpc::RpcClient;
use blocksyncer::chain::ChainClient;
use blocksyncer::dispatcher::Dispatcher;
use blocksyncer::driver::BlockDriver;
use blocksyncer::modules::default_registry;
use blocksyncer::registry::Registry;
use blocksyncer::supervisor::ProgressChecker;
use bsdb::conf::DbCredentials;
use bsdb::{master, MySqlStore, Store};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::args::Args;
use crate::config::Config;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match Config::load(&args, |name| std::env::var(name).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("blocksyncer: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "fatal", err = ?e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<()> {
    log::Log::new(config.log_level()?, config.log_filter(), config.log_type())
        .register()
        .context("cannot install the log subscriber")?;

    info!("chain: {}", config.chain);
    info!("db: {}", config.db);
    info!("syncer: {}", config.syncer);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot build the tokio runtime")?
        .block_on(serve(config))
}

/// Connect to a database and bring its schema and one-shot migrations up
/// to date.
async fn open_store(
    config: &Config,
    credentials: &DbCredentials,
    registry: &Registry,
) -> Result<Arc<dyn Store>> {
    let store = MySqlStore::connect(&config.db, credentials)
        .await
        .with_context(|| format!("cannot connect to {credentials}"))?;
    registry
        .prepare_tables(&store)
        .await
        .with_context(|| format!("cannot prepare tables of {credentials}"))?;
    backfill_bucket_sizes(&store)
        .await
        .context("bucket size backfill failed")?;
    Ok(Arc::new(store))
}

async fn serve(config: Config) -> Result<()> {
    let registry = Arc::new(default_registry());
    info!(modules = ?registry.module_names(), "registry ready");

    let main_store = open_store(&config, &config.db.main, &registry).await?;
    let is_master = master::ensure_signal(main_store.as_ref()).await?;
    info!(event = "master signal", is_master);

    let chain: Arc<dyn ChainClient> = Arc::new(
        RpcClient::new(&config.chain).context("cannot build rpc client")?,
    );
    let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
    let driver = |name: &'static str, store: Arc<dyn Store>| {
        BlockDriver::new(
            name,
            chain.clone(),
            store,
            dispatcher.clone(),
            config.chain.clone(),
            config.syncer.clone(),
            config.db.retry,
        )
    };

    let shutdown = CancellationToken::new();
    let main_cancel = shutdown.child_token();
    let mut drivers = JoinSet::new();
    let mut main_driver = driver("main", main_store.clone());
    let token = main_cancel.clone();
    drivers.spawn(async move { main_driver.run(token).await });

    let mut checker = None;
    if let Some(switched) = &config.db.switched {
        let standby = open_store(&config, switched, &registry).await?;
        let mut standby_driver = driver("standby", standby.clone());
        let token = shutdown.child_token();
        drivers.spawn(async move { standby_driver.run(token).await });

        let progress =
            ProgressChecker::new(main_store, standby, config.syncer.clone());
        let (main_cancel, cancel) = (main_cancel, shutdown.child_token());
        checker = Some(tokio::spawn(async move {
            progress.run(main_cancel, cancel).await
        }));
    }

    let signals = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        error!(event = "signal handler failed", err = %e);
                    }
                    info!(event = "shutdown requested");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        }
    });

    let mut failure = None;
    while let Some(joined) = drivers.join_next().await {
        let result = match joined {
            Ok(result) => result.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow!("driver task failed: {e}")),
        };
        if let Err(e) = result {
            shutdown.cancel();
            failure.get_or_insert(e);
        }
    }
    shutdown.cancel();
    let _ = signals.await;
    if let Some(checker) = checker {
        let _ = checker.await;
    }

    match failure {
        Some(e) => Err(e),
        None => {
            info!(event = "shutdown complete");
            Ok(())
        }
    }
}
