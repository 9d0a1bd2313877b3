// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    author = "Dusk Network B.V. All Rights Reserved.",
    version = blocksyncer::VERSION,
    about = "Greenfield block syncer",
)]
pub struct Args {
    /// Sets the configuration file path
    #[clap(long, short, env = "BS_CONFIG_TOML", value_parser)]
    pub config: Option<PathBuf>,

    /// Output log level
    #[clap(long)]
    pub log_level: Option<tracing::Level>,

    // Change the log format accordingly
    #[clap(
        long,
        value_parser = PossibleValuesParser::new(["coloured", "plain", "json"])
    )]
    pub log_type: Option<String>,

    /// Add log filter(s)
    #[clap(long)]
    pub log_filter: Option<String>,

    /// CometBFT JSON-RPC endpoint of the chain node
    #[clap(long)]
    pub rpc_url: Option<String>,

    /// Height to start from when the database is empty
    #[clap(long)]
    pub start_height: Option<u64>,
}
