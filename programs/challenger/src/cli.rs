//! Defines the command line interface for the challenger.
use clap::{command, Parser};

#[derive(Clone, Debug, Parser)]
#[command(
    name = "challenger",
    version,
    about = "Greenfield challenger - multi-node chain reader",
    long_about = "Reads Greenfield chain state from a pool of nodes, failing over to the\nhighest healthy node. Runs the background monitors or answers one-shot queries."
)]
/// The command line interface for the challenger.
pub struct ChallengerCli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The subcommands for the challenger.
#[derive(Clone, Debug, Parser)]
pub enum Commands {
    /// Run the health monitor and validator refresh until interrupted.
    Start(start::Args),

    /// Run a single query against the configured nodes and print the result.
    Query(query::Args),
}

/// The arguments for the start subcommand.
pub mod start {
    use super::Parser;

    /// The arguments for the start subcommand.
    #[derive(Clone, Debug, Parser)]
    pub struct Args {
        /// The configuration file for the challenger.
        #[clap(long)]
        pub config: String,
    }
}

/// The arguments for the query subcommand.
pub mod query {
    use super::Parser;

    /// The arguments for the query subcommand.
    #[derive(Clone, Debug, Parser)]
    pub struct Args {
        /// The configuration file for the challenger.
        #[clap(long)]
        pub config: String,

        /// What to query.
        #[command(subcommand)]
        pub target: QueryTarget,
    }

    /// The things that can be queried.
    #[derive(Clone, Debug, Parser)]
    pub enum QueryTarget {
        /// Latest block height of the active node, with retries.
        Height,
        /// The block at a height, as JSON.
        Block {
            /// Block height.
            #[clap(long)]
            height: u64,
        },
        /// Hex encoded `tendermint.types.LightBlock` at a height.
        LightBlock {
            /// Block height.
            #[clap(long)]
            height: u64,
        },
        /// Validator set with BLS keys, at a height or the cached latest set.
        Validators {
            /// Block height; the latest set when omitted.
            #[clap(long)]
            height: Option<u64>,
        },
        /// An `x/auth` account.
        Account {
            /// Account address.
            #[clap(long)]
            address: String,
        },
    }
}
