use clap::{Parser, Subcommand};

use crate::color::ColorMode;
use crate::variant::VnodesMode;

#[derive(Parser, Debug)]
#[command(
    name = "dtest-ci",
    version,
    about = "Create, push, and clean per-branch CircleCI configuration branches for repeated dtest runs.",
    after_long_help = "Examples:\n  dtest-ci generate --dtest-repo https://github.com/k-rus/cassandra-dtest.git \\\n      --dtest-branch cass-14196 --dtest-test replace_address_test.py::test_multi_dc_replace_with_rf1 \\\n      --vnodes all --branches cassandra-4.0 cassandra-3.11 trunk --remote upstream\n  dtest-ci remove --dtest-branch cass-14196 --yes\n"
)]
pub struct Cli {
    /// Colorize stderr output: auto|always|never
    #[arg(long = "color", value_enum)]
    pub color: Option<ColorMode>,

    /// Print each external command before running it
    #[arg(long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Create, commit, and push CI variant branches for the given base branches
    Generate {
        /// URL of the dtest repository fork (falls back to DTEST_CI_DTEST_REPO)
        #[arg(long = "dtest-repo")]
        dtest_repo: Option<String>,

        /// Name of the branch in the dtest repository to run
        #[arg(long = "dtest-branch")]
        dtest_branch: String,

        /// Name of the pytest test to repeat
        #[arg(long = "dtest-test")]
        dtest_test: Option<String>,

        /// Run the dtest with or without vnodes, or both
        #[arg(long, value_enum, default_value_t = VnodesMode::All)]
        vnodes: VnodesMode,

        /// Base branches to process
        #[arg(long, num_args = 1.., required = true)]
        branches: Vec<String>,

        /// Git remote to fetch base branches from; omitted means local branches
        /// (falls back to DTEST_CI_REMOTE)
        #[arg(long)]
        remote: Option<String>,

        /// Kill the generator script after this many seconds (default: wait forever)
        #[arg(long = "generator-timeout")]
        generator_timeout: Option<u64>,
    },

    /// Delete every local and remote branch whose name contains the dtest branch
    Remove {
        /// Name of the dtest branch the generated branches were named after
        #[arg(long = "dtest-branch")]
        dtest_branch: String,

        /// Print what would be deleted without deleting
        #[arg(long = "dry-run")]
        dry_run: bool,

        /// Proceed without interactive confirmation
        #[arg(long = "yes")]
        yes: bool,
    },
}
