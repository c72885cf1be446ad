//! Command-line interface for splice.

use clap::{Args, Parser, Subcommand, ValueEnum};
use splice_query::{Fallback, RewriteOptions};

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Inline tagged query fragments before execution", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Project the sample people into view models
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    /// Execute without wrapping, so tagged calls reach the provider
    #[arg(long)]
    pub raw: bool,

    /// Print the tree before and after rewriting
    #[arg(long)]
    pub show_tree: bool,

    /// What to do with tagged calls that cannot be rewritten
    #[arg(long, value_enum, default_value_t = FallbackArg::Warn)]
    pub fallback: FallbackArg,

    /// Maximum nesting of expansions and redirects
    #[arg(long, default_value_t = RewriteOptions::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl DemoArgs {
    pub fn options(&self) -> RewriteOptions {
        RewriteOptions::new()
            .with_fallback(self.fallback.into())
            .with_max_depth(self.max_depth)
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FallbackArg {
    Ignore,
    Warn,
    Deny,
}

impl From<FallbackArg> for Fallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Ignore => Fallback::Ignore,
            FallbackArg::Warn => Fallback::Warn,
            FallbackArg::Deny => Fallback::Deny,
        }
    }
}
