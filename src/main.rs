//! splice CLI entry point.

mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command, DemoArgs};
use splice::{Error, MemoryProvider, sample};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splice=info,splice_query=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo(args) => {
            if let Err(e) = demo(&args) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn demo(args: &DemoArgs) -> Result<(), Error> {
    let provider = Arc::new(MemoryProvider::new().with_table(sample::PEOPLE, sample::seed_people()));
    let people = sample::people(provider);

    let base = if args.raw {
        people
    } else {
        people.extendable_with(sample::registry()?, args.options())
    };
    let models = base
        .apply(sample::person_view_models(), [])
        .map_err(splice_query::QueryError::from)?;

    if args.show_tree {
        println!("=== Composed tree ===\n{models}\n");
        if let Some(rewriting) = models.provider().as_rewriting() {
            let outcome = rewriting.rewrite(models.expr())?;
            println!(
                "=== Rewritten tree ({} expansion(s), {} redirect(s), {} substitution(s)) ===\n{}\n",
                outcome.expansions, outcome.redirects, outcome.substitutions, outcome.expr
            );
        }
    }

    println!("=== Results ===");
    for value in models.fetch()? {
        println!("{value}");
    }
    Ok(())
}
