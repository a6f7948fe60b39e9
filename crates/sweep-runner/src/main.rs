use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use sweep_core::{ConstructError, ObjectRecipe, Value};
use sweep_runner::{demo_catalog, demo_tree, init_logging, ExecutionManager, RunnerConfig};
use sweep_tree::ConfigurationTree;

fn tree_arg() -> Arg {
    Arg::new("file")
        .value_parser(value_parser!(PathBuf))
        .help("Persisted tree; defaults to tree_file from the configuration")
}

fn cli() -> Command {
    Command::new("sweep")
        .version(sweep_runner::VERSION)
        .about("Enumerate parameter sweeps described by configuration trees")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Runner configuration (TOML)"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Stop after this many combinations"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("demo").about("Build the demo sweep and list every combination"))
        .subcommand(
            Command::new("count")
                .about("Count the combinations of a persisted tree")
                .arg(tree_arg())
                .arg(
                    Arg::new("render")
                        .long("render")
                        .action(ArgAction::SetTrue)
                        .help("Print the tree"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List every combination of a persisted tree")
                .arg(tree_arg()),
        )
        .subcommand(
            Command::new("save-demo")
                .about("Write the demo sweep to a file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Output path"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<RunnerConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RunnerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    if let Some(limit) = matches.get_one::<u64>("limit") {
        config.max_combinations = Some(*limit);
    }
    Ok(config)
}

fn load_tree(args: &ArgMatches, config: &RunnerConfig) -> Result<ConfigurationTree> {
    let Some(path) = args.get_one::<PathBuf>("file").or(config.tree_file.as_ref()) else {
        bail!("no tree file given and none configured");
    };
    let (tree, report) =
        ConfigurationTree::load(path, demo_catalog()).with_context(|| format!("loading {}", path.display()))?;
    for signature in &report.pruned {
        println!("pruned: {signature}");
    }
    if report.dropped_pointers > 0 {
        println!("dropped pointers: {}", report.dropped_pointers);
    }
    Ok(tree)
}

fn list(tree: &ConfigurationTree, config: RunnerConfig) -> Result<()> {
    let manager = ExecutionManager::new(config);
    let mut index = 0u64;
    let summary = manager.run(tree, &mut |value: &Value, recipe: Option<&ObjectRecipe>| -> Result<(), ConstructError> {
        index += 1;
        match recipe {
            Some(recipe) => println!("{index:>5}  {recipe}"),
            None => println!("{index:>5}  {value}"),
        }
        Ok(())
    })?;
    println!();
    println!(
        "{} of {} combinations produced, {} skipped{}",
        summary.produced,
        summary.total,
        summary.skipped,
        if summary.stopped_early { " (stopped early)" } else { "" }
    );
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    // global arguments land in the subcommand's matches
    let scoped = matches.subcommand().map_or(&matches, |(_, args)| args);
    let config = load_config(scoped)?;
    init_logging(&config.log_filter);

    match matches.subcommand() {
        Some(("demo", _)) => {
            let tree = demo_tree()?;
            print!("{}", tree.render());
            println!();
            list(&tree, config)?;
        }
        Some(("count", args)) => {
            let tree = load_tree(args, &config)?;
            if args.get_flag("render") {
                print!("{}", tree.render());
            }
            if !tree.is_ready() {
                bail!("tree is not fully configured");
            }
            println!("{}", tree.total_combinations());
        }
        Some(("list", args)) => {
            let tree = load_tree(args, &config)?;
            list(&tree, config)?;
        }
        Some(("save-demo", args)) => {
            let Some(path) = args.get_one::<PathBuf>("file") else {
                bail!("missing output path");
            };
            demo_tree()?.save(path)?;
            println!("saved {}", path.display());
        }
        _ => bail!("unknown subcommand"),
    }
    Ok(())
}
