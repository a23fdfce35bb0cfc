use std::fs;
use std::io::Write;

use anyhow::Context;
use config::{Cli, Commands, Config, ResolvedConfig, Run};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Dispatches a parsed [`Cli`] invocation: load/override configuration,
/// resolve it against the kernel, run the requested simulation, and write
/// whatever output the configuration names.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.commands {
        Commands::Run { run } => run_simulation(run),
        Commands::FromYaml { config } => {
            let contents = fs::read_to_string(&config)
                .with_context(|| format!("reading {}", config.display()))?;
            let parsed: Config = serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing {}", config.display()))?;
            print!("{}", serde_yaml::to_string(&parsed)?);
            Ok(())
        }
    }
}

fn run_simulation(run: Run) -> anyhow::Result<()> {
    let contents = fs::read_to_string(&run.config)
        .with_context(|| format!("reading configuration file {}", run.config.display()))?;
    let mut config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing configuration file {}", run.config.display()))?;

    if let Some(seed) = run.seed {
        config.seed = Some(seed);
    }
    if let Some(mode) = run.mode {
        config.mode = mode;
    }
    if let Some(path) = run.newick_out {
        config.output.newick_path = Some(path);
    }
    if let Some(path) = run.yaml_out {
        config.output.yaml_path = Some(path);
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    info!("Using RNG seed {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let ResolvedConfig { root_dist, periods, mode, tree_sim, tree_file, output } =
        config.resolve(&mut rng).context("resolving configuration")?;

    info!("Root range: {root_dist}");

    let tree = if let Some(tree_sim) = tree_sim {
        info!("Simulating tree + range jointly over duration {}", tree_sim.duration);
        let split_mode = mode.to_split_mode();
        let root = kernel::simulate_tree(root_dist, tree_sim.duration, &periods, &mut rng, split_mode)
            .context("simulating tree")?;
        kernel::Tree { root }
    } else if let Some(tree_file) = &tree_file {
        info!("Annotating tree read from {}", tree_file.display());
        let contents = fs::read_to_string(tree_file)
            .with_context(|| format!("reading tree file {}", tree_file.display()))?;
        let input = config::parse_newick(&contents).context("parsing newick tree")?;
        kernel::simulate_transitions_over_tree(
            input,
            root_dist,
            &periods,
            &mut rng,
            mode.to_spread_mode(),
            mode.to_split_mode(),
        )
        .context("annotating tree")?
    } else {
        anyhow::bail!("configuration names neither `simulate_tree` nor `tree_file`");
    };

    info!("Simulated {} nodes, {} leaves", tree.node_count(), tree.leaf_count());

    if let Some(path) = &output.newick_path {
        let newick = tree.to_newick(&mut |node| {
            let label = node.label.clone().unwrap_or_else(|| node.string_id());
            format!("{label}:{}", node.brlen)
        });
        fs::write(path, newick).with_context(|| format!("writing newick output to {}", path.display()))?;
        info!("Wrote newick tree to {}", path.display());
    }

    if let Some(path) = &output.yaml_path {
        let mut file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        for node in tree.preorder() {
            writeln!(file, "{}: {}", node.string_id(), node.final_state)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        info!("Wrote per-node final ranges to {}", path.display());
    }

    Ok(())
}
