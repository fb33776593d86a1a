use anyhow::Context;
use clap::{App, Arg};
use overload_inference::solver::{SolveStatus, Solver, SolverConfig};
use overload_inference::system::ConstraintSystem;
use overload_inference::types::{ConversionTable, ConversionTableDefinition};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let matches = App::new("solve_constraints")
        .arg(Arg::with_name("input").required(true).index(1))
        .arg(
            Arg::with_name("conversions")
                .long("conversions")
                .takes_value(true)
                .help("JSON file with widening pairs; defaults to Int -> Float"),
        )
        .arg(
            Arg::with_name("retain_all")
                .long("retain_all")
                .takes_value(false)
                .help("keep every solution instead of only minimum-score ones"),
        )
        .arg(
            Arg::with_name("max_steps")
                .long("max_steps")
                .takes_value(true),
        )
        .arg(Arg::with_name("json").long("json").takes_value(false))
        .get_matches();

    let input = matches.value_of("input").unwrap();
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading constraint file {}", input))?;

    let conversions = match matches.value_of("conversions") {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening conversion table {}", path))?;
            let definition: ConversionTableDefinition =
                serde_json::from_reader(file).context("parsing conversion table")?;
            ConversionTable::from_definition(&definition)
        }
        None => ConversionTable::default(),
    };

    let mut cs = ConstraintSystem::new(conversions);
    cs.parse_and_add(&text).context("installing constraints")?;

    let mut config = SolverConfig::default();
    config.retain_all_solutions = matches.is_present("retain_all");
    if let Some(max_steps) = matches.value_of("max_steps") {
        config.max_steps = max_steps.parse().context("parsing --max_steps")?;
    }

    let result = Solver::new(config).solve(&mut cs);

    if matches.is_present("json") {
        serde_json::to_writer_pretty(std::io::stdout(), &result.solutions)?;
        println!();
    } else {
        for (index, solution) in result.solutions.iter().enumerate() {
            println!("--- solution {} ---", index);
            for (var, ty) in solution.assignments.iter() {
                println!("  ${} := {}", cs.var_name(*var), ty);
            }
            for (var, decl) in solution.overloads.iter() {
                println!("  ${} via {}", cs.var_name(*var), decl);
            }
            println!("  score {}", solution.get_fixed_score());
        }
    }

    match result.status {
        SolveStatus::Complete => Ok(()),
        SolveStatus::Incomplete => {
            eprintln!(
                "incomplete: budget exhausted after {} steps",
                result.stats.steps_taken
            );
            Ok(())
        }
        SolveStatus::Failed => anyhow::bail!("no solution satisfies the constraints"),
    }
}
