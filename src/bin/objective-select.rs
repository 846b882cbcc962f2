use clap::Parser;
use objective_select::{
    backend::Backend,
    config::{self, SelectorConfig},
    Error,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Objective string, e.g. "pseudo_huber:delta=1.5"
    objective: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compute back-end whose registry is consulted
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Number of outputs per sample (1 for regression, class count otherwise)
    #[arg(short, long)]
    outputs: Option<usize>,

    /// Require differential privacy
    #[arg(long)]
    dp: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<SelectorConfig, Error> {
    let mut config: SelectorConfig = match &cli.config {
        Some(path) => config::from_file(path)?,
        None => SelectorConfig::default(),
    };
    if let Some(objective) = &cli.objective {
        config.objective = Some(objective.clone());
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(outputs) = cli.outputs {
        config.output_count = Some(outputs);
    }
    config.differential_privacy |= cli.dp;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = load_config(cli)?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    match config.objective()? {
        Some(objective) => {
            println!("objective: {}", objective);
            println!("backend:   {}", objective.backend);
            println!("link:      {}", objective.link());
            if let Some(param) = objective.link_param() {
                println!("link param: {}", param);
            }
            println!("task:      {}", objective.task());
        }
        None => println!("no objective given"),
    }
    Ok(())
}

/// 0 on success, 2 when nothing is registered under the name, 1 otherwise.
fn exit_code(result: &Result<(), Error>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if e.is_no_match() => 2,
        Err(_) => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli);
    match &result {
        Err(e) if e.is_no_match() => eprintln!("{}", e),
        Err(e) => eprintln!("Error: {}", e),
        Ok(()) => {}
    }
    ExitCode::from(exit_code(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use objective_select::{
        protocol::{FailureKind, RegistrationFailure},
        selector::SelectError,
    };
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("objective-select").chain(args.iter().copied()))
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(&Ok(())), 0);

        let no_match = Error::Selection(SelectError::NoMatch {
            category: "objective".to_string(),
            backend: Backend::Cpu,
            text: "unknownname".to_string(),
        });
        assert_eq!(exit_code(&Err(no_match)), 2);

        let malformed = Error::Selection(SelectError::Registration(RegistrationFailure::new(
            FailureKind::ParameterValueMalformed,
        )));
        assert_eq!(exit_code(&Err(malformed)), 1);

        assert_eq!(exit_code(&Err(Error::config("unreadable"))), 1);
    }

    #[test]
    fn test_run_outcomes_map_to_exit_codes() {
        assert_eq!(exit_code(&run(&cli(&["pseudo_huber:delta=2"]))), 0);
        assert_eq!(exit_code(&run(&cli(&["unknownname"]))), 2);
        assert_eq!(exit_code(&run(&cli(&["pseudo_huber:delta=abc"]))), 1);
        assert_eq!(exit_code(&run(&cli(&["--backend", "cuda", "gamma_deviance"]))), 2);
        assert_eq!(exit_code(&run(&cli(&["--outputs", "3", "rmse"]))), 1);
    }

    #[test]
    fn test_flags_override_config() {
        let config = load_config(&cli(&["--backend", "AVX2", "--dp", "-o", "1", "rmse"])).unwrap();
        assert_eq!(config.backend, Backend::Avx2);
        assert!(config.differential_privacy);
        assert_eq!(config.output_count, Some(1));
        assert_eq!(config.objective.as_deref(), Some("rmse"));
    }
}
