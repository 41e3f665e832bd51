use clap::{Parser as ClapParser, Subcommand};
use query_defer::cli::{self, CliError, DemoOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "qdefer")]
#[command(about = "Query-defer - split projections between a data provider and local post-processing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the formatted-name demo query over JSON rows
    Demo {
        /// JSON input: array of objects with first_name/last_name
        /// (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo { input, pretty } => run_demo(input, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_demo(input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let options = DemoOptions { input };
    let report = cli::run_demo(&options)?;

    eprintln!("provider was asked for: [{}]", report.requested_fields);

    let output = serde_json::Value::Array(report.results);
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .unwrap();
    println!("{}", json);

    Ok(())
}
