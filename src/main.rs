use lazyscheme::{EvalError, Evaluator, logging, parse_program};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    logging::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: lazyscheme <file>");
        return ExitCode::from(2);
    };
    let input = match std::fs::read_to_string(&path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Could not read '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    info!(%path, "running program");

    let result = parse_program(&input)
        .map_err(EvalError::from)
        .and_then(|program| Evaluator::new(io::stdout()).eval_program(&program));
    match result {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Err(io_err) = e.pretty_print(&path, &input) {
                error!(%io_err, "could not render error report");
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
