use std::error::Error;
use std::process;
use vibe::Cli;

fn main() {
    let args = Cli::parse_args();
    let command = args.command.clone();
    let verbose_errors = args.verbose_errors;

    if let Err(e) = vibe::run(args) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {e}");
            if verbose_errors {
                let mut cause = e.source();
                while let Some(inner) = cause {
                    eprintln!("  caused by: {inner}");
                    cause = inner.source();
                }
            }
        }
        process::exit(command.exit_code(&e));
    }
}
