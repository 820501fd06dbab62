#![forbid(unsafe_code)]

use clap::Parser;

fn main() {
    let args = famgrid_cli::Args::parse();
    if let Err(error) = famgrid_cli::run(&args) {
        if args.json_errors {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("famgrid: {error}");
        }
        std::process::exit(error.exit_code());
    }
}
