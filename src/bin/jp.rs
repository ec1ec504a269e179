extern crate jaffa_path;

use std::io::Read;
use std::path::PathBuf;

use clap::Parser as CParser;
use log::error;

use jaffa_path::{Options, Value};

#[derive(CParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The query expression to evaluate.
    expression: String,

    /// Path to a JSON document; reads stdin if omitted.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Enable the legacy (JEP-12) literal fence in addition to backtick literals.
    #[arg(long)]
    legacy_literals: bool,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    let document_text = match &args.file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };

    let document_text = match document_text {
        Ok(text) => text,
        Err(err) => {
            error!("could not read document: {err}");
            std::process::exit(1);
        }
    };

    let document: serde_json::Value = match serde_json::from_str(&document_text) {
        Ok(value) => value,
        Err(err) => {
            error!("document is not valid JSON: {err}");
            std::process::exit(1);
        }
    };

    let options = Options::new().with_legacy_literals(args.legacy_literals);

    let expr = match jaffa_path::compile_with_options(&args.expression, &options) {
        Ok(expr) => expr,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let result = match expr.search(Value::from(document), &options) {
        Ok(value) => value,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    match serde_json::Value::try_from(result) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json).expect("JSON values always serialize")),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}
