extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate recprep;

use std::env;
use std::process;

use recprep::preprocessing::{Preprocessor, Summary};

fn run() -> Result<Summary, failure::Error> {
    let mut args = env::args().skip(1);

    let data_dir = args
        .next()
        .ok_or_else(|| format_err!("usage: prepare <data-dir> [rating-threshold]"))?;
    let rating_threshold = match args.next() {
        Some(raw) => raw.parse::<f32>()?,
        None => 3.5,
    };

    Preprocessor::new(data_dir, rating_threshold).process()
}

fn main() {
    env_logger::init();

    match run() {
        Ok(summary) => println!("{:#?}", summary),
        Err(error) => {
            eprintln!("preprocessing failed: {}", error);
            process::exit(1);
        }
    }
}
