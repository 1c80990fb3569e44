mod args;
mod generate;

use clap::Parser;
use env_logger::Env;
use log::{debug, LevelFilter};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    debug!("args: {:?}", args);

    if let Err(e) = generate::run(&args) {
        eprintln!("{}", e.user_message());
        std::process::exit(e.exit_code());
    }
}
