use std::process;

use clap::Parser;
use config::Cli;
use log::error;

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbose + u8::from(!cli.quiet);
    logger::Logger::init(verbosity);
    cli.serialize();

    if let Err(e) = bigrig_rs::run(cli) {
        error!("{e:?}");
        process::exit(1);
    }
}
