mod cli;
mod clock;
mod constants;
mod context;
mod history;
mod operation;
mod settings;
mod shell;
mod tracker;
mod ui;
mod vault;

use crate::cli::Cli;
use crate::context::App;
use anyhow::Result;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    ui::set_verbose(cli.verbose);

    let mut app = App::init(&cli)?;
    let result = shell::run(&mut app);
    app.dispose();

    result
}
