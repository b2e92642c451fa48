use anyhow::Result;
use codetriage::cli;
use codetriage::observability::install_panic_hook;

fn main() -> Result<()> {
    install_panic_hook();
    let args = cli::parse_args();
    cli::run(args.command)
}
