//! oceanctl - command-line client for the DigitalOcean control plane

use oceanctl::cli;
use oceanctl::config;
use oceanctl::framework::{Io, Runner};

#[tokio::main]
async fn main() {
    // Variables from .env must be in place before the environment layer is read
    if let Err(e) = config::load_env() {
        eprintln!("oceanctl: {e}");
        std::process::exit(e.exit_code());
    }

    let tree = match cli::build() {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("oceanctl: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = Runner::new(tree, cli::ENV_BINDINGS).run(args, Io::stdio()).await;
    std::process::exit(code);
}
