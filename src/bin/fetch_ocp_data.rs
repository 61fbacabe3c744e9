//! Open Catalyst contributions for mp-126, with a Pt-formula fallback.

use std::io;

use mp_fetch::fetch::contributions::PROJECT;
use mp_fetch::fetch::run_contributions;
use mp_fetch::{Config, ContribsClient, logging};

fn main() {
    logging::init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match run_contributions(Config::from_env, |cfg| ContribsClient::new(cfg, PROJECT), &mut out) {
        Ok(Some(set)) => {
            tracing::info!(records = set.records.len(), source = ?set.source, "done");
        }
        Ok(None) => {}
        Err(e) if e.is_configuration() => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
        }
    }
}
