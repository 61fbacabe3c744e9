//! Crystal structure summary for mp-126 from the Materials Project.

use std::io;

use mp_fetch::fetch::{StructureOutcome, TARGET_MATERIAL_ID, failure_line, run_structure};
use mp_fetch::{Config, MpRester, logging};

fn main() {
    logging::init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match run_structure(Config::from_env, MpRester::open, TARGET_MATERIAL_ID, &mut out) {
        Ok(StructureOutcome::Found(s)) => {
            tracing::info!(sites = s.sites.len(), "done");
        }
        Ok(StructureOutcome::NotFound | StructureOutcome::Failed(_)) => {}
        Err(e) if e.is_configuration() => {
            eprintln!("{}", failure_line(&e));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", failure_line(&e));
        }
    }
}
