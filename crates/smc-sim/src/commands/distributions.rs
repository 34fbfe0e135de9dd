use std::error::Error;
use std::io::Write;

use smc_core::distributions::REGISTRY;

/// Writes one line per registered distribution: name and parameter list.
pub fn run(out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    for entry in REGISTRY.iter() {
        writeln!(out, "{}({})", entry.name, entry.params.join(", "))?;
    }
    Ok(())
}
