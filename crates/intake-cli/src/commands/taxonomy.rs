//! Taxonomy command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;

/// Print the request types and sub-types documents are classified into.
pub fn execute_taxonomy(config: &Config, formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.format_taxonomy(&config.pipeline.taxonomy)?);
    Ok(())
}
