//! id command - Encode and decode file ids offline

use super::print_json;
use crate::cli::args::KeyArgs;
use crate::core::id;
use anyhow::Result;

/// Print the id of a file key.
pub fn encode_id(args: &KeyArgs) -> Result<()> {
    let key = args.to_key()?;
    println!("{}", id::encode(&key));
    Ok(())
}

/// Print the key an id names as JSON.
pub fn decode_id(id: &str) -> Result<()> {
    let key = id::decode(id)?;
    print_json(&key)
}
