//! Decoding of pilot lookups.

use birdnest_core::PilotRecord;

use crate::error::FetchError;

/// Parse a pilot JSON document.
pub fn parse_pilot(body: &[u8]) -> Result<PilotRecord, FetchError> {
    let pilot: PilotRecord =
        serde_json::from_slice(body).map_err(|err| FetchError::parse("pilot record", err))?;
    if pilot.pilot_id.trim().is_empty() {
        return Err(FetchError::parse("pilot record", "empty pilotId"));
    }
    Ok(pilot)
}
