//! Level policy: tier to inbound capacity.

/// Fixed cap on a sender's outstanding outbound assignments, independent of
/// level. The backfill sweep short-circuits senders at or above this.
pub const MAX_OUTSTANDING_SENDS: u64 = 3;

/// Maximum inbound assignments a receiver at the given tier may hold.
/// Unknown tiers get the base capacity.
pub fn capacity_for(level: &str) -> u64 {
    match level {
        "Star" => 3,
        "Silver" => 9,
        "Gold" => 27,
        "Platinum" => 81,
        "Diamond" => 243,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_levels() {
        assert_eq!(capacity_for("Star"), 3);
        assert_eq!(capacity_for("Silver"), 9);
        assert_eq!(capacity_for("Gold"), 27);
        assert_eq!(capacity_for("Platinum"), 81);
        assert_eq!(capacity_for("Diamond"), 243);
    }

    #[test]
    fn test_unknown_level_falls_back_to_base() {
        assert_eq!(capacity_for(""), 3);
        assert_eq!(capacity_for("Bronze"), 3);
    }
}
