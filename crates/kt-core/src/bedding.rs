//! # Hotel Bed Types
//!
//! A small catalog of bed types (double, twin, sofa bed...) and, per hotel
//! booking, how many of each the guest needs. Allocations are replaced as a
//! whole whenever the booking's beds are set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validation::validate_required;

const BED_TYPE_NAME_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedType {
    pub id: String,
    pub name: String,
}

impl BedType {
    pub fn new(name: impl Into<String>) -> Self {
        BedType {
            id: Uuid::new_v4().to_string(),
            name: name.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("bed_type", &self.name, BED_TYPE_NAME_MAX)
    }
}

/// How many beds of one type a hotel booking needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAllocation {
    pub bed_type_id: String,
    pub quantity: u32,
}

impl BedAllocation {
    pub fn new(bed_type_id: impl Into<String>, quantity: u32) -> Self {
        BedAllocation {
            bed_type_id: bed_type_id.into(),
            quantity,
        }
    }
}

/// The rows to store for a booking: zero quantities dropped, repeated bed
/// types added together, ordered by bed type id.
pub fn collapse_allocations(allocations: &[BedAllocation]) -> Vec<BedAllocation> {
    let mut by_type: BTreeMap<&str, u32> = BTreeMap::new();
    for allocation in allocations.iter().filter(|a| a.quantity > 0) {
        *by_type.entry(allocation.bed_type_id.as_str()).or_default() += allocation.quantity;
    }

    by_type
        .into_iter()
        .map(|(bed_type_id, quantity)| BedAllocation::new(bed_type_id, quantity))
        .collect()
}

pub fn total_beds(allocations: &[BedAllocation]) -> u32 {
    allocations.iter().map(|a| a.quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bed_type_name() {
        assert_eq!(BedType::new("  Double ").name, "Double");
        assert!(BedType::new(" ").validate().is_err());
        assert!(BedType::new("B".repeat(51)).validate().is_err());
        assert!(BedType::new("Sofa bed").validate().is_ok());
    }

    #[test]
    fn test_collapse_drops_zeros_and_merges() {
        let collapsed = collapse_allocations(&[
            BedAllocation::new("twin", 2),
            BedAllocation::new("double", 0),
            BedAllocation::new("cot", 1),
            BedAllocation::new("twin", 1),
        ]);

        assert_eq!(
            collapsed,
            vec![BedAllocation::new("cot", 1), BedAllocation::new("twin", 3)]
        );
        assert_eq!(total_beds(&collapsed), 4);
        assert!(collapse_allocations(&[]).is_empty());
    }
}
