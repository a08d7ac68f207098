use serde::{Deserialize, Serialize};

/// Per-unit application fee rates in integer cents.
///
/// One canonical schedule backs both the review-step preview and the amount
/// actually charged at checkout, so the two can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub adult_fee_cents: u32,
    pub pet_fee_cents: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        // $49 per adult, $30 per pet.
        Self { adult_fee_cents: 4_900, pet_fee_cents: 3_000 }
    }
}

/// Deterministic fee quote for a given household.
///
/// The cent totals are authoritative and feed the checkout line items; the
/// dollar fields exist only for display and are derived from the cents, so
/// no floating-point arithmetic participates in what gets charged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub adult_count: u32,
    pub pet_count: u32,
    pub adults_fee_cents: u64,
    pub pets_fee_cents: u64,
    pub total_fee_cents: u64,
    pub adults_fee: f64,
    pub pets_fee: f64,
    pub total_fee: f64,
}

impl FeeSchedule {
    pub fn quote(&self, adult_count: u32, pet_count: u32) -> FeeBreakdown {
        // Counts arrive unbounded from the public quote endpoint; the cent
        // totals run in u64 so no input can wrap them.
        let adults_fee_cents = u64::from(self.adult_fee_cents) * u64::from(adult_count);
        let pets_fee_cents = u64::from(self.pet_fee_cents) * u64::from(pet_count);
        let total_fee_cents = adults_fee_cents + pets_fee_cents;
        FeeBreakdown {
            adult_count,
            pet_count,
            adults_fee_cents,
            pets_fee_cents,
            total_fee_cents,
            adults_fee: cents_to_display_dollars(adults_fee_cents),
            pets_fee: cents_to_display_dollars(pets_fee_cents),
            total_fee: cents_to_display_dollars(total_fee_cents),
        }
    }
}

/// Round-trip through cents keeps the display value at exactly two decimal
/// places.
fn cents_to_display_dollars(cents: u64) -> f64 {
    cents as f64 / 100.0
}
