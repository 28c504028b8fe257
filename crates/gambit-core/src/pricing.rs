// Market value curve and coin conversions.

/// Smallest market value any ranked player can have.
pub const MIN_VALUE: f64 = 1.0;

/// Market value for a player at 1-based ranking position `rank`.
///
/// Piecewise linear by rank:
/// - 1..=10: 25 down to 16, one unit per rank
/// - 11..=50: 15 down to 8
/// - 51..=100: 8 down to 5
/// - 101..=200: 5 down to 3
/// - 201..=500: 3 down to 1
/// - beyond: 1
///
/// Rounded to the nearest 0.1 and never below `MIN_VALUE`.
pub fn value_for_rank(rank: usize) -> f64 {
    let rank = rank.max(1) as f64;
    let raw = if rank <= 10.0 {
        25.0 - (rank - 1.0)
    } else if rank <= 50.0 {
        segment(rank, 11.0, 50.0, 15.0, 8.0)
    } else if rank <= 100.0 {
        segment(rank, 51.0, 100.0, 8.0, 5.0)
    } else if rank <= 200.0 {
        segment(rank, 101.0, 200.0, 5.0, 3.0)
    } else if rank <= 500.0 {
        segment(rank, 201.0, 500.0, 3.0, 1.0)
    } else {
        MIN_VALUE
    };
    round_tenth(raw.max(MIN_VALUE))
}

fn segment(rank: f64, first: f64, last: f64, high: f64, low: f64) -> f64 {
    high - (rank - first) * (high - low) / (last - first)
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Coins charged to sign a player outright.
pub fn signing_cost(value: f64, coins_per_value_unit: u64) -> u64 {
    (value * coins_per_value_unit as f64).round().max(0.0) as u64
}

/// Coins refunded when a card is quicksold.
pub fn quicksell_refund(value: f64, coins_per_value_unit: u64, rate: f64) -> u64 {
    (value * coins_per_value_unit as f64 * rate).floor().max(0.0) as u64
}
