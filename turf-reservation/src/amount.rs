/// Splits `total` minor units across `parts` bookings.
///
/// Every part gets `total / parts`; the remainder goes to the first part, so
/// the parts always sum to exactly `total`.
pub fn split_amount(total: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }

    let n = parts as i64;
    let base = total / n;
    let remainder = total % n;

    let mut amounts = vec![base; parts];
    amounts[0] += remainder;
    amounts
}
