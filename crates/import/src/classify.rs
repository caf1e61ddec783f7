use decont_core::TransactionType;

/// Map a finalized description to a coarse transaction type.
///
/// Ordered first-match-wins list. The `+cms` card-management marker must be
/// tested before the generic fee markers — CMS lines also mention fees.
pub fn classify_description(description: &str) -> TransactionType {
    let desc = description.to_lowercase();

    if desc.contains("pos purchase") {
        TransactionType::CardPurchase
    } else if desc.contains("+cms") {
        TransactionType::CardPurchase
    } else if desc.contains("alim card") {
        TransactionType::Internal
    } else if desc.contains("return") || desc.contains("deposit") {
        TransactionType::Refund
    } else if desc.contains("comision") || desc.contains("fee") {
        TransactionType::Fee
    } else {
        TransactionType::Other
    }
}
