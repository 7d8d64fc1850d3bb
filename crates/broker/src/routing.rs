//! Topic pattern matching for exchange bindings.

/// Returns true if a binding pattern matches a routing key.
///
/// Patterns and keys are dot-separated. `*` matches exactly one segment,
/// `#` matches zero or more segments, anything else matches literally.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_segments(&pattern, &key)
}

fn matches_segments(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_segments(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && matches_segments(rest, &key[1..]),
        Some((segment, rest)) => key
            .split_first()
            .is_some_and(|(first, tail)| first == segment && matches_segments(rest, tail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(topic_matches("order.created", "order.created"));
        assert!(!topic_matches("order.created", "order.cancelled"));
        assert!(!topic_matches("order.created", "order.created.v2"));
        assert!(!topic_matches("order.created", "order"));
    }

    #[test]
    fn star_matches_exactly_one_segment() {
        assert!(topic_matches("stock.*", "stock.deducted"));
        assert!(topic_matches("stock.*", "stock.failed"));
        assert!(!topic_matches("stock.*", "stock"));
        assert!(!topic_matches("stock.*", "stock.deducted.partial"));
    }

    #[test]
    fn hash_matches_any_number_of_segments() {
        assert!(topic_matches("#", "order.created"));
        assert!(topic_matches("stock.#", "stock.deducted"));
        assert!(topic_matches("stock.#", "stock.deducted.partial"));
        assert!(topic_matches("#.failed", "stock.failed"));
        assert!(!topic_matches("order.#", "stock.failed"));
    }

    #[test]
    fn hash_can_match_zero_segments() {
        assert!(topic_matches("stock.#", "stock"));
        assert!(topic_matches("#", ""));
    }
}
