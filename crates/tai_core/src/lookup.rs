//! Binary search into monotonic lookup tables.

/// Position of a key relative to a strictly monotonic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPosition {
    /// The key lies outside the table on the side of `table[0]`.
    BeforeFirst,
    /// The key lies outside the table on the side of the last entry.
    AfterLast,
    /// `table[i]` and `table[i + 1]` bracket the key (inclusive at both ends).
    Within(usize),
}

/// Locates `key` in a strictly ascending or strictly descending table.
///
/// Returns `None` for tables with fewer than two entries, which cannot bracket
/// anything.
pub fn bracket_index(table: &[f64], key: f64) -> Option<LookupPosition> {
    let n = table.len();
    if n < 2 {
        return None;
    }
    let ascending = table[n - 1] > table[0];
    // Map everything onto an ascending view so one search covers both orders.
    let oriented = |v: f64| if ascending { v } else { -v };
    let key = oriented(key);

    if key < oriented(table[0]) {
        return Some(LookupPosition::BeforeFirst);
    }
    if key > oriented(table[n - 1]) {
        return Some(LookupPosition::AfterLast);
    }

    let mut lo = 0usize;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if oriented(table[mid]) <= key {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(LookupPosition::Within(lo))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_brackets(table: &[f64], key: f64) {
        match bracket_index(table, key) {
            Some(LookupPosition::Within(i)) => {
                let (lo, hi) = (table[i].min(table[i + 1]), table[i].max(table[i + 1]));
                assert!(lo <= key && key <= hi, "key {key} not in [{lo}, {hi}] at {i}");
            }
            other => panic!("expected bracketing index for {key}, got {other:?}"),
        }
    }

    #[test]
    fn ascending_table_brackets_every_interior_key() {
        let table: Vec<f64> = (0..50).map(|i| (i as f64).powf(1.5)).collect();
        for step in 1..1000 {
            let key = table[49] * step as f64 / 1000.0;
            assert_brackets(&table, key);
        }
        assert_brackets(&table, table[0]);
        assert_brackets(&table, table[49]);
    }

    #[test]
    fn descending_table_brackets_every_interior_key() {
        let table: Vec<f64> = (0..37).map(|i| 10.0 - 0.3 * i as f64).collect();
        for step in 1..500 {
            let key = table[36] + (table[0] - table[36]) * step as f64 / 500.0;
            assert_brackets(&table, key);
        }
        assert_brackets(&table, table[0]);
        assert_brackets(&table, table[36]);
    }

    #[test]
    fn exact_hits_return_left_index() {
        let table = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(bracket_index(&table, 2.0), Some(LookupPosition::Within(1)));
        assert_eq!(bracket_index(&table, 1.0), Some(LookupPosition::Within(0)));
        assert_eq!(bracket_index(&table, 8.0), Some(LookupPosition::Within(2)));
    }

    #[test]
    fn keys_outside_range_report_side() {
        let ascending = [0.0, 1.0, 2.0];
        assert_eq!(bracket_index(&ascending, -0.1), Some(LookupPosition::BeforeFirst));
        assert_eq!(bracket_index(&ascending, 2.1), Some(LookupPosition::AfterLast));

        let descending = [2.0, 1.0, 0.0];
        assert_eq!(bracket_index(&descending, 2.1), Some(LookupPosition::BeforeFirst));
        assert_eq!(bracket_index(&descending, -0.1), Some(LookupPosition::AfterLast));
    }

    #[test]
    fn short_tables_cannot_bracket() {
        assert_eq!(bracket_index(&[], 0.0), None);
        assert_eq!(bracket_index(&[1.0], 1.0), None);
    }
}
