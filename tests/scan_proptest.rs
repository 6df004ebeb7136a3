//! Property-based tests for scan batching.

use proptest::prelude::*;
use quarry_core::expr::ExprArena;
use quarry_core::types::Batch;
use quarry_operators::scan::Scan;
use quarry_operators::traits::PlanNode;

proptest! {
    /// Property: a scan emits ⌈D/B⌉ batches covering all D rows in order.
    #[test]
    fn scan_batches_cover_data(len in 0usize..200, batch_size in 1usize..40) {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([("id", (0..len as i64).collect::<Vec<_>>())]).unwrap();
        let mut scan = Scan::new(&mut arena, batch_size, data).unwrap();

        let mut batches = 0usize;
        let mut seen = Vec::new();
        let mut last_cursor = scan.cursor();
        while let Some(batch) = scan.execute(&arena).unwrap() {
            prop_assert!(batch.len() <= batch_size);
            prop_assert!(batch.len() > 0);
            prop_assert!(scan.cursor() >= last_cursor);
            last_cursor = scan.cursor();
            batches += 1;
            seen.extend(batch.column("id").unwrap().values.iter().filter_map(|v| v.as_i64()));
        }

        prop_assert_eq!(batches, len.div_ceil(batch_size));
        prop_assert_eq!(seen, (0..len as i64).collect::<Vec<_>>());
        prop_assert!(scan.execute(&arena).unwrap().is_none());
        prop_assert_eq!(scan.cursor(), len);
    }
}
