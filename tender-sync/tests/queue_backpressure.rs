//! Scenario 6 (slow consumer) at the default `queue_size=101`: the queue
//! fills completely, producers block, and no item is dropped.

use std::time::Duration;
use tender_sync::queue::bounded;

#[tokio::test]
async fn full_queue_at_default_capacity_blocks_without_dropping() {
    const CAPACITY: usize = 101;

    let (tx, mut rx) = bounded::<u32>(CAPACITY);

    for i in 0..CAPACITY as u32 {
        tx.push(i).await.unwrap();
    }
    assert_eq!(rx.size(), CAPACITY);

    // The consumer "yields once then sleeps forever": it never drains, so
    // one more push from (possibly another) producer must block.
    let tx2 = tx.clone();
    let blocked = tokio::spawn(async move { tx2.push(CAPACITY as u32).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!blocked.is_finished(), "producer must block on a full queue");

    // Draining one slot unblocks exactly the pending push, and nothing was
    // lost: every item from 0..=CAPACITY is still recoverable in order.
    assert_eq!(rx.try_pop(), Some(0));
    blocked.await.unwrap().unwrap();

    for expected in 1..=CAPACITY as u32 {
        assert_eq!(rx.try_pop(), Some(expected));
    }
    assert_eq!(rx.try_pop(), None);
}
