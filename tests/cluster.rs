//! End-to-end tests driving several in-process `LeaseNode`s over real
//! loopback TCP. All scenarios live in one `#[tokio::test]` function
//! because every node binds a fixed port from the compiled-in peer table
//! (`PEER_TABLE`): running them as separate tests would race to bind the
//! same ports.

use std::time::Duration;

use paxoslease::LeaseNode;

const FAST_CONFIG: &str = r#"
    period_len_ms = 15
    lease_len = 5
    refresh_len = 2
    peer_timeout_ms = 100
    retry_cnt = 0
"#;

async fn spawn_cluster(n: u8) -> Vec<LeaseNode> {
    let mut nodes = Vec::with_capacity(n as usize);
    for id in 0..n {
        let node = LeaseNode::new_and_setup(id, n, Some(FAST_CONFIG))
            .await
            .expect("node should start");
        nodes.push(node);
    }
    nodes
}

fn master_count(nodes: &[LeaseNode]) -> usize {
    nodes.iter().filter(|n| n.handle().check_master()).count()
}

fn master_index(nodes: &[LeaseNode]) -> Option<usize> {
    nodes.iter().position(|n| n.handle().check_master())
}

#[tokio::test]
async fn full_cluster_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut nodes = spawn_cluster(5).await;

    // scenario 1: cold start -- within a handful of periods exactly one
    // node should have won the majority and become master
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        master_count(&nodes),
        1,
        "expected exactly one master after cold start"
    );
    let first_master = master_index(&nodes).unwrap();

    // scenario 2: renewal -- under a stable, fully-reachable cluster the
    // master should keep renewing rather than losing and re-acquiring
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(master_count(&nodes), 1, "master should stay stable");
        assert_eq!(
            master_index(&nodes),
            Some(first_master),
            "stable majority should not hand off mastership"
        );
    }

    // scenario 3: master crash -- stop the master's ticker and listener
    // (standing in for a process crash) and expect a survivor to take over
    // within a bounded number of periods
    nodes[first_master].shutdown().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    let survivors: Vec<&LeaseNode> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != first_master)
        .map(|(_, n)| n)
        .collect();
    let survivor_masters = survivors
        .iter()
        .filter(|n| n.handle().check_master())
        .count();
    assert_eq!(
        survivor_masters, 1,
        "exactly one survivor should take over mastership after the old master crashes"
    );

    for n in nodes.iter_mut() {
        n.shutdown().await;
    }
}

#[tokio::test]
async fn check_master_is_false_before_any_tick_fires() {
    // a node that has not yet had a chance to tick should never claim
    // mastership -- CheckMaster is a pure local read, not a round-trip
    let mut node = LeaseNode::new_and_setup(6, 7, Some(FAST_CONFIG))
        .await
        .expect("node should start");
    assert!(!node.handle().check_master());
    node.shutdown().await;
}
