use super::*;
use crate::adapters::{ack_link, delivery_link, InMemorySnapshotStore, LossyTransport};
use std::time::Duration;

#[derive(Default)]
struct Collecting {
    seen: Mutex<Vec<String>>,
}

impl Collecting {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl DeliveryHandler<String> for Collecting {
    async fn handle(&self, payload: String) {
        self.seen.lock().push(payload);
    }
}

fn sender_node() -> NodeId {
    NodeId::repeat(1)
}

fn config() -> DeliveryConfig {
    DeliveryConfig {
        keep_snapshots: 2,
        ..Default::default()
    }
}

/// A sender and receiver joined by in-process links, both loops running.
struct Channel {
    sender: Arc<ReliableSender<String>>,
    handler: Arc<Collecting>,
    snapshots: Arc<InMemorySnapshotStore<String>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Channel {
    fn start(delivery_drops: usize, ack_drops: usize) -> Self {
        let config = config();
        let (deliveries, delivery_rx) = delivery_link::<String>(config.channel_capacity);
        let (acks, ack_rx) = ack_link(config.channel_capacity);
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let handler = Arc::new(Collecting::default());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let sender: Arc<ReliableSender<String>> = Arc::new(ReliableSender::new(
            sender_node(),
            config.clone(),
            Arc::new(LossyTransport::new(deliveries, delivery_drops)),
            snapshots.clone(),
        ));
        let receiver: Arc<ReliableReceiver<String>> = Arc::new(ReliableReceiver::new(
            &config,
            Arc::new(LossyTransport::new(acks, ack_drops)),
            handler.clone(),
        ));

        let tasks = vec![
            tokio::spawn(sender.clone().run(ack_rx, shutdown_rx.clone())),
            tokio::spawn(receiver.run(delivery_rx, shutdown_rx)),
        ];
        Self {
            sender,
            handler,
            snapshots,
            shutdown,
            tasks,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            task.await.unwrap();
        }
    }
}

async fn settle(sender: &ReliableSender<String>) {
    for _ in 0..100 {
        if sender.pending_len() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_delivered_once_over_clean_link() {
    let channel = Channel::start(0, 0);

    let id = channel.sender.send("root-a".to_string()).await.unwrap();
    assert_eq!(id, DeliveryId(1));
    settle(&channel.sender).await;

    assert_eq!(channel.handler.seen(), vec!["root-a".to_string()]);
    assert_eq!(channel.sender.confirmed_up_to(), DeliveryId(1));
    channel.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_redelivers_until_acked() {
    // First send and first redelivery are lost
    let channel = Channel::start(2, 0);

    channel.sender.send("root-a".to_string()).await.unwrap();
    assert_eq!(channel.sender.pending_len(), 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(channel.handler.seen().is_empty());
    assert_eq!(channel.sender.pending_len(), 1);

    settle(&channel.sender).await;
    assert_eq!(channel.handler.seen(), vec!["root-a".to_string()]);
    assert_eq!(channel.sender.pending_len(), 0);
    channel.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_lost_ack_replay_is_deduplicated() {
    let channel = Channel::start(0, 1);

    channel.sender.send("root-a".to_string()).await.unwrap();
    channel.sender.send("root-b".to_string()).await.unwrap();
    settle(&channel.sender).await;

    // The replay of the unacked delivery reached the receiver but not the handler
    assert_eq!(
        channel.handler.seen(),
        vec!["root-a".to_string(), "root-b".to_string()]
    );
    assert_eq!(channel.sender.confirmed_up_to(), DeliveryId(2));
    channel.stop().await;
}

#[tokio::test]
async fn test_receiver_acks_every_copy() {
    let config = config();
    let (acks, mut ack_rx) = ack_link(config.channel_capacity);
    let handler = Arc::new(Collecting::default());
    let receiver: ReliableReceiver<String> = ReliableReceiver::new(&config, Arc::new(acks), handler.clone());

    let delivery = Delivery {
        id: DeliveryId(7),
        sender: sender_node(),
        payload: "root-a".to_string(),
    };
    assert!(receiver.receive(delivery.clone()).await);
    assert!(!receiver.receive(delivery.clone()).await);

    // Same id from a different sender is a different delivery
    let other = Delivery {
        sender: NodeId::repeat(2),
        ..delivery
    };
    assert!(receiver.receive(other).await);

    for _ in 0..3 {
        assert_eq!(ack_rx.recv().await.unwrap().id, DeliveryId(7));
    }
    assert_eq!(handler.seen().len(), 2);
}

#[tokio::test]
async fn test_confirm_ignores_foreign_acks() {
    let (deliveries, _rx) = delivery_link::<String>(8);
    let sender: ReliableSender<String> = ReliableSender::new(
        sender_node(),
        config(),
        Arc::new(deliveries),
        Arc::new(InMemorySnapshotStore::new()),
    );
    let id = sender.send("root-a".to_string()).await.unwrap();

    assert!(!sender.confirm(Ack {
        id,
        sender: NodeId::repeat(9)
    }));
    assert!(sender.confirm(Ack {
        id,
        sender: sender_node()
    }));
    assert!(!sender.confirm(Ack {
        id,
        sender: sender_node()
    }));
}

#[tokio::test]
async fn test_restore_redelivers_pending_after_restart() {
    let snapshots: Arc<InMemorySnapshotStore<String>> = Arc::new(InMemorySnapshotStore::new());

    // Everything the first incarnation sends is lost
    let (dead, _dead_rx) = delivery_link::<String>(8);
    let first: ReliableSender<String> = ReliableSender::new(
        sender_node(),
        config(),
        Arc::new(LossyTransport::new(dead, usize::MAX)),
        snapshots.clone(),
    );
    first.send("root-a".to_string()).await.unwrap();
    first.send("root-b".to_string()).await.unwrap();
    first.confirm(Ack {
        id: DeliveryId(1),
        sender: sender_node(),
    });
    first.snapshot().unwrap();
    drop(first);

    let (link, mut rx) = delivery_link::<String>(8);
    let second: ReliableSender<String> = ReliableSender::new(sender_node(), config(), Arc::new(link), snapshots);
    assert_eq!(second.restore().await.unwrap(), 1);

    let replayed = rx.recv().await.unwrap();
    assert_eq!(replayed.id, DeliveryId(2));
    assert_eq!(replayed.payload, "root-b");
    assert_eq!(second.confirmed_up_to(), DeliveryId(1));

    // Numbering continues past the restored ids
    assert_eq!(second.send("root-c".to_string()).await.unwrap(), DeliveryId(3));
}

#[tokio::test]
async fn test_restore_without_snapshot_is_empty() {
    let (link, _rx) = delivery_link::<String>(8);
    let sender: ReliableSender<String> = ReliableSender::new(
        sender_node(),
        config(),
        Arc::new(link),
        Arc::new(InMemorySnapshotStore::new()),
    );
    assert_eq!(sender.restore().await.unwrap(), 0);
    assert_eq!(sender.pending_len(), 0);
}

#[tokio::test]
async fn test_snapshots_pruned_behind_confirmed_point() {
    let snapshots: Arc<InMemorySnapshotStore<String>> = Arc::new(InMemorySnapshotStore::new());
    let (link, _rx) = delivery_link::<String>(16);
    let sender: ReliableSender<String> = ReliableSender::new(sender_node(), config(), Arc::new(link), snapshots.clone());

    for n in 1..=4u64 {
        let id = sender.send(format!("root-{n}")).await.unwrap();
        sender.confirm(Ack {
            id,
            sender: sender_node(),
        });
        assert_eq!(sender.snapshot().unwrap(), n);
    }
    assert_eq!(snapshots.len(), 2);

    // Unchanged state is not saved again
    assert_eq!(sender.snapshot().unwrap(), 4);
    assert_eq!(snapshots.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_snapshot_and_final_snapshot_on_shutdown() {
    let channel = Channel::start(usize::MAX, 0);
    channel.sender.send("root-a".to_string()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    let latest = channel.snapshots.latest().unwrap().unwrap();
    assert_eq!(latest.pending.len(), 1);

    channel.sender.send("root-b".to_string()).await.unwrap();
    let snapshots = channel.snapshots.clone();
    channel.stop().await;

    let latest = snapshots.latest().unwrap().unwrap();
    assert_eq!(latest.pending.len(), 2);
    assert_eq!(latest.last_issued, DeliveryId(2));
}
