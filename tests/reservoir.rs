//! End-to-end reservoir behavior against a live factory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use taskfount::{
    DeliverError, Event, EventKind, FnFactory, Fount, FountConfig, FountError, FountHandle,
    Registry, StateLabel, Subscribe, Tether, Worker, WorkerFactory,
};

/// Decrements the shared counter when a worker task ends, on any path.
struct AliveGuard(Arc<AtomicUsize>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Test factory with a configurable spawn delay, spawn/alive counters, a
/// channel reporting executed jobs, and an optional poisoned message whose
/// delivery always fails.
struct TestFactory {
    spawn_delay: Duration,
    spawned: Arc<AtomicUsize>,
    alive: Arc<AtomicUsize>,
    done: mpsc::UnboundedSender<u32>,
    poison: Option<u32>,
}

#[async_trait]
impl WorkerFactory for TestFactory {
    type Msg = u32;

    async fn spawn_one(&self, tether: &Tether) -> Worker<u32> {
        if !self.spawn_delay.is_zero() {
            sleep(self.spawn_delay).await;
        }
        self.spawned.fetch_add(1, Ordering::SeqCst);
        self.alive.fetch_add(1, Ordering::SeqCst);

        let guard = AliveGuard(Arc::clone(&self.alive));
        let done = self.done.clone();
        tether.spawn(move |msg: u32| async move {
            let _guard = guard;
            let _ = done.send(msg);
        })
    }

    fn deliver(&self, worker: &mut Worker<u32>, msg: u32) -> Result<(), DeliverError> {
        if Some(msg) == self.poison {
            return Err(DeliverError::Gone);
        }
        worker.dispatch(msg)
    }

    fn name(&self) -> &str {
        "test-factory"
    }
}

struct Harness {
    fount: Fount<TestFactory>,
    handle: FountHandle<u32>,
    spawned: Arc<AtomicUsize>,
    alive: Arc<AtomicUsize>,
    done: mpsc::UnboundedReceiver<u32>,
}

fn harness(spawn_delay: Duration, poison: Option<u32>) -> Harness {
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let spawned = Arc::new(AtomicUsize::new(0));
    let alive = Arc::new(AtomicUsize::new(0));

    let factory = TestFactory {
        spawn_delay,
        spawned: Arc::clone(&spawned),
        alive: Arc::clone(&alive),
        done: done_tx,
        poison,
    };
    let fount = Fount::new(factory, FountConfig::default()).expect("valid default config");
    let handle = fount.handle();

    Harness {
        fount,
        handle,
        spawned,
        alive,
        done: done_rx,
    }
}

async fn settle_full(handle: &FountHandle<u32>) {
    timeout(Duration::from_secs(5), async {
        loop {
            let status = handle.status().await.expect("status");
            if status.state == StateLabel::Full {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("reservoir did not settle full");
}

async fn wait_until(what: &str, mut probe: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !probe() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn cold_start_settles_full() {
    let h = harness(Duration::from_millis(2), None);

    // The first status round-trip beats the first slab delivery.
    let status = h.handle.status().await.expect("status");
    assert_eq!(status.state, StateLabel::Empty);
    assert_eq!(status.worker_count, 0);

    settle_full(&h.handle).await;
    let status = h.handle.status().await.expect("status");
    assert_eq!(status.state, StateLabel::Full);
    assert_eq!(status.worker_count, 50);
    assert_eq!(status.fount_count, 10);
    assert_eq!(status.num_slabs, 4);
    assert_eq!(status.slab_size, 10);
    assert_eq!(status.depth, 5);
    assert_eq!(status.max_workers, 50);
    assert_eq!(status.factory, "test-factory");
}

#[tokio::test]
async fn single_dispense_unlinks_the_worker() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let worker = h.handle.get_one().await.expect("reply").expect("served");
    assert!(!worker.is_linked());

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.worker_count, 49);
    assert_eq!(status.state, StateLabel::Low);
}

#[tokio::test]
async fn exact_slab_dispense() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let workers = h.handle.get_many(10).await.expect("reply");
    assert_eq!(workers.len(), 10);
    assert!(workers.iter().all(|w| !w.is_linked()));

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.worker_count, 40);
    assert_eq!(status.state, StateLabel::Low);
}

#[tokio::test]
async fn cross_boundary_dispense() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let workers = h.handle.get_many(25).await.expect("reply");
    assert_eq!(workers.len(), 25);

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.worker_count, 25);
    assert_eq!(status.state, StateLabel::Low);
}

#[tokio::test]
async fn drain_refuses_then_refills_to_exactly_capacity() {
    let h = harness(Duration::from_millis(2), None);
    settle_full(&h.handle).await;

    let workers = h.handle.get_many(50).await.expect("reply");
    assert_eq!(workers.len(), 50);

    // Replacements are still spawning: over-demand is refused, and the
    // refusal itself must not spawn anything extra.
    let refused = h.handle.get_many(1).await.expect("reply");
    assert!(refused.is_empty());

    settle_full(&h.handle).await;
    let status = h.handle.status().await.expect("status");
    assert_eq!(status.worker_count, 50);
    assert_eq!(h.spawned.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn over_capacity_request_is_refused() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let refused = h.handle.get_many(51).await.expect("reply");
    assert!(refused.is_empty());

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.state, StateLabel::Full);
    assert_eq!(status.worker_count, 50);
}

#[tokio::test]
async fn zero_request_is_served_empty() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let workers = h.handle.get_many(0).await.expect("reply");
    assert!(workers.is_empty());

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.state, StateLabel::Full);
    assert_eq!(status.worker_count, 50);
}

#[tokio::test]
async fn task_many_runs_every_job() {
    let mut h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let sent = h.handle.task_many(vec![7, 8, 9]).await.expect("reply");
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|slot| slot.is_ok()));

    let mut jobs = Vec::new();
    for _ in 0..3 {
        let msg = timeout(Duration::from_secs(1), h.done.recv())
            .await
            .expect("job ran")
            .expect("collector open");
        jobs.push(msg);
    }
    jobs.sort_unstable();
    assert_eq!(jobs, vec![7, 8, 9]);
}

#[tokio::test]
async fn task_batch_is_refused_whole_when_underfilled() {
    // Slabs take ~half a second to fill; the reservoir is still empty.
    let h = harness(Duration::from_millis(50), None);

    let sent = h.handle.task_many(vec![1, 2, 3]).await.expect("reply");
    assert!(sent.is_empty());
}

#[tokio::test]
async fn failed_delivery_poisons_only_its_slot() {
    let mut h = harness(Duration::from_millis(1), Some(2));
    settle_full(&h.handle).await;

    let sent = h.handle.task_many(vec![1, 2, 3]).await.expect("reply");
    assert_eq!(sent.len(), 3);
    assert!(sent[0].is_ok());
    assert!(matches!(sent[1], Err(DeliverError::Gone)));
    assert!(sent[2].is_ok());

    let mut jobs = Vec::new();
    for _ in 0..2 {
        let msg = timeout(Duration::from_secs(1), h.done.recv())
            .await
            .expect("job ran")
            .expect("collector open");
        jobs.push(msg);
    }
    jobs.sort_unstable();
    assert_eq!(jobs, vec![1, 3]);
}

#[tokio::test]
async fn resident_workers_die_with_the_core() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;
    assert_eq!(h.alive.load(Ordering::SeqCst), 50);

    h.fount.shutdown().await.expect("clean shutdown");

    let alive = Arc::clone(&h.alive);
    wait_until("idle workers to exit", move || {
        alive.load(Ordering::SeqCst) == 0
    })
    .await;

    // Nothing ever ran a job.
    let mut done = h.done;
    assert!(done.try_recv().is_err());
}

#[tokio::test]
async fn dispensed_worker_outlives_the_core() {
    let mut h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let mut worker = h.handle.get_one().await.expect("reply").expect("served");
    h.fount.shutdown().await.expect("clean shutdown");

    let alive = Arc::clone(&h.alive);
    wait_until("idle workers to exit", move || {
        alive.load(Ordering::SeqCst) == 1
    })
    .await;

    worker.dispatch(41).expect("independent worker accepts its job");
    let msg = timeout(Duration::from_secs(1), h.done.recv())
        .await
        .expect("job ran")
        .expect("collector open");
    assert_eq!(msg, 41);
}

#[tokio::test]
async fn dispatch_is_one_shot() {
    let h = harness(Duration::from_millis(1), None);
    settle_full(&h.handle).await;

    let mut worker = h.handle.get_one().await.expect("reply").expect("served");
    worker.dispatch(1).expect("first job");
    assert_eq!(worker.dispatch(2), Err(DeliverError::Occupied));
}

#[tokio::test]
async fn facade_times_out_without_killing_the_core() {
    let mut config = FountConfig::default();
    config.reply_timeout = Duration::ZERO;

    let (done_tx, _done_rx) = mpsc::unbounded_channel();
    let factory = TestFactory {
        spawn_delay: Duration::from_millis(1),
        spawned: Arc::new(AtomicUsize::new(0)),
        alive: Arc::new(AtomicUsize::new(0)),
        done: done_tx,
        poison: None,
    };
    let fount = Fount::new(factory, config).expect("valid config");
    let handle = fount.handle();

    let err = handle.status().await.expect_err("zero timeout elapses");
    assert!(matches!(err, FountError::ReplyTimeout { .. }));

    // The core serviced the request anyway and keeps running.
    fount.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn spawn_rates_reflect_held_inventory() {
    let h = harness(Duration::from_millis(2), None);
    settle_full(&h.handle).await;

    let per_slab = h.handle.spawn_rate_per_slab().await.expect("reply");
    let per_worker = h.handle.spawn_rate_per_process().await.expect("reply");
    // Ten sequential 2ms spawns per slab.
    assert!(per_slab >= 20_000.0, "per_slab = {per_slab}");
    assert!(per_worker >= 2_000.0, "per_worker = {per_worker}");
    assert!(per_slab > per_worker);
}

#[tokio::test]
async fn subscribers_observe_the_lifecycle() {
    struct Recorder {
        kinds: mpsc::UnboundedSender<EventKind>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            let _ = self.kinds.send(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    let (kinds_tx, mut kinds_rx) = mpsc::unbounded_channel();
    let (done_tx, _done_rx) = mpsc::unbounded_channel();
    let factory = TestFactory {
        spawn_delay: Duration::from_millis(1),
        spawned: Arc::new(AtomicUsize::new(0)),
        alive: Arc::new(AtomicUsize::new(0)),
        done: done_tx,
        poison: None,
    };

    let fount = Fount::with_subscribers(
        factory,
        FountConfig::default(),
        vec![Arc::new(Recorder { kinds: kinds_tx })],
    )
    .expect("valid config");
    let handle = fount.handle();

    settle_full(&handle).await;
    let _ = handle.get_many(10).await.expect("reply");
    sleep(Duration::from_millis(20)).await;

    let mut seen = Vec::new();
    while let Ok(kind) = kinds_rx.try_recv() {
        seen.push(kind);
    }
    assert!(seen.contains(&EventKind::AllocatorSpawned));
    assert!(seen.contains(&EventKind::SlabDelivered));
    assert!(seen.contains(&EventKind::StateChanged));
    assert!(seen.contains(&EventKind::Dispensed));
}

#[tokio::test]
async fn registry_round_trip() {
    let h = harness(Duration::from_millis(1), None);
    let registry: Registry<u32> = Registry::new();

    registry.register("mailers", h.handle.clone()).expect("free name");
    let err = registry
        .register("mailers", h.handle.clone())
        .expect_err("duplicate name");
    assert_eq!(
        err,
        taskfount::RegistryError::NameTaken {
            name: "mailers".to_string()
        }
    );

    let shared = registry.lookup("mailers").expect("registered");
    let status = shared.status().await.expect("reachable through registry");
    assert_eq!(status.depth, 5);
    assert_eq!(registry.names(), vec!["mailers".to_string()]);

    registry.deregister("mailers").expect("registered");
    assert!(registry.lookup("mailers").is_none());
    assert!(registry.deregister("mailers").is_err());
}

#[tokio::test]
async fn geometry_is_validated_at_construction() {
    let mut config = FountConfig::default();
    config.depth = 1;

    let factory = FnFactory::new("noop", |_msg: u32| async move {});
    let err = match Fount::new(factory, config) {
        Err(err) => err,
        Ok(_) => panic!("depth below minimum must be rejected"),
    };
    assert!(matches!(err, FountError::InvalidConfig { .. }));
}
