//! # Deferred Delivery on Tokio
//!
//! `trigger_async` and once-timeouts running on a real tokio runtime,
//! including the process-wide default dispatcher. Deferred work only runs
//! on the scheduling thread's current-thread runtime.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pubsub::{main_dispatcher, DispatchError, Dispatcher, Event, Trigger};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Forward every delivered event into a channel.
    fn forward(bus: &Dispatcher, spec: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        bus.subscribe_fn(spec, move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    #[tokio::test]
    async fn test_trigger_async_not_delivered_synchronously() {
        let bus = Dispatcher::new("deferred");
        let delivered = Arc::new(AtomicUsize::new(0));
        let d = delivered.clone();
        bus.subscribe_fn("job:done", move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });
        let mut rx = forward(&bus, "job:done");

        bus.trigger_async("worker", Trigger::combined("job:done", 7))
            .unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(event.origin(), "worker");
        assert_eq!(event.data(), &json!(7));
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_async_waits_for_sync_code_to_finish() {
        let bus = Dispatcher::new("run-to-completion");
        let delivered = Arc::new(AtomicUsize::new(0));
        let d = delivered.clone();
        bus.subscribe_fn("t:v", move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        bus.trigger_async("s", Trigger::combined("t:v", ())).unwrap();
        // Blocking keeps this task on the stack; nothing else may run meanwhile.
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        tokio::task::yield_now().await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_trigger_async_refused_on_multi_thread() {
        let bus = Dispatcher::new("multi-thread");
        let delivered = Arc::new(AtomicUsize::new(0));
        let d = delivered.clone();
        bus.subscribe_fn("t:v", move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        let err = bus
            .trigger_async("s", Trigger::combined("t:v", ()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::SchedulerUnavailable(_)));

        let err = bus
            .subscribe_once("t:v", |_| false, Some(Duration::from_millis(10)))
            .unwrap_err();
        assert!(matches!(err, DispatchError::SchedulerUnavailable(_)));
        assert_eq!(bus.subscriber_count("t:v"), 1);

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trigger_async_fifo() {
        let bus = Dispatcher::new("fifo");
        let mut rx = forward(&bus, "seq");

        for n in 0..50 {
            bus.trigger_async("s", Trigger::split("seq", "next", n))
                .unwrap();
        }

        for n in 0..50 {
            let event = timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timeout")
                .expect("event");
            assert_eq!(event.data(), &json!(n));
        }
    }

    #[test]
    fn test_trigger_async_stays_on_each_callers_thread() {
        let bus = Dispatcher::new("per-thread");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        bus.subscribe_fn("t:v", move |_| {
            s.lock().push(std::thread::current().id());
        });

        std::thread::scope(|scope| {
            for _ in 0..2 {
                let bus = bus.clone();
                scope.spawn(move || {
                    let rt = tokio::runtime::Builder::new_current_thread()
                        .build()
                        .unwrap();
                    rt.block_on(async {
                        bus.trigger_async("s", Trigger::combined("t:v", ()))
                            .unwrap();
                        tokio::task::yield_now().await;
                    });
                });
            }
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_timeout_removes_subscription() {
        let bus = Dispatcher::new("once-timeout");
        let fired = Arc::new(Mutex::new(false));
        let f = fired.clone();

        bus.subscribe_once(
            "reply:ok",
            move |_| {
                *f.lock() = true;
                false
            },
            Some(Duration::from_millis(100)),
        )
        .unwrap();
        assert_eq!(bus.subscriber_count("reply:ok"), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(bus.subscriber_count("reply:ok"), 0);

        bus.publish("svc", "reply", "ok", ()).unwrap();
        assert!(!*fired.lock());
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_fired_before_timeout() {
        let bus = Dispatcher::new("once-fired");
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        bus.subscribe_once(
            "reply:ok",
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                false
            },
            Some(Duration::from_millis(100)),
        )
        .unwrap();

        bus.publish("svc", "reply", "ok", ()).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        bus.publish("svc", "reply", "ok", ()).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_main_dispatcher_round_trip() {
        let bus = main_dispatcher();
        assert_eq!(bus.name(), "Main Dispatcher");

        let mut rx = forward(bus, "integration-main:ping");
        bus.trigger_async("test", Trigger::combined("integration-main:ping", "hi"))
            .unwrap();

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(event.data(), &json!("hi"));
    }
}
