mod common;

use common::{counter_builder, counter_store, recorder, Counter, CounterAction};
use std::time::Duration;
use unistate::config::StoreConfig;
use unistate::store::{Middleware, MiddlewareContext, Next, Scope, StoreError};

#[tokio::test]
async fn stream_yields_every_state_in_order() {
    let store = counter_store();
    store.dispatch(CounterAction::Add(1)).unwrap();
    let mut stream = store.stream().unwrap();

    for _ in 0..3 {
        store.dispatch(CounterAction::Add(1)).unwrap();
    }

    let mut values = Vec::new();
    for _ in 0..4 {
        values.push(stream.next().await.unwrap().value);
    }
    assert_eq!(values, vec![1, 2, 3, 4]);
    assert!(stream.try_next().is_none());
}

#[tokio::test]
async fn stream_ends_when_store_is_disposed() {
    let store = counter_store();
    let mut stream = store.stream().unwrap();
    assert_eq!(stream.next().await.unwrap().value, 0);

    store.dispose();
    let end = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("stream should end");
    assert!(end.is_none());
}

#[tokio::test]
async fn dropping_the_stream_unsubscribes() {
    let store = counter_store();
    let stream = store.stream().unwrap();
    assert_eq!(store.subscription_count(), 1);
    drop(stream);
    assert_eq!(store.subscription_count(), 0);
}

#[tokio::test]
async fn watch_sees_latest_state() {
    let store = counter_store();
    let mut watch = store.watch();
    assert_eq!(watch.borrow().value, 0);

    store.dispatch(CounterAction::Add(1)).unwrap();
    store.dispatch(CounterAction::Add(1)).unwrap();
    watch.changed().await.unwrap();
    assert_eq!(watch.borrow_and_update().value, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_dispatcher_preserves_submission_order() {
    let store = counter_store();
    let dispatcher = store.spawn_dispatcher();

    for n in 1..=50 {
        dispatcher.post(CounterAction::Add(n)).await.unwrap();
    }
    let state = dispatcher.dispatch(CounterAction::Add(0)).await.unwrap();

    let mut expected: Vec<i64> = (1..=50).collect();
    expected.push(0);
    assert_eq!(state.history, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_dispatch_still_commits() {
    let store = counter_store();
    let dispatcher = store.spawn_dispatcher();

    // The first poll hands the action to the mailbox; the caller then
    // gives up before the reply arrives.
    let abandoned = dispatcher.dispatch(CounterAction::Add(7));
    let _ = tokio::time::timeout(Duration::ZERO, abandoned).await;

    // A later dispatch is queued behind it, so it sees its effect.
    let state = dispatcher.dispatch(CounterAction::Add(1)).await.unwrap();
    assert_eq!(state.history, vec![7, 1]);
}

#[tokio::test]
async fn async_dispatch_reports_reducer_failure() {
    let store = counter_store();
    let dispatcher = store.spawn_dispatcher();
    assert!(matches!(
        dispatcher.dispatch(CounterAction::Explode).await,
        Err(StoreError::ReducerFailure { .. })
    ));
    assert_eq!(dispatcher.dispatch(CounterAction::Add(2)).await.unwrap().value, 2);
}

#[tokio::test]
async fn dispatcher_closes_after_dispose() {
    let store = counter_builder()
        .with_config(StoreConfig {
            dispatcher_buffer: 1,
            ..StoreConfig::default()
        })
        .build();
    let dispatcher = store.spawn_dispatcher();
    store.dispose();

    assert!(matches!(
        dispatcher.dispatch(CounterAction::Add(1)).await,
        Err(StoreError::Disposed { .. })
    ));
    tokio::time::timeout(Duration::from_secs(1), async {
        while !dispatcher.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("worker should stop");
    assert!(matches!(
        dispatcher.dispatch(CounterAction::Add(1)).await,
        Err(StoreError::DispatcherClosed { .. })
    ));
}

#[tokio::test]
async fn scope_close_unsubscribes_bound_observers() {
    let store = counter_store();
    let scope = Scope::new();
    let (seen, observer) = recorder::<Counter>();
    store.subscribe_scoped(&scope, observer).unwrap();

    let (child_seen, observer) = recorder::<Counter>();
    store.subscribe(observer).unwrap().bind_to(&scope.child());

    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(store.subscription_count(), 2);

    let waiter = {
        let scope = scope.clone();
        tokio::spawn(async move { scope.closed().await })
    };
    scope.close();
    waiter.await.unwrap();

    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(store.subscription_count(), 0);
    assert_eq!(seen.lock().len(), 2);
    assert_eq!(child_seen.lock().len(), 2);
}

#[tokio::test]
async fn binding_to_closed_scope_unsubscribes_immediately() {
    let store = counter_store();
    let scope = Scope::new();
    scope.close();
    let (seen, observer) = recorder::<Counter>();
    store.subscribe_scoped(&scope, observer).unwrap();

    store.dispatch(CounterAction::Add(1)).unwrap();
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(store.subscription_count(), 0);
}

/// Panics on every `Noop`.
struct PanicOnNoop;

impl Middleware<Counter, CounterAction> for PanicOnNoop {
    fn handle(
        &self,
        ctx: &mut MiddlewareContext<'_, Counter, CounterAction>,
        next: Next<'_, Counter, CounterAction>,
        action: CounterAction,
    ) -> Result<(), StoreError> {
        if action == CounterAction::Noop {
            panic!("noop rejected");
        }
        next.run(ctx, action)
    }
}

#[tokio::test]
async fn dispatcher_survives_a_panicking_middleware() {
    let store = counter_builder().with_middleware(PanicOnNoop).build();
    let dispatcher = store.spawn_dispatcher();

    dispatcher.post(CounterAction::Noop).await.unwrap();
    let state = dispatcher.dispatch(CounterAction::Add(2)).await.unwrap();
    assert_eq!(state.value, 2);
    assert!(!dispatcher.is_closed());

    let err = dispatcher.dispatch(CounterAction::Noop).await.unwrap_err();
    assert!(matches!(err, StoreError::MiddlewareFailure { .. }), "{:?}", err);
    assert_eq!(store.state().value, 2);
}
