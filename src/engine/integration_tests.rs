//! End-to-end scenarios exercising whole graphs through the executor.

use crate::codec::ReadState;
use crate::config::ExecutorOptions;
use crate::engine::Executor;
use crate::errors::{ConfigError, ExecutionError, FailurePolicy};
use crate::graph::Graph;
use crate::runtime::{InputStream, Signal, Vertex};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

#[derive(Default)]
struct Tally {
    value: i64,
    count: usize,
}

#[tokio::test]
async fn reduce_sum_over_three_workers() {
    const WORKERS: usize = 3;
    let result = Arc::new(AtomicI64::new(0));

    let mut graph = Graph::new();
    let master = graph.vertex();
    let mut workers = Vec::new();
    let mut to_worker = Vec::new();
    let mut to_master = Vec::new();
    for _ in 0..WORKERS {
        let worker = graph.vertex();
        to_worker.push(graph.stream(&master, &worker));
        to_master.push(graph.stream(&worker, &master));
        workers.push(worker);
    }

    master.on({
        let to_worker = to_worker.clone();
        move |v: &mut Vertex| {
            v.set_state(Tally::default());
            let ones = vec![1i64; 1024];
            for stream in &to_worker {
                v.ostream(stream).send(&ones);
            }
        }
    });

    for i in 0..WORKERS {
        let reply = to_master[i].clone();
        to_worker[i].on(move |w: &mut Vertex, is: &mut InputStream| {
            match is.read::<Vec<i64>>() {
                ReadState::Ready(batch) => {
                    let sum: i64 = batch.iter().sum();
                    w.ostream(&reply).send(&sum);
                    Signal::Remove
                }
                ReadState::Pending => Signal::Continue,
                ReadState::Closed | ReadState::Corrupt(_) => Signal::Remove,
            }
        });

        let result = result.clone();
        to_master[i].on(move |m: &mut Vertex, is: &mut InputStream| match is.read::<i64>() {
            ReadState::Ready(part) => {
                let tally = m.state_mut::<Tally>();
                tally.value += part;
                tally.count += 1;
                if tally.count == WORKERS {
                    result.store(tally.value, Ordering::SeqCst);
                }
                Signal::Remove
            }
            ReadState::Pending => Signal::Continue,
            ReadState::Closed | ReadState::Corrupt(_) => Signal::Remove,
        });
    }

    graph.container().add(&master).cpu(1);
    for worker in &workers {
        graph.container().add(worker).cpu(1);
    }

    let report = Executor::new(graph).unwrap().run().await.unwrap();

    assert_eq!(result.load(Ordering::SeqCst), 3072);
    assert!(report.failed.is_empty());
    assert_eq!(report.vertices, WORKERS + 1);
    assert_eq!(report.frames_delivered, (WORKERS * 2) as u64);
}

#[tokio::test]
async fn values_arrive_in_send_order_exactly_once() {
    const COUNT: i64 = 100;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut graph = Graph::new();
    let producer = graph.vertex();
    let consumer = graph.vertex();
    let stream = graph.stream(&producer, &consumer);

    producer.on({
        let stream = stream.clone();
        move |v: &mut Vertex| {
            for n in 0..COUNT {
                v.ostream(&stream).send(&n);
            }
        }
    });

    stream.on({
        let seen = seen.clone();
        move |_: &mut Vertex, is: &mut InputStream| loop {
            match is.read::<i64>() {
                ReadState::Ready(n) => seen.lock().unwrap().push(n),
                ReadState::Pending => return Signal::Continue,
                ReadState::Closed | ReadState::Corrupt(_) => return Signal::Remove,
            }
        }
    });

    graph.container().add(&producer).add(&consumer).cpu(2);
    Executor::new(graph).unwrap().run().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), COUNT as usize);
    assert!(seen.iter().copied().eq(0..COUNT));
}

#[tokio::test]
async fn tiny_mailbox_suspends_senders_without_dropping() {
    const COUNT: i64 = 50;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut graph = Graph::new();
    let producer = graph.vertex();
    let consumer = graph.vertex();
    let stream = graph.stream(&producer, &consumer);

    producer.on({
        let stream = stream.clone();
        move |v: &mut Vertex| {
            for n in 0..COUNT {
                v.ostream(&stream).send(&n);
            }
        }
    });

    stream.on({
        let seen = seen.clone();
        move |_: &mut Vertex, is: &mut InputStream| loop {
            match is.read::<i64>() {
                ReadState::Ready(n) => seen.lock().unwrap().push(n),
                ReadState::Pending => return Signal::Continue,
                ReadState::Closed | ReadState::Corrupt(_) => return Signal::Remove,
            }
        }
    });

    graph.container().add(&producer).add(&consumer).cpu(2);
    let options = ExecutorOptions {
        channel_capacity: Some(1),
        ..Default::default()
    };
    let run = Executor::with_options(graph, options).unwrap().run();
    timeout(Duration::from_secs(5), run)
        .await
        .expect("backpressured graph failed to drain")
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), COUNT as usize);
    assert!(seen.iter().copied().eq(0..COUNT));
}

#[tokio::test]
async fn interleaved_streams_mutate_unsynchronized_state_safely() {
    const PER_STREAM: usize = 500;
    let total = Arc::new(AtomicI64::new(0));

    let mut graph = Graph::new();
    let left = graph.vertex();
    let right = graph.vertex();
    let sink = graph.vertex();
    let from_left = graph.stream(&left, &sink);
    let from_right = graph.stream(&right, &sink);

    for (source, stream) in [(&left, &from_left), (&right, &from_right)] {
        let stream = stream.clone();
        source.on(move |v: &mut Vertex| {
            for _ in 0..PER_STREAM {
                v.ostream(&stream).send(&1i64);
            }
        });
    }

    sink.on(|v: &mut Vertex| v.set_state(0i64));
    for stream in [&from_left, &from_right] {
        let total = total.clone();
        stream.on(move |v: &mut Vertex, is: &mut InputStream| loop {
            match is.read::<i64>() {
                // plain unsynchronized counter: callbacks of one vertex
                // never overlap, so this is safe by construction
                ReadState::Ready(n) => *v.state_mut::<i64>() += n,
                ReadState::Pending => return Signal::Continue,
                ReadState::Closed | ReadState::Corrupt(_) => {
                    total.store(*v.state_mut::<i64>(), Ordering::SeqCst);
                    return Signal::Remove;
                }
            }
        });
    }

    graph.container().add(&left).add(&right).cpu(2);
    graph.container().add(&sink).cpu(1);
    Executor::new(graph).unwrap().run().await.unwrap();

    assert_eq!(total.load(Ordering::SeqCst), 2 * PER_STREAM as i64);
}

#[tokio::test]
async fn graph_quiesces_once_callbacks_remove() {
    let mut graph = Graph::new();
    let a = graph.vertex();
    let b = graph.vertex();
    let stream = graph.stream(&a, &b);

    a.on({
        let stream = stream.clone();
        move |v: &mut Vertex| v.ostream(&stream).send(&1i64)
    });
    stream.on(|_: &mut Vertex, is: &mut InputStream| match is.read::<i64>() {
        ReadState::Pending => Signal::Continue,
        _ => Signal::Remove,
    });

    graph.container().add(&a).add(&b).cpu(2);
    let run = Executor::new(graph).unwrap().run();
    timeout(Duration::from_secs(5), run)
        .await
        .expect("graph failed to quiesce")
        .unwrap();
}

#[tokio::test]
async fn closed_stream_is_observed_exactly_once() {
    let closes = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let mut graph = Graph::new();
    let worker = graph.vertex();
    let master = graph.vertex();
    let stream = graph.stream(&worker, &master);

    // the worker closes without ever sending a value
    worker.on({
        let stream = stream.clone();
        move |v: &mut Vertex| v.ostream(&stream).close()
    });

    stream.on({
        let closes = closes.clone();
        let invocations = invocations.clone();
        move |_: &mut Vertex, is: &mut InputStream| {
            invocations.fetch_add(1, Ordering::SeqCst);
            match is.read::<i64>() {
                ReadState::Closed => {
                    closes.fetch_add(1, Ordering::SeqCst);
                    // returning Continue here must not earn another
                    // invocation: the close notification is final
                    Signal::Continue
                }
                ReadState::Pending => Signal::Continue,
                ReadState::Ready(_) | ReadState::Corrupt(_) => Signal::Remove,
            }
        }
    });

    graph.container().add(&worker).add(&master).cpu(2);
    Executor::new(graph).unwrap().run().await.unwrap();

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn capacity_violation_fails_before_running() {
    for _ in 0..3 {
        let mut graph = Graph::new();
        let a = graph.vertex();
        let b = graph.vertex();
        graph.stream(&a, &b);
        graph.container().add(&a).add(&b).cpu(1);

        let err = match Executor::new(graph) {
            Ok(_) => panic!("expected startup failure"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            ConfigError::OverCapacity {
                cpus: 1,
                demand: 2,
                ..
            }
        ));
    }
}

#[tokio::test]
async fn forced_shutdown_closes_streams_and_terminates() {
    let closes = Arc::new(AtomicUsize::new(0));

    let mut graph = Graph::new();
    let a = graph.vertex();
    let b = graph.vertex();
    let ab = graph.stream(&a, &b);
    let ba = graph.stream(&b, &a);

    // neither side ever sends: without the shutdown signal this graph
    // would wait forever
    for stream in [&ab, &ba] {
        let closes = closes.clone();
        stream.on(move |_: &mut Vertex, is: &mut InputStream| match is.read::<i64>() {
            ReadState::Ready(_) | ReadState::Pending => Signal::Continue,
            ReadState::Closed => {
                closes.fetch_add(1, Ordering::SeqCst);
                Signal::Remove
            }
            ReadState::Corrupt(_) => Signal::Remove,
        });
    }

    graph.container().add(&a).add(&b).cpu(2);
    let executor = Executor::new(graph).unwrap();
    let token = executor.shutdown_token();

    let run = tokio::spawn(executor.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let report = timeout(Duration::from_secs(5), run)
        .await
        .expect("shutdown did not terminate the graph")
        .unwrap()
        .unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn best_effort_drains_around_a_dead_vertex() {
    let observed_close = Arc::new(AtomicUsize::new(0));

    let mut graph = Graph::new();
    let master = graph.vertex();
    let worker = graph.vertex();
    let request = graph.stream(&master, &worker);
    let reply = graph.stream(&worker, &master);

    master.on({
        let request = request.clone();
        move |v: &mut Vertex| v.ostream(&request).send(&1i64)
    });

    request.on(|_: &mut Vertex, _: &mut InputStream| panic!("worker died"));

    reply.on({
        let observed_close = observed_close.clone();
        move |_: &mut Vertex, is: &mut InputStream| match is.read::<i64>() {
            ReadState::Pending => Signal::Continue,
            ReadState::Closed => {
                observed_close.fetch_add(1, Ordering::SeqCst);
                Signal::Remove
            }
            ReadState::Ready(_) | ReadState::Corrupt(_) => Signal::Remove,
        }
    });

    graph.container().add(&master).add(&worker).cpu(2);
    let options = ExecutorOptions {
        failure_policy: Some(FailurePolicy::BestEffort),
        ..Default::default()
    };
    let run = Executor::with_options(graph, options).unwrap().run();
    let report = timeout(Duration::from_secs(5), run)
        .await
        .expect("graph failed to drain around the dead vertex")
        .unwrap();

    assert_eq!(report.failed, vec![worker.id()]);
    assert_eq!(observed_close.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fail_fast_surfaces_the_panicking_vertex() {
    let mut graph = Graph::new();
    let a = graph.vertex();
    let b = graph.vertex();
    let stream = graph.stream(&a, &b);

    a.on({
        let stream = stream.clone();
        move |v: &mut Vertex| v.ostream(&stream).send(&1i64)
    });
    stream.on(|_: &mut Vertex, _: &mut InputStream| panic!("callback exploded"));

    graph.container().add(&a).add(&b).cpu(2);
    let executor = Executor::new(graph).unwrap();

    let outcome = timeout(Duration::from_secs(5), executor.run())
        .await
        .expect("run did not finish");
    let err = match outcome {
        Ok(_) => panic!("expected the run to fail"),
        Err(e) => e,
    };
    match err {
        ExecutionError::VertexPanicked { vertex, .. } => assert_eq!(vertex, b.id()),
        other => panic!("expected a vertex panic, got {other}"),
    }
}
