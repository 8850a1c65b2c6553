// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reduce-sum demo: one master distributes a block of ones to three
//! workers, each worker sends back its partial sum, and the master prints
//! the total once every worker has reported.

use the_millrace::codec::ReadState;
use the_millrace::engine::Executor;
use the_millrace::graph::Graph;
use the_millrace::runtime::{InputStream, Signal, Vertex};
use tracing_subscriber::EnvFilter;

const NUM_WORKERS: usize = 3;
const BLOCK_LEN: usize = 1024;

#[derive(Default)]
struct Storage {
    value: i64,
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut graph = Graph::new();

    let master = graph.vertex();
    let mut workers = Vec::new();
    let mut m2w = Vec::new();
    let mut w2m = Vec::new();
    for _ in 0..NUM_WORKERS {
        let worker = graph.vertex();
        m2w.push(graph.stream(&master, &worker));
        w2m.push(graph.stream(&worker, &master));
        workers.push(worker);
    }

    // Master sends the data to the workers.
    master.on({
        let m2w = m2w.clone();
        move |v: &mut Vertex| {
            v.set_state(Storage::default());
            let block = vec![1i64; BLOCK_LEN];
            for stream in &m2w {
                v.ostream(stream).send(&block);
            }
        }
    });

    // Stream: master to worker.
    for i in 0..NUM_WORKERS {
        let reply = w2m[i].clone();
        m2w[i].on(move |worker: &mut Vertex, is: &mut InputStream| {
            match is.read::<Vec<i64>>() {
                ReadState::Ready(block) => {
                    let partial: i64 = block.iter().sum();
                    worker.ostream(&reply).send(&partial);
                    Signal::Remove
                }
                ReadState::Pending => Signal::Continue,
                ReadState::Closed | ReadState::Corrupt(_) => Signal::Remove,
            }
        });
    }

    // Stream: worker to master.
    for stream in &w2m {
        stream.on(|master: &mut Vertex, is: &mut InputStream| match is.read::<i64>() {
            ReadState::Ready(partial) => {
                let storage = master.state_mut::<Storage>();
                storage.value += partial;
                storage.count += 1;
                if storage.count == NUM_WORKERS {
                    println!("reduce sum: {}", storage.value);
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

    let report = Executor::new(graph)?.run().await?;
    tracing::info!(
        vertices = report.vertices,
        frames = report.frames_delivered,
        duration_ms = report.duration.as_millis() as u64,
        "graph terminated"
    );
    Ok(())
}
