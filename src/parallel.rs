/*
Approximate parallel Dijkstra over angular wedges.

One worker per wedge, each with its own queue. A worker settles its cheapest record only while it
is within `elasticity` of the progress of the wedges it watches: its two ring neighbors, or every
other wedge when elasticity is zero. Progress is the smallest distance a wedge still has to settle
and may drop when a cheaper record is handed in.
*/

use parking_lot::Mutex;
use std::hint;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info, warn};

use crate::config::{CancelToken, SolveConfig};
use crate::error::{Error, Result};
use crate::graph::{Graph, VertexId};
use crate::partition::Partition;
use crate::queue::KeyedQueue;
use crate::solution::{Relaxation, Solution};

const IDLE: f64 = f64::INFINITY;
const DEADLINE_CHECK_INTERVAL: u64 = 64;
const CONSISTENT_READ_ATTEMPTS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Active,
    Waiting,
    Idle,
    Done,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub wedge: usize,
    pub accepted: usize,
    pub discarded: usize,
    pub handoffs: usize,
    pub waits: usize,
    pub idle_rounds: usize,
}

pub struct ParallelSolve {
    pub solution: Solution,
    pub partition: Partition,
    pub workers: Vec<WorkerStats>,
    pub elapsed: Duration,
}

// Only written with the wedge lock held.
struct Progress(AtomicU64);

impl Progress {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }
}

type RecordQueue = KeyedQueue<Relaxation, fn(&Relaxation) -> f64>;

struct WedgeState {
    queue: RecordQueue,
    relaxing: Option<f64>,
}

impl WedgeState {
    fn frontier(&self) -> f64 {
        let head = self.queue.peek_key().unwrap_or(IDLE);
        self.relaxing.map_or(head, |d| d.min(head))
    }
}

enum Take {
    Record(Relaxation),
    Blocked,
    Empty,
}

struct Wedge {
    state: Mutex<WedgeState>,
    progress: Progress,
}

impl Wedge {
    fn new() -> Self {
        let key: fn(&Relaxation) -> f64 = Relaxation::distance_key;
        Self {
            state: Mutex::new(WedgeState {
                queue: KeyedQueue::new(key),
                relaxing: None,
            }),
            progress: Progress::new(IDLE),
        }
    }

    fn push(&self, record: Relaxation) {
        let mut state = self.state.lock();
        state.queue.push(record);
        self.progress.store(state.frontier());
    }

    /// Pops the head if its distance is at most `limit` and marks it as being relaxed.
    fn take(&self, limit: f64) -> Take {
        let mut state = self.state.lock();
        match state.queue.peek_key() {
            None => return Take::Empty,
            Some(d) if d > limit => return Take::Blocked,
            Some(_) => {}
        }
        match state.queue.pop() {
            Some(record) => {
                state.relaxing = Some(record.distance);
                self.progress.store(state.frontier());
                Take::Record(record)
            }
            None => Take::Empty,
        }
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.relaxing = None;
        self.progress.store(state.frontier());
    }
}

struct Shared<'a> {
    graph: &'a Graph,
    partition: Partition,
    wedges: Vec<Wedge>,
    solved: Vec<OnceLock<Relaxation>>,
    /// Records queued or being relaxed, across all wedges.
    outstanding: AtomicUsize,
    /// Completed cross-wedge handoffs.
    handoffs: AtomicU64,
    accepted: AtomicUsize,
    elasticity: f64,
    cancel: &'a CancelToken,
    deadline: Option<Instant>,
    aborted: AtomicBool,
}

impl Shared<'_> {
    /// Queues `record` on the wedge owning its vertex. Returns true if that is not `from`.
    fn enqueue(&self, record: Relaxation, from: usize) -> bool {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let owner = self.partition.wedge_of(record.vertex);
        self.wedges[owner].push(record);
        if owner != from {
            self.handoffs.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Wedges whose progress bounds worker `index`. With zero elasticity that is every other
    /// wedge, since a shorter path may come from anywhere on the ring.
    fn watched_by(&self, index: usize) -> Vec<&Wedge> {
        if self.elasticity == 0.0 {
            return (0..self.wedges.len())
                .filter(|&w| w != index)
                .map(|w| &self.wedges[w])
                .collect();
        }
        let (left, right) = self.partition.neighbors(index);
        vec![&self.wedges[left], &self.wedges[right]]
    }
}

// Sets the abort flag if the worker thread unwinds, so the others stop instead of waiting on
// records the dead worker will never settle.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    fn reset(&mut self) {
        self.step = 0;
    }

    fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1 << self.step {
                hint::spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_micros(50));
        }
        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }
}

struct Worker<'s, 'a> {
    index: usize,
    own: &'s Wedge,
    watched: Vec<&'s Wedge>,
    shared: &'s Shared<'a>,
    stats: WorkerStats,
    steps: u64,
}

impl<'s, 'a> Worker<'s, 'a> {
    fn new(shared: &'s Shared<'a>, index: usize) -> Self {
        Self {
            index,
            own: &shared.wedges[index],
            watched: shared.watched_by(index),
            shared,
            stats: WorkerStats {
                wedge: index,
                ..WorkerStats::default()
            },
            steps: 0,
        }
    }

    fn run(mut self) -> Result<WorkerStats> {
        let mut backoff = Backoff::default();
        loop {
            match self.step()? {
                WorkerState::Active => backoff.reset(),
                WorkerState::Waiting => {
                    self.stats.waits += 1;
                    backoff.snooze();
                }
                WorkerState::Idle => {
                    self.stats.idle_rounds += 1;
                    backoff.snooze();
                }
                WorkerState::Done => {
                    debug!(
                        accepted = self.stats.accepted,
                        discarded = self.stats.discarded,
                        handoffs = self.stats.handoffs,
                        waits = self.stats.waits,
                        "wedge finished"
                    );
                    return Ok(self.stats);
                }
            }
        }
    }

    fn step(&mut self) -> Result<WorkerState> {
        self.check_cancelled()?;
        let limit = self.floor() + self.shared.elasticity;
        match self.own.take(limit) {
            Take::Record(record) => {
                self.relax(record);
                self.own.finish();
                self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                Ok(WorkerState::Active)
            }
            Take::Blocked => Ok(WorkerState::Waiting),
            Take::Empty if self.shared.outstanding.load(Ordering::SeqCst) == 0 => {
                Ok(WorkerState::Done)
            }
            Take::Empty => Ok(WorkerState::Idle),
        }
    }

    /// Slowest progress among the watched wedges. A handoff landing between two reads may move
    /// a record from an unread wedge to a read one unseen, so such reads are retried. If no
    /// attempt is clean the step is treated as blocked.
    fn floor(&self) -> f64 {
        for _ in 0..CONSISTENT_READ_ATTEMPTS {
            let before = self.shared.handoffs.load(Ordering::SeqCst);
            let read = self
                .watched
                .iter()
                .map(|w| w.progress.load())
                .fold(IDLE, f64::min);
            if self.shared.handoffs.load(Ordering::SeqCst) == before {
                return read;
            }
        }
        f64::NEG_INFINITY
    }

    fn relax(&mut self, record: Relaxation) {
        let shared = self.shared;
        if shared.solved[record.vertex].set(record).is_err() {
            self.stats.discarded += 1;
            return;
        }
        shared.accepted.fetch_add(1, Ordering::Relaxed);
        self.stats.accepted += 1;
        for edge in shared.graph.outgoing(record.vertex) {
            if shared.solved[edge.end].get().is_some() {
                continue;
            }
            if shared.enqueue(Relaxation::along(edge, record.distance), self.index) {
                self.stats.handoffs += 1;
            }
        }
    }

    fn check_cancelled(&mut self) -> Result<()> {
        let shared = self.shared;
        let check_deadline = self.steps % DEADLINE_CHECK_INTERVAL == 0;
        self.steps += 1;
        let expired = check_deadline && shared.deadline.is_some_and(|d| Instant::now() >= d);
        if expired || shared.cancel.is_cancelled() || shared.aborted.load(Ordering::SeqCst) {
            shared.aborted.store(true, Ordering::SeqCst);
            return Err(Error::Cancelled {
                accepted: shared.accepted.load(Ordering::SeqCst),
            });
        }
        Ok(())
    }
}

/// Parallel shortest paths from `source` with `config.wedges` worker threads.
pub fn shortest_paths(graph: &Graph, source: VertexId, config: &SolveConfig) -> Result<ParallelSolve> {
    shortest_paths_with_cancel(graph, source, config, &CancelToken::new())
}

/// Like [`shortest_paths`], but gives up with `Error::Cancelled` once `cancel` fires.
pub fn shortest_paths_with_cancel(
    graph: &Graph,
    source: VertexId,
    config: &SolveConfig,
    cancel: &CancelToken,
) -> Result<ParallelSolve> {
    config.validate()?;
    graph.check_vertex(source)?;
    graph.validate()?;

    let started = Instant::now();
    let partition = Partition::angular(graph, source, config.wedges)?;
    let wedges = partition.wedges();
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        wedges,
        elasticity = config.elasticity,
        "starting parallel solve"
    );

    let seed_owner = partition.wedge_of(source);
    let shared = Shared {
        graph,
        partition,
        wedges: (0..wedges).map(|_| Wedge::new()).collect(),
        solved: (0..graph.vertex_count()).map(|_| OnceLock::new()).collect(),
        outstanding: AtomicUsize::new(0),
        handoffs: AtomicU64::new(0),
        accepted: AtomicUsize::new(0),
        elasticity: config.elasticity,
        cancel,
        deadline: config.timeout.map(|t| started + t),
        aborted: AtomicBool::new(false),
    };
    shared.enqueue(Relaxation::seed(source), seed_owner);

    let results: Vec<Result<WorkerStats>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..wedges)
            .map(|index| {
                let worker = Worker::new(&shared, index);
                let aborted = &shared.aborted;
                scope.spawn(move || {
                    let _abort = AbortOnPanic(aborted);
                    let span = debug_span!("wedge", index);
                    let _enter = span.enter();
                    worker.run()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|p| panic::resume_unwind(p)))
            .collect()
    });

    let workers = match results.into_iter().collect::<Result<Vec<_>>>() {
        Ok(workers) => workers,
        Err(err) => {
            warn!(%err, "parallel solve aborted");
            return Err(err);
        }
    };

    let Shared {
        solved, partition, ..
    } = shared;
    let solution = Solution::new(source, solved.into_iter().map(OnceLock::into_inner).collect());
    let elapsed = started.elapsed();
    info!(
        solved = solution.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "parallel solve finished"
    );
    Ok(ParallelSolve {
        solution,
        partition,
        workers,
        elapsed,
    })
}
