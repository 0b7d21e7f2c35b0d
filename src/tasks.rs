// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Background Tasks
//!
//! Fire-and-forget side effects of registration and client creation.
//!
//! ## Strategy
//!
//! Jobs go into a bounded channel drained by a small fixed pool of workers.
//! A full queue drops the job with a warning instead of blocking the request.
//! Failed jobs are logged and never retried, and nothing survives a restart.
//!
//! ## Shutdown
//!
//! Workers stop when the `CancellationToken` passed to [`TaskQueue::start`]
//! is cancelled. Jobs still queued at that point are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Clock;
use crate::metrics::{projection::current_age, AgeSummary};
use crate::storage::{Database, StorageError};

/// Maximum number of queued jobs.
pub const QUEUE_CAPACITY: usize = 50;

/// Number of worker tasks.
pub const WORKER_COUNT: usize = 2;

/// Work deferred until after the response is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Send the welcome notification for a new account.
    WelcomeUser { user_id: u64, username: String, email: String },
    /// Notify, summarize and refresh statistics for a new client.
    ProcessNewClient { client_id: u64 },
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Job::WelcomeUser { .. } => "welcome_user",
            Job::ProcessNewClient { .. } => "process_new_client",
        }
    }
}

/// Coarse age cohort used in client summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    GenZ,
    Millennial,
    GenX,
    BoomerPlus,
}

impl Generation {
    /// Cohort by birth year: `today.year() - birth_date.year()` ignores
    /// whether the birthday has passed.
    pub fn of(birth_date: NaiveDate, today: NaiveDate) -> Self {
        Self::from_age(today.year() - birth_date.year())
    }

    pub fn from_age(age: i32) -> Self {
        match age {
            18..=28 => Generation::GenZ,
            29..=43 => Generation::Millennial,
            44..=58 => Generation::GenX,
            _ => Generation::BoomerPlus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Generation::GenZ => "Gen-Z",
            Generation::Millennial => "Millennial",
            Generation::GenX => "Gen-X",
            Generation::BoomerPlus => "Boomer+",
        }
    }
}

/// Job outcome counters.
#[derive(Debug, Default)]
pub struct TaskStats {
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl TaskStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Handle used by request handlers to enqueue jobs.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<Job>,
    stats: Arc<TaskStats>,
}

impl TaskQueue {
    /// Spawn the worker pool and return the queue handle with the worker
    /// join handles.
    pub fn start(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(TaskStats::default());

        let workers = (0..WORKER_COUNT)
            .map(|id| {
                let worker = Worker {
                    id,
                    db: db.clone(),
                    clock: clock.clone(),
                    stats: stats.clone(),
                };
                tokio::spawn(worker.run(receiver.clone(), shutdown.clone()))
            })
            .collect();

        info!(workers = WORKER_COUNT, capacity = QUEUE_CAPACITY, "task queue started");
        (Self { sender, stats }, workers)
    }

    /// Queue a job without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, job: Job) -> bool {
        let name = job.name();
        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(job = name, "job queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job = name, "task queue full, dropping job");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(job = name, "task queue closed, dropping job");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }
}

struct Worker {
    id: usize,
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    stats: Arc<TaskStats>,
}

impl Worker {
    async fn run(self, receiver: Arc<Mutex<mpsc::Receiver<Job>>>, shutdown: CancellationToken) {
        loop {
            let job = tokio::select! {
                job = async { receiver.lock().await.recv().await } => job,
                _ = shutdown.cancelled() => {
                    debug!(worker = self.id, "task worker shutting down");
                    return;
                }
            };

            let Some(job) = job else {
                debug!(worker = self.id, "task queue closed");
                return;
            };

            let name = job.name();
            match self.execute(job) {
                Ok(()) => {
                    self.stats.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(worker = self.id, job = name, error = %e, "background job failed");
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn execute(&self, job: Job) -> Result<(), StorageError> {
        match job {
            Job::WelcomeUser {
                user_id,
                username,
                email,
            } => {
                info!(user_id, username = %username, email = %email, "welcome notification sent");
                Ok(())
            }
            Job::ProcessNewClient { client_id } => self.process_new_client(client_id),
        }
    }

    fn process_new_client(&self, client_id: u64) -> Result<(), StorageError> {
        let client = self.db.clients().get(client_id)?;
        info!(client_id, name = %client.full_name(), "new client notification sent");

        let today = self.clock.today();
        let generation = Generation::of(client.birth_date, today);
        info!(
            client_id,
            age = client.age,
            calculated_age = current_age(client.birth_date, today),
            generation = generation.label(),
            "client summary generated"
        );

        let ages = self.db.clients().all_ages_sorted()?;
        match AgeSummary::from_ages(&ages) {
            Some(summary) => info!(
                total = summary.count,
                average = summary.average,
                median = summary.median,
                std_dev = summary.standard_deviation,
                "client statistics refreshed"
            ),
            None => debug!("no clients to summarize"),
        }
        Ok(())
    }
}
