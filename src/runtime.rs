// SPDX-License-Identifier: MPL-2.0

//! Async runtime construction.
//!
//! The runtime is built once by the binary and handed down; blocking cache work
//! runs on its blocking pool via `spawn_blocking`, network I/O on the workers.

use std::io;
use tokio::runtime::Runtime;

/// Worker threads for network I/O and feed listeners.
const WORKER_THREADS: usize = 2;

/// Build the multi-threaded runtime shared by every repository.
pub fn build() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(WORKER_THREADS)
        .enable_all()
        .thread_name("helphero-async")
        .build()
}
