//! Shared structural checks for the thread-based verifiers.

use std::collections::BTreeMap;

use syncprobe_core::Ledger;
use syncprobe_core::LifecycleRecord;
use syncprobe_core::ParticipantKey;

/// Completed worker threads of one process, keyed by thread index.
pub(crate) type WorkerThreads<'a> = BTreeMap<i32, &'a LifecycleRecord>;

/// Collect the worker threads declared for `process`.
///
/// Threads are examined in arrival order. Fails with the first structural
/// problem found: a missing main thread, an undeclared thread index, a thread
/// without END, or a thread that does not belong to the main thread's OS
/// process or reuses its OS thread.
pub(crate) fn collect_workers(ledger: &Ledger, process: i32, thread_count: i32) -> Result<WorkerThreads<'_>, String> {
    let Some(main) = ledger.record(&ParticipantKey::main(process)) else {
        return Err(format!("main thread is missing for process {process}"));
    };

    let mut threads = WorkerThreads::new();
    for record in ledger.records_by_arrival().into_iter().filter(|r| r.key.process == process && !r.key.is_main()) {
        let t = record.key.thread;
        if !(1..=thread_count).contains(&t) {
            return Err(format!("found unrequired thread {t} in process {process}"));
        }
        if !record.is_complete() {
            return Err(format!("missing END for thread {t} in process {process}"));
        }
        if record.pid != main.pid {
            return Err(format!("thread T{process}.{t} has a different process than T{process}.0"));
        }
        if record.tid == main.tid {
            return Err(format!("thread T{process}.{t} is the same as the main thread of the process"));
        }
        threads.insert(t, record);
    }
    Ok(threads)
}

/// Declared thread indices absent from `threads`, space separated.
///
/// Returns `None` when every thread `1..=thread_count` is present.
pub(crate) fn missing_threads(threads: &WorkerThreads<'_>, thread_count: i32) -> Option<String> {
    let missing: Vec<String> = (1..=thread_count).filter(|t| !threads.contains_key(t)).map(|t| t.to_string()).collect();
    if missing.is_empty() { None } else { Some(missing.join(" ")) }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Ledger builders shared by the verifier tests.

    use syncprobe_core::BarrierScenario;
    use syncprobe_core::CrossProcessScenario;
    use syncprobe_core::Ledger;
    use syncprobe_core::LifecycleMessage;
    use syncprobe_core::ParticipantKey;
    use syncprobe_core::SameProcessScenario;
    use syncprobe_core::ScenarioDescription;

    /// Three-process scenario used by the thread verifier tests.
    ///
    /// Process 2 hosts the same-process pair (outer 1, inner 2) and the
    /// sandwiched thread 3; process 3 hosts both the barrier threads and the
    /// bracketing threads of the cross-process scenario.
    pub fn scenario() -> ScenarioDescription {
        ScenarioDescription {
            process_count: 3,
            parents: [(2, 1), (3, 1)].into_iter().collect(),
            same_process: SameProcessScenario {
                process: 2,
                thread_count: 3,
                outer: 1,
                inner: 2,
            },
            barrier: BarrierScenario {
                process: 3,
                thread_count: 3,
                waiter: 3,
                max_concurrent: 3,
            },
            cross_process: CrossProcessScenario {
                process: 3,
                thread_count: 3,
                before: 1,
                after: 2,
                sandwiched_process: 2,
                sandwiched_thread: 3,
            },
        }
    }

    /// OS pid used for process `p`.
    pub fn pid(p: i32) -> i32 {
        1000 + p
    }

    /// OS tid used for thread `t` of process `p` (main thread tid == pid).
    pub fn tid(p: i32, t: i32) -> i32 {
        if t == 0 { pid(p) } else { pid(p) * 100 + t }
    }

    /// Feed a sequence of `(begin?, process, thread, parent_process)` events.
    ///
    /// Identities are derived from the indices so BEGIN and END always match.
    pub fn ledger(events: &[(bool, i32, i32, i32)]) -> Ledger {
        let mut ledger = Ledger::new();
        for &(is_begin, p, t, parent) in events {
            let key = ParticipantKey::new(p, t);
            let ppid = if t == 0 { pid(parent) } else { pid(p) };
            let msg = if is_begin {
                LifecycleMessage::begin(key, pid(p), ppid, tid(p, t))
            } else {
                LifecycleMessage::end(key, pid(p), ppid, tid(p, t))
            };
            ledger.apply(&msg).expect("fixture events are well formed");
        }
        ledger
    }

    /// Events that open and close each listed thread at the given times.
    ///
    /// `intervals` are `(thread, start, end)` in logical time; the main thread
    /// of `p` is wrapped around all of them. Gaps in time are filled with
    /// events of an unrelated filler process so logical times match exactly.
    pub fn thread_ledger(p: i32, intervals: &[(i32, u64, u64)]) -> Ledger {
        let last = intervals.iter().map(|&(_, _, e)| e).max().unwrap_or(0);
        let mut at: std::collections::BTreeMap<u64, (bool, i32)> = std::collections::BTreeMap::new();
        for &(t, s, e) in intervals {
            at.insert(s, (true, t));
            at.insert(e, (false, t));
        }

        let mut events = vec![(true, p, 0, 0)];
        let mut filler = 0;
        // Time 1 is taken by the main thread BEGIN; the schedule starts at 2.
        for time in 2..=last {
            match at.get(&time) {
                Some(&(is_begin, t)) => events.push((is_begin, p, t, 0)),
                None => {
                    filler += 1;
                    events.push((true, 90, filler, 0));
                }
            }
        }
        events.push((false, p, 0, 0));
        ledger(&events)
    }
}
