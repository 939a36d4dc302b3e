//! End-to-end tests of the listener wire protocol.
//!
//! The test body plays the subject: it opens one connection per lifecycle
//! event against a listener bound to an ephemeral port.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use syncprobe_core::BarrierScenario;
use syncprobe_core::CrossProcessScenario;
use syncprobe_core::DelaySchedule;
use syncprobe_core::LifecycleMessage;
use syncprobe_core::ParticipantKey;
use syncprobe_core::SameProcessScenario;
use syncprobe_core::ScenarioDescription;
use syncprobe_core::wire::decode_reply;
use syncprobe_harness::EventListener;
use syncprobe_harness::ListenerHandle;
use syncprobe_harness::build_delay_schedule;
use syncprobe_verify::RunVerdict;
use syncprobe_verify::verify_ledger;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Processes 2, 3 and 4 are children of 1.
///
/// - process 2: outer 1 / inner 2, thread 3 is sandwiched
/// - process 3: barrier of two threads, waiter 1
/// - process 4: before 1 / after 2
fn scenario() -> ScenarioDescription {
    ScenarioDescription {
        process_count: 4,
        parents: BTreeMap::from([(2, 1), (3, 1), (4, 1)]),
        same_process: SameProcessScenario {
            process: 2,
            thread_count: 3,
            outer: 1,
            inner: 2,
        },
        barrier: BarrierScenario {
            process: 3,
            thread_count: 2,
            waiter: 1,
            max_concurrent: 2,
        },
        cross_process: CrossProcessScenario {
            process: 4,
            thread_count: 2,
            before: 1,
            after: 2,
            sandwiched_process: 2,
            sandwiched_thread: 3,
        },
    }
}

fn start() -> ListenerHandle {
    EventListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap().spawn()
}

async fn send(addr: SocketAddr, bytes: &[u8]) -> i32 {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await.unwrap();
    decode_reply(reply)
}

/// Report one event with synthetic OS ids derived from the indices.
async fn report(addr: SocketAddr, begin: bool, process: i32, thread: i32) -> i32 {
    let key = ParticipantKey::new(process, thread);
    let pid = process * 100;
    let ppid = if process == 1 { 1 } else { 100 };
    let tid = pid + thread;
    let msg = if begin {
        LifecycleMessage::begin(key, pid, ppid, tid)
    } else {
        LifecycleMessage::end(key, pid, ppid, tid)
    };
    send(addr, &msg.encode()).await
}

/// A well-synchronized subject, as a sequence of (begin, process, thread).
const CORRECT_SUBJECT: &[(bool, i32, i32)] = &[
    (true, 1, 0),
    (true, 2, 0),
    (true, 3, 0),
    (true, 4, 0),
    (true, 2, 1),
    (true, 2, 2),
    (false, 2, 2),
    (false, 2, 1),
    (true, 4, 1),
    (false, 4, 1),
    (true, 2, 3),
    (false, 2, 3),
    (true, 4, 2),
    (false, 4, 2),
    (true, 3, 1),
    (true, 3, 2),
    (false, 3, 1),
    (false, 3, 2),
    (false, 2, 0),
    (false, 3, 0),
    (false, 4, 0),
    (false, 1, 0),
];

#[tokio::test]
async fn test_correct_subject_scores_full_marks() {
    let handle = start();
    handle.reset(DelaySchedule::new()).await.unwrap();

    for &(begin, process, thread) in CORRECT_SUBJECT {
        assert_eq!(report(handle.local_addr(), begin, process, thread).await, 0);
    }

    let ledger = handle.snapshot().await.unwrap();
    assert_eq!(ledger.clock(), CORRECT_SUBJECT.len() as u64);
    let report = verify_ledger(1, &scenario(), &ledger);
    assert_eq!(report.check_scores(), [5, 5, 5, 5], "{:?}", report.verdict);
    assert_eq!(report.score(), 20);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_delays_follow_installed_schedule() {
    let handle = start();
    let scenario = scenario();
    let schedule = build_delay_schedule(4, &scenario, Duration::from_secs(3));
    handle.reset(schedule.clone()).await.unwrap();

    let mut replies = Vec::new();
    for &(begin, process, thread) in CORRECT_SUBJECT {
        let reply = report(handle.local_addr(), begin, process, thread).await;
        if !begin {
            assert_eq!(reply, 0, "END must never be delayed");
        }
        replies.push(((process, thread, begin), reply));
    }

    for ((process, thread, begin), reply) in replies.into_iter().filter(|((_, _, b), _)| *b) {
        let expected = schedule.delay_for(&ParticipantKey::new(process, thread));
        assert_eq!(reply, i32::try_from(expected).unwrap(), "T{process}.{thread} begin={begin}");
    }
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_protocol_errors_make_run_unverifiable() {
    let handle = start();
    handle.reset(DelaySchedule::new()).await.unwrap();
    let addr = handle.local_addr();

    report(addr, true, 1, 0).await;
    assert_eq!(report(addr, false, 2, 0).await, 0);
    assert_eq!(send(addr, &[7; 10]).await, 0);

    let ledger = handle.snapshot().await.unwrap();
    assert_eq!(ledger.clock(), 1);
    let report = verify_ledger(1, &scenario(), &ledger);
    assert_eq!(
        report.verdict,
        RunVerdict::ProtocolErrors {
            errors: vec![
                "END before BEGIN for process 2, thread 0".to_string(),
                "malformed message: received 10 of 24 bytes".to_string(),
            ]
        }
    );
    assert_eq!(report.score(), 0);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_kind_is_an_error() {
    let handle = start();
    let mut bytes = LifecycleMessage::begin(ParticipantKey::main(1), 1, 1, 1).encode();
    bytes[..4].copy_from_slice(&3i32.to_ne_bytes());
    assert_eq!(send(handle.local_addr(), &bytes).await, 0);

    let ledger = handle.snapshot().await.unwrap();
    assert_eq!(ledger.errors(), ["unknown message type 3 for process 1, thread 0"]);
    assert!(ledger.records().is_empty());
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let handle = start();
    report(handle.local_addr(), true, 1, 0).await;

    let schedule = DelaySchedule::new().with(ParticipantKey::main(1), 5);
    handle.reset(schedule.clone()).await.unwrap();
    let once = handle.snapshot().await.unwrap();
    handle.reset(schedule).await.unwrap();
    let twice = handle.snapshot().await.unwrap();

    assert!(once.records().is_empty());
    assert_eq!(once.clock(), 0);
    assert_eq!(once.records(), twice.records());
    assert_eq!(once.delays(), twice.delays());
    assert_eq!(report(handle.local_addr(), true, 1, 0).await, 5);
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_stopped_listener_refuses_connections() {
    let handle = start();
    let addr = handle.local_addr();
    handle.stop().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
