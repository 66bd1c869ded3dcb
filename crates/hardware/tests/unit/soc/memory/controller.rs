//! Memory Controller Unit Tests.
//!
//! Drives the controller by hand against a local event queue to pin down the bound-phase
//! grant, the submission retry, the tick bridge's poll/jump choice, completion bookkeeping
//! and the statistics log.

use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use wavemem_core::common::{CoherenceState, LineAddr, MemCtrlError, MemReq, PhysAddr, RequestType};
use wavemem_core::config::OracleConfig;
use wavemem_core::sim::{EventQueue, ScheduledEvent, Scheduler, SimContext};
use wavemem_core::soc::memory::{
    AccessEvent, ControllerId, DeviceOracle, EventState, FixedLatencyOracle, MemoryController,
    RequestId, TickId, TickState,
};
use wavemem_core::stats::AggregateStat;

use crate::common::harness::{TestContext, ctrl_config, ctx_config, standalone};
use crate::common::mocks::oracle::{MockOracle, refusing_oracle};

fn fixed(latency: u64) -> Box<dyn DeviceOracle> {
    Box::new(FixedLatencyOracle::new(latency, 0))
}

/// A running read of `addr`, as the scheduler hands it to `enqueue`.
fn running_read(addr: u64, cycle: u64) -> AccessEvent {
    let mut event = AccessEvent::new(ControllerId(0), PhysAddr::new(addr), false, 0, 0);
    event.run(cycle).unwrap();
    event
}

/// Pops the next tick event and fires it.
fn fire_next_tick(ctrl: &mut MemoryController, queue: &mut EventQueue) -> u64 {
    let (cycle, event) = queue.pop().unwrap();
    match event {
        ScheduledEvent::Tick { tick, .. } => ctrl.simulate_tick(tick, cycle, queue).unwrap(),
        other => panic!("expected a tick at {cycle}, got {other:?}"),
    }
    cycle
}

// ══════════════════════════════════════════════════════════
// 1. Bound phase
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(RequestType::SharedRead, false, CoherenceState::Exclusive)]
#[case(RequestType::SharedRead, true, CoherenceState::Shared)]
#[case(RequestType::ExclusiveRead, false, CoherenceState::Modified)]
#[case(RequestType::CleanEvict, false, CoherenceState::Invalid)]
#[case(RequestType::DirtyEvict, false, CoherenceState::Invalid)]
fn access_grants_coherence_state(
    #[case] req_type: RequestType,
    #[case] no_excl: bool,
    #[case] granted: CoherenceState,
) {
    let (_dir, mut ctx, mut ctrl) = standalone(100, fixed(10));
    let mut req = MemReq::new(req_type, LineAddr::new(0x40), 1000, 0);
    req.no_excl = no_excl;
    assert_eq!(ctrl.access(&mut req, &mut ctx).unwrap(), 1100);
    assert_eq!(req.state, granted);
}

#[test]
fn evictions_are_counted_at_access() {
    let (_dir, mut ctx, mut ctrl) = standalone(100, fixed(10));
    for req_type in [RequestType::CleanEvict, RequestType::DirtyEvict, RequestType::DirtyEvict] {
        let mut req = MemReq::new(req_type, LineAddr::new(1), 10, 0);
        let _ = ctrl.access(&mut req, &mut ctx).unwrap();
    }
    assert_eq!(ctrl.stats().clean_evicts.get(), 1);
    assert_eq!(ctrl.stats().dirty_evicts.get(), 2);
}

#[test]
fn zero_min_latency_is_rejected() {
    let (_dir, mut ctx, mut ctrl) = standalone(0, fixed(10));
    ctx.enable_recorder(0);
    let mut req = MemReq::new(RequestType::SharedRead, LineAddr::new(1), 500, 0);
    assert!(matches!(
        ctrl.access(&mut req, &mut ctx),
        Err(MemCtrlError::NonPositiveLatency { req: 500, resp: 500 })
    ));
    assert_eq!(ctx.recorder(0).unwrap().num_records(), 0);
}

#[test]
fn access_records_timing_for_the_weave_phase() {
    let (_dir, mut ctx, mut ctrl) = standalone(100, fixed(10));
    ctx.enable_recorder(3);
    let mut req = MemReq::new(RequestType::DirtyEvict, LineAddr::new(0x40), 1000, 3);
    let _ = ctrl.access(&mut req, &mut ctx).unwrap();

    let record = ctx.recorder(3).unwrap().record().unwrap();
    assert_eq!(record.addr, PhysAddr::new(0x1000));
    assert_eq!((record.req_cycle, record.resp_cycle), (1000, 1100));
    assert_eq!(record.req_type, RequestType::DirtyEvict);
    assert!(record.event.is_write());
    assert_eq!(record.event.src_id(), 3);
    assert_eq!(record.event.min_start_cycle(), 1000);
    assert_eq!(record.event.state(), EventState::None);
}

#[test]
fn access_without_recorder_records_nothing() {
    let (_dir, mut ctx, mut ctrl) = standalone(100, fixed(10));
    let mut req = MemReq::new(RequestType::SharedRead, LineAddr::new(1), 10, 7);
    assert_eq!(ctrl.access(&mut req, &mut ctx).unwrap(), 110);
    assert!(ctx.recorder(7).is_none());
    assert_eq!(req.state, CoherenceState::Exclusive);
}

#[test]
fn clean_evict_is_discarded_without_dram_cache() {
    let (_dir, mut ctx, mut ctrl) = standalone(100, fixed(10));
    ctx.enable_recorder(0);
    let mut req = MemReq::new(RequestType::CleanEvict, LineAddr::new(1), 10, 0);
    assert_eq!(ctrl.access(&mut req, &mut ctx).unwrap(), 110);
    assert_eq!(ctx.recorder(0).unwrap().num_records(), 0);
}

#[test]
fn clean_evict_is_timed_behind_a_dram_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = TestContext::build(dir, ctrl_config(100), |c| c.has_dram_cache = true, fixed(10));
    let _ = t.access(RequestType::CleanEvict, 0x40, 100);
    let _ = t.sim.run_to_completion().unwrap();

    assert_eq!(t.sim.completed(), 1);
    assert_eq!(t.ctrl().stats().writes.get(), 1);
    assert_eq!(t.ctrl().stats().clean_evicts.get(), 1);
}

// ══════════════════════════════════════════════════════════
// 2. Submission and retry
// ══════════════════════════════════════════════════════════

#[test]
fn enqueue_issues_and_arms_tick() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(150));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();

    assert_eq!(ctrl.update_cycle(), 1001);
    assert_eq!(ctrl.inflight_len(), 1);
    let front = ctrl.inflight().front().unwrap();
    assert_eq!(front.request.id, RequestId(1000));
    assert_eq!(front.request.issue_cycle, 1000);
    assert_eq!(front.request.min_finish, 1100);
    assert_eq!(front.event.state(), EventState::Held);

    assert_eq!(ctrl.active_tick(), Some(TickId(0)));
    assert_eq!(ctrl.tracked_request(), Some(RequestId(1000)));
    assert_eq!(ctrl.tick_state(TickId(0)).unwrap(), TickState::Queued);
    assert_eq!(queue.peek_cycle(), Some(1100));
    assert_eq!(ctrl.stats().issued.get(), 1);
}

#[test]
fn second_enqueue_reuses_the_active_tick() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(150));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();
    ctrl.enqueue(running_read(0x2000, 1010), 1010, &mut queue).unwrap();

    assert_eq!(ctrl.inflight_len(), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(ctrl.allocated_ticks(), 1);
    assert_eq!(ctrl.tracked_request(), Some(RequestId(1000)));
}

#[test]
fn refused_access_retries_next_cycle_with_same_tag() {
    let (oracle, seen) = refusing_oracle(2);
    let (_dir, _ctx, mut ctrl) = standalone(100, Box::new(oracle));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut queue).unwrap();

    let mut retries = 0;
    while ctrl.inflight_len() == 0 {
        let (cycle, event) = queue.pop().unwrap();
        let ScheduledEvent::Access(mut event) = event else {
            panic!("expected a retried access at {cycle}");
        };
        assert_eq!(event.state(), EventState::Queued);
        event.run(cycle).unwrap();
        ctrl.enqueue(event, cycle, &mut queue).unwrap();
        retries += 1;
    }

    assert_eq!(retries, 2);
    assert_eq!(ctrl.stats().issued.get(), 1);
    assert_eq!(ctrl.inflight().front().unwrap().request.issue_cycle, 12);
    assert_eq!(queue.peek_cycle(), Some(112));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|r| r.id == RequestId(1000)));
    assert!(seen.iter().all(|r| r == &seen[0]));
}

#[test]
fn payload_is_a_zeroed_line_unless_data_is_ignored() {
    let (oracle, seen) = refusing_oracle(0);
    let (_dir, _ctx, mut ctrl) = standalone(100, Box::new(oracle));
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut EventQueue::new()).unwrap();
    assert_eq!(seen.lock().unwrap()[0].data, Some(vec![0; 64]));

    let dir = tempfile::tempdir().unwrap();
    let ctx = SimContext::new(&ctx_config(&dir)).unwrap();
    let oracle_config = OracleConfig {
        ignore_data: true,
        ..OracleConfig::default()
    };
    let (oracle, seen) = refusing_oracle(0);
    let mut ctrl = MemoryController::with_oracle(
        ControllerId(0),
        &ctrl_config(100),
        &oracle_config,
        Box::new(oracle),
        &ctx,
    )
    .unwrap();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut EventQueue::new()).unwrap();
    assert_eq!(seen.lock().unwrap()[0].data, None);
}

#[test]
fn oracle_rejecting_an_issuable_request_is_fatal() {
    let mut oracle = MockOracle::new();
    oracle.expect_name().return_const("mock");
    oracle.expect_advance().returning(|_| Vec::new());
    oracle.expect_is_issuable().return_const(true);
    oracle.expect_issue().returning(|_| false);
    let (_dir, _ctx, mut ctrl) = standalone(100, Box::new(oracle));

    let err = ctrl
        .enqueue(running_read(0x1000, 10), 10, &mut EventQueue::new())
        .unwrap_err();
    assert!(matches!(err, MemCtrlError::IssueRejected { id: 1000, .. }));
    assert_eq!(ctrl.inflight_len(), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Tick bridge
// ══════════════════════════════════════════════════════════

#[test]
fn tick_without_active_event_is_an_error() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(10));
    assert!(matches!(
        ctrl.tick(5, &mut EventQueue::new()),
        Err(MemCtrlError::NoActiveTick(_))
    ));
}

#[test]
fn tick_polls_while_tracked_request_is_pending() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(150));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();

    assert_eq!(ctrl.tick(1100, &mut queue).unwrap(), 1101);
    assert_eq!(ctrl.tick(1101, &mut queue).unwrap(), 1102);
    assert_eq!(ctrl.tick(1150, &mut queue).unwrap(), 1151);
    assert_eq!(ctrl.tick(1151, &mut queue).unwrap(), 0);
    assert_eq!(ctrl.active_tick(), None);
    assert_eq!(queue.completions()[0].done_cycle, 1152);
}

#[test]
fn tick_tracks_next_request_once_its_minimum_has_passed() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(150));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();
    ctrl.enqueue(running_read(0x2000, 1050), 1050, &mut queue).unwrap();

    // A completes at 1151; B's minimum finish (1150) is already behind.
    assert_eq!(ctrl.tick(1151, &mut queue).unwrap(), 1152);
    assert_eq!(ctrl.tracked_request(), Some(RequestId(1001)));
    assert_eq!(ctrl.inflight_len(), 1);
}

#[test]
fn tick_jumps_to_next_minimum_finish() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(10));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();
    // Catching up to 1100 completes A at 1011; consumers see its committed 1100.
    ctrl.enqueue(running_read(0x2000, 1099), 1099, &mut queue).unwrap();
    assert_eq!(queue.completions()[0].done_cycle, 1100);
    assert_eq!(ctrl.stats().total_read_latency.get(), 12);
    assert_eq!(ctrl.tracked_request(), None);

    assert_eq!(fire_next_tick(&mut ctrl, &mut queue), 1100);
    assert_eq!(queue.peek_cycle(), Some(1199));
    assert_eq!(ctrl.tracked_request(), Some(RequestId(1001)));

    assert_eq!(fire_next_tick(&mut ctrl, &mut queue), 1199);
    let b = &queue.completions()[1];
    assert_eq!((b.start_cycle, b.done_cycle), (1099, 1199));
    assert_eq!(ctrl.stats().total_read_latency.get(), 24);
    assert!(queue.is_empty());
    assert_eq!(ctrl.free_ticks(), 1);
}

#[test]
fn oracle_clock_never_moves_back() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(150));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 1000), 1000, &mut queue).unwrap();
    assert!(matches!(
        ctrl.tick(500, &mut queue),
        Err(MemCtrlError::ClockRegression {
            current: 1001,
            target: 501,
            ..
        })
    ));
}

#[test]
fn active_tick_cannot_be_recycled() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(10));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut queue).unwrap();
    let tick = ctrl.active_tick().unwrap();
    assert!(matches!(
        ctrl.recycle_event(tick),
        Err(MemCtrlError::TickRecycle { tick: 0, .. })
    ));
    assert_eq!(ctrl.free_ticks(), 0);
}

#[test]
fn annulled_tick_recycles_and_next_enqueue_rearms() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(1000));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut queue).unwrap();

    assert!(ctrl.annul_tick().unwrap());
    assert!(!ctrl.annul_tick().unwrap());
    assert_eq!(ctrl.active_tick(), None);
    assert_eq!(ctrl.tracked_request(), None);
    assert_eq!(ctrl.tick_state(TickId(0)).unwrap(), TickState::Annulled);

    assert_eq!(fire_next_tick(&mut ctrl, &mut queue), 110);
    assert_eq!(ctrl.tick_state(TickId(0)).unwrap(), TickState::Idle);
    assert_eq!(ctrl.free_ticks(), 1);
    assert_eq!(ctrl.inflight_len(), 1);

    ctrl.enqueue(running_read(0x2000, 120), 120, &mut queue).unwrap();
    assert_eq!(ctrl.active_tick(), Some(TickId(0)));
    assert_eq!(ctrl.allocated_ticks(), 1);
    assert_eq!(ctrl.tracked_request(), Some(RequestId(1000)));
    assert_eq!(queue.peek_cycle(), Some(121));
}

// ══════════════════════════════════════════════════════════
// 4. Completion
// ══════════════════════════════════════════════════════════

#[test]
fn completion_with_nothing_in_flight_is_fatal() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(10));
    assert!(matches!(
        ctrl.request_complete(RequestId(1000), &mut EventQueue::new()),
        Err(MemCtrlError::EmptyInflight(_))
    ));
}

#[test]
fn completion_of_unknown_tag_is_fatal() {
    let (_dir, _ctx, mut ctrl) = standalone(100, fixed(1000));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut queue).unwrap();
    assert!(matches!(
        ctrl.request_complete(RequestId(5), &mut queue),
        Err(MemCtrlError::MissingInflight { id: 5, .. })
    ));
    assert_eq!(ctrl.inflight_len(), 1);
}

#[test]
fn fast_device_completion_waits_for_committed_minimum() {
    let mut t = TestContext::fixed(100, 10);
    assert_eq!(t.read(0x40, 1000), 1100);
    assert_eq!(t.sim.run_to_completion().unwrap(), 1100);

    let done = t.sim.take_completions();
    assert_eq!((done[0].start_cycle, done[0].done_cycle), (1000, 1100));
    // Statistics keep what the device actually took.
    let stats = t.ctrl().stats();
    assert_eq!(stats.total_read_latency.get(), 12);
    assert_eq!(stats.latency_hist.get(1), 1);
}

#[test]
fn late_observed_completion_is_dated_at_the_current_cycle() {
    let (_dir, _ctx, mut ctrl) = standalone(10, fixed(5));
    let mut queue = EventQueue::new();
    ctrl.enqueue(running_read(0x1000, 10), 10, &mut queue).unwrap();
    assert!(ctrl.annul_tick().unwrap());
    assert_eq!(fire_next_tick(&mut ctrl, &mut queue), 20);

    // Nothing drives the oracle until the next submission at 500.
    queue.schedule(500, ScheduledEvent::Access(running_read(0x2000, 500))).unwrap();
    let Some((cycle, ScheduledEvent::Access(event))) = queue.pop() else {
        panic!("expected the access at 500");
    };
    ctrl.enqueue(event, cycle, &mut queue).unwrap();

    let a = &queue.completions()[0];
    assert_eq!((a.start_cycle, a.done_cycle), (10, 500));
    assert_eq!(ctrl.stats().total_read_latency.get(), 7);
}

#[test]
fn write_latency_stays_out_of_the_read_histogram() {
    let mut t = TestContext::fixed(100, 40);
    let _ = t.write(0x40, 100);
    let _ = t.sim.run_to_completion().unwrap();

    let stats = t.ctrl().stats();
    assert_eq!(stats.writes.get(), 1);
    assert_eq!(stats.reads.get(), 0);
    assert!(stats.total_write_latency.get() > 0);
    assert_eq!(stats.latency_hist.total(), 0);
}

#[test]
fn reuse_histogram_follows_issue_counts() {
    let mut t = TestContext::fixed(100, 10);
    for cycle in [100, 400, 700] {
        let _ = t.read(0x40, cycle);
    }
    let _ = t.read(0x80, 1000);
    let _ = t.sim.run_to_completion().unwrap();

    let ctrl = t.ctrl();
    assert_eq!(ctrl.distinct_addresses(), 2);
    assert_eq!(ctrl.address_count(0x1000), 3);
    assert_eq!(ctrl.address_count(0x2000), 1);
    assert_eq!(ctrl.stats().footprint.get(), 128);
    let reuse = &ctrl.stats().address_reuse_hist;
    assert_eq!((reuse.get(1), reuse.get(2), reuse.get(3)), (1, 0, 1));
    assert_eq!(reuse.total(), 2);
}

// ══════════════════════════════════════════════════════════
// 5. Statistics log and memory trace
// ══════════════════════════════════════════════════════════

#[test]
fn stats_log_gets_header_and_snapshots() {
    let mut t = TestContext::fixed(100, 10);
    let path = t.ctrl().stats_path().to_path_buf();
    assert!(path.ends_with("mem-0-nvmain.out"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# nvmain stats for mem-0\n===\n"
    );

    let _ = t.read(0x40, 100);
    let _ = t.sim.run_to_completion().unwrap();
    t.ctrl_mut().print_stats().unwrap();
    t.ctrl_mut().print_stats().unwrap();

    let log = fs::read_to_string(&path).unwrap();
    assert!(log.contains("i0.fixed.completed 1\n"));
    assert!(log.contains("mem-0: # Memory controller stats\n"));
    assert!(log.contains("  rd: 1 # Read requests\n"));
    assert_eq!(log.matches("===\n").count(), 3);
    assert!(log.ends_with("===\n"));
}

#[test]
fn memtrace_logs_recorded_accesses() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ctrl_config(100);
    config.memtrace = true;
    let mut t = TestContext::build(dir, config, |_| {}, fixed(10));
    let _ = t.read(0x40, 1000);
    let _ = t.write(0x80, 1200);
    // Discarded clean evictions never reach the trace.
    let _ = t.access(RequestType::CleanEvict, 0xC0, 1300);
    t.ctrl_mut().print_stats().unwrap();

    let zeros = "0".repeat(64);
    let trace = fs::read_to_string(t.sim.context().memtrace_path()).unwrap();
    assert_eq!(
        trace,
        format!("1000 R 0x1000 {zeros}\n1200 W 0x2000 {zeros}\n")
    );
}

#[test]
fn init_stats_registers_a_snapshot() {
    let mut t = TestContext::fixed(100, 10);
    let _ = t.read(0x40, 100);
    let _ = t.sim.run_to_completion().unwrap();

    let mut root = AggregateStat::new("mem", "Memory controllers");
    t.ctrl().init_stats(&mut root);
    assert_eq!(root.scalar("mem-0.rd"), Some(1));
    assert_eq!(root.scalar("mem-0.issued"), Some(1));
    assert_eq!(root.scalar("mem-0.addresses"), Some(1));
}

#[test]
fn construction_fails_on_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = SimContext::new(&ctx_config(&dir)).unwrap();
    let mut config = ctrl_config(100);
    config.capacity_mb = 0;
    assert!(matches!(
        MemoryController::new(ControllerId(0), &config, &OracleConfig::default(), &ctx),
        Err(MemCtrlError::Config(_))
    ));
}

#[test]
fn debug_output_names_the_controller() {
    let (_dir, _ctx, ctrl) = standalone(100, fixed(10));
    let text = format!("{ctrl:?}");
    assert!(text.contains("mem-0"));
    assert!(text.contains("fixed"));
}
