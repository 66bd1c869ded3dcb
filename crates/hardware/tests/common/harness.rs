use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use wavemem_core::common::{CoherenceState, LineAddr, MemReq, RequestType};
use wavemem_core::config::{ControllerConfig, OracleConfig, SimContextConfig};
use wavemem_core::sim::{SimContext, Simulator};
use wavemem_core::soc::memory::{
    ControllerId, DeviceOracle, FixedLatencyOracle, MemoryController,
};

/// Installs a test-friendly subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Controller configuration used throughout the tests.
pub fn ctrl_config(min_latency: u64) -> ControllerConfig {
    let mut config = ControllerConfig::new("mem-0", "tech.json", "nvmain.out");
    config.min_latency = min_latency;
    config
}

/// Context configuration writing into `dir`.
pub fn ctx_config(dir: &TempDir) -> SimContextConfig {
    SimContextConfig {
        output_dir: dir.path().to_path_buf(),
        ..SimContextConfig::default()
    }
}

/// A simulator with one controller, a temporary output directory and a recorder for
/// requester 0.
pub struct TestContext {
    pub dir: TempDir,
    pub sim: Simulator,
    pub id: ControllerId,
}

impl TestContext {
    /// Controller over a fixed-latency oracle with an unbounded queue.
    pub fn fixed(min_latency: u64, latency: u64) -> Self {
        Self::with_oracle(min_latency, Box::new(FixedLatencyOracle::new(latency, 0)))
    }

    /// Controller over the given oracle.
    pub fn with_oracle(min_latency: u64, oracle: Box<dyn DeviceOracle>) -> Self {
        let dir = TempDir::new().unwrap();
        Self::build(dir, ctrl_config(min_latency), |_| {}, oracle)
    }

    /// Controller with custom configuration hooks.
    pub fn build(
        dir: TempDir,
        config: ControllerConfig,
        tweak: impl FnOnce(&mut SimContextConfig),
        oracle: Box<dyn DeviceOracle>,
    ) -> Self {
        init_tracing();
        let mut ctx_cfg = ctx_config(&dir);
        tweak(&mut ctx_cfg);
        let mut ctx = SimContext::new(&ctx_cfg).unwrap();
        ctx.enable_recorder(0);
        let mut sim = Simulator::new(ctx);
        let id = sim
            .add_controller_with_oracle(&config, &OracleConfig::default(), oracle)
            .unwrap();
        Self { dir, sim, id }
    }

    pub fn ctrl(&self) -> &MemoryController {
        self.sim.controller(self.id).unwrap()
    }

    pub fn ctrl_mut(&mut self) -> &mut MemoryController {
        self.sim.controller_mut(self.id).unwrap()
    }

    /// Bound-phase access from requester 0; returns the committed cycle and granted state.
    pub fn access(&mut self, req_type: RequestType, line: u64, cycle: u64) -> (u64, CoherenceState) {
        let mut req = MemReq::new(req_type, LineAddr::new(line), cycle, 0);
        let resp = self.sim.access(self.id, &mut req).unwrap();
        (resp, req.state)
    }

    /// Shared read of `line` at `cycle`.
    pub fn read(&mut self, line: u64, cycle: u64) -> u64 {
        self.access(RequestType::SharedRead, line, cycle).0
    }

    /// Dirty eviction of `line` at `cycle`.
    pub fn write(&mut self, line: u64, cycle: u64) -> u64 {
        self.access(RequestType::DirtyEvict, line, cycle).0
    }
}

/// A standalone controller (no simulator) for driving the bridge by hand.
pub fn standalone(min_latency: u64, oracle: Box<dyn DeviceOracle>) -> (TempDir, SimContext, MemoryController) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let ctx = SimContext::new(&ctx_config(&dir)).unwrap();
    let ctrl = MemoryController::with_oracle(
        ControllerId(0),
        &ctrl_config(min_latency),
        &OracleConfig::default(),
        oracle,
        &ctx,
    )
    .unwrap();
    (dir, ctx, ctrl)
}
