//! Two-phase module execution tests.

use std::cell::Cell;
use std::rc::Rc;

use multirate_sim::clock::EdgeType;
use multirate_sim::common::{ClockId, ModuleId, Port, Reg, Result, SimError, Wire};
use multirate_sim::config::SimulationConfig;
use multirate_sim::module::{ConnectContext, InitContext, LogicType, Module, SettleContext};
use multirate_sim::sim::SimulationBuilder;

/// Sequential counter: `count := count + 1` on every positive edge.
struct Counter {
    clock: ClockId,
    count: Reg<u64>,
}

impl Module for Counter {
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        ctx.register_on_edge(self.clock, self.count, EdgeType::Positive)
    }

    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        let n = ctx.output(self.count)?;
        ctx.stage(self.count, n + 1)
    }
}

/// Combinational doubler that counts its own evaluations.
struct Doubler {
    input: Port<u64>,
    output: Wire<u64>,
    calls: Rc<Cell<u32>>,
}

impl Module for Doubler {
    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        let a = ctx.read(self.input)?;
        ctx.drive(self.output, 2 * a)
    }
}

/// Sequential sink latching its input on every positive edge.
struct Sink {
    clock: ClockId,
    input: Port<u64>,
    latched: Reg<u64>,
}

impl Module for Sink {
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        ctx.register_on_edge(self.clock, self.latched, EdgeType::Positive)
    }

    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        let v = ctx.read(self.input)?;
        ctx.stage(self.latched, v)
    }
}

/// Combinational adder of a constant, used to build chains and loops.
struct AddOne {
    input: Port<u64>,
    output: Wire<u64>,
}

impl Module for AddOne {
    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        let v = ctx.read(self.input)?;
        ctx.drive(self.output, v + 1)
    }
}

fn posedge_only() -> SimulationBuilder {
    SimulationBuilder::with_settings(SimulationConfig {
        negedge_enabled: false,
        ..SimulationConfig::default()
    })
}

struct FanOut {
    counter: Reg<u64>,
    doubler: ModuleId,
    doubled: Wire<u64>,
    sinks: Vec<Reg<u64>>,
    calls: Rc<Cell<u32>>,
}

fn fan_out(b: &mut SimulationBuilder, clock: ClockId, consumers: usize) -> FanOut {
    let counter_id = b.module(None, "counter").unwrap();
    let counter = b.register(counter_id, "count", 0u64).unwrap();
    b.install(counter_id, Counter { clock, count: counter }).unwrap();

    let calls = Rc::new(Cell::new(0));
    let doubler = b.module(None, "doubler").unwrap();
    let d_in = b.port::<u64>(doubler, "a").unwrap();
    let d_out = b.wire(doubler, "y", 0u64).unwrap();
    b.bind_data(d_in, counter).unwrap();
    b.install(
        doubler,
        Doubler {
            input: d_in,
            output: d_out,
            calls: Rc::clone(&calls),
        },
    )
    .unwrap();

    let mut sinks = Vec::new();
    for i in 0..consumers {
        let id = b.module(None, &format!("sink{i}")).unwrap();
        let input = b.port::<u64>(id, "in").unwrap();
        let latched = b.register(id, "q", 0u64).unwrap();
        b.bind_module(input, doubler, d_out).unwrap();
        b.install(
            id,
            Sink {
                clock,
                input,
                latched,
            },
        )
        .unwrap();
        sinks.push(latched);
    }

    FanOut {
        counter,
        doubler,
        doubled: d_out,
        sinks,
        calls,
    }
}

/// Tests that a combinational producer settles exactly once per step regardless of fan-out.
#[test]
fn test_combinational_fan_out_settles_once_per_step() {
    for consumers in [1usize, 2, 7, 32] {
        let mut b = posedge_only();
        let clk = b.clock(None, "clk").unwrap();
        let net = fan_out(&mut b, clk, consumers);
        let mut sim = b.build().unwrap();

        for step in 1..=20u32 {
            sim.step().unwrap();
            assert_eq!(net.calls.get(), step, "fan-out {consumers}, step {step}");
        }
    }
}

/// Tests that a combinational producer nobody pulls is never evaluated.
#[test]
fn test_untouched_combinational_module_is_not_settled() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();
    let net = fan_out(&mut b, clk, 0);
    let mut sim = b.build().unwrap();
    sim.run_for(10).unwrap();
    assert_eq!(net.calls.get(), 0);
    assert_eq!(sim.register(net.counter).unwrap(), 5);
}

/// Tests that committed outputs only ever expose the value staged in the preceding settle phase.
#[test]
fn test_register_commit_law() {
    let mut b = posedge_only();
    let clk = b.clock(None, "clk").unwrap();
    let net = fan_out(&mut b, clk, 3);
    let mut sim = b.build().unwrap();

    for k in 1..=25u64 {
        sim.step().unwrap();
        assert_eq!(sim.register(net.counter).unwrap(), k);
        for &sink in &net.sinks {
            assert_eq!(sim.register(sink).unwrap(), 2 * (k - 1));
        }
    }
}

/// Tests that logic type is derived from edge registrations.
#[test]
fn test_logic_type_classification() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();
    let net = fan_out(&mut b, clk, 1);
    let sim = b.build().unwrap();
    assert_eq!(sim.logic_type(net.doubler).unwrap(), LogicType::Combinational);
    let counter = sim.module_id("counter").unwrap();
    assert_eq!(sim.logic_type(counter).unwrap(), LogicType::Sequential);
}

/// Tests that a combinational cycle is reported instead of overflowing the stack.
#[test]
fn test_combinational_cycle_is_detected() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();

    let a = b.module(None, "a").unwrap();
    let a_in = b.port::<u64>(a, "in").unwrap();
    let a_out = b.wire(a, "out", 0u64).unwrap();
    let c = b.module(None, "c").unwrap();
    let c_in = b.port::<u64>(c, "in").unwrap();
    let c_out = b.wire(c, "out", 0u64).unwrap();
    b.bind_module(a_in, c, c_out).unwrap();
    b.bind_module(c_in, a, a_out).unwrap();
    b.install(a, AddOne { input: a_in, output: a_out }).unwrap();
    b.install(c, AddOne { input: c_in, output: c_out }).unwrap();

    let s = b.module(None, "sink").unwrap();
    let s_in = b.port::<u64>(s, "in").unwrap();
    let latched = b.register(s, "q", 0u64).unwrap();
    b.bind_module(s_in, a, a_out).unwrap();
    b.install(
        s,
        Sink {
            clock: clk,
            input: s_in,
            latched,
        },
    )
    .unwrap();

    let mut sim = b.build().unwrap();
    match sim.step() {
        Err(SimError::CombinationalCycle { path }) => assert_eq!(path, "a"),
        other => panic!("expected a combinational cycle, got {other:?}"),
    }
}

fn chain(b: &mut SimulationBuilder, clk: ClockId, length: usize) -> Reg<u64> {
    let mut previous: Option<(ModuleId, Wire<u64>)> = None;
    for i in 0..length {
        let id = b.module(None, &format!("stage{i}")).unwrap();
        let input = b.port::<u64>(id, "in").unwrap();
        let output = b.wire(id, "out", 0u64).unwrap();
        match previous {
            Some((m, w)) => b.bind_module(input, m, w).unwrap(),
            None => b.bind_constant(input, 0u64).unwrap(),
        }
        b.install(id, AddOne { input, output }).unwrap();
        previous = Some((id, output));
    }

    let s = b.module(None, "sink").unwrap();
    let s_in = b.port::<u64>(s, "in").unwrap();
    let latched = b.register(s, "q", 0u64).unwrap();
    if let Some((m, w)) = previous {
        b.bind_module(s_in, m, w).unwrap();
    }
    b.install(
        s,
        Sink {
            clock: clk,
            input: s_in,
            latched,
        },
    )
    .unwrap();
    latched
}

/// Tests that deep but acyclic chains settle within the default depth limit.
#[test]
fn test_deep_chain_settles() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();
    let latched = chain(&mut b, clk, 10);
    let mut sim = b.build().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.register(latched).unwrap(), 10);
}

/// Tests that the evaluation depth guard trips on chains longer than the configured limit.
#[test]
fn test_depth_guard_trips() {
    let mut b = SimulationBuilder::with_settings(SimulationConfig {
        max_combinational_depth: 4,
        ..SimulationConfig::default()
    });
    let clk = b.clock(None, "clk").unwrap();
    chain(&mut b, clk, 10);
    let mut sim = b.build().unwrap();
    assert!(matches!(
        sim.step(),
        Err(SimError::EvaluationDepthExceeded { limit: 4, .. })
    ));
}

/// Tests that a port left unbound fails the build with its full path.
#[test]
fn test_unconnected_port_is_fatal() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();
    let top = b.module(None, "top").unwrap();
    let s = b.module(Some(top), "sink").unwrap();
    let input = b.port::<u64>(s, "in").unwrap();
    let latched = b.register(s, "q", 0u64).unwrap();
    b.install(top, Shell).unwrap();
    b.install(
        s,
        Sink {
            clock: clk,
            input,
            latched,
        },
    )
    .unwrap();

    match b.build() {
        Err(SimError::UnconnectedPorts { paths }) => assert_eq!(paths, vec!["top.sink.in"]),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

/// Module with no behavior of its own.
struct Shell;

impl Module for Shell {
    fn run_clock_master(&mut self, _ctx: &mut SettleContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Tests that a declared module without a unit fails the build.
#[test]
fn test_missing_unit_is_fatal() {
    let mut b = SimulationBuilder::new();
    b.clock(None, "clk").unwrap();
    b.module(None, "ghost").unwrap();
    assert!(matches!(
        b.build(),
        Err(SimError::ModuleNotInstalled { path }) if path == "ghost"
    ));
}

/// Stages a register it does not own.
struct Intruder {
    clock: ClockId,
    own: Reg<u64>,
    foreign: Reg<u64>,
}

impl Module for Intruder {
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        ctx.register_on_edge(self.clock, self.own, EdgeType::Positive)
    }

    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        ctx.stage(self.foreign, 99)
    }
}

/// Tests that a module cannot stage another module's register.
#[test]
fn test_foreign_register_write_is_rejected() {
    let mut b = SimulationBuilder::new();
    let clk = b.clock(None, "clk").unwrap();
    let victim = b.module(None, "victim").unwrap();
    let foreign = b.register(victim, "q", 0u64).unwrap();
    b.install(victim, Shell).unwrap();
    let intruder = b.module(None, "intruder").unwrap();
    let own = b.register(intruder, "q", 0u64).unwrap();
    b.install(
        intruder,
        Intruder {
            clock: clk,
            own,
            foreign,
        },
    )
    .unwrap();

    let mut sim = b.build().unwrap();
    assert!(matches!(
        sim.step(),
        Err(SimError::ForeignHandle { module, path }) if module == "intruder" && path == "victim.q"
    ));
}

/// Vectorized accumulator presetting its state in `init`.
struct Shifter {
    clock: ClockId,
    taps: Reg<[u32; 4]>,
}

impl Module for Shifter {
    fn connect(&mut self, ctx: &mut ConnectContext<'_>) -> Result<()> {
        ctx.register_on_edge(self.clock, self.taps, EdgeType::Positive)
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<()> {
        ctx.preset(self.taps, [1, 2, 3, 4])
    }

    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        let current = ctx.output(self.taps)?;
        ctx.stage_with(self.taps, |taps| {
            taps.copy_from_slice(&[0, current[0], current[1], current[2]]);
        })
    }
}

/// Tests init presets and in-place staging of vectorized registers.
#[test]
fn test_vector_register_preset_and_stage_with() {
    let mut b = posedge_only();
    let clk = b.clock(None, "clk").unwrap();
    let id = b.module(None, "shift").unwrap();
    let taps = b.register(id, "taps", [0u32; 4]).unwrap();
    b.install(id, Shifter { clock: clk, taps }).unwrap();
    let mut sim = b.build().unwrap();

    assert_eq!(sim.register(taps).unwrap(), [1, 2, 3, 4]);
    sim.step().unwrap();
    assert_eq!(sim.register(taps).unwrap(), [0, 1, 2, 3]);
    sim.step().unwrap();
    assert_eq!(sim.register(taps).unwrap(), [0, 0, 1, 2]);
}

/// Tests that peeking a combinational output evaluates it without disturbing the next step.
#[test]
fn test_peek_does_not_disturb_memoization() {
    let mut b = posedge_only();
    let clk = b.clock(None, "clk").unwrap();
    let probe_id = b.module(None, "probe").unwrap();
    let probe = b.port::<u64>(probe_id, "p").unwrap();
    b.install(probe_id, Shell).unwrap();
    let net = fan_out(&mut b, clk, 1);
    b.bind_module(probe, net.doubler, net.doubled).unwrap();
    let mut sim = b.build().unwrap();

    sim.run_for(3).unwrap();
    assert_eq!(net.calls.get(), 3);
    assert_eq!(sim.peek(probe).unwrap(), 6);
    assert_eq!(net.calls.get(), 4);
    sim.step().unwrap();
    assert_eq!(net.calls.get(), 5);
    assert_eq!(sim.register(net.sinks[0]).unwrap(), 6);
}
