//! Port binding and forwarding-chain optimization tests.

use multirate_sim::clock::ClockTree;
use multirate_sim::common::{Port, Result, SimError, Wire};
use multirate_sim::module::{Module, SettleContext};
use multirate_sim::sim::Netlist;

/// Drives a constant onto its output wire when settled.
struct Generator {
    output: Wire<i64>,
    value: i64,
}

impl Module for Generator {
    fn run_clock_master(&mut self, ctx: &mut SettleContext<'_>) -> Result<()> {
        ctx.drive(self.output, self.value)
    }
}

/// Builds `p0 <- p1 <- ... <- p(n)` with `p0` bound to `terminal`.
fn forward_chain(net: &mut Netlist, n: usize, terminal: impl Fn(&mut Netlist, Port<i64>)) -> Vec<Port<i64>> {
    let owner = net.add_module(None, "chain").unwrap();
    let mut ports = Vec::with_capacity(n + 1);
    let head = net.add_port::<i64>(owner, "p0").unwrap();
    terminal(net, head);
    ports.push(head);
    for i in 1..=n {
        let p = net.add_port::<i64>(owner, &format!("p{i}")).unwrap();
        net.bind_port(p, ports[i - 1]).unwrap();
        ports.push(p);
    }
    ports
}

/// Tests that optimizing forwarding chains leaves every observable read unchanged.
#[test]
fn test_optimize_preserves_direct_reads() {
    for n in [0usize, 1, 5, 50] {
        let mut net = Netlist::new(16);
        let clocks = ClockTree::default();
        let src = net.add_module(None, "src").unwrap();
        let wire = net.add_wire(src, "w", -7i64).unwrap();
        let ports = forward_chain(&mut net, n, |net, head| net.bind_data(head, wire.into()).unwrap());

        let before: Vec<i64> = ports.iter().map(|&p| net.get(p, &clocks).unwrap()).collect();
        let unbound = net.optimize().unwrap();
        let after: Vec<i64> = ports.iter().map(|&p| net.get(p, &clocks).unwrap()).collect();

        assert!(unbound.is_empty(), "chain of {n}");
        assert_eq!(before, after, "chain of {n}");
        assert!(after.iter().all(|&v| v == -7));

        net.write_wire(wire, 11).unwrap();
        let tail = *ports.last().unwrap();
        assert_eq!(net.get(tail, &clocks).unwrap(), 11);
    }
}

/// Tests that a forwarding chain ending at a combinational output settles the producer once.
#[test]
fn test_optimize_preserves_combinational_reads() {
    for n in [0usize, 1, 5, 50] {
        let mut net = Netlist::new(16);
        let clocks = ClockTree::default();
        let gen = net.add_module(None, "gen").unwrap();
        let output = net.add_wire(gen, "y", 0i64).unwrap();
        net.install(gen, Box::new(Generator { output, value: 99 })).unwrap();
        let ports = forward_chain(&mut net, n, |net, head| {
            net.bind_module(head, gen, output.into()).unwrap()
        });

        let tail = *ports.last().unwrap();
        assert_eq!(net.get(tail, &clocks).unwrap(), 99);
        net.optimize().unwrap();
        assert_eq!(net.get(tail, &clocks).unwrap(), 99);
        assert_eq!(net.settle_count(), 1, "chain of {n}");
    }
}

/// Tests that an unbound port at the end of a chain is reported by its head's path.
#[test]
fn test_optimize_reports_unbound_chain() {
    let mut net = Netlist::new(16);
    let ports = forward_chain(&mut net, 3, |_, _| {});
    assert!(net.is_null(ports[0].index()).unwrap());
    assert!(!net.is_null(ports[3].index()).unwrap());

    let mut unbound = net.optimize().unwrap();
    unbound.sort();
    assert_eq!(unbound, vec!["chain.p0", "chain.p1", "chain.p2", "chain.p3"]);
    assert!(net.is_null(ports[3].index()).unwrap());
}

/// Tests that rebinding a port replaces the previous binding.
#[test]
fn test_rebinding_replaces_previous_binding() {
    let mut net = Netlist::new(16);
    let clocks = ClockTree::default();
    let top = net.add_module(None, "top").unwrap();
    let wire = net.add_wire(top, "w", 1u32).unwrap();
    let reg = net.add_register(top, "r", 2u32).unwrap();
    let port = net.add_port::<u32>(top, "in").unwrap();

    net.bind_data(port, wire.into()).unwrap();
    assert_eq!(net.get(port, &clocks).unwrap(), 1);
    net.bind_data(port, reg.into()).unwrap();
    assert_eq!(net.get(port, &clocks).unwrap(), 2);
    net.bind_constant(port, 3).unwrap();
    assert_eq!(net.get(port, &clocks).unwrap(), 3);
}

/// Tests that constant cells stay out of the hierarchy export.
#[test]
fn test_constant_binding_is_anonymous() {
    let mut net = Netlist::new(16);
    let top = net.add_module(None, "top").unwrap();
    let port = net.add_port::<u8>(top, "in").unwrap();
    net.bind_constant(port, 5).unwrap();
    let paths: Vec<String> = net.hierarchy().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, vec!["top", "top.in"]);
}

/// Tests that binding to a combinational output of an unknown module is rejected.
#[test]
fn test_bind_module_rejects_foreign_module() {
    let mut net = Netlist::new(16);
    let top = net.add_module(None, "top").unwrap();
    let wire = net.add_wire(top, "w", 0u8).unwrap();
    let port = net.add_port::<u8>(top, "in").unwrap();
    let mut other = Netlist::new(16);
    other.add_module(None, "a").unwrap();
    let stranger = other.add_module(None, "b").unwrap();
    assert!(matches!(
        net.bind_module(port, stranger, wire.into()),
        Err(SimError::InvalidHandle { kind: "module", .. })
    ));
}
