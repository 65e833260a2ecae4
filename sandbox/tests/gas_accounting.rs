//! Gas accounting: fuel consumed by the guest plus gas reported by host
//! callbacks, out-of-gas from either side, and determinism.

mod common;

use callgate_bridge::VmError;
use callgate_hostapi::{GasConfig, HostGasMeter};

use common::*;

#[test]
fn test_gas_includes_callback_cost() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(READ_KEY)).unwrap();
    let mut host = Host::seeded(&[("alpha", "one")]);

    let report = vm.handle(&checksum, &env_bytes(), b"alpha", host.deps(), GAS_LIMIT);
    assert!(report.result.is_ok());

    let read_cost = GasConfig::default().read_cost(5);
    assert_eq!(host.meter.consumed(), read_cost);
    assert!(report.gas_used > read_cost);
}

#[test]
fn test_scan_gas_is_charged_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(SCAN_LAST_KEY)).unwrap();
    let mut host = Host::seeded(&[("a", "1"), ("b", "2"), ("c", "3")]);

    let report = vm.handle(&checksum, &env_bytes(), b"1", host.deps(), GAS_LIMIT);
    assert!(report.result.is_ok());

    let config = GasConfig::default();
    let expected = config.db_scan + 3 * config.next_cost(1, 1);
    assert_eq!(host.meter.consumed(), expected);
    assert!(report.gas_used > expected);
}

#[test]
fn test_same_call_uses_same_gas() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(WRITE_CONFIG)).unwrap();

    let mut first = Host::new();
    let mut second = Host::new();
    let a = vm.handle(&checksum, &env_bytes(), b"payload", first.deps(), GAS_LIMIT);
    let b = vm.handle(&checksum, &env_bytes(), b"payload", second.deps(), GAS_LIMIT);

    assert_eq!(a.result, b.result);
    assert_eq!(a.gas_used, b.gas_used);
    assert_eq!(first.meter.consumed(), second.meter.consumed());
}

#[test]
fn test_infinite_loop_runs_out_of_gas() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(SPIN)).unwrap();
    let mut host = Host::new();

    let report = vm.handle(&checksum, &env_bytes(), b"{}", host.deps(), 100_000);
    assert_eq!(report.result, Err(VmError::OutOfGas));
    assert_eq!(report.gas_used, 100_000);
}

#[test]
fn test_callback_cost_beyond_remaining_fuel() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(WRITE_CONFIG)).unwrap();
    let mut host = Host::new();

    // the write alone costs more than the whole limit
    let limit = 300;
    assert!(GasConfig::default().write_cost(6, 5) > limit);

    let report = vm.handle(&checksum, &env_bytes(), b"hello", host.deps(), limit);
    assert_eq!(report.result, Err(VmError::OutOfGas));
    assert_eq!(report.gas_used, limit);
}

#[test]
fn test_host_meter_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm.create(&contract(WRITE_CONFIG)).unwrap();
    let mut host = Host::with_meter(HostGasMeter::new(100));

    let report = vm.handle(&checksum, &env_bytes(), b"hello", host.deps(), GAS_LIMIT);
    assert_eq!(report.result, Err(VmError::OutOfGas));
    assert!(report.gas_used < GAS_LIMIT);
    assert!(host.store.is_empty());
}

#[test]
fn test_query_gas_limit_is_remaining_fuel() {
    let dir = tempfile::tempdir().unwrap();
    let vm = engine_in(&dir);
    let checksum = vm
        .create(&contract_with(READ_KEY, CHAIN_QUERY, ""))
        .unwrap();
    let mut host = Host::new();

    // less fuel than the querier charges
    let limit = GasConfig::default().query / 2;
    let report = vm.query(&checksum, br#"{"bank":{"all_balances":{"address":"alice"}}}"#, host.deps(), limit);
    assert_eq!(report.result, Err(VmError::OutOfGas));
    assert_eq!(report.gas_used, limit);
}
