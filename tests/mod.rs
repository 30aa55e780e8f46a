//! Test module organization.
//!
//! This module organizes all integration tests for the multi-rate simulation kernel.




/// Two-phase module execution and combinational evaluation tests.
mod module_tests;

/// Port binding and forwarding optimization tests.
mod port_tests;
