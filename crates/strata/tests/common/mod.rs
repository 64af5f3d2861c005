/// Routes the crate's `log` output to the test harness; run with
/// `RUST_LOG=strata=debug` to see cache bumps and registry sweeps.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
