//! acb-report - Positions, tax years, the ledger, and a portfolio overview.

fn main() -> std::process::ExitCode {
    acbledger::cmd::report_cmd::main()
}
