//! acb-plan - Tax-loss harvest planning at target prices.

fn main() -> std::process::ExitCode {
    acbledger::cmd::plan_cmd::main()
}
