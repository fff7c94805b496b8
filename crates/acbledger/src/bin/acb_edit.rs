//! acb-edit - Add, remove, or clear transactions by hand.

fn main() -> std::process::ExitCode {
    acbledger::cmd::edit_cmd::main()
}
