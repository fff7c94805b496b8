//! acb-import - Import broker exports into the transaction book.
//!
//! Primary binary for reading Interactive Brokers Flex Query and plain CSV files.

fn main() -> std::process::ExitCode {
    acbledger::cmd::import_cmd::main()
}
