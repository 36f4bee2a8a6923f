//! ccc CLI binary.
//!
//! This is the minimal entrypoint; all logic lives in the library.
//! `ccc::run()` handles ALL output, including error messages.

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if let Err(code) = ccc::run(&argv) {
        std::process::exit(code.as_i32());
    }
}
