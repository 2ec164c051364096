//! exemplar CLI binary
//!
//! All logic is in the library; main.rs only invokes `cli::run()`.

fn main() {
    // run() prints its own errors; main only maps to a process exit
    if let Err(code) = exemplar::cli::run() {
        std::process::exit(code.as_i32());
    }
}
