use std::process;

fn main() {
    process::exit(rant::cli::run());
}
