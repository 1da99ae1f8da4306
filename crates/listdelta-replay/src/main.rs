#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = listdelta_replay::run_from_env() {
        eprintln!("listdelta-replay: {error}");
        std::process::exit(error.exit_code());
    }
}
