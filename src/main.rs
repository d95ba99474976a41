fn main() {
    if let Err(err) = githubfile::cli::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
