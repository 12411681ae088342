fn main() {
    if let Err(err) = roiset::cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
