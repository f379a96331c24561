fn main() {
    if let Err(e) = carebridge::run() {
        eprintln!("carebridge: {e}");
        std::process::exit(1);
    }
}
