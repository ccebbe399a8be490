fn main() {
    if let Err(e) = beesto::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
