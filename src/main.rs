use distkit::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {e}");

        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {cause}");
        }

        std::process::exit(1);
    }
}
