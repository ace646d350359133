fn main() {
    #[cfg(feature = "cli")]
    scsu::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("scsu: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
