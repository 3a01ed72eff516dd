fn main() -> anyhow::Result<()> {
    restdef::cli::run_cli()
}
