fn main() -> anyhow::Result<()> {
    bd_cli::run()
}
