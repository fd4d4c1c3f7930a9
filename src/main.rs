fn main() -> anyhow::Result<()> {
    ipblocker_lib::run()
}
