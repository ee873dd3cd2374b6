fn main() -> anyhow::Result<()> {
	cpu_freq_bench::cli::run()
}
