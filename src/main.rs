fn main() -> std::process::ExitCode {
    dayplan::run()
}
